use std::collections::HashSet;

use super::records::*;
use super::ValidationDevice;
use crate::gpu::error::Result;
use crate::gpu::interface::*;
use crate::gpu::objects::*;
use crate::gpu::structs::*;
use crate::utils::Handle;

/// Size of one indirect mesh task record: three u32 group counts.
const MESH_TASKS_ARGUMENT_SIZE: u64 = 12;

impl ValidationDevice {
    fn inner_swap_chain_table(&mut self) -> Result<&mut dyn SwapChainInterface> {
        self.inner
            .swap_chain()
            .ok_or_else(|| Self::missing_group("swap chain"))
    }

    fn inner_ray_tracing(&mut self) -> Result<&mut dyn RayTracingInterface> {
        self.inner
            .ray_tracing()
            .ok_or_else(|| Self::missing_group("ray tracing"))
    }

    fn inner_mesh_shader(&mut self) -> Result<&mut dyn MeshShaderInterface> {
        self.inner
            .mesh_shader()
            .ok_or_else(|| Self::missing_group("mesh shader"))
    }

    fn inner_streamer(&mut self) -> Result<&mut dyn StreamerInterface> {
        self.inner
            .streamer()
            .ok_or_else(|| Self::missing_group("streamer"))
    }

    fn inner_low_latency(&mut self) -> Result<&mut dyn LowLatencyInterface> {
        self.inner
            .low_latency()
            .ok_or_else(|| Self::missing_group("low latency"))
    }

    fn inner_swap_chain(&self, swap_chain: Handle<SwapChain>) -> Result<Handle<SwapChain>> {
        Ok(lookup(&self.swap_chains, "swap chain", swap_chain)?.inner)
    }

    fn inner_acceleration_structure(
        &self,
        acceleration_structure: Handle<AccelerationStructure>,
    ) -> Result<Handle<AccelerationStructure>> {
        Ok(lookup(
            &self.acceleration_structures,
            "acceleration structure",
            acceleration_structure,
        )?
        .inner)
    }

    fn inner_streamer_handle(&self, streamer: Handle<Streamer>) -> Result<Handle<Streamer>> {
        Ok(lookup(&self.streamers, "streamer", streamer)?.inner)
    }
}

impl SwapChainInterface for ValidationDevice {
    fn create_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<Handle<SwapChain>> {
        if desc.width == 0 || desc.height == 0 {
            return Err(violation(format!(
                "swap chain extent {}x{} is empty",
                desc.width, desc.height
            )));
        }
        if desc.texture_num == 0 {
            return Err(violation("swap chain needs at least one texture"));
        }
        let inner_desc = SwapChainDesc {
            queue: self.inner_queue(desc.queue)?,
            ..*desc
        };

        let table = self.inner_swap_chain_table()?;
        let inner = table.create_swap_chain(&inner_desc)?;
        let inner_textures = table.get_swap_chain_textures(inner)?;

        let swap_chain = self
            .swap_chains
            .insert(Wrapped::new(inner, true, SwapChainState::default()));
        let texture_desc = TextureDesc {
            texture_type: TextureType::Texture2D,
            format: desc.format,
            width: desc.width,
            height: desc.height,
            depth: 1,
            mip_num: 1,
            layer_num: 1,
            sample_num: 1,
            usage: TextureUsageBits::COLOR_ATTACHMENT,
        };
        let textures = inner_textures
            .into_iter()
            .map(|inner| {
                self.textures.insert(Wrapped::new(
                    inner,
                    true,
                    TextureState {
                        desc: texture_desc,
                        memories: Vec::new(),
                        swap_chain: Some(swap_chain),
                    },
                ))
            })
            .collect();
        if let Some(wrapped) = self.swap_chains.get_mut_ref(swap_chain) {
            wrapped.state.textures = Some(textures);
        }
        Ok(swap_chain)
    }

    fn destroy_swap_chain(&mut self, swap_chain: Handle<SwapChain>) -> Result<()> {
        let inner = self.inner_swap_chain(swap_chain)?;
        self.inner_swap_chain_table()?.destroy_swap_chain(inner)?;

        if let Some(wrapped) = self.swap_chains.release(swap_chain) {
            for texture in wrapped.state.textures.unwrap_or_default() {
                self.textures.release(texture);
            }
        }
        Ok(())
    }

    fn get_swap_chain_textures(&mut self, swap_chain: Handle<SwapChain>) -> Result<Vec<Handle<Texture>>> {
        let wrapped = lookup(&self.swap_chains, "swap chain", swap_chain)?;
        Ok(wrapped.state.textures.clone().unwrap_or_default())
    }

    fn acquire_next_texture(&mut self, swap_chain: Handle<SwapChain>) -> Result<u32> {
        let inner = self.inner_swap_chain(swap_chain)?;
        self.inner_swap_chain_table()?.acquire_next_texture(inner)
    }

    fn queue_present(&mut self, swap_chain: Handle<SwapChain>) -> Result<()> {
        let inner = self.inner_swap_chain(swap_chain)?;
        self.inner_swap_chain_table()?.queue_present(inner)
    }
}

impl RayTracingInterface for ValidationDevice {
    fn get_acceleration_structure_memory_desc(
        &mut self,
        acceleration_structure: Handle<AccelerationStructure>,
        location: MemoryLocation,
    ) -> Result<MemoryDesc> {
        let inner = self.inner_acceleration_structure(acceleration_structure)?;
        self.inner_ray_tracing()?
            .get_acceleration_structure_memory_desc(inner, location)
    }

    fn create_acceleration_structure(
        &mut self,
        desc: &AccelerationStructureDesc,
    ) -> Result<Handle<AccelerationStructure>> {
        if desc.item_num == 0 {
            return Err(violation("acceleration structure needs at least one item"));
        }
        let inner = self.inner_ray_tracing()?.create_acceleration_structure(desc)?;
        Ok(self.acceleration_structures.insert(Wrapped::new(
            inner,
            false,
            AccelerationStructureState {
                memories: Vec::new(),
            },
        )))
    }

    fn destroy_acceleration_structure(
        &mut self,
        acceleration_structure: Handle<AccelerationStructure>,
    ) -> Result<()> {
        let inner = self.inner_acceleration_structure(acceleration_structure)?;
        self.inner_ray_tracing()?.destroy_acceleration_structure(inner)?;
        if let Some(wrapped) = self.acceleration_structures.release(acceleration_structure) {
            self.release_memory_users(&wrapped.state.memories);
        }
        Ok(())
    }

    fn bind_acceleration_structure_memory(
        &mut self,
        bindings: &[AccelerationStructureMemoryBinding],
    ) -> Result<()> {
        let mut inner_bindings = Vec::with_capacity(bindings.len());
        let mut seen = HashSet::new();
        let mut claimed = HashSet::new();

        for binding in bindings {
            let wrapped = lookup(
                &self.acceleration_structures,
                "acceleration structure",
                binding.acceleration_structure,
            )?;
            let name = describe(
                "acceleration structure",
                binding.acceleration_structure,
                &wrapped.record,
            );
            if wrapped.record.live || !seen.insert(binding.acceleration_structure) {
                return Err(violation(format!("{} is already bound", name)));
            }
            let inner_structure = wrapped.inner;

            let required = self
                .inner_ray_tracing()?
                .get_acceleration_structure_memory_desc(inner_structure, MemoryLocation::Device)?;
            let memory = self.check_memory_binding(
                name,
                required,
                binding.memory,
                binding.offset,
                &mut claimed,
            )?;
            inner_bindings.push(AccelerationStructureMemoryBinding {
                acceleration_structure: inner_structure,
                memory,
                offset: binding.offset,
            });
        }

        self.inner_ray_tracing()?
            .bind_acceleration_structure_memory(&inner_bindings)?;

        for binding in bindings {
            if let Some(wrapped) = self
                .acceleration_structures
                .get_mut_ref(binding.acceleration_structure)
            {
                wrapped.record.live = true;
                wrapped.state.memories.push(binding.memory);
            }
            if let Some(memory) = self.memories.get_mut_ref(binding.memory) {
                memory.state.bound += 1;
                memory.state.users += 1;
            }
        }
        Ok(())
    }

    fn get_acceleration_structure_handle(
        &mut self,
        acceleration_structure: Handle<AccelerationStructure>,
    ) -> Result<u64> {
        let wrapped = lookup(
            &self.acceleration_structures,
            "acceleration structure",
            acceleration_structure,
        )?;
        if !wrapped.record.live {
            return Err(violation(format!(
                "{} has no memory bound",
                describe("acceleration structure", acceleration_structure, &wrapped.record)
            )));
        }
        let inner = wrapped.inner;
        self.inner_ray_tracing()?.get_acceleration_structure_handle(inner)
    }

    fn get_acceleration_structure_build_scratch_size(
        &mut self,
        acceleration_structure: Handle<AccelerationStructure>,
    ) -> Result<u64> {
        let inner = self.inner_acceleration_structure(acceleration_structure)?;
        self.inner_ray_tracing()?
            .get_acceleration_structure_build_scratch_size(inner)
    }
}

impl MeshShaderInterface for ValidationDevice {
    fn cmd_draw_mesh_tasks(&mut self, cmd: Handle<CommandBuffer>, x: u32, y: u32, z: u32) -> Result<()> {
        let inner_cmd = self.recording(cmd)?;
        self.inner_mesh_shader()?.cmd_draw_mesh_tasks(inner_cmd, x, y, z)
    }

    fn cmd_draw_mesh_tasks_indirect(
        &mut self,
        cmd: Handle<CommandBuffer>,
        buffer: Handle<Buffer>,
        offset: u64,
        draw_num: u32,
        stride: u32,
    ) -> Result<()> {
        let inner_cmd = self.recording(cmd)?;
        let wrapped = self.live_buffer(buffer)?;
        if draw_num > 1 && (stride as u64) < MESH_TASKS_ARGUMENT_SIZE {
            return Err(violation(format!(
                "indirect stride {} is smaller than one {}-byte record",
                stride, MESH_TASKS_ARGUMENT_SIZE
            )));
        }
        if draw_num > 0 {
            let end = (draw_num as u64 - 1)
                .checked_mul(stride as u64)
                .and_then(|span| span.checked_add(offset))
                .and_then(|last| last.checked_add(MESH_TASKS_ARGUMENT_SIZE));
            if end.map_or(true, |end| end > wrapped.state.desc.size) {
                return Err(violation(format!(
                    "{} indirect records at offset {} overflow {}",
                    draw_num,
                    offset,
                    describe("buffer", buffer, &wrapped.record)
                )));
            }
        }
        let inner_buffer = wrapped.inner;

        self.inner_mesh_shader()?
            .cmd_draw_mesh_tasks_indirect(inner_cmd, inner_buffer, offset, draw_num, stride)
    }
}

impl StreamerInterface for ValidationDevice {
    fn create_streamer(&mut self, desc: &StreamerDesc) -> Result<Handle<Streamer>> {
        let inner = self.inner_streamer()?.create_streamer(desc)?;
        Ok(self.streamers.insert(Wrapped::new(inner, true, ())))
    }

    fn destroy_streamer(&mut self, streamer: Handle<Streamer>) -> Result<()> {
        let inner = self.inner_streamer_handle(streamer)?;
        self.inner_streamer()?.destroy_streamer(inner)?;
        self.streamers.release(streamer);
        Ok(())
    }

    fn add_buffer_update_request(
        &mut self,
        streamer: Handle<Streamer>,
        request: &BufferUpdateRequest,
    ) -> Result<u64> {
        let inner_streamer = self.inner_streamer_handle(streamer)?;
        if request.data.is_empty() {
            return Err(violation("buffer update request carries no data"));
        }
        let wrapped = self.live_buffer(request.dst_buffer)?;
        let fits = request
            .dst_offset
            .checked_add(request.data.len() as u64)
            .map_or(false, |end| end <= wrapped.state.desc.size);
        if !fits {
            return Err(violation(format!(
                "update of {} bytes at {} overflows {}",
                request.data.len(),
                request.dst_offset,
                describe("buffer", request.dst_buffer, &wrapped.record)
            )));
        }
        let inner_request = BufferUpdateRequest {
            dst_buffer: wrapped.inner,
            ..*request
        };

        self.inner_streamer()?
            .add_buffer_update_request(inner_streamer, &inner_request)
    }

    fn copy_streamer_update_requests(&mut self, streamer: Handle<Streamer>) -> Result<()> {
        let inner = self.inner_streamer_handle(streamer)?;
        self.inner_streamer()?.copy_streamer_update_requests(inner)
    }

    fn cmd_upload_streamer_update_requests(
        &mut self,
        cmd: Handle<CommandBuffer>,
        streamer: Handle<Streamer>,
    ) -> Result<()> {
        let inner_cmd = self.recording(cmd)?;
        let inner_streamer = self.inner_streamer_handle(streamer)?;
        self.inner_streamer()?
            .cmd_upload_streamer_update_requests(inner_cmd, inner_streamer)
    }
}

impl LowLatencyInterface for ValidationDevice {
    fn set_latency_sleep_mode(
        &mut self,
        swap_chain: Handle<SwapChain>,
        mode: &LatencySleepMode,
    ) -> Result<()> {
        let inner = self.inner_swap_chain(swap_chain)?;
        self.inner_low_latency()?.set_latency_sleep_mode(inner, mode)
    }

    fn set_latency_marker(&mut self, swap_chain: Handle<SwapChain>, marker: LatencyMarker) -> Result<()> {
        let inner = self.inner_swap_chain(swap_chain)?;
        self.inner_low_latency()?.set_latency_marker(inner, marker)
    }

    fn latency_sleep(&mut self, swap_chain: Handle<SwapChain>) -> Result<()> {
        let inner = self.inner_swap_chain(swap_chain)?;
        self.inner_low_latency()?.latency_sleep(inner)
    }

    fn get_latency_report(&mut self, swap_chain: Handle<SwapChain>) -> Result<LatencyReport> {
        let inner = self.inner_swap_chain(swap_chain)?;
        self.inner_low_latency()?.get_latency_report(inner)
    }
}

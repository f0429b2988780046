use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::records::*;
use super::ValidationDevice;
use crate::gpu::config::DescriptorPoolDesc;
use crate::gpu::descriptor::{
    DescriptorAllocator, DescriptorHeapType, DescriptorRange, HostDescriptorBacking,
};
use crate::gpu::error::Result;
use crate::gpu::interface::CoreInterface;
use crate::gpu::objects::*;
use crate::gpu::structs::*;
use crate::utils::Handle;

fn range_fits(offset: u64, size: u64, limit: u64) -> bool {
    offset.checked_add(size).map_or(false, |end| end <= limit)
}

impl ValidationDevice {
    pub(super) fn inner_buffer(&self, buffer: Handle<Buffer>) -> Result<Handle<Buffer>> {
        Ok(lookup(&self.buffers, "buffer", buffer)?.inner)
    }

    pub(super) fn inner_texture(&self, texture: Handle<Texture>) -> Result<Handle<Texture>> {
        Ok(lookup(&self.textures, "texture", texture)?.inner)
    }

    pub(super) fn inner_queue(&self, queue: Handle<CommandQueue>) -> Result<Handle<CommandQueue>> {
        Ok(lookup(&self.queues, "command queue", queue)?.inner)
    }

    /// Buffer that has memory bound and can be used by the device.
    pub(super) fn live_buffer(&self, buffer: Handle<Buffer>) -> Result<&Wrapped<Buffer, BufferState>> {
        let wrapped = lookup(&self.buffers, "buffer", buffer)?;
        if !wrapped.record.live {
            return Err(violation(format!(
                "{} has no memory bound",
                describe("buffer", buffer, &wrapped.record)
            )));
        }
        Ok(wrapped)
    }

    /// Backend handle of a command buffer that is between begin and end.
    pub(super) fn recording(&self, cmd: Handle<CommandBuffer>) -> Result<Handle<CommandBuffer>> {
        let wrapped = lookup(&self.command_buffers, "command buffer", cmd)?;
        if wrapped.record.usage != UsageState::Recording {
            return Err(violation(format!(
                "{} is not recording",
                describe("command buffer", cmd, &wrapped.record)
            )));
        }
        Ok(wrapped.inner)
    }

    pub(super) fn check_memory_binding(
        &self,
        resource: String,
        required: MemoryDesc,
        memory: Handle<Memory>,
        offset: u64,
        claimed: &mut HashSet<Handle<Memory>>,
    ) -> Result<Handle<Memory>> {
        let mem = lookup(&self.memories, "memory", memory)?;
        let name = describe("memory", memory, &mem.record);

        if mem.state.memory_type.is_dedicated() && (mem.state.bound > 0 || !claimed.insert(memory)) {
            return Err(violation(format!(
                "dedicated {} already backs another resource; cannot bind {}",
                name, resource
            )));
        }
        if mem.state.memory_type.is_dedicated() && offset != 0 {
            return Err(violation(format!(
                "{} bound at offset {} into dedicated {}",
                resource, offset, name
            )));
        }
        if required.alignment > 1 && offset % required.alignment as u64 != 0 {
            return Err(violation(format!(
                "{} bound at offset {} which is not {}-byte aligned",
                resource, offset, required.alignment
            )));
        }
        if let Some(size) = mem.state.size {
            if !range_fits(offset, required.size, size) {
                return Err(violation(format!(
                    "{} needs {} bytes at offset {} but {} holds {}",
                    resource, required.size, offset, name, size
                )));
            }
        }
        Ok(mem.inner)
    }

    /// Drops one user from each allocation a destroyed resource depended on.
    pub(super) fn release_memory_users(&mut self, memories: &[Handle<Memory>]) {
        for memory in memories {
            if let Some(wrapped) = self.memories.get_mut_ref(*memory) {
                wrapped.state.users = wrapped.state.users.saturating_sub(1);
            }
        }
    }
}

impl CoreInterface for ValidationDevice {
    fn get_device_desc(&self) -> &DeviceDesc {
        self.inner.get_device_desc()
    }

    fn get_buffer_desc(&self, buffer: Handle<Buffer>) -> Result<BufferDesc> {
        let inner = self.inner_buffer(buffer)?;
        self.inner.get_buffer_desc(inner)
    }

    fn get_texture_desc(&self, texture: Handle<Texture>) -> Result<TextureDesc> {
        let inner = self.inner_texture(texture)?;
        self.inner.get_texture_desc(inner)
    }

    fn get_format_support(&self, format: Format) -> FormatSupportBits {
        self.inner.get_format_support(format)
    }

    fn get_buffer_memory_desc(
        &self,
        buffer: Handle<Buffer>,
        location: MemoryLocation,
    ) -> Result<MemoryDesc> {
        let inner = self.inner_buffer(buffer)?;
        self.inner.get_buffer_memory_desc(inner, location)
    }

    fn get_texture_memory_desc(
        &self,
        texture: Handle<Texture>,
        location: MemoryLocation,
    ) -> Result<MemoryDesc> {
        let inner = self.inner_texture(texture)?;
        self.inner.get_texture_memory_desc(inner, location)
    }

    fn get_command_queue(&mut self, queue_type: QueueType) -> Result<Handle<CommandQueue>> {
        if let Some(queue) = self.queue_cache.get(&queue_type) {
            if self.queues.contains(*queue) {
                return Ok(*queue);
            }
        }

        let inner = self.inner.get_command_queue(queue_type)?;
        let queue = self
            .queues
            .insert(Wrapped::new(inner, true, QueueState { queue_type }));
        self.queue_cache.insert(queue_type, queue);
        Ok(queue)
    }

    fn create_command_allocator(
        &mut self,
        queue: Handle<CommandQueue>,
    ) -> Result<Handle<CommandAllocator>> {
        let inner_queue = self.inner_queue(queue)?;
        let inner = self.inner.create_command_allocator(inner_queue)?;
        Ok(self.command_allocators.insert(Wrapped::new(inner, true, ())))
    }

    fn create_command_buffer(
        &mut self,
        allocator: Handle<CommandAllocator>,
    ) -> Result<Handle<CommandBuffer>> {
        let inner_allocator = lookup(&self.command_allocators, "command allocator", allocator)?.inner;
        let inner = self.inner.create_command_buffer(inner_allocator)?;
        Ok(self
            .command_buffers
            .insert(Wrapped::new(inner, true, CommandBufferState { allocator })))
    }

    fn create_descriptor_pool(
        &mut self,
        desc: &DescriptorPoolDesc,
    ) -> Result<Handle<DescriptorPool>> {
        let resolved = desc.resolved(&self.descriptor_pool_defaults);
        let shadow = DescriptorAllocator::new(HostDescriptorBacking::new(), &resolved)
            .map_err(|err| violation(format!("descriptor pool rejected: {}", err)))?;

        let inner = self.inner.create_descriptor_pool(desc)?;
        Ok(self.descriptor_pools.insert(Wrapped::new(
            inner,
            true,
            DescriptorPoolState {
                shadow,
                ranges: HashMap::new(),
            },
        )))
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Handle<Buffer>> {
        if desc.size == 0 {
            return Err(violation("buffer size must be non-zero"));
        }
        let inner = self.inner.create_buffer(desc)?;
        Ok(self.buffers.insert(Wrapped::new(
            inner,
            false,
            BufferState {
                desc: *desc,
                memories: Vec::new(),
            },
        )))
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Handle<Texture>> {
        let extent_ok = desc.width > 0
            && (desc.texture_type == TextureType::Texture1D || desc.height > 0)
            && (desc.texture_type != TextureType::Texture3D || desc.depth > 0);
        if !extent_ok {
            return Err(violation(format!(
                "texture extent {}x{}x{} is empty",
                desc.width, desc.height, desc.depth
            )));
        }
        if desc.format == Format::Unknown {
            return Err(violation("texture format must be known"));
        }

        let inner = self.inner.create_texture(desc)?;
        Ok(self.textures.insert(Wrapped::new(
            inner,
            false,
            TextureState {
                desc: *desc,
                memories: Vec::new(),
                swap_chain: None,
            },
        )))
    }

    fn create_buffer_view(&mut self, desc: &BufferViewDesc) -> Result<Handle<Descriptor>> {
        let buffer = lookup(&self.buffers, "buffer", desc.buffer)?;
        let buffer_size = buffer.state.desc.size;
        let in_range = if desc.size == 0 {
            desc.offset < buffer_size
        } else {
            range_fits(desc.offset, desc.size, buffer_size)
        };
        if !in_range {
            return Err(violation(format!(
                "view [{}, +{}) is outside {} of {} bytes",
                desc.offset,
                desc.size,
                describe("buffer", desc.buffer, &buffer.record),
                buffer_size
            )));
        }

        let inner_desc = BufferViewDesc {
            buffer: buffer.inner,
            ..*desc
        };
        let inner = self.inner.create_buffer_view(&inner_desc)?;
        Ok(self.descriptors.insert(Wrapped::new(
            inner,
            true,
            DescriptorState {
                heap_type: DescriptorHeapType::Resource,
            },
        )))
    }

    fn create_texture_view(&mut self, desc: &TextureViewDesc) -> Result<Handle<Descriptor>> {
        let texture = lookup(&self.textures, "texture", desc.texture)?;
        let mips = texture.state.desc.mip_num.max(1);
        let layers = texture.state.desc.layer_num.max(1);
        if desc.mip_num > 0 && desc.mip_offset + desc.mip_num > mips {
            return Err(violation(format!(
                "view mips [{}, +{}) exceed the {} of {}",
                desc.mip_offset,
                desc.mip_num,
                mips,
                describe("texture", desc.texture, &texture.record)
            )));
        }
        if desc.layer_num > 0 && desc.layer_offset + desc.layer_num > layers {
            return Err(violation(format!(
                "view layers [{}, +{}) exceed the {} of {}",
                desc.layer_offset,
                desc.layer_num,
                layers,
                describe("texture", desc.texture, &texture.record)
            )));
        }

        let inner_desc = TextureViewDesc {
            texture: texture.inner,
            ..*desc
        };
        let inner = self.inner.create_texture_view(&inner_desc)?;
        Ok(self.descriptors.insert(Wrapped::new(
            inner,
            true,
            DescriptorState {
                heap_type: DescriptorHeapType::Resource,
            },
        )))
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<Handle<Descriptor>> {
        if desc.anisotropy > 16 {
            return Err(violation(format!("anisotropy {} exceeds 16", desc.anisotropy)));
        }
        if desc.mip_min > desc.mip_max {
            return Err(violation(format!(
                "mip_min {} is above mip_max {}",
                desc.mip_min, desc.mip_max
            )));
        }
        let inner = self.inner.create_sampler(desc)?;
        Ok(self.descriptors.insert(Wrapped::new(
            inner,
            true,
            DescriptorState {
                heap_type: DescriptorHeapType::Sampler,
            },
        )))
    }

    fn create_fence(&mut self, initial_value: u64) -> Result<Handle<Fence>> {
        let inner = self.inner.create_fence(initial_value)?;
        Ok(self.fences.insert(Wrapped::new(inner, true, ())))
    }

    fn create_query_pool(&mut self, desc: &QueryPoolDesc) -> Result<Handle<QueryPool>> {
        if desc.capacity == 0 {
            return Err(violation("query pool capacity must be non-zero"));
        }
        let inner = self.inner.create_query_pool(desc)?;
        Ok(self.query_pools.insert(Wrapped::new(inner, true, ())))
    }

    fn destroy_command_allocator(&mut self, allocator: Handle<CommandAllocator>) -> Result<()> {
        let inner = lookup(&self.command_allocators, "command allocator", allocator)?.inner;
        self.inner.destroy_command_allocator(inner)?;
        self.command_allocators.release(allocator);
        Ok(())
    }

    fn destroy_command_buffer(&mut self, cmd: Handle<CommandBuffer>) -> Result<()> {
        let inner = lookup(&self.command_buffers, "command buffer", cmd)?.inner;
        self.inner.destroy_command_buffer(inner)?;
        self.command_buffers.release(cmd);
        Ok(())
    }

    fn destroy_descriptor_pool(&mut self, pool: Handle<DescriptorPool>) -> Result<()> {
        let inner = lookup(&self.descriptor_pools, "descriptor pool", pool)?.inner;
        self.inner.destroy_descriptor_pool(inner)?;
        self.descriptor_pools.release(pool);
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: Handle<Buffer>) -> Result<()> {
        let wrapped = lookup(&self.buffers, "buffer", buffer)?;
        if let UsageState::Mapped { .. } = wrapped.record.usage {
            return Err(violation(format!(
                "{} destroyed while mapped",
                describe("buffer", buffer, &wrapped.record)
            )));
        }
        let inner = wrapped.inner;
        self.inner.destroy_buffer(inner)?;
        if let Some(wrapped) = self.buffers.release(buffer) {
            self.release_memory_users(&wrapped.state.memories);
        }
        Ok(())
    }

    fn destroy_texture(&mut self, texture: Handle<Texture>) -> Result<()> {
        let wrapped = lookup(&self.textures, "texture", texture)?;
        if wrapped.state.swap_chain.is_some() {
            return Err(violation(format!(
                "{} belongs to a swap chain",
                describe("texture", texture, &wrapped.record)
            )));
        }
        let inner = wrapped.inner;
        self.inner.destroy_texture(inner)?;
        if let Some(wrapped) = self.textures.release(texture) {
            self.release_memory_users(&wrapped.state.memories);
        }
        Ok(())
    }

    fn destroy_descriptor(&mut self, descriptor: Handle<Descriptor>) -> Result<()> {
        let inner = lookup(&self.descriptors, "descriptor", descriptor)?.inner;
        self.inner.destroy_descriptor(inner)?;
        self.descriptors.release(descriptor);
        Ok(())
    }

    fn destroy_fence(&mut self, fence: Handle<Fence>) -> Result<()> {
        let inner = lookup(&self.fences, "fence", fence)?.inner;
        self.inner.destroy_fence(inner)?;
        self.fences.release(fence);
        Ok(())
    }

    fn destroy_query_pool(&mut self, pool: Handle<QueryPool>) -> Result<()> {
        let inner = lookup(&self.query_pools, "query pool", pool)?.inner;
        self.inner.destroy_query_pool(inner)?;
        self.query_pools.release(pool);
        Ok(())
    }

    fn allocate_memory(&mut self, desc: &AllocateMemoryDesc) -> Result<Handle<Memory>> {
        if desc.size == 0 {
            return Err(violation("memory size must be non-zero"));
        }
        if !(-1.0..=1.0).contains(&desc.priority) {
            return Err(violation(format!(
                "memory priority {} is outside [-1, 1]",
                desc.priority
            )));
        }
        let inner = self.inner.allocate_memory(desc)?;
        Ok(self.memories.insert(Wrapped::new(
            inner,
            true,
            MemoryState {
                size: Some(desc.size),
                memory_type: desc.memory_type,
                bound: 0,
                users: 0,
            },
        )))
    }

    fn bind_buffer_memory(&mut self, bindings: &[BufferMemoryBinding]) -> Result<()> {
        let mut inner_bindings = Vec::with_capacity(bindings.len());
        let mut seen = HashSet::new();
        let mut claimed = HashSet::new();

        for binding in bindings {
            let buffer = lookup(&self.buffers, "buffer", binding.buffer)?;
            let name = describe("buffer", binding.buffer, &buffer.record);
            if buffer.record.live || !seen.insert(binding.buffer) {
                return Err(violation(format!("{} is already bound", name)));
            }

            let mut required = self
                .inner
                .get_buffer_memory_desc(buffer.inner, MemoryLocation::Device)?;
            required.size = required.size.max(buffer.state.desc.size);
            let inner_buffer = buffer.inner;

            let memory =
                self.check_memory_binding(name, required, binding.memory, binding.offset, &mut claimed)?;
            inner_bindings.push(BufferMemoryBinding {
                buffer: inner_buffer,
                memory,
                offset: binding.offset,
            });
        }

        self.inner.bind_buffer_memory(&inner_bindings)?;

        for binding in bindings {
            if let Some(buffer) = self.buffers.get_mut_ref(binding.buffer) {
                buffer.record.live = true;
                buffer.state.memories.push(binding.memory);
            }
            if let Some(memory) = self.memories.get_mut_ref(binding.memory) {
                memory.state.bound += 1;
                memory.state.users += 1;
            }
        }
        Ok(())
    }

    fn bind_texture_memory(&mut self, bindings: &[TextureMemoryBinding]) -> Result<()> {
        let mut inner_bindings = Vec::with_capacity(bindings.len());
        let mut seen = HashSet::new();
        let mut claimed = HashSet::new();

        for binding in bindings {
            let texture = lookup(&self.textures, "texture", binding.texture)?;
            let name = describe("texture", binding.texture, &texture.record);
            if texture.record.live || !seen.insert(binding.texture) {
                return Err(violation(format!("{} is already bound", name)));
            }

            let required = self
                .inner
                .get_texture_memory_desc(texture.inner, MemoryLocation::Device)?;
            let inner_texture = texture.inner;

            let memory =
                self.check_memory_binding(name, required, binding.memory, binding.offset, &mut claimed)?;
            inner_bindings.push(TextureMemoryBinding {
                texture: inner_texture,
                memory,
                offset: binding.offset,
            });
        }

        self.inner.bind_texture_memory(&inner_bindings)?;

        for binding in bindings {
            if let Some(texture) = self.textures.get_mut_ref(binding.texture) {
                texture.record.live = true;
                texture.state.memories.push(binding.memory);
            }
            if let Some(memory) = self.memories.get_mut_ref(binding.memory) {
                memory.state.bound += 1;
                memory.state.users += 1;
            }
        }
        Ok(())
    }

    fn free_memory(&mut self, memory: Handle<Memory>) -> Result<()> {
        let wrapped = lookup(&self.memories, "memory", memory)?;
        if wrapped.state.users > 0 {
            return Err(violation(format!(
                "{} freed while {} resource(s) are still bound to it",
                describe("memory", memory, &wrapped.record),
                wrapped.state.users
            )));
        }
        let inner = wrapped.inner;
        self.inner.free_memory(inner)?;
        self.memories.release(memory);
        Ok(())
    }

    fn allocate_descriptors(
        &mut self,
        pool: Handle<DescriptorPool>,
        heap_type: DescriptorHeapType,
        count: u32,
    ) -> Result<DescriptorRange> {
        let wrapped = lookup(&self.descriptor_pools, "descriptor pool", pool)?;
        if count == 0 {
            return Err(violation("descriptor count must be non-zero"));
        }
        let ceiling = wrapped.state.shadow.pool(heap_type).config().max_heap_slots;
        if count > ceiling {
            return Err(violation(format!(
                "{} {:?} descriptors exceed the heap ceiling of {} in {}",
                count,
                heap_type,
                ceiling,
                describe("descriptor pool", pool, &wrapped.record)
            )));
        }
        let inner_pool = wrapped.inner;

        let inner_range = self.inner.allocate_descriptors(inner_pool, heap_type, count)?;

        let state = &mut lookup_mut(&mut self.descriptor_pools, "descriptor pool", pool)?.state;
        match state.shadow.allocate(heap_type, count) {
            Ok(range) => {
                state.ranges.insert((heap_type, range.first), (count, inner_range));
                Ok(range)
            }
            Err(err) => {
                if let Err(cleanup) = self.inner.free_descriptors(inner_pool, &inner_range) {
                    log::warn!(
                        target: LOG_TARGET,
                        "failed to return {:?} to the backend pool: {}",
                        inner_range,
                        cleanup
                    );
                }
                Err(err)
            }
        }
    }

    fn free_descriptors(
        &mut self,
        pool: Handle<DescriptorPool>,
        range: &DescriptorRange,
    ) -> Result<()> {
        let wrapped = lookup(&self.descriptor_pools, "descriptor pool", pool)?;
        let inner_range = wrapped.state.translate(range).ok_or_else(|| {
            violation(format!(
                "{:?} was not issued by {} or is already free",
                range,
                describe("descriptor pool", pool, &wrapped.record)
            ))
        })?;
        let inner_pool = wrapped.inner;

        self.inner.free_descriptors(inner_pool, &inner_range)?;

        let state = &mut lookup_mut(&mut self.descriptor_pools, "descriptor pool", pool)?.state;
        state.ranges.remove(&(range.heap_type, range.first));
        state.shadow.free(range)
    }

    fn reset_descriptor_pool(&mut self, pool: Handle<DescriptorPool>) -> Result<()> {
        let inner = lookup(&self.descriptor_pools, "descriptor pool", pool)?.inner;
        self.inner.reset_descriptor_pool(inner)?;

        let state = &mut lookup_mut(&mut self.descriptor_pools, "descriptor pool", pool)?.state;
        state.shadow.reset();
        state.ranges.clear();
        Ok(())
    }

    fn update_descriptors(
        &mut self,
        pool: Handle<DescriptorPool>,
        range: &DescriptorRange,
        offset: u32,
        descriptors: &[Handle<Descriptor>],
    ) -> Result<()> {
        let wrapped = lookup(&self.descriptor_pools, "descriptor pool", pool)?;
        let pool_name = describe("descriptor pool", pool, &wrapped.record);
        let inner_range = wrapped.state.translate(range).ok_or_else(|| {
            violation(format!("{:?} is not allocated from {}", range, pool_name))
        })?;
        if descriptors.is_empty() {
            return Err(violation("descriptor update with no descriptors"));
        }
        if !range_fits(offset as u64, descriptors.len() as u64, range.count as u64) {
            return Err(violation(format!(
                "writing {} descriptors at {} overflows a range of {}",
                descriptors.len(),
                offset,
                range.count
            )));
        }

        let mut inner_descriptors = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let d = lookup(&self.descriptors, "descriptor", *descriptor)?;
            if d.state.heap_type != range.heap_type {
                return Err(violation(format!(
                    "{} is a {:?} descriptor written into a {:?} range",
                    describe("descriptor", *descriptor, &d.record),
                    d.state.heap_type,
                    range.heap_type
                )));
            }
            inner_descriptors.push(d.inner);
        }
        let inner_pool = wrapped.inner;

        self.inner
            .update_descriptors(inner_pool, &inner_range, offset, &inner_descriptors)
    }

    fn begin_command_buffer(&mut self, cmd: Handle<CommandBuffer>) -> Result<()> {
        let wrapped = lookup(&self.command_buffers, "command buffer", cmd)?;
        if wrapped.record.usage == UsageState::Recording {
            return Err(violation(format!(
                "{} is already recording",
                describe("command buffer", cmd, &wrapped.record)
            )));
        }
        let inner = wrapped.inner;
        self.inner.begin_command_buffer(inner)?;
        lookup_mut(&mut self.command_buffers, "command buffer", cmd)?
            .record
            .usage = UsageState::Recording;
        Ok(())
    }

    fn end_command_buffer(&mut self, cmd: Handle<CommandBuffer>) -> Result<()> {
        let inner = self.recording(cmd)?;
        self.inner.end_command_buffer(inner)?;
        lookup_mut(&mut self.command_buffers, "command buffer", cmd)?
            .record
            .usage = UsageState::Idle;
        Ok(())
    }

    fn reset_command_allocator(&mut self, allocator: Handle<CommandAllocator>) -> Result<()> {
        let wrapped = lookup(&self.command_allocators, "command allocator", allocator)?;
        let mut recording = None;
        self.command_buffers.for_each_occupied(|cmd, w| {
            if w.state.allocator == allocator && w.record.usage == UsageState::Recording {
                recording = Some(describe("command buffer", cmd, &w.record));
            }
        });
        if let Some(cmd) = recording {
            return Err(violation(format!(
                "{} reset while {} is recording",
                describe("command allocator", allocator, &wrapped.record),
                cmd
            )));
        }
        let inner = wrapped.inner;
        self.inner.reset_command_allocator(inner)
    }

    fn cmd_set_descriptor_pool(
        &mut self,
        cmd: Handle<CommandBuffer>,
        pool: Handle<DescriptorPool>,
    ) -> Result<()> {
        let inner_cmd = self.recording(cmd)?;
        let inner_pool = lookup(&self.descriptor_pools, "descriptor pool", pool)?.inner;
        self.inner.cmd_set_descriptor_pool(inner_cmd, inner_pool)
    }

    fn cmd_copy_buffer(&mut self, cmd: Handle<CommandBuffer>, copy: &BufferCopy) -> Result<()> {
        let inner_cmd = self.recording(cmd)?;
        if copy.size == 0 {
            return Err(violation("copy size must be non-zero"));
        }

        let src = self.live_buffer(copy.src)?;
        if !range_fits(copy.src_offset, copy.size, src.state.desc.size) {
            return Err(violation(format!(
                "copy source [{}, +{}) overflows {}",
                copy.src_offset,
                copy.size,
                describe("buffer", copy.src, &src.record)
            )));
        }
        let inner_src = src.inner;

        let dst = self.live_buffer(copy.dst)?;
        if !range_fits(copy.dst_offset, copy.size, dst.state.desc.size) {
            return Err(violation(format!(
                "copy destination [{}, +{}) overflows {}",
                copy.dst_offset,
                copy.size,
                describe("buffer", copy.dst, &dst.record)
            )));
        }
        let inner_dst = dst.inner;

        let inner_copy = BufferCopy {
            src: inner_src,
            dst: inner_dst,
            ..*copy
        };
        self.inner.cmd_copy_buffer(inner_cmd, &inner_copy)
    }

    fn queue_submit(&mut self, queue: Handle<CommandQueue>, desc: &QueueSubmitDesc) -> Result<()> {
        let inner_queue = self.inner_queue(queue)?;

        let mut inner_cmds = Vec::with_capacity(desc.command_buffers.len());
        for cmd in desc.command_buffers {
            let wrapped = lookup(&self.command_buffers, "command buffer", *cmd)?;
            if wrapped.record.usage == UsageState::Recording {
                return Err(violation(format!(
                    "{} submitted while still recording",
                    describe("command buffer", *cmd, &wrapped.record)
                )));
            }
            inner_cmds.push(wrapped.inner);
        }

        let signal = match desc.signal {
            Some(signal) => Some(FenceSignal {
                fence: lookup(&self.fences, "fence", signal.fence)?.inner,
                value: signal.value,
            }),
            None => None,
        };

        self.inner.queue_submit(
            inner_queue,
            &QueueSubmitDesc {
                command_buffers: &inner_cmds,
                signal,
            },
        )
    }

    fn wait(&mut self, fence: Handle<Fence>, value: u64, timeout: Duration) -> Result<()> {
        let inner = lookup(&self.fences, "fence", fence)?.inner;
        self.inner.wait(inner, value, timeout)
    }

    fn get_fence_value(&self, fence: Handle<Fence>) -> Result<u64> {
        let inner = lookup(&self.fences, "fence", fence)?.inner;
        self.inner.get_fence_value(inner)
    }

    fn map_buffer(
        &mut self,
        buffer: Handle<Buffer>,
        offset: u64,
        size: u64,
    ) -> Result<MappedMemory> {
        let wrapped = lookup(&self.buffers, "buffer", buffer)?;
        let name = describe("buffer", buffer, &wrapped.record);
        if !wrapped.record.live {
            return Err(violation(format!("{} mapped before memory was bound", name)));
        }
        if let UsageState::Mapped { offset, size } = wrapped.record.usage {
            return Err(violation(format!(
                "{} is already mapped at [{}, +{})",
                name, offset, size
            )));
        }
        if size == 0 {
            return Err(violation(format!("{} mapped with zero size", name)));
        }
        if !range_fits(offset, size, wrapped.state.desc.size) {
            return Err(violation(format!(
                "map [{}, +{}) overflows {} of {} bytes",
                offset, size, name, wrapped.state.desc.size
            )));
        }
        let inner = wrapped.inner;

        let mapped = self.inner.map_buffer(inner, offset, size)?;
        lookup_mut(&mut self.buffers, "buffer", buffer)?.record.usage =
            UsageState::Mapped { offset, size };
        Ok(mapped)
    }

    fn unmap_buffer(&mut self, buffer: Handle<Buffer>) -> Result<()> {
        let wrapped = lookup(&self.buffers, "buffer", buffer)?;
        if !matches!(wrapped.record.usage, UsageState::Mapped { .. }) {
            return Err(violation(format!(
                "{} unmapped without being mapped",
                describe("buffer", buffer, &wrapped.record)
            )));
        }
        let inner = wrapped.inner;

        self.inner.unmap_buffer(inner)?;
        lookup_mut(&mut self.buffers, "buffer", buffer)?.record.usage = UsageState::Idle;
        Ok(())
    }

    fn set_debug_name(&mut self, object: Object, name: &str) -> Result<()> {
        let inner = self.inner_object(object)?;
        self.inner.set_debug_name(inner, name)?;
        if object != Object::Device {
            self.record_mut(object)?.debug_name = name.to_string();
        }
        Ok(())
    }

    fn get_native_object(&self, _object: Object) -> u64 {
        NO_NATIVE_OBJECT
    }
}

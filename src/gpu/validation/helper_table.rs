use super::records::*;
use super::ValidationDevice;
use crate::gpu::error::Result;
use crate::gpu::interface::{HelperInterface, ResourceAllocatorInterface};
use crate::gpu::memory::MemoryTypeId;
use crate::gpu::objects::*;
use crate::gpu::structs::*;
use crate::utils::Handle;

impl ValidationDevice {
    /// Backend handles for a resource group whose members are all unbound.
    fn translate_group(
        &self,
        desc: &ResourceGroupDesc,
    ) -> Result<(Vec<Handle<Buffer>>, Vec<Handle<Texture>>)> {
        let mut buffers = Vec::with_capacity(desc.buffers.len());
        for buffer in desc.buffers {
            let wrapped = lookup(&self.buffers, "buffer", *buffer)?;
            if wrapped.record.live {
                return Err(violation(format!(
                    "{} already has memory bound",
                    describe("buffer", *buffer, &wrapped.record)
                )));
            }
            buffers.push(wrapped.inner);
        }

        let mut textures = Vec::with_capacity(desc.textures.len());
        for texture in desc.textures {
            let wrapped = lookup(&self.textures, "texture", *texture)?;
            if wrapped.record.live {
                return Err(violation(format!(
                    "{} already has memory bound",
                    describe("texture", *texture, &wrapped.record)
                )));
            }
            textures.push(wrapped.inner);
        }
        Ok((buffers, textures))
    }

    fn inner_helper(&mut self) -> Result<&mut dyn HelperInterface> {
        self.inner
            .helper()
            .ok_or_else(|| Self::missing_group("helper"))
    }

    fn inner_resource_allocator(&mut self) -> Result<&mut dyn ResourceAllocatorInterface> {
        self.inner
            .resource_allocator()
            .ok_or_else(|| Self::missing_group("resource allocator"))
    }
}

impl HelperInterface for ValidationDevice {
    fn calculate_allocation_number(&mut self, desc: &ResourceGroupDesc) -> Result<u32> {
        let (buffers, textures) = self.translate_group(desc)?;
        let inner_desc = ResourceGroupDesc {
            buffers: &buffers,
            textures: &textures,
            ..*desc
        };
        self.inner_helper()?.calculate_allocation_number(&inner_desc)
    }

    fn allocate_and_bind_memory(&mut self, desc: &ResourceGroupDesc) -> Result<Vec<Handle<Memory>>> {
        let (buffers, textures) = self.translate_group(desc)?;
        let inner_desc = ResourceGroupDesc {
            buffers: &buffers,
            textures: &textures,
            ..*desc
        };
        let inner_memories = self.inner_helper()?.allocate_and_bind_memory(&inner_desc)?;

        // The placement of each member is hidden, so every member depends on
        // every allocation of the group.
        let users = (desc.buffers.len() + desc.textures.len()) as u32;
        let memories: Vec<_> = inner_memories
            .into_iter()
            .map(|inner| {
                self.memories.insert(Wrapped::new(
                    inner,
                    true,
                    MemoryState {
                        size: None,
                        memory_type: MemoryTypeId::default(),
                        bound: 1,
                        users,
                    },
                ))
            })
            .collect();

        for buffer in desc.buffers {
            if let Some(wrapped) = self.buffers.get_mut_ref(*buffer) {
                wrapped.record.live = true;
                wrapped.state.memories = memories.clone();
            }
        }
        for texture in desc.textures {
            if let Some(wrapped) = self.textures.get_mut_ref(*texture) {
                wrapped.record.live = true;
                wrapped.state.memories = memories.clone();
            }
        }
        Ok(memories)
    }

    fn query_video_memory_info(&mut self, location: MemoryLocation) -> Result<VideoMemoryInfo> {
        self.inner_helper()?.query_video_memory_info(location)
    }

    fn wait_for_idle(&mut self, queue: Handle<CommandQueue>) -> Result<()> {
        let inner_queue = self.inner_queue(queue)?;
        self.inner_helper()?.wait_for_idle(inner_queue)
    }
}

impl ResourceAllocatorInterface for ValidationDevice {
    fn allocate_buffer(&mut self, desc: &AllocateBufferDesc) -> Result<Handle<Buffer>> {
        if desc.desc.size == 0 {
            return Err(violation("buffer size must be non-zero"));
        }
        if !(-1.0..=1.0).contains(&desc.memory_priority) {
            return Err(violation(format!(
                "memory priority {} is outside [-1, 1]",
                desc.memory_priority
            )));
        }

        let inner = self.inner_resource_allocator()?.allocate_buffer(desc)?;
        Ok(self.buffers.insert(Wrapped::new(
            inner,
            true,
            BufferState {
                desc: desc.desc,
                memories: Vec::new(),
            },
        )))
    }

    fn allocate_texture(&mut self, desc: &AllocateTextureDesc) -> Result<Handle<Texture>> {
        if desc.desc.width == 0 || desc.desc.format == Format::Unknown {
            return Err(violation("texture needs a non-zero width and a known format"));
        }
        if !(-1.0..=1.0).contains(&desc.memory_priority) {
            return Err(violation(format!(
                "memory priority {} is outside [-1, 1]",
                desc.memory_priority
            )));
        }

        let inner = self.inner_resource_allocator()?.allocate_texture(desc)?;
        Ok(self.textures.insert(Wrapped::new(
            inner,
            true,
            TextureState {
                desc: desc.desc,
                memories: Vec::new(),
                swap_chain: None,
            },
        )))
    }
}

use std::collections::HashMap;

use super::encoding::MemoryTypeId;
use crate::gpu::error::{GPUError, Result};
use crate::gpu::interface::CoreInterface;
use crate::gpu::objects::{Buffer, Memory, Texture};
use crate::gpu::structs::{
    AllocateMemoryDesc, BufferMemoryBinding, MemoryDesc, ResourceGroupDesc, TextureMemoryBinding,
};
use crate::utils::Handle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlannedResource {
    Buffer(Handle<Buffer>),
    Texture(Handle<Texture>),
}

/// One memory allocation and what gets bound into it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedAllocation {
    pub memory_type: MemoryTypeId,
    pub size: u64,
    pub dedicated: bool,
    /// Resource and its offset inside the allocation.
    pub bindings: Vec<(PlannedResource, u64)>,
}

fn align_up(value: u64, alignment: u32) -> u64 {
    let alignment = alignment.max(1) as u64;
    value.div_ceil(alignment) * alignment
}

/// Packs resources into allocations.
///
/// Resources with the same memory type share blocks of at most `block_size`
/// bytes (a single larger resource gets a block of its own size). Dedicated
/// resources each get a private allocation of exactly their size.
pub fn pack(resources: &[(PlannedResource, MemoryDesc)], block_size: u64) -> Vec<PlannedAllocation> {
    let mut allocations: Vec<PlannedAllocation> = Vec::new();
    let mut open: HashMap<MemoryTypeId, usize> = HashMap::new();

    for (resource, desc) in resources {
        if desc.must_be_dedicated || desc.memory_type.is_dedicated() {
            allocations.push(PlannedAllocation {
                memory_type: desc.memory_type.with_dedicated(true),
                size: desc.size,
                dedicated: true,
                bindings: vec![(*resource, 0)],
            });
            continue;
        }

        if let Some(&index) = open.get(&desc.memory_type) {
            let block = &mut allocations[index];
            let offset = align_up(block.size, desc.alignment);
            if offset + desc.size <= block_size {
                block.size = offset + desc.size;
                block.bindings.push((*resource, offset));
                continue;
            }
        }

        open.insert(desc.memory_type, allocations.len());
        allocations.push(PlannedAllocation {
            memory_type: desc.memory_type,
            size: desc.size,
            dedicated: false,
            bindings: vec![(*resource, 0)],
        });
    }

    allocations
}

/// Queries the memory requirements of every resource in the group.
pub fn plan<C: CoreInterface + ?Sized>(
    core: &C,
    desc: &ResourceGroupDesc,
    default_block_size: u64,
) -> Result<Vec<PlannedAllocation>> {
    let mut resources = Vec::with_capacity(desc.buffers.len() + desc.textures.len());
    for buffer in desc.buffers {
        let memory = core.get_buffer_memory_desc(*buffer, desc.memory_location)?;
        resources.push((PlannedResource::Buffer(*buffer), memory));
    }
    for texture in desc.textures {
        let memory = core.get_texture_memory_desc(*texture, desc.memory_location)?;
        resources.push((PlannedResource::Texture(*texture), memory));
    }

    let block_size = if desc.preferred_memory_size == 0 {
        default_block_size
    } else {
        desc.preferred_memory_size
    };
    Ok(pack(&resources, block_size))
}

/// Allocates and binds memory for a whole group. On failure every
/// allocation made so far is freed.
pub fn allocate_and_bind<C: CoreInterface + ?Sized>(
    core: &mut C,
    desc: &ResourceGroupDesc,
    default_block_size: u64,
) -> Result<Vec<Handle<Memory>>> {
    let allocations = plan(&*core, desc, default_block_size)?;
    let mut memories = Vec::with_capacity(allocations.len());

    for allocation in &allocations {
        match allocate_one(core, allocation) {
            Ok(memory) => memories.push(memory),
            Err(err) => {
                for memory in memories.drain(..) {
                    if let Err(free_err) = core.free_memory(memory) {
                        log::error!("Failed to release memory after group failure: {}", free_err);
                    }
                }
                return Err(err);
            }
        }
    }

    Ok(memories)
}

fn allocate_one<C: CoreInterface + ?Sized>(
    core: &mut C,
    allocation: &PlannedAllocation,
) -> Result<Handle<Memory>> {
    let memory = core.allocate_memory(&AllocateMemoryDesc {
        size: allocation.size,
        memory_type: allocation.memory_type,
        priority: 0.0,
    })?;
    if allocation.dedicated {
        log::debug!(
            "Dedicated allocation of {} bytes ({:?})",
            allocation.size,
            allocation.memory_type
        );
    }

    let mut buffers = Vec::new();
    let mut textures = Vec::new();
    for (resource, offset) in &allocation.bindings {
        match resource {
            PlannedResource::Buffer(buffer) => buffers.push(BufferMemoryBinding {
                buffer: *buffer,
                memory,
                offset: *offset,
            }),
            PlannedResource::Texture(texture) => textures.push(TextureMemoryBinding {
                texture: *texture,
                memory,
                offset: *offset,
            }),
        }
    }

    let bound = core
        .bind_buffer_memory(&buffers)
        .and_then(|_| core.bind_texture_memory(&textures));
    if let Err(err) = bound {
        if let Err(free_err) = core.free_memory(memory) {
            log::error!("Failed to release memory after bind failure: {}", free_err);
        }
        return Err(err);
    }
    Ok(memory)
}

/// Number of allocations [`allocate_and_bind`] would make.
pub fn allocation_count<C: CoreInterface + ?Sized>(
    core: &C,
    desc: &ResourceGroupDesc,
    default_block_size: u64,
) -> Result<u32> {
    let count = plan(core, desc, default_block_size)?.len();
    u32::try_from(count).map_err(|_| GPUError::invalid("resource group too large"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::memory::encoding::MemoryTypeInfo;

    fn memory_type(category: u8) -> MemoryTypeId {
        MemoryTypeId::encode(MemoryTypeInfo {
            heap_category: category,
            heap_flags: 1,
            must_be_dedicated: false,
        })
    }

    fn buffer(i: u32) -> PlannedResource {
        PlannedResource::Buffer(Handle::new(i, 1))
    }

    fn desc(size: u64, alignment: u32, category: u8, dedicated: bool) -> MemoryDesc {
        MemoryDesc {
            size,
            alignment,
            memory_type: memory_type(category).with_dedicated(dedicated),
            must_be_dedicated: dedicated,
        }
    }

    #[test]
    fn same_type_shares_a_block_with_alignment() {
        let plan = pack(
            &[
                (buffer(0), desc(100, 256, 0, false)),
                (buffer(1), desc(100, 256, 0, false)),
                (buffer(2), desc(10, 4, 1, false)),
            ],
            1024,
        );
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].bindings, vec![(buffer(0), 0), (buffer(1), 256)]);
        assert_eq!(plan[0].size, 356);
        assert_eq!(plan[1].bindings, vec![(buffer(2), 0)]);
    }

    #[test]
    fn blocks_are_capped_at_the_preferred_size() {
        let plan = pack(
            &[
                (buffer(0), desc(600, 16, 0, false)),
                (buffer(1), desc(600, 16, 0, false)),
                (buffer(2), desc(4096, 16, 0, false)),
            ],
            1024,
        );
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[2].size, 4096);
    }

    #[test]
    fn dedicated_resources_get_exact_private_allocations() {
        let plan = pack(
            &[
                (buffer(0), desc(64, 16, 0, false)),
                (buffer(1), desc(1000, 256, 0, true)),
                (buffer(2), desc(64, 16, 0, false)),
            ],
            1 << 20,
        );
        assert_eq!(plan.len(), 2);
        let dedicated = plan.iter().find(|a| a.dedicated).unwrap();
        assert_eq!(dedicated.size, 1000);
        assert_eq!(dedicated.bindings, vec![(buffer(1), 0)]);
        assert!(dedicated.memory_type.decode().must_be_dedicated);
        let shared = plan.iter().find(|a| !a.dedicated).unwrap();
        assert_eq!(shared.bindings.len(), 2);
    }
}

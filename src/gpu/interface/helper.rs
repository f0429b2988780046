use crate::gpu::error::Result;
use crate::gpu::objects::{Buffer, CommandQueue, Memory, Texture};
use crate::gpu::structs::*;
use crate::utils::Handle;

/// Conveniences built on the core group.
pub trait HelperInterface {
    fn helper_version(&self) -> InterfaceVersion {
        INTERFACE_VERSION
    }

    /// Number of allocations `allocate_and_bind_memory` would make for `desc`.
    fn calculate_allocation_number(&mut self, desc: &ResourceGroupDesc) -> Result<u32>;

    /// Classifies, allocates and binds memory for every resource in `desc`.
    /// Nothing is left allocated when it fails.
    fn allocate_and_bind_memory(&mut self, desc: &ResourceGroupDesc) -> Result<Vec<Handle<Memory>>>;

    fn query_video_memory_info(&mut self, location: MemoryLocation) -> Result<VideoMemoryInfo>;

    /// Blocks until every submission made to `queue` has completed.
    fn wait_for_idle(&mut self, queue: Handle<CommandQueue>) -> Result<()>;
}

/// Create, classify, allocate and bind in one call.
pub trait ResourceAllocatorInterface {
    fn resource_allocator_version(&self) -> InterfaceVersion {
        INTERFACE_VERSION
    }

    fn allocate_buffer(&mut self, desc: &AllocateBufferDesc) -> Result<Handle<Buffer>>;
    fn allocate_texture(&mut self, desc: &AllocateTextureDesc) -> Result<Handle<Texture>>;
}

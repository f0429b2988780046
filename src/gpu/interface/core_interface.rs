use std::time::Duration;

use crate::gpu::config::DescriptorPoolDesc;
use crate::gpu::descriptor::{DescriptorHeapType, DescriptorRange};
use crate::gpu::error::Result;
use crate::gpu::objects::*;
use crate::gpu::structs::*;
use crate::utils::Handle;

/// Resource lifecycle, binding and submission. Every backend provides it.
///
/// Mutating calls on one object are not synchronised: callers serialise
/// access to a given buffer, pool or command buffer.
pub trait CoreInterface {
    fn core_version(&self) -> InterfaceVersion {
        INTERFACE_VERSION
    }

    fn get_device_desc(&self) -> &DeviceDesc;
    fn get_buffer_desc(&self, buffer: Handle<Buffer>) -> Result<BufferDesc>;
    fn get_texture_desc(&self, texture: Handle<Texture>) -> Result<TextureDesc>;
    fn get_format_support(&self, format: Format) -> FormatSupportBits;

    fn get_buffer_memory_desc(
        &self,
        buffer: Handle<Buffer>,
        location: MemoryLocation,
    ) -> Result<MemoryDesc>;
    fn get_texture_memory_desc(
        &self,
        texture: Handle<Texture>,
        location: MemoryLocation,
    ) -> Result<MemoryDesc>;

    /// Queues belong to the device; the same handle is returned each call.
    fn get_command_queue(&mut self, queue_type: QueueType) -> Result<Handle<CommandQueue>>;

    fn create_command_allocator(
        &mut self,
        queue: Handle<CommandQueue>,
    ) -> Result<Handle<CommandAllocator>>;
    fn create_command_buffer(
        &mut self,
        allocator: Handle<CommandAllocator>,
    ) -> Result<Handle<CommandBuffer>>;
    fn create_descriptor_pool(&mut self, desc: &DescriptorPoolDesc)
        -> Result<Handle<DescriptorPool>>;
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Handle<Buffer>>;
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Handle<Texture>>;
    fn create_buffer_view(&mut self, desc: &BufferViewDesc) -> Result<Handle<Descriptor>>;
    fn create_texture_view(&mut self, desc: &TextureViewDesc) -> Result<Handle<Descriptor>>;
    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<Handle<Descriptor>>;
    fn create_fence(&mut self, initial_value: u64) -> Result<Handle<Fence>>;
    fn create_query_pool(&mut self, desc: &QueryPoolDesc) -> Result<Handle<QueryPool>>;

    fn destroy_command_allocator(&mut self, allocator: Handle<CommandAllocator>) -> Result<()>;
    fn destroy_command_buffer(&mut self, cmd: Handle<CommandBuffer>) -> Result<()>;
    fn destroy_descriptor_pool(&mut self, pool: Handle<DescriptorPool>) -> Result<()>;
    fn destroy_buffer(&mut self, buffer: Handle<Buffer>) -> Result<()>;
    fn destroy_texture(&mut self, texture: Handle<Texture>) -> Result<()>;
    fn destroy_descriptor(&mut self, descriptor: Handle<Descriptor>) -> Result<()>;
    fn destroy_fence(&mut self, fence: Handle<Fence>) -> Result<()>;
    fn destroy_query_pool(&mut self, pool: Handle<QueryPool>) -> Result<()>;

    fn allocate_memory(&mut self, desc: &AllocateMemoryDesc) -> Result<Handle<Memory>>;
    fn bind_buffer_memory(&mut self, bindings: &[BufferMemoryBinding]) -> Result<()>;
    fn bind_texture_memory(&mut self, bindings: &[TextureMemoryBinding]) -> Result<()>;
    fn free_memory(&mut self, memory: Handle<Memory>) -> Result<()>;

    fn allocate_descriptors(
        &mut self,
        pool: Handle<DescriptorPool>,
        heap_type: DescriptorHeapType,
        count: u32,
    ) -> Result<DescriptorRange>;
    fn free_descriptors(
        &mut self,
        pool: Handle<DescriptorPool>,
        range: &DescriptorRange,
    ) -> Result<()>;
    /// Invalidates every range the pool issued without destroying its heaps.
    fn reset_descriptor_pool(&mut self, pool: Handle<DescriptorPool>) -> Result<()>;
    /// Writes `descriptors` into `range` starting at slot `offset` of the range.
    fn update_descriptors(
        &mut self,
        pool: Handle<DescriptorPool>,
        range: &DescriptorRange,
        offset: u32,
        descriptors: &[Handle<Descriptor>],
    ) -> Result<()>;

    fn begin_command_buffer(&mut self, cmd: Handle<CommandBuffer>) -> Result<()>;
    fn end_command_buffer(&mut self, cmd: Handle<CommandBuffer>) -> Result<()>;
    fn reset_command_allocator(&mut self, allocator: Handle<CommandAllocator>) -> Result<()>;
    fn cmd_set_descriptor_pool(
        &mut self,
        cmd: Handle<CommandBuffer>,
        pool: Handle<DescriptorPool>,
    ) -> Result<()>;
    fn cmd_copy_buffer(&mut self, cmd: Handle<CommandBuffer>, copy: &BufferCopy) -> Result<()>;

    fn queue_submit(&mut self, queue: Handle<CommandQueue>, desc: &QueueSubmitDesc) -> Result<()>;
    /// Blocks until `fence` reaches `value` or `timeout` elapses.
    /// [`WAIT_INFINITE`] never times out.
    fn wait(&mut self, fence: Handle<Fence>, value: u64, timeout: Duration) -> Result<()>;
    fn get_fence_value(&self, fence: Handle<Fence>) -> Result<u64>;

    fn map_buffer(&mut self, buffer: Handle<Buffer>, offset: u64, size: u64)
        -> Result<MappedMemory>;
    fn unmap_buffer(&mut self, buffer: Handle<Buffer>) -> Result<()>;

    fn set_debug_name(&mut self, object: Object, name: &str) -> Result<()>;
    /// Native handle as an integer, or [`NO_NATIVE_OBJECT`].
    fn get_native_object(&self, object: Object) -> u64;
}

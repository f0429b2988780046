//! Backend that implements every group and does nothing.
//!
//! Creation returns [`Handle::sentinel`], destruction is a no-op, accessors
//! return zeroed descriptions and no call ever fails. Used to exercise
//! dispatch without a driver.

use std::time::Duration;

use crate::gpu::config::DescriptorPoolDesc;
use crate::gpu::descriptor::{DescriptorHeapType, DescriptorRange};
use crate::gpu::error::Result;
use crate::gpu::interface::*;
use crate::gpu::objects::*;
use crate::gpu::structs::*;
use crate::utils::Handle;

#[derive(Debug)]
pub struct ConformanceBackend {
    desc: DeviceDesc,
    advertised: Capabilities,
    groups: Capabilities,
}

impl Default for ConformanceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ConformanceBackend {
    pub fn new() -> Self {
        Self::with_groups(Capabilities::all())
    }

    /// Provides only `groups`; core is always present.
    pub fn with_groups(groups: Capabilities) -> Self {
        let groups = groups | Capabilities::CORE;
        Self {
            desc: DeviceDesc {
                graphics_api: GraphicsApi::None,
                interface_version: INTERFACE_VERSION,
                adapter_name: "conformance".to_string(),
                ..Default::default()
            },
            advertised: groups,
            groups,
        }
    }

    /// Claims `advertised` while only handing out `groups`.
    #[cfg(test)]
    pub(crate) fn misadvertising(advertised: Capabilities, groups: Capabilities) -> Self {
        Self {
            advertised,
            ..Self::with_groups(groups)
        }
    }
}

impl DeviceBackend for ConformanceBackend {
    fn advertised(&self) -> Capabilities {
        self.advertised
    }

    fn core(&mut self) -> &mut dyn CoreInterface {
        self
    }

    fn helper(&mut self) -> Option<&mut dyn HelperInterface> {
        if self.groups.contains(Capabilities::HELPER) {
            Some(self)
        } else {
            None
        }
    }

    fn resource_allocator(&mut self) -> Option<&mut dyn ResourceAllocatorInterface> {
        if self.groups.contains(Capabilities::RESOURCE_ALLOCATOR) {
            Some(self)
        } else {
            None
        }
    }

    fn swap_chain(&mut self) -> Option<&mut dyn SwapChainInterface> {
        if self.groups.contains(Capabilities::SWAP_CHAIN) {
            Some(self)
        } else {
            None
        }
    }

    fn ray_tracing(&mut self) -> Option<&mut dyn RayTracingInterface> {
        if self.groups.contains(Capabilities::RAY_TRACING) {
            Some(self)
        } else {
            None
        }
    }

    fn mesh_shader(&mut self) -> Option<&mut dyn MeshShaderInterface> {
        if self.groups.contains(Capabilities::MESH_SHADER) {
            Some(self)
        } else {
            None
        }
    }

    fn streamer(&mut self) -> Option<&mut dyn StreamerInterface> {
        if self.groups.contains(Capabilities::STREAMER) {
            Some(self)
        } else {
            None
        }
    }

    fn low_latency(&mut self) -> Option<&mut dyn LowLatencyInterface> {
        if self.groups.contains(Capabilities::LOW_LATENCY) {
            Some(self)
        } else {
            None
        }
    }
}

impl CoreInterface for ConformanceBackend {
    fn get_device_desc(&self) -> &DeviceDesc {
        &self.desc
    }

    fn get_buffer_desc(&self, _buffer: Handle<Buffer>) -> Result<BufferDesc> {
        Ok(BufferDesc::default())
    }

    fn get_texture_desc(&self, _texture: Handle<Texture>) -> Result<TextureDesc> {
        Ok(TextureDesc::default())
    }

    fn get_format_support(&self, _format: Format) -> FormatSupportBits {
        FormatSupportBits::empty()
    }

    fn get_buffer_memory_desc(
        &self,
        _buffer: Handle<Buffer>,
        _location: MemoryLocation,
    ) -> Result<MemoryDesc> {
        Ok(MemoryDesc::default())
    }

    fn get_texture_memory_desc(
        &self,
        _texture: Handle<Texture>,
        _location: MemoryLocation,
    ) -> Result<MemoryDesc> {
        Ok(MemoryDesc::default())
    }

    fn get_command_queue(&mut self, _queue_type: QueueType) -> Result<Handle<CommandQueue>> {
        Ok(Handle::sentinel())
    }

    fn create_command_allocator(
        &mut self,
        _queue: Handle<CommandQueue>,
    ) -> Result<Handle<CommandAllocator>> {
        Ok(Handle::sentinel())
    }

    fn create_command_buffer(
        &mut self,
        _allocator: Handle<CommandAllocator>,
    ) -> Result<Handle<CommandBuffer>> {
        Ok(Handle::sentinel())
    }

    fn create_descriptor_pool(
        &mut self,
        _desc: &DescriptorPoolDesc,
    ) -> Result<Handle<DescriptorPool>> {
        Ok(Handle::sentinel())
    }

    fn create_buffer(&mut self, _desc: &BufferDesc) -> Result<Handle<Buffer>> {
        Ok(Handle::sentinel())
    }

    fn create_texture(&mut self, _desc: &TextureDesc) -> Result<Handle<Texture>> {
        Ok(Handle::sentinel())
    }

    fn create_buffer_view(&mut self, _desc: &BufferViewDesc) -> Result<Handle<Descriptor>> {
        Ok(Handle::sentinel())
    }

    fn create_texture_view(&mut self, _desc: &TextureViewDesc) -> Result<Handle<Descriptor>> {
        Ok(Handle::sentinel())
    }

    fn create_sampler(&mut self, _desc: &SamplerDesc) -> Result<Handle<Descriptor>> {
        Ok(Handle::sentinel())
    }

    fn create_fence(&mut self, _initial_value: u64) -> Result<Handle<Fence>> {
        Ok(Handle::sentinel())
    }

    fn create_query_pool(&mut self, _desc: &QueryPoolDesc) -> Result<Handle<QueryPool>> {
        Ok(Handle::sentinel())
    }

    fn destroy_command_allocator(&mut self, _allocator: Handle<CommandAllocator>) -> Result<()> {
        Ok(())
    }

    fn destroy_command_buffer(&mut self, _cmd: Handle<CommandBuffer>) -> Result<()> {
        Ok(())
    }

    fn destroy_descriptor_pool(&mut self, _pool: Handle<DescriptorPool>) -> Result<()> {
        Ok(())
    }

    fn destroy_buffer(&mut self, _buffer: Handle<Buffer>) -> Result<()> {
        Ok(())
    }

    fn destroy_texture(&mut self, _texture: Handle<Texture>) -> Result<()> {
        Ok(())
    }

    fn destroy_descriptor(&mut self, _descriptor: Handle<Descriptor>) -> Result<()> {
        Ok(())
    }

    fn destroy_fence(&mut self, _fence: Handle<Fence>) -> Result<()> {
        Ok(())
    }

    fn destroy_query_pool(&mut self, _pool: Handle<QueryPool>) -> Result<()> {
        Ok(())
    }

    fn allocate_memory(&mut self, _desc: &AllocateMemoryDesc) -> Result<Handle<Memory>> {
        Ok(Handle::sentinel())
    }

    fn bind_buffer_memory(&mut self, _bindings: &[BufferMemoryBinding]) -> Result<()> {
        Ok(())
    }

    fn bind_texture_memory(&mut self, _bindings: &[TextureMemoryBinding]) -> Result<()> {
        Ok(())
    }

    fn free_memory(&mut self, _memory: Handle<Memory>) -> Result<()> {
        Ok(())
    }

    fn allocate_descriptors(
        &mut self,
        _pool: Handle<DescriptorPool>,
        heap_type: DescriptorHeapType,
        count: u32,
    ) -> Result<DescriptorRange> {
        Ok(DescriptorRange {
            heap_type,
            count,
            ..Default::default()
        })
    }

    fn free_descriptors(
        &mut self,
        _pool: Handle<DescriptorPool>,
        _range: &DescriptorRange,
    ) -> Result<()> {
        Ok(())
    }

    fn reset_descriptor_pool(&mut self, _pool: Handle<DescriptorPool>) -> Result<()> {
        Ok(())
    }

    fn update_descriptors(
        &mut self,
        _pool: Handle<DescriptorPool>,
        _range: &DescriptorRange,
        _offset: u32,
        _descriptors: &[Handle<Descriptor>],
    ) -> Result<()> {
        Ok(())
    }

    fn begin_command_buffer(&mut self, _cmd: Handle<CommandBuffer>) -> Result<()> {
        Ok(())
    }

    fn end_command_buffer(&mut self, _cmd: Handle<CommandBuffer>) -> Result<()> {
        Ok(())
    }

    fn reset_command_allocator(&mut self, _allocator: Handle<CommandAllocator>) -> Result<()> {
        Ok(())
    }

    fn cmd_set_descriptor_pool(
        &mut self,
        _cmd: Handle<CommandBuffer>,
        _pool: Handle<DescriptorPool>,
    ) -> Result<()> {
        Ok(())
    }

    fn cmd_copy_buffer(&mut self, _cmd: Handle<CommandBuffer>, _copy: &BufferCopy) -> Result<()> {
        Ok(())
    }

    fn queue_submit(
        &mut self,
        _queue: Handle<CommandQueue>,
        _desc: &QueueSubmitDesc,
    ) -> Result<()> {
        Ok(())
    }

    fn wait(&mut self, _fence: Handle<Fence>, _value: u64, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    fn get_fence_value(&self, _fence: Handle<Fence>) -> Result<u64> {
        Ok(0)
    }

    fn map_buffer(
        &mut self,
        _buffer: Handle<Buffer>,
        _offset: u64,
        _size: u64,
    ) -> Result<MappedMemory> {
        Ok(MappedMemory::default())
    }

    fn unmap_buffer(&mut self, _buffer: Handle<Buffer>) -> Result<()> {
        Ok(())
    }

    fn set_debug_name(&mut self, _object: Object, _name: &str) -> Result<()> {
        Ok(())
    }

    fn get_native_object(&self, _object: Object) -> u64 {
        NO_NATIVE_OBJECT
    }
}

impl HelperInterface for ConformanceBackend {
    fn calculate_allocation_number(&mut self, _desc: &ResourceGroupDesc) -> Result<u32> {
        Ok(0)
    }

    fn allocate_and_bind_memory(
        &mut self,
        _desc: &ResourceGroupDesc,
    ) -> Result<Vec<Handle<Memory>>> {
        Ok(Vec::new())
    }

    fn query_video_memory_info(&mut self, _location: MemoryLocation) -> Result<VideoMemoryInfo> {
        Ok(VideoMemoryInfo::default())
    }

    fn wait_for_idle(&mut self, _queue: Handle<CommandQueue>) -> Result<()> {
        Ok(())
    }
}

impl ResourceAllocatorInterface for ConformanceBackend {
    fn allocate_buffer(&mut self, _desc: &AllocateBufferDesc) -> Result<Handle<Buffer>> {
        Ok(Handle::sentinel())
    }

    fn allocate_texture(&mut self, _desc: &AllocateTextureDesc) -> Result<Handle<Texture>> {
        Ok(Handle::sentinel())
    }
}

impl SwapChainInterface for ConformanceBackend {
    fn create_swap_chain(&mut self, _desc: &SwapChainDesc) -> Result<Handle<SwapChain>> {
        Ok(Handle::sentinel())
    }

    fn destroy_swap_chain(&mut self, _swap_chain: Handle<SwapChain>) -> Result<()> {
        Ok(())
    }

    fn get_swap_chain_textures(
        &mut self,
        _swap_chain: Handle<SwapChain>,
    ) -> Result<Vec<Handle<Texture>>> {
        Ok(Vec::new())
    }

    fn acquire_next_texture(&mut self, _swap_chain: Handle<SwapChain>) -> Result<u32> {
        Ok(0)
    }

    fn queue_present(&mut self, _swap_chain: Handle<SwapChain>) -> Result<()> {
        Ok(())
    }
}

impl RayTracingInterface for ConformanceBackend {
    fn get_acceleration_structure_memory_desc(
        &mut self,
        _acceleration_structure: Handle<AccelerationStructure>,
        _location: MemoryLocation,
    ) -> Result<MemoryDesc> {
        Ok(MemoryDesc::default())
    }

    fn create_acceleration_structure(
        &mut self,
        _desc: &AccelerationStructureDesc,
    ) -> Result<Handle<AccelerationStructure>> {
        Ok(Handle::sentinel())
    }

    fn destroy_acceleration_structure(
        &mut self,
        _acceleration_structure: Handle<AccelerationStructure>,
    ) -> Result<()> {
        Ok(())
    }

    fn bind_acceleration_structure_memory(
        &mut self,
        _bindings: &[AccelerationStructureMemoryBinding],
    ) -> Result<()> {
        Ok(())
    }

    fn get_acceleration_structure_handle(
        &mut self,
        _acceleration_structure: Handle<AccelerationStructure>,
    ) -> Result<u64> {
        Ok(0)
    }

    fn get_acceleration_structure_build_scratch_size(
        &mut self,
        _acceleration_structure: Handle<AccelerationStructure>,
    ) -> Result<u64> {
        Ok(0)
    }
}

impl MeshShaderInterface for ConformanceBackend {
    fn cmd_draw_mesh_tasks(
        &mut self,
        _cmd: Handle<CommandBuffer>,
        _x: u32,
        _y: u32,
        _z: u32,
    ) -> Result<()> {
        Ok(())
    }

    fn cmd_draw_mesh_tasks_indirect(
        &mut self,
        _cmd: Handle<CommandBuffer>,
        _buffer: Handle<Buffer>,
        _offset: u64,
        _draw_num: u32,
        _stride: u32,
    ) -> Result<()> {
        Ok(())
    }
}

impl StreamerInterface for ConformanceBackend {
    fn create_streamer(&mut self, _desc: &StreamerDesc) -> Result<Handle<Streamer>> {
        Ok(Handle::sentinel())
    }

    fn destroy_streamer(&mut self, _streamer: Handle<Streamer>) -> Result<()> {
        Ok(())
    }

    fn add_buffer_update_request(
        &mut self,
        _streamer: Handle<Streamer>,
        _request: &BufferUpdateRequest,
    ) -> Result<u64> {
        Ok(0)
    }

    fn copy_streamer_update_requests(&mut self, _streamer: Handle<Streamer>) -> Result<()> {
        Ok(())
    }

    fn cmd_upload_streamer_update_requests(
        &mut self,
        _cmd: Handle<CommandBuffer>,
        _streamer: Handle<Streamer>,
    ) -> Result<()> {
        Ok(())
    }
}

impl LowLatencyInterface for ConformanceBackend {
    fn set_latency_sleep_mode(
        &mut self,
        _swap_chain: Handle<SwapChain>,
        _mode: &LatencySleepMode,
    ) -> Result<()> {
        Ok(())
    }

    fn set_latency_marker(
        &mut self,
        _swap_chain: Handle<SwapChain>,
        _marker: LatencyMarker,
    ) -> Result<()> {
        Ok(())
    }

    fn latency_sleep(&mut self, _swap_chain: Handle<SwapChain>) -> Result<()> {
        Ok(())
    }

    fn get_latency_report(&mut self, _swap_chain: Handle<SwapChain>) -> Result<LatencyReport> {
        Ok(LatencyReport::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_returns_the_sentinel() {
        let mut backend = ConformanceBackend::new();
        let buffer = backend.create_buffer(&BufferDesc::default()).unwrap();
        assert!(buffer.is_sentinel());
        assert!(!buffer.is_null());
        assert_eq!(backend.get_native_object(Object::Buffer(buffer)), NO_NATIVE_OBJECT);
        assert!(backend.map_buffer(buffer, 0, 16).unwrap().is_null());
    }

    #[test]
    fn every_group_is_provided() {
        let mut backend = ConformanceBackend::new();
        assert_eq!(provided_groups(&mut backend), backend.advertised());
        assert_eq!(backend.advertised(), Capabilities::all());
    }

    #[test]
    fn subsets_hand_out_only_their_tables() {
        let mut backend = ConformanceBackend::with_groups(Capabilities::HELPER);
        assert_eq!(
            provided_groups(&mut backend),
            Capabilities::CORE | Capabilities::HELPER
        );
        assert!(backend.swap_chain().is_none());
    }
}

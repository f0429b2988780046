//! Optional groups. A backend exposes them only when the device supports
//! the feature; they forward to native calls without extra logic.

use crate::gpu::error::Result;
use crate::gpu::objects::*;
use crate::gpu::structs::*;
use crate::utils::Handle;

pub trait SwapChainInterface {
    fn swap_chain_version(&self) -> InterfaceVersion {
        INTERFACE_VERSION
    }

    fn create_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<Handle<SwapChain>>;
    fn destroy_swap_chain(&mut self, swap_chain: Handle<SwapChain>) -> Result<()>;
    fn get_swap_chain_textures(&mut self, swap_chain: Handle<SwapChain>) -> Result<Vec<Handle<Texture>>>;
    /// Index of the texture to render into next.
    fn acquire_next_texture(&mut self, swap_chain: Handle<SwapChain>) -> Result<u32>;
    fn queue_present(&mut self, swap_chain: Handle<SwapChain>) -> Result<()>;
}

pub trait RayTracingInterface {
    fn ray_tracing_version(&self) -> InterfaceVersion {
        INTERFACE_VERSION
    }

    fn get_acceleration_structure_memory_desc(
        &mut self,
        acceleration_structure: Handle<AccelerationStructure>,
        location: MemoryLocation,
    ) -> Result<MemoryDesc>;
    fn create_acceleration_structure(
        &mut self,
        desc: &AccelerationStructureDesc,
    ) -> Result<Handle<AccelerationStructure>>;
    fn destroy_acceleration_structure(
        &mut self,
        acceleration_structure: Handle<AccelerationStructure>,
    ) -> Result<()>;
    fn bind_acceleration_structure_memory(
        &mut self,
        bindings: &[AccelerationStructureMemoryBinding],
    ) -> Result<()>;
    /// Device address used by top-level instances.
    fn get_acceleration_structure_handle(
        &mut self,
        acceleration_structure: Handle<AccelerationStructure>,
    ) -> Result<u64>;
    fn get_acceleration_structure_build_scratch_size(
        &mut self,
        acceleration_structure: Handle<AccelerationStructure>,
    ) -> Result<u64>;
}

pub trait MeshShaderInterface {
    fn mesh_shader_version(&self) -> InterfaceVersion {
        INTERFACE_VERSION
    }

    fn cmd_draw_mesh_tasks(&mut self, cmd: Handle<CommandBuffer>, x: u32, y: u32, z: u32)
        -> Result<()>;
    fn cmd_draw_mesh_tasks_indirect(
        &mut self,
        cmd: Handle<CommandBuffer>,
        buffer: Handle<Buffer>,
        offset: u64,
        draw_num: u32,
        stride: u32,
    ) -> Result<()>;
}

pub trait StreamerInterface {
    fn streamer_version(&self) -> InterfaceVersion {
        INTERFACE_VERSION
    }

    fn create_streamer(&mut self, desc: &StreamerDesc) -> Result<Handle<Streamer>>;
    fn destroy_streamer(&mut self, streamer: Handle<Streamer>) -> Result<()>;
    /// Returns the byte offset of the data inside the streamer's ring buffer.
    fn add_buffer_update_request(
        &mut self,
        streamer: Handle<Streamer>,
        request: &BufferUpdateRequest,
    ) -> Result<u64>;
    fn copy_streamer_update_requests(&mut self, streamer: Handle<Streamer>) -> Result<()>;
    fn cmd_upload_streamer_update_requests(
        &mut self,
        cmd: Handle<CommandBuffer>,
        streamer: Handle<Streamer>,
    ) -> Result<()>;
}

pub trait LowLatencyInterface {
    fn low_latency_version(&self) -> InterfaceVersion {
        INTERFACE_VERSION
    }

    fn set_latency_sleep_mode(
        &mut self,
        swap_chain: Handle<SwapChain>,
        mode: &LatencySleepMode,
    ) -> Result<()>;
    fn set_latency_marker(&mut self, swap_chain: Handle<SwapChain>, marker: LatencyMarker)
        -> Result<()>;
    fn latency_sleep(&mut self, swap_chain: Handle<SwapChain>) -> Result<()>;
    fn get_latency_report(&mut self, swap_chain: Handle<SwapChain>) -> Result<LatencyReport>;
}

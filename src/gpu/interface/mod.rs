//! Capability tables.
//!
//! Each operation group is its own object-safe trait. A backend implements
//! [`CoreInterface`] plus whichever other groups it supports, and hands them
//! out through [`DeviceBackend`].

pub mod core_interface;
pub mod extensions;
pub mod helper;

use bitflags::bitflags;

pub use core_interface::CoreInterface;
pub use extensions::{
    LowLatencyInterface, MeshShaderInterface, RayTracingInterface, StreamerInterface,
    SwapChainInterface,
};
pub use helper::{HelperInterface, ResourceAllocatorInterface};

bitflags! {
    #[repr(C)]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const CORE               = 0x1;
        const HELPER             = 0x2;
        const RESOURCE_ALLOCATOR = 0x4;
        const SWAP_CHAIN         = 0x8;
        const RAY_TRACING        = 0x10;
        const MESH_SHADER        = 0x20;
        const STREAMER           = 0x40;
        const LOW_LATENCY        = 0x80;
    }
}

/// A concrete backend: the core group plus accessors for the optional ones.
///
/// An accessor returning `None` for a group listed in [`Self::advertised`]
/// is a construction defect.
pub trait DeviceBackend: CoreInterface + Send {
    /// Groups this backend claims to provide.
    fn advertised(&self) -> Capabilities;

    fn core(&mut self) -> &mut dyn CoreInterface;

    fn helper(&mut self) -> Option<&mut dyn HelperInterface> {
        None
    }

    fn resource_allocator(&mut self) -> Option<&mut dyn ResourceAllocatorInterface> {
        None
    }

    fn swap_chain(&mut self) -> Option<&mut dyn SwapChainInterface> {
        None
    }

    fn ray_tracing(&mut self) -> Option<&mut dyn RayTracingInterface> {
        None
    }

    fn mesh_shader(&mut self) -> Option<&mut dyn MeshShaderInterface> {
        None
    }

    fn streamer(&mut self) -> Option<&mut dyn StreamerInterface> {
        None
    }

    fn low_latency(&mut self) -> Option<&mut dyn LowLatencyInterface> {
        None
    }
}

/// Groups whose accessor actually yields a table.
pub(crate) fn provided_groups(backend: &mut dyn DeviceBackend) -> Capabilities {
    let mut provided = Capabilities::CORE;
    provided.set(Capabilities::HELPER, backend.helper().is_some());
    provided.set(
        Capabilities::RESOURCE_ALLOCATOR,
        backend.resource_allocator().is_some(),
    );
    provided.set(Capabilities::SWAP_CHAIN, backend.swap_chain().is_some());
    provided.set(Capabilities::RAY_TRACING, backend.ray_tracing().is_some());
    provided.set(Capabilities::MESH_SHADER, backend.mesh_shader().is_some());
    provided.set(Capabilities::STREAMER, backend.streamer().is_some());
    provided.set(Capabilities::LOW_LATENCY, backend.low_latency().is_some());
    provided
}

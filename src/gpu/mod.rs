//! Backend-agnostic device abstraction.
//!
//! A [`Device`] is created from a [`DeviceCreationInfo`], owns one backend
//! and exposes the capability tables that backend provides. Objects are
//! addressed through typed [`Handle`](crate::utils::Handle)s.

pub mod config;
pub mod conformance;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod interface;
pub mod memory;
pub mod objects;
pub mod structs;
pub mod validation;
#[cfg(feature = "rhi-vulkan")]
pub mod vulkan;

pub use config::*;
pub use conformance::ConformanceBackend;
pub use descriptor::{DescriptorHandle, DescriptorHeapType, DescriptorRange};
pub use device::Device;
pub use error::{GPUError, Result, Status};
pub use interface::*;
pub use memory::MemoryTypeId;
pub use objects::*;
pub use structs::*;
pub use validation::ValidationDevice;
#[cfg(feature = "rhi-vulkan")]
pub use vulkan::VulkanBackend;

//! Device creation and capability discovery.
//!
//! A [`Device`] owns one backend, optionally wrapped in the validation layer,
//! and hands out the capability tables it discovered at creation.

use super::config::DeviceCreationInfo;
use super::conformance::ConformanceBackend;
use super::error::{GPUError, Result};
use super::interface::*;
use super::structs::{GraphicsApi, InterfaceVersion, INTERFACE_VERSION};
use super::validation::ValidationDevice;

pub struct Device {
    backend: Box<dyn DeviceBackend>,
    capabilities: Capabilities,
    info: DeviceCreationInfo,
    validated: bool,
}

impl Device {
    /// Creates the backend selected by `info.graphics_api`.
    pub fn new(info: &DeviceCreationInfo) -> Result<Self> {
        let backend: Box<dyn DeviceBackend> = match info.graphics_api {
            GraphicsApi::None => Box::new(ConformanceBackend::new()),
            #[cfg(feature = "rhi-vulkan")]
            GraphicsApi::Vulkan => Box::new(super::vulkan::VulkanBackend::new(info)?),
            #[cfg(not(feature = "rhi-vulkan"))]
            GraphicsApi::Vulkan => {
                log::error!("Vulkan requested but the rhi-vulkan feature is disabled");
                return Err(GPUError::Unsupported("Vulkan backend not compiled in"));
            }
            GraphicsApi::D3D11 | GraphicsApi::D3D12 => {
                log::error!("{:?} has no backend in this build", info.graphics_api);
                return Err(GPUError::Unsupported("Direct3D backends are not available"));
            }
        };
        Ok(Self::from_backend(backend, info))
    }

    /// Builds a device over an already created backend.
    pub fn from_backend(backend: Box<dyn DeviceBackend>, info: &DeviceCreationInfo) -> Self {
        let validated = info.validation_enabled();
        let mut backend = if validated {
            Box::new(ValidationDevice::new(backend, info.descriptor_pool)) as Box<dyn DeviceBackend>
        } else {
            backend
        };

        let advertised = backend.advertised() | Capabilities::CORE;
        let provided = provided_groups(backend.as_mut());
        let missing = advertised - provided;
        if !missing.is_empty() {
            log::error!(
                "Backend advertises {:?} but does not provide those tables; dropping them",
                missing
            );
            debug_assert!(missing.is_empty(), "capability table left unbound: {:?}", missing);
        }
        let capabilities = advertised & provided;

        let desc = backend.get_device_desc();
        log::info!(
            "Created {:?} device '{}' (interface {}.{}, validation {}) with {:?}",
            desc.graphics_api,
            desc.adapter_name,
            desc.interface_version.major,
            desc.interface_version.minor,
            if validated { "on" } else { "off" },
            capabilities
        );

        Self {
            backend,
            capabilities,
            info: *info,
            validated,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn creation_info(&self) -> &DeviceCreationInfo {
        &self.info
    }

    pub fn graphics_api(&self) -> GraphicsApi {
        self.backend.get_device_desc().graphics_api
    }

    pub fn interface_version(&self) -> InterfaceVersion {
        self.backend.get_device_desc().interface_version
    }

    /// Fails when the device implements an older or incompatible interface
    /// than the caller was built against.
    pub fn require_version(&self, required: InterfaceVersion) -> Result<()> {
        let version = self.interface_version();
        if version.satisfies(required) {
            Ok(())
        } else {
            log::error!(
                "Interface {}.{} requested, device implements {}.{}",
                required.major,
                required.minor,
                version.major,
                version.minor
            );
            Err(GPUError::Unsupported("interface version mismatch"))
        }
    }

    /// Version a group reports, or `None` when the group is undiscovered.
    pub fn group_version(&mut self, group: Capabilities) -> Option<InterfaceVersion> {
        if group.bits().count_ones() != 1 || !self.capabilities.contains(group) {
            return None;
        }
        if group == Capabilities::CORE {
            return Some(self.backend.core().core_version());
        }
        if group == Capabilities::HELPER {
            return self.backend.helper().map(|t| t.helper_version());
        }
        if group == Capabilities::RESOURCE_ALLOCATOR {
            return self
                .backend
                .resource_allocator()
                .map(|t| t.resource_allocator_version());
        }
        if group == Capabilities::SWAP_CHAIN {
            return self.backend.swap_chain().map(|t| t.swap_chain_version());
        }
        if group == Capabilities::RAY_TRACING {
            return self.backend.ray_tracing().map(|t| t.ray_tracing_version());
        }
        if group == Capabilities::MESH_SHADER {
            return self.backend.mesh_shader().map(|t| t.mesh_shader_version());
        }
        if group == Capabilities::STREAMER {
            return self.backend.streamer().map(|t| t.streamer_version());
        }
        if group == Capabilities::LOW_LATENCY {
            return self.backend.low_latency().map(|t| t.low_latency_version());
        }
        None
    }

    pub fn core(&mut self) -> &mut dyn CoreInterface {
        self.backend.core()
    }

    fn discovered(&self, group: Capabilities, name: &'static str) -> Result<()> {
        if self.capabilities.contains(group) {
            Ok(())
        } else {
            Err(GPUError::Unsupported(name))
        }
    }

    pub fn helper(&mut self) -> Result<&mut dyn HelperInterface> {
        self.discovered(Capabilities::HELPER, "helper")?;
        self.backend
            .helper()
            .ok_or(GPUError::Unsupported("helper"))
    }

    pub fn resource_allocator(&mut self) -> Result<&mut dyn ResourceAllocatorInterface> {
        self.discovered(Capabilities::RESOURCE_ALLOCATOR, "resource allocator")?;
        self.backend
            .resource_allocator()
            .ok_or(GPUError::Unsupported("resource allocator"))
    }

    pub fn swap_chain(&mut self) -> Result<&mut dyn SwapChainInterface> {
        self.discovered(Capabilities::SWAP_CHAIN, "swap chain")?;
        self.backend
            .swap_chain()
            .ok_or(GPUError::Unsupported("swap chain"))
    }

    pub fn ray_tracing(&mut self) -> Result<&mut dyn RayTracingInterface> {
        self.discovered(Capabilities::RAY_TRACING, "ray tracing")?;
        self.backend
            .ray_tracing()
            .ok_or(GPUError::Unsupported("ray tracing"))
    }

    pub fn mesh_shader(&mut self) -> Result<&mut dyn MeshShaderInterface> {
        self.discovered(Capabilities::MESH_SHADER, "mesh shader")?;
        self.backend
            .mesh_shader()
            .ok_or(GPUError::Unsupported("mesh shader"))
    }

    pub fn streamer(&mut self) -> Result<&mut dyn StreamerInterface> {
        self.discovered(Capabilities::STREAMER, "streamer")?;
        self.backend
            .streamer()
            .ok_or(GPUError::Unsupported("streamer"))
    }

    pub fn low_latency(&mut self) -> Result<&mut dyn LowLatencyInterface> {
        self.discovered(Capabilities::LOW_LATENCY, "low latency")?;
        self.backend
            .low_latency()
            .ok_or(GPUError::Unsupported("low latency"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn conformance_device_discovers_every_group() {
        std::env::remove_var(crate::gpu::config::VALIDATION_ENV);
        let mut device = Device::new(&DeviceCreationInfo::default()).unwrap();
        assert_eq!(device.capabilities(), Capabilities::all());
        assert_eq!(device.graphics_api(), GraphicsApi::None);
        assert!(!device.is_validated());
        assert!(device.helper().is_ok());
        assert_eq!(
            device.group_version(Capabilities::STREAMER),
            Some(INTERFACE_VERSION)
        );
    }

    #[test]
    #[serial]
    fn newer_interface_requests_are_rejected() {
        std::env::remove_var(crate::gpu::config::VALIDATION_ENV);
        let device = Device::from_backend(
            Box::new(ConformanceBackend::new()),
            &DeviceCreationInfo::default(),
        );
        assert!(device.require_version(INTERFACE_VERSION).is_ok());
        let newer = InterfaceVersion {
            major: INTERFACE_VERSION.major,
            minor: INTERFACE_VERSION.minor + 1,
        };
        assert!(matches!(
            device.require_version(newer),
            Err(GPUError::Unsupported(_))
        ));
    }

    #[test]
    fn d3d_requests_are_unsupported() {
        let info = DeviceCreationInfo {
            graphics_api: GraphicsApi::D3D12,
            ..Default::default()
        };
        assert!(matches!(Device::new(&info), Err(GPUError::Unsupported(_))));
    }

    #[test]
    #[serial]
    #[cfg_attr(debug_assertions, should_panic)]
    fn unbound_tables_are_a_construction_defect() {
        std::env::remove_var(crate::gpu::config::VALIDATION_ENV);
        let mut device = Device::from_backend(
            Box::new(ConformanceBackend::misadvertising(
                Capabilities::CORE | Capabilities::HELPER,
                Capabilities::CORE,
            )),
            &DeviceCreationInfo::default(),
        );
        assert!(!device.capabilities().contains(Capabilities::HELPER));
        assert!(matches!(device.helper(), Err(GPUError::Unsupported(_))));
    }

    #[test]
    #[serial]
    fn undiscovered_groups_are_unsupported() {
        std::env::remove_var(crate::gpu::config::VALIDATION_ENV);
        let mut device = Device::from_backend(
            Box::new(ConformanceBackend::with_groups(Capabilities::HELPER)),
            &DeviceCreationInfo::default(),
        );
        assert_eq!(
            device.capabilities(),
            Capabilities::CORE | Capabilities::HELPER
        );
        assert!(device.helper().is_ok());
        assert!(matches!(device.ray_tracing(), Err(GPUError::Unsupported(_))));
        assert_eq!(device.group_version(Capabilities::RAY_TRACING), None);
    }

    #[test]
    #[serial]
    fn validation_keeps_the_discovered_groups() {
        std::env::remove_var(crate::gpu::config::VALIDATION_ENV);
        let info = DeviceCreationInfo {
            enable_validation: true,
            ..Default::default()
        };
        let mut device = Device::from_backend(
            Box::new(ConformanceBackend::with_groups(Capabilities::STREAMER)),
            &info,
        );
        assert!(device.is_validated());
        assert_eq!(
            device.capabilities(),
            Capabilities::CORE | Capabilities::STREAMER
        );
        assert!(device.streamer().is_ok());
        assert!(device.swap_chain().is_err());
    }
}

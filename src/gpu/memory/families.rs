//! Native memory metadata per backend family, flattened into
//! [`MemoryKind`] lists for the classifier.
//!
//! | family | heap category            | heap flags                     |
//! |--------|--------------------------|--------------------------------|
//! | Vulkan | memory type index        | `VkMemoryPropertyFlags`        |
//! | D3D12  | `D3D12_HEAP_TYPE`        | `D3D12_HEAP_FLAGS`             |
//! | D3D11  | `D3D11_USAGE`            | `D3D11_CPU_ACCESS_FLAG >> 16`  |

use super::classifier::{classify, ClassifyRequest, MemoryKind, MemoryPropertyBits};
use super::encoding::MemoryTypeId;
use crate::gpu::error::{GPUError, Result};
use crate::gpu::structs::{MemoryDesc, MemoryLocation};

/// What kind of resource is being placed. Only matters where the native API
/// segregates heaps by resource class.
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceClass {
    #[default]
    Buffer,
    Texture,
    /// Color or depth-stencil attachment.
    RenderTarget,
}

pub trait MemoryFamily {
    /// Native kinds available to a resource of `class`, indexed by mask bit.
    fn memory_kinds(&self, class: ResourceClass) -> Vec<MemoryKind>;

    fn classify(&self, class: ResourceClass, request: &ClassifyRequest) -> Result<MemoryTypeId> {
        classify(&self.memory_kinds(class), request)
    }
}

//-------------------------------------------------------------------------
// Vulkan

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct VulkanMemoryLayout {
    /// `propertyFlags` of each `VkMemoryType`, in native order.
    pub type_property_flags: Vec<u32>,
}

impl VulkanMemoryLayout {
    pub fn new(type_property_flags: impl IntoIterator<Item = u32>) -> Self {
        Self {
            type_property_flags: type_property_flags.into_iter().collect(),
        }
    }

    /// Native memory type index encoded in `id`.
    pub fn memory_type_index(id: MemoryTypeId) -> u32 {
        id.decode().heap_category as u32
    }

    /// Placement for a resource with the given driver requirements. A driver
    /// that prefers or requires a dedicated allocation gets one, and the
    /// encoded type id carries the dedicated bit.
    pub fn memory_desc(
        &self,
        class: ResourceClass,
        location: MemoryLocation,
        requirements: &VulkanRequirements,
    ) -> Result<MemoryDesc> {
        let request = ClassifyRequest {
            location,
            type_mask: requirements.type_mask,
            dedicated_hint: requirements.wants_dedicated(),
        };
        let memory_type = self.classify(class, &request)?;
        Ok(MemoryDesc {
            size: requirements.size,
            alignment: u32::try_from(requirements.alignment).unwrap_or(u32::MAX),
            memory_type,
            must_be_dedicated: memory_type.is_dedicated(),
        })
    }
}

/// `VkMemoryRequirements` plus the `VkMemoryDedicatedRequirements` answer.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct VulkanRequirements {
    pub size: u64,
    pub alignment: u64,
    pub type_mask: u32,
    pub prefers_dedicated: bool,
    pub requires_dedicated: bool,
}

impl VulkanRequirements {
    pub fn wants_dedicated(&self) -> bool {
        self.prefers_dedicated || self.requires_dedicated
    }
}

impl MemoryFamily for VulkanMemoryLayout {
    fn memory_kinds(&self, _class: ResourceClass) -> Vec<MemoryKind> {
        // Vulkan property bits share values with MemoryPropertyBits.
        self.type_property_flags
            .iter()
            .enumerate()
            .map(|(index, flags)| MemoryKind {
                heap_category: index as u8,
                heap_flags: *flags as u16,
                properties: MemoryPropertyBits::from_bits_truncate(*flags),
            })
            .collect()
    }
}

//-------------------------------------------------------------------------
// D3D12

pub const D3D12_HEAP_TYPE_DEFAULT: u8 = 1;
pub const D3D12_HEAP_TYPE_UPLOAD: u8 = 2;
pub const D3D12_HEAP_TYPE_READBACK: u8 = 3;
pub const D3D12_HEAP_TYPE_GPU_UPLOAD: u8 = 5;

pub const D3D12_HEAP_FLAG_NONE: u16 = 0;
pub const D3D12_HEAP_FLAG_ALLOW_ONLY_BUFFERS: u16 = 0xc0;
pub const D3D12_HEAP_FLAG_ALLOW_ONLY_NON_RT_DS_TEXTURES: u16 = 0x44;
pub const D3D12_HEAP_FLAG_ALLOW_ONLY_RT_DS_TEXTURES: u16 = 0x84;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct D3D12MemoryLayout {
    /// `D3D12_RESOURCE_HEAP_TIER`; tier 1 keeps buffers, textures and
    /// attachments in separate heaps.
    pub resource_heap_tier: u8,
    pub uma: bool,
    pub cache_coherent_uma: bool,
    pub gpu_upload_heap_supported: bool,
}

impl D3D12MemoryLayout {
    fn heap_flags(&self, class: ResourceClass) -> u16 {
        if self.resource_heap_tier >= 2 {
            return D3D12_HEAP_FLAG_NONE;
        }
        match class {
            ResourceClass::Buffer => D3D12_HEAP_FLAG_ALLOW_ONLY_BUFFERS,
            ResourceClass::Texture => D3D12_HEAP_FLAG_ALLOW_ONLY_NON_RT_DS_TEXTURES,
            ResourceClass::RenderTarget => D3D12_HEAP_FLAG_ALLOW_ONLY_RT_DS_TEXTURES,
        }
    }

    pub fn heap_type(id: MemoryTypeId) -> u8 {
        id.decode().heap_category
    }
}

impl MemoryFamily for D3D12MemoryLayout {
    fn memory_kinds(&self, class: ResourceClass) -> Vec<MemoryKind> {
        use MemoryPropertyBits as P;
        let heap_flags = self.heap_flags(class);

        let mut upload = P::HOST_VISIBLE | P::HOST_COHERENT;
        if self.uma && self.cache_coherent_uma {
            upload |= P::DEVICE_LOCAL;
        }

        let mut kinds = vec![
            MemoryKind {
                heap_category: D3D12_HEAP_TYPE_DEFAULT,
                heap_flags,
                properties: P::DEVICE_LOCAL,
            },
            MemoryKind {
                heap_category: D3D12_HEAP_TYPE_UPLOAD,
                heap_flags,
                properties: upload,
            },
            MemoryKind {
                heap_category: D3D12_HEAP_TYPE_READBACK,
                heap_flags,
                properties: P::HOST_VISIBLE | P::HOST_COHERENT | P::HOST_CACHED,
            },
        ];

        if self.gpu_upload_heap_supported {
            kinds.push(MemoryKind {
                heap_category: D3D12_HEAP_TYPE_GPU_UPLOAD,
                heap_flags,
                properties: P::DEVICE_LOCAL | P::HOST_VISIBLE | P::HOST_COHERENT,
            });
        }

        kinds
    }

    /// Device-upload requests fall back to the upload heap when there is no
    /// device-local host-visible heap.
    fn classify(&self, class: ResourceClass, request: &ClassifyRequest) -> Result<MemoryTypeId> {
        let kinds = self.memory_kinds(class);
        match classify(&kinds, request) {
            Err(GPUError::NoMemoryType {
                location: MemoryLocation::DeviceUpload,
            }) => classify(
                &kinds,
                &ClassifyRequest {
                    location: MemoryLocation::HostUpload,
                    ..*request
                },
            ),
            other => other,
        }
    }
}

//-------------------------------------------------------------------------
// D3D11

pub const D3D11_USAGE_DEFAULT: u8 = 0;
pub const D3D11_USAGE_DYNAMIC: u8 = 2;
pub const D3D11_USAGE_STAGING: u8 = 3;

/// `D3D11_CPU_ACCESS_WRITE >> 16`.
pub const D3D11_CPU_ACCESS_WRITE: u16 = 0x1;
/// `D3D11_CPU_ACCESS_READ >> 16`.
pub const D3D11_CPU_ACCESS_READ: u16 = 0x2;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct D3D11MemoryLayout {
    /// Dynamic usage is unavailable for attachments.
    pub dynamic_textures_supported: bool,
}

impl D3D11MemoryLayout {
    pub fn usage(id: MemoryTypeId) -> u8 {
        id.decode().heap_category
    }

    pub fn cpu_access_flags(id: MemoryTypeId) -> u32 {
        (id.decode().heap_flags as u32) << 16
    }
}

impl MemoryFamily for D3D11MemoryLayout {
    fn memory_kinds(&self, class: ResourceClass) -> Vec<MemoryKind> {
        use MemoryPropertyBits as P;

        let mut kinds = vec![
            MemoryKind {
                heap_category: D3D11_USAGE_DEFAULT,
                heap_flags: 0,
                properties: P::DEVICE_LOCAL,
            },
            MemoryKind {
                heap_category: D3D11_USAGE_STAGING,
                heap_flags: D3D11_CPU_ACCESS_WRITE,
                properties: P::HOST_VISIBLE | P::HOST_COHERENT,
            },
            MemoryKind {
                heap_category: D3D11_USAGE_STAGING,
                heap_flags: D3D11_CPU_ACCESS_READ,
                properties: P::HOST_VISIBLE | P::HOST_COHERENT | P::HOST_CACHED,
            },
        ];

        let dynamic_allowed = match class {
            ResourceClass::Buffer => true,
            ResourceClass::Texture => self.dynamic_textures_supported,
            ResourceClass::RenderTarget => false,
        };
        if dynamic_allowed {
            kinds.push(MemoryKind {
                heap_category: D3D11_USAGE_DYNAMIC,
                heap_flags: D3D11_CPU_ACCESS_WRITE,
                properties: P::DEVICE_LOCAL | P::HOST_VISIBLE | P::HOST_COHERENT,
            });
        }

        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(location: MemoryLocation) -> ClassifyRequest {
        ClassifyRequest {
            location,
            type_mask: u32::MAX,
            dedicated_hint: false,
        }
    }

    #[test]
    fn vulkan_category_is_the_type_index() {
        let layout = VulkanMemoryLayout::new([0x2 | 0x4, 0x1, 0x1 | 0x2 | 0x4]);
        let id = layout
            .classify(ResourceClass::Buffer, &request(MemoryLocation::Device))
            .unwrap();
        assert_eq!(VulkanMemoryLayout::memory_type_index(id), 1);
        assert_eq!(id.decode().heap_flags, 0x1);

        let id = layout
            .classify(ResourceClass::Buffer, &request(MemoryLocation::DeviceUpload))
            .unwrap();
        assert_eq!(VulkanMemoryLayout::memory_type_index(id), 2);
    }

    #[test]
    fn d3d12_tier1_segregates_heaps() {
        let layout = D3D12MemoryLayout {
            resource_heap_tier: 1,
            ..Default::default()
        };
        let buffer = layout
            .classify(ResourceClass::Buffer, &request(MemoryLocation::Device))
            .unwrap();
        let target = layout
            .classify(ResourceClass::RenderTarget, &request(MemoryLocation::Device))
            .unwrap();
        assert_eq!(D3D12MemoryLayout::heap_type(buffer), D3D12_HEAP_TYPE_DEFAULT);
        assert_ne!(buffer.decode().sharing_key(), target.decode().sharing_key());

        let tier2 = D3D12MemoryLayout {
            resource_heap_tier: 2,
            ..Default::default()
        };
        let a = tier2
            .classify(ResourceClass::Buffer, &request(MemoryLocation::Device))
            .unwrap();
        let b = tier2
            .classify(ResourceClass::Texture, &request(MemoryLocation::Device))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn d3d12_device_upload_prefers_gpu_upload_heap() {
        let with = D3D12MemoryLayout {
            resource_heap_tier: 2,
            gpu_upload_heap_supported: true,
            ..Default::default()
        };
        let id = with
            .classify(ResourceClass::Buffer, &request(MemoryLocation::DeviceUpload))
            .unwrap();
        assert_eq!(D3D12MemoryLayout::heap_type(id), D3D12_HEAP_TYPE_GPU_UPLOAD);

        let without = D3D12MemoryLayout {
            resource_heap_tier: 2,
            ..Default::default()
        };
        let id = without
            .classify(ResourceClass::Buffer, &request(MemoryLocation::DeviceUpload))
            .unwrap();
        assert_eq!(D3D12MemoryLayout::heap_type(id), D3D12_HEAP_TYPE_UPLOAD);

        let id = without
            .classify(ResourceClass::Buffer, &request(MemoryLocation::HostReadback))
            .unwrap();
        assert_eq!(D3D12MemoryLayout::heap_type(id), D3D12_HEAP_TYPE_READBACK);
    }

    #[test]
    fn d3d11_usage_and_cpu_access() {
        let layout = D3D11MemoryLayout::default();
        let upload = layout
            .classify(ResourceClass::Buffer, &request(MemoryLocation::HostUpload))
            .unwrap();
        assert_eq!(D3D11MemoryLayout::usage(upload), D3D11_USAGE_STAGING);
        assert_eq!(D3D11MemoryLayout::cpu_access_flags(upload), 0x10000);

        let readback = layout
            .classify(ResourceClass::Buffer, &request(MemoryLocation::HostReadback))
            .unwrap();
        assert_eq!(D3D11MemoryLayout::cpu_access_flags(readback), 0x20000);

        let dynamic = layout
            .classify(ResourceClass::Buffer, &request(MemoryLocation::DeviceUpload))
            .unwrap();
        assert_eq!(D3D11MemoryLayout::usage(dynamic), D3D11_USAGE_DYNAMIC);

        assert!(layout
            .classify(ResourceClass::RenderTarget, &request(MemoryLocation::DeviceUpload))
            .is_err());
    }
}

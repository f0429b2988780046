use bitflags::bitflags;

use super::encoding::{MemoryTypeId, MemoryTypeInfo};
use crate::gpu::error::{GPUError, Result};
use crate::gpu::structs::MemoryLocation;

bitflags! {
    /// Backend-neutral properties of one native memory kind.
    #[repr(C)]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryPropertyBits: u32 {
        const DEVICE_LOCAL     = 0x1;
        const HOST_VISIBLE     = 0x2;
        const HOST_COHERENT    = 0x4;
        const HOST_CACHED      = 0x8;
        const LAZILY_ALLOCATED = 0x10;
        const PROTECTED        = 0x20;
    }
}

/// One native memory kind as seen by the classifier. Its position in the
/// list handed to [`classify`] is its native type index.
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryKind {
    pub heap_category: u8,
    pub heap_flags: u16,
    pub properties: MemoryPropertyBits,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassifyRequest {
    pub location: MemoryLocation,
    /// Bit `i` set means native kind `i` can back the resource.
    pub type_mask: u32,
    /// Driver reports the resource wants its own allocation.
    pub dedicated_hint: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LocationPolicy {
    pub needed: MemoryPropertyBits,
    pub undesired: MemoryPropertyBits,
    pub desired: MemoryPropertyBits,
}

pub(crate) fn location_policy(location: MemoryLocation) -> LocationPolicy {
    use MemoryPropertyBits as P;
    match location {
        MemoryLocation::Device => LocationPolicy {
            needed: P::DEVICE_LOCAL,
            undesired: P::HOST_VISIBLE,
            desired: P::empty(),
        },
        MemoryLocation::DeviceUpload => LocationPolicy {
            needed: P::DEVICE_LOCAL | P::HOST_VISIBLE,
            undesired: P::HOST_CACHED,
            desired: P::HOST_COHERENT,
        },
        MemoryLocation::HostUpload => LocationPolicy {
            needed: P::HOST_VISIBLE,
            undesired: P::DEVICE_LOCAL,
            desired: P::HOST_COHERENT,
        },
        MemoryLocation::HostReadback => LocationPolicy {
            needed: P::HOST_VISIBLE,
            undesired: P::DEVICE_LOCAL,
            desired: P::HOST_CACHED,
        },
    }
}

/// Index of the native kind chosen for `request`, if any.
///
/// Among the kinds that are in the mask and carry every needed property, the
/// winner is the one that minimises, in order: having an undesired property,
/// lacking a desired property, the number of properties beyond what was asked
/// for, and the native index.
pub fn select_memory_kind(kinds: &[MemoryKind], request: &ClassifyRequest) -> Option<usize> {
    let policy = location_policy(request.location);
    let asked = policy.needed | policy.desired;

    kinds
        .iter()
        .enumerate()
        .take(32)
        .filter(|(index, kind)| {
            request.type_mask & (1 << index) != 0 && kind.properties.contains(policy.needed)
        })
        .min_by_key(|(index, kind)| {
            let undesired = kind.properties.intersects(policy.undesired);
            let lacks_desired = !kind.properties.contains(policy.desired);
            let surplus = kind.properties.difference(asked).bits().count_ones();
            (undesired, lacks_desired, surplus, *index)
        })
        .map(|(index, _)| index)
}

/// Maps a location intent and a resource's native requirements to one
/// [`MemoryTypeId`].
pub fn classify(kinds: &[MemoryKind], request: &ClassifyRequest) -> Result<MemoryTypeId> {
    let index = select_memory_kind(kinds, request).ok_or(GPUError::NoMemoryType {
        location: request.location,
    })?;

    let kind = kinds[index];
    Ok(MemoryTypeId::encode(MemoryTypeInfo {
        heap_category: kind.heap_category,
        heap_flags: kind.heap_flags,
        must_be_dedicated: request.dedicated_hint,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use MemoryPropertyBits as P;

    fn kind(index: u8, properties: MemoryPropertyBits) -> MemoryKind {
        MemoryKind {
            heap_category: index,
            heap_flags: properties.bits() as u16,
            properties,
        }
    }

    fn discrete_gpu() -> Vec<MemoryKind> {
        vec![
            kind(0, P::DEVICE_LOCAL),
            kind(1, P::HOST_VISIBLE | P::HOST_COHERENT),
            kind(2, P::HOST_VISIBLE | P::HOST_COHERENT | P::HOST_CACHED),
            kind(3, P::DEVICE_LOCAL | P::HOST_VISIBLE | P::HOST_COHERENT),
            kind(4, P::DEVICE_LOCAL | P::LAZILY_ALLOCATED),
        ]
    }

    fn request(location: MemoryLocation) -> ClassifyRequest {
        ClassifyRequest {
            location,
            type_mask: u32::MAX,
            dedicated_hint: false,
        }
    }

    #[test]
    fn picks_the_narrowest_kind_per_location() {
        let kinds = discrete_gpu();
        assert_eq!(select_memory_kind(&kinds, &request(MemoryLocation::Device)), Some(0));
        assert_eq!(select_memory_kind(&kinds, &request(MemoryLocation::HostUpload)), Some(1));
        assert_eq!(select_memory_kind(&kinds, &request(MemoryLocation::HostReadback)), Some(2));
        assert_eq!(select_memory_kind(&kinds, &request(MemoryLocation::DeviceUpload)), Some(3));
    }

    #[test]
    fn respects_the_type_mask() {
        let kinds = discrete_gpu();
        let mut req = request(MemoryLocation::Device);
        req.type_mask = 1 << 4;
        assert_eq!(select_memory_kind(&kinds, &req), Some(4));

        // Only host memory allowed: device-local intent cannot be met.
        req.type_mask = 0b0110;
        assert_eq!(
            classify(&kinds, &req),
            Err(GPUError::NoMemoryType {
                location: MemoryLocation::Device
            })
        );
    }

    #[test]
    fn ties_break_on_lowest_index() {
        let kinds = vec![
            kind(0, P::HOST_VISIBLE),
            kind(1, P::DEVICE_LOCAL),
            kind(2, P::DEVICE_LOCAL),
        ];
        let req = request(MemoryLocation::Device);
        for _ in 0..4 {
            assert_eq!(select_memory_kind(&kinds, &req), Some(1));
        }
    }

    #[test]
    fn dedicated_hint_forces_the_dedicated_bit() {
        let kinds = discrete_gpu();
        let mut req = request(MemoryLocation::Device);
        req.dedicated_hint = true;
        let id = classify(&kinds, &req).unwrap();
        let info = id.decode();
        assert!(info.must_be_dedicated);
        assert_eq!(info.heap_category, 0);
    }

    #[test]
    fn uma_falls_back_to_host_visible_device_memory() {
        let kinds = vec![kind(0, P::DEVICE_LOCAL | P::HOST_VISIBLE | P::HOST_COHERENT)];
        for location in [
            MemoryLocation::Device,
            MemoryLocation::DeviceUpload,
            MemoryLocation::HostUpload,
            MemoryLocation::HostReadback,
        ] {
            assert_eq!(select_memory_kind(&kinds, &request(location)), Some(0));
        }
    }
}

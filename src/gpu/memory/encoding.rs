use bytemuck::{Pod, Zeroable};

/// Opaque memory kind produced by `get_*_memory_desc`.
///
/// Layout, shared by every backend family:
///
/// | bits   | field                                  |
/// |--------|----------------------------------------|
/// | 0..16  | native heap flags                      |
/// | 16..24 | native heap category                   |
/// | 24     | must be dedicated                      |
/// | 25..32 | zero                                   |
///
/// What "category" and "flags" mean is up to the family: see
/// [`super::families`].
#[repr(transparent)]
#[derive(Default, Hash, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct MemoryTypeId(u32);

#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
struct PackedMemoryType {
    heap_flags: u16,
    heap_category: u8,
    must_be_dedicated: u8,
}

const _: () = assert!(std::mem::size_of::<PackedMemoryType>() == std::mem::size_of::<MemoryTypeId>());

/// Decoded form of a [`MemoryTypeId`].
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryTypeInfo {
    pub heap_category: u8,
    pub heap_flags: u16,
    pub must_be_dedicated: bool,
}

impl MemoryTypeInfo {
    /// Key under which resources may share one allocation.
    pub fn sharing_key(&self) -> Option<(u8, u16)> {
        if self.must_be_dedicated {
            None
        } else {
            Some((self.heap_category, self.heap_flags))
        }
    }
}

impl MemoryTypeId {
    const DEDICATED_BIT: u32 = 1 << 24;

    pub fn encode(info: MemoryTypeInfo) -> Self {
        let packed = PackedMemoryType {
            heap_flags: info.heap_flags,
            heap_category: info.heap_category,
            must_be_dedicated: info.must_be_dedicated as u8,
        };
        // Field order is little-endian bit order on every supported host.
        let bytes: [u8; 4] = bytemuck::cast(packed);
        MemoryTypeId(u32::from_le_bytes(bytes))
    }

    pub fn decode(&self) -> MemoryTypeInfo {
        let packed: PackedMemoryType = bytemuck::cast(self.0.to_le_bytes());
        MemoryTypeInfo {
            heap_category: packed.heap_category,
            heap_flags: packed.heap_flags,
            must_be_dedicated: packed.must_be_dedicated != 0,
        }
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Accepts only values produced by [`MemoryTypeId::encode`].
    pub fn from_raw(raw: u32) -> Option<Self> {
        if raw >> 25 != 0 {
            return None;
        }
        Some(MemoryTypeId(raw))
    }

    pub fn is_dedicated(&self) -> bool {
        self.0 & Self::DEDICATED_BIT != 0
    }

    pub fn with_dedicated(self, dedicated: bool) -> Self {
        if dedicated {
            MemoryTypeId(self.0 | Self::DEDICATED_BIT)
        } else {
            MemoryTypeId(self.0 & !Self::DEDICATED_BIT)
        }
    }
}

impl std::fmt::Debug for MemoryTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let info = self.decode();
        write!(
            f,
            "MemoryTypeId(category={}, flags={:#06x}, dedicated={})",
            info.heap_category, info.heap_flags, info.must_be_dedicated
        )
    }
}

impl From<MemoryTypeInfo> for MemoryTypeId {
    fn from(info: MemoryTypeInfo) -> Self {
        MemoryTypeId::encode(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_exhaustive_over_category_and_dedicated() {
        for category in 0..=u8::MAX {
            for dedicated in [false, true] {
                for flags in [0u16, 1, 0x7, 0x8000, 0xffff] {
                    let info = MemoryTypeInfo {
                        heap_category: category,
                        heap_flags: flags,
                        must_be_dedicated: dedicated,
                    };
                    let id = MemoryTypeId::encode(info);
                    assert_eq!(id.decode(), info);
                    assert_eq!(id.is_dedicated(), dedicated);
                    assert_eq!(id.raw() >> 25, 0);
                }
            }
        }
    }

    #[test]
    fn bit_layout_is_canonical() {
        let id = MemoryTypeId::encode(MemoryTypeInfo {
            heap_category: 0x12,
            heap_flags: 0x3456,
            must_be_dedicated: true,
        });
        assert_eq!(id.raw(), 0x0112_3456);
        assert_eq!(std::mem::size_of::<MemoryTypeId>(), 4);
    }

    #[test]
    fn from_raw_rejects_reserved_bits() {
        assert!(MemoryTypeId::from_raw(0x0200_0000).is_none());
        assert!(MemoryTypeId::from_raw(0x0100_0001).is_some());
    }

    #[test]
    fn dedicated_bit_toggles_without_touching_the_rest() {
        let base = MemoryTypeId::encode(MemoryTypeInfo {
            heap_category: 3,
            heap_flags: 0x9,
            must_be_dedicated: false,
        });
        let dedicated = base.with_dedicated(true);
        assert!(dedicated.decode().must_be_dedicated);
        assert_eq!(dedicated.decode().heap_category, 3);
        assert_eq!(dedicated.with_dedicated(false), base);
        assert_eq!(base.decode().sharing_key(), Some((3, 0x9)));
        assert_eq!(dedicated.decode().sharing_key(), None);
    }
}

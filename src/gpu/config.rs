#[cfg(feature = "rhi-serde")]
use serde::{Deserialize, Serialize};

use super::structs::GraphicsApi;

/// Environment variable that overrides [`DeviceCreationInfo::enable_validation`].
pub const VALIDATION_ENV: &str = "RHI_VALIDATION";

pub const DEFAULT_PREFERRED_MEMORY_SIZE: u64 = 256 * 1024 * 1024;

/// Largest heap a descriptor pool can address with a 16-bit offset.
pub const MAX_DESCRIPTOR_HEAP_SLOTS: u32 = 1 << 16;

/// Sizing of one descriptor kind inside a pool.
#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub struct DescriptorHeapConfig {
    /// Slots in the first heap.
    pub initial_slots: u32,
    /// Growth stops doubling here. Clamped to [`MAX_DESCRIPTOR_HEAP_SLOTS`].
    pub max_heap_slots: u32,
    /// Total slots across every heap; exceeding it fails with a capacity error.
    pub max_total_slots: u32,
}

impl Default for DescriptorHeapConfig {
    fn default() -> Self {
        Self {
            initial_slots: 1024,
            max_heap_slots: 16 * 1024,
            max_total_slots: 256 * 1024,
        }
    }
}

impl DescriptorHeapConfig {
    pub fn is_zeroed(&self) -> bool {
        self.initial_slots == 0 && self.max_heap_slots == 0 && self.max_total_slots == 0
    }

    /// Fills zeroed fields from the defaults and clamps to what a heap can
    /// address.
    pub fn resolved(&self, default: &DescriptorHeapConfig) -> DescriptorHeapConfig {
        if self.is_zeroed() {
            return *default;
        }
        let pick = |v: u32, d: u32| if v == 0 { d } else { v };
        let max_heap_slots = pick(self.max_heap_slots, default.max_heap_slots)
            .min(MAX_DESCRIPTOR_HEAP_SLOTS);
        let initial_slots = pick(self.initial_slots, default.initial_slots).min(max_heap_slots);
        let max_total_slots = pick(self.max_total_slots, default.max_total_slots).max(initial_slots);
        DescriptorHeapConfig {
            initial_slots,
            max_heap_slots,
            max_total_slots,
        }
    }
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub struct DescriptorPoolDesc {
    /// Buffer views and texture views.
    pub resources: DescriptorHeapConfig,
    pub samplers: DescriptorHeapConfig,
}

impl Default for DescriptorPoolDesc {
    fn default() -> Self {
        Self {
            resources: DescriptorHeapConfig::default(),
            samplers: DescriptorHeapConfig {
                initial_slots: 64,
                max_heap_slots: 2048,
                max_total_slots: 2048,
            },
        }
    }
}

impl DescriptorPoolDesc {
    pub fn resolved(&self, default: &DescriptorPoolDesc) -> DescriptorPoolDesc {
        DescriptorPoolDesc {
            resources: self.resources.resolved(&default.resources),
            samplers: self.samplers.resolved(&default.samplers),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub struct DeviceCreationInfo {
    pub graphics_api: GraphicsApi,
    pub enable_validation: bool,
    pub adapter_index: u32,
    /// Used for pools created with a zeroed description.
    pub descriptor_pool: DescriptorPoolDesc,
    /// Block size the helper packs shared allocations into.
    pub preferred_memory_size: u64,
}

impl Default for DeviceCreationInfo {
    fn default() -> Self {
        Self {
            graphics_api: GraphicsApi::None,
            enable_validation: false,
            adapter_index: 0,
            descriptor_pool: DescriptorPoolDesc::default(),
            preferred_memory_size: DEFAULT_PREFERRED_MEMORY_SIZE,
        }
    }
}

impl DeviceCreationInfo {
    /// Applies the `RHI_VALIDATION` override: `1` forces the validation
    /// layer on, `0` forces it off, anything else leaves the field alone.
    pub fn validation_enabled(&self) -> bool {
        match std::env::var(VALIDATION_ENV).as_deref() {
            Ok("1") => true,
            Ok("0") => false,
            _ => self.enable_validation,
        }
    }

    pub fn preferred_memory_size(&self) -> u64 {
        if self.preferred_memory_size == 0 {
            DEFAULT_PREFERRED_MEMORY_SIZE
        } else {
            self.preferred_memory_size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_config_takes_defaults() {
        let zero = DescriptorHeapConfig {
            initial_slots: 0,
            max_heap_slots: 0,
            max_total_slots: 0,
        };
        let def = DescriptorHeapConfig::default();
        assert_eq!(zero.resolved(&def), def);
    }

    #[test]
    fn heap_ceiling_is_clamped_to_u16_range() {
        let cfg = DescriptorHeapConfig {
            initial_slots: 8,
            max_heap_slots: 1 << 20,
            max_total_slots: 1 << 22,
        }
        .resolved(&DescriptorHeapConfig::default());
        assert_eq!(cfg.max_heap_slots, MAX_DESCRIPTOR_HEAP_SLOTS);
        assert_eq!(cfg.initial_slots, 8);
    }

    #[test]
    fn partial_config_fills_missing_fields() {
        let cfg = DescriptorHeapConfig {
            initial_slots: 8,
            max_heap_slots: 0,
            max_total_slots: 0,
        }
        .resolved(&DescriptorHeapConfig::default());
        assert_eq!(cfg.initial_slots, 8);
        assert_eq!(cfg.max_heap_slots, DescriptorHeapConfig::default().max_heap_slots);
    }
}

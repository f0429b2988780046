//! Memory classification, encoding and allocation planning.

pub mod classifier;
pub mod encoding;
pub mod families;
pub mod planner;

pub use classifier::{classify, select_memory_kind, ClassifyRequest, MemoryKind, MemoryPropertyBits};
pub use encoding::{MemoryTypeId, MemoryTypeInfo};
pub use families::{
    D3D11MemoryLayout, D3D12MemoryLayout, MemoryFamily, ResourceClass, VulkanMemoryLayout,
    VulkanRequirements,
};
pub use planner::{PlannedAllocation, PlannedResource};

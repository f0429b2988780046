use rhi::memory::planner::{pack, PlannedResource};
use rhi::memory::{
    ClassifyRequest, D3D12MemoryLayout, MemoryFamily, MemoryPropertyBits as P, ResourceClass,
    VulkanMemoryLayout, VulkanRequirements,
};
use rhi::*;

fn discrete_gpu() -> VulkanMemoryLayout {
    VulkanMemoryLayout::new([
        P::DEVICE_LOCAL.bits(),
        (P::HOST_VISIBLE | P::HOST_COHERENT).bits(),
        (P::HOST_VISIBLE | P::HOST_COHERENT | P::HOST_CACHED).bits(),
        (P::DEVICE_LOCAL | P::HOST_VISIBLE | P::HOST_COHERENT).bits(),
    ])
}

fn request(location: MemoryLocation, dedicated_hint: bool) -> ClassifyRequest {
    ClassifyRequest {
        location,
        type_mask: 0b1111,
        dedicated_hint,
    }
}

#[test]
fn dedicated_device_memory_keeps_its_flag() {
    let id = discrete_gpu()
        .classify(ResourceClass::Texture, &request(MemoryLocation::Device, true))
        .unwrap();
    assert!(id.is_dedicated());
    assert!(id.decode().must_be_dedicated);
    assert_eq!(VulkanMemoryLayout::memory_type_index(id), 0);
}

#[test]
fn locations_pick_distinct_memory_types() {
    let layout = discrete_gpu();
    let index = |location| {
        let id = layout
            .classify(ResourceClass::Buffer, &request(location, false))
            .unwrap();
        assert!(!id.is_dedicated());
        VulkanMemoryLayout::memory_type_index(id)
    };
    assert_eq!(index(MemoryLocation::Device), 0);
    assert_eq!(index(MemoryLocation::HostUpload), 1);
    assert_eq!(index(MemoryLocation::HostReadback), 2);
    assert_eq!(index(MemoryLocation::DeviceUpload), 3);
}

#[test]
fn an_empty_type_mask_has_no_memory_type() {
    let err = discrete_gpu()
        .classify(
            ResourceClass::Buffer,
            &ClassifyRequest {
                location: MemoryLocation::Device,
                type_mask: 0,
                dedicated_hint: false,
            },
        )
        .unwrap_err();
    assert_eq!(err.status(), Status::Unsupported);
}

#[test]
fn tier_one_d3d12_heaps_separate_resource_classes() {
    let layout = D3D12MemoryLayout {
        resource_heap_tier: 1,
        ..Default::default()
    };
    let all = ClassifyRequest {
        location: MemoryLocation::Device,
        type_mask: u32::MAX,
        dedicated_hint: false,
    };
    let buffer = layout.classify(ResourceClass::Buffer, &all).unwrap();
    let texture = layout.classify(ResourceClass::Texture, &all).unwrap();
    assert_eq!(
        D3D12MemoryLayout::heap_type(buffer),
        D3D12MemoryLayout::heap_type(texture)
    );
    assert_ne!(buffer, texture);
}

#[test]
fn preferred_dedicated_allocations_are_encoded_and_planned_alike() {
    let layout = discrete_gpu();
    let requirements = |prefers_dedicated| VulkanRequirements {
        size: 1024,
        alignment: 256,
        type_mask: 0b1111,
        prefers_dedicated,
        requires_dedicated: false,
    };
    let placed = |prefers| {
        layout
            .memory_desc(ResourceClass::Texture, MemoryLocation::Device, &requirements(prefers))
            .unwrap()
    };

    let preferred = placed(true);
    assert!(preferred.memory_type.is_dedicated());
    assert!(preferred.must_be_dedicated);
    let shared = placed(false);
    assert!(!shared.memory_type.is_dedicated());
    assert!(!shared.must_be_dedicated);

    let resources = [
        (PlannedResource::Buffer(Handle::from_raw(1)), preferred),
        (PlannedResource::Buffer(Handle::from_raw(2)), shared),
        (PlannedResource::Buffer(Handle::from_raw(3)), shared),
    ];
    let plan = pack(&resources, 1 << 20);
    assert_eq!(plan.len(), 2);
    for allocation in &plan {
        assert_eq!(allocation.dedicated, allocation.memory_type.is_dedicated());
    }
    assert_eq!(plan[0].memory_type, preferred.memory_type);
    assert_eq!(plan[1].bindings.len(), 2);
}

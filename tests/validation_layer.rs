mod common;

use std::collections::HashSet;
use std::time::Duration;

use common::{conformance_device, conformance_device_with, resource_pool};
use rhi::error::status_of;
use rhi::*;
use serial_test::serial;

fn bound_buffer(core: &mut dyn CoreInterface, size: u64) -> Handle<Buffer> {
    bound_buffer_and_memory(core, size).0
}

fn bound_buffer_and_memory(
    core: &mut dyn CoreInterface,
    size: u64,
) -> (Handle<Buffer>, Handle<Memory>) {
    let buffer = core
        .create_buffer(&BufferDesc {
            size,
            usage: BufferUsageBits::CONSTANT_BUFFER,
            ..Default::default()
        })
        .unwrap();
    let memory = core
        .allocate_memory(&AllocateMemoryDesc {
            size,
            ..Default::default()
        })
        .unwrap();
    core.bind_buffer_memory(&[BufferMemoryBinding {
        buffer,
        memory,
        offset: 0,
    }])
    .unwrap();
    (buffer, memory)
}

/// Runs one valid call sequence, recording the outcome of every step and the
/// values the device reported along the way.
fn scripted_session(device: &mut Device) -> (Vec<(&'static str, Status)>, Vec<u64>) {
    let mut outcomes = Vec::new();
    let mut values = Vec::new();
    let core = device.core();

    macro_rules! step {
        ($name:literal, $call:expr) => {{
            let result = $call;
            outcomes.push(($name, status_of(&result)));
            result.unwrap()
        }};
    }

    let buffer = step!(
        "create_buffer",
        core.create_buffer(&BufferDesc {
            size: 256,
            usage: BufferUsageBits::CONSTANT_BUFFER,
            ..Default::default()
        })
    );
    let memory = step!(
        "allocate_memory",
        core.allocate_memory(&AllocateMemoryDesc {
            size: 256,
            ..Default::default()
        })
    );
    step!(
        "bind_buffer_memory",
        core.bind_buffer_memory(&[BufferMemoryBinding {
            buffer,
            memory,
            offset: 0,
        }])
    );
    let mapped = step!("map_buffer", core.map_buffer(buffer, 0, 64));
    values.push(mapped.len() as u64);
    step!("unmap_buffer", core.unmap_buffer(buffer));

    let pool = step!(
        "create_descriptor_pool",
        core.create_descriptor_pool(&resource_pool(8, 64))
    );
    let range = step!(
        "allocate_descriptors",
        core.allocate_descriptors(pool, DescriptorHeapType::Resource, 4)
    );
    values.push(range.count as u64);
    step!("free_descriptors", core.free_descriptors(pool, &range));
    step!("reset_descriptor_pool", core.reset_descriptor_pool(pool));

    let queue = step!(
        "get_command_queue",
        core.get_command_queue(QueueType::Graphics)
    );
    let allocator = step!(
        "create_command_allocator",
        core.create_command_allocator(queue)
    );
    let cmd = step!("create_command_buffer", core.create_command_buffer(allocator));
    step!("begin_command_buffer", core.begin_command_buffer(cmd));
    step!("end_command_buffer", core.end_command_buffer(cmd));
    let fence = step!("create_fence", core.create_fence(0));
    step!(
        "queue_submit",
        core.queue_submit(
            queue,
            &QueueSubmitDesc {
                command_buffers: &[cmd],
                signal: Some(FenceSignal { fence, value: 1 }),
            },
        )
    );
    step!("wait", core.wait(fence, 1, Duration::from_millis(1)));
    values.push(step!("get_fence_value", core.get_fence_value(fence)));

    step!("destroy_buffer", core.destroy_buffer(buffer));
    step!("free_memory", core.free_memory(memory));
    step!("destroy_fence", core.destroy_fence(fence));
    step!("destroy_command_buffer", core.destroy_command_buffer(cmd));
    step!(
        "destroy_command_allocator",
        core.destroy_command_allocator(allocator)
    );
    step!("destroy_descriptor_pool", core.destroy_descriptor_pool(pool));

    (outcomes, values)
}

#[test]
#[serial]
fn validated_calls_behave_like_the_backend() {
    let mut device = conformance_device(true);
    assert!(device.is_validated());
    assert_eq!(device.capabilities(), Capabilities::all());

    let core = device.core();
    let buffer = bound_buffer(core, 256);
    assert!(!buffer.is_null());
    let mapped = core.map_buffer(buffer, 0, 64).unwrap();
    assert!(mapped.is_null());
    core.unmap_buffer(buffer).unwrap();
    core.set_debug_name(Object::Buffer(buffer), "constants").unwrap();
    core.destroy_buffer(buffer).unwrap();
}

#[test]
#[serial]
fn valid_sessions_match_with_and_without_validation() {
    let (plain_outcomes, plain_values) = scripted_session(&mut conformance_device(false));
    let (validated_outcomes, validated_values) = scripted_session(&mut conformance_device(true));

    assert_eq!(plain_outcomes.len(), 24);
    assert!(plain_outcomes.iter().all(|(_, status)| *status == Status::Success));
    assert_eq!(plain_outcomes, validated_outcomes);
    assert_eq!(plain_values, validated_values);
}

#[test]
#[serial]
fn memory_cannot_be_freed_under_a_live_binding() {
    let mut device = conformance_device(true);
    let core = device.core();
    let (buffer, memory) = bound_buffer_and_memory(core, 256);

    assert_eq!(
        core.free_memory(memory).unwrap_err().status(),
        Status::InvalidArgument
    );
    // The rejected free left both objects usable.
    core.map_buffer(buffer, 0, 64).unwrap();
    core.unmap_buffer(buffer).unwrap();

    core.destroy_buffer(buffer).unwrap();
    core.free_memory(memory).unwrap();
    assert_eq!(
        core.free_memory(memory).unwrap_err().status(),
        Status::InvalidArgument
    );
}

#[test]
#[serial]
fn dedicated_memory_binds_at_offset_zero() {
    let mut device = conformance_device(true);
    let core = device.core();
    let buffer = core
        .create_buffer(&BufferDesc {
            size: 256,
            ..Default::default()
        })
        .unwrap();
    let memory = core
        .allocate_memory(&AllocateMemoryDesc {
            size: 512,
            memory_type: MemoryTypeId::default().with_dedicated(true),
            ..Default::default()
        })
        .unwrap();
    let at = |offset| {
        [BufferMemoryBinding {
            buffer,
            memory,
            offset,
        }]
    };

    assert_eq!(
        core.bind_buffer_memory(&at(256)).unwrap_err().status(),
        Status::InvalidArgument
    );
    core.bind_buffer_memory(&at(0)).unwrap();
}

#[test]
#[serial]
fn double_map_is_an_invalid_argument() {
    let mut device = conformance_device(true);
    let core = device.core();
    let buffer = bound_buffer(core, 128);

    core.map_buffer(buffer, 0, 128).unwrap();
    let err = core.map_buffer(buffer, 0, 128).unwrap_err();
    assert_eq!(err.status(), Status::InvalidArgument);
}

#[test]
#[serial]
fn stale_handles_are_rejected_only_under_validation() {
    let mut plain = conformance_device(false);
    let fence = plain.core().create_fence(0).unwrap();
    plain.core().destroy_fence(fence).unwrap();
    assert!(plain.core().destroy_fence(fence).is_ok());

    let mut validated = conformance_device(true);
    let fence = validated.core().create_fence(0).unwrap();
    validated.core().destroy_fence(fence).unwrap();
    assert_eq!(
        validated.core().destroy_fence(fence).unwrap_err().status(),
        Status::InvalidArgument
    );
}

#[test]
#[serial]
fn descriptor_pools_grow_by_appending_heaps() {
    let mut device = conformance_device(true);
    let core = device.core();
    let pool = core.create_descriptor_pool(&resource_pool(8, 64)).unwrap();

    let ranges: Vec<_> = (0..3)
        .map(|_| {
            core.allocate_descriptors(pool, DescriptorHeapType::Resource, 4)
                .unwrap()
        })
        .collect();
    assert_eq!(ranges[0].first.heap_index, 0);
    assert_eq!(ranges[1].first.heap_index, 0);
    assert_eq!(ranges[2].first.heap_index, 1);

    let handles: HashSet<_> = ranges.iter().flat_map(|r| r.handles().collect::<Vec<_>>()).collect();
    assert_eq!(handles.len(), 12);

    core.reset_descriptor_pool(pool).unwrap();
    assert!(core.free_descriptors(pool, &ranges[0]).is_err());
    let again = core
        .allocate_descriptors(pool, DescriptorHeapType::Resource, 4)
        .unwrap();
    assert_eq!(again.first.heap_index, 0);
    assert_eq!(again.first.heap_offset, 0);
}

#[test]
#[serial]
fn zeroed_pool_descriptions_use_the_device_defaults() {
    let mut device = conformance_device_with(DeviceCreationInfo {
        enable_validation: true,
        descriptor_pool: resource_pool(4, 4),
        ..Default::default()
    });
    let core = device.core();
    let zeroed = DescriptorPoolDesc {
        resources: DescriptorHeapConfig {
            initial_slots: 0,
            max_heap_slots: 0,
            max_total_slots: 0,
        },
        samplers: DescriptorHeapConfig {
            initial_slots: 0,
            max_heap_slots: 0,
            max_total_slots: 0,
        },
    };
    let pool = core.create_descriptor_pool(&zeroed).unwrap();

    assert!(core
        .allocate_descriptors(pool, DescriptorHeapType::Resource, 4)
        .is_ok());
    // Above the four-slot ceiling configured at device creation.
    assert!(core
        .allocate_descriptors(pool, DescriptorHeapType::Resource, 5)
        .is_err());
}

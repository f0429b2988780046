#![cfg(feature = "rhi-vulkan")]

mod common;

use rhi::*;
use serial_test::serial;

/// `None` on machines without a usable Vulkan driver.
fn vulkan_device() -> Option<Device> {
    common::init_logging();
    std::env::remove_var(VALIDATION_ENV);
    match Device::new(&DeviceCreationInfo {
        graphics_api: GraphicsApi::Vulkan,
        ..Default::default()
    }) {
        Ok(device) => Some(device),
        Err(err) => {
            eprintln!("skipping: {}", err);
            None
        }
    }
}

#[test]
#[serial]
fn host_upload_buffers_map_and_keep_data() {
    let Some(mut device) = vulkan_device() else {
        return;
    };
    assert_eq!(device.graphics_api(), GraphicsApi::Vulkan);
    assert!(device
        .capabilities()
        .contains(Capabilities::HELPER | Capabilities::RESOURCE_ALLOCATOR));

    let buffer = device
        .resource_allocator()
        .unwrap()
        .allocate_buffer(&AllocateBufferDesc {
            desc: BufferDesc {
                size: 1024,
                usage: BufferUsageBits::CONSTANT_BUFFER,
                ..Default::default()
            },
            memory_location: MemoryLocation::HostUpload,
            memory_priority: 0.0,
        })
        .unwrap();

    let core = device.core();
    let mapped = core.map_buffer(buffer, 0, 1024).unwrap();
    assert_eq!(mapped.len(), 1024);
    unsafe { mapped.as_mut_slice() }.fill(8);
    core.unmap_buffer(buffer).unwrap();

    let mapped = core.map_buffer(buffer, 512, 16).unwrap();
    assert!(unsafe { mapped.as_mut_slice() }.iter().all(|b| *b == 8));
    core.unmap_buffer(buffer).unwrap();
    core.destroy_buffer(buffer).unwrap();
}

#[test]
#[serial]
fn submitted_work_signals_the_fence() {
    let Some(mut device) = vulkan_device() else {
        return;
    };
    let core = device.core();
    let queue = core.get_command_queue(QueueType::Graphics).unwrap();
    assert_eq!(core.get_command_queue(QueueType::Graphics).unwrap(), queue);

    let allocator = core.create_command_allocator(queue).unwrap();
    let cmd = core.create_command_buffer(allocator).unwrap();
    let fence = core.create_fence(0).unwrap();

    core.begin_command_buffer(cmd).unwrap();
    core.end_command_buffer(cmd).unwrap();
    core.queue_submit(
        queue,
        &QueueSubmitDesc {
            command_buffers: &[cmd],
            signal: Some(FenceSignal { fence, value: 1 }),
        },
    )
    .unwrap();
    core.wait(fence, 1, WAIT_INFINITE).unwrap();
    assert_eq!(core.get_fence_value(fence).unwrap(), 1);

    core.destroy_fence(fence).unwrap();
    core.destroy_command_allocator(allocator).unwrap();
}

#[test]
#[serial]
fn helper_groups_share_allocations() {
    let Some(mut device) = vulkan_device() else {
        return;
    };
    let core = device.core();
    let buffers: Vec<_> = (0..4)
        .map(|_| {
            core.create_buffer(&BufferDesc {
                size: 4096,
                usage: BufferUsageBits::SHADER_RESOURCE,
                ..Default::default()
            })
            .unwrap()
        })
        .collect();

    let group = ResourceGroupDesc {
        memory_location: MemoryLocation::Device,
        buffers: &buffers,
        ..Default::default()
    };
    let helper = device.helper().unwrap();
    let expected = helper.calculate_allocation_number(&group).unwrap();
    let memories = helper.allocate_and_bind_memory(&group).unwrap();
    assert_eq!(memories.len() as u32, expected);
    assert!(expected <= buffers.len() as u32);
    assert!(helper.query_video_memory_info(MemoryLocation::Device).unwrap().usage_size > 0);

    let core = device.core();
    for buffer in buffers {
        core.destroy_buffer(buffer).unwrap();
    }
    for memory in memories {
        core.free_memory(memory).unwrap();
    }
}

mod common;

use std::time::Duration;

use common::conformance_device;
use rhi::*;
use serial_test::serial;

#[test]
#[serial]
fn conformance_tables_answer_every_call() {
    let mut device = conformance_device(false);
    assert_eq!(device.capabilities(), Capabilities::all());

    let core = device.core();
    let buffer = core
        .create_buffer(&BufferDesc {
            size: 64,
            ..Default::default()
        })
        .unwrap();
    assert!(!buffer.is_null());
    assert!(buffer.is_sentinel());

    let queue = core.get_command_queue(QueueType::Graphics).unwrap();
    let fence = core.create_fence(0).unwrap();
    core.queue_submit(
        queue,
        &QueueSubmitDesc {
            command_buffers: &[],
            signal: Some(FenceSignal { fence, value: 1 }),
        },
    )
    .unwrap();
    core.wait(fence, 1, Duration::from_millis(1)).unwrap();
    assert_eq!(core.get_native_object(Object::Buffer(buffer)), NO_NATIVE_OBJECT);
    core.destroy_buffer(buffer).unwrap();

    assert_eq!(
        device
            .helper()
            .unwrap()
            .calculate_allocation_number(&ResourceGroupDesc::default())
            .unwrap(),
        0
    );
    let swap_chain = device
        .swap_chain()
        .unwrap()
        .create_swap_chain(&SwapChainDesc {
            queue,
            window: 0,
            width: 16,
            height: 16,
            texture_num: 2,
            format: Format::BGRA8Unorm,
            vsync_interval: 1,
        })
        .unwrap();
    assert!(swap_chain.is_sentinel());
    device
        .low_latency()
        .unwrap()
        .latency_sleep(swap_chain)
        .unwrap();
    assert_eq!(
        device.ray_tracing().unwrap().ray_tracing_version(),
        INTERFACE_VERSION
    );
}

#[test]
#[serial]
fn environment_override_wins_over_the_creation_field() {
    common::init_logging();
    std::env::set_var(VALIDATION_ENV, "1");
    let forced_on = Device::new(&DeviceCreationInfo::default()).unwrap();
    std::env::set_var(VALIDATION_ENV, "0");
    let forced_off = Device::new(&DeviceCreationInfo {
        enable_validation: true,
        ..Default::default()
    })
    .unwrap();
    std::env::remove_var(VALIDATION_ENV);

    assert!(forced_on.is_validated());
    assert!(!forced_off.is_validated());
}

#[test]
fn unavailable_backends_report_unsupported() {
    for api in [GraphicsApi::D3D11, GraphicsApi::D3D12] {
        let err = Device::new(&DeviceCreationInfo {
            graphics_api: api,
            ..Default::default()
        })
        .err()
        .unwrap();
        assert_eq!(err.status(), Status::Unsupported);
    }
}

#[cfg(not(feature = "rhi-vulkan"))]
#[test]
fn vulkan_needs_its_feature() {
    let err = Device::new(&DeviceCreationInfo {
        graphics_api: GraphicsApi::Vulkan,
        ..Default::default()
    })
    .err()
    .unwrap();
    assert_eq!(err.status(), Status::Unsupported);
}

#![allow(dead_code)]

use rhi::*;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Conformance device, optionally behind the validation layer. Clears the
/// environment override so the field decides.
pub fn conformance_device(enable_validation: bool) -> Device {
    conformance_device_with(DeviceCreationInfo {
        enable_validation,
        ..Default::default()
    })
}

pub fn conformance_device_with(info: DeviceCreationInfo) -> Device {
    init_logging();
    std::env::remove_var(VALIDATION_ENV);
    Device::new(&info).expect("conformance device")
}

pub fn resource_pool(initial_slots: u32, max_heap_slots: u32) -> DescriptorPoolDesc {
    DescriptorPoolDesc {
        resources: DescriptorHeapConfig {
            initial_slots,
            max_heap_slots,
            max_total_slots: 1024,
        },
        ..Default::default()
    }
}

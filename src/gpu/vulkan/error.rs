use ash::vk;

use crate::gpu::error::GPUError;
use crate::gpu::structs::GraphicsApi;

impl From<vk::Result> for GPUError {
    fn from(res: vk::Result) -> Self {
        match res {
            vk::Result::ERROR_OUT_OF_HOST_MEMORY
            | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY
            | vk::Result::ERROR_OUT_OF_POOL_MEMORY
            | vk::Result::ERROR_TOO_MANY_OBJECTS => GPUError::OutOfMemory,
            vk::Result::ERROR_DEVICE_LOST => GPUError::DeviceLost,
            vk::Result::TIMEOUT | vk::Result::NOT_READY => GPUError::Timeout,
            vk::Result::ERROR_FEATURE_NOT_PRESENT
            | vk::Result::ERROR_EXTENSION_NOT_PRESENT
            | vk::Result::ERROR_LAYER_NOT_PRESENT
            | vk::Result::ERROR_INCOMPATIBLE_DRIVER
            | vk::Result::ERROR_FORMAT_NOT_SUPPORTED => {
                GPUError::Unsupported("Vulkan feature not supported by the driver")
            }
            other => GPUError::Native {
                api: GraphicsApi::Vulkan,
                code: other.as_raw(),
            },
        }
    }
}

impl From<ash::LoadingError> for GPUError {
    fn from(err: ash::LoadingError) -> Self {
        log::error!("Failed to load the Vulkan loader: {}", err);
        GPUError::Unsupported("Vulkan loader not available")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::error::Status;

    #[test]
    fn native_codes_keep_their_value() {
        let err = GPUError::from(vk::Result::ERROR_FRAGMENTED_POOL);
        assert_eq!(
            err,
            GPUError::Native {
                api: GraphicsApi::Vulkan,
                code: vk::Result::ERROR_FRAGMENTED_POOL.as_raw()
            }
        );
        assert_eq!(err.status(), Status::Failure);
    }

    #[test]
    fn well_known_codes_map_to_statuses() {
        assert_eq!(
            GPUError::from(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY).status(),
            Status::OutOfMemory
        );
        assert_eq!(
            GPUError::from(vk::Result::ERROR_DEVICE_LOST).status(),
            Status::DeviceLost
        );
        assert_eq!(GPUError::from(vk::Result::TIMEOUT).status(), Status::Timeout);
    }
}

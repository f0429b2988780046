use std::fmt;

use super::structs::{GraphicsApi, MemoryLocation};

/// Closed set of operation outcomes shared by every backend.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Failure,
    InvalidArgument,
    OutOfMemory,
    Unsupported,
    DeviceLost,
    Timeout,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GPUError {
    Failure(&'static str),
    InvalidArgument(String),
    OutOfMemory,
    /// A descriptor pool would exceed its configured maximum.
    Capacity { requested: u32, available: u32 },
    /// No native memory kind satisfies both the location and the resource mask.
    NoMemoryType { location: MemoryLocation },
    Unsupported(&'static str),
    DeviceLost,
    Timeout,
    /// Native API error with its original code.
    Native { api: GraphicsApi, code: i32 },
}

impl GPUError {
    pub fn status(&self) -> Status {
        match self {
            GPUError::Failure(_) | GPUError::Native { .. } => Status::Failure,
            GPUError::InvalidArgument(_) => Status::InvalidArgument,
            GPUError::OutOfMemory | GPUError::Capacity { .. } => Status::OutOfMemory,
            GPUError::NoMemoryType { .. } | GPUError::Unsupported(_) => Status::Unsupported,
            GPUError::DeviceLost => Status::DeviceLost,
            GPUError::Timeout => Status::Timeout,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        GPUError::InvalidArgument(msg.into())
    }
}

impl fmt::Display for GPUError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GPUError::Failure(what) => write!(f, "Operation failed: {}", what),
            GPUError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            GPUError::OutOfMemory => write!(f, "Out of memory"),
            GPUError::Capacity {
                requested,
                available,
            } => write!(
                f,
                "Descriptor pool at capacity: requested {} slots, {} available",
                requested, available
            ),
            GPUError::NoMemoryType { location } => {
                write!(f, "No memory type matches location {:?}", location)
            }
            GPUError::Unsupported(what) => write!(f, "Unsupported: {}", what),
            GPUError::DeviceLost => write!(f, "Device lost"),
            GPUError::Timeout => write!(f, "Timed out"),
            GPUError::Native { api, code } => write!(f, "{:?} error code {}", api, code),
        }
    }
}

impl std::error::Error for GPUError {}

/// Convenient crate-wide result type.
pub type Result<T, E = GPUError> = std::result::Result<T, E>;

/// Collapses a result into its outcome code.
pub fn status_of<T>(res: &Result<T>) -> Status {
    match res {
        Ok(_) => Status::Success,
        Err(err) => err.status(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_maps_into_the_closed_set() {
        assert_eq!(GPUError::Failure("x").status(), Status::Failure);
        assert_eq!(GPUError::invalid("x").status(), Status::InvalidArgument);
        assert_eq!(
            GPUError::Capacity {
                requested: 4,
                available: 0
            }
            .status(),
            Status::OutOfMemory
        );
        assert_eq!(
            GPUError::NoMemoryType {
                location: MemoryLocation::Device
            }
            .status(),
            Status::Unsupported
        );
        assert_eq!(
            GPUError::Native {
                api: GraphicsApi::Vulkan,
                code: -3
            }
            .status(),
            Status::Failure
        );
        assert_eq!(GPUError::Timeout.status(), Status::Timeout);
        assert_eq!(GPUError::DeviceLost.status(), Status::DeviceLost);
    }

    #[test]
    fn status_of_success() {
        let ok: Result<u32> = Ok(1);
        assert_eq!(status_of(&ok), Status::Success);
        let err: Result<u32> = Err(GPUError::OutOfMemory);
        assert_eq!(status_of(&err), Status::OutOfMemory);
    }
}

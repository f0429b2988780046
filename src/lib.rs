//! Rendering hardware interface: one API over several graphics backends,
//! with capability discovery, memory classification, descriptor pools and
//! an optional validation layer.

pub mod gpu;
pub mod utils;

pub use gpu::*;
pub use utils::Handle;

//! Object kinds addressed through [`Handle`]s.
//!
//! Markers are uninhabited; they only give handles a type.

use crate::utils::Handle;

pub enum Buffer {}
pub enum Texture {}
/// Buffer view, texture view or sampler.
pub enum Descriptor {}
pub enum DescriptorPool {}
pub enum Fence {}
pub enum Memory {}
pub enum CommandQueue {}
pub enum CommandAllocator {}
pub enum CommandBuffer {}
pub enum QueryPool {}
pub enum SwapChain {}
pub enum AccelerationStructure {}
pub enum Streamer {}

/// Returned by `get_native_object` when there is no native object to expose
/// (conformance backend, validation-wrapped objects, the null handle).
pub const NO_NATIVE_OBJECT: u64 = 0;

/// Any object a device can name or expose natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Object {
    Device,
    Buffer(Handle<Buffer>),
    Texture(Handle<Texture>),
    Descriptor(Handle<Descriptor>),
    DescriptorPool(Handle<DescriptorPool>),
    Fence(Handle<Fence>),
    Memory(Handle<Memory>),
    CommandQueue(Handle<CommandQueue>),
    CommandAllocator(Handle<CommandAllocator>),
    CommandBuffer(Handle<CommandBuffer>),
    QueryPool(Handle<QueryPool>),
    SwapChain(Handle<SwapChain>),
    AccelerationStructure(Handle<AccelerationStructure>),
    Streamer(Handle<Streamer>),
}

impl Object {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Object::Device => "device",
            Object::Buffer(_) => "buffer",
            Object::Texture(_) => "texture",
            Object::Descriptor(_) => "descriptor",
            Object::DescriptorPool(_) => "descriptor pool",
            Object::Fence(_) => "fence",
            Object::Memory(_) => "memory",
            Object::CommandQueue(_) => "command queue",
            Object::CommandAllocator(_) => "command allocator",
            Object::CommandBuffer(_) => "command buffer",
            Object::QueryPool(_) => "query pool",
            Object::SwapChain(_) => "swap chain",
            Object::AccelerationStructure(_) => "acceleration structure",
            Object::Streamer(_) => "streamer",
        }
    }
}

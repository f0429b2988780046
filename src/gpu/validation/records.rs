use std::collections::HashMap;
use std::fmt;

use crate::gpu::descriptor::{
    DescriptorAllocator, DescriptorHandle, DescriptorHeapType, DescriptorRange,
    HostDescriptorBacking,
};
use crate::gpu::error::{GPUError, Result};
use crate::gpu::memory::MemoryTypeId;
use crate::gpu::objects::*;
use crate::gpu::structs::{BufferDesc, QueueType, TextureDesc};
use crate::utils::{Handle, Pool};

pub(crate) const LOG_TARGET: &str = "rhi::validation";

/// Logs a contract violation and turns it into the error handed back to the
/// caller. Nothing is forwarded after this.
pub(crate) fn violation(message: impl fmt::Display) -> GPUError {
    let message = message.to_string();
    log::error!(target: LOG_TARGET, "{}", message);
    GPUError::InvalidArgument(message)
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsageState {
    #[default]
    Idle,
    Mapped { offset: u64, size: u64 },
    Recording,
}

/// Shadow metadata kept for every wrapped object.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct ValidationRecord {
    pub debug_name: String,
    /// Backed and usable: memory bound for buffers and textures, always true
    /// for everything else.
    pub live: bool,
    pub usage: UsageState,
}

impl ValidationRecord {
    pub fn new(live: bool) -> Self {
        Self {
            debug_name: String::new(),
            live,
            usage: UsageState::Idle,
        }
    }
}

/// A wrapped object: the backend's handle, its record and per-kind state.
#[derive(Debug)]
pub(crate) struct Wrapped<K, S = ()> {
    pub inner: Handle<K>,
    pub record: ValidationRecord,
    pub state: S,
}

impl<K, S> Wrapped<K, S> {
    pub fn new(inner: Handle<K>, live: bool, state: S) -> Self {
        Self {
            inner,
            record: ValidationRecord::new(live),
            state,
        }
    }
}

/// How an object is named in diagnostics.
pub(crate) fn describe<K>(kind: &str, handle: Handle<K>, record: &ValidationRecord) -> String {
    if record.debug_name.is_empty() {
        format!("{} {:?}", kind, handle)
    } else {
        format!("{} '{}'", kind, record.debug_name)
    }
}

/// Resolves a caller handle or reports it as stale.
pub(crate) fn lookup<'a, K, S>(
    pool: &'a Pool<Wrapped<K, S>, K>,
    kind: &str,
    handle: Handle<K>,
) -> Result<&'a Wrapped<K, S>> {
    if handle.is_null() {
        return Err(violation(format!("null {} handle", kind)));
    }
    pool.get_ref(handle)
        .ok_or_else(|| violation(format!("stale or foreign {} handle {:?}", kind, handle)))
}

pub(crate) fn lookup_mut<'a, K, S>(
    pool: &'a mut Pool<Wrapped<K, S>, K>,
    kind: &str,
    handle: Handle<K>,
) -> Result<&'a mut Wrapped<K, S>> {
    if handle.is_null() {
        return Err(violation(format!("null {} handle", kind)));
    }
    pool.get_mut_ref(handle)
        .ok_or_else(|| violation(format!("stale or foreign {} handle {:?}", kind, handle)))
}

#[derive(Debug)]
pub(crate) struct BufferState {
    pub desc: BufferDesc,
    /// Allocations this buffer depends on.
    pub memories: Vec<Handle<Memory>>,
}

#[derive(Debug)]
pub(crate) struct TextureState {
    pub desc: TextureDesc,
    pub memories: Vec<Handle<Memory>>,
    /// Owned by a swap chain; destroyed with it.
    pub swap_chain: Option<Handle<SwapChain>>,
}

#[derive(Debug)]
pub(crate) struct MemoryState {
    /// `None` when the allocation was made on the caller's behalf.
    pub size: Option<u64>,
    pub memory_type: MemoryTypeId,
    /// Bindings ever made; never decremented.
    pub bound: u32,
    /// Live resources that still depend on this allocation.
    pub users: u32,
}

#[derive(Debug)]
pub(crate) struct DescriptorState {
    pub heap_type: DescriptorHeapType,
}

/// Mirrors the backend pool with a host-only allocator so ranges can be
/// checked and issued independently of what the backend returns.
pub(crate) struct DescriptorPoolState {
    pub shadow: DescriptorAllocator<HostDescriptorBacking>,
    pub ranges: HashMap<(DescriptorHeapType, DescriptorHandle), (u32, DescriptorRange)>,
}

impl fmt::Debug for DescriptorPoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorPoolState")
            .field("ranges", &self.ranges.len())
            .finish()
    }
}

impl DescriptorPoolState {
    /// Backend range for a range this layer issued.
    pub fn translate(&self, range: &DescriptorRange) -> Option<DescriptorRange> {
        match self.ranges.get(&(range.heap_type, range.first)) {
            Some((count, inner)) if *count == range.count => Some(*inner),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct QueueState {
    pub queue_type: QueueType,
}

#[derive(Debug)]
pub(crate) struct CommandBufferState {
    pub allocator: Handle<CommandAllocator>,
}

#[derive(Debug, Default)]
pub(crate) struct SwapChainState {
    pub textures: Option<Vec<Handle<Texture>>>,
}

#[derive(Debug)]
pub(crate) struct AccelerationStructureState {
    pub memories: Vec<Handle<Memory>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_handles_are_violations() {
        let mut pool: Pool<Wrapped<Buffer>, Buffer> = Pool::default();
        let h = pool.insert(Wrapped::new(Handle::sentinel(), true, ()));
        assert!(lookup(&pool, "buffer", h).is_ok());
        pool.release(h);
        assert!(matches!(
            lookup(&pool, "buffer", h),
            Err(GPUError::InvalidArgument(_))
        ));
        assert!(lookup(&pool, "buffer", Handle::null()).is_err());
    }

    #[test]
    fn names_show_up_in_descriptions() {
        let mut record = ValidationRecord::new(true);
        let h = Handle::<Buffer>::new(3, 1);
        assert!(describe("buffer", h, &record).contains("3v1"));
        record.debug_name = "vertices".into();
        assert_eq!(describe("buffer", h, &record), "buffer 'vertices'");
    }
}

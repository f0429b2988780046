//! Binding-table slot allocation.
//!
//! A [`DescriptorAllocator`] is what a backend's descriptor pool object
//! holds: one [`DescriptorHeapPool`] per kind over a single
//! [`DescriptorHeapBacking`].

pub mod heap;
pub mod pool;

pub use heap::{
    DescriptorHandle, DescriptorHeapBacking, DescriptorHeapInfo, DescriptorHeapType,
    DescriptorRange, HostDescriptorBacking,
};
pub use pool::DescriptorHeapPool;

use super::config::DescriptorPoolDesc;
use super::error::{GPUError, Result};

pub struct DescriptorAllocator<B: DescriptorHeapBacking> {
    backing: B,
    pools: [DescriptorHeapPool; DescriptorHeapType::COUNT],
}

impl<B: DescriptorHeapBacking> DescriptorAllocator<B> {
    pub fn new(mut backing: B, desc: &DescriptorPoolDesc) -> Result<Self> {
        let resources =
            DescriptorHeapPool::new(DescriptorHeapType::Resource, desc.resources, &mut backing)?;
        let samplers =
            DescriptorHeapPool::new(DescriptorHeapType::Sampler, desc.samplers, &mut backing)?;
        Ok(Self {
            backing,
            pools: [resources, samplers],
        })
    }

    pub fn pool(&self, heap_type: DescriptorHeapType) -> &DescriptorHeapPool {
        &self.pools[heap_type.index()]
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    pub fn allocate(&mut self, heap_type: DescriptorHeapType, count: u32) -> Result<DescriptorRange> {
        self.pools[heap_type.index()].allocate(count, &mut self.backing)
    }

    pub fn free(&mut self, range: &DescriptorRange) -> Result<()> {
        self.pools[range.heap_type.index()].free(range)
    }

    pub fn reset(&mut self) {
        for pool in &mut self.pools {
            pool.reset();
        }
    }

    pub fn is_allocated(&self, heap_type: DescriptorHeapType, handle: DescriptorHandle) -> bool {
        self.pools[heap_type.index()].is_allocated(handle)
    }

    /// Writes `payloads` into `range` starting at slot `offset` of the range.
    pub fn write(&mut self, range: &DescriptorRange, offset: u32, payloads: &[u64]) -> Result<()> {
        let end = offset as u64 + payloads.len() as u64;
        if end > range.count as u64 {
            return Err(GPUError::invalid(format!(
                "writing {} descriptors at {} overflows a range of {}",
                payloads.len(),
                offset,
                range.count
            )));
        }
        self.pools[range.heap_type.index()].check_range(range)?;

        for (i, payload) in payloads.iter().enumerate() {
            if let Some(handle) = range.get(offset + i as u32) {
                self.backing
                    .write_descriptor(range.heap_type, handle, *payload)?;
            }
        }
        Ok(())
    }

    pub fn read(&self, heap_type: DescriptorHeapType, handle: DescriptorHandle) -> Option<u64> {
        if !self.is_allocated(heap_type, handle) {
            return None;
        }
        self.backing.read_descriptor(heap_type, handle)
    }
}

impl<B: DescriptorHeapBacking> Drop for DescriptorAllocator<B> {
    fn drop(&mut self) {
        for pool in &mut self.pools {
            pool.destroy(&mut self.backing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::config::DescriptorHeapConfig;

    fn allocator() -> DescriptorAllocator<HostDescriptorBacking> {
        let cfg = DescriptorHeapConfig {
            initial_slots: 8,
            max_heap_slots: 32,
            max_total_slots: 128,
        };
        DescriptorAllocator::new(
            HostDescriptorBacking::new(),
            &DescriptorPoolDesc {
                resources: cfg,
                samplers: cfg,
            },
        )
        .unwrap()
    }

    #[test]
    fn kinds_use_separate_heaps() {
        let mut alloc = allocator();
        let r = alloc.allocate(DescriptorHeapType::Resource, 2).unwrap();
        let s = alloc.allocate(DescriptorHeapType::Sampler, 2).unwrap();
        assert_eq!(r.first, s.first);

        alloc.write(&r, 0, &[11, 12]).unwrap();
        alloc.write(&s, 1, &[21]).unwrap();
        assert_eq!(alloc.read(DescriptorHeapType::Resource, r.first), Some(11));
        assert_eq!(alloc.read(DescriptorHeapType::Sampler, s.first), Some(0));
        assert_eq!(alloc.read(DescriptorHeapType::Sampler, s.get(1).unwrap()), Some(21));
    }

    #[test]
    fn writes_are_bounded_by_the_range() {
        let mut alloc = allocator();
        let r = alloc.allocate(DescriptorHeapType::Resource, 2).unwrap();
        assert!(alloc.write(&r, 1, &[1, 2]).is_err());
        alloc.free(&r).unwrap();
        assert!(alloc.write(&r, 0, &[1]).is_err());
    }

    #[test]
    fn reset_hides_written_payloads() {
        let mut alloc = allocator();
        let r = alloc.allocate(DescriptorHeapType::Resource, 1).unwrap();
        alloc.write(&r, 0, &[5]).unwrap();
        alloc.reset();
        assert_eq!(alloc.read(DescriptorHeapType::Resource, r.first), None);
    }
}

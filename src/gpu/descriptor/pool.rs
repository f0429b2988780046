use super::heap::{
    DescriptorHandle, DescriptorHeapBacking, DescriptorHeapInfo, DescriptorHeapType,
    DescriptorRange,
};
use crate::gpu::config::{DescriptorHeapConfig, MAX_DESCRIPTOR_HEAP_SLOTS};
use crate::gpu::error::{GPUError, Result};

#[derive(Debug)]
struct HeapState {
    info: DescriptorHeapInfo,
    cursor: u32,
    /// Sorted offsets below `cursor` that were given back.
    free: Vec<u16>,
}

impl HeapState {
    fn remaining(&self) -> u32 {
        self.info.slots - self.cursor
    }

    fn is_free(&self, offset: u16) -> bool {
        self.free.binary_search(&offset).is_ok()
    }

    /// First run of `count` consecutive free offsets.
    fn find_free_run(&self, count: u32) -> Option<usize> {
        let count = count as usize;
        if self.free.len() < count {
            return None;
        }
        let mut start = 0;
        for i in 1..=self.free.len() {
            if i - start == count {
                return Some(start);
            }
            if i < self.free.len() && self.free[i] != self.free[i - 1] + 1 {
                start = i;
            }
        }
        None
    }

    /// Pulls trailing free slots back under the cursor.
    fn compact(&mut self) {
        while let Some(&last) = self.free.last() {
            if last as u32 + 1 != self.cursor {
                break;
            }
            self.free.pop();
            self.cursor -= 1;
        }
    }
}

/// Growable slab of descriptor slots of a single kind.
///
/// Heaps are appended, never resized, so handles stay valid across growth.
/// Not internally synchronised: callers serialise access to one pool.
#[derive(Debug)]
pub struct DescriptorHeapPool {
    heap_type: DescriptorHeapType,
    config: DescriptorHeapConfig,
    heaps: Vec<HeapState>,
    current: usize,
    total_slots: u32,
}

impl DescriptorHeapPool {
    /// Creates the pool and its first heap.
    pub fn new<B: DescriptorHeapBacking>(
        heap_type: DescriptorHeapType,
        config: DescriptorHeapConfig,
        backing: &mut B,
    ) -> Result<Self> {
        if config.initial_slots == 0
            || config.initial_slots > config.max_heap_slots
            || config.initial_slots > config.max_total_slots
        {
            return Err(GPUError::invalid(format!(
                "{:?} heap config {:?} has no usable first heap",
                heap_type, config
            )));
        }
        if config.max_heap_slots > MAX_DESCRIPTOR_HEAP_SLOTS {
            return Err(GPUError::invalid(format!(
                "{:?} heap ceiling {} exceeds {}",
                heap_type, config.max_heap_slots, MAX_DESCRIPTOR_HEAP_SLOTS
            )));
        }

        let mut pool = Self {
            heap_type,
            config,
            heaps: Vec::new(),
            current: 0,
            total_slots: 0,
        };
        pool.append_heap(config.initial_slots, backing)?;
        Ok(pool)
    }

    pub fn heap_type(&self) -> DescriptorHeapType {
        self.heap_type
    }

    pub fn config(&self) -> &DescriptorHeapConfig {
        &self.config
    }

    pub fn heap_count(&self) -> usize {
        self.heaps.len()
    }

    pub fn heap(&self, heap_index: u16) -> Option<&DescriptorHeapInfo> {
        self.heaps.get(heap_index as usize).map(|h| &h.info)
    }

    pub fn total_slots(&self) -> u32 {
        self.total_slots
    }

    fn append_heap<B: DescriptorHeapBacking>(&mut self, slots: u32, backing: &mut B) -> Result<()> {
        let heap_index = self.heaps.len();
        if heap_index > u16::MAX as usize {
            return Err(GPUError::Capacity {
                requested: slots,
                available: 0,
            });
        }

        let info = backing.create_heap(self.heap_type, heap_index as u16, slots)?;
        self.heaps.push(HeapState {
            info,
            cursor: 0,
            free: Vec::new(),
        });
        self.total_slots += slots;
        log::debug!(
            "{:?} descriptor heap {} created with {} slots ({} total)",
            self.heap_type,
            heap_index,
            slots,
            self.total_slots
        );
        Ok(())
    }

    /// Hands out `count` contiguous slots.
    ///
    /// Free slots are reused first, then the current heap and those after it
    /// are bumped, then a new heap is appended. Fails with a capacity error,
    /// issuing nothing, when growth would exceed the configured maximum.
    pub fn allocate<B: DescriptorHeapBacking>(
        &mut self,
        count: u32,
        backing: &mut B,
    ) -> Result<DescriptorRange> {
        if count == 0 {
            return Err(GPUError::invalid("descriptor count must be non-zero"));
        }
        if count > self.config.max_heap_slots {
            return Err(GPUError::Capacity {
                requested: count,
                available: self.config.max_heap_slots,
            });
        }

        let reused = self
            .heaps
            .iter_mut()
            .enumerate()
            .find_map(|(heap_index, heap)| {
                let start = heap.find_free_run(count)?;
                let first = heap.free[start];
                heap.free.drain(start..start + count as usize);
                Some((heap_index, first))
            });
        if let Some((heap_index, first)) = reused {
            return Ok(self.range(heap_index, first as u32, count));
        }

        for heap_index in self.current..self.heaps.len() {
            if self.heaps[heap_index].remaining() >= count {
                return Ok(self.bump(heap_index, count));
            }
        }

        let previous = self.heaps.last().map(|h| h.info.slots).unwrap_or(0);
        let mut slots = previous
            .saturating_mul(2)
            .min(self.config.max_heap_slots)
            .max(count);
        let available = self.config.max_total_slots.saturating_sub(self.total_slots);
        if slots > available {
            if available < count {
                return Err(GPUError::Capacity {
                    requested: count,
                    available,
                });
            }
            slots = available;
        }

        self.append_heap(slots, backing)?;
        Ok(self.bump(self.heaps.len() - 1, count))
    }

    fn bump(&mut self, heap_index: usize, count: u32) -> DescriptorRange {
        let heap = &mut self.heaps[heap_index];
        let first = heap.cursor;
        heap.cursor += count;
        self.current = heap_index;
        self.range(heap_index, first, count)
    }

    fn range(&self, heap_index: usize, first: u32, count: u32) -> DescriptorRange {
        DescriptorRange {
            heap_type: self.heap_type,
            first: DescriptorHandle {
                heap_index: heap_index as u16,
                heap_offset: first as u16,
            },
            count,
        }
    }

    /// Returns a range to its heap's free list.
    pub fn free(&mut self, range: &DescriptorRange) -> Result<()> {
        self.check_range(range)?;

        let heap = &mut self.heaps[range.first.heap_index as usize];
        for handle in range.handles() {
            if let Err(pos) = heap.free.binary_search(&handle.heap_offset) {
                heap.free.insert(pos, handle.heap_offset);
            }
        }
        heap.compact();
        Ok(())
    }

    /// Invalidates every handle the pool ever issued. Native heaps are kept.
    pub fn reset(&mut self) {
        for heap in &mut self.heaps {
            heap.cursor = 0;
            heap.free.clear();
        }
        self.current = 0;
    }

    pub fn is_allocated(&self, handle: DescriptorHandle) -> bool {
        match self.heaps.get(handle.heap_index as usize) {
            Some(heap) => {
                (handle.heap_offset as u32) < heap.cursor && !heap.is_free(handle.heap_offset)
            }
            None => false,
        }
    }

    /// Fails unless every slot of `range` is currently allocated from this pool.
    pub fn check_range(&self, range: &DescriptorRange) -> Result<()> {
        if range.heap_type != self.heap_type {
            return Err(GPUError::invalid(format!(
                "{:?} range passed to the {:?} heap",
                range.heap_type, self.heap_type
            )));
        }
        if range.count == 0 {
            return Err(GPUError::invalid("empty descriptor range"));
        }
        let heap = self
            .heaps
            .get(range.first.heap_index as usize)
            .ok_or_else(|| GPUError::invalid(format!("no heap {}", range.first.heap_index)))?;
        let end = range.first.heap_offset as u32 + range.count;
        if end > heap.info.slots {
            return Err(GPUError::invalid(format!(
                "range {:?} runs past heap of {} slots",
                range, heap.info.slots
            )));
        }
        if let Some(handle) = range.handles().find(|h| !self.is_allocated(*h)) {
            return Err(GPUError::invalid(format!(
                "{:?} slot {:?} is not allocated",
                self.heap_type, handle
            )));
        }
        Ok(())
    }

    pub(crate) fn destroy<B: DescriptorHeapBacking>(&mut self, backing: &mut B) {
        for heap_index in 0..self.heaps.len() {
            backing.destroy_heap(self.heap_type, heap_index as u16);
        }
        self.heaps.clear();
        self.total_slots = 0;
        self.current = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::descriptor::heap::HostDescriptorBacking;
    use std::collections::HashSet;

    fn config(initial: u32, ceiling: u32, total: u32) -> DescriptorHeapConfig {
        DescriptorHeapConfig {
            initial_slots: initial,
            max_heap_slots: ceiling,
            max_total_slots: total,
        }
    }

    fn pool(cfg: DescriptorHeapConfig) -> (DescriptorHeapPool, HostDescriptorBacking) {
        let mut backing = HostDescriptorBacking::new();
        let pool = DescriptorHeapPool::new(DescriptorHeapType::Resource, cfg, &mut backing).unwrap();
        (pool, backing)
    }

    #[test]
    fn grows_by_doubling_when_current_heap_is_full() {
        let (mut pool, mut backing) = pool(config(8, 64, 1024));
        let a = pool.allocate(4, &mut backing).unwrap();
        let b = pool.allocate(4, &mut backing).unwrap();
        let c = pool.allocate(4, &mut backing).unwrap();

        assert_eq!(a.first.heap_index, 0);
        assert_eq!(b.first.heap_index, 0);
        assert_eq!(c.first.heap_index, 1);
        assert_eq!(pool.heap(1).unwrap().slots, 16);

        let all: HashSet<_> = [a, b, c].iter().flat_map(|r| r.handles().collect::<Vec<_>>()).collect();
        assert_eq!(all.len(), 12);
    }

    #[test]
    fn growth_stops_at_ceiling() {
        let (mut pool, mut backing) = pool(config(8, 16, 1024));
        pool.allocate(8, &mut backing).unwrap();
        pool.allocate(16, &mut backing).unwrap();
        pool.allocate(1, &mut backing).unwrap();
        assert_eq!(pool.heap(2).unwrap().slots, 16);
    }

    #[test]
    fn request_larger_than_doubled_heap_gets_a_heap_that_fits() {
        let (mut pool, mut backing) = pool(config(4, 64, 1024));
        let r = pool.allocate(40, &mut backing).unwrap();
        assert_eq!(r.first.heap_index, 1);
        assert!(pool.heap(1).unwrap().slots >= 40);
    }

    #[test]
    fn capacity_errors_issue_nothing() {
        let (mut pool, mut backing) = pool(config(8, 16, 12));
        assert!(matches!(
            pool.allocate(17, &mut backing),
            Err(GPUError::Capacity { requested: 17, .. })
        ));
        pool.allocate(8, &mut backing).unwrap();
        // Only 4 slots left in the total budget.
        pool.allocate(2, &mut backing).unwrap();
        assert_eq!(pool.heap(1).unwrap().slots, 4);
        assert!(matches!(
            pool.allocate(3, &mut backing),
            Err(GPUError::Capacity {
                requested: 3,
                available: 0
            })
        ));
        assert_eq!(pool.heap_count(), 2);
        let h = DescriptorHandle {
            heap_index: 1,
            heap_offset: 2,
        };
        assert!(!pool.is_allocated(h));
    }

    #[test]
    fn unusable_configs_are_rejected_up_front() {
        let mut backing = HostDescriptorBacking::new();
        for cfg in [config(0, 64, 1024), config(32, 16, 1024), config(16, 64, 8)] {
            assert!(matches!(
                DescriptorHeapPool::new(DescriptorHeapType::Resource, cfg, &mut backing),
                Err(GPUError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn reset_invalidates_every_handle_and_keeps_heaps() {
        let (mut pool, mut backing) = pool(config(8, 64, 1024));
        let a = pool.allocate(8, &mut backing).unwrap();
        let b = pool.allocate(8, &mut backing).unwrap();
        pool.reset();

        assert_eq!(pool.heap_count(), 2);
        for h in a.handles().chain(b.handles()) {
            assert!(!pool.is_allocated(h));
        }

        let again = pool.allocate(8, &mut backing).unwrap();
        assert_eq!(again.first.heap_index, 0);
        assert!(again.handles().all(|h| pool.is_allocated(h)));
        // Second heap is idle until the first runs out.
        assert!(b.handles().all(|h| !pool.is_allocated(h)));
    }

    #[test]
    fn freed_slots_are_reused_before_bumping() {
        let (mut pool, mut backing) = pool(config(16, 64, 1024));
        let _a = pool.allocate(4, &mut backing).unwrap();
        let b = pool.allocate(4, &mut backing).unwrap();
        let _c = pool.allocate(4, &mut backing).unwrap();

        pool.free(&b).unwrap();
        assert!(b.handles().all(|h| !pool.is_allocated(h)));

        let d = pool.allocate(3, &mut backing).unwrap();
        assert_eq!(d.first, b.first);
        let e = pool.allocate(2, &mut backing).unwrap();
        assert_eq!(e.first.heap_offset, 12);
    }

    #[test]
    fn double_free_is_rejected() {
        let (mut pool, mut backing) = pool(config(16, 64, 1024));
        let a = pool.allocate(4, &mut backing).unwrap();
        let _b = pool.allocate(4, &mut backing).unwrap();
        pool.free(&a).unwrap();
        assert!(pool.free(&a).is_err());

        let never = DescriptorRange {
            heap_type: DescriptorHeapType::Resource,
            first: DescriptorHandle {
                heap_index: 0,
                heap_offset: 12,
            },
            count: 1,
        };
        assert!(pool.free(&never).is_err());
    }

    #[test]
    fn freeing_the_tail_rewinds_the_cursor() {
        let (mut pool, mut backing) = pool(config(8, 64, 1024));
        let _a = pool.allocate(4, &mut backing).unwrap();
        let b = pool.allocate(4, &mut backing).unwrap();
        pool.free(&b).unwrap();
        let c = pool.allocate(4, &mut backing).unwrap();
        assert_eq!(c.first, b.first);
        assert_eq!(pool.heap_count(), 1);
    }

    #[test]
    fn zero_count_is_invalid() {
        let (mut pool, mut backing) = pool(config(8, 64, 1024));
        assert!(matches!(
            pool.allocate(0, &mut backing),
            Err(GPUError::InvalidArgument(_))
        ));
    }
}

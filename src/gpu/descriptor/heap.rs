use crate::gpu::error::{GPUError, Result};

/// Descriptor kinds never share a heap.
#[repr(u8)]
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DescriptorHeapType {
    /// Buffer and texture views.
    #[default]
    Resource,
    Sampler,
}

impl DescriptorHeapType {
    pub const COUNT: usize = 2;

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// One binding-table slot.
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DescriptorHandle {
    pub heap_index: u16,
    pub heap_offset: u16,
}

/// `count` contiguous slots starting at `first`, all in one heap.
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorRange {
    pub heap_type: DescriptorHeapType,
    pub first: DescriptorHandle,
    pub count: u32,
}

impl DescriptorRange {
    pub fn get(&self, index: u32) -> Option<DescriptorHandle> {
        if index >= self.count {
            return None;
        }
        Some(DescriptorHandle {
            heap_index: self.first.heap_index,
            heap_offset: self.first.heap_offset + index as u16,
        })
    }

    pub fn handles(&self) -> impl Iterator<Item = DescriptorHandle> + '_ {
        (0..self.count).filter_map(move |i| self.get(i))
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Native block backing one heap.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorHeapInfo {
    pub host_base: usize,
    /// Zero when the native model has no separate device address.
    pub device_base: u64,
    pub stride: u32,
    pub slots: u32,
}

impl DescriptorHeapInfo {
    pub fn host_address(&self, offset: u16) -> usize {
        self.host_base + offset as usize * self.stride as usize
    }
}

/// Creates native heaps and writes descriptor payloads into them.
pub trait DescriptorHeapBacking {
    fn create_heap(
        &mut self,
        heap_type: DescriptorHeapType,
        heap_index: u16,
        slots: u32,
    ) -> Result<DescriptorHeapInfo>;

    fn write_descriptor(
        &mut self,
        heap_type: DescriptorHeapType,
        handle: DescriptorHandle,
        payload: u64,
    ) -> Result<()>;

    fn read_descriptor(&self, heap_type: DescriptorHeapType, handle: DescriptorHandle)
        -> Option<u64>;

    fn destroy_heap(&mut self, heap_type: DescriptorHeapType, heap_index: u16);
}

/// Heaps kept in host memory, one `u64` payload per slot.
#[derive(Default, Debug)]
pub struct HostDescriptorBacking {
    heaps: [Vec<Option<Box<[u64]>>>; DescriptorHeapType::COUNT],
}

impl HostDescriptorBacking {
    pub const STRIDE: u32 = std::mem::size_of::<u64>() as u32;

    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self, heap_type: DescriptorHeapType, heap_index: u16) -> Option<&[u64]> {
        self.heaps[heap_type.index()]
            .get(heap_index as usize)
            .and_then(|h| h.as_deref())
    }
}

impl DescriptorHeapBacking for HostDescriptorBacking {
    fn create_heap(
        &mut self,
        heap_type: DescriptorHeapType,
        heap_index: u16,
        slots: u32,
    ) -> Result<DescriptorHeapInfo> {
        let heaps = &mut self.heaps[heap_type.index()];
        let index = heap_index as usize;
        if heaps.len() <= index {
            heaps.resize_with(index + 1, || None);
        }
        if heaps[index].is_some() {
            return Err(GPUError::invalid(format!(
                "{:?} heap {} already exists",
                heap_type, heap_index
            )));
        }

        let block = vec![0u64; slots as usize].into_boxed_slice();
        let info = DescriptorHeapInfo {
            host_base: block.as_ptr() as usize,
            device_base: 0,
            stride: Self::STRIDE,
            slots,
        };
        heaps[index] = Some(block);
        Ok(info)
    }

    fn write_descriptor(
        &mut self,
        heap_type: DescriptorHeapType,
        handle: DescriptorHandle,
        payload: u64,
    ) -> Result<()> {
        let slot = self.heaps[heap_type.index()]
            .get_mut(handle.heap_index as usize)
            .and_then(|h| h.as_deref_mut())
            .and_then(|h| h.get_mut(handle.heap_offset as usize))
            .ok_or_else(|| GPUError::invalid(format!("no {:?} slot at {:?}", heap_type, handle)))?;
        *slot = payload;
        Ok(())
    }

    fn read_descriptor(
        &self,
        heap_type: DescriptorHeapType,
        handle: DescriptorHandle,
    ) -> Option<u64> {
        self.slots(heap_type, handle.heap_index)
            .and_then(|h| h.get(handle.heap_offset as usize))
            .copied()
    }

    fn destroy_heap(&mut self, heap_type: DescriptorHeapType, heap_index: u16) {
        if let Some(heap) = self.heaps[heap_type.index()].get_mut(heap_index as usize) {
            heap.take();
        }
    }
}

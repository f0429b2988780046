use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Generation-checked reference to an object stored in a [`Pool`].
///
/// `K` is a marker naming the kind of object (buffer, fence, ...). Handles are
/// plain 64-bit values; they carry no ownership and stay `Copy`.
pub struct Handle<K> {
    pub slot: u32,
    pub generation: u32,
    phantom: PhantomData<fn() -> K>,
}

impl<K> Handle<K> {
    const SENTINEL_BITS: u32 = u32::MAX;

    pub const fn new(slot: u32, generation: u32) -> Self {
        Self {
            slot,
            generation,
            phantom: PhantomData,
        }
    }

    /// The null handle. Never issued by a pool.
    pub const fn null() -> Self {
        Self::new(0, 0)
    }

    /// Invalid-but-non-null handle returned by backends that own no objects.
    pub const fn sentinel() -> Self {
        Self::new(Self::SENTINEL_BITS, Self::SENTINEL_BITS)
    }

    pub fn is_null(&self) -> bool {
        self.generation == 0
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::sentinel()
    }

    pub fn to_raw(&self) -> u64 {
        ((self.generation as u64) << 32) | self.slot as u64
    }

    pub fn from_raw(raw: u64) -> Self {
        Self::new(raw as u32, (raw >> 32) as u32)
    }
}

impl<K> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sentinel() {
            return write!(f, "Handle(sentinel)");
        }
        write!(f, "Handle({}v{})", self.slot, self.generation)
    }
}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot && self.generation == other.generation
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.slot.hash(state);
        self.generation.hash(state);
    }
}

impl<K> Default for Handle<K> {
    fn default() -> Self {
        Self::null()
    }
}

/// Arena of `T` values addressed by `Handle<K>`.
///
/// Releasing a slot bumps its generation, so any handle issued before the
/// release is rejected by `get_ref`/`get_mut_ref`/`release` afterwards.
pub struct Pool<T, K = T> {
    items: Vec<Option<T>>,
    empty: Vec<u32>,
    generation: Vec<u32>,
    live: usize,
    phantom: PhantomData<fn() -> K>,
}

impl<T, K> Default for Pool<T, K> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T, K> Pool<T, K> {
    pub fn new(initial_size: usize) -> Self {
        let mut p = Pool {
            items: Vec::with_capacity(initial_size),
            empty: Vec::with_capacity(initial_size),
            generation: vec![1; initial_size],
            live: 0,
            phantom: PhantomData,
        };

        p.items.resize_with(initial_size, || None);
        // Lowest slots are handed out first.
        p.empty = (0..initial_size as u32).rev().collect();
        p
    }

    pub fn insert(&mut self, item: T) -> Handle<K> {
        let slot = match self.empty.pop() {
            Some(slot) => slot,
            None => {
                self.items.push(None);
                self.generation.push(1);
                (self.items.len() - 1) as u32
            }
        };

        self.items[slot as usize] = Some(item);
        self.live += 1;
        Handle::new(slot, self.generation[slot as usize])
    }

    fn is_current(&self, item: Handle<K>) -> bool {
        let slot = item.slot as usize;
        slot < self.items.len()
            && self.generation[slot] == item.generation
            && self.items[slot].is_some()
    }

    pub fn contains(&self, item: Handle<K>) -> bool {
        self.is_current(item)
    }

    /// Removes the object and retires the handle.
    pub fn release(&mut self, item: Handle<K>) -> Option<T> {
        if !self.is_current(item) {
            return None;
        }

        let slot = item.slot as usize;
        let value = self.items[slot].take();
        // Skip generation 0 so a recycled slot never collides with null.
        self.generation[slot] = self.generation[slot].wrapping_add(1).max(1);
        self.empty.push(item.slot);
        self.live -= 1;
        value
    }

    pub fn get_ref(&self, item: Handle<K>) -> Option<&T> {
        if !self.is_current(item) {
            return None;
        }
        self.items[item.slot as usize].as_ref()
    }

    pub fn get_mut_ref(&mut self, item: Handle<K>) -> Option<&mut T> {
        if !self.is_current(item) {
            return None;
        }
        self.items[item.slot as usize].as_mut()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn for_each_occupied<F>(&self, mut func: F)
    where
        F: FnMut(Handle<K>, &T),
    {
        for (slot, item) in self.items.iter().enumerate() {
            if let Some(item) = item {
                func(Handle::new(slot as u32, self.generation[slot]), item);
            }
        }
    }

    /// Removes every object, retiring all outstanding handles.
    pub fn drain(&mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.live);
        for slot in 0..self.items.len() {
            if let Some(item) = self.items[slot].take() {
                self.generation[slot] = self.generation[slot].wrapping_add(1).max(1);
                self.empty.push(slot as u32);
                out.push(item);
            }
        }
        self.live = 0;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    enum Marker {}

    #[test]
    fn released_handles_are_rejected() {
        let mut pool: Pool<u32, Marker> = Pool::default();
        let a = pool.insert(7);
        assert_eq!(pool.get_ref(a), Some(&7));

        assert_eq!(pool.release(a), Some(7));
        assert!(pool.get_ref(a).is_none());
        assert!(pool.release(a).is_none());

        // Slot is recycled under a new generation.
        let b = pool.insert(9);
        assert_eq!(a.slot, b.slot);
        assert_ne!(a.generation, b.generation);
        assert!(pool.get_ref(a).is_none());
        assert_eq!(pool.get_ref(b), Some(&9));
    }

    #[test]
    fn null_and_sentinel_never_resolve() {
        let mut pool: Pool<u32, Marker> = Pool::new(4);
        let h = pool.insert(1);
        assert!(!h.is_null());
        assert!(pool.get_ref(Handle::null()).is_none());
        assert!(pool.get_ref(Handle::sentinel()).is_none());
        assert!(Handle::<Marker>::sentinel().is_sentinel());
        assert!(!Handle::<Marker>::sentinel().is_null());
    }

    #[test]
    fn raw_round_trip_and_width() {
        let h = Handle::<Marker>::new(12, 34);
        assert_eq!(Handle::<Marker>::from_raw(h.to_raw()), h);
        assert_eq!(std::mem::size_of::<Handle<Marker>>(), std::mem::size_of::<u64>());
    }

    #[test]
    fn drain_retires_everything() {
        let mut pool: Pool<&str, Marker> = Pool::default();
        let a = pool.insert("a");
        let b = pool.insert("b");
        let drained = pool.drain();
        assert_eq!(drained.len(), 2);
        assert!(pool.is_empty());
        assert!(pool.get_ref(a).is_none());
        assert!(pool.get_ref(b).is_none());
    }
}

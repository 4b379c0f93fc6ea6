//! Fixed-capacity slot pool with generational handles.
//!
//! Every pooled entity in the crate (VFX instances, particles, decals,
//! screen shakes) lives in one of these. Allocation takes the lowest free
//! slot so the layout, and therefore iteration order, is a pure function of
//! the alloc/free history.

/// Index-based handle into a [`SlotPool`]. Stale handles (slot freed and
/// reused) are rejected by the generation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Slot index inside the owning pool.
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// Fragmentation snapshot of a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolAudit {
    pub active: usize,
    pub free: usize,
    /// Number of maximal runs of consecutive free slots.
    pub free_runs: usize,
    /// Length of the longest free run.
    pub max_free_run: usize,
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Arena of `capacity` slots. Never grows.
#[derive(Debug, Clone)]
pub struct SlotPool<T> {
    slots: Vec<Slot<T>>,
    len: usize,
}

impl<T> SlotPool<T> {
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot { generation: 0, value: None })
            .collect();
        Self { slots, len: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Store `value` in the lowest free slot. Returns None when full.
    pub fn allocate(&mut self, value: T) -> Option<Handle> {
        let index = self.slots.iter().position(|s| s.value.is_none())?;
        let slot = &mut self.slots[index];
        slot.value = Some(value);
        self.len += 1;
        Some(Handle {
            index: index as u32,
            generation: slot.generation,
        })
    }

    /// Release a slot. Returns the stored value if the handle was live.
    pub fn free(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        let slot = self.slots.get(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Iterate live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|v| {
                (
                    Handle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    v,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value.as_mut().map(|v| {
                (
                    Handle {
                        index: index as u32,
                        generation,
                    },
                    v,
                )
            })
        })
    }

    /// Visit every live entry in slot order; entries for which `keep`
    /// returns false are freed.
    pub fn retain(&mut self, mut keep: impl FnMut(Handle, &mut T) -> bool) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let handle = Handle {
                index: index as u32,
                generation: slot.generation,
            };
            let alive = match slot.value.as_mut() {
                Some(v) => keep(handle, v),
                None => continue,
            };
            if !alive {
                slot.value = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.len -= 1;
            }
        }
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.len = 0;
    }

    pub fn audit(&self) -> PoolAudit {
        let mut audit = PoolAudit::default();
        let mut run = 0usize;
        for slot in &self.slots {
            if slot.value.is_some() {
                audit.active += 1;
                if run > 0 {
                    audit.free_runs += 1;
                    audit.max_free_run = audit.max_free_run.max(run);
                    run = 0;
                }
            } else {
                audit.free += 1;
                run += 1;
            }
        }
        if run > 0 {
            audit.free_runs += 1;
            audit.max_free_run = audit.max_free_run.max(run);
        }
        audit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_takes_lowest_free_slot() {
        let mut pool: SlotPool<u32> = SlotPool::new(4);
        let a = pool.allocate(1).unwrap();
        let b = pool.allocate(2).unwrap();
        pool.allocate(3).unwrap();
        pool.free(a);
        let d = pool.allocate(4).unwrap();
        assert_eq!(d.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn stale_handle_rejected() {
        let mut pool: SlotPool<u32> = SlotPool::new(2);
        let a = pool.allocate(10).unwrap();
        assert_eq!(pool.free(a), Some(10));
        let b = pool.allocate(20).unwrap();
        assert_eq!(a.index(), b.index());
        assert!(pool.get(a).is_none());
        assert_eq!(pool.get(b), Some(&20));
        assert!(pool.free(a).is_none());
    }

    #[test]
    fn full_pool_refuses() {
        let mut pool: SlotPool<u8> = SlotPool::new(1);
        assert!(pool.allocate(1).is_some());
        assert!(pool.is_full());
        assert!(pool.allocate(2).is_none());
    }

    #[test]
    fn retain_frees_rejected_entries() {
        let mut pool: SlotPool<u32> = SlotPool::new(8);
        for v in 0..6 {
            pool.allocate(v);
        }
        pool.retain(|_, v| *v % 2 == 0);
        assert_eq!(pool.len(), 3);
        let kept: Vec<u32> = pool.iter().map(|(_, v)| *v).collect();
        assert_eq!(kept, vec![0, 2, 4]);
    }

    #[test]
    fn audit_counts_free_runs() {
        let mut pool: SlotPool<u32> = SlotPool::new(8);
        let handles: Vec<Handle> = (0..8).map(|v| pool.allocate(v).unwrap()).collect();
        pool.free(handles[1]);
        pool.free(handles[2]);
        pool.free(handles[5]);
        let audit = pool.audit();
        assert_eq!(audit.active, 5);
        assert_eq!(audit.free, 3);
        assert_eq!(audit.free_runs, 2);
        assert_eq!(audit.max_free_run, 2);
    }

    #[test]
    fn audit_of_empty_pool_is_one_run() {
        let pool: SlotPool<u32> = SlotPool::new(16);
        let audit = pool.audit();
        assert_eq!(audit.free_runs, 1);
        assert_eq!(audit.max_free_run, 16);
    }
}

//! Managed heap.
//!
//! The heap is an arena: a growable vector of slots plus a free list of
//! slot indices. Each slot owns at most one object and keeps a
//! monotonically assigned id for debugging. A `Reference` is a typed
//! handle holding a slot index; copying a reference copies the index,
//! never the object, and the collector may empty a slot without
//! invalidating handles that point at it — such handles simply read as
//! null afterwards.
//!
//! Collection is strictly two-phase: `mark` must be called for every root
//! before `sweep` runs. Marking sets the `MARKED` bit in the object flag
//! bitmap and terminates on cycles because the bit is checked before
//! recursing; sweeping reclaims every unmarked object in one scan and
//! clears the bit on survivors.

use std::collections::HashMap;
use std::io::{self, Write};

use crate::log_enabled;
use crate::object::{Object, ObjectFlags};

/// Index of a slot within the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotIndex(pub u32);

/// A handle to a heap slot. May be null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Reference {
    slot: Option<SlotIndex>,
}

impl Reference {
    pub const NULL: Reference = Reference { slot: None };

    pub(crate) fn new(slot: SlotIndex) -> Self {
        Self { slot: Some(slot) }
    }

    pub fn is_null(&self) -> bool {
        self.slot.is_none()
    }

    pub fn slot(&self) -> Option<SlotIndex> {
        self.slot
    }
}

/// GC bookkeeping for one object.
#[derive(Debug)]
pub struct Slot {
    /// Monotonically assigned; never reused even when the slot is.
    pub id: u64,
    pub obj: Option<Box<dyn Object>>,
}

/// The arena of slots.
#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<SlotIndex>,
    next_id: u64,
    num_objects: u32,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a slot for `obj` and return a handle to it.
    pub fn alloc(&mut self, obj: Box<dyn Object>) -> Reference {
        let id = self.next_id;
        self.next_id += 1;
        self.num_objects += 1;

        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index.0 as usize] = Slot { id, obj: Some(obj) };
                index
            }
            None => {
                self.slots.push(Slot { id, obj: Some(obj) });
                SlotIndex((self.slots.len() - 1) as u32)
            }
        };
        if log_enabled() {
            eprintln!("[rye runtime] alloc #{} at slot {}", id, index.0);
        }
        Reference::new(index)
    }

    pub fn get(&self, reference: Reference) -> Option<&dyn Object> {
        let index = reference.slot()?;
        self.slots.get(index.0 as usize)?.obj.as_deref()
    }

    pub fn get_mut(&mut self, reference: Reference) -> Option<&mut (dyn Object + 'static)> {
        let index = reference.slot()?;
        self.slots.get_mut(index.0 as usize)?.obj.as_deref_mut()
    }

    /// Temporarily move an object out of its slot, e.g. for invocation.
    /// The slot stays reserved; callers must `restore` the object and must
    /// not run a collection in between.
    pub fn take(&mut self, reference: Reference) -> Option<Box<dyn Object>> {
        let index = reference.slot()?;
        self.slots.get_mut(index.0 as usize)?.obj.take()
    }

    /// Put back an object previously removed with `take`.
    pub fn restore(&mut self, reference: Reference, obj: Box<dyn Object>) {
        if let Some(index) = reference.slot()
            && let Some(slot) = self.slots.get_mut(index.0 as usize)
            && slot.obj.is_none()
        {
            slot.obj = Some(obj);
        }
    }

    /// Mark phase: flag every object reachable from `root`.
    pub fn mark(&mut self, root: Reference) {
        let mut pending = vec![root];
        while let Some(reference) = pending.pop() {
            let Some(index) = reference.slot() else {
                continue;
            };
            let Some(slot) = self.slots.get_mut(index.0 as usize) else {
                continue;
            };
            let Some(obj) = slot.obj.as_mut() else {
                continue;
            };
            if obj.core().flags.contains(ObjectFlags::MARKED) {
                continue;
            }
            obj.core_mut().flags.insert(ObjectFlags::MARKED);
            for (_, field) in obj.core().fields() {
                pending.push(*field);
            }
        }
    }

    /// Sweep phase: reclaim every unmarked object in one scan over the
    /// arena and clear the mark bit on survivors.
    pub fn sweep(&mut self) {
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            let Some(obj) = slot.obj.as_mut() else {
                continue;
            };
            if obj.core().flags.contains(ObjectFlags::MARKED) {
                obj.core_mut().flags.remove(ObjectFlags::MARKED);
            } else {
                if log_enabled() {
                    eprintln!("[rye runtime] sweep: reclaiming #{}", slot.id);
                }
                slot.obj = None;
                self.free.push(SlotIndex(index as u32));
                self.num_objects -= 1;
            }
        }
    }

    /// Number of live objects.
    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    /// Deep structural copy of the object graph reachable from `source`.
    ///
    /// Clones are memoized by source slot, so shared sub-structure stays
    /// shared and cyclic graphs terminate.
    pub fn clone_object(&mut self, source: Reference) -> Reference {
        let mut memo = HashMap::new();
        self.clone_rec(source, &mut memo)
    }

    fn clone_rec(
        &mut self,
        source: Reference,
        memo: &mut HashMap<SlotIndex, Reference>,
    ) -> Reference {
        let Some(index) = source.slot() else {
            return Reference::NULL;
        };
        if let Some(&done) = memo.get(&index) {
            return done;
        }
        let Some(obj) = self.take(source) else {
            return Reference::NULL;
        };
        let fresh = obj.shallow_clone();
        let fields: Vec<(String, Reference)> = obj.core().fields().to_vec();
        self.restore(source, obj);

        let target = self.alloc(fresh);
        memo.insert(index, target);

        for (name, field) in fields {
            if field.is_null() {
                continue;
            }
            let cloned = self.clone_rec(field, memo);
            if let Some(target_obj) = self.get_mut(target) {
                target_obj.core_mut().add_field_reference(name, cloned);
            }
        }
        target
    }

    /// Render the live slot table for debugging.
    pub fn dump(&self, out: &mut dyn Write) -> io::Result<()> {
        for slot in &self.slots {
            if let Some(obj) = slot.obj.as_deref() {
                writeln!(
                    out,
                    "#{}\t{:#04x}\t{}",
                    slot.id,
                    obj.core().flags.bits(),
                    obj.to_string()
                )?;
            }
        }
        Ok(())
    }

    /// Arena consistency probe used by tests: the free list and the live
    /// slots must partition the arena, and the object count must match.
    pub fn check_consistency(&self) -> bool {
        let mut free_seen = vec![false; self.slots.len()];
        for index in &self.free {
            let idx = index.0 as usize;
            if idx >= self.slots.len() || free_seen[idx] {
                return false;
            }
            if self.slots[idx].obj.is_some() {
                return false;
            }
            free_seen[idx] = true;
        }
        let live = self
            .slots
            .iter()
            .filter(|slot| slot.obj.is_some())
            .count();
        live == self.num_objects as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{IntObject, UserObject};

    #[test]
    fn alloc_returns_distinct_live_handles() {
        let mut heap = Heap::new();
        let a = heap.alloc(Box::new(IntObject::new(1)));
        let b = heap.alloc(Box::new(IntObject::new(2)));
        assert_ne!(a, b);
        assert!(heap.get(a).is_some());
        assert!(heap.get(b).is_some());
        assert_eq!(heap.num_objects(), 2);
        assert!(heap.check_consistency());
    }

    #[test]
    fn freed_slots_are_reused_with_fresh_ids() {
        let mut heap = Heap::new();
        let a = heap.alloc(Box::new(IntObject::new(1)));
        heap.sweep();
        assert_eq!(heap.num_objects(), 0);
        assert!(heap.get(a).is_none());

        let b = heap.alloc(Box::new(IntObject::new(2)));
        // The slot was reused, so the stale handle observes the new value;
        // callers must not retain references across a collection.
        assert_eq!(a.slot(), b.slot());
        assert!(heap.check_consistency());
    }

    #[test]
    fn mark_terminates_on_cycles() {
        let mut heap = Heap::new();
        let a = heap.alloc(Box::new(UserObject::new("A")));
        let b = heap.alloc(Box::new(UserObject::new("B")));
        heap.get_mut(a)
            .unwrap()
            .core_mut()
            .add_field_reference("next", b);
        heap.get_mut(b)
            .unwrap()
            .core_mut()
            .add_field_reference("next", a);

        heap.mark(a);
        heap.sweep();
        assert_eq!(heap.num_objects(), 2);
        assert!(heap.get(a).is_some());
        assert!(heap.get(b).is_some());
    }

    #[test]
    fn clone_preserves_cyclic_structure() {
        let mut heap = Heap::new();
        let a = heap.alloc(Box::new(UserObject::new("Node")));
        heap.get_mut(a)
            .unwrap()
            .core_mut()
            .add_field_reference("self", a);

        let copy = heap.clone_object(a);
        assert_ne!(copy, a);
        let inner = heap
            .get(copy)
            .unwrap()
            .core()
            .field_reference("self")
            .unwrap();
        assert_eq!(inner, copy);
    }
}

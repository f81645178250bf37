//! Indexed binary min-heap holding exactly one pending event per sphere.
//!
//! The heap owns every event. `position[id]` is the heap slot of sphere `id`'s
//! event, so any sphere's event can be replaced or re-sifted in place in
//! `O(log N)` without a search.

use crate::core::event::{Event, EventKind};
use ordered_float::NotNan;

#[derive(Debug, Clone)]
pub struct EventHeap<const D: usize> {
    slots: Vec<Event<D>>,
    position: Vec<Option<usize>>,
}

impl<const D: usize> EventHeap<D> {
    /// Empty heap addressing spheres `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            position: vec![None; capacity],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of spheres the heap can address.
    pub fn capacity(&self) -> usize {
        self.position.len()
    }

    /// The globally earliest event.
    pub fn peek(&self) -> Option<&Event<D>> {
        self.slots.first()
    }

    /// Sphere `id`'s pending event, if it is in the heap.
    pub fn get(&self, id: usize) -> Option<&Event<D>> {
        self.position
            .get(id)
            .copied()
            .flatten()
            .map(|slot| &self.slots[slot])
    }

    /// Time of sphere `id`'s pending event; infinite when it has none.
    pub fn time_of(&self, id: usize) -> f64 {
        self.get(id).map_or(f64::INFINITY, Event::time_f64)
    }

    /// Heap slot currently holding sphere `id`'s event.
    pub fn slot_of(&self, id: usize) -> Option<usize> {
        self.position.get(id).copied().flatten()
    }

    /// Insert or replace the event of `event.sphere` and restore heap order by
    /// sifting from its slot in whichever direction the new time requires.
    pub fn schedule(&mut self, event: Event<D>) {
        let id = event.sphere;
        debug_assert!(id < self.position.len(), "sphere id {id} out of range");
        match self.position[id] {
            Some(slot) => {
                self.slots[slot] = event;
                let slot = self.sift_up(slot);
                self.sift_down(slot);
            }
            None => {
                self.slots.push(event);
                let slot = self.slots.len() - 1;
                self.position[id] = Some(slot);
                self.sift_up(slot);
            }
        }
    }

    /// Remove and return the earliest event.
    pub fn pop(&mut self) -> Option<Event<D>> {
        if self.slots.is_empty() {
            return None;
        }
        let last = self.slots.len() - 1;
        self.swap(0, last);
        let event = self.slots.pop()?;
        self.position[event.sphere] = None;
        if !self.slots.is_empty() {
            self.sift_down(0);
        }
        Some(event)
    }

    /// Turn sphere `id`'s event into a check at the same time. The time does
    /// not change, so heap order is untouched.
    pub fn invalidate(&mut self, id: usize) -> bool {
        match self.slot_of(id) {
            Some(slot) => {
                self.slots[slot].kind = EventKind::Check;
                true
            }
            None => false,
        }
    }

    /// Subtract `dt` from every event time. A uniform shift keeps heap order.
    pub fn shift_times(&mut self, dt: f64) {
        for e in &mut self.slots {
            e.time = NotNan::new(e.time.into_inner() - dt).unwrap_or(e.time);
        }
    }

    /// Drop every event.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.position.iter_mut().for_each(|p| *p = None);
    }

    /// Events in heap-array order.
    pub fn iter(&self) -> impl Iterator<Item = &Event<D>> + '_ {
        self.slots.iter()
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.slots.swap(a, b);
        self.position[self.slots[a].sphere] = Some(a);
        self.position[self.slots[b].sphere] = Some(b);
    }

    fn sift_up(&mut self, mut slot: usize) -> usize {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.slots[slot].precedes(&self.slots[parent]) {
                self.swap(slot, parent);
                slot = parent;
            } else {
                break;
            }
        }
        slot
    }

    fn sift_down(&mut self, mut slot: usize) -> usize {
        let len = self.slots.len();
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut smallest = slot;
            if left < len && self.slots[left].precedes(&self.slots[smallest]) {
                smallest = left;
            }
            if right < len && self.slots[right].precedes(&self.slots[smallest]) {
                smallest = right;
            }
            if smallest == slot {
                return slot;
            }
            self.swap(slot, smallest);
            slot = smallest;
        }
    }

    /// Every parent is no later than its children and every index entry
    /// points back at its own event.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let ordered = (1..self.slots.len())
            .all(|s| !self.slots[s].precedes(&self.slots[(s - 1) / 2]));
        let indexed = self
            .slots
            .iter()
            .enumerate()
            .all(|(s, e)| self.position[e.sphere] == Some(s));
        let counted = self.position.iter().filter(|p| p.is_some()).count() == self.slots.len();
        ordered && indexed && counted
    }
}

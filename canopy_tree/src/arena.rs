// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational slot storage for tree nodes.

use alloc::vec::Vec;

use crate::types::NodeId;

/// Slots with generation counters and a free list.
///
/// Every node of a tree model lives in one slot. Slots are reused after a
/// node is removed, with the slot's generation bumped so that stale
/// [`NodeId`]s are detected.
#[derive(Clone, Debug)]
pub(crate) struct Arena<N> {
    /// slots
    slots: Vec<Option<N>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    len: usize,
}

impl<N> Default for Arena<N> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }
}

impl<N> Arena<N> {
    /// Insert a value built from its own future id.
    pub(crate) fn insert_with(&mut self, make: impl FnOnce(NodeId) -> N) -> NodeId {
        self.len += 1;
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            let id = NodeId::new(idx as u32, generation);
            self.slots[idx] = Some(make(id));
            id
        } else {
            let generation = 1_u32;
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            let id = NodeId::new(self.slots.len() as u32, generation);
            self.slots.push(Some(make(id)));
            self.generations.push(generation);
            id
        }
    }

    /// Free the slot of a live id. Stale ids are ignored.
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<N> {
        if !self.is_alive(id) {
            return None;
        }
        let value = self.slots[id.idx()].take();
        self.free_list.push(id.idx());
        self.len -= 1;
        value
    }

    /// Returns true if `id` refers to a live slot of the current generation.
    pub(crate) fn is_alive(&self, id: NodeId) -> bool {
        self.slots
            .get(id.idx())
            .is_some_and(|slot| slot.is_some() && self.generations[id.idx()] == id.generation())
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&N> {
        if !self.is_alive(id) {
            return None;
        }
        self.slots[id.idx()].as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut N> {
        if !self.is_alive(id) {
            return None;
        }
        self.slots[id.idx()].as_mut()
    }

    /// Number of live slots.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }
}

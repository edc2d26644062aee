// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the tree model: node identifiers, flags, and locations.

use smallvec::SmallVec;

/// Identifier for a node in a tree model (generational).
///
/// A `NodeId` stays valid for as long as the node it names is part of the
/// tree. Once a splice deletes the node, the id becomes stale; its slot may be
/// reused by a later node, but with a bumped generation, so a stale id never
/// aliases a live node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

bitflags::bitflags! {
    /// Per-node state bits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// The node may be collapsed.
        const COLLAPSIBLE = 0b0000_0001;
        /// The node is collapsed. Only meaningful together with `COLLAPSIBLE`.
        const COLLAPSED   = 0b0000_0010;
        /// The node passed the filter (directly, or through a visible child
        /// for [`TreeVisibility::Recurse`](crate::TreeVisibility::Recurse)).
        const VISIBLE     = 0b0000_0100;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE
    }
}

/// Path of zero-based child indices from the root to a node.
///
/// The empty location addresses the synthetic root. Locations are positions,
/// not identities: any splice that touches an ancestor, a preceding sibling at
/// any level, or the node itself may invalidate them.
pub type Location = SmallVec<[usize; 8]>;

/// Delete count that removes every sibling from the splice position onwards.
pub const DELETE_ALL: usize = usize::MAX;

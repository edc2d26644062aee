// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The view adapter boundary: flat row splices pushed by the tree model.

use alloc::vec::Vec;

use crate::node::TreeNode;
use crate::types::NodeId;

/// Receiver of flattened-row edits.
///
/// The tree model is the only caller. Each call replaces `delete_count` rows
/// starting at row `start` with `inserted`, in row order. The model never
/// reads anything back from the adapter, so it is free to recycle row views,
/// adjust scroll position, or ignore the nodes entirely.
pub trait Spliceable<T, F> {
    /// Replace `delete_count` rows at `start` with `inserted`.
    fn splice(&mut self, start: usize, delete_count: usize, inserted: &[&TreeNode<T, F>]);
}

/// Discards every splice.
impl<T, F> Spliceable<T, F> for () {
    fn splice(&mut self, _start: usize, _delete_count: usize, _inserted: &[&TreeNode<T, F>]) {}
}

/// Mirrors the flattened rows as node ids.
///
/// After every operation the vector holds exactly the ids of the visible rows
/// in display order.
impl<T, F> Spliceable<T, F> for Vec<NodeId> {
    fn splice(&mut self, start: usize, delete_count: usize, inserted: &[&TreeNode<T, F>]) {
        let end = start + delete_count;
        debug_assert!(
            end <= self.len(),
            "row splice {start}..{end} out of range for {} rows",
            self.len()
        );
        Vec::splice(self, start..end, inserted.iter().map(|node| node.id())).for_each(drop);
    }
}

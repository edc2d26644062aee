// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Events fired by the tree model, and the per-splice callback options.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::filter::TreeFilter;
use crate::node::TreeNode;

/// Emitted after every splice, once the view adapter has been updated.
#[derive(Debug)]
pub struct SpliceEvent<'a, T, F> {
    /// Location passed to the splice.
    pub location: &'a [usize],
    /// Number of siblings that were actually deleted.
    pub delete_count: usize,
    /// Newly created top-level nodes, in sibling order.
    pub inserted: &'a [&'a TreeNode<T, F>],
    /// Deleted top-level nodes, in former sibling order. Their slots are
    /// freed right after the event.
    pub deleted: &'a [&'a TreeNode<T, F>],
}

/// Emitted for every node whose collapsed or collapsible state changed.
#[derive(Debug)]
pub struct CollapseStateChange<'a, T, F> {
    /// The node after the change.
    pub node: &'a TreeNode<T, F>,
    /// `true` if the node was reached through a recursive update of an ancestor.
    pub deep: bool,
}

/// Handle returned by listener registration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub(crate) type SpliceListener<T, F> = Box<dyn FnMut(&SpliceEvent<'_, T, F>)>;
pub(crate) type CollapseListener<T, F> = Box<dyn FnMut(&CollapseStateChange<'_, T, F>)>;

/// Registered listeners of one event kind.
pub(crate) struct Listeners<L> {
    entries: Vec<(ListenerId, L)>,
}

impl<L> Default for Listeners<L> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<L> Listeners<L> {
    pub(crate) fn add(&mut self, id: ListenerId, listener: L) {
        self.entries.push((id, listener));
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut L> {
        self.entries.iter_mut().map(|(_, listener)| listener)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Hands out listener ids that are unique per model.
#[derive(Debug, Default)]
pub(crate) struct ListenerIds(u64);

impl ListenerIds {
    pub(crate) fn next(&mut self) -> ListenerId {
        self.0 += 1;
        ListenerId(self.0)
    }
}

/// Bookkeeping hooks invoked during a splice.
///
/// Creation is reported in pre-order (a node before its children) and
/// deletion in post-order (children before their parent). All creations of a
/// splice are reported before any deletion. Both methods default to doing
/// nothing.
pub trait SpliceObserver<T, F> {
    /// A node was created by the splice.
    fn did_create_node(&mut self, node: &TreeNode<T, F>) {
        let _ = node;
    }

    /// A node was deleted by the splice. It is still readable here.
    fn did_delete_node(&mut self, node: &TreeNode<T, F>) {
        let _ = node;
    }
}

/// Per-call options of a splice.
pub struct SpliceOptions<'a, T, F> {
    /// Receives create/delete notifications for this call.
    pub observer: Option<&'a mut dyn SpliceObserver<T, F>>,
    /// Filter for the nodes created by this call, overriding the model's filter.
    pub filter: Option<&'a dyn TreeFilter<T, F>>,
}

impl<T, F> Default for SpliceOptions<'_, T, F> {
    fn default() -> Self {
        Self {
            observer: None,
            filter: None,
        }
    }
}

impl<'a, T, F> SpliceOptions<'a, T, F> {
    /// Options that report to `observer`.
    pub fn with_observer(observer: &'a mut dyn SpliceObserver<T, F>) -> Self {
        Self {
            observer: Some(observer),
            filter: None,
        }
    }
}

impl<T, F> core::fmt::Debug for SpliceOptions<'_, T, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpliceOptions")
            .field("observer", &self.observer.is_some())
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

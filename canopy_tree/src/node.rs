// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree nodes and the child descriptors used to create them.

use alloc::vec::Vec;

use crate::filter::TreeVisibility;
use crate::types::{NodeFlags, NodeId};

/// One element of the hierarchy, owned by the model that created it.
///
/// Nodes are read-only to callers; they change only through the model's
/// operations (`splice`, `set_collapsed`, `set_collapsible`, `refilter`).
#[derive(Clone, Debug)]
pub struct TreeNode<T, F = ()> {
    pub(crate) id: NodeId,
    pub(crate) data: T,
    /// `None` for direct children of the synthetic root.
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) depth: usize,
    pub(crate) flags: NodeFlags,
    pub(crate) visibility: TreeVisibility,
    pub(crate) visible_node_count: usize,
    pub(crate) visible_children_count: usize,
    pub(crate) filter_data: Option<F>,
}

impl<T, F> TreeNode<T, F> {
    /// The handle of this node.
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// The caller-supplied payload.
    pub const fn data(&self) -> &T {
        &self.data
    }

    /// The parent node, or `None` if the parent is the synthetic root.
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in sibling order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Depth below the synthetic root; top-level nodes have depth 1.
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Raw state bits.
    pub const fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Whether the node may be collapsed.
    pub const fn is_collapsible(&self) -> bool {
        self.flags.contains(NodeFlags::COLLAPSIBLE)
    }

    /// Whether the node is collapsed.
    ///
    /// A node that is not collapsible never reports collapsed, whatever its
    /// stored [`NodeFlags::COLLAPSED`] bit says; the bit takes effect again
    /// once the node becomes collapsible.
    pub const fn is_collapsed(&self) -> bool {
        self.flags
            .contains(NodeFlags::COLLAPSIBLE.union(NodeFlags::COLLAPSED))
    }

    /// Whether the node passed the filter.
    pub const fn is_visible(&self) -> bool {
        self.flags.contains(NodeFlags::VISIBLE)
    }

    /// The visibility the filter last reported for this node.
    pub const fn visibility(&self) -> TreeVisibility {
        self.visibility
    }

    /// Number of flattened rows this node contributes when revealed.
    ///
    /// This is 0 when the node is filtered out, 1 when it is collapsed, and
    /// otherwise 1 plus the sum over its children.
    pub const fn visible_node_count(&self) -> usize {
        self.visible_node_count
    }

    /// Number of direct children that passed the filter.
    pub const fn visible_children_count(&self) -> usize {
        self.visible_children_count
    }

    /// Metadata produced by the last filter pass, if any.
    pub const fn filter_data(&self) -> Option<&F> {
        self.filter_data.as_ref()
    }

    pub(crate) fn set_flag(&mut self, flag: NodeFlags, value: bool) {
        self.flags.set(flag, value);
    }

    /// Recompute the row count from the node's own flags and its children's counts.
    pub(crate) fn own_count(&self, children_sum: usize) -> usize {
        if !self.is_visible() {
            0
        } else if self.is_collapsed() {
            1
        } else {
            1 + children_sum
        }
    }
}

/// Descriptor of a node to insert, optionally with a whole subtree.
///
/// ```rust
/// use canopy_tree::TreeElement;
///
/// let folder = TreeElement::new("src")
///     .collapsed(true)
///     .with_children([TreeElement::new("lib.rs"), TreeElement::new("main.rs")]);
/// assert_eq!(folder.children.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeElement<T> {
    /// Payload stored on the created node.
    pub data: T,
    /// Nested children, inserted in order.
    pub children: Vec<TreeElement<T>>,
    /// Initial collapsed state; `None` uses the model's default.
    pub collapsed: Option<bool>,
    /// Collapsible flag; `None` derives it from `collapsed` and the children.
    pub collapsible: Option<bool>,
}

impl<T> TreeElement<T> {
    /// A leaf descriptor with default collapse state.
    pub const fn new(data: T) -> Self {
        Self {
            data,
            children: Vec::new(),
            collapsed: None,
            collapsible: None,
        }
    }

    /// Replace the children of this descriptor.
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children = children.into_iter().collect();
        self
    }

    /// Set the initial collapsed state.
    #[must_use]
    pub const fn collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = Some(collapsed);
        self
    }

    /// Set the collapsible flag.
    #[must_use]
    pub const fn collapsible(mut self, collapsible: bool) -> Self {
        self.collapsible = Some(collapsible);
        self
    }
}

impl<T> From<T> for TreeElement<T> {
    fn from(data: T) -> Self {
        Self::new(data)
    }
}

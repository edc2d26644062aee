// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Tree: a virtualized tree model for list-backed tree views.
//!
//! A tree view that shows thousands of nodes cannot afford to render them all. It renders a
//! flat, virtualized list of rows instead, and needs someone to translate edits of the
//! hierarchy into edits of that list. This crate is that someone.
//!
//! - Holds a hierarchy of nodes with per-node collapse state and filter visibility.
//! - Converts every structural edit (insert, delete, collapse, expand, refilter) into one
//!   contiguous row splice pushed to a view adapter.
//! - Maps any node to its row in the flattened view, and back from identity keys to nodes.
//!
//! ## Not a renderer
//!
//! Nothing here draws, scrolls, or performs I/O. The crate does not decide what children a
//! node has either: callers fetch children however they like (a file system walk, a network
//! request) and hand them over with a splice. Row recycling and scroll position belong to the
//! widget that implements [`Spliceable`].
//!
//! ## Two models
//!
//! - [`IndexTreeModel`] addresses nodes by [`Location`], the path of child indices from the
//!   synthetic root. Locations are positions, not identities, and go stale after edits that
//!   touch an ancestor or a preceding sibling.
//! - [`IdentityTreeModel`] wraps an index model and addresses nodes by a key derived from their
//!   data (see [`IdentityProvider`]). It keeps a key-to-node map in step with every splice,
//!   including items moved by deleting and re-inserting them in one call.
//!
//! ## Flattened rows
//!
//! Each node caches its [visible node count](TreeNode::visible_node_count): 0 when filtered
//! out, 1 when collapsed, else 1 plus the sum over its children. A node's row is the number of
//! visible rows before it, found by summing preceding siblings' counts at every ancestor level.
//! Nodes below a collapsed ancestor have no row but keep their own counts, so expanding the
//! ancestor restores them without a subtree walk.
//!
//! ## API overview
//!
//! - [`IndexTreeModel`] and [`TreeModelOptions`]: the location-addressed model and its switches.
//! - [`IdentityTreeModel`] and [`IdentityTreeModelOptions`]: the identity-addressed model.
//! - [`TreeElement`]: descriptor of a node (and optionally its subtree) to insert.
//! - [`TreeNode`]: read-only view of a node the model owns; [`NodeId`] is its handle.
//! - [`TreeFilter`], [`FilterResult`], [`TreeVisibility`]: filtering with three-state visibility.
//! - [`Spliceable`]: the view adapter boundary; `()` and `Vec<NodeId>` implement it.
//! - [`SpliceObserver`] and [`SpliceOptions`]: per-splice create/delete callbacks.
//! - [`SpliceEvent`] and [`CollapseStateChange`]: events for listeners.
//! - [`ChildrenProvider`]: where children come from, with
//!   [`IdentityTreeModel::load_children`] for synchronous sources.
//! - [`TreeError`]: failures of model operations.
//!
//! Key operations:
//! - [`IndexTreeModel::splice`] replaces a range of siblings and reports created nodes in
//!   pre-order, deleted nodes in post-order, then pushes a single row splice.
//! - [`IndexTreeModel::set_collapsed`] and [`IndexTreeModel::set_collapsible`] change collapse
//!   state, optionally for a whole subtree.
//! - [`IndexTreeModel::get_node_list_index`] maps a location to a row.
//! - [`IndexTreeModel::refilter`] re-runs the filter over the whole tree.
//!
//! ## Example
//!
//! ```rust
//! use canopy_tree::{
//!     FilterResult, IndexTreeModel, NodeId, SpliceOptions, TreeElement, TreeVisibility,
//! };
//!
//! // Show only `.rs` files and the folders that contain them.
//! let filter = |name: &&str, _parent: TreeVisibility| -> FilterResult<()> {
//!     if name.ends_with(".rs") {
//!         FilterResult::visible()
//!     } else {
//!         FilterResult::recurse()
//!     }
//! };
//! let mut model: IndexTreeModel<&str, Vec<NodeId>> =
//!     IndexTreeModel::new(Vec::new()).with_filter(filter);
//!
//! model
//!     .splice(
//!         &[0],
//!         0,
//!         [
//!             TreeElement::new("src").with_children([
//!                 TreeElement::new("lib.rs"),
//!                 TreeElement::new("notes.txt"),
//!             ]),
//!             TreeElement::new("docs").with_children([TreeElement::new("guide.md")]),
//!         ],
//!         SpliceOptions::default(),
//!     )
//!     .unwrap();
//!
//! let rows: Vec<&str> = model
//!     .list()
//!     .iter()
//!     .map(|&id| *model.node(id).unwrap().data())
//!     .collect();
//! assert_eq!(rows, ["src", "lib.rs"]);
//! assert_eq!(model.get_node_list_index(&[1]).unwrap(), None);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod arena;
mod error;
mod event;
mod filter;
mod identity_model;
mod index_model;
mod node;
mod provider;
mod types;
mod view;

pub use error::TreeError;
pub use event::{CollapseStateChange, ListenerId, SpliceEvent, SpliceObserver, SpliceOptions};
pub use filter::{FilterResult, TreeFilter, TreeVisibility};
pub use identity_model::{
    IdentityProvider, IdentityTreeModel, IdentityTreeModelOptions, SelfIdentity, Sorter,
};
pub use index_model::{IndexTreeModel, TreeModelOptions};
pub use node::{TreeElement, TreeNode};
pub use provider::ChildrenProvider;
pub use types::{DELETE_ALL, Location, NodeFlags, NodeId};
pub use view::Spliceable;

// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identity-keyed tree model: addresses nodes by a key derived from their data.

use alloc::{boxed::Box, vec::Vec};
use core::cmp::Ordering;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

use crate::error::TreeError;
use crate::event::{CollapseStateChange, ListenerId, SpliceEvent, SpliceObserver, SpliceOptions};
use crate::filter::TreeFilter;
use crate::index_model::{IndexTreeModel, TreeModelOptions};
use crate::node::{TreeElement, TreeNode};
use crate::types::{DELETE_ALL, Location, NodeFlags, NodeId};
use crate::view::Spliceable;

/// Derives the identity key of a node's data.
///
/// Two payloads with equal keys are the same item: the identity model keeps
/// one map entry per key, and a re-inserted item takes over its entry.
///
/// Any `Fn(&T) -> K` closure is a provider.
pub trait IdentityProvider<T> {
    /// The key type.
    type Key: Hash + Eq + Clone;

    /// The key of `data`.
    fn identity(&self, data: &T) -> Self::Key;
}

/// Uses the data itself as its identity.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SelfIdentity;

impl<T: Hash + Eq + Clone> IdentityProvider<T> for SelfIdentity {
    type Key = T;

    fn identity(&self, data: &T) -> T {
        data.clone()
    }
}

impl<T, K, Func> IdentityProvider<T> for Func
where
    Func: Fn(&T) -> K,
    K: Hash + Eq + Clone,
{
    type Key = K;

    fn identity(&self, data: &T) -> K {
        self(data)
    }
}

/// Sibling order applied to descriptors before they are inserted.
pub type Sorter<T> = Box<dyn Fn(&T, &T) -> Ordering>;

/// Options of an [`IdentityTreeModel`].
pub struct IdentityTreeModelOptions<T> {
    /// Options of the underlying index model.
    pub model: TreeModelOptions,
    /// When set, every list of sibling descriptors is sorted with it (stably)
    /// before insertion.
    pub sorter: Option<Sorter<T>>,
}

impl<T> Default for IdentityTreeModelOptions<T> {
    fn default() -> Self {
        Self {
            model: TreeModelOptions::default(),
            sorter: None,
        }
    }
}

impl<T> core::fmt::Debug for IdentityTreeModelOptions<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdentityTreeModelOptions")
            .field("model", &self.model)
            .field("sorter", &self.sorter.is_some())
            .finish()
    }
}

/// A tree addressed by item identity instead of location.
///
/// Wraps an [`IndexTreeModel`] and keeps a map from identity key to node,
/// updated from the create and delete callbacks of every splice. Each call
/// resolves its key to the node's current location and delegates, so
/// callers can hold on to keys across edits that would invalidate locations.
///
/// Parents are passed as `Option<&Key>`, where `None` is the synthetic root.
///
/// Within one splice, all creations are recorded before any deletion is
/// processed, and a deletion only drops the map entry if that key was not
/// inserted by the same splice. An item moved by deleting and re-inserting it
/// in one call therefore keeps its entry, pointing at the new node.
///
/// ```rust
/// use canopy_tree::{IdentityTreeModel, SpliceOptions, TreeElement};
///
/// let mut model: IdentityTreeModel<&str> = IdentityTreeModel::new(());
/// model
///     .splice(
///         None,
///         0,
///         [TreeElement::new("docs"), TreeElement::new("src")],
///         SpliceOptions::default(),
///     )
///     .unwrap();
/// model
///     .splice(Some(&"src"), 0, [TreeElement::new("lib.rs")], SpliceOptions::default())
///     .unwrap();
///
/// assert_eq!(model.get_node_location(&"lib.rs").unwrap().as_slice(), &[1, 0]);
/// assert_eq!(model.get_list_index(&"lib.rs").unwrap(), Some(2));
///
/// // Reorder the top level; keys keep resolving.
/// model
///     .set_children(
///         None,
///         [TreeElement::new("src"), TreeElement::new("docs")],
///         SpliceOptions::default(),
///     )
///     .unwrap();
/// assert_eq!(model.get_node_location(&"docs").unwrap().as_slice(), &[1]);
/// ```
pub struct IdentityTreeModel<T, I: IdentityProvider<T> = SelfIdentity, L = (), F = ()> {
    model: IndexTreeModel<T, L, F>,
    nodes: HashMap<I::Key, NodeId>,
    identity: I,
    sorter: Option<Sorter<T>>,
}

impl<T, I, L, F> core::fmt::Debug for IdentityTreeModel<T, I, L, F>
where
    I: IdentityProvider<T> + core::fmt::Debug,
    L: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdentityTreeModel")
            .field("model", &self.model)
            .field("nodes", &self.nodes.len())
            .field("identity", &self.identity)
            .field("sorter", &self.sorter.is_some())
            .finish()
    }
}

/// Keeps the identity map in step with one splice, then forwards to the
/// caller's observer.
struct IdentityTracker<'a, 'o, T, I: IdentityProvider<T>, F> {
    identity: &'a I,
    nodes: &'a mut HashMap<I::Key, NodeId>,
    /// Keys inserted by this splice.
    fresh: HashSet<I::Key>,
    inner: Option<&'o mut dyn SpliceObserver<T, F>>,
}

impl<T, I: IdentityProvider<T>, F> SpliceObserver<T, F> for IdentityTracker<'_, '_, T, I, F> {
    fn did_create_node(&mut self, node: &TreeNode<T, F>) {
        let key = self.identity.identity(node.data());
        if !self.fresh.insert(key.clone()) {
            log::warn!(
                "identity inserted twice in one splice; {:?} takes the map entry",
                node.id()
            );
        }
        log::trace!("identity map: insert {:?}", node.id());
        self.nodes.insert(key, node.id());
        if let Some(inner) = self.inner.as_deref_mut() {
            inner.did_create_node(node);
        }
    }

    fn did_delete_node(&mut self, node: &TreeNode<T, F>) {
        let key = self.identity.identity(node.data());
        if !self.fresh.contains(&key) && self.nodes.get(&key) == Some(&node.id()) {
            log::trace!("identity map: remove {:?}", node.id());
            self.nodes.remove(&key);
        }
        if let Some(inner) = self.inner.as_deref_mut() {
            inner.did_delete_node(node);
        }
    }
}

impl<T, I, L, F> IdentityTreeModel<T, I, L, F>
where
    I: IdentityProvider<T>,
    L: Spliceable<T, F>,
{
    /// Create an empty model keyed by `I::default()`.
    pub fn new(list: L) -> Self
    where
        I: Default,
    {
        Self::with_identity(list, I::default())
    }

    /// Create an empty model with an explicit identity provider.
    pub fn with_identity(list: L, identity: I) -> Self {
        Self::with_options(list, identity, IdentityTreeModelOptions::default())
    }

    /// Create an empty model with an identity provider and options.
    pub fn with_options(list: L, identity: I, options: IdentityTreeModelOptions<T>) -> Self {
        Self {
            model: IndexTreeModel::with_options(list, options.model),
            nodes: HashMap::new(),
            identity,
            sorter: options.sorter,
        }
    }

    /// Install a model-level filter.
    #[must_use]
    pub fn with_filter(mut self, filter: impl TreeFilter<T, F> + 'static) -> Self {
        self.model.set_filter(Some(Box::new(filter)));
        self
    }

    /// Replace the model-level filter. See [`IndexTreeModel::set_filter`].
    pub fn set_filter(&mut self, filter: Option<Box<dyn TreeFilter<T, F>>>) {
        self.model.set_filter(filter);
    }

    /// The underlying index model.
    pub const fn model(&self) -> &IndexTreeModel<T, L, F> {
        &self.model
    }

    /// The view adapter.
    pub const fn list(&self) -> &L {
        self.model.list()
    }

    /// The view adapter, mutably.
    pub fn list_mut(&mut self) -> &mut L {
        self.model.list_mut()
    }

    /// The identity provider.
    pub const fn identity(&self) -> &I {
        &self.identity
    }

    /// Number of mapped items, which is every node of the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no item is mapped.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Replace `delete_count` children of `parent`, starting at its first
    /// child, with `children`.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownIdentity`] if `parent` is not mapped.
    pub fn splice<C>(
        &mut self,
        parent: Option<&I::Key>,
        delete_count: usize,
        children: C,
        options: SpliceOptions<'_, T, F>,
    ) -> Result<(), TreeError>
    where
        C: IntoIterator<Item = TreeElement<T>>,
    {
        self.splice_at(parent, 0, delete_count, children, options)
    }

    /// Replace every child of `parent` with `children`.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownIdentity`] if `parent` is not mapped.
    pub fn set_children<C>(
        &mut self,
        parent: Option<&I::Key>,
        children: C,
        options: SpliceOptions<'_, T, F>,
    ) -> Result<(), TreeError>
    where
        C: IntoIterator<Item = TreeElement<T>>,
    {
        self.splice_at(parent, 0, DELETE_ALL, children, options)
    }

    /// Replace `delete_count` children of `parent` starting at child index
    /// `start` with `children`.
    ///
    /// The descriptors are sorted with the configured sorter, and any
    /// descriptor without an explicit `collapsed` or `collapsible` whose key
    /// maps to an existing node inherits that node's state. The call then
    /// delegates to [`IndexTreeModel::splice`], whose callback order and view
    /// push it shares. The caller's observer sees every callback after the
    /// identity map has been updated for it.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownIdentity`] if `parent` is not mapped, or
    /// [`TreeError::InvalidLocation`] if `start` is past the last child.
    pub fn splice_at<C>(
        &mut self,
        parent: Option<&I::Key>,
        start: usize,
        delete_count: usize,
        children: C,
        options: SpliceOptions<'_, T, F>,
    ) -> Result<(), TreeError>
    where
        C: IntoIterator<Item = TreeElement<T>>,
    {
        let mut location = self.location(parent)?;
        location.push(start);
        let mut children: Vec<TreeElement<T>> = children.into_iter().collect();
        self.prepare(&mut children);

        let SpliceOptions { observer, filter } = options;
        let mut tracker = IdentityTracker {
            identity: &self.identity,
            nodes: &mut self.nodes,
            fresh: HashSet::new(),
            inner: observer,
        };
        let observer: &mut dyn SpliceObserver<T, F> = &mut tracker;
        self.model.splice(
            &location,
            delete_count,
            children,
            SpliceOptions {
                observer: Some(observer),
                filter,
            },
        )
    }

    /// Returns `true` if `key` maps to a node.
    pub fn has_node(&self, key: &I::Key) -> bool {
        self.nodes.contains_key(key)
    }

    /// The node for `key`.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownIdentity`] if `key` is not mapped.
    pub fn get_node(&self, key: &I::Key) -> Result<&TreeNode<T, F>, TreeError> {
        let id = self.id(key)?;
        self.model.node(id).ok_or(TreeError::StaleNode(id))
    }

    /// The node with the given id, if it is still part of the tree.
    pub fn node(&self, id: NodeId) -> Option<&TreeNode<T, F>> {
        self.model.node(id)
    }

    /// The current location of the node for `key`.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownIdentity`] if `key` is not mapped.
    pub fn get_node_location(&self, key: &I::Key) -> Result<Location, TreeError> {
        self.model.get_node_location(self.id(key)?)
    }

    /// The row of the node for `key`, or `None` if it is not shown.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownIdentity`] if `key` is not mapped.
    pub fn get_list_index(&self, key: &I::Key) -> Result<Option<usize>, TreeError> {
        let location = self.location(Some(key))?;
        self.model.get_node_list_index(&location)
    }

    /// The visible node count of `parent`'s node, or of the root for `None`.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownIdentity`] if `parent` is not mapped.
    pub fn get_list_render_count(&self, parent: Option<&I::Key>) -> Result<usize, TreeError> {
        let location = self.location(parent)?;
        self.model.get_list_render_count(&location)
    }

    /// Whether the node for `key` is collapsed.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownIdentity`] if `key` is not mapped.
    pub fn is_collapsed(&self, key: &I::Key) -> Result<bool, TreeError> {
        Ok(self.get_node(key)?.is_collapsed())
    }

    /// Whether the node for `key` is collapsible.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownIdentity`] if `key` is not mapped.
    pub fn is_collapsible(&self, key: &I::Key) -> Result<bool, TreeError> {
        Ok(self.get_node(key)?.is_collapsible())
    }

    /// Set or toggle the collapsed state. See [`IndexTreeModel::set_collapsed`].
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownIdentity`] if `key` is not mapped.
    pub fn set_collapsed(
        &mut self,
        key: Option<&I::Key>,
        collapsed: Option<bool>,
        recursive: bool,
    ) -> Result<bool, TreeError> {
        let location = self.location(key)?;
        self.model.set_collapsed(&location, collapsed, recursive)
    }

    /// Force the collapsible flag. See [`IndexTreeModel::set_collapsible`].
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownIdentity`] if `key` is not mapped.
    pub fn set_collapsible(&mut self, key: &I::Key, collapsible: bool) -> Result<bool, TreeError> {
        let location = self.location(Some(key))?;
        self.model.set_collapsible(&location, collapsible)
    }

    /// Expand every collapsed ancestor of the node for `key`.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownIdentity`] if `key` is not mapped.
    pub fn expand_to(&mut self, key: &I::Key) -> Result<(), TreeError> {
        let location = self.location(Some(key))?;
        self.model.expand_to(&location)
    }

    /// Push the row of the node for `key` to the view again.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownIdentity`] if `key` is not mapped.
    pub fn rerender(&mut self, key: &I::Key) -> Result<(), TreeError> {
        let location = self.location(Some(key))?;
        self.model.rerender(&location)
    }

    /// Re-run the model-level filter. See [`IndexTreeModel::refilter`].
    pub fn refilter(&mut self) {
        self.model.refilter();
    }

    /// Register a listener for the underlying model's location-based splice events.
    pub fn on_did_splice(
        &mut self,
        listener: impl FnMut(&SpliceEvent<'_, T, F>) + 'static,
    ) -> ListenerId {
        self.model.on_did_splice(listener)
    }

    /// Register a listener for collapse state changes.
    pub fn on_did_change_collapse_state(
        &mut self,
        listener: impl FnMut(&CollapseStateChange<'_, T, F>) + 'static,
    ) -> ListenerId {
        self.model.on_did_change_collapse_state(listener)
    }

    /// Unregister a listener.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.model.remove_listener(id)
    }

    fn id(&self, key: &I::Key) -> Result<NodeId, TreeError> {
        self.nodes.get(key).copied().ok_or(TreeError::UnknownIdentity)
    }

    fn location(&self, key: Option<&I::Key>) -> Result<Location, TreeError> {
        match key {
            None => Ok(Location::new()),
            Some(key) => self.model.get_node_location(self.id(key)?),
        }
    }

    /// Sort sibling descriptors and carry over the collapse state of known items.
    fn prepare(&self, elements: &mut [TreeElement<T>]) {
        if let Some(sorter) = &self.sorter {
            elements.sort_by(|a, b| sorter(&a.data, &b.data));
        }
        for element in elements {
            let existing = self
                .nodes
                .get(&self.identity.identity(&element.data))
                .and_then(|&id| self.model.node(id));
            if let Some(node) = existing {
                element.collapsed = element
                    .collapsed
                    .or(Some(node.flags().contains(NodeFlags::COLLAPSED)));
                element.collapsible = element.collapsible.or(Some(node.is_collapsible()));
            }
            self.prepare(&mut element.children);
        }
    }
}

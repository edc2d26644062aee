// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Location-addressed tree model: structure, splicing, collapse state, filtering.

use alloc::{boxed::Box, vec, vec::Vec};

use crate::arena::Arena;
use crate::error::TreeError;
use crate::event::{
    CollapseListener, CollapseStateChange, ListenerId, ListenerIds, Listeners, SpliceEvent,
    SpliceListener, SpliceOptions,
};
use crate::filter::{self, FilterResult, TreeFilter, TreeVisibility};
use crate::node::{TreeElement, TreeNode};
use crate::types::{Location, NodeFlags, NodeId};
use crate::view::Spliceable;

/// Behavior switches of a tree model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeModelOptions {
    /// Collapsed state of created nodes whose descriptor leaves it unspecified.
    pub collapse_by_default: bool,
    /// When `false`, any node with children is collapsible regardless of its
    /// descriptor. When `true`, only explicit flags make a node collapsible.
    pub allow_non_collapsible_parents: bool,
    /// After a non-recursive expand, keep expanding while the expanded node
    /// has exactly one visible child.
    pub auto_expand_single_children: bool,
}

/// A tree whose nodes are addressed by [`Location`], flattened into rows for a
/// virtualized list.
///
/// The model never stores the flattened rows. Each node caches its
/// [visible node count](TreeNode::visible_node_count), and row positions are
/// derived on demand by summing the counts of preceding siblings at every
/// ancestor level. Every structural change goes through [`splice`](Self::splice),
/// which forwards the equivalent flat edit to the view adapter `L`.
///
/// The type parameters are the node payload `T`, the view adapter `L`
/// (see [`Spliceable`]), and the filter metadata `F`.
///
/// ## Example
///
/// ```rust
/// use canopy_tree::{IndexTreeModel, NodeId, SpliceOptions, TreeElement};
///
/// let mut model: IndexTreeModel<&str, Vec<NodeId>> = IndexTreeModel::new(Vec::new());
/// model
///     .splice(
///         &[0],
///         0,
///         [
///             TreeElement::new("a").with_children([TreeElement::new("a1")]),
///             TreeElement::new("b"),
///         ],
///         SpliceOptions::default(),
///     )
///     .unwrap();
///
/// assert_eq!(model.list().len(), 3);
/// assert_eq!(model.get_node_list_index(&[1]).unwrap(), Some(2));
///
/// // Collapsing `a` removes its child row.
/// assert!(model.set_collapsed(&[0], Some(true), false).unwrap());
/// assert_eq!(model.list().len(), 2);
/// ```
pub struct IndexTreeModel<T, L = (), F = ()> {
    nodes: Nodes<T, F>,
    list: L,
    filter: Option<Box<dyn TreeFilter<T, F>>>,
    options: TreeModelOptions,
    listener_ids: ListenerIds,
    splice_listeners: Listeners<SpliceListener<T, F>>,
    collapse_listeners: Listeners<CollapseListener<T, F>>,
}

impl<T, L: core::fmt::Debug, F> core::fmt::Debug for IndexTreeModel<T, L, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IndexTreeModel")
            .field("nodes_alive", &self.nodes.arena.len())
            .field("root_visible_node_count", &self.nodes.root_count)
            .field("list", &self.list)
            .field("filter", &self.filter.is_some())
            .field("options", &self.options)
            .field("splice_listeners", &self.splice_listeners.len())
            .field("collapse_listeners", &self.collapse_listeners.len())
            .finish()
    }
}

/// Where a location points: a parent, a child index, and the row it maps to.
#[derive(Clone, Copy, Debug)]
struct Position {
    parent: Option<NodeId>,
    index: usize,
    /// Row the child at `index` occupies (or would occupy, for an insertion).
    list_index: usize,
    /// No ancestor up to and including `parent` is collapsed.
    revealed: bool,
    /// Every ancestor up to and including `parent` is visible.
    visible: bool,
}

/// An existing node (or the root, `node == None`) with its row information.
#[derive(Clone, Copy, Debug)]
struct Target {
    node: Option<NodeId>,
    row: usize,
    /// No ancestor of the node is collapsed.
    revealed: bool,
    /// The node and all its ancestors are visible.
    visible: bool,
}

impl Target {
    const ROOT: Self = Self {
        node: None,
        row: 0,
        revealed: true,
        visible: true,
    };

    /// The node's row is present in the flattened view.
    const fn is_shown(&self) -> bool {
        self.revealed && self.visible
    }
}

/// Node storage plus the synthetic root.
///
/// The root is not stored in the arena: a parent of `None` stands for it.
struct Nodes<T, F> {
    arena: Arena<TreeNode<T, F>>,
    root_children: Vec<NodeId>,
    root_count: usize,
    root_visible_children: usize,
}

impl<T, F> Nodes<T, F> {
    fn new() -> Self {
        Self {
            arena: Arena::default(),
            root_children: Vec::new(),
            root_count: 0,
            root_visible_children: 0,
        }
    }

    /// Access a node the model holds; panics if `id` is stale.
    fn node(&self, id: NodeId) -> &TreeNode<T, F> {
        self.arena.get(id).expect("dangling NodeId")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut TreeNode<T, F> {
        self.arena.get_mut(id).expect("dangling NodeId")
    }

    fn children(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            None => &self.root_children,
            Some(id) => &self.node(id).children,
        }
    }

    fn children_mut(&mut self, parent: Option<NodeId>) -> &mut Vec<NodeId> {
        match parent {
            None => &mut self.root_children,
            Some(id) => &mut self.node_mut(id).children,
        }
    }

    fn count(&self, handle: Option<NodeId>) -> usize {
        match handle {
            None => self.root_count,
            Some(id) => self.node(id).visible_node_count,
        }
    }

    fn rows_before(&self, children: &[NodeId], index: usize) -> usize {
        children[..index]
            .iter()
            .map(|&child| self.node(child).visible_node_count)
            .sum()
    }

    /// Resolve a non-empty location. With `allow_end`, the last segment may
    /// equal the number of siblings (an insertion point).
    fn resolve(&self, location: &[usize], allow_end: bool) -> Option<Position> {
        let (&index, path) = location.split_last()?;
        let mut parent = None;
        let mut list_index = 0;
        let mut revealed = true;
        let mut visible = true;

        for &i in path {
            let children = self.children(parent);
            let &child = children.get(i)?;
            list_index += self.rows_before(children, i) + 1;
            let node = self.node(child);
            revealed &= !node.is_collapsed();
            visible &= node.is_visible();
            parent = Some(child);
        }

        let children = self.children(parent);
        if index > children.len() || (!allow_end && index == children.len()) {
            return None;
        }
        list_index += self.rows_before(children, index);

        Some(Position {
            parent,
            index,
            list_index,
            revealed,
            visible,
        })
    }

    /// Resolve a location to an existing node; the empty location is the root.
    fn target(&self, location: &[usize]) -> Option<Target> {
        if location.is_empty() {
            return Some(Target::ROOT);
        }
        let pos = self.resolve(location, false)?;
        let id = self.children(pos.parent)[pos.index];
        Some(Target {
            node: Some(id),
            row: pos.list_index,
            revealed: pos.revealed,
            visible: pos.visible && self.node(id).is_visible(),
        })
    }

    fn location_of(&self, id: NodeId) -> Result<Location, TreeError> {
        if !self.arena.is_alive(id) {
            return Err(TreeError::StaleNode(id));
        }
        let mut location = Location::new();
        let mut current = id;
        loop {
            let parent = self.node(current).parent;
            let index = self
                .children(parent)
                .iter()
                .position(|&child| child == current)
                .expect("node is listed among its parent's children");
            location.push(index);
            match parent {
                Some(p) => current = p,
                None => break,
            }
        }
        location.reverse();
        Ok(location)
    }

    /// Create a node and its subtree from a descriptor.
    ///
    /// Created ids are appended to `created` in pre-order. When `revealed`,
    /// the ids of the subtree's visible rows are appended to `rows`.
    fn create(
        &mut self,
        element: TreeElement<T>,
        parent: Option<NodeId>,
        depth: usize,
        parent_visibility: TreeVisibility,
        revealed: bool,
        filter: Option<&dyn TreeFilter<T, F>>,
        options: TreeModelOptions,
        rows: &mut Vec<NodeId>,
        created: &mut Vec<NodeId>,
    ) -> NodeId {
        let TreeElement {
            data,
            children,
            collapsed,
            collapsible,
        } = element;

        let collapsible = collapsible.unwrap_or(collapsed.is_some())
            || (!options.allow_non_collapsible_parents && !children.is_empty());
        let collapsed = collapsed.unwrap_or(options.collapse_by_default);
        let FilterResult {
            visibility,
            data: filter_data,
        } = filter::apply(filter, &data, parent_visibility);

        let mut flags = NodeFlags::empty();
        flags.set(NodeFlags::COLLAPSIBLE, collapsible);
        flags.set(NodeFlags::COLLAPSED, collapsed);
        let id = self.arena.insert_with(|id| TreeNode {
            id,
            data,
            parent,
            children: Vec::with_capacity(children.len()),
            depth,
            flags,
            visibility,
            visible_node_count: 0,
            visible_children_count: 0,
            filter_data,
        });
        created.push(id);
        if revealed {
            rows.push(id);
        }
        let row_len = rows.len();

        let is_collapsed = self.node(id).is_collapsed();
        let child_revealed = revealed && visibility != TreeVisibility::Hidden && !is_collapsed;
        let mut children_sum = 0;
        let mut visible_children = 0;
        for child in children {
            let child = self.create(
                child,
                Some(id),
                depth + 1,
                visibility,
                child_revealed,
                filter,
                options,
                rows,
                created,
            );
            let child = self.node(child);
            children_sum += child.visible_node_count;
            if child.is_visible() {
                visible_children += 1;
            }
            let child = child.id;
            self.node_mut(id).children.push(child);
        }

        let node = self.node_mut(id);
        node.visible_children_count = visible_children;
        let visible = match visibility {
            TreeVisibility::Hidden => false,
            TreeVisibility::Visible => true,
            TreeVisibility::Recurse => visible_children > 0,
        };
        node.set_flag(NodeFlags::VISIBLE, visible);
        node.visible_node_count = node.own_count(children_sum);
        if !visible && revealed {
            // Hidden descendants never pushed rows, so only the node's own row remains.
            rows.truncate(row_len - 1);
        }
        id
    }

    /// Ids of the subtree below `handle` (excluding it) in pre-order.
    fn descendants(&self, handle: Option<NodeId>) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(handle).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    /// Ids of the given subtrees in post-order (children before their parent).
    fn post_order(&self, roots: &[NodeId]) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &root in roots {
            // Mirrored pre-order, reversed, is left-to-right post-order.
            let start = out.len();
            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                out.push(id);
                stack.extend(self.node(id).children.iter().copied());
            }
            out[start..].reverse();
        }
        out
    }

    /// Visible rows below `handle`, in display order, assuming `handle` is expanded.
    fn rows_below(&self, handle: Option<NodeId>, out: &mut Vec<NodeId>) {
        let mut stack: Vec<NodeId> = self.children(handle).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if !node.is_visible() {
                continue;
            }
            out.push(id);
            if !node.is_collapsed() {
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    /// Rows of a shown node's subtree: the node itself (unless root) and,
    /// if expanded, everything below it.
    fn subtree_rows(&self, handle: Option<NodeId>, include_self: bool) -> Vec<NodeId> {
        let mut rows = Vec::new();
        match handle {
            None => self.rows_below(None, &mut rows),
            Some(id) => {
                if include_self {
                    rows.push(id);
                }
                if !self.node(id).is_collapsed() {
                    self.rows_below(handle, &mut rows);
                }
            }
        }
        rows
    }

    /// Recompute the visible node count of one node from its children.
    fn recount(&mut self, handle: Option<NodeId>) {
        let sum = self.rows_before(self.children(handle), self.children(handle).len());
        match handle {
            None => self.root_count = sum,
            Some(id) => {
                let node = self.node_mut(id);
                node.visible_node_count = node.own_count(sum);
            }
        }
    }

    /// Recompute the visible node counts of a whole subtree, bottom-up.
    fn recount_subtree(&mut self, handle: Option<NodeId>) {
        for id in self.descendants(handle).into_iter().rev() {
            self.recount(Some(id));
        }
        self.recount(handle);
    }

    fn recount_visible_children(&mut self, handle: Option<NodeId>) {
        let count = self
            .children(handle)
            .iter()
            .filter(|&&child| self.node(child).is_visible())
            .count();
        match handle {
            None => self.root_visible_children = count,
            Some(id) => self.node_mut(id).visible_children_count = count,
        }
    }

    /// Propagate a change of `removed -> added` rows below `start` up the
    /// ancestor chain, stopping at the first collapsed or hidden node.
    fn adjust_counts(&mut self, start: Option<NodeId>, added: usize, removed: usize) {
        if added == removed {
            return;
        }
        let mut current = start;
        while let Some(id) = current {
            let node = self.node_mut(id);
            if !node.is_visible() || node.is_collapsed() {
                return;
            }
            node.visible_node_count = node.visible_node_count + added - removed;
            current = node.parent;
        }
        self.root_count = self.root_count + added - removed;
    }

    /// Propagate a count change of `id` itself to its ancestors.
    fn adjust_ancestors(&mut self, id: NodeId, added: usize, removed: usize) {
        let parent = self.node(id).parent;
        self.adjust_counts(parent, added, removed);
    }

    /// `start` and its ancestors, nearest first; empty for the root.
    fn ancestors(&self, start: Option<NodeId>) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = start;
        while let Some(id) = current {
            out.push(id);
            current = self.node(id).parent;
        }
        out
    }

    /// Recompute counts from `start` up to the root. `Recurse` nodes on the
    /// way take their visibility from their children's current flags; no
    /// filter runs.
    fn refresh_ancestors(&mut self, start: Option<NodeId>) {
        let mut current = start;
        while let Some(id) = current {
            self.recount_visible_children(Some(id));
            let node = self.node_mut(id);
            if node.visibility == TreeVisibility::Recurse {
                let visible = node.visible_children_count > 0;
                node.set_flag(NodeFlags::VISIBLE, visible);
            }
            current = node.parent;
            self.recount(Some(id));
        }
        self.recount_visible_children(None);
        self.recount(None);
    }

    /// Set the collapsed bit on `handle` (and, if `recursive`, its subtree),
    /// recording every changed node with whether it was reached recursively.
    fn apply_collapse(
        &mut self,
        handle: Option<NodeId>,
        collapsed: bool,
        recursive: bool,
        changes: &mut Vec<(NodeId, bool)>,
    ) -> bool {
        let mut targets: Vec<(NodeId, bool)> = handle.map(|id| (id, false)).into_iter().collect();
        if recursive {
            targets.extend(self.descendants(handle).into_iter().map(|id| (id, true)));
        }
        let before = changes.len();
        for (id, deep) in targets {
            let node = self.node_mut(id);
            if node.is_collapsible() && node.flags.contains(NodeFlags::COLLAPSED) != collapsed {
                node.set_flag(NodeFlags::COLLAPSED, collapsed);
                changes.push((id, deep));
            }
        }
        changes.len() != before
    }

    /// Re-run `filter` over the subtree of `id`; returns the node's new visibility.
    fn refilter_node(
        &mut self,
        id: NodeId,
        parent_visibility: TreeVisibility,
        filter: Option<&dyn TreeFilter<T, F>>,
    ) -> bool {
        let FilterResult { visibility, data } =
            filter::apply(filter, &self.node(id).data, parent_visibility);
        let node = self.node_mut(id);
        node.filter_data = data;
        node.visibility = visibility;
        if visibility == TreeVisibility::Hidden {
            node.set_flag(NodeFlags::VISIBLE, false);
            node.visible_node_count = 0;
            return false;
        }

        let mut children_sum = 0;
        let mut visible_children = 0;
        for i in 0..self.node(id).children.len() {
            let child = self.node(id).children[i];
            if self.refilter_node(child, visibility, filter) {
                visible_children += 1;
            }
            children_sum += self.node(child).visible_node_count;
        }

        let node = self.node_mut(id);
        node.visible_children_count = visible_children;
        let visible = visibility != TreeVisibility::Recurse || visible_children > 0;
        node.set_flag(NodeFlags::VISIBLE, visible);
        node.visible_node_count = node.own_count(children_sum);
        visible
    }
}

impl<T, L: Spliceable<T, F>, F> IndexTreeModel<T, L, F> {
    /// Create an empty model that pushes row edits to `list`.
    pub fn new(list: L) -> Self {
        Self::with_options(list, TreeModelOptions::default())
    }

    /// Create an empty model with specific options.
    pub fn with_options(list: L, options: TreeModelOptions) -> Self {
        Self {
            nodes: Nodes::new(),
            list,
            filter: None,
            options,
            listener_ids: ListenerIds::default(),
            splice_listeners: Listeners::default(),
            collapse_listeners: Listeners::default(),
        }
    }

    /// Install a model-level filter (builder form of [`set_filter`](Self::set_filter)).
    #[must_use]
    pub fn with_filter(mut self, filter: impl TreeFilter<T, F> + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Replace the model-level filter.
    ///
    /// Existing nodes keep their visibility until [`refilter`](Self::refilter).
    pub fn set_filter(&mut self, filter: Option<Box<dyn TreeFilter<T, F>>>) {
        self.filter = filter;
    }

    /// The options this model was created with.
    pub const fn options(&self) -> TreeModelOptions {
        self.options
    }

    /// The view adapter.
    pub const fn list(&self) -> &L {
        &self.list
    }

    /// The view adapter, mutably. Row edits made through it are not seen by the model.
    pub fn list_mut(&mut self) -> &mut L {
        &mut self.list
    }

    /// Number of nodes in the tree, not counting the synthetic root.
    pub fn len(&self) -> usize {
        self.nodes.arena.len()
    }

    /// Returns `true` if the tree has no nodes besides the synthetic root.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of rows currently in the flattened view.
    pub const fn root_visible_node_count(&self) -> usize {
        self.nodes.root_count
    }

    /// Number of visible top-level nodes.
    pub const fn root_visible_children_count(&self) -> usize {
        self.nodes.root_visible_children
    }

    /// Top-level node ids in order.
    pub fn root_children(&self) -> &[NodeId] {
        &self.nodes.root_children
    }

    /// Replace `delete_count` siblings starting at `location` with `to_insert`.
    ///
    /// The parent is `location` without its last segment (the empty prefix is
    /// the root); the last segment is the first sibling to delete and the
    /// insertion point, and may equal the number of siblings. `delete_count`
    /// is clamped to the remaining siblings, so [`DELETE_ALL`](crate::DELETE_ALL)
    /// removes everything from that position on.
    ///
    /// Within the call, in order:
    /// 1. the new subtrees are built and filtered, and the deleted ones detached;
    /// 2. the observer sees every created node in pre-order, then every
    ///    deleted node in post-order;
    /// 3. the view adapter receives one row splice, if the parent's children
    ///    are shown (possibly an empty one);
    /// 4. splice listeners receive a [`SpliceEvent`];
    /// 5. the deleted nodes are freed.
    ///
    /// Ancestors filtered with [`TreeVisibility::Recurse`] take their
    /// visibility from their children's current state without re-running any
    /// filter. When one of them appears or disappears, or when the parent's
    /// effective collapsed state changes, the single row splice covers that
    /// ancestor's whole subtree instead. A parent that becomes collapsible or
    /// stops being collapsible is reported as a [`CollapseStateChange`].
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidLocation`] if `location` is empty or does not
    /// resolve. The tree is unchanged in that case.
    pub fn splice<I>(
        &mut self,
        location: &[usize],
        delete_count: usize,
        to_insert: I,
        options: SpliceOptions<'_, T, F>,
    ) -> Result<(), TreeError>
    where
        I: IntoIterator<Item = TreeElement<T>>,
    {
        let pos = self
            .nodes
            .resolve(location, true)
            .ok_or_else(|| TreeError::invalid_location(location))?;
        let to_insert: Vec<TreeElement<T>> = to_insert.into_iter().collect();
        let SpliceOptions { observer, filter } = options;
        let filter = filter.or(self.filter.as_deref());

        let ancestors = self.nodes.ancestors(pos.parent);
        let before: Vec<(usize, bool)> = ancestors
            .iter()
            .map(|&id| {
                let node = self.nodes.node(id);
                (node.visible_node_count, node.is_visible())
            })
            .collect();
        let parent_flags = pos.parent.map(|id| self.nodes.node(id).flags);

        let siblings = self.nodes.children(pos.parent).len();
        let end = pos.index.saturating_add(delete_count).min(siblings);
        let (depth, parent_visibility) = match pos.parent {
            None => (1, TreeVisibility::Visible),
            Some(parent) => {
                let will_have_children = siblings - (end - pos.index) + to_insert.len() > 0;
                let parent = self.nodes.node_mut(parent);
                if will_have_children && !self.options.allow_non_collapsible_parents {
                    parent.set_flag(NodeFlags::COLLAPSIBLE, true);
                }
                (parent.depth + 1, parent.visibility)
            }
        };
        let revealed = pos.revealed
            && pos.visible
            && pos
                .parent
                .is_none_or(|parent| !self.nodes.node(parent).is_collapsed());

        let mut rows = Vec::new();
        let mut created = Vec::new();
        let mut inserted = Vec::with_capacity(to_insert.len());
        for element in to_insert {
            inserted.push(self.nodes.create(
                element,
                pos.parent,
                depth,
                parent_visibility,
                revealed,
                filter,
                self.options,
                &mut rows,
                &mut created,
            ));
        }

        let deleted: Vec<NodeId> = self
            .nodes
            .children_mut(pos.parent)
            .splice(pos.index..end, inserted.iter().copied())
            .collect();
        let deleted_rows: usize = deleted
            .iter()
            .map(|&id| self.nodes.node(id).visible_node_count)
            .sum();
        let inserted_rows: usize = inserted
            .iter()
            .map(|&id| self.nodes.node(id).visible_node_count)
            .sum();
        self.nodes.refresh_ancestors(pos.parent);
        let deleted_all = self.nodes.post_order(&deleted);

        // Highest ancestor whose rows change as a whole, if any.
        let widened = ancestors
            .iter()
            .zip(&before)
            .rposition(|(&id, &(_, was_visible))| self.nodes.node(id).is_visible() != was_visible)
            .or_else(|| {
                let was_collapsed =
                    parent_flags?.contains(NodeFlags::COLLAPSIBLE | NodeFlags::COLLAPSED);
                (self.nodes.node(pos.parent?).is_collapsed() != was_collapsed).then_some(0)
            });
        let collapsible_changed = pos.parent.filter(|&id| {
            parent_flags.is_some_and(|flags| {
                flags.contains(NodeFlags::COLLAPSIBLE) != self.nodes.node(id).is_collapsible()
            })
        });

        log::debug!(
            "splice at {location:?}: {} deleted, {} created, rows -{deleted_rows} +{inserted_rows}",
            deleted_all.len(),
            created.len(),
        );

        if let Some(observer) = observer {
            for &id in &created {
                observer.did_create_node(self.nodes.node(id));
            }
            for &id in &deleted_all {
                observer.did_delete_node(self.nodes.node(id));
            }
        }

        match widened {
            Some(level) => {
                let id = ancestors[level];
                let (previous, _) = before[level];
                let at = self.nodes.resolve(&location[..location.len() - 1 - level], false);
                if let Some(at) = at
                    && at.revealed
                    && at.visible
                {
                    let rows = if self.nodes.node(id).is_visible() {
                        self.nodes.subtree_rows(Some(id), true)
                    } else {
                        Vec::new()
                    };
                    let rows: Vec<&TreeNode<T, F>> =
                        rows.iter().map(|&id| self.nodes.node(id)).collect();
                    self.list.splice(at.list_index, previous, &rows);
                }
            }
            None if revealed => {
                debug_assert_eq!(rows.len(), inserted_rows, "revealed rows match counts");
                let rows: Vec<&TreeNode<T, F>> =
                    rows.iter().map(|&id| self.nodes.node(id)).collect();
                self.list.splice(pos.list_index, deleted_rows, &rows);
            }
            None => {}
        }

        if !self.splice_listeners.is_empty() {
            let inserted: Vec<&TreeNode<T, F>> =
                inserted.iter().map(|&id| self.nodes.node(id)).collect();
            let deleted_nodes: Vec<&TreeNode<T, F>> =
                deleted.iter().map(|&id| self.nodes.node(id)).collect();
            let event = SpliceEvent {
                location,
                delete_count: deleted.len(),
                inserted: &inserted,
                deleted: &deleted_nodes,
            };
            for listener in self.splice_listeners.iter_mut() {
                listener(&event);
            }
        }

        for id in deleted_all {
            self.nodes.arena.remove(id);
        }

        if let Some(parent) = collapsible_changed {
            self.emit_collapse_changes(&[(parent, false)]);
        }
        Ok(())
    }

    /// Returns `true` if `location` addresses a node (the root included).
    pub fn has(&self, location: &[usize]) -> bool {
        self.nodes.target(location).is_some()
    }

    /// The node at `location`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NodeNotFound`] if the location does not resolve or is
    /// empty (the synthetic root is not a node).
    pub fn get_node(&self, location: &[usize]) -> Result<&TreeNode<T, F>, TreeError> {
        match self.target(location)?.node {
            Some(id) => Ok(self.nodes.node(id)),
            None => Err(TreeError::node_not_found(location)),
        }
    }

    /// The node with the given id, if it is still part of the tree.
    pub fn node(&self, id: NodeId) -> Option<&TreeNode<T, F>> {
        self.nodes.arena.get(id)
    }

    /// The current location of a node, found by walking parent links.
    ///
    /// # Errors
    ///
    /// [`TreeError::StaleNode`] if the node has been spliced out.
    pub fn get_node_location(&self, id: NodeId) -> Result<Location, TreeError> {
        self.nodes.location_of(id)
    }

    /// The row of the node at `location` in the flattened view, or `None` if
    /// the node is filtered out or has a collapsed or filtered-out ancestor.
    ///
    /// The root has no row.
    ///
    /// # Errors
    ///
    /// [`TreeError::NodeNotFound`] if the location does not resolve.
    pub fn get_node_list_index(&self, location: &[usize]) -> Result<Option<usize>, TreeError> {
        let target = self.target(location)?;
        Ok((target.node.is_some() && target.is_shown()).then_some(target.row))
    }

    /// The visible node count at `location`; for the empty location, the
    /// total number of rows.
    ///
    /// # Errors
    ///
    /// [`TreeError::NodeNotFound`] if the location does not resolve.
    pub fn get_list_render_count(&self, location: &[usize]) -> Result<usize, TreeError> {
        let target = self.target(location)?;
        Ok(self.nodes.count(target.node))
    }

    /// Whether the node at `location` is collapsed. The root never is.
    ///
    /// # Errors
    ///
    /// [`TreeError::NodeNotFound`] if the location does not resolve.
    pub fn is_collapsed(&self, location: &[usize]) -> Result<bool, TreeError> {
        let target = self.target(location)?;
        Ok(target
            .node
            .is_some_and(|id| self.nodes.node(id).is_collapsed()))
    }

    /// Whether the node at `location` is collapsible. The root never is.
    ///
    /// # Errors
    ///
    /// [`TreeError::NodeNotFound`] if the location does not resolve.
    pub fn is_collapsible(&self, location: &[usize]) -> Result<bool, TreeError> {
        let target = self.target(location)?;
        Ok(target
            .node
            .is_some_and(|id| self.nodes.node(id).is_collapsible()))
    }

    /// First child of the node at `location` (the root for the empty location).
    ///
    /// # Errors
    ///
    /// [`TreeError::NodeNotFound`] if the location does not resolve.
    pub fn first_child(&self, location: &[usize]) -> Result<Option<NodeId>, TreeError> {
        let target = self.target(location)?;
        Ok(self.nodes.children(target.node).first().copied())
    }

    /// Deepest last descendant of the node at `location`, following last
    /// children regardless of collapse or filter state.
    ///
    /// # Errors
    ///
    /// [`TreeError::NodeNotFound`] if the location does not resolve.
    pub fn last_descendant(&self, location: &[usize]) -> Result<Option<NodeId>, TreeError> {
        let target = self.target(location)?;
        let mut last = None;
        let mut current = target.node;
        while let Some(&child) = self.nodes.children(current).last() {
            last = Some(child);
            current = last;
        }
        Ok(last)
    }

    /// Set, or with `None` toggle, the collapsed state of the node at `location`.
    ///
    /// With `recursive`, every collapsible descendant gets the same state.
    /// Nodes that are not collapsible are left alone. On change, the node's
    /// rows below it are replaced in one view splice (when the node is shown)
    /// and a [`CollapseStateChange`] is emitted per changed node. Toggling the
    /// root toggles from expanded, so `None` on the empty location collapses.
    ///
    /// Returns whether any node changed.
    ///
    /// # Errors
    ///
    /// [`TreeError::NodeNotFound`] if the location does not resolve.
    pub fn set_collapsed(
        &mut self,
        location: &[usize],
        collapsed: Option<bool>,
        recursive: bool,
    ) -> Result<bool, TreeError> {
        let target = self.target(location)?;
        let collapsed = collapsed.unwrap_or_else(|| {
            !target
                .node
                .is_some_and(|id| self.nodes.node(id).is_collapsed())
        });

        let mut changes = Vec::new();
        let changed = self
            .nodes
            .apply_collapse(target.node, collapsed, recursive, &mut changes);
        if !changed {
            return Ok(false);
        }
        log::debug!(
            "{} {location:?}{}: {} nodes changed",
            if collapsed { "collapse" } else { "expand" },
            if recursive { " recursively" } else { "" },
            changes.len(),
        );
        self.refresh_below(target, recursive);
        self.emit_collapse_changes(&changes);

        if let Some(id) = target.node
            && self.options.auto_expand_single_children
            && !collapsed
            && !recursive
            && self.nodes.node(id).is_collapsible()
        {
            let mut visible = self
                .nodes
                .children(Some(id))
                .iter()
                .enumerate()
                .filter(|&(_, &child)| self.nodes.node(child).is_visible())
                .map(|(index, _)| index);
            if let (Some(only), None) = (visible.next(), visible.next()) {
                let mut child = Location::from_slice(location);
                child.push(only);
                self.set_collapsed(&child, Some(false), false)?;
            }
        }
        Ok(true)
    }

    /// Force the collapsible flag of the node at `location`.
    ///
    /// This can reserve a disclosure affordance before any children exist.
    /// Making a node non-collapsible also expands it, so it stays expanded if
    /// it becomes collapsible again later. When the node is shown, its row and
    /// the rows below it are re-pushed in one view splice.
    ///
    /// Returns whether the flag changed. The root is never collapsible, so
    /// the empty location always returns `false`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NodeNotFound`] if the location does not resolve.
    pub fn set_collapsible(
        &mut self,
        location: &[usize],
        collapsible: bool,
    ) -> Result<bool, TreeError> {
        let target = self.target(location)?;
        let Some(id) = target.node else {
            return Ok(false);
        };
        let node = self.nodes.node_mut(id);
        if node.is_collapsible() == collapsible {
            return Ok(false);
        }
        node.set_flag(NodeFlags::COLLAPSIBLE, collapsible);
        if !collapsible {
            node.set_flag(NodeFlags::COLLAPSED, false);
        }

        let previous = self.nodes.count(Some(id));
        self.nodes.recount(Some(id));
        let current = self.nodes.count(Some(id));
        self.nodes.adjust_ancestors(id, current, previous);
        if target.is_shown() {
            let rows = self.nodes.subtree_rows(Some(id), true);
            let rows: Vec<&TreeNode<T, F>> = rows.iter().map(|&id| self.nodes.node(id)).collect();
            self.list.splice(target.row, previous, &rows);
        }
        self.emit_collapse_changes(&[(id, false)]);
        Ok(true)
    }

    /// Expand every collapsed ancestor of `location`, nearest first, so the
    /// node becomes revealed. The node's own state is unchanged.
    ///
    /// # Errors
    ///
    /// [`TreeError::NodeNotFound`] if the location does not resolve.
    pub fn expand_to(&mut self, location: &[usize]) -> Result<(), TreeError> {
        self.target(location)?;
        for len in (1..location.len()).rev() {
            let ancestor = &location[..len];
            if self.is_collapsed(ancestor)? {
                self.set_collapsed(ancestor, Some(false), false)?;
            }
        }
        Ok(())
    }

    /// Push the node's row to the view again without changing the tree.
    ///
    /// Does nothing if the node is not shown, or for the root.
    ///
    /// # Errors
    ///
    /// [`TreeError::NodeNotFound`] if the location does not resolve.
    pub fn rerender(&mut self, location: &[usize]) -> Result<(), TreeError> {
        let target = self.target(location)?;
        if let Some(id) = target.node
            && target.is_shown()
        {
            self.list.splice(target.row, 1, &[self.nodes.node(id)]);
        }
        Ok(())
    }

    /// Re-run the model-level filter over every node and replace all rows.
    ///
    /// Nodes keep their children whatever the outcome, so a node hidden by an
    /// earlier pass reappears with its subtree intact.
    pub fn refilter(&mut self) {
        let previous = self.nodes.root_count;
        let filter = self.filter.as_deref();
        for i in 0..self.nodes.root_children.len() {
            let id = self.nodes.root_children[i];
            self.nodes.refilter_node(id, TreeVisibility::Visible, filter);
        }
        self.nodes.recount_visible_children(None);
        self.nodes.recount(None);

        let rows = self.nodes.subtree_rows(None, false);
        log::debug!("refilter: {previous} rows -> {} rows", rows.len());
        if previous > 0 || !rows.is_empty() {
            let rows: Vec<&TreeNode<T, F>> = rows.iter().map(|&id| self.nodes.node(id)).collect();
            self.list.splice(0, previous, &rows);
        }
    }

    /// Register a listener for [`SpliceEvent`]s.
    pub fn on_did_splice(
        &mut self,
        listener: impl FnMut(&SpliceEvent<'_, T, F>) + 'static,
    ) -> ListenerId {
        let id = self.listener_ids.next();
        self.splice_listeners.add(id, Box::new(listener));
        id
    }

    /// Register a listener for [`CollapseStateChange`]s.
    pub fn on_did_change_collapse_state(
        &mut self,
        listener: impl FnMut(&CollapseStateChange<'_, T, F>) + 'static,
    ) -> ListenerId {
        let id = self.listener_ids.next();
        self.collapse_listeners.add(id, Box::new(listener));
        id
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.splice_listeners.remove(id) || self.collapse_listeners.remove(id)
    }

    // --- internals ---

    fn target(&self, location: &[usize]) -> Result<Target, TreeError> {
        self.nodes
            .target(location)
            .ok_or_else(|| TreeError::node_not_found(location))
    }

    /// After a collapse change at `target`, recount and replace the rows below it.
    fn refresh_below(&mut self, target: Target, deep: bool) {
        let previous = self.nodes.count(target.node);
        if deep {
            self.nodes.recount_subtree(target.node);
        } else {
            self.nodes.recount(target.node);
        }
        let current = self.nodes.count(target.node);
        if let Some(id) = target.node {
            self.nodes.adjust_ancestors(id, current, previous);
        }
        if !target.is_shown() {
            return;
        }

        let (start, own_row) = match target.node {
            None => (0, 0),
            Some(_) => (target.row + 1, 1),
        };
        let rows = self.nodes.subtree_rows(target.node, false);
        let delete_count = previous - own_row;
        if delete_count > 0 || !rows.is_empty() {
            let rows: Vec<&TreeNode<T, F>> = rows.iter().map(|&id| self.nodes.node(id)).collect();
            self.list.splice(start, delete_count, &rows);
        }
    }

    fn emit_collapse_changes(&mut self, changes: &[(NodeId, bool)]) {
        if self.collapse_listeners.is_empty() {
            return;
        }
        for &(id, deep) in changes {
            let event = CollapseStateChange {
                node: self.nodes.node(id),
                deep,
            };
            for listener in self.collapse_listeners.iter_mut() {
                listener(&event);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::event::SpliceObserver;
    use crate::types::DELETE_ALL;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    /// Row mirror that also records every splice as `(start, delete_count, inserted)`.
    #[derive(Debug, Default)]
    pub(crate) struct Recorder {
        pub(crate) rows: Vec<NodeId>,
        pub(crate) splices: Vec<(usize, usize, usize)>,
    }

    impl<T, F> Spliceable<T, F> for Recorder {
        fn splice(&mut self, start: usize, delete_count: usize, inserted: &[&TreeNode<T, F>]) {
            self.splices.push((start, delete_count, inserted.len()));
            let rows = &mut self.rows;
            <Vec<NodeId> as Spliceable<T, F>>::splice(rows, start, delete_count, inserted);
        }
    }

    /// Records observer callbacks as `("create" | "delete", data)`.
    #[derive(Debug, Default)]
    struct Calls(Vec<(&'static str, &'static str)>);

    impl<F> SpliceObserver<&'static str, F> for Calls {
        fn did_create_node(&mut self, node: &TreeNode<&'static str, F>) {
            self.0.push(("create", node.data));
        }

        fn did_delete_node(&mut self, node: &TreeNode<&'static str, F>) {
            self.0.push(("delete", node.data));
        }
    }

    type Model<F = ()> = IndexTreeModel<&'static str, Recorder, F>;

    fn leaf(data: &'static str) -> TreeElement<&'static str> {
        TreeElement::new(data)
    }

    fn rows<F>(model: &Model<F>) -> Vec<&'static str> {
        model
            .list()
            .rows
            .iter()
            .map(|&id| *model.node(id).unwrap().data())
            .collect()
    }

    /// Assert the cached counters and the row mirror against a full recomputation.
    pub(crate) fn check_invariants<T, L: Spliceable<T, F>, F>(model: &IndexTreeModel<T, L, F>) {
        fn check<T, F>(nodes: &Nodes<T, F>, id: NodeId) -> usize {
            let node = nodes.node(id);
            let mut sum = 0;
            let mut visible = 0;
            for &child in &node.children {
                assert_eq!(nodes.node(child).parent, Some(id), "parent link");
                assert_eq!(nodes.node(child).depth, node.depth + 1, "depth");
                sum += check(nodes, child);
                if nodes.node(child).is_visible() {
                    visible += 1;
                }
            }
            if node.is_visible() {
                assert_eq!(node.visible_children_count, visible, "visible children");
            }
            assert_eq!(node.visible_node_count, node.own_count(sum), "visible node count");
            node.visible_node_count
        }
        let nodes = &model.nodes;
        let mut sum = 0;
        for &child in &nodes.root_children {
            assert_eq!(nodes.node(child).parent, None, "top-level parent link");
            sum += check(nodes, child);
        }
        assert_eq!(nodes.root_count, sum, "root visible node count");
    }

    fn abc() -> Model {
        let mut model: Model = Model::new(Recorder::default());
        model
            .splice(&[0], 0, [leaf("A"), leaf("B"), leaf("C")], SpliceOptions::default())
            .unwrap();
        model
    }

    #[test]
    fn empty_model() {
        let mut model: Model = Model::new(Recorder::default());
        assert!(model.is_empty());
        assert_eq!(model.root_visible_node_count(), 0);
        model.splice(&[0], 0, [], SpliceOptions::default()).unwrap();
        assert_eq!(model.list().splices, [(0, 0, 0)], "empty splice pushes an empty delta");
        assert_eq!(model.get_list_render_count(&[]).unwrap(), 0);
    }

    #[test]
    fn top_level_insert_flattens_in_order() {
        let model = abc();
        assert_eq!(rows(&model), ["A", "B", "C"]);
        assert_eq!(model.list().splices, [(0, 0, 3)]);
        assert_eq!(model.get_node_list_index(&[1]).unwrap(), Some(1));
        assert_eq!(model.root_visible_node_count(), 3);
        assert_eq!(model.root_visible_children_count(), 3);
        check_invariants(&model);
    }

    #[test]
    fn nested_insert_and_collapse() {
        let mut model = abc();
        model
            .splice(&[0, 0], 0, [leaf("A1"), leaf("A2")], SpliceOptions::default())
            .unwrap();
        assert_eq!(rows(&model), ["A", "A1", "A2", "B", "C"]);
        assert_eq!(model.list().splices.last(), Some(&(1, 0, 2)));
        assert_eq!(model.get_node(&[0]).unwrap().visible_node_count(), 3);
        assert!(model.is_collapsible(&[0]).unwrap(), "gaining children makes A collapsible");
        check_invariants(&model);

        assert!(model.set_collapsed(&[0], Some(true), false).unwrap());
        assert_eq!(rows(&model), ["A", "B", "C"]);
        assert_eq!(model.list().splices.last(), Some(&(1, 2, 0)));
        assert_eq!(model.get_node(&[0]).unwrap().visible_node_count(), 1);
        assert_eq!(model.get_node_list_index(&[0, 1]).unwrap(), None);
        check_invariants(&model);

        let pushed = model.list().splices.len();
        assert!(!model.set_collapsed(&[0], Some(true), false).unwrap());
        assert_eq!(model.list().splices.len(), pushed, "no-op pushes nothing");
        assert_eq!(model.get_node(&[0]).unwrap().visible_node_count(), 1);

        assert!(model.set_collapsed(&[0], None, false).unwrap(), "toggle expands");
        assert_eq!(rows(&model), ["A", "A1", "A2", "B", "C"]);
        assert_eq!(model.list().splices.last(), Some(&(1, 0, 2)));
    }

    #[test]
    fn delete_reports_post_order() {
        let mut model: Model = Model::new(Recorder::default());
        model
            .splice(
                &[0],
                0,
                [
                    leaf("A").collapsed(true),
                    leaf("B").with_children([leaf("B1").with_children([leaf("B1a")]), leaf("B2")]),
                    leaf("C"),
                ],
                SpliceOptions::default(),
            )
            .unwrap();
        assert_eq!(rows(&model), ["A", "B", "B1", "B1a", "B2", "C"]);

        let mut calls = Calls::default();
        model
            .splice(&[1], 1, [], SpliceOptions::with_observer(&mut calls))
            .unwrap();
        assert_eq!(rows(&model), ["A", "C"]);
        assert_eq!(model.list().splices.last(), Some(&(1, 4, 0)));
        assert_eq!(
            calls.0,
            [
                ("delete", "B1a"),
                ("delete", "B1"),
                ("delete", "B2"),
                ("delete", "B")
            ]
        );
        assert_eq!(model.len(), 2);
        check_invariants(&model);
    }

    #[test]
    fn create_reports_pre_order_before_deletes() {
        let mut model = abc();
        let mut calls = Calls::default();
        model
            .splice(
                &[0],
                1,
                [leaf("X").with_children([leaf("X1"), leaf("X2")])],
                SpliceOptions::with_observer(&mut calls),
            )
            .unwrap();
        assert_eq!(
            calls.0,
            [
                ("create", "X"),
                ("create", "X1"),
                ("create", "X2"),
                ("delete", "A")
            ]
        );
        assert_eq!(rows(&model), ["X", "X1", "X2", "B", "C"]);
        assert_eq!(model.list().splices.last(), Some(&(0, 1, 3)));
    }

    #[test]
    fn splice_then_locate_extends_parent_location() {
        let mut model = abc();
        model
            .splice(&[1, 0], 0, [leaf("B1"), leaf("B2"), leaf("B3")], SpliceOptions::default())
            .unwrap();
        let children = model.get_node(&[1]).unwrap().children().to_vec();
        for (i, id) in children.into_iter().enumerate() {
            assert_eq!(model.get_node_location(id).unwrap().as_slice(), &[1, i]);
        }
    }

    #[test]
    fn delete_all_clamps_to_remaining_siblings() {
        let mut model = abc();
        model.splice(&[1], DELETE_ALL, [leaf("D")], SpliceOptions::default()).unwrap();
        assert_eq!(rows(&model), ["A", "D"]);
        assert_eq!(model.list().splices.last(), Some(&(1, 2, 1)));
        check_invariants(&model);
    }

    #[test]
    fn invalid_locations_fail_without_change() {
        let mut model = abc();
        assert_eq!(
            model.splice(&[4], 0, [leaf("X")], SpliceOptions::default()),
            Err(TreeError::invalid_location(&[4]))
        );
        assert_eq!(
            model.splice(&[], 0, [leaf("X")], SpliceOptions::default()),
            Err(TreeError::invalid_location(&[]))
        );
        assert_eq!(
            model.splice(&[3, 0], 0, [leaf("X")], SpliceOptions::default()),
            Err(TreeError::invalid_location(&[3, 0]))
        );
        assert_eq!(model.len(), 3);
        assert!(matches!(model.get_node(&[3]), Err(TreeError::NodeNotFound(_))));
        assert!(matches!(model.get_node(&[]), Err(TreeError::NodeNotFound(_))));
        assert!(model.set_collapsed(&[7], Some(true), false).is_err());
        assert!(!model.has(&[3]));
        assert!(model.has(&[2]));
    }

    #[test]
    fn stale_ids_are_reported() {
        let mut model = abc();
        let b = model.get_node(&[1]).unwrap().id();
        model.splice(&[1], 1, [], SpliceOptions::default()).unwrap();
        assert_eq!(model.get_node_location(b), Err(TreeError::StaleNode(b)));
        assert!(model.node(b).is_none());
    }

    #[test]
    fn insert_under_collapsed_parent_is_not_pushed() {
        let mut model: Model = Model::new(Recorder::default());
        model
            .splice(&[0], 0, [leaf("A").collapsed(true), leaf("B")], SpliceOptions::default())
            .unwrap();
        let pushed = model.list().splices.len();
        model
            .splice(&[0, 0], 0, [leaf("A1").with_children([leaf("A1a")])], SpliceOptions::default())
            .unwrap();
        assert_eq!(model.list().splices.len(), pushed);
        assert_eq!(model.get_node(&[0]).unwrap().visible_node_count(), 1);
        assert_eq!(model.get_list_render_count(&[0, 0]).unwrap(), 2);
        check_invariants(&model);

        model.set_collapsed(&[0], Some(false), false).unwrap();
        assert_eq!(rows(&model), ["A", "A1", "A1a", "B"]);
    }

    #[test]
    fn collapse_by_default_applies_when_children_arrive() {
        let options = TreeModelOptions {
            collapse_by_default: true,
            ..TreeModelOptions::default()
        };
        let mut model: Model = Model::with_options(Recorder::default(), options);
        model.splice(&[0], 0, [leaf("A"), leaf("B")], SpliceOptions::default()).unwrap();
        assert!(!model.is_collapsed(&[0]).unwrap(), "a leaf is never collapsed");
        let changes = Rc::new(RefCell::new(Vec::new()));
        let seen = changes.clone();
        model.on_did_change_collapse_state(move |change| {
            seen.borrow_mut().push(*change.node.data());
        });

        let pushed = model.list().splices.len();
        model
            .splice(&[0, 0], 0, [leaf("A1")], SpliceOptions::default())
            .unwrap();
        assert!(model.is_collapsed(&[0]).unwrap());
        assert_eq!(rows(&model), ["A", "B"]);
        assert_eq!(model.list().splices.len(), pushed + 1);
        assert_eq!(model.list().splices.last(), Some(&(0, 1, 1)), "parent row re-pushed");
        assert_eq!(*changes.borrow(), ["A"]);
        check_invariants(&model);
    }

    #[test]
    fn gaining_children_reports_the_parent() {
        let mut model = abc();
        let changes = Rc::new(RefCell::new(Vec::new()));
        let seen = changes.clone();
        model.on_did_change_collapse_state(move |change| {
            seen.borrow_mut().push(*change.node.data());
        });
        model.splice(&[1, 0], 0, [leaf("B1")], SpliceOptions::default()).unwrap();
        assert_eq!(model.list().splices.last(), Some(&(2, 0, 1)));
        assert_eq!(*changes.borrow(), ["B"]);

        model.splice(&[1, 1], 0, [leaf("B2")], SpliceOptions::default()).unwrap();
        assert_eq!(*changes.borrow(), ["B"], "already collapsible");
        assert_eq!(rows(&model), ["A", "B", "B1", "B2", "C"]);
    }

    #[test]
    fn non_collapsible_parents() {
        let options = TreeModelOptions {
            allow_non_collapsible_parents: true,
            ..TreeModelOptions::default()
        };
        let mut model: Model = Model::with_options(Recorder::default(), options);
        model
            .splice(&[0], 0, [leaf("A").with_children([leaf("A1")])], SpliceOptions::default())
            .unwrap();
        assert!(!model.is_collapsible(&[0]).unwrap());
        assert!(!model.set_collapsed(&[0], Some(true), false).unwrap());
        assert_eq!(rows(&model), ["A", "A1"]);
    }

    #[test]
    fn recursive_collapse_and_expand() {
        let mut model: Model = Model::new(Recorder::default());
        model
            .splice(
                &[0],
                0,
                [
                    leaf("A").with_children([leaf("A1").with_children([leaf("A1a")]), leaf("A2")]),
                    leaf("B"),
                ],
                SpliceOptions::default(),
            )
            .unwrap();
        let deep = Rc::new(RefCell::new(Vec::new()));
        let seen = deep.clone();
        model.on_did_change_collapse_state(move |change| {
            seen.borrow_mut().push((*change.node.data(), change.deep));
        });

        assert!(model.set_collapsed(&[0], Some(true), true).unwrap());
        assert_eq!(rows(&model), ["A", "B"]);
        assert_eq!(*deep.borrow(), [("A", false), ("A1", true)]);
        assert!(model.is_collapsed(&[0, 0]).unwrap());

        model.set_collapsed(&[0], Some(false), false).unwrap();
        assert_eq!(rows(&model), ["A", "A1", "A2", "B"]);
        check_invariants(&model);

        model.set_collapsed(&[], Some(false), true).unwrap();
        assert_eq!(rows(&model), ["A", "A1", "A1a", "A2", "B"]);
        assert_eq!(model.list().splices.last(), Some(&(0, 4, 5)));

        model.set_collapsed(&[], None, true).unwrap();
        assert_eq!(rows(&model), ["A", "B"]);
        check_invariants(&model);
    }

    #[test]
    fn collapse_below_collapsed_ancestor_updates_counts_only() {
        let mut model: Model = Model::new(Recorder::default());
        let a1 = leaf("A1").with_children([leaf("A1a")]);
        model
            .splice(
                &[0],
                0,
                [leaf("A").collapsed(true).with_children([a1])],
                SpliceOptions::default(),
            )
            .unwrap();
        let pushed = model.list().splices.len();
        assert!(model.set_collapsed(&[0, 0], Some(true), false).unwrap());
        assert_eq!(model.list().splices.len(), pushed);
        assert_eq!(model.get_list_render_count(&[0, 0]).unwrap(), 1);
        check_invariants(&model);
    }

    #[test]
    fn expand_to_reveals_nested_node() {
        let mut model: Model = Model::new(Recorder::default());
        let a1a = leaf("A1a").collapsed(true).with_children([leaf("x")]);
        let a1 = leaf("A1").collapsed(true).with_children([a1a]);
        model
            .splice(
                &[0],
                0,
                [leaf("A").collapsed(true).with_children([a1])],
                SpliceOptions::default(),
            )
            .unwrap();
        assert_eq!(model.get_node_list_index(&[0, 0, 0]).unwrap(), None);
        model.expand_to(&[0, 0, 0]).unwrap();
        assert_eq!(rows(&model), ["A", "A1", "A1a"]);
        assert_eq!(model.get_node_list_index(&[0, 0, 0]).unwrap(), Some(2));
        assert!(model.is_collapsed(&[0, 0, 0]).unwrap(), "target keeps its own state");
        check_invariants(&model);
    }

    #[test]
    fn auto_expand_single_children() {
        let options = TreeModelOptions {
            auto_expand_single_children: true,
            ..TreeModelOptions::default()
        };
        let mut model: Model = Model::with_options(Recorder::default(), options);
        let a1 = leaf("A1").collapsed(true).with_children([leaf("x").collapsed(true), leaf("y")]);
        model
            .splice(
                &[0],
                0,
                [leaf("A").collapsed(true).with_children([a1])],
                SpliceOptions::default(),
            )
            .unwrap();
        model.set_collapsed(&[0], Some(false), false).unwrap();
        assert_eq!(rows(&model), ["A", "A1", "x", "y"]);
    }

    #[test]
    fn set_collapsible_reserves_and_releases() {
        let mut model = abc();
        assert!(model.set_collapsible(&[1], true).unwrap());
        assert!(!model.set_collapsible(&[1], true).unwrap());
        assert!(model.is_collapsible(&[1]).unwrap());
        assert_eq!(model.list().splices.last(), Some(&(1, 1, 1)), "row re-pushed");

        model
            .splice(&[1, 0], 0, [leaf("B1")], SpliceOptions::default())
            .unwrap();
        model.set_collapsed(&[1], Some(true), false).unwrap();
        assert_eq!(rows(&model), ["A", "B", "C"]);

        assert!(model.set_collapsible(&[1], false).unwrap());
        assert!(!model.is_collapsed(&[1]).unwrap());
        assert_eq!(rows(&model), ["A", "B", "B1", "C"]);
        assert_eq!(model.list().splices.last(), Some(&(1, 1, 2)));
        check_invariants(&model);

        assert!(model.set_collapsible(&[1], true).unwrap());
        assert!(!model.is_collapsed(&[1]).unwrap(), "stays expanded");
        assert_eq!(rows(&model), ["A", "B", "B1", "C"]);
        assert_eq!(model.list().splices.last(), Some(&(1, 2, 2)));
        check_invariants(&model);

        assert!(!model.set_collapsible(&[], true).unwrap());
    }

    #[test]
    fn rerender_pushes_one_row() {
        let mut model = abc();
        model.rerender(&[2]).unwrap();
        assert_eq!(model.list().splices.last(), Some(&(2, 1, 1)));
        assert_eq!(rows(&model), ["A", "B", "C"]);
        model.rerender(&[]).unwrap();
        assert_eq!(model.list().splices.len(), 2);
    }

    #[test]
    fn splice_listeners_see_top_level_nodes() {
        let mut model = abc();
        let events = Rc::new(RefCell::new(Vec::new()));
        let seen = events.clone();
        let id = model.on_did_splice(move |event| {
            seen.borrow_mut().push((
                event.location.to_vec(),
                event.delete_count,
                event.inserted.iter().map(|n| *n.data()).collect::<Vec<_>>(),
                event.deleted.iter().map(|n| *n.data()).collect::<Vec<_>>(),
            ));
        });
        model
            .splice(&[1], 2, [leaf("X").with_children([leaf("X1")])], SpliceOptions::default())
            .unwrap();
        assert_eq!(
            *events.borrow(),
            [(vec![1], 2, vec!["X"], vec!["B", "C"])]
        );
        assert!(model.remove_listener(id));
        model.splice(&[0], 1, [], SpliceOptions::default()).unwrap();
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn first_child_and_last_descendant() {
        let mut model: Model = Model::new(Recorder::default());
        model
            .splice(
                &[0],
                0,
                [
                    leaf("A").with_children([leaf("A1"), leaf("A2").with_children([leaf("A2a")])]),
                    leaf("B"),
                ],
                SpliceOptions::default(),
            )
            .unwrap();
        let data = |id: Option<NodeId>| id.map(|id| *model.node(id).unwrap().data());
        assert_eq!(data(model.first_child(&[0]).unwrap()), Some("A1"));
        assert_eq!(data(model.last_descendant(&[0]).unwrap()), Some("A2a"));
        assert_eq!(data(model.last_descendant(&[]).unwrap()), Some("B"));
        assert_eq!(data(model.first_child(&[1]).unwrap()), None);
    }

    fn matches_x(data: &&'static str, parent: TreeVisibility) -> FilterResult<usize> {
        if data.contains('x') {
            FilterResult::visible().with_data(data.len())
        } else if parent == TreeVisibility::Visible && data.ends_with('!') {
            FilterResult::visible()
        } else {
            FilterResult::recurse()
        }
    }

    #[test]
    fn filtering_with_recurse_and_metadata() {
        let mut model: Model<usize> = Model::new(Recorder::default()).with_filter(matches_x);
        model
            .splice(
                &[0],
                0,
                [
                    leaf("A").with_children([leaf("a1"), leaf("ax")]),
                    leaf("B").with_children([leaf("b1")]),
                    leaf("xC").with_children([leaf("c!")]),
                ],
                SpliceOptions::default(),
            )
            .unwrap();
        assert_eq!(rows(&model), ["A", "ax", "xC", "c!"]);
        assert_eq!(model.get_node(&[0, 1]).unwrap().filter_data(), Some(&2));
        assert_eq!(model.get_node_list_index(&[1]).unwrap(), None);
        assert_eq!(model.get_node(&[0]).unwrap().visible_children_count(), 1);
        check_invariants(&model);
    }

    #[test]
    fn refilter_restores_hidden_subtrees() {
        let hide = Rc::new(RefCell::new(true));
        let flag = hide.clone();
        let mut model: Model = Model::new(Recorder::default()).with_filter(
            move |data: &&'static str, _: TreeVisibility| {
                FilterResult::from(!(*flag.borrow() && data.starts_with('B')))
            },
        );
        model
            .splice(
                &[0],
                0,
                [leaf("A"), leaf("B").with_children([leaf("B1"), leaf("B2")]), leaf("C")],
                SpliceOptions::default(),
            )
            .unwrap();
        assert_eq!(rows(&model), ["A", "C"]);
        assert_eq!(model.get_list_render_count(&[1]).unwrap(), 0);
        assert_eq!(model.len(), 5, "hidden children stay in memory");

        *hide.borrow_mut() = false;
        model.refilter();
        assert_eq!(rows(&model), ["A", "B", "B1", "B2", "C"]);
        assert_eq!(model.list().splices.last(), Some(&(0, 2, 5)));
        check_invariants(&model);
    }

    #[test]
    fn splice_option_filter_overrides_model_filter() {
        let mut model: Model = Model::new(Recorder::default())
            .with_filter(|_: &&'static str, _: TreeVisibility| FilterResult::hidden());
        let show_all: &dyn TreeFilter<&'static str, ()> =
            &|_: &&'static str, _: TreeVisibility| FilterResult::visible();
        model
            .splice(
                &[0],
                0,
                [leaf("A")],
                SpliceOptions {
                    filter: Some(show_all),
                    ..SpliceOptions::default()
                },
            )
            .unwrap();
        assert_eq!(rows(&model), ["A"]);
        model.splice(&[1], 0, [leaf("B")], SpliceOptions::default()).unwrap();
        assert_eq!(rows(&model), ["A"]);
    }

    #[test]
    fn splice_under_recurse_parent_updates_its_visibility() {
        let mut model: Model<usize> = Model::new(Recorder::default()).with_filter(matches_x);
        model
            .splice(&[0], 0, [leaf("A").with_children([leaf("a1")])], SpliceOptions::default())
            .unwrap();
        assert!(rows(&model).is_empty());
        assert_eq!(model.list().splices, [(0, 0, 0)]);

        model
            .splice(&[0, 1], 0, [leaf("ax")], SpliceOptions::default())
            .unwrap();
        assert_eq!(rows(&model), ["A", "ax"]);
        assert_eq!(model.list().splices, [(0, 0, 0), (0, 0, 2)], "one push per splice");
        check_invariants(&model);

        model
            .splice(&[0, 2], 0, [leaf("bx")], SpliceOptions::default())
            .unwrap();
        assert_eq!(rows(&model), ["A", "ax", "bx"]);
        assert_eq!(model.list().splices.last(), Some(&(2, 0, 1)));
        assert_eq!(model.list().splices.len(), 3);
        check_invariants(&model);
    }

    #[test]
    fn recurse_ancestors_keep_per_splice_filter_decisions() {
        let mut model: Model = Model::new(Recorder::default());
        let filter: &dyn TreeFilter<&'static str, ()> =
            &|data: &&'static str, _: TreeVisibility| -> FilterResult<()> {
                match *data {
                    "secret" => FilterResult::hidden(),
                    "dir" => FilterResult::recurse(),
                    _ => FilterResult::visible(),
                }
            };
        let filtered = || SpliceOptions {
            filter: Some(filter),
            ..SpliceOptions::default()
        };
        model
            .splice(
                &[0],
                0,
                [leaf("dir").with_children([leaf("a"), leaf("secret")])],
                filtered(),
            )
            .unwrap();
        assert_eq!(rows(&model), ["dir", "a"]);

        model.splice(&[0, 2], 0, [leaf("b")], filtered()).unwrap();
        assert_eq!(rows(&model), ["dir", "a", "b"], "secret stays hidden");
        assert_eq!(model.list().splices.last(), Some(&(2, 0, 1)));
        check_invariants(&model);

        // Removing the last visible children hides the Recurse parent in the same push.
        let pushed = model.list().splices.len();
        model.splice(&[0, 0], 1, [], SpliceOptions::default()).unwrap();
        model.splice(&[0, 1], 1, [], SpliceOptions::default()).unwrap();
        assert!(rows(&model).is_empty());
        assert_eq!(model.list().splices.len(), pushed + 2);
        assert_eq!(model.list().splices.last(), Some(&(0, 2, 0)));
        assert_eq!(model.get_list_render_count(&[0]).unwrap(), 0);
        check_invariants(&model);

        model.splice(&[0, 1], 0, [leaf("c")], SpliceOptions::default()).unwrap();
        assert_eq!(rows(&model), ["dir", "c"]);
        assert_eq!(model.list().splices.last(), Some(&(0, 0, 2)));
        check_invariants(&model);
    }

    #[test]
    fn vec_adapter_mirrors_rows() {
        let mut model: IndexTreeModel<u32, Vec<NodeId>> = IndexTreeModel::new(Vec::new());
        model
            .splice(
                &[0],
                0,
                (0..4).map(|i| TreeElement::new(i).with_children([TreeElement::new(i * 10)])),
                SpliceOptions::default(),
            )
            .unwrap();
        assert_eq!(model.list().len(), 8);
        model.set_collapsed(&[1], Some(true), false).unwrap();
        model.splice(&[2, 1], 0, [TreeElement::new(99)], SpliceOptions::default()).unwrap();
        let data: Vec<u32> = model
            .list()
            .iter()
            .map(|&id| *model.node(id).unwrap().data())
            .collect();
        assert_eq!(data, [0, 0, 1, 2, 20, 99, 3, 30]);
        check_invariants(&model);
    }
}

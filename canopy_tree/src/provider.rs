// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Children providers: where a tree's shape comes from.

use alloc::vec::Vec;

use crate::error::TreeError;
use crate::event::SpliceOptions;
use crate::identity_model::{IdentityProvider, IdentityTreeModel};
use crate::node::TreeElement;
use crate::view::Spliceable;

/// Source of the children of an item.
///
/// The models never call a provider on their own: callers resolve children
/// (possibly asynchronously, outside this crate) and splice them in.
/// [`IdentityTreeModel::load_children`] is the synchronous shortcut for
/// providers that can answer immediately.
pub trait ChildrenProvider<T> {
    /// Whether `data` can have children, which decides if its node is
    /// collapsible before its children are loaded.
    fn has_children(&self, data: &T) -> bool;

    /// The children of `parent`, or of the root for `None`, in display order.
    fn children(&self, parent: Option<&T>) -> Vec<T>;
}

impl<T, I, L, F> IdentityTreeModel<T, I, L, F>
where
    I: IdentityProvider<T>,
    L: Spliceable<T, F>,
{
    /// Replace the children of `parent` with what `provider` reports.
    ///
    /// Each child is marked collapsible according to
    /// [`ChildrenProvider::has_children`]. Children already in the tree keep
    /// their collapsed state.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownIdentity`] if `parent` is not mapped.
    pub fn load_children<P>(
        &mut self,
        parent: Option<&I::Key>,
        provider: &P,
    ) -> Result<(), TreeError>
    where
        P: ChildrenProvider<T> + ?Sized,
    {
        let children = match parent {
            None => provider.children(None),
            Some(key) => provider.children(Some(self.get_node(key)?.data())),
        };
        log::debug!("loaded {} children", children.len());
        let elements: Vec<TreeElement<T>> = children
            .into_iter()
            .map(|child| {
                let collapsible = provider.has_children(&child);
                TreeElement::new(child).collapsible(collapsible)
            })
            .collect();
        self.set_children(parent, elements, SpliceOptions::default())
    }
}

// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filtering: per-node visibility and filter metadata.

/// Visibility reported by a [`TreeFilter`] for one node.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TreeVisibility {
    /// The node and its whole subtree contribute no rows.
    ///
    /// Children stay in memory; a later filter pass can reveal them again
    /// without re-inserting them.
    Hidden,
    /// The node is shown.
    #[default]
    Visible,
    /// The node is shown only if at least one of its children is visible.
    Recurse,
}

/// Outcome of filtering one node: its visibility plus optional metadata for renderers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterResult<F> {
    /// Visibility of the node.
    pub visibility: TreeVisibility,
    /// Metadata stored on the node as its filter data.
    pub data: Option<F>,
}

impl<F> FilterResult<F> {
    /// A visible result without metadata.
    pub const fn visible() -> Self {
        Self {
            visibility: TreeVisibility::Visible,
            data: None,
        }
    }

    /// A hidden result without metadata.
    pub const fn hidden() -> Self {
        Self {
            visibility: TreeVisibility::Hidden,
            data: None,
        }
    }

    /// A result whose visibility is decided by the node's children.
    pub const fn recurse() -> Self {
        Self {
            visibility: TreeVisibility::Recurse,
            data: None,
        }
    }

    /// Attach metadata to this result.
    #[must_use]
    pub fn with_data(mut self, data: F) -> Self {
        self.data = Some(data);
        self
    }
}

impl<F> From<bool> for FilterResult<F> {
    fn from(visible: bool) -> Self {
        if visible {
            Self::visible()
        } else {
            Self::hidden()
        }
    }
}

impl<F> From<TreeVisibility> for FilterResult<F> {
    fn from(visibility: TreeVisibility) -> Self {
        Self {
            visibility,
            data: None,
        }
    }
}

/// Decides which nodes are shown.
///
/// The filter runs when a node is created and on every
/// [`refilter`](crate::IndexTreeModel::refilter). `parent_visibility` is the
/// visibility the parent was given in the same pass (`Visible` for top-level
/// nodes), which lets a filter show every descendant of a match.
///
/// Any `Fn(&T, TreeVisibility) -> FilterResult<F>` closure is a filter.
pub trait TreeFilter<T, F> {
    /// Filter one node.
    fn filter(&self, data: &T, parent_visibility: TreeVisibility) -> FilterResult<F>;
}

impl<T, F, Func> TreeFilter<T, F> for Func
where
    Func: Fn(&T, TreeVisibility) -> FilterResult<F>,
{
    fn filter(&self, data: &T, parent_visibility: TreeVisibility) -> FilterResult<F> {
        self(data, parent_visibility)
    }
}

/// Run an optional filter; no filter means every node is visible.
pub(crate) fn apply<T, F>(
    filter: Option<&dyn TreeFilter<T, F>>,
    data: &T,
    parent_visibility: TreeVisibility,
) -> FilterResult<F> {
    filter.map_or_else(FilterResult::visible, |filter| {
        filter.filter(data, parent_visibility)
    })
}

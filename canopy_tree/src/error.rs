// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by the tree models.

use crate::types::{Location, NodeId};

/// Failure of a tree model operation.
///
/// Every variant indicates a caller bug, typically a location or identity
/// that was kept across an edit that invalidated it. The model is left
/// unchanged when an operation fails.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// A path segment is out of range, or a splice was given the empty location.
    #[error("invalid tree location {0:?}")]
    InvalidLocation(Location),
    /// The location does not address a node.
    #[error("tree node not found at {0:?}")]
    NodeNotFound(Location),
    /// The id names a node that has been spliced out.
    #[error("stale tree node id {0:?}")]
    StaleNode(NodeId),
    /// The identity model has no node for the given identity.
    #[error("no tree node for the given identity")]
    UnknownIdentity,
}

impl TreeError {
    pub(crate) fn invalid_location(location: &[usize]) -> Self {
        Self::InvalidLocation(Location::from_slice(location))
    }

    pub(crate) fn node_not_found(location: &[usize]) -> Self {
        Self::NodeNotFound(Location::from_slice(location))
    }
}

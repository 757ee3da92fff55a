//! Error types for cascade operations
//!
//! Every engine failure is a typed value. Operations that fail leave the
//! cascade they were called on untouched, since they only ever produce new
//! snapshots.

use thiserror::Error;

use super::node::NodeKey;

/// Boxed error returned by a failing cleaner.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for cascade operations.
pub type CascadeResult<T, K> = Result<T, CascadeError<K>>;

/// Errors that can occur while building, dirtying or cleaning a cascade.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CascadeError<K: NodeKey> {
    /// A node with this identifier already exists.
    #[error("node {id:?} already exists")]
    DuplicateNode {
        /// The identifier that was added twice.
        id: K,
    },

    /// A node named a dependency that is not in the cascade.
    #[error("node {id:?} depends on {dependency:?}, which does not exist")]
    UnknownDependency {
        /// The node being added.
        id: K,
        /// The missing dependency.
        dependency: K,
    },

    /// A node was given an empty dependency list, so there is nothing to
    /// derive its initial state from.
    #[error("node {id:?} has no dependencies; give it an explicit initial state")]
    AmbiguousInitialState {
        /// The node being added.
        id: K,
    },

    /// Flat construction arguments did not form (id, cleaner, initial) triples.
    #[error("malformed construction arguments: {reason}")]
    MalformedConstructionArguments {
        /// What was wrong with the argument list.
        reason: String,
    },

    /// One or more nodes named in a dirty request do not exist.
    #[error("unknown nodes: {ids:?}")]
    UnknownNode {
        /// Every requested identifier that was missing.
        ids: Vec<K>,
    },

    /// The target node does not exist.
    #[error("no such node: {id:?}")]
    NoSuchNode {
        /// The identifier that was looked up.
        id: K,
    },

    /// A cleaner failed while resynchronizing. The snapshot computed for this
    /// clean must not be published.
    #[error("cleaner for node {id:?} failed")]
    Cleaner {
        /// The node whose cleaner failed.
        id: K,
        /// The cleaner's error.
        #[source]
        source: BoxError,
    },

    /// A cell update kept losing compare-and-swap races.
    #[error("gave up publishing after losing {attempts} compare-and-swap races")]
    Contention {
        /// How many read-compute-publish cycles were attempted.
        attempts: usize,
    },
}

impl<K: NodeKey> CascadeError<K> {
    /// Creates a duplicate node error.
    pub fn duplicate_node(id: K) -> Self {
        Self::DuplicateNode { id }
    }

    /// Creates an unknown dependency error.
    pub fn unknown_dependency(id: K, dependency: K) -> Self {
        Self::UnknownDependency { id, dependency }
    }

    /// Creates an ambiguous initial state error.
    pub fn ambiguous_initial_state(id: K) -> Self {
        Self::AmbiguousInitialState { id }
    }

    /// Creates a malformed construction arguments error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedConstructionArguments {
            reason: reason.into(),
        }
    }

    /// Creates an unknown node error naming every missing identifier.
    pub fn unknown_nodes(ids: Vec<K>) -> Self {
        Self::UnknownNode { ids }
    }

    /// Creates a no such node error.
    pub fn no_such_node(id: K) -> Self {
        Self::NoSuchNode { id }
    }

    /// Wraps a cleaner failure.
    pub fn cleaner(id: K, source: BoxError) -> Self {
        Self::Cleaner { id, source }
    }

    /// Creates a contention error.
    pub fn contention(attempts: usize) -> Self {
        Self::Contention { attempts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_name_the_offending_nodes() {
        let err = CascadeError::unknown_dependency("render", "transform");
        assert_eq!(
            err.to_string(),
            "node \"render\" depends on \"transform\", which does not exist"
        );

        let err = CascadeError::unknown_nodes(vec!["a", "b"]);
        assert_eq!(err.to_string(), "unknown nodes: [\"a\", \"b\"]");
    }

    #[test]
    fn cleaner_error_exposes_source() {
        let source: BoxError = "disk full".into();
        let err = CascadeError::cleaner(7u32, source);

        assert_eq!(err.to_string(), "cleaner for node 7 failed");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("disk full"));
    }
}

//! Graph Nodes
//!
//! This module defines the records stored for each node of a cascade, the
//! cleaner callbacks attached to them, and the way a new node's initial state
//! is given.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexSet;

use super::error::BoxError;

/// Identifier of a node in a cascade.
///
/// Identifiers are chosen by the caller and never generated internally. Any
/// cloneable, hashable, debuggable type works; string slices, `String`s and
/// small enums are the usual choices.
pub trait NodeKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> NodeKey for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

type CleanFn = dyn Fn() -> Result<(), BoxError> + Send + Sync;

/// Callback that resynchronizes a node's external state.
///
/// Cleaners must be idempotent: a failed or lost clean is retried by running
/// every affected cleaner again.
///
/// Identity is the shared allocation. Cloning a cleaner and attaching the
/// clones to several nodes makes them one action, run at most once per clean.
#[derive(Clone)]
pub struct Cleaner(Arc<CleanFn>);

impl Cleaner {
    /// Create a cleaner from an infallible callback.
    pub fn new<F>(clean: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self(Arc::new(move || {
            clean();
            Ok(())
        }))
    }

    /// Create a cleaner from a callback that can fail.
    ///
    /// A failure aborts the clean it happens in and is returned to the caller
    /// as [`CascadeError::Cleaner`](super::CascadeError::Cleaner).
    pub fn fallible<F, E>(clean: F) -> Self
    where
        F: Fn() -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self(Arc::new(move || clean().map_err(Into::into)))
    }

    /// Invoke the callback.
    pub fn run(&self) -> Result<(), BoxError> {
        (self.0)()
    }

    /// Whether both cleaners are the same callback instance.
    pub fn ptr_eq(&self, other: &Cleaner) -> bool {
        self.identity() == other.identity()
    }

    /// Address of the shared callback, used to deduplicate actions.
    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for Cleaner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cleaner")
            .field(&format_args!("{:#x}", self.identity()))
            .finish()
    }
}

/// How a new node's initial state is determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Initial<K> {
    /// The node depends on these nodes, in this order. It starts clean only
    /// if all of them are clean.
    Dependencies(Vec<K>),

    /// The node has no dependencies and starts in this state.
    State(bool),
}

impl<K> From<bool> for Initial<K> {
    fn from(state: bool) -> Self {
        Self::State(state)
    }
}

impl<K> From<Vec<K>> for Initial<K> {
    fn from(dependencies: Vec<K>) -> Self {
        Self::Dependencies(dependencies)
    }
}

impl<K, const N: usize> From<[K; N]> for Initial<K> {
    fn from(dependencies: [K; N]) -> Self {
        Self::Dependencies(dependencies.into())
    }
}

/// The parts of a node that never change after it is added.
struct NodeShape<K> {
    dependencies: IndexSet<K>,
    cleaner: Option<Cleaner>,
}

/// A node in a cascade snapshot.
///
/// The dependency set and cleaner are shared between every snapshot the node
/// appears in; only the clean flag is copied.
pub struct NodeRecord<K> {
    clean: bool,
    shape: Arc<NodeShape<K>>,
}

impl<K> NodeRecord<K> {
    pub(crate) fn new(clean: bool, dependencies: IndexSet<K>, cleaner: Option<Cleaner>) -> Self {
        Self {
            clean,
            shape: Arc::new(NodeShape {
                dependencies,
                cleaner,
            }),
        }
    }

    /// Whether the node's external state is up to date.
    pub fn is_clean(&self) -> bool {
        self.clean
    }

    /// Direct dependencies, in declaration order.
    pub fn dependencies(&self) -> &IndexSet<K> {
        &self.shape.dependencies
    }

    /// The node's cleaner, if it has one.
    pub fn cleaner(&self) -> Option<&Cleaner> {
        self.shape.cleaner.as_ref()
    }

    /// A copy of this record with a different clean flag.
    pub(crate) fn with_clean(&self, clean: bool) -> Self {
        Self {
            clean,
            shape: Arc::clone(&self.shape),
        }
    }

    pub(crate) fn set_clean(&mut self, clean: bool) {
        self.clean = clean;
    }
}

impl<K> Clone for NodeRecord<K> {
    fn clone(&self) -> Self {
        self.with_clean(self.clean)
    }
}

impl<K> PartialEq for NodeRecord<K> {
    fn eq(&self, other: &Self) -> bool {
        self.clean == other.clean && Arc::ptr_eq(&self.shape, &other.shape)
    }
}

impl<K: fmt::Debug> fmt::Debug for NodeRecord<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRecord")
            .field("clean", &self.clean)
            .field("dependencies", &self.shape.dependencies)
            .field("cleaner", &self.shape.cleaner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cleaner_runs_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let cleaner = Cleaner::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(cleaner.run().is_ok());
        assert!(cleaner.run().is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fallible_cleaner_reports_error() {
        let cleaner = Cleaner::fallible(|| Err("render target lost"));

        let err = cleaner.run().unwrap_err();
        assert_eq!(err.to_string(), "render target lost");
    }

    #[test]
    fn cleaner_identity_follows_allocation() {
        let a = Cleaner::new(|| {});
        let b = Cleaner::new(|| {});
        let a_again = a.clone();

        assert!(a.ptr_eq(&a_again));
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn initial_from_conversions() {
        assert_eq!(Initial::<&str>::from(true), Initial::State(true));
        assert_eq!(
            Initial::from(["a", "b"]),
            Initial::Dependencies(vec!["a", "b"])
        );
        assert_eq!(
            Initial::from(vec!["a"]),
            Initial::Dependencies(vec!["a"])
        );
    }

    #[test]
    fn record_clean_copy_shares_shape() {
        let record: NodeRecord<&str> =
            NodeRecord::new(false, ["a"].into_iter().collect(), None);
        let cleaned = record.with_clean(true);

        assert!(!record.is_clean());
        assert!(cleaned.is_clean());
        assert!(Arc::ptr_eq(&record.shape, &cleaned.shape));
        assert_ne!(record, cleaned);
        assert_eq!(cleaned, record.with_clean(true));
    }
}

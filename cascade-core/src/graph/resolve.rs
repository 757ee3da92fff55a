//! Clean Resolution
//!
//! Cleaning a node brings it and every dirty node it depends on back in sync
//! with their dependencies, running each cleaner at most once and always
//! after the cleaners of its dependencies.
//!
//! # Algorithm
//!
//! 1. Resolve (pure). Starting at the target, walk dirty dependencies
//!    depth-first in declaration order using an explicit stack. A node is
//!    emitted when its last dirty dependency has been emitted, giving a
//!    post-order: dependencies always come before their dependants. Clean
//!    nodes are never entered, and a node reached a second time along
//!    another path (a diamond) is skipped.
//! 2. Deduplicate. Nodes without a cleaner contribute no action. A cleaner
//!    instance shared by several nodes keeps only its first position.
//! 3. Commit. Build the new snapshot with every visited node clean.
//! 4. Execute. Run the actions in order. If one fails, the error is returned
//!    and the new snapshot is dropped, so the published snapshot still has
//!    every one of those nodes dirty and a retry runs all of them again.

use std::collections::HashSet;

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::cascade::Cascade;
use super::error::{CascadeError, CascadeResult};
use super::node::{Cleaner, NodeKey, NodeRecord};

/// One cleaner to run, tagged with the node it was resolved from.
#[derive(Debug, Clone)]
pub struct Action<K> {
    node: K,
    cleaner: Cleaner,
}

impl<K> Action<K> {
    /// The node whose cleaner this is.
    pub fn node(&self) -> &K {
        &self.node
    }

    /// The cleaner to run.
    pub fn cleaner(&self) -> &Cleaner {
        &self.cleaner
    }
}

/// The outcome of resolving a clean, before anything is committed or run.
#[derive(Debug, Clone)]
pub struct Resolution<K> {
    actions: Vec<Action<K>>,
    affected: IndexSet<K>,
}

impl<K: NodeKey> Resolution<K> {
    fn empty() -> Self {
        Self {
            actions: Vec::new(),
            affected: IndexSet::new(),
        }
    }

    /// Cleaners to run, dependencies first, without duplicates.
    pub fn actions(&self) -> &[Action<K>] {
        &self.actions
    }

    /// Every node that becomes clean, in the order it was resolved.
    pub fn affected(&self) -> &IndexSet<K> {
        &self.affected
    }

    /// Whether the target was already clean.
    pub fn is_empty(&self) -> bool {
        self.affected.is_empty()
    }

    /// Run every action in order, stopping at the first failure.
    pub fn run(&self) -> CascadeResult<(), K> {
        for action in &self.actions {
            trace!(node = ?action.node, "running cleaner");
            if let Err(source) = action.cleaner.run() {
                warn!(node = ?action.node, error = %source, "cleaner failed");
                return Err(CascadeError::cleaner(action.node.clone(), source));
            }
        }
        Ok(())
    }
}

/// A node being resolved: its dirty dependencies are visited from `next` on.
struct Frame<'a, K> {
    id: &'a K,
    record: &'a NodeRecord<K>,
    next: usize,
}

impl<K: NodeKey> Cascade<K> {
    /// Work out which nodes a clean of `id` affects and which cleaners it
    /// runs, in order. Nothing is committed or run.
    pub fn resolve(&self, id: &K) -> CascadeResult<Resolution<K>, K> {
        let root = self.record(id)?;
        if root.is_clean() {
            return Ok(Resolution::empty());
        }

        let mut resolution = Resolution::empty();
        let mut visited: HashSet<&K> = HashSet::new();
        let mut seen_cleaners: HashSet<usize> = HashSet::new();
        let mut stack: SmallVec<[Frame<'_, K>; 16]> = SmallVec::new();

        visited.insert(id);
        stack.push(Frame {
            id,
            record: root,
            next: 0,
        });

        while let Some(frame) = stack.last_mut() {
            let record = frame.record;
            if let Some(dependency) = record.dependencies().get_index(frame.next) {
                frame.next += 1;
                if let Some(dep_record) = self.nodes.get(dependency) {
                    if !dep_record.is_clean() && visited.insert(dependency) {
                        stack.push(Frame {
                            id: dependency,
                            record: dep_record,
                            next: 0,
                        });
                    }
                }
                continue;
            }

            let id = frame.id;
            stack.pop();
            resolution.affected.insert(id.clone());
            if let Some(cleaner) = record.cleaner() {
                if seen_cleaners.insert(cleaner.identity()) {
                    resolution.actions.push(Action {
                        node: id.clone(),
                        cleaner: cleaner.clone(),
                    });
                }
            }
        }

        Ok(resolution)
    }

    /// Bring `id` and every dirty node it depends on back in sync.
    ///
    /// Returns the new snapshot with all of those nodes clean, after running
    /// their cleaners dependencies-first, each at most once. If a cleaner
    /// fails the error is returned instead and the caller keeps its current
    /// snapshot; the failed clean can simply be retried.
    pub fn clean(&self, id: &K) -> CascadeResult<Self, K> {
        let resolution = self.resolve(id)?;
        if resolution.is_empty() {
            return Ok(self.clone());
        }

        let next = self.commit(&resolution);
        debug!(
            target_node = ?id,
            affected = resolution.affected.len(),
            actions = resolution.actions.len(),
            "resolved clean"
        );
        resolution.run()?;
        Ok(next)
    }

    /// The snapshot with every affected node marked clean.
    fn commit(&self, resolution: &Resolution<K>) -> Self {
        let mut next = self.clone();
        for id in &resolution.affected {
            if let Some(record) = next.nodes.get_mut(id) {
                record.set_clean(true);
            }
        }
        next
    }
}

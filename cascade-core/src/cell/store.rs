//! The published cascade and its compare-and-swap.

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::config::CellConfig;
use crate::graph::{Cascade, CascadeError, CascadeResult, Cleaner, Initial, NodeKey};

/// A published cascade together with the generation it was published at.
#[derive(Debug)]
pub struct Snapshot<K: NodeKey> {
    generation: u64,
    cascade: Arc<Cascade<K>>,
}

impl<K: NodeKey> Snapshot<K> {
    /// Publication counter; bumps by one on every successful publish.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The shared cascade.
    pub fn cascade(&self) -> &Arc<Cascade<K>> {
        &self.cascade
    }
}

impl<K: NodeKey> Clone for Snapshot<K> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            cascade: Arc::clone(&self.cascade),
        }
    }
}

impl<K: NodeKey> Deref for Snapshot<K> {
    type Target = Cascade<K>;

    fn deref(&self) -> &Cascade<K> {
        &self.cascade
    }
}

/// The single mutable cell holding the current cascade.
///
/// Readers take a [`Snapshot`] and never block writers for longer than a
/// pointer copy. Writers compute a new cascade from a snapshot and publish it
/// only if nobody else published in between. The lock is never held while a
/// cascade operation (and therefore a cleaner) runs.
///
/// Cleaners must not update the cell they are being run from.
#[derive(Debug)]
pub struct CascadeCell<K: NodeKey> {
    published: RwLock<Snapshot<K>>,
    config: CellConfig,
}

impl<K: NodeKey> CascadeCell<K> {
    /// Create a cell holding `cascade` at generation 0.
    pub fn new(cascade: Cascade<K>) -> Self {
        Self::with_config(cascade, CellConfig::default())
    }

    /// Create a cell with explicit configuration.
    pub fn with_config(cascade: Cascade<K>, config: CellConfig) -> Self {
        Self {
            published: RwLock::new(Snapshot {
                generation: 0,
                cascade: Arc::new(cascade),
            }),
            config,
        }
    }

    /// The cell's configuration.
    pub fn config(&self) -> CellConfig {
        self.config
    }

    /// The currently published snapshot.
    pub fn load(&self) -> Snapshot<K> {
        self.published.read().clone()
    }

    /// Generation of the currently published snapshot.
    pub fn generation(&self) -> u64 {
        self.published.read().generation
    }

    /// Publish `next` if the cell is still at `expected` generation.
    ///
    /// On success returns the new snapshot; on conflict returns the snapshot
    /// that won, and `next` is dropped.
    pub fn compare_and_swap(
        &self,
        expected: u64,
        next: Cascade<K>,
    ) -> Result<Snapshot<K>, Snapshot<K>> {
        let mut published = self.published.write();
        if published.generation != expected {
            return Err(published.clone());
        }
        *published = Snapshot {
            generation: expected + 1,
            cascade: Arc::new(next),
        };
        debug!(generation = published.generation, "published cascade");
        Ok(published.clone())
    }

    /// Publish `next` unconditionally.
    pub fn replace(&self, next: Cascade<K>) -> Snapshot<K> {
        let mut published = self.published.write();
        *published = Snapshot {
            generation: published.generation + 1,
            cascade: Arc::new(next),
        };
        debug!(generation = published.generation, "replaced cascade");
        published.clone()
    }

    /// Run a read-compute-publish cycle, recomputing from the fresh snapshot
    /// whenever another writer published first.
    ///
    /// `compute` may run several times, so any cleaners it triggers may too.
    /// An error from `compute` is returned as is and nothing is published.
    pub fn update<F>(&self, mut compute: F) -> CascadeResult<Snapshot<K>, K>
    where
        F: FnMut(&Cascade<K>) -> CascadeResult<Cascade<K>, K>,
    {
        let attempts = self.config.max_attempts.max(1);
        let mut current = self.load();
        for attempt in 1..=attempts {
            let next = compute(current.cascade.as_ref())?;
            match self.compare_and_swap(current.generation, next) {
                Ok(published) => return Ok(published),
                Err(winner) => {
                    debug!(
                        attempt,
                        expected = current.generation,
                        found = winner.generation,
                        "lost publish race, recomputing"
                    );
                    current = winner;
                }
            }
        }

        warn!(attempts, "giving up after repeated publish conflicts");
        Err(CascadeError::contention(attempts))
    }

    /// Add a node to the published cascade.
    pub fn add(
        &self,
        id: K,
        cleaner: Option<Cleaner>,
        initial: impl Into<Initial<K>>,
    ) -> CascadeResult<Snapshot<K>, K> {
        let initial = initial.into();
        self.update(|cascade| cascade.add(id.clone(), cleaner.clone(), initial.clone()))
    }

    /// Mark nodes dirty in the published cascade.
    pub fn dirty<I>(&self, ids: I) -> CascadeResult<Snapshot<K>, K>
    where
        I: IntoIterator<Item = K>,
    {
        let ids: Vec<K> = ids.into_iter().collect();
        self.update(|cascade| cascade.dirty(ids.iter().cloned()))
    }

    /// Clean a node of the published cascade, running its cleaners.
    pub fn clean(&self, id: &K) -> CascadeResult<Snapshot<K>, K> {
        self.update(|cascade| cascade.clean(id))
    }

    /// Set every node of the published cascade to one state.
    pub fn set_all(&self, clean: bool) -> CascadeResult<Snapshot<K>, K> {
        self.update(|cascade| Ok(cascade.set_all(clean)))
    }
}

impl<K: NodeKey> Default for CascadeCell<K> {
    fn default() -> Self {
        Self::new(Cascade::new())
    }
}

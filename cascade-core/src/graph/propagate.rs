//! Dirty Propagation
//!
//! Marking a node dirty floods forward along dependant edges. A worklist is
//! seeded with the requested nodes; each popped node that is still clean is
//! marked dirty and its direct dependants are queued. A node that is already
//! dirty is dropped without expanding it: its dependants are dirty already,
//! because a dirty node never has clean dependants.

use std::collections::VecDeque;

use indexmap::IndexSet;
use tracing::debug;

use super::cascade::Cascade;
use super::error::{CascadeError, CascadeResult};
use super::node::NodeKey;

impl<K: NodeKey> Cascade<K> {
    /// Return a new cascade with the given nodes and everything that depends
    /// on them marked dirty.
    ///
    /// Every identifier is validated before anything is marked; if any are
    /// missing, the error names all of them. No cleaners run.
    pub fn dirty<I>(&self, ids: I) -> CascadeResult<Self, K>
    where
        I: IntoIterator<Item = K>,
    {
        let requested: IndexSet<K> = ids.into_iter().collect();
        let missing: Vec<K> = requested
            .iter()
            .filter(|id| !self.contains(id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(CascadeError::unknown_nodes(missing));
        }

        let reverse = self.reverse_edges();
        let mut next = self.clone();
        let mut queue: VecDeque<&K> = requested.iter().collect();
        let mut dirtied = 0usize;

        while let Some(id) = queue.pop_front() {
            let Some(record) = next.nodes.get_mut(id) else {
                continue;
            };
            if !record.is_clean() {
                continue;
            }
            record.set_clean(false);
            dirtied += 1;
            if let Some(dependants) = reverse.get(id) {
                queue.extend(dependants.iter().copied());
            }
        }

        debug!(requested = requested.len(), dirtied, "marked nodes dirty");
        Ok(next)
    }
}

//! Cascade Snapshots
//!
//! A [`Cascade`] is one consistent snapshot of the whole graph: every node,
//! its dependencies, its cleaner and whether it is clean. Snapshots are never
//! mutated once handed out. Every state change returns a new snapshot, which
//! callers publish through a single cell (see [`crate::cell`]).
//!
//! This module holds construction and the read-only query layer. Dirty
//! propagation and clean resolution live in `propagate` and `resolve`.
//!
//! # Acyclicity
//!
//! A node may only name dependencies that already exist when it is added, so
//! no edge can point to a node added later. That is the whole cycle story:
//! nothing is ever checked for cycles because none can be built.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;
use tracing::debug;

use super::error::{CascadeError, CascadeResult};
use super::node::{Cleaner, Initial, NodeKey, NodeRecord};

/// Map from node identifier to clean flag, in insertion order.
pub type States<K> = IndexMap<K, bool>;

/// Reverse adjacency computed on demand; no reverse index is stored.
pub(crate) type Dependants<'a, K> = HashMap<&'a K, SmallVec<[&'a K; 4]>>;

/// One argument of the flat construction form accepted by
/// [`Cascade::from_args`].
#[derive(Debug, Clone)]
pub enum ConstructionArg<K> {
    /// A node identifier.
    Id(K),
    /// The node's cleaner, or `None` for a no-op node.
    Cleaner(Option<Cleaner>),
    /// Dependencies or explicit initial state.
    Initial(Initial<K>),
}

/// An immutable snapshot of a dependency graph of state nodes.
///
/// # Example
///
/// ```
/// use cascade_core::{Cascade, Cleaner};
///
/// let cascade = Cascade::new()
///     .add("slider", None, true)?
///     .add("transform", Some(Cleaner::new(|| println!("transform"))), ["slider"])?
///     .add("render", Some(Cleaner::new(|| println!("render"))), ["transform"])?;
///
/// // The slider moved.
/// let cascade = cascade.dirty(["slider"])?;
/// assert!(!cascade.is_clean(&"render")?);
///
/// // Runs the transform cleaner, then the render cleaner.
/// let cascade = cascade.clean(&"render")?;
/// assert!(cascade.is_clean(&"render")?);
/// # Ok::<(), cascade_core::CascadeError<&str>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Cascade<K: NodeKey> {
    /// All nodes, in the order they were added.
    pub(crate) nodes: IndexMap<K, NodeRecord<K>>,
}

impl<K: NodeKey> Cascade<K> {
    /// Create an empty cascade.
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
        }
    }

    /// Build a cascade by adding each `(id, cleaner, initial)` triple in order.
    pub fn create<I>(nodes: I) -> CascadeResult<Self, K>
    where
        I: IntoIterator<Item = (K, Option<Cleaner>, Initial<K>)>,
    {
        let mut cascade = Self::new();
        for (id, cleaner, initial) in nodes {
            cascade.insert(id, cleaner, initial)?;
        }
        debug!(nodes = cascade.len(), "created cascade");
        Ok(cascade)
    }

    /// Build a cascade from a flat argument list of `id, cleaner, initial`
    /// repeated once per node.
    ///
    /// Fails with `MalformedConstructionArguments` if the list does not split
    /// into such triples.
    pub fn from_args<I>(args: I) -> CascadeResult<Self, K>
    where
        I: IntoIterator<Item = ConstructionArg<K>>,
    {
        let args: Vec<_> = args.into_iter().collect();
        if args.len() % 3 != 0 {
            return Err(CascadeError::malformed(format!(
                "{} arguments do not split into (id, cleaner, initial) triples",
                args.len()
            )));
        }

        let mut triples = Vec::with_capacity(args.len() / 3);
        let mut args = args.into_iter().enumerate();
        while let (Some(id), Some(cleaner), Some(initial)) = (args.next(), args.next(), args.next()) {
            let triple = match (id, cleaner, initial) {
                (
                    (_, ConstructionArg::Id(id)),
                    (_, ConstructionArg::Cleaner(cleaner)),
                    (_, ConstructionArg::Initial(initial)),
                ) => (id, cleaner, initial),
                ((at, arg), _, _) if !matches!(arg, ConstructionArg::Id(_)) => {
                    return Err(CascadeError::malformed(format!(
                        "argument {at} should be a node id"
                    )));
                }
                (_, (at, arg), _) if !matches!(arg, ConstructionArg::Cleaner(_)) => {
                    return Err(CascadeError::malformed(format!(
                        "argument {at} should be a cleaner"
                    )));
                }
                (_, _, (at, _)) => {
                    return Err(CascadeError::malformed(format!(
                        "argument {at} should be dependencies or an initial state"
                    )));
                }
            };
            triples.push(triple);
        }

        Self::create(triples)
    }

    /// Return a new cascade with one more node.
    ///
    /// With [`Initial::Dependencies`] the node starts clean only if every
    /// dependency is currently clean. With [`Initial::State`] it has no
    /// dependencies and starts in the given state. The cleaner is stored but
    /// not run.
    pub fn add(
        &self,
        id: K,
        cleaner: Option<Cleaner>,
        initial: impl Into<Initial<K>>,
    ) -> CascadeResult<Self, K> {
        let mut next = self.clone();
        next.insert(id, cleaner, initial.into())?;
        Ok(next)
    }

    /// Validate and insert a node in place. Leaves `self` untouched on error.
    fn insert(&mut self, id: K, cleaner: Option<Cleaner>, initial: Initial<K>) -> CascadeResult<(), K> {
        if self.nodes.contains_key(&id) {
            return Err(CascadeError::duplicate_node(id));
        }

        let (clean, dependencies) = match initial {
            Initial::State(clean) => (clean, IndexSet::new()),
            Initial::Dependencies(dependencies) => {
                if dependencies.is_empty() {
                    return Err(CascadeError::ambiguous_initial_state(id));
                }
                let mut clean = true;
                for dependency in &dependencies {
                    match self.nodes.get(dependency) {
                        Some(record) => clean &= record.is_clean(),
                        None => {
                            return Err(CascadeError::unknown_dependency(id, dependency.clone()));
                        }
                    }
                }
                (clean, dependencies.into_iter().collect())
            }
        };

        debug!(node = ?id, clean, dependencies = dependencies.len(), "added node");
        self.nodes.insert(id, NodeRecord::new(clean, dependencies, cleaner));
        Ok(())
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the cascade has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether a node with this identifier exists.
    pub fn contains(&self, id: &K) -> bool {
        self.nodes.contains_key(id)
    }

    /// The record for a node, if it exists.
    pub fn node(&self, id: &K) -> Option<&NodeRecord<K>> {
        self.nodes.get(id)
    }

    /// Look up a node that must exist.
    pub(crate) fn record(&self, id: &K) -> CascadeResult<&NodeRecord<K>, K> {
        self.nodes
            .get(id)
            .ok_or_else(|| CascadeError::no_such_node(id.clone()))
    }

    /// Whether a node's external state is up to date.
    pub fn is_clean(&self, id: &K) -> CascadeResult<bool, K> {
        Ok(self.record(id)?.is_clean())
    }

    /// All node identifiers, in the order they were added.
    pub fn node_ids(&self) -> impl Iterator<Item = &K> + '_ {
        self.nodes.keys()
    }

    /// The clean flag of every node.
    pub fn states(&self) -> States<K> {
        self.nodes
            .iter()
            .map(|(id, record)| (id.clone(), record.is_clean()))
            .collect()
    }

    /// A node's cleaner; `Ok(None)` for a no-op node.
    pub fn cleaner(&self, id: &K) -> CascadeResult<Option<&Cleaner>, K> {
        Ok(self.record(id)?.cleaner())
    }

    /// Direct dependencies of a node, in declaration order.
    pub fn direct_dependencies(&self, id: &K) -> CascadeResult<&IndexSet<K>, K> {
        Ok(self.record(id)?.dependencies())
    }

    /// Every node this node transitively depends on.
    pub fn dependencies(&self, id: &K) -> CascadeResult<IndexSet<K>, K> {
        let mut found = IndexSet::new();
        let mut stack: Vec<&K> = self.record(id)?.dependencies().iter().rev().collect();

        while let Some(next) = stack.pop() {
            if !found.insert(next.clone()) {
                continue;
            }
            if let Some(record) = self.nodes.get(next) {
                stack.extend(record.dependencies().iter().rev());
            }
        }

        Ok(found)
    }

    /// Nodes that directly depend on this node. Scans every node.
    pub fn direct_dependants(&self, id: &K) -> CascadeResult<IndexSet<K>, K> {
        self.record(id)?;
        Ok(self
            .nodes
            .iter()
            .filter(|(_, record)| record.dependencies().contains(id))
            .map(|(dependant, _)| dependant.clone())
            .collect())
    }

    /// Every node that transitively depends on this node, layer by layer:
    /// direct dependants first, then their direct dependants, and so on.
    pub fn dependants(&self, id: &K) -> CascadeResult<IndexSet<K>, K> {
        self.record(id)?;
        let reverse = self.reverse_edges();
        let mut found: HashSet<&K> = HashSet::new();
        let mut ordered = IndexSet::new();
        let mut layer = vec![id];

        while !layer.is_empty() {
            let mut next_layer = Vec::new();
            for node in layer {
                for &dependant in reverse.get(node).into_iter().flatten() {
                    if found.insert(dependant) {
                        ordered.insert(dependant.clone());
                        next_layer.push(dependant);
                    }
                }
            }
            layer = next_layer;
        }

        Ok(ordered)
    }

    /// Build the dependency -> dependants map for one traversal.
    pub(crate) fn reverse_edges(&self) -> Dependants<'_, K> {
        let mut reverse: Dependants<'_, K> = HashMap::with_capacity(self.nodes.len());
        for (dependant, record) in &self.nodes {
            for dependency in record.dependencies() {
                reverse.entry(dependency).or_default().push(dependant);
            }
        }
        reverse
    }

    /// Return a new cascade with every node set to `clean`.
    ///
    /// Runs no cleaners and does not check dependency-derived state; meant for
    /// "everything clean" or "everything dirty" resets.
    pub fn set_all(&self, clean: bool) -> Self {
        debug!(nodes = self.len(), clean, "set every node");
        Self {
            nodes: self
                .nodes
                .iter()
                .map(|(id, record)| (id.clone(), record.with_clean(clean)))
                .collect(),
        }
    }
}

impl<K: NodeKey> Default for Cascade<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: NodeKey> PartialEq for Cascade<K> {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Cascade<&'static str> {
        Cascade::new()
            .add("source", None, true)
            .unwrap()
            .add("middle", None, ["source"])
            .unwrap()
            .add("leaf", None, ["middle"])
            .unwrap()
    }

    #[test]
    fn add_derives_state_from_dependencies() {
        let cascade = Cascade::new()
            .add("clean", None, true)
            .unwrap()
            .add("dirty", None, false)
            .unwrap()
            .add("from_clean", None, ["clean"])
            .unwrap()
            .add("from_both", None, ["clean", "dirty"])
            .unwrap();

        assert!(cascade.is_clean(&"from_clean").unwrap());
        assert!(!cascade.is_clean(&"from_both").unwrap());
    }

    #[test]
    fn add_leaves_original_untouched() {
        let base = chain();
        let extended = base.add("extra", None, ["leaf"]).unwrap();

        assert_eq!(base.len(), 3);
        assert_eq!(extended.len(), 4);
        assert!(!base.contains(&"extra"));
    }

    #[test]
    fn add_rejects_duplicates() {
        let err = chain().add("middle", None, true).unwrap_err();
        assert!(matches!(err, CascadeError::DuplicateNode { id: "middle" }));
    }

    #[test]
    fn add_rejects_unknown_dependency() {
        let err = chain().add("late", None, ["leaf", "ghost"]).unwrap_err();
        assert!(matches!(
            err,
            CascadeError::UnknownDependency { id: "late", dependency: "ghost" }
        ));
    }

    #[test]
    fn add_rejects_empty_dependencies() {
        let err = chain().add("orphan", None, Vec::<&str>::new()).unwrap_err();
        assert!(matches!(err, CascadeError::AmbiguousInitialState { id: "orphan" }));
    }

    #[test]
    fn add_keeps_declaration_order_and_collapses_repeats() {
        let cascade = chain().add("fan_in", None, ["leaf", "source", "leaf"]).unwrap();
        let deps: Vec<_> = cascade.direct_dependencies(&"fan_in").unwrap().iter().copied().collect();
        assert_eq!(deps, vec!["leaf", "source"]);
    }

    #[test]
    fn create_folds_triples() {
        let cascade = Cascade::create([
            ("a", None, Initial::State(true)),
            ("b", None, Initial::State(false)),
            ("c", None, Initial::from(["a", "b"])),
        ])
        .unwrap();

        let states: Vec<_> = cascade.states().into_iter().collect();
        assert_eq!(states, vec![("a", true), ("b", false), ("c", false)]);
    }

    #[test]
    fn from_args_requires_triples() {
        let err = Cascade::from_args([
            ConstructionArg::Id("a"),
            ConstructionArg::Cleaner(None),
            ConstructionArg::Initial(Initial::State(true)),
            ConstructionArg::Id("b"),
        ])
        .unwrap_err();
        assert!(matches!(err, CascadeError::MalformedConstructionArguments { .. }));

        let err = Cascade::from_args([
            ConstructionArg::Id("a"),
            ConstructionArg::Initial(Initial::State(true)),
            ConstructionArg::Cleaner(None),
        ])
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed construction arguments: argument 1 should be a cleaner"
        );

        let cascade = Cascade::from_args([
            ConstructionArg::Id("a"),
            ConstructionArg::Cleaner(None),
            ConstructionArg::Initial(Initial::State(true)),
        ])
        .unwrap();
        assert!(cascade.is_clean(&"a").unwrap());
    }

    #[test]
    fn transitive_queries() {
        let cascade = chain()
            .add("side", None, ["source"])
            .unwrap()
            .add("join", None, ["leaf", "side"])
            .unwrap();

        let deps = cascade.dependencies(&"join").unwrap();
        assert_eq!(deps.len(), 4);
        for id in ["leaf", "middle", "source", "side"] {
            assert!(deps.contains(&id));
        }

        let direct: Vec<_> = cascade.direct_dependants(&"source").unwrap().into_iter().collect();
        assert_eq!(direct, vec!["middle", "side"]);

        // Layered: middle and side, then leaf and join.
        let all: Vec<_> = cascade.dependants(&"source").unwrap().into_iter().collect();
        assert_eq!(all, vec!["middle", "side", "leaf", "join"]);

        assert!(cascade.dependants(&"join").unwrap().is_empty());
    }

    #[test]
    fn queries_report_missing_nodes() {
        let cascade = chain();
        assert!(matches!(
            cascade.is_clean(&"nope"),
            Err(CascadeError::NoSuchNode { id: "nope" })
        ));
        assert!(cascade.dependants(&"nope").is_err());
        assert!(cascade.cleaner(&"nope").is_err());
        assert!(cascade.cleaner(&"leaf").unwrap().is_none());
    }

    #[test]
    fn set_all_overrides_every_state() {
        let dirty = chain().set_all(false);
        assert!(dirty.states().values().all(|clean| !clean));

        let clean = dirty.set_all(true);
        assert!(clean.states().values().all(|clean| *clean));
    }
}

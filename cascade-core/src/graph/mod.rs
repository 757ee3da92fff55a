//! Dependency Graph
//!
//! This module implements the cascade: a directed acyclic graph of named
//! state nodes, each either clean (its external state is up to date) or dirty.
//!
//! # Overview
//!
//! - Nodes are identified by caller-chosen keys and carry an optional cleaner
//!   that resynchronizes their external state.
//! - Edges point from dependency to dependant: if B depends on A, changing A
//!   makes B stale.
//! - A clean node only ever has clean dependencies. Dirtiness flows forward
//!   to every dependant; cleaning flows backward through dirty dependencies.
//!
//! # Design Decisions
//!
//! 1. Snapshots are immutable values. `add`, `dirty`, `clean` and `set_all`
//!    return a new [`Cascade`] and leave the receiver untouched, so a failed
//!    operation never has anything to roll back.
//!
//! 2. Per-node structure (dependencies and cleaner) is shared between
//!    snapshots behind an `Arc`; producing a new snapshot copies flags and
//!    pointers only.
//!
//! 3. Only forward edges are stored. Dependants are recovered by scanning,
//!    once per traversal.
//!
//! 4. Every entry point validates all of its input before building anything.

mod cascade;
mod error;
mod node;
mod propagate;
mod resolve;

pub use cascade::{Cascade, ConstructionArg, States};
pub use error::{BoxError, CascadeError, CascadeResult};
pub use node::{Cleaner, Initial, NodeKey, NodeRecord};
pub use resolve::{Action, Resolution};

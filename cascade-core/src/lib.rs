//! Cascade Core
//!
//! This crate tracks which pieces of application state are stale and brings
//! them back in sync, in dependency order, with no redundant work. It
//! implements:
//!
//! - A dependency graph of named state nodes with clean/dirty flags
//! - Forward dirty propagation
//! - Clean resolution: a deduplicated, dependencies-first list of cleaner
//!   callbacks, committed as a new snapshot
//! - A published cell for optimistic, compare-and-swap updates
//!
//! The crate is designed to be used both as a native Rust library and, with
//! the `python` feature, as a Python extension module via PyO3.
//!
//! # Architecture
//!
//! - `graph`: snapshots, construction, queries, propagation and resolution
//! - `cell`: the single mutable cell that publishes snapshots
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! use cascade_core::{CascadeCell, Cleaner};
//!
//! let renders = Arc::new(AtomicUsize::new(0));
//! let counter = renders.clone();
//!
//! let cell = CascadeCell::default();
//! cell.add("slider", None, true)?;
//! cell.add("transform", Some(Cleaner::new(|| {})), ["slider"])?;
//! cell.add(
//!     "render",
//!     Some(Cleaner::new(move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     })),
//!     ["transform"],
//! )?;
//!
//! // Slider dragged: transform and render are now stale.
//! cell.dirty(["slider"])?;
//! cell.clean(&"render")?;
//!
//! assert_eq!(renders.load(Ordering::SeqCst), 1);
//! assert!(cell.load().is_clean(&"render")?);
//! # Ok::<(), cascade_core::CascadeError<&str>>(())
//! ```

pub mod cell;
pub mod graph;

#[cfg(feature = "python")]
mod python;

pub use cell::{CascadeCell, CellConfig, Snapshot};
pub use graph::{
    Action, BoxError, Cascade, CascadeError, CascadeResult, Cleaner, ConstructionArg, Initial,
    NodeKey, NodeRecord, Resolution, States,
};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module definition.
///
/// This function is called by Python when importing the module.
/// It registers all Python-exposed types.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyCascade>()?;

    // Add version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}

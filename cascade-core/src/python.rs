//! Python Bindings
//!
//! Exposes a `Cascade` class backed by a [`CascadeCell`] keyed by strings.
//! Cleaners are arbitrary Python callables; an exception raised by one is
//! re-raised from `clean` unchanged and nothing is published.

use std::collections::HashMap;

use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyTuple};

use crate::cell::CascadeCell;
use crate::graph::{CascadeError, Cleaner, Initial};

/// Wrap a Python callable as a cleaner.
fn python_cleaner(callable: PyObject) -> Cleaner {
    Cleaner::fallible(move || Python::with_gil(|py| callable.call0(py).map(drop)))
}

/// Convert an engine error into the matching Python exception.
fn into_py_err(err: CascadeError<String>) -> PyErr {
    match err {
        CascadeError::Cleaner { source, .. } => match source.downcast::<PyErr>() {
            Ok(err) => *err,
            Err(other) => PyRuntimeError::new_err(other.to_string()),
        },
        err @ (CascadeError::UnknownNode { .. }
        | CascadeError::NoSuchNode { .. }
        | CascadeError::UnknownDependency { .. }) => PyKeyError::new_err(err.to_string()),
        err => PyValueError::new_err(err.to_string()),
    }
}

/// Python-exposed cascade.
#[pyclass(name = "Cascade")]
pub struct PyCascade {
    cell: CascadeCell<String>,
}

#[pymethods]
impl PyCascade {
    /// Create an empty cascade.
    #[new]
    fn new() -> Self {
        Self {
            cell: CascadeCell::default(),
        }
    }

    /// Add a node. `deps_or_state` is either a bool or a sequence of ids.
    #[pyo3(signature = (id, cleaner, deps_or_state))]
    fn add(
        &self,
        id: String,
        cleaner: Option<PyObject>,
        deps_or_state: &Bound<'_, PyAny>,
    ) -> PyResult<()> {
        let initial = match deps_or_state.downcast::<PyBool>() {
            Ok(state) => Initial::State(state.is_true()),
            Err(_) => Initial::Dependencies(deps_or_state.extract::<Vec<String>>()?),
        };
        self.cell
            .add(id, cleaner.map(python_cleaner), initial)
            .map(drop)
            .map_err(into_py_err)
    }

    /// Mark nodes and everything depending on them dirty.
    #[pyo3(signature = (*ids))]
    fn dirty(&self, ids: &Bound<'_, PyTuple>) -> PyResult<()> {
        let ids = ids.extract::<Vec<String>>()?;
        self.cell.dirty(ids).map(drop).map_err(into_py_err)
    }

    /// Clean a node, running the cleaners of it and its dirty dependencies.
    fn clean(&self, id: String) -> PyResult<()> {
        self.cell.clean(&id).map(drop).map_err(into_py_err)
    }

    /// Set every node to one state without running cleaners.
    fn set_all(&self, clean: bool) -> PyResult<()> {
        self.cell.set_all(clean).map(drop).map_err(into_py_err)
    }

    fn is_clean(&self, id: String) -> PyResult<bool> {
        self.cell.load().is_clean(&id).map_err(into_py_err)
    }

    fn states(&self) -> HashMap<String, bool> {
        self.cell.load().states().into_iter().collect()
    }

    fn node_ids(&self) -> Vec<String> {
        self.cell.load().node_ids().cloned().collect()
    }

    fn dependencies(&self, id: String) -> PyResult<Vec<String>> {
        let snapshot = self.cell.load();
        let found = snapshot.dependencies(&id).map_err(into_py_err)?;
        Ok(found.into_iter().collect())
    }

    fn dependants(&self, id: String) -> PyResult<Vec<String>> {
        let snapshot = self.cell.load();
        let found = snapshot.dependants(&id).map_err(into_py_err)?;
        Ok(found.into_iter().collect())
    }

    fn __len__(&self) -> usize {
        self.cell.load().len()
    }

    fn __repr__(&self) -> String {
        let snapshot = self.cell.load();
        let dirty = snapshot.states().values().filter(|clean| !**clean).count();
        format!(
            "Cascade(nodes={}, dirty={}, generation={})",
            snapshot.len(),
            dirty,
            snapshot.generation()
        )
    }
}

// python-bindings/src/lib.rs

//! Python bindings for the parameter averaging runtime.
//!
//! This module exposes the Rust averager to Python using PyO3.

use std::sync::Arc;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use averaging_core::group::registry;
use averaging_core::{AveragingError, SingleProcessGroup};

mod averager;

pub use averager::PyModelAverager;

/// Wrapper for AveragingError to enable conversion to PyErr.
///
/// This newtype pattern allows us to implement the conversion trait
/// since both AveragingError and PyErr are foreign types.
pub struct WrappedError(pub AveragingError);

impl From<AveragingError> for WrappedError {
    fn from(err: AveragingError) -> Self {
        WrappedError(err)
    }
}

impl From<WrappedError> for PyErr {
    fn from(err: WrappedError) -> PyErr {
        match &err.0 {
            AveragingError::Config { .. } => PyValueError::new_err(err.0.to_string()),
            AveragingError::Shape { .. } => PyValueError::new_err(err.0.to_string()),
            AveragingError::Communication { .. } => PyRuntimeError::new_err(err.0.to_string()),
            AveragingError::Registry { .. } => PyRuntimeError::new_err(err.0.to_string()),
        }
    }
}

/// Install the process-wide world group.
///
/// The bindings run inside a single Python process, so only a world of
/// size 1 can be created here; multi-rank groups must be installed from
/// Rust before the interpreter starts calling into this module.
#[pyfunction]
#[pyo3(signature = (world_size = 1))]
fn init_process_group(world_size: usize) -> PyResult<()> {
    if world_size != 1 {
        return Err(PyValueError::new_err(
            "only world_size=1 is supported from Python; install larger groups from Rust",
        ));
    }
    registry::init_world(Arc::new(SingleProcessGroup::new()))
        .map_err(|e| PyErr::from(WrappedError(e)))
}

/// Remove the process-wide world group, if any.
#[pyfunction]
fn destroy_process_group() {
    registry::shutdown_world();
}

/// Whether a world group is currently installed.
#[pyfunction]
fn is_initialized() -> bool {
    registry::is_initialized()
}

/// The main Python module for the parameter averaging runtime.
///
/// This module provides:
/// - `ModelAverager`: periodic parameter averaging over the world group
/// - `init_process_group` / `destroy_process_group`: world group lifecycle
#[pymodule]
fn _pma_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyModelAverager>()?;
    m.add_function(wrap_pyfunction!(init_process_group, m)?)?;
    m.add_function(wrap_pyfunction!(destroy_process_group, m)?)?;
    m.add_function(wrap_pyfunction!(is_initialized, m)?)?;
    Ok(())
}

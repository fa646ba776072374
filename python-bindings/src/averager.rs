//! Python wrapper for the periodic model averager.

use pyo3::prelude::*;

use averaging_core::{ParameterSet, PeriodicModelAverager, VectorModel};

use crate::WrappedError;

/// Periodic model averager exposed to Python.
///
/// Unlike the Rust API, where the training loop owns the model and lends
/// it to each averaging call, the binding owns a `VectorModel` built from
/// the parameter lists passed at construction; `parameters()` reads the
/// current (possibly averaged) values back out.
#[pyclass(name = "ModelAverager")]
pub struct PyModelAverager {
    averager: PeriodicModelAverager,
    model: VectorModel,
}

#[pymethods]
impl PyModelAverager {
    /// Create an averager over the world group.
    ///
    /// `parameters` is a list of parameter tensors, each a flat list of
    /// floats. Requires `init_process_group` to have been called.
    #[new]
    #[pyo3(signature = (parameters, period, warmup_steps = 0))]
    fn new(parameters: Vec<Vec<f32>>, period: u64, warmup_steps: u64) -> PyResult<Self> {
        let averager = PeriodicModelAverager::with_world(period, warmup_steps)
            .map_err(|e| PyErr::from(WrappedError(e)))?;

        Ok(Self {
            averager,
            model: VectorModel::new(parameters),
        })
    }

    /// Run one averaging step.
    ///
    /// Averages the parameters across the world group if the current step
    /// falls in the warm-up window or on a period boundary, then advances
    /// the step counter.
    fn average_parameters(&mut self) -> PyResult<()> {
        self.averager
            .average_parameters(&mut self.model)
            .map_err(|e| PyErr::from(WrappedError(e)))
    }

    /// Current values of all parameter tensors.
    fn parameters(&self) -> Vec<Vec<f32>> {
        self.model.tensors().to_vec()
    }

    /// Number of averaging calls made so far.
    #[getter]
    fn step(&self) -> u64 {
        self.averager.step()
    }

    #[getter]
    fn period(&self) -> u64 {
        self.averager.period()
    }

    #[getter]
    fn warmup_steps(&self) -> u64 {
        self.averager.warmup_steps()
    }

    fn __repr__(&self) -> String {
        format!(
            "ModelAverager(period={}, warmup_steps={}, step={}, num_elements={})",
            self.averager.period(),
            self.averager.warmup_steps(),
            self.averager.step(),
            self.model.num_elements(),
        )
    }
}

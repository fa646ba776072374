// averaging-core/src/lib.rs

//! Periodic Parameter Averaging - Core Library
//!
//! This crate provides periodic parameter averaging for distributed
//! data-parallel training: a step-gated policy object that, every `period`
//! optimizer steps (and on every step during a warm-up stage), averages a
//! model's parameters across a process group with one mean all-reduce.
//!
//! This can be used to run post-local SGD by attaching the averager to a
//! model whose gradients are already synchronized within subgroups; the
//! averager then provides the periodic inter-node synchronization.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use averaging_core::{PeriodicModelAverager, SingleProcessGroup, VectorModel};
//!
//! let group = Arc::new(SingleProcessGroup::new());
//! let mut model = VectorModel::new(vec![vec![0.0; 16]]);
//!
//! // In the first 100 steps, average on every step. Afterwards,
//! // average every 4 steps.
//! let mut averager = PeriodicModelAverager::new(4, 100, group).unwrap();
//!
//! for _step in 0..20 {
//!     // optimizer.step() ...
//!     averager.average_parameters(&mut model).unwrap();
//! }
//! ```

pub mod averager;
pub mod config;
pub mod error;
pub mod group;
pub mod model;

// Re-export commonly used types for convenience
pub use averager::{average_parameters, should_average, PeriodicModelAverager};
pub use config::AveragingConfig;
pub use error::{AveragingError, Result};
pub use group::{InProcessGroup, ProcessGroup, ReduceOp, SingleProcessGroup};
pub use model::{ParameterSet, VectorModel};

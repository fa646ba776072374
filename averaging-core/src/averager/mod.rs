//! Parameter averaging policy and primitives.
//!
//! [`average_parameters`] is the collective primitive: one mean-reduction
//! of a model's parameters across a process group. [`PeriodicModelAverager`]
//! is the stateful policy that decides, once per optimizer step, whether
//! to invoke it; the decision itself is the pure function
//! [`should_average`].

mod periodic;
mod utils;

pub use periodic::{should_average, PeriodicModelAverager};
pub use utils::{average_parameters, flatten_parameters, unflatten_parameters};

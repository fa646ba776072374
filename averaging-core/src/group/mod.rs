//! Process group abstraction for collective communication.
//!
//! A process group is the set of ranks that participate in a collective
//! reduction. The averager only needs one capability from it: an in-place,
//! synchronous all-reduce over a flat `f32` buffer. Implementations can
//! back this with any transport; this crate ships two single-process
//! implementations:
//!
//! - [`SingleProcessGroup`]: a world of one, where every collective is the
//!   identity. Used for non-distributed runs and unit tests.
//! - [`InProcessGroup`]: a multi-threaded group with barrier-synchronized
//!   reduction, for single-node tests that exercise real mean semantics.
//!
//! A process-wide default ("world") group can be installed through the
//! [`registry`] module; it must be initialized explicitly before use.

mod in_process;
mod local;
pub mod registry;

pub use in_process::InProcessGroup;
pub use local::SingleProcessGroup;

use crate::error::Result;

/// Reduction operator applied element-wise by `all_reduce`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Element-wise sum across ranks.
    Sum,
    /// Element-wise mean across ranks (sum divided by group size).
    Mean,
}

/// A handle to a group of cooperating ranks.
///
/// `all_reduce` is a blocking collective: it returns only after every rank
/// in the group has reached the corresponding call and the reduction is
/// complete. All ranks must issue collectives in the same relative order
/// and with buffers of equal length, or the collective will hang or reduce
/// mismatched data. That discipline is a caller obligation; the trait does
/// not enforce it.
///
/// # Object Safety
///
/// This trait is object-safe and can be used with `Arc<dyn ProcessGroup>`.
pub trait ProcessGroup: Send + Sync {
    /// This rank's index within the group, in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Reduces `data` in place across all ranks of the group.
    ///
    /// On success every rank holds the same reduced values, up to
    /// floating-point reduction order.
    ///
    /// # Errors
    ///
    /// Returns an error if the reduction fails. Failures are not retried
    /// here; a failed collective generally leaves ranks desynchronized,
    /// and the caller is expected to abort rather than continue.
    fn all_reduce(&self, data: &mut [f32], op: ReduceOp) -> Result<()>;
}

//! Degenerate single-rank process group.

use crate::error::Result;
use crate::group::{ProcessGroup, ReduceOp};

/// A process group containing only the local rank.
///
/// Every collective completes immediately and leaves the buffer unchanged:
/// the sum and the mean over one rank are both the identity. This is the
/// group to use for non-distributed runs, and for tests that exercise the
/// averaging schedule without caring about reduction semantics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcessGroup;

impl SingleProcessGroup {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessGroup for SingleProcessGroup {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce(&self, _data: &mut [f32], _op: ReduceOp) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_group_identity() {
        let group = SingleProcessGroup::new();
        let mut data = vec![1.0, -2.5, 0.0];

        group.all_reduce(&mut data, ReduceOp::Mean).unwrap();
        assert_eq!(data, vec![1.0, -2.5, 0.0]);

        group.all_reduce(&mut data, ReduceOp::Sum).unwrap();
        assert_eq!(data, vec![1.0, -2.5, 0.0]);
    }

    #[test]
    fn test_single_group_shape() {
        let group = SingleProcessGroup::new();
        assert_eq!(group.rank(), 0);
        assert_eq!(group.size(), 1);
    }
}

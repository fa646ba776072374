//! Multi-threaded in-process group with barrier-synchronized reduction.

use std::sync::{Arc, Barrier};

use parking_lot::Mutex;

use crate::error::{AveragingError, Result};
use crate::group::{ProcessGroup, ReduceOp};

/// State shared by all rank handles of one group.
struct Shared {
    world_size: usize,
    /// Accumulation buffer. Empty between reduction rounds.
    slot: Mutex<Vec<f32>>,
    /// All contributions are in once this barrier releases.
    arrive: Barrier,
    /// All ranks have copied the result out once this barrier releases.
    depart: Barrier,
    /// The accumulator has been cleared for the next round.
    reset: Barrier,
}

/// A process group whose ranks are threads of the current process.
///
/// `new_group(n)` returns one handle per rank; each participating thread
/// takes one handle and calls collectives through it. The reduction is a
/// real element-wise combine across the contributed buffers, synchronized
/// with barriers, so `all_reduce` blocks until every rank of the group has
/// reached the call — the same barrier semantics a network-backed group
/// would have.
///
/// All ranks must contribute buffers of equal length. A rank that
/// contributes a mismatched length gets a shape error, and the remaining
/// ranks block on the collective; as with any collective transport,
/// matched calls across ranks are a caller obligation.
pub struct InProcessGroup {
    rank: usize,
    shared: Arc<Shared>,
}

impl InProcessGroup {
    /// Creates a group of `world_size` ranks, returning one handle per rank.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `world_size` is zero.
    pub fn new_group(world_size: usize) -> Result<Vec<InProcessGroup>> {
        if world_size == 0 {
            return Err(AveragingError::config(
                "process group world_size must be at least 1",
            ));
        }

        let shared = Arc::new(Shared {
            world_size,
            slot: Mutex::new(Vec::new()),
            arrive: Barrier::new(world_size),
            depart: Barrier::new(world_size),
            reset: Barrier::new(world_size),
        });

        Ok((0..world_size)
            .map(|rank| InProcessGroup {
                rank,
                shared: shared.clone(),
            })
            .collect())
    }
}

impl std::fmt::Debug for InProcessGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessGroup")
            .field("rank", &self.rank)
            .field("size", &self.shared.world_size)
            .finish()
    }
}

impl ProcessGroup for InProcessGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.world_size
    }

    fn all_reduce(&self, data: &mut [f32], op: ReduceOp) -> Result<()> {
        // Contribute this rank's buffer. The first rank in seeds the
        // accumulator; later ranks add element-wise.
        {
            let mut slot = self.shared.slot.lock();
            if slot.is_empty() && !data.is_empty() {
                slot.extend_from_slice(data);
            } else {
                if slot.len() != data.len() {
                    return Err(AveragingError::shape(slot.len(), data.len()));
                }
                for (acc, x) in slot.iter_mut().zip(data.iter()) {
                    *acc += *x;
                }
            }
        }

        self.shared.arrive.wait();

        // Every contribution is in; copy the reduced values back out.
        {
            let slot = self.shared.slot.lock();
            let scale = match op {
                ReduceOp::Sum => 1.0,
                ReduceOp::Mean => 1.0 / self.shared.world_size as f32,
            };
            for (x, acc) in data.iter_mut().zip(slot.iter()) {
                *x = *acc * scale;
            }
        }

        let leader = self.shared.depart.wait();
        if leader.is_leader() {
            self.shared.slot.lock().clear();
        }
        self.shared.reset.wait();

        Ok(())
    }
}

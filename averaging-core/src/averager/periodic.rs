//! Step-gated periodic averaging.

use std::sync::Arc;

use crate::averager::utils::average_parameters;
use crate::config::AveragingConfig;
use crate::error::{AveragingError, Result};
use crate::group::{registry, ProcessGroup};
use crate::model::ParameterSet;

/// Decides whether a call at `step` should average.
///
/// True during the warm-up window (`step < warmup_steps`) and afterwards
/// whenever `step` is an exact multiple of `period`. Since `0 % period`
/// is zero, step 0 always averages, even with no warm-up at all.
///
/// The decision depends on nothing but its three arguments, so the
/// averaging schedule is fully deterministic given the configuration.
///
/// # Panics
///
/// Panics if `period` is zero. [`PeriodicModelAverager`] rejects such a
/// period at construction.
pub fn should_average(step: u64, warmup_steps: u64, period: u64) -> bool {
    step < warmup_steps || step % period == 0
}

/// Averages a model's parameters across a process group, periodically or
/// on every step during a warm-up stage.
///
/// Intended to be called exactly once per optimizer step, after the
/// optimizer update. During the first `warmup_steps` calls the parameters
/// are averaged every time; afterwards only every `period`-th call
/// performs the collective, so inter-node communication happens
/// periodically rather than per step. The model itself is not held by the
/// averager — the training loop passes it to each call, borrowing it
/// exclusively for the duration of the collective.
///
/// Every rank of the group must drive its averager with the same `period`
/// and `warmup_steps` and call it with matching cadence, or the underlying
/// collective will hang or mismatch data.
pub struct PeriodicModelAverager {
    period: u64,
    warmup_steps: u64,
    group: Arc<dyn ProcessGroup>,
    step: u64,
}

impl PeriodicModelAverager {
    /// Creates an averager over an explicitly provided group.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `period` is zero. A `period` of 1
    /// is accepted but logs an advisory: averaging every step duplicates
    /// the gradient synchronization the data-parallel wrapper already
    /// performs, so a plain data-parallel setup is the better choice.
    pub fn new(period: u64, warmup_steps: u64, group: Arc<dyn ProcessGroup>) -> Result<Self> {
        if period < 1 {
            return Err(AveragingError::config("period must be a positive value"));
        }
        if period == 1 {
            tracing::warn!(
                "period of 1 averages parameters on every step; gradient synchronization \
                 in the data-parallel wrapper already provides this, so the all-reduce \
                 cost here buys nothing"
            );
        }

        Ok(Self {
            period,
            warmup_steps,
            group,
            step: 0,
        })
    }

    /// Creates an averager over the process-wide world group.
    ///
    /// # Errors
    ///
    /// Returns a registry error if no world group has been installed via
    /// [`registry::init_world`], in addition to the errors of [`Self::new`].
    pub fn with_world(period: u64, warmup_steps: u64) -> Result<Self> {
        Self::new(period, warmup_steps, registry::world()?)
    }

    /// Creates an averager from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` fails validation.
    pub fn from_config(config: &AveragingConfig, group: Arc<dyn ProcessGroup>) -> Result<Self> {
        config.validate()?;
        Self::new(config.averaging.period, config.averaging.warmup_steps, group)
    }

    /// Runs one averaging step.
    ///
    /// Averages `model`'s parameters across the group if the current step
    /// falls in the warm-up window or on a period boundary, then advances
    /// the step counter. The counter advances on skipped steps too; it
    /// counts calls, not collectives.
    ///
    /// # Errors
    ///
    /// Communication failures propagate unmodified and abort the step
    /// before the counter advances; there is no retry or local recovery.
    /// Silent continuation after a desynchronized collective would corrupt
    /// model state across ranks.
    pub fn average_parameters(&mut self, model: &mut dyn ParameterSet) -> Result<()> {
        if should_average(self.step, self.warmup_steps, self.period) {
            tracing::debug!(step = self.step, "averaging parameters across group");
            average_parameters(model, self.group.as_ref())?;
        } else {
            tracing::trace!(step = self.step, "skipping averaging this step");
        }
        self.step += 1;
        Ok(())
    }

    /// Number of averaging calls made so far.
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn warmup_steps(&self) -> u64 {
        self.warmup_steps
    }
}

impl std::fmt::Debug for PeriodicModelAverager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicModelAverager")
            .field("period", &self.period)
            .field("warmup_steps", &self.warmup_steps)
            .field("group_size", &self.group.size())
            .field("step", &self.step)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AveragingError;
    use crate::group::ReduceOp;
    use crate::model::VectorModel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts collective invocations without reducing anything.
    #[derive(Default)]
    struct RecordingGroup {
        reduces: AtomicUsize,
    }

    impl RecordingGroup {
        fn count(&self) -> usize {
            self.reduces.load(Ordering::SeqCst)
        }
    }

    impl ProcessGroup for RecordingGroup {
        fn rank(&self) -> usize {
            0
        }

        fn size(&self) -> usize {
            1
        }

        fn all_reduce(&self, _data: &mut [f32], _op: ReduceOp) -> Result<()> {
            self.reduces.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Fails every collective, like a dropped transport would.
    struct FailingGroup;

    impl ProcessGroup for FailingGroup {
        fn rank(&self) -> usize {
            0
        }

        fn size(&self) -> usize {
            2
        }

        fn all_reduce(&self, _data: &mut [f32], _op: ReduceOp) -> Result<()> {
            Err(AveragingError::communication("peer rank unreachable"))
        }
    }

    fn drive(averager: &mut PeriodicModelAverager, calls: u64) {
        let mut model = VectorModel::new(vec![vec![1.0, 2.0]]);
        for _ in 0..calls {
            averager.average_parameters(&mut model).unwrap();
        }
    }

    #[test]
    fn test_zero_period_rejected() {
        let group = Arc::new(RecordingGroup::default());
        let result = PeriodicModelAverager::new(0, 0, group);
        assert!(matches!(result, Err(AveragingError::Config { .. })));
    }

    #[test]
    fn test_period_one_constructs() {
        // The period-1 advisory is a warning, not an error.
        let group = Arc::new(RecordingGroup::default());
        let averager = PeriodicModelAverager::new(1, 0, group).unwrap();
        assert_eq!(averager.period(), 1);
    }

    #[test]
    fn test_period_one_averages_every_step() {
        let group = Arc::new(RecordingGroup::default());
        let mut averager = PeriodicModelAverager::new(1, 0, group.clone()).unwrap();

        drive(&mut averager, 7);

        assert_eq!(group.count(), 7);
        assert_eq!(averager.step(), 7);
    }

    #[test]
    fn test_no_warmup_schedule() {
        // period = 4, no warm-up: steps 0 and 4 average, 1..=3 do not.
        let group = Arc::new(RecordingGroup::default());
        let mut averager = PeriodicModelAverager::new(4, 0, group.clone()).unwrap();
        let mut model = VectorModel::new(vec![vec![0.5]]);

        let expected_counts = [1, 1, 1, 1, 2];
        for expected in expected_counts {
            averager.average_parameters(&mut model).unwrap();
            assert_eq!(group.count(), expected);
        }
    }

    #[test]
    fn test_warmup_then_periodic_schedule() {
        // warmup = 100, period = 4: every call averages through step 99,
        // then only steps 100, 104, 108.
        let group = Arc::new(RecordingGroup::default());
        let mut averager = PeriodicModelAverager::new(4, 100, group.clone()).unwrap();

        drive(&mut averager, 110);

        let expected: usize = (0..110u64).filter(|&s| should_average(s, 100, 4)).count();
        assert_eq!(expected, 103);
        assert_eq!(group.count(), expected);
    }

    #[test]
    fn test_step_counts_calls_not_collectives() {
        let group = Arc::new(RecordingGroup::default());
        let mut averager = PeriodicModelAverager::new(10, 0, group.clone()).unwrap();

        drive(&mut averager, 25);

        assert_eq!(averager.step(), 25);
        // Steps 0, 10, 20 fired.
        assert_eq!(group.count(), 3);
    }

    #[test]
    fn test_should_average_table() {
        // Warm-up window.
        assert!(should_average(0, 100, 4));
        assert!(should_average(99, 100, 4));
        // Period boundary after warm-up.
        assert!(should_average(100, 100, 4));
        assert!(should_average(104, 100, 4));
        assert!(!should_average(101, 100, 4));
        assert!(!should_average(103, 100, 4));
        // Step 0 fires even without warm-up.
        assert!(should_average(0, 0, 4));
        assert!(!should_average(3, 0, 4));
        assert!(should_average(4, 0, 4));
        // Period 1 fires always.
        assert!(should_average(17, 0, 1));
    }

    #[test]
    fn test_communication_failure_propagates() {
        let mut averager = PeriodicModelAverager::new(4, 0, Arc::new(FailingGroup)).unwrap();
        let mut model = VectorModel::new(vec![vec![1.0]]);

        // Step 0 averages, so the failure surfaces on the first call and
        // the counter does not advance past the failed step.
        let result = averager.average_parameters(&mut model);
        assert!(matches!(result, Err(AveragingError::Communication { .. })));
        assert_eq!(averager.step(), 0);
    }

    #[test]
    fn test_skipped_step_ignores_broken_group() {
        /// Succeeds on the first collective, fails on every later one.
        struct FailsAfterFirst {
            used: AtomicUsize,
        }

        impl ProcessGroup for FailsAfterFirst {
            fn rank(&self) -> usize {
                0
            }

            fn size(&self) -> usize {
                2
            }

            fn all_reduce(&self, _data: &mut [f32], _op: ReduceOp) -> Result<()> {
                if self.used.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(())
                } else {
                    Err(AveragingError::communication("peer rank unreachable"))
                }
            }
        }

        let group = Arc::new(FailsAfterFirst {
            used: AtomicUsize::new(0),
        });
        let mut averager = PeriodicModelAverager::new(4, 0, group).unwrap();
        let mut model = VectorModel::new(vec![vec![1.0]]);

        // Step 0 averages and succeeds; steps 1..=3 skip the collective
        // entirely, so the dead transport is never touched.
        for _ in 0..4 {
            averager.average_parameters(&mut model).unwrap();
        }
        assert_eq!(averager.step(), 4);

        // Step 4 is a period boundary and surfaces the failure.
        let result = averager.average_parameters(&mut model);
        assert!(matches!(result, Err(AveragingError::Communication { .. })));
        assert_eq!(averager.step(), 4);
    }

    #[test]
    fn test_from_config() {
        let config: AveragingConfig = r#"
            [averaging]
            period = 8
            warmup_steps = 2
        "#
        .parse()
        .unwrap();

        let group = Arc::new(RecordingGroup::default());
        let mut averager = PeriodicModelAverager::from_config(&config, group.clone()).unwrap();
        assert_eq!(averager.period(), 8);
        assert_eq!(averager.warmup_steps(), 2);

        drive(&mut averager, 3);
        // Steps 0 and 1 are warm-up, step 2 is off-period.
        assert_eq!(group.count(), 2);
    }

    #[test]
    fn test_averaged_values_match_group_mean() {
        use crate::group::InProcessGroup;
        use std::thread;

        let handles = InProcessGroup::new_group(2).unwrap();

        let joins: Vec<_> = handles
            .into_iter()
            .map(|group| {
                thread::spawn(move || {
                    let r = group.rank() as f32;
                    let mut model = VectorModel::new(vec![vec![2.0 * r, 4.0 * r]]);
                    let mut averager =
                        PeriodicModelAverager::new(2, 0, Arc::new(group)).unwrap();

                    // Step 0 averages; step 1 does not, so models may only
                    // diverge again through local updates (none here).
                    averager.average_parameters(&mut model).unwrap();
                    averager.average_parameters(&mut model).unwrap();
                    model
                })
            })
            .collect();

        for join in joins {
            let model = join.join().unwrap();
            assert_eq!(model.tensors(), &[vec![1.0, 2.0]]);
        }
    }
}

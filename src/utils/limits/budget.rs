// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/*
ExecutionBudget tracks the work a single run is allowed to perform. Steps are
counted for every executed statement and loop iteration. Call depth is
tracked by the interpreter entering and leaving script functions.

Wall-clock checks are amortized: the clock is only consulted once every
`check_interval` steps. Callers pass the current monotonic Duration so that
the budget never reads a clock itself, which keeps it deterministic under
test.
*/

use core::num::NonZeroU32;
use core::time::Duration;

use super::LimitError;

/// Ceilings applied to one execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitConfig {
    pub max_steps: Option<u64>,
    pub max_call_depth: usize,
    pub time_limit: Option<Duration>,
    /// Number of steps between wall-clock checks.
    pub check_interval: NonZeroU32,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            // Each script call costs several interpreter frames; 64 fits in a
            // 2 MiB thread stack in unoptimized builds.
            max_call_depth: 64,
            time_limit: None,
            check_interval: NonZeroU32::MIN.saturating_add(255),
        }
    }
}

#[derive(Debug)]
pub struct ExecutionBudget {
    config: LimitConfig,
    steps: u64,
    depth: usize,
    start: Duration,
    accumulated: u32,
}

impl ExecutionBudget {
    pub fn new(config: LimitConfig, now: Duration) -> Self {
        Self {
            config,
            steps: 0,
            depth: 0,
            start: now,
            accumulated: 0,
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Accounts for one unit of work.
    pub fn step(&mut self, now: impl FnOnce() -> Duration) -> Result<(), LimitError> {
        self.steps = self.steps.saturating_add(1);
        if let Some(limit) = self.config.max_steps {
            if self.steps > limit {
                return Err(LimitError::StepLimitExceeded { limit });
            }
        }

        let Some(limit) = self.config.time_limit else {
            return Ok(());
        };
        self.accumulated += 1;
        if self.accumulated < self.config.check_interval.get() {
            return Ok(());
        }
        self.accumulated = 0;

        let elapsed = now().saturating_sub(self.start);
        if elapsed > limit {
            return Err(LimitError::TimeLimitExceeded { elapsed, limit });
        }
        Ok(())
    }

    pub fn enter_call(&mut self) -> Result<(), LimitError> {
        if self.depth >= self.config.max_call_depth {
            return Err(LimitError::CallDepthExceeded {
                limit: self.config.max_call_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave_call(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(value: u32) -> NonZeroU32 {
        NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
    }

    #[test]
    fn step_limit_is_enforced() {
        let mut budget = ExecutionBudget::new(
            LimitConfig {
                max_steps: Some(3),
                ..LimitConfig::default()
            },
            Duration::ZERO,
        );
        for _ in 0..3 {
            assert_eq!(budget.step(|| Duration::ZERO), Ok(()));
        }
        assert_eq!(
            budget.step(|| Duration::ZERO),
            Err(LimitError::StepLimitExceeded { limit: 3 })
        );
    }

    #[test]
    fn clock_is_checked_once_per_interval() {
        let mut budget = ExecutionBudget::new(
            LimitConfig {
                time_limit: Some(Duration::from_millis(30)),
                check_interval: nz(4),
                ..LimitConfig::default()
            },
            Duration::ZERO,
        );
        let mut reads = 0;
        for _ in 0..3 {
            let result = budget.step(|| {
                reads += 1;
                Duration::from_millis(100)
            });
            assert_eq!(result, Ok(()));
        }
        assert_eq!(reads, 0);

        let result = budget.step(|| Duration::from_millis(100));
        assert!(matches!(result, Err(LimitError::TimeLimitExceeded { .. })));
    }

    #[test]
    fn call_depth_is_enforced() {
        let mut budget = ExecutionBudget::new(
            LimitConfig {
                max_call_depth: 2,
                ..LimitConfig::default()
            },
            Duration::ZERO,
        );
        assert_eq!(budget.enter_call(), Ok(()));
        assert_eq!(budget.enter_call(), Ok(()));
        assert_eq!(
            budget.enter_call(),
            Err(LimitError::CallDepthExceeded { limit: 2 })
        );
        budget.leave_call();
        assert_eq!(budget.enter_call(), Ok(()));
        assert_eq!(
            budget.enter_call(),
            Err(LimitError::CallDepthExceeded { limit: 2 })
        );
    }
}

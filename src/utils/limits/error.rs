// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;
use core::time::Duration;

/// Errors reported when an execution ceiling is reached.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum LimitError {
    /// More statements and loop iterations were executed than allowed.
    StepLimitExceeded {
        /// Configured step ceiling.
        limit: u64,
    },
    /// Script function calls nested deeper than allowed.
    CallDepthExceeded {
        /// Configured depth ceiling.
        limit: usize,
    },
    /// Reported when a periodic check observes elapsed time beyond the limit.
    TimeLimitExceeded {
        /// Elapsed duration when the threshold was exceeded.
        elapsed: Duration,
        /// Configured time limit.
        limit: Duration,
    },
}

impl fmt::Debug for LimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepLimitExceeded { limit } => f
                .debug_struct("StepLimitExceeded")
                .field("limit", limit)
                .finish(),
            Self::CallDepthExceeded { limit } => f
                .debug_struct("CallDepthExceeded")
                .field("limit", limit)
                .finish(),
            Self::TimeLimitExceeded { elapsed, limit } => f
                .debug_struct("TimeLimitExceeded")
                .field("elapsed", elapsed)
                .field("limit", limit)
                .finish(),
        }
    }
}

impl fmt::Display for LimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepLimitExceeded { limit } => {
                write!(f, "execution exceeded step limit (limit={limit})")
            }
            Self::CallDepthExceeded { limit } => {
                write!(f, "execution exceeded call depth limit (limit={limit})")
            }
            Self::TimeLimitExceeded { elapsed, limit } => write!(
                f,
                "execution exceeded time limit (elapsed={}ms, limit={}ms)",
                elapsed.as_millis(),
                limit.as_millis()
            ),
        }
    }
}

impl core::error::Error for LimitError {}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::utils::limits::LimitError;

use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source file could not be read.
    Io,
    /// The translated text failed to lex, parse or resolve.
    Compile,
    /// The program faulted while executing.
    Runtime,
}

/// Failure of [`Executor::run`](crate::Executor::run) and friends.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to read {}. {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0}")]
    Compile(anyhow::Error),
    #[error("{0}")]
    Runtime(anyhow::Error),
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::Io { .. } => ErrorKind::Io,
            RunError::Compile(_) => ErrorKind::Compile,
            RunError::Runtime(_) => ErrorKind::Runtime,
        }
    }

    /// The limit that stopped execution, if that is why the run failed.
    pub fn limit(&self) -> Option<&LimitError> {
        match self {
            RunError::Runtime(e) => e.downcast_ref::<LimitError>(),
            _ => None,
        }
    }
}

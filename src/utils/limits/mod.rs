// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cooperative execution limits enforced by the interpreter.

mod budget;
mod error;

pub use budget::{ExecutionBudget, LimitConfig};
pub use error::LimitError;

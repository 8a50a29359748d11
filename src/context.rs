// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::capabilities::Capabilities;
use crate::utils::limits::{ExecutionBudget, LimitConfig};
use crate::value::Value;

use std::time::{Duration, Instant};

use anyhow::{bail, Result};

/// State owned by exactly one execution: the capability set, the export
/// object and the work budget. A context is created per run and consumed
/// when the run finishes.
#[derive(Debug)]
pub struct ExecutionContext {
    capabilities: Capabilities,
    exports: Value,
    budget: ExecutionBudget,
    started: Instant,
    // Time spent waiting for input, excluded from the time limit.
    blocked: Duration,
}

impl ExecutionContext {
    pub fn new(capabilities: Capabilities, limits: LimitConfig) -> Self {
        Self {
            capabilities,
            exports: Value::new_object(),
            budget: ExecutionBudget::new(limits, Duration::ZERO),
            started: Instant::now(),
            blocked: Duration::ZERO,
        }
    }

    pub fn output(&mut self, value: &Value) -> Result<()> {
        self.capabilities.output.write(value)
    }

    pub fn input(&mut self, prompt: &str) -> Result<String> {
        let waiting = Instant::now();
        let line = self.capabilities.input.read(prompt);
        self.blocked += waiting.elapsed();
        line
    }

    pub fn exports(&self) -> &Value {
        &self.exports
    }

    pub fn exports_mut(&mut self) -> &mut Value {
        &mut self.exports
    }

    pub fn set_exports(&mut self, value: Value) -> Result<()> {
        if !matches!(value, Value::Object(_)) {
            bail!("exports must be an object. Got {}", value.type_name());
        }
        self.exports = value;
        Ok(())
    }

    pub fn into_exports(self) -> Value {
        self.exports
    }

    pub fn steps(&self) -> u64 {
        self.budget.steps()
    }

    pub fn step(&mut self) -> Result<()> {
        let (started, blocked) = (self.started, self.blocked);
        self.budget
            .step(|| started.elapsed().saturating_sub(blocked))?;
        Ok(())
    }

    pub fn enter_call(&mut self) -> Result<()> {
        self.budget.enter_call()?;
        Ok(())
    }

    pub fn leave_call(&mut self) {
        self.budget.leave_call()
    }
}

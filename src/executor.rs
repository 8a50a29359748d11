// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::capabilities::Capabilities;
use crate::compiler;
use crate::config::ExecutorConfig;
use crate::context::ExecutionContext;
use crate::error::RunError;
use crate::interpreter::Interpreter;
use crate::lexer::Source;
use crate::translator::Translator;
use crate::value::Value;

use std::path::Path;

use log::{debug, error, info};

/// Receives every failed run exactly once, before the error is returned to
/// the caller.
pub trait ErrorReporter {
    fn report(&self, error: &RunError);
}

/// Reports failures through `log::error!`.
#[derive(Debug, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, error: &RunError) {
        error!("Error: {error}");
    }
}

/// Runs King Python programs.
///
/// Each run translates the source, builds a fresh [`ExecutionContext`],
/// compiles the translated text against it and executes it. Nothing survives
/// from one run to the next, so an executor can be reused freely.
///
/// ```no_run
/// # use kingpy::*;
/// # fn main() -> anyhow::Result<()> {
/// let executor = Executor::new();
/// let exports = executor.run("exports.answer = 6 * 7;")?;
/// assert_eq!(exports["answer"], Value::from(42i64));
/// # Ok(())
/// # }
/// ```
pub struct Executor {
    translator: Translator,
    config: ExecutorConfig,
    reporter: Box<dyn ErrorReporter>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Executor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::default())
    }

    pub fn with_config(config: ExecutorConfig) -> Self {
        Self {
            translator: Translator::new(),
            config,
            reporter: Box::new(LogReporter),
        }
    }

    /// Replaces the hook that observes failures.
    pub fn with_reporter(mut self, reporter: Box<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Runs dialect text against standard output and standard input and
    /// returns the program's exports.
    pub fn run(&self, source: &str) -> Result<Value, RunError> {
        self.run_with(source, Capabilities::standard())
    }

    /// Runs dialect text with the given capabilities.
    pub fn run_with(&self, source: &str, capabilities: Capabilities) -> Result<Value, RunError> {
        let result = Source::from_contents("<source>".to_string(), source.to_string())
            .map_err(RunError::Compile)
            .and_then(|source| self.execute(&source, capabilities));
        self.finish(result)
    }

    /// Reads and runs a dialect file with standard output and input.
    pub fn run_file<P: AsRef<Path>>(&self, path: P) -> Result<Value, RunError> {
        self.run_file_with(path, Capabilities::standard())
    }

    pub fn run_file_with<P: AsRef<Path>>(
        &self,
        path: P,
        capabilities: Capabilities,
    ) -> Result<Value, RunError> {
        let path = path.as_ref();
        let result = match std::fs::read_to_string(path) {
            Ok(contents) => Source::from_contents(path.display().to_string(), contents)
                .map_err(RunError::Compile)
                .and_then(|source| self.execute(&source, capabilities)),
            Err(source) => Err(RunError::Io {
                path: path.to_path_buf(),
                source,
            }),
        };
        self.finish(result)
    }

    fn finish(&self, result: Result<Value, RunError>) -> Result<Value, RunError> {
        if let Err(e) = &result {
            self.reporter.report(e);
        }
        result
    }

    fn execute(&self, dialect: &Source, capabilities: Capabilities) -> Result<Value, RunError> {
        let target = self.translator.translate(dialect);
        if self.config.log_translation {
            info!("translated {}:\n{target}", dialect.file());
        } else {
            debug!("translated {}:\n{target}", dialect.file());
        }

        let mut ctx = ExecutionContext::new(capabilities, self.config.limits());

        let source = Source::from_contents(dialect.file().clone(), target)
            .map_err(RunError::Compile)?;
        let program = compiler::compile(&source).map_err(RunError::Compile)?;

        Interpreter::new(&program, &mut ctx)
            .run()
            .map_err(RunError::Runtime)?;

        Ok(ctx.into_exports())
    }
}

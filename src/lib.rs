// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod ast;
mod builtins;
mod capabilities;
mod compiler;
mod config;
mod context;
mod error;
mod executor;
mod interpreter;
mod lexer;
mod number;
mod parser;
mod program;
mod translator;
mod utils;
mod value;

pub use capabilities::{
    Capabilities, CapturedOutput, InputSource, OutputSink, ScriptedInput, StdInput, StdOutput,
};
pub use config::ExecutorConfig;
pub use error::{ErrorKind, RunError};
pub use executor::{ErrorReporter, Executor, LogReporter};
pub use number::Number;
pub use translator::{translate, Translator, HOST_ALIAS, PRELUDE};
pub use utils::limits::LimitError;
pub use value::Value;

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::ast::*;
    pub use crate::compiler::{compile, Compiler};
    pub use crate::lexer::*;
    pub use crate::parser::*;
    pub use crate::program::Program;
}

#[cfg(test)]
mod tests;

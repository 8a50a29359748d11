// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The capability set handed to a running program.
//!
//! A program can only reach the outside world through these two seams.
//! Hosts embedding the executor supply their own implementations; the
//! defaults talk to the process's standard streams.

use crate::value::Value;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use anyhow::{bail, Result};

/// Destination of `output(value)`.
pub trait OutputSink {
    fn write(&mut self, value: &Value) -> Result<()>;
}

/// Source of `input(prompt)`.
pub trait InputSource {
    fn read(&mut self, prompt: &str) -> Result<String>;
}

/// Writes each value's display form on its own line of standard output.
#[derive(Debug, Default)]
pub struct StdOutput;

impl OutputSink for StdOutput {
    fn write(&mut self, value: &Value) -> Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", value.to_display_string())?;
        out.flush()?;
        Ok(())
    }
}

/// Prints the prompt and reads one line of standard input.
#[derive(Debug, Default)]
pub struct StdInput;

impl InputSource for StdInput {
    fn read(&mut self, prompt: &str) -> Result<String> {
        {
            let mut out = io::stdout().lock();
            write!(out, "{prompt}")?;
            out.flush()?;
        }
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            bail!("end of input while reading `{prompt}`");
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(line)
    }
}

/// Records every output value. Clones share the same record, so a host can
/// keep one handle while the executor consumes the other.
#[derive(Debug, Default, Clone)]
pub struct CapturedOutput {
    values: Rc<RefCell<Vec<Value>>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> Vec<Value> {
        self.values.borrow().clone()
    }

    /// Display forms of the recorded values, one per line.
    pub fn lines(&self) -> Vec<String> {
        self.values
            .borrow()
            .iter()
            .map(Value::to_display_string)
            .collect()
    }
}

impl OutputSink for CapturedOutput {
    fn write(&mut self, value: &Value) -> Result<()> {
        self.values.borrow_mut().push(value.clone());
        Ok(())
    }
}

/// Answers prompts from a fixed list. Running out of answers is an error.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    answers: VecDeque<String>,
    prompts: Rc<RefCell<Vec<String>>>,
}

impl ScriptedInput {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Rc::default(),
        }
    }

    /// Prompts seen so far, shared between clones.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl InputSource for ScriptedInput {
    fn read(&mut self, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        match self.answers.pop_front() {
            Some(answer) => Ok(answer),
            None => bail!("no input available for prompt `{prompt}`"),
        }
    }
}

/// Everything a program may touch besides its own bindings.
pub struct Capabilities {
    pub output: Box<dyn OutputSink>,
    pub input: Box<dyn InputSource>,
}

impl Capabilities {
    pub fn new(output: impl OutputSink + 'static, input: impl InputSource + 'static) -> Self {
        Self {
            output: Box::new(output),
            input: Box::new(input),
        }
    }

    /// Standard output and standard input.
    pub fn standard() -> Self {
        Self::new(StdOutput, StdInput)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::standard()
    }
}

impl core::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captured_output_is_shared_between_clones() -> Result<()> {
        let captured = CapturedOutput::new();
        let mut sink = captured.clone();
        sink.write(&Value::from("hello"))?;
        sink.write(&Value::from(3i64))?;
        assert_eq!(captured.lines(), vec!["hello".to_string(), "3".to_string()]);
        Ok(())
    }

    #[test]
    fn scripted_input_runs_out() -> Result<()> {
        let mut input = ScriptedInput::new(["Ada"]);
        let observer = input.clone();
        assert_eq!(input.read("name? ")?, "Ada");
        assert!(input.read("again? ").is_err());
        assert_eq!(observer.prompts(), vec!["name? ", "again? "]);
        Ok(())
    }
}

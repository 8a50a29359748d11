// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]

use std::cell::RefCell;
use std::env;
use std::rc::Rc;
use std::time::Duration;

use crate::*;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

#[derive(Serialize, Deserialize, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
enum WantKind {
    Compile,
    Runtime,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct TestCase {
    note: String,
    source: String,
    #[serde(default)]
    inputs: Vec<String>,
    #[serde(default)]
    config: Option<ExecutorConfig>,
    want_exports: Option<Value>,
    want_output: Option<Vec<String>>,
    error: Option<String>,
    error_kind: Option<WantKind>,
    skip: Option<bool>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

// Counts reports so that tests can check each failure is reported once.
#[derive(Clone, Default)]
struct CountingReporter {
    reports: Rc<RefCell<Vec<String>>>,
}

impl ErrorReporter for CountingReporter {
    fn report(&self, error: &RunError) {
        self.reports.borrow_mut().push(error.to_string());
    }
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    println!("running {file}");

    for case in test.cases {
        print!("case {} ", case.note);
        if case.skip == Some(true) {
            println!("skipped");
            continue;
        }

        match (&case.want_exports, &case.error) {
            (Some(_), None) | (None, Some(_)) => (),
            _ => panic!("either want_exports or error must be specified in test case."),
        }

        let reporter = CountingReporter::default();
        let executor = Executor::with_config(case.config.clone().unwrap_or_default())
            .with_reporter(Box::new(reporter.clone()));
        let output = CapturedOutput::new();
        let capabilities = Capabilities::new(
            output.clone(),
            ScriptedInput::new(case.inputs.iter().cloned()),
        );

        match executor.run_with(&case.source, capabilities) {
            Ok(exports) => {
                assert!(reporter.reports.borrow().is_empty());
                match &case.want_exports {
                    Some(want) => assert_eq!(
                        &exports,
                        want,
                        "exports mismatch\n{}",
                        translate(&case.source)
                    ),
                    None => bail!("run succeeded and did not produce any errors"),
                }
                if let Some(want_output) = &case.want_output {
                    assert_eq!(&output.lines(), want_output);
                }
            }
            Err(actual) => {
                assert_eq!(
                    reporter.reports.borrow().len(),
                    1,
                    "failure must be reported exactly once"
                );
                let Some(expected) = &case.error else {
                    bail!("{actual}\n{}", translate(&case.source));
                };
                let message = actual.to_string();
                if !message.contains(expected) {
                    bail!("Error message\n`{message}\n`\ndoes not contain `{expected}`");
                }
                match case.error_kind {
                    Some(WantKind::Compile) => assert_eq!(actual.kind(), ErrorKind::Compile),
                    Some(WantKind::Runtime) => assert_eq!(actual.kind(), ErrorKind::Runtime),
                    None => (),
                }
                if let Some(want_output) = &case.want_output {
                    assert_eq!(&output.lines(), want_output);
                }
            }
        }

        println!("passed");
    }

    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{e}");
        }
    }
}

#[test]
#[ignore = "intended for running a single yaml file"]
fn one_yaml() -> Result<()> {
    env_logger::init();
    let mut file = String::default();

    for a in env::args() {
        if a.ends_with(".yaml") {
            file = a;
        }
    }

    if file.is_empty() {
        bail!("missing <yaml-file>");
    }

    yaml_test(file.as_str())
}

#[test_resources("tests/executor/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn executions_are_isolated() -> Result<()> {
    let executor = Executor::new();
    let source = "exports.seen = exports.n;\nexports.n = 1;\nn = 2;\n";
    let want = Value::from_json_str(r#"{"n": 1, "seen": null}"#)?;
    for _ in 0..2 {
        let exports =
            executor.run_with(source, Capabilities::new(CapturedOutput::new(), StdInput))?;
        assert_eq!(exports, want);
    }

    let other = executor.run_with(
        "exports.other = true;",
        Capabilities::new(CapturedOutput::new(), StdInput),
    )?;
    assert_eq!(other["n"], Value::Null);
    assert_eq!(other["other"], Value::from(true));
    Ok(())
}

// Answers every prompt after sleeping, standing in for a slow user.
struct SlowInput(Duration);

impl InputSource for SlowInput {
    fn read(&mut self, _prompt: &str) -> Result<String> {
        std::thread::sleep(self.0);
        Ok("ok".to_string())
    }
}

#[test]
fn time_waiting_for_input_is_not_counted() -> Result<()> {
    let config = ExecutorConfig {
        time_limit_ms: Some(100),
        ..ExecutorConfig::default()
    };
    let executor = Executor::with_config(config).with_reporter(Box::new(CountingReporter::default()));
    let exports = executor.run_with(
        "ask \"wait\";\ni = 0;\nwhile(i < 2000):\n    i = i + 1;\nexports.i = i;\n",
        Capabilities::new(CapturedOutput::new(), SlowInput(Duration::from_millis(200))),
    )?;
    assert_eq!(exports["i"], Value::from(2000i64));
    Ok(())
}

#[test]
fn busy_loop_hits_the_time_limit() {
    let config = ExecutorConfig {
        time_limit_ms: Some(20),
        ..ExecutorConfig::default()
    };
    let executor = Executor::with_config(config).with_reporter(Box::new(CountingReporter::default()));
    let result = executor.run_with(
        "while(true):\n    x = 1;\n",
        Capabilities::new(CapturedOutput::new(), StdInput),
    );
    let Err(e) = result else {
        panic!("infinite loop must hit the time limit");
    };
    assert!(matches!(
        e.limit(),
        Some(LimitError::TimeLimitExceeded { .. })
    ));
}

#[test]
fn step_limit_is_reported_as_limit_error() {
    let config = ExecutorConfig {
        max_steps: Some(50),
        ..ExecutorConfig::default()
    };
    let executor = Executor::with_config(config).with_reporter(Box::new(CountingReporter::default()));
    let result = executor.run_with(
        "while(true):\n    x = 1;\n",
        Capabilities::new(CapturedOutput::new(), ScriptedInput::new(Vec::<String>::new())),
    );
    let Err(e) = result else {
        panic!("infinite loop must hit the step limit");
    };
    assert_eq!(e.kind(), ErrorKind::Runtime);
    assert_eq!(e.limit(), Some(&LimitError::StepLimitExceeded { limit: 50 }));
}

#[test]
fn deep_recursion_is_stopped() {
    let config = ExecutorConfig {
        max_call_depth: 16,
        ..ExecutorConfig::default()
    };
    let executor = Executor::with_config(config).with_reporter(Box::new(CountingReporter::default()));
    let result = executor.run_with(
        "fun down(n):\n    return down(n + 1);\ndown(0);\n",
        Capabilities::new(CapturedOutput::new(), ScriptedInput::new(Vec::<String>::new())),
    );
    let Err(e) = result else {
        panic!("unbounded recursion must hit the call depth limit");
    };
    assert_eq!(e.limit(), Some(&LimitError::CallDepthExceeded { limit: 16 }));
}

#[test]
fn default_call_depth_fits_a_small_stack() {
    let source = "fun down(n):\n    if(n == 0):\n        return 0;\n    return down(n - 1) + 1;\n";
    let run = move |depth: i64| {
        let program = format!("{source}exports.depth = down({depth});\n");
        let executor = Executor::new().with_reporter(Box::new(CountingReporter::default()));
        executor
            .run_with(&program, Capabilities::new(CapturedOutput::new(), StdInput))
            // Values are not Send; report the export as text.
            .map(|exports| exports["depth"].to_string())
            .map_err(|e| e.limit().cloned())
    };

    let handle = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || (run(60), run(1000)))
        .unwrap();
    let (shallow, deep) = handle.join().unwrap();

    assert_eq!(shallow.unwrap(), "60");
    let limit = crate::utils::limits::LimitConfig::default().max_call_depth;
    assert_eq!(
        deep.unwrap_err(),
        Some(LimitError::CallDepthExceeded { limit })
    );
}

#[test]
fn missing_file_is_an_io_error() {
    let executor = Executor::new().with_reporter(Box::new(CountingReporter::default()));
    let Err(e) = executor.run_file("tests/executor/does-not-exist.kp") else {
        panic!("missing file must fail");
    };
    assert_eq!(e.kind(), ErrorKind::Io);
}

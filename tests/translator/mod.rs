// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use kingpy::unstable::*;
use kingpy::*;
use serde::{Deserialize, Serialize};
use std::env;
use test_generator::test_resources;

#[derive(Serialize, Deserialize, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
struct Case {
    pub note: String,
    pub source: String,
    /// Expected translation, without the prelude.
    pub want: Option<String>,
    #[serde(default)]
    pub contains: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Whether the translation is accepted by the compiler.
    pub compiles: Option<bool>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Test {
    cases: Vec<Case>,
}

fn strip_prelude(target: &str) -> Result<&str> {
    match target.strip_prefix(PRELUDE) {
        Some(rest) => Ok(rest.strip_prefix("\n\n").unwrap_or(rest)),
        None => bail!("translation does not start with `{PRELUDE}`:\n{target}"),
    }
}

fn check_case(case: &Case) -> Result<()> {
    let target = translate(&case.source);
    let body = strip_prelude(&target)?;

    if let Some(want) = &case.want {
        if body != want {
            bail!("translation mismatch.\nwant:\n{want}\ngot:\n{body}");
        }
    }
    for c in &case.contains {
        if !body.contains(c.as_str()) {
            bail!("translation\n{body}\ndoes not contain `{c}`");
        }
    }
    for e in &case.excludes {
        if body.contains(e.as_str()) {
            bail!("translation\n{body}\nunexpectedly contains `{e}`");
        }
    }

    let (opened, closed) = (target.matches('{').count(), target.matches('}').count());
    if opened != closed {
        bail!("unbalanced braces ({opened} opened, {closed} closed) in\n{target}");
    }

    if let Some(compiles) = case.compiles {
        let source = Source::from_contents("case.kp".to_string(), target.clone())?;
        match (compile(&source), compiles) {
            (Ok(_), true) | (Err(_), false) => (),
            (Ok(_), false) => bail!("translation compiled but a failure was expected"),
            (Err(e), true) => bail!("translation failed to compile. {e}"),
        }
    }

    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");

    let yaml = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml)?;

    for case in &test.cases {
        print!("case {} ", case.note);
        check_case(case)?;
        println!("passed");
    }

    println!("{} cases passed.", test.cases.len());
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/translator/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
#[ignore = "intended for translating a single file"]
fn one_file() -> Result<()> {
    env_logger::init();
    let Some(file) = env::args().find(|a| a.ends_with(".kp")) else {
        bail!("missing <file.kp>")
    };
    let contents = std::fs::read_to_string(&file)?;
    println!("{}", translate(&contents));
    Ok(())
}

#[test]
fn translator_is_reusable() {
    let translator = Translator::new();
    let first = translator.translate_str("x = 1;");
    let second = translator.translate_str("x = 1;");
    assert_eq!(first, second);
    assert!(first.ends_with("let x = 1;\n"));
}

#[test]
fn empty_source_is_just_the_prelude() -> Result<()> {
    let target = translate("");
    assert_eq!(strip_prelude(&target)?, "");
    Ok(())
}

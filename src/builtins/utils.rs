// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::Span;
use crate::number::Number;
use crate::value::Value;

use anyhow::{bail, Result};

pub fn ensure_args_count(span: &Span, fcn: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() != expected {
        if expected == 1 {
            bail!(span.error(format!("`{fcn}` expects 1 argument").as_str()))
        } else {
            bail!(span.error(format!("`{fcn}` expects {expected} arguments").as_str()))
        }
    }
    Ok(())
}

pub fn ensure_args_range(
    span: &Span,
    fcn: &str,
    args: &[Value],
    min: usize,
    max: usize,
) -> Result<()> {
    if args.len() < min || args.len() > max {
        bail!(span.error(
            format!("`{fcn}` expects between {min} and {max} arguments. Got {}", args.len())
                .as_str()
        ))
    }
    Ok(())
}

pub fn ensure_numeric(span: &Span, fcn: &str, v: &Value) -> Result<Number> {
    Ok(match &v {
        Value::Number(n) => *n,
        _ => {
            bail!(
                span.error(format!("`{fcn}` expects numeric argument. Got `{v}` instead").as_str())
            )
        }
    })
}

pub fn ensure_integer(span: &Span, fcn: &str, v: &Value) -> Result<i64> {
    match ensure_numeric(span, fcn, v)?.as_i64() {
        Some(i) => Ok(i),
        None => bail!(
            span.error(format!("`{fcn}` expects integer argument. Got `{v}` instead").as_str())
        ),
    }
}

pub fn ensure_array<'a>(span: &Span, fcn: &str, v: &'a Value) -> Result<&'a Vec<Value>> {
    match &v {
        Value::Array(a) => Ok(a),
        _ => bail!(span.error(format!("`{fcn}` expects array argument. Got `{v}` instead").as_str())),
    }
}

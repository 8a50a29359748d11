// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins;
use crate::builtins::utils::{ensure_args_count, ensure_array, ensure_numeric};
use crate::builtins::VARIADIC;
use crate::lexer::Span;
use crate::number::Number;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::{bail, Result};

pub fn register(m: &mut HashMap<&'static str, builtins::BuiltinFcn>) {
    m.insert("len", (len, 1));
    m.insert("max", (max, VARIADIC));
    m.insert("min", (min, VARIADIC));
    m.insert("sum", (sum, 1));
}

fn len(span: &Span, args: &[Value]) -> Result<Value> {
    ensure_args_count(span, "len", args, 1)?;

    Ok(Value::from(match &args[0] {
        Value::Array(a) => a.len(),
        Value::Object(a) => a.len(),
        Value::String(a) => a.chars().count(),
        a => {
            bail!(span.error(
                format!("`len` requires array/object/string argument. Got `{a}`.").as_str()
            ))
        }
    }))
}

// `min(a, b, ...)` compares its arguments; `min(array)` compares the elements.
fn candidates<'a>(span: &Span, fcn: &str, args: &'a [Value]) -> Result<&'a [Value]> {
    let items = match args {
        [] => bail!(span.error(format!("`{fcn}` expects at least 1 argument").as_str())),
        [Value::Array(a)] => a.as_slice(),
        _ => args,
    };
    if items.is_empty() {
        bail!(span.error(format!("`{fcn}` of an empty array").as_str()));
    }
    let numbers = items.iter().all(|v| matches!(v, Value::Number(_)));
    let strings = items.iter().all(|v| matches!(v, Value::String(_)));
    if !numbers && !strings {
        bail!(span.error(
            format!("`{fcn}` requires all numbers or all strings").as_str()
        ));
    }
    Ok(items)
}

fn max(span: &Span, args: &[Value]) -> Result<Value> {
    let items = candidates(span, "max", args)?;
    let mut best = &items[0];
    for v in &items[1..] {
        if v > best {
            best = v;
        }
    }
    Ok(best.clone())
}

fn min(span: &Span, args: &[Value]) -> Result<Value> {
    let items = candidates(span, "min", args)?;
    let mut best = &items[0];
    for v in &items[1..] {
        if v < best {
            best = v;
        }
    }
    Ok(best.clone())
}

fn sum(span: &Span, args: &[Value]) -> Result<Value> {
    ensure_args_count(span, "sum", args, 1)?;

    let mut total = Number::Int(0);
    for e in ensure_array(span, "sum", &args[0])?.iter() {
        total = total.add(&ensure_numeric(span, "sum", e)?);
    }
    let total = total.ensure_finite().map_err(|e| span.error(&e.to_string()))?;
    Ok(Value::from(total))
}

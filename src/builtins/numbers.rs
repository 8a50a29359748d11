// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins;
use crate::builtins::utils::{ensure_args_count, ensure_args_range, ensure_integer, ensure_numeric};
use crate::builtins::VARIADIC;
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::{bail, Result};

// Upper bound on the number of elements `range` will materialize.
const MAX_RANGE_LEN: i64 = 1 << 20;

pub fn register(m: &mut HashMap<&'static str, builtins::BuiltinFcn>) {
    m.insert("abs", (abs, 1));
    m.insert("range", (range, VARIADIC));
    m.insert("round", (round, 1));
}

fn abs(span: &Span, args: &[Value]) -> Result<Value> {
    ensure_args_count(span, "abs", args, 1)?;
    Ok(Value::from(ensure_numeric(span, "abs", &args[0])?.abs()))
}

fn round(span: &Span, args: &[Value]) -> Result<Value> {
    ensure_args_count(span, "round", args, 1)?;
    Ok(Value::from(ensure_numeric(span, "round", &args[0])?.round()))
}

// range(stop) or range(start, stop); stop is exclusive.
fn range(span: &Span, args: &[Value]) -> Result<Value> {
    ensure_args_range(span, "range", args, 1, 2)?;
    let (start, stop) = match args {
        [stop] => (0, ensure_integer(span, "range", stop)?),
        [start, stop] => (
            ensure_integer(span, "range", start)?,
            ensure_integer(span, "range", stop)?,
        ),
        _ => bail!(span.error("`range` expects 1 or 2 arguments")),
    };

    if stop.saturating_sub(start) > MAX_RANGE_LEN {
        bail!(span.error(format!("`range` exceeds {MAX_RANGE_LEN} elements").as_str()));
    }
    Ok(Value::from(
        (start..stop).map(Value::from).collect::<Vec<Value>>(),
    ))
}

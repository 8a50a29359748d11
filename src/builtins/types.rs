// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins;
use crate::builtins::utils::ensure_args_count;
use crate::lexer::Span;
use crate::number::Number;
use crate::value::Value;

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{bail, Result};

pub fn register(m: &mut HashMap<&'static str, builtins::BuiltinFcn>) {
    m.insert("bool", (to_bool, 1));
    m.insert("float", (to_float, 1));
    m.insert("int", (to_int, 1));
    m.insert("str", (to_str, 1));
    m.insert("type", (type_name, 1));
}

fn to_bool(span: &Span, args: &[Value]) -> Result<Value> {
    ensure_args_count(span, "bool", args, 1)?;
    Ok(Value::Bool(args[0].is_truthy()))
}

fn parse_number(span: &Span, fcn: &str, v: &Value) -> Result<Number> {
    match v {
        Value::Number(n) => Ok(*n),
        Value::Bool(b) => Ok(Number::Int(*b as i64)),
        Value::String(s) => match Number::from_str(s.trim()) {
            Ok(n) => Ok(n),
            Err(_) => bail!(span.error(format!("`{fcn}` cannot convert `{s}`").as_str())),
        },
        _ => bail!(span.error(format!("`{fcn}` cannot convert {}", v.type_name()).as_str())),
    }
}

fn to_int(span: &Span, args: &[Value]) -> Result<Value> {
    ensure_args_count(span, "int", args, 1)?;
    Ok(Value::from(parse_number(span, "int", &args[0])?.trunc()))
}

fn to_float(span: &Span, args: &[Value]) -> Result<Value> {
    ensure_args_count(span, "float", args, 1)?;
    Ok(Value::from(parse_number(span, "float", &args[0])?.to_float()))
}

fn to_str(span: &Span, args: &[Value]) -> Result<Value> {
    ensure_args_count(span, "str", args, 1)?;
    Ok(Value::from(args[0].to_display_string()))
}

fn type_name(span: &Span, args: &[Value]) -> Result<Value> {
    ensure_args_count(span, "type", args, 1)?;
    Ok(Value::from(args[0].type_name()))
}

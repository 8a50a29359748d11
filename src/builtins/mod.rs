// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Pure intrinsics available to every translated program. None of them
//! touch the execution context.

pub mod aggregates;
pub mod numbers;
pub mod types;
pub mod utils;

use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;
use lazy_static::lazy_static;

/// Builtins that accept any number of arguments use this arity.
pub const VARIADIC: u8 = u8::MAX;

pub type BuiltinFcn = (fn(&Span, &[Value]) -> Result<Value>, u8);

#[rustfmt::skip]
lazy_static! {
    pub static ref BUILTINS: HashMap<&'static str, BuiltinFcn> = {
	let mut m : HashMap<&'static str, BuiltinFcn>  = HashMap::new();

	aggregates::register(&mut m);
	numbers::register(&mut m);
	types::register(&mut m);

	m
    };
}

/// Looks up an intrinsic, returning its interned name alongside it.
pub fn lookup(name: &str) -> Option<(&'static str, &'static BuiltinFcn)> {
    BUILTINS.get_key_value(name).map(|(k, v)| (*k, v))
}

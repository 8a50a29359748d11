// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::cmp::Ordering;
use core::fmt::{Debug, Formatter};
use core::str::FromStr;

use anyhow::{anyhow, bail, Result};

use serde::ser::Serializer;
use serde::Serialize;

const F64_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0; // 2^53

/// Script number. Integers stay exact until they overflow, after which
/// arithmetic continues in floating point.
#[derive(Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn to_f64_lossy(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    // Floats holding an exactly representable integer collapse back to Int.
    fn normalize(f: f64) -> Number {
        if f.is_finite() && f.fract() == 0.0 && f.abs() <= F64_SAFE_INTEGER {
            Number::Int(f as i64)
        } else {
            Number::Float(f)
        }
    }

    /// Rejects results that left the finite range.
    pub fn ensure_finite(self) -> Result<Number> {
        match self {
            Number::Float(f) if !f.is_finite() => bail!("numeric overflow"),
            _ => Ok(self),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Int(i) => *i == 0,
            Number::Float(f) => *f == 0.0,
        }
    }
}

impl Debug for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(v) => write!(f, "{v:?}"),
        }
    }
}

impl Serialize for Number {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Number::Int(i) => serializer.serialize_i64(*i),
            Number::Float(f) => serializer.serialize_f64(*f),
        }
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number::Int(n)
    }
}

impl From<u64> for Number {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(i) => Number::Int(i),
            Err(_) => Number::Float(n as f64),
        }
    }
}

impl From<usize> for Number {
    fn from(n: usize) -> Self {
        Number::from(n as u64)
    }
}

impl From<f64> for Number {
    fn from(n: f64) -> Self {
        Number::Float(n)
    }
}

impl FromStr for Number {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(i) = s.parse::<i64>() {
            return Ok(Number::Int(i));
        }
        match s.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Number::Float(f)),
            _ => Err(anyhow!("invalid number `{s}`")),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Number {}

impl Ord for Number {
    fn cmp(&self, other: &Number) -> Ordering {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(b),
            _ => self.to_f64_lossy().total_cmp(&other.to_f64_lossy()),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Number {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(*i),
            Number::Float(f) if f.fract() == 0.0 && f.abs() <= F64_SAFE_INTEGER => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_i64().and_then(|i| u64::try_from(i).ok())
    }

    pub fn as_f64(&self) -> f64 {
        self.to_f64_lossy()
    }

    pub fn is_integer(&self) -> bool {
        self.as_i64().is_some()
    }

    pub fn add(&self, rhs: &Self) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => match a.checked_add(*b) {
                Some(v) => Number::Int(v),
                None => Number::Float(*a as f64 + *b as f64),
            },
            _ => Number::Float(self.to_f64_lossy() + rhs.to_f64_lossy()),
        }
    }

    pub fn sub(&self, rhs: &Self) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => match a.checked_sub(*b) {
                Some(v) => Number::Int(v),
                None => Number::Float(*a as f64 - *b as f64),
            },
            _ => Number::Float(self.to_f64_lossy() - rhs.to_f64_lossy()),
        }
    }

    pub fn mul(&self, rhs: &Self) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => match a.checked_mul(*b) {
                Some(v) => Number::Int(v),
                None => Number::Float(*a as f64 * *b as f64),
            },
            _ => Number::Float(self.to_f64_lossy() * rhs.to_f64_lossy()),
        }
    }

    pub fn divide(&self, rhs: &Self) -> Result<Number> {
        if rhs.is_zero() {
            bail!("divide by zero");
        }
        Ok(match (self, rhs) {
            (Number::Int(a), Number::Int(b)) if a.checked_rem(*b) == Some(0) => {
                match a.checked_div(*b) {
                    Some(v) => Number::Int(v),
                    None => Number::Float(*a as f64 / *b as f64),
                }
            }
            _ => Number::Float(self.to_f64_lossy() / rhs.to_f64_lossy()),
        })
    }

    pub fn modulo(&self, rhs: &Self) -> Result<Number> {
        if rhs.is_zero() {
            bail!("modulo by zero");
        }
        Ok(match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => match a.checked_rem(*b) {
                Some(v) => Number::Int(v),
                None => Number::Int(0),
            },
            _ => Number::Float(self.to_f64_lossy() % rhs.to_f64_lossy()),
        })
    }

    pub fn neg(&self) -> Number {
        match self {
            Number::Int(i) => match i.checked_neg() {
                Some(v) => Number::Int(v),
                None => Number::Float(-(*i as f64)),
            },
            Number::Float(f) => Number::Float(-f),
        }
    }

    pub fn abs(&self) -> Number {
        match self {
            Number::Int(i) => match i.checked_abs() {
                Some(v) => Number::Int(v),
                None => Number::Float((*i as f64).abs()),
            },
            Number::Float(f) => Number::Float(f.abs()),
        }
    }

    pub fn round(&self) -> Number {
        match self {
            Number::Int(_) => *self,
            Number::Float(f) => Self::normalize(f.round()),
        }
    }

    /// Truncates towards zero, the way `int()` converts numbers.
    pub fn trunc(&self) -> Number {
        match self {
            Number::Int(_) => *self,
            Number::Float(f) => Self::normalize(f.trunc()),
        }
    }

    pub fn to_float(&self) -> Number {
        Number::Float(self.to_f64_lossy())
    }
}

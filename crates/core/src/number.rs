//! Stored numeric values (prices, totals, revenue).
//!
//! The store keeps integers and doubles apart; a value read as `30` is
//! written back as `30`, not `30.0`.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Integer or double, as stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Double(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Double(d) => d,
        }
    }

    /// Finite and not below zero.
    pub fn is_non_negative(self) -> bool {
        match self {
            Number::Int(i) => i >= 0,
            Number::Double(d) => d.is_finite() && d >= 0.0,
        }
    }

    /// Integer sums stay integers until they overflow.
    pub fn add(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_add(b)
                .map(Number::Int)
                .unwrap_or(Number::Double(a as f64 + b as f64)),
            (a, b) => Number::Double(a.as_f64() + b.as_f64()),
        }
    }

    pub fn mul(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_mul(b)
                .map(Number::Int)
                .unwrap_or(Number::Double(a as f64 * b as f64)),
            (a, b) => Number::Double(a.as_f64() * b.as_f64()),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Double(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => fmt::Display::fmt(i, f),
            Number::Double(d) => fmt::Display::fmt(d, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_keeps_integer_and_double_apart() {
        let int: Number = serde_json::from_str("30").unwrap();
        let double: Number = serde_json::from_str("2.5").unwrap();
        assert_eq!(int, Number::Int(30));
        assert_eq!(double, Number::Double(2.5));
        assert_eq!(serde_json::to_string(&int).unwrap(), "30");
        assert_eq!(serde_json::to_string(&Number::Double(30.0)).unwrap(), "30.0");
    }

    #[test]
    fn large_integers_are_exact() {
        let n: Number = serde_json::from_str("9007199254740993").unwrap();
        assert_eq!(n, Number::Int(9_007_199_254_740_993));
        assert_eq!(serde_json::to_string(&n).unwrap(), "9007199254740993");
    }

    #[test]
    fn arithmetic_widens_only_when_needed() {
        assert_eq!(Number::Int(2).mul(Number::Int(3)), Number::Int(6));
        assert_eq!(Number::Int(2).add(Number::Double(0.5)), Number::Double(2.5));
        assert_eq!(
            Number::Int(i64::MAX).add(Number::Int(1)),
            Number::Double(i64::MAX as f64 + 1.0)
        );
    }

    #[test]
    fn non_negative_rejects_nan_and_negatives() {
        assert!(Number::Int(0).is_non_negative());
        assert!(Number::Double(1.5).is_non_negative());
        assert!(!Number::Int(-1).is_non_negative());
        assert!(!Number::Double(f64::NAN).is_non_negative());
        assert_eq!(Number::Double(2.5).to_string(), "2.5");
    }
}

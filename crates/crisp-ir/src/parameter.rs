//! Gate parameters: numeric angles or symbolic expressions.
//!
//! Arithmetic on two numeric operands folds immediately, so expressions built
//! from bound values stay plain constants. Equivalence rules rely on this when
//! they substitute a concrete angle into a body like `theta / 2`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::fmt;
use std::ops;

/// A symbolic or concrete parameter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A numeric value.
    Constant(f64),
    /// A free symbol.
    Symbol(String),
    /// The constant pi.
    Pi,
    /// Negation.
    Neg(Box<ParameterExpression>),
    /// Sum.
    Add(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Product.
    Mul(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Quotient.
    Div(Box<ParameterExpression>, Box<ParameterExpression>),
}

impl ParameterExpression {
    /// Create a constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create a symbolic parameter.
    pub fn symbol(name: impl Into<String>) -> Self {
        ParameterExpression::Symbol(name.into())
    }

    /// The constant pi.
    pub fn pi() -> Self {
        ParameterExpression::Pi
    }

    /// Whether the expression contains a free symbol.
    pub fn is_symbolic(&self) -> bool {
        match self {
            ParameterExpression::Symbol(_) => true,
            ParameterExpression::Constant(_) | ParameterExpression::Pi => false,
            ParameterExpression::Neg(e) => e.is_symbolic(),
            ParameterExpression::Add(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b) => a.is_symbolic() || b.is_symbolic(),
        }
    }

    /// Evaluate to a number, if no symbol is free.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterExpression::Constant(v) => Some(*v),
            ParameterExpression::Symbol(_) => None,
            ParameterExpression::Pi => Some(PI),
            ParameterExpression::Neg(e) => e.as_f64().map(|v| -v),
            ParameterExpression::Add(a, b) => Some(a.as_f64()? + b.as_f64()?),
            ParameterExpression::Mul(a, b) => Some(a.as_f64()? * b.as_f64()?),
            ParameterExpression::Div(a, b) => {
                let divisor = b.as_f64()?;
                if divisor == 0.0 {
                    return None;
                }
                Some(a.as_f64()? / divisor)
            }
        }
    }

    /// Free symbols, sorted.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        self.collect_symbols(&mut set);
        set
    }

    fn collect_symbols(&self, set: &mut BTreeSet<String>) {
        match self {
            ParameterExpression::Constant(_) | ParameterExpression::Pi => {}
            ParameterExpression::Symbol(name) => {
                set.insert(name.clone());
            }
            ParameterExpression::Neg(e) => e.collect_symbols(set),
            ParameterExpression::Add(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b) => {
                a.collect_symbols(set);
                b.collect_symbols(set);
            }
        }
    }

    /// Replace every occurrence of `name` with `value`, folding constants.
    pub fn substitute(&self, name: &str, value: &ParameterExpression) -> Self {
        match self {
            ParameterExpression::Symbol(n) if n == name => value.clone(),
            ParameterExpression::Constant(_)
            | ParameterExpression::Pi
            | ParameterExpression::Symbol(_) => self.clone(),
            ParameterExpression::Neg(e) => -e.substitute(name, value),
            ParameterExpression::Add(a, b) => a.substitute(name, value) + b.substitute(name, value),
            ParameterExpression::Mul(a, b) => a.substitute(name, value) * b.substitute(name, value),
            ParameterExpression::Div(a, b) => a.substitute(name, value) / b.substitute(name, value),
        }
    }

    /// Bind a symbol to a number.
    pub fn bind(&self, name: &str, value: f64) -> Self {
        self.substitute(name, &ParameterExpression::Constant(value))
    }

    fn fold(
        self,
        rhs: Self,
        op: fn(f64, f64) -> f64,
        build: fn(Box<Self>, Box<Self>) -> Self,
    ) -> Self {
        match (self.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => ParameterExpression::Constant(op(a, b)),
            _ => build(Box::new(self), Box::new(rhs)),
        }
    }
}

impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Symbol(name) => write!(f, "{name}"),
            ParameterExpression::Pi => write!(f, "pi"),
            ParameterExpression::Neg(e) => write!(f, "-({e})"),
            ParameterExpression::Add(a, b) => write!(f, "({a} + {b})"),
            ParameterExpression::Mul(a, b) => write!(f, "({a} * {b})"),
            ParameterExpression::Div(a, b) => write!(f, "({a} / {b})"),
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

impl From<&str> for ParameterExpression {
    fn from(name: &str) -> Self {
        ParameterExpression::Symbol(name.to_string())
    }
}

impl ops::Add for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.fold(rhs, |a, b| a + b, ParameterExpression::Add)
    }
}

impl ops::Sub for ParameterExpression {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl ops::Mul for ParameterExpression {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.fold(rhs, |a, b| a * b, ParameterExpression::Mul)
    }
}

impl ops::Div for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        match (self.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) if b != 0.0 => ParameterExpression::Constant(a / b),
            _ => ParameterExpression::Div(Box::new(self), Box::new(rhs)),
        }
    }
}

impl ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self {
        match self {
            ParameterExpression::Constant(v) => ParameterExpression::Constant(-v),
            ParameterExpression::Neg(e) => *e,
            other => ParameterExpression::Neg(Box::new(other)),
        }
    }
}

impl ops::Add<f64> for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: f64) -> Self {
        self + ParameterExpression::Constant(rhs)
    }
}

impl ops::Sub<f64> for ParameterExpression {
    type Output = Self;

    fn sub(self, rhs: f64) -> Self {
        self + ParameterExpression::Constant(-rhs)
    }
}

impl ops::Mul<f64> for ParameterExpression {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        self * ParameterExpression::Constant(rhs)
    }
}

impl ops::Div<f64> for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        self / ParameterExpression::Constant(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_folding() {
        let theta = ParameterExpression::constant(1.0);
        assert_eq!(theta.clone() / 2.0, ParameterExpression::Constant(0.5));
        assert_eq!(
            ParameterExpression::pi() + theta,
            ParameterExpression::Constant(PI + 1.0)
        );
    }

    #[test]
    fn test_symbolic_stays_symbolic() {
        let theta = ParameterExpression::symbol("theta");
        let half = theta / 2.0;
        assert!(half.is_symbolic());
        assert_eq!(half.as_f64(), None);
        assert_eq!(half.bind("theta", 3.0).as_f64(), Some(1.5));
    }

    #[test]
    fn test_substitute_expression() {
        let body = ParameterExpression::symbol("theta") + ParameterExpression::pi();
        let value = ParameterExpression::symbol("phi") * 2.0;
        let substituted = body.substitute("theta", &value);
        assert_eq!(
            substituted.symbols().into_iter().collect::<Vec<_>>(),
            vec!["phi".to_string()]
        );
        assert_eq!(substituted.bind("phi", 0.5).as_f64(), Some(1.0 + PI));
    }

    #[test]
    fn test_double_negation() {
        let theta = ParameterExpression::symbol("theta");
        assert_eq!(-(-theta.clone()), theta);
    }

    #[test]
    fn test_division_by_zero_is_unbound() {
        let e = ParameterExpression::constant(1.0) / 0.0;
        assert!(!e.is_symbolic());
        assert_eq!(e.as_f64(), None);
    }
}

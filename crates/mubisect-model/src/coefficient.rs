use std::fmt;

use crate::expr::{MuExpr, MuFn};
use crate::parser::{ParseError, Parser};

/// A matrix entry or bound that may depend on the growth rate.
///
/// `Constant` entries skip dispatch entirely. `Symbolic` entries evaluate
/// by substitution into the expression tree; `compile` lowers them to
/// closures so hot paths pay one indirect call per entry instead of a walk.
#[derive(Clone)]
pub enum Coefficient {
    Constant(f64),
    Symbolic(MuExpr),
    Compiled(MuFn),
}

impl Coefficient {
    /// Parse an expression source into a coefficient. Expressions that do
    /// not mention `mu` fold to `Constant`.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let expr = Parser::parse(source)?;
        if expr.is_constant() {
            Ok(Coefficient::Constant(expr.eval(0.0)))
        } else {
            Ok(Coefficient::Symbolic(expr))
        }
    }

    /// The coefficient's value at a concrete growth rate.
    pub fn value_at(&self, mu: f64) -> f64 {
        match self {
            Coefficient::Constant(v) => *v,
            Coefficient::Symbolic(expr) => expr.eval(mu),
            Coefficient::Compiled(f) => f(mu),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Coefficient::Constant(_))
    }

    /// Lower `Symbolic` to `Compiled`; `Constant` and `Compiled` pass
    /// through unchanged.
    pub fn compiled(self) -> Self {
        match self {
            Coefficient::Symbolic(expr) => Coefficient::Compiled(expr.compile()),
            other => other,
        }
    }
}

impl From<f64> for Coefficient {
    fn from(v: f64) -> Self {
        Coefficient::Constant(v)
    }
}

impl fmt::Debug for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coefficient::Constant(v) => write!(f, "Constant({v})"),
            Coefficient::Symbolic(expr) => write!(f, "Symbolic({expr:?})"),
            Coefficient::Compiled(_) => write!(f, "Compiled(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_folds_constants() {
        let coeff = Coefficient::parse("3 * (2 - 1.5)").unwrap();
        assert!(coeff.is_constant());
        assert!((coeff.value_at(99.0) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_value_at_dispatch() {
        let symbolic = Coefficient::parse("10 - 5*mu").unwrap();
        let compiled = symbolic.clone().compiled();
        assert!(matches!(compiled, Coefficient::Compiled(_)));
        for mu in [0.0, 0.25, 1.0, 4.0 / 3.0] {
            assert!((symbolic.value_at(mu) - compiled.value_at(mu)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_from_f64() {
        let coeff: Coefficient = (-2.5).into();
        assert!((coeff.value_at(1.0) + 2.5).abs() < 1e-12);
    }
}

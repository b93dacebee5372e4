use std::sync::Arc;

/// A growth-rate coefficient evaluated as `f(mu)`, compiled once and
/// shared across solves.
pub type MuFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Arithmetic over the single free variable `mu`.
///
/// Ill-defined points (division by zero, `0^-1`) follow IEEE semantics and
/// produce non-finite values; the parameterizer rejects those when the
/// expression is evaluated at a concrete growth rate.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum MuExpr {
    Number(f64),
    Mu,
    Neg(Box<MuExpr>),
    Binary {
        left: Box<MuExpr>,
        op: BinaryOp,
        right: Box<MuExpr>,
    },
}

impl MuExpr {
    /// Evaluate by direct substitution of `mu`.
    pub fn eval(&self, mu: f64) -> f64 {
        match self {
            MuExpr::Number(v) => *v,
            MuExpr::Mu => mu,
            MuExpr::Neg(inner) => -inner.eval(mu),
            MuExpr::Binary { left, op, right } => {
                let l = left.eval(mu);
                let r = right.eval(mu);
                match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    BinaryOp::Pow => l.powf(r),
                }
            }
        }
    }

    /// Lower the expression tree into a closure tree, so repeated
    /// evaluation skips the walk over the AST.
    pub fn compile(&self) -> MuFn {
        match self {
            MuExpr::Number(v) => {
                let v = *v;
                Arc::new(move |_| v)
            }
            MuExpr::Mu => Arc::new(|mu| mu),
            MuExpr::Neg(inner) => {
                let f = inner.compile();
                Arc::new(move |mu| -f(mu))
            }
            MuExpr::Binary { left, op, right } => {
                let l = left.compile();
                let r = right.compile();
                match op {
                    BinaryOp::Add => Arc::new(move |mu| l(mu) + r(mu)),
                    BinaryOp::Sub => Arc::new(move |mu| l(mu) - r(mu)),
                    BinaryOp::Mul => Arc::new(move |mu| l(mu) * r(mu)),
                    BinaryOp::Div => Arc::new(move |mu| l(mu) / r(mu)),
                    BinaryOp::Pow => Arc::new(move |mu| l(mu).powf(r(mu))),
                }
            }
        }
    }

    /// True when the expression does not mention `mu` anywhere.
    pub fn is_constant(&self) -> bool {
        match self {
            MuExpr::Number(_) => true,
            MuExpr::Mu => false,
            MuExpr::Neg(inner) => inner.is_constant(),
            MuExpr::Binary { left, right, .. } => left.is_constant() && right.is_constant(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    #[test]
    fn test_eval_linear() {
        let expr = Parser::parse("10 - 5*mu").unwrap();
        assert!((expr.eval(0.0) - 10.0).abs() < 1e-12);
        assert!((expr.eval(1.0) - 5.0).abs() < 1e-12);
        assert!((expr.eval(2.0) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_eval_rational() {
        let expr = Parser::parse("mu / (mu + 0.5)").unwrap();
        assert!((expr.eval(0.5) - 0.5).abs() < 1e-12);
        assert!((expr.eval(1.5) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_eval_power() {
        let expr = Parser::parse("(1 + mu)^2").unwrap();
        assert!((expr.eval(2.0) - 9.0).abs() < 1e-12);
        let expr = Parser::parse("2**mu").unwrap();
        assert!((expr.eval(3.0) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_eval_division_by_zero_is_nonfinite() {
        let expr = Parser::parse("1 / (2*mu - 1)").unwrap();
        assert!(!expr.eval(0.5).is_finite());
        assert!(expr.eval(1.0).is_finite());
    }

    #[test]
    fn test_compile_matches_eval() {
        let sources = [
            "10 - 5*mu",
            "-(mu + 0.25)/2",
            "mu / (mu + 0.5)",
            "(1 + mu)^2 - mu**3",
            "2.5e-2 * mu + 1e1",
        ];
        for source in sources {
            let expr = Parser::parse(source).unwrap();
            let f = expr.compile();
            for mu in [0.0, 0.1, 0.5, 1.0, 1.7, 2.0] {
                assert!(
                    (expr.eval(mu) - f(mu)).abs() < 1e-12,
                    "{source} diverges at mu = {mu}"
                );
            }
        }
    }

    #[test]
    fn test_is_constant() {
        assert!(Parser::parse("3 * (2 - 1.5)").unwrap().is_constant());
        assert!(!Parser::parse("3 * (2 - mu)").unwrap().is_constant());
    }
}

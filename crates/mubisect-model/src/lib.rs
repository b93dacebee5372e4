pub mod coefficient;
pub mod evaluate;
pub mod expr;
pub mod lexer;
pub mod parser;
pub mod problem;

#[cfg(feature = "serde")]
pub mod document;

pub use coefficient::Coefficient;
pub use evaluate::{evaluate, EvaluatedLp, EvaluationError};
pub use expr::{BinaryOp, MuExpr, MuFn};
pub use lexer::{Lexer, Span, Token, TokenKind};
pub use parser::{ParseError, Parser};
pub use problem::{DimensionError, ParameterizedProblem, RowSense, UNBOUNDED};

#[cfg(feature = "serde")]
pub use document::{DocumentError, ProblemDocument};

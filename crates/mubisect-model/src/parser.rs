use crate::expr::{BinaryOp, MuExpr};
use crate::lexer::{Lexer, Span, Token, TokenKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found {found} at position {span:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected end of expression")]
    UnexpectedEof,
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Unknown symbol `{name}` at position {span:?}; the only variable is `mu`")]
    UnknownSymbol { name: String, span: Span },
}

/// Recursive-descent parser for growth-rate expressions.
///
/// Precedence, loosest to tightest: `+ -`, `* /`, unary `-`, `^`/`**`
/// (right-associative).
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(source: &str) -> Result<MuExpr, ParseError> {
        let tokens = Lexer::tokenize(source);
        let mut parser = Parser::new(tokens);
        let expr = parser.parse_expr()?;
        parser.expect(TokenKind::Eof)?;
        Ok(expr)
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let token = self.current().cloned();
        match token {
            Some(t) if t.kind == kind => {
                self.advance();
                Ok(t)
            }
            Some(t) => Err(ParseError::UnexpectedToken {
                expected: format!("{:?}", kind),
                found: format!("{:?}", t.kind),
                span: t.span,
            }),
            None => Err(ParseError::UnexpectedEof),
        }
    }

    fn parse_expr(&mut self) -> Result<MuExpr, ParseError> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> Result<MuExpr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = MuExpr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<MuExpr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = MuExpr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<MuExpr, ParseError> {
        if self.peek_kind() == TokenKind::Minus {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(MuExpr::Neg(Box::new(inner)));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<MuExpr, ParseError> {
        let base = self.parse_primary()?;

        match self.peek_kind() {
            TokenKind::Caret | TokenKind::StarStar => {
                self.advance();
                // Right-associative, and the exponent may carry its own sign
                let exponent = self.parse_unary()?;
                Ok(MuExpr::Binary {
                    left: Box::new(base),
                    op: BinaryOp::Pow,
                    right: Box::new(exponent),
                })
            }
            _ => Ok(base),
        }
    }

    fn parse_primary(&mut self) -> Result<MuExpr, ParseError> {
        match self.peek_kind() {
            TokenKind::Number => {
                let token = self.advance().cloned().ok_or(ParseError::UnexpectedEof)?;
                let value: f64 = token
                    .text
                    .parse()
                    .map_err(|_| ParseError::InvalidNumber(token.text.clone()))?;
                Ok(MuExpr::Number(value))
            }
            TokenKind::Mu => {
                self.advance();
                Ok(MuExpr::Mu)
            }
            TokenKind::Ident => {
                let token = self.advance().cloned().ok_or(ParseError::UnexpectedEof)?;
                Err(ParseError::UnknownSymbol {
                    name: token.text,
                    span: token.span,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            _ => {
                let token = self.current().cloned();
                match token {
                    Some(t) => Err(ParseError::UnexpectedToken {
                        expected: "number, mu, or (".to_string(),
                        found: format!("{:?}", t.kind),
                        span: t.span,
                    }),
                    None => Err(ParseError::UnexpectedEof),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_precedence() {
        let expr = Parser::parse("1 + 2*mu").unwrap();
        match expr {
            MuExpr::Binary { left, op, right } => {
                assert_eq!(op, BinaryOp::Add);
                assert_eq!(*left, MuExpr::Number(1.0));
                match *right {
                    MuExpr::Binary { op, .. } => assert_eq!(op, BinaryOp::Mul),
                    other => panic!("expected product, got {other:?}"),
                }
            }
            other => panic!("expected sum, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_parens() {
        let grouped = Parser::parse("(1 + 2)*mu").unwrap();
        assert!((grouped.eval(3.0) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_unary_minus() {
        let expr = Parser::parse("--2").unwrap();
        assert!((expr.eval(0.0) - 2.0).abs() < 1e-12);
        let expr = Parser::parse("2 * -mu").unwrap();
        assert!((expr.eval(3.0) + 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_power_right_assoc() {
        let expr = Parser::parse("2^3^2").unwrap();
        assert!((expr.eval(0.0) - 512.0).abs() < 1e-12);
        let expr = Parser::parse("2^-1").unwrap();
        assert!((expr.eval(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_parse_unary_binds_looser_than_power() {
        // -2^2 reads as -(2^2)
        let expr = Parser::parse("-2^2").unwrap();
        assert!((expr.eval(0.0) + 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_unknown_symbol() {
        let err = Parser::parse("10 - 5*growth").unwrap_err();
        match err {
            ParseError::UnknownSymbol { name, .. } => assert_eq!(name, "growth"),
            other => panic!("expected unknown symbol error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_trailing_garbage() {
        let err = Parser::parse("1 + mu 2").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_parse_empty() {
        assert!(Parser::parse("").is_err());
        assert!(Parser::parse("   ").is_err());
    }

    #[test]
    fn test_parse_unbalanced_paren() {
        assert!(Parser::parse("(1 + mu").is_err());
    }
}

use std::str::Chars;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Mu,

    // Literals
    Ident,
    Number,

    // Operators
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Caret,

    // Delimiters
    LParen,
    RParen,

    // Special
    Eof,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, text: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            text: text.into(),
        }
    }
}

/// Tokenizer for growth-rate expressions such as `10 - 5*mu` or
/// `-(mu + 0.25)/2`. Numbers are unsigned at the token level; unary
/// minus is resolved by the parser.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Chars<'a>,
    pos: usize,
    current: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            source,
            chars,
            pos: 0,
            current,
        }
    }

    pub fn tokenize(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current;
        self.current = self.chars.next();
        if let Some(c) = c {
            self.pos += c.len_utf8();
        }
        c
    }

    fn peek(&self) -> Option<char> {
        self.current
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;

        // Integer part
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        // Decimal part
        if self.peek() == Some('.') {
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        // Exponent part
        if matches!(self.peek(), Some('e') | Some('E')) {
            // Look ahead past an optional sign for a digit before committing
            let mut chars = self.chars.clone();
            let mut next = chars.next();
            let signed = matches!(next, Some('+') | Some('-'));
            if signed {
                next = chars.next();
            }
            if next.is_some_and(|c| c.is_ascii_digit()) {
                self.advance(); // e
                if signed {
                    self.advance();
                }
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        Token::new(
            TokenKind::Number,
            Span::new(start, self.pos),
            &self.source[start..self.pos],
        )
    }

    fn read_ident(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.source[start..self.pos];
        let kind = match text {
            "mu" => TokenKind::Mu,
            _ => TokenKind::Ident,
        };
        Token::new(kind, Span::new(start, self.pos), text)
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.pos;

        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, Span::new(start, start), "");
        };

        match c {
            '+' => {
                self.advance();
                Token::new(TokenKind::Plus, Span::new(start, self.pos), "+")
            }
            '-' => {
                self.advance();
                Token::new(TokenKind::Minus, Span::new(start, self.pos), "-")
            }
            '*' => {
                self.advance();
                if self.peek() == Some('*') {
                    self.advance();
                    Token::new(TokenKind::StarStar, Span::new(start, self.pos), "**")
                } else {
                    Token::new(TokenKind::Star, Span::new(start, self.pos), "*")
                }
            }
            '/' => {
                self.advance();
                Token::new(TokenKind::Slash, Span::new(start, self.pos), "/")
            }
            '^' => {
                self.advance();
                Token::new(TokenKind::Caret, Span::new(start, self.pos), "^")
            }
            '(' => {
                self.advance();
                Token::new(TokenKind::LParen, Span::new(start, self.pos), "(")
            }
            ')' => {
                self.advance();
                Token::new(TokenKind::RParen, Span::new(start, self.pos), ")")
            }
            '.' => self.read_number(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_alphabetic() || c == '_' => self.read_ident(),
            _ => {
                self.advance();
                Token::new(
                    TokenKind::Error,
                    Span::new(start, self.pos),
                    &self.source[start..self.pos],
                )
            }
        }
    }
}

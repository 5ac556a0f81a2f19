//! Single-pass lexer for Lyra source code.
//!
//! Scans the full source into a token vector so the parser gets cheap
//! arbitrary lookahead. Line numbers are 1-indexed and attach to every
//! token; `#` starts a comment running to end of line.

use crate::token::{Token, TokenKind};
use lyra_core::{LyraResult, SyntaxError};

/// End-of-input sentinel character.
const EOF_CHAR: char = '\0';

/// A lexer over source code.
#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    /// Remaining source to process.
    chars: std::str::Chars<'src>,
    /// Current line (1-indexed).
    line: u32,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer over the given source.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            chars: source.chars(),
            line: 1,
        }
    }

    /// Scan the entire source into a token vector ending with `Eof`.
    pub fn tokenize(mut self) -> LyraResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Peek at the next character without consuming it.
    #[inline]
    fn first(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    /// Peek at the character after next without consuming.
    #[inline]
    fn second(&self) -> char {
        let mut chars = self.chars.clone();
        chars.next();
        chars.next().unwrap_or(EOF_CHAR)
    }

    /// Consume and return the next character.
    #[inline]
    fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    /// Consume a specific character if it matches.
    #[inline]
    fn eat(&mut self, c: char) -> bool {
        if self.first() == c {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume characters while the predicate returns true.
    #[inline]
    fn eat_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while self.first() != EOF_CHAR && predicate(self.first()) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.line)
    }

    /// Scan the next token.
    fn next_token(&mut self) -> LyraResult<Token> {
        self.skip_trivia();

        let line = self.line;
        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(Token::new(TokenKind::Eof, line)),
        };

        let kind = match c {
            '\n' => {
                self.line += 1;
                TokenKind::Newline
            }
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '-' => {
                if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                }
            }
            '=' => {
                if self.eat('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '"' | '\'' => self.scan_string(c)?,
            c if c.is_ascii_digit() => self.scan_number(c)?,
            c if c == '_' || c.is_ascii_alphabetic() => self.scan_identifier(c),
            other => return Err(self.error(format!("unexpected character '{}'", other))),
        };

        Ok(Token::new(kind, line))
    }

    /// Skip spaces, tabs, carriage returns and comments. Newlines are
    /// tokens and are not skipped here.
    fn skip_trivia(&mut self) {
        loop {
            match self.first() {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '#' => {
                    self.eat_while(|c| c != '\n');
                }
                _ => return,
            }
        }
    }

    fn scan_string(&mut self, quote: char) -> LyraResult<TokenKind> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('\n') => return Err(self.error("unterminated string")),
                Some(c) if c == quote => break,
                Some('\\') => {
                    let escaped = self.bump().ok_or_else(|| self.error("unterminated string"))?;
                    value.push(match escaped {
                        '\\' => '\\',
                        '\'' => '\'',
                        '"' => '"',
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => {
                            return Err(
                                self.error(format!("unknown escape sequence '\\{}'", other))
                            );
                        }
                    });
                }
                Some(c) => value.push(c),
            }
        }
        Ok(TokenKind::Str(value))
    }

    fn scan_number(&mut self, first: char) -> LyraResult<TokenKind> {
        let mut text = String::new();
        text.push(first);
        self.collect_while(&mut text, |c| c.is_ascii_digit());

        // A dot only continues the number when a digit follows, so
        // integer-then-dot sequences still lex.
        if self.first() == '.' && self.second().is_ascii_digit() {
            text.push('.');
            self.bump();
            self.collect_while(&mut text, |c| c.is_ascii_digit());
            let value: f64 = text
                .parse()
                .map_err(|_| self.error(format!("invalid float literal '{}'", text)))?;
            return Ok(TokenKind::Float(value));
        }

        let value: i64 = text
            .parse()
            .map_err(|_| self.error(format!("integer literal '{}' out of range", text)))?;
        Ok(TokenKind::Int(value))
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::new();
        name.push(first);
        self.collect_while(&mut name, |c| c == '_' || c.is_ascii_alphanumeric());
        TokenKind::keyword(&name).unwrap_or(TokenKind::Ident(name))
    }

    fn collect_while(&mut self, out: &mut String, mut predicate: impl FnMut(char) -> bool) {
        while self.first() != EOF_CHAR && predicate(self.first()) {
            out.push(self.bump().expect("peeked character"));
        }
    }
}

/// Tokenize a source string.
pub fn tokenize(source: &str) -> LyraResult<Vec<Token>> {
    Lexer::new(source).tokenize()
}

//! Tokenizer for SQL DDL.
//!
//! Produces a flat token stream with line/column positions. Comments are
//! dropped; quoted identifiers (backticks or double quotes) and string
//! literals (single quotes, PostgreSQL dollar quoting) are unescaped.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Bare word: keyword or unquoted identifier
    Word(String),
    /// Backtick- or double-quoted identifier
    Quoted(String),
    /// String literal contents
    Str(String),
    Number(String),
    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,
    /// Any other punctuation character
    Punct(char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    /// Check if this token is the given keyword (case-insensitive)
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(&self.kind, TokenKind::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    /// Identifier text for bare words and quoted identifiers
    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Word(w) | TokenKind::Quoted(w) => Some(w),
            _ => None,
        }
    }

    /// Render the token back to SQL-ish text
    pub fn text(&self) -> String {
        match &self.kind {
            TokenKind::Word(w) | TokenKind::Number(w) => w.clone(),
            TokenKind::Quoted(w) => format!("\"{}\"", w),
            TokenKind::Str(s) => format!("'{}'", s.replace('\'', "''")),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::Comma => ",".to_string(),
            TokenKind::Semicolon => ";".to_string(),
            TokenKind::Dot => ".".to_string(),
            TokenKind::Punct(c) => c.to_string(),
        }
    }
}

/// Lower-case every bare word, the way PostgreSQL folds unquoted names
pub fn fold_unquoted(tokens: &mut [Token]) {
    for token in tokens {
        if let TokenKind::Word(w) = &mut token.kind {
            w.make_ascii_lowercase();
        }
    }
}

/// Join tokens into readable SQL text, without spaces around parentheses
pub fn join_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<&TokenKind> = None;
    for token in tokens {
        let tight = matches!(
            (&prev, &token.kind),
            (None, _)
                | (Some(TokenKind::LParen), _)
                | (Some(TokenKind::Dot), _)
                | (_, TokenKind::RParen)
                | (_, TokenKind::Comma)
                | (_, TokenKind::Dot)
                | (Some(TokenKind::Word(_)), TokenKind::LParen)
        );
        if !tight {
            out.push(' ');
        }
        out.push_str(&token.text());
        prev = Some(&token.kind);
    }
    out
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_second(&self) -> Option<char> {
        let mut it = self.chars.clone();
        it.next();
        it.next()
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> Error {
        Error::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self, line: usize, column: usize) -> Result<()> {
        // opening "/*" already consumed
        loop {
            match self.bump() {
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => {}
                None => return Err(self.error(line, column, "unterminated block comment")),
            }
        }
    }

    fn quoted(&mut self, quote: char, line: usize, column: usize) -> Result<String> {
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.bump();
                        value.push(quote);
                    } else {
                        return Ok(value);
                    }
                }
                Some('\\') if quote == '\'' => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('0') => value.push('\0'),
                    Some(other) => value.push(other),
                    None => break,
                },
                Some(c) => value.push(c),
                None => break,
            }
        }
        let what = if quote == '\'' {
            "string literal"
        } else {
            "quoted identifier"
        };
        Err(self.error(line, column, format!("unterminated {}", what)))
    }

    /// `$tag$ ... $tag$` with the opening `$` already consumed
    fn dollar_quoted(&mut self, line: usize, column: usize) -> Result<String> {
        let mut tag = String::new();
        while let Some(c) = self.peek() {
            if c == '$' {
                self.bump();
                break;
            }
            tag.push(c);
            self.bump();
        }
        let closing = format!("${}$", tag);
        let mut value = String::new();
        while let Some(c) = self.bump() {
            value.push(c);
            if value.ends_with(&closing) {
                value.truncate(value.len() - closing.len());
                return Ok(value);
            }
        }
        Err(self.error(line, column, "unterminated dollar-quoted string"))
    }

    fn number(&mut self, first: char) -> String {
        let mut text = String::from(first);
        while let Some(c) = self.peek() {
            let exponent_sign =
                (c == '+' || c == '-') && matches!(text.chars().last(), Some('e' | 'E'));
            if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        text
    }

    fn word(&mut self, first: char) -> String {
        let mut text = String::from(first);
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        text
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            let (line, column) = (self.line, self.column);

            if c.is_whitespace() {
                self.bump();
                continue;
            }
            if c == '-' && self.peek_second() == Some('-') {
                self.skip_line();
                continue;
            }
            if c == '#' {
                self.skip_line();
                continue;
            }
            if c == '/' && self.peek_second() == Some('*') {
                self.bump();
                self.bump();
                self.skip_block_comment(line, column)?;
                continue;
            }

            self.bump();
            let kind = match c {
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                ',' => TokenKind::Comma,
                ';' => TokenKind::Semicolon,
                '.' => TokenKind::Dot,
                '\'' => TokenKind::Str(self.quoted('\'', line, column)?),
                '`' | '"' => TokenKind::Quoted(self.quoted(c, line, column)?),
                '$' if matches!(self.peek(), Some(n) if n == '$' || n.is_alphabetic()) => {
                    TokenKind::Str(self.dollar_quoted(line, column)?)
                }
                c if c.is_ascii_digit() => TokenKind::Number(self.number(c)),
                c if c.is_alphabetic() || c == '_' => TokenKind::Word(self.word(c)),
                other => TokenKind::Punct(other),
            };
            tokens.push(Token { kind, line, column });
        }

        Ok(tokens)
    }
}

/// Split SQL text into tokens
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    Lexer::new(input).tokenize()
}

//! Tokenizer for the supported query subset.

use crate::error::{GraphError, Result};
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    // Identifiers and keywords (keywords are matched case-insensitively by the parser)
    Ident(String),
    Param(String),

    // Literals
    Str(String),
    Int(i64),
    Float(f64),

    // Symbols
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Colon,
    Comma,
    Dot,
    Pipe,
    Semicolon,
    Star,
    Equals,

    // Relationships
    Dash,
    RightArrow,
    LeftArrow,

    // Anything else the grammar has no use for (comparison operators, ...)
    Other(String),
    Eof,
}

impl TokenKind {
    /// Text used when naming this token in an error message.
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Ident(s) => s.clone(),
            TokenKind::Param(p) => format!("${p}"),
            TokenKind::Str(s) => format!("'{s}'"),
            TokenKind::Int(i) => i.to_string(),
            TokenKind::Float(f) => f.to_string(),
            TokenKind::LeftParen => "(".to_string(),
            TokenKind::RightParen => ")".to_string(),
            TokenKind::LeftBracket => "[".to_string(),
            TokenKind::RightBracket => "]".to_string(),
            TokenKind::LeftBrace => "{".to_string(),
            TokenKind::RightBrace => "}".to_string(),
            TokenKind::Colon => ":".to_string(),
            TokenKind::Comma => ",".to_string(),
            TokenKind::Dot => ".".to_string(),
            TokenKind::Pipe => "|".to_string(),
            TokenKind::Semicolon => ";".to_string(),
            TokenKind::Star => "*".to_string(),
            TokenKind::Equals => "=".to_string(),
            TokenKind::Dash => "-".to_string(),
            TokenKind::RightArrow => "->".to_string(),
            TokenKind::LeftArrow => "<-".to_string(),
            TokenKind::Other(s) => s.clone(),
            TokenKind::Eof => "end of query".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset into the query text
    pub offset: usize,
}

pub(crate) struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    len: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            len: input.len(),
        }
    }

    pub(crate) fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            offset: self.len,
        });
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();

        let Some((offset, c)) = self.chars.next() else {
            return Ok(None);
        };

        let kind = match c {
            '\'' | '"' => self.read_string(c, offset)?,
            '$' => {
                let name = self.read_word();
                if name.is_empty() {
                    return Err(GraphError::query_syntax(format!(
                        "parameter name expected at offset {offset}"
                    )));
                }
                TokenKind::Param(name)
            }
            '`' => self.read_quoted_identifier(offset)?,
            c if c.is_ascii_digit() => self.read_number(c, offset)?,
            c if c.is_alphabetic() || c == '_' => {
                let mut word = c.to_string();
                word.push_str(&self.read_word());
                TokenKind::Ident(word)
            }
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '|' => TokenKind::Pipe,
            ';' => TokenKind::Semicolon,
            '*' => TokenKind::Star,
            '=' => TokenKind::Equals,
            '-' => {
                if self.eat('>') {
                    TokenKind::RightArrow
                } else {
                    TokenKind::Dash
                }
            }
            '<' => {
                if self.eat('-') {
                    TokenKind::LeftArrow
                } else if self.eat('=') {
                    TokenKind::Other("<=".to_string())
                } else if self.eat('>') {
                    TokenKind::Other("<>".to_string())
                } else {
                    TokenKind::Other("<".to_string())
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::Other(">=".to_string())
                } else {
                    TokenKind::Other(">".to_string())
                }
            }
            other => TokenKind::Other(other.to_string()),
        };

        Ok(Some(Token { kind, offset }))
    }

    fn eat(&mut self, expected: char) -> bool {
        if matches!(self.chars.peek(), Some(&(_, c)) if c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(&(_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        word
    }

    fn read_quoted_identifier(&mut self, offset: usize) -> Result<TokenKind> {
        let mut name = String::new();
        for (_, c) in self.chars.by_ref() {
            if c == '`' {
                return Ok(TokenKind::Ident(name));
            }
            name.push(c);
        }
        Err(GraphError::query_syntax(format!(
            "unterminated quoted identifier at offset {offset}"
        )))
    }

    fn read_string(&mut self, quote: char, offset: usize) -> Result<TokenKind> {
        let mut value = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                c if c == quote => return Ok(TokenKind::Str(value)),
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                c => value.push(c),
            }
        }
        Err(GraphError::query_syntax(format!(
            "unterminated string literal at offset {offset}"
        )))
    }

    fn read_number(&mut self, first: char, offset: usize) -> Result<TokenKind> {
        let mut text = first.to_string();
        let mut is_float = false;
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.chars.next();
            } else if c == '.' && !is_float {
                is_float = true;
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }

        let invalid = || GraphError::query_syntax(format!("invalid number '{text}' at offset {offset}"));
        if is_float {
            text.parse::<f64>().map(TokenKind::Float).map_err(|_| invalid())
        } else {
            text.parse::<i64>().map(TokenKind::Int).map_err(|_| invalid())
        }
    }
}

//! Hand-rolled tokenizer for the Pascal subset.
//!
//! Grounded in the root-level `lexer/mod.rs` of the teacher repo: a
//! `Peekable<Chars>` scanner tracking line/column, with a static keyword
//! table. Token text is handed through unmodified; case-normalization is
//! the AST builder's job (spec §4.3 / P5), not the lexer's.
mod token;

use std::{error::Error, fmt::Display, iter::Peekable, str::Chars};

use once_cell::sync::Lazy;
use std::collections::HashMap;

pub use token::{Token, TokenKind};

use crate::span::Span;

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    use TokenKind::*;
    let mut m = HashMap::new();
    m.insert("program", Program);
    m.insert("const", Const);
    m.insert("var", Var);
    m.insert("integer", Integer);
    m.insert("char", Char);
    m.insert("string", Str);
    m.insert("array", Array);
    m.insert("of", Of);
    m.insert("begin", Begin);
    m.insert("end", End);
    m.insert("if", If);
    m.insert("then", Then);
    m.insert("else", Else);
    m.insert("while", While);
    m.insert("do", Do);
    m.insert("div", KwDiv);
    m.insert("mod", KwMod);
    m.insert("readln", Readln);
    m.insert("write", Write);
    m.insert("writeln", Writeln);
    m
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.span, self.message)
    }
}

impl Error for LexError {}

pub type LexResult<T> = Result<T, LexError>;

pub struct Lexer<'a> {
    iterator: Peekable<Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            iterator: input.chars().peekable(),
            line: 1,
            col: 0,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.iterator.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let next = self.iterator.next();
        if let Some(c) = next {
            if c == '\n' {
                self.line += 1;
                self.col = 0;
            } else {
                self.col += 1;
            }
        }
        next
    }

    fn eat_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('{') => {
                    while let Some(c) = self.bump() {
                        if c == '}' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    pub fn lex(mut self) -> LexResult<Vec<Token>> {
        let mut tokens = vec![];
        loop {
            self.eat_whitespace_and_comments();
            let Some(next) = self.peek() else {
                break;
            };
            let span = Span::new(self.line, self.col);
            let kind = match next {
                'a'..='z' | 'A'..='Z' | '_' => self.lex_alphanumeric()?,
                '0'..='9' => self.lex_numeric()?,
                '\'' => self.lex_char_or_string()?,
                _ => self.lex_special()?,
            };
            tokens.push(Token { kind, span });
        }
        Ok(tokens)
    }

    fn lex_alphanumeric(&mut self) -> LexResult<TokenKind> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let lower = text.to_lowercase();
        if let Some(kw) = KEYWORDS.get(lower.as_str()) {
            Ok(kw.clone())
        } else {
            Ok(TokenKind::Id(text))
        }
    }

    fn lex_numeric(&mut self) -> LexResult<TokenKind> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Ok(TokenKind::IntLit(text))
    }

    fn lex_char_or_string(&mut self) -> LexResult<TokenKind> {
        let span = Span::new(self.line, self.col);
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('\'') => break,
                Some(c) => text.push(c),
                None => {
                    return Err(LexError {
                        message: "unterminated string literal".to_string(),
                        span,
                    })
                }
            }
        }
        if text.chars().count() == 1 {
            Ok(TokenKind::CharLit(text))
        } else {
            Ok(TokenKind::StringLit(text))
        }
    }

    fn lex_special(&mut self) -> LexResult<TokenKind> {
        let span = Span::new(self.line, self.col);
        let c = self.bump().expect("checked by caller");
        let kind = match c {
            ':' => {
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::Assign
                } else {
                    TokenKind::Colon
                }
            }
            '+' => {
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::PlusAssign
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::MinusAssign
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::StarAssign
                } else {
                    TokenKind::Star
                }
            }
            '=' => TokenKind::Eq,
            '<' => match self.peek() {
                Some('>') => {
                    self.bump();
                    TokenKind::NotEq
                }
                Some('=') => {
                    self.bump();
                    TokenKind::LessEq
                }
                _ => TokenKind::Less,
            },
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::GreaterEq
                } else {
                    TokenKind::Greater
                }
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '.' => {
                if self.peek() == Some('.') {
                    self.bump();
                    TokenKind::DotDot
                } else {
                    TokenKind::Dot
                }
            }
            other => {
                return Err(LexError {
                    message: format!("unexpected character '{other}'"),
                    span,
                })
            }
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_hello_world() {
        let tokens = Lexer::new("Program HelloWorld; begin Writeln('Hello world!'); end.")
            .lex()
            .unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Program);
        assert_eq!(tokens[1].kind, TokenKind::Id("HelloWorld".to_string()));
        assert_eq!(tokens[2].kind, TokenKind::Semicolon);
        assert_eq!(tokens[3].kind, TokenKind::Begin);
        assert_eq!(tokens[4].kind, TokenKind::Writeln);
        assert_eq!(tokens[5].kind, TokenKind::LParen);
        assert_eq!(
            tokens[6].kind,
            TokenKind::StringLit("Hello world!".to_string())
        );
    }

    #[test]
    fn distinguishes_char_from_string() {
        let tokens = Lexer::new("'a' 'ab'").lex().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::CharLit("a".to_string()));
        assert_eq!(tokens[1].kind, TokenKind::StringLit("ab".to_string()));
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = Lexer::new("var\n  a").lex().unwrap();
        assert_eq!(tokens[0].span, Span::new(1, 0));
        assert_eq!(tokens[1].span, Span::new(2, 2));
    }

    #[test]
    fn assignment_operators() {
        let tokens = Lexer::new(":= += -= *=").lex().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Assign);
        assert_eq!(tokens[1].kind, TokenKind::PlusAssign);
        assert_eq!(tokens[2].kind, TokenKind::MinusAssign);
        assert_eq!(tokens[3].kind, TokenKind::StarAssign);
    }
}

//! The PEL lexer: source text to a token stream.
//!
//! A hand-written scanner that tracks line and column as it advances over
//! the source. It never looks beyond two characters of lookahead.

use crate::diagnostic::{Diagnostic, ErrorCode};
use crate::token::{keyword_for, Token, TokenKind};
use pel_base::Span;

/// Longest-match-first duration unit suffixes. `day` must be tried before
/// `d`, and `mo`/`yr`/`q` are checked before falling back to a bare
/// numeric suffix.
const DURATION_UNITS: &[&str] = &["mo", "yr", "day", "d", "q", "w"];

/// Characters accepted as a magnitude suffix on a bare number or currency
/// amount. `М` (U+041C) and `Т` (U+0422) are Cyrillic homographs of `M`/`T`
/// that the lexer tolerates without treating them differently.
const MAGNITUDE_SUFFIXES: &[char] = &['k', 'm', 'M', 'B', 'T', '\u{041C}', '\u{0422}'];

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    filename: String,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(source: &str, filename: impl Into<String>) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            filename: filename.into(),
            tokens: Vec::new(),
        }
    }

    fn here(&self) -> Span {
        Span::new(self.filename.clone(), self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.advance();
        }
    }

    fn skip_comment(&mut self) {
        if self.peek() == Some('/') && self.peek_at(1) == Some('/') {
            while !matches!(self.peek(), None | Some('\n')) {
                self.advance();
            }
        }
    }

    /// Tokenizes the entire source, returning the token stream ending in
    /// exactly one `Eof` token, or the first lexical error encountered.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        while self.pos < self.chars.len() {
            self.skip_whitespace();
            self.skip_comment();

            let Some(ch) = self.peek() else { break };

            if ch == '\n' {
                self.advance();
                continue;
            }

            if "$€£¥".contains(ch) {
                let tok = self.read_currency();
                self.tokens.push(tok);
            } else if ch.is_ascii_digit() {
                let tok = self.read_number_or_duration();
                self.tokens.push(tok);
            } else if ch.is_alphabetic() || ch == '_' {
                let tok = self.read_identifier();
                self.tokens.push(tok);
            } else if ch == '"' || ch == '\'' {
                self.tokens.push(self.read_string()?);
            } else if let Some(tok) = self.read_operator_or_punct() {
                self.tokens.push(tok);
            } else {
                return Err(Diagnostic::new(
                    ErrorCode::UnexpectedChar,
                    format!("unexpected character: '{ch}'"),
                )
                .with_span(self.here()));
            }
        }

        self.tokens.push(Token::new(TokenKind::Eof, self.here()));
        Ok(self.tokens)
    }

    fn read_number(&mut self) -> Token {
        let span = self.here();
        let mut text = String::new();

        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
            text.push(self.advance().unwrap());
        }

        // Decimal point only consumed when followed by a digit, so
        // `0..time_horizon` lexes as NUMBER DOT DOT IDENTIFIER, not
        // NUMBER("0..") IDENTIFIER.
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
            while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
                text.push(self.advance().unwrap());
            }
        }

        if matches!(self.peek(), Some(c) if MAGNITUDE_SUFFIXES.contains(&c)) {
            text.push(self.advance().unwrap());
        }

        if self.peek() == Some('%') {
            self.advance();
            return Token::new(TokenKind::Percentage(format!("{text}%")), span);
        }

        Token::new(TokenKind::Number(text), span)
    }

    fn read_number_or_duration(&mut self) -> Token {
        let span = self.here();
        let start = self.pos;

        for unit in DURATION_UNITS {
            if self.matches_duration_literal(unit) {
                let mut text = String::new();
                let digits_start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
                text.push_str(&self.chars[digits_start..self.pos].iter().collect::<String>());
                for u in unit.chars() {
                    text.push(u);
                    self.advance();
                }
                return Token::new(TokenKind::Duration(text), span);
            }
        }

        self.pos = start;
        self.read_number()
    }

    /// Returns true if, starting at `self.pos`, the source matches
    /// `DIGIT+ unit` where `unit` is not itself followed by an identifier
    /// character (so `1mo` is a duration but `1month` is not, and `1m`
    /// alone stays a numeric suffix rather than matching `m` as a unit —
    /// `m` is deliberately absent from [`DURATION_UNITS`]).
    fn matches_duration_literal(&self, unit: &str) -> bool {
        let mut i = self.pos;
        let digit_start = i;
        while matches!(self.chars.get(i), Some(c) if c.is_ascii_digit()) {
            i += 1;
        }
        if i == digit_start {
            return false;
        }
        let unit_chars: Vec<char> = unit.chars().collect();
        for (k, uc) in unit_chars.iter().enumerate() {
            if self.chars.get(i + k) != Some(uc) {
                return false;
            }
        }
        let after = i + unit_chars.len();
        !matches!(self.chars.get(after), Some(c) if c.is_alphanumeric() || *c == '_')
    }

    fn read_currency(&mut self) -> Token {
        let span = self.here();
        let mut text = String::new();
        text.push(self.advance().unwrap()); // symbol

        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
            text.push(self.advance().unwrap());
        }

        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
            while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
                text.push(self.advance().unwrap());
            }
        }

        if matches!(self.peek(), Some(c) if MAGNITUDE_SUFFIXES.contains(&c)) {
            text.push(self.advance().unwrap());
        }

        Token::new(TokenKind::Currency(text), span)
    }

    fn read_identifier(&mut self) -> Token {
        let span = self.here();
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            text.push(self.advance().unwrap());
        }
        let kind = keyword_for(&text).unwrap_or(TokenKind::Identifier(text));
        Token::new(kind, span)
    }

    fn read_string(&mut self) -> Result<Token, Diagnostic> {
        let span = self.here();
        let quote = self.advance().unwrap();
        let mut value = String::new();

        loop {
            match self.peek() {
                None => {
                    return Err(Diagnostic::new(
                        ErrorCode::UnterminatedString,
                        "unterminated string literal",
                    )
                    .with_span(span));
                }
                Some(c) if c == quote => break,
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        None => {
                            return Err(Diagnostic::new(
                                ErrorCode::UnterminatedString,
                                "unterminated string literal",
                            )
                            .with_span(span));
                        }
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some(c @ ('"' | '\\' | '\'')) => value.push(c),
                        Some(other) => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        if self.peek() != Some(quote) {
            return Err(
                Diagnostic::new(ErrorCode::UnterminatedString, "unterminated string literal")
                    .with_span(span),
            );
        }
        self.advance(); // closing quote
        Ok(Token::new(TokenKind::String(value), span))
    }

    fn read_operator_or_punct(&mut self) -> Option<Token> {
        let span = self.here();
        let two = |c0: char, c1: char, kind: TokenKind, me: &mut Self| -> Option<Token> {
            if me.peek() == Some(c0) && me.peek_at(1) == Some(c1) {
                me.advance();
                me.advance();
                Some(Token::new(kind, span.clone()))
            } else {
                None
            }
        };

        if let Some(t) = two('=', '=', TokenKind::EqEq, self) {
            return Some(t);
        }
        if let Some(t) = two('!', '=', TokenKind::NotEq, self) {
            return Some(t);
        }
        if let Some(t) = two('<', '=', TokenKind::LtEq, self) {
            return Some(t);
        }
        if let Some(t) = two('>', '=', TokenKind::GtEq, self) {
            return Some(t);
        }
        if let Some(t) = two('&', '&', TokenKind::AndAnd, self) {
            return Some(t);
        }
        if let Some(t) = two('|', '|', TokenKind::OrOr, self) {
            return Some(t);
        }
        if let Some(t) = two('-', '>', TokenKind::Arrow, self) {
            return Some(t);
        }

        let single = |kind: TokenKind, me: &mut Self| -> Token {
            me.advance();
            Token::new(kind, span.clone())
        };

        use TokenKind::*;
        let kind = match self.peek()? {
            '+' => Plus,
            '-' => Minus,
            '*' => Star,
            '/' => Slash,
            '%' => Percent,
            '^' => Caret,
            '~' => Tilde,
            '<' => Lt,
            '>' => Gt,
            '!' => Not,
            '(' => LParen,
            ')' => RParen,
            '{' => LBrace,
            '}' => RBrace,
            '[' => LBracket,
            ']' => RBracket,
            ':' => Colon,
            ';' => Semicolon,
            ',' => Comma,
            '.' => Dot,
            '=' => Assign,
            _ => return None,
        };
        Some(single(kind, self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, "t.pel")
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_range_expression_as_number_dot_dot_ident() {
        let ks = kinds("0..time_horizon");
        assert_eq!(
            ks,
            vec![
                TokenKind::Number("0".into()),
                TokenKind::Dot,
                TokenKind::Dot,
                TokenKind::Identifier("time_horizon".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_1mo_as_duration_and_1m_as_number() {
        assert_eq!(
            kinds("1mo"),
            vec![TokenKind::Duration("1mo".into()), TokenKind::Eof]
        );
        assert_eq!(
            kinds("1m"),
            vec![TokenKind::Number("1m".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_currency_and_percentage_literals() {
        assert_eq!(
            kinds("$500"),
            vec![TokenKind::Currency("$500".into()), TokenKind::Eof]
        );
        assert_eq!(
            kinds("5%"),
            vec![TokenKind::Percentage("5%".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn skips_comments_and_counts_lines() {
        let tokens = Lexer::new("// comment\nparam", "t.pel").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Param);
        assert_eq!(tokens[0].span.line, 2);
    }

    #[test]
    fn distinguishes_longest_match_operators() {
        let ks = kinds("<= >= == != && || ->");
        assert_eq!(
            ks,
            vec![
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Arrow,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = Lexer::new("\"unterminated", "t.pel").tokenize().unwrap_err();
        assert_eq!(err.code.as_str(), "E0003");
    }

    #[test]
    fn string_escapes_are_decoded() {
        let ks = kinds(r#""a\nb\tc\"d""#);
        assert_eq!(ks, vec![TokenKind::String("a\nb\tc\"d".into()), TokenKind::Eof]);
    }

    #[test]
    fn unknown_escape_passes_through_with_backslash() {
        let ks = kinds(r#""a\qb""#);
        assert_eq!(ks, vec![TokenKind::String("a\\qb".into()), TokenKind::Eof]);
    }

    #[test]
    fn unexpected_character_is_lexical_error() {
        let err = Lexer::new("@", "t.pel").tokenize().unwrap_err();
        assert_eq!(err.code.as_str(), "E0001");
    }
}

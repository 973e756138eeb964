//! Source lexer
//!
//! Turns source text into tokens carrying line/column spans. Lexing never
//! stops at a bad character: the error is recorded, the character skipped,
//! and the rest of the file is still tokenized so that an editor buffer in
//! the middle of an edit keeps producing useful trees.

use ds_dom::LiteralFlags;
use ds_span::{Location, Span};
use thiserror::Error;

/// Reserved words
pub const KEYWORDS: &[&str] = &[
    "module",
    "import",
    "class",
    "struct",
    "interface",
    "union",
    "template",
    "alias",
    "return",
    "if",
    "else",
    "while",
    "new",
    "cast",
    "typeof",
    "this",
    "super",
    "null",
    "true",
    "false",
    "is",
    "__FILE__",
    "__LINE__",
    "static",
    "const",
    "immutable",
    "shared",
    "inout",
    "auto",
    "override",
    "abstract",
    "final",
    "public",
    "private",
    "protected",
    "package",
    "ref",
    "in",
    "out",
    "lazy",
    "scope",
    "pure",
    "nothrow",
    "void",
    "bool",
    "byte",
    "ubyte",
    "short",
    "ushort",
    "int",
    "uint",
    "long",
    "ulong",
    "float",
    "double",
    "real",
    "ifloat",
    "idouble",
    "ireal",
    "cfloat",
    "cdouble",
    "creal",
    "char",
    "wchar",
    "dchar",
];

/// Punctuation, longest spellings first
const PUNCTUATION: &[&str] = &[
    ">>>=", ">>>", "<<=", ">>=", "...", "..", "&&", "||", "==", "!=", "<=", ">=", "<<", ">>", "++",
    "--", "+=", "-=", "*=", "/=", "%=", "~=", "&=", "|=", "^=", "=>", "{", "}", "(", ")", "[", "]",
    ";", ",", ".", ":", "!", "?", "=", "<", ">", "+", "-", "*", "/", "%", "~", "&", "|", "^", "$",
    "@",
];

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier
    Ident(String),
    /// Reserved word
    Keyword(&'static str),
    /// Integer literal with its suffixes
    Integer {
        /// Value
        value: u64,
        /// Suffixes
        flags: LiteralFlags,
    },
    /// Floating point literal with its suffixes
    Float {
        /// Value
        value: f64,
        /// Suffixes
        flags: LiteralFlags,
    },
    /// Character literal
    Char(char),
    /// String literal
    String(String),
    /// Operator or delimiter
    Punct(&'static str),
    /// End of input
    Eof,
}

impl TokenKind {
    /// Short human-readable description for diagnostics
    pub fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier `{name}`"),
            Self::Keyword(keyword) => format!("`{keyword}`"),
            Self::Integer { value, .. } => format!("integer `{value}`"),
            Self::Float { value, .. } => format!("number `{value}`"),
            Self::Char(ch) => format!("character {ch:?}"),
            Self::String(_) => "string literal".to_owned(),
            Self::Punct(punct) => format!("`{punct}`"),
            Self::Eof => "end of file".to_owned(),
        }
    }
}

/// A token paired with its location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Kind and payload
    pub kind: TokenKind,
    /// Location
    pub span: Span,
}

/// Lexing failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {span}")]
pub struct LexError {
    /// What went wrong
    pub message: String,
    /// Offending text
    pub span: Span,
}

/// Pull-based lexer
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    errors: Vec<LexError>,
}

impl Lexer {
    /// Create a lexer over `source`
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            errors: Vec::new(),
        }
    }

    /// Tokenize the whole input; the last token is always `Eof`
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexError>) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, self.errors)
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
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

    fn error(&mut self, message: impl Into<String>, start: Location) {
        self.errors.push(LexError {
            message: message.into(),
            span: Span::new(start, self.location()),
        });
    }

    /// Pull the next token
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_trivia();
            let start = self.location();
            let kind = match self.peek() {
                None => TokenKind::Eof,
                Some(ch) if is_ident_start(ch) => self.lex_word(),
                Some(ch) if ch.is_ascii_digit() => self.lex_number(start),
                Some('.') if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.lex_number(start)
                }
                Some('\'') => self.lex_char(start),
                Some('"') => self.lex_string(start),
                Some('`') => self.lex_raw_string(start),
                Some(_) => match self.lex_punct() {
                    Some(kind) => kind,
                    None => {
                        let ch = self.bump().unwrap_or_default();
                        self.error(format!("unexpected character {ch:?}"), start);
                        continue;
                    }
                },
            };
            return Token {
                kind,
                span: Span::new(start, self.location()),
            };
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(ch), _) if ch.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(ch) = self.bump() {
                        if ch == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.location();
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => {
                                self.error("unterminated block comment", start);
                                break;
                            }
                        }
                    }
                }
                (Some('/'), Some('+')) => {
                    let start = self.location();
                    self.bump();
                    self.bump();
                    let mut depth = 1_u32;
                    while depth > 0 {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('/'), Some('+')) => {
                                self.bump();
                                self.bump();
                                depth += 1;
                            }
                            (Some('+'), Some('/')) => {
                                self.bump();
                                self.bump();
                                depth -= 1;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => {
                                self.error("unterminated nesting comment", start);
                                break;
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(ch) = self.peek().filter(|&c| is_ident_continue(c)) {
            word.push(ch);
            self.bump();
        }
        match KEYWORDS.iter().copied().find(|keyword| *keyword == word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident(word),
        }
    }

    fn lex_punct(&mut self) -> Option<TokenKind> {
        let punct = PUNCTUATION.iter().copied().find(|punct| {
            punct
                .chars()
                .enumerate()
                .all(|(offset, ch)| self.peek_at(offset) == Some(ch))
        })?;
        for _ in 0..punct.chars().count() {
            self.bump();
        }
        Some(TokenKind::Punct(punct))
    }

    fn take_digits(&mut self, radix: u32, out: &mut String) {
        while let Some(ch) = self.peek() {
            if ch == '_' {
                self.bump();
            } else if ch.is_digit(radix) {
                out.push(ch);
                self.bump();
            } else {
                break;
            }
        }
    }

    fn lex_number(&mut self, start: Location) -> TokenKind {
        let radix = match (self.peek(), self.peek_at(1)) {
            (Some('0'), Some('x' | 'X')) => 16,
            (Some('0'), Some('b' | 'B')) => 2,
            _ => 10,
        };
        if radix != 10 {
            self.bump();
            self.bump();
        }

        let mut digits = String::new();
        self.take_digits(radix, &mut digits);

        let mut is_float = false;
        if radix == 10 {
            // `1..2` is a slice, `1.foo` a property access
            if self.peek() == Some('.')
                && self.peek_at(1) != Some('.')
                && !self.peek_at(1).is_some_and(is_ident_start)
            {
                is_float = true;
                self.bump();
                digits.push('.');
                self.take_digits(10, &mut digits);
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                is_float = true;
                digits.push('e');
                self.bump();
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    digits.push(sign);
                    self.bump();
                }
                let before = digits.len();
                self.take_digits(10, &mut digits);
                if digits.len() == before {
                    self.error("expected digits after exponent", start);
                    digits.push('0');
                }
            }
        }

        let mut flags = LiteralFlags::empty();
        loop {
            match self.peek() {
                Some('u' | 'U') if !is_float => flags |= LiteralFlags::UNSIGNED,
                Some('L') if is_float || flags.contains(LiteralFlags::FLOAT) => {
                    flags |= LiteralFlags::REAL;
                }
                Some('L') => flags |= LiteralFlags::LONG,
                Some('f' | 'F') => flags |= LiteralFlags::FLOAT,
                Some('i') => flags |= LiteralFlags::IMAGINARY,
                _ => break,
            }
            self.bump();
        }
        if flags.intersects(LiteralFlags::FLOAT | LiteralFlags::IMAGINARY) && !is_float {
            is_float = true;
            if flags.contains(LiteralFlags::LONG) {
                flags.remove(LiteralFlags::LONG);
                flags |= LiteralFlags::REAL;
            }
        }
        if self.peek().is_some_and(is_ident_continue) {
            let suffix_start = self.location();
            while self.peek().is_some_and(is_ident_continue) {
                self.bump();
            }
            self.error("invalid literal suffix", suffix_start);
        }

        if is_float {
            let value = if radix == 10 {
                digits.parse::<f64>().unwrap_or_default()
            } else {
                u64::from_str_radix(&digits, radix).map_or(0.0, |v| v as f64)
            };
            return TokenKind::Float { value, flags };
        }

        match u64::from_str_radix(&digits, radix) {
            Ok(value) => TokenKind::Integer { value, flags },
            Err(_) => {
                self.error("integer literal out of range", start);
                TokenKind::Integer { value: 0, flags }
            }
        }
    }

    fn lex_escape(&mut self, start: Location) -> char {
        let Some(ch) = self.bump() else {
            self.error("unterminated escape sequence", start);
            return '\0';
        };
        let hex_digits = match ch {
            'n' => return '\n',
            'r' => return '\r',
            't' => return '\t',
            '0' => return '\0',
            'a' => return '\u{07}',
            'b' => return '\u{08}',
            'f' => return '\u{0C}',
            'v' => return '\u{0B}',
            'x' => 2,
            'u' => 4,
            'U' => 8,
            other => return other,
        };
        let mut code = String::new();
        for _ in 0..hex_digits {
            match self.peek().filter(char::is_ascii_hexdigit) {
                Some(digit) => {
                    code.push(digit);
                    self.bump();
                }
                None => break,
            }
        }
        match u32::from_str_radix(&code, 16).ok().and_then(char::from_u32) {
            Some(decoded) => decoded,
            None => {
                self.error("invalid escape sequence", start);
                '\0'
            }
        }
    }

    fn lex_char(&mut self, start: Location) -> TokenKind {
        self.bump();
        let value = match self.bump() {
            Some('\\') => self.lex_escape(start),
            Some('\'') | None => {
                self.error("empty character literal", start);
                return TokenKind::Char('\0');
            }
            Some(ch) => ch,
        };
        if self.peek() == Some('\'') {
            self.bump();
        } else {
            self.error("unterminated character literal", start);
        }
        TokenKind::Char(value)
    }

    fn lex_string(&mut self, start: Location) -> TokenKind {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => value.push(self.lex_escape(start)),
                Some(ch) => value.push(ch),
                None => {
                    self.error("unterminated string literal", start);
                    break;
                }
            }
        }
        self.skip_string_postfix();
        TokenKind::String(value)
    }

    fn lex_raw_string(&mut self, start: Location) -> TokenKind {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('`') => break,
                Some(ch) => value.push(ch),
                None => {
                    self.error("unterminated string literal", start);
                    break;
                }
            }
        }
        self.skip_string_postfix();
        TokenKind::String(value)
    }

    fn skip_string_postfix(&mut self) {
        if matches!(self.peek(), Some('c' | 'w' | 'd'))
            && !self.peek_at(1).is_some_and(is_ident_continue)
        {
            self.bump();
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

fn is_ident_continue(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = Lexer::new(source).tokenize();
        assert!(errors.is_empty(), "lex errors: {errors:?}");
        tokens.into_iter().map(|token| token.kind).collect()
    }

    #[test]
    fn test_integer_suffixes() {
        assert_eq!(
            kinds("1 2u 3L 4UL 0x1F 1_000"),
            vec![
                TokenKind::Integer { value: 1, flags: LiteralFlags::empty() },
                TokenKind::Integer { value: 2, flags: LiteralFlags::UNSIGNED },
                TokenKind::Integer { value: 3, flags: LiteralFlags::LONG },
                TokenKind::Integer {
                    value: 4,
                    flags: LiteralFlags::UNSIGNED | LiteralFlags::LONG
                },
                TokenKind::Integer { value: 31, flags: LiteralFlags::empty() },
                TokenKind::Integer { value: 1000, flags: LiteralFlags::empty() },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_float_suffixes() {
        assert_eq!(
            kinds("1.5 2f 3.0L 4i 1e3"),
            vec![
                TokenKind::Float { value: 1.5, flags: LiteralFlags::empty() },
                TokenKind::Float { value: 2.0, flags: LiteralFlags::FLOAT },
                TokenKind::Float { value: 3.0, flags: LiteralFlags::REAL },
                TokenKind::Float { value: 4.0, flags: LiteralFlags::IMAGINARY },
                TokenKind::Float { value: 1000.0, flags: LiteralFlags::empty() },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_property_access_on_integer_is_not_a_float() {
        assert_eq!(
            kinds("1.max"),
            vec![
                TokenKind::Integer { value: 1, flags: LiteralFlags::empty() },
                TokenKind::Punct("."),
                TokenKind::Ident("max".to_owned()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_punctuation_and_spans() {
        let (tokens, errors) = Lexer::new("class A\n  !=x // trailing\n'\\n'").tokenize();
        assert!(errors.is_empty());
        let kinds: Vec<_> = tokens.iter().map(|token| token.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Keyword("class"),
                TokenKind::Ident("A".to_owned()),
                TokenKind::Punct("!="),
                TokenKind::Ident("x".to_owned()),
                TokenKind::Char('\n'),
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[2].span, Span::new(Location::new(2, 3), Location::new(2, 5)));
    }

    #[test]
    fn test_bad_character_is_skipped() {
        let (tokens, errors) = Lexer::new("a # b").tokenize();
        assert_eq!(errors.len(), 1);
        assert_eq!(tokens.len(), 3);
    }
}

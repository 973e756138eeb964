use super::*;
use ds_dom::{PrimitiveKind, TypeModifier};
use ds_intern::Symbol;
use ds_span::Location;

impl Parser<'_> {
    pub(super) fn token_at(&self, pos: usize) -> &Token {
        self.tokens.get(pos).unwrap_or(&self.eof)
    }

    pub(super) fn kind_at(&self, pos: usize) -> &TokenKind {
        &self.token_at(pos).kind
    }

    pub(super) fn current_kind(&self) -> &TokenKind {
        self.kind_at(self.cursor)
    }

    pub(super) fn nth_kind(&self, n: usize) -> &TokenKind {
        self.kind_at(self.cursor + n)
    }

    pub(super) fn is_eof(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    pub(super) fn punct_at(&self, pos: usize, punct: &str) -> bool {
        matches!(self.kind_at(pos), TokenKind::Punct(p) if *p == punct)
    }

    pub(super) fn at_punct(&self, punct: &str) -> bool {
        self.punct_at(self.cursor, punct)
    }

    pub(super) fn keyword_at(&self, pos: usize, keyword: &str) -> bool {
        matches!(self.kind_at(pos), TokenKind::Keyword(k) if *k == keyword)
    }

    pub(super) fn at_keyword(&self, keyword: &str) -> bool {
        self.keyword_at(self.cursor, keyword)
    }

    pub(super) fn ident_at(&self, pos: usize) -> bool {
        matches!(self.kind_at(pos), TokenKind::Ident(_))
    }

    pub(super) fn bump(&mut self) -> Token {
        let token = self.token_at(self.cursor).clone();
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
        }
        token
    }

    pub(super) fn eat_punct(&mut self, punct: &str) -> bool {
        let matched = self.at_punct(punct);
        if matched {
            self.bump();
        }
        matched
    }

    pub(super) fn eat_keyword(&mut self, keyword: &str) -> bool {
        let matched = self.at_keyword(keyword);
        if matched {
            self.bump();
        }
        matched
    }

    /// Consume `punct` or record an error without consuming anything
    pub(super) fn expect_punct(&mut self, punct: &str) -> bool {
        if self.eat_punct(punct) {
            return true;
        }
        self.error_expected(&format!("`{punct}`"));
        false
    }

    pub(super) fn error_expected(&mut self, expected: &str) {
        let token = self.token_at(self.cursor);
        let error = ParseError::Expected {
            expected: expected.to_owned(),
            found: token.kind.describe(),
            span: token.span,
        };
        self.errors.push(error);
    }

    pub(super) fn start(&self) -> Location {
        self.token_at(self.cursor).span.start
    }

    pub(super) fn previous_end(&self) -> Location {
        match self.cursor.checked_sub(1).and_then(|pos| self.tokens.get(pos)) {
            Some(token) => token.span.end,
            None => self.start(),
        }
    }

    pub(super) fn span_from(&self, start: Location) -> Span {
        Span::new(start, self.previous_end())
    }

    /// Consume an identifier
    pub(super) fn ident(&mut self) -> Option<(Symbol, Span)> {
        let TokenKind::Ident(name) = self.current_kind() else {
            return None;
        };
        let symbol = self.interner.intern(name);
        let span = self.bump().span;
        Some((symbol, span))
    }

    /// Consume an identifier or record an error
    pub(super) fn expect_ident(&mut self, context: &str) -> Option<(Symbol, Span)> {
        let ident = self.ident();
        if ident.is_none() {
            self.error_expected(&format!("identifier for {context}"));
        }
        ident
    }

    /// `a.b.c`, interned as one dotted name
    pub(super) fn parse_qualified_name(&mut self) -> Option<Symbol> {
        let mut text = String::new();
        loop {
            let TokenKind::Ident(segment) = self.current_kind() else {
                self.error_expected("module name");
                return None;
            };
            text.push_str(segment);
            self.bump();
            if self.at_punct(".") && self.ident_at(self.cursor + 1) {
                self.bump();
                text.push('.');
            } else {
                break;
            }
        }
        Some(self.interner.intern(&text))
    }

    /// Index just past the bracket group opening at `pos`
    pub(super) fn skip_balanced(&self, pos: usize) -> Option<usize> {
        let (open, close) = match self.kind_at(pos) {
            TokenKind::Punct("(") => ("(", ")"),
            TokenKind::Punct("[") => ("[", "]"),
            TokenKind::Punct("{") => ("{", "}"),
            _ => return None,
        };
        let mut depth = 0_usize;
        let mut pos = pos;
        loop {
            match self.kind_at(pos) {
                TokenKind::Eof => return None,
                TokenKind::Punct(p) if *p == open => depth += 1,
                TokenKind::Punct(p) if *p == close => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(pos + 1);
                    }
                }
                _ => {}
            }
            pos += 1;
        }
    }

    /// Index just past the type starting at `pos`, without allocating anything
    pub(super) fn skip_type(&self, pos: usize) -> Option<usize> {
        let mut pos = match self.kind_at(pos) {
            TokenKind::Keyword(k) if TypeModifier::from_keyword(k).is_some() => {
                if self.punct_at(pos + 1, "(") {
                    self.skip_balanced(pos + 1)?
                } else {
                    return self.skip_type(pos + 1);
                }
            }
            TokenKind::Keyword(k) if PrimitiveKind::from_keyword(k).is_some() => pos + 1,
            TokenKind::Keyword("typeof") => self.skip_balanced(pos + 1)?,
            TokenKind::Ident(_) => {
                let mut pos = self.skip_type_segment(pos);
                while self.punct_at(pos, ".") && self.ident_at(pos + 1) {
                    pos = self.skip_type_segment(pos + 1);
                }
                pos
            }
            _ => return None,
        };
        loop {
            if self.punct_at(pos, "*") {
                pos += 1;
            } else if self.punct_at(pos, "[") {
                pos = self.skip_balanced(pos)?;
            } else {
                return Some(pos);
            }
        }
    }

    fn skip_type_segment(&self, pos: usize) -> usize {
        let pos = pos + 1;
        if !self.punct_at(pos, "!") {
            return pos;
        }
        if self.punct_at(pos + 1, "(") {
            self.skip_balanced(pos + 1).unwrap_or(pos + 1)
        } else {
            pos + 2
        }
    }

    /// Skip to the end of the current statement or declaration
    pub(super) fn synchronize(&mut self) {
        while !self.is_eof() {
            if self.eat_punct(";") || self.at_punct("}") {
                return;
            }
            if self.at_punct("{") {
                match self.skip_balanced(self.cursor) {
                    Some(end) => self.cursor = end,
                    None => self.cursor = self.tokens.len(),
                }
                return;
            }
            self.bump();
        }
    }
}

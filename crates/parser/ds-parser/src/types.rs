use super::*;
use ds_dom::{Expr, Keyword, Literal, LiteralKind, PrimitiveKind, TemplateArg, TypeModifier, TypeRef, TypeRefId};

impl Parser<'_> {
    /// Basic type followed by any number of `*`, `[]` and `[n]` suffixes
    pub(super) fn parse_type(&mut self) -> Option<TypeRefId> {
        let start = self.start();
        let mut ty = self.parse_basic_type()?;
        loop {
            if self.eat_punct("*") {
                ty = self.builder.alloc_type(TypeRef::Pointer {
                    pointee: ty,
                    span: self.span_from(start),
                });
            } else if self.eat_punct("[") {
                let length = if self.at_punct("]") {
                    None
                } else {
                    self.parse_expression()
                };
                self.expect_punct("]");
                ty = self.builder.alloc_type(TypeRef::Array {
                    element: ty,
                    length,
                    span: self.span_from(start),
                });
            } else {
                return Some(ty);
            }
        }
    }

    fn parse_basic_type(&mut self) -> Option<TypeRefId> {
        let start = self.start();
        let keyword = match self.current_kind() {
            TokenKind::Keyword(k) => Some(*k),
            _ => None,
        };

        if let Some(modifier) = keyword.and_then(TypeModifier::from_keyword) {
            self.bump();
            let parenthesized = self.eat_punct("(");
            let inner = self.parse_type()?;
            if parenthesized {
                self.expect_punct(")");
            }
            return Some(self.builder.alloc_type(TypeRef::Modified {
                modifier,
                inner,
                span: self.span_from(start),
            }));
        }

        if let Some(kind) = keyword.and_then(PrimitiveKind::from_keyword) {
            let span = self.bump().span;
            return Some(self.builder.alloc_type(TypeRef::Primitive { kind, span }));
        }

        if keyword == Some("typeof") {
            self.bump();
            self.expect_punct("(");
            let expr = self.parse_expression()?;
            self.expect_punct(")");
            return Some(self.builder.alloc_type(TypeRef::Typeof {
                expr,
                span: self.span_from(start),
            }));
        }

        // leading `.` names the module scope
        if self.at_punct(".") && self.ident_at(self.cursor + 1) {
            self.bump();
        }

        if !self.ident_at(self.cursor) {
            self.error_expected("type");
            return None;
        }

        let mut ty = self.parse_type_segment()?;
        while self.at_punct(".") && self.ident_at(self.cursor + 1) {
            self.bump();
            let member = self.parse_type_segment()?;
            ty = self.builder.alloc_type(TypeRef::Member {
                base: ty,
                member,
                span: self.span_from(start),
            });
        }
        Some(ty)
    }

    /// `Name` or `Name!(args)`
    fn parse_type_segment(&mut self) -> Option<TypeRefId> {
        let start = self.start();
        let (name, name_span) = self.expect_ident("type")?;
        if self.eat_punct("!") {
            let args = self.parse_template_arguments();
            return Some(self.builder.alloc_type(TypeRef::TemplateInstance {
                name,
                name_span,
                args,
                span: self.span_from(start),
            }));
        }
        Some(self.builder.alloc_type(TypeRef::Identifier {
            name,
            span: name_span,
        }))
    }

    /// Arguments after `!`: a parenthesized list or a single token
    pub(super) fn parse_template_arguments(&mut self) -> Vec<TemplateArg> {
        if !self.eat_punct("(") {
            return self.parse_single_template_argument().into_iter().collect();
        }

        let mut args = Vec::new();
        while !self.at_punct(")") && !self.is_eof() {
            match self.parse_template_argument() {
                Some(arg) => args.push(arg),
                None => break,
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")");
        args
    }

    fn parse_template_argument(&mut self) -> Option<TemplateArg> {
        let is_type = self
            .skip_type(self.cursor)
            .is_some_and(|end| self.punct_at(end, ",") || self.punct_at(end, ")"));
        if is_type {
            self.parse_type().map(TemplateArg::Type)
        } else {
            self.parse_non_assign_expression().map(TemplateArg::Value)
        }
    }

    /// `A!int`, `A!T`, `A!3`, `A!"s"`
    fn parse_single_template_argument(&mut self) -> Option<TemplateArg> {
        let token = self.token_at(self.cursor).clone();
        let value = match token.kind {
            TokenKind::Ident(name) => {
                self.bump();
                let name = self.interner.intern(&name);
                return Some(TemplateArg::Type(self.builder.alloc_type(TypeRef::Identifier {
                    name,
                    span: token.span,
                })));
            }
            TokenKind::Keyword(k) if PrimitiveKind::from_keyword(k).is_some() => {
                return self.parse_basic_type().map(TemplateArg::Type);
            }
            TokenKind::Integer { value, flags } => Expr::Literal {
                literal: Literal {
                    kind: LiteralKind::Integer(value),
                    flags,
                },
                span: token.span,
            },
            TokenKind::Float { value, flags } => Expr::Literal {
                literal: Literal {
                    kind: LiteralKind::Float(value),
                    flags,
                },
                span: token.span,
            },
            TokenKind::Char(ch) => Expr::Literal {
                literal: Literal {
                    kind: LiteralKind::Char(ch),
                    flags: ds_dom::LiteralFlags::empty(),
                },
                span: token.span,
            },
            TokenKind::String(text) => Expr::Literal {
                literal: Literal {
                    kind: LiteralKind::String(text),
                    flags: ds_dom::LiteralFlags::empty(),
                },
                span: token.span,
            },
            TokenKind::Keyword(k) => match keyword_expression(k) {
                Some(keyword) => Expr::Keyword {
                    keyword,
                    span: token.span,
                },
                None => {
                    self.error_expected("template argument");
                    return None;
                }
            },
            TokenKind::Punct(_) | TokenKind::Eof => {
                self.error_expected("template argument");
                return None;
            }
        };
        self.bump();
        Some(TemplateArg::Value(self.builder.alloc_expr(value)))
    }
}

/// Keywords usable as expressions
pub(super) fn keyword_expression(keyword: &str) -> Option<Keyword> {
    Some(match keyword {
        "this" => Keyword::This,
        "super" => Keyword::Super,
        "null" => Keyword::Null,
        "true" => Keyword::True,
        "false" => Keyword::False,
        "__FILE__" => Keyword::File,
        "__LINE__" => Keyword::Line,
        _ => return None,
    })
}

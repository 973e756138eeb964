use super::*;
use crate::types::keyword_expression;
use ds_dom::{BinaryOp, CompoundOp, Expr, ExprId, Keyword, Literal, LiteralFlags, LiteralKind, UnaryOp};

const PREC_ASSIGN: u8 = 1;
const PREC_OROR: u8 = 3;
const PREC_ANDAND: u8 = 5;
const PREC_BITOR: u8 = 7;
const PREC_BITXOR: u8 = 9;
const PREC_BITAND: u8 = 11;
const PREC_COMPARE: u8 = 13;
const PREC_SHIFT: u8 = 15;
const PREC_ADD: u8 = 17;
const PREC_MUL: u8 = 19;

impl Parser<'_> {
    pub(super) fn parse_expression(&mut self) -> Option<ExprId> {
        self.parse_expression_bp(0)
    }

    /// An expression that stops before any assignment operator
    pub(super) fn parse_non_assign_expression(&mut self) -> Option<ExprId> {
        self.parse_expression_bp(PREC_OROR)
    }

    fn parse_expression_bp(&mut self, min_bp: u8) -> Option<ExprId> {
        let start = self.start();
        let mut lhs = self.parse_unary()?;

        while let Some((left_bp, right_bp, op)) = self.infix_binding_power() {
            if left_bp < min_bp {
                break;
            }
            self.bump();
            let rhs = self.parse_expression_bp(right_bp)?;
            lhs = self.builder.alloc_expr(Expr::Binary {
                op,
                left: lhs,
                right: rhs,
                span: self.span_from(start),
            });
        }

        Some(lhs)
    }

    fn infix_binding_power(&self) -> Option<(u8, u8, BinaryOp)> {
        let punct = match self.current_kind() {
            TokenKind::Punct(p) => *p,
            TokenKind::Keyword("is") => return Some((PREC_COMPARE, PREC_COMPARE + 1, BinaryOp::Is)),
            _ => return None,
        };
        let assign = |op| Some((PREC_ASSIGN, PREC_ASSIGN, BinaryOp::CompoundAssign(op)));
        let left = |prec, op| Some((prec, prec + 1, op));
        match punct {
            "=" => Some((PREC_ASSIGN, PREC_ASSIGN, BinaryOp::Assign)),
            "+=" => assign(CompoundOp::Add),
            "-=" => assign(CompoundOp::Sub),
            "*=" => assign(CompoundOp::Mul),
            "/=" => assign(CompoundOp::Div),
            "%=" => assign(CompoundOp::Rem),
            "~=" => assign(CompoundOp::Concat),
            "&=" => assign(CompoundOp::BitAnd),
            "|=" => assign(CompoundOp::BitOr),
            "^=" => assign(CompoundOp::BitXor),
            "<<=" => assign(CompoundOp::Shl),
            ">>=" => assign(CompoundOp::Shr),
            "||" => left(PREC_OROR, BinaryOp::OrOr),
            "&&" => left(PREC_ANDAND, BinaryOp::AndAnd),
            "|" => left(PREC_BITOR, BinaryOp::BitOr),
            "^" => left(PREC_BITXOR, BinaryOp::BitXor),
            "&" => left(PREC_BITAND, BinaryOp::BitAnd),
            "==" => left(PREC_COMPARE, BinaryOp::Eq),
            "!=" => left(PREC_COMPARE, BinaryOp::NotEq),
            "<" => left(PREC_COMPARE, BinaryOp::Lt),
            "<=" => left(PREC_COMPARE, BinaryOp::LtEq),
            ">" => left(PREC_COMPARE, BinaryOp::Gt),
            ">=" => left(PREC_COMPARE, BinaryOp::GtEq),
            "<<" => left(PREC_SHIFT, BinaryOp::Shl),
            ">>" => left(PREC_SHIFT, BinaryOp::Shr),
            ">>>" => left(PREC_SHIFT, BinaryOp::UShr),
            "+" => left(PREC_ADD, BinaryOp::Add),
            "-" => left(PREC_ADD, BinaryOp::Sub),
            "~" => left(PREC_ADD, BinaryOp::Concat),
            "*" => left(PREC_MUL, BinaryOp::Mul),
            "/" => left(PREC_MUL, BinaryOp::Div),
            "%" => left(PREC_MUL, BinaryOp::Rem),
            _ => None,
        }
    }

    fn parse_unary(&mut self) -> Option<ExprId> {
        let start = self.start();
        let op = match self.current_kind() {
            TokenKind::Punct("-") => Some(UnaryOp::Neg),
            TokenKind::Punct("+") => Some(UnaryOp::Plus),
            TokenKind::Punct("!") => Some(UnaryOp::Not),
            TokenKind::Punct("~") => Some(UnaryOp::Complement),
            TokenKind::Punct("*") => Some(UnaryOp::Deref),
            TokenKind::Punct("&") => Some(UnaryOp::AddressOf),
            TokenKind::Punct("++") => Some(UnaryOp::PreIncrement),
            TokenKind::Punct("--") => Some(UnaryOp::PreDecrement),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let operand = self.parse_unary()?;
            return Some(self.builder.alloc_expr(Expr::Unary {
                op,
                operand,
                span: self.span_from(start),
            }));
        }

        if self.eat_keyword("cast") {
            self.expect_punct("(");
            let ty = if self.at_punct(")") {
                None
            } else {
                self.parse_type()
            };
            self.expect_punct(")");
            let operand = self.parse_unary()?;
            return Some(self.builder.alloc_expr(Expr::Cast {
                ty,
                operand,
                span: self.span_from(start),
            }));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Option<ExprId> {
        let start = self.start();
        let mut expr = self.parse_primary()?;

        loop {
            let kind = if self.eat_punct(".") {
                let member = self.parse_member();
                Expr::Access {
                    base: expr,
                    member,
                    span: self.span_from(start),
                }
            } else if self.at_punct("(") {
                let args = self.parse_arguments(")");
                Expr::Call {
                    callee: expr,
                    args,
                    span: self.span_from(start),
                }
            } else if self.at_punct("[") {
                let args = self.parse_arguments("]");
                Expr::Index {
                    base: expr,
                    args,
                    span: self.span_from(start),
                }
            } else if self.at_punct("++") || self.at_punct("--") {
                let op = if self.at_punct("++") {
                    UnaryOp::PostIncrement
                } else {
                    UnaryOp::PostDecrement
                };
                self.bump();
                Expr::Unary {
                    op,
                    operand: expr,
                    span: self.span_from(start),
                }
            } else {
                return Some(expr);
            };
            expr = self.builder.alloc_expr(kind);
        }
    }

    /// The part after `.`; a missing name becomes `Expr::Missing`
    fn parse_member(&mut self) -> ExprId {
        if self.ident_at(self.cursor)
            && let Some(member) = self.parse_name_expression()
        {
            return member;
        }
        self.error_expected("member name");
        let at = self.previous_end();
        self.builder.alloc_expr(Expr::Missing {
            span: Span::empty(at),
        })
    }

    /// `name` or `name!(args)`
    fn parse_name_expression(&mut self) -> Option<ExprId> {
        let start = self.start();
        let (name, name_span) = self.ident()?;
        if self.at_punct("!") && !self.keyword_at(self.cursor + 1, "is") {
            self.bump();
            let args = self.parse_template_arguments();
            return Some(self.builder.alloc_expr(Expr::TemplateInstance {
                name,
                name_span,
                args,
                span: self.span_from(start),
            }));
        }
        Some(self.builder.alloc_expr(Expr::Identifier {
            name,
            span: name_span,
        }))
    }

    /// `(a, b)` or `[a, b]`; the cursor is on the opening bracket
    fn parse_arguments(&mut self, close: &str) -> Vec<ExprId> {
        self.bump();
        let mut args = Vec::new();
        while !self.at_punct(close) && !self.is_eof() {
            match self.parse_expression() {
                Some(arg) => args.push(arg),
                None => break,
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(close);
        args
    }

    fn parse_primary(&mut self) -> Option<ExprId> {
        let start = self.start();
        let token = self.token_at(self.cursor).clone();
        let literal = |kind, flags| Expr::Literal {
            literal: Literal { kind, flags },
            span: token.span,
        };

        let expr = match token.kind {
            TokenKind::Ident(_) => return self.parse_name_expression(),
            TokenKind::Punct(".") if self.ident_at(self.cursor + 1) => {
                self.bump();
                return self.parse_name_expression();
            }
            TokenKind::Integer { value, flags } => literal(LiteralKind::Integer(value), flags),
            TokenKind::Float { value, flags } => literal(LiteralKind::Float(value), flags),
            TokenKind::Char(ch) => literal(LiteralKind::Char(ch), LiteralFlags::empty()),
            TokenKind::String(text) => literal(LiteralKind::String(text), LiteralFlags::empty()),
            TokenKind::Punct("$") => Expr::Keyword {
                keyword: Keyword::Dollar,
                span: token.span,
            },
            TokenKind::Punct("(") => {
                self.bump();
                let inner = self.parse_expression()?;
                self.expect_punct(")");
                return Some(self.builder.alloc_expr(Expr::Paren {
                    inner,
                    span: self.span_from(start),
                }));
            }
            TokenKind::Punct("[") => {
                let elements = self.parse_arguments("]");
                return Some(self.builder.alloc_expr(Expr::ArrayLiteral {
                    elements,
                    span: self.span_from(start),
                }));
            }
            TokenKind::Keyword("new") => {
                self.bump();
                let ty = self.parse_type()?;
                let args = if self.at_punct("(") {
                    self.parse_arguments(")")
                } else {
                    Vec::new()
                };
                return Some(self.builder.alloc_expr(Expr::New {
                    ty,
                    args,
                    span: self.span_from(start),
                }));
            }
            TokenKind::Keyword(k) => match keyword_expression(k) {
                Some(keyword) => Expr::Keyword {
                    keyword,
                    span: token.span,
                },
                None => {
                    self.error_expected("expression");
                    return None;
                }
            },
            TokenKind::Punct(_) | TokenKind::Eof => {
                self.error_expected("expression");
                return None;
            }
        };

        self.bump();
        Some(self.builder.alloc_expr(expr))
    }
}

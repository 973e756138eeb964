use super::*;
use ds_dom::{Attribute, ExprId, Stmt, StmtId, TypeModifier};

impl Parser<'_> {
    /// `{ statements }`
    pub(super) fn parse_block(&mut self) -> StmtId {
        let start = self.start();
        self.expect_punct("{");

        let mut statements = Vec::new();
        while !self.at_punct("}") && !self.is_eof() {
            let before = self.cursor;
            match self.parse_statement() {
                Some(statement) => statements.push(statement),
                None if self.cursor == before => {
                    self.bump();
                    self.synchronize();
                }
                None => {}
            }
        }
        self.expect_punct("}");

        self.builder.alloc_stmt(Stmt::Block {
            statements,
            span: self.span_from(start),
        })
    }

    fn parse_statement(&mut self) -> Option<StmtId> {
        let start = self.start();

        if self.at_punct("{") {
            return Some(self.parse_block());
        }
        if self.eat_punct(";") {
            return None;
        }

        if self.eat_keyword("return") {
            let value = if self.at_punct(";") {
                None
            } else {
                self.parse_expression()
            };
            self.expect_punct(";");
            return Some(self.builder.alloc_stmt(Stmt::Return {
                value,
                span: self.span_from(start),
            }));
        }

        if self.eat_keyword("if") {
            let condition = self.parse_condition()?;
            let then_branch = self.parse_branch();
            let else_branch = self.eat_keyword("else").then(|| self.parse_branch());
            return Some(self.builder.alloc_stmt(Stmt::If {
                condition,
                then_branch,
                else_branch,
                span: self.span_from(start),
            }));
        }

        if self.eat_keyword("while") {
            let condition = self.parse_condition()?;
            let body = self.parse_branch();
            return Some(self.builder.alloc_stmt(Stmt::While {
                condition,
                body,
                span: self.span_from(start),
            }));
        }

        if self.starts_declaration() {
            let decls = self.parse_attributed_declaration(start);
            return Some(self.builder.alloc_stmt(Stmt::Declaration {
                decls,
                span: self.span_from(start),
            }));
        }

        let Some(expr) = self.parse_expression() else {
            self.synchronize();
            return None;
        };
        self.expect_punct(";");
        Some(self.builder.alloc_stmt(Stmt::Expr {
            expr,
            span: self.span_from(start),
        }))
    }

    /// `( expression )` after `if` / `while`
    fn parse_condition(&mut self) -> Option<ExprId> {
        self.expect_punct("(");
        let Some(condition) = self.parse_expression() else {
            self.synchronize();
            return None;
        };
        self.expect_punct(")");
        Some(condition)
    }

    /// A branch statement; an empty one becomes an empty block
    fn parse_branch(&mut self) -> StmtId {
        let start = self.start();
        match self.parse_statement() {
            Some(statement) => statement,
            None => self.builder.alloc_stmt(Stmt::Block {
                statements: Vec::new(),
                span: self.span_from(start),
            }),
        }
    }

    /// Whether the statement at the cursor declares something
    fn starts_declaration(&self) -> bool {
        match self.current_kind() {
            TokenKind::Keyword(
                "class" | "struct" | "interface" | "union" | "template" | "alias" | "import",
            ) => return true,
            TokenKind::Keyword(k)
                if Attribute::from_keyword(k).is_some()
                    && !(TypeModifier::from_keyword(k).is_some() && self.punct_at(self.cursor + 1, "(")) =>
            {
                return true;
            }
            _ => {}
        }

        self.skip_type(self.cursor).is_some_and(|end| {
            self.ident_at(end)
                && ["=", ";", ",", "("]
                    .iter()
                    .any(|punct| self.punct_at(end + 1, punct))
        })
    }
}

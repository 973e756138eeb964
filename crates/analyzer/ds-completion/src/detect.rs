//! Completion-context detection
//!
//! The module is walked in source order and the walk stops at the first node
//! that starts after the caret. The innermost node containing the caret
//! decides what kind of completion applies.

use crate::MemberFilter;
use ds_dom::visitor::{self, Visitor};
use ds_dom::{DeclId, DeclKind, Expr, ExprId, Module, Stmt, StmtId, TypeRefId};
use ds_span::Location;

/// What the caret position asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionContext {
    /// Nothing should be offered (a name being declared)
    None,
    /// Visible symbols of the given kinds
    Symbols {
        /// Accepted declaration kinds
        filter: MemberFilter,
    },
    /// Members of the value or type `base` evaluates to
    MemberAccess {
        /// Expression before the `.`
        base: ExprId,
    },
}

/// Classify the caret position in `module`
pub fn detect_context(module: &Module, caret: Location) -> CompletionContext {
    let mut detector = Detector {
        caret,
        context: CompletionContext::Symbols {
            filter: MemberFilter::TYPES | MemberFilter::TYPE_PARAMETERS,
        },
        decided: false,
        past: false,
    };
    visitor::walk_module(&mut detector, module);
    detector.context
}

struct Detector {
    caret: Location,
    context: CompletionContext,
    decided: bool,
    past: bool,
}

impl Detector {
    fn stopped(&self) -> bool {
        self.decided || self.past
    }

    fn decide(&mut self, context: CompletionContext) {
        self.context = context;
        self.decided = true;
    }

    /// Whether a node starting at `start` is past the caret; stops the walk if so
    fn passes(&mut self, start: Location) -> bool {
        if start > self.caret {
            self.past = true;
        }
        self.past
    }
}

impl Visitor for Detector {
    fn visit_decl(&mut self, module: &Module, id: DeclId) {
        if self.stopped() {
            return;
        }
        let decl = &module.decls[id];
        if id == module.root {
            visitor::walk_decl(self, module, id);
            return;
        }
        if self.passes(decl.span.start) || !decl.span.contains(self.caret) {
            return;
        }
        let naming = decl.name.is_some() && decl.name_span.contains(self.caret);
        match decl.kind {
            DeclKind::TemplateParameter(_) | DeclKind::Variable { ty: None, .. } if naming => {
                self.decide(CompletionContext::None);
            }
            _ => visitor::walk_decl(self, module, id),
        }
    }

    fn visit_type_ref(&mut self, module: &Module, ty: TypeRefId) {
        if self.stopped() {
            return;
        }
        let span = module.types[ty].span();
        if self.passes(span.start) || !span.contains(self.caret) {
            return;
        }
        visitor::walk_type_ref(self, module, ty);
        if !self.stopped() {
            self.decide(CompletionContext::Symbols {
                filter: MemberFilter::TYPES | MemberFilter::TYPE_PARAMETERS,
            });
        }
    }

    fn visit_expr(&mut self, module: &Module, expr: ExprId) {
        if self.stopped() {
            return;
        }
        let span = module.exprs[expr].span();
        if self.passes(span.start) || !span.contains(self.caret) {
            return;
        }
        if let Expr::Access { base, member, .. } = module.exprs[expr] {
            self.visit_expr(module, base);
            if self.stopped() {
                return;
            }
            let member_span = match &module.exprs[member] {
                Expr::Missing { span } => Some(*span),
                other => other.name().map(|(_, span)| span),
            };
            if member_span.is_some_and(|span| span.contains(self.caret)) {
                self.decide(CompletionContext::MemberAccess { base });
                return;
            }
            self.visit_expr(module, member);
        } else {
            visitor::walk_expr(self, module, expr);
        }
        if !self.stopped() {
            self.decide(CompletionContext::Symbols {
                filter: MemberFilter::ALL,
            });
        }
    }

    fn visit_stmt(&mut self, module: &Module, stmt: StmtId) {
        if self.stopped() {
            return;
        }
        let span = module.stmts[stmt].span();
        if self.passes(span.start) || !span.contains(self.caret) {
            return;
        }
        visitor::walk_stmt(self, module, stmt);
        // the walk may have run past the caret; the block still decides
        if !self.decided && matches!(module.stmts[stmt], Stmt::Block { .. }) {
            self.decide(CompletionContext::Symbols {
                filter: MemberFilter::ALL,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ds_intern::Interner;

    const SOURCE: &str = "\
module detect;

class Box(T) {
    T value;
    auto copy = value;
    int size() {
        int local = 3;

        return local + size();
    }
}

void use(Box!int b) {
    b.value;
    b.
}
";

    fn detect(line: u32, column: u32) -> CompletionContext {
        let interner = Interner::new();
        let output = ds_parser::parse_module(SOURCE, "detect.d", &interner);
        detect_context(&output.module, Location::new(line, column))
    }

    fn filter(context: CompletionContext) -> MemberFilter {
        match context {
            CompletionContext::Symbols { filter } => filter,
            other => panic!("expected symbols, got {other:?}"),
        }
    }

    #[test]
    fn test_declaration_block_offers_types() {
        assert_eq!(
            filter(detect(4, 5)),
            MemberFilter::TYPES | MemberFilter::TYPE_PARAMETERS
        );
        // between members
        assert_eq!(
            filter(detect(6, 1)),
            MemberFilter::TYPES | MemberFilter::TYPE_PARAMETERS
        );
    }

    #[test]
    fn test_function_body_offers_everything() {
        // blank line inside the body
        assert_eq!(filter(detect(8, 1)), MemberFilter::ALL);
        // inside `local` in the return expression
        assert_eq!(filter(detect(9, 18)), MemberFilter::ALL);
        // initializer
        assert_eq!(filter(detect(5, 17)), MemberFilter::ALL);
    }

    #[test]
    fn test_names_being_declared_offer_nothing() {
        assert_eq!(detect(3, 11), CompletionContext::None);
        assert_eq!(detect(5, 11), CompletionContext::None);
    }

    #[test]
    fn test_member_access() {
        let CompletionContext::MemberAccess { base } = detect(14, 7) else {
            panic!("expected member access");
        };
        let CompletionContext::MemberAccess { base: incomplete } = detect(15, 7) else {
            panic!("expected member access on incomplete input");
        };
        assert_ne!(base, incomplete);
        // on the receiver itself
        assert_eq!(filter(detect(14, 5)), MemberFilter::ALL);
    }
}

//! Declaration-model visitor infrastructure
//!
//! Every `visit_*` method defaults to the matching `walk_*` function, which
//! recurses into all children in source order. Scope-opening nodes are
//! bracketed by `enter_scope`/`exit_scope` so a walker can keep a context
//! stack in sync with the traversal.

use crate::{
    Decl, DeclId, DeclKind, Expr, ExprId, Module, ScopeNode, Stmt, StmtId, TemplateArg,
    TemplateParameter, TypeRef, TypeRefId,
};

/// Visitor over a module's declarations, types, expressions and statements
pub trait Visitor {
    /// Visit a declaration
    fn visit_decl(&mut self, module: &Module, decl: DeclId) {
        walk_decl(self, module, decl);
    }

    /// Visit a type expression
    fn visit_type_ref(&mut self, module: &Module, ty: TypeRefId) {
        walk_type_ref(self, module, ty);
    }

    /// Visit an expression
    fn visit_expr(&mut self, module: &Module, expr: ExprId) {
        walk_expr(self, module, expr);
    }

    /// Visit a statement
    fn visit_stmt(&mut self, module: &Module, stmt: StmtId) {
        walk_stmt(self, module, stmt);
    }

    /// Called before the children of a scope-opening node
    fn enter_scope(&mut self, _module: &Module, _scope: ScopeNode) {}

    /// Called after the children of a scope-opening node
    fn exit_scope(&mut self, _module: &Module, _scope: ScopeNode) {}
}

/// Walk a whole module starting at its root declaration
pub fn walk_module<V: Visitor + ?Sized>(visitor: &mut V, module: &Module) {
    visitor.visit_decl(module, module.root);
}

fn visit_template_args<V: Visitor + ?Sized>(visitor: &mut V, module: &Module, args: &[TemplateArg]) {
    for arg in args {
        match *arg {
            TemplateArg::Type(ty) => visitor.visit_type_ref(module, ty),
            TemplateArg::Value(expr) => visitor.visit_expr(module, expr),
        }
    }
}

fn visit_template_parameters<V: Visitor + ?Sized>(visitor: &mut V, module: &Module, decl: &Decl) {
    for &parameter in &decl.template_parameters {
        visitor.visit_decl(module, parameter);
    }
}

/// Recurse into the children of a declaration
pub fn walk_decl<V: Visitor + ?Sized>(visitor: &mut V, module: &Module, id: DeclId) {
    let decl = &module.decls[id];
    match &decl.kind {
        DeclKind::Module { members } => {
            visitor.enter_scope(module, ScopeNode::Decl(id));
            for &member in members {
                visitor.visit_decl(module, member);
            }
            visitor.exit_scope(module, ScopeNode::Decl(id));
        }
        DeclKind::Aggregate { bases, members, .. } => {
            visitor.enter_scope(module, ScopeNode::Decl(id));
            visit_template_parameters(visitor, module, decl);
            for &base in bases {
                visitor.visit_type_ref(module, base);
            }
            for &member in members {
                visitor.visit_decl(module, member);
            }
            visitor.exit_scope(module, ScopeNode::Decl(id));
        }
        DeclKind::Function {
            parameters,
            return_type,
            body,
        } => {
            visitor.enter_scope(module, ScopeNode::Decl(id));
            if let Some(return_type) = return_type {
                visitor.visit_type_ref(module, *return_type);
            }
            visit_template_parameters(visitor, module, decl);
            for &parameter in parameters {
                visitor.visit_decl(module, parameter);
            }
            if let Some(body) = body {
                visitor.visit_stmt(module, *body);
            }
            visitor.exit_scope(module, ScopeNode::Decl(id));
        }
        DeclKind::Variable { ty, initializer } => {
            if let Some(ty) = ty {
                visitor.visit_type_ref(module, *ty);
            }
            if let Some(initializer) = initializer {
                visitor.visit_expr(module, *initializer);
            }
        }
        DeclKind::Alias { target } => visitor.visit_type_ref(module, *target),
        DeclKind::TemplateParameter(parameter) => match parameter {
            TemplateParameter::Type {
                constraint,
                default,
            } => {
                for ty in [constraint, default].into_iter().flatten() {
                    visitor.visit_type_ref(module, *ty);
                }
            }
            TemplateParameter::Value {
                ty,
                specialization,
                default,
            } => {
                visitor.visit_type_ref(module, *ty);
                for expr in [specialization, default].into_iter().flatten() {
                    visitor.visit_expr(module, *expr);
                }
            }
            TemplateParameter::Alias { default } => {
                if let Some(default) = default {
                    visitor.visit_type_ref(module, *default);
                }
            }
        },
    }
}

/// Recurse into the children of a type expression
pub fn walk_type_ref<V: Visitor + ?Sized>(visitor: &mut V, module: &Module, id: TypeRefId) {
    match &module.types[id] {
        TypeRef::Primitive { .. } | TypeRef::Identifier { .. } => {}
        TypeRef::TemplateInstance { args, .. } => visit_template_args(visitor, module, args),
        TypeRef::Member { base, member, .. } => {
            visitor.visit_type_ref(module, *base);
            visitor.visit_type_ref(module, *member);
        }
        TypeRef::Pointer { pointee: inner, .. } | TypeRef::Modified { inner, .. } => {
            visitor.visit_type_ref(module, *inner);
        }
        TypeRef::Array { element, length, .. } => {
            visitor.visit_type_ref(module, *element);
            if let Some(length) = length {
                visitor.visit_expr(module, *length);
            }
        }
        TypeRef::Typeof { expr, .. } => visitor.visit_expr(module, *expr),
    }
}

/// Recurse into the children of an expression
pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, module: &Module, id: ExprId) {
    match &module.exprs[id] {
        Expr::Literal { .. } | Expr::Identifier { .. } | Expr::Keyword { .. } | Expr::Missing { .. } => {}
        Expr::TemplateInstance { args, .. } => visit_template_args(visitor, module, args),
        Expr::Access { base, member, .. } => {
            visitor.visit_expr(module, *base);
            visitor.visit_expr(module, *member);
        }
        Expr::Call { callee: base, args, .. } | Expr::Index { base, args, .. } => {
            visitor.visit_expr(module, *base);
            for &arg in args {
                visitor.visit_expr(module, arg);
            }
        }
        Expr::New { ty, args, .. } => {
            visitor.visit_type_ref(module, *ty);
            for &arg in args {
                visitor.visit_expr(module, arg);
            }
        }
        Expr::Binary { left, right, .. } => {
            visitor.visit_expr(module, *left);
            visitor.visit_expr(module, *right);
        }
        Expr::Unary { operand: inner, .. } | Expr::Paren { inner, .. } => {
            visitor.visit_expr(module, *inner);
        }
        Expr::ArrayLiteral { elements, .. } => {
            for &element in elements {
                visitor.visit_expr(module, element);
            }
        }
        Expr::Cast { ty, operand, .. } => {
            if let Some(ty) = ty {
                visitor.visit_type_ref(module, *ty);
            }
            visitor.visit_expr(module, *operand);
        }
    }
}

/// Recurse into the children of a statement
pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, module: &Module, id: StmtId) {
    match &module.stmts[id] {
        Stmt::Block { statements, .. } => {
            visitor.enter_scope(module, ScopeNode::Block(id));
            for &statement in statements {
                visitor.visit_stmt(module, statement);
            }
            visitor.exit_scope(module, ScopeNode::Block(id));
        }
        Stmt::Declaration { decls, .. } => {
            for &decl in decls {
                visitor.visit_decl(module, decl);
            }
        }
        Stmt::Expr { expr, .. } => visitor.visit_expr(module, *expr),
        Stmt::Return { value, .. } => {
            if let Some(value) = value {
                visitor.visit_expr(module, *value);
            }
        }
        Stmt::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            visitor.visit_expr(module, *condition);
            visitor.visit_stmt(module, *then_branch);
            if let Some(else_branch) = else_branch {
                visitor.visit_stmt(module, *else_branch);
            }
        }
        Stmt::While { condition, body, .. } => {
            visitor.visit_expr(module, *condition);
            visitor.visit_stmt(module, *body);
        }
    }
}

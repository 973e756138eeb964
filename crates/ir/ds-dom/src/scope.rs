//! Scope index and module construction

use crate::{Decl, DeclId, DeclKind, Expr, ExprId, Import, Module, Stmt, StmtId, TypeRef, TypeRefId};
use ds_intern::Symbol;
use ds_span::Span;
use indexmap::IndexMap;
use la_arena::Arena;
use rustc_hash::{FxBuildHasher, FxHashMap};
use serde::{Deserialize, Serialize};

/// A node that opens a scope
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum ScopeNode {
    /// Module, aggregate or function declaration
    Decl(DeclId),
    /// Block statement
    Block(StmtId),
}

/// Kind of scope
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ScopeKind {
    /// Module level
    Module,
    /// Class, struct, interface, union or template body
    Aggregate,
    /// Function parameters and template parameters
    Function,
    /// Statement block; the only kind where declaration order matters
    Block,
}

/// Names declared directly in one scope
///
/// Each name maps to its overload set in declaration order. Template
/// parameters of the owning declaration come before its members.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Kind of scope
    pub kind: ScopeKind,
    /// Enclosing scope
    pub parent: Option<ScopeNode>,
    /// Region of source the scope covers
    pub span: Span,
    entries: IndexMap<Symbol, Vec<DeclId>, FxBuildHasher>,
    pub(crate) children: Vec<ScopeNode>,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeNode>, span: Span) -> Self {
        Self {
            kind,
            parent,
            span,
            entries: IndexMap::default(),
            children: Vec::new(),
        }
    }

    /// Overload set declared under `name`
    pub fn get(&self, name: Symbol) -> &[DeclId] {
        self.entries.get(&name).map_or(&[], Vec::as_slice)
    }

    /// Names with their overload sets, in first-declaration order
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &[DeclId])> {
        self.entries.iter().map(|(name, decls)| (*name, decls.as_slice()))
    }

    /// Every declaration in the scope
    pub fn declarations(&self) -> impl Iterator<Item = DeclId> + '_ {
        self.entries.values().flatten().copied()
    }

    /// Directly nested scopes in source order
    pub fn children(&self) -> &[ScopeNode] {
        &self.children
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is declared here
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Incrementally builds a [`Module`]
///
/// Nodes are allocated bottom-up; [`ModuleBuilder::finish`] wires parent
/// links and computes the scope index.
#[derive(Debug)]
pub struct ModuleBuilder {
    name: Symbol,
    file_name: String,
    decls: Arena<Decl>,
    types: Arena<TypeRef>,
    exprs: Arena<Expr>,
    stmts: Arena<Stmt>,
    imports: Vec<Import>,
}

impl ModuleBuilder {
    /// Start a module
    pub fn new(name: Symbol, file_name: impl Into<String>) -> Self {
        Self {
            name,
            file_name: file_name.into(),
            decls: Arena::new(),
            types: Arena::new(),
            exprs: Arena::new(),
            stmts: Arena::new(),
            imports: Vec::new(),
        }
    }

    /// Rename the module (after reading a `module a.b;` header)
    pub fn set_name(&mut self, name: Symbol) {
        self.name = name;
    }

    /// Allocate a declaration
    pub fn alloc_decl(&mut self, decl: Decl) -> DeclId {
        self.decls.alloc(decl)
    }

    /// Allocate a type expression
    pub fn alloc_type(&mut self, ty: TypeRef) -> TypeRefId {
        self.types.alloc(ty)
    }

    /// Allocate an expression
    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        self.exprs.alloc(expr)
    }

    /// Allocate a statement
    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        self.stmts.alloc(stmt)
    }

    /// Declaration allocated earlier
    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id]
    }

    /// Mutable access to a declaration allocated earlier
    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id]
    }

    /// Type expression allocated earlier
    pub fn type_ref(&self, id: TypeRefId) -> &TypeRef {
        &self.types[id]
    }

    /// Expression allocated earlier
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }

    /// Record an import
    pub fn add_import(&mut self, import: Import) {
        self.imports.push(import);
    }

    /// Create the root declaration over `members` and index all scopes
    pub fn finish(mut self, members: Vec<DeclId>, span: Span) -> Module {
        let root = self.decls.alloc(Decl::new(
            Some(self.name),
            Span::empty(span.start),
            span,
            DeclKind::Module { members },
        ));

        let mut indexer = Indexer {
            decls: &self.decls,
            stmts: &self.stmts,
            scopes: FxHashMap::default(),
            declared_in: FxHashMap::default(),
            parents: Vec::new(),
        };
        indexer.index_decl(root, None, None);
        let Indexer {
            scopes,
            declared_in,
            parents,
            ..
        } = indexer;

        for (child, parent) in parents {
            self.decls[child].parent = Some(parent);
        }

        Module {
            name: self.name,
            file_name: self.file_name,
            root,
            decls: self.decls,
            types: self.types,
            exprs: self.exprs,
            stmts: self.stmts,
            imports: self.imports,
            scopes,
            declared_in,
        }
    }
}

struct Indexer<'a> {
    decls: &'a Arena<Decl>,
    stmts: &'a Arena<Stmt>,
    scopes: FxHashMap<ScopeNode, Scope>,
    declared_in: FxHashMap<DeclId, ScopeNode>,
    parents: Vec<(DeclId, DeclId)>,
}

impl Indexer<'_> {
    fn open(&mut self, node: ScopeNode, kind: ScopeKind, parent: Option<ScopeNode>, span: Span) {
        self.scopes.insert(node, Scope::new(kind, parent, span));
        if let Some(parent_scope) = parent.and_then(|p| self.scopes.get_mut(&p)) {
            parent_scope.children.push(node);
        }
    }

    fn declare(&mut self, scope: ScopeNode, decl: DeclId) {
        self.declared_in.insert(decl, scope);
        if let Some(name) = self.decls[decl].name
            && let Some(target) = self.scopes.get_mut(&scope)
        {
            target.entries.entry(name).or_default().push(decl);
        }
    }

    fn index_decl(&mut self, id: DeclId, owner: Option<DeclId>, parent: Option<ScopeNode>) {
        if let Some(owner) = owner {
            self.parents.push((id, owner));
        }

        let decls = self.decls;
        let decl = &decls[id];
        let (kind, children) = match &decl.kind {
            DeclKind::Module { members } => (ScopeKind::Module, members.as_slice()),
            DeclKind::Aggregate { members, .. } => (ScopeKind::Aggregate, members.as_slice()),
            DeclKind::Function { parameters, .. } => (ScopeKind::Function, parameters.as_slice()),
            DeclKind::Variable { .. } | DeclKind::Alias { .. } | DeclKind::TemplateParameter(_) => {
                return;
            }
        };

        let node = ScopeNode::Decl(id);
        self.open(node, kind, parent, decl.span);
        for &parameter in &decl.template_parameters {
            self.declare(node, parameter);
            self.parents.push((parameter, id));
        }
        for &child in children {
            self.declare(node, child);
        }
        for &child in children {
            self.index_decl(child, Some(id), Some(node));
        }
        if let DeclKind::Function { body: Some(body), .. } = decl.kind {
            self.index_stmt(body, id, node);
        }
    }

    fn index_stmt(&mut self, id: StmtId, owner: DeclId, scope: ScopeNode) {
        let stmts = self.stmts;
        match &stmts[id] {
            Stmt::Block { statements, span } => {
                let node = ScopeNode::Block(id);
                self.open(node, ScopeKind::Block, Some(scope), *span);
                for &statement in statements {
                    self.index_stmt(statement, owner, node);
                }
            }
            Stmt::Declaration { decls, .. } => {
                for &decl in decls {
                    self.declare(scope, decl);
                    self.index_decl(decl, Some(owner), Some(scope));
                }
            }
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.index_stmt(*then_branch, owner, scope);
                if let Some(else_branch) = else_branch {
                    self.index_stmt(*else_branch, owner, scope);
                }
            }
            Stmt::While { body, .. } => self.index_stmt(*body, owner, scope),
            Stmt::Expr { .. } | Stmt::Return { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AggregateKind, TemplateParameter};
    use ds_intern::Interner;
    use ds_span::Location;

    fn span(line: u32, start: u32, end: u32) -> Span {
        Span::new(Location::new(line, start), Location::new(line, end))
    }

    /// `class A(T) { int x; void f() { int y; } }`
    fn build(interner: &Interner) -> (Module, [DeclId; 5], StmtId) {
        let mut builder = ModuleBuilder::new(interner.intern("m"), "m.d");
        let t = builder.alloc_decl(Decl::new(
            Some(interner.intern("T")),
            span(1, 9, 10),
            span(1, 9, 10),
            DeclKind::TemplateParameter(TemplateParameter::Type {
                constraint: None,
                default: None,
            }),
        ));
        let x = builder.alloc_decl(Decl::new(
            Some(interner.intern("x")),
            span(1, 18, 19),
            span(1, 14, 20),
            DeclKind::Variable {
                ty: None,
                initializer: None,
            },
        ));
        let y = builder.alloc_decl(Decl::new(
            Some(interner.intern("y")),
            span(1, 36, 37),
            span(1, 32, 38),
            DeclKind::Variable {
                ty: None,
                initializer: None,
            },
        ));
        let decl_stmt = builder.alloc_stmt(Stmt::Declaration {
            decls: vec![y],
            span: span(1, 32, 38),
        });
        let body = builder.alloc_stmt(Stmt::Block {
            statements: vec![decl_stmt],
            span: span(1, 30, 40),
        });
        let f = builder.alloc_decl(Decl::new(
            Some(interner.intern("f")),
            span(1, 26, 27),
            span(1, 21, 40),
            DeclKind::Function {
                parameters: Vec::new(),
                return_type: None,
                body: Some(body),
            },
        ));
        let mut class = Decl::new(
            Some(interner.intern("A")),
            span(1, 7, 8),
            span(1, 1, 42),
            DeclKind::Aggregate {
                kind: AggregateKind::Class,
                bases: Vec::new(),
                members: vec![x, f],
            },
        );
        class.template_parameters.push(t);
        let a = builder.alloc_decl(class);
        let module = builder.finish(vec![a], span(1, 1, 42));
        (module, [a, t, x, f, y], body)
    }

    #[test]
    fn test_parents_and_enclosing_scopes() {
        let interner = Interner::new();
        let (module, [a, t, x, f, y], body) = build(&interner);

        assert_eq!(module.decls[a].parent, Some(module.root));
        assert_eq!(module.decls[t].parent, Some(a));
        assert_eq!(module.decls[x].parent, Some(a));
        assert_eq!(module.decls[y].parent, Some(f));

        assert_eq!(
            module.enclosing_scopes(y),
            vec![
                module.root_scope(),
                ScopeNode::Decl(a),
                ScopeNode::Decl(f),
                ScopeNode::Block(body)
            ]
        );
        assert_eq!(module.scopes_inside(a), vec![module.root_scope(), ScopeNode::Decl(a)]);
    }

    #[test]
    fn test_template_parameters_precede_members() {
        let interner = Interner::new();
        let (module, [a, t, x, f, _], _) = build(&interner);

        let scope = module.scope(ScopeNode::Decl(a)).unwrap();
        assert_eq!(scope.kind, ScopeKind::Aggregate);
        assert_eq!(scope.declarations().collect::<Vec<_>>(), vec![t, x, f]);
        assert_eq!(scope.get(interner.intern("x")), &[x]);
        assert!(scope.get(interner.intern("y")).is_empty());
    }

    #[test]
    fn test_scope_chain_at_caret() {
        let interner = Interner::new();
        let (module, [a, _, _, f, _], body) = build(&interner);

        assert_eq!(
            module.scope_chain_at(Location::new(1, 35)),
            vec![
                module.root_scope(),
                ScopeNode::Decl(a),
                ScopeNode::Decl(f),
                ScopeNode::Block(body)
            ]
        );
        assert_eq!(
            module.scope_chain_at(Location::new(1, 15)),
            vec![module.root_scope(), ScopeNode::Decl(a)]
        );
    }
}

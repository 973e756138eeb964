//! Declaration model
//!
//! A parsed module is a set of arenas (declarations, type expressions,
//! expressions, statements) plus a precomputed scope index. Nodes refer to
//! each other by arena index; a declaration's `parent` is a plain index back
//! into the same arena and never owns anything.

mod expr;
mod scope;
mod types;
pub mod visitor;

pub use expr::{
    BinaryOp, CompoundOp, Expr, Keyword, Literal, LiteralFlags, LiteralKind, Stmt, UnaryOp,
};
pub use scope::{ModuleBuilder, Scope, ScopeKind, ScopeNode};
pub use types::{PrimitiveKind, TemplateArg, TypeModifier, TypeRef};

use ds_intern::Symbol;
use ds_span::{Location, Span};
use la_arena::{Arena, Idx};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Declaration ID
pub type DeclId = Idx<Decl>;
/// Type expression ID
pub type TypeRefId = Idx<TypeRef>;
/// Expression ID
pub type ExprId = Idx<Expr>;
/// Statement ID
pub type StmtId = Idx<Stmt>;

/// Identity of a module inside a module cache
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ModuleId(pub u32);

/// Workspace-wide identity of a declaration
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct DeclRef {
    /// Owning module
    pub module: ModuleId,
    /// Declaration inside that module
    pub decl: DeclId,
}

impl DeclRef {
    /// Create a declaration reference
    pub const fn new(module: ModuleId, decl: DeclId) -> Self {
        Self { module, decl }
    }
}

/// Import visibility
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ImportVisibility {
    /// Re-exported to modules importing this one
    Public,
    /// Only visible inside the importing module
    Private,
}

/// `import a.b;`, `public import a.b;` or `import a.b : x, y;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Fully qualified module name
    pub module: Symbol,
    /// Visibility of the import
    pub visibility: ImportVisibility,
    /// Selected names; empty imports everything
    pub selective: Vec<Symbol>,
    /// Source location
    pub span: Span,
}

impl Import {
    /// Whether `name` is brought in by this import
    pub fn exposes(&self, name: Symbol) -> bool {
        self.selective.is_empty() || self.selective.contains(&name)
    }
}

/// Declaration attributes and protection levels
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Attribute {
    /// `static`
    Static,
    /// `const`
    Const,
    /// `immutable`
    Immutable,
    /// `shared`
    Shared,
    /// `auto`
    Auto,
    /// `override`
    Override,
    /// `abstract`
    Abstract,
    /// `final`
    Final,
    /// `public`
    Public,
    /// `private`
    Private,
    /// `protected`
    Protected,
    /// `package`
    Package,
}

impl Attribute {
    /// Parse an attribute keyword
    pub fn from_keyword(text: &str) -> Option<Self> {
        Some(match text {
            "static" => Self::Static,
            "const" => Self::Const,
            "immutable" => Self::Immutable,
            "shared" => Self::Shared,
            "auto" => Self::Auto,
            "override" => Self::Override,
            "abstract" => Self::Abstract,
            "final" => Self::Final,
            "public" => Self::Public,
            "private" => Self::Private,
            "protected" => Self::Protected,
            "package" => Self::Package,
            _ => return None,
        })
    }
}

/// Flavour of an aggregate declaration
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum AggregateKind {
    /// `class`
    Class,
    /// `struct`
    Struct,
    /// `interface`
    Interface,
    /// `union`
    Union,
    /// `template` (a named scope of declarations)
    Template,
}

/// The three template parameter flavours
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateParameter {
    /// `T`, `T : Base`, `T = Default`
    Type {
        /// Required base type or pattern
        constraint: Option<TypeRefId>,
        /// Default argument
        default: Option<TypeRefId>,
    },
    /// `int u`, `int u : 1`, `int u = 1`
    Value {
        /// Declared type of the value
        ty: TypeRefId,
        /// Literal the argument must equal
        specialization: Option<ExprId>,
        /// Default argument
        default: Option<ExprId>,
    },
    /// `alias A`
    Alias {
        /// Default symbol
        default: Option<TypeRefId>,
    },
}

/// What a declaration declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
    /// The module itself (root declaration)
    Module {
        /// Top-level declarations
        members: Vec<DeclId>,
    },
    /// Class, struct, interface, union or template
    Aggregate {
        /// Flavour
        kind: AggregateKind,
        /// Base classes and interfaces in order
        bases: Vec<TypeRefId>,
        /// Member declarations
        members: Vec<DeclId>,
    },
    /// Function or method
    Function {
        /// Parameter declarations
        parameters: Vec<DeclId>,
        /// Declared return type; `None` for `auto`/inferred
        return_type: Option<TypeRefId>,
        /// Body block
        body: Option<StmtId>,
    },
    /// Variable, field or parameter
    Variable {
        /// Declared type; `None` for `auto`
        ty: Option<TypeRefId>,
        /// Initializer
        initializer: Option<ExprId>,
    },
    /// `alias Target Name;` or `alias Name = Target;`
    Alias {
        /// Aliased type expression
        target: TypeRefId,
    },
    /// A template parameter (also a declaration so the body can refer to it)
    TemplateParameter(TemplateParameter),
}

/// A declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    /// Declared name; anonymous declarations have none
    pub name: Option<Symbol>,
    /// Location of the name
    pub name_span: Span,
    /// Location of the whole declaration
    pub span: Span,
    /// Enclosing declaration (non-owning back-reference)
    pub parent: Option<DeclId>,
    /// Attributes in source order
    pub attributes: Vec<Attribute>,
    /// Template parameters in declaration order
    pub template_parameters: Vec<DeclId>,
    /// What this declares
    pub kind: DeclKind,
}

impl Decl {
    /// A declaration without parent, attributes or template parameters
    pub fn new(name: Option<Symbol>, name_span: Span, span: Span, kind: DeclKind) -> Self {
        Self {
            name,
            name_span,
            span,
            parent: None,
            attributes: Vec::new(),
            template_parameters: Vec::new(),
            kind,
        }
    }

    /// Whether the declaration carries `attribute`
    pub fn has_attribute(&self, attribute: Attribute) -> bool {
        self.attributes.contains(&attribute)
    }

    /// Whether the declaration has a template parameter list
    pub fn is_template(&self) -> bool {
        !self.template_parameters.is_empty()
    }

    /// Members of a module or aggregate
    pub fn members(&self) -> &[DeclId] {
        match &self.kind {
            DeclKind::Module { members } | DeclKind::Aggregate { members, .. } => members,
            _ => &[],
        }
    }

    /// Aggregate flavour, if this is an aggregate
    pub const fn aggregate_kind(&self) -> Option<AggregateKind> {
        match &self.kind {
            DeclKind::Aggregate { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether the value of this variable is fixed at compile time
    pub fn is_manifest_constant(&self) -> bool {
        matches!(self.kind, DeclKind::Variable { .. })
            && (self.has_attribute(Attribute::Const) || self.has_attribute(Attribute::Immutable))
    }
}

/// A parsed module
#[derive(Debug, Clone)]
pub struct Module {
    /// Fully qualified module name
    pub name: Symbol,
    /// File the module was parsed from
    pub file_name: String,
    /// The module declaration
    pub root: DeclId,
    /// Declarations
    pub decls: Arena<Decl>,
    /// Type expressions
    pub types: Arena<TypeRef>,
    /// Expressions
    pub exprs: Arena<Expr>,
    /// Statements
    pub stmts: Arena<Stmt>,
    /// Imports in source order
    pub imports: Vec<Import>,
    scopes: FxHashMap<ScopeNode, Scope>,
    declared_in: FxHashMap<DeclId, ScopeNode>,
}

impl Module {
    /// Scope data for `node`
    pub fn scope(&self, node: ScopeNode) -> Option<&Scope> {
        self.scopes.get(&node)
    }

    /// The module-level scope
    pub const fn root_scope(&self) -> ScopeNode {
        ScopeNode::Decl(self.root)
    }

    /// The scope `decl` is declared in
    pub fn declared_in(&self, decl: DeclId) -> Option<ScopeNode> {
        self.declared_in.get(&decl).copied()
    }

    /// Scopes in effect at a declaration, outermost first
    ///
    /// These are the scopes its type, initializer or aliased target are
    /// resolved in.
    pub fn enclosing_scopes(&self, decl: DeclId) -> Vec<ScopeNode> {
        let mut chain = Vec::new();
        let mut current = self.declared_in(decl);
        while let Some(node) = current {
            chain.push(node);
            current = self.scopes.get(&node).and_then(|scope| scope.parent);
        }
        chain.reverse();
        chain
    }

    /// `enclosing_scopes(decl)` plus the declaration's own scope, if it opens one
    pub fn scopes_inside(&self, decl: DeclId) -> Vec<ScopeNode> {
        let mut chain = self.enclosing_scopes(decl);
        let own = ScopeNode::Decl(decl);
        if self.scopes.contains_key(&own) {
            chain.push(own);
        }
        chain
    }

    /// Scopes containing `location`, from the module scope down to the innermost
    pub fn scope_chain_at(&self, location: Location) -> Vec<ScopeNode> {
        let mut chain = vec![self.root_scope()];
        let mut current = self.root_scope();
        while let Some(next) = self.scopes.get(&current).and_then(|scope| {
            scope
                .children
                .iter()
                .copied()
                .find(|child| self.scopes.get(child).is_some_and(|s| s.span.contains(location)))
        }) {
            chain.push(next);
            current = next;
        }
        chain
    }

    /// Every declaration named `name`, in arena order
    pub fn declarations_named(&self, name: Symbol) -> impl Iterator<Item = DeclId> + '_ {
        self.decls
            .iter()
            .filter(move |(_, decl)| decl.name == Some(name))
            .map(|(id, _)| id)
    }

    /// The declaration whose name is written at `location`
    pub fn declaration_at(&self, location: Location) -> Option<DeclId> {
        self.decls
            .iter()
            .filter(|(id, decl)| *id != self.root && decl.name.is_some())
            .find(|(_, decl)| decl.name_span.contains(location))
            .map(|(id, _)| id)
    }

    /// The declaration `decl` is the eponymous member of, if any
    ///
    /// `template A(T) { class A {} }`: the class is eponymous and the
    /// template is what its name refers to from outside.
    pub fn eponymous_template(&self, decl: DeclId) -> Option<DeclId> {
        let parent = self.decls[decl].parent?;
        let parent_decl = &self.decls[parent];
        (parent_decl.aggregate_kind() == Some(AggregateKind::Template)
            && parent_decl.name.is_some()
            && parent_decl.name == self.decls[decl].name)
            .then_some(parent)
    }
}

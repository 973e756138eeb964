//! Expressions and statements

use crate::{DeclId, ExprId, StmtId, TemplateArg, TypeRefId};
use bitflags::bitflags;
use ds_intern::Symbol;
use ds_span::Span;
use std::fmt;

bitflags! {
    /// Literal suffixes folded into the literal's type
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LiteralFlags: u8 {
        /// `u` / `U`
        const UNSIGNED = 1 << 0;
        /// `L` on an integer
        const LONG = 1 << 1;
        /// `f` / `F`
        const FLOAT = 1 << 2;
        /// `L` on a floating point literal
        const REAL = 1 << 3;
        /// `i`
        const IMAGINARY = 1 << 4;
    }
}

/// Raw literal payload
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralKind {
    /// `'c'`
    Char(char),
    /// `42`, `0x2A`, `42UL`
    Integer(u64),
    /// `1.5`, `1.5f`, `2i`
    Float(f64),
    /// `"text"`
    String(String),
}

/// A literal with its suffix flags
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    /// Payload
    pub kind: LiteralKind,
    /// Suffixes
    pub flags: LiteralFlags,
}

impl Literal {
    /// An integer literal without suffix
    pub const fn int(value: u64) -> Self {
        Self {
            kind: LiteralKind::Integer(value),
            flags: LiteralFlags::empty(),
        }
    }
}

/// Keyword expressions
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// `this`
    This,
    /// `super`
    Super,
    /// `null`
    Null,
    /// `true`
    True,
    /// `false`
    False,
    /// `$` inside an index expression
    Dollar,
    /// `__FILE__`
    File,
    /// `__LINE__`
    Line,
}

/// Binary operators, including assignments
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `~`
    Concat,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `is`
    Is,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `>>>`
    UShr,
    /// `=`
    Assign,
    /// `op=` for any arithmetic, bitwise or concatenation operator
    CompoundAssign(CompoundOp),
}

/// Operator part of a compound assignment
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompoundOp {
    /// `+=`
    Add,
    /// `-=`
    Sub,
    /// `*=`
    Mul,
    /// `/=`
    Div,
    /// `%=`
    Rem,
    /// `~=`
    Concat,
    /// `&=`
    BitAnd,
    /// `|=`
    BitOr,
    /// `^=`
    BitXor,
    /// `<<=`
    Shl,
    /// `>>=`
    Shr,
}

impl BinaryOp {
    /// `=` and every `op=`
    pub const fn is_assignment(self) -> bool {
        matches!(self, Self::Assign | Self::CompoundAssign(_))
    }

    /// Operators producing `bool`
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq | Self::Is
        )
    }

    /// `&&` and `||`
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::AndAnd | Self::OrOr)
    }

    /// Source spelling
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Concat => "~",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Is => "is",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::UShr => ">>>",
            Self::Assign => "=",
            Self::CompoundAssign(op) => match op {
                CompoundOp::Add => "+=",
                CompoundOp::Sub => "-=",
                CompoundOp::Mul => "*=",
                CompoundOp::Div => "/=",
                CompoundOp::Rem => "%=",
                CompoundOp::Concat => "~=",
                CompoundOp::BitAnd => "&=",
                CompoundOp::BitOr => "|=",
                CompoundOp::BitXor => "^=",
                CompoundOp::Shl => "<<=",
                CompoundOp::Shr => ">>=",
            },
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Plus,
    /// `!x`
    Not,
    /// `~x`
    Complement,
    /// `*x`
    Deref,
    /// `&x`
    AddressOf,
    /// `++x`
    PreIncrement,
    /// `--x`
    PreDecrement,
    /// `x++`
    PostIncrement,
    /// `x--`
    PostDecrement,
}

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    Literal {
        /// The literal
        literal: Literal,
        /// Source location
        span: Span,
    },
    /// Name reference
    Identifier {
        /// Referenced name
        name: Symbol,
        /// Source location
        span: Span,
    },
    /// `name!(args)` in expression position
    TemplateInstance {
        /// Template name
        name: Symbol,
        /// Location of the name alone
        name_span: Span,
        /// Explicit arguments
        args: Vec<TemplateArg>,
        /// Source location
        span: Span,
    },
    /// Keyword expression
    Keyword {
        /// Which keyword
        keyword: Keyword,
        /// Source location
        span: Span,
    },
    /// `base.member`; `member` is an identifier, a template instance or missing
    Access {
        /// Accessed expression
        base: ExprId,
        /// Member part
        member: ExprId,
        /// Source location
        span: Span,
    },
    /// `callee(args)`
    Call {
        /// Called expression
        callee: ExprId,
        /// Actual arguments
        args: Vec<ExprId>,
        /// Source location
        span: Span,
    },
    /// `new T(args)`
    New {
        /// Instantiated type
        ty: TypeRefId,
        /// Constructor arguments
        args: Vec<ExprId>,
        /// Source location
        span: Span,
    },
    /// `base[args]`
    Index {
        /// Indexed expression
        base: ExprId,
        /// Indices
        args: Vec<ExprId>,
        /// Source location
        span: Span,
    },
    /// `left op right`
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: ExprId,
        /// Right operand
        right: ExprId,
        /// Source location
        span: Span,
    },
    /// `op operand`
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: ExprId,
        /// Source location
        span: Span,
    },
    /// `(inner)`
    Paren {
        /// Wrapped expression
        inner: ExprId,
        /// Source location
        span: Span,
    },
    /// `[a, b, c]`
    ArrayLiteral {
        /// Elements
        elements: Vec<ExprId>,
        /// Source location
        span: Span,
    },
    /// `cast(T) operand`; `cast()` strips qualifiers and carries no type
    Cast {
        /// Target type
        ty: Option<TypeRefId>,
        /// Converted expression
        operand: ExprId,
        /// Source location
        span: Span,
    },
    /// An identifier the user has not typed yet, as in `a.` at the caret
    Missing {
        /// Where the identifier is expected
        span: Span,
    },
}

impl Expr {
    /// Source location of the whole expression
    pub const fn span(&self) -> Span {
        match self {
            Self::Literal { span, .. }
            | Self::Identifier { span, .. }
            | Self::TemplateInstance { span, .. }
            | Self::Keyword { span, .. }
            | Self::Access { span, .. }
            | Self::Call { span, .. }
            | Self::New { span, .. }
            | Self::Index { span, .. }
            | Self::Binary { span, .. }
            | Self::Unary { span, .. }
            | Self::Paren { span, .. }
            | Self::ArrayLiteral { span, .. }
            | Self::Cast { span, .. }
            | Self::Missing { span } => *span,
        }
    }

    /// The name this node refers to, with the location of just that name
    pub const fn name(&self) -> Option<(Symbol, Span)> {
        match self {
            Self::Identifier { name, span } => Some((*name, *span)),
            Self::TemplateInstance { name, name_span, .. } => Some((*name, *name_span)),
            _ => None,
        }
    }
}

/// Statement node
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `{ ... }`, which opens a block scope
    Block {
        /// Statements in order
        statements: Vec<StmtId>,
        /// Source location
        span: Span,
    },
    /// Local declarations
    Declaration {
        /// Declared entities
        decls: Vec<DeclId>,
        /// Source location
        span: Span,
    },
    /// `expr;`
    Expr {
        /// The expression
        expr: ExprId,
        /// Source location
        span: Span,
    },
    /// `return expr;`
    Return {
        /// Returned value
        value: Option<ExprId>,
        /// Source location
        span: Span,
    },
    /// `if (condition) then else otherwise`
    If {
        /// Condition
        condition: ExprId,
        /// Taken branch
        then_branch: StmtId,
        /// Optional `else` branch
        else_branch: Option<StmtId>,
        /// Source location
        span: Span,
    },
    /// `while (condition) body`
    While {
        /// Loop condition
        condition: ExprId,
        /// Loop body
        body: StmtId,
        /// Source location
        span: Span,
    },
}

impl Stmt {
    /// Source location of the statement
    pub const fn span(&self) -> Span {
        match self {
            Self::Block { span, .. }
            | Self::Declaration { span, .. }
            | Self::Expr { span, .. }
            | Self::Return { span, .. }
            | Self::If { span, .. }
            | Self::While { span, .. } => *span,
        }
    }
}

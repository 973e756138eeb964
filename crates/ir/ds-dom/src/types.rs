//! Type expressions as written in source

use crate::{ExprId, TypeRefId};
use ds_intern::Symbol;
use ds_span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Built-in scalar types
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum PrimitiveKind {
    /// `void`
    Void,
    /// `bool`
    Bool,
    /// `byte`
    Byte,
    /// `ubyte`
    Ubyte,
    /// `short`
    Short,
    /// `ushort`
    Ushort,
    /// `int`
    Int,
    /// `uint`
    Uint,
    /// `long`
    Long,
    /// `ulong`
    Ulong,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `real`
    Real,
    /// `ifloat`
    Ifloat,
    /// `idouble`
    Idouble,
    /// `ireal`
    Ireal,
    /// `cfloat`
    Cfloat,
    /// `cdouble`
    Cdouble,
    /// `creal`
    Creal,
    /// `char`
    Char,
    /// `wchar`
    Wchar,
    /// `dchar`
    Dchar,
    /// `typeof(null)`
    Null,
}

impl PrimitiveKind {
    /// Every keyword-spelled primitive, in declaration order
    pub const KEYWORDS: [Self; 22] = [
        Self::Void,
        Self::Bool,
        Self::Byte,
        Self::Ubyte,
        Self::Short,
        Self::Ushort,
        Self::Int,
        Self::Uint,
        Self::Long,
        Self::Ulong,
        Self::Float,
        Self::Double,
        Self::Real,
        Self::Ifloat,
        Self::Idouble,
        Self::Ireal,
        Self::Cfloat,
        Self::Cdouble,
        Self::Creal,
        Self::Char,
        Self::Wchar,
        Self::Dchar,
    ];

    /// Source spelling
    pub const fn name(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::Ubyte => "ubyte",
            Self::Short => "short",
            Self::Ushort => "ushort",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Long => "long",
            Self::Ulong => "ulong",
            Self::Float => "float",
            Self::Double => "double",
            Self::Real => "real",
            Self::Ifloat => "ifloat",
            Self::Idouble => "idouble",
            Self::Ireal => "ireal",
            Self::Cfloat => "cfloat",
            Self::Cdouble => "cdouble",
            Self::Creal => "creal",
            Self::Char => "char",
            Self::Wchar => "wchar",
            Self::Dchar => "dchar",
            Self::Null => "typeof(null)",
        }
    }

    /// Parse a primitive type keyword
    pub fn from_keyword(text: &str) -> Option<Self> {
        Self::KEYWORDS.into_iter().find(|kind| kind.name() == text)
    }

    /// Integer types, including the character types
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            Self::Byte
                | Self::Ubyte
                | Self::Short
                | Self::Ushort
                | Self::Int
                | Self::Uint
                | Self::Long
                | Self::Ulong
                | Self::Char
                | Self::Wchar
                | Self::Dchar
        )
    }

    /// Character types
    pub const fn is_character(self) -> bool {
        matches!(self, Self::Char | Self::Wchar | Self::Dchar)
    }

    /// Unsigned integer types; character types count as unsigned
    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            Self::Ubyte | Self::Ushort | Self::Uint | Self::Ulong | Self::Char | Self::Wchar | Self::Dchar
        )
    }

    /// Real floating point types
    pub const fn is_floating(self) -> bool {
        matches!(self, Self::Float | Self::Double | Self::Real)
    }

    /// Imaginary floating point types
    pub const fn is_imaginary(self) -> bool {
        matches!(self, Self::Ifloat | Self::Idouble | Self::Ireal)
    }

    /// Complex floating point types
    pub const fn is_complex(self) -> bool {
        matches!(self, Self::Cfloat | Self::Cdouble | Self::Creal)
    }

    /// Anything arithmetic works on
    pub const fn is_numeric(self) -> bool {
        self.is_integral() || self.is_floating() || self.is_imaginary() || self.is_complex()
    }

    /// Inclusive value range of an integral kind (and `bool`)
    pub const fn integer_bounds(self) -> Option<(i128, i128)> {
        Some(match self {
            Self::Bool => (0, 1),
            Self::Byte => (i8::MIN as i128, i8::MAX as i128),
            Self::Ubyte | Self::Char => (0, u8::MAX as i128),
            Self::Short => (i16::MIN as i128, i16::MAX as i128),
            Self::Ushort | Self::Wchar => (0, u16::MAX as i128),
            Self::Int => (i32::MIN as i128, i32::MAX as i128),
            Self::Uint => (0, u32::MAX as i128),
            Self::Dchar => (0, 0x0010_FFFF),
            Self::Long => (i64::MIN as i128, i64::MAX as i128),
            Self::Ulong => (0, u64::MAX as i128),
            _ => return None,
        })
    }

    /// Conversion rank used for the usual arithmetic conversions
    pub const fn rank(self) -> u8 {
        match self {
            Self::Void | Self::Null => 0,
            Self::Bool => 1,
            Self::Byte | Self::Ubyte | Self::Char => 2,
            Self::Short | Self::Ushort | Self::Wchar => 3,
            Self::Int | Self::Uint | Self::Dchar => 4,
            Self::Long | Self::Ulong => 5,
            Self::Float | Self::Ifloat | Self::Cfloat => 6,
            Self::Double | Self::Idouble | Self::Cdouble => 7,
            Self::Real | Self::Ireal | Self::Creal => 8,
        }
    }

    /// Result kind of a binary arithmetic operation on `self` and `other`
    ///
    /// Integers narrower than `int` promote to `int`, then the higher rank
    /// wins; unsigned wins a tie. Floating operands win over integers.
    pub const fn promote(self, other: Self) -> Self {
        const fn integral_promotion(kind: PrimitiveKind) -> PrimitiveKind {
            match kind {
                PrimitiveKind::Bool
                | PrimitiveKind::Byte
                | PrimitiveKind::Ubyte
                | PrimitiveKind::Short
                | PrimitiveKind::Ushort
                | PrimitiveKind::Char
                | PrimitiveKind::Wchar => PrimitiveKind::Int,
                PrimitiveKind::Dchar => PrimitiveKind::Uint,
                other => other,
            }
        }

        let left = integral_promotion(self);
        let right = integral_promotion(other);
        if left.is_complex() || right.is_complex() {
            return match if left.rank() >= right.rank() { left.rank() } else { right.rank() } {
                8 => Self::Creal,
                7 => Self::Cdouble,
                _ => Self::Cfloat,
            };
        }
        if left.rank() > right.rank() {
            left
        } else if right.rank() > left.rank() {
            right
        } else if right.is_unsigned() || right.is_imaginary() {
            right
        } else {
            left
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage class / type constructor wrapping a type
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum TypeModifier {
    /// `const(T)`
    Const,
    /// `immutable(T)`
    Immutable,
    /// `shared(T)`
    Shared,
    /// `inout(T)`
    Inout,
}

impl TypeModifier {
    /// Parse a modifier keyword
    pub fn from_keyword(text: &str) -> Option<Self> {
        match text {
            "const" => Some(Self::Const),
            "immutable" => Some(Self::Immutable),
            "shared" => Some(Self::Shared),
            "inout" => Some(Self::Inout),
            _ => None,
        }
    }
}

impl fmt::Display for TypeModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Const => "const",
            Self::Immutable => "immutable",
            Self::Shared => "shared",
            Self::Inout => "inout",
        })
    }
}

/// A written type expression
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// Built-in type
    Primitive {
        /// Which primitive
        kind: PrimitiveKind,
        /// Source location
        span: Span,
    },
    /// A plain name: `A`
    Identifier {
        /// Referenced name
        name: Symbol,
        /// Source location
        span: Span,
    },
    /// Explicit instantiation: `A!(int, 3)` or `A!float`
    TemplateInstance {
        /// Template name
        name: Symbol,
        /// Location of the name alone
        name_span: Span,
        /// Explicit arguments in order
        args: Vec<TemplateArg>,
        /// Source location
        span: Span,
    },
    /// Qualified access `base.member`; `member` is an identifier or template instance
    Member {
        /// Qualifier
        base: TypeRefId,
        /// Accessed part
        member: TypeRefId,
        /// Source location
        span: Span,
    },
    /// `T*`
    Pointer {
        /// Pointee
        pointee: TypeRefId,
        /// Source location
        span: Span,
    },
    /// `T[]` or `T[n]`
    Array {
        /// Element type
        element: TypeRefId,
        /// Static length, if any
        length: Option<ExprId>,
        /// Source location
        span: Span,
    },
    /// `const(T)`, `immutable(T)`, ...
    Modified {
        /// Applied modifier
        modifier: TypeModifier,
        /// Wrapped type
        inner: TypeRefId,
        /// Source location
        span: Span,
    },
    /// `typeof(expr)`
    Typeof {
        /// Inspected expression
        expr: ExprId,
        /// Source location
        span: Span,
    },
}

impl TypeRef {
    /// Source location of the whole type expression
    pub const fn span(&self) -> Span {
        match self {
            Self::Primitive { span, .. }
            | Self::Identifier { span, .. }
            | Self::TemplateInstance { span, .. }
            | Self::Member { span, .. }
            | Self::Pointer { span, .. }
            | Self::Array { span, .. }
            | Self::Modified { span, .. }
            | Self::Typeof { span, .. } => *span,
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

/// An explicit template argument
///
/// A bare identifier parses as a type; whether it denotes a type, a
/// constant or a symbol is decided by the resolver.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TemplateArg {
    /// Argument in type position
    Type(TypeRefId),
    /// Argument that can only be an expression
    Value(ExprId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_round_trip() {
        for kind in PrimitiveKind::KEYWORDS {
            assert_eq!(PrimitiveKind::from_keyword(kind.name()), Some(kind));
        }
        assert_eq!(PrimitiveKind::from_keyword("string"), None);
    }

    #[test]
    fn test_promotion() {
        use PrimitiveKind::*;
        assert_eq!(Byte.promote(Short), Int);
        assert_eq!(Int.promote(Uint), Uint);
        assert_eq!(Int.promote(Long), Long);
        assert_eq!(Long.promote(Float), Float);
        assert_eq!(Double.promote(Real), Real);
        assert_eq!(Char.promote(Char), Int);
        assert_eq!(Float.promote(Cdouble), Cdouble);
    }
}

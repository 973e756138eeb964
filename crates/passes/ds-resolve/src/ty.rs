//! Resolution results

use crate::ModuleCache;
use ds_const_eval::{ConstValue, RawValue};
use ds_dom::{DeclKind, DeclRef, PrimitiveKind, TypeModifier};
use rustc_hash::FxHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// What a template parameter is bound to
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateBinding {
    /// Type parameters (and alias parameters given a type)
    Type(AbstractType),
    /// Value parameters, converted to the parameter's declared type
    Value(ConstValue),
    /// Alias parameters
    Symbol(DeclRef),
}

/// A resolved symbol or type
#[derive(Debug, Clone, PartialEq)]
pub enum AbstractType {
    /// Built-in type
    Primitive(PrimitiveKind),
    /// Class, struct, interface, union or named template scope
    Aggregate {
        /// The aggregate declaration
        decl: DeclRef,
        /// Resolved base classes and interfaces, in declaration order
        bases: Vec<AbstractType>,
    },
    /// A template instantiated with concrete arguments
    TemplateInstance {
        /// The template declaration the matcher selected
        decl: DeclRef,
        /// One binding per template parameter, in parameter order
        arguments: Vec<TemplateBinding>,
        /// Base classes resolved with the bindings in scope
        bases: Vec<AbstractType>,
    },
    /// A name that is an alias; `target` is never itself an alias
    Alias {
        /// The alias declaration the name resolved to
        alias: DeclRef,
        /// Terminal type of the alias chain
        target: Box<AbstractType>,
    },
    /// `T*`
    Pointer(Box<AbstractType>),
    /// `T[]` and `T[n]`
    Array(Box<AbstractType>),
    /// `const(T)`, `immutable(T)`, ...
    Modified {
        /// The type constructor
        modifier: TypeModifier,
        /// Wrapped type
        inner: Box<AbstractType>,
    },
    /// A variable, function or other value symbol together with its type
    Member {
        /// The declaration
        decl: DeclRef,
        /// Its type; a function's return type. `None` when it cannot be
        /// determined (for example an `auto` declaration in a cycle)
        ty: Option<Box<AbstractType>>,
    },
    /// A template parameter, bound when resolved inside an instance
    TemplateParameter {
        /// The parameter declaration
        decl: DeclRef,
        /// Binding in effect, if any
        binding: Option<Box<TemplateBinding>>,
    },
}

impl AbstractType {
    /// The declaration this result names, if it names one
    ///
    /// For aliases this is the alias itself (its provenance), not the
    /// declaration of the target.
    pub const fn declaration(&self) -> Option<DeclRef> {
        match self {
            Self::Aggregate { decl, .. }
            | Self::TemplateInstance { decl, .. }
            | Self::Member { decl, .. }
            | Self::TemplateParameter { decl, .. } => Some(*decl),
            Self::Alias { alias, .. } => Some(*alias),
            Self::Primitive(_) | Self::Pointer(_) | Self::Array(_) | Self::Modified { .. } => None,
        }
    }

    /// Follow aliases and bound type parameters to the type they stand for
    #[must_use]
    pub fn terminal(&self) -> &Self {
        match self {
            Self::Alias { target, .. } => target.terminal(),
            Self::TemplateParameter { binding: Some(binding), .. } => match binding.as_ref() {
                TemplateBinding::Type(ty) => ty.terminal(),
                _ => self,
            },
            _ => self,
        }
    }

    /// The type of a value symbol; types stand for themselves
    pub fn value_type(&self) -> Option<&Self> {
        match self.terminal() {
            Self::Member { ty, .. } => ty.as_deref().map(Self::terminal),
            other => Some(other),
        }
    }

    /// Whether this denotes a type rather than a value
    pub fn is_type(&self) -> bool {
        !matches!(self.terminal(), Self::Member { .. })
    }

    /// Strip `const`/`immutable`/`shared`/`inout`
    #[must_use]
    pub fn unqualified(&self) -> &Self {
        match self.terminal() {
            Self::Modified { inner, .. } => inner.unqualified(),
            other => other,
        }
    }

    /// Resolved base types of an aggregate or instance
    pub fn bases(&self) -> &[Self] {
        match self.terminal() {
            Self::Aggregate { bases, .. } | Self::TemplateInstance { bases, .. } => bases,
            _ => &[],
        }
    }

    /// Declaration of the aggregate (or template) this type is an instance of
    pub fn aggregate(&self) -> Option<DeclRef> {
        match self.unqualified() {
            Self::Aggregate { decl, .. } | Self::TemplateInstance { decl, .. } => Some(*decl),
            _ => None,
        }
    }

    /// Primitive kind after following aliases and qualifiers
    pub fn primitive(&self) -> Option<PrimitiveKind> {
        match self.unqualified() {
            Self::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Structural type identity
    ///
    /// Aliases and bound parameters are looked through; base lists are
    /// derived data and do not take part.
    pub fn same_type(&self, other: &Self) -> bool {
        match (self.terminal(), other.terminal()) {
            (Self::Primitive(left), Self::Primitive(right)) => left == right,
            (Self::Aggregate { decl: left, .. }, Self::Aggregate { decl: right, .. })
            | (Self::Member { decl: left, .. }, Self::Member { decl: right, .. })
            | (Self::TemplateParameter { decl: left, .. }, Self::TemplateParameter { decl: right, .. }) => {
                left == right
            }
            (
                Self::TemplateInstance {
                    decl: left,
                    arguments: left_args,
                    ..
                },
                Self::TemplateInstance {
                    decl: right,
                    arguments: right_args,
                    ..
                },
            ) => {
                left == right
                    && left_args.len() == right_args.len()
                    && left_args.iter().zip(right_args).all(|(left, right)| left.same_binding(right))
            }
            (Self::Pointer(left), Self::Pointer(right)) | (Self::Array(left), Self::Array(right)) => {
                left.same_type(right)
            }
            (
                Self::Modified {
                    modifier: left_mod,
                    inner: left,
                },
                Self::Modified {
                    modifier: right_mod,
                    inner: right,
                },
            ) => left_mod == right_mod && left.same_type(right),
            _ => false,
        }
    }

    /// Whether `base` is this type or appears in its transitive base chain
    ///
    /// The chain is walked outward from the most derived type and the
    /// search stops at the first match.
    pub fn derives_from(&self, base: &Self) -> bool {
        if self.same_type(base) {
            return true;
        }
        self.bases().iter().any(|parent| parent.derives_from(base))
    }

    /// Render with declaration names taken from `cache`
    pub const fn display<'a>(&'a self, cache: &'a ModuleCache) -> TypeDisplay<'a> {
        TypeDisplay { ty: self, cache }
    }

    pub(crate) fn hash_into<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self.terminal()).hash(state);
        match self.terminal() {
            Self::Primitive(kind) => kind.hash(state),
            Self::Aggregate { decl, .. } | Self::Member { decl, .. } | Self::TemplateParameter { decl, .. } => {
                decl.hash(state);
            }
            Self::TemplateInstance { decl, arguments, .. } => {
                decl.hash(state);
                for argument in arguments {
                    argument.hash_into(state);
                }
            }
            Self::Pointer(inner) | Self::Array(inner) => inner.hash_into(state),
            Self::Modified { modifier, inner } => {
                modifier.hash(state);
                inner.hash_into(state);
            }
            Self::Alias { .. } => {}
        }
    }
}

impl TemplateBinding {
    /// Identity of two bindings: same type, same constant or same symbol
    pub fn same_binding(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Type(left), Self::Type(right)) => left.same_type(right),
            (Self::Value(left), Self::Value(right)) => left == right,
            (Self::Symbol(left), Self::Symbol(right)) => left == right,
            _ => false,
        }
    }

    /// The bound type, if this binds a type
    pub const fn as_type(&self) -> Option<&AbstractType> {
        match self {
            Self::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub(crate) fn hash_into<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Type(ty) => ty.hash_into(state),
            Self::Value(value) => {
                value.kind.hash(state);
                match value.raw {
                    RawValue::Bool(flag) => flag.hash(state),
                    RawValue::Integer(int) => int.hash(state),
                    RawValue::Float(float) => float.to_bits().hash(state),
                    RawValue::Complex { re, im } => {
                        re.to_bits().hash(state);
                        im.to_bits().hash(state);
                    }
                    RawValue::Null => {}
                }
            }
            Self::Symbol(decl) => decl.hash(state),
        }
    }
}

/// Stable hash of an argument list, used as the recursion-guard signature
pub(crate) fn signature(arguments: &[TemplateBinding]) -> u64 {
    let mut hasher = FxHasher::default();
    arguments.len().hash(&mut hasher);
    for argument in arguments {
        argument.hash_into(&mut hasher);
    }
    hasher.finish()
}

/// [`AbstractType`] rendered with source names
pub struct TypeDisplay<'a> {
    ty: &'a AbstractType,
    cache: &'a ModuleCache,
}

impl TypeDisplay<'_> {
    fn name(&self, decl: DeclRef) -> &str {
        self.cache
            .get(decl.module)
            .and_then(|module| module.decls[decl.decl].name)
            .map_or("<anonymous>", |name| self.cache.interner().resolve(name))
    }

    fn nested<'b>(&'b self, ty: &'b AbstractType) -> TypeDisplay<'b> {
        TypeDisplay { ty, cache: self.cache }
    }

    fn binding(&self, f: &mut fmt::Formatter<'_>, binding: &TemplateBinding) -> fmt::Result {
        match binding {
            TemplateBinding::Type(ty) => write!(f, "{}", self.nested(ty)),
            TemplateBinding::Value(value) => write!(f, "{value}"),
            TemplateBinding::Symbol(decl) => f.write_str(self.name(*decl)),
        }
    }

    fn is_function(&self, decl: DeclRef) -> bool {
        self.cache
            .get(decl.module)
            .is_some_and(|module| matches!(module.decls[decl.decl].kind, DeclKind::Function { .. }))
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            AbstractType::Primitive(kind) => write!(f, "{kind}"),
            AbstractType::Aggregate { decl, .. } => f.write_str(self.name(*decl)),
            AbstractType::TemplateInstance { decl, arguments, .. } => {
                write!(f, "{}!(", self.name(*decl))?;
                for (index, argument) in arguments.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    self.binding(f, argument)?;
                }
                f.write_str(")")
            }
            AbstractType::Alias { alias, target } => {
                write!(f, "{} = {}", self.name(*alias), self.nested(target))
            }
            AbstractType::Pointer(inner) => write!(f, "{}*", self.nested(inner)),
            AbstractType::Array(inner) => write!(f, "{}[]", self.nested(inner)),
            AbstractType::Modified { modifier, inner } => write!(f, "{modifier}({})", self.nested(inner)),
            AbstractType::Member { decl, ty } => {
                f.write_str(self.name(*decl))?;
                if self.is_function(*decl) {
                    f.write_str("()")?;
                }
                match ty {
                    Some(ty) => write!(f, ": {}", self.nested(ty)),
                    None => f.write_str(": ?"),
                }
            }
            AbstractType::TemplateParameter { decl, binding } => {
                f.write_str(self.name(*decl))?;
                if let Some(binding) = binding {
                    f.write_str(" = ")?;
                    self.binding(f, binding)?;
                }
                Ok(())
            }
        }
    }
}

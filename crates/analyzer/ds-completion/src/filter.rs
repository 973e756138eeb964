//! Member-kind filters

use bitflags::bitflags;
use ds_dom::{AggregateKind, Decl, DeclKind};

bitflags! {
    /// Kinds of declarations a completion position accepts
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MemberFilter: u16 {
        /// Variables and parameters
        const VARIABLES = 1 << 0;
        /// Functions
        const METHODS = 1 << 1;
        /// Classes
        const CLASSES = 1 << 2;
        /// Interfaces
        const INTERFACES = 1 << 3;
        /// Structs and unions
        const STRUCTS_AND_UNIONS = 1 << 4;
        /// Template scopes
        const TEMPLATES = 1 << 5;
        /// Aliases
        const ALIASES = 1 << 6;
        /// Template parameters
        const TYPE_PARAMETERS = 1 << 7;

        /// Everything that can name a type
        const TYPES = Self::CLASSES.bits()
            | Self::INTERFACES.bits()
            | Self::STRUCTS_AND_UNIONS.bits()
            | Self::TEMPLATES.bits()
            | Self::ALIASES.bits();
        /// Everything usable in expression position
        const ALL = Self::TYPES.bits()
            | Self::VARIABLES.bits()
            | Self::METHODS.bits()
            | Self::TYPE_PARAMETERS.bits();
    }
}

impl MemberFilter {
    /// The single kind `decl` belongs to; empty for modules
    pub const fn for_declaration(decl: &Decl) -> Self {
        match &decl.kind {
            DeclKind::Variable { .. } => Self::VARIABLES,
            DeclKind::Function { .. } => Self::METHODS,
            DeclKind::Aggregate { kind, .. } => match kind {
                AggregateKind::Class => Self::CLASSES,
                AggregateKind::Interface => Self::INTERFACES,
                AggregateKind::Struct | AggregateKind::Union => Self::STRUCTS_AND_UNIONS,
                AggregateKind::Template => Self::TEMPLATES,
            },
            DeclKind::Alias { .. } => Self::ALIASES,
            DeclKind::TemplateParameter(_) => Self::TYPE_PARAMETERS,
            DeclKind::Module { .. } => Self::empty(),
        }
    }

    /// Whether this filter accepts `decl`
    pub fn accepts(self, decl: &Decl) -> bool {
        self.intersects(Self::for_declaration(decl))
    }
}

//! Resolution failures
//!
//! Every failure is an ordinary value: callers such as completion and the
//! references scanner branch on it instead of aborting.

use ds_dom::DeclRef;
use ds_intern::{Interner, Symbol};
use ds_span::Span;

/// Errors that occur during symbol and type resolution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// Nothing visible answers to the name
    #[error("unresolved symbol at {span}")]
    Unresolved {
        /// The name that was not found; `None` for nameless expressions
        name: Option<Symbol>,
        /// Where the name was used
        span: Span,
    },

    /// Several declarations answer to the name and nothing selects one
    #[error("ambiguous reference to one of {} declarations", candidates.len())]
    AmbiguousOverload {
        /// The overloaded name
        name: Symbol,
        /// Candidates in lookup order
        candidates: Vec<DeclRef>,
    },

    /// Wrong number of template or call arguments
    #[error("expected {expected} arguments, found {found}")]
    ArityMismatch {
        /// The template or function
        decl: DeclRef,
        /// Number of parameters
        expected: usize,
        /// Number of supplied arguments
        found: usize,
    },

    /// An argument does not satisfy a parameter's constraint or specialization
    #[error("template argument does not satisfy its parameter")]
    ConstraintNotSatisfied {
        /// The template
        decl: DeclRef,
        /// The parameter that rejected its argument
        parameter: DeclRef,
    },

    /// A declaration was re-entered while it was being resolved
    #[error("recursive definition")]
    RecursionLimitExceeded {
        /// The declaration that was re-entered
        decl: DeclRef,
    },

    /// A constant was required and the expression does not fold
    #[error("expression at {span} is not a constant")]
    NotConstant {
        /// Location of the expression
        span: Span,
    },
}

impl ResolutionError {
    /// Rank used to report the most telling failure of several candidates
    pub(crate) const fn severity(&self) -> u8 {
        match self {
            Self::RecursionLimitExceeded { .. } => 5,
            Self::ConstraintNotSatisfied { .. } => 4,
            Self::NotConstant { .. } => 3,
            Self::ArityMismatch { .. } => 2,
            Self::AmbiguousOverload { .. } => 1,
            Self::Unresolved { .. } => 0,
        }
    }

    /// Similar names for "did you mean?" messages
    ///
    /// Candidates within edit distance 3, closest first, at most three.
    pub fn compute_suggestions(name: Symbol, interner: &Interner, available_names: &[Symbol]) -> Vec<Symbol> {
        let target = interner.resolve(name);
        let mut suggestions: Vec<(Symbol, usize)> = available_names
            .iter()
            .filter(|&&candidate| candidate != name)
            .map(|&candidate| (candidate, levenshtein_distance(target, interner.resolve(candidate))))
            .filter(|(_, distance)| *distance <= 3)
            .collect();

        suggestions.sort_by_key(|(_, distance)| *distance);
        suggestions.dedup_by_key(|(sym, _)| *sym);
        suggestions.into_iter().take(3).map(|(sym, _)| sym).collect()
    }
}

/// Compute Levenshtein distance between two strings
fn levenshtein_distance(source: &str, target: &str) -> usize {
    let source: Vec<char> = source.chars().collect();
    let target: Vec<char> = target.chars().collect();

    if source.is_empty() {
        return target.len();
    }
    if target.is_empty() {
        return source.len();
    }

    let mut previous: Vec<usize> = (0..=target.len()).collect();
    let mut current = vec![0; target.len() + 1];
    for (idx, source_char) in source.iter().enumerate() {
        current[0] = idx + 1;
        for (jdx, target_char) in target.iter().enumerate() {
            let cost = usize::from(source_char != target_char);
            current[jdx + 1] = (previous[jdx + 1] + 1)
                .min(current[jdx] + 1)
                .min(previous[jdx] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[target.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("abc", "def"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("saturday", "sunday"), 3);
    }

    #[test]
    fn test_suggestions_are_close_and_capped() {
        let interner = Interner::new();
        let names: Vec<_> = ["prop", "props", "prod", "prom", "statA", "pro"]
            .iter()
            .map(|name| interner.intern(name))
            .collect();
        let suggestions = ResolutionError::compute_suggestions(interner.intern("prap"), &interner, &names);
        let rendered: Vec<_> = suggestions.iter().map(|sym| interner.resolve(*sym)).collect();
        assert_eq!(rendered, vec!["prop", "props", "prod"]);
    }
}

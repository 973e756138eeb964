//! Per-query recursion guard
//!
//! Alias chains, declared and inferred types, base-class lists, template
//! defaults and template instantiations can all refer back to themselves.
//! Each recursive step enters a `(declaration, signature)` key before
//! descending; entering a key that is already active fails with
//! [`ResolutionError::RecursionLimitExceeded`] instead of recursing.
//!
//! Two limits bound chains that never repeat a key: the total nesting of
//! guarded steps, and the number of steps active on one declaration at once
//! (a template instantiating itself with ever-growing arguments).

use crate::ResolutionError;
use ds_dom::DeclRef;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use tracing::trace;

/// Bounds for recursive resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecursionLimits {
    /// Maximum nesting of guarded steps within one query
    pub max_depth: usize,
    /// Maximum guarded steps active on a single declaration
    pub max_instantiations: usize,
}

impl Default for RecursionLimits {
    fn default() -> Self {
        Self {
            max_depth: 512,
            max_instantiations: 50,
        }
    }
}

/// Signatures distinguishing the kinds of guarded steps on one declaration
pub(crate) mod step {
    /// Following an alias to its target
    pub const ALIAS: u64 = 0;
    /// Resolving the declared or inferred type of a declaration
    pub const DECLARATION_TYPE: u64 = 1;
    /// Resolving a base-class list
    pub const BASES: u64 = 2;
    /// Folding a manifest constant's initializer
    pub const CONSTANT: u64 = 3;
    /// Evaluating a template parameter's default
    pub const DEFAULT: u64 = 4;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GuardKey {
    decl: DeclRef,
    signature: u64,
}

/// Visited set plus depth counters for one query
#[derive(Debug, Clone)]
pub(crate) struct RecursionGuard {
    visiting: FxHashSet<GuardKey>,
    per_decl: FxHashMap<DeclRef, usize>,
    limits: RecursionLimits,
}

impl RecursionGuard {
    pub(crate) fn new(limits: RecursionLimits) -> Self {
        Self {
            visiting: FxHashSet::default(),
            per_decl: FxHashMap::default(),
            limits,
        }
    }

    /// Forget everything; called at the start of every external query
    pub(crate) fn reset(&mut self) {
        self.visiting.clear();
        self.per_decl.clear();
    }

    /// Enter a recursive step
    pub(crate) fn enter(&mut self, decl: DeclRef, signature: u64) -> Result<(), ResolutionError> {
        let active = self.per_decl.get(&decl).copied().unwrap_or(0);
        if self.visiting.len() >= self.limits.max_depth
            || active >= self.limits.max_instantiations
            || !self.visiting.insert(GuardKey { decl, signature })
        {
            trace!(?decl, signature, depth = self.visiting.len(), active, "recursion guard tripped");
            return Err(ResolutionError::RecursionLimitExceeded { decl });
        }
        self.per_decl.insert(decl, active + 1);
        Ok(())
    }

    /// Leave a step entered with the same key
    pub(crate) fn leave(&mut self, decl: DeclRef, signature: u64) {
        if !self.visiting.remove(&GuardKey { decl, signature }) {
            return;
        }
        if let Some(active) = self.per_decl.get_mut(&decl) {
            *active -= 1;
            if *active == 0 {
                self.per_decl.remove(&decl);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.visiting.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ds_dom::{Decl, ModuleId};
    use la_arena::Arena;

    fn decls(count: usize) -> Vec<DeclRef> {
        let mut arena: Arena<Decl> = Arena::new();
        (0..count)
            .map(|_| {
                let id = arena.alloc(Decl::new(
                    None,
                    ds_span::Span::default(),
                    ds_span::Span::default(),
                    ds_dom::DeclKind::Module { members: Vec::new() },
                ));
                DeclRef::new(ModuleId(0), id)
            })
            .collect()
    }

    #[test]
    fn test_repeat_trips_and_leave_releases() {
        let a = decls(1)[0];
        let mut guard = RecursionGuard::new(RecursionLimits::default());
        guard.enter(a, step::ALIAS).unwrap();
        assert_eq!(
            guard.enter(a, step::ALIAS),
            Err(ResolutionError::RecursionLimitExceeded { decl: a })
        );
        guard.enter(a, step::BASES).unwrap();
        guard.leave(a, step::ALIAS);
        guard.enter(a, step::ALIAS).unwrap();
        assert_eq!(guard.depth(), 2);
        guard.reset();
        assert_eq!(guard.depth(), 0);
    }

    #[test]
    fn test_depth_limit() {
        let keys = decls(3);
        let mut guard = RecursionGuard::new(RecursionLimits {
            max_depth: 2,
            ..RecursionLimits::default()
        });
        guard.enter(keys[0], 7).unwrap();
        guard.enter(keys[1], 7).unwrap();
        assert!(guard.enter(keys[2], 7).is_err());
    }

    #[test]
    fn test_growing_signatures_on_one_declaration() {
        let keys = decls(2);
        let mut guard = RecursionGuard::new(RecursionLimits {
            max_instantiations: 2,
            ..RecursionLimits::default()
        });
        guard.enter(keys[0], 10).unwrap();
        guard.enter(keys[0], 11).unwrap();
        assert_eq!(
            guard.enter(keys[0], 12),
            Err(ResolutionError::RecursionLimitExceeded { decl: keys[0] })
        );
        // other declarations keep their own count
        guard.enter(keys[1], 10).unwrap();

        guard.leave(keys[0], 11);
        guard.enter(keys[0], 12).unwrap();
        // leaving a key that was never entered changes nothing
        guard.leave(keys[0], 99);
        assert!(guard.enter(keys[0], 13).is_err());
    }
}

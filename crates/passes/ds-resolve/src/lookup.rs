//! Name lookup over the scope stack, inherited members and imports

use crate::{AbstractType, ResolutionContext, ResolutionError};
use ds_dom::{Attribute, DeclKind, DeclRef, ImportVisibility, Module, ModuleId, ScopeKind, ScopeNode};
use ds_intern::Symbol;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

/// A module reachable through imports and the names it contributes
struct Reachable {
    module: ModuleId,
    source: Arc<Module>,
    /// Selected names; empty contributes everything
    selective: Vec<Symbol>,
}

impl Reachable {
    fn exposes(&self, name: Symbol) -> bool {
        self.selective.is_empty() || self.selective.contains(&name)
    }
}

impl ResolutionContext<'_> {
    /// Overload set visible under `name` at the current position
    ///
    /// Scopes are searched innermost first; the first scope declaring the
    /// name wins. Block scopes only contribute declarations that start at or
    /// before the cursor. Aggregate scopes fall back to inherited members.
    /// A miss at module level searches imported modules breadth first.
    pub fn lookup(&mut self, name: Symbol) -> Vec<DeclRef> {
        self.guard.reset();
        self.lookup_name(name)
    }

    /// Module-level functions named `name` whose first parameter accepts
    /// `receiver`, for `receiver.name(...)` calls without such a member
    pub fn lookup_extension(&mut self, name: Symbol, receiver: &AbstractType) -> Vec<DeclRef> {
        self.guard.reset();
        self.extension_candidates(name, receiver)
    }

    /// Every declaration visible at the current position
    ///
    /// An inner declaration hides outer declarations with the same name.
    /// The order is scope order (innermost first), then declaration order.
    pub fn visible_declarations(&mut self) -> Vec<DeclRef> {
        self.guard.reset();
        let mut hidden = FxHashSet::default();
        let mut visible = Vec::new();

        for index in (0..self.frames.len()).rev() {
            let frame = self.frames[index].clone();
            let Some(scope) = frame.source.scope(frame.scope) else {
                continue;
            };
            for (name, decls) in scope.iter() {
                let decls: Vec<_> = decls
                    .iter()
                    .filter(|&&decl| self.declared_before_cursor(&frame.source, scope.kind, decl))
                    .map(|&decl| DeclRef::new(frame.module, decl))
                    .collect();
                if !decls.is_empty() && hidden.insert(name) {
                    visible.extend(decls);
                }
            }
            if scope.kind == ScopeKind::Aggregate
                && let ScopeNode::Decl(decl) = frame.scope
            {
                let bases = self.aggregate_bases(DeclRef::new(frame.module, decl));
                let inherited: Vec<_> = self
                    .inherited_members(&bases)
                    .into_iter()
                    .filter_map(|member| Some((member, self.module_of(member).decls[member.decl].name?)))
                    .filter(|(_, name)| !hidden.contains(name))
                    .collect();
                for (member, name) in inherited {
                    visible.push(member);
                    hidden.insert(name);
                }
            }
        }

        for reachable in self.reachable_modules() {
            let Some(scope) = reachable.source.scope(reachable.source.root_scope()) else {
                continue;
            };
            let mut contributed = Vec::new();
            for (name, decls) in scope.iter() {
                if hidden.contains(&name) || !reachable.exposes(name) {
                    continue;
                }
                let before = visible.len();
                visible.extend(
                    decls
                        .iter()
                        .filter(|&&decl| !reachable.source.decls[decl].has_attribute(Attribute::Private))
                        .map(|&decl| DeclRef::new(reachable.module, decl)),
                );
                if visible.len() > before {
                    contributed.push(name);
                }
            }
            hidden.extend(contributed);
        }
        visible
    }

    /// Visible names close to `name`, closest first, at most three
    pub fn suggestions(&mut self, name: Symbol) -> Vec<Symbol> {
        let mut seen = FxHashSet::default();
        let names: Vec<Symbol> = self
            .visible_declarations()
            .into_iter()
            .filter_map(|decl| self.module_of(decl).decls[decl.decl].name)
            .filter(|name| seen.insert(*name))
            .collect();
        ResolutionError::compute_suggestions(name, self.interner(), &names)
    }

    pub(crate) fn lookup_name(&mut self, name: Symbol) -> Vec<DeclRef> {
        for index in (0..self.frames.len()).rev() {
            let frame = self.frames[index].clone();
            let Some(scope) = frame.source.scope(frame.scope) else {
                continue;
            };
            let found: Vec<_> = scope
                .get(name)
                .iter()
                .filter(|&&decl| self.declared_before_cursor(&frame.source, scope.kind, decl))
                .map(|&decl| DeclRef::new(frame.module, decl))
                .collect();
            if !found.is_empty() {
                return found;
            }

            if scope.kind == ScopeKind::Aggregate
                && let ScopeNode::Decl(decl) = frame.scope
            {
                let bases = self.aggregate_bases(DeclRef::new(frame.module, decl));
                let inherited = self.inherited_named(&bases, name);
                if !inherited.is_empty() {
                    return inherited;
                }
            }
        }

        let imported = self.imported(name);
        trace!(
            name = self.interner().resolve(name),
            found = imported.len(),
            "lookup fell through to imports"
        );
        imported
    }

    fn declared_before_cursor(&self, source: &Module, kind: ScopeKind, decl: ds_dom::DeclId) -> bool {
        kind != ScopeKind::Block || self.cursor.is_none_or(|cursor| source.decls[decl].span.start <= cursor)
    }

    /// Members named `name` inherited through `bases`, nearest base first
    pub(crate) fn inherited_named(&self, bases: &[AbstractType], name: Symbol) -> Vec<DeclRef> {
        let mut visited = FxHashSet::default();
        let mut queue: VecDeque<&AbstractType> = bases.iter().collect();
        while let Some(base) = queue.pop_front() {
            let Some(decl) = base.aggregate() else {
                continue;
            };
            if !visited.insert(decl) {
                continue;
            }
            let source = self.module_of(decl);
            let found: Vec<_> = source
                .scope(ScopeNode::Decl(decl.decl))
                .map(|scope| scope.get(name))
                .unwrap_or_default()
                .iter()
                .filter(|&&member| is_inheritable(&source, member))
                .map(|&member| DeclRef::new(decl.module, member))
                .collect();
            if !found.is_empty() {
                return found;
            }
            queue.extend(base.bases());
        }
        Vec::new()
    }

    /// Every member inherited through `bases`; members of nearer bases hide
    /// members of further ones with the same name
    pub(crate) fn inherited_members(&self, bases: &[AbstractType]) -> Vec<DeclRef> {
        let mut visited = FxHashSet::default();
        let mut hidden = FxHashSet::default();
        let mut members = Vec::new();
        let mut queue: VecDeque<&AbstractType> = bases.iter().collect();
        while let Some(base) = queue.pop_front() {
            let Some(decl) = base.aggregate() else {
                continue;
            };
            if !visited.insert(decl) {
                continue;
            }
            let source = self.module_of(decl);
            if let Some(scope) = source.scope(ScopeNode::Decl(decl.decl)) {
                let mut declared = Vec::new();
                for (name, decls) in scope.iter() {
                    if hidden.contains(&name) {
                        continue;
                    }
                    let inheritable: Vec<_> = decls.iter().filter(|&&member| is_inheritable(&source, member)).collect();
                    if !inheritable.is_empty() {
                        declared.push(name);
                        members.extend(inheritable.into_iter().map(|&member| DeclRef::new(decl.module, member)));
                    }
                }
                hidden.extend(declared);
            }
            queue.extend(base.bases());
        }
        members
    }

    /// Modules reachable through the imports of the outermost module
    ///
    /// Direct imports count regardless of visibility; further levels only
    /// through `public import`. Each module appears once, at the first
    /// level it is reached.
    fn reachable_modules(&self) -> Vec<Reachable> {
        let Some(root) = self.frames.first() else {
            return Vec::new();
        };
        let mut visited = FxHashSet::default();
        visited.insert(root.module);
        let mut reachable: Vec<Reachable> = Vec::new();
        let mut queue = VecDeque::from([(Arc::clone(&root.source), 0_usize)]);

        while let Some((source, depth)) = queue.pop_front() {
            for import in &source.imports {
                if depth > 0 && import.visibility != ImportVisibility::Public {
                    continue;
                }
                let Some(module) = self.cache().resolve_module(import.module) else {
                    trace!(module = self.interner().resolve(import.module), "import not found");
                    continue;
                };
                if !visited.insert(module) {
                    // widen a selective path when the module is also imported wholesale
                    if let Some(existing) = reachable.iter_mut().find(|entry| entry.module == module)
                        && !existing.selective.is_empty()
                    {
                        if import.selective.is_empty() {
                            existing.selective.clear();
                        } else {
                            existing.selective.extend(import.selective.iter().copied());
                        }
                    }
                    continue;
                }
                let Some(imported) = self.loaded(module) else {
                    continue;
                };
                queue.push_back((Arc::clone(&imported), depth + 1));
                reachable.push(Reachable {
                    module,
                    source: imported,
                    selective: import.selective.clone(),
                });
            }
        }
        reachable
    }

    /// Union of the module-level matches of every reachable module
    fn imported(&self, name: Symbol) -> Vec<DeclRef> {
        let mut found = Vec::new();
        for reachable in self.reachable_modules() {
            if !reachable.exposes(name) {
                continue;
            }
            let Some(scope) = reachable.source.scope(reachable.source.root_scope()) else {
                continue;
            };
            found.extend(
                scope
                    .get(name)
                    .iter()
                    .filter(|&&decl| !reachable.source.decls[decl].has_attribute(Attribute::Private))
                    .map(|&decl| DeclRef::new(reachable.module, decl)),
            );
        }
        found
    }

    /// Module-level declarations named `name`, local module first
    fn module_level(&self, name: Symbol) -> Vec<DeclRef> {
        let mut found = Vec::new();
        if let Some(root) = self.frames.first()
            && let Some(scope) = root.source.scope(root.source.root_scope())
        {
            found.extend(scope.get(name).iter().map(|&decl| DeclRef::new(root.module, decl)));
        }
        found.extend(self.imported(name));
        found
    }

    pub(crate) fn extension_candidates(&mut self, name: Symbol, receiver: &AbstractType) -> Vec<DeclRef> {
        let candidates: Vec<_> = self
            .module_level(name)
            .into_iter()
            .filter(|&decl| matches!(self.module_of(decl).decls[decl.decl].kind, DeclKind::Function { .. }))
            .collect();
        candidates
            .into_iter()
            .filter(|&function| self.accepts_receiver(function, receiver))
            .collect()
    }

    /// Module-level functions whose first parameter accepts `receiver`,
    /// whatever their name
    pub fn extension_functions(&mut self, receiver: &AbstractType) -> Vec<DeclRef> {
        self.guard.reset();
        let mut functions = Vec::new();
        if let Some(root) = self.frames.first().cloned()
            && let Some(scope) = root.source.scope(root.source.root_scope())
        {
            functions.extend(scope.declarations().map(|decl| DeclRef::new(root.module, decl)));
        }
        for reachable in self.reachable_modules() {
            if let Some(scope) = reachable.source.scope(reachable.source.root_scope()) {
                functions.extend(
                    scope
                        .iter()
                        .filter(|(name, _)| reachable.exposes(*name))
                        .flat_map(|(_, decls)| decls.iter())
                        .filter(|&&decl| !reachable.source.decls[decl].has_attribute(Attribute::Private))
                        .map(|&decl| DeclRef::new(reachable.module, decl)),
                );
            }
        }
        functions.retain(|&decl| matches!(self.module_of(decl).decls[decl.decl].kind, DeclKind::Function { .. }));
        functions
            .into_iter()
            .filter(|&function| self.accepts_receiver(function, receiver))
            .collect()
    }
}

/// Template parameters belong to their template and are not inherited
fn is_inheritable(source: &Module, member: ds_dom::DeclId) -> bool {
    !matches!(source.decls[member].kind, DeclKind::TemplateParameter(_))
}

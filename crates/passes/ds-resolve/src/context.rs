//! Resolution context stack
//!
//! A context is the state of one query or one session of queries: the scope
//! stack (innermost last), the location cursor, template bindings in effect
//! and the recursion guard. It borrows the module cache and must not be
//! shared between threads; each query or scan owns its own.
//!
//! Every module a context reads is pinned for the lifetime of the context,
//! so declarations it has handed out stay readable when another thread
//! republishes or invalidates their module.

use crate::guard::{RecursionGuard, RecursionLimits};
use crate::{ModuleCache, TemplateBinding};
use ds_dom::{DeclRef, Module, ModuleId, ScopeNode};
use ds_intern::Interner;
use ds_span::Location;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::trace;

/// One entry of the scope stack
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub(crate) module: ModuleId,
    pub(crate) source: Arc<Module>,
    pub(crate) scope: ScopeNode,
}

/// Proof of a [`ResolutionContext::push_frame`], consumed by `pop_frame`
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a pushed frame must be popped with its token"]
pub struct FrameToken(usize);

/// State of one resolution query or session
pub struct ResolutionContext<'c> {
    cache: &'c ModuleCache,
    pub(crate) frames: Vec<Frame>,
    pub(crate) cursor: Option<Location>,
    bindings: Vec<(DeclRef, TemplateBinding)>,
    pub(crate) guard: RecursionGuard,
    pinned: RefCell<FxHashMap<ModuleId, Arc<Module>>>,
}

impl<'c> ResolutionContext<'c> {
    /// A context positioned at the module scope of `module`, without cursor
    ///
    /// # Panics
    ///
    /// Panics if `module` is not loaded in `cache`.
    pub fn new(cache: &'c ModuleCache, module: ModuleId) -> Self {
        Self::with_limits(cache, module, RecursionLimits::default())
    }

    /// Like [`ResolutionContext::new`] with explicit recursion limits
    ///
    /// # Panics
    ///
    /// Panics if `module` is not loaded in `cache`.
    pub fn with_limits(cache: &'c ModuleCache, module: ModuleId, limits: RecursionLimits) -> Self {
        let source = cache.module(module);
        let scope = source.root_scope();
        let mut pinned = FxHashMap::default();
        pinned.insert(module, Arc::clone(&source));
        Self {
            cache,
            frames: vec![Frame { module, source, scope }],
            cursor: None,
            bindings: Vec::new(),
            guard: RecursionGuard::new(limits),
            pinned: RefCell::new(pinned),
        }
    }

    /// A context for a caret: every scope containing `location` is pushed,
    /// from the module scope down to the innermost block, and the cursor is
    /// set to `location`
    ///
    /// # Panics
    ///
    /// Panics if `module` is not loaded in `cache`.
    pub fn for_location(cache: &'c ModuleCache, module: ModuleId, location: Location) -> Self {
        let mut context = Self::new(cache, module);
        let source = Arc::clone(&context.frames[0].source);
        context.frames = source
            .scope_chain_at(location)
            .into_iter()
            .map(|scope| Frame {
                module,
                source: Arc::clone(&source),
                scope,
            })
            .collect();
        context.cursor = Some(location);
        trace!(%location, depth = context.frames.len(), "context created for location");
        context
    }

    /// The module cache this context reads from
    pub const fn cache(&self) -> &'c ModuleCache {
        self.cache
    }

    /// The interner names are keyed with
    pub const fn interner(&self) -> &'c Interner {
        self.cache.interner()
    }

    /// Restrict block-scoped declarations to those starting at or before
    /// `location`; `None` lifts the restriction
    pub fn set_cursor(&mut self, location: Option<Location>) {
        self.cursor = location;
    }

    /// The active cursor
    pub const fn cursor(&self) -> Option<Location> {
        self.cursor
    }

    /// Module of the innermost scope
    pub fn current_module(&self) -> ModuleId {
        self.innermost().module
    }

    /// Scopes on the stack, outermost first
    pub fn scopes(&self) -> impl Iterator<Item = (ModuleId, ScopeNode)> + '_ {
        self.frames.iter().map(|frame| (frame.module, frame.scope))
    }

    /// Push `scope` of `module`; the returned guard pops it when dropped
    pub fn push(&mut self, module: ModuleId, scope: ScopeNode) -> ScopeGuard<'_, 'c> {
        let token = self.push_frame(module, scope);
        ScopeGuard { context: self, token }
    }

    /// Push `scope` of `module` for a walker that pops in a later callback
    ///
    /// # Panics
    ///
    /// Panics if `module` was never read by this context and is no longer
    /// in the cache.
    pub fn push_frame(&mut self, module: ModuleId, scope: ScopeNode) -> FrameToken {
        let source = self.module_source(module);
        self.frames.push(Frame { module, source, scope });
        FrameToken(self.frames.len() - 1)
    }

    /// Pop the frame pushed when `token` was issued
    ///
    /// # Panics
    ///
    /// Panics if frames pushed after it are still on the stack.
    #[allow(clippy::panic, reason = "Unbalanced scope handling is a caller bug")]
    pub fn pop_frame(&mut self, token: FrameToken) {
        if self.frames.len() != token.0 + 1 {
            panic!(
                "scope frames popped out of order: expected depth {}, found {}",
                token.0 + 1,
                self.frames.len()
            );
        }
        self.frames.pop();
    }

    #[allow(clippy::panic, reason = "The stack always holds the module scope")]
    pub(crate) fn innermost(&self) -> &Frame {
        self.frames
            .last()
            .unwrap_or_else(|| panic!("resolution context has no module scope"))
    }

    /// Parsed source of the innermost scope's module
    pub fn source(&self) -> Arc<Module> {
        Arc::clone(&self.innermost().source)
    }

    /// Parsed source of the module holding `decl`, as this context first
    /// read it
    ///
    /// # Panics
    ///
    /// Panics if `decl` did not come from this context and its module is no
    /// longer in the cache.
    pub fn module_of(&self, decl: DeclRef) -> Arc<Module> {
        self.module_source(decl.module)
    }

    fn module_source(&self, module: ModuleId) -> Arc<Module> {
        if let Some(frame) = self.frames.iter().rev().find(|frame| frame.module == module) {
            return Arc::clone(&frame.source);
        }
        if let Some(source) = self.pinned.borrow().get(&module) {
            return Arc::clone(source);
        }
        let source = self.cache.module(module);
        self.pinned.borrow_mut().insert(module, Arc::clone(&source));
        source
    }

    /// The module `module`, pinned for the rest of this context's life;
    /// `None` if it was never read here and the cache no longer holds it
    pub(crate) fn loaded(&self, module: ModuleId) -> Option<Arc<Module>> {
        if let Some(source) = self.pinned.borrow().get(&module) {
            return Some(Arc::clone(source));
        }
        let source = self.cache.get(module)?;
        self.pinned.borrow_mut().insert(module, Arc::clone(&source));
        Some(source)
    }

    /// Run `f` with the scopes `decl` is declared in (plus its own scope
    /// when `inside` is set) in place of the current stack, without cursor
    pub(crate) fn with_declaration_scope<T>(
        &mut self,
        decl: DeclRef,
        inside: bool,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let source = self.module_of(decl);
        let chain = if inside {
            source.scopes_inside(decl.decl)
        } else {
            source.enclosing_scopes(decl.decl)
        };
        self.with_scopes(decl.module, &source, chain, None, f)
    }

    /// Run `f` with `chain` of `module` in place of the current stack
    pub(crate) fn with_scopes<T>(
        &mut self,
        module: ModuleId,
        source: &Arc<Module>,
        mut chain: Vec<ScopeNode>,
        cursor: Option<Location>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        if chain.is_empty() {
            chain.push(source.root_scope());
        }
        let frames = chain
            .into_iter()
            .map(|scope| Frame {
                module,
                source: Arc::clone(source),
                scope,
            })
            .collect();

        let saved_frames = std::mem::replace(&mut self.frames, frames);
        let saved_cursor = std::mem::replace(&mut self.cursor, cursor);
        let result = f(self);
        self.frames = saved_frames;
        self.cursor = saved_cursor;
        result
    }

    /// Run `f` with template parameters bound
    pub(crate) fn with_bindings<T>(
        &mut self,
        bindings: Vec<(DeclRef, TemplateBinding)>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let depth = self.bindings.len();
        self.bindings.extend(bindings);
        let result = f(self);
        self.bindings.truncate(depth);
        result
    }

    /// Innermost binding of a template parameter
    pub(crate) fn binding_of(&self, parameter: DeclRef) -> Option<&TemplateBinding> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| *bound == parameter)
            .map(|(_, binding)| binding)
    }
}

/// A pushed scope; dereferences to the context and pops on drop
pub struct ScopeGuard<'a, 'c> {
    context: &'a mut ResolutionContext<'c>,
    token: FrameToken,
}

impl<'c> Deref for ScopeGuard<'_, 'c> {
    type Target = ResolutionContext<'c>;

    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl DerefMut for ScopeGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl Drop for ScopeGuard<'_, '_> {
    fn drop(&mut self) {
        self.context.pop_frame(FrameToken(self.token.0));
    }
}

//! Parsed in-memory workspaces for unit tests

use crate::{AbstractType, ModuleCache, ResolutionContext};
use ds_dom::{DeclKind, DeclRef, ExprId, ModuleId};
use ds_intern::{Interner, Symbol};
use ds_span::Location;
use rustc_hash::FxHashMap;

pub(crate) struct Workspace {
    cache: ModuleCache,
    ids: FxHashMap<String, ModuleId>,
}

impl Workspace {
    /// Parse `(name, source)` pairs into a fresh cache
    pub(crate) fn new(sources: &[(&str, &str)]) -> Self {
        let cache = ModuleCache::new(Interner::new());
        let mut ids = FxHashMap::default();
        for (name, source) in sources {
            let output = ds_parser::parse_module(source, &format!("{name}.d"), cache.interner());
            assert!(output.errors.is_empty(), "parse errors in {name}: {:?}", output.errors);
            ids.insert((*name).to_owned(), cache.insert(output.module));
        }
        Self { cache, ids }
    }

    /// Parse `source` and publish it in place of the module `name`
    pub(crate) fn republish(&self, name: &str, source: &str) -> ModuleId {
        let output = ds_parser::parse_module(source, &format!("{name}.d"), self.cache.interner());
        assert!(output.errors.is_empty(), "parse errors in {name}: {:?}", output.errors);
        self.cache.insert(output.module)
    }

    pub(crate) const fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    pub(crate) fn id(&self, module: &str) -> ModuleId {
        self.ids[module]
    }

    pub(crate) fn context(&self, module: &str) -> ResolutionContext<'_> {
        ResolutionContext::new(&self.cache, self.id(module))
    }

    pub(crate) fn context_at(&self, module: &str, location: Location) -> ResolutionContext<'_> {
        ResolutionContext::for_location(&self.cache, self.id(module), location)
    }

    pub(crate) fn name(&self, text: &str) -> Symbol {
        self.cache.interner().intern(text)
    }

    pub(crate) fn text(&self, name: Symbol) -> &str {
        self.cache.interner().resolve(name)
    }

    /// First declaration called `name` in `module`, in source order
    pub(crate) fn decl(&self, module: &str, name: &str) -> DeclRef {
        let id = self.id(module);
        let source = self.cache.module(id);
        let decl = source
            .declarations_named(self.name(name))
            .min_by_key(|&decl| source.decls[decl].name_span.start)
            .unwrap_or_else(|| panic!("no declaration named {name} in {module}"));
        DeclRef::new(id, decl)
    }

    pub(crate) fn initializer(&self, module: &str, variable: &str) -> ExprId {
        let decl = self.decl(module, variable);
        match self.cache.module(decl.module).decls[decl.decl].kind {
            DeclKind::Variable {
                initializer: Some(initializer),
                ..
            } => initializer,
            _ => panic!("{variable} has no initializer"),
        }
    }

    pub(crate) fn decl_line(&self, decl: DeclRef) -> u32 {
        self.cache.module(decl.module).decls[decl.decl].name_span.start.line
    }

    pub(crate) fn decl_name(&self, decl: DeclRef) -> String {
        self.cache.module(decl.module).decls[decl.decl]
            .name
            .map_or_else(String::new, |name| self.text(name).to_owned())
    }

    /// Name of `decl` read through `context` rather than the cache
    pub(crate) fn decl_name_in(&self, context: &ResolutionContext<'_>, decl: DeclRef) -> String {
        context.module_of(decl).decls[decl.decl]
            .name
            .map_or_else(String::new, |name| self.text(name).to_owned())
    }

    pub(crate) fn show(&self, ty: &AbstractType) -> String {
        ty.display(&self.cache).to_string()
    }
}

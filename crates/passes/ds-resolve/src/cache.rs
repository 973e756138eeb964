//! Process-wide module cache
//!
//! The cache is owned by the workspace and handed to every
//! [`ResolutionContext`](crate::ResolutionContext); nothing in the engine
//! reaches it through global state. Modules are published once per name:
//! the first request for a missing module runs the loader while concurrent
//! requests for the same name wait on that key's `OnceLock`.

use dashmap::DashMap;
use ds_dom::{Module, ModuleId};
use ds_intern::{Interner, Symbol};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Lazily parses modules that are imported but not yet cached
///
/// Loading must be idempotent and free of side effects apart from the
/// returned module.
pub trait ModuleLoader: Send + Sync {
    /// Parse the module with the fully qualified name `name`
    fn load(&self, name: Symbol, interner: &Interner) -> Option<Module>;
}

type Slot = Arc<OnceLock<Option<ModuleId>>>;

/// Cache of parsed modules keyed by qualified name
pub struct ModuleCache {
    interner: Interner,
    loader: Option<Box<dyn ModuleLoader>>,
    modules: DashMap<ModuleId, Arc<Module>>,
    by_name: DashMap<Symbol, Slot>,
    next_id: AtomicU32,
}

impl ModuleCache {
    /// An empty cache without a loader; modules must be inserted
    pub fn new(interner: Interner) -> Self {
        Self {
            interner,
            loader: None,
            modules: DashMap::new(),
            by_name: DashMap::new(),
            next_id: AtomicU32::new(0),
        }
    }

    /// An empty cache that loads unknown modules through `loader`
    pub fn with_loader(interner: Interner, loader: impl ModuleLoader + 'static) -> Self {
        Self {
            loader: Some(Box::new(loader)),
            ..Self::new(interner)
        }
    }

    /// The interner every cached module was parsed with
    pub const fn interner(&self) -> &Interner {
        &self.interner
    }

    fn allocate(&self, module: Module) -> ModuleId {
        let id = ModuleId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.modules.insert(id, Arc::new(module));
        id
    }

    /// Publish a parsed module, replacing any module with the same name
    pub fn insert(&self, module: Module) -> ModuleId {
        let name = module.name;
        let id = self.allocate(module);
        let previous = self.by_name.insert(name, Arc::new(OnceLock::from(Some(id))));
        if let Some(old) = previous.and_then(|slot| slot.get().copied().flatten()) {
            self.modules.remove(&old);
        }
        debug!(module = self.interner.resolve(name), ?id, "module published");
        id
    }

    /// The module named `name`, loading it on first request
    ///
    /// A failed load is remembered until the name is invalidated or a
    /// module with that name is inserted.
    pub fn resolve_module(&self, name: Symbol) -> Option<ModuleId> {
        // clone the slot out so the shard lock is not held while loading
        let slot: Slot = Arc::clone(self.by_name.entry(name).or_default().value());
        *slot.get_or_init(|| {
            let module = self.loader.as_ref()?.load(name, &self.interner)?;
            let id = self.allocate(module);
            debug!(module = self.interner.resolve(name), ?id, "module loaded");
            Some(id)
        })
    }

    /// Drop the module named `name`; the next request loads it again
    pub fn invalidate(&self, name: Symbol) {
        if let Some((_, slot)) = self.by_name.remove(&name)
            && let Some(id) = slot.get().copied().flatten()
        {
            self.modules.remove(&id);
            debug!(module = self.interner.resolve(name), ?id, "module invalidated");
        }
    }

    /// The module with identity `id`, if it is still cached
    pub fn get(&self, id: ModuleId) -> Option<Arc<Module>> {
        self.modules.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// The module with identity `id`
    ///
    /// # Panics
    ///
    /// Panics if `id` is not cached. Identities come from this cache, so a
    /// missing module means a stale identity survived an invalidation.
    #[allow(clippy::panic, reason = "Stale module identities are a caller bug")]
    pub fn module(&self, id: ModuleId) -> Arc<Module> {
        self.get(id)
            .unwrap_or_else(|| panic!("module {id:?} is not loaded in the module cache"))
    }

    /// Number of cached modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no module is cached
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl fmt::Debug for ModuleCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleCache")
            .field("modules", &self.modules.len())
            .field("has_loader", &self.loader.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingLoader {
        loads: Arc<AtomicUsize>,
    }

    impl ModuleLoader for CountingLoader {
        fn load(&self, name: Symbol, interner: &Interner) -> Option<Module> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let text = interner.resolve(name);
            (text != "missing").then(|| {
                ds_parser::parse_module(&format!("module {text};\nint value;"), "loaded.d", interner).module
            })
        }
    }

    #[test]
    fn test_insert_replaces_same_name() {
        let interner = Interner::new();
        let cache = ModuleCache::new(interner.clone());
        let first = cache.insert(ds_parser::parse_module("module a; int x;", "a.d", &interner).module);
        let second = cache.insert(ds_parser::parse_module("module a; int y;", "a.d", &interner).module);
        assert_ne!(first, second);
        assert!(cache.get(first).is_none());
        assert_eq!(cache.resolve_module(interner.intern("a")), Some(second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_loads_are_remembered_until_invalidated() {
        let interner = Interner::new();
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = ModuleCache::with_loader(interner.clone(), CountingLoader { loads: Arc::clone(&loads) });
        let missing = interner.intern("missing");
        assert_eq!(cache.resolve_module(missing), None);
        assert_eq!(cache.resolve_module(missing), None);
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        cache.invalidate(missing);
        assert_eq!(cache.resolve_module(missing), None);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_first_requests_load_once() {
        let interner = Interner::new();
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = ModuleCache::with_loader(interner.clone(), CountingLoader { loads: Arc::clone(&loads) });
        let name = interner.intern("lib.util");

        let ids: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| cache.resolve_module(name))).collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(ids.iter().all(|id| id.is_some() && *id == ids[0]));
    }
}

//! Integration test utilities for the resolution engine

use anyhow::{Context, Result, bail};
use ds_dom::{DeclRef, Module, ModuleId};
use ds_intern::{Interner, Symbol};
use ds_resolve::{ModuleCache, ModuleLoader, ResolutionContext};
use ds_span::Location;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Install a log subscriber when `DS_LOG` is set
///
/// Safe to call from every test; only the first call has an effect.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        if let Ok(filter) = EnvFilter::try_from_env("DS_LOG")
            && let Err(error) = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_test_writer()
                .try_init()
        {
            debug!(%error, "log subscriber already installed");
        }
    });
}

/// Parses modules from in-memory sources keyed by qualified name
#[derive(Debug, Default)]
pub struct SourceLoader {
    sources: HashMap<String, String>,
    loads: Arc<AtomicUsize>,
}

impl ModuleLoader for SourceLoader {
    fn load(&self, name: Symbol, interner: &Interner) -> Option<Module> {
        let qualified = interner.resolve(name);
        let source = self.sources.get(qualified)?;
        self.loads.fetch_add(1, Ordering::SeqCst);
        let file_name = format!("{}.d", qualified.replace('.', "/"));
        let output = ds_parser::parse_module(source, &file_name, interner);
        debug!(module = qualified, errors = output.errors.len(), "fixture module parsed");
        Some(output.module)
    }
}

/// A workspace of modules that are parsed on first import
pub struct TestFixture {
    /// Cache shared by every query of the fixture
    pub cache: ModuleCache,
    loads: Arc<AtomicUsize>,
}

impl TestFixture {
    /// A fixture over `(qualified name, source)` pairs
    pub fn new<N, S>(sources: impl IntoIterator<Item = (N, S)>) -> Self
    where
        N: Into<String>,
        S: Into<String>,
    {
        init_tracing();
        let loads = Arc::new(AtomicUsize::new(0));
        let loader = SourceLoader {
            sources: sources
                .into_iter()
                .map(|(name, source)| (name.into(), source.into()))
                .collect(),
            loads: Arc::clone(&loads),
        };
        Self {
            cache: ModuleCache::with_loader(Interner::new(), loader),
            loads,
        }
    }

    /// Loads every `.d` file below `dir`
    ///
    /// `a/b.d` becomes the module `a.b`.
    ///
    /// # Errors
    ///
    /// Returns an error if directory traversal or file reading fails
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let base = dir.as_ref();
        let mut sources = Vec::new();
        collect_sources(base, base, &mut sources)?;
        if sources.is_empty() {
            bail!("No modules found in {}", base.display());
        }
        Ok(Self::new(sources))
    }

    /// The module with qualified name `name`, parsing it if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the fixture has no such module
    pub fn module(&self, name: &str) -> Result<ModuleId> {
        let symbol = self.cache.interner().intern(name);
        self.cache
            .resolve_module(symbol)
            .with_context(|| format!("Fixture has no module named {name}"))
    }

    /// Number of modules the loader has parsed so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// First declaration called `name` in `module`, in source order
    ///
    /// # Errors
    ///
    /// Returns an error if the module or the declaration does not exist
    pub fn declaration(&self, module: &str, name: &str) -> Result<DeclRef> {
        let id = self.module(module)?;
        let source = self.cache.module(id);
        let decl = source
            .declarations_named(self.cache.interner().intern(name))
            .min_by_key(|&decl| source.decls[decl].name_span.start)
            .with_context(|| format!("No declaration named {name} in {module}"))?;
        Ok(DeclRef::new(id, decl))
    }

    /// A resolution context at module level of `module`
    ///
    /// # Errors
    ///
    /// Returns an error if the fixture has no such module
    pub fn context(&self, module: &str) -> Result<ResolutionContext<'_>> {
        Ok(ResolutionContext::new(&self.cache, self.module(module)?))
    }

    /// Intern `text` with the fixture's interner
    pub fn name(&self, text: &str) -> Symbol {
        self.cache.interner().intern(text)
    }

    /// A resolution context at `line:column` of `module`
    ///
    /// # Errors
    ///
    /// Returns an error if the fixture has no such module
    pub fn context_at(&self, module: &str, line: u32, column: u32) -> Result<ResolutionContext<'_>> {
        let id = self.module(module)?;
        Ok(ResolutionContext::for_location(&self.cache, id, Location::new(line, column)))
    }

    /// Line of the name of `decl`
    pub fn line_of(&self, decl: DeclRef) -> u32 {
        self.cache.module(decl.module).decls[decl.decl].name_span.start.line
    }
}

fn collect_sources(base: &Path, dir: &Path, sources: &mut Vec<(String, String)>) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(fs::DirEntry::path);

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            collect_sources(base, &path, sources)?;
        } else if path.extension().is_some_and(|extension| extension == "d") {
            let relative = path.strip_prefix(base)?.with_extension("");
            let name = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join(".");
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
            sources.push((name, contents));
        }
    }
    Ok(())
}

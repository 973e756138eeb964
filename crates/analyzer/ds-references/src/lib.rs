//! Find-references scanner
//!
//! Walks a module in document order with a live resolution context, resolves
//! every identifier, type reference and template instance spelled like the
//! target, and keeps the ones that resolve to it.

use ds_dom::visitor::{self, Visitor};
use ds_dom::{DeclId, DeclKind, DeclRef, Expr, ExprId, Module, ModuleId, ScopeNode, TypeRef, TypeRefId};
use ds_intern::Symbol;
use ds_resolve::{AbstractType, FrameToken, ModuleCache, ResolutionContext, ResolutionError};
use ds_span::Span;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Scanner settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceOptions {
    /// Report the definition site as the first reference
    pub include_definition: bool,
}

impl Default for ReferenceOptions {
    fn default() -> Self {
        Self {
            include_definition: true,
        }
    }
}

/// Syntactic position a reference was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// The declaration's own name
    Definition,
    /// A type expression
    Type,
    /// An identifier expression
    Expression,
    /// `Name!(...)` in type or expression position
    TemplateInstance,
    /// The member part of `a.b`
    MemberAccess,
    /// A use of a template parameter inside its template
    TemplateParameter,
}

/// One occurrence of the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Module the occurrence is in
    pub module: ModuleId,
    /// Span of the name
    pub span: Span,
    /// Where it occurs
    pub kind: ReferenceKind,
}

/// Every reference to `target` in `module`, in document order
///
/// # Panics
///
/// Panics if `module` or the module of `target` is not loaded in `cache`.
pub fn scan(cache: &ModuleCache, module: ModuleId, target: DeclRef, options: &ReferenceOptions) -> Vec<Reference> {
    let source = cache.module(module);
    let target_module = cache.module(target.module);
    let Some(name) = target_module.decls[target.decl].name else {
        return Vec::new();
    };
    let is_parameter = matches!(target_module.decls[target.decl].kind, DeclKind::TemplateParameter(_));

    let mut scanner = Scanner {
        context: ResolutionContext::new(cache, module),
        module,
        target,
        name,
        is_parameter,
        frames: Vec::new(),
        found: Vec::new(),
    };
    visitor::walk_module(&mut scanner, &source);
    let mut found = scanner.found;

    if options.include_definition && target.module == module {
        let definitions = definition_sites(&source, target.decl);
        for span in definitions {
            if !found.iter().any(|reference| reference.span == span) {
                found.push(Reference {
                    module,
                    span,
                    kind: ReferenceKind::Definition,
                });
            }
        }
    }
    found.sort_by_key(|reference| (reference.span.start, reference.span.end));
    found.dedup_by_key(|reference| reference.span);

    debug!(
        target = cache.interner().resolve(name),
        matches = found.len(),
        "reference scan finished"
    );
    found
}

/// [`scan`] over several modules, concatenated in the given order
///
/// # Panics
///
/// As [`scan`].
pub fn scan_modules(
    cache: &ModuleCache,
    modules: &[ModuleId],
    target: DeclRef,
    options: &ReferenceOptions,
) -> Vec<Reference> {
    modules
        .iter()
        .flat_map(|&module| scan(cache, module, target, options))
        .collect()
}

/// Name site of the target, preceded by the name of the template it is the
/// eponymous member of
fn definition_sites(source: &Module, decl: DeclId) -> Vec<Span> {
    let mut sites = Vec::new();
    if let Some(template) = source.eponymous_template(decl) {
        sites.push(source.decls[template].name_span);
    }
    sites.push(source.decls[decl].name_span);
    sites
}

struct Scanner<'c> {
    context: ResolutionContext<'c>,
    module: ModuleId,
    target: DeclRef,
    name: Symbol,
    is_parameter: bool,
    frames: Vec<FrameToken>,
    found: Vec<Reference>,
}

impl<'c> Scanner<'c> {
    /// Resolve a candidate occurrence at `span` and keep it if it is the target
    fn check(
        &mut self,
        span: Span,
        kind: ReferenceKind,
        resolve: impl FnOnce(&mut ResolutionContext<'c>) -> Result<AbstractType, ResolutionError>,
    ) {
        self.context.set_cursor(Some(span.start));
        let resolved = resolve(&mut self.context);
        if !self.is_target(&resolved) {
            trace!(%span, "same name, different symbol");
            return;
        }
        let kind = if self.is_parameter {
            ReferenceKind::TemplateParameter
        } else {
            kind
        };
        self.found.push(Reference {
            module: self.module,
            span,
            kind,
        });
    }

    fn is_target(&self, resolved: &Result<AbstractType, ResolutionError>) -> bool {
        match resolved {
            Ok(resolved) => resolved.declaration() == Some(self.target),
            Err(ResolutionError::AmbiguousOverload { candidates, .. }) => candidates.contains(&self.target),
            Err(
                ResolutionError::ArityMismatch { decl, .. } | ResolutionError::ConstraintNotSatisfied { decl, .. },
            ) => *decl == self.target,
            Err(_) => false,
        }
    }

    /// The member part of an access; `resolve` resolves the whole access
    fn visit_member_expr(
        &mut self,
        module: &Module,
        member: ExprId,
        resolve: impl FnOnce(&mut ResolutionContext<'c>) -> Result<AbstractType, ResolutionError>,
    ) {
        match &module.exprs[member] {
            Expr::Identifier { name, span } if *name == self.name => {
                self.check(*span, ReferenceKind::MemberAccess, resolve);
            }
            Expr::TemplateInstance { name, name_span, .. } => {
                if *name == self.name {
                    self.check(*name_span, ReferenceKind::MemberAccess, resolve);
                }
                visitor::walk_expr(self, module, member);
            }
            _ => {}
        }
    }
}

impl Visitor for Scanner<'_> {
    fn visit_type_ref(&mut self, module: &Module, ty: TypeRefId) {
        match &module.types[ty] {
            TypeRef::Identifier { name, span } if *name == self.name => {
                self.check(*span, ReferenceKind::Type, |context| context.resolve_type(ty));
            }
            TypeRef::TemplateInstance { name, name_span, .. } => {
                if *name == self.name {
                    self.check(*name_span, ReferenceKind::TemplateInstance, |context| {
                        context.resolve_type(ty)
                    });
                }
                visitor::walk_type_ref(self, module, ty);
            }
            TypeRef::Member { base, member, .. } => {
                self.visit_type_ref(module, *base);
                match &module.types[*member] {
                    TypeRef::Identifier { name, span } if *name == self.name => {
                        self.check(*span, ReferenceKind::MemberAccess, |context| context.resolve_type(ty));
                    }
                    TypeRef::TemplateInstance { name, name_span, .. } => {
                        if *name == self.name {
                            self.check(*name_span, ReferenceKind::MemberAccess, |context| {
                                context.resolve_type(ty)
                            });
                        }
                        visitor::walk_type_ref(self, module, *member);
                    }
                    _ => {}
                }
            }
            _ => visitor::walk_type_ref(self, module, ty),
        }
    }

    fn visit_expr(&mut self, module: &Module, expr: ExprId) {
        match &module.exprs[expr] {
            Expr::Identifier { name, span } if *name == self.name => {
                self.check(*span, ReferenceKind::Expression, |context| context.resolve_expression(expr));
            }
            Expr::TemplateInstance { name, name_span, .. } => {
                if *name == self.name {
                    self.check(*name_span, ReferenceKind::TemplateInstance, |context| {
                        context.resolve_expression(expr)
                    });
                }
                visitor::walk_expr(self, module, expr);
            }
            Expr::Access { base, member, .. } => {
                self.visit_expr(module, *base);
                self.visit_member_expr(module, *member, |context| context.resolve_expression(expr));
            }
            Expr::Call { callee, args, .. } => {
                // the callee is resolved as part of the call so overloads see the arguments
                match &module.exprs[*callee] {
                    Expr::Identifier { name, span } if *name == self.name => {
                        self.check(*span, ReferenceKind::Expression, |context| context.resolve_call_target(expr));
                    }
                    Expr::TemplateInstance { name, name_span, .. } => {
                        if *name == self.name {
                            self.check(*name_span, ReferenceKind::TemplateInstance, |context| {
                                context.resolve_call_target(expr)
                            });
                        }
                        visitor::walk_expr(self, module, *callee);
                    }
                    Expr::Access { base, member, .. } => {
                        self.visit_expr(module, *base);
                        self.visit_member_expr(module, *member, |context| context.resolve_call_target(expr));
                    }
                    _ => self.visit_expr(module, *callee),
                }
                for &arg in args {
                    self.visit_expr(module, arg);
                }
            }
            _ => visitor::walk_expr(self, module, expr),
        }
    }

    fn enter_scope(&mut self, module: &Module, scope: ScopeNode) {
        if scope != module.root_scope() {
            self.frames.push(self.context.push_frame(self.module, scope));
        }
    }

    fn exit_scope(&mut self, module: &Module, scope: ScopeNode) {
        if scope != module.root_scope()
            && let Some(token) = self.frames.pop()
        {
            self.context.pop_frame(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ds_intern::Interner;
    use ds_span::Location;
    use expect_test::expect;

    fn workspace(sources: &[&str]) -> (ModuleCache, Vec<ModuleId>) {
        let cache = ModuleCache::new(Interner::new());
        let ids = sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                let output = ds_parser::parse_module(source, &format!("m{index}.d"), cache.interner());
                assert!(output.errors.is_empty(), "parse errors: {:?}", output.errors);
                cache.insert(output.module)
            })
            .collect();
        (cache, ids)
    }

    fn declaration(cache: &ModuleCache, module: ModuleId, name: &str) -> DeclRef {
        let source = cache.module(module);
        let decl = source
            .declarations_named(cache.interner().intern(name))
            .min_by_key(|&decl| source.decls[decl].name_span.start)
            .unwrap();
        DeclRef::new(module, decl)
    }

    fn positions(references: &[Reference]) -> Vec<(u32, u32)> {
        references
            .iter()
            .map(|reference| (reference.span.start.line, reference.span.start.column))
            .collect()
    }

    const SAMPLE: &str = "module modA;
class A(T = int) {
    static int prop;
    static A statA;
}
A a = new A();
void main() {
    A.prop = 3;
    int b = A.prop + 4;
    A.statA.statA = new A!float();
}
";

    #[test]
    fn test_template_class_references() {
        let (cache, ids) = workspace(&[SAMPLE]);
        let target = declaration(&cache, ids[0], "A");
        let found = scan(&cache, ids[0], target, &ReferenceOptions::default());

        assert_eq!(found.len(), 8);
        assert_eq!(
            positions(&found),
            vec![(2, 7), (4, 12), (6, 1), (6, 11), (8, 5), (9, 13), (10, 5), (10, 25)]
        );
        assert_eq!(found[0].kind, ReferenceKind::Definition);
        assert_eq!(found[7].kind, ReferenceKind::TemplateInstance);
    }

    #[test]
    fn test_without_definition() {
        let (cache, ids) = workspace(&[SAMPLE]);
        let target = declaration(&cache, ids[0], "A");
        let options = ReferenceOptions {
            include_definition: false,
        };
        let found = scan(&cache, ids[0], target, &options);
        assert_eq!(found.len(), 7);
        assert!(found.iter().all(|reference| reference.kind != ReferenceKind::Definition));
    }

    #[test]
    fn test_shadowed_names_are_not_references() {
        let (cache, ids) = workspace(&[
            "module m;\nint value;\nvoid f() {\n    value = 1;\n    int value;\n    value = 2;\n}\nvoid g() { value = 3; }\n",
        ]);
        let target = declaration(&cache, ids[0], "value");
        let found = scan(&cache, ids[0], target, &ReferenceOptions::default());
        assert_eq!(positions(&found), vec![(2, 5), (4, 5), (8, 12)]);
    }

    #[test]
    fn test_members_and_overloads() {
        let (cache, ids) = workspace(&[
            "module m;\nstruct S { int field; }\nvoid put(int x) {}\nvoid put(S s) {}\nvoid main() {\n    S s;\n    s.field = 1;\n    put(s);\n    put(2);\n}\n",
        ]);
        let field = declaration(&cache, ids[0], "field");
        let found = scan(&cache, ids[0], field, &ReferenceOptions::default());
        assert_eq!(positions(&found), vec![(2, 16), (7, 7)]);
        assert_eq!(found[1].kind, ReferenceKind::MemberAccess);

        let second_put = DeclRef::new(
            ids[0],
            cache
                .module(ids[0])
                .declarations_named(cache.interner().intern("put"))
                .max_by_key(|&decl| cache.module(ids[0]).decls[decl].name_span.start)
                .unwrap(),
        );
        let found = scan(&cache, ids[0], second_put, &ReferenceOptions::default());
        assert_eq!(positions(&found), vec![(4, 6), (8, 5)]);
    }

    #[test]
    fn test_alias_uses_count_for_the_alias() {
        let (cache, ids) = workspace(&["module m;\nclass Target {}\nalias Target Other;\nOther one;\nTarget two;\n"]);
        let alias = declaration(&cache, ids[0], "Other");
        let found = scan(&cache, ids[0], alias, &ReferenceOptions::default());
        assert_eq!(positions(&found), vec![(3, 14), (4, 1)]);

        let class = declaration(&cache, ids[0], "Target");
        let found = scan(&cache, ids[0], class, &ReferenceOptions::default());
        assert_eq!(positions(&found), vec![(2, 7), (3, 7), (5, 1)]);
    }

    #[test]
    fn test_eponymous_template_definition() {
        let (cache, ids) = workspace(&["module m;\ntemplate Box(T) {\n    class Box { T item; }\n}\n"]);
        let source = cache.module(ids[0]);
        let inner = source
            .declarations_named(cache.interner().intern("Box"))
            .max_by_key(|&decl| source.decls[decl].name_span.start)
            .unwrap();
        let found = scan(&cache, ids[0], DeclRef::new(ids[0], inner), &ReferenceOptions::default());
        assert_eq!(positions(&found), vec![(2, 10), (3, 11)]);
        assert!(found.iter().all(|reference| reference.kind == ReferenceKind::Definition));
    }

    #[test]
    fn test_template_parameter_references() {
        let (cache, ids) = workspace(&["module m;\nclass C(T) {\n    T first;\n    T[] rest;\n}\n"]);
        let source = cache.module(ids[0]);
        let class = declaration(&cache, ids[0], "C");
        let parameter = DeclRef::new(ids[0], source.decls[class.decl].template_parameters[0]);
        let found = scan(&cache, ids[0], parameter, &ReferenceOptions::default());
        let rendered: Vec<_> = found
            .iter()
            .map(|reference| format!("{} {:?}", reference.span.start, reference.kind))
            .collect();
        expect![[r#"
            2:9 Definition
            3:5 TemplateParameter
            4:5 TemplateParameter"#]]
        .assert_eq(&rendered.join("\n"));
    }

    #[test]
    fn test_references_across_modules() {
        let (cache, ids) = workspace(&[
            "module lib;\nclass Shared {}\n",
            "module app;\nimport lib;\nShared instance;\n",
        ]);
        let target = declaration(&cache, ids[0], "Shared");
        let found = scan_modules(&cache, &ids, target, &ReferenceOptions::default());
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].module, ids[0]);
        assert_eq!(found[1].module, ids[1]);
        assert_eq!(found[1].span.start, Location::new(3, 1));
    }

    #[test]
    fn test_options_from_toml() {
        let options: ReferenceOptions = toml::from_str("include_definition = false").unwrap();
        assert!(!options.include_definition);
        let defaults: ReferenceOptions = toml::from_str("").unwrap();
        assert_eq!(defaults, ReferenceOptions::default());
    }
}

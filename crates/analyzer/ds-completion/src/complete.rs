//! Completion item collection

use crate::{CompletionContext, CompletionOptions, MemberFilter, detect_context};
use ds_dom::{DeclRef, Expr, ExprId, ModuleId};
use ds_resolve::{ModuleCache, ResolutionContext};
use ds_span::Location;
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

/// One completion proposal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    /// Text to insert
    pub label: String,
    /// The proposed declaration
    pub decl: DeclRef,
    /// Kind of the declaration
    pub kind: MemberFilter,
    /// A free function offered as a member of its first argument
    pub ufcs: bool,
}

/// Completion proposals for the caret in `module`
///
/// Items come in scope order (innermost first), then declaration order;
/// member completions list own members, inherited members and then free
/// functions accepting the receiver.
///
/// # Panics
///
/// Panics if `module` is not loaded in `cache`.
pub fn complete(
    cache: &ModuleCache,
    module: ModuleId,
    caret: Location,
    options: &CompletionOptions,
) -> Vec<CompletionItem> {
    let source = cache.module(module);
    let detected = detect_context(&source, caret);
    trace!(%caret, ?detected, "completion context");

    let mut context = ResolutionContext::for_location(cache, module, caret);
    let proposals = match detected {
        CompletionContext::None => Vec::new(),
        CompletionContext::Symbols { filter } => context
            .visible_declarations()
            .into_iter()
            .filter(|&decl| filter.accepts(&context.module_of(decl).decls[decl.decl]))
            .map(|decl| (decl, false))
            .collect(),
        CompletionContext::MemberAccess { base } => member_proposals(&mut context, base, options),
    };

    let mut seen = FxHashSet::default();
    let items: Vec<_> = proposals
        .into_iter()
        .filter(|(decl, _)| seen.insert(*decl))
        .filter_map(|(decl, ufcs)| {
            let source = context.module_of(decl);
            let declaration = &source.decls[decl.decl];
            Some(CompletionItem {
                label: cache.interner().resolve(declaration.name?).to_owned(),
                decl,
                kind: MemberFilter::for_declaration(declaration),
                ufcs,
            })
        })
        .collect();
    debug!(%caret, items = items.len(), "completion finished");
    items
}

fn member_proposals(
    context: &mut ResolutionContext<'_>,
    base: ExprId,
    options: &CompletionOptions,
) -> Vec<(DeclRef, bool)> {
    let Ok(receiver) = context.resolve_expression(base) else {
        trace!("receiver does not resolve");
        return Vec::new();
    };
    let mut proposals: Vec<_> = context
        .members_of(&receiver)
        .into_iter()
        .map(|member| (member, false))
        .collect();

    // a type name is not an argument, but any other expression is
    let source = context.source();
    let names_type = receiver.is_type()
        && matches!(
            source.exprs[base],
            Expr::Identifier { .. } | Expr::TemplateInstance { .. } | Expr::Access { .. }
        );
    if options.enable_ufcs_completion
        && !names_type
        && let Some(value) = receiver.value_type().cloned()
    {
        proposals.extend(
            context
                .extension_functions(&value)
                .into_iter()
                .map(|function| (function, true)),
        );
    }
    proposals
}

#[cfg(test)]
mod tests {
    use super::*;
    use ds_intern::Interner;
    use expect_test::expect;

    const SOURCE: &str = "\
module shapes;

class Shape {
    int area;
    void draw() {}
}

class Circle : Shape {
    int radius;
}

int scaled(Shape shape, int factor) { return factor; }
int twice(int value) { return value; }

void main() {
    Circle circle;
    int count;
    circle.
}

void other() {
    Circle.
}
";

    fn complete_at(line: u32, column: u32, options: &CompletionOptions) -> Vec<CompletionItem> {
        let cache = ModuleCache::new(Interner::new());
        let output = ds_parser::parse_module(SOURCE, "shapes.d", cache.interner());
        let module = cache.insert(output.module);
        complete(&cache, module, Location::new(line, column), options)
    }

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|item| item.label.as_str()).collect()
    }

    #[test]
    fn test_members_with_inherited_and_ufcs() {
        let items = complete_at(18, 12, &CompletionOptions::default());
        let rendered: Vec<_> = items
            .iter()
            .map(|item| format!("{} {:?}{}", item.label, item.kind, if item.ufcs { " ufcs" } else { "" }))
            .collect();
        expect![[r#"
            radius MemberFilter(VARIABLES)
            area MemberFilter(VARIABLES)
            draw MemberFilter(METHODS)
            scaled MemberFilter(METHODS) ufcs"#]]
        .assert_eq(&rendered.join("\n"));
    }

    #[test]
    fn test_ufcs_items_can_be_disabled() {
        let options = CompletionOptions {
            enable_ufcs_completion: false,
        };
        let items = complete_at(18, 12, &options);
        assert_eq!(labels(&items), ["radius", "area", "draw"]);
    }

    #[test]
    fn test_type_receivers_get_no_ufcs_items() {
        let items = complete_at(22, 12, &CompletionOptions::default());
        assert!(!items.is_empty());
        assert!(items.iter().all(|item| !item.ufcs));
    }

    #[test]
    fn test_type_position_lists_types_only() {
        let items = complete_at(16, 5, &CompletionOptions::default());
        let labels = labels(&items);
        assert!(labels.contains(&"Shape"));
        assert!(labels.contains(&"Circle"));
        assert!(!labels.contains(&"scaled"));
        assert!(!labels.contains(&"count"));
    }

    #[test]
    fn test_expression_position_lists_locals_first() {
        let items = complete_at(18, 5, &CompletionOptions::default());
        let labels = labels(&items);
        assert_eq!(labels[..2], ["circle", "count"]);
        for expected in ["main", "twice", "scaled", "Circle", "Shape"] {
            assert!(labels.contains(&expected), "missing {expected}");
        }
        assert!(!labels.contains(&"radius"));
    }
}

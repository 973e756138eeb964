//! Symbol and type resolution engine
//!
//! Answers "what does this name mean here?" over parsed modules:
//!
//! - [`ModuleCache`] holds every parsed module of a workspace and loads
//!   imports lazily through a [`ModuleLoader`].
//! - [`ResolutionContext`] is the per-query scope stack with a location
//!   cursor, the template bindings in effect and a recursion guard.
//! - Lookup walks the stack innermost first, then imports.
//! - The template matcher binds explicit or deduced arguments to template
//!   parameters, honouring constraints, specializations and defaults.
//! - The resolver turns names, type expressions and expressions into
//!   [`AbstractType`]s.
//!
//! Failures are ordinary [`ResolutionError`] values.

mod cache;
mod context;
mod error;
mod guard;
mod lookup;
mod resolver;
mod templates;
mod ty;

#[cfg(test)]
mod test_support;

pub use cache::{ModuleCache, ModuleLoader};
pub use context::{FrameToken, ResolutionContext, ScopeGuard};
pub use error::ResolutionError;
pub use guard::RecursionLimits;
pub use ty::{AbstractType, TemplateBinding, TypeDisplay};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Workspace;
    use ds_const_eval::ConstValue;
    use ds_dom::{PrimitiveKind, ScopeNode};
    use ds_span::{Location, Span};
    use expect_test::expect;

    const FIXTURE: &str = "module fixture;

class A {}
class B : A {}
class C : B {}

class MyClass(T) {}
class MyClass(T : A) {}
class MyClass(T : B) {}

class D(int u) {}
class D(int u : 1) {}

void foo(T : MyClass!(E[]), E)() {}

const int a = 3;
int b = 4;

alias immutable(char)[] string;
alias X Y;
alias Y X;

MyClass!C withC;
MyClass!A withA;
D!1 one;
D!2 two;
D!a three;
string text;
auto deduced = foo!(MyClass!(int[]));
";

    #[test]
    fn test_constraint_walks_the_base_chain() {
        let workspace = Workspace::new(&[("fixture", FIXTURE)]);
        let mut context = workspace.context("fixture");

        let with_c = context.type_of_declaration(workspace.decl("fixture", "withC")).unwrap();
        let with_a = context.type_of_declaration(workspace.decl("fixture", "withA")).unwrap();
        // both constrained overloads accept C and tie on one constrained
        // parameter each, so the earlier `T : A` wins; A only satisfies T : A
        assert_eq!(workspace.decl_line(with_c.declaration().unwrap()), 8);
        assert_eq!(workspace.decl_line(with_a.declaration().unwrap()), 8);
    }

    #[test]
    fn test_constraint_rejects_a_base_type() {
        let workspace = Workspace::new(&[(
            "m",
            "module m;\nclass A {}\nclass B : A {}\nclass C : B {}\nclass Only(T : B) {}\nOnly!A rejected;\nOnly!C accepted;\n",
        )]);
        let mut context = workspace.context("m");
        assert!(matches!(
            context.type_of_declaration(workspace.decl("m", "rejected")),
            Err(ResolutionError::ConstraintNotSatisfied { .. })
        ));
        assert!(matches!(
            context.type_of_declaration(workspace.decl("m", "accepted")),
            Ok(AbstractType::TemplateInstance { .. })
        ));
    }

    #[test]
    fn test_value_specialization() {
        let workspace = Workspace::new(&[("fixture", FIXTURE)]);
        let mut context = workspace.context("fixture");

        let one = context.type_of_declaration(workspace.decl("fixture", "one")).unwrap();
        let two = context.type_of_declaration(workspace.decl("fixture", "two")).unwrap();
        assert_eq!(workspace.decl_line(one.declaration().unwrap()), 12);
        assert_eq!(workspace.decl_line(two.declaration().unwrap()), 11);

        // manifest constants are usable as value arguments
        let three = context.type_of_declaration(workspace.decl("fixture", "three")).unwrap();
        let AbstractType::TemplateInstance { arguments, .. } = three else {
            panic!("expected an instance, got {three:?}");
        };
        assert_eq!(arguments, vec![TemplateBinding::Value(ConstValue::int(3))]);
    }

    #[test]
    fn test_string_alias_keeps_provenance() {
        let workspace = Workspace::new(&[("fixture", FIXTURE)]);
        let mut context = workspace.context("fixture");
        let string = context
            .resolve_identifier(workspace.name("string"), Span::default())
            .unwrap();

        let AbstractType::Alias { alias, target } = &string else {
            panic!("expected an alias, got {string:?}");
        };
        assert_eq!(workspace.decl_name(*alias), "string");
        assert!(matches!(target.unqualified(), AbstractType::Array(_)));
        expect!["string = immutable(char)[]"].assert_eq(&workspace.show(&string));
    }

    #[test]
    fn test_alias_cycle_is_reported() {
        let workspace = Workspace::new(&[("fixture", FIXTURE)]);
        let mut context = workspace.context("fixture");
        let result = context.resolve_identifier(workspace.name("X"), Span::default());
        assert!(matches!(result, Err(ResolutionError::RecursionLimitExceeded { .. })));
        // the guard is per query
        let again = context.resolve_identifier(workspace.name("X"), Span::default());
        assert_eq!(result, again);
    }

    #[test]
    fn test_manifest_constants_fold() {
        let workspace = Workspace::new(&[(
            "m",
            "module m;\nconst int a = 3;\nint b = 4;\nauto x = a + 1;\nauto y = b + 1;\n",
        )]);
        let mut context = workspace.context("m");
        let x = workspace.initializer("m", "x");
        let y = workspace.initializer("m", "y");
        assert_eq!(context.evaluate_constant(x), Ok(ConstValue::int(4)));
        assert!(matches!(
            context.evaluate_constant(y),
            Err(ResolutionError::NotConstant { .. })
        ));
    }

    #[test]
    fn test_parametrized_constraint_deduces() {
        let workspace = Workspace::new(&[("fixture", FIXTURE)]);
        let mut context = workspace.context("fixture");
        let call = workspace.initializer("fixture", "deduced");
        let resolved = context.resolve_expression(call).unwrap();
        let AbstractType::Member { decl, .. } = resolved else {
            panic!("expected the function, got {resolved:?}");
        };
        assert_eq!(workspace.decl_name(decl), "foo");

        let instance = Workspace::new(&[(
            "m",
            "module m;\nclass MyClass(T) {}\nclass Holder(T : MyClass!(E[]), E) { E element; }\nHolder!(MyClass!(int[])) h;\n",
        )]);
        let mut context = instance.context("m");
        let holder = context.type_of_declaration(instance.decl("m", "h")).unwrap();
        expect!["Holder!(MyClass!(int[]), int)"].assert_eq(&instance.show(&holder));
    }

    #[test]
    fn test_instance_members_see_bindings() {
        let workspace = Workspace::new(&[(
            "m",
            "module m;\nclass A(T = int) { T x; static A self; }\nauto f = A!float.x;\nauto i = A.x;\n",
        )]);
        let mut context = workspace.context("m");
        let f = context.type_of_expression(workspace.initializer("m", "f")).unwrap();
        let i = context.type_of_expression(workspace.initializer("m", "i")).unwrap();
        assert_eq!(f.primitive(), Some(PrimitiveKind::Float));
        assert_eq!(i.primitive(), Some(PrimitiveKind::Int));
    }

    #[test]
    fn test_member_access_falls_back_to_free_functions() {
        let workspace = Workspace::new(&[(
            "m",
            "module m;\nstruct S { int field; }\nint twice(S s) { return 2; }\nS s;\nauto viaMember = s.field;\nauto viaFree = s.twice();\nauto missing = s.nothing;\n",
        )]);
        let mut context = workspace.context("m");
        let via_free = context.resolve_expression(workspace.initializer("m", "viaFree")).unwrap();
        assert_eq!(workspace.decl_name(via_free.declaration().unwrap()), "twice");
        assert_eq!(via_free.value_type().and_then(AbstractType::primitive), Some(PrimitiveKind::Int));

        let via_member = context.resolve_expression(workspace.initializer("m", "viaMember")).unwrap();
        assert_eq!(workspace.decl_name(via_member.declaration().unwrap()), "field");
        assert!(matches!(
            context.resolve_expression(workspace.initializer("m", "missing")),
            Err(ResolutionError::Unresolved { .. })
        ));
    }

    #[test]
    fn test_overloads_by_argument_type() {
        let workspace = Workspace::new(&[(
            "m",
            "module m;\nclass A {}\nvoid take(A a) {}\nint take(int a, int b) { return a; }\nauto one = take(new A());\nauto two = take(1, 2);\nauto none = take();\n",
        )]);
        let mut context = workspace.context("m");
        let one = context.resolve_call_target(workspace.initializer("m", "one")).unwrap();
        let two = context.resolve_call_target(workspace.initializer("m", "two")).unwrap();
        assert_eq!(workspace.decl_line(one.declaration().unwrap()), 3);
        assert_eq!(workspace.decl_line(two.declaration().unwrap()), 4);
        assert!(matches!(
            context.resolve_call_target(workspace.initializer("m", "none")),
            Err(ResolutionError::AmbiguousOverload { .. })
        ));
    }

    #[test]
    fn test_function_templates_deduce_from_arguments() {
        let workspace = Workspace::new(&[(
            "m",
            "module m;\nT first(T)(T[] items) { return items[0]; }\nauto d = first([1.5, 2.5]);\n",
        )]);
        let mut context = workspace.context("m");
        let d = context.type_of_expression(workspace.initializer("m", "d")).unwrap();
        assert_eq!(d.primitive(), Some(PrimitiveKind::Double));
    }

    #[test]
    fn test_cyclic_inheritance_terminates() {
        let workspace = Workspace::new(&[(
            "m",
            "module m;\nclass P : Q { int p; }\nclass Q : P {}\nQ value;\nauto member = value.p;\n",
        )]);
        let mut context = workspace.context("m");
        let q = context.resolve_identifier(workspace.name("Q"), Span::default()).unwrap();
        assert!(matches!(q, AbstractType::Aggregate { .. }));
        let members = context.members_of(&q);
        assert!(members.len() <= 1);
    }

    #[test]
    fn test_auto_cycle() {
        let workspace = Workspace::new(&[("m", "module m;\nauto x = y;\nauto y = x;\n")]);
        let mut context = workspace.context("m");
        assert!(matches!(
            context.type_of_declaration(workspace.decl("m", "x")),
            Err(ResolutionError::RecursionLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_typeof_cycles_are_reported() {
        let workspace = Workspace::new(&[(
            "m",
            "module m;\ntypeof(y) x;\ntypeof(x) y;\ntypeof(f()) f() { return 1; }\n",
        )]);
        let mut context = workspace.context("m");
        for name in ["x", "y", "f"] {
            let result = context.type_of_declaration(workspace.decl("m", name));
            assert!(
                matches!(result, Err(ResolutionError::RecursionLimitExceeded { .. })),
                "{name}: {result:?}"
            );
        }
    }

    #[test]
    fn test_template_default_naming_its_template() {
        let workspace = Workspace::new(&[("m", "module m;\nclass A(T = A) {}\nA x;\n")]);
        let mut context = workspace.context("m");
        assert!(matches!(
            context.resolve_identifier(workspace.name("A"), Span::default()),
            Err(ResolutionError::RecursionLimitExceeded { .. })
        ));
        assert!(matches!(
            context.type_of_declaration(workspace.decl("m", "x")),
            Err(ResolutionError::RecursionLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_long_alias_chain_resolves() {
        let mut source = String::from("module m;\nalias int A0;\n");
        for index in 1..200 {
            source.push_str(&format!("alias A{} A{index};\n", index - 1));
        }
        let workspace = Workspace::new(&[("m", &source)]);
        let mut context = workspace.context("m");
        let resolved = context.resolve_identifier(workspace.name("A199"), Span::default()).unwrap();
        assert_eq!(resolved.terminal().primitive(), Some(PrimitiveKind::Int));
        assert_eq!(workspace.decl_name(resolved.declaration().unwrap()), "A199");
    }

    #[test]
    fn test_growing_instantiation_terminates() {
        let workspace = Workspace::new(&[("m", "module m;\nclass G(T) : G!(T[]) {}\nG!int g;\n")]);
        let mut context = workspace.context("m");
        let g = context.type_of_declaration(workspace.decl("m", "g")).unwrap();
        assert!(matches!(g, AbstractType::TemplateInstance { .. }));
    }

    #[test]
    fn test_declarations_outlive_republished_modules() {
        let workspace = Workspace::new(&[
            ("base", "module base;\nint shared;\n"),
            ("top", "module top;\nimport base;\n"),
        ]);
        let mut context = workspace.context("top");
        let found = context.lookup(workspace.name("shared"));
        assert_eq!(found.len(), 1);

        let replaced = workspace.id("base");
        workspace.republish("base", "module base;\nlong shared;\n");
        assert!(workspace.cache().get(replaced).is_none());

        // the context keeps reading the module it already handed out
        let ty = context.type_of_declaration(found[0]).unwrap();
        assert_eq!(ty.primitive(), Some(PrimitiveKind::Int));
        assert_eq!(workspace.decl_name_in(&context, found[0]), "shared");

        let mut fresh = workspace.context("top");
        let found = fresh.lookup(workspace.name("shared"));
        let ty = fresh.type_of_declaration(found[0]).unwrap();
        assert_eq!(ty.primitive(), Some(PrimitiveKind::Long));
    }

    #[test]
    fn test_expression_types() {
        let workspace = Workspace::new(&[(
            "m",
            "module m;\nclass Base { int b; }\nclass K : Base {\n    int[] items;\n    int* p;\n    void f() {\n        auto self = this;\n        auto parent = super;\n        auto count = items.length;\n        auto element = items[0];\n        auto deref = *p;\n        auto sum = 1 + 2.5f;\n        auto flag = 1 < 2;\n        auto text = \"hi\" ~ \"there\";\n        auto line = __LINE__;\n        auto address = &count;\n    }\n}\n",
        )]);
        let mut context = workspace.context("m");
        let mut show = |name: &str| {
            let ty = context
                .type_of_declaration(workspace.decl("m", name))
                .unwrap();
            workspace.show(&ty)
        };
        let rendered: Vec<_> = [
            "self", "parent", "count", "element", "deref", "sum", "flag", "text", "line", "address",
        ]
        .into_iter()
        .map(|name| format!("{name}: {}", show(name)))
        .collect();
        expect![[r#"
            self: K
            parent: Base
            count: ulong
            element: int
            deref: int
            sum: float
            flag: bool
            text: immutable(char)[]
            line: int
            address: ulong*"#]]
        .assert_eq(&rendered.join("\n"));
    }

    #[test]
    fn test_scope_guard_pops_on_drop() {
        let workspace = Workspace::new(&[("m", "module m;\nclass C { int inner; }\n")]);
        let mut context = workspace.context("m");
        let module = context.current_module();
        let class = workspace.decl("m", "C");
        {
            let mut scoped = context.push(module, ScopeNode::Decl(class.decl));
            assert_eq!(scoped.lookup(workspace.name("inner")).len(), 1);
        }
        assert!(context.lookup(workspace.name("inner")).is_empty());
        assert_eq!(context.scopes().count(), 1);

        let token = context.push_frame(module, ScopeNode::Decl(class.decl));
        assert_eq!(context.scopes().count(), 2);
        context.pop_frame(token);
        assert_eq!(context.scopes().count(), 1);
    }

    #[test]
    fn test_caret_context() {
        let workspace = Workspace::new(&[(
            "m",
            "module m;\nvoid main() {\n    int first;\n    {\n        int nested;\n    }\n    int second;\n}\n",
        )]);
        let mut context = workspace.context_at("m", Location::new(5, 20));
        assert_eq!(context.scopes().count(), 4);
        assert_eq!(context.lookup(workspace.name("first")).len(), 1);
        assert_eq!(context.lookup(workspace.name("nested")).len(), 1);
        assert!(context.lookup(workspace.name("second")).is_empty());
        context.set_cursor(None);
        assert_eq!(context.lookup(workspace.name("second")).len(), 1);
    }
}

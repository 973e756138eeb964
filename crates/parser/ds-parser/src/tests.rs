use super::*;
use ds_dom::{
    AggregateKind, BinaryOp, Decl, DeclId, DeclKind, Expr, ImportVisibility, LiteralKind, ScopeKind,
    ScopeNode, Stmt, TemplateArg, TemplateParameter, TypeModifier, TypeRef,
};
use expect_test::{Expect, expect};
use std::fmt::Write;

fn parse(source: &str) -> (ParseOutput, Interner) {
    let interner = Interner::new();
    let output = parse_module(source, "test.d", &interner);
    (output, interner)
}

fn parse_clean(source: &str) -> (Module, Interner) {
    let (output, interner) = parse(source);
    assert!(output.errors.is_empty(), "parse errors: {:?}", output.errors);
    (output.module, interner)
}

fn find(module: &Module, interner: &Interner, name: &str) -> DeclId {
    module
        .declarations_named(interner.intern(name))
        .next()
        .unwrap_or_else(|| panic!("no declaration named {name}"))
}

fn label(decl: &Decl) -> &'static str {
    match &decl.kind {
        DeclKind::Module { .. } => "module",
        DeclKind::Aggregate { kind, .. } => match kind {
            AggregateKind::Class => "class",
            AggregateKind::Struct => "struct",
            AggregateKind::Interface => "interface",
            AggregateKind::Union => "union",
            AggregateKind::Template => "template",
        },
        DeclKind::Function { .. } => "function",
        DeclKind::Variable { .. } => "variable",
        DeclKind::Alias { .. } => "alias",
        DeclKind::TemplateParameter(_) => "template-parameter",
    }
}

fn outline(module: &Module, interner: &Interner) -> String {
    fn walk(module: &Module, interner: &Interner, id: DeclId, depth: usize, out: &mut String) {
        let decl = &module.decls[id];
        let name = decl.name.map_or("<anonymous>", |name| interner.resolve(name));
        let _ = writeln!(out, "{}{} {name} @{}", "  ".repeat(depth), label(decl), decl.name_span.start);
        for &parameter in &decl.template_parameters {
            walk(module, interner, parameter, depth + 1, out);
        }
        let children = match &decl.kind {
            DeclKind::Function { parameters, .. } => parameters.as_slice(),
            _ => decl.members(),
        };
        for &child in children {
            walk(module, interner, child, depth + 1, out);
        }
    }

    let mut out = String::new();
    walk(module, interner, module.root, 0, &mut out);
    out
}

fn check_outline(source: &str, expect: Expect) {
    let (module, interner) = parse_clean(source);
    expect.assert_eq(&outline(&module, &interner));
}

#[test]
fn test_reference_sample_outline() {
    check_outline(
        "module modA;\n\
         class A(T = int) { static int prop; static A statA; }\n\
         A a = new A();\n\
         void main() { A.prop = 3; int b = A.prop + 4; A.statA.statA = new A!float(); }\n",
        expect![[r#"
            module modA @1:1
              class A @2:7
                template-parameter T @2:9
                variable prop @2:31
                variable statA @2:46
              variable a @3:3
              function main @4:6
        "#]],
    );
}

#[test]
fn test_module_name_defaults_to_file_stem() {
    let interner = Interner::new();
    let output = parse_module("int x;", "dir/pkg.d", &interner);
    assert_eq!(interner.resolve(output.module.name), "pkg");
}

#[test]
fn test_template_parameter_flavours() {
    let (module, interner) = parse_clean("class C(T, U : Base, V = int, int n : 1, alias S) {}");
    let class = find(&module, &interner, "C");
    let parameters = &module.decls[class].template_parameters;
    assert_eq!(parameters.len(), 5);

    let kinds: Vec<_> = parameters
        .iter()
        .map(|&id| match &module.decls[id].kind {
            DeclKind::TemplateParameter(parameter) => parameter.clone(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();

    assert!(matches!(kinds[0], TemplateParameter::Type { constraint: None, default: None }));
    assert!(matches!(kinds[1], TemplateParameter::Type { constraint: Some(_), default: None }));
    assert!(matches!(kinds[2], TemplateParameter::Type { constraint: None, default: Some(_) }));
    let TemplateParameter::Value {
        specialization: Some(specialization),
        default: None,
        ..
    } = kinds[3]
    else {
        panic!("expected a specialized value parameter");
    };
    assert!(matches!(
        &module.exprs[specialization],
        Expr::Literal { literal, .. } if literal.kind == LiteralKind::Integer(1)
    ));
    assert!(matches!(kinds[4], TemplateParameter::Alias { default: None }));
}

#[test]
fn test_function_template_with_parametrized_constraint() {
    let (module, interner) = parse_clean("void foo(T : MyClass!(E[]), E)(T t) {}");
    let foo = find(&module, &interner, "foo");
    let decl = &module.decls[foo];
    assert_eq!(decl.template_parameters.len(), 2);

    let DeclKind::TemplateParameter(TemplateParameter::Type {
        constraint: Some(constraint),
        ..
    }) = module.decls[decl.template_parameters[0]].kind
    else {
        panic!("expected a constrained type parameter");
    };
    let TypeRef::TemplateInstance { args, .. } = &module.types[constraint] else {
        panic!("expected a template instance constraint");
    };
    let [TemplateArg::Type(element)] = args.as_slice() else {
        panic!("expected one type argument");
    };
    assert!(matches!(module.types[*element], TypeRef::Array { length: None, .. }));

    let DeclKind::Function { parameters, .. } = &decl.kind else {
        panic!("expected a function");
    };
    assert_eq!(parameters.len(), 1);
}

#[test]
fn test_alias_forms() {
    let (module, interner) = parse_clean("alias immutable(char)[] string;\nalias Y = X;");
    let string = find(&module, &interner, "string");
    let DeclKind::Alias { target } = module.decls[string].kind else {
        panic!("expected an alias");
    };
    let TypeRef::Array { element, .. } = module.types[target] else {
        panic!("expected an array");
    };
    assert!(matches!(
        module.types[element],
        TypeRef::Modified {
            modifier: TypeModifier::Immutable,
            ..
        }
    ));

    let y = find(&module, &interner, "Y");
    assert!(matches!(module.decls[y].kind, DeclKind::Alias { .. }));
}

#[test]
fn test_imports() {
    let (module, interner) = parse_clean("public import a.b;\nimport c : x, y;\nimport d, e;");
    let rendered: Vec<_> = module
        .imports
        .iter()
        .map(|import| {
            (
                interner.resolve(import.module).to_owned(),
                import.visibility,
                import.selective.iter().map(|s| interner.resolve(*s).to_owned()).collect::<Vec<_>>(),
            )
        })
        .collect();
    assert_eq!(
        rendered,
        vec![
            ("a.b".to_owned(), ImportVisibility::Public, vec![]),
            (
                "c".to_owned(),
                ImportVisibility::Private,
                vec!["x".to_owned(), "y".to_owned()]
            ),
            ("d".to_owned(), ImportVisibility::Private, vec![]),
            ("e".to_owned(), ImportVisibility::Private, vec![]),
        ]
    );
}

#[test]
fn test_attribute_labels_apply_to_following_members() {
    let (module, interner) = parse_clean("class C { int a; private: int b; int c; }");
    let a = find(&module, &interner, "a");
    let c = find(&module, &interner, "c");
    assert!(!module.decls[a].has_attribute(ds_dom::Attribute::Private));
    assert!(module.decls[c].has_attribute(ds_dom::Attribute::Private));
}

#[test]
fn test_precedence() {
    let (module, interner) = parse_clean("int x = 1 + 2 * 3;");
    let x = find(&module, &interner, "x");
    let DeclKind::Variable {
        initializer: Some(init),
        ..
    } = module.decls[x].kind
    else {
        panic!("expected an initializer");
    };
    let Expr::Binary {
        op: BinaryOp::Add,
        right,
        ..
    } = module.exprs[init]
    else {
        panic!("expected addition at the top");
    };
    assert!(matches!(module.exprs[right], Expr::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn test_locals_get_block_scopes() {
    let (module, interner) = parse_clean("int x;\nvoid f() { int x = 1; { int y = x; } }");
    let f = find(&module, &interner, "f");
    let DeclKind::Function { body: Some(body), .. } = module.decls[f].kind else {
        panic!("expected a body");
    };
    let scope = module.scope(ScopeNode::Block(body)).unwrap();
    assert_eq!(scope.kind, ScopeKind::Block);
    assert_eq!(scope.get(interner.intern("x")).len(), 1);

    let y = find(&module, &interner, "y");
    assert_eq!(module.decls[y].parent, Some(f));
    assert_eq!(module.enclosing_scopes(y).len(), 4);
}

#[test]
fn test_declaration_or_expression_statements() {
    let (module, _) = parse_clean("void f() { A.b = 3; A c; c.d(1); x * y; }");
    let kinds: Vec<_> = module
        .stmts
        .iter()
        .filter_map(|(_, stmt)| match stmt {
            Stmt::Declaration { .. } => Some("decl"),
            Stmt::Expr { .. } => Some("expr"),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec!["expr", "decl", "expr", "decl"]);
}

#[test]
fn test_incomplete_member_access_yields_missing() {
    let (output, interner) = parse("void f() { int a; a. }");
    assert!(!output.errors.is_empty());
    let module = output.module;
    find(&module, &interner, "f");
    assert!(
        module
            .exprs
            .iter()
            .any(|(_, expr)| matches!(expr, Expr::Missing { .. }))
    );
}

#[test]
fn test_recovers_after_garbage() {
    let (output, interner) = parse("int ) x; class K {}");
    assert!(!output.errors.is_empty());
    find(&output.module, &interner, "K");
}

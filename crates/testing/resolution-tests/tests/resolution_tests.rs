//! Name, type and template resolution over a fixture module

use ds_resolve::{AbstractType, ResolutionError};
use ds_span::Span;
use expect_test::expect;
use resolution_tests::TestFixture;

fn templates() -> TestFixture {
    TestFixture::new([("templates", include_str!("fixtures/templates.d"))])
}

fn declared_type(fixture: &TestFixture, variable: &str) -> Result<AbstractType, ResolutionError> {
    let decl = fixture.declaration("templates", variable).unwrap();
    fixture.context("templates").unwrap().type_of_declaration(decl)
}

#[test]
fn test_constraints_follow_the_inheritance_chain() {
    let fixture = templates();

    for accepted in ["cForA", "cForB", "aForA"] {
        assert!(
            matches!(declared_type(&fixture, accepted), Ok(AbstractType::TemplateInstance { .. })),
            "{accepted} should instantiate"
        );
    }
    let rejected = declared_type(&fixture, "aForB");
    let Err(ResolutionError::ConstraintNotSatisfied { decl, .. }) = rejected else {
        panic!("expected a constraint failure, got {rejected:?}");
    };
    assert_eq!(decl, fixture.declaration("templates", "ForB").unwrap());
}

#[test]
fn test_value_specialization_selects_by_constant() {
    let fixture = templates();

    let one = declared_type(&fixture, "one").unwrap();
    let two = declared_type(&fixture, "two").unwrap();
    assert_eq!(fixture.line_of(one.declaration().unwrap()), 11);
    assert_eq!(fixture.line_of(two.declaration().unwrap()), 10);
}

#[test]
fn test_string_alias_terminates_with_provenance() {
    let fixture = templates();
    let mut context = fixture.context("templates").unwrap();

    let string = context.resolve_identifier(fixture.name("string"), Span::default()).unwrap();
    assert_eq!(fixture.line_of(string.declaration().unwrap()), 13);
    assert!(matches!(string.unqualified(), AbstractType::Array(_)));
    expect!["string = immutable(char)[]"].assert_eq(&string.display(&fixture.cache).to_string());

    let text = declared_type(&fixture, "text").unwrap();
    assert!(text.same_type(&string));
}

#[test]
fn test_alias_cycle_reports_recursion() {
    let fixture = templates();

    assert!(matches!(
        declared_type(&fixture, "cyclic"),
        Err(ResolutionError::RecursionLimitExceeded { .. })
    ));
    // the next query starts with a fresh guard
    let mut context = fixture.context("templates").unwrap();
    assert!(matches!(
        context.resolve_identifier(fixture.name("X"), Span::default()),
        Err(ResolutionError::RecursionLimitExceeded { .. })
    ));
    assert!(context.resolve_identifier(fixture.name("value"), Span::default()).is_ok());
}

#[test]
fn test_local_shadows_module_symbol() {
    let fixture = templates();
    let value = fixture.name("value");

    let mut inside = fixture.context_at("templates", 30, 5).unwrap();
    let found = inside.lookup(value);
    assert_eq!(found.len(), 1);
    assert_eq!(fixture.line_of(found[0]), 29);

    let mut elsewhere = fixture.context_at("templates", 34, 5).unwrap();
    let found = elsewhere.lookup(value);
    assert_eq!(found.len(), 1);
    assert_eq!(fixture.line_of(found[0]), 17);
}

#[test]
fn test_unknown_names_suggest_neighbours() {
    let fixture = templates();
    let mut context = fixture.context("templates").unwrap();

    let typo = fixture.name("valeu");
    assert!(matches!(
        context.resolve_identifier(typo, Span::default()),
        Err(ResolutionError::Unresolved { name: Some(name), .. }) if name == typo
    ));
    assert_eq!(context.suggestions(typo).first(), Some(&fixture.name("value")));
}

//! Import graphs and lazy module loading

use ds_resolve::AbstractType;
use resolution_tests::TestFixture;
use std::fs;

fn diamond() -> TestFixture {
    TestFixture::from_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/diamond")).unwrap()
}

#[test]
fn test_modules_load_on_first_import() {
    let fixture = diamond();
    assert_eq!(fixture.load_count(), 0);

    let mut context = fixture.context_at("top", 7, 5).unwrap();
    assert_eq!(fixture.load_count(), 1);

    assert_eq!(context.lookup(fixture.name("rightValue")).len(), 1);
    // top, left, right and base; nothing imports `unused`
    assert_eq!(fixture.load_count(), 4);
    assert_eq!(fixture.cache.len(), 4);
}

#[test]
fn test_diamond_import_yields_one_declaration() {
    let fixture = diamond();
    let mut context = fixture.context_at("top", 7, 5).unwrap();

    let found = context.lookup(fixture.name("baseValue"));
    assert_eq!(found, vec![fixture.declaration("base", "baseValue").unwrap()]);
    // each module is parsed once however often it is imported
    assert_eq!(fixture.load_count(), 4);
}

#[test]
fn test_private_declarations_stay_private() {
    let fixture = diamond();
    let mut context = fixture.context("top").unwrap();
    assert!(context.lookup(fixture.name("secret")).is_empty());
    assert!(context.lookup(fixture.name("never")).is_empty());
}

#[test]
fn test_imported_types_resolve_through_members() {
    let fixture = diamond();
    let node = fixture.declaration("base", "Node").unwrap();
    let leftmost = fixture.declaration("left", "leftmost").unwrap();

    let mut context = fixture.context("top").unwrap();
    let ty = context.type_of_declaration(leftmost).unwrap();
    assert_eq!(ty.aggregate(), Some(node));

    let members = context.members_of(&ty);
    assert_eq!(members, vec![fixture.declaration("base", "next").unwrap()]);
    let next = context.type_of_declaration(members[0]).unwrap();
    assert!(matches!(next.unqualified(), AbstractType::Aggregate { decl, .. } if *decl == node));
}

#[test]
fn test_invalidated_modules_are_parsed_again() {
    let fixture = diamond();
    fixture.module("base").unwrap();
    assert_eq!(fixture.load_count(), 1);

    fixture.cache.invalidate(fixture.name("base"));
    assert!(fixture.cache.is_empty());
    fixture.module("base").unwrap();
    assert_eq!(fixture.load_count(), 2);
}

#[test]
fn test_fixture_directories_map_paths_to_module_names() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("pkg")).unwrap();
    fs::write(dir.path().join("pkg").join("util.d"), "module pkg.util;\nint helper;\n").unwrap();
    fs::write(dir.path().join("app.d"), "module app;\nimport pkg.util;\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "not a module").unwrap();

    let fixture = TestFixture::from_dir(dir.path()).unwrap();
    let mut context = fixture.context("app").unwrap();
    assert_eq!(context.lookup(fixture.name("helper")).len(), 1);
    assert!(fixture.module("notes").is_err());

    let empty = tempfile::tempdir().unwrap();
    assert!(TestFixture::from_dir(empty.path()).is_err());
}

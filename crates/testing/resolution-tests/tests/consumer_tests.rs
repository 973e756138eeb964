//! Find-references and completion over fixture modules

use ds_completion::{CompletionOptions, complete};
use ds_references::{Reference, ReferenceKind, ReferenceOptions, scan, scan_modules};
use ds_span::Location;
use expect_test::expect;
use resolution_tests::TestFixture;

fn render(references: &[Reference]) -> String {
    references
        .iter()
        .map(|reference| format!("{} {:?}", reference.span.start, reference.kind))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_template_class_sample_has_eight_references() {
    let fixture = TestFixture::new([("modA", include_str!("fixtures/modA.d"))]);
    let module = fixture.module("modA").unwrap();
    let class = fixture.declaration("modA", "A").unwrap();

    let found = scan(&fixture.cache, module, class, &ReferenceOptions::default());
    assert_eq!(found.len(), 8);
    expect![[r#"
        2:7 Definition
        4:12 Type
        6:1 Type
        6:11 Type
        8:5 Expression
        9:13 Expression
        10:5 Expression
        10:25 TemplateInstance"#]]
    .assert_eq(&render(&found));
}

#[test]
fn test_references_across_modules() {
    let fixture = TestFixture::from_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/diamond")).unwrap();
    let modules = [
        fixture.module("base").unwrap(),
        fixture.module("left").unwrap(),
        fixture.module("top").unwrap(),
    ];
    let target = fixture.declaration("base", "baseValue").unwrap();

    let found = scan_modules(&fixture.cache, &modules, target, &ReferenceOptions::default());
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].kind, ReferenceKind::Definition);
    assert_eq!(found[1].module, modules[2]);
    assert_eq!(found[1].span.start, Location::new(7, 5));
}

fn geometry() -> TestFixture {
    TestFixture::new([("geometry", include_str!("fixtures/geometry.d"))])
}

#[test]
fn test_member_completion_offers_free_functions() {
    let fixture = geometry();
    let module = fixture.module("geometry").unwrap();
    let caret = Location::new(16, 12);

    let labels = |options: &CompletionOptions| -> Vec<String> {
        complete(&fixture.cache, module, caret, options)
            .into_iter()
            .map(|item| if item.ufcs { format!("{} (ufcs)", item.label) } else { item.label })
            .collect()
    };
    assert_eq!(labels(&CompletionOptions::default()), ["side", "area", "perimeter (ufcs)"]);

    let options = CompletionOptions::from_toml("enable_ufcs_completion = false").unwrap();
    assert_eq!(labels(&options), ["side", "area"]);
}

#[test]
fn test_member_access_falls_back_to_free_function() {
    let fixture = TestFixture::new([(
        "calls",
        "module calls;\nstruct Meter { int value; }\nint scaled(Meter meter, int factor) { return factor; }\nvoid main() {\n    Meter meter;\n    int result = meter.scaled(2);\n}\n",
    )]);
    let scaled = fixture.declaration("calls", "scaled").unwrap();
    let module = fixture.module("calls").unwrap();

    let found = scan(&fixture.cache, module, scaled, &ReferenceOptions::default());
    let positions: Vec<_> = found.iter().map(|reference| reference.span.start).collect();
    assert_eq!(positions, [Location::new(3, 5), Location::new(6, 24)]);
    assert_eq!(found[1].kind, ReferenceKind::MemberAccess);
}

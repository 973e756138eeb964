//! Compile-time evaluation of constant expressions
//!
//! Template value arguments and value parameter specializations are
//! compared as constants, so `A!(1)` and `A!(0 + 1)` instantiate the same
//! thing. Values carry their primitive type; see [`ConstValue`].

mod error;
mod evaluator;
mod value;

pub use error::ConstError;
pub use evaluator::{ConstEvaluator, NameValues};
pub use value::{ConstValue, RawValue};

#[cfg(test)]
mod tests {
    use super::*;
    use ds_dom::{DeclKind, ExprId, Module, PrimitiveKind};
    use ds_intern::{Interner, Symbol};

    fn initializer(source: &str) -> (Module, ExprId, Interner) {
        let interner = Interner::new();
        let output = ds_parser::parse_module(source, "test.d", &interner);
        assert!(output.errors.is_empty(), "parse errors: {:?}", output.errors);
        let module = output.module;
        let v = module.declarations_named(interner.intern("v")).next().unwrap();
        let DeclKind::Variable {
            initializer: Some(init),
            ..
        } = module.decls[v].kind
        else {
            panic!("expected an initialized variable");
        };
        (module, init, interner)
    }

    fn eval(expr: &str) -> Result<ConstValue, ConstError> {
        let (module, init, _) = initializer(&format!("auto v = {expr};"));
        ConstEvaluator::new(&module).evaluate(init)
    }

    fn integer(kind: PrimitiveKind, value: i128) -> ConstValue {
        ConstValue::integer(kind, value).unwrap()
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(eval("1"), Ok(ConstValue::int(1)));
        assert_eq!(eval("3000000000"), Ok(integer(PrimitiveKind::Long, 3_000_000_000)));
        assert_eq!(eval("1u"), Ok(integer(PrimitiveKind::Uint, 1)));
        assert_eq!(eval("5000000000u"), Ok(integer(PrimitiveKind::Ulong, 5_000_000_000)));
        assert_eq!(eval("1UL"), Ok(integer(PrimitiveKind::Ulong, 1)));
        assert_eq!(eval("1L"), Ok(integer(PrimitiveKind::Long, 1)));
        assert_eq!(eval("1.5f"), Ok(ConstValue::float(PrimitiveKind::Float, 1.5)));
        assert_eq!(eval("2.0L"), Ok(ConstValue::float(PrimitiveKind::Real, 2.0)));
        assert_eq!(eval("2.5"), Ok(ConstValue::float(PrimitiveKind::Double, 2.5)));
        assert_eq!(eval("2i"), Ok(ConstValue::float(PrimitiveKind::Idouble, 2.0)));
        assert_eq!(eval("'a'"), Ok(integer(PrimitiveKind::Char, 97)));
        assert_eq!(eval("true"), Ok(ConstValue::bool(true)));
        assert_eq!(eval("null"), Ok(ConstValue::null()));
    }

    #[test]
    fn test_line_is_an_int() {
        let (module, init, _) = initializer("\n\nauto v = __LINE__;");
        assert_eq!(ConstEvaluator::new(&module).evaluate(init), Ok(ConstValue::int(3)));
    }

    #[test]
    fn test_non_constants() {
        assert!(matches!(eval("\"text\""), Err(ConstError::NotConstant { .. })));
        assert!(matches!(eval("x"), Err(ConstError::NotConstant { .. })));
        assert!(matches!(eval("f(1)"), Err(ConstError::NotConstant { .. })));
    }

    #[test]
    fn test_integer_folding() {
        assert_eq!(eval("1 + 2 * 3"), Ok(ConstValue::int(7)));
        assert_eq!(eval("(1 + 2) * 3"), Ok(ConstValue::int(9)));
        assert_eq!(eval("-7 % 3"), Ok(ConstValue::int(-1)));
        assert_eq!(eval("1 << 4"), Ok(ConstValue::int(16)));
        assert_eq!(eval("-1 >>> 28"), Ok(ConstValue::int(15)));
        assert_eq!(eval("~0"), Ok(ConstValue::int(-1)));
        assert_eq!(eval("0u - 1"), Ok(integer(PrimitiveKind::Uint, i128::from(u32::MAX))));
        assert_eq!(eval("1 + 1L"), Ok(integer(PrimitiveKind::Long, 2)));
        assert_eq!(eval("'a' + 1"), Ok(ConstValue::int(98)));
    }

    #[test]
    fn test_folding_errors() {
        assert!(matches!(eval("7 / 0"), Err(ConstError::DivisionByZero { .. })));
        assert!(matches!(eval("2147483647 + 1"), Err(ConstError::Overflow { .. })));
        assert!(matches!(eval("1 << 40"), Err(ConstError::Overflow { .. })));
        assert!(matches!(eval("1 ~ 2"), Err(ConstError::NotConstant { .. })));
        assert!(matches!(eval("null + 1"), Err(ConstError::InvalidOperands { .. })));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval("1 < 2 && 3 == 3"), Ok(ConstValue::bool(true)));
        assert_eq!(eval("1 > 2 || !true"), Ok(ConstValue::bool(false)));
        assert_eq!(eval("1 == 1.0"), Ok(ConstValue::bool(true)));
        assert_eq!(eval("null == null"), Ok(ConstValue::bool(true)));
    }

    #[test]
    fn test_floating_folding() {
        assert_eq!(eval("1 + 2.5"), Ok(ConstValue::float(PrimitiveKind::Double, 3.5)));
        assert_eq!(eval("1.0f * 2"), Ok(ConstValue::float(PrimitiveKind::Float, 2.0)));
        assert_eq!(eval("1.0 + 2i"), Ok(ConstValue::complex(PrimitiveKind::Cdouble, 1.0, 2.0)));
        assert_eq!(eval("2i * 3i"), Ok(ConstValue::float(PrimitiveKind::Double, -6.0)));
        assert_eq!(eval("-1.5"), Ok(ConstValue::float(PrimitiveKind::Double, -1.5)));
    }

    #[test]
    fn test_names_come_from_the_callback() {
        let (module, init, interner) = initializer("auto v = x * 2 + y;");
        let x = interner.intern("x");
        let mut names = |_: ExprId, name: Symbol| (name == x).then_some(ConstValue::int(5));
        assert!(matches!(
            ConstEvaluator::with_names(&module, &mut names).evaluate(init),
            Err(ConstError::NotConstant { .. })
        ));

        let (module, init, interner) = initializer("auto v = x * 2;");
        let x = interner.intern("x");
        let mut names = |_: ExprId, name: Symbol| (name == x).then_some(ConstValue::int(5));
        assert_eq!(
            ConstEvaluator::with_names(&module, &mut names).evaluate(init),
            Ok(ConstValue::int(10))
        );
    }
}

//! Const value representation

use ds_dom::PrimitiveKind;
use std::fmt;

/// Payload of a constant, interpreted through its kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue {
    /// `true` / `false`
    Bool(bool),
    /// Integers and characters (as code points)
    Integer(i128),
    /// Real and imaginary floating point values
    Float(f64),
    /// Complex floating point value
    Complex {
        /// Real part
        re: f64,
        /// Imaginary part
        im: f64,
    },
    /// `null`
    Null,
}

/// A compile-time constant value with its primitive type
///
/// Two constants are equal when both the kind and the value match, so
/// `1` and `1u` are different constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstValue {
    /// Primitive type of the value
    pub kind: PrimitiveKind,
    /// The value itself
    pub raw: RawValue,
}

impl ConstValue {
    /// An `int` constant
    #[must_use]
    pub const fn int(value: i32) -> Self {
        Self {
            kind: PrimitiveKind::Int,
            raw: RawValue::Integer(value as i128),
        }
    }

    /// A `bool` constant
    #[must_use]
    pub const fn bool(value: bool) -> Self {
        Self {
            kind: PrimitiveKind::Bool,
            raw: RawValue::Bool(value),
        }
    }

    /// The `null` constant
    #[must_use]
    pub const fn null() -> Self {
        Self {
            kind: PrimitiveKind::Null,
            raw: RawValue::Null,
        }
    }

    /// An integral constant of `kind`; `None` if `value` is out of its range
    #[must_use]
    pub fn integer(kind: PrimitiveKind, value: i128) -> Option<Self> {
        let (min, max) = kind.integer_bounds()?;
        if kind == PrimitiveKind::Bool {
            return (min..=max).contains(&value).then(|| Self::bool(value != 0));
        }
        (min..=max).contains(&value).then_some(Self {
            kind,
            raw: RawValue::Integer(value),
        })
    }

    /// A real or imaginary floating point constant of `kind`
    ///
    /// `float` and `ifloat` values are rounded to single precision.
    #[must_use]
    pub fn float(kind: PrimitiveKind, value: f64) -> Self {
        Self {
            kind,
            raw: RawValue::Float(round_to(kind, value)),
        }
    }

    /// A complex constant of `kind`
    #[must_use]
    pub fn complex(kind: PrimitiveKind, re: f64, im: f64) -> Self {
        Self {
            kind,
            raw: RawValue::Complex {
                re: round_to(kind, re),
                im: round_to(kind, im),
            },
        }
    }

    /// Returns the integer value of an integral, character or `bool` constant
    #[must_use]
    pub const fn as_integer(&self) -> Option<i128> {
        match self.raw {
            RawValue::Integer(value) => Some(value),
            RawValue::Bool(value) => Some(value as i128),
            _ => None,
        }
    }

    /// Returns the boolean value if this is a `bool`
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self.raw {
            RawValue::Bool(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value as a float; integers convert, complex values do not
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "Constant folding follows floating point semantics")]
    pub fn as_float(&self) -> Option<f64> {
        match self.raw {
            RawValue::Float(value) => Some(value),
            RawValue::Integer(value) => Some(value as f64),
            RawValue::Bool(value) => Some(if value { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Real and imaginary parts of any numeric constant
    #[must_use]
    pub fn as_complex(&self) -> Option<(f64, f64)> {
        match self.raw {
            RawValue::Complex { re, im } => Some((re, im)),
            RawValue::Float(value) if self.kind.is_imaginary() => Some((0.0, value)),
            _ => self.as_float().map(|value| (value, 0.0)),
        }
    }

    /// Whether the value counts as true in a condition
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self.raw {
            RawValue::Bool(value) => value,
            RawValue::Integer(value) => value != 0,
            RawValue::Float(value) => value != 0.0,
            RawValue::Complex { re, im } => re != 0.0 || im != 0.0,
            RawValue::Null => false,
        }
    }

    /// Whether this constant converts implicitly to `target`
    ///
    /// Integral constants convert to any integral type whose range holds
    /// the value, and to every floating point type. Floating point
    /// constants convert between precisions; real and imaginary values
    /// widen to complex. Nothing converts to or from `void`.
    #[must_use]
    pub fn implicitly_converts_to(&self, target: PrimitiveKind) -> bool {
        if self.kind == target {
            return true;
        }
        let source = self.kind;
        match target {
            PrimitiveKind::Void | PrimitiveKind::Null => false,
            _ if source == PrimitiveKind::Void || source == PrimitiveKind::Null => false,
            _ if target.is_integral() || target == PrimitiveKind::Bool => {
                self.as_integer().is_some_and(|value| {
                    target
                        .integer_bounds()
                        .is_some_and(|(min, max)| (min..=max).contains(&value))
                })
            }
            _ if target.is_floating() => source.is_integral() || source == PrimitiveKind::Bool || source.is_floating(),
            _ if target.is_imaginary() => source.is_imaginary(),
            _ if target.is_complex() => source.is_numeric() || source == PrimitiveKind::Bool,
            _ => false,
        }
    }

    /// Convert to `target` if the conversion is implicit
    #[must_use]
    pub fn convert_to(&self, target: PrimitiveKind) -> Option<Self> {
        if !self.implicitly_converts_to(target) {
            return None;
        }
        if self.kind == target {
            return Some(*self);
        }
        if target.is_integral() || target == PrimitiveKind::Bool {
            return Self::integer(target, self.as_integer()?);
        }
        if target.is_complex() {
            let (re, im) = self.as_complex()?;
            return Some(Self::complex(target, re, im));
        }
        if target.is_imaginary() {
            let (_, im) = self.as_complex()?;
            return Some(Self::float(target, im));
        }
        self.as_float().map(|value| Self::float(target, value))
    }
}

#[allow(clippy::cast_possible_truncation, reason = "Single precision kinds round on purpose")]
fn round_to(kind: PrimitiveKind, value: f64) -> f64 {
    match kind {
        PrimitiveKind::Float | PrimitiveKind::Ifloat | PrimitiveKind::Cfloat => f64::from(value as f32),
        _ => value,
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw {
            RawValue::Bool(value) => write!(f, "{value}"),
            RawValue::Integer(value) if self.kind.is_character() => {
                match u32::try_from(value).ok().and_then(char::from_u32) {
                    Some(ch) => write!(f, "{ch:?}"),
                    None => write!(f, "{value}"),
                }
            }
            RawValue::Integer(value) => write!(f, "{value}"),
            RawValue::Float(value) if self.kind.is_imaginary() => write!(f, "{value}i"),
            RawValue::Float(value) => write!(f, "{value}"),
            RawValue::Complex { re, im } => write!(f, "{re}+{im}i"),
            RawValue::Null => f.write_str("null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_includes_kind() {
        let int_one = ConstValue::int(1);
        let uint_one = ConstValue::integer(PrimitiveKind::Uint, 1).unwrap();
        assert_ne!(int_one, uint_one);
        assert_eq!(int_one.convert_to(PrimitiveKind::Uint), Some(uint_one));
    }

    #[test]
    fn test_integer_conversions_respect_range() {
        let value = ConstValue::int(300);
        assert!(value.implicitly_converts_to(PrimitiveKind::Short));
        assert!(!value.implicitly_converts_to(PrimitiveKind::Ubyte));
        assert!(!ConstValue::int(-1).implicitly_converts_to(PrimitiveKind::Uint));
        assert!(ConstValue::int(1).implicitly_converts_to(PrimitiveKind::Bool));
        assert!(!ConstValue::int(2).implicitly_converts_to(PrimitiveKind::Bool));
    }

    #[test]
    fn test_floating_conversions() {
        let double = ConstValue::float(PrimitiveKind::Double, 1.5);
        assert!(double.implicitly_converts_to(PrimitiveKind::Float));
        assert!(!double.implicitly_converts_to(PrimitiveKind::Int));
        assert_eq!(
            double.convert_to(PrimitiveKind::Cdouble),
            Some(ConstValue::complex(PrimitiveKind::Cdouble, 1.5, 0.0))
        );
        assert_eq!(
            ConstValue::int(2).convert_to(PrimitiveKind::Real),
            Some(ConstValue::float(PrimitiveKind::Real, 2.0))
        );
        assert!(!ConstValue::null().implicitly_converts_to(PrimitiveKind::Int));
    }

    #[test]
    fn test_display() {
        let ch = ConstValue::integer(PrimitiveKind::Char, i128::from(b'a')).unwrap();
        assert_eq!(ch.to_string(), "'a'");
        assert_eq!(ConstValue::float(PrimitiveKind::Idouble, 2.0).to_string(), "2i");
        assert_eq!(ConstValue::bool(true).to_string(), "true");
    }
}

//! Const expression evaluator

use crate::{ConstError, ConstValue, RawValue};
use ds_dom::{BinaryOp, Expr, ExprId, Keyword, Literal, LiteralFlags, LiteralKind, Module, PrimitiveKind, UnaryOp};
use ds_intern::Symbol;
use ds_span::Span;
use std::cmp::Ordering;

/// Callback resolving a name inside a constant expression
pub type NameValues<'a> = dyn FnMut(ExprId, Symbol) -> Option<ConstValue> + 'a;

/// Const expression evaluator
///
/// Folds literals, `true`/`false`/`null`/`__LINE__` and unary and binary
/// operators over them. Names are not constants on their own; callers that
/// know which names denote manifest constants hand in a [`NameValues`]
/// callback through [`ConstEvaluator::with_names`].
pub struct ConstEvaluator<'a> {
    module: &'a Module,
    names: Option<&'a mut NameValues<'a>>,
}

impl<'a> ConstEvaluator<'a> {
    /// Creates an evaluator for expressions of `module`
    #[must_use]
    pub const fn new(module: &'a Module) -> Self {
        Self { module, names: None }
    }

    /// Creates an evaluator that asks `names` for the value of identifiers
    #[must_use]
    pub fn with_names(module: &'a Module, names: &'a mut NameValues<'a>) -> Self {
        Self {
            module,
            names: Some(names),
        }
    }

    /// Evaluates an expression to a const value
    ///
    /// # Errors
    ///
    /// Returns `ConstError` if:
    /// - The expression is not a constant expression
    /// - Division by zero occurs
    /// - The result does not fit its type
    /// - An operator is applied to operands it does not accept
    pub fn evaluate(&mut self, expr: ExprId) -> Result<ConstValue, ConstError> {
        let module = self.module;
        match &module.exprs[expr] {
            Expr::Literal { literal, span } => eval_literal(literal, *span),

            Expr::Keyword { keyword, span } => match keyword {
                Keyword::True => Ok(ConstValue::bool(true)),
                Keyword::False => Ok(ConstValue::bool(false)),
                Keyword::Null => Ok(ConstValue::null()),
                Keyword::Line => i32::try_from(span.start.line)
                    .map(ConstValue::int)
                    .map_err(|_| ConstError::Overflow { span: *span }),
                Keyword::This | Keyword::Super | Keyword::Dollar | Keyword::File => {
                    Err(ConstError::NotConstant { span: *span })
                }
            },

            Expr::Paren { inner, .. } => self.evaluate(*inner),

            Expr::Identifier { name, span } => {
                let name = *name;
                self.names
                    .as_mut()
                    .and_then(|names| names(expr, name))
                    .ok_or(ConstError::NotConstant { span: *span })
            }

            Expr::Unary { op, operand, span } => {
                let value = self.evaluate(*operand)?;
                eval_unary_op(*op, value, *span)
            }

            Expr::Binary { op, left, right, span } => {
                let left = self.evaluate(*left)?;
                let right = self.evaluate(*right)?;
                eval_binary_op(*op, left, right, *span)
            }

            Expr::TemplateInstance { span, .. }
            | Expr::Access { span, .. }
            | Expr::Call { span, .. }
            | Expr::New { span, .. }
            | Expr::Index { span, .. }
            | Expr::ArrayLiteral { span, .. }
            | Expr::Cast { span, .. }
            | Expr::Missing { span } => Err(ConstError::NotConstant { span: *span }),
        }
    }
}

/// Literal type follows the suffix; unsuffixed integers widen to the
/// first of `int`, `long`, `ulong` that holds the value.
fn eval_literal(literal: &Literal, span: Span) -> Result<ConstValue, ConstError> {
    let flags = literal.flags;
    match &literal.kind {
        LiteralKind::Char(ch) => {
            let code = u32::from(*ch);
            let kind = if code < 0x80 {
                PrimitiveKind::Char
            } else if code <= 0xFFFF {
                PrimitiveKind::Wchar
            } else {
                PrimitiveKind::Dchar
            };
            Ok(ConstValue {
                kind,
                raw: RawValue::Integer(i128::from(code)),
            })
        }

        LiteralKind::Integer(value) => {
            let value = i128::from(*value);
            let candidates: &[PrimitiveKind] = match (
                flags.contains(LiteralFlags::UNSIGNED),
                flags.contains(LiteralFlags::LONG),
            ) {
                (true, true) => &[PrimitiveKind::Ulong],
                (true, false) => &[PrimitiveKind::Uint, PrimitiveKind::Ulong],
                (false, true) => &[PrimitiveKind::Long, PrimitiveKind::Ulong],
                (false, false) => &[PrimitiveKind::Int, PrimitiveKind::Long, PrimitiveKind::Ulong],
            };
            candidates
                .iter()
                .find_map(|&kind| ConstValue::integer(kind, value))
                .ok_or(ConstError::Overflow { span })
        }

        LiteralKind::Float(value) => {
            let imaginary = flags.contains(LiteralFlags::IMAGINARY);
            let kind = match (
                flags.contains(LiteralFlags::FLOAT),
                flags.contains(LiteralFlags::REAL),
                imaginary,
            ) {
                (true, _, false) => PrimitiveKind::Float,
                (true, _, true) => PrimitiveKind::Ifloat,
                (false, true, false) => PrimitiveKind::Real,
                (false, true, true) => PrimitiveKind::Ireal,
                (false, false, false) => PrimitiveKind::Double,
                (false, false, true) => PrimitiveKind::Idouble,
            };
            Ok(ConstValue::float(kind, *value))
        }

        LiteralKind::String(_) => Err(ConstError::NotConstant { span }),
    }
}

/// Evaluates a unary operation
fn eval_unary_op(op: UnaryOp, operand: ConstValue, span: Span) -> Result<ConstValue, ConstError> {
    let invalid = || ConstError::InvalidOperands {
        op: unary_symbol(op),
        left: operand.kind,
        right: operand.kind,
        span,
    };

    match op {
        UnaryOp::Not => match operand.kind {
            PrimitiveKind::Void => Err(invalid()),
            _ => Ok(ConstValue::bool(!operand.is_truthy())),
        },

        UnaryOp::Plus | UnaryOp::Neg | UnaryOp::Complement => {
            let kind = operand.kind.promote(operand.kind);
            if let Some(value) = operand.as_integer() {
                let folded = match op {
                    UnaryOp::Neg => value.checked_neg().ok_or(ConstError::Overflow { span })?,
                    UnaryOp::Complement => !value,
                    _ => value,
                };
                return wrap_integer(kind, folded, span);
            }
            if op == UnaryOp::Complement {
                return Err(invalid());
            }
            let sign = if op == UnaryOp::Neg { -1.0 } else { 1.0 };
            match operand.raw {
                RawValue::Float(value) => Ok(ConstValue::float(kind, sign * value)),
                RawValue::Complex { re, im } => Ok(ConstValue::complex(kind, sign * re, sign * im)),
                RawValue::Bool(_) | RawValue::Integer(_) | RawValue::Null => Err(invalid()),
            }
        }

        UnaryOp::Deref
        | UnaryOp::AddressOf
        | UnaryOp::PreIncrement
        | UnaryOp::PreDecrement
        | UnaryOp::PostIncrement
        | UnaryOp::PostDecrement => Err(ConstError::NotConstant { span }),
    }
}

const fn unary_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Plus => "+",
        UnaryOp::Not => "!",
        UnaryOp::Complement => "~",
        UnaryOp::Deref => "*",
        UnaryOp::AddressOf => "&",
        UnaryOp::PreIncrement | UnaryOp::PostIncrement => "++",
        UnaryOp::PreDecrement | UnaryOp::PostDecrement => "--",
    }
}

/// Evaluates a binary operation
fn eval_binary_op(op: BinaryOp, left: ConstValue, right: ConstValue, span: Span) -> Result<ConstValue, ConstError> {
    let invalid = || ConstError::InvalidOperands {
        op: op.symbol(),
        left: left.kind,
        right: right.kind,
        span,
    };

    if op.is_assignment() || matches!(op, BinaryOp::Concat | BinaryOp::Is) {
        return Err(ConstError::NotConstant { span });
    }

    if op.is_logical() {
        let result = match op {
            BinaryOp::AndAnd => left.is_truthy() && right.is_truthy(),
            _ => left.is_truthy() || right.is_truthy(),
        };
        return Ok(ConstValue::bool(result));
    }

    if op.is_comparison() {
        return compare(op, left, right).map(ConstValue::bool).ok_or_else(invalid);
    }

    let arithmetic = |kind: PrimitiveKind| kind.is_numeric() || kind == PrimitiveKind::Bool;
    if !arithmetic(left.kind) || !arithmetic(right.kind) {
        return Err(invalid());
    }

    if matches!(op, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr) {
        return eval_shift(op, left, right, span).ok_or_else(invalid)?;
    }

    let kind = left.kind.promote(right.kind);
    if let (Some(left_val), Some(right_val)) = (left.as_integer(), right.as_integer())
        && (kind.is_integral() || kind == PrimitiveKind::Bool)
    {
        let result = match op {
            BinaryOp::Add => left_val.checked_add(right_val),
            BinaryOp::Sub => left_val.checked_sub(right_val),
            BinaryOp::Mul => left_val.checked_mul(right_val),
            BinaryOp::Div | BinaryOp::Rem if right_val == 0 => return Err(ConstError::DivisionByZero { span }),
            BinaryOp::Div => left_val.checked_div(right_val),
            BinaryOp::Rem => left_val.checked_rem(right_val),
            BinaryOp::BitAnd => Some(left_val & right_val),
            BinaryOp::BitOr => Some(left_val | right_val),
            BinaryOp::BitXor => Some(left_val ^ right_val),
            _ => return Err(invalid()),
        };
        return result.map_or_else(|| Err(ConstError::Overflow { span }), |value| wrap_integer(kind, value, span));
    }

    if matches!(op, BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor) {
        return Err(invalid());
    }

    if left.kind.is_imaginary() || left.kind.is_complex() || right.kind.is_imaginary() || right.kind.is_complex() {
        return eval_complex(op, left, right, span).ok_or_else(invalid)?;
    }

    let (Some(left_val), Some(right_val)) = (left.as_float(), right.as_float()) else {
        return Err(invalid());
    };
    let result = match op {
        BinaryOp::Add => left_val + right_val,
        BinaryOp::Sub => left_val - right_val,
        BinaryOp::Mul => left_val * right_val,
        BinaryOp::Div | BinaryOp::Rem if right_val == 0.0 => return Err(ConstError::DivisionByZero { span }),
        BinaryOp::Div => left_val / right_val,
        BinaryOp::Rem => left_val % right_val,
        _ => return Err(invalid()),
    };
    Ok(ConstValue::float(kind, result))
}

/// Numeric and `null` comparisons; `None` when the operands do not compare
fn compare(op: BinaryOp, left: ConstValue, right: ConstValue) -> Option<bool> {
    let ordering = match (left.raw, right.raw) {
        (RawValue::Null, RawValue::Null) => Ordering::Equal,
        (RawValue::Null, _) | (_, RawValue::Null) => return None,
        (RawValue::Complex { .. }, _) | (_, RawValue::Complex { .. }) => {
            let equal = left.as_complex()? == right.as_complex()?;
            return match op {
                BinaryOp::Eq => Some(equal),
                BinaryOp::NotEq => Some(!equal),
                _ => None,
            };
        }
        _ => match (left.as_integer(), right.as_integer()) {
            (Some(left_val), Some(right_val)) => left_val.cmp(&right_val),
            // NaN compares unequal to everything
            _ => match left.as_float()?.partial_cmp(&right.as_float()?) {
                Some(ordering) => ordering,
                None => return Some(op == BinaryOp::NotEq),
            },
        },
    };

    Some(match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::NotEq => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

/// `<<`, `>>` and `>>>`; the result has the promoted type of the left operand
fn eval_shift(op: BinaryOp, left: ConstValue, right: ConstValue, span: Span) -> Option<Result<ConstValue, ConstError>> {
    let kind = left.kind.promote(left.kind);
    let value = left.as_integer()?;
    let amount = right.as_integer()?;
    let bits = bit_width(kind)?;
    let Some(amount) = u32::try_from(amount).ok().filter(|amount| *amount < bits) else {
        return Some(Err(ConstError::Overflow { span }));
    };

    let result = match op {
        BinaryOp::Shl => value << amount,
        BinaryOp::Shr => value >> amount,
        _ => to_unsigned(value, bits) >> amount,
    };
    Some(ConstValue::integer(kind, truncate(kind, result, bits)).ok_or(ConstError::Overflow { span }))
}

/// Complex arithmetic; imaginary times imaginary is real
fn eval_complex(op: BinaryOp, left: ConstValue, right: ConstValue, span: Span) -> Option<Result<ConstValue, ConstError>> {
    let (a, b) = left.as_complex()?;
    let (c, d) = right.as_complex()?;
    let rank = left.kind.rank().max(right.kind.rank());
    let (real, imaginary, complex) = match rank {
        8 => (PrimitiveKind::Real, PrimitiveKind::Ireal, PrimitiveKind::Creal),
        7 => (PrimitiveKind::Double, PrimitiveKind::Idouble, PrimitiveKind::Cdouble),
        _ => (PrimitiveKind::Float, PrimitiveKind::Ifloat, PrimitiveKind::Cfloat),
    };
    let both_imaginary = left.kind.is_imaginary() && right.kind.is_imaginary();
    let one_imaginary = left.kind.is_imaginary() != right.kind.is_imaginary()
        && !left.kind.is_complex()
        && !right.kind.is_complex();

    let (re, im) = match op {
        BinaryOp::Add => (a + c, b + d),
        BinaryOp::Sub => (a - c, b - d),
        BinaryOp::Mul => (a.mul_add(c, -(b * d)), a.mul_add(d, b * c)),
        BinaryOp::Div => {
            let denominator = c.mul_add(c, d * d);
            if denominator == 0.0 {
                return Some(Err(ConstError::DivisionByZero { span }));
            }
            (a.mul_add(c, b * d) / denominator, b.mul_add(c, -(a * d)) / denominator)
        }
        _ => return None,
    };

    Some(Ok(match op {
        BinaryOp::Add | BinaryOp::Sub if both_imaginary => ConstValue::float(imaginary, im),
        BinaryOp::Mul | BinaryOp::Div if both_imaginary => ConstValue::float(real, re),
        BinaryOp::Mul | BinaryOp::Div if one_imaginary => ConstValue::float(imaginary, im),
        _ => ConstValue::complex(complex, re, im),
    }))
}

/// Bring an integer result into range of `kind`
///
/// Unsigned results wrap modulo their width; signed results that do not fit
/// are an overflow.
fn wrap_integer(kind: PrimitiveKind, value: i128, span: Span) -> Result<ConstValue, ConstError> {
    let value = match bit_width(kind) {
        Some(bits) if kind.is_unsigned() => to_unsigned(value, bits),
        _ => value,
    };
    ConstValue::integer(kind, value).ok_or(ConstError::Overflow { span })
}

fn to_unsigned(value: i128, bits: u32) -> i128 {
    value.rem_euclid(1_i128 << bits)
}

/// Two's complement truncation to `bits`
fn truncate(kind: PrimitiveKind, value: i128, bits: u32) -> i128 {
    let unsigned = to_unsigned(value, bits);
    if kind.is_unsigned() || unsigned < 1_i128 << (bits - 1) {
        unsigned
    } else {
        unsigned - (1_i128 << bits)
    }
}

const fn bit_width(kind: PrimitiveKind) -> Option<u32> {
    Some(match kind {
        PrimitiveKind::Bool => 1,
        PrimitiveKind::Byte | PrimitiveKind::Ubyte | PrimitiveKind::Char => 8,
        PrimitiveKind::Short | PrimitiveKind::Ushort | PrimitiveKind::Wchar => 16,
        PrimitiveKind::Int | PrimitiveKind::Uint | PrimitiveKind::Dchar => 32,
        PrimitiveKind::Long | PrimitiveKind::Ulong => 64,
        _ => return None,
    })
}

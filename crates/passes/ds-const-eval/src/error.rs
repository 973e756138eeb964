//! Const evaluation errors

use ds_dom::PrimitiveKind;
use ds_span::Span;
use thiserror::Error;

/// Errors that can occur during const evaluation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstError {
    /// Expression is not a constant expression
    #[error("expression is not a constant expression")]
    NotConstant {
        /// Location of the non-const expression
        span: Span,
    },

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero {
        /// Location of the division operation
        span: Span,
    },

    /// Result does not fit its type
    #[error("overflow in constant folding")]
    Overflow {
        /// Location of the overflow
        span: Span,
    },

    /// Operator applied to operands it does not accept
    #[error("invalid operands for `{op}`: {left} and {right}")]
    InvalidOperands {
        /// Operator spelling
        op: &'static str,
        /// Left operand kind
        left: PrimitiveKind,
        /// Right operand kind (the operand itself for unary operators)
        right: PrimitiveKind,
        /// Location of the operation
        span: Span,
    },
}

impl ConstError {
    /// Returns the span where the error occurred
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::NotConstant { span }
            | Self::DivisionByZero { span }
            | Self::Overflow { span }
            | Self::InvalidOperands { span, .. } => *span,
        }
    }
}

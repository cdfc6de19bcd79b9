#![forbid(unsafe_code)]

//! Operator evaluation, shared by comptime and runtime operands.
//!
//! Every operator is type-checked the same way whatever the status of its
//! operands; a concrete result is only computed when all operands are
//! comptime. Conditions worth reporting are returned alongside the value and
//! turned into diagnostics by the caller, which knows the source extent.

use std::cmp::Ordering;

use psdc_ast::{BinaryOp, Span, UnaryOp};

use crate::types::EvaluatedType;
use crate::value::{Comptime, Value, ValueStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationMessage {
    DivisionByZero,
    FloatingPointEquality,
    /// Comptime integer result out of range; the value is left to run time.
    IntegerOverflow,
    UnsupportedOperation,
}

#[derive(Clone, Debug)]
pub struct Operation {
    pub value: Value,
    pub messages: Vec<OperationMessage>,
}

impl Operation {
    fn ok(value: Value) -> Self {
        Self {
            value,
            messages: Vec::new(),
        }
    }

    fn unsupported(at: Span) -> Self {
        Self {
            value: Value::invalid(EvaluatedType::Unknown(at)),
            messages: vec![OperationMessage::UnsupportedOperation],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operand {
    Boolean,
    Character,
    Integer,
    Real,
    String,
    Other,
}

fn operand_kind(ty: &EvaluatedType) -> Operand {
    match ty.unaliased() {
        EvaluatedType::Boolean => Operand::Boolean,
        EvaluatedType::Character => Operand::Character,
        EvaluatedType::Integer => Operand::Integer,
        EvaluatedType::Real => Operand::Real,
        EvaluatedType::String | EvaluatedType::LengthedString(_) => Operand::String,
        _ => Operand::Other,
    }
}

fn is_numeric(k: Operand) -> bool {
    matches!(k, Operand::Integer | Operand::Real)
}

fn binary_result_type(op: BinaryOp, l: Operand, r: Operand) -> Option<EvaluatedType> {
    use BinaryOp as B;
    let both_numeric = is_numeric(l) && is_numeric(r);
    match op {
        B::And | B::Or | B::Xor => {
            (l == Operand::Boolean && r == Operand::Boolean).then_some(EvaluatedType::Boolean)
        }
        B::Equal | B::NotEqual => {
            ((l == r && l != Operand::Other) || both_numeric).then_some(EvaluatedType::Boolean)
        }
        B::Less | B::LessEqual | B::Greater | B::GreaterEqual => {
            let ordered = l == r
                && matches!(
                    l,
                    Operand::Character | Operand::Integer | Operand::Real | Operand::String
                );
            (ordered || both_numeric).then_some(EvaluatedType::Boolean)
        }
        B::Add | B::Subtract | B::Multiply | B::Divide | B::Modulus => match (l, r) {
            (Operand::Integer, Operand::Integer) => Some(EvaluatedType::Integer),
            _ if both_numeric => Some(EvaluatedType::Real),
            _ => None,
        },
    }
}

fn is_zero(value: &Value) -> bool {
    match value.as_comptime() {
        Some(Comptime::Integer(n)) => *n == 0,
        Some(Comptime::Real(x)) => *x == 0.0,
        _ => false,
    }
}

fn combined_status(left: &Value, right: &Value) -> ValueStatus {
    if left.is_invalid() || right.is_invalid() {
        ValueStatus::Invalid
    } else {
        ValueStatus::Runtime
    }
}

/// `at` is the extent of the whole operation, used to poison unsupported ones.
pub fn evaluate_binary(op: BinaryOp, left: &Value, right: &Value, at: Span) -> Operation {
    if left.ty.is_unknown() {
        return Operation::ok(Value::invalid(left.ty.clone()));
    }
    if right.ty.is_unknown() {
        return Operation::ok(Value::invalid(right.ty.clone()));
    }

    let (l, r) = (operand_kind(&left.ty), operand_kind(&right.ty));
    let Some(ty) = binary_result_type(op, l, r) else {
        return Operation::unsupported(at);
    };

    let mut messages = Vec::new();
    if matches!(op, BinaryOp::Equal | BinaryOp::NotEqual)
        && (l == Operand::Real || r == Operand::Real)
    {
        messages.push(OperationMessage::FloatingPointEquality);
    }
    if matches!(op, BinaryOp::Divide | BinaryOp::Modulus) && is_zero(right) {
        messages.push(OperationMessage::DivisionByZero);
        return Operation {
            value: Value::runtime(ty),
            messages,
        };
    }

    let status = match (left.as_comptime(), right.as_comptime()) {
        (Some(a), Some(b)) => match fold_binary(op, a, b) {
            Some(c) => ValueStatus::Comptime(c),
            None => {
                messages.push(OperationMessage::IntegerOverflow);
                ValueStatus::Runtime
            }
        },
        _ => combined_status(left, right),
    };
    tracing::trace!(op = op.symbol(), %status, "binary operation");

    Operation {
        value: Value { ty, status },
        messages,
    }
}

fn numeric_value(c: &Comptime) -> Option<f64> {
    match c {
        Comptime::Integer(n) => Some(f64::from(*n)),
        Comptime::Real(x) => Some(*x),
        _ => None,
    }
}

fn compare(op: BinaryOp, ord: Option<Ordering>) -> Option<bool> {
    Some(match op {
        BinaryOp::Equal => ord == Some(Ordering::Equal),
        BinaryOp::NotEqual => ord != Some(Ordering::Equal),
        BinaryOp::Less => ord == Some(Ordering::Less),
        BinaryOp::LessEqual => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
        BinaryOp::Greater => ord == Some(Ordering::Greater),
        BinaryOp::GreaterEqual => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        _ => return None,
    })
}

fn fold_binary(op: BinaryOp, a: &Comptime, b: &Comptime) -> Option<Comptime> {
    use BinaryOp as B;
    use Comptime as C;
    match (a, b) {
        (C::Boolean(x), C::Boolean(y)) => match op {
            B::And => Some(C::Boolean(*x && *y)),
            B::Or => Some(C::Boolean(*x || *y)),
            B::Xor => Some(C::Boolean(x ^ y)),
            _ => compare(op, Some(x.cmp(y))).map(C::Boolean),
        },
        (C::Integer(x), C::Integer(y)) => match op {
            B::Add => x.checked_add(*y).map(C::Integer),
            B::Subtract => x.checked_sub(*y).map(C::Integer),
            B::Multiply => x.checked_mul(*y).map(C::Integer),
            B::Divide => x.checked_div(*y).map(C::Integer),
            // Zero divisors never reach here; `i32::MIN % -1` is 0.
            B::Modulus => Some(C::Integer(x.wrapping_rem(*y))),
            _ => compare(op, Some(x.cmp(y))).map(C::Boolean),
        },
        (C::Character(x), C::Character(y)) => compare(op, Some(x.cmp(y))).map(C::Boolean),
        (C::String(x), C::String(y)) => compare(op, Some(x.cmp(y))).map(C::Boolean),
        _ => {
            let (x, y) = (numeric_value(a)?, numeric_value(b)?);
            match op {
                B::Add => Some(C::Real(x + y)),
                B::Subtract => Some(C::Real(x - y)),
                B::Multiply => Some(C::Real(x * y)),
                B::Divide => Some(C::Real(x / y)),
                B::Modulus => Some(C::Real(x % y)),
                _ => compare(op, x.partial_cmp(&y)).map(C::Boolean),
            }
        }
    }
}

pub fn evaluate_unary(op: UnaryOp, operand: &Value, at: Span) -> Operation {
    if operand.ty.is_unknown() {
        return Operation::ok(Value::invalid(operand.ty.clone()));
    }

    let ty = match (op, operand_kind(&operand.ty)) {
        (UnaryOp::Minus | UnaryOp::Plus, Operand::Integer) => EvaluatedType::Integer,
        (UnaryOp::Minus | UnaryOp::Plus, Operand::Real) => EvaluatedType::Real,
        (UnaryOp::Not, Operand::Boolean) => EvaluatedType::Boolean,
        _ => return Operation::unsupported(at),
    };

    let mut messages = Vec::new();
    let status = match operand.as_comptime() {
        Some(c) => {
            let folded = match (op, c) {
                (UnaryOp::Minus, Comptime::Integer(n)) => n.checked_neg().map(Comptime::Integer),
                (UnaryOp::Minus, Comptime::Real(x)) => Some(Comptime::Real(-x)),
                (UnaryOp::Not, Comptime::Boolean(b)) => Some(Comptime::Boolean(!b)),
                (UnaryOp::Plus, c) => Some(c.clone()),
                _ => None,
            };
            folded.map_or_else(
                || {
                    messages.push(OperationMessage::IntegerOverflow);
                    ValueStatus::Runtime
                },
                ValueStatus::Comptime,
            )
        }
        None if operand.is_invalid() => ValueStatus::Invalid,
        None => ValueStatus::Runtime,
    };
    tracing::trace!(op = op.symbol(), %status, "unary operation");

    Operation {
        value: Value { ty, status },
        messages,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastKind {
    /// An implicit conversion already exists.
    Redundant,
    Explicit,
    Invalid,
}

#[derive(Clone, Debug)]
pub struct CastOutcome {
    pub kind: CastKind,
    pub value: Value,
}

/// Converts `value` to `target`.
///
/// Explicit conversions: booléen to and from entier, caractère to entier,
/// entier to caractère and réel to entier (truncating).
pub fn evaluate_cast(value: &Value, target: &EvaluatedType) -> CastOutcome {
    if value.ty.is_unknown() || target.is_unknown() {
        return CastOutcome {
            kind: CastKind::Explicit,
            value: target.invalid_value(),
        };
    }
    if value.ty.is_convertible_to(target) {
        return CastOutcome {
            kind: CastKind::Redundant,
            value: value.converted_to(target),
        };
    }

    use EvaluatedType as T;
    let explicit = matches!(
        (value.ty.unaliased(), target.unaliased()),
        (T::Boolean, T::Integer)
            | (T::Integer, T::Boolean)
            | (T::Character, T::Integer)
            | (T::Integer, T::Character)
            | (T::Real, T::Integer)
    );
    if !explicit {
        return CastOutcome {
            kind: CastKind::Invalid,
            value: target.invalid_value(),
        };
    }

    let status = match value.as_comptime() {
        Some(c) => cast_comptime(c, target).map_or(ValueStatus::Runtime, ValueStatus::Comptime),
        None if value.is_invalid() => ValueStatus::Invalid,
        None => ValueStatus::Runtime,
    };
    CastOutcome {
        kind: CastKind::Explicit,
        value: Value {
            ty: target.clone(),
            status,
        },
    }
}

fn cast_comptime(c: &Comptime, target: &EvaluatedType) -> Option<Comptime> {
    match (c, target.unaliased()) {
        (Comptime::Boolean(b), EvaluatedType::Integer) => Some(Comptime::Integer(i32::from(*b))),
        (Comptime::Integer(n), EvaluatedType::Boolean) => Some(Comptime::Boolean(*n != 0)),
        (Comptime::Character(ch), EvaluatedType::Integer) => {
            i32::try_from(u32::from(*ch)).ok().map(Comptime::Integer)
        }
        (Comptime::Integer(n), EvaluatedType::Character) => u32::try_from(*n)
            .ok()
            .and_then(char::from_u32)
            .map(Comptime::Character),
        (Comptime::Real(x), EvaluatedType::Integer) => {
            let t = x.trunc();
            (t.is_finite() && t >= f64::from(i32::MIN) && t <= f64::from(i32::MAX))
                .then(|| Comptime::Integer(t as i32))
        }
        _ => None,
    }
}

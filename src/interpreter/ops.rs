//! Binary and unary operations over runtime values. Integer arithmetic is
//! C-style: `/` truncates toward zero, `%` is the remainder, and `**` is
//! integer power for non-negative exponents. Mixing an int with a float
//! promotes to float.

use crate::ast::BinOpKind;
use crate::lexer::FilePosition;

use super::value::Value;
use super::RuntimeError;

pub fn binary(
    op: BinOpKind,
    lhs: &Value,
    rhs: &Value,
    position: &FilePosition,
) -> Result<Value, RuntimeError> {
    match op {
        BinOpKind::Add => match (lhs, rhs) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
            _ => arithmetic(op, lhs, rhs, position),
        },
        BinOpKind::Subtract
        | BinOpKind::Multiply
        | BinOpKind::Divide
        | BinOpKind::Modulo
        | BinOpKind::Exponentiate => arithmetic(op, lhs, rhs, position),
        BinOpKind::Lesser | BinOpKind::LesserEqual | BinOpKind::Greater | BinOpKind::GreaterEqual => {
            comparison(op, lhs, rhs, position)
        }
        BinOpKind::Equal => Ok(Value::Bool(lhs.equals(rhs))),
        BinOpKind::NotEqual => Ok(Value::Bool(!lhs.equals(rhs))),
        BinOpKind::And | BinOpKind::Or => match (lhs, rhs) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == BinOpKind::And {
                *a && *b
            } else {
                *a || *b
            })),
            _ => Err(type_error(op, lhs, rhs, position)),
        },
    }
}

pub fn negate(value: &Value, position: &FilePosition) -> Result<Value, RuntimeError> {
    match value {
        Value::Int(v) => Ok(Value::Int(v.wrapping_neg())),
        Value::Float(v) => Ok(Value::Float(-v)),
        _ => Err(RuntimeError::at(
            format!("Cannot negate {}", value.type_of()),
            position.clone(),
        )),
    }
}

pub fn not(value: &Value, position: &FilePosition) -> Result<Value, RuntimeError> {
    match value {
        Value::Bool(v) => Ok(Value::Bool(!v)),
        _ => Err(RuntimeError::at(
            format!("Cannot apply ! to {}", value.type_of()),
            position.clone(),
        )),
    }
}

/// The value one step up or down from a numeric value, for `++` and `--`.
pub fn step(value: &Value, delta: i64, position: &FilePosition) -> Result<Value, RuntimeError> {
    match value {
        Value::Int(v) => Ok(Value::Int(v.wrapping_add(delta))),
        Value::Float(v) => Ok(Value::Float(v + delta as f64)),
        _ => Err(RuntimeError::at(
            format!("Cannot increment or decrement {}", value.type_of()),
            position.clone(),
        )),
    }
}

fn arithmetic(
    op: BinOpKind,
    lhs: &Value,
    rhs: &Value,
    position: &FilePosition,
) -> Result<Value, RuntimeError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, *a, *b, position),
        (Value::Int(a), Value::Float(b)) => float_arithmetic(op, *a as f64, *b, position),
        (Value::Float(a), Value::Int(b)) => float_arithmetic(op, *a, *b as f64, position),
        (Value::Float(a), Value::Float(b)) => float_arithmetic(op, *a, *b, position),
        _ => Err(type_error(op, lhs, rhs, position)),
    }
}

fn int_arithmetic(
    op: BinOpKind,
    lhs: i64,
    rhs: i64,
    position: &FilePosition,
) -> Result<Value, RuntimeError> {
    let value = match op {
        BinOpKind::Add => lhs.wrapping_add(rhs),
        BinOpKind::Subtract => lhs.wrapping_sub(rhs),
        BinOpKind::Multiply => lhs.wrapping_mul(rhs),
        BinOpKind::Divide => {
            if rhs == 0 {
                return Err(RuntimeError::at("Division by zero", position.clone()));
            }
            lhs.wrapping_div(rhs)
        }
        BinOpKind::Modulo => {
            if rhs == 0 {
                return Err(RuntimeError::at("Modulo by zero", position.clone()));
            }
            lhs.wrapping_rem(rhs)
        }
        BinOpKind::Exponentiate => {
            // A negative exponent leaves the integers.
            if rhs < 0 {
                return Ok(Value::Float((lhs as f64).powf(rhs as f64)));
            }
            let exponent = u32::try_from(rhs).map_err(|_| {
                RuntimeError::at("Exponent too large", position.clone())
            })?;
            lhs.checked_pow(exponent).ok_or_else(|| {
                RuntimeError::at("Integer overflow in exponentiation", position.clone())
            })?
        }
        _ => unreachable!("{op} is not arithmetic"),
    };
    Ok(Value::Int(value))
}

fn float_arithmetic(
    op: BinOpKind,
    lhs: f64,
    rhs: f64,
    position: &FilePosition,
) -> Result<Value, RuntimeError> {
    let value = match op {
        BinOpKind::Add => lhs + rhs,
        BinOpKind::Subtract => lhs - rhs,
        BinOpKind::Multiply => lhs * rhs,
        BinOpKind::Divide => {
            if rhs == 0.0 {
                return Err(RuntimeError::at("Division by zero", position.clone()));
            }
            lhs / rhs
        }
        BinOpKind::Modulo => {
            if rhs == 0.0 {
                return Err(RuntimeError::at("Modulo by zero", position.clone()));
            }
            lhs % rhs
        }
        BinOpKind::Exponentiate => lhs.powf(rhs),
        _ => unreachable!("{op} is not arithmetic"),
    };
    Ok(Value::Float(value))
}

fn comparison(
    op: BinOpKind,
    lhs: &Value,
    rhs: &Value,
    position: &FilePosition,
) -> Result<Value, RuntimeError> {
    let result = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => compare(op, *a, *b),
        (Value::Int(a), Value::Float(b)) => compare(op, *a as f64, *b),
        (Value::Float(a), Value::Int(b)) => compare(op, *a, *b as f64),
        (Value::Float(a), Value::Float(b)) => compare(op, *a, *b),
        _ => return Err(type_error(op, lhs, rhs, position)),
    };
    Ok(Value::Bool(result))
}

fn compare<T: PartialOrd>(op: BinOpKind, lhs: T, rhs: T) -> bool {
    match op {
        BinOpKind::Lesser => lhs < rhs,
        BinOpKind::LesserEqual => lhs <= rhs,
        BinOpKind::Greater => lhs > rhs,
        BinOpKind::GreaterEqual => lhs >= rhs,
        _ => unreachable!("{op} is not a comparison"),
    }
}

fn type_error(op: BinOpKind, lhs: &Value, rhs: &Value, position: &FilePosition) -> RuntimeError {
    RuntimeError::at(
        format!(
            "Cannot apply {op} to {} and {}",
            lhs.type_of(),
            rhs.type_of()
        ),
        position.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> FilePosition {
        FilePosition::unknown()
    }

    fn int_op(op: BinOpKind, a: i64, b: i64) -> Value {
        binary(op, &Value::Int(a), &Value::Int(b), &pos()).unwrap()
    }

    #[test]
    fn test_integer_division_truncates_toward_zero() {
        assert!(int_op(BinOpKind::Divide, 7, 2).equals(&Value::Int(3)));
        assert!(int_op(BinOpKind::Divide, -7, 2).equals(&Value::Int(-3)));
    }

    #[test]
    fn test_c_style_remainder() {
        assert!(int_op(BinOpKind::Modulo, 7, 3).equals(&Value::Int(1)));
        assert!(int_op(BinOpKind::Modulo, -7, 3).equals(&Value::Int(-1)));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(binary(BinOpKind::Divide, &Value::Int(5), &Value::Int(0), &pos()).is_err());
        assert!(binary(BinOpKind::Modulo, &Value::Int(5), &Value::Int(0), &pos()).is_err());
    }

    #[test]
    fn test_integer_power() {
        assert!(int_op(BinOpKind::Exponentiate, 2, 10).equals(&Value::Int(1024)));
    }

    #[test]
    fn test_negative_exponent_promotes_to_float() {
        let value = int_op(BinOpKind::Exponentiate, 2, -1);
        assert!(value.equals(&Value::Float(0.5)));
    }

    #[test]
    fn test_mixed_arithmetic_promotes() {
        let value = binary(BinOpKind::Add, &Value::Int(1), &Value::Float(2.5), &pos()).unwrap();
        assert!(value.equals(&Value::Float(3.5)));
    }

    #[test]
    fn test_string_concatenation() {
        let value = binary(
            BinOpKind::Add,
            &Value::String("ab".into()),
            &Value::String("cd".into()),
            &pos(),
        )
        .unwrap();
        assert!(value.equals(&Value::String("abcd".into())));
    }

    #[test]
    fn test_comparisons() {
        assert!(int_op(BinOpKind::Lesser, 1, 2).equals(&Value::Bool(true)));
        assert!(int_op(BinOpKind::GreaterEqual, 2, 2).equals(&Value::Bool(true)));
        let mixed = binary(
            BinOpKind::Lesser,
            &Value::Int(1),
            &Value::Float(1.5),
            &pos(),
        )
        .unwrap();
        assert!(mixed.equals(&Value::Bool(true)));
    }

    #[test]
    fn test_logical_requires_bools() {
        assert!(binary(BinOpKind::And, &Value::Bool(true), &Value::Int(1), &pos()).is_err());
    }
}

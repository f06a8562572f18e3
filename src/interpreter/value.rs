use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{Binding, Stmt};
use crate::typechecker::Type;

use super::scope::ScopeRef;

/// A runtime value. Arrays are shared references so that `append`/`remove`
/// mutate through every binding to the same array; everything else has value
/// semantics.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Tuple(Vec<Value>),
    Array(Rc<RefCell<Vec<Value>>>),
    Lambda(Rc<LambdaValue>),
}

/// A function value: parameters, body, captured environment, and the
/// resolved function type. Overloads of one name form a chain through
/// `prev`.
#[derive(Debug)]
pub struct LambdaValue {
    pub name: Option<String>,
    pub params: Vec<Binding>,
    pub body: Stmt,
    pub env: ScopeRef,
    pub fn_type: Type,
    pub prev: Option<Rc<LambdaValue>>,
}

impl Value {
    pub fn unit() -> Self {
        Value::Tuple(vec![])
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// The canonical textual form of the value.
    pub fn string_repr(&self) -> String {
        match self {
            Value::Int(value) => value.to_string(),
            Value::Float(value) => format_float(*value),
            Value::Bool(value) => if *value { "true" } else { "false" }.to_string(),
            Value::String(value) => value.clone(),
            Value::Tuple(parts) => {
                let parts: Vec<_> = parts.iter().map(Value::string_repr).collect();
                format!("({})", parts.join(", "))
            }
            Value::Array(elements) => {
                let elements: Vec<_> = elements.borrow().iter().map(Value::string_repr).collect();
                format!("[{}]", elements.join(", "))
            }
            Value::Lambda(lambda) => match &lambda.name {
                Some(name) => format!("<Function {name}>"),
                None => "<Anonymous Lambda>".to_string(),
            },
        }
    }

    pub fn type_of(&self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Float(_) => Type::Float,
            Value::Bool(_) => Type::Bool,
            Value::String(_) => Type::String,
            Value::Tuple(parts) => Type::Tuple(parts.iter().map(Value::type_of).collect()),
            Value::Array(elements) => {
                let element = elements
                    .borrow()
                    .first()
                    .map(Value::type_of)
                    .unwrap_or_else(Type::unit);
                Type::Array(Box::new(element))
            }
            Value::Lambda(lambda) => lambda.fn_type.clone(),
        }
    }

    /// Structural equality with numeric promotion.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
            }
            (Value::Array(a), Value::Array(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::Lambda(a), Value::Lambda(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn format_float(value: f64) -> String {
    let repr = format!("{value}");
    if repr.contains('.') || repr.contains('e') || repr.contains("inf") || repr.contains("NaN") {
        repr
    } else {
        format!("{repr}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_repr_primitives() {
        assert_eq!(Value::Int(42).string_repr(), "42");
        assert_eq!(Value::Bool(true).string_repr(), "true");
        assert_eq!(Value::Bool(false).string_repr(), "false");
        assert_eq!(Value::String("hi".into()).string_repr(), "hi");
    }

    #[test]
    fn test_string_repr_floats_keep_a_decimal_point() {
        assert_eq!(Value::Float(2.5).string_repr(), "2.5");
        assert_eq!(Value::Float(8.0).string_repr(), "8.0");
    }

    #[test]
    fn test_string_repr_composites() {
        let tuple = Value::Tuple(vec![Value::Int(1), Value::String("a".into())]);
        assert_eq!(tuple.string_repr(), "(1, a)");
        let array = Value::array(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(array.string_repr(), "[1, 2]");
    }

    #[test]
    fn test_equality_with_promotion() {
        assert!(Value::Int(2).equals(&Value::Float(2.0)));
        assert!(!Value::Int(2).equals(&Value::Float(2.5)));
        assert!(!Value::Int(1).equals(&Value::String("1".into())));
    }

    #[test]
    fn test_array_equality_is_structural() {
        let a = Value::array(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::array(vec![Value::Int(1), Value::Int(2)]);
        let c = Value::array(vec![Value::Int(1)]);
        assert!(a.equals(&b));
        assert!(!a.equals(&c));
    }
}

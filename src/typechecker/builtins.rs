//! Signatures of the builtin function library. Several builtins are
//! polymorphic over numeric or element types, which the `Type` language
//! cannot express directly, so their argument checking lives here rather
//! than in the variable table.

use crate::lexer::FilePosition;

use super::error::TypeError;
use super::types::Type;

const NUMERIC_TO_FLOAT: &[&str] = &[
    "sqrt", "ln", "log", "sin", "cos", "tan", "csc", "sec", "cot", "sinh", "cosh", "tanh",
    "csch", "sech", "coth", "arcsin", "arccos", "arctan", "arccsc", "arcsec", "arccot",
    "arcsinh", "arccosh", "arctanh", "arccsch", "arcsech", "arccoth",
];

const NAMES: &[&str] = &[
    "parseInt", "parseFloat", "parseBool", "toString", "sqrt", "ln", "log", "abs", "floor",
    "ceil", "round", "sin", "cos", "tan", "csc", "sec", "cot", "sinh", "cosh", "tanh", "csch",
    "sech", "coth", "arcsin", "arccos", "arctan", "arccsc", "arcsec", "arccot", "arcsinh",
    "arccosh", "arctanh", "arccsch", "arcsech", "arccoth", "random", "time", "date", "sleep",
    "charAt", "startsWith", "endsWith", "includes", "indexOf", "length", "replace",
    "replaceAll", "substring", "trim", "lower", "upper", "split", "sort", "filter", "map",
    "foreach", "append", "remove",
];

pub fn is_builtin(name: &str) -> bool {
    NAMES.contains(&name)
}

fn arity_error(name: &str, expected: usize, got: usize, position: &FilePosition) -> TypeError {
    TypeError::at(
        format!("{name} expects {expected} argument(s), got {got}"),
        position.clone(),
    )
}

fn argument_error(name: &str, args: &[Type], position: &FilePosition) -> TypeError {
    let args: Vec<_> = args.iter().map(Type::to_string).collect();
    TypeError::at(
        format!("{name} cannot be applied to ({})", args.join(", ")),
        position.clone(),
    )
}

fn expect_arity(
    name: &str,
    args: &[Type],
    expected: usize,
    position: &FilePosition,
) -> Result<(), TypeError> {
    if args.len() != expected {
        return Err(arity_error(name, expected, args.len(), position));
    }
    Ok(())
}

/// The result type of calling builtin `name` with the given argument types.
pub fn signature(name: &str, args: &[Type], position: &FilePosition) -> Result<Type, TypeError> {
    if NUMERIC_TO_FLOAT.contains(&name) {
        expect_arity(name, args, 1, position)?;
        if !args[0].is_numeric() {
            return Err(argument_error(name, args, position));
        }
        return Ok(Type::Float);
    }

    match name {
        "parseInt" | "parseFloat" | "parseBool" => {
            expect_arity(name, args, 1, position)?;
            if !matches!(args[0], Type::Int | Type::Float | Type::Bool | Type::String) {
                return Err(argument_error(name, args, position));
            }
            Ok(match name {
                "parseInt" => Type::Int,
                "parseFloat" => Type::Float,
                _ => Type::Bool,
            })
        }
        "toString" => {
            expect_arity(name, args, 1, position)?;
            Ok(Type::String)
        }
        "abs" => {
            expect_arity(name, args, 1, position)?;
            if !args[0].is_numeric() {
                return Err(argument_error(name, args, position));
            }
            Ok(args[0].clone())
        }
        "floor" | "ceil" | "round" => {
            expect_arity(name, args, 1, position)?;
            if !args[0].is_numeric() {
                return Err(argument_error(name, args, position));
            }
            Ok(Type::Int)
        }
        "random" => {
            expect_arity(name, args, 0, position)?;
            Ok(Type::Float)
        }
        "time" => {
            expect_arity(name, args, 0, position)?;
            Ok(Type::Int)
        }
        "date" => {
            expect_arity(name, args, 0, position)?;
            Ok(Type::Tuple(vec![
                Type::String,
                Type::String,
                Type::Int,
                Type::Int,
            ]))
        }
        "sleep" => {
            expect_arity(name, args, 1, position)?;
            if args[0] != Type::Int {
                return Err(argument_error(name, args, position));
            }
            Ok(Type::unit())
        }
        "charAt" => {
            expect_arity(name, args, 2, position)?;
            if args[0] != Type::String || args[1] != Type::Int {
                return Err(argument_error(name, args, position));
            }
            Ok(Type::String)
        }
        "startsWith" | "endsWith" | "includes" => {
            expect_arity(name, args, 2, position)?;
            if args[0] != Type::String || args[1] != Type::String {
                return Err(argument_error(name, args, position));
            }
            Ok(Type::Bool)
        }
        "indexOf" => {
            expect_arity(name, args, 2, position)?;
            if args[0] != Type::String || args[1] != Type::String {
                return Err(argument_error(name, args, position));
            }
            Ok(Type::Int)
        }
        "length" => {
            expect_arity(name, args, 1, position)?;
            match &args[0] {
                Type::String | Type::Array(_) => Ok(Type::Int),
                _ => Err(argument_error(name, args, position)),
            }
        }
        "replace" | "replaceAll" => {
            expect_arity(name, args, 3, position)?;
            if args.iter().any(|arg| *arg != Type::String) {
                return Err(argument_error(name, args, position));
            }
            Ok(Type::String)
        }
        "substring" => {
            expect_arity(name, args, 3, position)?;
            if args[0] != Type::String || args[1] != Type::Int || args[2] != Type::Int {
                return Err(argument_error(name, args, position));
            }
            Ok(Type::String)
        }
        "trim" | "lower" | "upper" => {
            expect_arity(name, args, 1, position)?;
            if args[0] != Type::String {
                return Err(argument_error(name, args, position));
            }
            Ok(Type::String)
        }
        "split" => {
            expect_arity(name, args, 2, position)?;
            if args[0] != Type::String || args[1] != Type::String {
                return Err(argument_error(name, args, position));
            }
            Ok(Type::Array(Box::new(Type::String)))
        }
        "sort" => {
            expect_arity(name, args, 1, position)?;
            match &args[0] {
                Type::Array(element)
                    if matches!(**element, Type::Int | Type::Float | Type::String) =>
                {
                    Ok(args[0].clone())
                }
                _ => Err(argument_error(name, args, position)),
            }
        }
        "filter" => {
            expect_arity(name, args, 2, position)?;
            let Type::Array(element) = &args[0] else {
                return Err(argument_error(name, args, position));
            };
            let Type::Function { params, ret } = &args[1] else {
                return Err(argument_error(name, args, position));
            };
            if params.len() != 1 || !params[0].accepts(element) || **ret != Type::Bool {
                return Err(argument_error(name, args, position));
            }
            Ok(args[0].clone())
        }
        "map" => {
            expect_arity(name, args, 2, position)?;
            let Type::Array(element) = &args[0] else {
                return Err(argument_error(name, args, position));
            };
            let Type::Function { params, ret } = &args[1] else {
                return Err(argument_error(name, args, position));
            };
            if params.len() != 1 || !params[0].accepts(element) {
                return Err(argument_error(name, args, position));
            }
            Ok(Type::Array(ret.clone()))
        }
        "foreach" => {
            expect_arity(name, args, 2, position)?;
            let Type::Array(element) = &args[0] else {
                return Err(argument_error(name, args, position));
            };
            let Type::Function { params, .. } = &args[1] else {
                return Err(argument_error(name, args, position));
            };
            if params.len() != 1 || !params[0].accepts(element) {
                return Err(argument_error(name, args, position));
            }
            Ok(Type::unit())
        }
        "append" => {
            expect_arity(name, args, 2, position)?;
            let Type::Array(element) = &args[0] else {
                return Err(argument_error(name, args, position));
            };
            if !element.accepts(&args[1]) {
                return Err(argument_error(name, args, position));
            }
            Ok(args[0].clone())
        }
        "remove" => {
            expect_arity(name, args, 2, position)?;
            if !matches!(args[0], Type::Array(_)) || args[1] != Type::Int {
                return Err(argument_error(name, args, position));
            }
            Ok(args[0].clone())
        }
        _ => Err(TypeError::at(
            format!("Unknown builtin '{name}'"),
            position.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> FilePosition {
        FilePosition::unknown()
    }

    #[test]
    fn test_sqrt_accepts_ints_and_floats() {
        assert_eq!(signature("sqrt", &[Type::Int], &pos()).unwrap(), Type::Float);
        assert_eq!(
            signature("sqrt", &[Type::Float], &pos()).unwrap(),
            Type::Float
        );
        assert!(signature("sqrt", &[Type::String], &pos()).is_err());
    }

    #[test]
    fn test_abs_preserves_type() {
        assert_eq!(signature("abs", &[Type::Int], &pos()).unwrap(), Type::Int);
        assert_eq!(
            signature("abs", &[Type::Float], &pos()).unwrap(),
            Type::Float
        );
    }

    #[test]
    fn test_map_result_type_comes_from_function() {
        let array = Type::Array(Box::new(Type::Int));
        let to_string = Type::Function {
            params: vec![Type::Int],
            ret: Box::new(Type::String),
        };
        assert_eq!(
            signature("map", &[array, to_string], &pos()).unwrap(),
            Type::Array(Box::new(Type::String))
        );
    }

    #[test]
    fn test_filter_requires_bool_predicate() {
        let array = Type::Array(Box::new(Type::Int));
        let bad = Type::Function {
            params: vec![Type::Int],
            ret: Box::new(Type::Int),
        };
        assert!(signature("filter", &[array, bad], &pos()).is_err());
    }

    #[test]
    fn test_arity_is_checked() {
        assert!(signature("charAt", &[Type::String], &pos()).is_err());
    }

    #[test]
    fn test_date_tuple() {
        assert_eq!(
            signature("date", &[], &pos()).unwrap(),
            Type::Tuple(vec![Type::String, Type::String, Type::Int, Type::Int])
        );
    }
}

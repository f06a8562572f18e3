//! Runtime implementations of the builtin function library. Argument counts
//! and types were vetted by the type checker; the checks here exist so a
//! bad dispatch surfaces as a runtime diagnostic instead of a panic.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::lexer::FilePosition;

use super::value::Value;
use super::{FlowController, RuntimeError};

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn call(
    flow: &mut FlowController,
    name: &str,
    args: Vec<Value>,
    position: &FilePosition,
) -> Result<Value, RuntimeError> {
    if let Some(math) = unary_float_fn(name) {
        let operand = as_float(arg(&args, 0, name, position)?, name, position)?;
        return Ok(Value::Float(math(operand)));
    }

    match name {
        "parseInt" => parse_int(arg(&args, 0, name, position)?, position),
        "parseFloat" => parse_float(arg(&args, 0, name, position)?, position),
        "parseBool" => parse_bool(arg(&args, 0, name, position)?, position),
        "toString" => Ok(Value::String(arg(&args, 0, name, position)?.string_repr())),
        "abs" => match arg(&args, 0, name, position)? {
            Value::Int(value) => Ok(Value::Int(value.wrapping_abs())),
            Value::Float(value) => Ok(Value::Float(value.abs())),
            other => Err(bad_argument(name, other, position)),
        },
        "floor" => {
            let value = as_float(arg(&args, 0, name, position)?, name, position)?;
            Ok(Value::Int(value.floor() as i64))
        }
        "ceil" => {
            let value = as_float(arg(&args, 0, name, position)?, name, position)?;
            Ok(Value::Int(value.ceil() as i64))
        }
        "round" => {
            let value = as_float(arg(&args, 0, name, position)?, name, position)?;
            Ok(Value::Int(value.round() as i64))
        }
        "random" => Ok(Value::Float(rand::random::<f64>())),
        "time" => {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::ZERO);
            Ok(Value::Int(now.as_secs() as i64))
        }
        "date" => {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::ZERO);
            Ok(date_tuple(now.as_secs() as i64))
        }
        "sleep" => {
            let millis = as_int(arg(&args, 0, name, position)?, name, position)?.max(0) as u64;
            let wake = Instant::now() + Duration::from_millis(millis);
            // Sleep in slices so an enclosing timeout can still fire.
            loop {
                flow.check_deadline(position)?;
                let now = Instant::now();
                if now >= wake {
                    return Ok(Value::unit());
                }
                std::thread::sleep((wake - now).min(Duration::from_millis(10)));
            }
        }
        "charAt" => {
            let text = as_string(arg(&args, 0, name, position)?, name, position)?;
            let index = as_int(arg(&args, 1, name, position)?, name, position)?;
            let chars: Vec<char> = text.chars().collect();
            if index < 0 || index as usize >= chars.len() {
                return Err(RuntimeError::at(
                    format!("Index {index} out of range"),
                    position.clone(),
                ));
            }
            Ok(Value::String(chars[index as usize].to_string()))
        }
        "startsWith" => {
            let haystack = as_string(arg(&args, 0, name, position)?, name, position)?;
            let needle = as_string(arg(&args, 1, name, position)?, name, position)?;
            Ok(Value::Bool(haystack.starts_with(&needle)))
        }
        "endsWith" => {
            let haystack = as_string(arg(&args, 0, name, position)?, name, position)?;
            let needle = as_string(arg(&args, 1, name, position)?, name, position)?;
            Ok(Value::Bool(haystack.ends_with(&needle)))
        }
        "includes" => {
            let haystack = as_string(arg(&args, 0, name, position)?, name, position)?;
            let needle = as_string(arg(&args, 1, name, position)?, name, position)?;
            Ok(Value::Bool(haystack.contains(&needle)))
        }
        "indexOf" => {
            let haystack = as_string(arg(&args, 0, name, position)?, name, position)?;
            let needle = as_string(arg(&args, 1, name, position)?, name, position)?;
            let index = haystack
                .find(&needle)
                .map(|byte| haystack[..byte].chars().count() as i64)
                .unwrap_or(-1);
            Ok(Value::Int(index))
        }
        "length" => match arg(&args, 0, name, position)? {
            Value::String(text) => Ok(Value::Int(text.chars().count() as i64)),
            Value::Array(elements) => Ok(Value::Int(elements.borrow().len() as i64)),
            other => Err(bad_argument(name, other, position)),
        },
        "replace" => {
            let text = as_string(arg(&args, 0, name, position)?, name, position)?;
            let needle = as_string(arg(&args, 1, name, position)?, name, position)?;
            let replacement = as_string(arg(&args, 2, name, position)?, name, position)?;
            Ok(Value::String(text.replacen(&needle, &replacement, 1)))
        }
        "replaceAll" => {
            let text = as_string(arg(&args, 0, name, position)?, name, position)?;
            let needle = as_string(arg(&args, 1, name, position)?, name, position)?;
            let replacement = as_string(arg(&args, 2, name, position)?, name, position)?;
            Ok(Value::String(text.replace(&needle, &replacement)))
        }
        "substring" => {
            let text = as_string(arg(&args, 0, name, position)?, name, position)?;
            let start = as_int(arg(&args, 1, name, position)?, name, position)?;
            let end = as_int(arg(&args, 2, name, position)?, name, position)?;
            let chars: Vec<char> = text.chars().collect();
            if start < 0 || end < start || end as usize > chars.len() {
                return Err(RuntimeError::at(
                    format!("Substring bounds {start}..{end} out of range"),
                    position.clone(),
                ));
            }
            Ok(Value::String(
                chars[start as usize..end as usize].iter().collect(),
            ))
        }
        "trim" => {
            let text = as_string(arg(&args, 0, name, position)?, name, position)?;
            Ok(Value::String(text.trim().to_string()))
        }
        "lower" => {
            let text = as_string(arg(&args, 0, name, position)?, name, position)?;
            Ok(Value::String(text.to_lowercase()))
        }
        "upper" => {
            let text = as_string(arg(&args, 0, name, position)?, name, position)?;
            Ok(Value::String(text.to_uppercase()))
        }
        "split" => {
            let text = as_string(arg(&args, 0, name, position)?, name, position)?;
            let separator = as_string(arg(&args, 1, name, position)?, name, position)?;
            let parts: Vec<Value> = if separator.is_empty() {
                text.chars()
                    .map(|c| Value::String(c.to_string()))
                    .collect()
            } else {
                text.split(&separator)
                    .map(|part| Value::String(part.to_string()))
                    .collect()
            };
            Ok(Value::array(parts))
        }
        "sort" => {
            let Value::Array(elements) = arg(&args, 0, name, position)? else {
                return Err(bad_argument(name, arg(&args, 0, name, position)?, position));
            };
            elements.borrow_mut().sort_by(compare_values);
            Ok(Value::Array(elements.clone()))
        }
        "filter" => {
            let Value::Array(elements) = arg(&args, 0, name, position)? else {
                return Err(bad_argument(name, arg(&args, 0, name, position)?, position));
            };
            let function = arg(&args, 1, name, position)?.clone();
            let snapshot: Vec<Value> = elements.borrow().clone();
            let mut kept = vec![];
            for element in snapshot {
                let verdict =
                    flow.call_function_value(&function, vec![element.clone()], position)?;
                if matches!(verdict, Value::Bool(true)) {
                    kept.push(element);
                }
            }
            Ok(Value::array(kept))
        }
        "map" => {
            let Value::Array(elements) = arg(&args, 0, name, position)? else {
                return Err(bad_argument(name, arg(&args, 0, name, position)?, position));
            };
            let function = arg(&args, 1, name, position)?.clone();
            let snapshot: Vec<Value> = elements.borrow().clone();
            let mut mapped = vec![];
            for element in snapshot {
                mapped.push(flow.call_function_value(&function, vec![element], position)?);
            }
            Ok(Value::array(mapped))
        }
        "foreach" => {
            let Value::Array(elements) = arg(&args, 0, name, position)? else {
                return Err(bad_argument(name, arg(&args, 0, name, position)?, position));
            };
            let function = arg(&args, 1, name, position)?.clone();
            let snapshot: Vec<Value> = elements.borrow().clone();
            for element in snapshot {
                flow.call_function_value(&function, vec![element], position)?;
            }
            Ok(Value::unit())
        }
        "append" => {
            let Value::Array(elements) = arg(&args, 0, name, position)? else {
                return Err(bad_argument(name, arg(&args, 0, name, position)?, position));
            };
            let value = arg(&args, 1, name, position)?.clone();
            elements.borrow_mut().push(value);
            Ok(Value::Array(elements.clone()))
        }
        "remove" => {
            let Value::Array(elements) = arg(&args, 0, name, position)? else {
                return Err(bad_argument(name, arg(&args, 0, name, position)?, position));
            };
            let index = as_int(arg(&args, 1, name, position)?, name, position)?;
            let length = elements.borrow().len();
            if index < 0 || index as usize >= length {
                return Err(RuntimeError::at(
                    format!("Index {index} out of range"),
                    position.clone(),
                ));
            }
            elements.borrow_mut().remove(index as usize);
            Ok(Value::Array(elements.clone()))
        }
        _ => Err(RuntimeError::at(
            format!("Unknown builtin '{name}'"),
            position.clone(),
        )),
    }
}

fn unary_float_fn(name: &str) -> Option<fn(f64) -> f64> {
    Some(match name {
        "sqrt" => f64::sqrt,
        "ln" => f64::ln,
        "log" => f64::log10,
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "csc" => |x| 1.0 / x.sin(),
        "sec" => |x| 1.0 / x.cos(),
        "cot" => |x| x.cos() / x.sin(),
        "sinh" => f64::sinh,
        "cosh" => f64::cosh,
        "tanh" => f64::tanh,
        "csch" => |x| 1.0 / x.sinh(),
        "sech" => |x| 1.0 / x.cosh(),
        "coth" => |x| x.cosh() / x.sinh(),
        "arcsin" => f64::asin,
        "arccos" => f64::acos,
        "arctan" => f64::atan,
        "arccsc" => |x| (1.0 / x).asin(),
        "arcsec" => |x| (1.0 / x).acos(),
        "arccot" => |x| (1.0 / x).atan(),
        "arcsinh" => f64::asinh,
        "arccosh" => f64::acosh,
        "arctanh" => f64::atanh,
        "arccsch" => |x| (1.0 / x).asinh(),
        "arcsech" => |x| (1.0 / x).acosh(),
        "arccoth" => |x| (1.0 / x).atanh(),
        _ => return None,
    })
}

/// The `(weekday, month, day, year)` tuple for a UTC timestamp, using the
/// days-from-civil algorithm.
fn date_tuple(epoch_seconds: i64) -> Value {
    let days = epoch_seconds.div_euclid(86_400);
    let weekday = WEEKDAYS[(days + 4).rem_euclid(7) as usize];

    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    Value::Tuple(vec![
        Value::String(weekday.to_string()),
        Value::String(MONTHS[(month - 1) as usize].to_string()),
        Value::Int(day),
        Value::Int(year),
    ])
}

fn parse_int(value: &Value, position: &FilePosition) -> Result<Value, RuntimeError> {
    match value {
        Value::Int(v) => Ok(Value::Int(*v)),
        Value::Float(v) => Ok(Value::Int(*v as i64)),
        Value::Bool(v) => Ok(Value::Int(i64::from(*v))),
        Value::String(text) => text.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            RuntimeError::at(format!("Cannot parse '{text}' as int"), position.clone())
        }),
        other => Err(bad_argument("parseInt", other, position)),
    }
}

fn parse_float(value: &Value, position: &FilePosition) -> Result<Value, RuntimeError> {
    match value {
        Value::Int(v) => Ok(Value::Float(*v as f64)),
        Value::Float(v) => Ok(Value::Float(*v)),
        Value::Bool(v) => Ok(Value::Float(f64::from(u8::from(*v)))),
        Value::String(text) => text.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            RuntimeError::at(format!("Cannot parse '{text}' as float"), position.clone())
        }),
        other => Err(bad_argument("parseFloat", other, position)),
    }
}

fn parse_bool(value: &Value, position: &FilePosition) -> Result<Value, RuntimeError> {
    match value {
        Value::Bool(v) => Ok(Value::Bool(*v)),
        Value::Int(v) => Ok(Value::Bool(*v != 0)),
        Value::Float(v) => Ok(Value::Bool(*v != 0.0)),
        Value::String(text) => {
            if text.trim().eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if text.trim().eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(RuntimeError::at(
                    format!("Cannot parse '{text}' as bool"),
                    position.clone(),
                ))
            }
        }
        other => Err(bad_argument("parseBool", other, position)),
    }
}

fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => match (numeric(a), numeric(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        _ => None,
    }
}

fn arg<'a>(
    args: &'a [Value],
    index: usize,
    name: &str,
    position: &FilePosition,
) -> Result<&'a Value, RuntimeError> {
    args.get(index).ok_or_else(|| {
        RuntimeError::at(
            format!("{name} is missing argument {index}"),
            position.clone(),
        )
    })
}

fn as_int(value: &Value, name: &str, position: &FilePosition) -> Result<i64, RuntimeError> {
    match value {
        Value::Int(v) => Ok(*v),
        other => Err(bad_argument(name, other, position)),
    }
}

fn as_float(value: &Value, name: &str, position: &FilePosition) -> Result<f64, RuntimeError> {
    match value {
        Value::Int(v) => Ok(*v as f64),
        Value::Float(v) => Ok(*v),
        other => Err(bad_argument(name, other, position)),
    }
}

fn as_string(value: &Value, name: &str, position: &FilePosition) -> Result<String, RuntimeError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        other => Err(bad_argument(name, other, position)),
    }
}

fn bad_argument(name: &str, value: &Value, position: &FilePosition) -> RuntimeError {
    RuntimeError::at(
        format!("{name} cannot be applied to {}", value.type_of()),
        position.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_tuple_epoch() {
        let Value::Tuple(parts) = date_tuple(0) else {
            panic!("date_tuple must return a tuple");
        };
        assert!(parts[0].equals(&Value::String("Thursday".into())));
        assert!(parts[1].equals(&Value::String("January".into())));
        assert!(parts[2].equals(&Value::Int(1)));
        assert!(parts[3].equals(&Value::Int(1970)));
    }

    #[test]
    fn test_date_tuple_recent() {
        // 2024-02-29 12:00:00 UTC, a leap day.
        let Value::Tuple(parts) = date_tuple(1_709_208_000) else {
            panic!("date_tuple must return a tuple");
        };
        assert!(parts[0].equals(&Value::String("Thursday".into())));
        assert!(parts[1].equals(&Value::String("February".into())));
        assert!(parts[2].equals(&Value::Int(29)));
        assert!(parts[3].equals(&Value::Int(2024)));
    }

    #[test]
    fn test_parse_int_from_string() {
        let pos = FilePosition::unknown();
        assert!(parse_int(&Value::String(" 42 ".into()), &pos)
            .unwrap()
            .equals(&Value::Int(42)));
        assert!(parse_int(&Value::String("x".into()), &pos).is_err());
    }

    #[test]
    fn test_parse_bool_is_case_insensitive() {
        let pos = FilePosition::unknown();
        assert!(parse_bool(&Value::String("TrUe".into()), &pos)
            .unwrap()
            .equals(&Value::Bool(true)));
    }
}

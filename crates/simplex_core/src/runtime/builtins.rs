//! Builtin demonstration library.
//!
//! Registered as `simplex.builtins` and used by the CLI and smoke tests.

use crate::model::value::Value;
use crate::runtime::args::{ResolvedArgs, TaskError};
use crate::runtime::loader::{StaticLibrary, StaticLoader};

/// Library name of the builtin functions.
pub const BUILTINS_LIBRARY: &str = "simplex.builtins";

/// Builds the builtin library (`add`, `multiply`, `concat`, `divmod`).
pub fn builtin_library() -> StaticLibrary {
    StaticLibrary::new()
        .with_function("add", add)
        .with_function("multiply", multiply)
        .with_function("concat", concat)
        .with_function("divmod", divmod)
}

/// Static loader with only the builtin library registered.
pub fn builtin_loader() -> StaticLoader {
    let mut loader = StaticLoader::new();
    loader.register_library(BUILTINS_LIBRARY, builtin_library());
    loader
}

fn add(args: &ResolvedArgs) -> Result<Value, TaskError> {
    match (args.get("a")?, args.get("b")?) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| TaskError::new("integer overflow in add")),
        _ => Ok(Value::Float(args.float("a")? + args.float("b")?)),
    }
}

fn multiply(args: &ResolvedArgs) -> Result<Value, TaskError> {
    match (args.get("a")?, args.get("b")?) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_mul(*b)
            .map(Value::Int)
            .ok_or_else(|| TaskError::new("integer overflow in multiply")),
        _ => Ok(Value::Float(args.float("a")? * args.float("b")?)),
    }
}

/// Joins `values` with `separator` (default empty).
fn concat(args: &ResolvedArgs) -> Result<Value, TaskError> {
    let separator = if args.contains("separator") {
        args.str("separator")?
    } else {
        ""
    };
    let parts: Vec<String> = args
        .list("values")?
        .iter()
        .map(|value| match value {
            Value::Str(text) => text.clone(),
            other => other.to_string(),
        })
        .collect();
    Ok(Value::Str(parts.join(separator)))
}

/// Two-value result: floored quotient and remainder.
fn divmod(args: &ResolvedArgs) -> Result<Value, TaskError> {
    let a = args.int("a")?;
    let b = args.int("b")?;
    if b == 0 {
        return Err(TaskError::new("integer division by zero"));
    }
    let overflow = || TaskError::new("integer overflow in divmod");
    let mut quotient = a.checked_div(b).ok_or_else(overflow)?;
    let mut remainder = a.checked_rem(b).ok_or_else(overflow)?;
    // Remainder takes the sign of the divisor.
    if remainder != 0 && (remainder < 0) != (b < 0) {
        quotient -= 1;
        remainder += b;
    }
    Ok(Value::List(vec![Value::Int(quotient), Value::Int(remainder)]))
}

#[cfg(test)]
mod tests {
    use super::{add, concat, divmod};
    use crate::model::value::Value;
    use crate::runtime::args::ResolvedArgs;

    fn args(pairs: Vec<(&str, Value)>) -> ResolvedArgs {
        let mut args = ResolvedArgs::new();
        for (name, value) in pairs {
            args.insert(name, value);
        }
        args
    }

    #[test]
    fn add_keeps_integers_and_widens_mixed_input() {
        assert_eq!(
            add(&args(vec![("a", Value::Int(2)), ("b", Value::Int(3))])),
            Ok(Value::Int(5))
        );
        assert_eq!(
            add(&args(vec![("a", Value::Int(2)), ("b", Value::Float(0.5))])),
            Ok(Value::Float(2.5))
        );
    }

    #[test]
    fn concat_joins_scalars_and_lists() {
        let joined = concat(&args(vec![
            ("values", Value::List(vec![Value::from("a"), Value::Int(1)])),
            ("separator", Value::from("-")),
        ]));
        assert_eq!(joined, Ok(Value::from("a-1")));
        assert_eq!(
            concat(&args(vec![("values", Value::from("solo"))])),
            Ok(Value::from("solo"))
        );
    }

    #[test]
    fn divmod_returns_two_values_and_rejects_zero() {
        assert_eq!(
            divmod(&args(vec![("a", Value::Int(7)), ("b", Value::Int(2))])),
            Ok(Value::List(vec![Value::Int(3), Value::Int(1)]))
        );
        assert!(divmod(&args(vec![("a", Value::Int(7)), ("b", Value::Int(0))])).is_err());
    }

    #[test]
    fn divmod_floors_toward_negative_infinity() {
        assert_eq!(
            divmod(&args(vec![("a", Value::Int(7)), ("b", Value::Int(-2))])),
            Ok(Value::List(vec![Value::Int(-4), Value::Int(-1)]))
        );
        assert_eq!(
            divmod(&args(vec![("a", Value::Int(-7)), ("b", Value::Int(2))])),
            Ok(Value::List(vec![Value::Int(-4), Value::Int(1)]))
        );
        assert_eq!(
            divmod(&args(vec![("a", Value::Int(-7)), ("b", Value::Int(-2))])),
            Ok(Value::List(vec![Value::Int(3), Value::Int(-1)]))
        );
    }

    #[test]
    fn divmod_reports_overflow_instead_of_panicking() {
        let err = divmod(&args(vec![("a", Value::Int(i64::MIN)), ("b", Value::Int(-1))]))
            .expect_err("i64::MIN / -1 overflows");
        assert!(err.message().contains("overflow"));
    }
}

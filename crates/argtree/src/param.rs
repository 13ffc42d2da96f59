//! Typed parameter slots and text coercion.
//!
//! Every flag and positional argument is bound to a field implementing [`Param`].
//! The field's [`Shape`] decides how the parser treats it:
//!
//! - `bool` is a boolean switch and never takes a value.
//! - Plain scalars (`String`, integers, floats, `PathBuf`, custom types) require a value.
//! - `Option<T>` may take a value (`--name` or `--name=value`).
//! - `Vec<T>` requires a value and accumulates every occurrence.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// How a parameter consumes text from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Never takes a value; presence sets it.
    Boolean,
    /// Always takes exactly one value.
    Required,
    /// May be given with or without a value.
    Optional,
    /// Takes one value per occurrence and accumulates them.
    Repeatable,
}

impl Arity {
    /// Whether the parameter can accept a value at all.
    pub fn may_take_value(self) -> bool {
        self != Arity::Boolean
    }

    /// Whether the parameter cannot be set without a value.
    pub fn must_take_value(self) -> bool {
        matches!(self, Arity::Required | Arity::Repeatable)
    }
}

/// Structural description of a [`Param`] type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Boolean,
    /// A single value, labelled with its short type name.
    Scalar(&'static str),
    Optional(Box<Shape>),
    Repeatable(Box<Shape>),
}

impl Shape {
    /// Classify the shape, rejecting nestings the parser cannot express.
    pub fn arity(&self) -> Result<Arity, UnsupportedType> {
        let unsupported = |reason| UnsupportedType {
            shape: self.to_string(),
            reason,
        };
        match self {
            Shape::Boolean => Ok(Arity::Boolean),
            Shape::Scalar(_) => Ok(Arity::Required),
            Shape::Optional(inner) => match inner.as_ref() {
                Shape::Scalar(_) => Ok(Arity::Optional),
                Shape::Boolean => Err(unsupported("a boolean cannot be optional")),
                Shape::Optional(_) => Err(unsupported("optional values cannot nest")),
                Shape::Repeatable(_) => Err(unsupported("a repeatable value cannot be optional")),
            },
            Shape::Repeatable(inner) => match inner.as_ref() {
                Shape::Scalar(_) => Ok(Arity::Repeatable),
                Shape::Boolean => Err(unsupported("a boolean cannot repeat")),
                Shape::Optional(_) => Err(unsupported("an optional value cannot repeat")),
                Shape::Repeatable(_) => Err(unsupported("repeatable values cannot nest")),
            },
        }
    }

    /// Placeholder shown in usage text when no value name is declared.
    pub fn value_name(&self) -> &'static str {
        match self {
            Shape::Boolean => "bool",
            Shape::Scalar(name) => name,
            Shape::Optional(inner) | Shape::Repeatable(inner) => inner.value_name(),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Boolean => f.write_str("bool"),
            Shape::Scalar(name) => f.write_str(name),
            Shape::Optional(inner) => write!(f, "Option<{inner}>"),
            Shape::Repeatable(inner) => write!(f, "Vec<{inner}>"),
        }
    }
}

/// A parameter type whose shape cannot be bound to the command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported parameter type {shape}: {reason}")]
pub struct UnsupportedType {
    pub shape: String,
    pub reason: &'static str,
}

/// Text that could not be converted into a parameter's type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value {literal:?} for {target}: {reason}")]
pub struct CoercionError {
    pub literal: String,
    pub target: String,
    pub reason: String,
}

impl CoercionError {
    pub fn new(literal: &str, target: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            literal: literal.to_string(),
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}

/// A configuration field that can be set from command-line text.
///
/// Implement this for custom value types; the default [`Param::shape`] makes the
/// type a required scalar named after the type itself.
///
/// ```
/// use argtree::{CoercionError, Param};
///
/// #[derive(Default)]
/// struct Port(u16);
///
/// impl Param for Port {
///     fn set_from_text(&mut self, text: &str) -> Result<(), CoercionError> {
///         let port: u16 = text
///             .parse()
///             .map_err(|err| CoercionError::new(text, "Port", err))?;
///         if port == 0 {
///             return Err(CoercionError::new(text, "Port", "port 0 is reserved"));
///         }
///         self.0 = port;
///         Ok(())
///     }
/// }
/// ```
pub trait Param {
    /// Update the field from `text`.
    ///
    /// Boolean fields receive an empty string and ignore it. Repeatable fields
    /// append instead of overwriting.
    fn set_from_text(&mut self, text: &str) -> Result<(), CoercionError>;

    fn shape() -> Shape
    where
        Self: Sized,
    {
        Shape::Scalar(short_type_name::<Self>())
    }
}

/// Arity of `T`, or why `T` cannot be a parameter.
pub fn classify<T: Param>() -> Result<Arity, UnsupportedType> {
    T::shape().arity()
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

impl Param for bool {
    fn set_from_text(&mut self, _text: &str) -> Result<(), CoercionError> {
        *self = true;
        Ok(())
    }

    fn shape() -> Shape {
        Shape::Boolean
    }
}

impl Param for String {
    fn set_from_text(&mut self, text: &str) -> Result<(), CoercionError> {
        text.clone_into(self);
        Ok(())
    }

    fn shape() -> Shape {
        Shape::Scalar("string")
    }
}

impl Param for PathBuf {
    fn set_from_text(&mut self, text: &str) -> Result<(), CoercionError> {
        *self = PathBuf::from(text);
        Ok(())
    }

    fn shape() -> Shape {
        Shape::Scalar("path")
    }
}

/// Split an integer literal into sign, radix and digits.
///
/// Accepts an optional sign followed by `0x`, `0o` or `0b` prefixes, or plain decimal.
fn split_int_literal(text: &str) -> (bool, u32, &str) {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (radix, digits) = match unsigned.get(..2) {
        Some("0x" | "0X") => (16, &unsigned[2..]),
        Some("0o" | "0O") => (8, &unsigned[2..]),
        Some("0b" | "0B") => (2, &unsigned[2..]),
        _ => (10, unsigned),
    };
    (negative, radix, digits)
}

fn parse_signed(text: &str, target: &'static str) -> Result<i128, CoercionError> {
    let (negative, radix, digits) = split_int_literal(text);
    if digits.starts_with(['+', '-']) {
        return Err(CoercionError::new(text, target, "misplaced sign"));
    }
    let magnitude =
        u128::from_str_radix(digits, radix).map_err(|err| CoercionError::new(text, target, err))?;
    let value = if negative {
        0i128.checked_sub_unsigned(magnitude)
    } else {
        i128::try_from(magnitude).ok()
    };
    value.ok_or_else(|| CoercionError::new(text, target, "value out of range"))
}

fn parse_unsigned(text: &str, target: &'static str) -> Result<u128, CoercionError> {
    let (negative, radix, digits) = split_int_literal(text);
    if digits.starts_with(['+', '-']) {
        return Err(CoercionError::new(text, target, "misplaced sign"));
    }
    let magnitude =
        u128::from_str_radix(digits, radix).map_err(|err| CoercionError::new(text, target, err))?;
    if negative && magnitude != 0 {
        return Err(CoercionError::new(text, target, "value must not be negative"));
    }
    Ok(magnitude)
}

macro_rules! int_params {
    ($parse:ident => $($ty:ident),+) => {$(
        impl Param for $ty {
            fn set_from_text(&mut self, text: &str) -> Result<(), CoercionError> {
                let wide = $parse(text, stringify!($ty))?;
                *self = $ty::try_from(wide)
                    .map_err(|_| CoercionError::new(text, stringify!($ty), "value out of range"))?;
                Ok(())
            }

            fn shape() -> Shape {
                Shape::Scalar(stringify!($ty))
            }
        }
    )+};
}

int_params!(parse_signed => i8, i16, i32, i64, i128, isize);
int_params!(parse_unsigned => u8, u16, u32, u64, u128, usize);

macro_rules! float_params {
    ($($ty:ident),+) => {$(
        impl Param for $ty {
            fn set_from_text(&mut self, text: &str) -> Result<(), CoercionError> {
                *self = text
                    .parse()
                    .map_err(|err| CoercionError::new(text, stringify!($ty), err))?;
                Ok(())
            }

            fn shape() -> Shape {
                Shape::Scalar(stringify!($ty))
            }
        }
    )+};
}

float_params!(f32, f64);

/// `--name` alone stores `Some(T::default())`; `--name=value` stores the parsed value.
impl<T: Param + Default> Param for Option<T> {
    fn set_from_text(&mut self, text: &str) -> Result<(), CoercionError> {
        let mut value = T::default();
        if !text.is_empty() {
            value.set_from_text(text)?;
        }
        *self = Some(value);
        Ok(())
    }

    fn shape() -> Shape {
        Shape::Optional(Box::new(T::shape()))
    }
}

impl<T: Param + Default> Param for Vec<T> {
    fn set_from_text(&mut self, text: &str) -> Result<(), CoercionError> {
        let mut value = T::default();
        value.set_from_text(text)?;
        self.push(value);
        Ok(())
    }

    fn shape() -> Shape {
        Shape::Repeatable(Box::new(T::shape()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set<T: Param + Default>(text: &str) -> Result<T, CoercionError> {
        let mut value = T::default();
        value.set_from_text(text)?;
        Ok(value)
    }

    #[test]
    fn classifies_builtin_shapes() {
        assert_eq!(classify::<bool>(), Ok(Arity::Boolean));
        assert_eq!(classify::<String>(), Ok(Arity::Required));
        assert_eq!(classify::<u8>(), Ok(Arity::Required));
        assert_eq!(classify::<Option<String>>(), Ok(Arity::Optional));
        assert_eq!(classify::<Vec<i64>>(), Ok(Arity::Repeatable));
    }

    #[test]
    fn rejects_unbindable_nestings() {
        let cases = vec![
            classify::<Option<bool>>(),
            classify::<Option<Option<String>>>(),
            classify::<Option<Vec<String>>>(),
            classify::<Vec<bool>>(),
            classify::<Vec<Option<String>>>(),
            classify::<Vec<Vec<String>>>(),
        ];
        for case in cases {
            match case {
                Err(err) => {
                    assert!(err.to_string().starts_with("unsupported parameter type"), "{err}")
                }
                Ok(arity) => panic!("expected unsupported type, got: {arity:?}"),
            }
        }
    }

    #[test]
    fn arity_value_rules() {
        assert!(!Arity::Boolean.may_take_value());
        assert!(Arity::Optional.may_take_value());
        assert!(!Arity::Optional.must_take_value());
        assert!(Arity::Required.must_take_value());
        assert!(Arity::Repeatable.must_take_value());
    }

    #[test]
    fn integers_accept_base_prefixes() {
        let cases: Vec<(&str, i64)> = vec![
            ("42", 42),
            ("-42", -42),
            ("+7", 7),
            ("0x1f", 31),
            ("-0x10", -16),
            ("0o17", 15),
            ("0b101", 5),
            ("010", 10),
        ];
        for (text, expected) in cases {
            assert_eq!(set::<i64>(text), Ok(expected), "parsing {text}");
        }
    }

    #[test]
    fn integers_report_coercion_errors() {
        let err = set::<i32>("abc").unwrap_err();
        assert_eq!(err.literal, "abc");
        assert_eq!(err.target, "i32");
        assert_eq!(
            err.to_string(),
            "invalid value \"abc\" for i32: invalid digit found in string"
        );

        assert!(set::<u8>("256").is_err());
        assert!(set::<u8>("-1").is_err());
        assert!(set::<i8>("0x-5").is_err());
        assert!(set::<i16>("").is_err());
        assert_eq!(set::<u8>("-0"), Ok(0));
        assert_eq!(set::<i8>("-128"), Ok(-128));
    }

    #[test]
    fn widest_integers_reach_their_bounds() {
        assert_eq!(
            set::<i128>("-170141183460469231731687303715884105728"),
            Ok(i128::MIN)
        );
        assert_eq!(set::<i128>(&i128::MAX.to_string()), Ok(i128::MAX));
        assert_eq!(set::<i128>("-0x80000000000000000000000000000000"), Ok(i128::MIN));
        assert_eq!(set::<u128>(&u128::MAX.to_string()), Ok(u128::MAX));

        let err = set::<i128>("170141183460469231731687303715884105728").unwrap_err();
        assert_eq!(err.reason, "value out of range");
        assert!(set::<i128>("-170141183460469231731687303715884105729").is_err());
    }

    #[test]
    fn floats_and_strings() {
        assert_eq!(set::<f64>("2.5"), Ok(2.5));
        assert!(set::<f32>("two").is_err());
        assert_eq!(set::<String>("hello"), Ok("hello".to_string()));
        assert_eq!(set::<PathBuf>("/tmp/x"), Ok(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn boolean_ignores_text() {
        assert_eq!(set::<bool>(""), Ok(true));
        assert_eq!(set::<bool>("false"), Ok(true));
    }

    #[test]
    fn optional_defaults_on_empty_text() {
        assert_eq!(set::<Option<String>>(""), Ok(Some(String::new())));
        assert_eq!(set::<Option<i32>>(""), Ok(Some(0)));
        assert_eq!(set::<Option<i32>>("9"), Ok(Some(9)));
        assert!(set::<Option<i32>>("nine").is_err());
    }

    #[test]
    fn repeatable_appends() {
        let mut values: Vec<u16> = vec![1];
        values.set_from_text("2").unwrap();
        values.set_from_text("0x3").unwrap();
        assert_eq!(values, vec![1, 2, 3]);
        assert!(values.set_from_text("x").is_err());
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn custom_types_default_to_their_own_name() {
        #[derive(Default)]
        struct Level(u8);

        impl Param for Level {
            fn set_from_text(&mut self, text: &str) -> Result<(), CoercionError> {
                self.0 = match text {
                    "low" => 1,
                    "high" => 2,
                    _ => return Err(CoercionError::new(text, "Level", "expected low or high")),
                };
                Ok(())
            }
        }

        assert_eq!(Level::shape(), Shape::Scalar("Level"));
        assert_eq!(<Vec<Level>>::shape().value_name(), "Level");
        assert_eq!(set::<Level>("high").map(|l| l.0), Ok(2));
        assert!(set::<Level>("medium").is_err());
    }
}

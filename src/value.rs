//! Conversion between typed command values and the text typed into the console.
//!
//! Every parameter of a command and every variable carries a [`ParamKind`]. The
//! engine coerces raw tokens with [`coerce`] and renders values back through
//! [`Value`]'s `Display` impl. Nothing here touches the catalog.

use crate::error::CoercionError;
use std::any::type_name;
use std::fmt;
use std::str::FromStr;

/// A three component float vector, typed as `x,y,z` on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl FromStr for Vec3 {
    type Err = CoercionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || CoercionError::new("vector3", s);
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(trimmed);

        let parts: Vec<&str> = inner.split(',').collect();
        if parts.len() != 3 {
            return Err(err());
        }
        let mut xyz = [0f32; 3];
        for (slot, part) in xyz.iter_mut().zip(&parts) {
            *slot = part.trim().parse().map_err(|_| err())?;
        }
        Ok(Vec3::new(xyz[0], xyz[1], xyz[2]))
    }
}

/// Generic fallback kind for any `FromStr + Display` type.
///
/// `parse` validates the text and returns its canonical rendering, which is what
/// ends up inside [`Value::Other`].
#[derive(Clone, Copy)]
pub struct OtherKind {
    pub type_name: &'static str,
    parse: fn(&str) -> Option<String>,
}

impl OtherKind {
    pub fn of<T: FromStr + fmt::Display>() -> Self {
        Self {
            type_name: short_type_name::<T>(),
            parse: parse_canonical::<T>,
        }
    }
}

impl fmt::Debug for OtherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OtherKind").field(&self.type_name).finish()
    }
}

impl PartialEq for OtherKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

fn parse_canonical<T: FromStr + fmt::Display>(text: &str) -> Option<String> {
    text.trim().parse::<T>().ok().map(|v| v.to_string())
}

fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Semantic kind of a command parameter or variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    String,
    Integer,
    Float,
    Boolean,
    Vector3,
    Other(OtherKind),
}

impl ParamKind {
    pub fn name(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Float => "float",
            ParamKind::Boolean => "boolean",
            ParamKind::Vector3 => "vector3",
            ParamKind::Other(other) => other.type_name,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A coerced value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Vec3(Vec3),
    Other {
        type_name: &'static str,
        text: String,
    },
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Vec3(v) => write!(f, "{}", v),
            Value::Other { text, .. } => f.write_str(text),
        }
    }
}

/// Convert `text` to a value of the given kind.
pub fn coerce(text: &str, kind: ParamKind) -> Result<Value, CoercionError> {
    let err = || CoercionError::new(kind.name(), text);
    match kind {
        ParamKind::String => Ok(Value::Str(text.to_string())),
        ParamKind::Integer => text.trim().parse().map(Value::Int).map_err(|_| err()),
        ParamKind::Float => text.trim().parse().map(Value::Float).map_err(|_| err()),
        ParamKind::Boolean => parse_bool(text).map(Value::Bool).ok_or_else(err),
        ParamKind::Vector3 => text.parse().map(Value::Vec3),
        ParamKind::Other(other) => (other.parse)(text)
            .map(|canonical| Value::Other {
                type_name: other.type_name,
                text: canonical,
            })
            .ok_or_else(err),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    let t = text.trim();
    if t == "1" || t.eq_ignore_ascii_case("true") {
        Some(true)
    } else if t == "0" || t.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Rust types that can travel through the console as a [`Value`].
///
/// `from_value` may narrow (an `i64` into an `i32`, say); when it cannot, the
/// adapter reports a [`CoercionError`] built from the value's text.
pub trait ConsoleValue: Sized + Send + 'static {
    fn kind() -> ParamKind;
    fn from_value(value: &Value) -> Option<Self>;
    fn to_value(&self) -> Value;

    fn from_value_checked(value: &Value) -> Result<Self, CoercionError> {
        Self::from_value(value)
            .ok_or_else(|| CoercionError::new(short_type_name::<Self>(), value.to_string()))
    }
}

impl ConsoleValue for String {
    fn kind() -> ParamKind {
        ParamKind::String
    }
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }
}

macro_rules! impl_integer_value {
    ($($ty:ty),*) => {
        $(
            impl ConsoleValue for $ty {
                fn kind() -> ParamKind {
                    ParamKind::Integer
                }
                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(*i).ok(),
                        _ => None,
                    }
                }
                fn to_value(&self) -> Value {
                    // u64/usize above i64::MAX saturate rather than wrap.
                    Value::Int(i64::try_from(*self).unwrap_or(i64::MAX))
                }
            }
        )*
    };
}

impl_integer_value!(i32, i64, u32, u64, usize);

impl ConsoleValue for f64 {
    fn kind() -> ParamKind {
        ParamKind::Float
    }
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl ConsoleValue for f32 {
    fn kind() -> ParamKind {
        ParamKind::Float
    }
    fn from_value(value: &Value) -> Option<Self> {
        f64::from_value(value).and_then(|x| {
            let narrowed = x as f32;
            // A finite value that only overflows in f32 does not fit.
            (narrowed.is_finite() || !x.is_finite()).then_some(narrowed)
        })
    }
    fn to_value(&self) -> Value {
        // Go through the shortest f32 text so 0.1f32 reads back as 0.1.
        let widened = f64::from(*self);
        Value::Float(self.to_string().parse().unwrap_or(widened))
    }
}

impl ConsoleValue for bool {
    fn kind() -> ParamKind {
        ParamKind::Boolean
    }
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ConsoleValue for Vec3 {
    fn kind() -> ParamKind {
        ParamKind::Vector3
    }
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Vec3(v) => Some(*v),
            _ => None,
        }
    }
    fn to_value(&self) -> Value {
        Value::Vec3(*self)
    }
}

/// Wrapper that lets any `FromStr + Display` type be a parameter or variable.
///
/// ```
/// use dev_console::value::{coerce, ConsoleValue, Parsed};
/// let kind = Parsed::<char>::kind();
/// assert_eq!(coerce("x", kind).unwrap().to_string(), "x");
/// assert!(coerce("xy", kind).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T>(pub T);

impl<T> ConsoleValue for Parsed<T>
where
    T: FromStr + fmt::Display + Send + 'static,
{
    fn kind() -> ParamKind {
        ParamKind::Other(OtherKind::of::<T>())
    }
    fn from_value(value: &Value) -> Option<Self> {
        value.to_string().trim().parse().ok().map(Parsed)
    }
    fn to_value(&self) -> Value {
        Value::Other {
            type_name: short_type_name::<T>(),
            text: self.0.to_string(),
        }
    }
}

//! Typed setting values
//!
//! A [`Value`] pairs a declared [`ValueKind`] with a raw [`Scalar`] payload.
//! Construction and reassignment coerce the raw input to the declared kind;
//! text-like kinds defer template interpolation until they are resolved
//! against an enclosing scope.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::template::{self, Fields};
use crate::{Error, Result};

/// A raw or resolved setting payload.
///
/// Deserializes from any scalar in TOML, JSON or YAML documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Short type label used in error messages and flag tables.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Boolean(_) => "boolean",
            Scalar::Integer(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::Text(_) => "text",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float(f) => Some(*f),
            Scalar::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Boolean(b) => write!(f, "{b}"),
            Scalar::Integer(i) => write!(f, "{i}"),
            // Whole floats keep their decimal point: 2.0, not 2
            Scalar::Float(x) => write!(f, "{x:?}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Boolean(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Integer(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

/// Direction a path template may be used in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    pub fn can_read(&self) -> bool {
        matches!(self, AccessMode::Read | AccessMode::ReadWrite)
    }

    pub fn can_write(&self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::ReadWrite)
    }
}

impl FromStr for AccessMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "r" | "read" => Ok(AccessMode::Read),
            "w" | "write" => Ok(AccessMode::Write),
            "rw" | "read-write" => Ok(AccessMode::ReadWrite),
            _ => Err(Error::type_mismatch("access mode (r, w, rw)", s)),
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Read => write!(f, "r"),
            AccessMode::Write => write!(f, "w"),
            AccessMode::ReadWrite => write!(f, "rw"),
        }
    }
}

/// The declared kind of a [`Value`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Integer,
    Float,
    Boolean,
    /// Free text, interpolated against the enclosing scope when read
    Text,
    /// Text restricted to a fixed set of choices
    Category { choices: Vec<String> },
    /// A file path template, interpolated when read
    PathTemplate { mode: AccessMode },
}

impl ValueKind {
    /// Category kind from any list of choices.
    pub fn category<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValueKind::Category {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Boolean => "boolean",
            ValueKind::Text => "text",
            ValueKind::Category { .. } => "category",
            ValueKind::PathTemplate { .. } => "path",
        }
    }

    /// Whether resolving this kind interpolates a template.
    pub fn interpolates(&self) -> bool {
        matches!(self, ValueKind::Text | ValueKind::PathTemplate { .. })
    }

    /// Infer the kind a bare scalar declares.
    pub fn of(raw: &Scalar) -> Self {
        match raw {
            Scalar::Boolean(_) => ValueKind::Boolean,
            Scalar::Integer(_) => ValueKind::Integer,
            Scalar::Float(_) => ValueKind::Float,
            Scalar::Text(_) => ValueKind::Text,
        }
    }

    /// Coerce raw input to this kind.
    pub fn coerce(&self, raw: Scalar) -> Result<Scalar> {
        match self {
            ValueKind::Integer => coerce_integer(raw),
            ValueKind::Float => coerce_float(raw),
            ValueKind::Boolean => coerce_boolean(raw),
            ValueKind::Text | ValueKind::PathTemplate { .. } => Ok(Scalar::Text(raw.to_string())),
            ValueKind::Category { choices } => {
                let text = raw.to_string();
                if choices.iter().any(|c| c == &text) {
                    Ok(Scalar::Text(text))
                } else {
                    Err(Error::type_mismatch(
                        format!("one of [{}]", choices.join(", ")),
                        text,
                    ))
                }
            }
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Category { choices } => write!(f, "category [{}]", choices.join(", ")),
            ValueKind::PathTemplate { mode } => write!(f, "path ({mode})"),
            other => f.write_str(other.name()),
        }
    }
}

fn coerce_integer(raw: Scalar) -> Result<Scalar> {
    match raw {
        Scalar::Integer(i) => Ok(Scalar::Integer(i)),
        Scalar::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Ok(Scalar::Integer(f as i64))
        }
        Scalar::Text(ref s) => s
            .trim()
            .parse::<i64>()
            .map(Scalar::Integer)
            .map_err(|_| Error::type_mismatch("integer", s.as_str())),
        other => Err(Error::type_mismatch("integer", other.to_string())),
    }
}

fn coerce_float(raw: Scalar) -> Result<Scalar> {
    match raw {
        Scalar::Float(f) => Ok(Scalar::Float(f)),
        Scalar::Integer(i) => Ok(Scalar::Float(i as f64)),
        Scalar::Text(ref s) => s
            .trim()
            .parse::<f64>()
            .map(Scalar::Float)
            .map_err(|_| Error::type_mismatch("float", s.as_str())),
        other => Err(Error::type_mismatch("float", other.to_string())),
    }
}

fn coerce_boolean(raw: Scalar) -> Result<Scalar> {
    match raw {
        Scalar::Boolean(b) => Ok(Scalar::Boolean(b)),
        Scalar::Integer(0) => Ok(Scalar::Boolean(false)),
        Scalar::Integer(1) => Ok(Scalar::Boolean(true)),
        Scalar::Text(ref s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Scalar::Boolean(true)),
            "false" | "no" | "off" | "0" => Ok(Scalar::Boolean(false)),
            _ => Err(Error::type_mismatch("boolean", s.as_str())),
        },
        other => Err(Error::type_mismatch("boolean", other.to_string())),
    }
}

/// A typed, named setting.
///
/// # Example
///
/// ```
/// use scope_core::{Scalar, Value};
///
/// let draws = Value::integer("1000").unwrap();
/// assert_eq!(draws.raw(), Some(&Scalar::Integer(1000)));
/// assert!(Value::integer("many").is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    kind: ValueKind,
    raw: Option<Scalar>,
    tracked: bool,
}

impl Value {
    /// Build a value of `kind`, coercing `raw`.
    pub fn new(kind: ValueKind, raw: impl Into<Scalar>) -> Result<Self> {
        let raw = kind.coerce(raw.into())?;
        Ok(Self {
            kind,
            raw: Some(raw),
            tracked: true,
        })
    }

    /// A declared value with no payload yet.
    pub fn unset(kind: ValueKind) -> Self {
        Self {
            kind,
            raw: None,
            tracked: true,
        }
    }

    pub fn integer(raw: impl Into<Scalar>) -> Result<Self> {
        Self::new(ValueKind::Integer, raw)
    }

    pub fn float(raw: impl Into<Scalar>) -> Result<Self> {
        Self::new(ValueKind::Float, raw)
    }

    pub fn boolean(raw: impl Into<Scalar>) -> Result<Self> {
        Self::new(ValueKind::Boolean, raw)
    }

    pub fn text(raw: impl Into<Scalar>) -> Result<Self> {
        Self::new(ValueKind::Text, raw)
    }

    pub fn category<I, S>(raw: impl Into<Scalar>, choices: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ValueKind::category(choices), raw)
    }

    pub fn path_template(raw: impl Into<Scalar>, mode: AccessMode) -> Result<Self> {
        Self::new(ValueKind::PathTemplate { mode }, raw)
    }

    /// Mark this value as not a candidate for external exposure.
    pub fn untracked(mut self) -> Self {
        self.tracked = false;
        self
    }

    pub fn with_tracked(mut self, tracked: bool) -> Self {
        self.tracked = tracked;
        self
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    /// The stored payload, before interpolation.
    pub fn raw(&self) -> Option<&Scalar> {
        self.raw.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.raw.is_some()
    }

    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    /// Re-coerce and replace the payload in place.
    ///
    /// On failure the previous payload is kept.
    pub fn reassign(&mut self, raw: impl Into<Scalar>) -> Result<()> {
        self.raw = Some(self.kind.coerce(raw.into())?);
        Ok(())
    }

    /// Produce the concrete value, interpolating text-like kinds against
    /// `fields`.
    ///
    /// Returns `None` for an unset value.
    pub fn resolve(&self, fields: &dyn Fields) -> Result<Option<Scalar>> {
        self.resolve_at(fields, 0)
    }

    pub(crate) fn resolve_at(&self, fields: &dyn Fields, depth: usize) -> Result<Option<Scalar>> {
        match (&self.kind, &self.raw) {
            (_, None) => Ok(None),
            (kind, Some(Scalar::Text(template))) if kind.interpolates() => {
                template::render_at(template, fields, depth).map(|s| Some(Scalar::Text(s)))
            }
            (_, Some(raw)) => Ok(Some(raw.clone())),
        }
    }
}

impl From<Scalar> for Value {
    fn from(raw: Scalar) -> Self {
        Self {
            kind: ValueKind::of(&raw),
            raw: Some(raw),
            tracked: true,
        }
    }
}

macro_rules! value_from_literal {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(raw: $ty) -> Self {
                    Value::from(Scalar::from(raw))
                }
            }
        )*
    };
}

value_from_literal!(bool, i32, i64, f64, &str, String);

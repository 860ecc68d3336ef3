//! Capability-checked access to the viewer's scene graph.
//!
//! The viewer exposes the same logical property through different shapes
//! depending on its build: a direct field, a uniform `get(name)` accessor, or
//! nothing at all. Every accessor here returns an `Option` instead of failing
//! so that callers can compose fallbacks in a fixed order.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

pub type HostRef = Arc<dyn HostObject>;

/// A value read from the scene graph.
#[derive(Clone)]
pub enum HostValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<HostValue>),
    Object(HostRef),
}

/// Result of invoking a method on a host object.
#[derive(Clone, Debug)]
pub enum CallOutcome {
    /// The object has no such method.
    Missing,
    /// The method exists but raised.
    Threw(String),
    Returned(HostValue),
}

/// One opaque object of the host scene graph.
pub trait HostObject: Send + Sync {
    /// Direct field read. `None` when the field is absent.
    fn field(&self, name: &str) -> Option<HostValue>;

    /// Names of the directly readable fields, in a stable order.
    fn keys(&self) -> Vec<String>;

    fn call(&self, method: &str, args: &[HostValue]) -> CallOutcome;
}

impl HostValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HostRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[HostValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Loose truthiness as the host scripting layer would see it.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            Self::List(_) | Self::Object(_) => true,
        }
    }

    /// Scalar rendered as text. Strings are returned trimmed; lists and
    /// objects have no text form.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s.trim().to_string()),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Objects contained in a list value; non-object entries are skipped.
    pub fn objects(&self) -> Vec<HostRef> {
        self.as_list()
            .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
            .unwrap_or_default()
    }

    /// Strings from a list value, or a comma separated string split apart.
    pub fn string_list(&self) -> Vec<String> {
        match self {
            Self::List(items) => items
                .iter()
                .filter_map(HostValue::to_text)
                .filter(|s| !s.is_empty())
                .collect(),
            Self::Str(s) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<usize> for HostValue {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Number(n) => write!(f, "Number({n})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::List(items) => f.debug_list().entries(items).finish(),
            Self::Object(obj) => write!(f, "Object(keys={:?})", obj.keys()),
        }
    }
}

/// Non-null direct field.
pub fn try_field(obj: &dyn HostObject, name: &str) -> Option<HostValue> {
    obj.field(name).filter(|v| !v.is_null())
}

/// Non-null return value of `method`. Missing methods and throws both
/// collapse to `None`.
pub fn try_call(obj: &dyn HostObject, method: &str, args: &[HostValue]) -> Option<HostValue> {
    match obj.call(method, args) {
        CallOutcome::Returned(value) if !value.is_null() => Some(value),
        CallOutcome::Returned(_) | CallOutcome::Missing => None,
        CallOutcome::Threw(message) => {
            debug!(method, %message, "host call threw");
            None
        }
    }
}

/// Logical property: the direct field first, then the `get(name)` accessor.
pub fn property(obj: &dyn HostObject, name: &str) -> Option<HostValue> {
    try_field(obj, name).or_else(|| try_call(obj, "get", &[HostValue::from(name)]))
}

/// Logical property read as trimmed, non-empty text.
pub fn text_property(obj: &dyn HostObject, name: &str) -> Option<String> {
    property(obj, name)
        .and_then(|v| v.to_text())
        .filter(|s| !s.is_empty())
}

/// Metadata container of an object: the `data` field, else `get("data")`.
pub fn data_container(obj: &dyn HostObject) -> Option<HostRef> {
    try_field(obj, "data")
        .or_else(|| try_call(obj, "get", &[HostValue::from("data")]))
        .and_then(|v| v.as_object().cloned())
}

/// Stable identity of an object: its `id` property rendered as text.
pub fn identity(obj: &dyn HostObject) -> Option<String> {
    text_property(obj, "id")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Accessor;

    impl HostObject for Accessor {
        fn field(&self, _name: &str) -> Option<HostValue> {
            None
        }
        fn keys(&self) -> Vec<String> {
            Vec::new()
        }
        fn call(&self, method: &str, args: &[HostValue]) -> CallOutcome {
            match (method, args.first().and_then(HostValue::as_str)) {
                ("get", Some("label")) => CallOutcome::Returned(HostValue::from("  Lobby ")),
                ("get", Some("id")) => CallOutcome::Returned(HostValue::Number(7.0)),
                ("get", _) => CallOutcome::Threw("unknown property".into()),
                _ => CallOutcome::Missing,
            }
        }
    }

    #[test]
    fn property_falls_back_to_accessor() {
        assert_eq!(text_property(&Accessor, "label").as_deref(), Some("Lobby"));
        assert_eq!(identity(&Accessor).as_deref(), Some("7"));
        assert!(property(&Accessor, "data").is_none());
    }

    #[test]
    fn string_list_splits_comma_joined_text() {
        let value = HostValue::from("a, b,,c");
        assert_eq!(value.string_list(), vec!["a", "b", "c"]);
    }
}

//! AnyValue - the tagged value exchanged by reflective calls
//!
//! Replaces the opaque "any" box of generated bindings with a closed set of
//! variants, so every value crossing the boundary carries its kind.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::handle::NativeHandle;

/// Data type of a feature or value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Boolean
    Bool,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// 64-bit float
    Double,
    /// UTF-8 string
    String,
    /// Single reference to another native object
    Object,
    /// Native sequence of object references
    List,
}

impl ValueKind {
    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Object => "object",
            ValueKind::List => "list",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value read from or written to a reflective feature.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AnyValue {
    /// No value (also an unset single reference)
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 64-bit float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Reference to a native object (borrowed, never owned by the value)
    Object(NativeHandle),
    /// Handle of a native sequence backing a many-valued feature
    List(NativeHandle),
}

impl AnyValue {
    /// Kind of this value, `None` for [`AnyValue::Null`]
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            AnyValue::Null => None,
            AnyValue::Bool(_) => Some(ValueKind::Bool),
            AnyValue::Int(_) => Some(ValueKind::Int),
            AnyValue::Long(_) => Some(ValueKind::Long),
            AnyValue::Double(_) => Some(ValueKind::Double),
            AnyValue::String(_) => Some(ValueKind::String),
            AnyValue::Object(_) => Some(ValueKind::Object),
            AnyValue::List(_) => Some(ValueKind::List),
        }
    }

    /// Name of the value's type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        self.kind().map(ValueKind::name).unwrap_or("null")
    }

    /// Default value of an unset feature of the given kind
    pub fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => AnyValue::Bool(false),
            ValueKind::Int => AnyValue::Int(0),
            ValueKind::Long => AnyValue::Long(0),
            ValueKind::Double => AnyValue::Double(0.0),
            ValueKind::String => AnyValue::String(String::new()),
            ValueKind::Object | ValueKind::List => AnyValue::Null,
        }
    }

    /// True if this value may be stored in a feature of the given kind.
    ///
    /// `Null` fits reference kinds only.
    pub fn fits(&self, kind: ValueKind) -> bool {
        match self.kind() {
            Some(k) => k == kind,
            None => matches!(kind, ValueKind::Object),
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, AnyValue::Null)
    }

    /// Handle carried by an object or list value
    pub fn as_handle(&self) -> Option<NativeHandle> {
        match self {
            AnyValue::Object(h) | AnyValue::List(h) => Some(*h),
            _ => None,
        }
    }

    /// Get as string slice if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyValue::Null => write!(f, "null"),
            AnyValue::Bool(b) => write!(f, "{}", b),
            AnyValue::Int(i) => write!(f, "{}", i),
            AnyValue::Long(l) => write!(f, "{}", l),
            AnyValue::Double(d) => write!(f, "{}", d),
            AnyValue::String(s) => write!(f, "{:?}", s),
            AnyValue::Object(h) => write!(f, "object@{}", h),
            AnyValue::List(h) => write!(f, "list@{}", h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(AnyValue::Null.kind(), None);
        assert_eq!(AnyValue::Int(1).kind(), Some(ValueKind::Int));
        assert_eq!(AnyValue::String("a".into()).type_name(), "string");
        assert_eq!(AnyValue::Null.type_name(), "null");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(AnyValue::default_for(ValueKind::Bool), AnyValue::Bool(false));
        assert_eq!(AnyValue::default_for(ValueKind::Int), AnyValue::Int(0));
        assert_eq!(
            AnyValue::default_for(ValueKind::String),
            AnyValue::String(String::new())
        );
        assert_eq!(AnyValue::default_for(ValueKind::Object), AnyValue::Null);
    }

    #[test]
    fn test_fits() {
        assert!(AnyValue::Int(3).fits(ValueKind::Int));
        assert!(!AnyValue::Int(3).fits(ValueKind::Long));
        assert!(AnyValue::Null.fits(ValueKind::Object));
        assert!(!AnyValue::Null.fits(ValueKind::String));
        assert!(AnyValue::Object(NativeHandle::from_raw(1)).fits(ValueKind::Object));
    }
}

//! Traits for boxing Rust values into `AnyValue` and unboxing them again.
//!
//! Typed accessors use these so that a named getter/setter and the generic
//! `e_get`/`e_set` pair always agree on the representation of a feature.

use crate::error::{BridgeError, BridgeResult};
use crate::handle::NativeHandle;
use crate::value::AnyValue;

/// Convert from `AnyValue` to a Rust type.
pub trait FromAny: Sized {
    /// Convert, returning an error if the kind doesn't match.
    fn from_any(value: AnyValue) -> BridgeResult<Self>;
}

/// Convert from a Rust type to `AnyValue`.
pub trait IntoAny {
    /// Box into an `AnyValue`.
    fn into_any(self) -> AnyValue;
}

impl FromAny for AnyValue {
    fn from_any(value: AnyValue) -> BridgeResult<Self> {
        Ok(value)
    }
}

impl IntoAny for AnyValue {
    fn into_any(self) -> AnyValue {
        self
    }
}

macro_rules! impl_scalar {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl FromAny for $ty {
            fn from_any(value: AnyValue) -> BridgeResult<Self> {
                match value {
                    AnyValue::$variant(v) => Ok(v),
                    other => Err(BridgeError::type_mismatch($name, other.type_name())),
                }
            }
        }

        impl IntoAny for $ty {
            fn into_any(self) -> AnyValue {
                AnyValue::$variant(self)
            }
        }
    };
}

impl_scalar!(bool, Bool, "bool");
impl_scalar!(i32, Int, "int");
impl_scalar!(i64, Long, "long");
impl_scalar!(f64, Double, "double");
impl_scalar!(String, String, "string");

impl IntoAny for &str {
    fn into_any(self) -> AnyValue {
        AnyValue::String(self.to_string())
    }
}

// Single references: `None` maps to `Null`
impl FromAny for Option<NativeHandle> {
    fn from_any(value: AnyValue) -> BridgeResult<Self> {
        match value {
            AnyValue::Null => Ok(None),
            AnyValue::Object(h) => Ok(h.non_null()),
            other => Err(BridgeError::type_mismatch("object", other.type_name())),
        }
    }
}

impl IntoAny for Option<NativeHandle> {
    fn into_any(self) -> AnyValue {
        match self.and_then(NativeHandle::non_null) {
            Some(h) => AnyValue::Object(h),
            None => AnyValue::Null,
        }
    }
}

impl IntoAny for NativeHandle {
    fn into_any(self) -> AnyValue {
        Some(self).into_any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_any_scalars() {
        assert_eq!(i32::from_any(AnyValue::Int(42)).unwrap(), 42);
        assert!(bool::from_any(AnyValue::Bool(true)).unwrap());
        assert_eq!(
            String::from_any(AnyValue::String("x".into())).unwrap(),
            "x".to_string()
        );
    }

    #[test]
    fn test_from_any_mismatch() {
        let err = i64::from_any(AnyValue::Int(1)).unwrap_err();
        assert_eq!(
            err,
            BridgeError::TypeMismatch {
                expected: "long".into(),
                got: "int".into()
            }
        );
    }

    #[test]
    fn test_references() {
        let h = NativeHandle::from_raw(9);
        assert_eq!(h.into_any(), AnyValue::Object(h));
        assert_eq!(NativeHandle::NULL.into_any(), AnyValue::Null);
        assert_eq!(Option::<NativeHandle>::from_any(AnyValue::Null).unwrap(), None);
        assert_eq!(
            Option::<NativeHandle>::from_any(AnyValue::Object(h)).unwrap(),
            Some(h)
        );
    }
}

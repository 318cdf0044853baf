//! Error types for the proxy boundary

use crate::handle::NativeHandle;

/// Result type for boundary calls
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised by proxies and boundary implementations.
///
/// Precondition violations that the native side would treat as fatal
/// (null handles, bad indices, bad feature ids) are turned into these
/// variants before any call crosses the boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// A null handle was about to be dereferenced
    #[error("Null handle")]
    NullHandle,

    /// The proxy already released its handle
    #[error("Proxy has been released")]
    Released,

    /// The handle refers to an object that no longer exists
    #[error("Stale handle {0}: object was destroyed")]
    StaleHandle(NativeHandle),

    /// Sequence index outside `[0, len)` (or `[0, len]` for inserts)
    #[error("Index {index} out of range for sequence of length {len}")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Current sequence length
        len: usize,
    },

    /// Feature id not declared by the object's class
    #[error("Feature id {feature} out of range for class '{class}' ({count} features)")]
    FeatureOutOfRange {
        /// Class name
        class: String,
        /// Requested feature id
        feature: u32,
        /// Number of features declared by the class
        count: u32,
    },

    /// Feature name not declared by the object's class
    #[error("Feature '{feature}' not found in class '{class}'")]
    UnknownFeature {
        /// Class name
        class: String,
        /// Requested feature name
        feature: String,
    },

    /// Class not registered in the package
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// Attempt to instantiate an abstract class
    #[error("Class '{0}' is abstract")]
    AbstractClass(String),

    /// Value kind did not match what the feature or conversion expects
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// Object class is not compatible with the expected class
    #[error("Class mismatch: expected {expected}, got {got}")]
    ClassMismatch {
        /// Expected class name
        expected: String,
        /// Actual class name
        got: String,
    },

    /// Handle does not refer to a native sequence
    #[error("Handle {0} is not a list")]
    NotAList(NativeHandle),

    /// The native heap refused a new allocation
    #[error("Native heap exhausted ({limit} objects)")]
    HeapExhausted {
        /// Configured object limit
        limit: usize,
    },

    /// Failure reported by the native side
    #[error("Native call failed ({code}): {message}")]
    Native {
        /// Native status code
        code: i32,
        /// Description of the failure
        message: String,
    },

    /// Invalid schema definition
    #[error("Invalid schema: {0}")]
    Schema(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Failed to read a configuration or schema file
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for BridgeError {
    fn from(e: std::io::Error) -> Self {
        BridgeError::Io(e.to_string())
    }
}

impl BridgeError {
    /// Shorthand for a value-kind mismatch
    pub fn type_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        BridgeError::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// True for errors caused by using a handle whose object is gone
    pub fn is_dangling(&self) -> bool {
        matches!(self, BridgeError::StaleHandle(_) | BridgeError::Released)
    }
}

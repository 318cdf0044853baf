//! Opaque handles to native objects

use std::fmt;

/// Opaque identifier of one object living on the native heap.
///
/// A handle is a plain value: copying it never copies or retains the
/// native object. Two handles are equal iff their ids are equal, and the
/// id `0` means "no object".
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativeHandle(u64);

impl NativeHandle {
    /// The absent handle
    pub const NULL: NativeHandle = NativeHandle(0);

    /// Wrap a raw id obtained from the boundary
    #[inline]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Raw id as passed across the boundary
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// True iff this handle refers to no object
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// `None` for the null handle
    #[inline]
    pub fn non_null(self) -> Option<Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "NativeHandle(null)")
        } else {
            write!(f, "NativeHandle({:#x})", self.0)
        }
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Whether dropping a proxy destroys the native object it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The proxy is the single owner; releasing it destroys the object
    Owned,
    /// The proxy only observes the object
    Borrowed,
}

impl Ownership {
    /// True for [`Ownership::Owned`]
    #[inline]
    pub fn is_owned(self) -> bool {
        matches!(self, Ownership::Owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handle() {
        assert!(NativeHandle::NULL.is_null());
        assert!(NativeHandle::default().is_null());
        assert!(!NativeHandle::from_raw(7).is_null());
        assert_eq!(NativeHandle::NULL.non_null(), None);
    }

    #[test]
    fn test_equality_by_id() {
        assert_eq!(NativeHandle::from_raw(42), NativeHandle::from_raw(42));
        assert_ne!(NativeHandle::from_raw(42), NativeHandle::from_raw(43));
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", NativeHandle::NULL), "NativeHandle(null)");
        assert_eq!(format!("{:?}", NativeHandle::from_raw(255)), "NativeHandle(0xff)");
    }
}

//! NativeBoundary trait - the call surface of the native library
//!
//! Every operation a proxy performs is one of these calls. The native
//! library (or the in-memory [`crate::heap::InMemoryHeap`]) provides the
//! implementation; proxies never look behind it.

use std::sync::Arc;

use crate::error::BridgeResult;
use crate::handle::NativeHandle;
use crate::schema::{ClassId, FeatureId};
use crate::value::AnyValue;

/// Synchronous boundary to the native heap.
///
/// Calls block until the native side returns. Implementations must accept
/// calls from several threads; serializing access to one object is the
/// caller's job. Handles passed in are never null: proxies check before
/// calling.
pub trait NativeBoundary: Send + Sync {
    // ========================================================================
    // Object Lifecycle
    // ========================================================================

    /// Allocate a new object of `class` (`new_X`)
    fn create(&self, class: ClassId) -> BridgeResult<NativeHandle>;

    /// Destroy an object (`delete_X`)
    fn destroy(&self, handle: NativeHandle) -> BridgeResult<()>;

    /// Convert a derived-class handle to its reflective base handle
    /// (`X_SWIGUpcast`)
    fn upcast(&self, handle: NativeHandle) -> BridgeResult<NativeHandle>;

    /// Run the native-side initializer (`X__initialize`)
    fn initialize(&self, handle: NativeHandle) -> BridgeResult<()>;

    /// Copy an object; the caller owns the returned handle
    fn copy(&self, handle: NativeHandle) -> BridgeResult<NativeHandle>;

    // ========================================================================
    // Reflective Access
    // ========================================================================

    /// Dynamic class of an object (`X_eClass`)
    fn class_of(&self, handle: NativeHandle) -> BridgeResult<ClassId>;

    /// Read a feature (`X_eGet`)
    fn e_get(&self, handle: NativeHandle, feature: FeatureId, resolve: bool) -> BridgeResult<AnyValue>;

    /// Write a feature and mark it set (`X_eSet`)
    fn e_set(&self, handle: NativeHandle, feature: FeatureId, value: AnyValue) -> BridgeResult<()>;

    /// Whether a feature was set since its last unset (`X_eIsSet`)
    fn e_is_set(&self, handle: NativeHandle, feature: FeatureId) -> BridgeResult<bool>;

    /// Revert a feature to its default (`X_eUnset`)
    fn e_unset(&self, handle: NativeHandle, feature: FeatureId) -> BridgeResult<()>;

    // ========================================================================
    // Sequence Operations
    // ========================================================================

    /// Allocate a new, empty sequence of `element_class` objects
    fn create_list(&self, element_class: ClassId) -> BridgeResult<NativeHandle>;

    /// Number of elements (`X_size`)
    fn list_size(&self, list: NativeHandle) -> BridgeResult<usize>;

    /// Element handle at `index`, possibly null (`X_at`)
    fn list_at(&self, list: NativeHandle, index: usize) -> BridgeResult<NativeHandle>;

    /// Append a reference to `element` (`X_push_back`)
    fn list_push_back(&self, list: NativeHandle, element: NativeHandle) -> BridgeResult<()>;

    /// Insert a reference at `position` (`X_insert_at`)
    fn list_insert_at(
        &self,
        list: NativeHandle,
        position: usize,
        element: NativeHandle,
    ) -> BridgeResult<()>;

    /// Append every element of `other`, in order (`X_insert_all`)
    fn list_insert_all(&self, list: NativeHandle, other: NativeHandle) -> BridgeResult<()>;

    /// Remove all elements (`X_clear`)
    fn list_clear(&self, list: NativeHandle) -> BridgeResult<()>;
}

macro_rules! forward_boundary {
    ($ty:ty) => {
        impl<B: NativeBoundary + ?Sized> NativeBoundary for $ty {
            fn create(&self, class: ClassId) -> BridgeResult<NativeHandle> {
                (**self).create(class)
            }
            fn destroy(&self, handle: NativeHandle) -> BridgeResult<()> {
                (**self).destroy(handle)
            }
            fn upcast(&self, handle: NativeHandle) -> BridgeResult<NativeHandle> {
                (**self).upcast(handle)
            }
            fn initialize(&self, handle: NativeHandle) -> BridgeResult<()> {
                (**self).initialize(handle)
            }
            fn copy(&self, handle: NativeHandle) -> BridgeResult<NativeHandle> {
                (**self).copy(handle)
            }
            fn class_of(&self, handle: NativeHandle) -> BridgeResult<ClassId> {
                (**self).class_of(handle)
            }
            fn e_get(
                &self,
                handle: NativeHandle,
                feature: FeatureId,
                resolve: bool,
            ) -> BridgeResult<AnyValue> {
                (**self).e_get(handle, feature, resolve)
            }
            fn e_set(
                &self,
                handle: NativeHandle,
                feature: FeatureId,
                value: AnyValue,
            ) -> BridgeResult<()> {
                (**self).e_set(handle, feature, value)
            }
            fn e_is_set(&self, handle: NativeHandle, feature: FeatureId) -> BridgeResult<bool> {
                (**self).e_is_set(handle, feature)
            }
            fn e_unset(&self, handle: NativeHandle, feature: FeatureId) -> BridgeResult<()> {
                (**self).e_unset(handle, feature)
            }
            fn create_list(&self, element_class: ClassId) -> BridgeResult<NativeHandle> {
                (**self).create_list(element_class)
            }
            fn list_size(&self, list: NativeHandle) -> BridgeResult<usize> {
                (**self).list_size(list)
            }
            fn list_at(&self, list: NativeHandle, index: usize) -> BridgeResult<NativeHandle> {
                (**self).list_at(list, index)
            }
            fn list_push_back(&self, list: NativeHandle, element: NativeHandle) -> BridgeResult<()> {
                (**self).list_push_back(list, element)
            }
            fn list_insert_at(
                &self,
                list: NativeHandle,
                position: usize,
                element: NativeHandle,
            ) -> BridgeResult<()> {
                (**self).list_insert_at(list, position, element)
            }
            fn list_insert_all(&self, list: NativeHandle, other: NativeHandle) -> BridgeResult<()> {
                (**self).list_insert_all(list, other)
            }
            fn list_clear(&self, list: NativeHandle) -> BridgeResult<()> {
                (**self).list_clear(list)
            }
        }
    };
}

forward_boundary!(Arc<B>);
forward_boundary!(Box<B>);

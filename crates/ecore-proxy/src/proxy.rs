//! ProxyObject - a handle paired with an ownership flag
//!
//! The single-owner rule is enforced by construction: `ProxyObject` is not
//! `Clone`, owning proxies only come from allocations, copies, or the
//! `unsafe` [`ProxyObject::adopt`], and ownership leaves a proxy only
//! through [`ProxyObject::into_raw`]. Destruction happens at most once:
//! `release` flips the flag and nulls the handle under one lock before
//! calling the boundary.

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::Deref;

use parking_lot::Mutex;

use crate::bridge::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::handle::{NativeHandle, Ownership};

struct ProxyState {
    handle: NativeHandle,
    ownership: Ownership,
    released: bool,
}

/// A local stand-in for one native object.
pub struct ProxyObject<'b> {
    bridge: &'b Bridge,
    state: Mutex<ProxyState>,
}

impl<'b> ProxyObject<'b> {
    fn new(bridge: &'b Bridge, handle: NativeHandle, ownership: Ownership) -> Self {
        Self {
            bridge,
            state: Mutex::new(ProxyState {
                handle,
                ownership,
                released: false,
            }),
        }
    }

    /// Borrowed view of an existing object; never destroys it.
    pub fn borrowed(bridge: &'b Bridge, handle: NativeHandle) -> Self {
        Self::new(bridge, handle, Ownership::Borrowed)
    }

    /// Take ownership of a raw handle.
    ///
    /// # Safety
    /// No other owning proxy for `handle` may exist, and the handle must
    /// have been obtained from this bridge's boundary. Two owners destroy
    /// the object twice.
    pub unsafe fn adopt(bridge: &'b Bridge, handle: NativeHandle) -> Self {
        tracing::debug!(handle = %handle, "proxy: adopted handle");
        Self::new(bridge, handle, Ownership::Owned)
    }

    /// Owning proxy for a handle the boundary just handed over
    pub(crate) fn transferred(bridge: &'b Bridge, handle: NativeHandle) -> Self {
        Self::new(bridge, handle, Ownership::Owned)
    }

    /// The bridge this proxy calls through
    pub fn bridge(&self) -> &'b Bridge {
        self.bridge
    }

    /// Current handle; null once released.
    ///
    /// Must not be used to build a second owning proxy.
    pub fn raw_handle(&self) -> NativeHandle {
        self.state.lock().handle
    }

    /// Handle for a boundary call, or an error if there is none
    pub fn live_handle(&self) -> BridgeResult<NativeHandle> {
        let state = self.state.lock();
        if state.released {
            Err(BridgeError::Released)
        } else if state.handle.is_null() {
            Err(BridgeError::NullHandle)
        } else {
            Ok(state.handle)
        }
    }

    /// Current ownership
    pub fn ownership(&self) -> Ownership {
        self.state.lock().ownership
    }

    /// True while this proxy owns the native object
    pub fn is_owned(&self) -> bool {
        self.ownership().is_owned()
    }

    /// True once `release` or `into_raw` ran
    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    /// Drop the reference to the native object.
    ///
    /// Destroys the object iff this proxy owned it; returns whether a
    /// destroy call was issued. Later calls are no-ops returning `false`.
    pub fn release(&self) -> BridgeResult<bool> {
        let (handle, ownership) = {
            let mut state = self.state.lock();
            state.released = true;
            (
                mem::replace(&mut state.handle, NativeHandle::NULL),
                mem::replace(&mut state.ownership, Ownership::Borrowed),
            )
        };

        if handle.is_null() || !ownership.is_owned() {
            return Ok(false);
        }

        tracing::debug!(handle = %handle, "proxy: releasing owned object");
        self.bridge.call("destroy", handle, |b| b.destroy(handle))?;
        Ok(true)
    }

    /// Give up ownership without destroying; returns the handle.
    ///
    /// The caller becomes responsible for the object (typically by passing
    /// the handle to [`ProxyObject::adopt`] elsewhere).
    pub fn into_raw(self) -> NativeHandle {
        let mut state = self.state.lock();
        state.released = true;
        state.ownership = Ownership::Borrowed;
        mem::replace(&mut state.handle, NativeHandle::NULL)
    }
}

impl Drop for ProxyObject<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(error = %e, "failed to release native object on drop");
        }
    }
}

impl fmt::Debug for ProxyObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ProxyObject")
            .field("handle", &state.handle)
            .field("ownership", &state.ownership)
            .finish()
    }
}

// ============================================================================
// ProxyType
// ============================================================================

/// A typed proxy built on a [`ProxyObject`].
pub trait ProxyType<'b>: Sized {
    /// Class every instance must be (or derive from); `None` accepts any
    fn class_name() -> Option<&'static str>;

    /// Wrap a proxy, checking the object's dynamic class
    fn from_proxy(proxy: ProxyObject<'b>) -> BridgeResult<Self>;

    /// The underlying proxy
    fn proxy(&self) -> &ProxyObject<'b>;
}

// ============================================================================
// Borrowed
// ============================================================================

/// A borrowed proxy that cannot outlive the value it was obtained from.
///
/// Accessors that hand out handles owned by someone else (collection
/// elements, reference features) return this, so the borrow checker
/// rejects use after the source goes away.
pub struct Borrowed<'c, T> {
    inner: T,
    _source: PhantomData<&'c ()>,
}

impl<'c, T> Borrowed<'c, T> {
    pub(crate) fn new(inner: T) -> Self {
        Self {
            inner,
            _source: PhantomData,
        }
    }
}

impl<T> Deref for Borrowed<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: fmt::Debug> fmt::Debug for Borrowed<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Borrowed").field(&self.inner).finish()
    }
}

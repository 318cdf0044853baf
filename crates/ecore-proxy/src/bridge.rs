//! Bridge - the boundary, its class package and configuration
//!
//! Every proxy borrows the bridge it was created from, so no proxy can
//! outlive the boundary it calls through.

use std::sync::Arc;

use crate::boundary::NativeBoundary;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::handle::NativeHandle;
use crate::heap::InMemoryHeap;
use crate::proxy::{ProxyObject, ProxyType};
use crate::reflect::ReflectiveObject;
use crate::schema::Package;

/// Entry point for creating and wrapping proxies.
pub struct Bridge {
    boundary: Box<dyn NativeBoundary>,
    package: Arc<Package>,
    config: BridgeConfig,
}

impl Bridge {
    /// Create a bridge with the default configuration
    pub fn new(boundary: impl NativeBoundary + 'static, package: Arc<Package>) -> Self {
        Self::with_config(boundary, package, BridgeConfig::default())
    }

    /// Create a bridge with explicit configuration
    pub fn with_config(
        boundary: impl NativeBoundary + 'static,
        package: Arc<Package>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            boundary: Box::new(boundary),
            package,
            config,
        }
    }

    /// Bridge over a fresh in-memory heap for `package`.
    ///
    /// The heap is returned as well so callers can inspect its counters.
    pub fn in_memory(package: Arc<Package>, config: BridgeConfig) -> (Self, Arc<InMemoryHeap>) {
        let heap = Arc::new(InMemoryHeap::with_config(
            package.clone(),
            config.heap.clone(),
        ));
        (Self::with_config(heap.clone(), package, config), heap)
    }

    /// The boundary calls are issued against
    pub fn boundary(&self) -> &dyn NativeBoundary {
        self.boundary.as_ref()
    }

    /// Class package used for type descriptors
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Active configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Issue one boundary call, tracing it when configured
    pub(crate) fn call<R>(
        &self,
        op: &'static str,
        handle: NativeHandle,
        f: impl FnOnce(&dyn NativeBoundary) -> BridgeResult<R>,
    ) -> BridgeResult<R> {
        if self.config.trace_calls {
            tracing::trace!(op, handle = %handle, "boundary call");
        }
        let result = f(self.boundary.as_ref());
        if let Err(ref e) = result {
            tracing::debug!(op, handle = %handle, error = %e, "boundary call failed");
        }
        result
    }

    /// Allocate a new native object and return its owning proxy
    pub fn create<'b, T: ProxyType<'b>>(&'b self) -> BridgeResult<T> {
        let name = T::class_name()
            .ok_or_else(|| BridgeError::UnknownClass("<unspecified>".to_string()))?;
        self.create_as::<T>(name)
    }

    /// Allocate an object of the named class, viewed as `T`
    pub fn create_as<'b, T: ProxyType<'b>>(&'b self, class_name: &str) -> BridgeResult<T> {
        let class = self.package.require_by_name(class_name)?.id();
        let handle = self.call("create", NativeHandle::NULL, |b| b.create(class))?;
        tracing::debug!(class = class_name, handle = %handle, "bridge: created object");
        T::from_proxy(ProxyObject::transferred(self, handle))
    }

    /// Allocate an object of the named class as a reflective proxy
    pub fn create_instance<'b>(&'b self, class_name: &str) -> BridgeResult<ReflectiveObject<'b>> {
        self.create_as::<ReflectiveObject<'b>>(class_name)
    }

    /// Borrowed proxy over an existing handle; `None` for null
    pub fn wrap_borrowed<'b, T: ProxyType<'b>>(&'b self, handle: NativeHandle) -> BridgeResult<Option<T>> {
        match handle.non_null() {
            Some(handle) => T::from_proxy(ProxyObject::borrowed(self, handle)).map(Some),
            None => Ok(None),
        }
    }

    /// Owning proxy over an existing handle; `None` for null.
    ///
    /// # Safety
    /// Same contract as [`ProxyObject::adopt`]: no other owner may exist.
    pub unsafe fn adopt<'b, T: ProxyType<'b>>(&'b self, handle: NativeHandle) -> BridgeResult<Option<T>> {
        match handle.non_null() {
            Some(handle) => T::from_proxy(ProxyObject::adopt(self, handle)).map(Some),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("package", &self.package.name())
            .field("config", &self.config)
            .finish()
    }
}

//! TypedCollection - list semantics over a native sequence
//!
//! The collection references its elements; it never owns them. Appending
//! leaves the element proxy's ownership untouched, and element proxies
//! read back are [`Borrowed`] views tied to the collection borrow.

use std::fmt;
use std::marker::PhantomData;

use crate::bridge::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::handle::{NativeHandle, Ownership};
use crate::proxy::{Borrowed, ProxyObject, ProxyType};
use crate::schema::ClassId;

/// Proxy over a native sequence of `T` objects.
pub struct TypedCollection<'b, T> {
    proxy: ProxyObject<'b>,
    element_class: ClassId,
    _element: PhantomData<fn() -> T>,
}

impl<'b, T: ProxyType<'b>> TypedCollection<'b, T> {
    /// Allocate a new, empty native sequence of `T`'s class
    pub fn new(bridge: &'b Bridge) -> BridgeResult<Self> {
        let name = T::class_name()
            .ok_or_else(|| BridgeError::UnknownClass("<unspecified>".to_string()))?;
        Self::with_element_class(bridge, name)
    }

    /// Allocate a new, empty native sequence of the named element class
    pub fn with_element_class(bridge: &'b Bridge, class_name: &str) -> BridgeResult<Self> {
        let element_class = bridge.package().require_by_name(class_name)?.id();
        check_view(bridge, element_class, T::class_name())?;
        let handle = bridge.call("create_list", NativeHandle::NULL, |b| {
            b.create_list(element_class)
        })?;
        tracing::debug!(element = class_name, handle = %handle, "collection: created list");
        Ok(Self::from_parts(
            ProxyObject::transferred(bridge, handle),
            element_class,
        ))
    }

    /// Borrowed view over an existing sequence handle
    pub fn borrowed(bridge: &'b Bridge, handle: NativeHandle, element_class: ClassId) -> BridgeResult<Self> {
        check_view(bridge, element_class, T::class_name())?;
        Ok(Self::from_parts(
            ProxyObject::borrowed(bridge, handle),
            element_class,
        ))
    }

    pub(crate) fn from_parts(proxy: ProxyObject<'b>, element_class: ClassId) -> Self {
        Self {
            proxy,
            element_class,
            _element: PhantomData,
        }
    }

    /// Class of the elements
    pub fn element_class(&self) -> ClassId {
        self.element_class
    }

    /// The underlying proxy
    pub fn proxy(&self) -> &ProxyObject<'b> {
        &self.proxy
    }

    /// Ownership of the sequence itself
    pub fn ownership(&self) -> Ownership {
        self.proxy.ownership()
    }

    /// Release the sequence (destroys it iff owned); idempotent
    pub fn release(&self) -> BridgeResult<bool> {
        self.proxy.release()
    }

    /// Current element count
    pub fn size(&self) -> BridgeResult<usize> {
        let list = self.proxy.live_handle()?;
        self.proxy.bridge().call("list_size", list, |b| b.list_size(list))
    }

    /// True if the sequence has no elements
    pub fn is_empty(&self) -> BridgeResult<bool> {
        Ok(self.size()? == 0)
    }

    /// Element at `index` as a borrowed proxy, `None` for a null element.
    ///
    /// `index` must be below `size()`.
    pub fn at(&self, index: usize) -> BridgeResult<Option<Borrowed<'_, T>>> {
        let element = self.handle_at(index)?;
        match element.non_null() {
            Some(element) => {
                let proxy = ProxyObject::borrowed(self.proxy.bridge(), element);
                Ok(Some(Borrowed::new(T::from_proxy(proxy)?)))
            }
            None => Ok(None),
        }
    }

    /// Same as [`TypedCollection::at`]
    pub fn get(&self, index: usize) -> BridgeResult<Option<Borrowed<'_, T>>> {
        self.at(index)
    }

    /// Raw element handle at `index`
    pub fn handle_at(&self, index: usize) -> BridgeResult<NativeHandle> {
        let list = self.proxy.live_handle()?;
        let len = self.size()?;
        if index >= len {
            return Err(BridgeError::IndexOutOfRange { index, len });
        }
        self.proxy
            .bridge()
            .call("list_at", list, |b| b.list_at(list, index))
    }

    /// Append a reference to `element`; its ownership is unaffected
    pub fn push_back(&self, element: &T) -> BridgeResult<()> {
        let list = self.proxy.live_handle()?;
        let element = self.checked_element(element)?;
        self.proxy
            .bridge()
            .call("list_push_back", list, |b| b.list_push_back(list, element))
    }

    /// Insert a reference to `element` at `position` (`0..=size()`)
    pub fn insert_at(&self, position: usize, element: &T) -> BridgeResult<()> {
        let list = self.proxy.live_handle()?;
        let len = self.size()?;
        if position > len {
            return Err(BridgeError::IndexOutOfRange {
                index: position,
                len,
            });
        }
        let element = self.checked_element(element)?;
        self.proxy.bridge().call("list_insert_at", list, |b| {
            b.list_insert_at(list, position, element)
        })
    }

    /// Append every element of `other`, in order; `other` is unchanged.
    ///
    /// With element-class validation on, `other`'s element class must be
    /// this collection's element class or derive from it.
    pub fn insert_all(&self, other: &TypedCollection<'_, T>) -> BridgeResult<()> {
        let list = self.proxy.live_handle()?;
        let source = other.proxy.live_handle()?;
        let bridge = self.proxy.bridge();
        if bridge.config().validation.element_classes
            && !bridge.package().is_a(other.element_class, self.element_class)
        {
            return Err(BridgeError::ClassMismatch {
                expected: class_name(bridge, self.element_class),
                got: class_name(bridge, other.element_class),
            });
        }
        bridge.call("list_insert_all", list, |b| b.list_insert_all(list, source))
    }

    /// Remove all elements; the elements themselves are not destroyed
    pub fn clear(&self) -> BridgeResult<()> {
        let list = self.proxy.live_handle()?;
        self.proxy.bridge().call("list_clear", list, |b| b.list_clear(list))
    }

    /// All element handles, in order
    pub fn handles(&self) -> BridgeResult<Vec<NativeHandle>> {
        let len = self.size()?;
        let mut result = Vec::with_capacity(len);
        for i in 0..len {
            result.push(self.handle_at(i)?);
        }
        Ok(result)
    }

    /// Iterate over borrowed elements
    pub fn iter(&self) -> BridgeResult<Iter<'_, 'b, T>> {
        Ok(Iter {
            collection: self,
            index: 0,
            len: self.size()?,
        })
    }

    fn checked_element(&self, element: &T) -> BridgeResult<NativeHandle> {
        let handle = element.proxy().live_handle()?;
        let bridge = self.proxy.bridge();
        if bridge.config().validation.element_classes {
            let class = bridge.call("class_of", handle, |b| b.class_of(handle))?;
            if !bridge.package().is_a(class, self.element_class) {
                return Err(BridgeError::ClassMismatch {
                    expected: class_name(bridge, self.element_class),
                    got: class_name(bridge, class),
                });
            }
        }
        Ok(handle)
    }
}

/// A view typed as `view` must accept every element of `element_class`
fn check_view(bridge: &Bridge, element_class: ClassId, view: Option<&str>) -> BridgeResult<()> {
    let package = bridge.package();
    package.require(element_class)?;
    if let Some(view) = view {
        let view_class = package.require_by_name(view)?;
        if !package.is_a(element_class, view_class.id()) {
            return Err(BridgeError::ClassMismatch {
                expected: view.to_string(),
                got: class_name(bridge, element_class),
            });
        }
    }
    Ok(())
}

fn class_name(bridge: &Bridge, class: ClassId) -> String {
    bridge
        .package()
        .class(class)
        .map(|c| c.name().to_string())
        .unwrap_or_else(|| format!("#{}", class))
}

impl<T> fmt::Debug for TypedCollection<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCollection")
            .field("proxy", &self.proxy)
            .field("element_class", &self.element_class)
            .finish()
    }
}

/// Iterator over the borrowed elements of a [`TypedCollection`].
///
/// The length is sampled when iteration starts.
pub struct Iter<'c, 'b, T> {
    collection: &'c TypedCollection<'b, T>,
    index: usize,
    len: usize,
}

impl<'c, 'b, T: ProxyType<'b>> Iterator for Iter<'c, 'b, T> {
    type Item = BridgeResult<Option<Borrowed<'c, T>>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }
        let item = self.collection.at(self.index);
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

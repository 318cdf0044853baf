//! ReflectiveObject - get/set/has/clear by feature id
//!
//! A reflective proxy upcasts its handle once at construction and caches
//! the dynamic type. Every feature id is checked against that type before
//! a boundary call is made.

use std::fmt;

use crate::bridge::Bridge;
use crate::collection::TypedCollection;
use crate::convert::{FromAny, IntoAny};
use crate::error::{BridgeError, BridgeResult};
use crate::handle::{NativeHandle, Ownership};
use crate::proxy::{Borrowed, ProxyObject, ProxyType};
use crate::schema::{ClassId, ClassSchema, FeatureId, FeatureKind, FeatureSchema};
use crate::value::AnyValue;

/// Proxy with uniform attribute access over a native reflective object.
pub struct ReflectiveObject<'b> {
    proxy: ProxyObject<'b>,
    /// Reflective base handle from `upcast`
    base: NativeHandle,
    class: &'b ClassSchema,
}

impl<'b> ReflectiveObject<'b> {
    /// Wrap `proxy`, requiring its dynamic type to be `class_name` or a
    /// subtype of it when given.
    ///
    /// On failure `proxy` is dropped, which destroys the object if owned.
    pub fn with_class(proxy: ProxyObject<'b>, class_name: Option<&str>) -> BridgeResult<Self> {
        let bridge = proxy.bridge();
        let handle = proxy.live_handle()?;
        let base = bridge.call("upcast", handle, |b| b.upcast(handle))?;
        let class_id = bridge.call("class_of", base, |b| b.class_of(base))?;
        let class = bridge.package().require(class_id)?;

        if let Some(expected) = class_name {
            let expected = bridge.package().require_by_name(expected)?;
            if !class.is_subtype_of(expected.id()) {
                return Err(BridgeError::ClassMismatch {
                    expected: expected.name().to_string(),
                    got: class.name().to_string(),
                });
            }
        }

        Ok(Self { proxy, base, class })
    }

    /// The bridge this object calls through
    pub fn bridge(&self) -> &'b Bridge {
        self.proxy.bridge()
    }

    /// Runtime type descriptor, fixed at construction
    pub fn dynamic_type(&self) -> &'b ClassSchema {
        self.class
    }

    /// Id of the dynamic type
    pub fn class_id(&self) -> ClassId {
        self.class.id()
    }

    /// Current ownership
    pub fn ownership(&self) -> Ownership {
        self.proxy.ownership()
    }

    /// True while this proxy owns the native object
    pub fn is_owned(&self) -> bool {
        self.proxy.is_owned()
    }

    /// Release the object (destroys it iff owned); idempotent
    pub fn release(&self) -> BridgeResult<bool> {
        self.proxy.release()
    }

    /// Unwrap into the underlying proxy
    pub fn into_proxy(self) -> ProxyObject<'b> {
        self.proxy
    }

    fn base(&self) -> BridgeResult<NativeHandle> {
        self.proxy.live_handle()?;
        Ok(self.base)
    }

    /// Schema of `feature`, or `FeatureOutOfRange`
    pub fn feature(&self, feature: FeatureId) -> BridgeResult<&'b FeatureSchema> {
        self.class.feature(feature)
    }

    // ========================================================================
    // Reflective protocol
    // ========================================================================

    /// Current value of `feature`.
    ///
    /// `resolve` asks the native side to resolve reference stubs.
    pub fn e_get(&self, feature: FeatureId, resolve: bool) -> BridgeResult<AnyValue> {
        self.feature(feature)?;
        let base = self.base()?;
        self.bridge()
            .call("e_get", base, |b| b.e_get(base, feature, resolve))
    }

    /// Overwrite `feature` and mark it set
    pub fn e_set(&self, feature: FeatureId, value: impl IntoAny) -> BridgeResult<()> {
        let schema = self.feature(feature)?;
        let value = value.into_any();
        if self.bridge().config().validation.value_kinds && !value.fits(schema.value_kind()) {
            return Err(BridgeError::type_mismatch(
                schema.value_kind().name(),
                value.type_name(),
            ));
        }
        let base = self.base()?;
        self.bridge()
            .call("e_set", base, |b| b.e_set(base, feature, value))
    }

    /// True iff `feature` was set since its last unset
    pub fn e_is_set(&self, feature: FeatureId) -> BridgeResult<bool> {
        self.feature(feature)?;
        let base = self.base()?;
        self.bridge()
            .call("e_is_set", base, |b| b.e_is_set(base, feature))
    }

    /// Revert `feature` to its default
    pub fn e_unset(&self, feature: FeatureId) -> BridgeResult<()> {
        self.feature(feature)?;
        let base = self.base()?;
        self.bridge()
            .call("e_unset", base, |b| b.e_unset(base, feature))
    }

    /// Run the native initializer
    pub fn initialize(&self) -> BridgeResult<()> {
        let base = self.base()?;
        self.bridge().call("initialize", base, |b| b.initialize(base))
    }

    // ========================================================================
    // Typed helpers
    // ========================================================================

    /// Read and unbox `feature`
    pub fn get<T: FromAny>(&self, feature: FeatureId) -> BridgeResult<T> {
        T::from_any(self.e_get(feature, false)?)
    }

    /// Box and write `feature`
    pub fn set<T: IntoAny>(&self, feature: FeatureId, value: T) -> BridgeResult<()> {
        self.e_set(feature, value)
    }

    /// Read a feature by name
    pub fn get_by_name<T: FromAny>(&self, name: &str) -> BridgeResult<T> {
        self.get(self.class.feature_id(name)?)
    }

    /// Write a feature by name
    pub fn set_by_name<T: IntoAny>(&self, name: &str, value: T) -> BridgeResult<()> {
        self.e_set(self.class.feature_id(name)?, value)
    }

    /// Object referenced by a single-valued reference, as a borrowed proxy
    pub fn reference<T: ProxyType<'b>>(&self, feature: FeatureId) -> BridgeResult<Option<Borrowed<'_, T>>> {
        match self.e_get(feature, true)? {
            AnyValue::Null => Ok(None),
            AnyValue::Object(handle) => match handle.non_null() {
                Some(handle) => {
                    let proxy = ProxyObject::borrowed(self.bridge(), handle);
                    Ok(Some(Borrowed::new(T::from_proxy(proxy)?)))
                }
                None => Ok(None),
            },
            other => Err(BridgeError::type_mismatch("object", other.type_name())),
        }
    }

    /// Point a single-valued reference at `target`, or clear it with `None`.
    ///
    /// The referenced object's ownership is unaffected.
    pub fn set_reference<T: ProxyType<'b>>(&self, feature: FeatureId, target: Option<&T>) -> BridgeResult<()> {
        let value = match target {
            Some(target) => AnyValue::Object(target.proxy().live_handle()?),
            None => AnyValue::Null,
        };
        self.e_set(feature, value)
    }

    /// Borrowed collection view over a many-valued reference
    pub fn list<T: ProxyType<'b>>(&self, feature: FeatureId) -> BridgeResult<Borrowed<'_, TypedCollection<'b, T>>> {
        let schema = self.feature(feature)?;
        let target = match schema.kind() {
            FeatureKind::Reference {
                target, many: true, ..
            } => target,
            _ => {
                return Err(BridgeError::type_mismatch(
                    "list",
                    schema.value_kind().name(),
                ))
            }
        };
        let element_class = self.bridge().package().require_by_name(target)?.id();
        match self.e_get(feature, false)? {
            AnyValue::List(list) if !list.is_null() => Ok(Borrowed::new(
                TypedCollection::borrowed(self.bridge(), list, element_class)?,
            )),
            AnyValue::List(list) => Err(BridgeError::NotAList(list)),
            other => Err(BridgeError::type_mismatch("list", other.type_name())),
        }
    }

    // ========================================================================
    // Views and copies
    // ========================================================================

    /// Borrowed view of this object as `T`, checked against the dynamic type
    pub fn downcast<T: ProxyType<'b>>(&self) -> BridgeResult<Borrowed<'_, T>> {
        let handle = self.proxy.live_handle()?;
        let proxy = ProxyObject::borrowed(self.bridge(), handle);
        Ok(Borrowed::new(T::from_proxy(proxy)?))
    }

    /// Native copy of this object; the returned proxy owns it
    pub fn duplicate<T: ProxyType<'b>>(&self) -> BridgeResult<T> {
        let handle = self.proxy.live_handle()?;
        let copy = self.bridge().call("copy", handle, |b| b.copy(handle))?;
        tracing::debug!(from = %handle, to = %copy, "reflect: duplicated object");
        T::from_proxy(ProxyObject::transferred(self.bridge(), copy))
    }
}

impl<'b> ProxyType<'b> for ReflectiveObject<'b> {
    fn class_name() -> Option<&'static str> {
        None
    }

    fn from_proxy(proxy: ProxyObject<'b>) -> BridgeResult<Self> {
        Self::with_class(proxy, None)
    }

    fn proxy(&self) -> &ProxyObject<'b> {
        &self.proxy
    }
}

impl fmt::Debug for ReflectiveObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectiveObject")
            .field("class", &self.class.name())
            .field("proxy", &self.proxy)
            .finish()
    }
}

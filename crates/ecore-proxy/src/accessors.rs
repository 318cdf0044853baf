//! Named accessors over the reflective protocol
//!
//! [`proxy_class!`](crate::proxy_class) stamps out a typed proxy for one
//! class. Each named getter/setter is a thin wrapper translating the name
//! to a feature id and boxing or unboxing the value, so named and generic
//! access always observe the same state.

/// Define a typed proxy over a reflective object.
///
/// ```ignore
/// proxy_class! {
///     /// A key/value pair
///     pub struct OptionValue("OptionValue") {
///         attr option_name / set_option_name: String = OPTION_VALUE_OPTION_NAME;
///         attr value / set_value: String = OPTION_VALUE_VALUE;
///     }
/// }
///
/// proxy_class! {
///     pub struct ListOptionsValues("ListOptionsValues") {
///         list option_values: OptionValue = LIST_OPTIONS_VALUES_OPTION_VALUES;
///     }
/// }
/// ```
///
/// The generated type derefs to [`ReflectiveObject`](crate::ReflectiveObject)
/// and implements [`ProxyType`](crate::ProxyType) with a dynamic class check.
#[macro_export]
macro_rules! proxy_class {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident($class:literal) {
            $( attr $getter:ident / $setter:ident : $ty:ty = $feature:expr; )*
            $( list $list:ident : $elem:ident = $list_feature:expr; )*
        }
    ) => {
        $(#[$attr])*
        $vis struct $name<'b>($crate::ReflectiveObject<'b>);

        impl<'b> $name<'b> {
            /// Registered class name
            pub const CLASS: &'static str = $class;

            /// Allocate a new native object; the returned proxy owns it
            pub fn new(bridge: &'b $crate::Bridge) -> $crate::BridgeResult<Self> {
                bridge.create::<Self>()
            }

            /// The reflective view of this object
            pub fn reflective(&self) -> &$crate::ReflectiveObject<'b> {
                &self.0
            }

            /// Unwrap into the reflective view
            pub fn into_reflective(self) -> $crate::ReflectiveObject<'b> {
                self.0
            }

            $(
                #[doc = concat!("Read `", stringify!($feature), "`")]
                pub fn $getter(&self) -> $crate::BridgeResult<$ty> {
                    self.0.get::<$ty>($feature)
                }

                #[doc = concat!("Write `", stringify!($feature), "`")]
                pub fn $setter(&self, value: impl Into<$ty>) -> $crate::BridgeResult<()> {
                    self.0.set::<$ty>($feature, value.into())
                }
            )*

            $(
                #[doc = concat!("Borrowed view of `", stringify!($list_feature), "`")]
                pub fn $list(
                    &self,
                ) -> $crate::BridgeResult<$crate::Borrowed<'_, $crate::TypedCollection<'b, $elem<'b>>>> {
                    self.0.list::<$elem<'b>>($list_feature)
                }
            )*
        }

        impl<'b> $crate::ProxyType<'b> for $name<'b> {
            fn class_name() -> Option<&'static str> {
                Some($class)
            }

            fn from_proxy(proxy: $crate::ProxyObject<'b>) -> $crate::BridgeResult<Self> {
                $crate::ReflectiveObject::with_class(proxy, Some($class)).map(Self)
            }

            fn proxy(&self) -> &$crate::ProxyObject<'b> {
                $crate::ProxyType::proxy(&self.0)
            }
        }

        impl<'b> ::std::ops::Deref for $name<'b> {
            type Target = $crate::ReflectiveObject<'b>;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::std::fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        }
    };
}

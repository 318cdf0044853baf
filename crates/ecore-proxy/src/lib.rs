//! ecore-proxy - ownership-safe proxies over objects on a native heap
//!
//! A proxy pairs an opaque [`NativeHandle`] with an [`Ownership`] flag.
//! Owning proxies destroy their native object exactly once, when released
//! or dropped; borrowed proxies never do. On top of that sit typed
//! collections over native sequences and a reflective get/set/has/clear
//! protocol keyed by feature ids.
//!
//! # Example
//!
//! ```ignore
//! use ecore_proxy::{model, Bridge, BridgeConfig, TypedCollection};
//! use ecore_proxy::model::OptionValue;
//!
//! let (bridge, heap) = Bridge::in_memory(model::package()?, BridgeConfig::default());
//!
//! let option = OptionValue::new(&bridge)?;
//! option.set_option_name("timeout")?;
//!
//! let list = TypedCollection::<OptionValue>::new(&bridge)?;
//! list.push_back(&option)?;
//! assert_eq!(list.at(0)?.unwrap().option_name()?, "timeout");
//!
//! drop(list);
//! drop(option);
//! assert_eq!(heap.stats().live, 0);
//! ```

#![warn(missing_docs)]

pub mod accessors;
pub mod boundary;
pub mod bridge;
pub mod collection;
pub mod config;
pub mod convert;
pub mod error;
pub mod ffi;
pub mod handle;
pub mod heap;
pub mod model;
pub mod proxy;
pub mod reflect;
pub mod schema;
pub mod value;

pub use boundary::NativeBoundary;
pub use bridge::Bridge;
pub use collection::{Iter, TypedCollection};
pub use config::{BridgeConfig, HeapConfig, ValidationConfig};
pub use convert::{FromAny, IntoAny};
pub use error::{BridgeError, BridgeResult};
pub use ffi::{FfiBoundary, NativeVTable, RawAny};
pub use handle::{NativeHandle, Ownership};
pub use heap::{HeapStats, InMemoryHeap};
pub use proxy::{Borrowed, ProxyObject, ProxyType};
pub use reflect::ReflectiveObject;
pub use schema::{ClassId, ClassSchema, FeatureId, FeatureKind, FeatureSchema, Package};
pub use value::{AnyValue, ValueKind};

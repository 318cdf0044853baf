//! C ABI adapter for native libraries
//!
//! A native library exposes its boundary calls as a [`NativeVTable`] of
//! `extern "C"` function pointers plus an opaque context pointer.
//! [`FfiBoundary`] implements [`NativeBoundary`] on top of it.
//!
//! Conventions shared by every entry:
//! - the first argument is the library's context pointer
//! - the return value is a status code, `STATUS_OK` on success
//! - results are written through out-parameters
//! - strings returned inside [`RawAny`] are owned by the library and are
//!   handed back through `free_string` once copied

use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;

use crate::boundary::NativeBoundary;
use crate::error::{BridgeError, BridgeResult};
use crate::handle::NativeHandle;
use crate::schema::{ClassId, ClassSchema, FeatureId, FeatureKind, Package};
use crate::value::AnyValue;

/// Call succeeded
pub const STATUS_OK: i32 = 0;
/// A null handle was passed
pub const STATUS_NULL_HANDLE: i32 = 1;
/// The handle refers to a destroyed object
pub const STATUS_STALE_HANDLE: i32 = 2;
/// Index or feature id out of range
pub const STATUS_OUT_OF_RANGE: i32 = 3;
/// Value or class did not match
pub const STATUS_TYPE_MISMATCH: i32 = 4;
/// Any other failure
pub const STATUS_FAILURE: i32 = -1;

/// [`RawAny`] tag: null
pub const TAG_NULL: u8 = 0;
/// [`RawAny`] tag: bool
pub const TAG_BOOL: u8 = 1;
/// [`RawAny`] tag: 32-bit int
pub const TAG_INT: u8 = 2;
/// [`RawAny`] tag: 64-bit int
pub const TAG_LONG: u8 = 3;
/// [`RawAny`] tag: double
pub const TAG_DOUBLE: u8 = 4;
/// [`RawAny`] tag: UTF-8 string
pub const TAG_STRING: u8 = 5;
/// [`RawAny`] tag: object handle
pub const TAG_OBJECT: u8 = 6;
/// [`RawAny`] tag: list handle
pub const TAG_LIST: u8 = 7;

/// Status code a native shim should report for `err`
pub fn status_code(err: &BridgeError) -> i32 {
    match err {
        BridgeError::NullHandle => STATUS_NULL_HANDLE,
        BridgeError::StaleHandle(_) => STATUS_STALE_HANDLE,
        BridgeError::IndexOutOfRange { .. } | BridgeError::FeatureOutOfRange { .. } => {
            STATUS_OUT_OF_RANGE
        }
        BridgeError::TypeMismatch { .. } | BridgeError::ClassMismatch { .. } => {
            STATUS_TYPE_MISMATCH
        }
        BridgeError::Native { code, .. } => *code,
        _ => STATUS_FAILURE,
    }
}

// ============================================================================
// RawAny
// ============================================================================

/// C representation of [`AnyValue`].
///
/// Integers, booleans and handles travel in `int` (handles as their raw
/// bits), doubles in `float`, strings as `ptr`/`len` UTF-8 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawAny {
    /// One of the `TAG_*` constants
    pub tag: u8,
    /// Integer, boolean or handle payload
    pub int: i64,
    /// Double payload
    pub float: f64,
    /// String bytes
    pub ptr: *const u8,
    /// String length in bytes
    pub len: usize,
}

impl Default for RawAny {
    fn default() -> Self {
        Self {
            tag: TAG_NULL,
            int: 0,
            float: 0.0,
            ptr: ptr::null(),
            len: 0,
        }
    }
}

impl RawAny {
    fn with_int(tag: u8, int: i64) -> Self {
        Self {
            tag,
            int,
            ..Self::default()
        }
    }

    /// Borrow `value` as a raw value.
    ///
    /// String data points into `value`, which must outlive every use of the
    /// result.
    pub fn borrow_from(value: &AnyValue) -> Self {
        match value {
            AnyValue::Null => Self::default(),
            AnyValue::Bool(b) => Self::with_int(TAG_BOOL, *b as i64),
            AnyValue::Int(i) => Self::with_int(TAG_INT, *i as i64),
            AnyValue::Long(l) => Self::with_int(TAG_LONG, *l),
            AnyValue::Double(d) => Self {
                tag: TAG_DOUBLE,
                float: *d,
                ..Self::default()
            },
            AnyValue::String(s) => Self {
                tag: TAG_STRING,
                ptr: s.as_ptr(),
                len: s.len(),
                ..Self::default()
            },
            AnyValue::Object(h) => Self::with_int(TAG_OBJECT, h.id() as i64),
            AnyValue::List(h) => Self::with_int(TAG_LIST, h.id() as i64),
        }
    }

    /// Copy the raw value into an owned [`AnyValue`].
    ///
    /// # Safety
    /// For `TAG_STRING`, `ptr` must be valid for reads of `len` bytes (or
    /// null with `len == 0`).
    pub unsafe fn to_value(&self) -> BridgeResult<AnyValue> {
        let value = match self.tag {
            TAG_NULL => AnyValue::Null,
            TAG_BOOL => AnyValue::Bool(self.int != 0),
            TAG_INT => AnyValue::Int(
                i32::try_from(self.int)
                    .map_err(|_| BridgeError::type_mismatch("int", format!("integer {}", self.int)))?,
            ),
            TAG_LONG => AnyValue::Long(self.int),
            TAG_DOUBLE => AnyValue::Double(self.float),
            TAG_STRING => {
                if self.ptr.is_null() {
                    AnyValue::String(String::new())
                } else {
                    let bytes = std::slice::from_raw_parts(self.ptr, self.len);
                    let text = std::str::from_utf8(bytes).map_err(|e| BridgeError::Native {
                        code: STATUS_TYPE_MISMATCH,
                        message: format!("string value is not UTF-8: {}", e),
                    })?;
                    AnyValue::String(text.to_string())
                }
            }
            TAG_OBJECT => AnyValue::Object(NativeHandle::from_raw(self.int as u64)),
            TAG_LIST => AnyValue::List(NativeHandle::from_raw(self.int as u64)),
            tag => {
                return Err(BridgeError::Native {
                    code: STATUS_TYPE_MISMATCH,
                    message: format!("unknown value tag {}", tag),
                })
            }
        };
        Ok(value)
    }
}

// ============================================================================
// NativeVTable
// ============================================================================

type Ctx = *mut c_void;

/// Function table exported by a native library.
///
/// Entries are `Option` so a table read from C may contain nulls;
/// [`FfiBoundary::new`] rejects such tables.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct NativeVTable {
    /// `(ctx, class, out_handle)`
    pub create: Option<unsafe extern "C" fn(Ctx, u32, *mut u64) -> i32>,
    /// `(ctx, handle)`
    pub destroy: Option<unsafe extern "C" fn(Ctx, u64) -> i32>,
    /// `(ctx, handle, out_base)`
    pub upcast: Option<unsafe extern "C" fn(Ctx, u64, *mut u64) -> i32>,
    /// `(ctx, handle)`
    pub initialize: Option<unsafe extern "C" fn(Ctx, u64) -> i32>,
    /// `(ctx, handle, out_copy)`
    pub copy: Option<unsafe extern "C" fn(Ctx, u64, *mut u64) -> i32>,
    /// `(ctx, handle, out_class)`
    pub class_of: Option<unsafe extern "C" fn(Ctx, u64, *mut u32) -> i32>,
    /// `(ctx, handle, feature, resolve, out_value)`
    pub e_get: Option<unsafe extern "C" fn(Ctx, u64, u32, bool, *mut RawAny) -> i32>,
    /// `(ctx, handle, feature, value)`
    pub e_set: Option<unsafe extern "C" fn(Ctx, u64, u32, *const RawAny) -> i32>,
    /// `(ctx, handle, feature, out_is_set)`
    pub e_is_set: Option<unsafe extern "C" fn(Ctx, u64, u32, *mut bool) -> i32>,
    /// `(ctx, handle, feature)`
    pub e_unset: Option<unsafe extern "C" fn(Ctx, u64, u32) -> i32>,
    /// `(ctx, element_class, out_list)`
    pub create_list: Option<unsafe extern "C" fn(Ctx, u32, *mut u64) -> i32>,
    /// `(ctx, list, out_size)`
    pub list_size: Option<unsafe extern "C" fn(Ctx, u64, *mut usize) -> i32>,
    /// `(ctx, list, index, out_element)`
    pub list_at: Option<unsafe extern "C" fn(Ctx, u64, usize, *mut u64) -> i32>,
    /// `(ctx, list, element)`
    pub list_push_back: Option<unsafe extern "C" fn(Ctx, u64, u64) -> i32>,
    /// `(ctx, list, position, element)`
    pub list_insert_at: Option<unsafe extern "C" fn(Ctx, u64, usize, u64) -> i32>,
    /// `(ctx, list, other)`
    pub list_insert_all: Option<unsafe extern "C" fn(Ctx, u64, u64) -> i32>,
    /// `(ctx, list)`
    pub list_clear: Option<unsafe extern "C" fn(Ctx, u64) -> i32>,
    /// `(ctx, ptr, len)`: release a string returned by `e_get`
    pub free_string: Option<unsafe extern "C" fn(Ctx, *mut u8, usize)>,
}

impl NativeVTable {
    /// Names of entries that are null
    pub fn missing_entries(&self) -> Vec<&'static str> {
        let entries = [
            ("create", self.create.is_none()),
            ("destroy", self.destroy.is_none()),
            ("upcast", self.upcast.is_none()),
            ("initialize", self.initialize.is_none()),
            ("copy", self.copy.is_none()),
            ("class_of", self.class_of.is_none()),
            ("e_get", self.e_get.is_none()),
            ("e_set", self.e_set.is_none()),
            ("e_is_set", self.e_is_set.is_none()),
            ("e_unset", self.e_unset.is_none()),
            ("create_list", self.create_list.is_none()),
            ("list_size", self.list_size.is_none()),
            ("list_at", self.list_at.is_none()),
            ("list_push_back", self.list_push_back.is_none()),
            ("list_insert_at", self.list_insert_at.is_none()),
            ("list_insert_all", self.list_insert_all.is_none()),
            ("list_clear", self.list_clear.is_none()),
            ("free_string", self.free_string.is_none()),
        ];
        entries
            .iter()
            .filter(|(_, missing)| *missing)
            .map(|(name, _)| *name)
            .collect()
    }
}

// ============================================================================
// FfiBoundary
// ============================================================================

/// [`NativeBoundary`] that calls through a [`NativeVTable`].
///
/// `STATUS_OUT_OF_RANGE` and `STATUS_TYPE_MISMATCH` are turned back into
/// the typed errors an in-process boundary would raise, using the package
/// the library instantiates to name classes and features.
pub struct FfiBoundary {
    vtable: NativeVTable,
    ctx: Ctx,
    package: Arc<Package>,
}

/// What a failed call addressed
#[derive(Clone, Copy)]
enum Site<'a> {
    Handle,
    Feature(FeatureId),
    Value(FeatureId, &'a AnyValue),
    Index(usize),
    Element(NativeHandle),
    Insert(usize, NativeHandle),
    Source(NativeHandle),
}

// SAFETY: `FfiBoundary::new` requires the library to accept calls from any
// thread with the given context.
unsafe impl Send for FfiBoundary {}
unsafe impl Sync for FfiBoundary {}

macro_rules! entry {
    ($self:ident . $name:ident) => {
        $self.vtable.$name.ok_or_else(|| BridgeError::Native {
            code: STATUS_FAILURE,
            message: concat!("vtable entry '", stringify!($name), "' is null").to_string(),
        })?
    };
}

impl FfiBoundary {
    /// Wrap a function table and its context pointer.
    ///
    /// `package` describes the classes the library instantiates.
    ///
    /// # Safety
    /// Every entry must follow the conventions of this module, `ctx` must
    /// stay valid for the lifetime of the boundary, and the library must be
    /// callable from any thread.
    pub unsafe fn new(vtable: NativeVTable, ctx: *mut c_void, package: Arc<Package>) -> BridgeResult<Self> {
        let missing = vtable.missing_entries();
        if !missing.is_empty() {
            return Err(BridgeError::Native {
                code: STATUS_FAILURE,
                message: format!("null vtable entries: {}", missing.join(", ")),
            });
        }
        tracing::debug!(package = package.name(), "ffi: boundary attached");
        Ok(Self {
            vtable,
            ctx,
            package,
        })
    }

    fn check(&self, op: &str, handle: NativeHandle, status: i32, site: Site<'_>) -> BridgeResult<()> {
        match status {
            STATUS_OK => Ok(()),
            STATUS_NULL_HANDLE => Err(BridgeError::NullHandle),
            STATUS_STALE_HANDLE => Err(BridgeError::StaleHandle(handle)),
            STATUS_OUT_OF_RANGE | STATUS_TYPE_MISMATCH => Err(self
                .typed_failure(handle, status, site)
                .unwrap_or_else(|| native_failure(op, handle, status))),
            code => Err(native_failure(op, handle, code)),
        }
    }

    /// Typed error for a range or type failure, if the site allows one
    fn typed_failure(&self, handle: NativeHandle, status: i32, site: Site<'_>) -> Option<BridgeError> {
        match (status, site) {
            (STATUS_OUT_OF_RANGE, Site::Index(index) | Site::Insert(index, _)) => {
                let len = self.list_size(handle).ok()?;
                Some(BridgeError::IndexOutOfRange { index, len })
            }
            (STATUS_OUT_OF_RANGE, Site::Feature(feature) | Site::Value(feature, _)) => {
                self.class_schema(handle)?.feature(feature).err()
            }
            (STATUS_TYPE_MISMATCH, Site::Value(feature, value)) => {
                let schema = match self.class_schema(handle)?.feature(feature) {
                    Ok(schema) => schema,
                    Err(e) => return Some(e),
                };
                let kind = schema.value_kind();
                match schema.kind() {
                    FeatureKind::Reference { target, .. } if value.fits(kind) => {
                        let got = match value {
                            AnyValue::Object(element) => self.class_name(*element)?,
                            _ => format!("elements of {}", value.type_name()),
                        };
                        Some(BridgeError::ClassMismatch {
                            expected: target.clone(),
                            got,
                        })
                    }
                    _ => Some(BridgeError::type_mismatch(kind.name(), value.type_name())),
                }
            }
            (STATUS_TYPE_MISMATCH, Site::Element(element) | Site::Insert(_, element)) => {
                Some(BridgeError::ClassMismatch {
                    expected: format!("element class of list {}", handle),
                    got: self.class_name(element)?,
                })
            }
            (STATUS_TYPE_MISMATCH, Site::Source(other)) => Some(BridgeError::ClassMismatch {
                expected: format!("element class of list {}", handle),
                got: format!("element class of list {}", other),
            }),
            _ => None,
        }
    }

    fn class_schema(&self, handle: NativeHandle) -> Option<&ClassSchema> {
        let class = self.class_of(handle).ok()?;
        self.package.class(class)
    }

    fn class_name(&self, handle: NativeHandle) -> Option<String> {
        self.class_schema(handle).map(|c| c.name().to_string())
    }
}

fn native_failure(op: &str, handle: NativeHandle, code: i32) -> BridgeError {
    BridgeError::Native {
        code,
        message: format!("{} on {} failed with status {}", op, handle, code),
    }
}

impl NativeBoundary for FfiBoundary {
    fn create(&self, class: ClassId) -> BridgeResult<NativeHandle> {
        let f = entry!(self.create);
        let mut out = 0u64;
        let status = unsafe { f(self.ctx, class.0, &mut out) };
        self.check("create", NativeHandle::NULL, status, Site::Handle)?;
        NativeHandle::from_raw(out)
            .non_null()
            .ok_or(BridgeError::NullHandle)
    }

    fn destroy(&self, handle: NativeHandle) -> BridgeResult<()> {
        let f = entry!(self.destroy);
        let status = unsafe { f(self.ctx, handle.id()) };
        self.check("destroy", handle, status, Site::Handle)
    }

    fn upcast(&self, handle: NativeHandle) -> BridgeResult<NativeHandle> {
        let f = entry!(self.upcast);
        let mut out = 0u64;
        let status = unsafe { f(self.ctx, handle.id(), &mut out) };
        self.check("upcast", handle, status, Site::Handle)?;
        NativeHandle::from_raw(out)
            .non_null()
            .ok_or(BridgeError::NullHandle)
    }

    fn initialize(&self, handle: NativeHandle) -> BridgeResult<()> {
        let f = entry!(self.initialize);
        let status = unsafe { f(self.ctx, handle.id()) };
        self.check("initialize", handle, status, Site::Handle)
    }

    fn copy(&self, handle: NativeHandle) -> BridgeResult<NativeHandle> {
        let f = entry!(self.copy);
        let mut out = 0u64;
        let status = unsafe { f(self.ctx, handle.id(), &mut out) };
        self.check("copy", handle, status, Site::Handle)?;
        NativeHandle::from_raw(out)
            .non_null()
            .ok_or(BridgeError::NullHandle)
    }

    fn class_of(&self, handle: NativeHandle) -> BridgeResult<ClassId> {
        let f = entry!(self.class_of);
        let mut out = 0u32;
        let status = unsafe { f(self.ctx, handle.id(), &mut out) };
        self.check("class_of", handle, status, Site::Handle)?;
        Ok(ClassId(out))
    }

    fn e_get(&self, handle: NativeHandle, feature: FeatureId, resolve: bool) -> BridgeResult<AnyValue> {
        let f = entry!(self.e_get);
        let free = entry!(self.free_string);
        let mut out = RawAny::default();
        let status = unsafe { f(self.ctx, handle.id(), feature.0, resolve, &mut out) };
        self.check("e_get", handle, status, Site::Feature(feature))?;

        // SAFETY: a successful e_get leaves a valid string in `out`
        let value = unsafe { out.to_value() };
        if out.tag == TAG_STRING && !out.ptr.is_null() {
            unsafe { free(self.ctx, out.ptr as *mut u8, out.len) };
        }
        value
    }

    fn e_set(&self, handle: NativeHandle, feature: FeatureId, value: AnyValue) -> BridgeResult<()> {
        let f = entry!(self.e_set);
        let raw = RawAny::borrow_from(&value);
        let status = unsafe { f(self.ctx, handle.id(), feature.0, &raw) };
        self.check("e_set", handle, status, Site::Value(feature, &value))
    }

    fn e_is_set(&self, handle: NativeHandle, feature: FeatureId) -> BridgeResult<bool> {
        let f = entry!(self.e_is_set);
        let mut out = false;
        let status = unsafe { f(self.ctx, handle.id(), feature.0, &mut out) };
        self.check("e_is_set", handle, status, Site::Feature(feature))?;
        Ok(out)
    }

    fn e_unset(&self, handle: NativeHandle, feature: FeatureId) -> BridgeResult<()> {
        let f = entry!(self.e_unset);
        let status = unsafe { f(self.ctx, handle.id(), feature.0) };
        self.check("e_unset", handle, status, Site::Feature(feature))
    }

    fn create_list(&self, element_class: ClassId) -> BridgeResult<NativeHandle> {
        let f = entry!(self.create_list);
        let mut out = 0u64;
        let status = unsafe { f(self.ctx, element_class.0, &mut out) };
        self.check("create_list", NativeHandle::NULL, status, Site::Handle)?;
        NativeHandle::from_raw(out)
            .non_null()
            .ok_or(BridgeError::NullHandle)
    }

    fn list_size(&self, list: NativeHandle) -> BridgeResult<usize> {
        let f = entry!(self.list_size);
        let mut out = 0usize;
        let status = unsafe { f(self.ctx, list.id(), &mut out) };
        self.check("list_size", list, status, Site::Handle)?;
        Ok(out)
    }

    fn list_at(&self, list: NativeHandle, index: usize) -> BridgeResult<NativeHandle> {
        let f = entry!(self.list_at);
        let mut out = 0u64;
        let status = unsafe { f(self.ctx, list.id(), index, &mut out) };
        self.check("list_at", list, status, Site::Index(index))?;
        Ok(NativeHandle::from_raw(out))
    }

    fn list_push_back(&self, list: NativeHandle, element: NativeHandle) -> BridgeResult<()> {
        let f = entry!(self.list_push_back);
        let status = unsafe { f(self.ctx, list.id(), element.id()) };
        self.check("list_push_back", list, status, Site::Element(element))
    }

    fn list_insert_at(&self, list: NativeHandle, position: usize, element: NativeHandle) -> BridgeResult<()> {
        let f = entry!(self.list_insert_at);
        let status = unsafe { f(self.ctx, list.id(), position, element.id()) };
        self.check("list_insert_at", list, status, Site::Insert(position, element))
    }

    fn list_insert_all(&self, list: NativeHandle, other: NativeHandle) -> BridgeResult<()> {
        let f = entry!(self.list_insert_all);
        let status = unsafe { f(self.ctx, list.id(), other.id()) };
        self.check("list_insert_all", list, status, Site::Source(other))
    }

    fn list_clear(&self, list: NativeHandle) -> BridgeResult<()> {
        let f = entry!(self.list_clear);
        let status = unsafe { f(self.ctx, list.id()) };
        self.check("list_clear", list, status, Site::Handle)
    }
}

impl std::fmt::Debug for FfiBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfiBoundary").field("ctx", &self.ctx).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_table() -> NativeVTable {
        NativeVTable {
            create: None,
            destroy: None,
            upcast: None,
            initialize: None,
            copy: None,
            class_of: None,
            e_get: None,
            e_set: None,
            e_is_set: None,
            e_unset: None,
            create_list: None,
            list_size: None,
            list_at: None,
            list_push_back: None,
            list_insert_at: None,
            list_insert_all: None,
            list_clear: None,
            free_string: None,
        }
    }

    #[test]
    fn test_null_entries_rejected() {
        let table = empty_table();
        assert_eq!(table.missing_entries().len(), 18);
        let package = Arc::new(Package::builder("empty", "").build().unwrap());
        let err = unsafe { FfiBoundary::new(table, ptr::null_mut(), package) }.unwrap_err();
        match err {
            BridgeError::Native { code, message } => {
                assert_eq!(code, STATUS_FAILURE);
                assert!(message.contains("create"));
                assert!(message.contains("free_string"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_raw_any_conversion() {
        let values = [
            AnyValue::Null,
            AnyValue::Bool(true),
            AnyValue::Int(-5),
            AnyValue::Long(1 << 40),
            AnyValue::Double(2.5),
            AnyValue::String("héllo".to_string()),
            AnyValue::Object(NativeHandle::from_raw(0x1_0000_0003)),
            AnyValue::List(NativeHandle::from_raw(9)),
        ];
        for value in &values {
            let raw = RawAny::borrow_from(value);
            assert_eq!(&unsafe { raw.to_value() }.unwrap(), value);
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let raw = RawAny {
            tag: 42,
            ..RawAny::default()
        };
        assert!(matches!(
            unsafe { raw.to_value() },
            Err(BridgeError::Native { code: STATUS_TYPE_MISMATCH, .. })
        ));
    }

    #[test]
    fn test_int_payload_out_of_range() {
        let raw = RawAny {
            tag: TAG_INT,
            int: i64::from(i32::MAX) + 1,
            ..RawAny::default()
        };
        let err = unsafe { raw.to_value() }.unwrap_err();
        assert!(matches!(err, BridgeError::TypeMismatch { .. }));
        assert_eq!(status_code(&err), STATUS_TYPE_MISMATCH);

        let raw = RawAny::with_int(TAG_INT, i64::from(i32::MIN));
        assert_eq!(unsafe { raw.to_value() }.unwrap(), AnyValue::Int(i32::MIN));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_code(&BridgeError::NullHandle), STATUS_NULL_HANDLE);
        assert_eq!(
            status_code(&BridgeError::IndexOutOfRange { index: 3, len: 1 }),
            STATUS_OUT_OF_RANGE
        );
        assert_eq!(
            status_code(&BridgeError::Native {
                code: 77,
                message: String::new()
            }),
            77
        );
        assert_eq!(status_code(&BridgeError::Released), STATUS_FAILURE);
    }
}

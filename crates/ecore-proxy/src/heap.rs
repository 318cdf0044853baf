//! In-memory reference implementation of the native heap
//!
//! Stands in for the native library in tests, demos and hosts that have
//! none. Objects live in a slot arena; every handle encodes its slot and
//! the slot's generation, so a handle used after its object was destroyed
//! fails with `StaleHandle` instead of reaching a recycled object.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::boundary::NativeBoundary;
use crate::config::HeapConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::handle::NativeHandle;
use crate::schema::{ClassId, FeatureId, FeatureKind, Package};
use crate::value::AnyValue;

const SLOT_MASK: u64 = 0xFFFF_FFFF;
const GENERATION_SHIFT: u64 = 32;

/// Native status code used for protocol violations on the heap side
pub const HEAP_PROTOCOL_ERROR: i32 = -2;

/// Allocation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Objects and lists currently alive
    pub live: usize,
    /// Total allocations since the heap was created
    pub created: u64,
    /// Total deallocations since the heap was created
    pub destroyed: u64,
}

struct ObjectData {
    class: ClassId,
    values: Vec<AnyValue>,
    set: Vec<bool>,
    initialized: bool,
}

struct ListData {
    element_class: ClassId,
    items: Vec<NativeHandle>,
    /// Object whose many-valued feature this list backs
    owner: Option<NativeHandle>,
}

enum Entry {
    Object(ObjectData),
    List(ListData),
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Default)]
struct HeapState {
    slots: Vec<Slot>,
    free: Vec<u32>,
    stats: HeapStats,
}

fn encode(slot: u32, generation: u32) -> NativeHandle {
    NativeHandle::from_raw(((generation as u64) << GENERATION_SHIFT) | (slot as u64 + 1))
}

fn decode(handle: NativeHandle) -> (usize, u32) {
    let slot = (handle.id() & SLOT_MASK) as usize;
    (slot.wrapping_sub(1), (handle.id() >> GENERATION_SHIFT) as u32)
}

impl HeapState {
    fn entry(&self, handle: NativeHandle) -> BridgeResult<&Entry> {
        if handle.is_null() {
            return Err(BridgeError::NullHandle);
        }
        let (slot, generation) = decode(handle);
        match self.slots.get(slot) {
            Some(Slot {
                generation: g,
                entry: Some(entry),
            }) if *g == generation => Ok(entry),
            _ => Err(BridgeError::StaleHandle(handle)),
        }
    }

    fn entry_mut(&mut self, handle: NativeHandle) -> BridgeResult<&mut Entry> {
        if handle.is_null() {
            return Err(BridgeError::NullHandle);
        }
        let (slot, generation) = decode(handle);
        match self.slots.get_mut(slot) {
            Some(Slot {
                generation: g,
                entry: Some(entry),
            }) if *g == generation => Ok(entry),
            _ => Err(BridgeError::StaleHandle(handle)),
        }
    }

    fn object(&self, handle: NativeHandle) -> BridgeResult<&ObjectData> {
        match self.entry(handle)? {
            Entry::Object(object) => Ok(object),
            Entry::List(_) => Err(BridgeError::type_mismatch("object", "list")),
        }
    }

    fn object_mut(&mut self, handle: NativeHandle) -> BridgeResult<&mut ObjectData> {
        match self.entry_mut(handle)? {
            Entry::Object(object) => Ok(object),
            Entry::List(_) => Err(BridgeError::type_mismatch("object", "list")),
        }
    }

    fn list(&self, handle: NativeHandle) -> BridgeResult<&ListData> {
        match self.entry(handle)? {
            Entry::List(list) => Ok(list),
            Entry::Object(_) => Err(BridgeError::NotAList(handle)),
        }
    }

    fn list_mut(&mut self, handle: NativeHandle) -> BridgeResult<&mut ListData> {
        match self.entry_mut(handle)? {
            Entry::List(list) => Ok(list),
            Entry::Object(_) => Err(BridgeError::NotAList(handle)),
        }
    }

    fn alloc(&mut self, entry: Entry, config: &HeapConfig) -> BridgeResult<NativeHandle> {
        if let Some(limit) = config.max_objects {
            if self.stats.live >= limit {
                return Err(BridgeError::HeapExhausted { limit });
            }
        }

        let reused = if config.reuse_slots { self.free.pop() } else { None };
        let handle = match reused {
            Some(slot) => {
                let cell = &mut self.slots[slot as usize];
                cell.entry = Some(entry);
                encode(slot, cell.generation)
            }
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 1,
                    entry: Some(entry),
                });
                encode(slot, 1)
            }
        };

        self.stats.live += 1;
        self.stats.created += 1;
        Ok(handle)
    }

    fn free(&mut self, handle: NativeHandle) -> BridgeResult<Entry> {
        self.entry(handle)?;
        let (slot, _) = decode(handle);
        let cell = &mut self.slots[slot];
        let entry = cell.entry.take().ok_or(BridgeError::StaleHandle(handle))?;
        cell.generation = cell.generation.wrapping_add(1).max(1);
        self.free.push(slot as u32);
        self.stats.live -= 1;
        self.stats.destroyed += 1;
        Ok(entry)
    }

    /// Class of a live element, `None` for null
    fn element_class(&self, element: NativeHandle) -> BridgeResult<Option<ClassId>> {
        if element.is_null() {
            return Ok(None);
        }
        Ok(Some(self.object(element)?.class))
    }
}

/// Reference [`NativeBoundary`] backed by process memory.
///
/// Lists hold references to their elements and never destroy them;
/// destroying an object also destroys the lists backing its many-valued
/// features. Many-valued features report `e_is_set` when explicitly set or
/// non-empty.
pub struct InMemoryHeap {
    package: Arc<Package>,
    config: HeapConfig,
    state: Mutex<HeapState>,
}

impl InMemoryHeap {
    /// Create a heap for the classes of `package`
    pub fn new(package: Arc<Package>) -> Self {
        Self::with_config(package, HeapConfig::default())
    }

    /// Create a heap with explicit settings
    pub fn with_config(package: Arc<Package>, config: HeapConfig) -> Self {
        Self {
            package,
            config,
            state: Mutex::new(HeapState::default()),
        }
    }

    /// The package this heap instantiates
    pub fn package(&self) -> &Arc<Package> {
        &self.package
    }

    /// Snapshot of the allocation counters
    pub fn stats(&self) -> HeapStats {
        self.state.lock().stats
    }

    /// True if `handle` refers to a live object or list
    pub fn is_live(&self, handle: NativeHandle) -> bool {
        self.state.lock().entry(handle).is_ok()
    }

    fn is_a(&self, class: ClassId, ancestor: ClassId) -> bool {
        self.package.is_a(class, ancestor)
    }

    fn class_name(&self, class: ClassId) -> String {
        self.package
            .class(class)
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| format!("#{}", class))
    }

    fn check_element(&self, state: &HeapState, list: &ListData, element: NativeHandle) -> BridgeResult<()> {
        if let Some(class) = state.element_class(element)? {
            if !self.is_a(class, list.element_class) {
                return Err(BridgeError::ClassMismatch {
                    expected: self.class_name(list.element_class),
                    got: self.class_name(class),
                });
            }
        }
        Ok(())
    }
}

impl NativeBoundary for InMemoryHeap {
    fn create(&self, class: ClassId) -> BridgeResult<NativeHandle> {
        let schema = self.package.require(class)?;
        if schema.is_abstract() {
            return Err(BridgeError::AbstractClass(schema.name().to_string()));
        }

        let mut state = self.state.lock();
        let mut values = Vec::with_capacity(schema.features().len());
        for feature in schema.features() {
            values.push(feature.default_value().clone());
        }
        let handle = state.alloc(
            Entry::Object(ObjectData {
                class,
                values,
                set: vec![false; schema.features().len()],
                initialized: false,
            }),
            &self.config,
        )?;

        // Back every many-valued feature with its own list
        for feature in schema.features() {
            if let FeatureKind::Reference {
                target, many: true, ..
            } = feature.kind()
            {
                let target = self.package.require_by_name(target)?.id();
                let list = match state.alloc(
                    Entry::List(ListData {
                        element_class: target,
                        items: Vec::new(),
                        owner: Some(handle),
                    }),
                    &self.config,
                ) {
                    Ok(list) => list,
                    Err(e) => {
                        destroy_object(&mut state, handle)?;
                        return Err(e);
                    }
                };
                state.object_mut(handle)?.values[feature.id().0 as usize] = AnyValue::List(list);
            }
        }

        tracing::debug!(class = schema.name(), handle = %handle, "heap: created object");
        Ok(handle)
    }

    fn destroy(&self, handle: NativeHandle) -> BridgeResult<()> {
        let mut state = self.state.lock();
        if let Entry::List(ListData { owner: Some(owner), .. }) = state.entry(handle)? {
            return Err(BridgeError::Native {
                code: HEAP_PROTOCOL_ERROR,
                message: format!("list {} is owned by object {}", handle, owner),
            });
        }
        destroy_object(&mut state, handle)?;
        tracing::debug!(handle = %handle, "heap: destroyed");
        Ok(())
    }

    fn upcast(&self, handle: NativeHandle) -> BridgeResult<NativeHandle> {
        self.state.lock().object(handle)?;
        Ok(handle)
    }

    fn initialize(&self, handle: NativeHandle) -> BridgeResult<()> {
        self.state.lock().object_mut(handle)?.initialized = true;
        Ok(())
    }

    fn copy(&self, handle: NativeHandle) -> BridgeResult<NativeHandle> {
        let (class, values, set, initialized) = {
            let state = self.state.lock();
            let object = state.object(handle)?;
            (
                object.class,
                object.values.clone(),
                object.set.clone(),
                object.initialized,
            )
        };

        let copy = self.create(class)?;
        let mut state = self.state.lock();
        for (index, value) in values.into_iter().enumerate() {
            match value {
                AnyValue::List(source) => {
                    let items = state.list(source)?.items.clone();
                    let target = match state.object(copy)?.values[index] {
                        AnyValue::List(target) => target,
                        _ => continue,
                    };
                    state.list_mut(target)?.items = items;
                }
                other => state.object_mut(copy)?.values[index] = other,
            }
        }
        let object = state.object_mut(copy)?;
        object.set = set;
        object.initialized = initialized;
        Ok(copy)
    }

    fn class_of(&self, handle: NativeHandle) -> BridgeResult<ClassId> {
        Ok(self.state.lock().object(handle)?.class)
    }

    fn e_get(&self, handle: NativeHandle, feature: FeatureId, _resolve: bool) -> BridgeResult<AnyValue> {
        let state = self.state.lock();
        let object = state.object(handle)?;
        self.package.require(object.class)?.feature(feature)?;
        Ok(object.values[feature.0 as usize].clone())
    }

    fn e_set(&self, handle: NativeHandle, feature: FeatureId, value: AnyValue) -> BridgeResult<()> {
        let mut state = self.state.lock();
        let class = state.object(handle)?.class;
        let schema = self.package.require(class)?.feature(feature)?;
        let kind = schema.value_kind();
        if !value.fits(kind) {
            return Err(BridgeError::type_mismatch(kind.name(), value.type_name()));
        }

        let index = feature.0 as usize;
        match schema.kind() {
            FeatureKind::Reference { target, many: false, .. } => {
                if let AnyValue::Object(referenced) = value {
                    let target = self.package.require_by_name(target)?.id();
                    if let Some(got) = state.element_class(referenced)? {
                        if !self.is_a(got, target) {
                            return Err(BridgeError::ClassMismatch {
                                expected: self.class_name(target),
                                got: self.class_name(got),
                            });
                        }
                    }
                }
                state.object_mut(handle)?.values[index] = value;
            }
            FeatureKind::Reference { many: true, .. } => {
                let backing = match state.object(handle)?.values[index] {
                    AnyValue::List(backing) => backing,
                    _ => return Err(BridgeError::NotAList(handle)),
                };
                let source = value.as_handle().unwrap_or(backing);
                if source != backing {
                    let items = state.list(source)?.items.clone();
                    let list = state.list(backing)?;
                    for item in &items {
                        self.check_element(&state, list, *item)?;
                    }
                    state.list_mut(backing)?.items = items;
                }
            }
            FeatureKind::Attribute(_) => state.object_mut(handle)?.values[index] = value,
        }
        state.object_mut(handle)?.set[index] = true;
        Ok(())
    }

    fn e_is_set(&self, handle: NativeHandle, feature: FeatureId) -> BridgeResult<bool> {
        let state = self.state.lock();
        let object = state.object(handle)?;
        self.package.require(object.class)?.feature(feature)?;
        let index = feature.0 as usize;
        if object.set[index] {
            return Ok(true);
        }
        match object.values[index] {
            AnyValue::List(list) => Ok(!state.list(list)?.items.is_empty()),
            _ => Ok(false),
        }
    }

    fn e_unset(&self, handle: NativeHandle, feature: FeatureId) -> BridgeResult<()> {
        let mut state = self.state.lock();
        let class = state.object(handle)?.class;
        let default = self
            .package
            .require(class)?
            .feature(feature)?
            .default_value()
            .clone();
        let index = feature.0 as usize;
        let object = state.object_mut(handle)?;
        object.set[index] = false;
        let backing = match object.values[index] {
            AnyValue::List(list) => Some(list),
            _ => None,
        };
        match backing {
            Some(list) => state.list_mut(list)?.items.clear(),
            None => state.object_mut(handle)?.values[index] = default,
        }
        Ok(())
    }

    fn create_list(&self, element_class: ClassId) -> BridgeResult<NativeHandle> {
        self.package.require(element_class)?;
        let handle = self.state.lock().alloc(
            Entry::List(ListData {
                element_class,
                items: Vec::new(),
                owner: None,
            }),
            &self.config,
        )?;
        tracing::debug!(handle = %handle, "heap: created list");
        Ok(handle)
    }

    fn list_size(&self, list: NativeHandle) -> BridgeResult<usize> {
        Ok(self.state.lock().list(list)?.items.len())
    }

    fn list_at(&self, list: NativeHandle, index: usize) -> BridgeResult<NativeHandle> {
        let state = self.state.lock();
        let items = &state.list(list)?.items;
        items
            .get(index)
            .copied()
            .ok_or(BridgeError::IndexOutOfRange {
                index,
                len: items.len(),
            })
    }

    fn list_push_back(&self, list: NativeHandle, element: NativeHandle) -> BridgeResult<()> {
        let mut state = self.state.lock();
        self.check_element(&state, state.list(list)?, element)?;
        state.list_mut(list)?.items.push(element);
        Ok(())
    }

    fn list_insert_at(&self, list: NativeHandle, position: usize, element: NativeHandle) -> BridgeResult<()> {
        let mut state = self.state.lock();
        let data = state.list(list)?;
        if position > data.items.len() {
            return Err(BridgeError::IndexOutOfRange {
                index: position,
                len: data.items.len(),
            });
        }
        self.check_element(&state, data, element)?;
        state.list_mut(list)?.items.insert(position, element);
        Ok(())
    }

    fn list_insert_all(&self, list: NativeHandle, other: NativeHandle) -> BridgeResult<()> {
        let mut state = self.state.lock();
        let source = state.list(other)?;
        let target = state.list(list)?;
        if !self.is_a(source.element_class, target.element_class) {
            return Err(BridgeError::ClassMismatch {
                expected: self.class_name(target.element_class),
                got: self.class_name(source.element_class),
            });
        }
        let items = source.items.clone();
        state.list_mut(list)?.items.extend(items);
        Ok(())
    }

    fn list_clear(&self, list: NativeHandle) -> BridgeResult<()> {
        self.state.lock().list_mut(list)?.items.clear();
        Ok(())
    }
}

/// Free an object (or free-standing list) and the lists backing its
/// many-valued features. Lists it merely refers to are left alone.
fn destroy_object(state: &mut HeapState, handle: NativeHandle) -> BridgeResult<()> {
    if let Entry::Object(object) = state.free(handle)? {
        for value in object.values {
            if let AnyValue::List(list) = value {
                let owned = matches!(
                    state.entry(list),
                    Ok(Entry::List(ListData { owner: Some(owner), .. })) if *owner == handle
                );
                if owned {
                    state.free(list)?;
                }
            }
        }
    }
    Ok(())
}

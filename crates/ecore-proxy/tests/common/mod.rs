//! Shared helpers for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ecore_proxy::{
    AnyValue, BridgeResult, ClassId, FeatureId, InMemoryHeap, NativeBoundary, NativeHandle,
};

/// Boundary that forwards to a heap and counts destroy calls per handle
pub struct CountingBoundary {
    pub heap: Arc<InMemoryHeap>,
    destroys: Mutex<HashMap<NativeHandle, usize>>,
    insert_alls: AtomicUsize,
}

impl CountingBoundary {
    pub fn new(heap: Arc<InMemoryHeap>) -> Self {
        Self {
            heap,
            destroys: Mutex::new(HashMap::new()),
            insert_alls: AtomicUsize::new(0),
        }
    }

    /// Number of destroy calls issued for `handle`
    pub fn destroy_count(&self, handle: NativeHandle) -> usize {
        self.destroys
            .lock()
            .unwrap()
            .get(&handle)
            .copied()
            .unwrap_or(0)
    }

    /// Number of `list_insert_all` calls that reached the boundary
    pub fn insert_all_calls(&self) -> usize {
        self.insert_alls.load(Ordering::SeqCst)
    }

    /// Total destroy calls issued
    pub fn total_destroys(&self) -> usize {
        self.destroys.lock().unwrap().values().sum()
    }
}

impl NativeBoundary for CountingBoundary {
    fn create(&self, class: ClassId) -> BridgeResult<NativeHandle> {
        self.heap.create(class)
    }
    fn destroy(&self, handle: NativeHandle) -> BridgeResult<()> {
        *self.destroys.lock().unwrap().entry(handle).or_insert(0) += 1;
        self.heap.destroy(handle)
    }
    fn upcast(&self, handle: NativeHandle) -> BridgeResult<NativeHandle> {
        self.heap.upcast(handle)
    }
    fn initialize(&self, handle: NativeHandle) -> BridgeResult<()> {
        self.heap.initialize(handle)
    }
    fn copy(&self, handle: NativeHandle) -> BridgeResult<NativeHandle> {
        self.heap.copy(handle)
    }
    fn class_of(&self, handle: NativeHandle) -> BridgeResult<ClassId> {
        self.heap.class_of(handle)
    }
    fn e_get(&self, handle: NativeHandle, feature: FeatureId, resolve: bool) -> BridgeResult<AnyValue> {
        self.heap.e_get(handle, feature, resolve)
    }
    fn e_set(&self, handle: NativeHandle, feature: FeatureId, value: AnyValue) -> BridgeResult<()> {
        self.heap.e_set(handle, feature, value)
    }
    fn e_is_set(&self, handle: NativeHandle, feature: FeatureId) -> BridgeResult<bool> {
        self.heap.e_is_set(handle, feature)
    }
    fn e_unset(&self, handle: NativeHandle, feature: FeatureId) -> BridgeResult<()> {
        self.heap.e_unset(handle, feature)
    }
    fn create_list(&self, element_class: ClassId) -> BridgeResult<NativeHandle> {
        self.heap.create_list(element_class)
    }
    fn list_size(&self, list: NativeHandle) -> BridgeResult<usize> {
        self.heap.list_size(list)
    }
    fn list_at(&self, list: NativeHandle, index: usize) -> BridgeResult<NativeHandle> {
        self.heap.list_at(list, index)
    }
    fn list_push_back(&self, list: NativeHandle, element: NativeHandle) -> BridgeResult<()> {
        self.heap.list_push_back(list, element)
    }
    fn list_insert_at(&self, list: NativeHandle, position: usize, element: NativeHandle) -> BridgeResult<()> {
        self.heap.list_insert_at(list, position, element)
    }
    fn list_insert_all(&self, list: NativeHandle, other: NativeHandle) -> BridgeResult<()> {
        self.insert_alls.fetch_add(1, Ordering::SeqCst);
        self.heap.list_insert_all(list, other)
    }
    fn list_clear(&self, list: NativeHandle) -> BridgeResult<()> {
        self.heap.list_clear(list)
    }
}

//! Integration tests for TypedCollection
//!
//! Tests cover:
//! - push_back / at / clear scenario
//! - insert_at bounds and ordering
//! - insert_all copying handles in order
//! - Element ownership unaffected by membership
//! - Element class checks
//! - Lists referenced by other objects outliving them

mod common;

use std::sync::Arc;

use common::CountingBoundary;
use ecore_proxy::model::{self, ListOptionsValues, LocalAccount, OptionValue};
use ecore_proxy::{
    AnyValue, Bridge, BridgeConfig, BridgeError, InMemoryHeap, Ownership, ProxyType,
    ReflectiveObject, TypedCollection,
};

fn bridge() -> (Bridge, Arc<InMemoryHeap>) {
    Bridge::in_memory(model::package().unwrap(), BridgeConfig::default())
}

fn option<'b>(bridge: &'b Bridge, name: &str) -> OptionValue<'b> {
    let option = OptionValue::new(bridge).unwrap();
    option.set_option_name(name).unwrap();
    option
}

#[test]
fn test_push_back_at_clear_scenario() {
    let (bridge, _heap) = bridge();
    let a = option(&bridge, "a");
    let b = option(&bridge, "b");

    let list = TypedCollection::<OptionValue>::new(&bridge).unwrap();
    assert_eq!(list.size().unwrap(), 0);
    assert!(list.is_empty().unwrap());

    list.push_back(&a).unwrap();
    assert_eq!(list.size().unwrap(), 1);
    list.push_back(&b).unwrap();
    assert_eq!(list.size().unwrap(), 2);

    let first = list.at(0).unwrap().unwrap();
    assert_eq!(first.proxy().raw_handle(), a.proxy().raw_handle());
    assert_eq!(first.ownership(), Ownership::Borrowed);
    assert_eq!(first.option_name().unwrap(), "a");
    drop(first);

    list.clear().unwrap();
    assert_eq!(list.size().unwrap(), 0);

    // Clearing neither released the list nor the elements
    assert!(list.proxy().is_owned());
    assert_eq!(a.option_name().unwrap(), "a");
    assert_eq!(b.option_name().unwrap(), "b");
}

#[test]
fn test_push_back_keeps_element_ownership() {
    let (bridge, heap) = bridge();
    let list = TypedCollection::<OptionValue>::new(&bridge).unwrap();
    let element = option(&bridge, "kept");

    list.push_back(&element).unwrap();
    assert!(element.is_owned());

    let handle = element.proxy().raw_handle();
    drop(list);
    // Destroying the list left its element alive
    assert!(heap.is_live(handle));
    assert_eq!(element.option_name().unwrap(), "kept");
}

#[test]
fn test_at_out_of_range() {
    let (bridge, _heap) = bridge();
    let list = TypedCollection::<OptionValue>::new(&bridge).unwrap();
    let a = option(&bridge, "a");
    list.push_back(&a).unwrap();

    assert!(list.at(0).unwrap().is_some());
    let err = list.at(1).unwrap_err();
    assert_eq!(err, BridgeError::IndexOutOfRange { index: 1, len: 1 });
}

#[test]
fn test_insert_at_positions() {
    let (bridge, _heap) = bridge();
    let list = TypedCollection::<OptionValue>::new(&bridge).unwrap();
    let a = option(&bridge, "a");
    let b = option(&bridge, "b");
    let c = option(&bridge, "c");

    list.insert_at(0, &b).unwrap();
    list.insert_at(0, &a).unwrap();
    list.insert_at(2, &c).unwrap();

    let names: Vec<String> = list
        .iter()
        .unwrap()
        .map(|item| item.unwrap().unwrap().option_name().unwrap())
        .collect();
    assert_eq!(names, ["a", "b", "c"]);

    let err = list.insert_at(4, &a).unwrap_err();
    assert_eq!(err, BridgeError::IndexOutOfRange { index: 4, len: 3 });
    assert_eq!(list.size().unwrap(), 3);
}

#[test]
fn test_insert_all_copies_in_order() {
    let (bridge, _heap) = bridge();
    let elements: Vec<_> = ["x", "y", "z"].iter().map(|n| option(&bridge, n)).collect();

    let source = TypedCollection::<OptionValue>::new(&bridge).unwrap();
    for element in &elements {
        source.push_back(element).unwrap();
    }

    let target = TypedCollection::<OptionValue>::new(&bridge).unwrap();
    target.insert_all(&source).unwrap();

    assert_eq!(target.size().unwrap(), source.size().unwrap());
    assert_eq!(target.handles().unwrap(), source.handles().unwrap());

    // The source is unaffected
    source.clear().unwrap();
    assert_eq!(target.size().unwrap(), 3);
}

#[test]
fn test_element_class_checked() {
    let (bridge, _heap) = bridge();
    let list = TypedCollection::<ReflectiveObject>::with_element_class(&bridge, "OptionValue").unwrap();
    let account = LocalAccount::new(&bridge).unwrap();

    let err = list.push_back(account.reflective()).unwrap_err();
    assert!(matches!(err, BridgeError::ClassMismatch { .. }));
    assert_eq!(list.size().unwrap(), 0);
}

fn counting_bridge(element_classes: bool) -> (Bridge, Arc<CountingBoundary>) {
    let package = model::package().unwrap();
    let heap = Arc::new(InMemoryHeap::new(package.clone()));
    let boundary = Arc::new(CountingBoundary::new(heap));
    let mut config = BridgeConfig::default();
    config.validation.element_classes = element_classes;
    let bridge = Bridge::with_config(boundary.clone(), package, config);
    (bridge, boundary)
}

#[test]
fn test_insert_all_checks_element_class() {
    let (bridge, boundary) = counting_bridge(true);
    let accounts = TypedCollection::<ReflectiveObject>::with_element_class(&bridge, "LocalAccount").unwrap();
    let account = LocalAccount::new(&bridge).unwrap();
    accounts.push_back(account.reflective()).unwrap();

    let options = TypedCollection::<ReflectiveObject>::with_element_class(&bridge, "OptionValue").unwrap();
    let err = options.insert_all(&accounts).unwrap_err();
    assert_eq!(
        err,
        BridgeError::ClassMismatch {
            expected: "OptionValue".to_string(),
            got: "LocalAccount".to_string(),
        }
    );
    // Rejected before reaching the boundary
    assert_eq!(boundary.insert_all_calls(), 0);
    assert_eq!(options.size().unwrap(), 0);
}

#[test]
fn test_insert_all_unchecked_defers_to_boundary() {
    let (bridge, boundary) = counting_bridge(false);
    let accounts = TypedCollection::<ReflectiveObject>::with_element_class(&bridge, "LocalAccount").unwrap();
    let options = TypedCollection::<ReflectiveObject>::with_element_class(&bridge, "OptionValue").unwrap();

    let err = options.insert_all(&accounts).unwrap_err();
    assert!(matches!(err, BridgeError::ClassMismatch { .. }));
    assert_eq!(boundary.insert_all_calls(), 1);
}

#[test]
fn test_owned_list_outlives_object_it_was_assigned_to() {
    let (bridge, heap) = bridge();
    let a = option(&bridge, "a");
    let list = TypedCollection::<OptionValue>::new(&bridge).unwrap();
    list.push_back(&a).unwrap();
    let handle = list.proxy().raw_handle();

    {
        let holder = ListOptionsValues::new(&bridge).unwrap();
        holder
            .e_set(model::list_options_values::OPTION_VALUES, AnyValue::List(handle))
            .unwrap();
        assert_eq!(holder.option_values().unwrap().size().unwrap(), 1);
    }

    // The holder copied the elements; the list itself still belongs to `list`
    assert!(heap.is_live(handle));
    assert_eq!(list.size().unwrap(), 1);
    assert!(list.release().unwrap());
    assert!(!heap.is_live(handle));
    assert!(heap.is_live(a.proxy().raw_handle()));
}

#[test]
fn test_typed_view_must_match_element_class() {
    let (bridge, _heap) = bridge();
    let err = TypedCollection::<OptionValue>::with_element_class(&bridge, "LocalAccount").unwrap_err();
    assert!(matches!(err, BridgeError::ClassMismatch { .. }));
}

#[test]
fn test_feature_backed_list() {
    let (bridge, heap) = bridge();
    let options = ListOptionsValues::new(&bridge).unwrap();
    let a = option(&bridge, "a");

    {
        let values = options.option_values().unwrap();
        assert_eq!(values.ownership(), Ownership::Borrowed);
        values.push_back(&a).unwrap();
    }
    assert!(options.e_is_set(model::list_options_values::OPTION_VALUES).unwrap());
    assert_eq!(options.option_values().unwrap().size().unwrap(), 1);

    // The backing list goes away with its object, not with the view
    let live = heap.stats().live;
    drop(options);
    assert_eq!(heap.stats().live, live - 2);
}

#[test]
fn test_release_list_invalidates_it() {
    let (bridge, _heap) = bridge();
    let list = TypedCollection::<OptionValue>::new(&bridge).unwrap();
    assert!(list.release().unwrap());
    assert_eq!(list.size(), Err(BridgeError::Released));
    assert!(!list.release().unwrap());
}

use core::any::Any;
use std::sync::Arc;
use std::thread;

use typebind_core::{
    AnyValue, Deserializer, ErrorNode, OptionalField, RawType, Registries, Serializer,
    TypeDescriptor, Typed, Value, downcast_ref, record,
};
use typebind_testhelpers::IPanic;
use typebind_value::value;

record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        tags: Vec<String>,
        parent: OptionalField<Box<Item>>,
    }
}

/// Accepts integers written as strings.
struct LenientI32;

impl Deserializer for LenientI32 {
    fn supports_for_deserialization(&self, ty: &TypeDescriptor) -> bool {
        ty.is::<i32>()
    }

    fn deserialize(&self, value: &Value, _: &TypeDescriptor, _: &Registries) -> Result<AnyValue, ErrorNode> {
        match value {
            Value::String(text) => text
                .parse::<i32>()
                .map(|n| Box::new(n) as AnyValue)
                .map_err(|e| ErrorNode::message(e.to_string())),
            other => Err(ErrorNode::message(format!("not a string: {other}"))),
        }
    }
}

impl Serializer for LenientI32 {
    fn supports_for_serialization(&self, raw: &RawType) -> bool {
        raw.is::<i32>()
    }

    fn serialize(&self, value: &dyn Any, _: &TypeDescriptor, _: &Registries) -> Result<Value, ErrorNode> {
        downcast_ref::<i32>(value).map(|n| Value::String(n.to_string()))
    }
}

#[test]
fn later_registration_wins() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let mut registries = Registries::with_builtins();
    registries.register(LenientI32);
    registries.seal();

    assert_eq!(registries.deserialize::<i32>(&value!("7"))?, 7);
    assert_eq!(registries.serialize(&7i32)?, value!("7"));
    // other integer types keep the builtin
    assert_eq!(registries.deserialize::<i64>(&value!(7))?, 7);
    Ok(())
}

#[test]
fn cleared_registries_convert_nothing() {
    typebind_testhelpers::setup();

    let mut registries = Registries::with_builtins();
    registries.clear();
    registries.register_deserializer(Arc::new(LenientI32));
    registries.seal();

    assert!(registries.supports_type(&i32::descriptor()));
    assert!(!registries.supports_type(&String::descriptor()));
    let err = registries.deserialize::<String>(&value!("x")).unwrap_err();
    assert!(err.has_internal());
    assert_eq!(err.to_string(), "internal error");
    assert!(registries.serializer(&i32::descriptor()).is_err());
}

#[test]
fn missing_component_converter_is_internal() {
    typebind_testhelpers::setup();

    let mut registries = Registries::new();
    registries.register(LenientI32);
    registries.seal();

    let err = registries
        .deserialize::<Item>(&value!({ "id": 1, "tags": [] }))
        .unwrap_err();
    assert!(err.has_internal());
    let internal = err.node().internal_errors();
    assert_eq!(
        internal[0].to_string(),
        "no converter registered for type u32"
    );
    assert_eq!(err.field_errors()[0].path_string(), "id");
}

#[test]
fn supports_type_needs_arguments_but_not_their_converters() {
    typebind_testhelpers::setup();

    let registries = {
        let mut registries = Registries::with_builtins();
        registries.seal();
        registries
    };

    assert!(registries.supports_type(&Vec::<i32>::descriptor()));
    assert!(!registries.supports_type(&TypeDescriptor::unparameterized::<Vec<i32>>()));
    assert!(registries.supports_type(&TypeDescriptor::with_wildcards::<Vec<i32>>()));
    assert!(registries.supports_type(&Item::descriptor()));

    #[derive(Debug)]
    struct Unknown;
    impl Typed for Unknown {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::raw(RawType::of::<Unknown>("Unknown"))
        }
    }
    assert!(!registries.supports_type(&Unknown::descriptor()));
    assert!(registries.supports_type(&Vec::<Unknown>::descriptor()));

    // the failure surfaces on use instead
    let err = registries
        .deserialize::<Vec<Unknown>>(&value!([]))
        .unwrap_err();
    assert!(err.has_internal());
}

#[test]
#[should_panic(expected = "registry is already sealed")]
fn registering_after_seal_panics() {
    typebind_testhelpers::setup();

    let mut registries = Registries::with_builtins();
    registries.seal();
    registries.register(LenientI32);
}

#[test]
#[should_panic(expected = "registry is not sealed yet")]
fn resolving_before_seal_panics() {
    typebind_testhelpers::setup();

    let registries = Registries::with_builtins();
    let _ = registries.deserialize::<i32>(&value!(1));
}

#[test]
fn sealing_twice_is_allowed() {
    typebind_testhelpers::setup();

    let mut registries = Registries::with_builtins();
    registries.seal();
    registries.seal();
    assert!(registries.is_sealed());
}

#[test]
fn resolution_is_stable() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let mut registries = Registries::with_builtins();
    registries.seal();

    let ty = Item::descriptor();
    let first = registries.deserializer(&ty)?;
    let second = registries.deserializer(&ty)?;
    assert!(Arc::ptr_eq(&first, &second));

    let list = registries.deserializer(&Vec::<String>::descriptor())?;
    assert!(Arc::ptr_eq(&list, &registries.deserializer(&Vec::<String>::descriptor())?));
    Ok(())
}

#[test]
fn concurrent_first_use() {
    typebind_testhelpers::setup();

    let mut registries = Registries::with_builtins();
    registries.seal();
    let registries = &registries;

    let json = value!({ "id": 2, "tags": ["a"], "parent": { "id": 1, "tags": [] } });
    let json = &json;

    thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(move || {
                    let item: Item = registries.deserialize(json).unwrap();
                    let back = registries.serialize(&item).unwrap();
                    (item.id, back)
                })
            })
            .collect();
        for handle in handles {
            let (id, back) = handle.join().unwrap();
            assert_eq!(id, 2);
            assert_eq!(&back, json);
        }
    });

    let converters: Vec<_> = (0..2)
        .map(|_| registries.deserializer(&Item::descriptor()).unwrap())
        .collect();
    assert!(Arc::ptr_eq(&converters[0], &converters[1]));
}

use core::any::Any;
use std::collections::BTreeMap;

use time::macros::{date, datetime, time};
use time::{Date, PrimitiveDateTime, Time};
use typebind_core::{
    AnyValue, Def, Deserializer, ErrorNode, RawType, Registries, Serializer, TypeDescriptor, Typed,
    Value, downcast_ref,
};
use typebind_testhelpers::IPanic;
use typebind_value::value;

fn sealed() -> Registries {
    let mut registries = Registries::with_builtins();
    registries.seal();
    registries
}

#[test]
fn booleans_and_strings() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let registries = sealed();
    assert!(registries.deserialize::<bool>(&value!(true))?);
    assert_eq!(registries.deserialize::<String>(&value!("hi"))?, "hi");
    assert_eq!(
        registries.deserialize::<bool>(&value!("true")).unwrap_err().to_string(),
        r#"expected boolean, found: "true""#
    );
    assert_eq!(
        registries.deserialize::<String>(&value!(1)).unwrap_err().to_string(),
        "expected string, found: 1"
    );
    assert_eq!(registries.serialize(&false)?, Value::Bool(false));
    Ok(())
}

#[test]
fn integers_check_range_and_reject_fractions() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let registries = sealed();
    assert_eq!(registries.deserialize::<u8>(&value!(255))?, 255);
    assert_eq!(registries.deserialize::<i64>(&value!((-9)))?, -9);
    assert_eq!(registries.deserialize::<u64>(&value!(u64::MAX))?, u64::MAX);

    assert_eq!(
        registries.deserialize::<u8>(&value!(256)).unwrap_err().to_string(),
        "value out of range for u8: 256"
    );
    assert_eq!(
        registries.deserialize::<u32>(&value!((-1))).unwrap_err().to_string(),
        "value out of range for u32: -1"
    );
    assert_eq!(
        registries.deserialize::<i32>(&value!(1.5)).unwrap_err().to_string(),
        "expected integer, found: 1.5"
    );
    assert_eq!(registries.serialize(&300u16)?.to_string(), "300");
    Ok(())
}

#[test]
fn floats_accept_integers() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let registries = sealed();
    assert_eq!(registries.deserialize::<f64>(&value!(2))?, 2.0);
    assert_eq!(registries.deserialize::<f32>(&value!(0.5))?, 0.5);
    assert!(registries.deserialize::<f32>(&value!(1e300)).is_err());
    assert_eq!(registries.serialize(&1.5f64)?.to_string(), "1.5");
    assert!(registries.serialize(&f64::NAN).is_err());
    Ok(())
}

#[test]
fn dates_and_times() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let registries = sealed();
    assert_eq!(
        registries.deserialize::<Date>(&value!("2024-02-29"))?,
        date!(2024 - 02 - 29)
    );
    assert_eq!(registries.deserialize::<Time>(&value!("10:15"))?, time!(10:15));
    assert_eq!(
        registries.deserialize::<PrimitiveDateTime>(&value!("2024-02-29T10:15:30.25"))?,
        datetime!(2024-02-29 10:15:30.25)
    );

    assert!(registries.deserialize::<Date>(&value!("2023-02-29")).is_err());
    assert_eq!(
        registries.deserialize::<Date>(&value!(20240229)).unwrap_err().to_string(),
        "expected string, found: 20240229"
    );

    assert_eq!(registries.serialize(&date!(2024 - 01 - 05))?, value!("2024-01-05"));
    assert_eq!(registries.serialize(&time!(08:00))?, value!("08:00:00"));
    assert_eq!(
        registries.serialize(&datetime!(2024-01-05 08:00:00.5))?,
        value!("2024-01-05T08:00:00.5")
    );
    Ok(())
}

#[test]
fn lists_convert_element_by_element() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let registries = sealed();
    assert_eq!(registries.deserialize::<Vec<i32>>(&value!([1, 2, 3]))?, [1, 2, 3]);
    assert_eq!(registries.serialize(&Vec::<i32>::new())?.to_string(), "[]");
    assert_eq!(registries.serialize(&vec![1, 2, 3])?.to_string(), "[1,2,3]");

    let err = registries
        .deserialize::<Vec<i32>>(&value!(["x", 2, "y"]))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "[0]: expected number, found: \"x\"\n[2]: expected number, found: \"y\""
    );

    let err = registries
        .deserialize::<Vec<Vec<bool>>>(&value!([[true], [false, 1]]))
        .unwrap_err();
    assert_eq!(err.to_string(), "[1][1]: expected boolean, found: 1");
    Ok(())
}

#[test]
fn maps_use_typed_keys() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let registries = sealed();
    let map: BTreeMap<String, i32> = registries.deserialize(&value!({ "a": 1, "b": 2 }))?;
    assert_eq!(map.get("b"), Some(&2));
    assert_eq!(registries.serialize(&map)?.to_string(), r#"{"a":1,"b":2}"#);

    let err = registries
        .deserialize::<BTreeMap<String, i32>>(&value!({ "a": "1" }))
        .unwrap_err();
    assert_eq!(err.to_string(), r#"a: expected number, found: "1""#);

    let err = registries
        .deserialize::<BTreeMap<i32, String>>(&value!({ "1": "one" }))
        .unwrap_err();
    assert_eq!(err.to_string(), r#"1: expected number, found: "1""#);

    let numeric_keys = BTreeMap::from([(1, "one".to_owned())]);
    let err = registries.serialize(&numeric_keys).unwrap_err();
    assert_eq!(err.to_string(), "entry[0]: map key must serialize to a string, found: 1");
    Ok(())
}

#[test]
fn map_entries_report_key_and_value() {
    typebind_testhelpers::setup();

    let registries = sealed();
    let err = registries
        .deserialize::<BTreeMap<i32, i32>>(&value!({ "x": "y", "2": 2 }))
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @r#"
    x: expected number, found: "x"
    x: expected number, found: "y"
    2: expected number, found: "2"
    "#);
}

/// A key type whose string form drops the distinguishing number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Bucket(u8);

impl Typed for Bucket {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::raw(RawType::of::<Bucket>("Bucket")).with_def(Def::Scalar)
    }
}

struct BucketConverter;

impl Deserializer for BucketConverter {
    fn supports_for_deserialization(&self, ty: &TypeDescriptor) -> bool {
        ty.is::<Bucket>()
    }

    fn deserialize(&self, _: &Value, _: &TypeDescriptor, _: &Registries) -> Result<AnyValue, ErrorNode> {
        Ok(Box::new(Bucket(0)))
    }
}

impl Serializer for BucketConverter {
    fn supports_for_serialization(&self, raw: &RawType) -> bool {
        raw.is::<Bucket>()
    }

    fn serialize(&self, value: &dyn Any, _: &TypeDescriptor, _: &Registries) -> Result<Value, ErrorNode> {
        downcast_ref::<Bucket>(value).map(|_| value!("same"))
    }
}

#[test]
fn colliding_map_keys_are_rejected() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let mut registries = Registries::with_builtins();
    registries.register(BucketConverter);
    registries.seal();

    let single = BTreeMap::from([(Bucket(1), 10)]);
    assert_eq!(registries.serialize(&single)?.to_string(), r#"{"same":10}"#);

    let colliding = BTreeMap::from([(Bucket(1), 10), (Bucket(2), 20)]);
    let err = registries.serialize(&colliding).unwrap_err();
    assert_eq!(err.to_string(), "same: duplicate map key after serialization");
    Ok(())
}

#[test]
fn raw_values_pass_through() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let registries = sealed();
    let raw = value!({ "anything": [1, null, { "x": true }] });
    assert_eq!(registries.deserialize::<Value>(&raw)?, raw);
    assert_eq!(registries.serialize(&raw)?, raw);
    Ok(())
}

#[test]
fn boxes_are_transparent() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let registries = sealed();
    assert_eq!(registries.deserialize::<Box<i32>>(&value!(4))?, Box::new(4));
    assert_eq!(registries.serialize(&Box::new("s".to_owned()))?, value!("s"));
    Ok(())
}

use std::collections::BTreeMap;

use time::Date;
use time::macros::date;
use typebind_core::{
    NullableField, OptionalField, RawType, RecordOptions, TypeDescriptor, Typed, record,
};
use typebind_json::{Error, JsonConfig, JsonEngine};
use typebind_testhelpers::IPanic;
use typebind_value::value;

record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }
}

record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Order {
        id: u64,
        placed: Date,
        points: Vec<Point>,
        labels: BTreeMap<String, String>,
        note: NullableField<String>,
        coupon: OptionalField<String>,
    }
}

/// Has no converter of its own.
#[derive(Debug)]
struct Opaque;

impl Typed for Opaque {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::raw(RawType::of::<Opaque>("Opaque"))
    }
}

record! {
    #[derive(Debug)]
    struct HoldsOpaque {
        opaque: Opaque,
    }
}

fn engine() -> JsonEngine {
    let mut engine = JsonEngine::new();
    engine.seal();
    engine
}

#[test]
fn point_round_trip() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let engine = engine();
    let point: Point = engine.deserialize_str(r#"{"x":1,"y":2}"#)?;
    assert_eq!(point, Point { x: 1, y: 2 });
    assert_eq!(engine.serialize_to_string(&point)?, r#"{"x":1,"y":2}"#);
    Ok(())
}

#[test]
fn field_errors_are_client_errors() {
    typebind_testhelpers::setup();

    let engine = engine();
    let err = engine
        .deserialize_str::<Point>(r#"{"x": "1", "z": 3}"#)
        .unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(err.code(), "json::deserialize");
    let Error::Deserialize(inner) = &err else {
        panic!("expected a deserialize error, got {err:?}");
    };
    let fields: Vec<_> = inner
        .field_errors()
        .iter()
        .map(|e| (e.path_string(), e.message.clone()))
        .collect();
    assert_eq!(
        fields,
        [
            ("x".to_owned(), r#"expected number, found: "1""#.to_owned()),
            ("y".to_owned(), "missing property".to_owned()),
            ("z".to_owned(), "unexpected property".to_owned()),
        ]
    );
}

#[test]
fn syntax_errors_are_client_errors() {
    typebind_testhelpers::setup();

    let engine = engine();
    let err = engine.deserialize_str::<Vec<i32>>("[\n123,\n]").unwrap_err();
    assert!(matches!(err, Error::Syntax(_)));
    assert!(err.is_client_error());
    assert_eq!(err.code(), "json::syntax");
    assert_eq!(err.to_string(), "syntax error in JSON at line 3, column 1");

    let err = engine.deserialize_slice::<Vec<i32>>(b"").unwrap_err();
    assert_eq!(err.to_string(), "no JSON to deserialize");
}

#[test]
fn unregistered_types_are_server_errors() {
    typebind_testhelpers::setup();

    let engine = engine();
    let err = engine.deserialize_str::<Opaque>("{}").unwrap_err();
    assert!(matches!(err, Error::NotRegistered(_)));
    assert!(!err.is_client_error());
    assert_eq!(err.to_string(), "no converter registered for type Opaque");

    // below the top level the failure is an internal leaf
    let err = engine
        .deserialize_str::<HoldsOpaque>(r#"{"opaque": 1}"#)
        .unwrap_err();
    assert!(matches!(err, Error::Deserialize(_)));
    assert!(!err.is_client_error());
    assert_eq!(err.to_string(), "opaque: internal error");

    assert!(!engine.supports_type(&Opaque::descriptor()));
    assert!(engine.supports_type(&HoldsOpaque::descriptor()));
}

#[test]
fn nested_documents_round_trip() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let engine = engine();
    let order = Order {
        id: u64::MAX,
        placed: date!(2024 - 03 - 01),
        points: vec![Point { x: 1, y: 2 }, Point { x: -3, y: 4 }],
        labels: BTreeMap::from([("k".to_owned(), "v".to_owned())]),
        note: NullableField::Null,
        coupon: OptionalField::Absent,
    };
    let json = engine.serialize_to_string(&order)?;
    assert_eq!(
        json,
        r#"{"id":18446744073709551615,"placed":"2024-03-01","points":[{"x":1,"y":2},{"x":-3,"y":4}],"labels":{"k":"v"},"note":null}"#
    );
    assert_eq!(engine.deserialize_str::<Order>(&json)?, order);

    let with_coupon = Order {
        note: NullableField::Present("n".to_owned()),
        coupon: OptionalField::Present("c".to_owned()),
        ..order
    };
    let json = engine.serialize_to_value(&with_coupon)?;
    assert_eq!(json.as_object().and_then(|o| o.get("coupon")), Some(&value!("c")));
    assert_eq!(engine.deserialize_value::<Order>(&json)?, with_coupon);
    Ok(())
}

#[test]
fn nested_errors_carry_full_paths() {
    typebind_testhelpers::setup();

    let engine = engine();
    let err = engine
        .deserialize_str::<Order>(
            r#"{
                "id": -1,
                "placed": "2024-13-01",
                "points": [{"x": 1, "y": 2}, {"x": 1.5}],
                "labels": {"k": 1},
                "note": null,
                "coupon": null
            }"#,
        )
        .unwrap_err();
    let paths: Vec<_> = match &err {
        Error::Deserialize(e) => e.field_errors().iter().map(|e| e.path_string()).collect(),
        other => panic!("unexpected error {other:?}"),
    };
    assert_eq!(
        paths,
        ["id", "placed", "points[1].x", "points[1].y", "labels.k", "coupon"]
    );
}

#[test]
fn ignore_unknown_properties_from_config() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let mut engine = JsonEngine::with_config(JsonConfig {
        ignore_unknown_properties: true,
        ..JsonConfig::default()
    });
    engine.seal();
    let point: Point = engine.deserialize_str(r#"{"x":1,"y":2,"extra":[]}"#)?;
    assert_eq!(point, Point { x: 1, y: 2 });
    Ok(())
}

#[test]
fn per_record_override_beats_config() {
    typebind_testhelpers::setup();

    let mut engine = JsonEngine::with_config(JsonConfig {
        ignore_unknown_properties: true,
        ..JsonConfig::default()
    });
    engine.set_record_options_for::<Point>(RecordOptions::default());
    engine.seal();
    let err = engine
        .deserialize_str::<Point>(r#"{"x":1,"y":2,"extra":[]}"#)
        .unwrap_err();
    assert_eq!(err.to_string(), "extra: unexpected property");
}

#[test]
fn pretty_output() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let mut engine = JsonEngine::with_config(JsonConfig {
        pretty: true,
        ..JsonConfig::default()
    });
    engine.seal();
    insta::assert_snapshot!(engine.serialize_to_string(&Point { x: 1, y: 2 })?, @r#"
    {
      "x": 1,
      "y": 2
    }
    "#);
    Ok(())
}

#[test]
fn writes_and_reads_streams() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let engine = engine();
    let mut out = Vec::new();
    engine.write_to(&vec![Point { x: 5, y: 6 }], &mut out)?;
    // the writer is still usable afterwards
    out.extend_from_slice(b"\n");
    assert_eq!(out, b"[{\"x\":5,\"y\":6}]\n");

    let back: Vec<Point> = engine.deserialize_reader(out.as_slice())?;
    assert_eq!(back, [Point { x: 5, y: 6 }]);
    Ok(())
}

#[test]
fn dynamic_conversion() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let engine = engine();
    let ty = Vec::<Point>::descriptor();
    let any = engine.deserialize_str_dyn(r#"[{"x":1,"y":1}]"#, &ty)?;
    let points = any.downcast_ref::<Vec<Point>>().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(
        engine.serialize_to_value_dyn(points, &ty)?,
        value!([{ "x": 1, "y": 1 }])
    );
    Ok(())
}

#[test]
#[should_panic(expected = "cannot deserialize into non-concrete type")]
fn dynamic_conversion_requires_concrete_types() {
    typebind_testhelpers::setup();

    let engine = engine();
    let ty = TypeDescriptor::applied(
        *Vec::<i32>::descriptor().raw_type().unwrap(),
        vec![TypeDescriptor::variable("T")],
    );
    let _ = engine.deserialize_str_dyn("[]", &ty);
}

#[test]
fn concurrent_use_of_a_sealed_engine() {
    typebind_testhelpers::setup();

    let engine = engine();
    let engine = &engine;
    std::thread::scope(|scope| {
        for i in 0..8 {
            scope.spawn(move || {
                let text = format!(r#"{{"x":{i},"y":{}}}"#, i * 2);
                let point: Point = engine.deserialize_str(&text).unwrap();
                assert_eq!(point, Point { x: i, y: i * 2 });
                assert_eq!(engine.serialize_to_string(&point).unwrap(), text);
            });
        }
    });
}

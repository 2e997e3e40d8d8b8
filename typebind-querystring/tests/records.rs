use core::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use time::macros::date;
use typebind_core::{
    AnyValue, Components, ConstructError, OptionalField, RawType, Record, RecordShape,
    TypeDescriptor, Typed, record,
};
use typebind_querystring::{
    Error, FromStringParser, FromStringParserRegistry, ParseError, QuerystringParserRegistry,
    parse_querystring,
};
use typebind_testhelpers::IPanic;

record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Search {
        x: i32,
        y: i32,
        name: String,
        limit: OptionalField<u32>,
    }
}

record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Report {
        from: time::Date,
        verbose: bool,
    }
}

record! {
    #[derive(Debug)]
    struct WithList {
        ids: Vec<i32>,
    }
}

fn registry() -> QuerystringParserRegistry {
    let mut registry = QuerystringParserRegistry::new();
    registry.seal();
    registry
}

fn fields(err: &Error) -> Vec<(String, String)> {
    match err {
        Error::Parameters(e) => e
            .fields()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        other => panic!("expected parameter errors, got {other:?}"),
    }
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

#[test]
fn parses_every_component() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let registry = registry();
    let search: Search =
        registry.parse(&parse_querystring([("x", "5"), ("y", "-7"), ("name", "a b")]))?;
    assert_eq!(
        search,
        Search {
            x: 5,
            y: -7,
            name: "a b".to_owned(),
            limit: OptionalField::Absent,
        }
    );

    let search: Search = registry.parse(&parse_querystring(pairs(&[
        ("x", "+5"),
        ("y", "0"),
        ("name", ""),
        ("limit", "10"),
    ])))?;
    assert_eq!(search.x, 5);
    assert_eq!(search.name, "");
    assert_eq!(search.limit, OptionalField::Present(10));
    Ok(())
}

#[test]
fn integers_are_parsed_strictly() {
    typebind_testhelpers::setup();

    let registry = registry();
    for bad in ["5 ", " 5", "5a", "", "1.0"] {
        let err = registry
            .parse::<Search>(&parse_querystring([("x", bad), ("y", "1"), ("name", "n")]))
            .unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(
            fields(&err),
            [("x".to_owned(), format!("expected integer, found: {bad:?}"))]
        );
    }
}

#[test]
fn missing_parameters_are_reported() {
    typebind_testhelpers::setup();

    let registry = registry();
    let err = registry
        .parse::<Search>(&parse_querystring([("x", "5"), ("name", "n")]))
        .unwrap_err();
    assert_eq!(err.code(), "querystring::parameters");
    assert_eq!(err.to_string(), "y: missing parameter");
}

#[test]
fn unexpected_parameters_are_reported() {
    typebind_testhelpers::setup();

    let registry = registry();
    let err = registry
        .parse::<Search>(&parse_querystring([
            ("x", "5"),
            ("y", "6"),
            ("name", "n"),
            ("z", "7"),
        ]))
        .unwrap_err();
    assert_eq!(err.to_string(), "z: unexpected parameter");
}

#[test]
fn all_failures_are_collected() {
    typebind_testhelpers::setup();

    let registry = registry();
    let err = registry
        .parse::<Search>(&parse_querystring([("x", "five"), ("limit", "-1"), ("sort", "asc")]))
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @r#"
    limit: expected integer, found: "-1"
    name: missing parameter
    sort: unexpected parameter
    x: expected integer, found: "five"
    y: missing parameter
    "#);
}

#[test]
fn duplicates_take_precedence() {
    typebind_testhelpers::setup();

    let registry = registry();
    let parameters = parse_querystring([("x", "1"), ("x", "oops"), ("y", "bad"), ("name", "n")]);
    assert_eq!(parameters.values().get("x").map(String::as_str), Some("oops"));
    assert!(parameters.duplicates().contains("x"));

    let err = registry.parse::<Search>(&parameters).unwrap_err();
    assert_eq!(
        fields(&err),
        [
            ("x".to_owned(), "duplicate parameter".to_owned()),
            ("y".to_owned(), r#"expected integer, found: "bad""#.to_owned()),
        ]
    );

    // a repeated parameter fails even when the last value would parse
    let err = registry
        .parse::<Search>(&parse_querystring([("x", "1"), ("x", "2"), ("y", "3"), ("name", "n")]))
        .unwrap_err();
    assert_eq!(err.to_string(), "x: duplicate parameter");
}

#[test]
fn dates_and_booleans() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let registry = registry();
    let report: Report =
        registry.parse(&parse_querystring([("from", "2024-02-29"), ("verbose", "true")]))?;
    assert_eq!(
        report,
        Report {
            from: date!(2024 - 02 - 29),
            verbose: true,
        }
    );

    let err = registry
        .parse::<Report>(&parse_querystring([("from", "2023-02-29"), ("verbose", "yes")]))
        .unwrap_err();
    let fields = fields(&err);
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].0, "from");
    assert_eq!(fields[1], ("verbose".to_owned(), r#"expected true or false, found: "yes""#.to_owned()));
    Ok(())
}

/// Rejects an inverted range as a whole.
#[derive(Debug, Clone, PartialEq)]
struct Range {
    min: i32,
    max: i32,
}

impl Typed for Range {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::record::<Self>(RawType::of::<Range>("Range"), Vec::new())
    }
}

impl Record for Range {
    fn shape() -> RecordShape {
        RecordShape::new(&[])
            .component("min", i32::descriptor())
            .component("max", i32::descriptor())
    }

    fn construct(components: &mut Components) -> Result<Self, ConstructError> {
        let min: i32 = components.take()?;
        let max: i32 = components.take()?;
        if min > max {
            return Err(ConstructError::invalid("min must not exceed max"));
        }
        Ok(Range { min, max })
    }

    fn components(&self) -> Vec<Option<&dyn Any>> {
        vec![Some(&self.min), Some(&self.max)]
    }
}

#[test]
fn constructor_rejection_is_reported_at_the_root() {
    typebind_testhelpers::setup();

    let registry = registry();
    let err = registry
        .parse::<Range>(&parse_querystring([("min", "3"), ("max", "1")]))
        .unwrap_err();
    assert_eq!(
        fields(&err),
        [("(root)".to_owned(), "min must not exceed max".to_owned())]
    );
}

#[derive(Debug, Clone, PartialEq)]
struct Pair<A, B> {
    a: A,
    b: B,
}

impl<A: Typed, B: Typed> Typed for Pair<A, B> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::record::<Self>(
            RawType::of::<Pair<(), ()>>("Pair"),
            vec![A::descriptor(), B::descriptor()],
        )
    }
}

impl<A: Typed, B: Typed> Record for Pair<A, B> {
    fn shape() -> RecordShape {
        RecordShape::new(&["A", "B"])
            .component("a", TypeDescriptor::variable("A"))
            .component("b", TypeDescriptor::variable("B"))
    }

    fn component_types() -> Vec<TypeDescriptor> {
        vec![A::descriptor(), B::descriptor()]
    }

    fn construct(components: &mut Components) -> Result<Self, ConstructError> {
        Ok(Pair {
            a: components.take()?,
            b: components.take()?,
        })
    }

    fn components(&self) -> Vec<Option<&dyn Any>> {
        vec![Some(&self.a), Some(&self.b)]
    }
}

#[test]
fn generic_records_share_one_generated_parser() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let registry = registry();
    let params = parse_querystring([("a", "1"), ("b", "two")]);
    let pair: Pair<u8, String> = registry.parse(&params)?;
    assert_eq!(pair, Pair { a: 1, b: "two".to_owned() });

    let err = registry.parse::<Pair<String, u8>>(&params).unwrap_err();
    assert_eq!(err.to_string(), r#"b: expected integer, found: "two""#);

    let first = registry.get(&Pair::<u8, String>::descriptor())?;
    let second = registry.get(&Pair::<String, u8>::descriptor())?;
    assert!(Arc::ptr_eq(&first, &second));
    Ok(())
}

#[test]
fn unsupported_types() {
    typebind_testhelpers::setup();

    let registry = registry();

    // no parser at the top level is a configuration problem
    let err = registry
        .parse::<Vec<i32>>(&parse_querystring([("ids", "1")]))
        .unwrap_err();
    assert!(matches!(err, Error::NotRegistered(_)));
    assert!(!err.is_client_error());
    assert_eq!(err.code(), "querystring::not_registered");
    assert!(!registry.supports_type(&Vec::<i32>::descriptor()));

    // for a component it is hidden behind a generic message
    let err = registry
        .parse::<WithList>(&parse_querystring([("ids", "1")]))
        .unwrap_err();
    assert_eq!(err.to_string(), "ids: parse error");
    assert!(registry.supports_type(&WithList::descriptor()));
}

/// Accepts surrounding whitespace.
struct LenientI32;

impl FromStringParser for LenientI32 {
    fn supports_type(&self, ty: &TypeDescriptor) -> bool {
        ty.is::<i32>()
    }

    fn parse_from_string(
        &self,
        text: &str,
        _ty: &TypeDescriptor,
        _parsers: &FromStringParserRegistry,
    ) -> Result<AnyValue, ParseError> {
        let value: i32 = text
            .trim()
            .parse()
            .map_err(|_| ParseError::invalid("not a number"))?;
        Ok(Box::new(value))
    }

    fn parse_from_absent_string(
        &self,
        _ty: &TypeDescriptor,
        _parsers: &FromStringParserRegistry,
    ) -> Result<AnyValue, ParseError> {
        Ok(Box::new(0_i32))
    }
}

#[test]
fn custom_parsers_take_precedence() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let mut registry = QuerystringParserRegistry::new();
    registry.from_string_parsers_mut().register(LenientI32);
    registry.seal();

    let search: Search = registry.parse(&parse_querystring([("x", " 5 "), ("name", "n")]))?;
    assert_eq!((search.x, search.y), (5, 0));

    let mut params = BTreeMap::new();
    params.insert("x".to_owned(), "x".to_owned());
    params.insert("name".to_owned(), "n".to_owned());
    let err = registry.parse_map::<Search>(&params).unwrap_err();
    assert_eq!(err.to_string(), "x: not a number");
    Ok(())
}

#[test]
#[should_panic(expected = "querystring parser registry is not sealed yet")]
fn parsing_requires_a_sealed_registry() {
    typebind_testhelpers::setup();

    let registry = QuerystringParserRegistry::new();
    let _ = registry.parse::<Search>(&parse_querystring([("x", "1")]));
}

#[test]
fn concurrent_parsing() {
    typebind_testhelpers::setup();

    let registry = registry();
    let registry = &registry;
    std::thread::scope(|scope| {
        for i in 0..8 {
            scope.spawn(move || {
                let x = i.to_string();
                let search: Search = registry
                    .parse(&parse_querystring([("x", x.as_str()), ("y", "1"), ("name", "n")]))
                    .unwrap();
                assert_eq!(search.x, i);
            });
        }
    });
}

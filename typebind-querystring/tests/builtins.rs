use time::macros::date;
use typebind_core::{OptionalField, Typed};
use typebind_querystring::{FromStringParserRegistry, ParseError};
use typebind_testhelpers::IPanic;

fn parsers() -> FromStringParserRegistry {
    let mut parsers = FromStringParserRegistry::with_builtins();
    parsers.seal();
    parsers
}

fn message(error: ParseError) -> String {
    match error {
        ParseError::Invalid(message) => message,
        ParseError::Internal(source) => panic!("unexpected internal error: {source}"),
    }
}

#[test]
fn integers() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let parsers = parsers();
    assert_eq!(parsers.parse::<u8>("255")?, 255);
    assert_eq!(parsers.parse::<i64>("+42")?, 42);
    assert_eq!(parsers.parse::<i16>("-32768")?, i16::MIN);
    assert_eq!(
        message(parsers.parse::<u8>("256").unwrap_err()),
        "value out of range for u8: 256"
    );
    assert_eq!(
        message(parsers.parse::<i8>("-129").unwrap_err()),
        "value out of range for i8: -129"
    );
    assert_eq!(
        message(parsers.parse::<u32>("0x10").unwrap_err()),
        r#"expected integer, found: "0x10""#
    );
    Ok(())
}

#[test]
fn strings_booleans_and_dates() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let parsers = parsers();
    assert_eq!(parsers.parse::<String>(" as is ")?, " as is ");
    assert!(parsers.parse::<bool>("true")?);
    assert!(!parsers.parse::<bool>("false")?);
    assert_eq!(
        message(parsers.parse::<bool>("True").unwrap_err()),
        r#"expected true or false, found: "True""#
    );
    assert_eq!(parsers.parse::<time::Date>("1999-12-31")?, date!(1999 - 12 - 31));
    assert!(parsers.parse::<time::Date>("31.12.1999").is_err());
    Ok(())
}

#[test]
fn optional_fields() -> Result<(), IPanic> {
    typebind_testhelpers::setup();

    let parsers = parsers();
    assert_eq!(
        parsers.parse::<OptionalField<i32>>("7")?,
        OptionalField::Present(7)
    );

    let ty = OptionalField::<i32>::descriptor();
    let absent = parsers.get(&ty)?.parse_from_absent_string(&ty, &parsers)?;
    assert_eq!(
        absent.downcast_ref::<OptionalField<i32>>(),
        Some(&OptionalField::Absent)
    );

    // other types have no absent state
    let ty = i32::descriptor();
    let err = parsers
        .get(&ty)?
        .parse_from_absent_string(&ty, &parsers)
        .unwrap_err();
    assert_eq!(message(err), "missing parameter");
    Ok(())
}

#[test]
fn unknown_types_are_internal_errors() {
    typebind_testhelpers::setup();

    let parsers = parsers();
    assert!(!parsers.supports(&Vec::<i32>::descriptor()));
    let err = parsers.parse::<Vec<i32>>("1,2").unwrap_err();
    assert!(matches!(err, ParseError::Internal(_)));
    assert_eq!(err.client_message(), "parse error");
    assert_eq!(
        err.to_string(),
        "internal parse error: no converter registered for type Vec<i32>"
    );
}

#[test]
fn clearing_removes_builtins() {
    typebind_testhelpers::setup();

    let mut parsers = FromStringParserRegistry::with_builtins();
    parsers.clear();
    parsers.seal();
    assert!(parsers.is_sealed());
    assert!(!parsers.supports(&String::descriptor()));
}

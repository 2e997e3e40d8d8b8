/// Builds a [`Value`](crate::Value) from JSON-like syntax.
///
/// Every array element and object value must be a single token tree, so
/// negative numbers and other compound expressions need parentheses:
///
/// ```
/// use typebind_value::{Value, value};
///
/// let v = value!({ "n": (-1), "items": [1, 2.5, "three", null], "ok": true });
/// assert_eq!(v.to_string(), r#"{"n":-1,"items":[1,2.5,"three",null],"ok":true}"#);
/// assert_eq!(value!(null), Value::Null);
/// ```
///
/// # Panics
///
/// If a float expression evaluates to NaN or an infinity.
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::Value::Null
    };
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![ $( $crate::value!($elem) ),* ])
    };
    ({ $($key:literal : $val:tt),* $(,)? }) => {{
        #[allow(unused_mut)]
        let mut object = $crate::Object::new();
        $( object.insert($key, $crate::value!($val)); )*
        $crate::Value::Object(object)
    }};
    ($other:expr) => {
        $crate::__private::Literal::into_value($other)
    };
}

#[doc(hidden)]
pub mod __private {
    use crate::{Number, Object, Value};

    /// Conversion used by `value!` for leaf expressions.
    pub trait Literal {
        fn into_value(self) -> Value;
    }

    macro_rules! literal_via_from {
        ($($t:ty),* $(,)?) => {
            $(
                impl Literal for $t {
                    fn into_value(self) -> Value {
                        Value::from(self)
                    }
                }
            )*
        };
    }

    literal_via_from!(
        bool, Number, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, &str, String,
        Vec<Value>, Object, Value,
    );

    macro_rules! literal_via_try_from {
        ($($t:ty),*) => {
            $(
                impl Literal for $t {
                    #[track_caller]
                    fn into_value(self) -> Value {
                        match Value::try_from(self) {
                            Ok(value) => value,
                            Err(_) => panic!("value! cannot hold non-finite float {self}"),
                        }
                    }
                }
            )*
        };
    }

    literal_via_try_from!(f32, f64);
}

use std::fmt;

use serde::{
    Deserialize, Deserializer,
    de::{self, DeserializeOwned, IgnoredAny, Visitor},
};

/// Deserializes a device reading that the bridge may encode as a `[mode, value]`
/// pair, as a bare scalar, or not at all. The value is returned as text, index 0 of
/// a pair is ignored.
///
/// This never fails on well-formed input: maps, nested arrays, short arrays and
/// `null` all produce `None`.
///
/// # Example
///
/// ```json
/// { "fpwr": ["OFF", "ON"], "fnsp": "0008", "tact": 2954 }
/// ```
/// yields `Some("ON")`, `Some("0008")` and `Some("2954")`.
pub fn deserialise_reading<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(ReadingVisitor { nested: false })
}

/// Deserializes the struct `T` from an object, falling back to `T::default()` if
/// the value has the wrong shape instead of failing the whole document. Arrays
/// are not accepted as structs.
pub fn deserialise_or_default<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: DeserializeOwned + Default,
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        value @ serde_json::Value::Object(_) => Ok(T::deserialize(value).unwrap_or_default()),
        _ => Ok(T::default()),
    }
}

/// Reads a scalar, or the second element of a pair when not already inside one.
struct ReadingVisitor {
    nested: bool,
}

/// Wrapper to read a single pair element with the same lenient rules.
struct Element(Option<String>);

impl<'de> Visitor<'de> for ReadingVisitor {
    type Value = Option<String>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a scalar or a [mode, value] pair")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
        Ok(Some(value.to_string()))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(Some(value.to_string()))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(Some(value.to_string()))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        Ok(Some(value.to_string()))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(Some(value.to_owned()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(Some(value))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let value = if self.nested {
            None
        } else {
            // [mode, value], the mode is not used
            seq.next_element::<IgnoredAny>()?
                .and(seq.next_element::<Element>()?)
                .and_then(|element| element.0)
        };

        // Drain anything left so that the deserializer sees a fully consumed sequence
        while seq.next_element::<IgnoredAny>()?.is_some() {}

        Ok(value)
    }

    fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
    where
        M: de::MapAccess<'de>,
    {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(None)
    }
}

impl<'de> Deserialize<'de> for Element {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer
            .deserialize_any(ReadingVisitor { nested: true })
            .map(Element)
    }
}

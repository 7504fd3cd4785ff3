//! Tri-state attribute values.
//!
//! A configured attribute is either not known yet (it depends on another
//! resource that has not been applied), explicitly absent, or known.
//! Keeping "not set" apart from "set to empty" lets resources tell an
//! omitted list from an empty one.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Value<T> {
    /// Computed later; never written to state.
    Unknown,
    /// Not set.
    #[default]
    Null,
    Known(T),
}

impl<T> Value<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Value::Known(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Value::Known(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    pub fn as_option(&self) -> Option<&T> {
        self.known()
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Value::Known(v) => Some(v),
            _ => None,
        }
    }

    /// The known value, or `default` when null or unknown.
    pub fn or_known(self, default: T) -> T {
        self.into_option().unwrap_or(default)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Value<U> {
        match self {
            Value::Unknown => Value::Unknown,
            Value::Null => Value::Null,
            Value::Known(v) => Value::Known(f(v)),
        }
    }
}

impl Value<String> {
    /// Known and not blank.
    pub fn non_empty(&self) -> Option<&str> {
        self.known().map(String::as_str).filter(|s| !s.trim().is_empty())
    }
}

impl<T> From<Option<T>> for Value<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Value::Known)
    }
}

impl<T: Serialize> Serialize for Value<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Known(v) => v.serialize(serializer),
            Value::Null | Value::Unknown => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Value<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Attrs {
        #[serde(default)]
        name: Value<String>,
        #[serde(default)]
        tags: Value<Vec<String>>,
    }

    #[test]
    fn test_missing_and_null_are_null() {
        let attrs: Attrs = serde_json::from_value(json!({"name": null})).unwrap();
        assert!(attrs.name.is_null());
        assert!(attrs.tags.is_null());
    }

    #[test]
    fn test_empty_list_is_known() {
        let attrs: Attrs = serde_json::from_value(json!({"tags": []})).unwrap();
        assert_eq!(attrs.tags, Value::Known(vec![]));
    }

    #[test]
    fn test_unknown_serializes_as_null() {
        let attrs = Attrs {
            name: Value::Unknown,
            tags: Value::Known(vec!["a".to_string()]),
        };
        assert_eq!(
            serde_json::to_value(&attrs).unwrap(),
            json!({"name": null, "tags": ["a"]})
        );
    }

    #[test]
    fn test_helpers() {
        let v: Value<String> = Value::Known("  ".to_string());
        assert_eq!(v.non_empty(), None);
        assert_eq!(Value::<u8>::Null.or_known(3), 3);
        assert_eq!(Value::Known(2).map(|x| x * 2), Value::Known(4));
        assert!(Value::<u8>::Unknown.map(|x| x).is_unknown());
        assert_eq!(Value::from(Some(1)), Value::Known(1));
    }
}

//! Generic-to-typed settings transform
//!
//! Endpoint settings arrive as opaque TOML tables (`[ingress.<name>.config]`).
//! Each adapter owns a typed settings struct and pulls its values out of the
//! table by field name.

use serde::Serialize;
use serde::de::DeserializeOwned;
use toml::{Table, Value};

use crate::error::TransformError;

/// Build a typed value from a generic table
///
/// Keys are matched to fields by name. Unknown keys are ignored, missing keys
/// take the field's `#[serde(default)]`.
///
/// # Errors
///
/// Returns [`TransformError::NotATable`] if `source` is not a table and
/// [`TransformError::Mismatch`] if a matching key holds a value of the wrong type.
pub fn transform<T: DeserializeOwned>(source: &Value) -> Result<T, TransformError> {
    let table = as_table(source)?;
    Ok(Value::Table(table.clone()).try_into()?)
}

/// Copy the values of a generic table onto an existing typed value
///
/// Fields without a matching key keep their current value. `target` is only
/// written once the whole transform has succeeded.
pub fn transform_into<T>(source: &Value, target: &mut T) -> Result<(), TransformError>
where
    T: Serialize + DeserializeOwned,
{
    let overlay = as_table(source)?;

    let mut merged = match Value::try_from(&*target)? {
        Value::Table(table) => table,
        other => {
            return Err(TransformError::NotATable {
                found: other.type_str(),
            });
        }
    };

    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }

    *target = Value::Table(merged).try_into()?;
    Ok(())
}

fn as_table(source: &Value) -> Result<&Table, TransformError> {
    match source {
        Value::Table(table) => Ok(table),
        other => Err(TransformError::NotATable {
            found: other.type_str(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Sample {
        foo: String,
        key: i64,
        untouched: Option<String>,
    }

    fn source() -> Value {
        toml::from_str::<Value>("foo = \"bar\"\nkey = 5\nextra = true").unwrap()
    }

    #[test]
    fn test_transform_populates_matching_fields() {
        let sample: Sample = transform(&source()).unwrap();
        assert_eq!(sample.foo, "bar");
        assert_eq!(sample.key, 5);
        assert_eq!(sample.untouched, None);
    }

    #[test]
    fn test_transform_rejects_non_table() {
        for value in [
            Value::String("stream".into()),
            Value::Integer(7),
            Value::Array(vec![Value::Boolean(true)]),
        ] {
            let result: Result<Sample, _> = transform(&value);
            assert!(matches!(result, Err(TransformError::NotATable { .. })));
        }
    }

    #[test]
    fn test_transform_type_mismatch() {
        let value = toml::from_str::<Value>("key = \"five\"").unwrap();
        let result: Result<Sample, _> = transform(&value);
        assert!(matches!(result, Err(TransformError::Mismatch(_))));
    }

    #[test]
    fn test_transform_into_keeps_unmatched_fields() {
        let mut sample = Sample {
            untouched: Some("kept".into()),
            ..Default::default()
        };

        transform_into(&source(), &mut sample).unwrap();

        assert_eq!(sample.foo, "bar");
        assert_eq!(sample.key, 5);
        assert_eq!(sample.untouched.as_deref(), Some("kept"));
    }

    #[test]
    fn test_transform_into_leaves_target_on_failure() {
        let mut sample = Sample {
            foo: "original".into(),
            key: 1,
            untouched: None,
        };
        let before = sample.clone();

        assert!(transform_into(&Value::String("stream".into()), &mut sample).is_err());
        assert_eq!(sample, before);

        let bad = toml::from_str::<Value>("foo = 3").unwrap();
        assert!(transform_into(&bad, &mut sample).is_err());
        assert_eq!(sample, before);
    }
}

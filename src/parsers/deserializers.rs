use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Interprets a JSON timestamp: integers are Unix milliseconds, strings are RFC3339
pub fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let ms = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp_millis(ms)
        }
        Value::String(s) => s.parse::<DateTime<Utc>>().ok(),
        _ => None,
    }
}

/// Optional timestamp field: missing, null or unparseable values become `None`
pub fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(timestamp_from_value))
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Deserialize)]
    struct Optional {
        #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
        timestamp: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_timestamp_integer_millis() {
        let parsed = timestamp_from_value(&json!(1762076480016i64));
        assert_eq!(parsed, DateTime::from_timestamp_millis(1762076480016));
    }

    #[test]
    fn test_timestamp_rfc3339() {
        let parsed = timestamp_from_value(&json!("2025-11-02T09:41:20.016Z"));
        assert_eq!(parsed, DateTime::from_timestamp_millis(1762076480016));
    }

    #[test]
    fn test_timestamp_rejects_other_types() {
        assert_eq!(timestamp_from_value(&json!(true)), None);
        assert_eq!(timestamp_from_value(&json!("yesterday")), None);
    }

    #[test]
    fn test_optional_timestamp_tolerates_garbage() {
        let missing: Optional = serde_json::from_str("{}").unwrap();
        assert!(missing.timestamp.is_none());
        let null: Optional = serde_json::from_str(r#"{"timestamp":null}"#).unwrap();
        assert!(null.timestamp.is_none());
        let garbage: Optional = serde_json::from_str(r#"{"timestamp":"soon"}"#).unwrap();
        assert!(garbage.timestamp.is_none());
        let valid: Optional = serde_json::from_str(r#"{"timestamp":1000}"#).unwrap();
        assert_eq!(valid.timestamp, DateTime::from_timestamp_millis(1000));
    }

    #[test]
    fn test_timestamp_from_value_float() {
        assert_eq!(timestamp_from_value(&json!(1500.0)), DateTime::from_timestamp_millis(1500));
        assert_eq!(timestamp_from_value(&json!({})), None);
    }
}

//! Feed events delivered to the chart

use serde_json::Value;

use super::error::FeedError;

/// Payload field carrying the reading
pub const READING_FIELD: &str = "number";

/// Something the chart needs to know about
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// A reading arrived at `received_at` (ms since epoch)
    Reading { value: f64, received_at: i64 },
}

/// Extract the reading from event arguments shaped `[{"number": <n>}]`
pub fn parse_reading(args: &[Value]) -> Result<f64, FeedError> {
    let payload = args
        .first()
        .ok_or_else(|| FeedError::InvalidPayload("event has no payload".to_string()))?;

    let field = payload.get(READING_FIELD).ok_or_else(|| {
        FeedError::InvalidPayload(format!("missing \"{}\" field in {}", READING_FIELD, payload))
    })?;

    let value = field.as_f64().ok_or_else(|| {
        FeedError::InvalidPayload(format!("\"{}\" is not a number: {}", READING_FIELD, field))
    })?;

    if !value.is_finite() {
        return Err(FeedError::InvalidPayload(format!(
            "\"{}\" is not finite",
            READING_FIELD
        )));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_reading() {
        assert_eq!(parse_reading(&[json!({"number": 42})]).unwrap(), 42.0);
        assert_eq!(parse_reading(&[json!({"number": 12.345})]).unwrap(), 12.345);
        assert_eq!(parse_reading(&[json!({"number": -3})]).unwrap(), -3.0);
    }

    #[test]
    fn test_parse_reading_rejects_bad_payloads() {
        for args in [
            vec![],
            vec![json!({})],
            vec![json!({"number": "42"})],
            vec![json!({"number": null})],
            vec![json!(42)],
        ] {
            assert!(
                matches!(parse_reading(&args), Err(FeedError::InvalidPayload(_))),
                "accepted {:?}",
                args
            );
        }
    }
}

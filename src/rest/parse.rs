use serde_json::Value;

use crate::error::{RestError, Result};
use crate::rest::entity::Record;

/// Parse a single-record response body.
pub(crate) fn parse_record(json: Value) -> Result<Record> {
    match json {
        Value::Object(record) => Ok(record),
        other => Err(RestError::InvalidResponse(format!(
            "expected an object, got {}",
            kind(&other)
        ))),
    }
}

/// Parse a list response body. Every element must be an object.
pub(crate) fn parse_records(json: Value) -> Result<Vec<Record>> {
    let response_array = match json {
        Value::Array(items) => items,
        other => {
            return Err(RestError::InvalidResponse(format!(
                "expected an array, got {}",
                kind(&other)
            )));
        }
    };

    let mut records: Vec<Record> = Vec::with_capacity(response_array.len());

    for (index, record_value) in response_array.into_iter().enumerate() {
        match record_value {
            Value::Object(record) => records.push(record),
            other => {
                return Err(RestError::InvalidResponse(format!(
                    "element {} is {}, expected an object",
                    index,
                    kind(&other)
                )));
            }
        }
    }

    Ok(records)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_lists_of_objects() {
        let records = parse_records(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["id"], json!(2));
    }

    #[test]
    fn rejects_unexpected_shapes() {
        assert!(matches!(
            parse_records(json!({"value": []})),
            Err(RestError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_records(json!([{"id": 1}, 2])),
            Err(RestError::InvalidResponse(_))
        ));
        assert!(matches!(parse_record(json!(null)), Err(RestError::InvalidResponse(_))));
    }
}

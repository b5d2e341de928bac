//! Conversion between plain JSON objects and Firestore typed values.

use chrono::DateTime;
use serde_json::{json, Map, Value as JsonValue};

use crate::store::error::{internal_error, StoreResult};

/// Encodes a plain JSON object as a Firestore `fields` map.
pub fn encode_fields(object: &Map<String, JsonValue>) -> JsonValue {
    let fields: Map<String, JsonValue> = object
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect();
    JsonValue::Object(fields)
}

/// Whole numbers become `integerValue`, like the JS SDK writes them.
pub fn encode_value(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Null => json!({ "nullValue": JsonValue::Null }),
        JsonValue::Bool(boolean) => json!({ "booleanValue": boolean }),
        JsonValue::Number(number) => match as_whole_number(number) {
            Some(integer) => json!({ "integerValue": integer.to_string() }),
            None => json!({ "doubleValue": number.as_f64().unwrap_or(0.0) }),
        },
        JsonValue::String(string) => json!({ "stringValue": string }),
        JsonValue::Array(values) => {
            let values = values.iter().map(encode_value).collect::<Vec<_>>();
            json!({ "arrayValue": { "values": values } })
        }
        JsonValue::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// `timestampValue` for an RFC 3339 string, `stringValue` otherwise.
pub fn encode_timestamp_or_string(raw: &str) -> JsonValue {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(_) => json!({ "timestampValue": raw }),
        Err(_) => json!({ "stringValue": raw }),
    }
}

fn as_whole_number(number: &serde_json::Number) -> Option<i64> {
    if let Some(integer) = number.as_i64() {
        return Some(integer);
    }
    let float = number.as_f64()?;
    if float.is_finite() && float.fract() == 0.0 && float.abs() < 9.0e15 {
        Some(float as i64)
    } else {
        None
    }
}

/// Decodes a REST document's `fields` into a plain JSON object.
///
/// Timestamps and references decode to strings, geo points to
/// `{latitude, longitude}` objects.
pub fn decode_document_fields(document: &JsonValue) -> StoreResult<Map<String, JsonValue>> {
    match document.get("fields") {
        Some(fields) => decode_map(fields),
        None => Ok(Map::new()),
    }
}

fn decode_map(fields: &JsonValue) -> StoreResult<Map<String, JsonValue>> {
    let fields = fields
        .as_object()
        .ok_or_else(|| internal_error("Expected 'fields' to be an object"))?;
    fields
        .iter()
        .map(|(key, value)| Ok((key.clone(), decode_value(value)?)))
        .collect()
}

fn decode_value(value: &JsonValue) -> StoreResult<JsonValue> {
    let object = value
        .as_object()
        .ok_or_else(|| internal_error("Expected Firestore value object"))?;
    if object.contains_key("nullValue") {
        return Ok(JsonValue::Null);
    }
    if let Some(boolean) = object.get("booleanValue") {
        return boolean
            .as_bool()
            .map(JsonValue::Bool)
            .ok_or_else(|| internal_error("booleanValue must be bool"));
    }
    if let Some(integer) = object.get("integerValue") {
        let parsed = match integer {
            JsonValue::String(raw) => raw
                .parse::<i64>()
                .map_err(|err| internal_error(format!("Invalid integerValue: {err}")))?,
            JsonValue::Number(number) => number
                .as_i64()
                .ok_or_else(|| internal_error("Integer out of range"))?,
            _ => return Err(internal_error("integerValue must be a string or number")),
        };
        return Ok(JsonValue::from(parsed));
    }
    if let Some(double) = object.get("doubleValue") {
        let parsed = match double {
            JsonValue::Number(number) => number.as_f64(),
            JsonValue::String(raw) => raw.parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| internal_error("Invalid doubleValue"))?;
        return Ok(json!(parsed));
    }
    for key in ["stringValue", "timestampValue", "referenceValue", "bytesValue"] {
        if let Some(raw) = object.get(key) {
            return raw
                .as_str()
                .map(|raw| JsonValue::String(raw.to_string()))
                .ok_or_else(|| internal_error(format!("{key} must be string")));
        }
    }
    if let Some(point) = object.get("geoPointValue") {
        return Ok(json!({
            "latitude": point.get("latitude").and_then(JsonValue::as_f64).unwrap_or(0.0),
            "longitude": point.get("longitude").and_then(JsonValue::as_f64).unwrap_or(0.0),
        }));
    }
    if let Some(array) = object.get("arrayValue") {
        let values = match array.get("values").and_then(JsonValue::as_array) {
            Some(values) => values.iter().map(decode_value).collect::<StoreResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        return Ok(JsonValue::Array(values));
    }
    if let Some(map) = object.get("mapValue") {
        return match map.get("fields") {
            Some(fields) => decode_map(fields).map(JsonValue::Object),
            None => Ok(JsonValue::Object(Map::new())),
        };
    }
    Err(internal_error("Unknown Firestore value type"))
}

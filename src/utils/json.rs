use crate::errors::ApiError;
use bson::Bson;
use serde_json::Value;

/// Convert a JSON object (request body, seed file entry) into a record.
pub fn json_to_record(val: &Value) -> Result<bson::Document, ApiError> {
    let obj = val
        .as_object()
        .ok_or_else(|| ApiError::validation("body", "expected a JSON object"))?;
    bson::Document::try_from(obj.clone()).map_err(|e| ApiError::validation("body", e.to_string()))
}

/// Render a BSON value as plain JSON: dates become RFC 3339 strings, numbers stay numbers.
#[must_use]
pub fn bson_to_json(v: &Bson) -> Value {
    match v {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::from(*i),
        Bson::Int64(i) => Value::from(*i),
        Bson::Double(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        Bson::Document(d) => record_to_json(d),
        Bson::DateTime(dt) => chrono::DateTime::from_timestamp_millis(dt.timestamp_millis())
            .map_or(Value::Null, |c| {
                Value::String(c.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            }),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        other => Value::String(other.to_string()),
    }
}

#[must_use]
pub fn record_to_json(doc: &bson::Document) -> Value {
    Value::Object(doc.iter().map(|(k, v)| (k.to_string(), bson_to_json(v))).collect())
}

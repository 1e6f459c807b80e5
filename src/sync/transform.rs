//! Reshape rows read from the data API into the form it accepts for bulk
//! inserts.

use serde_json::{Map, Value};

use crate::catalogue::Record;

/// Ids referenced by an attribute value. Accepts the expanded form returned
/// by the API (`{"id": ..., "_href": ...}` or a list of those) as well as
/// plain ids.
pub fn reference_ids(value: &Value) -> Vec<String> {
	match value {
		Value::Null => Vec::new(),
		Value::String(id) => vec![id.clone()],
		Value::Object(obj) => obj
			.get("id")
			.and_then(Value::as_str)
			.map(|id| vec![id.to_string()])
			.unwrap_or_default(),
		Value::Array(items) => items.iter().flat_map(reference_ids).collect(),
		_ => Vec::new(),
	}
}

fn flatten_value(value: Value) -> Value {
	match value {
		Value::Object(obj) => obj.get("id").cloned().unwrap_or(Value::Null),
		Value::Array(items) => Value::Array(items.into_iter().map(flatten_value).collect()),
		other => other,
	}
}

/// Convert a single row: drop API bookkeeping (`_href`, `_meta`), drop
/// one-to-many attributes and collapse references to ids.
pub fn to_upload_record(row: &Record, one_to_manys: &[String]) -> Record {
	row.iter()
		.filter(|(key, _)| !key.starts_with('_'))
		.filter(|(key, _)| !one_to_manys.iter().any(|o| o == *key))
		.map(|(key, value)| (key.clone(), flatten_value(value.clone())))
		.collect::<Map<String, Value>>()
}

pub fn to_upload_format(rows: &[Record], one_to_manys: &[String]) -> Vec<Record> {
	rows.iter()
		.map(|row| to_upload_record(row, one_to_manys))
		.collect()
}

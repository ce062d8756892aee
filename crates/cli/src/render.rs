//! JSON rendering of materialized values.

use serde_json::{Map, Value as Json, json};
use wiring::{Injector, Value};
use wiring_catalog::Record;

pub fn to_json(value: &Value) -> Json {
	match value {
		Value::Bool(v) => json!(v),
		Value::Int(v) => json!(v),
		Value::Float(v) => json!(v),
		Value::Char(v) => json!(v.to_string()),
		Value::String(v) => json!(v),
		Value::Set(members) | Value::List(members) => members.iter().map(to_json).collect(),
		Value::Future(future) => json!({
			"deferred": future.name(),
			"resolved": future.is_resolved(),
		}),
		Value::Object(_) => {
			if let Some(record) = value.downcast::<Record>() {
				let fields: Map<String, Json> = record
					.fields()
					.iter()
					.map(|(name, v)| (name.clone(), to_json(v)))
					.collect();
				json!({ "class": record.class(), "fields": fields })
			} else if value.downcast::<Injector>().is_some() {
				json!("<injector>")
			} else {
				json!("<object>")
			}
		}
	}
}

//! JSON projection of domain records.

use serde::Serialize;
use serde_json::Value;
use tracing::error;

/// The projection collaborator: turns a domain record into a JSON value,
/// optionally restricted to an allow-list of fields.
pub trait Project<R>: Send + Sync {
    /// Project one record.
    fn project(&self, record: &R, fields: Option<&[String]>) -> Value;
}

/// Serde-backed projection with top-level field filtering.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeProject;

impl<R: Serialize> Project<R> for SerdeProject {
    fn project(&self, record: &R, fields: Option<&[String]>) -> Value {
        let value = match serde_json::to_value(record) {
            Ok(value) => value,
            Err(err) => {
                error!("failed to serialize record: {err}");

                return Value::Null;
            }
        };

        match (value, fields) {
            (Value::Object(map), Some(fields)) => Value::Object(
                map.into_iter()
                    .filter(|(key, _)| fields.iter().any(|field| field == key))
                    .collect(),
            ),
            (value, _) => value,
        }
    }
}

use definition::ContentType;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};

/// `ApplyResult` holds the document returned by the control plane.
///
/// Nested fields are reached with a dotted path where numeric segments
/// index into arrays, e.g. `spec.template.spec.containers.0.image`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyResult {
    status: u16,
    document: Value,
}

impl ApplyResult {
    /// Parse a successful response body according to `content_type`.
    ///
    /// An empty body is only accepted along with `204 No Content`.
    pub(crate) fn decode(status: u16, content_type: ContentType, body: &str) -> Result<Self> {
        if body.trim().is_empty() {
            if status == 204 {
                return Ok(Self {
                    status,
                    document: Value::Null,
                });
            }
            return Err(Error::Decode {
                content_type,
                reason: "empty response body".to_string(),
            });
        }

        let document = if content_type.is_yaml() {
            serde_yaml::from_str::<Value>(body).map_err(|e| Error::Decode {
                content_type,
                reason: e.to_string(),
            })?
        } else {
            serde_json::from_str::<Value>(body).map_err(|e| Error::Decode {
                content_type,
                reason: e.to_string(),
            })?
        };

        Ok(Self { status, document })
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn into_inner(self) -> Value {
        self.document
    }

    /// The value at `path`, or the whole document for an empty path.
    ///
    /// Keys holding a dot, such as `deployment.kubernetes.io/revision`,
    /// cannot be reached this way; use [`ApplyResult::get_segments`].
    pub fn get(&self, path: &str) -> Option<&Value> {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        self.get_segments(&segments)
    }

    /// The value reached by following `segments` one key or index at a time.
    pub fn get_segments<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Value> {
        segments
            .iter()
            .try_fold(&self.document, |value, segment| match value {
                Value::Object(fields) => fields.get(segment.as_ref()),
                Value::Array(items) => segment
                    .as_ref()
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index)),
                _ => None,
            })
    }

    /// Deserialize the value at `path` into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.get(path).ok_or_else(|| Error::Field {
            path: path.to_string(),
            reason: "no such field".to_string(),
        })?;

        serde_json::from_value(value.clone()).map_err(|e| Error::Field {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ContentType, Error, Result};

/// Label key tying pods and services to an application.
pub const APP_LABEL: &str = "app";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// A kind of object the control plane knows how to store.
pub trait Resource {
    const API_VERSION: &'static str;
    const KIND: &'static str;

    /// The collection path for objects of this kind in `namespace`.
    fn collection_path(namespace: &str) -> String;

    /// The object name, as set in `metadata.name`.
    fn name(&self) -> &str;
}

/// `Manifest` holds a built document and everything needed to submit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest<T> {
    path: String,
    content_type: ContentType,
    document: T,
}

impl<T: Resource> Manifest<T> {
    pub(crate) fn new(namespace: &str, document: T) -> Self {
        Self {
            path: T::collection_path(namespace),
            content_type: ContentType::Json,
            document,
        }
    }

    /// Path of the object itself once created, e.g. for a read back.
    pub fn object_path(&self) -> String {
        format!("{}/{}", self.path, self.document.name())
    }
}

impl<T> Manifest<T> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn document(&self) -> &T {
        &self.document
    }

    pub fn into_document(self) -> T {
        self.document
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }
}

impl<T: Serialize> Manifest<T> {
    /// Serialize the document according to its content type.
    pub fn body(&self) -> Result<String> {
        if self.content_type.is_yaml() {
            serde_yaml::to_string(&self.document).map_err(|e| Error::Serialization(e.to_string()))
        } else {
            serde_json::to_string(&self.document).map_err(|e| Error::Serialization(e.to_string()))
        }
    }
}

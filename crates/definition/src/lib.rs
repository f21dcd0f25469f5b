//! Resource definitions sent to the control plane.
//!
//! Every builder in this crate is a pure function of its input: no network,
//! no clock, no randomness. Identifier fields go through [`slugify`] before
//! they land in a document, and the output carries the REST path and
//! [`ContentType`] needed to submit it.

pub mod container;
pub mod content_type;
pub mod deployment;
pub mod manifest;
pub mod service;
mod slug;

pub use container::{Container, ContainerPort, ContainerSpec, PortSet, Ports, Protocol};
pub use content_type::ContentType;
pub use deployment::{Deployment, DeploymentSpec};
pub use manifest::{Manifest, ObjectMeta, Resource, APP_LABEL};
pub use service::{Service, ServiceSpec, ServiceType};
pub use slug::slugify;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Definition related errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid value for `{field}`: {reason}")]
    Validation { field: String, reason: String },
    #[error("Failed to serialize the manifest. Details : {0}")]
    Serialization(String),
}

impl Error {
    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Slugify `value` and fail when nothing is left of it.
pub(crate) fn required_slug(field: &str, value: &str) -> Result<String> {
    let slug = slugify(value);
    if slug.is_empty() {
        return Err(Error::validation(
            field,
            format!("\"{}\" is empty once normalized", value),
        ));
    }
    Ok(slug)
}

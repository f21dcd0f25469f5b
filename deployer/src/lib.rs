//! Submit resource definitions to a cluster control plane.
//!
//! [`Client`] sends manifests built by the `definition` crate over HTTP and
//! hands back the parsed answer as an [`ApplyResult`]. [`Pipeline`] chains
//! the external image steps, the Deployment and the Service of one deploy
//! request.

pub mod client;
pub mod config;
pub mod pipeline;
pub mod result;
pub mod step;

pub use client::{Client, ResourceClient};
pub use crate::config::{Cluster, Configuration, Credentials};
pub use pipeline::{DeployOutcome, DeployRequest, ExposeSpec, ImageBuild, Pipeline};
pub use reqwest::Method;
pub use result::ApplyResult;
pub use step::{CommandStep, ExternalStep, StepError};

use definition::ContentType;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid manifest: {0}")]
    Manifest(#[from] definition::Error),
    #[error("Unable to reach the control plane: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Control plane answered with status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Unable to decode the {content_type} response: {reason}")]
    Decode {
        content_type: ContentType,
        reason: String,
    },
    #[error("Unusable field `{path}` in the response: {reason}")]
    Field { path: String, reason: String },
    #[error(transparent)]
    Step(#[from] StepError),
}

impl Error {
    /// HTTP status of an [`Error::Api`] failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

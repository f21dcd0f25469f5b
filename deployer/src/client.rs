use async_trait::async_trait;
use definition::{ContentType, Manifest, Resource};
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client as HttpClient, Method};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Cluster, Credentials};
use crate::{ApplyResult, Error, Result};

/// Operations offered by the control plane for any kind of resource.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Send `payload` to `path` with the given verb and content type.
    async fn apply(
        &self,
        verb: Method,
        path: &str,
        content_type: ContentType,
        payload: String,
    ) -> Result<ApplyResult>;

    /// Create the object described by `manifest`.
    async fn create_resource<T>(&self, manifest: &Manifest<T>) -> Result<ApplyResult>
    where
        T: Resource + Serialize + Sync,
    {
        let payload = manifest.body()?;
        self.apply(Method::POST, manifest.path(), manifest.content_type(), payload)
            .await
    }

    async fn get_resource(&self, path: &str) -> Result<ApplyResult> {
        self.apply(Method::GET, path, ContentType::Json, String::new())
            .await
    }

    async fn delete_resource(&self, path: &str) -> Result<ApplyResult> {
        self.apply(Method::DELETE, path, ContentType::Json, String::new())
            .await
    }
}

/// `Client` provides the ability to interact
/// with the cluster control plane by using HTTP Protocol.
#[derive(Debug, Clone)]
pub struct Client {
    /// The base URL of the control plane, without trailing slash.
    ///
    /// e.g: https://10.0.0.1:6443
    server: String,

    credentials: Credentials,

    /// The internal HTTP client used to make requests.
    http_client: HttpClient,
}

impl Client {
    pub fn new(cluster: Cluster) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(cluster.timeout())
            .danger_accept_invalid_certs(cluster.insecure_skip_tls_verify)
            .build()
            .map_err(Error::Transport)?;

        Ok(Self {
            server: cluster.server.trim_end_matches('/').to_string(),
            credentials: cluster.credentials,
            http_client,
        })
    }

    /// Build a complete endpoint URL
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.server, path)
        } else {
            format!("{}/{}", self.server, path)
        }
    }
}

#[async_trait]
impl ResourceClient for Client {
    #[tracing::instrument(name = "Client::apply", skip(self, payload))]
    async fn apply(
        &self,
        verb: Method,
        path: &str,
        content_type: ContentType,
        payload: String,
    ) -> Result<ApplyResult> {
        let endpoint = self.endpoint(path);
        debug!("Sending {} request to {}", verb, endpoint);

        let mut request = self
            .http_client
            .request(verb, &endpoint)
            .header(CONTENT_TYPE, content_type.mime())
            .header(CACHE_CONTROL, "no-cache");

        request = match &self.credentials {
            Credentials::None => request,
            Credentials::Basic { user, password } => request.basic_auth(user, Some(password)),
            Credentials::Bearer { token } => request.bearer_auth(token),
        };

        if !payload.is_empty() {
            request = request.body(payload);
        }

        let response = request.send().await.map_err(Error::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            warn!("Control plane rejected the request with status {}", status);
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        info!("Control plane answered with status {}", status);
        ApplyResult::decode(status.as_u16(), content_type, &body)
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::manifest::{ObjectMeta, APP_LABEL};
use crate::{required_slug, Deployment, Error, Manifest, Protocol, Resource, Result};

/// How a service is exposed outside of the cluster.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceType {
    #[default]
    ClusterIP,
    NodePort,
    LoadBalancer,
}

/// `ServiceSpec` is the caller's description of a service in front of a deployment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub namespace: String,
    pub name: String,
    /// App label of the deployment to route traffic to.
    pub selector: String,
    /// Port exposed by the service.
    pub port: u16,
    /// Container port traffic is forwarded to.
    pub target_port: u16,
    #[serde(default)]
    pub service_type: ServiceType,
    #[serde(default)]
    pub protocol: Protocol,
}

impl ServiceSpec {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        selector: impl Into<String>,
        port: u16,
        target_port: u16,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            selector: selector.into(),
            port,
            target_port,
            service_type: ServiceType::default(),
            protocol: Protocol::default(),
        }
    }

    /// Describe a service routing `port` to the `target_port` of an existing deployment.
    ///
    /// `target_port` must be one of the ports actually declared by the
    /// deployment's containers, and the selector is read from its `app` label.
    /// When `protocol` is `None` the port has to be declared under a single
    /// protocol, which the service then inherits.
    pub fn for_deployment(
        deployment: &Deployment,
        namespace: impl Into<String>,
        name: impl Into<String>,
        port: u16,
        target_port: u16,
        protocol: Option<Protocol>,
    ) -> Result<Self> {
        let selector = deployment.app_label().ok_or_else(|| {
            Error::validation(
                "selector",
                format!("deployment {} has no `app` label", deployment.name()),
            )
        })?;

        let mut declared: Vec<Protocol> = deployment
            .container_ports()
            .filter(|p| p.container_port == target_port)
            .map(|p| p.protocol.unwrap_or_default())
            .filter(|declared| protocol.map_or(true, |wanted| wanted == *declared))
            .collect();
        declared.sort();
        declared.dedup();

        let protocol = match declared.as_slice() {
            [protocol] => *protocol,
            [] => {
                return Err(Error::validation(
                    "target_port",
                    match protocol {
                        Some(protocol) => format!(
                            "port {}/{} is not declared by any container of deployment {}",
                            target_port,
                            protocol,
                            deployment.name()
                        ),
                        None => format!(
                            "port {} is not declared by any container of deployment {}",
                            target_port,
                            deployment.name()
                        ),
                    },
                ))
            }
            _ => {
                return Err(Error::validation(
                    "protocol",
                    format!(
                        "port {} of deployment {} is declared under several protocols, one must be chosen",
                        target_port,
                        deployment.name()
                    ),
                ))
            }
        };

        Ok(Self::new(namespace, name, selector, port, target_port).with_protocol(protocol))
    }

    pub fn with_type(mut self, service_type: ServiceType) -> Self {
        self.service_type = service_type;
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Build the Service document and its routing metadata.
    pub fn build(&self) -> Result<Manifest<Service>> {
        let namespace = required_slug("namespace", &self.namespace)?;
        let name = required_slug("name", &self.name)?;
        let selector = required_slug("selector", &self.selector)?;

        if self.port == 0 {
            return Err(Error::validation("port", "port must be a positive integer"));
        }
        if self.target_port == 0 {
            return Err(Error::validation(
                "target_port",
                "port must be a positive integer",
            ));
        }

        let service = Service {
            api_version: Service::API_VERSION.to_string(),
            kind: Service::KIND.to_string(),
            metadata: ObjectMeta {
                name,
                labels: BTreeMap::from([(APP_LABEL.to_string(), selector.clone())]),
            },
            spec: Spec {
                service_type: self.service_type,
                selector: BTreeMap::from([(APP_LABEL.to_string(), selector)]),
                ports: vec![ServicePort {
                    port: self.port,
                    target_port: self.target_port,
                    protocol: self.protocol,
                }],
            },
        };

        Ok(Manifest::new(&namespace, service))
    }
}

/// A Service document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: Spec,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Spec {
    #[serde(rename = "type", default)]
    pub service_type: ServiceType,
    pub selector: BTreeMap<String, String>,
    pub ports: Vec<ServicePort>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    pub port: u16,
    pub target_port: u16,
    #[serde(default)]
    pub protocol: Protocol,
}

impl Resource for Service {
    const API_VERSION: &'static str = "v1";
    const KIND: &'static str = "Service";

    fn collection_path(namespace: &str) -> String {
        format!("/api/{}/namespaces/{}/services", Self::API_VERSION, namespace)
    }

    fn name(&self) -> &str {
        &self.metadata.name
    }
}

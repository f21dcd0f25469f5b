use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::manifest::{ObjectMeta, APP_LABEL};
use crate::{required_slug, Container, ContainerPort, ContainerSpec, Error, Manifest, Resource, Result};

fn default_replicas() -> u32 {
    1
}

/// `DeploymentSpec` is the caller's description of an application to run.
///
/// Identifier fields may hold any text: they are slugified by [`DeploymentSpec::build`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSpec {
    pub namespace: String,
    pub name: String,
    pub app_label: String,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    pub containers: Vec<ContainerSpec>,
}

impl DeploymentSpec {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        app_label: impl Into<String>,
        containers: Vec<ContainerSpec>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            app_label: app_label.into(),
            replicas: default_replicas(),
            containers,
        }
    }

    pub fn with_replicas(mut self, replicas: u32) -> Self {
        self.replicas = replicas;
        self
    }

    /// Build the Deployment document and its routing metadata.
    pub fn build(&self) -> Result<Manifest<Deployment>> {
        let namespace = required_slug("namespace", &self.namespace)?;
        let name = required_slug("name", &self.name)?;
        let app_label = required_slug("app_label", &self.app_label)?;

        if self.containers.is_empty() {
            return Err(Error::validation(
                "containers",
                "a deployment needs at least one container",
            ));
        }

        let containers = self
            .containers
            .iter()
            .enumerate()
            .map(|(index, container)| container.build(index))
            .collect::<Result<Vec<_>>>()?;

        let deployment = Deployment {
            api_version: Deployment::API_VERSION.to_string(),
            kind: Deployment::KIND.to_string(),
            metadata: ObjectMeta {
                name,
                labels: BTreeMap::new(),
            },
            spec: Spec {
                replicas: self.replicas,
                template: PodTemplate {
                    metadata: TemplateMeta {
                        labels: BTreeMap::from([(APP_LABEL.to_string(), app_label)]),
                    },
                    spec: PodSpec { containers },
                },
            },
        };

        Ok(Manifest::new(&namespace, deployment))
    }
}

/// A Deployment document, as sent to and returned by the control plane.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: Spec,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Spec {
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    pub template: PodTemplate,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PodTemplate {
    pub metadata: TemplateMeta,
    pub spec: PodSpec,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TemplateMeta {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PodSpec {
    pub containers: Vec<Container>,
}

impl Deployment {
    /// The value of the `app` label carried by the pod template.
    pub fn app_label(&self) -> Option<&str> {
        self.spec
            .template
            .metadata
            .labels
            .get(APP_LABEL)
            .map(String::as_str)
    }

    /// Every port declared by every container, in declaration order.
    pub fn container_ports(&self) -> impl Iterator<Item = &ContainerPort> {
        self.spec
            .template
            .spec
            .containers
            .iter()
            .flat_map(|container| container.ports.iter())
    }
}

impl Resource for Deployment {
    const API_VERSION: &'static str = "extensions/v1beta1";
    const KIND: &'static str = "Deployment";

    fn collection_path(namespace: &str) -> String {
        format!("/apis/{}/namespaces/{}/deployments", Self::API_VERSION, namespace)
    }

    fn name(&self) -> &str {
        &self.metadata.name
    }
}

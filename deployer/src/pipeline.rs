use definition::{Deployment, DeploymentSpec, Protocol, ServiceSpec, ServiceType};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::step::{CommandStep, ExternalStep};
use crate::{ApplyResult, ResourceClient, Result};

fn default_push() -> bool {
    true
}

/// Image to build, and optionally push, before deploying.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ImageBuild {
    /// Directory holding the Dockerfile.
    pub context: PathBuf,
    pub tag: String,
    #[serde(default = "default_push")]
    pub push: bool,
}

/// How to expose the deployment through a service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExposeSpec {
    pub name: String,
    pub port: u16,
    /// Container port of the created deployment receiving the traffic.
    pub container_port: u16,
    /// Needed when `container_port` is declared under several protocols.
    #[serde(default)]
    pub protocol: Option<Protocol>,
    #[serde(default)]
    pub service_type: ServiceType,
}

/// `DeployRequest` holds everything needed to ship one application.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    #[serde(default)]
    pub image: Option<ImageBuild>,
    pub deployment: DeploymentSpec,
    #[serde(default)]
    pub service: Option<ExposeSpec>,
}

impl DeployRequest {
    /// The external steps producing the image of this request.
    pub fn steps(&self) -> Vec<Box<dyn ExternalStep>> {
        let mut steps: Vec<Box<dyn ExternalStep>> = Vec::new();
        if let Some(image) = &self.image {
            steps.push(Box::new(CommandStep::docker_build(&image.context, &image.tag)));
            if image.push {
                steps.push(Box::new(CommandStep::docker_push(&image.tag)));
            }
        }
        steps
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DeployOutcome {
    pub deployment: ApplyResult,
    pub service: Option<ApplyResult>,
}

/// Ship deploy requests through a [`ResourceClient`].
#[derive(Debug)]
pub struct Pipeline<'a, C> {
    client: &'a C,
}

impl<'a, C: ResourceClient> Pipeline<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Run `steps` in order, then apply `request`.
    ///
    /// Nothing is sent to the control plane when a step fails.
    pub async fn run(
        &self,
        request: &DeployRequest,
        steps: &[Box<dyn ExternalStep>],
    ) -> Result<DeployOutcome> {
        for step in steps {
            info!("Running step {}", step.name());
            step.run().await?;
        }
        self.apply(request).await
    }

    /// Create the deployment, then the service in front of it.
    ///
    /// The service target port is checked against the deployment returned
    /// by the control plane, so the service is never created before the
    /// deployment exists.
    #[tracing::instrument(name = "Pipeline::apply", skip(self, request), fields(deployment = %request.deployment.name))]
    pub async fn apply(&self, request: &DeployRequest) -> Result<DeployOutcome> {
        let manifest = request.deployment.build()?;
        let deployment = self.client.create_resource(&manifest).await?;
        info!("Deployment {} created", manifest.object_path());

        let service = match &request.service {
            Some(expose) => {
                let created: Deployment = deployment.get_as("")?;
                let spec = ServiceSpec::for_deployment(
                    &created,
                    request.deployment.namespace.as_str(),
                    expose.name.as_str(),
                    expose.port,
                    expose.container_port,
                    expose.protocol,
                )?
                .with_type(expose.service_type);

                let manifest = spec.build()?;
                let service = self.client.create_resource(&manifest).await?;
                info!("Service {} created", manifest.object_path());
                Some(service)
            }
            None => None,
        };

        Ok(DeployOutcome {
            deployment,
            service,
        })
    }

    /// Apply independent requests concurrently.
    ///
    /// Fails with the first error met; requests already applied are not rolled back.
    pub async fn apply_all(&self, requests: &[DeployRequest]) -> Result<Vec<DeployOutcome>> {
        try_join_all(requests.iter().map(|request| self.apply(request))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Method, StepError};
    use async_trait::async_trait;
    use definition::{ContainerSpec, ContentType};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Echoes every payload back, the way the control plane returns created objects.
    #[derive(Default)]
    struct EchoClient {
        calls: Mutex<Vec<(Method, String, Value)>>,
    }

    impl EchoClient {
        fn calls(&self) -> Vec<(Method, String, Value)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ResourceClient for EchoClient {
        async fn apply(
            &self,
            verb: Method,
            path: &str,
            _content_type: ContentType,
            payload: String,
        ) -> Result<ApplyResult> {
            let document: Value = serde_json::from_str(&payload).unwrap();
            self.calls
                .lock()
                .unwrap()
                .push((verb, path.to_string(), document));
            ApplyResult::decode(201, ContentType::Json, &payload)
        }
    }

    #[derive(Debug)]
    struct CountingStep {
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl ExternalStep for CountingStep {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run(&self) -> std::result::Result<Vec<String>, StepError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StepError::Failed {
                    step: "counting".to_string(),
                    code: Some(1),
                    stderr: "boom".to_string(),
                });
            }
            Ok(vec![])
        }
    }

    fn flask_request(container_port: u16) -> DeployRequest {
        DeployRequest {
            image: None,
            deployment: DeploymentSpec::new(
                "team",
                "meu-app-flask",
                "meu-app-flask-label",
                vec![ContainerSpec::new("meu-app-flask", "gcr.io/k8shelloworld/hello-flask:v2")
                    .with_ports(vec![5000, 8080])],
            ),
            service: Some(ExposeSpec {
                name: "servico-do-meu-app-flask".to_string(),
                port: 80,
                container_port,
                protocol: None,
                service_type: ServiceType::LoadBalancer,
            }),
        }
    }

    #[tokio::test]
    async fn deployment_is_created_before_its_service() {
        let client = EchoClient::default();
        let outcome = Pipeline::new(&client).apply(&flask_request(8080)).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, Method::POST);
        assert_eq!(calls[0].1, "/apis/extensions/v1beta1/namespaces/team/deployments");
        assert_eq!(calls[1].1, "/api/v1/namespaces/team/services");
        assert_eq!(
            calls[1].2["spec"],
            json!({
                "type": "LoadBalancer",
                "selector": { "app": "meu-app-flask-label" },
                "ports": [{ "port": 80, "targetPort": 8080, "protocol": "TCP" }]
            })
        );

        let service = outcome.service.unwrap();
        assert_eq!(service.get("metadata.name"), Some(&json!("servico-do-meu-app-flask")));
        assert_eq!(outcome.deployment.get("kind"), Some(&json!("Deployment")));
    }

    #[tokio::test]
    async fn unknown_container_port_stops_before_the_service() {
        let client = EchoClient::default();
        let error = Pipeline::new(&client).apply(&flask_request(9999)).await.unwrap_err();

        assert!(matches!(
            error,
            Error::Manifest(definition::Error::Validation { ref field, .. }) if field == "target_port"
        ));
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn service_protocol_can_be_chosen() {
        let client = EchoClient::default();
        let ports: definition::Ports =
            serde_json::from_value(json!({ "tcp": 53, "udp": 53 })).unwrap();
        let mut request = flask_request(53);
        request.deployment.containers =
            vec![ContainerSpec::new("coredns", "coredns/coredns:1.11").with_ports(ports)];

        let error = Pipeline::new(&client).apply(&request).await.unwrap_err();
        assert!(matches!(
            error,
            Error::Manifest(definition::Error::Validation { ref field, .. }) if field == "protocol"
        ));

        if let Some(expose) = request.service.as_mut() {
            expose.protocol = Some(Protocol::Udp);
        }
        let outcome = Pipeline::new(&client).apply(&request).await.unwrap();

        let service = outcome.service.unwrap();
        assert_eq!(service.get("spec.ports.0.protocol"), Some(&json!("UDP")));
        assert_eq!(service.get("spec.ports.0.targetPort"), Some(&json!(53)));
    }

    #[tokio::test]
    async fn invalid_deployment_sends_nothing() {
        let client = EchoClient::default();
        let mut request = flask_request(8080);
        request.deployment.containers.clear();

        let error = Pipeline::new(&client).apply(&request).await.unwrap_err();

        assert!(matches!(error, Error::Manifest(_)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn failing_step_prevents_the_apply() {
        let client = EchoClient::default();
        let runs = Arc::new(AtomicUsize::new(0));
        let steps: Vec<Box<dyn ExternalStep>> = vec![
            Box::new(CountingStep {
                runs: runs.clone(),
                fail: true,
            }),
            Box::new(CountingStep {
                runs: runs.clone(),
                fail: false,
            }),
        ];

        let error = Pipeline::new(&client)
            .run(&flask_request(8080), &steps)
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Step(StepError::Failed { .. })));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn apply_all_ships_every_request() {
        let client = EchoClient::default();
        let mut other = flask_request(5000);
        other.deployment.name = "other-app".to_string();
        other.service = None;

        let outcomes = Pipeline::new(&client)
            .apply_all(&[flask_request(8080), other])
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].service.is_some());
        assert!(outcomes[1].service.is_none());
        assert_eq!(client.calls().len(), 3);
    }

    #[test]
    fn image_build_expands_into_docker_steps() {
        let request: DeployRequest = serde_json::from_value(json!({
            "image": { "context": "/src/app", "tag": "registry/app:v1" },
            "deployment": {
                "namespace": "default",
                "name": "app",
                "app_label": "app",
                "containers": [{ "name": "app", "image": "registry/app:v1", "ports": [8080] }]
            }
        }))
        .unwrap();

        let names: Vec<String> = request.steps().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["build", "push"]);
        assert!(request.service.is_none());
    }
}

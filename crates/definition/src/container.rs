use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::str::FromStr;

use crate::{required_slug, Error, Result};

/// Transport protocol of a container or service port.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
}

impl Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
            Protocol::Sctp => write!(f, "SCTP"),
        }
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "sctp" => Ok(Protocol::Sctp),
            _ => Err(Error::validation(
                "protocol",
                format!("unknown protocol \"{}\"", value),
            )),
        }
    }
}

/// One port or a list of ports declared under a protocol key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum PortSet {
    One(u16),
    Many(Vec<u16>),
}

impl PortSet {
    pub fn as_slice(&self) -> &[u16] {
        match self {
            PortSet::One(port) => std::slice::from_ref(port),
            PortSet::Many(ports) => ports,
        }
    }
}

/// Ports exposed by a container, as declared by the caller.
///
/// Either a plain ordered list (`[80, 8080]`) or a mapping from protocol
/// to port(s) (`{"tcp": [80, 8080], "udp": 8081}`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Ports {
    List(Vec<u16>),
    ByProtocol(BTreeMap<String, PortSet>),
}

impl Default for Ports {
    fn default() -> Self {
        Ports::List(Vec::new())
    }
}

impl From<Vec<u16>> for Ports {
    fn from(ports: Vec<u16>) -> Self {
        Ports::List(ports)
    }
}

impl From<BTreeMap<String, PortSet>> for Ports {
    fn from(ports: BTreeMap<String, PortSet>) -> Self {
        Ports::ByProtocol(ports)
    }
}

/// `ContainerSpec` is the caller's description of one container.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub ports: Ports,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ports: Ports::default(),
        }
    }

    pub fn with_ports(mut self, ports: impl Into<Ports>) -> Self {
        self.ports = ports.into();
        self
    }

    /// Normalize this container into its document form.
    ///
    /// `index` is only used to name the offending field in errors.
    pub(crate) fn build(&self, index: usize) -> Result<Container> {
        let name = required_slug(&format!("containers[{}].name", index), &self.name)?;

        let image = self.image.trim().to_lowercase();
        if image.is_empty() {
            return Err(Error::validation(
                format!("containers[{}].image", index),
                "image reference is empty",
            ));
        }

        let ports = self.build_ports(index)?;

        Ok(Container { name, image, ports })
    }

    fn build_ports(&self, index: usize) -> Result<Vec<ContainerPort>> {
        let field = format!("containers[{}].ports", index);
        let check = |port: u16| {
            if port == 0 {
                Err(Error::validation(&field, "port must be a positive integer"))
            } else {
                Ok(port)
            }
        };

        match &self.ports {
            Ports::List(ports) => ports
                .iter()
                .map(|&port| {
                    check(port).map(|container_port| ContainerPort {
                        container_port,
                        protocol: None,
                    })
                })
                .collect(),
            Ports::ByProtocol(by_protocol) => {
                let mut entries = Vec::new();
                let mut seen = BTreeSet::new();
                for (key, set) in by_protocol {
                    let protocol = key
                        .parse::<Protocol>()
                        .map_err(|_| Error::validation(&field, format!("unknown protocol \"{}\"", key)))?;
                    if !seen.insert(protocol) {
                        return Err(Error::validation(
                            &field,
                            format!("protocol {} is declared more than once", protocol),
                        ));
                    }
                    for &port in set.as_slice() {
                        entries.push(ContainerPort {
                            container_port: check(port)?,
                            protocol: Some(protocol),
                        });
                    }
                }
                Ok(entries)
            }
        }
    }
}

/// A container as it appears in a pod template.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub container_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn container_name_is_slugified_and_image_lowercased() {
        let container = ContainerSpec::new("My Container!", "NGINX:Latest")
            .build(0)
            .unwrap();

        assert_eq!(container.name, "my-container");
        assert_eq!(container.image, "nginx:latest");
        assert!(container.ports.is_empty());
    }

    #[test]
    fn port_list_keeps_order() {
        let container = ContainerSpec::new("web", "nginx")
            .with_ports(vec![80, 8080])
            .build(0)
            .unwrap();

        assert_eq!(
            serde_json::to_value(&container.ports).unwrap(),
            json!([{ "containerPort": 80 }, { "containerPort": 8080 }])
        );
    }

    #[test]
    fn protocol_mapping_produces_one_entry_per_port() {
        let ports: Ports =
            serde_json::from_value(json!({ "udp": 8081, "tcp": [80, 8080] })).unwrap();
        let container = ContainerSpec::new("web", "nginx")
            .with_ports(ports)
            .build(0)
            .unwrap();

        assert_eq!(
            serde_json::to_value(&container.ports).unwrap(),
            json!([
                { "containerPort": 80, "protocol": "TCP" },
                { "containerPort": 8080, "protocol": "TCP" },
                { "containerPort": 8081, "protocol": "UDP" },
            ])
        );
    }

    #[test]
    fn unknown_protocol_is_rejected() {
        let ports: Ports = serde_json::from_value(json!({ "quic": 443 })).unwrap();
        let error = ContainerSpec::new("web", "nginx")
            .with_ports(ports)
            .build(2)
            .unwrap_err();

        assert_eq!(
            error,
            Error::Validation {
                field: "containers[2].ports".to_string(),
                reason: "unknown protocol \"quic\"".to_string(),
            }
        );
    }

    #[test]
    fn protocol_keys_differing_by_case_are_rejected() {
        let ports: Ports = serde_json::from_value(json!({ "tcp": 80, "TCP": 80 })).unwrap();
        let error = ContainerSpec::new("web", "nginx")
            .with_ports(ports)
            .build(0)
            .unwrap_err();

        assert_eq!(
            error,
            Error::Validation {
                field: "containers[0].ports".to_string(),
                reason: "protocol TCP is declared more than once".to_string(),
            }
        );
    }

    #[test]
    fn zero_port_is_rejected() {
        let result = ContainerSpec::new("web", "nginx")
            .with_ports(vec![80, 0])
            .build(0);

        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn empty_name_or_image_is_rejected() {
        assert!(ContainerSpec::new("?!", "nginx").build(0).is_err());
        assert!(ContainerSpec::new("web", "   ").build(0).is_err());
    }

    #[test]
    fn ports_default_to_an_empty_list() {
        let spec: ContainerSpec =
            serde_json::from_value(json!({ "name": "web", "image": "nginx" })).unwrap();
        assert_eq!(spec.ports, Ports::List(vec![]));
    }
}

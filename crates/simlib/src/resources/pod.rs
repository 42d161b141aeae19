use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ResourceError;
use crate::etcd;
use crate::etcd::prefix;

/// A pod, in the shape the Kubernetes API serves it.  Only the fields a
/// control plane looks at when tracking a workload are modelled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodResource {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: PodResourceSpec,
    pub status: PodStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodResourceSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_containers: Vec<Container>,

    #[serde(default)]
    pub containers: Vec<Container>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub image: String,
}

impl Container {
    pub fn new(name: &str, image: &str) -> Self {
        Self {
            name: name.to_owned(),
            image: image.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodStatus {
    pub phase: PodPhase,
    #[serde(rename = "podIP", default, skip_serializing_if = "String::is_empty")]
    pub pod_ip: String,
    #[serde(rename = "podIPs", default, skip_serializing_if = "Vec::is_empty")]
    pub pod_ips: Vec<PodIp>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodIp {
    pub ip: String,
}

///////////////////////////////////////////////////////////////////////////////

/// The phase of a pod.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    /// Accepted, but not all containers have started
    #[default]
    Pending,
    /// Bound to a node, all containers created, at least one running
    Running,
    /// All containers exited successfully
    Succeeded,
    /// All containers exited, at least one unsuccessfully
    Failed,
    /// State could not be obtained
    Unknown,
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        };
        write!(f, "{s}")
    }
}

///////////////////////////////////////////////////////////////////////////////

impl PodResource {
    /// Construct a pod with no containers and a pending status.
    pub fn new(name: String, namespace: String) -> Self {
        Self {
            api_version: "v1".to_owned(),
            kind: "Pod".to_owned(),
            metadata: ObjectMeta {
                name,
                namespace,
                labels: BTreeMap::new(),
            },
            spec: PodResourceSpec::default(),
            status: PodStatus::default(),
        }
    }

    /// Set a label, overwriting any existing value.
    pub fn with_label(mut self, key: &str, value: String) -> Self {
        self.metadata.labels.insert(key.to_owned(), value);
        self
    }

    /// Append an init container.
    pub fn with_init_container(mut self, container: Container) -> Self {
        self.spec.init_containers.push(container);
        self
    }

    /// Append a container.
    pub fn with_container(mut self, container: Container) -> Self {
        self.spec.containers.push(container);
        self
    }

    pub fn with_service_account(mut self, name: String) -> Self {
        self.spec.service_account_name = Some(name);
        self
    }

    pub fn with_node_name(mut self, name: String) -> Self {
        self.spec.node_name = Some(name);
        self
    }

    /// Set the status to the given phase, with a single pod IP.
    pub fn with_status(mut self, phase: PodPhase, ip: String) -> Self {
        self.status = PodStatus {
            phase,
            pod_ips: vec![PodIp { ip: ip.clone() }],
            pod_ip: ip,
        };
        self
    }

    /// Check the name is a DNS subdomain and the namespace a DNS label, which
    /// is what the API server would insist on.
    pub fn validate(&self) -> Result<(), ResourceError> {
        if !is_valid_dns_subdomain(&self.metadata.name) {
            return Err(ResourceError::BadName);
        }
        if !is_valid_dns_label(&self.metadata.namespace) {
            return Err(ResourceError::BadNamespace);
        }

        Ok(())
    }

    /// Get the etcd key for this pod.
    pub fn key(&self, etcd_config: &etcd::Config) -> String {
        format!(
            "{prefix}{name}",
            prefix = prefix::pods(etcd_config, &self.metadata.namespace),
            name = self.metadata.name,
        )
    }

    /// Serialise to the JSON stored under `key`.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, ResourceError> {
        Ok(serde_json::to_vec(self)?)
    }
}

///////////////////////////////////////////////////////////////////////////////

/// Check that a string is lowercase alphanumerics and hyphens, starting and
/// ending with an alphanumeric, and at most 63 characters.
fn is_valid_dns_label(s: &str) -> bool {
    let valid_character = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-';

    !s.is_empty()
        && s.len() <= 63
        && s.chars().all(valid_character)
        && !s.starts_with('-')
        && !s.ends_with('-')
}

/// Check that a string is dot-separated DNS labels, at most 253 characters.
fn is_valid_dns_subdomain(s: &str) -> bool {
    s.len() <= 253 && s.split('.').all(is_valid_dns_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_pod() -> PodResource {
        PodResource::new("web-abc123".to_owned(), "ns1".to_owned())
            .with_label("app", "web".to_owned())
            .with_init_container(Container::new("istio-init", "istio/proxyv2"))
            .with_container(Container::new("app", "app"))
            .with_status(PodPhase::Running, "10.0.0.1".to_owned())
    }

    #[test]
    fn serialises_with_kubernetes_field_names() {
        let value = serde_json::to_value(running_pod()).unwrap();

        assert_eq!(value["apiVersion"], "v1");
        assert_eq!(value["kind"], "Pod");
        assert_eq!(value["metadata"]["labels"]["app"], "web");
        assert_eq!(value["spec"]["initContainers"][0]["name"], "istio-init");
        assert_eq!(value["status"]["phase"], "Running");
        assert_eq!(value["status"]["podIP"], "10.0.0.1");
        assert_eq!(value["status"]["podIPs"][0]["ip"], "10.0.0.1");
        assert!(value["spec"].get("serviceAccountName").is_none());
        assert!(value["spec"].get("nodeName").is_none());
    }

    #[test]
    fn phase_displays_as_serialised() {
        assert_eq!(PodPhase::Running.to_string(), "Running");
        assert_eq!(
            serde_json::to_value(PodPhase::Succeeded).unwrap(),
            PodPhase::Succeeded.to_string()
        );
    }

    #[test]
    fn validate_rejects_names_the_api_server_would() {
        assert!(running_pod().validate().is_ok());

        let upper = PodResource::new("Web-1".to_owned(), "ns1".to_owned());
        assert!(matches!(upper.validate(), Err(ResourceError::BadName)));

        let trailing = PodResource::new("web-".to_owned(), "ns1".to_owned());
        assert!(matches!(trailing.validate(), Err(ResourceError::BadName)));

        let dotted_ns = PodResource::new("web-1".to_owned(), "a.b".to_owned());
        assert!(matches!(
            dotted_ns.validate(),
            Err(ResourceError::BadNamespace)
        ));

        let dotted_name = PodResource::new("web-1.v2".to_owned(), "ns1".to_owned());
        assert!(dotted_name.validate().is_ok());
    }
}

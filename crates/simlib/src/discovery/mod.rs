pub mod client;
pub mod config;
pub mod pb;

use prost_types::value::Kind;
use prost_types::{ListValue, Struct};
use serde_json::{Map, Value};
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::discovery::pb::Node;

// convenience re-exports
pub use client::AdsClient;
pub use config::Config;

pub static CLUSTER_TYPE_URL: &str = "type.googleapis.com/envoy.config.cluster.v3.Cluster";
pub static LISTENER_TYPE_URL: &str = "type.googleapis.com/envoy.config.listener.v3.Listener";
pub static ENDPOINT_TYPE_URL: &str =
    "type.googleapis.com/envoy.config.endpoint.v3.ClusterLoadAssignment";

/// User agent reported in the node, as a real sidecar would.
pub static USER_AGENT_NAME: &str = "envoy";

/// Trait for things which can hold a discovery session open on behalf of a
/// simulated proxy.
pub trait SessionClient: Send + Sync + 'static {
    /// Run a session against `address` until it ends or `cancel` fires.
    /// Failures are the client's to log or retry; nothing is reported back.
    fn connect(
        &self,
        cancel: CancellationToken,
        address: String,
        config: SessionConfig,
    ) -> impl Future<Output = ()> + Send;
}

/// Everything a session needs to present itself as one proxy.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    pub namespace: String,
    pub workload: String,
    /// Node metadata, forwarded verbatim into the handshake.
    pub meta: Map<String, Value>,
    pub node_type: String,
    pub ip: String,
    /// Log every response, rather than just failures.
    pub verbose: bool,
}

impl SessionConfig {
    /// The node id in the `type~ip~id~domain` form the control plane parses.
    pub fn node_id(&self) -> String {
        format!(
            "{node_type}~{ip}~{workload}.{namespace}~{namespace}.svc.cluster.local",
            node_type = self.node_type,
            ip = self.ip,
            workload = self.workload,
            namespace = self.namespace,
        )
    }

    pub fn node(&self) -> Node {
        Node {
            id: self.node_id(),
            metadata: Some(json_to_struct(&self.meta)),
            user_agent_name: USER_AGENT_NAME.to_owned(),
        }
    }
}

///////////////////////////////////////////////////////////////////////////////

fn json_to_struct(map: &Map<String, Value>) -> Struct {
    Struct {
        fields: map
            .iter()
            .map(|(k, v)| (k.clone(), json_to_value(v)))
            .collect(),
    }
}

fn json_to_value(value: &Value) -> prost_types::Value {
    let kind = match value {
        Value::Null => Kind::NullValue(0),
        Value::Bool(b) => Kind::BoolValue(*b),
        Value::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or_default()),
        Value::String(s) => Kind::StringValue(s.clone()),
        Value::Array(vs) => Kind::ListValue(ListValue {
            values: vs.iter().map(json_to_value).collect(),
        }),
        Value::Object(m) => Kind::StructValue(json_to_struct(m)),
    };

    prost_types::Value { kind: Some(kind) }
}

//! The envoy v3 discovery messages a sidecar exchanges over ADS.  Only the
//! fields the simulated sidecar reads or writes are declared; protobuf skips
//! the rest when decoding.

use prost_types::{Any, Struct};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Node {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(message, optional, tag = "3")]
    pub metadata: Option<Struct>,
    #[prost(string, tag = "6")]
    pub user_agent_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DiscoveryRequest {
    #[prost(string, tag = "1")]
    pub version_info: String,
    #[prost(message, optional, tag = "2")]
    pub node: Option<Node>,
    #[prost(string, repeated, tag = "3")]
    pub resource_names: Vec<String>,
    #[prost(string, tag = "4")]
    pub type_url: String,
    #[prost(string, tag = "5")]
    pub response_nonce: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DiscoveryResponse {
    #[prost(string, tag = "1")]
    pub version_info: String,
    #[prost(message, repeated, tag = "2")]
    pub resources: Vec<Any>,
    #[prost(bool, tag = "3")]
    pub canary: bool,
    #[prost(string, tag = "4")]
    pub type_url: String,
    #[prost(string, tag = "5")]
    pub nonce: String,
}

/// The leading fields of `envoy.config.cluster.v3.Cluster`: enough to tell
/// which clusters want endpoints over EDS.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClusterHeader {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(int32, tag = "2")]
    pub discovery_type: i32,
}

/// `envoy.config.cluster.v3.Cluster.DiscoveryType.EDS`
pub const CLUSTER_DISCOVERY_TYPE_EDS: i32 = 3;

include!(concat!(
    env!("OUT_DIR"),
    "/envoy.service.discovery.v3.AggregatedDiscoveryService.rs"
));

use prost::Message;
use prost_types::Any;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tonic::Request;

use crate::discovery::pb::{
    ClusterHeader, DiscoveryRequest, DiscoveryResponse, Node, CLUSTER_DISCOVERY_TYPE_EDS,
};
use crate::discovery::{
    Config, SessionClient, SessionConfig, CLUSTER_TYPE_URL, ENDPOINT_TYPE_URL, LISTENER_TYPE_URL,
};
use crate::error::{Error, StreamingError};

/// Reconnection backoff is `2^retries` seconds, with `retries` capped here.
pub static MAXIMUM_BACKOFF_EXPONENT: u32 = 5;

/// A `SessionClient` which speaks ADS over plaintext gRPC, subscribing to
/// clusters, listeners, and endpoints like a sidecar would.
#[derive(Clone, Debug)]
pub struct AdsClient {
    config: Config,
}

impl AdsClient {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Hold one stream open until it fails, or until the control plane closes
    /// it, in which case this returns `Ok`.
    async fn session(
        &self,
        address: &str,
        config: &SessionConfig,
        received: &mut u64,
    ) -> Result<(), Error> {
        let mut ads_client = self.config.ads_client(address).await?;
        let mut state = AdsState::new(config.node());

        let (tx, rx) = mpsc::unbounded_channel();
        for request in state.initial_requests() {
            tx.send(request).map_err(|_| StreamingError::Ended)?;
        }

        let mut response_stream = ads_client
            .stream_aggregated_resources(Request::new(UnboundedReceiverStream::new(rx)))
            .await?
            .into_inner();
        tracing::debug!(workload = config.workload, address, "discovery session established");

        while let Some(response) = response_stream.next().await {
            let response = response?;
            *received += 1;

            if config.verbose {
                tracing::info!(
                    workload = config.workload,
                    type_url = response.type_url,
                    version = response.version_info,
                    resources = response.resources.len(),
                    "received discovery response"
                );
            }

            for request in state.handle_response(&response) {
                tx.send(request).map_err(|_| StreamingError::Ended)?;
            }
        }

        Ok(())
    }
}

impl SessionClient for AdsClient {
    async fn connect(&self, cancel: CancellationToken, address: String, config: SessionConfig) {
        let workload = &config.workload;
        let mut retries: u32 = 0;

        loop {
            let mut received = 0;
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(workload, "discovery session cancelled");
                    return;
                }
                result = self.session(&address, &config, &mut received) => result,
            };

            let backoff = backoff(&mut retries, received);

            match result {
                Ok(()) => tracing::info!(workload, ?backoff, "discovery session closed"),
                Err(error) => {
                    tracing::warn!(?error, workload, ?backoff, "error in discovery session")
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(backoff) => (),
            }
        }
    }
}

/// Update the retry count after a session ends and return how long to wait
/// before reconnecting: 1s if the session got any responses, otherwise
/// doubling from 2s.
fn backoff(retries: &mut u32, received: u64) -> Duration {
    if received > 0 {
        *retries = 0;
    } else {
        *retries = (*retries + 1).min(MAXIMUM_BACKOFF_EXPONENT);
    }

    Duration::from_secs(2_u64.pow(*retries))
}

///////////////////////////////////////////////////////////////////////////////

/// The subscription state of one type on an ADS stream.
#[derive(Debug, Default)]
struct Watch {
    resource_names: Vec<String>,
    version_info: String,
    nonce: String,
}

/// Tracks what has been requested and acknowledged on a single ADS stream,
/// and decides what to send next.
#[derive(Debug)]
pub struct AdsState {
    /// Sent on the first request only, then `None`.
    node: Option<Node>,
    watches: HashMap<String, Watch>,
}

impl AdsState {
    pub fn new(node: Node) -> Self {
        Self {
            node: Some(node),
            watches: HashMap::new(),
        }
    }

    /// Wildcard subscriptions to clusters and listeners.
    pub fn initial_requests(&mut self) -> Vec<DiscoveryRequest> {
        vec![
            self.request(CLUSTER_TYPE_URL),
            self.request(LISTENER_TYPE_URL),
        ]
    }

    /// ACK a response.  A cluster response which changes the set of EDS
    /// clusters also (re)subscribes to their endpoints.
    pub fn handle_response(&mut self, response: &DiscoveryResponse) -> Vec<DiscoveryRequest> {
        let watch = self.watches.entry(response.type_url.clone()).or_default();
        watch.version_info.clone_from(&response.version_info);
        watch.nonce.clone_from(&response.nonce);

        let mut requests = vec![self.request(&response.type_url)];

        if response.type_url == CLUSTER_TYPE_URL {
            let eds_clusters = eds_cluster_names(&response.resources);
            let endpoints = self.watches.entry(ENDPOINT_TYPE_URL.to_owned()).or_default();
            if endpoints.resource_names != eds_clusters {
                endpoints.resource_names = eds_clusters;
                requests.push(self.request(ENDPOINT_TYPE_URL));
            }
        }

        requests
    }

    fn request(&mut self, type_url: &str) -> DiscoveryRequest {
        let watch = self.watches.entry(type_url.to_owned()).or_default();

        DiscoveryRequest {
            version_info: watch.version_info.clone(),
            node: self.node.take(),
            resource_names: watch.resource_names.clone(),
            type_url: type_url.to_owned(),
            response_nonce: watch.nonce.clone(),
        }
    }
}

/// Names of the clusters which get their endpoints from EDS, sorted.
fn eds_cluster_names(resources: &[Any]) -> Vec<String> {
    let mut names: Vec<String> = resources
        .iter()
        .filter_map(|any| match ClusterHeader::decode(any.value.as_slice()) {
            Ok(cluster) if cluster.discovery_type == CLUSTER_DISCOVERY_TYPE_EDS => {
                Some(cluster.name)
            }
            Ok(_) => None,
            Err(error) => {
                tracing::debug!(?error, "could not decode cluster");
                None
            }
        })
        .collect();
    names.sort();

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(name: &str, discovery_type: i32) -> Any {
        Any {
            type_url: CLUSTER_TYPE_URL.to_owned(),
            value: ClusterHeader {
                name: name.to_owned(),
                discovery_type,
            }
            .encode_to_vec(),
        }
    }

    fn response(
        type_url: &str,
        version: &str,
        nonce: &str,
        resources: Vec<Any>,
    ) -> DiscoveryResponse {
        DiscoveryResponse {
            version_info: version.to_owned(),
            resources,
            canary: false,
            type_url: type_url.to_owned(),
            nonce: nonce.to_owned(),
        }
    }

    fn node() -> Node {
        Node {
            id: "sidecar~10.0.0.1~web-abc.ns1~ns1.svc.cluster.local".to_owned(),
            metadata: None,
            user_agent_name: "envoy".to_owned(),
        }
    }

    #[test]
    fn initial_requests_send_node_once() {
        let mut state = AdsState::new(node());
        let requests = state.initial_requests();

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].type_url, CLUSTER_TYPE_URL);
        assert_eq!(requests[0].node, Some(node()));
        assert_eq!(requests[1].type_url, LISTENER_TYPE_URL);
        assert_eq!(requests[1].node, None);
        assert!(requests.iter().all(|r| r.resource_names.is_empty()));
        assert!(requests.iter().all(|r| r.response_nonce.is_empty()));
    }

    #[test]
    fn listener_response_is_acked() {
        let mut state = AdsState::new(node());
        state.initial_requests();

        let requests =
            state.handle_response(&response(LISTENER_TYPE_URL, "v1", "n1", Vec::new()));

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].type_url, LISTENER_TYPE_URL);
        assert_eq!(requests[0].version_info, "v1");
        assert_eq!(requests[0].response_nonce, "n1");
        assert_eq!(requests[0].node, None);
    }

    #[test]
    fn cluster_response_subscribes_to_eds_endpoints() {
        let mut state = AdsState::new(node());
        state.initial_requests();

        let eds = "outbound|80||web.ns1.svc.cluster.local";
        let clusters = vec![
            cluster(eds, CLUSTER_DISCOVERY_TYPE_EDS),
            cluster("BlackHoleCluster", 0),
        ];
        let requests =
            state.handle_response(&response(CLUSTER_TYPE_URL, "v1", "n1", clusters.clone()));

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].type_url, CLUSTER_TYPE_URL);
        assert_eq!(requests[0].response_nonce, "n1");
        assert_eq!(requests[1].type_url, ENDPOINT_TYPE_URL);
        assert_eq!(requests[1].resource_names, vec![eds.to_owned()]);
        assert!(requests[1].response_nonce.is_empty());

        // same clusters again: ACK only
        let requests = state.handle_response(&response(CLUSTER_TYPE_URL, "v2", "n2", clusters));
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].version_info, "v2");
    }

    #[test]
    fn endpoint_ack_keeps_subscribed_names() {
        let mut state = AdsState::new(node());
        state.initial_requests();

        let eds = "outbound|80||web.ns1.svc.cluster.local";
        state.handle_response(&response(
            CLUSTER_TYPE_URL,
            "v1",
            "n1",
            vec![cluster(eds, CLUSTER_DISCOVERY_TYPE_EDS)],
        ));
        let requests =
            state.handle_response(&response(ENDPOINT_TYPE_URL, "e1", "n2", Vec::new()));

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].resource_names, vec![eds.to_owned()]);
        assert_eq!(requests[0].version_info, "e1");
    }

    #[test]
    fn undecodable_clusters_are_skipped() {
        let garbage = Any {
            type_url: CLUSTER_TYPE_URL.to_owned(),
            value: vec![0xff, 0xff, 0xff],
        };

        assert!(eds_cluster_names(&[garbage]).is_empty());
    }

    #[test]
    fn backoff_doubles_to_a_cap_and_resets_after_responses() {
        let mut retries = 0;
        let waits: Vec<u64> = (0..7)
            .map(|_| backoff(&mut retries, 0).as_secs())
            .collect();
        assert_eq!(waits, vec![2, 4, 8, 16, 32, 32, 32]);

        assert_eq!(backoff(&mut retries, 3), Duration::from_secs(1));
        assert_eq!(retries, 0);
        assert_eq!(backoff(&mut retries, 0), Duration::from_secs(2));
    }

    // nothing listens on port 1
    fn unreachable_client() -> AdsClient {
        AdsClient::new(Config {
            address: "127.0.0.1:1".to_owned(),
            connect_timeout: Duration::from_secs(1),
        })
    }

    fn session_config() -> SessionConfig {
        SessionConfig {
            namespace: "ns1".to_owned(),
            workload: "web-abc".to_owned(),
            meta: serde_json::Map::new(),
            node_type: "sidecar".to_owned(),
            ip: "10.0.0.1".to_owned(),
            verbose: false,
        }
    }

    #[tokio::test]
    async fn connect_returns_once_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        tokio::time::timeout(
            Duration::from_secs(5),
            unreachable_client().connect(cancel, "127.0.0.1:1".to_owned(), session_config()),
        )
        .await
        .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_during_backoff_ends_connect() {
        let cancel = CancellationToken::new();
        let session = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                unreachable_client()
                    .connect(cancel, "127.0.0.1:1".to_owned(), session_config())
                    .await
            }
        });

        // past the first failed attempt, inside the first 2s backoff
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!session.is_finished());
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), session)
            .await
            .unwrap()
            .unwrap();
    }
}

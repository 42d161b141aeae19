use serde_json::{Map, Value};
use std::sync::Arc;

use crate::discovery::{SessionClient, SessionConfig};
use crate::error::Error;
use crate::resources::pod::{Container, PodPhase, PodResource};
use crate::resources::ClusterClient;
use crate::simulation::{Context, Simulation};
use crate::util::IdentityAllocator;

/// Proxy version advertised in session metadata.
pub static ISTIO_VERSION: &str = "1.6.0";

/// Cluster advertised in session metadata.
pub static CLUSTER_ID: &str = "Kubernetes";

/// Node type of the simulated proxy.
pub static NODE_TYPE: &str = "sidecar";

/// Image of both the proxy and its init container.
pub static PROXY_IMAGE: &str = "istio/proxyv2";

/// Who a simulated pod claims to be.
///
/// Names are not validated: realistic values are the caller's business.  A
/// blank `uid` or `ip` is filled in by `normalise`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PodSpec {
    pub service_account: String,
    pub node: String,
    pub app: String,
    pub namespace: String,
    pub uid: String,
    pub ip: String,
}

impl PodSpec {
    /// Fill in a blank uid and address from the allocator.  A descriptor which
    /// already has both is returned unchanged.
    pub fn normalise(mut self, allocator: &impl IdentityAllocator) -> Self {
        if self.uid.is_empty() {
            self.uid = allocator.unique_id();
        }
        if self.ip.is_empty() {
            self.ip = allocator.address();
        }
        self
    }

    /// The pod name, which is also the workload name of its session.
    pub fn name(&self) -> String {
        format!("{app}-{uid}", app = self.app, uid = self.uid)
    }
}

/// A pod resource plus the discovery session of its sidecar.
#[derive(Debug)]
pub struct Pod {
    spec: PodSpec,
}

impl Pod {
    pub fn new(spec: PodSpec, allocator: &impl IdentityAllocator) -> Self {
        Self {
            spec: spec.normalise(allocator),
        }
    }

    pub fn spec(&self) -> &PodSpec {
        &self.spec
    }

    /// The pod as submitted to the cluster.  Creation and deletion both go
    /// through here, so they always agree on what the pod is.
    pub fn resource(&self) -> PodResource {
        let s = &self.spec;

        let mut pod = PodResource::new(s.name(), s.namespace.clone())
            .with_label("app", s.app.clone())
            .with_init_container(Container::new("istio-init", PROXY_IMAGE))
            .with_container(Container::new("app", "app"))
            .with_container(Container::new("istio-proxy", PROXY_IMAGE))
            .with_status(PodPhase::Running, s.ip.clone());

        if !s.service_account.is_empty() {
            pod = pod.with_service_account(s.service_account.clone());
        }
        if !s.node.is_empty() {
            pod = pod.with_node_name(s.node.clone());
        }

        pod
    }

    pub fn session_config(&self) -> SessionConfig {
        let s = &self.spec;

        let mut labels = Map::new();
        labels.insert("app".to_owned(), Value::String(s.app.clone()));

        let mut meta = Map::new();
        meta.insert("ISTIO_VERSION".to_owned(), ISTIO_VERSION.into());
        meta.insert("CLUSTER_ID".to_owned(), CLUSTER_ID.into());
        meta.insert("LABELS".to_owned(), Value::Object(labels));
        meta.insert("NAMESPACE".to_owned(), s.namespace.clone().into());

        SessionConfig {
            namespace: s.namespace.clone(),
            workload: s.name(),
            meta,
            node_type: NODE_TYPE.to_owned(),
            ip: s.ip.clone(),
            verbose: false,
        }
    }

    /// Start the sidecar's session in the background.  Nothing keeps hold of
    /// the task: it lives until the session client gives up or the context is
    /// cancelled.
    fn spawn_session<C: ClusterClient, S: SessionClient>(&self, ctx: &Context<C, S>) {
        let session = Arc::clone(&ctx.session);
        let cancel = ctx.cancel.clone();
        let address = ctx.discovery_address.clone();
        let config = self.session_config();

        tracing::debug!(workload = config.workload, address, "starting discovery session");
        tokio::spawn(async move { session.connect(cancel, address, config).await });
    }
}

impl<C: ClusterClient, S: SessionClient> Simulation<C, S> for Pod {
    /// Apply the pod, then start its session.  The session starts even if
    /// the apply failed.
    async fn run(&self, ctx: &Context<C, S>) -> Result<(), Error> {
        let applied = ctx.cluster.apply(&self.resource()).await;
        self.spawn_session(ctx);

        applied.map_err(Error::apply)
    }

    /// Delete the pod.  The session, if any, is left alone.
    async fn cleanup(&self, ctx: &Context<C, S>) -> Result<(), Error> {
        ctx.cluster.delete(&self.resource()).await
    }
}

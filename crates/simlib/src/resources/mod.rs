pub mod pod;

use std::future::Future;

use crate::error::Error;
use crate::etcd;

// convenience re-exports
pub use crate::resources::pod::{PodPhase, PodResource};

/// Trait for cluster-state stores that simulated pods are registered in.
///
/// Retry, auth, and timeout policy all belong to the implementation.
pub trait ClusterClient: Send + Sync + 'static {
    /// Create the pod, or replace it if it already exists.
    fn apply(&self, pod: &PodResource) -> impl Future<Output = Result<(), Error>> + Send;

    /// Delete the pod identified by the resource's namespace and name.
    fn delete(&self, pod: &PodResource) -> impl Future<Output = Result<(), Error>> + Send;
}

/// A `ClusterClient` which writes pods straight into etcd, under
/// `<prefix>/pods/<namespace>/<name>`.
#[derive(Clone, Debug)]
pub struct EtcdClusterClient {
    etcd_config: etcd::Config,
}

impl EtcdClusterClient {
    pub fn new(etcd_config: etcd::Config) -> Self {
        Self { etcd_config }
    }
}

impl ClusterClient for EtcdClusterClient {
    async fn apply(&self, pod: &PodResource) -> Result<(), Error> {
        create_or_replace(&self.etcd_config, pod).await
    }

    async fn delete(&self, pod: &PodResource) -> Result<(), Error> {
        let name = &pod.metadata.name;
        let namespace = &pod.metadata.namespace;
        if !etcd::util::delete_if_exists(&self.etcd_config, pod.key(&self.etcd_config)).await? {
            tracing::debug!(name, namespace, "pod did not exist");
        }

        Ok(())
    }
}

/// Persist a pod to etcd, overwriting any existing value.
pub async fn create_or_replace(etcd_config: &etcd::Config, pod: &PodResource) -> Result<(), Error> {
    pod.validate()?;

    let value = pod.to_json_vec()?;
    match etcd::util::put(etcd_config, pod.key(etcd_config), value).await {
        Ok(revision) => {
            tracing::debug!(
                name = pod.metadata.name,
                phase = %pod.status.phase,
                revision,
                "put pod"
            );
            Ok(())
        }
        Err(error) => {
            tracing::warn!(?error, name = pod.metadata.name, "could not put pod");
            Err(error)
        }
    }
}

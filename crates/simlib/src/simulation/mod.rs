pub mod pod;

use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::discovery::SessionClient;
use crate::error::Error;
use crate::resources::ClusterClient;

// convenience re-exports
pub use crate::simulation::pod::{Pod, PodSpec};

/// Trait for simulated resources: something which can be started against a
/// control plane and later cleaned up.
pub trait Simulation<C: ClusterClient, S: SessionClient> {
    /// Bring the resource into existence.
    fn run(&self, ctx: &Context<C, S>) -> impl Future<Output = Result<(), Error>> + Send;

    /// Remove what `run` created.
    fn cleanup(&self, ctx: &Context<C, S>) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Shared by every simulation the orchestrator starts.  Cancelling `cancel`
/// ends the background work those simulations spawned.
#[derive(Debug)]
pub struct Context<C, S> {
    pub cluster: Arc<C>,
    pub session: Arc<S>,
    /// Where discovery sessions connect to.
    pub discovery_address: String,
    pub cancel: CancellationToken,
}

impl<C: ClusterClient, S: SessionClient> Context<C, S> {
    pub fn new(cluster: C, session: S, discovery_address: String) -> Self {
        Self {
            cluster: Arc::new(cluster),
            session: Arc::new(session),
            discovery_address,
            cancel: CancellationToken::new(),
        }
    }
}

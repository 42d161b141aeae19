use clap::Parser;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};

use simlib::discovery;
use simlib::discovery::AdsClient;
use simlib::etcd;
use simlib::resources::EtcdClusterClient;
use simlib::simulation::{Pod, PodSpec};
use simlib::util::RandomAllocator;
use simlib::{Context, Simulation};

/// Control-plane load generator: registers simulated pods and holds a sidecar
/// discovery session open for each until terminated.
#[derive(Clone, Debug, Parser)]
struct Args {
    /// How many pods to create.
    #[clap(long, default_value = "1", env = "LOADGEN_PODS")]
    pub pods: usize,

    /// How long (in milliseconds) to wait between creating pods.
    #[clap(
        long,
        value_parser = |ms: &str| ms.parse().map(Duration::from_millis),
        default_value = "100",
        env = "LOADGEN_DELAY",
    )]
    pub delay: Duration,

    /// Namespace to create pods in.
    #[clap(long, default_value = "default", env = "LOADGEN_NAMESPACE")]
    pub namespace: String,

    /// `app` label of the pods, and the prefix of their names.
    #[clap(long, default_value = "app", env = "LOADGEN_APP")]
    pub app: String,

    /// Service account the pods run as.  Left off the pods if empty.
    #[clap(long, default_value = "", env = "LOADGEN_SERVICE_ACCOUNT")]
    pub service_account: String,

    /// Node the pods claim to be scheduled on.  Left off the pods if empty.
    #[clap(long, default_value = "", env = "LOADGEN_NODE")]
    pub node: String,

    #[command(flatten)]
    pub etcd: etcd::Config,

    #[command(flatten)]
    pub discovery: discovery::Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().json().init();

    let Args {
        pods: count,
        delay,
        namespace,
        app,
        service_account,
        node,
        etcd,
        discovery,
    } = Args::parse();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => (),
            _ = sigint.recv() => (),
        }
        tracing::info!("received shutdown signal, terminating...");
    };
    tokio::pin!(shutdown);

    let ctx = Context::new(
        EtcdClusterClient::new(etcd),
        AdsClient::new(discovery.clone()),
        discovery.address,
    );
    let allocator = RandomAllocator::default();
    let template = PodSpec {
        service_account,
        node,
        app,
        namespace,
        ..Default::default()
    };

    let mut pods = Vec::with_capacity(count);
    let mut interrupted = false;
    for idx in 0..count {
        let pod = Pod::new(template.clone(), &allocator);
        let pod_name = pod.spec().name();
        match pod.run(&ctx).await {
            Ok(()) => {
                tracing::info!(pod_name, idx, "created");
                pods.push(pod);
            }
            Err(error) => tracing::warn!(?error, pod_name, idx, "could not create pod"),
        }

        tokio::select! {
            _ = &mut shutdown => {
                interrupted = true;
                break;
            }
            _ = tokio::time::sleep(delay) => (),
        }
    }

    if !interrupted {
        tracing::info!(created = pods.len(), "all pods created, waiting for shutdown signal");
        shutdown.await;
    }

    ctx.cancel.cancel();
    for pod in &pods {
        let pod_name = pod.spec().name();
        match pod.cleanup(&ctx).await {
            Ok(()) => tracing::info!(pod_name, "deleted"),
            Err(error) => tracing::warn!(?error, pod_name, "could not delete pod"),
        }
    }

    Ok(())
}

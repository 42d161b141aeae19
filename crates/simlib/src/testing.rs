//! In-memory stand-ins for the collaborators of a simulation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::discovery::{SessionClient, SessionConfig};
use crate::error::Error;
use crate::resources::{ClusterClient, PodResource};
use crate::util::IdentityAllocator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Apply,
    Delete,
}

/// Records every call; fails them all with `fail_with`, if set.
#[derive(Debug, Default)]
pub struct FakeCluster {
    calls: Mutex<Vec<(Op, PodResource)>>,
    fail_with: Option<String>,
}

impl FakeCluster {
    pub fn failing(message: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(message.to_owned()),
        }
    }

    pub fn calls(&self) -> Vec<(Op, PodResource)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: Op, pod: &PodResource) -> Result<(), Error> {
        self.calls.lock().unwrap().push((op, pod.clone()));
        match &self.fail_with {
            Some(message) => Err(Error::EtcdResponse(message.clone())),
            None => Ok(()),
        }
    }
}

impl ClusterClient for FakeCluster {
    async fn apply(&self, pod: &PodResource) -> Result<(), Error> {
        self.record(Op::Apply, pod)
    }

    async fn delete(&self, pod: &PodResource) -> Result<(), Error> {
        self.record(Op::Delete, pod)
    }
}

/// Reports each connect on a channel, then holds the "session" open until
/// cancelled.
#[derive(Debug)]
pub struct FakeSession {
    tx: mpsc::UnboundedSender<(String, SessionConfig)>,
}

impl FakeSession {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, SessionConfig)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SessionClient for FakeSession {
    async fn connect(&self, cancel: CancellationToken, address: String, config: SessionConfig) {
        let _ = self.tx.send((address, config));
        cancel.cancelled().await;
    }
}

/// Hands out `uid1`, `uid2`, ... and `192.168.0.1`, `192.168.0.2`, ...
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    uids: AtomicUsize,
    addresses: AtomicUsize,
}

impl IdentityAllocator for SequenceAllocator {
    fn unique_id(&self) -> String {
        format!("uid{}", self.uids.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn address(&self) -> String {
        format!("192.168.0.{}", self.addresses.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

use thiserror::Error;

/// Generic error type
#[derive(Debug, Error)]
pub enum Error {
    /// Submitting a pod to the cluster-state store failed.
    #[error("failed to apply config: {0}")]
    Apply(Box<Error>),
    #[error("config: {0}")]
    Config(String),
    #[error("etcd response: {0}")]
    EtcdResponse(String),
    #[error("resource: {0}")]
    Resource(#[from] ResourceError),
    #[error("streaming: {0}")]
    Streaming(#[from] StreamingError),
    #[error("tonic status: {0}")]
    TonicStatus(#[from] tonic::Status),
    #[error("tonic transport: {0}")]
    TonicTransport(#[from] tonic::transport::Error),
}

impl Error {
    /// Wrap an error from the cluster-state client's `apply`.
    pub fn apply(error: Error) -> Self {
        Self::Apply(Box::new(error))
    }
}

/// Errors specific to resource processing.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("bad name")]
    BadName,
    #[error("bad namespace")]
    BadNamespace,
    #[error("serialise: {0}")]
    Serialise(#[from] serde_json::Error),
}

/// Errors specific to streaming RPCs.
#[derive(Debug, Error)]
pub enum StreamingError {
    #[error("ended")]
    Ended,
}

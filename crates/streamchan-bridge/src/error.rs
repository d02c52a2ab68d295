/// Errors returned by bridge handles.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The writer stopped or was closed before the value was queued.
    #[error("bridge is closed")]
    Closed,

    /// The background task panicked or was aborted.
    #[error("bridge task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

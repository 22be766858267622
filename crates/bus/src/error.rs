use thiserror::Error;

/// Transport-level bus failure.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus send failed: {0}")]
    Send(String),

    #[error("bus receive failed: {0}")]
    Receive(String),

    #[error("message settlement failed: {0}")]
    Settle(String),

    #[error("bus connection closed")]
    Closed,
}

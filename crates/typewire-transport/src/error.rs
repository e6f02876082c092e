use crate::{EndpointId, Side};

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The addressed endpoint isn't connected.
    #[error("unknown endpoint {0}")]
    UnknownEndpoint(EndpointId),

    /// The destination can't be reached from this side.
    #[error("{from} cannot send to {destination}")]
    Unroutable {
        /// The side attempting the send.
        from: Side,
        /// Kind of destination that was requested.
        destination: &'static str,
    },

    /// The peer went away.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}

//! Error types for dispatching and the unified error for the `typewire`
//! crate.

use typewire_codec::{DecodeError, EncodeError, SchemaError};
use typewire_transport::{Side, TransportError};

/// Why one inbound frame was not handled.
///
/// None of these affect the channel: the frame is dropped and the next one
/// is processed normally.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The frame couldn't be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The message type has no handler on the side it arrived on.
    #[error("no {side} handler for {message}")]
    NoHandler {
        /// The decoded message type.
        message: &'static str,
        /// The side the frame arrived on.
        side: Side,
    },

    /// The handler's reply couldn't be encoded.
    #[error("failed to encode reply to {request}: {source}")]
    Reply {
        /// The request being answered.
        request: &'static str,
        #[source]
        source: EncodeError,
    },

    /// A frame (inbound, outbound, or a reply) exceeds the configured limit.
    #[error("frame of {len} bytes exceeds the {max}-byte limit")]
    FrameTooLarge {
        /// Size of the frame.
        len: usize,
        /// The configured maximum.
        max: usize,
    },
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert codec,
/// transport and dispatch errors into this one type.
#[derive(Debug, thiserror::Error)]
pub enum TypewireError {
    /// The message schema is invalid (found at registration or sealing).
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// An outgoing message couldn't be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// An inbound frame couldn't be handled.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration couldn't be parsed.
    #[cfg(feature = "json")]
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use typewire_codec::Discriminator;

    #[test]
    fn test_from_schema_error() {
        let err: TypewireError = SchemaError::DuplicateType("Ping").into();
        assert!(matches!(err, TypewireError::Schema(_)));
        assert!(err.to_string().contains("Ping"));
    }

    #[test]
    fn test_from_transport_error() {
        let err: TypewireError = TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, TypewireError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_decode_error_passes_through_dispatch() {
        let err: DispatchError = DecodeError::UnknownDiscriminator(Discriminator(9)).into();
        let err: TypewireError = err.into();
        assert_eq!(err.to_string(), "unknown discriminator 0x09");
    }

    #[test]
    fn test_no_handler_message() {
        let err = DispatchError::NoHandler {
            message: "Pong",
            side: Side::Server,
        };
        assert_eq!(err.to_string(), "no server handler for Pong");
    }
}

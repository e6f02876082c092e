//! Error types for the codec layer.
//!
//! The codec distinguishes three kinds of failure, and each gets its own
//! enum so callers can't confuse them:
//!
//! - [`SchemaError`] is a programmer error found while wiring up message
//!   types (a duplicate discriminator, too many types). It should abort
//!   start-up.
//! - [`DecodeError`] means one incoming frame was malformed. The frame is
//!   rejected; nothing else is affected.
//! - [`EncodeError`] means an outgoing value could not be written.

use crate::Discriminator;

/// Errors raised while declaring the wire schema.
///
/// These only happen during registration, before any traffic flows, so
/// they are never caused by a remote peer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Every one of the 256 one-byte tags is already in use.
    #[error("all {capacity} discriminators are assigned")]
    DiscriminatorsExhausted {
        /// How many tags the scope can hold.
        capacity: usize,
    },

    /// The requested discriminator is already bound to something else.
    #[error("discriminator {0} is already assigned")]
    DuplicateDiscriminator(Discriminator),

    /// The same message type was registered twice.
    #[error("message type {0} is already registered")]
    DuplicateType(&'static str),

    /// Registration was attempted after the registry was sealed.
    #[error("registry is sealed; {0} cannot be registered")]
    Sealed(&'static str),

    /// Traffic was attempted through a registry that isn't sealed yet.
    #[error("registry is not sealed")]
    Unsealed,

    /// A handler was bound for a type that has no discriminator yet.
    #[error("message type {0} is not registered")]
    UnregisteredType(&'static str),

    /// A second handler was bound for the same type on the same side.
    #[error("message type {message} already has a {side} handler")]
    DuplicateHandler {
        /// The message type.
        message: &'static str,
        /// Which side the handler runs on ("client" or "server").
        side: &'static str,
    },

    /// A message declares a receiving side but no handler exists there.
    #[error("message type {message} is received on the {side} but has no handler there")]
    MissingHandler {
        /// The message type.
        message: &'static str,
        /// The side that would receive it.
        side: &'static str,
    },

    /// A handler replies with a type the registry doesn't know.
    #[error("reply type {reply} of {request} is not registered")]
    UnregisteredReply {
        /// The request type whose handler produces the reply.
        request: &'static str,
        /// The missing reply type.
        reply: &'static str,
    },
}

/// Errors raised while reading one frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The input ended before a value was complete.
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the read required.
        needed: usize,
        /// Bytes that were left.
        remaining: usize,
    },

    /// The leading frame byte isn't bound to any message type.
    #[error("unknown discriminator {0}")]
    UnknownDiscriminator(Discriminator),

    /// A sum type's branch tag matched none of its branches.
    #[error("unknown branch tag {tag} for {sum}")]
    UnknownBranch {
        /// Name of the sum type being decoded.
        sum: &'static str,
        /// The tag that was read.
        tag: u8,
    },

    /// A boolean byte was neither 0 nor 1.
    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    /// A string payload was not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// A varint ran past its maximum width.
    #[error("varint longer than {max} bytes")]
    VarIntTooLong {
        /// Maximum encoded width.
        max: usize,
    },

    /// Containers were nested deeper than the reader allows.
    #[error("nesting deeper than {max} levels")]
    TooDeep {
        /// Deepest accepted nesting.
        max: usize,
    },

    /// A sequence count can't fit in the remaining input.
    #[error("sequence of {count} elements exceeds the maximum of {max}")]
    TooManyElements {
        /// Count read from the wire.
        count: usize,
        /// Largest count the input could hold.
        max: usize,
    },

    /// A frame decoded fully but bytes were left over.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    /// A value was structurally readable but semantically invalid.
    #[error("invalid value: {0}")]
    Invalid(String),
}

/// Errors raised while writing a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// The value's type has no discriminator in this registry.
    #[error("message type {0} is not registered")]
    Unregistered(&'static str),

    /// A length doesn't fit the wire's length prefix.
    #[error("length {len} exceeds the maximum of {max}")]
    LengthOverflow {
        /// The length that was attempted.
        len: usize,
        /// The largest encodable length.
        max: usize,
    },

    /// A sum converter has no branch that accepts the value.
    #[error("no branch of {0} accepts this value")]
    NoBranch(&'static str),

    /// The value handed to a type-erased converter had the wrong type.
    #[error("expected a value of type {0}")]
    TypeMismatch(&'static str),
}

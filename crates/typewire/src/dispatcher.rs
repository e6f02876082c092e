//! Routes decoded frames to handlers and turns replies into frames.
//!
//! The dispatcher is synchronous and stateless apart from the sealed
//! registry it reads: one call handles one frame, and any number of calls
//! may run concurrently from different tasks.

use std::sync::Arc;

use bytes::Bytes;
use typewire_codec::SchemaError;
use typewire_transport::{Destination, Inbound};

use crate::config::DEFAULT_MAX_FRAME_LEN;
use crate::{DispatchError, Registry};

/// A frame ready to hand to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub data: Bytes,
    pub destination: Destination,
}

/// Invokes the handler bound for each inbound frame.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    max_frame_len: usize,
}

impl Dispatcher {
    /// Creates a dispatcher over a sealed registry.
    pub fn new(registry: Arc<Registry>) -> Result<Self, SchemaError> {
        if !registry.is_sealed() {
            return Err(SchemaError::Unsealed);
        }
        Ok(Self {
            registry,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        })
    }

    /// Sets the largest frame accepted or produced.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Fails if `len` exceeds the frame limit.
    pub fn check_frame_len(&self, len: usize) -> Result<(), DispatchError> {
        if len > self.max_frame_len {
            return Err(DispatchError::FrameTooLarge {
                len,
                max: self.max_frame_len,
            });
        }
        Ok(())
    }

    /// Decodes one frame and runs its handler once.
    ///
    /// The handler is picked by the side the frame arrived on. If it
    /// produces a reply, the reply is encoded and addressed back to the
    /// sender.
    pub fn dispatch(&self, inbound: &Inbound) -> Result<Option<Outbound>, DispatchError> {
        self.check_frame_len(inbound.data.len())?;

        let decoded = self.registry.decode(&inbound.data)?;
        let side = inbound.sender.receiver();
        let request = decoded.name;
        let handler = self
            .registry
            .handler(&decoded, side)
            .ok_or(DispatchError::NoHandler {
                message: request,
                side,
            })?;

        tracing::trace!(message_type = request, sender = %inbound.sender, "dispatching");
        let reply = handler.call(decoded.message, &inbound.sender);
        let (Some(reply), Some(reply_type)) = (reply, handler.reply) else {
            return Ok(None);
        };
        let data = self
            .registry
            .encode_dyn(reply_type, &*reply)
            .map_err(|source| DispatchError::Reply { request, source })?;
        self.check_frame_len(data.len())?;

        Ok(Some(Outbound {
            data,
            destination: inbound.sender.reply_destination(),
        }))
    }
}

//! Transport abstraction layer for typewire.
//!
//! The codec core never opens sockets. It hands encoded frames to a
//! [`Transport`] together with a [`Destination`], and receives frames as
//! [`Inbound`] values tagged with a [`SenderContext`]. How bytes actually
//! move (and how endpoints are located) is the transport's business.
//!
//! # Feature Flags
//!
//! - `memory` (default): in-process transport built on tokio channels,
//!   see [`MemoryServer`] and [`MemoryClient`].

mod error;
#[cfg(feature = "memory")]
mod memory;

pub use error::TransportError;
#[cfg(feature = "memory")]
pub use memory::{MemoryClient, MemoryServer, Placement};

use std::fmt;
use std::future::Future;

use bytes::Bytes;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier for a connected remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(u64);

impl EndpointId {
    /// Creates a new `EndpointId` from a raw `u64`.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ep-{}", self.0)
    }
}

/// Identifies a partition of endpoints (a world, a shard, a level).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DimensionId(u32);

impl DimensionId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dim-{}", self.0)
    }
}

/// A point plus a radius: "everyone within `range` of here".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPoint {
    pub dimension: DimensionId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub range: f64,
}

impl TargetPoint {
    /// Returns `true` if `(x, y, z)` in `dimension` is within range.
    pub fn contains(&self, dimension: DimensionId, x: f64, y: f64, z: f64) -> bool {
        let (dx, dy, dz) = (x - self.x, y - self.y, z - self.z);
        dimension == self.dimension
            && dx * dx + dy * dy + dz * dz <= self.range * self.range
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Which end of a channel a piece of code runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Client,
    Server,
}

impl Side {
    /// The other end.
    pub fn opposite(self) -> Self {
        match self {
            Side::Client => Side::Server,
            Side::Server => Side::Client,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Client => "client",
            Side::Server => "server",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an outgoing frame should go.
///
/// Only [`Destination::Server`] is meaningful from a client; every other
/// selector picks client endpoints and is only meaningful from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    /// The single upstream server.
    Server,
    /// Every connected endpoint.
    All,
    /// One endpoint.
    Endpoint(EndpointId),
    /// Every endpoint within a radius of a point.
    AllAround(TargetPoint),
    /// Every endpoint in a dimension.
    Dimension(DimensionId),
}

impl Destination {
    /// The side that will receive a frame sent here.
    pub fn receiver(&self) -> Side {
        match self {
            Destination::Server => Side::Server,
            _ => Side::Client,
        }
    }

    /// Short name for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Destination::Server => "server",
            Destination::All => "all",
            Destination::Endpoint(_) => "endpoint",
            Destination::AllAround(_) => "all-around",
            Destination::Dimension(_) => "dimension",
        }
    }
}

/// Who sent an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenderContext {
    /// A client endpoint; the frame arrived at the server.
    Endpoint(EndpointId),
    /// The server; the frame arrived at a client.
    Server,
}

impl SenderContext {
    /// The side the frame arrived on.
    pub fn receiver(&self) -> Side {
        match self {
            SenderContext::Endpoint(_) => Side::Server,
            SenderContext::Server => Side::Client,
        }
    }

    /// Where a reply to this sender should be addressed.
    pub fn reply_destination(&self) -> Destination {
        match self {
            SenderContext::Endpoint(id) => Destination::Endpoint(*id),
            SenderContext::Server => Destination::Server,
        }
    }
}

impl fmt::Display for SenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderContext::Endpoint(id) => id.fmt(f),
            SenderContext::Server => f.write_str("server"),
        }
    }
}

/// One received frame and its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub data: Bytes,
    pub sender: SenderContext,
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// Moves frames between endpoints.
///
/// Frames are delivered whole; the transport neither splits nor merges
/// them. Futures are `Send` so a channel driving a transport can live in a
/// spawned task.
pub trait Transport: Send + Sync + 'static {
    /// The side this transport instance runs on.
    fn side(&self) -> Side;

    /// Sends one frame.
    fn send(
        &self,
        data: Bytes,
        destination: &Destination,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next frame.
    ///
    /// Returns `Ok(None)` when the transport is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Inbound>, TransportError>> + Send;

    /// Stops the transport. Pending and future `recv` calls return `None`.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_id_display() {
        assert_eq!(EndpointId::new(7).to_string(), "ep-7");
        assert_eq!(EndpointId::new(7).into_inner(), 7);
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Client.opposite(), Side::Server);
        assert_eq!(Side::Server.opposite(), Side::Client);
    }

    #[test]
    fn test_reply_goes_back_to_sender() {
        let from_client = SenderContext::Endpoint(EndpointId::new(3));
        assert_eq!(from_client.receiver(), Side::Server);
        assert_eq!(
            from_client.reply_destination(),
            Destination::Endpoint(EndpointId::new(3))
        );

        let from_server = SenderContext::Server;
        assert_eq!(from_server.receiver(), Side::Client);
        assert_eq!(from_server.reply_destination(), Destination::Server);
    }

    #[test]
    fn test_destination_receiver() {
        assert_eq!(Destination::Server.receiver(), Side::Server);
        assert_eq!(Destination::All.receiver(), Side::Client);
        assert_eq!(
            Destination::Dimension(DimensionId::new(0)).receiver(),
            Side::Client
        );
    }

    #[test]
    fn test_target_point_range_and_dimension() {
        let point = TargetPoint {
            dimension: DimensionId::new(0),
            x: 0.0,
            y: 64.0,
            z: 0.0,
            range: 10.0,
        };
        assert!(point.contains(DimensionId::new(0), 6.0, 64.0, 8.0));
        assert!(!point.contains(DimensionId::new(0), 6.0, 64.0, 8.1));
        assert!(!point.contains(DimensionId::new(1), 0.0, 64.0, 0.0));
    }
}

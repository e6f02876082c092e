//! In-process transport over tokio channels.
//!
//! One [`MemoryServer`] plays the server; any number of [`MemoryClient`]s
//! connect to it. Each client has a [`Placement`] (dimension and position)
//! so every [`Destination`] selector can be resolved the way a real game
//! server would resolve it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};

use crate::{
    DimensionId, Destination, EndpointId, Inbound, SenderContext, Side,
    Transport, TransportError,
};

/// Where a client currently is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub dimension: DimensionId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Placement {
    pub fn new(dimension: DimensionId, x: f64, y: f64, z: f64) -> Self {
        Self { dimension, x, y, z }
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::new(DimensionId::new(0), 0.0, 0.0, 0.0)
    }
}

struct Peer {
    placement: Placement,
    tx: mpsc::UnboundedSender<Inbound>,
}

/// State shared by the server and every client.
struct Hub {
    next_id: AtomicU64,
    /// `None` once the server has closed.
    to_server: Mutex<Option<mpsc::UnboundedSender<Inbound>>>,
    peers: Mutex<HashMap<EndpointId, Peer>>,
}

impl Hub {
    /// Delivers `data` to every peer matching `select`.
    ///
    /// Peers whose receiver is gone are skipped; a broadcast doesn't fail
    /// because one client disconnected.
    async fn broadcast(&self, data: &Bytes, select: impl Fn(&Placement) -> bool) -> usize {
        let peers = self.peers.lock().await;
        let mut delivered = 0;
        for (id, peer) in peers.iter() {
            if !select(&peer.placement) {
                continue;
            }
            let inbound = Inbound {
                data: data.clone(),
                sender: SenderContext::Server,
            };
            if peer.tx.send(inbound).is_err() {
                tracing::warn!(%id, "skipping closed memory endpoint");
                continue;
            }
            delivered += 1;
        }
        delivered
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// The server end of the in-memory transport.
pub struct MemoryServer {
    hub: Arc<Hub>,
    inbox: Mutex<mpsc::UnboundedReceiver<Inbound>>,
}

impl MemoryServer {
    pub fn new() -> Self {
        let (to_server, inbox) = mpsc::unbounded_channel();
        Self {
            hub: Arc::new(Hub {
                next_id: AtomicU64::new(1),
                to_server: Mutex::new(Some(to_server)),
                peers: Mutex::new(HashMap::new()),
            }),
            inbox: Mutex::new(inbox),
        }
    }

    /// Connects a new client at `placement`.
    pub async fn connect(&self, placement: Placement) -> MemoryClient {
        let id = EndpointId::new(self.hub.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.hub
            .peers
            .lock()
            .await
            .insert(id, Peer { placement, tx });
        tracing::debug!(%id, dimension = %placement.dimension, "memory endpoint connected");

        MemoryClient {
            id,
            hub: Arc::clone(&self.hub),
            inbox: Mutex::new(rx),
        }
    }

    /// Moves a connected client.
    pub async fn relocate(
        &self,
        id: EndpointId,
        placement: Placement,
    ) -> Result<(), TransportError> {
        let mut peers = self.hub.peers.lock().await;
        let peer = peers
            .get_mut(&id)
            .ok_or(TransportError::UnknownEndpoint(id))?;
        peer.placement = placement;
        Ok(())
    }

    /// Disconnects a client; its `recv` returns `None` once drained.
    pub async fn disconnect(&self, id: EndpointId) -> Result<(), TransportError> {
        if self.hub.peers.lock().await.remove(&id).is_none() {
            return Err(TransportError::UnknownEndpoint(id));
        }
        tracing::debug!(%id, "memory endpoint disconnected");
        Ok(())
    }

    /// Ids of connected clients, in ascending order.
    pub async fn endpoints(&self) -> Vec<EndpointId> {
        let mut ids: Vec<_> = self.hub.peers.lock().await.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for MemoryServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryServer {
    fn side(&self) -> Side {
        Side::Server
    }

    async fn send(
        &self,
        data: Bytes,
        destination: &Destination,
    ) -> Result<(), TransportError> {
        let delivered = match destination {
            Destination::Server => {
                return Err(TransportError::Unroutable {
                    from: Side::Server,
                    destination: destination.kind(),
                });
            }
            Destination::Endpoint(id) => {
                let peers = self.hub.peers.lock().await;
                let peer = peers
                    .get(id)
                    .ok_or(TransportError::UnknownEndpoint(*id))?;
                let inbound = Inbound {
                    data,
                    sender: SenderContext::Server,
                };
                peer.tx
                    .send(inbound)
                    .map_err(|_| TransportError::ConnectionClosed(id.to_string()))?;
                1
            }
            Destination::All => self.hub.broadcast(&data, |_| true).await,
            Destination::AllAround(point) => {
                self.hub
                    .broadcast(&data, |p| point.contains(p.dimension, p.x, p.y, p.z))
                    .await
            }
            Destination::Dimension(dimension) => {
                self.hub
                    .broadcast(&data, |p| p.dimension == *dimension)
                    .await
            }
        };
        tracing::trace!(destination = destination.kind(), delivered, "memory send");
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Inbound>, TransportError> {
        Ok(self.inbox.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        // Dropping every sender ends both our inbox and each client's.
        self.hub.to_server.lock().await.take();
        self.hub.peers.lock().await.clear();
        tracing::debug!("memory server closed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A client connected to a [`MemoryServer`].
pub struct MemoryClient {
    id: EndpointId,
    hub: Arc<Hub>,
    inbox: Mutex<mpsc::UnboundedReceiver<Inbound>>,
}

impl MemoryClient {
    /// This client's id as the server sees it.
    pub fn id(&self) -> EndpointId {
        self.id
    }
}

impl Transport for MemoryClient {
    fn side(&self) -> Side {
        Side::Client
    }

    async fn send(
        &self,
        data: Bytes,
        destination: &Destination,
    ) -> Result<(), TransportError> {
        if *destination != Destination::Server {
            return Err(TransportError::Unroutable {
                from: Side::Client,
                destination: destination.kind(),
            });
        }
        let inbound = Inbound {
            data,
            sender: SenderContext::Endpoint(self.id),
        };
        let to_server = self.hub.to_server.lock().await;
        to_server
            .as_ref()
            .ok_or(TransportError::Shutdown)?
            .send(inbound)
            .map_err(|_| TransportError::Shutdown)
    }

    async fn recv(&self) -> Result<Option<Inbound>, TransportError> {
        Ok(self.inbox.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.hub.peers.lock().await.remove(&self.id);
        tracing::debug!(id = %self.id, "memory client closed");
        Ok(())
    }
}

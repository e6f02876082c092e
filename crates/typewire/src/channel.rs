//! `Channel` builder and receive loop.
//!
//! A channel is the entry point for sending and receiving typed messages.
//! It ties together the layers: transport → registry → dispatcher.

use std::sync::Arc;

use typewire_transport::{
    Destination, DimensionId, EndpointId, Inbound, Side, TargetPoint, Transport,
};

use crate::message_type::{Message, ToClient, ToServer};
use crate::{ChannelConfig, Dispatcher, Registry, TypewireError};

enum RegistrySource {
    Owned(Registry),
    Shared(Arc<Registry>),
}

/// Builder for configuring a [`Channel`].
///
/// # Example
///
/// ```rust,ignore
/// let channel = ChannelBuilder::new(registry)
///     .name("game")
///     .max_frame_len(64 * 1024)
///     .build(transport)?;
/// channel.run().await
/// ```
pub struct ChannelBuilder {
    registry: RegistrySource,
    config: ChannelConfig,
}

impl ChannelBuilder {
    /// Starts a builder around a registry; `build` seals it.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: RegistrySource::Owned(registry),
            config: ChannelConfig::default(),
        }
    }

    /// Starts a builder around a registry that is already sealed and
    /// shared, e.g. by several channels in one process.
    pub fn shared(registry: Arc<Registry>) -> Self {
        Self {
            registry: RegistrySource::Shared(registry),
            config: ChannelConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ChannelConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the channel name used in log events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Sets the largest frame accepted or sent.
    pub fn max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.config.max_frame_len = max_frame_len;
        self
    }

    /// Seals the registry (if needed) and attaches the transport.
    pub fn build<T: Transport>(self, transport: T) -> Result<Channel<T>, TypewireError> {
        let registry = match self.registry {
            RegistrySource::Owned(mut registry) => {
                registry.seal()?;
                Arc::new(registry)
            }
            RegistrySource::Shared(registry) => registry,
        };
        let dispatcher = Dispatcher::new(Arc::clone(&registry))?
            .with_max_frame_len(self.config.max_frame_len);

        tracing::debug!(
            channel = %self.config.name,
            side = %transport.side(),
            messages = registry.len(),
            "channel built"
        );
        Ok(Channel {
            config: self.config,
            registry,
            dispatcher,
            transport,
        })
    }
}

/// Typed messaging over one transport.
///
/// Sends are checked at compile time against each message's direction:
/// only [`ToServer`] messages go upstream, only [`ToClient`] messages go to
/// clients.
pub struct Channel<T: Transport> {
    config: ChannelConfig,
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    transport: T,
}

impl<T: Transport> Channel<T> {
    pub fn side(&self) -> Side {
        self.transport.side()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // --- Typed sends --------------------------------------------------------

    /// Sends a message to the server.
    pub async fn send_to_server<M: ToServer>(&self, message: &M) -> Result<(), TypewireError> {
        self.send(message, Destination::Server).await
    }

    /// Sends a message to one client.
    pub async fn send_to<M: ToClient>(
        &self,
        endpoint: EndpointId,
        message: &M,
    ) -> Result<(), TypewireError> {
        self.send(message, Destination::Endpoint(endpoint)).await
    }

    /// Sends a message to every client.
    pub async fn send_to_all<M: ToClient>(&self, message: &M) -> Result<(), TypewireError> {
        self.send(message, Destination::All).await
    }

    /// Sends a message to every client within range of a point.
    pub async fn send_to_all_around<M: ToClient>(
        &self,
        point: TargetPoint,
        message: &M,
    ) -> Result<(), TypewireError> {
        self.send(message, Destination::AllAround(point)).await
    }

    /// Sends a message to every client in a dimension.
    pub async fn send_to_dimension<M: ToClient>(
        &self,
        dimension: DimensionId,
        message: &M,
    ) -> Result<(), TypewireError> {
        self.send(message, Destination::Dimension(dimension)).await
    }

    async fn send<M: Message>(
        &self,
        message: &M,
        destination: Destination,
    ) -> Result<(), TypewireError> {
        let data = self.registry.encode(message)?;
        self.dispatcher.check_frame_len(data.len())?;
        tracing::trace!(
            channel = %self.config.name,
            message_type = M::NAME,
            destination = destination.kind(),
            len = data.len(),
            "sending"
        );
        self.transport.send(data, &destination).await?;
        Ok(())
    }

    // --- Receiving ----------------------------------------------------------

    /// Handles one inbound frame and sends the reply, if any.
    pub async fn process(&self, inbound: Inbound) -> Result<(), TypewireError> {
        if let Some(out) = self.dispatcher.dispatch(&inbound)? {
            self.transport.send(out.data, &out.destination).await?;
        }
        Ok(())
    }

    /// Receives and dispatches frames until the transport closes.
    ///
    /// A malformed or unhandled frame is logged and dropped; it never stops
    /// the loop. A failed reply send is logged too. Only a failing `recv`
    /// ends the loop with an error.
    pub async fn run(&self) -> Result<(), TypewireError> {
        let name = &self.config.name;
        tracing::info!(channel = %name, side = %self.side(), "channel running");

        while let Some(inbound) = self.transport.recv().await? {
            let sender = inbound.sender;
            match self.process(inbound).await {
                Ok(()) => {}
                Err(TypewireError::Dispatch(e)) => {
                    tracing::debug!(channel = %name, %sender, error = %e, "dropping frame");
                }
                Err(e) => {
                    tracing::warn!(channel = %name, %sender, error = %e, "reply failed");
                }
            }
        }

        tracing::info!(channel = %name, "channel closed");
        Ok(())
    }

    /// Closes the underlying transport; a running [`run`](Self::run)
    /// returns once it notices.
    pub async fn close(&self) -> Result<(), TypewireError> {
        self.transport.close().await?;
        Ok(())
    }
}

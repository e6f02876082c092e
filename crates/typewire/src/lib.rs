//! # typewire
//!
//! Typed binary message channels.
//!
//! Message types get their wire encoding derived from their shape, are
//! registered in a fixed order to receive one-byte discriminators, and are
//! dispatched to handlers bound per side. A handler may answer with a reply
//! that goes straight back to the sender.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use typewire::prelude::*;
//!
//! struct Ping { seq: u32 }
//! wire_struct!(Ping { seq });
//! message!(Ping => Server);
//!
//! struct Pong { seq: u32, echo: String }
//! wire_struct!(Pong { seq, echo });
//! message!(Pong => Client);
//!
//! fn protocol() -> Result<Registry, SchemaError> {
//!     let mut registry = Registry::new();
//!     registry.register::<Ping>()?; // 0x00
//!     registry.register::<Pong>()?; // 0x01
//!     registry.on_server_reply::<Ping, Pong>(|ping, _| {
//!         Some(Pong { seq: ping.seq, echo: "hi".into() })
//!     })?;
//!     registry.on_client::<Pong>(|pong, _| println!("pong {}", pong.seq))?;
//!     Ok(registry)
//! }
//!
//! # async fn demo() -> Result<(), TypewireError> {
//! let server = MemoryServer::new();
//! let client = server.connect(Placement::default()).await;
//!
//! let server = ChannelBuilder::new(protocol()?).build(server)?;
//! let client = ChannelBuilder::new(protocol()?).build(client)?;
//!
//! client.send_to_server(&Ping { seq: 7 }).await?;
//! # Ok(())
//! # }
//! ```

mod channel;
mod config;
mod dispatcher;
mod error;
mod message_type;
mod registry;

pub use channel::{Channel, ChannelBuilder};
pub use config::{ChannelConfig, DEFAULT_MAX_FRAME_LEN};
pub use dispatcher::{Dispatcher, Outbound};
pub use error::{DispatchError, TypewireError};
pub use message_type::{Message, ToClient, ToServer};
pub use registry::{AnyMessage, Decoded, Registry, RegistryState};

pub use typewire_codec::{
    self as codec, product, wire_enum, wire_struct, DecodeError, Discriminator,
    EncodeError, SchemaError, Wire,
};
pub use typewire_transport::{
    self as transport, Destination, DimensionId, EndpointId, Inbound,
    SenderContext, Side, TargetPoint, Transport, TransportError,
};

/// Everything needed to declare messages and run channels.
pub mod prelude {
    pub use crate::{
        message, product, wire_enum, wire_struct, Channel, ChannelBuilder,
        ChannelConfig, Destination, DimensionId, EndpointId, Message,
        Registry, SchemaError, SenderContext, Side, TargetPoint, ToClient,
        ToServer, Transport, TypewireError, Wire,
    };
    #[cfg(feature = "memory")]
    pub use typewire_transport::{MemoryClient, MemoryServer, Placement};
}

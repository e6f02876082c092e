//! The codec registry: discriminators, converters and handlers per type.
//!
//! A [`Registry`] starts [`Unsealed`](RegistryState::Unsealed). Message
//! types are registered in a fixed order; each gets a one-byte
//! discriminator (auto-assigned 0, 1, 2, … unless given explicitly) and a
//! converter for its payload. Handlers are then bound per side. Sealing
//! validates the whole schema and freezes it; after that the registry is
//! shared read-only (usually as `Arc<Registry>`) by every connection.
//!
//! Both ends of a channel must replay the same registration sequence,
//! since nothing on the wire negotiates the tags.
//!
//! ```text
//! frame = [u8 discriminator][payload]
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use typewire_codec::{
    natural, Converter, DecodeError, Discriminator, DiscriminatorAllocator,
    EncodeError, SchemaError, Wire, WireReader, WireWriter,
};
use typewire_transport::{SenderContext, Side};

use crate::message_type::{Message, ToClient, ToServer};

/// A decoded message whose type is only known at runtime.
pub type AnyMessage = Box<dyn Any + Send>;

type ErasedHandler =
    Box<dyn Fn(AnyMessage, &SenderContext) -> Option<AnyMessage> + Send + Sync>;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle of a registry.
///
/// ```text
///   Unsealed ──(seal)──→ Sealed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// Registrations and handler bindings are accepted.
    Unsealed,
    /// The schema is frozen; only encode and decode are allowed.
    Sealed,
}

// ---------------------------------------------------------------------------
// Type erasure
// ---------------------------------------------------------------------------

/// Runtime identity of a message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TypeRef {
    pub(crate) id: TypeId,
    pub(crate) name: &'static str,
}

impl TypeRef {
    pub(crate) fn of<T: Message>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::NAME,
        }
    }
}

/// A converter that accepts and returns `dyn Any`.
trait ErasedConverter: Send + Sync {
    fn encode(&self, message: &dyn Any, w: &mut WireWriter) -> Result<(), EncodeError>;

    fn decode(&self, r: &mut WireReader<'_>) -> Result<AnyMessage, DecodeError>;
}

struct Typed<T, C> {
    converter: C,
    _message: PhantomData<fn() -> T>,
}

impl<T: Message, C: Converter<T>> ErasedConverter for Typed<T, C> {
    fn encode(&self, message: &dyn Any, w: &mut WireWriter) -> Result<(), EncodeError> {
        let message = message
            .downcast_ref::<T>()
            .ok_or(EncodeError::TypeMismatch(T::NAME))?;
        self.converter.encode(message, w)
    }

    fn decode(&self, r: &mut WireReader<'_>) -> Result<AnyMessage, DecodeError> {
        Ok(Box::new(self.converter.decode(r)?))
    }
}

/// A bound handler and, for request handlers, the reply type it produces.
pub(crate) struct Handler {
    call: ErasedHandler,
    pub(crate) reply: Option<TypeRef>,
}

impl Handler {
    /// Runs the handler. Returns the reply, if it produced one.
    pub(crate) fn call(
        &self,
        message: AnyMessage,
        sender: &SenderContext,
    ) -> Option<AnyMessage> {
        (self.call)(message, sender)
    }
}

struct Entry {
    discriminator: Discriminator,
    ty: TypeRef,
    receivers: &'static [Side],
    converter: Box<dyn ErasedConverter>,
    client: Option<Handler>,
    server: Option<Handler>,
}

impl Entry {
    fn handler(&self, side: Side) -> Option<&Handler> {
        match side {
            Side::Client => self.client.as_ref(),
            Side::Server => self.server.as_ref(),
        }
    }

    fn handler_slot(&mut self, side: Side) -> &mut Option<Handler> {
        match side {
            Side::Client => &mut self.client,
            Side::Server => &mut self.server,
        }
    }
}

// ---------------------------------------------------------------------------
// Decoded
// ---------------------------------------------------------------------------

/// A frame decoded into its registered type.
pub struct Decoded {
    /// The frame's leading byte.
    pub discriminator: Discriminator,
    /// Name of the message type.
    pub name: &'static str,
    /// The decoded value; see [`downcast`](Self::downcast).
    pub message: AnyMessage,
    pub(crate) entry: usize,
}

impl Decoded {
    /// Returns `true` if the message is a `T`.
    pub fn is<T: Message>(&self) -> bool {
        self.message.is::<T>()
    }

    /// Takes the message out as a `T`, or hands `self` back if it isn't one.
    pub fn downcast<T: Message>(self) -> Result<T, Self> {
        match self.message.downcast::<T>() {
            Ok(message) => Ok(*message),
            Err(message) => Err(Self { message, ..self }),
        }
    }
}

impl fmt::Debug for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoded")
            .field("discriminator", &self.discriminator)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Binds message types to discriminators, converters and handlers.
pub struct Registry {
    state: RegistryState,
    allocator: DiscriminatorAllocator,
    entries: Vec<Entry>,
    by_discriminator: HashMap<Discriminator, usize>,
    by_type: HashMap<TypeId, usize>,
}

impl Registry {
    /// Creates an empty, unsealed registry.
    pub fn new() -> Self {
        Self {
            state: RegistryState::Unsealed,
            allocator: DiscriminatorAllocator::new(),
            entries: Vec::new(),
            by_discriminator: HashMap::new(),
            by_type: HashMap::new(),
        }
    }

    pub fn state(&self) -> RegistryState {
        self.state
    }

    pub fn is_sealed(&self) -> bool {
        self.state == RegistryState::Sealed
    }

    /// Number of registered message types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // --- Registration -----------------------------------------------------

    /// Binds `T` to an explicit discriminator with a custom converter.
    ///
    /// The other `register*` methods are shorthands for this one.
    pub fn add_discriminator<T: Message>(
        &mut self,
        discriminator: impl Into<Discriminator>,
        converter: impl Converter<T> + 'static,
    ) -> Result<Discriminator, SchemaError> {
        self.insert::<T>(Some(discriminator.into()), Box::new(typed(converter)))
    }

    /// Registers `T` with its [`Wire`] encoding and the next free
    /// discriminator.
    pub fn register<T: Message + Wire>(&mut self) -> Result<Discriminator, SchemaError> {
        self.insert::<T>(None, Box::new(typed(natural::<T>())))
    }

    /// Registers `T` with its [`Wire`] encoding at a fixed discriminator.
    pub fn register_at<T: Message + Wire>(
        &mut self,
        discriminator: impl Into<Discriminator>,
    ) -> Result<Discriminator, SchemaError> {
        self.add_discriminator::<T>(discriminator, natural::<T>())
    }

    /// Registers `T` with a custom converter and the next free
    /// discriminator.
    pub fn register_with<T: Message>(
        &mut self,
        converter: impl Converter<T> + 'static,
    ) -> Result<Discriminator, SchemaError> {
        self.insert::<T>(None, Box::new(typed(converter)))
    }

    fn insert<T: Message>(
        &mut self,
        discriminator: Option<Discriminator>,
        converter: Box<dyn ErasedConverter>,
    ) -> Result<Discriminator, SchemaError> {
        if self.is_sealed() {
            return Err(SchemaError::Sealed(T::NAME));
        }
        let ty = TypeRef::of::<T>();
        if self.by_type.contains_key(&ty.id) {
            return Err(SchemaError::DuplicateType(T::NAME));
        }
        let discriminator = match discriminator {
            Some(d) => {
                self.allocator.claim(d)?;
                d
            }
            None => self.allocator.next()?,
        };

        let index = self.entries.len();
        self.entries.push(Entry {
            discriminator,
            ty,
            receivers: T::RECEIVERS,
            converter,
            client: None,
            server: None,
        });
        self.by_discriminator.insert(discriminator, index);
        self.by_type.insert(ty.id, index);

        tracing::debug!(message_type = T::NAME, %discriminator, "registered message type");
        Ok(discriminator)
    }

    // --- Handlers ---------------------------------------------------------

    /// Handles `T` when it arrives at the server.
    pub fn on_server<T: ToServer>(
        &mut self,
        handler: impl Fn(T, &SenderContext) + Send + Sync + 'static,
    ) -> Result<(), SchemaError> {
        self.bind::<T>(Side::Server, no_reply(handler), None)
    }

    /// Handles `T` when it arrives at a client.
    pub fn on_client<T: ToClient>(
        &mut self,
        handler: impl Fn(T, &SenderContext) + Send + Sync + 'static,
    ) -> Result<(), SchemaError> {
        self.bind::<T>(Side::Client, no_reply(handler), None)
    }

    /// Handles `T` at the server, optionally answering the sender with `R`.
    pub fn on_server_reply<T: ToServer, R: ToClient>(
        &mut self,
        handler: impl Fn(T, &SenderContext) -> Option<R> + Send + Sync + 'static,
    ) -> Result<(), SchemaError> {
        self.bind::<T>(Side::Server, with_reply(handler), Some(TypeRef::of::<R>()))
    }

    /// Handles `T` at a client, optionally answering the server with `R`.
    pub fn on_client_reply<T: ToClient, R: ToServer>(
        &mut self,
        handler: impl Fn(T, &SenderContext) -> Option<R> + Send + Sync + 'static,
    ) -> Result<(), SchemaError> {
        self.bind::<T>(Side::Client, with_reply(handler), Some(TypeRef::of::<R>()))
    }

    fn bind<T: Message>(
        &mut self,
        side: Side,
        call: ErasedHandler,
        reply: Option<TypeRef>,
    ) -> Result<(), SchemaError> {
        if self.is_sealed() {
            return Err(SchemaError::Sealed(T::NAME));
        }
        let index = *self
            .by_type
            .get(&TypeId::of::<T>())
            .ok_or(SchemaError::UnregisteredType(T::NAME))?;
        let slot = self.entries[index].handler_slot(side);
        if slot.is_some() {
            return Err(SchemaError::DuplicateHandler {
                message: T::NAME,
                side: side.as_str(),
            });
        }
        *slot = Some(Handler { call, reply });
        tracing::debug!(message_type = T::NAME, %side, "bound handler");
        Ok(())
    }

    // --- Sealing ----------------------------------------------------------

    /// Validates the schema and freezes the registry.
    ///
    /// Fails if a declared receiving side has no handler, or if a handler
    /// replies with an unregistered type. Sealing twice is a no-op.
    pub fn seal(&mut self) -> Result<(), SchemaError> {
        if self.is_sealed() {
            return Ok(());
        }
        for entry in &self.entries {
            for &side in entry.receivers {
                if entry.handler(side).is_none() {
                    return Err(SchemaError::MissingHandler {
                        message: entry.ty.name,
                        side: side.as_str(),
                    });
                }
            }
            let replies = [&entry.client, &entry.server]
                .into_iter()
                .flatten()
                .filter_map(|handler| handler.reply);
            for reply in replies {
                if !self.by_type.contains_key(&reply.id) {
                    return Err(SchemaError::UnregisteredReply {
                        request: entry.ty.name,
                        reply: reply.name,
                    });
                }
            }
        }
        self.state = RegistryState::Sealed;
        tracing::info!(messages = self.entries.len(), "registry sealed");
        Ok(())
    }

    // --- Introspection ----------------------------------------------------

    /// The discriminator bound to `T`, if registered.
    pub fn discriminator_of<T: Message>(&self) -> Option<Discriminator> {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(|&index| self.entries[index].discriminator)
    }

    /// `(discriminator, name)` for every registered type, in tag order.
    pub fn entries(&self) -> Vec<(Discriminator, &'static str)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (entry.discriminator, entry.ty.name))
            .collect();
        entries.sort_by_key(|(discriminator, _)| *discriminator);
        entries
    }

    // --- Encode / decode --------------------------------------------------

    /// Encodes a registered message as a full frame.
    pub fn encode<T: Message>(&self, message: &T) -> Result<Bytes, EncodeError> {
        self.encode_dyn(TypeRef::of::<T>(), message)
    }

    pub(crate) fn encode_dyn(
        &self,
        ty: TypeRef,
        message: &dyn Any,
    ) -> Result<Bytes, EncodeError> {
        let index = *self
            .by_type
            .get(&ty.id)
            .ok_or(EncodeError::Unregistered(ty.name))?;
        let entry = &self.entries[index];
        let mut w = WireWriter::new();
        w.put_u8(entry.discriminator.into_inner());
        entry.converter.encode(message, &mut w)?;
        Ok(w.freeze())
    }

    /// Decodes one full frame.
    ///
    /// The frame must be exactly one message: leftover bytes are an error.
    /// A failed decode doesn't affect the registry.
    pub fn decode(&self, frame: &[u8]) -> Result<Decoded, DecodeError> {
        let mut r = WireReader::new(frame);
        let discriminator = Discriminator(r.read_u8()?);
        let index = *self
            .by_discriminator
            .get(&discriminator)
            .ok_or(DecodeError::UnknownDiscriminator(discriminator))?;
        let entry = &self.entries[index];
        let message = entry.converter.decode(&mut r)?;
        r.finish()?;
        Ok(Decoded {
            discriminator,
            name: entry.ty.name,
            message,
            entry: index,
        })
    }

    pub(crate) fn handler(&self, decoded: &Decoded, side: Side) -> Option<&Handler> {
        self.entries.get(decoded.entry)?.handler(side)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("state", &self.state)
            .field("entries", &self.entries())
            .finish()
    }
}

fn typed<T: Message, C: Converter<T>>(converter: C) -> Typed<T, C> {
    Typed {
        converter,
        _message: PhantomData,
    }
}

fn no_reply<T: Message>(
    handler: impl Fn(T, &SenderContext) + Send + Sync + 'static,
) -> ErasedHandler {
    Box::new(move |message: AnyMessage, sender: &SenderContext| {
        match message.downcast::<T>() {
            Ok(message) => handler(*message, sender),
            Err(_) => tracing::error!(message_type = T::NAME, "handler received a foreign type"),
        }
        None
    })
}

fn with_reply<T: Message, R: Message>(
    handler: impl Fn(T, &SenderContext) -> Option<R> + Send + Sync + 'static,
) -> ErasedHandler {
    Box::new(move |message: AnyMessage, sender: &SenderContext| match message.downcast::<T>() {
        Ok(message) => handler(*message, sender).map(|reply| Box::new(reply) as AnyMessage),
        Err(_) => {
            tracing::error!(message_type = T::NAME, "handler received a foreign type");
            None
        }
    })
}

//! Structural binary codec for typewire.
//!
//! This crate decides how typed values become bytes and back:
//!
//! - **Wire** ([`Wire`], [`to_bytes`], [`from_bytes`]): the natural encoding
//!   of a type, derived structurally for containers, tuples and user types
//!   via [`wire_struct!`] and [`wire_enum!`].
//! - **Converters** ([`Converter`], [`SumOf`], [`map`], [`product!`]):
//!   encoders as first-class values, for types that can't or shouldn't use
//!   their `Wire` impl.
//! - **Discriminators** ([`Discriminator`], [`DiscriminatorAllocator`]): the
//!   one-byte tags that select a message type or a sum branch.
//!
//! The codec has no idea what a connection or a handler is. The registry and
//! dispatcher in the `typewire` crate build on it.
//!
//! ```text
//! Transport (frames) → Codec (typed values) → Dispatcher (handlers)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod buf;
mod converter;
mod derive;
mod discriminator;
mod error;
mod sum;
mod types;
mod wire;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use buf::{Mark, WireReader, WireWriter, MAX_DEPTH, MAX_EMPTY_ELEMENTS, MAX_VARINT_LEN};
pub use converter::{
    map, natural, optional_of, pair, sequence_of, unit, BoxedConverter,
    Converter, Mapped, Natural, OptionalOf, Pair, SequenceOf, Unit,
};
#[doc(hidden)]
pub use derive::assert_unique_tags;
pub use discriminator::{Discriminator, DiscriminatorAllocator};
pub use error::{DecodeError, EncodeError, SchemaError};
pub use sum::{SumBuilder, SumOf};
pub use types::{BlockPos, Tag, TagMap};
pub use wire::{from_bytes, to_bytes, Wire};

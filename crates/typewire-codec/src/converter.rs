//! Converters and the combinators that build them.
//!
//! A [`Converter<T>`] is a value that can write and read one concrete type.
//! Where [`Wire`] ties the encoding to the type itself, converters are
//! first-class values: they can be stored, boxed, and assembled at runtime.
//! That matters when a type has no `Wire` impl (it comes from another crate)
//! or needs a different layout in one particular message.
//!
//! Converters compose; nothing inherits. The combinators mirror the shapes
//! of the wire format:
//!
//! | Shape | Combinator |
//! |---|---|
//! | leaf | [`natural`] |
//! | sequence | [`sequence_of`] |
//! | optional | [`optional_of`] |
//! | product | [`pair`] + [`unit`], or the [`product!`](crate::product) macro |
//! | record | [`map`] over a product |
//! | sum | [`SumOf`](crate::SumOf) |

use std::marker::PhantomData;
use std::sync::Arc;

use crate::{DecodeError, EncodeError, Wire, WireReader, WireWriter};

/// Paired encode/decode capability for one type.
///
/// `Send + Sync` because the registry shares converters across every
/// connection once sealed.
pub trait Converter<T>: Send + Sync {
    fn encode(&self, value: &T, w: &mut WireWriter) -> Result<(), EncodeError>;

    fn decode(&self, r: &mut WireReader<'_>) -> Result<T, DecodeError>;
}

impl<T, C: Converter<T> + ?Sized> Converter<T> for Box<C> {
    fn encode(&self, value: &T, w: &mut WireWriter) -> Result<(), EncodeError> {
        (**self).encode(value, w)
    }

    fn decode(&self, r: &mut WireReader<'_>) -> Result<T, DecodeError> {
        (**self).decode(r)
    }
}

impl<T, C: Converter<T> + ?Sized> Converter<T> for Arc<C> {
    fn encode(&self, value: &T, w: &mut WireWriter) -> Result<(), EncodeError> {
        (**self).encode(value, w)
    }

    fn decode(&self, r: &mut WireReader<'_>) -> Result<T, DecodeError> {
        (**self).decode(r)
    }
}

/// A shareable, type-erased converter.
pub type BoxedConverter<T> = Arc<dyn Converter<T>>;

// ---------------------------------------------------------------------------
// Leaves
// ---------------------------------------------------------------------------

/// Uses a type's own [`Wire`] impl.
pub struct Natural<T>(PhantomData<fn() -> T>);

/// The converter given by `T`'s [`Wire`] impl.
pub fn natural<T: Wire>() -> Natural<T> {
    Natural(PhantomData)
}

impl<T> Clone for Natural<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Natural<T> {}

impl<T: Wire> Converter<T> for Natural<T> {
    fn encode(&self, value: &T, w: &mut WireWriter) -> Result<(), EncodeError> {
        value.encode(w)
    }

    fn decode(&self, r: &mut WireReader<'_>) -> Result<T, DecodeError> {
        T::decode(r)
    }
}

// ---------------------------------------------------------------------------
// Sequence and optional
// ---------------------------------------------------------------------------

/// `[u32 count][count × element]`.
#[derive(Debug, Clone, Copy)]
pub struct SequenceOf<C>(C);

pub fn sequence_of<C>(element: C) -> SequenceOf<C> {
    SequenceOf(element)
}

impl<T, C: Converter<T>> Converter<Vec<T>> for SequenceOf<C> {
    fn encode(
        &self,
        value: &Vec<T>,
        w: &mut WireWriter,
    ) -> Result<(), EncodeError> {
        w.put_count(value.len())?;
        for item in value {
            self.0.encode(item, w)?;
        }
        Ok(())
    }

    fn decode(&self, r: &mut WireReader<'_>) -> Result<Vec<T>, DecodeError> {
        r.read_sequence(|r| self.0.decode(r))
    }
}

/// `[u8 flag][payload if flag == 1]`.
#[derive(Debug, Clone, Copy)]
pub struct OptionalOf<C>(C);

pub fn optional_of<C>(inner: C) -> OptionalOf<C> {
    OptionalOf(inner)
}

impl<T, C: Converter<T>> Converter<Option<T>> for OptionalOf<C> {
    fn encode(
        &self,
        value: &Option<T>,
        w: &mut WireWriter,
    ) -> Result<(), EncodeError> {
        w.put_bool(value.is_some());
        match value {
            Some(inner) => self.0.encode(inner, w),
            None => Ok(()),
        }
    }

    fn decode(&self, r: &mut WireReader<'_>) -> Result<Option<T>, DecodeError> {
        if r.read_bool()? {
            self.0.decode(r).map(Some)
        } else {
            Ok(None)
        }
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// The empty product. Encodes to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unit;

pub fn unit() -> Unit {
    Unit
}

impl Converter<()> for Unit {
    fn encode(&self, _value: &(), _w: &mut WireWriter) -> Result<(), EncodeError> {
        Ok(())
    }

    fn decode(&self, _r: &mut WireReader<'_>) -> Result<(), DecodeError> {
        Ok(())
    }
}

/// One field followed by the rest of a product.
///
/// An N-field record is `Pair<F1, Pair<F2, … Pair<FN, Unit>>>` converting
/// the nested tuple `(f1, (f2, … (fN, ())))`.
#[derive(Debug, Clone, Copy)]
pub struct Pair<H, R> {
    head: H,
    rest: R,
}

pub fn pair<H, R>(head: H, rest: R) -> Pair<H, R> {
    Pair { head, rest }
}

impl<A, B, H, R> Converter<(A, B)> for Pair<H, R>
where
    H: Converter<A>,
    R: Converter<B>,
{
    fn encode(
        &self,
        value: &(A, B),
        w: &mut WireWriter,
    ) -> Result<(), EncodeError> {
        self.head.encode(&value.0, w)?;
        self.rest.encode(&value.1, w)
    }

    fn decode(&self, r: &mut WireReader<'_>) -> Result<(A, B), DecodeError> {
        let head = self.head.decode(r)?;
        let rest = self.rest.decode(r)?;
        Ok((head, rest))
    }
}

/// Builds a nested [`Pair`] product from field converters.
///
/// `product!(a, b, c)` is `pair(a, pair(b, pair(c, unit())))` and converts
/// values shaped `(A, (B, (C, ())))`.
#[macro_export]
macro_rules! product {
    () => {
        $crate::unit()
    };
    ($head:expr $(, $rest:expr)* $(,)?) => {
        $crate::pair($head, $crate::product!($($rest),*))
    };
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Views `T` through a structural representation `R`.
pub struct Mapped<C, T, R> {
    inner: C,
    to_repr: fn(&T) -> R,
    from_repr: fn(R) -> T,
}

/// Converts `T` by mapping it to and from a representation `inner`
/// already understands.
///
/// This is how a record becomes a product:
///
/// ```
/// use typewire_codec::{map, natural, product, Converter, WireReader, WireWriter};
///
/// #[derive(Debug, PartialEq)]
/// struct Move { x: i32, label: String }
///
/// let conv = map(
///     product!(natural::<i32>(), natural::<String>()),
///     |m: &Move| (m.x, (m.label.clone(), ())),
///     |(x, (label, ()))| Move { x, label },
/// );
///
/// let mut w = WireWriter::new();
/// conv.encode(&Move { x: 3, label: "up".into() }, &mut w).unwrap();
/// let bytes = w.freeze();
/// let back = conv.decode(&mut WireReader::new(&bytes)).unwrap();
/// assert_eq!(back, Move { x: 3, label: "up".into() });
/// ```
pub fn map<C, T, R>(
    inner: C,
    to_repr: fn(&T) -> R,
    from_repr: fn(R) -> T,
) -> Mapped<C, T, R> {
    Mapped {
        inner,
        to_repr,
        from_repr,
    }
}

impl<C, T, R> Converter<T> for Mapped<C, T, R>
where
    C: Converter<R>,
{
    fn encode(&self, value: &T, w: &mut WireWriter) -> Result<(), EncodeError> {
        self.inner.encode(&(self.to_repr)(value), w)
    }

    fn decode(&self, r: &mut WireReader<'_>) -> Result<T, DecodeError> {
        self.inner.decode(r).map(self.from_repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_bytes, to_bytes};

    fn encode_with<T, C: Converter<T>>(conv: &C, value: &T) -> Vec<u8> {
        let mut w = WireWriter::new();
        conv.encode(value, &mut w).unwrap();
        w.as_slice().to_vec()
    }

    fn decode_with<T, C: Converter<T>>(conv: &C, bytes: &[u8]) -> T {
        let mut r = WireReader::new(bytes);
        let value = conv.decode(&mut r).unwrap();
        r.finish().unwrap();
        value
    }

    #[test]
    fn test_natural_matches_wire_impl() {
        let conv = natural::<u32>();
        assert_eq!(encode_with(&conv, &7), to_bytes(&7u32).unwrap().to_vec());
    }

    #[test]
    fn test_sequence_of_matches_vec_layout() {
        let conv = sequence_of(natural::<String>());
        let value = vec!["a".to_string(), "bc".to_string()];
        let bytes = encode_with(&conv, &value);
        assert_eq!(bytes, to_bytes(&value).unwrap().to_vec());
        assert_eq!(decode_with(&conv, &bytes), value);
    }

    #[test]
    fn test_empty_sequence_and_absent_optional() {
        let seq = sequence_of(natural::<u8>());
        let empty = Vec::<u8>::new();
        assert_eq!(decode_with(&seq, &encode_with(&seq, &empty)), empty);

        let opt = optional_of(natural::<u64>());
        let bytes = encode_with(&opt, &None::<u64>);
        assert_eq!(bytes, vec![0]);
        assert_eq!(decode_with(&opt, &bytes), None::<u64>);
    }

    #[test]
    fn test_product_is_fields_in_order() {
        let conv = product!(natural::<u8>(), natural::<u16>(), natural::<bool>());
        let value = (1u8, (2u16, (true, ())));
        let bytes = encode_with(&conv, &value);
        assert_eq!(bytes, vec![1, 0, 2, 1]);
        assert_eq!(decode_with(&conv, &bytes), value);
    }

    #[test]
    fn test_empty_product_is_zero_bytes() {
        let conv = product!();
        assert!(encode_with(&conv, &()).is_empty());
    }

    #[test]
    fn test_record_matches_tuple_layout() {
        #[derive(Debug, PartialEq)]
        struct Pong {
            seq: u32,
            echo: String,
        }

        let conv = map(
            product!(natural::<u32>(), natural::<String>()),
            |p: &Pong| (p.seq, (p.echo.clone(), ())),
            |(seq, (echo, ()))| Pong { seq, echo },
        );
        let pong = Pong {
            seq: 7,
            echo: "hi".into(),
        };
        let bytes = encode_with(&conv, &pong);
        assert_eq!(bytes, to_bytes(&(7u32, "hi".to_string())).unwrap().to_vec());
        assert_eq!(decode_with(&conv, &bytes), pong);
    }

    #[test]
    fn test_boxed_converter_is_usable() {
        let conv: BoxedConverter<Option<i16>> =
            Arc::new(optional_of(natural::<i16>()));
        let bytes = encode_with(&conv, &Some(-1));
        assert_eq!(from_bytes::<Option<i16>>(&bytes).unwrap(), Some(-1));
    }
}

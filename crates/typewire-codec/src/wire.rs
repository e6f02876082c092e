//! The [`Wire`] trait: types that know their own binary shape.
//!
//! `Wire` plays the role of a typeclass instance. A type implements it once,
//! and every container built from it (sequences, optionals, tuples, records,
//! sums) gets an encoder and decoder for free by structural recursion.
//!
//! Layouts:
//!
//! ```text
//! bool            [u8: 0 | 1]
//! u8..i64         fixed width, big-endian
//! f32, f64        IEEE-754 bits, big-endian
//! String          [varint len][UTF-8 bytes]
//! Bytes           [varint len][raw bytes]
//! Vec<T>          [u32 count][count × T]
//! Option<T>       [u8 flag][T if flag == 1]
//! (A, B, ..)      A then B then ..
//! BTreeMap<K, V>  [u32 count][count × (K, V)] in ascending key order
//! ```

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::{DecodeError, EncodeError, WireReader, WireWriter};

/// A type with a natural wire encoding.
pub trait Wire: Sized {
    /// Appends `self` to the writer.
    fn encode(&self, w: &mut WireWriter) -> Result<(), EncodeError>;

    /// Reads one value from the reader.
    fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError>;
}

/// Encodes a value into a fresh buffer.
pub fn to_bytes<T: Wire>(value: &T) -> Result<Bytes, EncodeError> {
    let mut w = WireWriter::new();
    value.encode(&mut w)?;
    Ok(w.freeze())
}

/// Decodes exactly one value; leftover bytes are an error.
pub fn from_bytes<T: Wire>(bytes: &[u8]) -> Result<T, DecodeError> {
    let mut r = WireReader::new(bytes);
    let value = T::decode(&mut r)?;
    r.finish()?;
    Ok(value)
}

macro_rules! impl_wire_fixed {
    ($($ty:ty => $put:ident, $read:ident;)*) => {
        $(
            impl Wire for $ty {
                fn encode(&self, w: &mut WireWriter) -> Result<(), EncodeError> {
                    w.$put(*self);
                    Ok(())
                }

                fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
                    r.$read()
                }
            }
        )*
    };
}

impl_wire_fixed! {
    bool => put_bool, read_bool;
    u8 => put_u8, read_u8;
    i8 => put_i8, read_i8;
    u16 => put_u16, read_u16;
    i16 => put_i16, read_i16;
    u32 => put_u32, read_u32;
    i32 => put_i32, read_i32;
    u64 => put_u64, read_u64;
    i64 => put_i64, read_i64;
    f32 => put_f32, read_f32;
    f64 => put_f64, read_f64;
}

impl Wire for String {
    fn encode(&self, w: &mut WireWriter) -> Result<(), EncodeError> {
        w.put_len_varint(self.len())?;
        w.put_slice(self.as_bytes());
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        let mark = r.mark();
        let len = r.read_len_varint()?;
        let raw = r.read_slice(len)?;
        match std::str::from_utf8(raw) {
            Ok(s) => Ok(s.to_owned()),
            Err(_) => {
                r.reset(mark);
                Err(DecodeError::InvalidUtf8)
            }
        }
    }
}

impl Wire for Bytes {
    fn encode(&self, w: &mut WireWriter) -> Result<(), EncodeError> {
        w.put_len_varint(self.len())?;
        w.put_slice(self);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        let len = r.read_len_varint()?;
        Ok(Bytes::copy_from_slice(r.read_slice(len)?))
    }
}

impl<T: Wire> Wire for Vec<T> {
    fn encode(&self, w: &mut WireWriter) -> Result<(), EncodeError> {
        w.put_count(self.len())?;
        for item in self {
            item.encode(w)?;
        }
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        r.read_sequence(T::decode)
    }
}

impl<T: Wire> Wire for Option<T> {
    fn encode(&self, w: &mut WireWriter) -> Result<(), EncodeError> {
        match self {
            Some(value) => {
                w.put_bool(true);
                value.encode(w)
            }
            None => {
                w.put_bool(false);
                Ok(())
            }
        }
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        if r.read_bool()? {
            Ok(Some(T::decode(r)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Wire> Wire for Box<T> {
    fn encode(&self, w: &mut WireWriter) -> Result<(), EncodeError> {
        (**self).encode(w)
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        r.nested(T::decode).map(Box::new)
    }
}

impl<K: Wire + Ord, V: Wire> Wire for BTreeMap<K, V> {
    fn encode(&self, w: &mut WireWriter) -> Result<(), EncodeError> {
        w.put_count(self.len())?;
        for (key, value) in self {
            key.encode(w)?;
            value.encode(w)?;
        }
        Ok(())
    }

    /// Keys must be strictly ascending, as the encoder writes them, so
    /// every map has exactly one encoding.
    fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        let mark = r.mark();
        let entries = r.read_sequence(|r| Ok((K::decode(r)?, V::decode(r)?)))?;
        let mut map = BTreeMap::new();
        for (key, value) in entries {
            if map.last_key_value().is_some_and(|(last, _)| *last >= key) {
                r.reset(mark);
                return Err(DecodeError::Invalid(
                    "map keys are not strictly ascending".into(),
                ));
            }
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl Wire for () {
    fn encode(&self, _w: &mut WireWriter) -> Result<(), EncodeError> {
        Ok(())
    }

    fn decode(_r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        Ok(())
    }
}

// Tuples are product shapes: each element in order, nothing in between.
macro_rules! impl_wire_tuple {
    ($($name:ident)+) => {
        impl<$($name: Wire),+> Wire for ($($name,)+) {
            #[allow(non_snake_case)]
            fn encode(&self, w: &mut WireWriter) -> Result<(), EncodeError> {
                let ($($name,)+) = self;
                $($name.encode(w)?;)+
                Ok(())
            }

            fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
                Ok(($($name::decode(r)?,)+))
            }
        }
    };
}

impl_wire_tuple!(A);
impl_wire_tuple!(A B);
impl_wire_tuple!(A B C);
impl_wire_tuple!(A B C D);
impl_wire_tuple!(A B C D E);
impl_wire_tuple!(A B C D E F);
impl_wire_tuple!(A B C D E F G);
impl_wire_tuple!(A B C D E F G H);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_layout() {
        let bytes = to_bytes(&"hi".to_string()).unwrap();
        assert_eq!(&bytes[..], &[0x02, b'h', b'i']);
    }

    #[test]
    fn test_sequence_layout_has_u32_count() {
        let bytes = to_bytes(&vec![1u16, 2]).unwrap();
        assert_eq!(&bytes[..], &[0, 0, 0, 2, 0, 1, 0, 2]);
    }

    #[test]
    fn test_empty_sequence_round_trips_to_equal_value() {
        let empty: Vec<String> = Vec::new();
        let bytes = to_bytes(&empty).unwrap();
        assert_eq!(&bytes[..], &[0, 0, 0, 0]);
        let decoded: Vec<String> = from_bytes(&bytes).unwrap();
        assert_eq!(decoded, empty);
    }

    #[test]
    fn test_absent_optional_writes_only_the_flag() {
        let bytes = to_bytes(&None::<u64>).unwrap();
        assert_eq!(&bytes[..], &[0]);
        assert_eq!(from_bytes::<Option<u64>>(&bytes).unwrap(), None);

        let bytes = to_bytes(&Some(5u8)).unwrap();
        assert_eq!(&bytes[..], &[1, 5]);
    }

    #[test]
    fn test_nested_containers_round_trip() {
        let value: Vec<Option<(u8, String)>> =
            vec![Some((1, "a".into())), None, Some((2, String::new()))];
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(from_bytes::<Vec<Option<(u8, String)>>>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_unit_contributes_zero_bytes() {
        assert!(to_bytes(&()).unwrap().is_empty());
        assert_eq!(to_bytes(&(3u8, ())).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let bytes = [0x02, 0xff, 0xfe];
        assert_eq!(
            from_bytes::<String>(&bytes).unwrap_err(),
            DecodeError::InvalidUtf8
        );
    }

    #[test]
    fn test_huge_count_with_short_input_fails_cleanly() {
        // Claims u32::MAX elements but has none.
        let bytes = [0xff, 0xff, 0xff, 0xff];
        assert!(matches!(
            from_bytes::<Vec<u32>>(&bytes),
            Err(DecodeError::TooManyElements { count: 0xffff_ffff, .. })
        ));
    }

    #[test]
    fn test_huge_count_of_empty_elements_is_rejected_up_front() {
        let bytes = [0xff, 0xff, 0xff, 0xff];
        assert_eq!(
            from_bytes::<Vec<()>>(&bytes).unwrap_err(),
            DecodeError::TooManyElements {
                count: 0xffff_ffff,
                max: crate::MAX_EMPTY_ELEMENTS
            }
        );
    }

    #[test]
    fn test_short_run_of_empty_elements_still_decodes() {
        assert_eq!(from_bytes::<Vec<()>>(&[0, 0, 0, 3]).unwrap(), vec![(); 3]);
        // Empty elements ride on top of whatever input remains.
        let bytes = to_bytes(&vec![((), 1u8), ((), 2u8)]).unwrap();
        assert_eq!(
            from_bytes::<Vec<((), u8)>>(&bytes).unwrap(),
            vec![((), 1), ((), 2)]
        );
    }

    #[test]
    fn test_map_rejects_repeated_or_unordered_keys() {
        // Two entries, both keyed "a".
        let repeated = [0, 0, 0, 2, 1, b'a', 0, 0, 0, 1, 1, b'a', 0, 0, 0, 2];
        assert!(matches!(
            from_bytes::<BTreeMap<String, i32>>(&repeated),
            Err(DecodeError::Invalid(_))
        ));

        // "b" before "a".
        let unordered = [0, 0, 0, 2, 1, b'b', 0, 0, 0, 2, 1, b'a', 0, 0, 0, 1];
        assert!(matches!(
            from_bytes::<BTreeMap<String, i32>>(&unordered),
            Err(DecodeError::Invalid(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        assert_eq!(
            from_bytes::<u8>(&[1, 2]).unwrap_err(),
            DecodeError::TrailingBytes(1)
        );
    }

    #[test]
    fn test_map_round_trip_in_key_order() {
        let mut map = BTreeMap::new();
        map.insert("b".to_string(), 2i32);
        map.insert("a".to_string(), 1i32);
        let bytes = to_bytes(&map).unwrap();
        // First key on the wire is "a".
        assert_eq!(&bytes[4..6], &[0x01, b'a']);
        assert_eq!(from_bytes::<BTreeMap<String, i32>>(&bytes).unwrap(), map);
    }
}

//! Declarative derivation of [`Wire`](crate::Wire) for user types.
//!
//! A record or enum is just a product or a sum of things that already have
//! a wire form. These macros write the structural impl so no message type
//! needs hand-written serialization:
//!
//! ```
//! use typewire_codec::{from_bytes, to_bytes, wire_enum, wire_struct};
//!
//! #[derive(Debug, PartialEq)]
//! struct Pong { seq: u32, echo: String }
//! wire_struct!(Pong { seq, echo });
//!
//! #[derive(Debug, PartialEq)]
//! enum Command {
//!     Say(String),
//!     Teleport { x: i32, y: i32, z: i32 },
//!     Quit,
//! }
//! wire_enum!(Command {
//!     0 => Say(text),
//!     1 => Teleport { x, y, z },
//!     2 => Quit,
//! });
//!
//! let bytes = to_bytes(&Pong { seq: 7, echo: "hi".into() }).unwrap();
//! assert_eq!(&bytes[..], &[0, 0, 0, 7, 2, b'h', b'i']);
//!
//! let bytes = to_bytes(&Command::Quit).unwrap();
//! assert_eq!(from_bytes::<Command>(&bytes).unwrap(), Command::Quit);
//! ```
//!
//! The only requirement is that every field type implements `Wire`.
//! Field order in the macro is the wire order; it doesn't have to match
//! the declaration, but both ends must use the same list.

/// Implements [`Wire`](crate::Wire) for a struct as a product of its
/// fields, in the listed order.
///
/// Named fields: `wire_struct!(Ping { seq })`.
/// Tuple fields: `wire_struct!(Meters(0))`.
/// Unit structs: `wire_struct!(Heartbeat {})`.
///
/// Type parameters are listed after the name and each gets a `Wire`
/// bound: `wire_struct!(Envelope<T> { id, body })`. Lifetimes, const
/// generics and extra bounds aren't accepted; implement `Wire` by hand for
/// those. The type is named by a bare identifier, so invoke the macro
/// where the type is in scope.
///
/// ```
/// use typewire_codec::{from_bytes, to_bytes, wire_struct};
///
/// #[derive(Debug, PartialEq)]
/// struct Envelope<T> { id: u16, body: T }
/// wire_struct!(Envelope<T> { id, body });
///
/// let sent = Envelope { id: 1, body: vec![true, false] };
/// let bytes = to_bytes(&sent).unwrap();
/// assert_eq!(from_bytes::<Envelope<Vec<bool>>>(&bytes).unwrap(), sent);
/// ```
#[macro_export]
macro_rules! wire_struct {
    ($ty:ident < $($param:ident),+ $(,)? > { $($field:ident),* $(,)? }) => {
        impl<$($param: $crate::Wire),+> $crate::Wire for $ty<$($param),+> {
            fn encode(
                &self,
                w: &mut $crate::WireWriter,
            ) -> ::core::result::Result<(), $crate::EncodeError> {
                $( $crate::Wire::encode(&self.$field, w)?; )*
                let _ = w;
                ::core::result::Result::Ok(())
            }

            fn decode(
                r: &mut $crate::WireReader<'_>,
            ) -> ::core::result::Result<Self, $crate::DecodeError> {
                let _ = &r;
                ::core::result::Result::Ok(Self {
                    $( $field: $crate::Wire::decode(r)?, )*
                })
            }
        }
    };
    ($ty:ident < $($param:ident),+ $(,)? > ( $($index:tt),* $(,)? )) => {
        impl<$($param: $crate::Wire),+> $crate::Wire for $ty<$($param),+> {
            fn encode(
                &self,
                w: &mut $crate::WireWriter,
            ) -> ::core::result::Result<(), $crate::EncodeError> {
                $( $crate::Wire::encode(&self.$index, w)?; )*
                let _ = w;
                ::core::result::Result::Ok(())
            }

            fn decode(
                r: &mut $crate::WireReader<'_>,
            ) -> ::core::result::Result<Self, $crate::DecodeError> {
                let _ = &r;
                ::core::result::Result::Ok(Self {
                    $( $index: $crate::Wire::decode(r)?, )*
                })
            }
        }
    };
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $crate::Wire for $ty {
            fn encode(
                &self,
                w: &mut $crate::WireWriter,
            ) -> ::core::result::Result<(), $crate::EncodeError> {
                $( $crate::Wire::encode(&self.$field, w)?; )*
                let _ = w;
                ::core::result::Result::Ok(())
            }

            fn decode(
                r: &mut $crate::WireReader<'_>,
            ) -> ::core::result::Result<Self, $crate::DecodeError> {
                let _ = &r;
                ::core::result::Result::Ok(Self {
                    $( $field: $crate::Wire::decode(r)?, )*
                })
            }
        }
    };
    ($ty:ident ( $($index:tt),* $(,)? )) => {
        impl $crate::Wire for $ty {
            fn encode(
                &self,
                w: &mut $crate::WireWriter,
            ) -> ::core::result::Result<(), $crate::EncodeError> {
                $( $crate::Wire::encode(&self.$index, w)?; )*
                let _ = w;
                ::core::result::Result::Ok(())
            }

            fn decode(
                r: &mut $crate::WireReader<'_>,
            ) -> ::core::result::Result<Self, $crate::DecodeError> {
                let _ = &r;
                ::core::result::Result::Ok(Self {
                    $( $index: $crate::Wire::decode(r)?, )*
                })
            }
        }
    };
}

/// Implements [`Wire`](crate::Wire) for an enum as a sum shape.
///
/// Each branch is `tag => Variant`, `tag => Variant(a, b, ..)` (names for
/// the tuple fields) or `tag => Variant { field, .. }`. Tags are bytes,
/// scoped to this enum; a repeated tag fails to compile. Decoding an
/// unknown tag returns [`DecodeError::UnknownBranch`](crate::DecodeError)
/// and leaves the reader where it was.
///
/// The enum is named by a bare identifier and can't take type parameters;
/// for a generic sum build a converter with
/// [`SumOf::builder`](crate::SumOf::builder) or implement `Wire` by hand.
#[macro_export]
macro_rules! wire_enum {
    // Tuple variant.
    (@munch $ty:ident, $w:ident, $r:ident,
        [$($enc:tt)*] [$($dec:tt)*] [$($tags:expr),*]
        $tag:literal => $variant:ident ( $($bind:ident),+ $(,)? )
        $(, $($rest:tt)*)?
    ) => {
        $crate::wire_enum!(@munch $ty, $w, $r,
            [$($enc)*
                Self::$variant($($bind),+) => {
                    $w.put_u8($tag);
                    $( $crate::Wire::encode($bind, $w)?; )+
                }
            ]
            [$($dec)*
                $tag => Self::$variant($( $crate::__wire_field!($r, $bind) ),+),
            ]
            [$($tags,)* $tag]
            $($($rest)*)?
        );
    };
    // Struct variant.
    (@munch $ty:ident, $w:ident, $r:ident,
        [$($enc:tt)*] [$($dec:tt)*] [$($tags:expr),*]
        $tag:literal => $variant:ident { $($field:ident),* $(,)? }
        $(, $($rest:tt)*)?
    ) => {
        $crate::wire_enum!(@munch $ty, $w, $r,
            [$($enc)*
                Self::$variant { $($field),* } => {
                    $w.put_u8($tag);
                    $( $crate::Wire::encode($field, $w)?; )*
                }
            ]
            [$($dec)*
                $tag => Self::$variant {
                    $( $field: $crate::Wire::decode($r)? ),*
                },
            ]
            [$($tags,)* $tag]
            $($($rest)*)?
        );
    };
    // Unit variant.
    (@munch $ty:ident, $w:ident, $r:ident,
        [$($enc:tt)*] [$($dec:tt)*] [$($tags:expr),*]
        $tag:literal => $variant:ident
        $(, $($rest:tt)*)?
    ) => {
        $crate::wire_enum!(@munch $ty, $w, $r,
            [$($enc)*
                Self::$variant => {
                    $w.put_u8($tag);
                }
            ]
            [$($dec)*
                $tag => Self::$variant,
            ]
            [$($tags,)* $tag]
            $($($rest)*)?
        );
    };
    // All branches consumed: emit the impl.
    (@munch $ty:ident, $w:ident, $r:ident,
        [$($enc:tt)*] [$($dec:tt)*] [$($tags:expr),*]
    ) => {
        const _: () = $crate::assert_unique_tags(&[$($tags),*]);

        impl $crate::Wire for $ty {
            fn encode(
                &self,
                $w: &mut $crate::WireWriter,
            ) -> ::core::result::Result<(), $crate::EncodeError> {
                match self {
                    $($enc)*
                }
                ::core::result::Result::Ok(())
            }

            fn decode(
                $r: &mut $crate::WireReader<'_>,
            ) -> ::core::result::Result<Self, $crate::DecodeError> {
                let mark = $r.mark();
                let tag = $r.read_u8()?;
                let mut decode_branch =
                    || -> ::core::result::Result<Self, $crate::DecodeError> {
                        ::core::result::Result::Ok(match tag {
                            $($dec)*
                            other => {
                                return ::core::result::Result::Err(
                                    $crate::DecodeError::UnknownBranch {
                                        sum: ::core::stringify!($ty),
                                        tag: other,
                                    },
                                );
                            }
                        })
                    };
                let result = decode_branch();
                if result.is_err() {
                    $r.reset(mark);
                }
                result
            }
        }
    };
    ($ty:ident { $($body:tt)* }) => {
        $crate::wire_enum!(@munch $ty, w, r, [] [] [] $($body)*);
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __wire_field {
    ($r:ident, $_bind:ident) => {
        $crate::Wire::decode($r)?
    };
}

/// Compile-time check behind [`wire_enum!`]: every branch tag is distinct.
#[doc(hidden)]
pub const fn assert_unique_tags(tags: &[u8]) {
    let mut i = 0;
    while i < tags.len() {
        let mut j = i + 1;
        while j < tags.len() {
            if tags[i] == tags[j] {
                panic!("wire_enum! branch tags must be unique");
            }
            j += 1;
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use crate::{from_bytes, to_bytes, DecodeError, Wire, WireReader};

    #[derive(Debug, Clone, PartialEq)]
    struct Ping {
        seq: u32,
    }
    crate::wire_struct!(Ping { seq });

    #[derive(Debug, Clone, PartialEq)]
    struct Heartbeat;
    crate::wire_struct!(Heartbeat {});

    #[derive(Debug, Clone, PartialEq)]
    struct Meters(f64, bool);
    crate::wire_struct!(Meters(0, 1));

    #[derive(Debug, Clone, PartialEq)]
    struct Envelope<T> {
        id: u16,
        body: T,
    }
    crate::wire_struct!(Envelope<T> { id, body });

    #[derive(Debug, Clone, PartialEq)]
    struct Keyed<K, V>(K, V);
    crate::wire_struct!(Keyed<K, V>(0, 1));

    #[derive(Debug, Clone, PartialEq)]
    enum Shape {
        Circle(f32),
        Rect { w: u16, h: u16 },
        Segment(i32, i32),
        Empty,
    }
    crate::wire_enum!(Shape {
        0 => Circle(radius),
        1 => Rect { w, h },
        2 => Segment(from, to),
        3 => Empty,
    });

    #[test]
    fn test_struct_layout_is_field_order() {
        assert_eq!(&to_bytes(&Ping { seq: 7 }).unwrap()[..], &[0, 0, 0, 7]);
    }

    #[test]
    fn test_unit_struct_is_zero_bytes() {
        let bytes = to_bytes(&Heartbeat).unwrap();
        assert!(bytes.is_empty());
        assert_eq!(from_bytes::<Heartbeat>(&bytes).unwrap(), Heartbeat);
    }

    #[test]
    fn test_tuple_struct_round_trip() {
        let value = Meters(1.5, true);
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(bytes.len(), 9);
        assert_eq!(from_bytes::<Meters>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_generic_structs_round_trip() {
        let value = Envelope {
            id: 3,
            body: Ping { seq: 9 },
        };
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(&bytes[..], &[0, 3, 0, 0, 0, 9]);
        assert_eq!(from_bytes::<Envelope<Ping>>(&bytes).unwrap(), value);

        let pair = Keyed(String::from("k"), Envelope { id: 1, body: () });
        let bytes = to_bytes(&pair).unwrap();
        assert_eq!(&bytes[..], &[1, b'k', 0, 1]);
        assert_eq!(from_bytes::<Keyed<String, Envelope<()>>>(&bytes).unwrap(), pair);
    }

    #[test]
    fn test_enum_branch_k_decodes_to_branch_k() {
        let values = [
            Shape::Circle(2.0),
            Shape::Rect { w: 3, h: 4 },
            Shape::Segment(-1, 1),
            Shape::Empty,
        ];
        for (k, value) in values.iter().enumerate() {
            let bytes = to_bytes(value).unwrap();
            assert_eq!(bytes[0] as usize, k);
            assert_eq!(&from_bytes::<Shape>(&bytes).unwrap(), value);
        }
    }

    #[test]
    fn test_struct_variant_layout() {
        let bytes = to_bytes(&Shape::Rect { w: 3, h: 4 }).unwrap();
        assert_eq!(&bytes[..], &[1, 0, 3, 0, 4]);
    }

    #[test]
    fn test_unknown_tag_fails_without_consuming() {
        let bytes = [9, 0, 0];
        let mut r = WireReader::new(&bytes);
        assert_eq!(
            Shape::decode(&mut r).unwrap_err(),
            DecodeError::UnknownBranch {
                sum: "Shape",
                tag: 9
            }
        );
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_failed_branch_payload_rewinds() {
        // Segment needs 8 payload bytes; give it 3.
        let bytes = [2, 0, 0, 0];
        let mut r = WireReader::new(&bytes);
        assert!(matches!(
            Shape::decode(&mut r),
            Err(DecodeError::Truncated { .. })
        ));
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_derived_types_nest() {
        let value = vec![Some(Shape::Empty), None, Some(Shape::Circle(0.5))];
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(from_bytes::<Vec<Option<Shape>>>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_assert_unique_tags_accepts_distinct() {
        crate::assert_unique_tags(&[0, 1, 2, 255]);
    }

    #[test]
    #[should_panic(expected = "unique")]
    fn test_assert_unique_tags_rejects_repeats() {
        crate::assert_unique_tags(&[0, 1, 0]);
    }
}

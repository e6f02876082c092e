//! Well-known values that show up in many message schemas.

use std::collections::BTreeMap;
use std::fmt;

use crate::{DecodeError, EncodeError, Wire, WireReader, WireWriter};

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// An integer grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

crate::wire_struct!(BlockPos { x, y, z });

// ---------------------------------------------------------------------------
// UUIDs
// ---------------------------------------------------------------------------

/// 16 bytes: the most significant `u64` first, then the least.
#[cfg(feature = "uuid")]
impl Wire for uuid::Uuid {
    fn encode(&self, w: &mut WireWriter) -> Result<(), EncodeError> {
        let (most, least) = self.as_u64_pair();
        w.put_u64(most);
        w.put_u64(least);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        let bytes = r.read_slice(16)?;
        let mut raw = [0u8; 16];
        raw.copy_from_slice(bytes);
        Ok(uuid::Uuid::from_bytes(raw))
    }
}

// ---------------------------------------------------------------------------
// Tag tree
// ---------------------------------------------------------------------------

/// A named collection of [`Tag`]s, kept in key order.
pub type TagMap = BTreeMap<String, Tag>;

/// A self-describing attribute value.
///
/// Used for free-form payloads (entity metadata, item attributes) where the
/// schema isn't fixed at compile time. Each value carries its kind as a
/// branch tag, so a tree can be read without knowing its shape up front.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<Tag>),
    Compound(TagMap),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

crate::wire_enum!(Tag {
    1 => Byte(value),
    2 => Short(value),
    3 => Int(value),
    4 => Long(value),
    5 => Float(value),
    6 => Double(value),
    7 => ByteArray(values),
    8 => String(value),
    9 => List(items),
    10 => Compound(entries),
    11 => IntArray(values),
    12 => LongArray(values),
});

impl Tag {
    /// The branch tag this value is written with.
    pub fn kind(&self) -> u8 {
        match self {
            Tag::Byte(_) => 1,
            Tag::Short(_) => 2,
            Tag::Int(_) => 3,
            Tag::Long(_) => 4,
            Tag::Float(_) => 5,
            Tag::Double(_) => 6,
            Tag::ByteArray(_) => 7,
            Tag::String(_) => 8,
            Tag::List(_) => 9,
            Tag::Compound(_) => 10,
            Tag::IntArray(_) => 11,
            Tag::LongArray(_) => 12,
        }
    }

    /// Looks up a child of a compound; `None` for any other kind.
    pub fn get(&self, key: &str) -> Option<&Tag> {
        match self {
            Tag::Compound(map) => map.get(key),
            _ => None,
        }
    }
}

impl From<i32> for Tag {
    fn from(value: i32) -> Self {
        Tag::Int(value)
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Tag::String(value)
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Tag::String(value.to_owned())
    }
}

impl From<TagMap> for Tag {
    fn from(value: TagMap) -> Self {
        Tag::Compound(value)
    }
}

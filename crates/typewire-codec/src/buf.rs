//! Byte sinks and sources used by every converter.
//!
//! All multi-byte integers are big-endian. Lengths of strings and blobs are
//! LEB128 varints; element counts of sequences are fixed `u32`s.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{DecodeError, EncodeError};

/// Maximum encoded width of a `u32` varint.
pub const MAX_VARINT_LEN: usize = 5;

/// Deepest nesting of sequences, maps and boxes a reader will follow.
pub const MAX_DEPTH: usize = 128;

/// How many elements of a sequence may decode from zero bytes.
pub const MAX_EMPTY_ELEMENTS: usize = 4096;

/// Append-only sink for encoded bytes.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn put_i8(&mut self, value: i8) {
        self.buf.put_i8(value);
    }

    pub fn put_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    pub fn put_i16(&mut self, value: i16) {
        self.buf.put_i16(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    pub fn put_u64(&mut self, value: u64) {
        self.buf.put_u64(value);
    }

    pub fn put_i64(&mut self, value: i64) {
        self.buf.put_i64(value);
    }

    pub fn put_f32(&mut self, value: f32) {
        self.buf.put_f32(value);
    }

    pub fn put_f64(&mut self, value: f64) {
        self.buf.put_f64(value);
    }

    /// Writes a LEB128 varint (7 bits per byte, high bit = continue).
    pub fn put_varint(&mut self, mut value: u32) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.buf.put_u8(byte);
                return;
            }
            self.buf.put_u8(byte | 0x80);
        }
    }

    /// Writes a varint length prefix for `len` items.
    pub fn put_len_varint(&mut self, len: usize) -> Result<(), EncodeError> {
        let len = u32::try_from(len).map_err(|_| EncodeError::LengthOverflow {
            len,
            max: u32::MAX as usize,
        })?;
        self.put_varint(len);
        Ok(())
    }

    /// Writes a fixed `u32` element count.
    pub fn put_count(&mut self, count: usize) -> Result<(), EncodeError> {
        let count =
            u32::try_from(count).map_err(|_| EncodeError::LengthOverflow {
                len: count,
                max: u32::MAX as usize,
            })?;
        self.put_u32(count);
        Ok(())
    }

    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrows what has been written.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Finishes writing and returns the bytes.
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// A saved read position, see [`WireReader::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

/// Cursor over a borrowed frame.
///
/// Reads never panic: a read past the end returns
/// [`DecodeError::Truncated`] and leaves the position unchanged. Nesting is
/// bounded by [`MAX_DEPTH`], so a hostile frame can't exhaust the stack.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            depth: 0,
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Runs `f` one nesting level deeper.
    ///
    /// Fails with [`DecodeError::TooDeep`] past [`MAX_DEPTH`]. Every
    /// container that can hold its own type (sequences, maps, boxes)
    /// decodes through here.
    pub fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        if self.depth >= MAX_DEPTH {
            return Err(DecodeError::TooDeep { max: MAX_DEPTH });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Current offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Remembers the current position.
    pub fn mark(&self) -> Mark {
        Mark(self.pos)
    }

    /// Rewinds to a position saved with [`mark`](Self::mark).
    pub fn reset(&mut self, mark: Mark) {
        self.pos = mark.0;
    }

    /// Reads `len` bytes as a borrowed slice.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(DecodeError::Truncated {
                needed: len,
                remaining,
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.buf[start..self.pos])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    /// Looks at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8, DecodeError> {
        self.buf.get(self.pos).copied().ok_or(DecodeError::Truncated {
            needed: 1,
            remaining: 0,
        })
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = self.peek_u8()?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(i8::from_be_bytes(self.read_array()?))
    }

    /// Reads a strict boolean: only 0 and 1 are accepted.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        let mark = self.mark();
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => {
                self.reset(mark);
                Err(DecodeError::InvalidBool(other))
            }
        }
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    /// Reads a LEB128 varint of at most [`MAX_VARINT_LEN`] bytes.
    pub fn read_varint(&mut self) -> Result<u32, DecodeError> {
        let mark = self.mark();
        let mut value: u32 = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = match self.read_u8() {
                Ok(byte) => byte,
                Err(e) => {
                    self.reset(mark);
                    return Err(e);
                }
            };
            value |= u32::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        self.reset(mark);
        Err(DecodeError::VarIntTooLong {
            max: MAX_VARINT_LEN,
        })
    }

    /// Reads a varint byte length and checks it against the input.
    ///
    /// A length that claims more bytes than remain fails here, before the
    /// caller allocates anything.
    pub fn read_len_varint(&mut self) -> Result<usize, DecodeError> {
        let mark = self.mark();
        let len = self.read_varint()? as usize;
        let remaining = self.remaining();
        if len > remaining {
            self.reset(mark);
            return Err(DecodeError::Truncated {
                needed: len,
                remaining,
            });
        }
        Ok(len)
    }

    /// Reads a fixed `u32` element count.
    pub fn read_count(&mut self) -> Result<usize, DecodeError> {
        Ok(self.read_u32()? as usize)
    }

    /// Reads `[u32 count][count × element]`, one level deeper.
    ///
    /// Elements that take at least one byte can't outnumber the remaining
    /// input, and at most [`MAX_EMPTY_ELEMENTS`] may take none, so a count
    /// larger than `remaining + MAX_EMPTY_ELEMENTS` is rejected before any
    /// element is read.
    pub fn read_sequence<T>(
        &mut self,
        mut element: impl FnMut(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        let mark = self.mark();
        let count = self.read_count()?;
        let max = self.remaining().saturating_add(MAX_EMPTY_ELEMENTS);
        if count > max {
            self.reset(mark);
            return Err(DecodeError::TooManyElements { count, max });
        }
        self.nested(|r| {
            let mut items = Vec::with_capacity(count.min(r.remaining()));
            for _ in 0..count {
                items.push(element(r)?);
            }
            Ok(items)
        })
    }

    /// Fails if any input is left.
    pub fn finish(&self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

//! One-byte discriminators and their allocation.
//!
//! A discriminator is the tag byte that tells the reader which type (or which
//! sum branch) follows. Both ends of a channel must agree on every tag, and
//! nothing on the wire negotiates them, so allocation is deterministic: tags
//! are handed out in request order starting at zero.

use std::fmt;

use crate::SchemaError;

/// A one-byte wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Discriminator(pub u8);

impl Discriminator {
    /// Returns the raw byte.
    pub fn into_inner(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

impl From<u8> for Discriminator {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// Hands out discriminators within one scope.
///
/// A scope is either a registry (top-level message types) or a single sum
/// type (its branches). Scopes are independent: two sum types may both use
/// tag 0 because the reader always knows which sum it is decoding.
#[derive(Debug, Clone)]
pub struct DiscriminatorAllocator {
    assigned: [bool; Self::CAPACITY],
    len: usize,
}

impl DiscriminatorAllocator {
    /// Number of distinct one-byte tags.
    pub const CAPACITY: usize = 256;

    /// Creates an empty scope.
    pub fn new() -> Self {
        Self {
            assigned: [false; Self::CAPACITY],
            len: 0,
        }
    }

    /// Assigns the lowest unused tag.
    ///
    /// With no explicit claims this yields 0, 1, 2, … in call order.
    pub fn next(&mut self) -> Result<Discriminator, SchemaError> {
        let free = self
            .assigned
            .iter()
            .position(|taken| !taken)
            .ok_or(SchemaError::DiscriminatorsExhausted {
                capacity: Self::CAPACITY,
            })?;
        self.assigned[free] = true;
        self.len += 1;
        // `free` indexes a 256-entry table, so it always fits a byte.
        Ok(Discriminator(free as u8))
    }

    /// Reserves a specific tag.
    pub fn claim(
        &mut self,
        discriminator: Discriminator,
    ) -> Result<(), SchemaError> {
        let slot = &mut self.assigned[usize::from(discriminator.0)];
        if *slot {
            return Err(SchemaError::DuplicateDiscriminator(discriminator));
        }
        *slot = true;
        self.len += 1;
        Ok(())
    }

    /// Returns `true` if the tag is already taken.
    pub fn is_assigned(&self, discriminator: Discriminator) -> bool {
        self.assigned[usize::from(discriminator.0)]
    }

    /// Number of tags handed out so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing has been assigned.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for DiscriminatorAllocator {
    fn default() -> Self {
        Self::new()
    }
}

//! Sum shapes: one tag byte, then the chosen branch.
//!
//! [`SumOf`] is the runtime form of a closed variant list. Branches are
//! declared at the construction site as `(tag, converter, project, inject)`,
//! so no reflection over an enum is needed. Tags are scoped to this one sum:
//! two unrelated sums can both use tag 0.
//!
//! Decoding follows a peek-with-rollback contract: each branch looks at the
//! tag and, if it isn't its own, restores the reader before the next branch
//! tries. If nothing matches the reader is back where it started and the
//! caller gets [`DecodeError::UnknownBranch`], never a default value.

use crate::{
    Converter, DecodeError, Discriminator, DiscriminatorAllocator, EncodeError,
    SchemaError, WireReader, WireWriter,
};

/// One arm of a sum type, with its tag already assigned.
trait Branch<T>: Send + Sync {
    fn tag(&self) -> Discriminator;

    /// Writes tag and payload if `value` belongs to this branch.
    fn try_encode(
        &self,
        value: &T,
        w: &mut WireWriter,
    ) -> Option<Result<(), EncodeError>>;

    /// Decodes if the next tag is this branch's; otherwise rewinds and
    /// returns `Ok(None)`.
    fn try_decode(
        &self,
        r: &mut WireReader<'_>,
    ) -> Result<Option<T>, DecodeError>;
}

struct Arm<T, B, C> {
    tag: Discriminator,
    converter: C,
    project: fn(&T) -> Option<&B>,
    inject: fn(B) -> T,
}

impl<T, B, C> Branch<T> for Arm<T, B, C>
where
    C: Converter<B>,
{
    fn tag(&self) -> Discriminator {
        self.tag
    }

    fn try_encode(
        &self,
        value: &T,
        w: &mut WireWriter,
    ) -> Option<Result<(), EncodeError>> {
        let inner = (self.project)(value)?;
        w.put_u8(self.tag.0);
        Some(self.converter.encode(inner, w))
    }

    fn try_decode(
        &self,
        r: &mut WireReader<'_>,
    ) -> Result<Option<T>, DecodeError> {
        let mark = r.mark();
        if r.read_u8()? != self.tag.0 {
            r.reset(mark);
            return Ok(None);
        }
        match self.converter.decode(r) {
            Ok(inner) => Ok(Some((self.inject)(inner))),
            Err(e) => {
                r.reset(mark);
                Err(e)
            }
        }
    }
}

/// A converter for a closed set of branches.
///
/// ```
/// use typewire_codec::{natural, SumOf, Converter, WireReader, WireWriter};
///
/// #[derive(Debug, PartialEq)]
/// enum Shape { Circle(f32), Label(String) }
///
/// let shape = SumOf::builder("Shape")
///     .branch(natural::<f32>(),
///         |s| match s { Shape::Circle(r) => Some(r), _ => None },
///         Shape::Circle)
///     .unwrap()
///     .branch(natural::<String>(),
///         |s| match s { Shape::Label(l) => Some(l), _ => None },
///         Shape::Label)
///     .unwrap()
///     .build();
///
/// let mut w = WireWriter::new();
/// shape.encode(&Shape::Label("a".into()), &mut w).unwrap();
/// assert_eq!(w.as_slice(), &[1, 1, b'a']);
/// ```
pub struct SumOf<T> {
    name: &'static str,
    branches: Vec<Box<dyn Branch<T>>>,
}

impl<T: 'static> SumOf<T> {
    /// Starts declaring a sum named `name` (used in error messages).
    pub fn builder(name: &'static str) -> SumBuilder<T> {
        SumBuilder {
            name,
            tags: DiscriminatorAllocator::new(),
            branches: Vec::new(),
        }
    }

    /// Name given at construction.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Branch tags in declaration order.
    pub fn tags(&self) -> Vec<Discriminator> {
        self.branches.iter().map(|b| b.tag()).collect()
    }
}

impl<T: 'static> Converter<T> for SumOf<T> {
    fn encode(&self, value: &T, w: &mut WireWriter) -> Result<(), EncodeError> {
        self.branches
            .iter()
            .find_map(|branch| branch.try_encode(value, w))
            .unwrap_or(Err(EncodeError::NoBranch(self.name)))
    }

    fn decode(&self, r: &mut WireReader<'_>) -> Result<T, DecodeError> {
        for branch in &self.branches {
            if let Some(value) = branch.try_decode(r)? {
                return Ok(value);
            }
        }
        Err(DecodeError::UnknownBranch {
            sum: self.name,
            tag: r.peek_u8()?,
        })
    }
}

/// Collects branches for a [`SumOf`], assigning or checking their tags.
pub struct SumBuilder<T> {
    name: &'static str,
    tags: DiscriminatorAllocator,
    branches: Vec<Box<dyn Branch<T>>>,
}

impl<T: 'static> SumBuilder<T> {
    /// Adds a branch with the next free tag (0, 1, 2, … in call order).
    ///
    /// `project` returns the branch payload when a value belongs to this
    /// branch; `inject` wraps a decoded payload back into `T`.
    pub fn branch<B: 'static, C>(
        mut self,
        converter: C,
        project: fn(&T) -> Option<&B>,
        inject: fn(B) -> T,
    ) -> Result<Self, SchemaError>
    where
        C: Converter<B> + 'static,
    {
        let tag = self.tags.next()?;
        self.push(tag, converter, project, inject);
        Ok(self)
    }

    /// Adds a branch with an explicit tag.
    pub fn branch_at<B: 'static, C>(
        mut self,
        tag: impl Into<Discriminator>,
        converter: C,
        project: fn(&T) -> Option<&B>,
        inject: fn(B) -> T,
    ) -> Result<Self, SchemaError>
    where
        C: Converter<B> + 'static,
    {
        let tag = tag.into();
        self.tags.claim(tag)?;
        self.push(tag, converter, project, inject);
        Ok(self)
    }

    fn push<B: 'static, C>(
        &mut self,
        tag: Discriminator,
        converter: C,
        project: fn(&T) -> Option<&B>,
        inject: fn(B) -> T,
    ) where
        C: Converter<B> + 'static,
    {
        self.branches.push(Box::new(Arm {
            tag,
            converter,
            project,
            inject,
        }));
    }

    pub fn build(self) -> SumOf<T> {
        SumOf {
            name: self.name,
            branches: self.branches,
        }
    }
}

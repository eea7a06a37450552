#![forbid(unsafe_code)]

//! Two-case tagged union used by [`combine`](crate::join::combine).

/// A value from the left or the right side of a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Either<L, R> {
    /// Produced by the left source.
    Left(L),
    /// Produced by the right source.
    Right(R),
}

impl<L, R> Either<L, R> {
    /// The left value, if any.
    pub fn left(self) -> Option<L> {
        match self {
            Self::Left(value) => Some(value),
            Self::Right(_) => None,
        }
    }

    /// The right value, if any.
    pub fn right(self) -> Option<R> {
        match self {
            Self::Left(_) => None,
            Self::Right(value) => Some(value),
        }
    }

    /// Whether this is a left value.
    #[must_use]
    pub const fn is_left(&self) -> bool {
        matches!(self, Self::Left(_))
    }
}

//! Qualitative relation between two linear text ranges.
//!
//! Two ranges are compared by the order of their starts and the order of their ends. Each
//! comparison has three outcomes, so there are nine configurations. They are named after the
//! picture they draw when `A` marks text covered only by `a`, `B` text covered only by `b`, and
//! `8` text covered by both:
//!
//! | code | shape      | variant                               |
//! |------|------------|---------------------------------------|
//! | -4   | `BBBBAAAA` | [`RangeRelation::BBeforeA`]              |
//! | -3   | `BB88`     | [`RangeRelation::BStartsBeforeEndsWithA`] |
//! | -2   | `B88B`     | [`RangeRelation::BContainsA`]            |
//! | -1   | `88AA`     | [`RangeRelation::BPrefixOfA`]            |
//! |  0   | `8888`     | [`RangeRelation::Equal`]                 |
//! | +1   | `88BB`     | [`RangeRelation::APrefixOfB`]            |
//! | +2   | `A88A`     | [`RangeRelation::AContainsB`]            |
//! | +3   | `AA88`     | [`RangeRelation::AStartsBeforeEndsWithB`] |
//! | +4   | `AAAABBBB` | [`RangeRelation::ABeforeB`]              |
//!
//! Ranges living in different text containers cannot be compared at all and classify as
//! [`RangeRelation::Incomparable`]. Every tree predicate is false for that case, so callers
//! that need an answer must check [`RangeRelation::comparable`] first.

use std::cmp::Ordering;

/// A range whose boundaries can be ordered against another range of the same kind.
///
/// Both methods return `None` when the two ranges belong to different text containers.
/// `Some(Ordering::Less)` means `self`'s boundary comes first in the text.
pub trait TextRange {
    fn compare_starts(&self, other: &Self) -> Option<Ordering>;
    fn compare_ends(&self, other: &Self) -> Option<Ordering>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeRelation {
    /// `BBBBAAAA`: b lies entirely before a.
    BBeforeA,
    /// `BB88`: b starts before a, both end together.
    BStartsBeforeEndsWithA,
    /// `B88B`: b contains a.
    BContainsA,
    /// `88AA`: both start together, b ends first.
    BPrefixOfA,
    /// `8888`
    Equal,
    /// `88BB`: both start together, a ends first.
    APrefixOfB,
    /// `A88A`: a contains b.
    AContainsB,
    /// `AA88`: a starts before b, both end together.
    AStartsBeforeEndsWithB,
    /// `AAAABBBB`: a lies entirely before b.
    ABeforeB,
    Incomparable,
}

impl RangeRelation {
    const BY_CODE: [RangeRelation; 9] = [
        RangeRelation::BBeforeA,
        RangeRelation::BStartsBeforeEndsWithA,
        RangeRelation::BContainsA,
        RangeRelation::BPrefixOfA,
        RangeRelation::Equal,
        RangeRelation::APrefixOfB,
        RangeRelation::AContainsB,
        RangeRelation::AStartsBeforeEndsWithB,
        RangeRelation::ABeforeB,
    ];

    /// Builds the relation from the start and end orderings of `a` against `b`.
    pub fn from_orderings(starts: Ordering, ends: Ordering) -> Self {
        // a earlier maps to 2, equal to 1, later to 0
        let shift = |ordering: Ordering| match ordering {
            Ordering::Less => 2,
            Ordering::Equal => 1,
            Ordering::Greater => 0,
        };
        Self::BY_CODE[3 * shift(starts) + shift(ends)]
    }

    /// Numeric code in `-4..=4`, or `None` for [`RangeRelation::Incomparable`].
    pub fn code(self) -> Option<i8> {
        let code = match self {
            RangeRelation::BBeforeA => -4,
            RangeRelation::BStartsBeforeEndsWithA => -3,
            RangeRelation::BContainsA => -2,
            RangeRelation::BPrefixOfA => -1,
            RangeRelation::Equal => 0,
            RangeRelation::APrefixOfB => 1,
            RangeRelation::AContainsB => 2,
            RangeRelation::AStartsBeforeEndsWithB => 3,
            RangeRelation::ABeforeB => 4,
            RangeRelation::Incomparable => return None,
        };
        Some(code)
    }

    pub fn shape(self) -> Option<&'static str> {
        let shape = match self {
            RangeRelation::BBeforeA => "BBBBAAAA",
            RangeRelation::BStartsBeforeEndsWithA => "BB88",
            RangeRelation::BContainsA => "B88B",
            RangeRelation::BPrefixOfA => "88AA",
            RangeRelation::Equal => "8888",
            RangeRelation::APrefixOfB => "88BB",
            RangeRelation::AContainsB => "A88A",
            RangeRelation::AStartsBeforeEndsWithB => "AA88",
            RangeRelation::ABeforeB => "AAAABBBB",
            RangeRelation::Incomparable => return None,
        };
        Some(shape)
    }

    /// The relation seen from the other side: `classify(b, a)`.
    #[must_use]
    pub fn inverse(self) -> Self {
        match self {
            RangeRelation::BBeforeA => RangeRelation::ABeforeB,
            RangeRelation::BStartsBeforeEndsWithA => RangeRelation::AStartsBeforeEndsWithB,
            RangeRelation::BContainsA => RangeRelation::AContainsB,
            RangeRelation::BPrefixOfA => RangeRelation::APrefixOfB,
            RangeRelation::Equal => RangeRelation::Equal,
            RangeRelation::APrefixOfB => RangeRelation::BPrefixOfA,
            RangeRelation::AContainsB => RangeRelation::BContainsA,
            RangeRelation::AStartsBeforeEndsWithB => RangeRelation::BStartsBeforeEndsWithA,
            RangeRelation::ABeforeB => RangeRelation::BBeforeA,
            RangeRelation::Incomparable => RangeRelation::Incomparable,
        }
    }

    pub fn comparable(self) -> bool {
        self != RangeRelation::Incomparable
    }

    /// b is nested in a, with any alignment of the boundaries.
    pub fn is_b_child_of_a(self) -> bool {
        match self {
            RangeRelation::BPrefixOfA
            | RangeRelation::AContainsB
            | RangeRelation::AStartsBeforeEndsWithB => true,
            RangeRelation::BBeforeA
            | RangeRelation::BStartsBeforeEndsWithA
            | RangeRelation::BContainsA
            | RangeRelation::Equal
            | RangeRelation::APrefixOfB
            | RangeRelation::ABeforeB
            | RangeRelation::Incomparable => false,
        }
    }

    /// a is nested in b, with any alignment of the boundaries.
    pub fn is_a_child_of_b(self) -> bool {
        self.inverse().is_b_child_of_a()
    }

    pub fn is_a_sibling_before_b(self) -> bool {
        self == RangeRelation::ABeforeB
    }

    pub fn is_a_sibling_after_b(self) -> bool {
        self == RangeRelation::BBeforeA
    }

    /// Order used for sorted insertion into the command tree.
    pub fn is_a_less_than_b(self) -> bool {
        self.is_a_sibling_before_b() || self.is_b_child_of_a()
    }

    pub fn is_a_greater_than_b(self) -> bool {
        self.is_a_sibling_after_b() || self.is_a_child_of_b()
    }
}

/// Classifies how `a` relates to `b`. Absent ranges are incomparable.
pub fn classify<R: TextRange>(a: Option<&R>, b: Option<&R>) -> RangeRelation {
    let (Some(a), Some(b)) = (a, b) else {
        return RangeRelation::Incomparable;
    };
    match (a.compare_starts(b), a.compare_ends(b)) {
        (Some(starts), Some(ends)) => RangeRelation::from_orderings(starts, ends),
        _ => RangeRelation::Incomparable,
    }
}

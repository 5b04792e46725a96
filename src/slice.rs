//! The exported form of one interval of a [`SliceMap`] and the boundary
//! inclusion mode.
//!
//! A `SliceMap` partitions the extended real line into half-open intervals.
//! [`Slice`] is the read-only triple `(start, end, value)` reconstructed from
//! two consecutive boundary markers; a full `export` always covers
//! `(-inf, +inf]` without gaps or overlaps.
//!
//! [`SliceMap`]: crate::SliceMap

/// Decides which side of a boundary a key sitting exactly on it belongs to.
///
/// With [`Include::Start`], `map.get(b)` for a boundary `b` resolves to the
/// interval *starting* at `b`; with [`Include::End`] it resolves to the
/// interval *ending* at `b`. Fixed at construction.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Include {
    /// Slices include their start bound: `[a, b)`.
    #[default]
    Start,
    /// Slices include their end bound: `(a, b]`.
    End,
}

/// One half-open slice of the line: `start`, `end` and the value effective
/// between them.
///
/// `value` is `None` for regions that were never assigned. Borrowing
/// accessors of the map yield `Slice<&V>`; consuming iteration yields
/// `Slice<V>`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slice<V> {
    /// Lower bound, possibly `-inf`.
    pub start: f64,
    /// Upper bound, possibly `+inf`.
    pub end: f64,
    /// Value effective on `[start, end)`, if any was assigned.
    pub value: Option<V>,
}

impl<'a, V> Slice<&'a V> {
    /// Maps a `Slice<&V>` to a `Slice<V>` by cloning the value.
    ///
    /// # Example
    /// ```rust
    /// use slice_map::{Slice, SliceMap};
    ///
    /// let mut map = SliceMap::new();
    /// map.set(1.0..3.0, "a").unwrap();
    /// let owned: Vec<Slice<&str>> = map.export().into_iter().map(Slice::cloned).collect();
    /// assert_eq!(owned[1], Slice { start: 1.0, end: 3.0, value: Some("a") });
    /// ```
    #[inline]
    #[must_use]
    pub fn cloned(self) -> Slice<V>
    where
        V: Clone,
    {
        Slice {
            start: self.start,
            end: self.end,
            value: self.value.cloned(),
        }
    }
}

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Bound, RangeBounds};

use log::debug;

use crate::error::Error;
use crate::index::{DefaultIx, IndexType, NodeIndex};
use crate::iter::Iter;
use crate::node::{Color, Node};
use crate::slice::{Include, Slice};

/// A map from half-open numeric slices to values.
///
/// The map partitions `(-inf, +inf]` into contiguous slices by keeping an
/// ordered sequence of boundary markers, one per slice upper bound. The
/// marker with bound `+inf` (the sentinel) is always present, so the
/// partition never has a gap. Markers are stored in an arena-backed
/// red-black tree keyed by bound and augmented with subtree sizes, which
/// gives `O(log n)` rank searches for both assignment and lookup.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SliceMap<V, Ix = DefaultIx> {
    /// Vector that stores nodes
    pub(crate) nodes: Vec<Node<V, Ix>>,
    /// Root of the marker tree
    pub(crate) root: NodeIndex<Ix>,
    /// Which slice a key exactly on a boundary belongs to
    include: Include,
    /// Whether lookups over never-assigned regions are errors
    raise_missing: bool,
}

impl<V> SliceMap<V> {
    /// Create a `SliceMap` with the default configuration:
    /// [`Include::Start`] and `raise_missing = false`.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(Include::Start, false)
    }

    /// Create a `SliceMap` with the given boundary inclusion mode and
    /// missing-key policy. Both are fixed for the lifetime of the map.
    ///
    /// # Example
    /// ```rust
    /// use slice_map::{Include, SliceMap};
    ///
    /// let mut map = SliceMap::with_options(Include::End, false);
    /// map.set(2.0..4.0, 'x').unwrap();
    /// map.set(4.0..6.0, 'y').unwrap();
    /// // The boundary 4 belongs to the slice ending there.
    /// assert_eq!(map.get(4.0).unwrap(), Some(&'x'));
    /// ```
    #[inline]
    #[must_use]
    pub fn with_options(include: Include, raise_missing: bool) -> Self {
        let mut map = SliceMap {
            nodes: vec![Self::new_nil()],
            root: Self::nil(),
            include,
            raise_missing,
        };
        map.insert_marker(f64::INFINITY, None);
        map
    }

    /// Create a default-configured `SliceMap` with estimated marker capacity.
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut map = Self::with_options(Include::Start, false);
        map.nodes.reserve(capacity);
        map
    }
}

impl<V> Default for SliceMap<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<V, Ix> SliceMap<V, Ix>
where
    Ix: IndexType,
{
    /// The boundary inclusion mode this map was built with.
    #[inline]
    #[must_use]
    pub fn include(&self) -> Include {
        self.include
    }

    /// Whether lookups over never-assigned regions return an error.
    #[inline]
    #[must_use]
    pub fn raises_missing(&self) -> bool {
        self.raise_missing
    }

    /// Number of finite boundary markers in the map.
    ///
    /// This is a structural count excluding the `+inf` sentinel marker, not
    /// the number of slices in the partition: [`export`](Self::export)
    /// always returns `len() + 1` slices, because the slice reaching down
    /// to `-inf` has no marker of its own.
    ///
    /// # Example
    /// ```rust
    /// use slice_map::SliceMap;
    ///
    /// let mut map = SliceMap::new();
    /// assert_eq!(map.len(), 0);
    /// assert_eq!(map.export().len(), 1);
    /// map.set(..5.0, 'a').unwrap();
    /// assert_eq!(map.len(), 1);
    /// assert_eq!(map.export().len(), 2);
    /// ```
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.marker_count() - 1
    }

    /// Return `true` if no finite boundary marker exists.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the value effective at `key`.
    ///
    /// `+inf` resolves to the last marker and `-inf` to the first,
    /// regardless of the inclusion mode. For a key exactly on a boundary the
    /// inclusion mode decides which neighboring slice wins. Queries over a
    /// never-assigned region yield `Ok(None)`, or `Err(Error::KeyNotSet)`
    /// on maps built with `raise_missing`.
    ///
    /// # Example
    /// ```rust
    /// use slice_map::SliceMap;
    ///
    /// let mut map = SliceMap::new();
    /// map.set(2.0..4.0, 1).unwrap();
    /// map.set(4.0..6.0, 2).unwrap();
    /// assert_eq!(map.get(3.0).unwrap(), Some(&1));
    /// assert_eq!(map.get(4.0).unwrap(), Some(&2));
    /// assert_eq!(map.get(9.0).unwrap(), None);
    /// ```
    #[inline]
    pub fn get(&self, key: f64) -> Result<Option<&V>, Error> {
        let idx = self.lookup_index(key);
        match self.node_ref(self.select(idx), Node::slot) {
            Some(value) => Ok(Some(value)),
            None if self.raise_missing => Err(Error::KeyNotSet(key)),
            None => Ok(None),
        }
    }

    /// Return the values of every slice touched by `range`, in ascending
    /// order, both endpoint slices included.
    ///
    /// Unbounded ends reach the first/last marker. Each returned value is
    /// subject to the same missing-key policy as [`get`](Self::get): with
    /// `raise_missing`, the first never-assigned slice in the range aborts
    /// the query.
    ///
    /// # Example
    /// ```rust
    /// use slice_map::SliceMap;
    ///
    /// let mut map = SliceMap::new();
    /// map.set(-10.0..10.0, 0.0).unwrap();
    /// map.set(2.0..4.0, 1.0).unwrap();
    /// map.set(4.0..6.0, 2.0).unwrap();
    /// map.set(7.0..9.0, 3.0).unwrap();
    /// let values: Vec<_> = map.get_range(3.0..8.0).unwrap().into_iter().map(|v| v.copied()).collect();
    /// assert_eq!(values, vec![Some(1.0), Some(2.0), Some(0.0), Some(3.0)]);
    /// ```
    pub fn get_range(&self, range: impl RangeBounds<f64>) -> Result<Vec<Option<&V>>, Error> {
        let last = self.marker_count() - 1;
        let idx1 = match range.start_bound() {
            Bound::Unbounded => 0,
            Bound::Included(&key) | Bound::Excluded(&key) => self.search_index(key),
        };
        let idx2 = match range.end_bound() {
            Bound::Unbounded => last,
            Bound::Included(&key) | Bound::Excluded(&key) => self.search_index(key),
        };
        let mut values = Vec::with_capacity(idx2.saturating_sub(idx1) + 1);
        for idx in idx1..=idx2 {
            let (upper, slot) = self.node_ref(self.select(idx), |n| (n.upper(), n.slot()));
            match slot {
                Some(value) => values.push(Some(value)),
                None if self.raise_missing => return Err(Error::KeyNotSet(upper)),
                None => values.push(None),
            }
        }
        Ok(values)
    }

    /// Return the single slice covering `key` as a `(start, end, value)`
    /// triple.
    ///
    /// Uses the same boundary resolution as [`get`](Self::get). On a map
    /// with no assignments this is `(-inf, +inf, None)`.
    ///
    /// # Example
    /// ```rust
    /// use slice_map::{Slice, SliceMap};
    ///
    /// let mut map = SliceMap::new();
    /// map.set(1.0..3.0, 'a').unwrap();
    /// let slice = map.slice_at(2.0);
    /// assert_eq!(slice, Slice { start: 1.0, end: 3.0, value: Some(&'a') });
    /// ```
    #[inline]
    #[must_use]
    pub fn slice_at(&self, key: f64) -> Slice<&V> {
        let idx = self.lookup_index(key);
        let start = if idx == 0 {
            f64::NEG_INFINITY
        } else {
            self.node_ref(self.select(idx - 1), Node::upper)
        };
        let (end, value) = self.node_ref(self.select(idx), |n| (n.upper(), n.slot()));
        Slice { start, end, value }
    }

    /// Export the full partition as ordered `(start, end, value)` triples.
    ///
    /// The first slice starts at `-inf`, the last ends at `+inf`, and
    /// consecutive slices share a bound; together they cover the whole
    /// line. This is the canonical interchange format for collaborators
    /// such as plotting front ends.
    ///
    /// # Example
    /// ```rust
    /// use slice_map::{Slice, SliceMap};
    ///
    /// let mut map = SliceMap::new();
    /// map.set(1.0..5.0, 'a').unwrap();
    /// map.set(5.0.., 'b').unwrap();
    /// let exported: Vec<_> = map.export().into_iter().map(Slice::cloned).collect();
    /// assert_eq!(
    ///     exported,
    ///     vec![
    ///         Slice { start: f64::NEG_INFINITY, end: 1.0, value: None },
    ///         Slice { start: 1.0, end: 5.0, value: Some('a') },
    ///         Slice { start: 5.0, end: f64::INFINITY, value: Some('b') },
    ///     ],
    /// );
    /// ```
    #[inline]
    #[must_use]
    pub fn export(&self) -> Vec<Slice<&V>> {
        self.iter().collect()
    }

    /// Get an iterator over the slices of the map, in ascending order.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> Iter<'_, V, Ix> {
        Iter::new(self)
    }

    /// Marker index governing `key`, honoring the inclusion mode and the
    /// `±inf` edge rules.
    fn lookup_index(&self, key: f64) -> usize {
        let last = self.marker_count() - 1;
        if key == f64::INFINITY {
            return last;
        }
        if key == f64::NEG_INFINITY {
            return 0;
        }
        self.search_index(key)
    }

    /// Mode-selected bisection, clamped onto the sentinel. The clamp only
    /// engages for `+inf` and NaN keys, which order at or past the sentinel
    /// under `total_cmp`.
    fn search_index(&self, key: f64) -> usize {
        let idx = match self.include {
            Include::Start => self.bisect_right(key),
            Include::End => self.bisect_left(key),
        };
        idx.min(self.marker_count() - 1)
    }
}

impl<V, Ix> SliceMap<V, Ix>
where
    V: Clone,
    Ix: IndexType,
{
    /// Assign `value` to the half-open slice described by `range`.
    ///
    /// Whatever the slice previously covered is overwritten: markers
    /// strictly inside it are discarded, the value that was effective just
    /// left of its start keeps governing up to the start, and everything at
    /// or after its stop is untouched. An unbounded side reaches the
    /// matching infinity. A range with `start >= stop` is a no-op, not an
    /// error.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRange`], before any mutation, when the range shape
    /// cannot be expressed as `[start, stop)` — an excluded start bound or
    /// an included end bound — or when a bound is NaN.
    ///
    /// # Example
    /// ```rust
    /// use slice_map::SliceMap;
    ///
    /// let mut map = SliceMap::new();
    /// map.set(-10.0..10.0, 0).unwrap();
    /// map.set(2.0..4.0, 1).unwrap();
    /// assert_eq!(map.get(1.0).unwrap(), Some(&0));
    /// assert_eq!(map.get(2.0).unwrap(), Some(&1));
    /// assert_eq!(map.get(4.0).unwrap(), Some(&0));
    /// assert!(map.set(1.0..=5.0, 9).is_err());
    /// ```
    pub fn set(&mut self, range: impl RangeBounds<f64>, value: V) -> Result<(), Error> {
        let start = match range.start_bound() {
            Bound::Unbounded => f64::NEG_INFINITY,
            Bound::Included(&key) => key,
            Bound::Excluded(_) => {
                return Err(Error::InvalidRange("start bound must be inclusive"))
            }
        };
        let stop = match range.end_bound() {
            Bound::Unbounded => f64::INFINITY,
            Bound::Excluded(&key) => key,
            Bound::Included(_) => return Err(Error::InvalidRange("end bound must be exclusive")),
        };
        if start.is_nan() || stop.is_nan() {
            return Err(Error::InvalidRange("bounds must not be NaN"));
        }
        debug!("assigning value between keys {start}:{stop}");
        if start.total_cmp(&stop) != Ordering::Less {
            debug!("empty slice");
            return Ok(());
        }

        let lo = self.bisect_left(start);
        let hi = self.bisect_right(stop);
        debug!("will remove {} markers", hi - lo);
        // The value effective just left of `start` must keep governing
        // there once the subsumed markers are gone. When the governing
        // marker survives (lo == hi) its slot has to be duplicated; when it
        // is removed, ownership moves over.
        let continuation = if lo == hi {
            self.node_ref(self.select(lo), |n| n.slot.clone())
        } else {
            let first = self.remove_at(lo);
            for _ in lo + 1..hi {
                let _ignore = self.remove_at(lo);
            }
            first
        };
        if start > f64::NEG_INFINITY {
            self.insert_marker(start, continuation);
        }
        self.insert_marker(stop, Some(value));
        Ok(())
    }
}

impl<V, Ix> SliceMap<V, Ix>
where
    Ix: IndexType,
{
    /// Create the shared nil leaf
    fn new_nil() -> Node<V, Ix> {
        Node {
            left: None,
            right: None,
            parent: None,
            color: Color::Black,
            upper: None,
            size: 0,
            slot: None,
        }
    }

    /// Create a new marker node
    fn new_marker(upper: f64, slot: Option<V>) -> Node<V, Ix> {
        Node {
            left: Some(Self::nil()),
            right: Some(Self::nil()),
            parent: Some(Self::nil()),
            color: Color::Red,
            upper: Some(upper),
            size: 1,
            slot,
        }
    }

    /// Get the nil leaf index
    fn nil() -> NodeIndex<Ix> {
        NodeIndex::new(0)
    }

    /// Total number of markers, sentinel included
    pub(crate) fn marker_count(&self) -> usize {
        self.node_ref(self.root, Node::size)
    }

    /// Insert a marker into the tree.
    ///
    /// # Panics
    ///
    /// Panics when the tree is at the maximum number of nodes for its index
    fn insert_marker(&mut self, upper: f64, slot: Option<V>) {
        let node_idx = NodeIndex::new(self.nodes.len());
        // check for max capacity, except if we use usize
        assert!(
            <Ix as IndexType>::max().index() == !0 || NodeIndex::end() != node_idx,
            "Reached maximum number of nodes"
        );
        self.nodes.push(Self::new_marker(upper, slot));
        self.insert_inner(node_idx);
    }

    /// Link a freshly pushed node into the tree. The splice discipline
    /// removes any marker with an equal bound first, so descending right on
    /// ties never creates a duplicate.
    fn insert_inner(&mut self, z: NodeIndex<Ix>) {
        let key = self.node_ref(z, Node::upper);
        let mut y = Self::nil();
        let mut x = self.root;
        while !self.node_ref(x, Node::is_nil) {
            y = x;
            if key.total_cmp(&self.node_ref(x, Node::upper)) == Ordering::Less {
                x = self.node_ref(x, Node::left);
            } else {
                x = self.node_ref(x, Node::right);
            }
        }
        self.node_mut(z, Node::set_parent(y));
        if self.node_ref(y, Node::is_nil) {
            self.root = z;
        } else {
            if key.total_cmp(&self.node_ref(y, Node::upper)) == Ordering::Less {
                self.node_mut(y, Node::set_left(z));
            } else {
                self.node_mut(y, Node::set_right(z));
            }
            self.update_size_bottom_up(y);
        }
        self.node_mut(z, Node::set_color(Color::Red));

        self.insert_fixup(z);
    }

    /// Remove the marker with the given in-order rank, returning its slot.
    fn remove_at(&mut self, rank: usize) -> Option<V> {
        let node_idx = self.select(rank);
        self.remove_inner(node_idx);
        // Swap the node with the last node stored in the vector and update indices
        let mut node = self.nodes.swap_remove(node_idx.index());
        let old = NodeIndex::<Ix>::new(self.nodes.len());
        self.update_idx(old, node_idx);
        node.take_slot()
    }

    /// Unlink a node from the tree.
    fn remove_inner(&mut self, z: NodeIndex<Ix>) {
        let mut y = z;
        let mut y_orig_color = self.node_ref(y, Node::color);
        let x;
        if self.left_ref(z, Node::is_nil) {
            x = self.node_ref(z, Node::right);
            self.transplant(z, x);
            self.update_size_bottom_up(self.node_ref(z, Node::parent));
        } else if self.right_ref(z, Node::is_nil) {
            x = self.node_ref(z, Node::left);
            self.transplant(z, x);
            self.update_size_bottom_up(self.node_ref(z, Node::parent));
        } else {
            y = self.tree_minimum(self.node_ref(z, Node::right));
            let mut p = y;
            y_orig_color = self.node_ref(y, Node::color);
            x = self.node_ref(y, Node::right);
            if self.node_ref(y, Node::parent) == z {
                self.node_mut(x, Node::set_parent(y));
            } else {
                self.transplant(y, x);
                p = self.node_ref(y, Node::parent);
                self.node_mut(y, Node::set_right(self.node_ref(z, Node::right)));
                self.right_mut(y, Node::set_parent(y));
            }
            self.transplant(z, y);
            self.node_mut(y, Node::set_left(self.node_ref(z, Node::left)));
            self.left_mut(y, Node::set_parent(y));
            self.node_mut(y, Node::set_color(self.node_ref(z, Node::color)));

            self.update_size_bottom_up(p);
        }

        if matches!(y_orig_color, Color::Black) {
            self.remove_fixup(x);
        }
    }

    /// Marker with the given in-order rank. Callers keep `rank` below
    /// `marker_count`.
    pub(crate) fn select(&self, rank: usize) -> NodeIndex<Ix> {
        debug_assert!(rank < self.marker_count());
        let mut remaining = rank;
        let mut x = self.root;
        loop {
            let left_size = self.left_ref(x, Node::size);
            match remaining.cmp(&left_size) {
                Ordering::Less => x = self.node_ref(x, Node::left),
                Ordering::Equal => return x,
                Ordering::Greater => {
                    remaining -= left_size + 1;
                    x = self.node_ref(x, Node::right);
                }
            }
        }
    }

    /// Rank of the first marker whose bound is `>= key`.
    pub(crate) fn bisect_left(&self, key: f64) -> usize {
        let mut rank = 0;
        let mut x = self.root;
        while !self.node_ref(x, Node::is_nil) {
            if self.node_ref(x, Node::upper).total_cmp(&key) == Ordering::Less {
                rank += self.left_ref(x, Node::size) + 1;
                x = self.node_ref(x, Node::right);
            } else {
                x = self.node_ref(x, Node::left);
            }
        }
        rank
    }

    /// Rank of the first marker whose bound is `> key`.
    pub(crate) fn bisect_right(&self, key: f64) -> usize {
        let mut rank = 0;
        let mut x = self.root;
        while !self.node_ref(x, Node::is_nil) {
            if self.node_ref(x, Node::upper).total_cmp(&key) == Ordering::Greater {
                x = self.node_ref(x, Node::left);
            } else {
                rank += self.left_ref(x, Node::size) + 1;
                x = self.node_ref(x, Node::right);
            }
        }
        rank
    }

    /// Restore red-black tree properties after an insert.
    fn insert_fixup(&mut self, mut z: NodeIndex<Ix>) {
        while self.parent_ref(z, Node::is_red) {
            if self.grand_parent_ref(z, Node::is_nil) {
                break;
            }
            if self.is_left_child(self.node_ref(z, Node::parent)) {
                let y = self.grand_parent_ref(z, Node::right);
                if self.node_ref(y, Node::is_red) {
                    self.parent_mut(z, Node::set_color(Color::Black));
                    self.node_mut(y, Node::set_color(Color::Black));
                    self.grand_parent_mut(z, Node::set_color(Color::Red));
                    z = self.parent_ref(z, Node::parent);
                } else {
                    if self.is_right_child(z) {
                        z = self.node_ref(z, Node::parent);
                        self.left_rotate(z);
                    }
                    self.parent_mut(z, Node::set_color(Color::Black));
                    self.grand_parent_mut(z, Node::set_color(Color::Red));
                    self.right_rotate(self.parent_ref(z, Node::parent));
                }
            } else {
                let y = self.grand_parent_ref(z, Node::left);
                if self.node_ref(y, Node::is_red) {
                    self.parent_mut(z, Node::set_color(Color::Black));
                    self.node_mut(y, Node::set_color(Color::Black));
                    self.grand_parent_mut(z, Node::set_color(Color::Red));
                    z = self.parent_ref(z, Node::parent);
                } else {
                    if self.is_left_child(z) {
                        z = self.node_ref(z, Node::parent);
                        self.right_rotate(z);
                    }
                    self.parent_mut(z, Node::set_color(Color::Black));
                    self.grand_parent_mut(z, Node::set_color(Color::Red));
                    self.left_rotate(self.parent_ref(z, Node::parent));
                }
            }
        }
        self.node_mut(self.root, Node::set_color(Color::Black));
    }

    /// Restore red-black tree properties after a remove.
    fn remove_fixup(&mut self, mut x: NodeIndex<Ix>) {
        while x != self.root && self.node_ref(x, Node::is_black) {
            let mut w;
            if self.is_left_child(x) {
                w = self.parent_ref(x, Node::right);
                if self.node_ref(w, Node::is_red) {
                    self.node_mut(w, Node::set_color(Color::Black));
                    self.parent_mut(x, Node::set_color(Color::Red));
                    self.left_rotate(self.node_ref(x, Node::parent));
                    w = self.parent_ref(x, Node::right);
                }
                if self.node_ref(w, Node::is_nil) {
                    break;
                }
                if self.left_ref(w, Node::is_black) && self.right_ref(w, Node::is_black) {
                    self.node_mut(w, Node::set_color(Color::Red));
                    x = self.node_ref(x, Node::parent);
                } else {
                    if self.right_ref(w, Node::is_black) {
                        self.left_mut(w, Node::set_color(Color::Black));
                        self.node_mut(w, Node::set_color(Color::Red));
                        self.right_rotate(w);
                        w = self.parent_ref(x, Node::right);
                    }
                    self.node_mut(w, Node::set_color(self.parent_ref(x, Node::color)));
                    self.parent_mut(x, Node::set_color(Color::Black));
                    self.right_mut(w, Node::set_color(Color::Black));
                    self.left_rotate(self.node_ref(x, Node::parent));
                    x = self.root;
                }
            } else {
                w = self.parent_ref(x, Node::left);
                if self.node_ref(w, Node::is_red) {
                    self.node_mut(w, Node::set_color(Color::Black));
                    self.parent_mut(x, Node::set_color(Color::Red));
                    self.right_rotate(self.node_ref(x, Node::parent));
                    w = self.parent_ref(x, Node::left);
                }
                if self.node_ref(w, Node::is_nil) {
                    break;
                }
                if self.right_ref(w, Node::is_black) && self.left_ref(w, Node::is_black) {
                    self.node_mut(w, Node::set_color(Color::Red));
                    x = self.node_ref(x, Node::parent);
                } else {
                    if self.left_ref(w, Node::is_black) {
                        self.right_mut(w, Node::set_color(Color::Black));
                        self.node_mut(w, Node::set_color(Color::Red));
                        self.left_rotate(w);
                        w = self.parent_ref(x, Node::left);
                    }
                    self.node_mut(w, Node::set_color(self.parent_ref(x, Node::color)));
                    self.parent_mut(x, Node::set_color(Color::Black));
                    self.left_mut(w, Node::set_color(Color::Black));
                    self.right_rotate(self.node_ref(x, Node::parent));
                    x = self.root;
                }
            }
        }
        self.node_mut(x, Node::set_color(Color::Black));
    }

    /// Binary tree left rotate.
    fn left_rotate(&mut self, x: NodeIndex<Ix>) {
        if self.right_ref(x, Node::is_nil) {
            return;
        }
        let y = self.node_ref(x, Node::right);
        self.node_mut(x, Node::set_right(self.node_ref(y, Node::left)));
        if !self.left_ref(y, Node::is_nil) {
            self.left_mut(y, Node::set_parent(x));
        }

        self.replace_parent(x, y);
        self.node_mut(y, Node::set_left(x));

        self.rotate_update_size(x, y);
    }

    /// Binary tree right rotate.
    fn right_rotate(&mut self, x: NodeIndex<Ix>) {
        if self.left_ref(x, Node::is_nil) {
            return;
        }
        let y = self.node_ref(x, Node::left);
        self.node_mut(x, Node::set_left(self.node_ref(y, Node::right)));
        if !self.right_ref(y, Node::is_nil) {
            self.right_mut(y, Node::set_parent(x));
        }

        self.replace_parent(x, y);
        self.node_mut(y, Node::set_right(x));

        self.rotate_update_size(x, y);
    }

    /// Replace parent during a rotation.
    fn replace_parent(&mut self, x: NodeIndex<Ix>, y: NodeIndex<Ix>) {
        self.node_mut(y, Node::set_parent(self.node_ref(x, Node::parent)));
        if self.parent_ref(x, Node::is_nil) {
            self.root = y;
        } else if self.is_left_child(x) {
            self.parent_mut(x, Node::set_left(y));
        } else {
            self.parent_mut(x, Node::set_right(y));
        }
        self.node_mut(x, Node::set_parent(y));
    }

    /// Update subtree sizes after a rotation: the node that moved up takes
    /// over the subtree total, the one that moved down is recounted.
    fn rotate_update_size(&mut self, x: NodeIndex<Ix>, y: NodeIndex<Ix>) {
        self.node_mut(y, Node::set_size(self.node_ref(x, Node::size)));
        self.recalculate_size(x);
    }

    /// Update subtree sizes towards the root
    fn update_size_bottom_up(&mut self, x: NodeIndex<Ix>) {
        let mut p = x;
        while !self.node_ref(p, Node::is_nil) {
            self.recalculate_size(p);
            p = self.node_ref(p, Node::parent);
        }
    }

    /// Recount a subtree from its left and right children
    fn recalculate_size(&mut self, x: NodeIndex<Ix>) {
        let size = 1 + self.left_ref(x, Node::size) + self.right_ref(x, Node::size);
        self.node_mut(x, Node::set_size(size));
    }

    /// Find the node with the minimum bound in a subtree.
    fn tree_minimum(&self, mut x: NodeIndex<Ix>) -> NodeIndex<Ix> {
        while !self.left_ref(x, Node::is_nil) {
            x = self.node_ref(x, Node::left);
        }
        x
    }

    /// Replace one subtree as a child of its parent with another subtree.
    fn transplant(&mut self, u: NodeIndex<Ix>, v: NodeIndex<Ix>) {
        if self.parent_ref(u, Node::is_nil) {
            self.root = v;
        } else if self.is_left_child(u) {
            self.parent_mut(u, Node::set_left(v));
        } else {
            self.parent_mut(u, Node::set_right(v));
        }
        self.node_mut(v, Node::set_parent(self.node_ref(u, Node::parent)));
    }

    /// Check if a node is a left child of its parent.
    fn is_left_child(&self, node: NodeIndex<Ix>) -> bool {
        self.parent_ref(node, Node::left) == node
    }

    /// Check if a node is a right child of its parent.
    fn is_right_child(&self, node: NodeIndex<Ix>) -> bool {
        self.parent_ref(node, Node::right) == node
    }

    /// Update node indices after a `swap_remove`: whoever referenced the
    /// node moved down from index `old` must point at `new` again.
    fn update_idx(&mut self, old: NodeIndex<Ix>, new: NodeIndex<Ix>) {
        if self.root == old {
            self.root = new;
        }
        if self.nodes.get(new.index()).is_some() {
            if !self.parent_ref(new, Node::is_nil) {
                if self.parent_ref(new, Node::left) == old {
                    self.parent_mut(new, Node::set_left(new));
                } else {
                    self.parent_mut(new, Node::set_right(new));
                }
            }
            self.left_mut(new, Node::set_parent(new));
            self.right_mut(new, Node::set_parent(new));
        }
    }
}

// Convenient methods for reference or mutate current/parent/left/right node
impl<'a, V, Ix> SliceMap<V, Ix>
where
    Ix: IndexType,
{
    pub(crate) fn node_ref<F, R>(&'a self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a Node<V, Ix>) -> R,
    {
        op(&self.nodes[node.index()])
    }

    pub(crate) fn node_mut<F, R>(&'a mut self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a mut Node<V, Ix>) -> R,
    {
        op(&mut self.nodes[node.index()])
    }

    pub(crate) fn left_ref<F, R>(&'a self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a Node<V, Ix>) -> R,
    {
        let idx = self.nodes[node.index()].left().index();
        op(&self.nodes[idx])
    }

    pub(crate) fn right_ref<F, R>(&'a self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a Node<V, Ix>) -> R,
    {
        let idx = self.nodes[node.index()].right().index();
        op(&self.nodes[idx])
    }

    fn parent_ref<F, R>(&'a self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a Node<V, Ix>) -> R,
    {
        let idx = self.nodes[node.index()].parent().index();
        op(&self.nodes[idx])
    }

    fn grand_parent_ref<F, R>(&'a self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a Node<V, Ix>) -> R,
    {
        let parent_idx = self.nodes[node.index()].parent().index();
        let grand_parent_idx = self.nodes[parent_idx].parent().index();
        op(&self.nodes[grand_parent_idx])
    }

    fn left_mut<F, R>(&'a mut self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a mut Node<V, Ix>) -> R,
    {
        let idx = self.nodes[node.index()].left().index();
        op(&mut self.nodes[idx])
    }

    fn right_mut<F, R>(&'a mut self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a mut Node<V, Ix>) -> R,
    {
        let idx = self.nodes[node.index()].right().index();
        op(&mut self.nodes[idx])
    }

    fn parent_mut<F, R>(&'a mut self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a mut Node<V, Ix>) -> R,
    {
        let idx = self.nodes[node.index()].parent().index();
        op(&mut self.nodes[idx])
    }

    fn grand_parent_mut<F, R>(&'a mut self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a mut Node<V, Ix>) -> R,
    {
        let parent_idx = self.nodes[node.index()].parent().index();
        let grand_parent_idx = self.nodes[parent_idx].parent().index();
        op(&mut self.nodes[grand_parent_idx])
    }
}

impl<V, Ix> fmt::Display for SliceMap<V, Ix>
where
    V: fmt::Display,
    Ix: IndexType,
{
    /// Renders the partition as `{bracket start,end bracket: value, ...}`.
    ///
    /// Brackets follow the inclusion mode (`[a,b)` for [`Include::Start`],
    /// `(a,b]` for [`Include::End`]); the final slice is rendered closed on
    /// both ends since it terminates at `+inf`. Unassigned slices render
    /// their value as `None`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = match self.include {
            Include::Start => ('[', ')'),
            Include::End => ('(', ']'),
        };
        let count = self.marker_count();
        write!(f, "{{")?;
        for (i, slice) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let (open, close) = if i + 1 == count { ('[', ']') } else { (open, close) };
            write!(f, "{open}{},{}{close}: ", slice.start, slice.end)?;
            match slice.value {
                Some(value) => write!(f, "{value}")?,
                None => write!(f, "None")?,
            }
        }
        write!(f, "}}")
    }
}

//! `slice_map` is a map from half-open numeric slices to values.
//!
//! Assigning a value to a slice `[start, stop)` overwrites whatever the
//! slice previously covered, splitting neighbors as needed, so the map
//! always holds a gap-free partition of the extended real line. Point and
//! range lookups, as well as assignments, run in O(log n) searches over a
//! red-black tree of boundary markers augmented with subtree sizes.
//!
//! To safely and efficiently handle insertion and deletion operations in
//! Rust, `slice_map` uses arrays to simulate pointers for managing the
//! parent-child references in the red-black tree. This approach also
//! ensures that the map has the `Send` and `Unpin` traits, allowing it to
//! be safely transferred between threads and to maintain a fixed memory
//! location during asynchronous operations. The structure itself performs
//! no internal locking; concurrent writers need external mutual exclusion.
//!
//! # Example
//!
//! ```rust
//! use slice_map::SliceMap;
//!
//! let mut map = SliceMap::new();
//! map.set(-10.0..10.0, 0).unwrap();
//! map.set(2.0..4.0, 1).unwrap();
//! assert_eq!(map.get(3.0).unwrap(), Some(&1));
//! assert_eq!(map.get(4.0).unwrap(), Some(&0));
//! assert_eq!(map.get(15.0).unwrap(), None);
//! ```

mod error;
mod index;
mod iter;
mod node;
mod slice;
mod slicemap;

#[cfg(test)]
mod tests;

pub use error::Error;
pub use index::{DefaultIx, IndexType};
pub use iter::{IntoIter, Iter};
pub use slice::{Include, Slice};
pub use slicemap::SliceMap;

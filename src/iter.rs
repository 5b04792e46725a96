use crate::index::{IndexType, NodeIndex};
use crate::node::Node;
use crate::slice::Slice;
use crate::slicemap::SliceMap;

/// Pushes a link of nodes on the left to stack.
fn left_link<V, Ix>(map_ref: &SliceMap<V, Ix>, mut x: NodeIndex<Ix>) -> Vec<NodeIndex<Ix>>
where
    Ix: IndexType,
{
    let mut nodes = vec![];
    while !map_ref.node_ref(x, Node::is_nil) {
        nodes.push(x);
        x = map_ref.node_ref(x, Node::left);
    }
    nodes
}

/// An iterator over the slices of a `SliceMap`, in ascending order.
///
/// Each marker visited closes one slice: the slice runs from the previous
/// marker's bound (or `-inf` for the first) up to the marker's own bound.
#[derive(Debug)]
pub struct Iter<'a, V, Ix> {
    /// Reference to the map
    map_ref: &'a SliceMap<V, Ix>,
    /// Stack for iteration
    stack: Vec<NodeIndex<Ix>>,
    /// Lower bound of the next slice
    lower: f64,
}

impl<'a, V, Ix> Iter<'a, V, Ix>
where
    Ix: IndexType,
{
    pub(crate) fn new(map_ref: &'a SliceMap<V, Ix>) -> Self {
        Iter {
            map_ref,
            stack: left_link(map_ref, map_ref.root),
            lower: f64::NEG_INFINITY,
        }
    }
}

impl<'a, V, Ix> Iterator for Iter<'a, V, Ix>
where
    Ix: IndexType,
{
    type Item = Slice<&'a V>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let x = self.stack.pop()?;
        self.stack.extend(left_link(
            self.map_ref,
            self.map_ref.node_ref(x, Node::right),
        ));
        let (end, value) = self.map_ref.node_ref(x, |xn| (xn.upper(), xn.slot()));
        let slice = Slice {
            start: self.lower,
            end,
            value,
        };
        self.lower = end;
        Some(slice)
    }
}

/// An owning iterator over the slices of a `SliceMap`.
#[derive(Debug)]
pub struct IntoIter<V, Ix> {
    slice_map: SliceMap<V, Ix>,
    /// Stack for iteration
    stack: Vec<NodeIndex<Ix>>,
    /// Lower bound of the next slice
    lower: f64,
}

impl<V, Ix> IntoIter<V, Ix>
where
    Ix: IndexType,
{
    pub(crate) fn new(slice_map: SliceMap<V, Ix>) -> Self {
        let mut temp = IntoIter {
            slice_map,
            stack: vec![],
            lower: f64::NEG_INFINITY,
        };
        temp.stack = left_link(&temp.slice_map, temp.slice_map.root);
        temp
    }
}

impl<V, Ix> Iterator for IntoIter<V, Ix>
where
    Ix: IndexType,
{
    type Item = Slice<V>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let x = self.stack.pop()?;
        self.stack.extend(left_link(
            &self.slice_map,
            self.slice_map.node_ref(x, Node::right),
        ));
        let end = self.slice_map.node_ref(x, Node::upper);
        let value = self.slice_map.node_mut(x, Node::take_slot);
        let slice = Slice {
            start: self.lower,
            end,
            value,
        };
        self.lower = end;
        Some(slice)
    }
}

impl<V, Ix> IntoIterator for SliceMap<V, Ix>
where
    Ix: IndexType,
{
    type Item = Slice<V>;
    type IntoIter = IntoIter<V, Ix>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

impl<'a, V, Ix> IntoIterator for &'a SliceMap<V, Ix>
where
    Ix: IndexType,
{
    type Item = Slice<&'a V>;
    type IntoIter = Iter<'a, V, Ix>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

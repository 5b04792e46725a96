use crate::index::{IndexType, NodeIndex};

/// Node of the marker tree: one boundary marker plus red-black bookkeeping.
///
/// The node at arena index 0 is the nil leaf shared by the whole tree. It is
/// the only node whose `upper` is `None`, and its `size` is 0.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Node<V, Ix> {
    /// Left children
    pub left: Option<NodeIndex<Ix>>,
    /// Right children
    pub right: Option<NodeIndex<Ix>>,
    /// Parent
    pub parent: Option<NodeIndex<Ix>>,
    /// Color of the node
    pub color: Color,

    /// Upper bound of the interval this marker terminates; `None` marks nil
    pub upper: Option<f64>,
    /// Number of markers in the subtree rooted here
    pub size: usize,
    /// Value effective on the interval ending at `upper`; `None` means the
    /// region was never assigned
    pub slot: Option<V>,
}

// Convenient getter/setter methods
impl<V, Ix> Node<V, Ix>
where
    Ix: IndexType,
{
    pub fn color(&self) -> Color {
        self.color
    }

    pub fn upper(&self) -> f64 {
        self.upper.unwrap()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn left(&self) -> NodeIndex<Ix> {
        self.left.unwrap()
    }

    pub fn right(&self) -> NodeIndex<Ix> {
        self.right.unwrap()
    }

    pub fn parent(&self) -> NodeIndex<Ix> {
        self.parent.unwrap()
    }

    pub fn is_nil(&self) -> bool {
        self.upper.is_none()
    }

    pub fn is_black(&self) -> bool {
        matches!(self.color, Color::Black)
    }

    pub fn is_red(&self) -> bool {
        matches!(self.color, Color::Red)
    }

    pub fn slot(&self) -> Option<&V> {
        self.slot.as_ref()
    }

    pub fn take_slot(&mut self) -> Option<V> {
        self.slot.take()
    }

    pub fn set_color(color: Color) -> impl FnOnce(&mut Node<V, Ix>) {
        move |node: &mut Node<V, Ix>| {
            node.color = color;
        }
    }

    pub fn set_size(size: usize) -> impl FnOnce(&mut Node<V, Ix>) {
        move |node: &mut Node<V, Ix>| {
            node.size = size;
        }
    }

    pub fn set_left(left: NodeIndex<Ix>) -> impl FnOnce(&mut Node<V, Ix>) {
        move |node: &mut Node<V, Ix>| {
            let _ignore = node.left.replace(left);
        }
    }

    pub fn set_right(right: NodeIndex<Ix>) -> impl FnOnce(&mut Node<V, Ix>) {
        move |node: &mut Node<V, Ix>| {
            let _ignore = node.right.replace(right);
        }
    }

    pub fn set_parent(parent: NodeIndex<Ix>) -> impl FnOnce(&mut Node<V, Ix>) {
        move |node: &mut Node<V, Ix>| {
            let _ignore = node.parent.replace(parent);
        }
    }
}

/// The color of the node
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy)]
pub enum Color {
    /// Red node
    Red,
    /// Black node
    Black,
}

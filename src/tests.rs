use std::ops::Bound;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::index::NodeIndex;
use crate::node::{Color, Node};

use super::*;

struct SliceGenerator {
    rng: StdRng,
    limit: i32,
}

impl SliceGenerator {
    fn new(seed: [u8; 32]) -> Self {
        const LIMIT: i32 = 100;
        Self {
            rng: SeedableRng::from_seed(seed),
            limit: LIMIT,
        }
    }

    fn next(&mut self) -> (f64, f64) {
        let start = self.rng.gen_range(0..self.limit - 1);
        let stop = self.rng.gen_range((start + 1)..self.limit);
        (f64::from(start), f64::from(stop))
    }
}

impl<V> SliceMap<V> {
    fn check_size(&self) {
        let _ignore = self.check_size_inner(self.root);
    }

    fn check_size_inner(&self, x: NodeIndex<u32>) -> usize {
        if self.node_ref(x, Node::is_nil) {
            return 0;
        }
        let l_size = self.check_size_inner(self.node_ref(x, Node::left));
        let r_size = self.check_size_inner(self.node_ref(x, Node::right));
        assert_eq!(self.node_ref(x, Node::size), l_size + r_size + 1);
        l_size + r_size + 1
    }

    /// 1. Every node is either red or black.
    /// 2. The root is black.
    /// 3. Every leaf (NIL) is black.
    /// 4. If a node is red, then both its children are black.
    /// 5. For each node, all simple paths from the node to descendant leaves contain the
    ///    same number of black nodes.
    fn check_rb_properties(&self) {
        assert!(matches!(
            self.node_ref(self.root, Node::color),
            Color::Black
        ));
        self.check_children_color(self.root);
        self.check_black_height(self.root);
    }

    fn check_children_color(&self, x: NodeIndex<u32>) {
        if self.node_ref(x, Node::is_nil) {
            return;
        }
        self.check_children_color(self.node_ref(x, Node::left));
        self.check_children_color(self.node_ref(x, Node::right));
        if self.node_ref(x, Node::is_red) {
            assert!(matches!(self.left_ref(x, Node::color), Color::Black));
            assert!(matches!(self.right_ref(x, Node::color), Color::Black));
        }
    }

    fn check_black_height(&self, x: NodeIndex<u32>) -> usize {
        if self.node_ref(x, Node::is_nil) {
            return 0;
        }
        let lefth = self.check_black_height(self.node_ref(x, Node::left));
        let righth = self.check_black_height(self.node_ref(x, Node::right));
        assert_eq!(lefth, righth);
        if self.node_ref(x, Node::is_black) {
            return lefth + 1;
        }
        lefth
    }

    /// The exported slices form a gap-free, strictly ascending partition of
    /// the extended line.
    fn check_partition(&self) {
        let slices = self.export();
        assert_eq!(slices.len(), self.len() + 1);
        assert_eq!(slices[0].start, f64::NEG_INFINITY);
        assert_eq!(slices[slices.len() - 1].end, f64::INFINITY);
        for pair in slices.windows(2) {
            assert!(pair[0].end.total_cmp(&pair[1].start).is_eq());
        }
        for slice in &slices {
            assert!(slice.start < slice.end);
        }
    }
}

fn with_map_and_generator<V>(test_fn: impl Fn(SliceMap<V>, SliceGenerator)) {
    let seeds = vec![[0; 32], [7; 32], [42; 32]];
    for seed in seeds {
        let gen = SliceGenerator::new(seed);
        let map = SliceMap::new();
        test_fn(map, gen);
    }
}

fn model_lookup(ops: &[(f64, f64, i32)], key: f64, include: Include) -> Option<i32> {
    ops.iter()
        .rev()
        .find(|&&(start, stop, _)| match include {
            Include::Start => start <= key && key < stop,
            Include::End => start < key && key <= stop,
        })
        .map(|&(_, _, value)| value)
}

#[test]
fn assigned_unit_slices_read_back() {
    let mut map = SliceMap::new();
    for i in 0..1000 {
        map.set(f64::from(i)..f64::from(i + 1), i).unwrap();
    }
    for i in 0..1000 {
        assert_eq!(map.get(f64::from(i)).unwrap(), Some(&i));
    }
}

#[test]
fn include_end_resolves_boundary_to_left_slice() {
    let mut map = SliceMap::with_options(Include::End, false);
    for i in (0..10).rev() {
        map.set(f64::from(i)..f64::from(i + 1), i).unwrap();
    }
    for i in 1..10 {
        assert_eq!(map.get(f64::from(i)).unwrap(), Some(&(i - 1)));
    }
}

#[test]
fn overlapping_assignments_split_existing_slices() {
    let mut map = SliceMap::new();
    map.set(-10.0..10.0, 0.0).unwrap();
    map.set(2.0..4.0, 1.0).unwrap();
    map.set(4.0..6.0, 2.0).unwrap();
    map.set(7.0..9.0, 3.0).unwrap();
    map.set(12.0..15.0, 1.5).unwrap();
    assert_eq!(map.get(2.0).unwrap(), Some(&1.0));
    assert_eq!(map.get(3.0).unwrap(), Some(&1.0));
    assert_eq!(map.get(4.0).unwrap(), Some(&2.0));
    assert_eq!(map.get(9.0).unwrap(), Some(&0.0));
    assert_eq!(map.get(15.0).unwrap(), None);
}

#[test]
fn later_assignment_wins_inside_earlier_one() {
    let mut map = SliceMap::new();
    map.set(1.0..5.0, 'a').unwrap();
    map.set(2.0..4.0, 'b').unwrap();
    assert_eq!(map.get(1.5).unwrap(), Some(&'a'));
    assert_eq!(map.get(2.5).unwrap(), Some(&'b'));
    assert_eq!(map.get(3.5).unwrap(), Some(&'b'));
    assert_eq!(map.get(4.5).unwrap(), Some(&'a'));
}

#[test]
fn boundary_key_follows_include_mode() {
    let mut starts = SliceMap::with_options(Include::Start, false);
    starts.set(2.0..3.0, 1).unwrap();
    starts.set(3.0..4.0, 2).unwrap();
    starts.set(4.0..5.0, 3).unwrap();
    assert_eq!(starts.get(3.0).unwrap(), Some(&2));
    assert_eq!(starts.get(4.0).unwrap(), Some(&3));

    let mut ends = SliceMap::with_options(Include::End, false);
    ends.set(2.0..3.0, 1).unwrap();
    ends.set(3.0..4.0, 2).unwrap();
    ends.set(4.0..5.0, 3).unwrap();
    assert_eq!(ends.get(3.0).unwrap(), Some(&1));
    assert_eq!(ends.get(4.0).unwrap(), Some(&2));
}

#[test]
fn adjacent_assignments_tie_break_on_shared_bound() {
    let mut starts = SliceMap::new();
    starts.set(2.0..4.0, 'x').unwrap();
    starts.set(4.0..6.0, 'y').unwrap();
    assert_eq!(starts.get(4.0).unwrap(), Some(&'y'));

    let mut ends = SliceMap::with_options(Include::End, false);
    ends.set(2.0..4.0, 'x').unwrap();
    ends.set(4.0..6.0, 'y').unwrap();
    assert_eq!(ends.get(4.0).unwrap(), Some(&'x'));
}

#[test]
fn range_query_covers_touched_slices() {
    let mut map = SliceMap::new();
    map.set(-10.0..10.0, 0.0).unwrap();
    map.set(2.0..4.0, 1.0).unwrap();
    map.set(4.0..6.0, 2.0).unwrap();
    map.set(7.0..9.0, 3.0).unwrap();
    map.set(12.0..15.0, 1.5).unwrap();

    let touched: Vec<_> = map
        .get_range(3.0..8.0)
        .unwrap()
        .into_iter()
        .map(|v| v.copied())
        .collect();
    assert_eq!(touched, vec![Some(1.0), Some(2.0), Some(0.0), Some(3.0)]);

    let all: Vec<_> = map
        .get_range(..)
        .unwrap()
        .into_iter()
        .map(|v| v.copied())
        .collect();
    assert_eq!(
        all,
        vec![
            None,
            Some(0.0),
            Some(1.0),
            Some(2.0),
            Some(0.0),
            Some(3.0),
            Some(0.0),
            None,
            Some(1.5),
            None,
        ],
    );

    assert!(map.get_range(8.0..3.0).unwrap().is_empty());
}

#[test]
fn merge_scenario_exports_exact_partition() {
    let mut inputs = [
        (1.0, 11, 5.0),
        (2.0, 6, 7.0),
        (3.0, 13, 9.0),
        (12.0, 7, 16.0),
        (14.0, 3, 25.0),
        (19.0, 18, 22.0),
        (23.0, 13, 29.0),
        (24.0, 4, 28.0),
    ];
    inputs.sort_by_key(|&(_, value, _)| value);

    let mut map = SliceMap::new();
    map.set(.., 0).unwrap();
    for (left, value, right) in inputs {
        map.set(left..right, value).unwrap();
    }

    let exported: Vec<_> = map
        .iter()
        .map(|s| (s.start, s.end, s.value.copied()))
        .collect();
    assert_eq!(
        exported,
        vec![
            (f64::NEG_INFINITY, 1.0, Some(0)),
            (1.0, 3.0, Some(11)),
            (3.0, 9.0, Some(13)),
            (9.0, 12.0, Some(0)),
            (12.0, 16.0, Some(7)),
            (16.0, 19.0, Some(3)),
            (19.0, 22.0, Some(18)),
            (22.0, 23.0, Some(3)),
            (23.0, 29.0, Some(13)),
            (29.0, f64::INFINITY, Some(0)),
        ],
    );
}

#[test]
fn empty_slice_assignment_is_a_no_op() {
    let mut map = SliceMap::new();
    map.set(1.0..5.0, 'a').unwrap();
    map.set(5.0..9.0, 'b').unwrap();
    let before: Vec<_> = map.iter().map(Slice::cloned).collect();
    let len_before = map.len();

    map.set(3.0..3.0, 'z').unwrap();
    map.set(8.0..2.0, 'z').unwrap();

    let after: Vec<_> = map.iter().map(Slice::cloned).collect();
    assert_eq!(before, after);
    assert_eq!(map.len(), len_before);
}

#[test]
fn repeated_assignment_is_idempotent() {
    let mut map = SliceMap::new();
    map.set(-3.0..8.0, 1).unwrap();
    map.set(2.0..4.0, 2).unwrap();
    let once: Vec<_> = map.iter().map(Slice::cloned).collect();

    map.set(2.0..4.0, 2).unwrap();
    let twice: Vec<_> = map.iter().map(Slice::cloned).collect();
    assert_eq!(once, twice);
    assert_eq!(map.len(), once.len() - 1);
}

#[test]
fn len_counts_markers_beyond_sentinel() {
    let mut map: SliceMap<char> = SliceMap::default();
    assert_eq!(map.len(), 0);
    assert!(map.is_empty());

    map.set(..5.0, 'a').unwrap();
    assert_eq!(map.len(), 1);

    map.set(10.0.., 'b').unwrap();
    assert_eq!(map.len(), 2);

    // An assignment swallowing both existing markers re-creates exactly two.
    map.set(3.0..12.0, 'c').unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.export().len(), map.len() + 1);

    map.set(.., 'd').unwrap();
    assert_eq!(map.len(), 0);
    assert_eq!(map.get(123.0).unwrap(), Some(&'d'));
}

#[test]
fn unbounded_assignments_reach_the_infinities() {
    let mut map = SliceMap::new();
    map.set(..0.0, 'n').unwrap();
    map.set(0.0.., 'p').unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(-1.0).unwrap(), Some(&'n'));
    assert_eq!(map.get(0.0).unwrap(), Some(&'p'));
    assert_eq!(map.get(f64::NEG_INFINITY).unwrap(), Some(&'n'));
    assert_eq!(map.get(f64::INFINITY).unwrap(), Some(&'p'));
}

#[test]
fn infinite_keys_read_edge_markers() {
    let mut map = SliceMap::new();
    assert_eq!(map.get(f64::INFINITY).unwrap(), None);
    assert_eq!(map.get(f64::NEG_INFINITY).unwrap(), None);

    map.set(.., 0).unwrap();
    assert_eq!(map.get(f64::INFINITY).unwrap(), Some(&0));
    assert_eq!(map.get(f64::NEG_INFINITY).unwrap(), Some(&0));
    // NaN orders past +inf in the total order and lands on the sentinel.
    assert_eq!(map.get(f64::NAN).unwrap(), Some(&0));

    map.set(5.0.., 1).unwrap();
    assert_eq!(map.get(f64::INFINITY).unwrap(), Some(&1));
    assert_eq!(map.get(f64::NEG_INFINITY).unwrap(), Some(&0));
}

#[test]
fn missing_point_lookups_raise_when_configured() {
    let mut map = SliceMap::with_options(Include::Start, true);
    assert_eq!(map.include(), Include::Start);
    assert!(map.raises_missing());
    map.set(2.0..3.0, 1).unwrap();
    map.set(3.0..4.0, 2).unwrap();
    map.set(4.0..5.0, 3).unwrap();
    map.set(8.0..9.0, 4).unwrap();

    assert_eq!(map.get(2.0), Ok(Some(&1)));
    assert_eq!(map.get(3.0), Ok(Some(&2)));
    assert_eq!(map.get(4.0), Ok(Some(&3)));
    assert_eq!(map.get(8.0), Ok(Some(&4)));

    for key in [f64::NEG_INFINITY, 0.0, 1.0, 5.0, 9.0, 100.0, f64::INFINITY] {
        assert_eq!(map.get(key), Err(Error::KeyNotSet(key)));
    }

    let mut map = SliceMap::with_options(Include::End, true);
    map.set(2.0..3.0, 1).unwrap();
    map.set(3.0..4.0, 2).unwrap();
    map.set(4.0..5.0, 3).unwrap();
    map.set(8.0..9.0, 4).unwrap();

    assert_eq!(map.get(3.0), Ok(Some(&1)));
    assert_eq!(map.get(4.0), Ok(Some(&2)));
    assert_eq!(map.get(5.0), Ok(Some(&3)));
    assert_eq!(map.get(9.0), Ok(Some(&4)));

    for key in [f64::NEG_INFINITY, 0.0, 1.0, 2.0, 8.0, 100.0, f64::INFINITY] {
        assert_eq!(map.get(key), Err(Error::KeyNotSet(key)));
    }
}

#[test]
fn missing_slices_in_range_raise_when_configured() {
    let mut map = SliceMap::with_options(Include::Start, true);
    map.set(2.0..3.0, 1).unwrap();
    map.set(3.0..4.0, 2).unwrap();
    map.set(4.0..5.0, 3).unwrap();
    map.set(8.0..9.0, 4).unwrap();

    let covered: Vec<_> = map
        .get_range(2.0..4.0)
        .unwrap()
        .into_iter()
        .map(|v| v.copied())
        .collect();
    assert_eq!(covered, vec![Some(1), Some(2), Some(3)]);

    let holes = [
        (f64::NEG_INFINITY, 0.0),
        (0.0, 1.0),
        (1.0, 5.0),
        (2.0, 5.0),
        (2.0, 8.0),
        (5.0, 9.0),
        (8.0, 9.0),
        (9.0, 100.0),
        (100.0, f64::INFINITY),
    ];
    for (start, stop) in holes {
        assert!(matches!(
            map.get_range(start..stop),
            Err(Error::KeyNotSet(_))
        ));
    }
}

#[test]
fn invalid_range_shapes_are_rejected_eagerly() {
    let mut map = SliceMap::new();
    assert!(matches!(
        map.set(1.0..=5.0, 1),
        Err(Error::InvalidRange(_))
    ));
    assert!(matches!(
        map.set((Bound::Excluded(1.0), Bound::Excluded(5.0)), 1),
        Err(Error::InvalidRange(_))
    ));
    assert!(matches!(
        map.set(f64::NAN..5.0, 1),
        Err(Error::InvalidRange(_))
    ));
    assert!(matches!(
        map.set(1.0..f64::NAN, 1),
        Err(Error::InvalidRange(_))
    ));
    assert_eq!(map.len(), 0);
    assert_eq!(map.get(2.0).unwrap(), None);
}

#[test]
fn clone_shares_no_state_with_the_original() {
    let mut map = SliceMap::new();
    map.set(1.0..3.0, String::from("a")).unwrap();
    map.set(3.0..5.0, String::from("b")).unwrap();

    let mut copy = map.clone();
    copy.set(0.0..10.0, String::from("z")).unwrap();
    assert_eq!(map.get(2.0).unwrap(), Some(&String::from("a")));
    assert_eq!(map.get(4.0).unwrap(), Some(&String::from("b")));
    assert_eq!(copy.get(2.0).unwrap(), Some(&String::from("z")));

    map.set(1.0..5.0, String::from("w")).unwrap();
    assert_eq!(copy.get(4.0).unwrap(), Some(&String::from("z")));
}

#[test]
fn slice_at_returns_the_covering_slice() {
    let map = SliceMap::<i32>::new();
    assert_eq!(
        map.slice_at(0.0),
        Slice {
            start: f64::NEG_INFINITY,
            end: f64::INFINITY,
            value: None,
        },
    );

    let mut map = SliceMap::new();
    map.set(1.0..3.0, 'a').unwrap();
    assert_eq!(
        map.slice_at(2.0),
        Slice {
            start: 1.0,
            end: 3.0,
            value: Some(&'a'),
        },
    );
    assert_eq!(
        map.slice_at(0.5),
        Slice {
            start: f64::NEG_INFINITY,
            end: 1.0,
            value: None,
        },
    );
    assert_eq!(
        map.slice_at(f64::INFINITY),
        Slice {
            start: 3.0,
            end: f64::INFINITY,
            value: None,
        },
    );

    let mut ends = SliceMap::with_options(Include::End, false);
    ends.set(1.0..3.0, 'a').unwrap();
    assert_eq!(
        ends.slice_at(3.0),
        Slice {
            start: 1.0,
            end: 3.0,
            value: Some(&'a'),
        },
    );
}

#[test]
fn textual_form_brackets_follow_include_mode() {
    let empty = SliceMap::<i32>::new();
    assert_eq!(empty.to_string(), "{[-inf,inf]: None}");

    let mut starts = SliceMap::new();
    starts.set(1.0..5.0, "A").unwrap();
    starts.set(5.0..10.0, "B").unwrap();
    assert_eq!(
        starts.to_string(),
        "{[-inf,1): None, [1,5): A, [5,10): B, [10,inf]: None}",
    );

    let mut ends = SliceMap::with_options(Include::End, false);
    ends.set(1.0..5.0, "A").unwrap();
    ends.set(5.0..10.0, "B").unwrap();
    assert_eq!(
        ends.to_string(),
        "{(-inf,1]: None, (1,5]: A, (5,10]: B, [10,inf]: None}",
    );
}

#[test]
fn owning_iteration_yields_the_full_partition() {
    let mut map = SliceMap::with_capacity(4);
    map.set(1.0..5.0, 'a').unwrap();
    map.set(5.0.., 'b').unwrap();

    let borrowed: Vec<_> = (&map).into_iter().map(Slice::cloned).collect();
    let owned: Vec<_> = map.into_iter().collect();
    assert_eq!(borrowed, owned);
    assert_eq!(
        owned,
        vec![
            Slice {
                start: f64::NEG_INFINITY,
                end: 1.0,
                value: None,
            },
            Slice {
                start: 1.0,
                end: 5.0,
                value: Some('a'),
            },
            Slice {
                start: 5.0,
                end: f64::INFINITY,
                value: Some('b'),
            },
        ],
    );
}

#[test]
fn tree_invariants_hold_under_random_workloads() {
    with_map_and_generator(|mut map: SliceMap<i32>, mut gen| {
        for value in 0..200 {
            let (start, stop) = gen.next();
            map.set(start..stop, value).unwrap();
            map.check_rb_properties();
            map.check_size();
        }
        map.check_partition();
    });
}

#[test]
fn random_lookups_match_naive_model() {
    for include in [Include::Start, Include::End] {
        let mut gen = SliceGenerator::new([3; 32]);
        let mut map = SliceMap::with_options(include, false);
        let mut ops = Vec::new();
        for value in 0..200 {
            let (start, stop) = gen.next();
            map.set(start..stop, value).unwrap();
            ops.push((start, stop, value));
        }
        for step in 0..(2 * gen.limit) {
            let key = f64::from(step) / 2.0;
            let expected = model_lookup(&ops, key, include);
            assert_eq!(map.get(key).unwrap().copied(), expected, "key {key}");
        }
    }
}

#[cfg(feature = "serde")]
#[test]
fn serde_round_trip_preserves_partition() {
    let mut map = SliceMap::new();
    map.set(1.0..5.0, 10).unwrap();
    map.set(3.0..7.0, 20).unwrap();
    map.set(2.0..6.0, 15).unwrap();

    let serialized = serde_json::to_string(&map).unwrap();
    let deserialized: SliceMap<i32> = serde_json::from_str(&serialized).unwrap();

    let ev: Vec<_> = map.iter().map(Slice::cloned).collect();
    let dv: Vec<_> = deserialized.iter().map(Slice::cloned).collect();
    assert_eq!(ev, dv);
    assert_eq!(map.len(), deserialized.len());
    assert_eq!(deserialized.get(4.0).unwrap(), Some(&15));
}

use crate::prelude::*;

pub mod prelude {
    pub use super::{
        Interval,
        IntervalLookupTable,
    };
}

/// Closed numeric interval `[lo, hi]`, inclusive on both ends.
///
/// The constructor swaps a reversed pair, so an `Interval` is ordered by
/// construction.
#[derive(Clone, Copy)]
#[derive(Debug)]
#[derive(PartialEq, Eq, Hash)]
pub struct Interval<T> {
    lo: T,
    hi: T,
}

impl<T: Copy + Ord> Interval<T> {
    pub fn new(a: T, b: T) -> Self {
        if a > b {
            Self { lo: b, hi: a }
        } else {
            Self { lo: a, hi: b }
        }
    }

    pub fn from(&self) -> T {
        self.lo
    }

    pub fn until(&self) -> T {
        self.hi
    }

    pub fn set_min(&mut self, a: T) {
        self.lo = a;
    }

    pub fn set_max(&mut self, b: T) {
        self.hi = b;
    }

    pub fn contains(&self, point: T) -> bool {
        self.lo <= point && point <= self.hi
    }

    pub fn contains_interval(&self, other: &Interval<T>) -> bool {
        self.lo <= other.lo && other.hi <= self.hi
    }

    pub fn disjoint(&self, other: &Interval<T>) -> bool {
        other.hi < self.lo || self.hi < other.lo
    }

    pub fn intersects(&self, other: &Interval<T>) -> bool {
        !self.disjoint(other)
    }

    /// Convex hull of `self` and `other`, in place.
    pub fn widen(&mut self, other: &Interval<T>) {
        self.lo = T::min(self.lo, other.lo);
        self.hi = T::max(self.hi, other.hi);
    }

    pub fn merged(&self, other: &Interval<T>) -> Interval<T> {
        Interval {
            lo: T::min(self.lo, other.lo),
            hi: T::max(self.hi, other.hi),
        }
    }
}

impl<T: Copy + Ord + std::ops::Sub<Output = T>> Interval<T> {
    pub fn length(&self) -> T {
        self.hi - self.lo
    }
}

impl<T: Copy + Ord + std::ops::Add<Output = T>> std::ops::Add for Interval<T> {
    type Output = Interval<T>;

    fn add(self, rhs: Interval<T>) -> Self::Output {
        Interval { lo: self.lo + rhs.lo, hi: self.hi + rhs.hi }
    }
}

impl<T: Copy + Ord + std::ops::Add<Output = T>> std::ops::Add<T> for Interval<T> {
    type Output = Interval<T>;

    fn add(self, rhs: T) -> Self::Output {
        Interval { lo: self.lo + rhs, hi: self.hi + rhs }
    }
}

impl<T: std::fmt::Display> std::fmt::Display for Interval<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "I[{}, {}]", self.lo, self.hi)
    }
}

impl<T: serde::Serialize> serde::Serialize for Interval<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer {
        (&self.lo, &self.hi).serialize(serializer)
    }
}

impl<'de, T: serde::Deserialize<'de> + Copy + Ord> serde::Deserialize<'de> for Interval<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de> {
        let (a, b) = <(T, T)>::deserialize(deserializer)?;
        Ok(Interval::new(a, b))
    }
}

/// Bucketed index over job indices, keyed by the time range each entry spans.
///
/// Buckets are filled once at workload load and never change afterwards;
/// `lookup` clamps out-of-range points to the first or last bucket.
pub struct IntervalLookupTable {
    buckets: Vec<Vec<usize>>,
    range: Interval<Time>,
    width: Time,
}

impl IntervalLookupTable {
    pub fn new(range: Interval<Time>, bucket_width: Time) -> Self {
        let width = Time::max(bucket_width, Time::EPSILON);
        let num_buckets = 1 + usize::max((range.length() / width) as usize, 1);

        Self {
            buckets: vec![Vec::new(); num_buckets],
            range,
            width,
        }
    }

    pub fn bucket_of(&self, point: Time) -> usize {
        if self.range.contains(point) {
            ((point - self.range.from()) / self.width) as usize
        } else if point < self.range.from() {
            0
        } else {
            self.buckets.len() - 1
        }
    }

    pub fn insert(&mut self, index: usize, window: Interval<Time>) {
        let first = self.bucket_of(window.from());
        let last = self.bucket_of(window.until());
        for bucket in first..=last {
            self.buckets[bucket].push(index);
        }
    }

    pub fn lookup(&self, point: Time) -> &[usize] {
        &self.buckets[self.bucket_of(point)]
    }

    pub fn bucket(&self, index: usize) -> &[usize] {
        &self.buckets[index]
    }
}

// =============================================================================

#[test]
fn interval_construction_orders_endpoints() {
    let interval = Interval::new(7, 3);
    assert_eq!(interval.from(), 3);
    assert_eq!(interval.until(), 7);
}

#[test]
fn interval_containment_is_inclusive() {
    let interval = Interval::new(2, 5);
    assert!(interval.contains(2));
    assert!(interval.contains(5));
    assert!(!interval.contains(6));
    assert!(interval.contains_interval(&Interval::new(3, 5)));
    assert!(!interval.contains_interval(&Interval::new(3, 6)));
}

#[test]
fn interval_disjointness() {
    let a = Interval::new(0, 3);
    let b = Interval::new(4, 6);
    assert!(a.disjoint(&b));
    assert!(!a.disjoint(&Interval::new(3, 6)));
    assert!(a.intersects(&Interval::new(3, 6)));
}

#[test]
fn interval_widen_is_convex_hull() {
    let mut a = Interval::new(2, 4);
    a.widen(&Interval::new(6, 8));
    assert_eq!(a, Interval::new(2, 8));

    let merged = Interval::new(0, 1).merged(&Interval::new(5, 9));
    assert_eq!(merged, Interval::new(0, 9));
}

#[test]
fn interval_arithmetic() {
    let a = Interval::new(1, 2);
    let b = Interval::new(10, 20);
    assert_eq!(a + b, Interval::new(11, 22));
    assert_eq!(a + 5, Interval::new(6, 7));
}

#[test]
fn interval_serde_two_element_array() {
    let interval: Interval<Time> = serde_json::from_str("[3, 5]").unwrap();
    assert_eq!(interval, Interval::new(Time::ticks(3), Time::ticks(5)));
    assert_eq!(serde_json::to_string(&interval).unwrap(), "[3,5]");
}

#[test]
fn lookup_table_buckets_by_window() {
    let range = Interval::new(Time::zero(), Time::ticks(100));
    let mut table = IntervalLookupTable::new(range, Time::ticks(10));

    table.insert(0, Interval::new(Time::ticks(0), Time::ticks(9)));
    table.insert(1, Interval::new(Time::ticks(5), Time::ticks(25)));

    assert_eq!(table.lookup(Time::ticks(0)), &[0, 1]);
    assert_eq!(table.lookup(Time::ticks(25)), &[1]);
    assert_eq!(table.lookup(Time::ticks(60)), &[] as &[usize]);
}

#[test]
fn lookup_table_clamps_out_of_range_points() {
    let range = Interval::new(Time::zero(), Time::ticks(10));
    let mut table = IntervalLookupTable::new(range, Time::ticks(5));
    table.insert(3, Interval::new(Time::ticks(8), Time::ticks(10)));

    assert_eq!(table.bucket_of(Time::ticks(-5)), 0);
    assert_eq!(table.lookup(Time::ticks(50)), &[3]);
}

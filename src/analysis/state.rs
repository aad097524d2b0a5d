use crate::prelude::*;
use std::collections::HashMap;

pub mod prelude {
    pub use super::State;
}

const INITIAL_MERGE_KEY: u64 = 0x9a9a_9a9a_9a9a_9a9a;

/// Symbolic node of the reachability graph: one scheduling snapshot covering
/// every concrete schedule that agrees on the dispatched set and stays
/// inside the tracked intervals.
///
/// Invariants:
/// - within each processor group the availability vector is non-decreasing
///   in both interval endpoints independently,
/// - the pending-event list is strictly increasing and every entry lies
///   after the timestamp,
/// - the merge key is the XOR fold of the dispatched jobs' digests.
#[derive(Clone)]
#[derive(Debug)]
pub struct State {
    id: u64,
    timestamp: Time,
    dispatched: IndexSet,
    finish_times: HashMap<JobId, Interval<Time>>,
    core_availability: Vec<Vec<Interval<Time>>>,
    events: Vec<Time>,
    merge_key: u64,
    completion_events: bool,
}

impl State {
    /// Initial state: nothing dispatched, every core free from time zero.
    pub fn initial(id: u64, resource_set: &[u32], events: Vec<Time>, completion_events: bool) -> Self {
        assert!(!resource_set.is_empty(), "the platform must have at least one processor group");

        let core_availability = resource_set
            .iter()
            .map(|cores| vec![Interval::new(Time::zero(), Time::zero()); *cores as usize])
            .collect();

        Self {
            id,
            timestamp: Time::zero(),
            dispatched: IndexSet::new(),
            finish_times: HashMap::new(),
            core_availability,
            events,
            merge_key: INITIAL_MERGE_KEY,
            completion_events,
        }
    }

    /// Dispatch successor: `job` starts now on one core of `group` and
    /// completes somewhere in `finish_time`.
    ///
    /// The group's earliest availability slot is the one consumed; the
    /// remaining slots and the new finish interval are re-sorted by both
    /// endpoints independently and re-paired, which keeps the availability
    /// invariant without tracking which anonymous core was taken.
    pub fn dispatch(
        from: &State,
        id: u64,
        job: &Job,
        job_index: usize,
        group: usize,
        finish_time: Interval<Time>,
    ) -> Self {
        assert!(
            !from.dispatched.contains(job_index),
            "job {} is already dispatched in state {}",
            job.id(),
            from.id
        );

        let mut next = Self {
            id,
            timestamp: from.timestamp,
            dispatched: from.dispatched.clone_with(job_index),
            finish_times: from.finish_times.clone(),
            core_availability: from.core_availability.clone(),
            events: from.events.clone(),
            merge_key: from.merge_key ^ job.stable_digest(),
            completion_events: from.completion_events,
        };

        next.finish_times.insert(job.id(), finish_time);
        if next.completion_events {
            next.add_event(finish_time.from());
            next.add_event(finish_time.until());
        }

        let slots = &from.core_availability[group];
        let mut lows = Vec::with_capacity(slots.len());
        let mut highs = Vec::with_capacity(slots.len());
        lows.push(finish_time.from());
        highs.push(finish_time.until());
        for slot in &slots[1..] {
            lows.push(slot.from());
            highs.push(slot.until());
        }
        lows.sort_unstable();
        highs.sort_unstable();

        for (slot, (lo, hi)) in next.core_availability[group]
            .iter_mut()
            .zip(lows.into_iter().zip(highs))
        {
            *slot = Interval::new(lo, hi);
        }

        next
    }

    /// Time-advance successor: same configuration observed at a later
    /// instant; events at or before the new timestamp are consumed.
    pub fn advance(from: &State, id: u64, new_time: Time) -> Self {
        let mut next = from.clone();
        next.id = id;
        next.advance_to(new_time);
        next
    }

    /// Advance this state in place. Used on scratch copies while peeking
    /// ahead, so no fresh state id is spent.
    pub fn advance_to(&mut self, new_time: Time) {
        assert!(
            new_time > self.timestamp,
            "time must advance strictly, from {} to {}",
            self.timestamp,
            new_time
        );
        self.timestamp = new_time;
        self.events.retain(|event| *event > new_time);
    }

    /// Insert a pending event, keeping the list sorted and duplicate-free.
    pub fn add_event(&mut self, time: Time) {
        if let Err(position) = self.events.binary_search(&time) {
            self.events.insert(position, time);
        }
    }

    pub fn next_event_time(&self) -> Option<Time> {
        self.events.first().copied()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn timestamp(&self) -> Time {
        self.timestamp
    }

    pub fn merge_key(&self) -> u64 {
        self.merge_key
    }

    pub fn num_dispatched(&self) -> usize {
        self.dispatched.len()
    }

    pub fn is_dispatched(&self, job_index: usize) -> bool {
        self.dispatched.contains(job_index)
    }

    pub fn dispatched(&self) -> &IndexSet {
        &self.dispatched
    }

    pub fn finish_times(&self) -> &HashMap<JobId, Interval<Time>> {
        &self.finish_times
    }

    /// Availability of the `nth` earliest-free core of a group.
    pub fn core_availability(&self, group: usize, nth: usize) -> Interval<Time> {
        self.core_availability[group][nth]
    }

    pub fn events(&self) -> &[Time] {
        &self.events
    }

    pub fn same_timestamp(&self, other: &State) -> bool {
        self.timestamp == other.timestamp
    }

    pub fn same_jobs_dispatched(&self, other: &State) -> bool {
        self.dispatched == other.dispatched
    }

    pub fn can_merge_with(&self, other: &State) -> bool {
        assert_eq!(
            self.core_availability.len(),
            other.core_availability.len(),
            "states of one analysis share the platform"
        );

        self.merge_key == other.merge_key
            && self.same_timestamp(other)
            && self.same_jobs_dispatched(other)
    }

    /// Merge `other` into this state if they are merge candidates. The
    /// result covers both: every finish-time and availability interval is
    /// widened to the convex hull, event sets are unioned.
    pub fn try_merge(&mut self, other: &State) -> bool {
        if !self.can_merge_with(other) {
            return false;
        }

        for (id, interval) in &mut self.finish_times {
            let theirs = other
                .finish_times
                .get(id)
                .expect("merge candidates have dispatched the same jobs");
            interval.widen(theirs);
        }

        for (mine, theirs) in self.core_availability.iter_mut().zip(&other.core_availability) {
            for (slot, other_slot) in mine.iter_mut().zip(theirs) {
                slot.widen(other_slot);
            }
        }

        for event in &other.events {
            self.add_event(*event);
        }

        true
    }

    /// Multi-line node label for the DOT rendering.
    pub fn dot_label(&self, jobs: &JobSet) -> String {
        use std::fmt::Write as _;

        let mut label = String::new();
        let _ = write!(label, "State {}: \\n", self.id);
        let _ = write!(label, "TS: {}, \\n", self.timestamp);
        let _ = write!(label, "S^D: [");
        for index in self.dispatched.iter() {
            let _ = write!(label, "{}, ", jobs.get(index).id());
        }
        let _ = write!(label, "], \\n");
        let _ = write!(label, "A: [");
        for group in &self.core_availability {
            let _ = write!(label, "{{");
            for slot in group {
                let _ = write!(label, "{slot}, ");
            }
            let _ = write!(label, "}}, ");
        }
        let _ = write!(label, "]");
        label
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "State {}: {{TS: {}, S^D: {}, S^F: [", self.id, self.timestamp, self.dispatched)?;

        let mut finish_times: Vec<_> = self.finish_times.iter().collect();
        finish_times.sort_by_key(|(id, _)| **id);
        for (id, interval) in finish_times {
            write!(f, "({id}, {interval}), ")?;
        }

        write!(f, "], A: [")?;
        for group in &self.core_availability {
            write!(f, "{{")?;
            for slot in group {
                write!(f, "{slot}, ")?;
            }
            write!(f, "}}, ")?;
        }

        write!(f, "], e: [")?;
        for event in &self.events {
            write!(f, "{event}, ")?;
        }
        write!(f, "]}}")
    }
}

// =============================================================================

#[cfg(test)]
fn state_fixture_jobs() -> JobSet {
    let job = |task, cost: (i64, i64), deadline| {
        Job::new(
            format!("T{task},0"),
            JobId { task, job: 0 },
            Interval::new(Time::zero(), Time::zero()),
            Interval::new(Time::ticks(cost.0), Time::ticks(cost.1)),
            Time::ticks(deadline),
            0,
            Time::zero(),
            Time::zero(),
        )
    };
    JobSet::new(vec![job(1, (2, 3), 10), job(2, (1, 4), 12)]).unwrap()
}

#[cfg(test)]
fn time_interval(a: i64, b: i64) -> Interval<Time> {
    Interval::new(Time::ticks(a), Time::ticks(b))
}

#[test]
fn initial_state_has_all_cores_free() {
    let state = State::initial(0, &[2, 1], vec![Time::ticks(5)], false);
    assert_eq!(state.timestamp(), Time::zero());
    assert_eq!(state.num_dispatched(), 0);
    assert_eq!(state.core_availability(0, 0), time_interval(0, 0));
    assert_eq!(state.core_availability(0, 1), time_interval(0, 0));
    assert_eq!(state.core_availability(1, 0), time_interval(0, 0));
    assert_eq!(state.next_event_time(), Some(Time::ticks(5)));
}

#[test]
fn dispatch_consumes_the_earliest_slot_and_resorts() {
    let jobs = state_fixture_jobs();
    let mut parent = State::initial(0, &[2], Vec::new(), false);
    // shape the parent availability by hand: [0,0] stays, second slot busy
    parent = State::dispatch(&parent, 1, jobs.get(0), 0, 0, time_interval(5, 7));
    assert_eq!(parent.core_availability(0, 0), time_interval(0, 0));
    assert_eq!(parent.core_availability(0, 1), time_interval(5, 7));

    // dispatching with finish [3, 9] drops the [0,0] slot; the endpoint
    // pools {3, 5} and {7, 9} re-pair into [3,7] and [5,9]
    let child = State::dispatch(&parent, 2, jobs.get(1), 1, 0, time_interval(3, 9));
    assert_eq!(child.core_availability(0, 0), time_interval(3, 7));
    assert_eq!(child.core_availability(0, 1), time_interval(5, 9));
    assert_eq!(child.timestamp(), parent.timestamp());
    assert_eq!(child.num_dispatched(), 2);
    assert!(child.is_dispatched(0));
    assert!(child.is_dispatched(1));
    assert_eq!(child.finish_times()[&jobs.get(1).id()], time_interval(3, 9));
}

#[test]
fn availability_endpoints_stay_sorted() {
    let jobs = state_fixture_jobs();
    let initial = State::initial(0, &[3], Vec::new(), false);
    let one = State::dispatch(&initial, 1, jobs.get(0), 0, 0, time_interval(4, 8));
    let two = State::dispatch(&one, 2, jobs.get(1), 1, 0, time_interval(2, 9));

    for nth in 0..2 {
        assert!(two.core_availability(0, nth).from() <= two.core_availability(0, nth + 1).from());
        assert!(two.core_availability(0, nth).until() <= two.core_availability(0, nth + 1).until());
    }
}

#[test]
fn dispatch_with_completion_events_announces_finish_bounds() {
    let jobs = state_fixture_jobs();
    let initial = State::initial(0, &[1], vec![Time::ticks(6)], true);
    let child = State::dispatch(&initial, 1, jobs.get(0), 0, 0, time_interval(2, 3));
    assert_eq!(child.events(), &[Time::ticks(2), Time::ticks(3), Time::ticks(6)]);
}

#[test]
fn merge_key_is_dispatch_order_independent() {
    let jobs = state_fixture_jobs();
    let initial = State::initial(0, &[1], Vec::new(), false);

    let ab = State::dispatch(
        &State::dispatch(&initial, 1, jobs.get(0), 0, 0, time_interval(2, 3)),
        2,
        jobs.get(1),
        1,
        0,
        time_interval(3, 7),
    );
    let ba = State::dispatch(
        &State::dispatch(&initial, 3, jobs.get(1), 1, 0, time_interval(1, 4)),
        4,
        jobs.get(0),
        0,
        0,
        time_interval(3, 7),
    );

    assert_eq!(ab.merge_key(), ba.merge_key());
    assert_ne!(ab.merge_key(), initial.merge_key());
}

#[test]
fn advance_drops_consumed_events() {
    let initial = State::initial(0, &[1], vec![Time::ticks(2), Time::ticks(5), Time::ticks(9)], false);
    let advanced = State::advance(&initial, 1, Time::ticks(5));
    assert_eq!(advanced.timestamp(), Time::ticks(5));
    assert_eq!(advanced.events(), &[Time::ticks(9)]);
    assert_eq!(advanced.merge_key(), initial.merge_key());
    assert_eq!(advanced.num_dispatched(), 0);
}

#[test]
#[should_panic(expected = "time must advance strictly")]
fn advance_rejects_non_increasing_time() {
    let initial = State::initial(0, &[1], Vec::new(), false);
    let _ = State::advance(&initial, 1, Time::zero());
}

#[test]
fn merge_widens_intervals_and_unions_events() {
    let jobs = state_fixture_jobs();
    let initial = State::initial(0, &[1], Vec::new(), true);

    let mut a = State::dispatch(&initial, 1, jobs.get(0), 0, 0, time_interval(2, 3));
    let b = State::dispatch(&initial, 2, jobs.get(0), 0, 0, time_interval(4, 6));
    assert!(a.can_merge_with(&b));
    assert!(a.try_merge(&b));

    assert_eq!(a.finish_times()[&jobs.get(0).id()], time_interval(2, 6));
    assert_eq!(a.core_availability(0, 0), time_interval(2, 6));
    assert_eq!(
        a.events(),
        &[Time::ticks(2), Time::ticks(3), Time::ticks(4), Time::ticks(6)]
    );
}

#[test]
fn merge_requires_timestamp_and_dispatched_agreement() {
    let jobs = state_fixture_jobs();
    let initial = State::initial(0, &[1], vec![Time::ticks(4)], false);

    let mut dispatched = State::dispatch(&initial, 1, jobs.get(0), 0, 0, time_interval(2, 3));
    let other_job = State::dispatch(&initial, 2, jobs.get(1), 1, 0, time_interval(2, 3));
    assert!(!dispatched.try_merge(&other_job));

    let advanced = State::advance(&dispatched, 3, Time::ticks(4));
    assert!(!dispatched.try_merge(&advanced));
}

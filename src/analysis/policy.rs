use crate::prelude::*;
use std::collections::HashMap;

pub mod prelude {
    pub use super::{
        EarliestDeadlineFirst,
        FixedPriority,
        SchedulingPolicy,
    };
}

/// The scheduling-policy oracle.
///
/// Called once per plausible `(ready queue, available resources)` pair of a
/// state. Returning `None` means the policy leaves the instant idle and the
/// exploration advances time instead. Implementations must be pure and
/// deterministic: the same queue, resources and instant always produce the
/// same answer.
pub trait SchedulingPolicy {
    fn name(&self) -> &str;

    fn select(
        &self,
        queue: &mut ReadyQueue<'_>,
        available: &HashMap<String, u32>,
        now: Time,
    ) -> Option<JobId>;
}

/// Dispatch the pending job with the earliest absolute deadline.
pub struct EarliestDeadlineFirst;

impl SchedulingPolicy for EarliestDeadlineFirst {
    fn name(&self) -> &str {
        "earliest-deadline-first"
    }

    fn select(
        &self,
        queue: &mut ReadyQueue<'_>,
        _available: &HashMap<String, u32>,
        now: Time,
    ) -> Option<JobId> {
        queue.sort(SortKey::Deadline, now);
        queue.front()
    }
}

/// Dispatch the pending job with the smallest fixed priority value.
pub struct FixedPriority;

impl SchedulingPolicy for FixedPriority {
    fn name(&self) -> &str {
        "fixed-priority"
    }

    fn select(
        &self,
        queue: &mut ReadyQueue<'_>,
        _available: &HashMap<String, u32>,
        now: Time,
    ) -> Option<JobId> {
        queue.sort(SortKey::Priority, now);
        queue.front()
    }
}

// =============================================================================

#[cfg(test)]
fn policy_fixture() -> JobSet {
    let job = |task, deadline, priority| {
        Job::new(
            format!("T{task},0"),
            JobId { task, job: 0 },
            Interval::new(Time::zero(), Time::zero()),
            Interval::new(Time::ticks(1), Time::ticks(1)),
            Time::ticks(deadline),
            0,
            Time::ticks(priority),
            Time::zero(),
        )
    };
    JobSet::new(vec![job(1, 9, 1), job(2, 5, 2)]).unwrap()
}

#[test]
fn edf_selects_the_earliest_deadline() {
    let jobs = policy_fixture();
    let ids = jobs.iter().map(Job::id).collect();
    let mut queue = ReadyQueue::new(&jobs, ids);

    let selected = EarliestDeadlineFirst.select(&mut queue, &HashMap::new(), Time::zero());
    assert_eq!(selected, Some(JobId { task: 2, job: 0 }));
}

#[test]
fn fixed_priority_selects_the_smallest_priority_value() {
    let jobs = policy_fixture();
    let ids = jobs.iter().map(Job::id).collect();
    let mut queue = ReadyQueue::new(&jobs, ids);

    let selected = FixedPriority.select(&mut queue, &HashMap::new(), Time::zero());
    assert_eq!(selected, Some(JobId { task: 1, job: 0 }));
}

#[test]
fn an_empty_queue_selects_nothing() {
    let jobs = policy_fixture();
    let mut queue = ReadyQueue::new(&jobs, Vec::new());

    let selected = EarliestDeadlineFirst.select(&mut queue, &HashMap::new(), Time::zero());
    assert_eq!(selected, None);
}

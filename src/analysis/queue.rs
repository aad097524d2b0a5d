use crate::prelude::*;

pub mod prelude {
    pub use super::{
        ReadyQueue,
        SortKey,
    };
}

/// Keys a scheduling policy may order a ready queue under. `Laxity` is
/// time-dependent and uses the `now` passed to [`ReadyQueue::sort`].
#[derive(Clone, Copy)]
#[derive(Debug)]
#[derive(PartialEq, Eq)]
pub enum SortKey {
    ArrivalMin,
    ArrivalMax,
    CostMin,
    CostMax,
    Deadline,
    Priority,
    Period,
    Laxity,
}

/// Ordered projection of job ids over a borrowed job table.
pub struct ReadyQueue<'a> {
    elements: Vec<JobId>,
    jobs: &'a JobSet,
}

impl<'a> ReadyQueue<'a> {
    pub fn new(jobs: &'a JobSet, elements: Vec<JobId>) -> Self {
        Self { elements, jobs }
    }

    /// Sort under the given key. Every key breaks ties by `(task, job)`
    /// ascending, so the order is total and reproducible.
    pub fn sort(&mut self, key: SortKey, now: Time) {
        match key {
            SortKey::ArrivalMin => self.sort_by_metric(|job| job.earliest_arrival()),
            SortKey::ArrivalMax => self.sort_by_metric(|job| job.latest_arrival()),
            SortKey::CostMin => self.sort_by_metric(|job| job.least_cost()),
            SortKey::CostMax => self.sort_by_metric(|job| job.maximal_cost()),
            SortKey::Deadline => self.sort_by_metric(|job| job.deadline()),
            SortKey::Priority => self.sort_by_metric(|job| job.priority()),
            SortKey::Period => self.sort_by_metric(|job| job.period()),
            SortKey::Laxity => {
                self.sort_by_metric(move |job| job.deadline() - now - job.maximal_cost())
            }
        }
    }

    fn sort_by_metric(&mut self, metric: impl Fn(&Job) -> Time) {
        let jobs = self.jobs;
        self.elements.sort_by_key(|id| {
            let job = jobs
                .job(id)
                .expect("ready queue references a job outside the workload");
            (metric(job), id.task, id.job)
        });
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn front(&self) -> Option<JobId> {
        self.elements.first().copied()
    }

    pub fn back(&self) -> Option<JobId> {
        self.elements.last().copied()
    }

    pub fn ids(&self) -> &[JobId] {
        &self.elements
    }

    pub fn job_at(&self, index: usize) -> &Job {
        self.jobs
            .job(&self.elements[index])
            .expect("ready queue references a job outside the workload")
    }
}

// =============================================================================

#[cfg(test)]
fn queue_fixture() -> JobSet {
    let job = |task, arrival: (i64, i64), cost: (i64, i64), deadline, priority, period| {
        Job::new(
            format!("T{task},0"),
            JobId { task, job: 0 },
            Interval::new(Time::ticks(arrival.0), Time::ticks(arrival.1)),
            Interval::new(Time::ticks(cost.0), Time::ticks(cost.1)),
            Time::ticks(deadline),
            0,
            Time::ticks(priority),
            Time::ticks(period),
        )
    };

    JobSet::new(vec![
        job(1, (0, 4), (2, 6), 20, 3, 10),
        job(2, (1, 2), (3, 3), 12, 1, 40),
        job(3, (2, 3), (1, 8), 15, 2, 30),
    ])
    .unwrap()
}

#[cfg(test)]
fn sorted_tasks(jobs: &JobSet, key: SortKey, now: i64) -> Vec<u64> {
    let ids = jobs.iter().map(Job::id).collect();
    let mut queue = ReadyQueue::new(jobs, ids);
    queue.sort(key, Time::ticks(now));
    queue.ids().iter().map(|id| id.task).collect()
}

#[test]
fn sorts_under_each_key() {
    let jobs = queue_fixture();

    assert_eq!(sorted_tasks(&jobs, SortKey::ArrivalMin, 0), vec![1, 2, 3]);
    assert_eq!(sorted_tasks(&jobs, SortKey::ArrivalMax, 0), vec![2, 3, 1]);
    assert_eq!(sorted_tasks(&jobs, SortKey::CostMin, 0), vec![3, 1, 2]);
    assert_eq!(sorted_tasks(&jobs, SortKey::CostMax, 0), vec![2, 1, 3]);
    assert_eq!(sorted_tasks(&jobs, SortKey::Deadline, 0), vec![2, 3, 1]);
    assert_eq!(sorted_tasks(&jobs, SortKey::Priority, 0), vec![2, 3, 1]);
    assert_eq!(sorted_tasks(&jobs, SortKey::Period, 0), vec![1, 3, 2]);

    // laxities at t=0: T1 = 20-6 = 14, T2 = 12-3 = 9, T3 = 15-8 = 7
    assert_eq!(sorted_tasks(&jobs, SortKey::Laxity, 0), vec![3, 2, 1]);
}

#[test]
fn ties_break_by_task_then_job() {
    let job = |task, job_index| {
        Job::new(
            format!("T{task},{job_index}"),
            JobId { task, job: job_index },
            Interval::new(Time::zero(), Time::zero()),
            Interval::new(Time::ticks(1), Time::ticks(1)),
            Time::ticks(10),
            0,
            Time::zero(),
            Time::zero(),
        )
    };
    let jobs = JobSet::new(vec![job(2, 0), job(1, 1), job(1, 0)]).unwrap();

    let ids = vec![
        JobId { task: 2, job: 0 },
        JobId { task: 1, job: 1 },
        JobId { task: 1, job: 0 },
    ];
    let mut queue = ReadyQueue::new(&jobs, ids);
    queue.sort(SortKey::Deadline, Time::zero());

    let order: Vec<(u64, u64)> = queue.ids().iter().map(|id| (id.task, id.job)).collect();
    assert_eq!(order, vec![(1, 0), (1, 1), (2, 0)]);
    assert_eq!(queue.front(), Some(JobId { task: 1, job: 0 }));
    assert_eq!(queue.back(), Some(JobId { task: 2, job: 0 }));
    assert_eq!(queue.job_at(0).id().task, 1);
}

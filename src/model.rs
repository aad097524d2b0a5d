use crate::prelude::*;
use std::collections::HashMap;

pub mod prelude {
    pub use super::model_serde::prelude::*;
    pub use super::{
        EventSpec,
        Job,
        JobId,
        JobSet,
        ProcessorGroup,
        StandaloneJob,
        SystemModel,
        Task,
        Workload,
    };
}

pub mod model_serde;

/// Identity of one job instance: the source task and the instance number
/// within the observation window.
#[derive(Clone, Copy)]
#[derive(Debug)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId {
    pub task: u64,
    pub job: u64,
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}S{}", self.task, self.job)
    }
}

/// Immutable workload record for a single job instance.
///
/// The digest is precomputed from the identity and the timing parameters
/// only; it must never depend on per-state data, so that XOR-folding the
/// digests of a dispatched set is independent of the dispatch order.
#[derive(Clone)]
#[derive(Debug)]
pub struct Job {
    name: String,
    id: JobId,
    arrival: Interval<Time>,
    cost: Interval<Time>,
    deadline: Time,
    priority: Time,
    period: Time,
    processor_group: u32,
    digest: u64,
}

impl Job {
    pub fn new(
        name: String,
        id: JobId,
        arrival: Interval<Time>,
        cost: Interval<Time>,
        deadline: Time,
        processor_group: u32,
        priority: Time,
        period: Time,
    ) -> Self {
        let digest = stable_digest(id, arrival, cost, deadline);
        Self { name, id, arrival, cost, deadline, priority, period, processor_group, digest }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn arrival(&self) -> Interval<Time> {
        self.arrival
    }

    pub fn earliest_arrival(&self) -> Time {
        self.arrival.from()
    }

    pub fn latest_arrival(&self) -> Time {
        self.arrival.until()
    }

    pub fn cost(&self) -> Interval<Time> {
        self.cost
    }

    pub fn least_cost(&self) -> Time {
        self.cost.from()
    }

    pub fn maximal_cost(&self) -> Time {
        self.cost.until()
    }

    pub fn deadline(&self) -> Time {
        self.deadline
    }

    pub fn priority(&self) -> Time {
        self.priority
    }

    pub fn period(&self) -> Time {
        self.period
    }

    pub fn processor_group(&self) -> u32 {
        self.processor_group
    }

    pub fn stable_digest(&self) -> u64 {
        self.digest
    }

    pub fn exceeds_deadline(&self, t: Time) -> bool {
        t > self.deadline && (t - self.deadline) > Time::DEADLINE_MISS_TOLERANCE
    }

    /// Time range during which the job could be both ready and not yet
    /// tardy. Inclusive interval, so one epsilon comes off the deadline.
    pub fn scheduling_window(&self) -> Interval<Time> {
        Interval::new(self.earliest_arrival(), self.deadline - Time::EPSILON)
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Job {}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Job{{{}, {}, {}, {}, {}}}",
            self.id, self.arrival, self.cost, self.deadline, self.priority
        )
    }
}

// FNV-1a over the identity and timing words.
fn stable_digest(id: JobId, arrival: Interval<Time>, cost: Interval<Time>, deadline: Time) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let words = [
        id.task,
        id.job,
        arrival.from().as_ticks() as u64,
        arrival.until().as_ticks() as u64,
        cost.from().as_ticks() as u64,
        cost.until().as_ticks() as u64,
        deadline.as_ticks() as u64,
    ];

    let mut digest = OFFSET_BASIS;
    for word in words {
        for byte in word.to_le_bytes() {
            digest ^= u64::from(byte);
            digest = digest.wrapping_mul(PRIME);
        }
    }
    digest
}

/// A named group of identical cores; jobs are pinned to one group and run
/// on any one of its cores.
#[derive(Clone)]
#[derive(Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ProcessorGroup {
    pub name: String,
    #[serde(rename = "id")]
    pub index: u32,
    pub cores: u32,
}

/// Periodic task, expanded into one job per period over the observation
/// window.
#[derive(Clone)]
#[derive(Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Task {
    pub name: String,
    pub id: u64,
    #[serde(default)]
    pub jitter: Time,
    pub period: Time,
    pub cost: Interval<Time>,
    pub deadline: Time,
    #[serde(default, rename = "processor")]
    pub processor_group: u32,
    #[serde(default)]
    pub priority: Time,
}

/// Sporadic one-shot job given directly in the model. Its deadline is
/// relative to the earliest arrival.
#[derive(Clone)]
#[derive(Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct StandaloneJob {
    pub name: String,
    #[serde(rename = "task_id")]
    pub task: u64,
    #[serde(default, rename = "job_index")]
    pub job: u64,
    pub arrival: Interval<Time>,
    pub cost: Interval<Time>,
    pub deadline: Time,
    #[serde(default, rename = "processor")]
    pub processor_group: u32,
    #[serde(default)]
    pub priority: Time,
}

/// Which instants seed a state's pending-event set.
#[derive(Clone)]
#[derive(Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct EventSpec {
    #[serde(default)]
    pub all_ticks: bool,
    #[serde(default = "serde_default_true")]
    pub arrival: bool,
    #[serde(default)]
    pub completion: bool,
    #[serde(default)]
    pub times: Vec<Time>,
}

impl Default for EventSpec {
    fn default() -> Self {
        Self { all_ticks: false, arrival: true, completion: false, times: Vec::new() }
    }
}

fn serde_default_true() -> bool {
    true
}

/// The parsed system model: platform, periodic tasks, standalone jobs and
/// the event specification.
#[derive(Clone)]
#[derive(Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SystemModel {
    #[serde(default)]
    pub processors: Vec<ProcessorGroup>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub jobs: Vec<StandaloneJob>,
    #[serde(default)]
    pub events: EventSpec,
}

impl SystemModel {
    /// Validate the model and expand every periodic task over one
    /// hyperperiod, yielding the flat workload the analysis runs on.
    pub fn expand(&self) -> Result<Workload, ModelError> {
        if self.processors.is_empty() {
            return Err(ModelError::NoProcessors);
        }
        for (position, group) in self.processors.iter().enumerate() {
            if group.index as usize != position {
                return Err(ModelError::GroupIndexMismatch {
                    name: group.name.clone(),
                    expected: position as u32,
                    found: group.index,
                });
            }
            if group.cores == 0 {
                return Err(ModelError::EmptyGroup { name: group.name.clone() });
            }
        }

        let window = self.hyperperiod()?;

        let mut jobs = Vec::new();
        for task in &self.tasks {
            self.check_group(task.processor_group, &task.name)?;
            for instance in 0..window / task.period {
                let release = task.period * instance;
                jobs.push(Job::new(
                    format!("{},{}", task.name, instance),
                    JobId { task: task.id, job: instance as u64 },
                    Interval::new(release, release + task.jitter),
                    task.cost,
                    release + task.deadline,
                    task.processor_group,
                    task.priority,
                    task.period,
                ));
            }
        }
        for standalone in &self.jobs {
            self.check_group(standalone.processor_group, &standalone.name)?;
            jobs.push(Job::new(
                standalone.name.clone(),
                JobId { task: standalone.task, job: standalone.job },
                standalone.arrival,
                standalone.cost,
                standalone.arrival.from() + standalone.deadline,
                standalone.processor_group,
                standalone.priority,
                Time::zero(),
            ));
        }

        for job in &jobs {
            if job.earliest_arrival() < Time::zero() || job.least_cost() < Time::zero() {
                return Err(ModelError::NegativeInterval { job: job.name().to_owned() });
            }
        }

        Ok(Workload {
            jobs: JobSet::new(jobs)?,
            groups: self.processors.clone(),
            events: self.events.clone(),
            observation_window: window,
        })
    }

    fn hyperperiod(&self) -> Result<Time, ModelError> {
        let mut window = 1i64;
        for task in &self.tasks {
            if task.period <= Time::zero() {
                return Err(ModelError::NonPositivePeriod { task: task.name.clone() });
            }
            let period = task.period.as_ticks();
            let gcd = num::integer::gcd(window, period);
            window = (window / gcd)
                .checked_mul(period)
                .ok_or(ModelError::HyperperiodOverflow)?;
        }
        Ok(Time::ticks(window))
    }

    fn check_group(&self, group: u32, owner: &str) -> Result<(), ModelError> {
        if group as usize >= self.processors.len() {
            Err(ModelError::UnknownGroup { owner: owner.to_owned(), group })
        } else {
            Ok(())
        }
    }
}

/// The expanded jobs, indexable both by position and by id.
#[derive(Clone)]
#[derive(Debug)]
pub struct JobSet {
    jobs: Vec<Job>,
    by_id: HashMap<JobId, usize>,
}

impl JobSet {
    pub fn new(jobs: Vec<Job>) -> Result<Self, ModelError> {
        let mut by_id = HashMap::with_capacity(jobs.len());
        for (index, job) in jobs.iter().enumerate() {
            if by_id.insert(job.id(), index).is_some() {
                return Err(ModelError::DuplicateJobId(job.id()));
            }
        }
        Ok(Self { jobs, by_id })
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Job> {
        self.jobs.iter()
    }

    pub fn get(&self, index: usize) -> &Job {
        &self.jobs[index]
    }

    pub fn index_of(&self, id: &JobId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn job(&self, id: &JobId) -> Option<&Job> {
        self.index_of(id).map(|index| &self.jobs[index])
    }

    pub fn max_deadline(&self) -> Time {
        self.jobs
            .iter()
            .map(Job::deadline)
            .max()
            .unwrap_or(Time::zero())
    }
}

/// Everything the analysis needs: the flat job set, the platform, the event
/// specification and the observation window (the task-set hyperperiod).
#[derive(Clone)]
#[derive(Debug)]
pub struct Workload {
    pub jobs: JobSet,
    pub groups: Vec<ProcessorGroup>,
    pub events: EventSpec,
    pub observation_window: Time,
}

impl Workload {
    pub fn resource_set(&self) -> Vec<u32> {
        self.groups.iter().map(|group| group.cores).collect()
    }
}

// =============================================================================

#[cfg(test)]
fn test_job(task: u64, job: u64, arrival: (i64, i64), cost: (i64, i64), deadline: i64) -> Job {
    Job::new(
        format!("T{task},{job}"),
        JobId { task, job },
        Interval::new(Time::ticks(arrival.0), Time::ticks(arrival.1)),
        Interval::new(Time::ticks(cost.0), Time::ticks(cost.1)),
        Time::ticks(deadline),
        0,
        Time::zero(),
        Time::zero(),
    )
}

#[test]
fn job_identity_and_window() {
    let job = test_job(1, 0, (0, 2), (1, 3), 10);
    assert_eq!(job.id().to_string(), "T1S0");
    assert_eq!(job.scheduling_window(), Interval::new(Time::zero(), Time::ticks(9)));
    assert!(!job.exceeds_deadline(Time::ticks(10)));
    assert!(job.exceeds_deadline(Time::ticks(11)));
}

#[test]
fn job_digest_ignores_everything_but_identity_and_timing() {
    let a = test_job(1, 0, (0, 2), (1, 3), 10);
    let mut b = test_job(1, 0, (0, 2), (1, 3), 10);
    b = Job::new(
        "different name".to_owned(),
        b.id(),
        b.arrival(),
        b.cost(),
        b.deadline(),
        3,
        Time::ticks(99),
        Time::ticks(42),
    );
    assert_eq!(a.stable_digest(), b.stable_digest());

    let c = test_job(1, 1, (0, 2), (1, 3), 10);
    assert_ne!(a.stable_digest(), c.stable_digest());
}

#[test]
fn expansion_covers_one_hyperperiod() {
    let model = SystemModel {
        processors: vec![ProcessorGroup { name: "P0".to_owned(), index: 0, cores: 1 }],
        tasks: vec![
            Task {
                name: "T1".to_owned(),
                id: 1,
                jitter: Time::ticks(2),
                period: Time::ticks(10),
                cost: Interval::new(Time::ticks(1), Time::ticks(2)),
                deadline: Time::ticks(10),
                processor_group: 0,
                priority: Time::zero(),
            },
            Task {
                name: "T2".to_owned(),
                id: 2,
                jitter: Time::zero(),
                period: Time::ticks(20),
                cost: Interval::new(Time::ticks(3), Time::ticks(3)),
                deadline: Time::ticks(20),
                processor_group: 0,
                priority: Time::zero(),
            },
        ],
        jobs: Vec::new(),
        events: EventSpec::default(),
    };

    let workload = model.expand().unwrap();
    assert_eq!(workload.observation_window, Time::ticks(20));
    assert_eq!(workload.jobs.len(), 3);

    let second = workload.jobs.job(&JobId { task: 1, job: 1 }).unwrap();
    assert_eq!(second.arrival(), Interval::new(Time::ticks(10), Time::ticks(12)));
    assert_eq!(second.deadline(), Time::ticks(20));
    assert_eq!(workload.resource_set(), vec![1]);
}

#[test]
fn standalone_job_deadline_is_relative_to_earliest_arrival() {
    let model = SystemModel {
        processors: vec![ProcessorGroup { name: "P0".to_owned(), index: 0, cores: 1 }],
        tasks: Vec::new(),
        jobs: vec![StandaloneJob {
            name: "J5".to_owned(),
            task: 5,
            job: 0,
            arrival: Interval::new(Time::ticks(4), Time::ticks(6)),
            cost: Interval::new(Time::ticks(1), Time::ticks(1)),
            deadline: Time::ticks(10),
            processor_group: 0,
            priority: Time::zero(),
        }],
        events: EventSpec::default(),
    };

    let workload = model.expand().unwrap();
    let job = workload.jobs.job(&JobId { task: 5, job: 0 }).unwrap();
    assert_eq!(job.deadline(), Time::ticks(14));
}

#[test]
fn expansion_rejects_malformed_models() {
    let group = ProcessorGroup { name: "P0".to_owned(), index: 0, cores: 1 };
    let task = Task {
        name: "T1".to_owned(),
        id: 1,
        jitter: Time::zero(),
        period: Time::ticks(10),
        cost: Interval::new(Time::ticks(1), Time::ticks(1)),
        deadline: Time::ticks(10),
        processor_group: 0,
        priority: Time::zero(),
    };

    let no_processors = SystemModel::default();
    assert!(matches!(no_processors.expand(), Err(ModelError::NoProcessors)));

    let bad_index = SystemModel {
        processors: vec![ProcessorGroup { index: 7, ..group.clone() }],
        ..SystemModel::default()
    };
    assert!(matches!(bad_index.expand(), Err(ModelError::GroupIndexMismatch { .. })));

    let unknown_group = SystemModel {
        processors: vec![group.clone()],
        tasks: vec![Task { processor_group: 3, ..task.clone() }],
        ..SystemModel::default()
    };
    assert!(matches!(unknown_group.expand(), Err(ModelError::UnknownGroup { .. })));

    let zero_period = SystemModel {
        processors: vec![group.clone()],
        tasks: vec![Task { period: Time::zero(), ..task.clone() }],
        ..SystemModel::default()
    };
    assert!(matches!(zero_period.expand(), Err(ModelError::NonPositivePeriod { .. })));

    let negative = SystemModel {
        processors: vec![group.clone()],
        tasks: Vec::new(),
        jobs: vec![StandaloneJob {
            name: "J1".to_owned(),
            task: 1,
            job: 0,
            arrival: Interval::new(Time::ticks(-3), Time::zero()),
            cost: Interval::new(Time::ticks(1), Time::ticks(1)),
            deadline: Time::ticks(10),
            processor_group: 0,
            priority: Time::zero(),
        }],
        ..SystemModel::default()
    };
    assert!(matches!(negative.expand(), Err(ModelError::NegativeInterval { .. })));

    let overflowing = SystemModel {
        processors: vec![group],
        tasks: vec![
            Task { period: Time::ticks((1i64 << 62) - 1), ..task.clone() },
            Task { id: 2, period: Time::ticks((1i64 << 61) - 1), ..task },
        ],
        ..SystemModel::default()
    };
    assert!(matches!(overflowing.expand(), Err(ModelError::HyperperiodOverflow)));
}

#[test]
fn job_set_rejects_duplicate_ids() {
    let jobs = vec![test_job(1, 0, (0, 0), (1, 1), 5), test_job(1, 0, (2, 2), (1, 1), 9)];
    assert!(matches!(JobSet::new(jobs), Err(ModelError::DuplicateJobId(_))));
}

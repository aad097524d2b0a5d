use crate::prelude::*;
use super::{format_queue, output};
use log::{debug, error, info, warn};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Instant;

pub mod prelude {
    pub use super::{
        AnalysisConfig,
        ReachabilityEngine,
    };
}

/// Knobs of one analysis run.
#[derive(Clone)]
#[derive(Debug)]
pub struct AnalysisConfig {
    /// Disable state merging and the peek-ahead abstraction.
    pub naive: bool,
    /// Wall-clock limit in seconds; zero disables the limit.
    pub timeout_secs: f64,
    /// Enumerate the plausible resource-availability vectors per state. When
    /// off, the policy is called with an empty availability map.
    pub model_resources: bool,
    /// Keep the full transition graph for post-hoc DOT emission instead of
    /// freeing interior nodes between iterations.
    pub retain_graph: bool,
    /// Response-time output file; the DOT file shares its stem.
    pub output: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            naive: false,
            timeout_secs: 14400.0,
            model_resources: true,
            retain_graph: false,
            output: "out.csv".to_owned(),
        }
    }
}

/// Exhaustive exploration of every scheduling state a workload can reach
/// under the given policy, with uncertain arrivals and costs.
///
/// The exploration is a fixed point over the leaf frontier: pick the leaf
/// with the smallest timestamp (ties by fewest dispatched jobs, then by
/// creation order), enumerate its plausible ready queues and resource
/// vectors, ask the policy what it would do for each, and add the resulting
/// dispatch or time-advance successors, merging equivalent states unless
/// running naively.
pub struct ReachabilityEngine<P> {
    jobs: JobSet,
    groups: Vec<ProcessorGroup>,
    resource_set: Vec<u32>,
    events: EventSpec,
    observation_window: Time,
    jobs_by_window: IntervalLookupTable,
    policy: P,
    config: AnalysisConfig,

    states: HashMap<u64, State>,
    graph: TransitionGraph,
    num_states: u64,
    completion_times: HashMap<JobId, Interval<Time>>,
    aborted: bool,
    completed: bool,
    timed_out: bool,
    started: Instant,
    elapsed_secs: f64,
}

impl<P: SchedulingPolicy> ReachabilityEngine<P> {
    /// Build the transition system and run the exploration to completion.
    pub fn construct(workload: Workload, policy: P, config: AnalysisConfig) -> Self {
        let mut engine = Self::new(workload, policy, config);
        debug!("constructing the transition system");
        engine.run();
        engine
    }

    /// Like [`Self::construct`], but without merging and peeking.
    pub fn construct_naively(workload: Workload, policy: P, mut config: AnalysisConfig) -> Self {
        config.naive = true;
        Self::construct(workload, policy, config)
    }

    fn new(workload: Workload, policy: P, config: AnalysisConfig) -> Self {
        let Workload { jobs, groups, events, observation_window } = workload;

        let max_deadline = jobs.max_deadline();
        let bucket_width = if jobs.is_empty() {
            Time::EPSILON
        } else {
            max_deadline / jobs.len() as i64
        };
        let mut jobs_by_window =
            IntervalLookupTable::new(Interval::new(Time::zero(), max_deadline), bucket_width);
        for (index, job) in jobs.iter().enumerate() {
            jobs_by_window.insert(index, job.scheduling_window());
        }

        let resource_set = groups.iter().map(|group| group.cores).collect();

        Self {
            jobs,
            groups,
            resource_set,
            events,
            observation_window,
            jobs_by_window,
            policy,
            config,
            states: HashMap::new(),
            graph: TransitionGraph::new(),
            num_states: 0,
            completion_times: HashMap::new(),
            aborted: false,
            completed: false,
            timed_out: false,
            started: Instant::now(),
            elapsed_secs: 0.0,
        }
    }

    fn run(&mut self) {
        self.started = Instant::now();
        self.make_initial_state();

        loop {
            let leaves = self.graph.leaves().to_vec();
            assert!(!leaves.is_empty(), "the transition graph must keep at least one leaf");

            // interior states can neither be explored nor merged into
            let leaf_set: HashSet<u64> = leaves.iter().copied().collect();
            self.states.retain(|id, _| leaf_set.contains(id));
            if !self.config.retain_graph {
                self.graph.free_memory();
            }

            let min_dispatched = leaves
                .iter()
                .map(|id| self.state(*id).num_dispatched())
                .min()
                .expect("at least one leaf");
            if min_dispatched >= self.jobs.len() {
                self.completed = true;
                break;
            }

            let mut explorable: Vec<u64> = leaves
                .into_iter()
                .filter(|id| self.state(*id).num_dispatched() != self.jobs.len())
                .collect();

            explorable.sort_by_key(|id| self.state(*id).timestamp());
            let lowest = self.state(explorable[0]).timestamp();
            explorable.retain(|id| self.state(*id).timestamp() == lowest);
            explorable.sort_by_key(|id| self.state(*id).num_dispatched());
            let chosen = explorable[0];

            self.check_timeout();
            if self.aborted {
                break;
            }

            let state = self.state(chosen).clone();
            self.explore_state(&state);

            if self.aborted {
                break;
            }

            if self.graph.leaves().contains(&chosen) {
                // every queue came back undecidable and no event is pending;
                // without an edge out of this leaf the loop would spin
                error!("state {chosen} cannot make progress; check the event model");
                self.aborted = true;
                break;
            }
        }

        self.elapsed_secs = self.started.elapsed().as_secs_f64();
    }

    fn make_initial_state(&mut self) {
        let mut event_times: BTreeSet<Time> = BTreeSet::new();
        if self.events.all_ticks {
            for tick in 1..=self.observation_window.as_ticks() {
                event_times.insert(Time::ticks(tick));
            }
        } else {
            if self.events.arrival {
                for job in self.jobs.iter() {
                    if job.earliest_arrival() != Time::zero() {
                        event_times.insert(job.earliest_arrival());
                    }
                    if job.latest_arrival() != Time::zero() {
                        event_times.insert(job.latest_arrival());
                    }
                }
            }
            for time in &self.events.times {
                if *time != Time::zero() {
                    event_times.insert(*time);
                }
            }
        }

        let state = State::initial(
            self.num_states,
            &self.resource_set,
            event_times.into_iter().collect(),
            self.events.completion,
        );
        let label = state.dot_label(&self.jobs);
        let node = self.graph.add_node(None, state.timestamp(), label, String::new(), String::new());
        debug_assert_eq!(node, self.num_states);
        self.states.insert(self.num_states, state);
        self.num_states += 1;
    }

    /// Enumerate every plausible transition out of `state`.
    fn explore_state(&mut self, state: &State) {
        info!("checking state {state}");
        let queues = self.make_ready_queues(state);

        for queue_ids in &queues {
            let resource_maps = if self.config.model_resources {
                let ranges = self.available_resource_ranges(queue_ids, state);
                all_resource_combinations(&ranges)
            } else {
                vec![HashMap::new()]
            };

            for available in &resource_maps {
                let mut queue = ReadyQueue::new(&self.jobs, queue_ids.clone());
                match self.policy.select(&mut queue, available, state.timestamp()) {
                    Some(job_id) => {
                        let annotation = format_queue(queue_ids);
                        if self.graph.has_edge(state.id(), &job_id.to_string(), &annotation) {
                            info!("the transition already proceeded");
                            continue;
                        }
                        self.dispatch_job(state, job_id, &annotation);
                    }
                    None => {
                        info!("no job is selected from the ready queue");
                        let Some(next_event) = state.next_event_time() else {
                            warn!("state {} has no pending event to advance to", state.id());
                            continue;
                        };
                        let delta = next_event - state.timestamp();
                        if self.graph.has_edge(state.id(), &delta.to_string(), "") {
                            info!("time transition already exists");
                            continue;
                        }
                        let new_time = if self.config.naive {
                            next_event
                        } else {
                            self.peek(&queues, state)
                        };
                        self.time_transition(state, new_time);
                    }
                }
            }
        }
    }

    /// The powerset abstraction over uncertain releases (and uncertain
    /// resource availability) at a state.
    ///
    /// The base shapes are every subset of the possibly-ready jobs joined
    /// with the certainly-ready ones; the bare certainly-ready queue stays
    /// even when empty, as the empty shape is what drives time transitions.
    /// Jobs that are certainly released but whose core is only possibly
    /// free join each base shape as an additional variant.
    fn make_ready_queues(&mut self, state: &State) -> Vec<Vec<JobId>> {
        let t = state.timestamp();
        let mut all_ready: Vec<JobId> = Vec::new();
        let mut certainly_ready: Vec<JobId> = Vec::new();
        let mut certainly_released: Vec<JobId> = Vec::new();

        for &index in self.jobs_by_window.lookup(t) {
            let job = self.jobs.get(index);
            debug!("checking job {}", job.id());
            if state.is_dispatched(index) {
                debug!(" -> job {} is already dispatched", job.id());
                continue;
            } else if job.exceeds_deadline(t + job.maximal_cost()) {
                warn!(" -> job {} missed its deadline", job.id());
                self.aborted = true;
            }

            let group = job.processor_group() as usize;
            if t >= job.earliest_arrival() {
                if state.core_availability(group, 0).from() <= t {
                    all_ready.push(job.id());
                } else {
                    debug!(" -> job {}'s resource is not available", job.id());
                }
            } else {
                debug!(" -> job {} is not released", job.id());
                continue;
            }

            if t >= job.latest_arrival() {
                if state.core_availability(group, 0).until() <= t {
                    certainly_ready.push(job.id());
                } else if state.core_availability(group, 0).from() <= t {
                    certainly_released.push(job.id());
                }
            }
        }

        let possibly_ready: Vec<JobId> = all_ready
            .iter()
            .copied()
            .filter(|id| !certainly_ready.contains(id) && !certainly_released.contains(id))
            .collect();

        let mut queues: Vec<Vec<JobId>> = Vec::new();
        for subset in powerset(&possibly_ready) {
            let mut queue = certainly_ready.clone();
            queue.extend(subset);
            queues.push(queue);
        }

        let augmented: Vec<Vec<JobId>> = queues
            .iter()
            .map(|queue| {
                let mut queue = queue.clone();
                queue.extend(certainly_released.iter().copied());
                queue
            })
            .collect();
        for queue in augmented {
            if !queue.is_empty() && !queues.contains(&queue) {
                queues.push(queue);
            }
        }

        debug!("{} possible ready queues", queues.len());
        queues
    }

    /// Per group, the range `[certain, possible]` of cores free at the
    /// state's timestamp. A group targeted by a queued job gets one core
    /// counted as guaranteed, since the job must be able to run somewhere.
    fn available_resource_ranges(
        &self,
        queue_ids: &[JobId],
        state: &State,
    ) -> Vec<(String, u32, u32)> {
        let t = state.timestamp();
        let mut ranges = Vec::with_capacity(self.groups.len());

        for (group_index, group) in self.groups.iter().enumerate() {
            let mut certain = 0u32;
            let mut possible = 0u32;

            for id in queue_ids {
                let job = self
                    .jobs
                    .job(id)
                    .unwrap_or_else(|| panic!("job {id} not part of the workload"));
                if job.processor_group() as usize == group_index {
                    certain = 1;
                    possible = 1;
                    break;
                }
            }

            let first_unclaimed = certain;
            for nth in first_unclaimed..group.cores {
                let availability = state.core_availability(group_index, nth as usize);
                if availability.until() <= t {
                    certain += 1;
                    possible += 1;
                } else if availability.from() <= t && t < availability.until() {
                    possible += 1;
                }
            }

            ranges.push((group.name.clone(), certain, possible));
        }

        ranges
    }

    /// The job ids the policy would dispatch across every queue shape and
    /// resource vector of `state`.
    fn decisions(&self, queues: &[Vec<JobId>], state: &State) -> BTreeSet<JobId> {
        let mut selected = BTreeSet::new();
        for queue_ids in queues {
            let resource_maps = if self.config.model_resources {
                all_resource_combinations(&self.available_resource_ranges(queue_ids, state))
            } else {
                vec![HashMap::new()]
            };
            for available in &resource_maps {
                let mut queue = ReadyQueue::new(&self.jobs, queue_ids.clone());
                if let Some(id) = self.policy.select(&mut queue, available, state.timestamp()) {
                    selected.insert(id);
                }
            }
        }
        selected
    }

    /// Abstract over idle events that change no scheduling decision: walk a
    /// scratch copy of `state` event by event and stop at the first instant
    /// whose queue shapes or dispatch decisions differ.
    fn peek(&mut self, queues: &[Vec<JobId>], state: &State) -> Time {
        let mut scratch = state.clone();
        let mut current_queues = queues.to_vec();
        let mut current_decisions = self.decisions(&current_queues, &scratch);

        loop {
            let Some(next_event) = scratch.next_event_time() else {
                return scratch.timestamp();
            };
            debug!(">> peeking the next state at time {next_event}");
            scratch.advance_to(next_event);

            let next_queues = self.make_ready_queues(&scratch);
            let next_decisions = self.decisions(&next_queues, &scratch);
            if next_decisions != current_decisions || next_queues != current_queues {
                return scratch.timestamp();
            }

            current_queues = next_queues;
            current_decisions = next_decisions;
        }
    }

    fn dispatch_job(&mut self, state: &State, job_id: JobId, annotation: &str) {
        info!("dispatching job {job_id}");
        let index = self
            .jobs
            .index_of(&job_id)
            .unwrap_or_else(|| panic!("job {job_id} not part of the workload"));
        let job = self.jobs.get(index);
        let finish_time = job.cost() + state.timestamp();
        let group = job.processor_group() as usize;

        let successor = State::dispatch(state, self.num_states, job, index, group, finish_time);
        if !self.config.naive
            && self.try_merge_into_leaves(&successor, state.id(), &job_id.to_string())
        {
            self.record_completion(job_id, finish_time);
            return;
        }

        info!("new state is created");
        let label = successor.dot_label(&self.jobs);
        let node = self.graph.add_node(
            Some(state.id()),
            successor.timestamp(),
            label,
            job_id.to_string(),
            annotation.to_owned(),
        );
        debug_assert_eq!(node, self.num_states);
        self.states.insert(self.num_states, successor);
        self.num_states += 1;

        self.record_completion(job_id, finish_time);
    }

    fn time_transition(&mut self, state: &State, new_time: Time) {
        let label = (new_time - state.timestamp()).to_string();
        if self.graph.has_edge(state.id(), &label, "") {
            info!("time transition already exists");
            return;
        }

        info!("time transition to {new_time} from state {}", state.id());
        let successor = State::advance(state, self.num_states, new_time);
        if !self.config.naive && self.try_merge_into_leaves(&successor, state.id(), &label) {
            return;
        }

        let dot_label = successor.dot_label(&self.jobs);
        let node = self.graph.add_node(
            Some(state.id()),
            successor.timestamp(),
            dot_label,
            label,
            String::new(),
        );
        debug_assert_eq!(node, self.num_states);
        self.states.insert(self.num_states, successor);
        self.num_states += 1;
    }

    /// Scan the frontier for a merge candidate; on a hit the candidate is
    /// folded into the existing leaf and only a new edge is added.
    fn try_merge_into_leaves(&mut self, candidate: &State, parent: u64, edge_label: &str) -> bool {
        let leaves = self.graph.leaves().to_vec();
        for id in leaves {
            let merged = match self.states.get_mut(&id) {
                Some(existing) => existing.try_merge(candidate),
                None => false,
            };
            if merged {
                let label = self.state(id).dot_label(&self.jobs);
                self.graph.update_node_label(id, label);
                self.graph.add_edge(parent, id, edge_label.to_owned());
                info!("merged with existing state {id}");
                return true;
            }
        }
        false
    }

    /// Fold a dispatch's completion interval into the per-job accumulator
    /// and flag the analysis when the worst case runs past the deadline.
    fn record_completion(&mut self, job_id: JobId, finish_time: Interval<Time>) {
        self.completion_times
            .entry(job_id)
            .and_modify(|interval| interval.widen(&finish_time))
            .or_insert(finish_time);

        let job = self
            .jobs
            .job(&job_id)
            .unwrap_or_else(|| panic!("job {job_id} not part of the workload"));
        if job.exceeds_deadline(finish_time.until()) {
            warn!("job {job_id} exceeds its deadline");
            self.aborted = true;
        }
    }

    fn check_timeout(&mut self) {
        if self.config.timeout_secs <= 0.0 {
            return;
        }
        if self.started.elapsed().as_secs_f64() > self.config.timeout_secs {
            error!("timeout!");
            self.aborted = true;
            self.timed_out = true;
        }
    }

    fn state(&self, id: u64) -> &State {
        self.states
            .get(&id)
            .unwrap_or_else(|| panic!("state {id} is not live"))
    }

    /// The workload is schedulable iff the exploration completed without a
    /// deadline miss or timeout.
    pub fn is_schedulable(&self) -> bool {
        self.completed
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn num_states(&self) -> u64 {
        self.num_states
    }

    /// Best- and worst-case completion interval observed per dispatched job.
    pub fn completion_times(&self) -> &HashMap<JobId, Interval<Time>> {
        &self.completion_times
    }

    pub fn graph(&self) -> &TransitionGraph {
        &self.graph
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn summary(&self) -> Summary {
        Summary {
            output_file: self.config.output.clone(),
            schedulable: self.completed,
            num_states: self.num_states,
            cpu_seconds: self.elapsed_secs,
            memory_mib: output::peak_memory_mib(),
            timed_out: self.timed_out,
            num_groups: self.groups.len(),
        }
    }

    /// Per-job completion and response intervals, in CSV form.
    pub fn write_response_times<W: std::io::Write>(&self, writer: W) -> std::io::Result<()> {
        output::write_response_times(&self.jobs, &self.completion_times, writer)
    }

    /// The explored transition structure, in DOT form.
    pub fn write_graph<W: std::io::Write>(&self, writer: W) -> std::io::Result<()> {
        self.graph.write_dot(writer)
    }
}

/// Every subset of `items`: the empty set first, then by size, each size in
/// lexicographic position order.
fn powerset(items: &[JobId]) -> Vec<Vec<JobId>> {
    let mut subsets = vec![Vec::new()];
    for size in 1..=items.len() {
        combinations_into(items, size, 0, &mut Vec::new(), &mut subsets);
    }
    subsets
}

fn combinations_into(
    items: &[JobId],
    size: usize,
    start: usize,
    current: &mut Vec<JobId>,
    out: &mut Vec<Vec<JobId>>,
) {
    if current.len() == size {
        out.push(current.clone());
        return;
    }
    for index in start..items.len() {
        current.push(items[index]);
        combinations_into(items, size, index + 1, current, out);
        current.pop();
    }
}

/// Cartesian product of the per-group availability ranges, groups in index
/// order and counts ascending, so the enumeration is reproducible.
fn all_resource_combinations(ranges: &[(String, u32, u32)]) -> Vec<HashMap<String, u32>> {
    let mut maps = vec![HashMap::new()];
    for (name, certain, possible) in ranges {
        let mut extended = Vec::with_capacity(maps.len() * (*possible - *certain + 1) as usize);
        for map in &maps {
            for count in *certain..=*possible {
                let mut map = map.clone();
                map.insert(name.clone(), count);
                extended.push(map);
            }
        }
        maps = extended;
    }
    maps
}

// =============================================================================

#[cfg(test)]
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(test)]
fn test_group(name: &str, index: u32, cores: u32) -> ProcessorGroup {
    ProcessorGroup { name: name.to_owned(), index, cores }
}

#[cfg(test)]
fn test_job(
    task: u64,
    arrival: (i64, i64),
    cost: (i64, i64),
    deadline: i64,
    group: u32,
) -> Job {
    Job::new(
        format!("T{task},0"),
        JobId { task, job: 0 },
        Interval::new(Time::ticks(arrival.0), Time::ticks(arrival.1)),
        Interval::new(Time::ticks(cost.0), Time::ticks(cost.1)),
        Time::ticks(deadline),
        group,
        Time::zero(),
        Time::zero(),
    )
}

#[cfg(test)]
fn test_events() -> EventSpec {
    EventSpec { all_ticks: false, arrival: true, completion: true, times: Vec::new() }
}

#[cfg(test)]
fn test_workload(jobs: Vec<Job>, groups: Vec<ProcessorGroup>) -> Workload {
    let jobs = JobSet::new(jobs).unwrap();
    let observation_window = jobs.max_deadline();
    Workload { jobs, groups, events: test_events(), observation_window }
}

#[cfg(test)]
fn completion(engine: &ReachabilityEngine<EarliestDeadlineFirst>, task: u64) -> Interval<Time> {
    engine.completion_times()[&JobId { task, job: 0 }]
}

#[cfg(test)]
fn time_interval(a: i64, b: i64) -> Interval<Time> {
    Interval::new(Time::ticks(a), Time::ticks(b))
}

#[test]
// one job, one core: dispatched immediately, completion equals its cost
fn single_job_on_one_core() {
    let workload = test_workload(
        vec![test_job(1, (0, 0), (3, 5), 10, 0)],
        vec![test_group("P0", 0, 1)],
    );
    let engine =
        ReachabilityEngine::construct(workload, EarliestDeadlineFirst, AnalysisConfig::default());

    assert!(engine.is_schedulable());
    assert!(!engine.aborted());
    assert!(!engine.timed_out());
    assert_eq!(completion(&engine, 1), time_interval(3, 5));
    assert!(engine.num_states() <= 4);
}

#[test]
// two jobs under EDF on one core: the later deadline waits for the earlier
fn two_jobs_earliest_deadline_first() {
    let workload = test_workload(
        vec![
            test_job(1, (0, 0), (2, 3), 5, 0),
            test_job(2, (0, 0), (2, 3), 9, 0),
        ],
        vec![test_group("P0", 0, 1)],
    );
    let engine =
        ReachabilityEngine::construct(workload, EarliestDeadlineFirst, AnalysisConfig::default());

    assert!(engine.is_schedulable());
    assert_eq!(completion(&engine, 1), time_interval(2, 3));
    assert_eq!(completion(&engine, 2), time_interval(4, 6));
}

#[test]
// a job whose best case already overruns its deadline aborts the analysis
fn certain_deadline_miss_aborts() {
    let workload = test_workload(
        vec![test_job(1, (0, 0), (6, 8), 5, 0)],
        vec![test_group("P0", 0, 1)],
    );
    let engine =
        ReachabilityEngine::construct(workload, EarliestDeadlineFirst, AnalysisConfig::default());

    assert!(!engine.is_schedulable());
    assert!(engine.aborted());
    assert!(!engine.timed_out());
}

#[test]
// release uncertainty branches over the powerset of possibly-ready jobs
fn arrival_uncertainty_branches() {
    let certain = test_workload(
        vec![
            test_job(1, (0, 0), (2, 3), 5, 0),
            test_job(2, (0, 0), (2, 3), 9, 0),
        ],
        vec![test_group("P0", 0, 1)],
    );
    let uncertain = test_workload(
        vec![
            test_job(1, (0, 2), (1, 1), 4, 0),
            test_job(2, (0, 0), (1, 1), 3, 0),
        ],
        vec![test_group("P0", 0, 1)],
    );

    let baseline =
        ReachabilityEngine::construct(certain, EarliestDeadlineFirst, AnalysisConfig::default());
    let engine =
        ReachabilityEngine::construct(uncertain, EarliestDeadlineFirst, AnalysisConfig::default());

    assert!(engine.is_schedulable());
    assert_eq!(completion(&engine, 2), time_interval(1, 1));
    assert_eq!(completion(&engine, 1), time_interval(2, 3));
    assert!(engine.num_states() >= baseline.num_states());
}

#[test]
// merging plus peeking must beat the naive exploration on state count
fn merging_beats_naive_exploration() {
    let model = SystemModel {
        processors: vec![test_group("P0", 0, 1)],
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
                cost: Interval::new(Time::ticks(1), Time::ticks(2)),
                deadline: Time::ticks(20),
                processor_group: 0,
                priority: Time::zero(),
            },
        ],
        jobs: Vec::new(),
        events: test_events(),
    };
    let workload = model.expand().unwrap();

    let merged = ReachabilityEngine::construct(
        workload.clone(),
        EarliestDeadlineFirst,
        AnalysisConfig::default(),
    );
    let naive = ReachabilityEngine::construct_naively(
        workload,
        EarliestDeadlineFirst,
        AnalysisConfig::default(),
    );

    assert!(merged.is_schedulable());
    assert!(naive.is_schedulable());
    assert!(merged.num_states() < naive.num_states());
    for engine in [&merged, &naive] {
        for (id, finish) in engine.completion_times() {
            let deadline = match id.task {
                1 => Time::ticks(10 * id.job as i64 + 10),
                _ => Time::ticks(20),
            };
            assert!(finish.until() <= deadline, "{id} finishes at {finish}");
        }
    }
}

#[test]
// jobs pinned to different groups proceed without waiting on each other
fn independent_groups_dispatch_in_parallel() {
    let workload = test_workload(
        vec![
            test_job(1, (0, 0), (2, 3), 5, 0),
            test_job(2, (0, 0), (1, 2), 9, 1),
        ],
        vec![test_group("P0", 0, 1), test_group("P1", 1, 1)],
    );
    let engine =
        ReachabilityEngine::construct(workload, EarliestDeadlineFirst, AnalysisConfig::default());

    assert!(engine.is_schedulable());
    assert_eq!(completion(&engine, 1), time_interval(2, 3));
    assert_eq!(completion(&engine, 2), time_interval(1, 2));
    assert_eq!(engine.num_states(), 3);
}

#[test]
// an exhausted wall-clock budget stops the exploration
fn timeout_aborts_the_run() {
    let workload = test_workload(
        vec![
            test_job(1, (0, 0), (2, 3), 50, 0),
            test_job(2, (0, 0), (2, 3), 90, 0),
        ],
        vec![test_group("P0", 0, 1)],
    );
    let config = AnalysisConfig { timeout_secs: 1e-9, ..AnalysisConfig::default() };
    let engine = ReachabilityEngine::construct(workload, EarliestDeadlineFirst, config);

    assert!(!engine.is_schedulable());
    assert!(engine.aborted());
    assert!(engine.timed_out());
}

#[test]
// identical inputs explore identical state spaces
fn exploration_is_deterministic() {
    let build = || {
        test_workload(
            vec![
                test_job(1, (0, 2), (1, 2), 8, 0),
                test_job(2, (0, 0), (1, 2), 6, 0),
                test_job(3, (1, 3), (1, 1), 9, 0),
            ],
            vec![test_group("P0", 0, 1)],
        )
    };

    let first =
        ReachabilityEngine::construct(build(), EarliestDeadlineFirst, AnalysisConfig::default());
    let second =
        ReachabilityEngine::construct(build(), EarliestDeadlineFirst, AnalysisConfig::default());

    assert_eq!(first.num_states(), second.num_states());
    assert_eq!(first.completion_times(), second.completion_times());
    assert_eq!(first.is_schedulable(), second.is_schedulable());
}

#[test]
// the retained graph keeps interior nodes for the DOT rendering
fn graph_retention_keeps_the_whole_structure() {
    let workload = test_workload(
        vec![
            test_job(1, (0, 0), (2, 3), 5, 0),
            test_job(2, (0, 0), (2, 3), 9, 0),
        ],
        vec![test_group("P0", 0, 1)],
    );
    let config = AnalysisConfig { retain_graph: true, ..AnalysisConfig::default() };
    let engine = ReachabilityEngine::construct(workload, EarliestDeadlineFirst, config);

    assert!(engine.is_schedulable());
    assert_eq!(engine.graph().node_count() as u64, engine.num_states());

    let mut rendered = Vec::new();
    engine.write_graph(&mut rendered).unwrap();
    let rendered = String::from_utf8(rendered).unwrap();
    assert!(rendered.contains("T1S0"));
    assert!(rendered.contains("digraph G {"));
}

#[test]
// the policy oracle sees the enumerated resource vectors
fn resource_vectors_reach_the_policy() {
    struct CountingPolicy {
        calls: AtomicU64,
    }

    impl SchedulingPolicy for CountingPolicy {
        fn name(&self) -> &str {
            "counting"
        }

        fn select(
            &self,
            queue: &mut ReadyQueue<'_>,
            available: &HashMap<String, u32>,
            now: Time,
        ) -> Option<JobId> {
            assert!(available.contains_key("P0"));
            self.calls.fetch_add(1, Ordering::Relaxed);
            queue.sort(SortKey::Deadline, now);
            queue.front()
        }
    }

    let workload = test_workload(
        vec![test_job(1, (0, 0), (3, 5), 10, 0)],
        vec![test_group("P0", 0, 1)],
    );
    let policy = CountingPolicy { calls: AtomicU64::new(0) };
    let engine = ReachabilityEngine::construct(workload, policy, AnalysisConfig::default());

    assert!(engine.is_schedulable());
    assert!(engine.policy.calls.load(Ordering::Relaxed) > 0);
}

#[test]
fn powerset_enumerates_all_subsets() {
    let ids: Vec<JobId> = (1..=3).map(|task| JobId { task, job: 0 }).collect();
    let subsets = powerset(&ids);
    assert_eq!(subsets.len(), 8);
    assert_eq!(subsets[0], Vec::<JobId>::new());
    assert!(subsets.contains(&vec![ids[0], ids[2]]));
    assert_eq!(subsets[7], ids);
}

#[test]
fn resource_combinations_are_a_cartesian_product() {
    let ranges = vec![
        ("P0".to_owned(), 1, 2),
        ("P1".to_owned(), 0, 1),
    ];
    let maps = all_resource_combinations(&ranges);
    assert_eq!(maps.len(), 4);
    assert_eq!(maps[0]["P0"], 1);
    assert_eq!(maps[0]["P1"], 0);
    assert_eq!(maps[3]["P0"], 2);
    assert_eq!(maps[3]["P1"], 1);
}

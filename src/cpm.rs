//! CPM (Critical Path Method) calculation engine
//!
//! Implements topological ordering, forward pass, backward pass, float
//! calculation and critical path marking over calendar days, plus resource
//! loading diagnostics and Monte Carlo duration simulation on top of the
//! same passes.

use crate::config::{MonteCarloConfig, ResourceConfig};
use crate::date_utils::{add_days, day_range, days_between};
use crate::types::{
    BrokenDependency, CpmResult, DurationBucket, MonteCarloResult, ResourceConflict,
    ResourceLevelingResult, Task, TaskSchedule,
};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

/// Float below this is treated as zero when durations are fractional
const FLOAT_EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Dependency graph resolved to task indices.
///
/// Built once per call. Dangling dependency ids are dropped, and any edge
/// that would close a cycle is dropped too and remembered in `broken`.
pub struct ScheduleGraph {
    /// Predecessors first
    order: Vec<usize>,
    predecessors: Vec<Vec<usize>>,
    successors: Vec<Vec<usize>>,
    /// (task, predecessor) pairs removed to break cycles
    broken: Vec<(usize, usize)>,
}

impl ScheduleGraph {
    pub fn build(tasks: &[Task]) -> Self {
        let mut index_map = HashMap::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            // First occurrence wins on duplicate ids
            index_map.entry(task.id.clone()).or_insert(i);
        }

        let raw_predecessors: Vec<Vec<usize>> = tasks
            .iter()
            .map(|task| {
                let mut seen = HashSet::new();
                task.dependencies
                    .iter()
                    .filter_map(|dep| index_map.get(&dep.id).copied())
                    .filter(|p| seen.insert(*p))
                    .collect()
            })
            .collect();

        let mut marks = vec![Mark::Unvisited; tasks.len()];
        let mut order = Vec::with_capacity(tasks.len());
        let mut broken = Vec::new();
        for node in 0..tasks.len() {
            visit(node, &raw_predecessors, &mut marks, &mut order, &mut broken);
        }

        let predecessors: Vec<Vec<usize>> = raw_predecessors
            .into_iter()
            .enumerate()
            .map(|(node, preds)| {
                preds
                    .into_iter()
                    .filter(|p| !broken.contains(&(node, *p)))
                    .collect()
            })
            .collect();

        let mut successors = vec![Vec::new(); tasks.len()];
        for (node, preds) in predecessors.iter().enumerate() {
            for &p in preds {
                successors[p].push(node);
            }
        }

        if !broken.is_empty() {
            tracing::warn!(
                edges = broken.len(),
                "dependency cycle detected; dropping cycle-closing edges"
            );
        }

        Self {
            order,
            predecessors,
            successors,
            broken,
        }
    }

    pub fn len(&self) -> usize {
        self.predecessors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predecessors.is_empty()
    }

    /// Task indices in topological order
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn predecessors(&self, index: usize) -> &[usize] {
        self.predecessors.get(index).map_or(&[], |v| v.as_slice())
    }

    pub fn successors(&self, index: usize) -> &[usize] {
        self.successors.get(index).map_or(&[], |v| v.as_slice())
    }

    /// Edges dropped to break cycles, as (task, predecessor)
    pub fn broken_edges(&self) -> &[(usize, usize)] {
        &self.broken
    }
}

/// Depth-first post-order visit: predecessors land in `order` before `node`.
/// Walks an explicit stack so long chains cannot exhaust the call stack.
fn visit(
    root: usize,
    predecessors: &[Vec<usize>],
    marks: &mut [Mark],
    order: &mut Vec<usize>,
    broken: &mut Vec<(usize, usize)>,
) {
    if marks[root] != Mark::Unvisited {
        return;
    }
    marks[root] = Mark::Visiting;
    // (node, next predecessor to look at)
    let mut stack = vec![(root, 0usize)];

    while let Some(top) = stack.last_mut() {
        let (node, next) = *top;
        match predecessors[node].get(next) {
            Some(&pred) => {
                top.1 += 1;
                match marks[pred] {
                    Mark::Unvisited => {
                        marks[pred] = Mark::Visiting;
                        stack.push((pred, 0));
                    }
                    Mark::Visiting => broken.push((node, pred)),
                    Mark::Done => {}
                }
            }
            None => {
                marks[node] = Mark::Done;
                order.push(node);
                stack.pop();
            }
        }
    }
}

/// Raw pass output in day offsets from the earliest declared start
struct PassResult {
    early_start: Vec<f64>,
    early_finish: Vec<f64>,
    late_start: Vec<f64>,
    late_finish: Vec<f64>,
    project_start: f64,
    project_end: f64,
}

impl PassResult {
    fn total_float(&self, index: usize) -> f64 {
        self.late_start[index] - self.early_start[index]
    }

    fn duration(&self) -> f64 {
        self.project_end - self.project_start
    }
}

/// Forward pass then backward pass over `graph`.
fn run_pass(graph: &ScheduleGraph, start_offsets: &[f64], durations: &[f64]) -> PassResult {
    let n = graph.len();
    let mut early_start = vec![0.0; n];
    let mut early_finish = vec![0.0; n];

    // Forward pass - ES is the later of the declared start and every predecessor's EF
    for &node in graph.order() {
        let es = graph
            .predecessors(node)
            .iter()
            .map(|&p| early_finish[p])
            .fold(start_offsets[node], f64::max);
        early_start[node] = es;
        early_finish[node] = es + durations[node];
    }

    let project_end = early_finish.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let project_end = if project_end.is_finite() { project_end } else { 0.0 };
    let project_start = early_start.iter().copied().fold(f64::INFINITY, f64::min);
    let project_start = if project_start.is_finite() { project_start } else { 0.0 };

    // Backward pass - LF is the project end, or the earliest successor LS
    let mut late_start = vec![0.0; n];
    let mut late_finish = vec![0.0; n];
    for &node in graph.order().iter().rev() {
        let lf = graph
            .successors(node)
            .iter()
            .map(|&s| late_start[s])
            .reduce(f64::min)
            .unwrap_or(project_end);
        late_finish[node] = lf;
        late_start[node] = lf - durations[node];
    }

    PassResult {
        early_start,
        early_finish,
        late_start,
        late_finish,
        project_start,
        project_end,
    }
}

fn project_origin(tasks: &[Task]) -> Option<NaiveDate> {
    tasks.iter().map(|t| t.start_date).min()
}

fn start_offsets(tasks: &[Task], origin: NaiveDate) -> Vec<f64> {
    tasks
        .iter()
        .map(|t| days_between(origin, t.start_date) as f64)
        .collect()
}

/// Main CPM calculation function
pub fn calculate_critical_path(tasks: &[Task]) -> CpmResult {
    let Some(origin) = project_origin(tasks) else {
        return CpmResult::default();
    };

    let graph = ScheduleGraph::build(tasks);
    let durations: Vec<f64> = tasks.iter().map(|t| f64::from(t.duration)).collect();
    let pass = run_pass(&graph, &start_offsets(tasks, origin), &durations);

    let to_date = |offset: f64| add_days(origin, offset.round() as i64);

    let schedules: Vec<TaskSchedule> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let float = pass.total_float(i).round() as i64;
            // Free float: slack before the earliest successor must move
            let free_float = graph
                .successors(i)
                .iter()
                .map(|&s| pass.early_start[s] - pass.early_finish[i])
                .reduce(f64::min)
                .map_or(float, |ff| (ff.round() as i64).clamp(0, float.max(0)));
            TaskSchedule {
                task_id: task.id.clone(),
                early_start: to_date(pass.early_start[i]),
                early_finish: to_date(pass.early_finish[i]),
                late_start: to_date(pass.late_start[i]),
                late_finish: to_date(pass.late_finish[i]),
                float,
                free_float,
                is_critical: float == 0,
            }
        })
        .collect();

    let critical_path: Vec<String> = graph
        .order()
        .iter()
        .filter(|&&i| schedules[i].is_critical)
        .map(|&i| tasks[i].id.clone())
        .collect();

    let broken_dependencies = graph
        .broken_edges()
        .iter()
        .map(|&(task, pred)| BrokenDependency {
            task_id: tasks[task].id.clone(),
            predecessor_id: tasks[pred].id.clone(),
        })
        .collect();

    let total_project_duration = pass.duration().round() as i64;
    tracing::debug!(
        tasks = tasks.len(),
        critical = critical_path.len(),
        duration = total_project_duration,
        "critical path calculated"
    );

    CpmResult {
        schedules,
        critical_path,
        total_project_duration,
        project_start: Some(to_date(pass.project_start)),
        project_end: Some(to_date(pass.project_end)),
        broken_dependencies,
    }
}

/// Depth of a task in the parent hierarchy (0 = root).
/// Parent cycles stop at the first repeated task.
fn get_depth(task_id: &str, by_id: &HashMap<&str, &Task>) -> i32 {
    let mut depth = 0;
    let mut seen = HashSet::new();
    let mut current = by_id.get(task_id).and_then(|t| t.parent_id.as_deref());
    while let Some(parent_id) = current {
        if !seen.insert(parent_id) {
            break;
        }
        let Some(parent) = by_id.get(parent_id) else {
            break;
        };
        depth += 1;
        current = parent.parent_id.as_deref();
    }
    depth
}

/// Copy of `tasks` with the derived `is_critical` and `level` fields refreshed
pub fn apply_schedule(tasks: &[Task], result: &CpmResult) -> Vec<Task> {
    let mut by_id: HashMap<&str, &Task> = HashMap::with_capacity(tasks.len());
    for task in tasks {
        by_id.entry(task.id.as_str()).or_insert(task);
    }
    tasks
        .iter()
        .map(|task| {
            let mut task = task.clone();
            task.is_critical = result.schedule(&task.id).is_some_and(|s| s.is_critical);
            task.level = get_depth(&task.id, &by_id);
            task
        })
        .collect()
}

/// Per-resource daily loading. Each task contributes `100 / duration`
/// percent to every resource it uses on each of its days.
pub fn optimize_resource_leveling(tasks: &[Task], config: &ResourceConfig) -> ResourceLevelingResult {
    let mut utilization: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();

    for task in tasks.iter().filter(|t| t.duration > 0) {
        let daily_load = 100.0 / f64::from(task.duration);
        for resource_id in &task.resources {
            let days = utilization.entry(resource_id.clone()).or_default();
            for day in day_range(task.start_date, i64::from(task.duration)) {
                *days.entry(day).or_insert(0.0) += daily_load;
            }
        }
    }

    let threshold = config.overallocation_threshold + FLOAT_EPSILON;
    let mut conflicts = Vec::new();
    let mut peak_utilization = BTreeMap::new();
    let mut recommendations = Vec::new();

    for (resource_id, days) in &utilization {
        let peak = days.values().copied().fold(0.0, f64::max);
        peak_utilization.insert(resource_id.clone(), peak);

        let overallocated: Vec<ResourceConflict> = days
            .iter()
            .filter(|(_, load)| **load > threshold)
            .map(|(date, load)| ResourceConflict {
                resource_id: resource_id.clone(),
                date: *date,
                utilization: *load,
            })
            .collect();

        if !overallocated.is_empty() {
            recommendations.push(format!(
                "Resource {} is overallocated on {} day(s). Consider rescheduling tasks or assigning additional resources.",
                resource_id,
                overallocated.len()
            ));
            conflicts.extend(overallocated);
        }
    }

    tracing::debug!(
        resources = utilization.len(),
        conflicts = conflicts.len(),
        "resource loading calculated"
    );

    ResourceLevelingResult {
        optimized_tasks: tasks.to_vec(),
        resource_utilization: utilization,
        peak_utilization,
        conflicts,
        recommendations,
    }
}

/// Inverse-CDF sample from a triangular distribution
pub fn sample_triangular<R: Rng + ?Sized>(rng: &mut R, min: f64, mode: f64, max: f64) -> f64 {
    if max - min <= f64::EPSILON {
        return mode;
    }
    let u: f64 = rng.random();
    let c = (mode - min) / (max - min);
    if u < c {
        min + (u * (max - min) * (mode - min)).sqrt()
    } else {
        max - ((1.0 - u) * (max - min) * (max - mode)).sqrt()
    }
}

/// Monte Carlo schedule risk with default sampling factors
pub fn run_monte_carlo_simulation(tasks: &[Task], iterations: usize) -> MonteCarloResult {
    let config = MonteCarloConfig {
        iterations,
        ..MonteCarloConfig::default()
    };
    run_monte_carlo_with_config(tasks, &config, None)
}

/// Monte Carlo schedule risk, seeded from the config when a seed is set.
/// Setting `cancel` stops the run between iterations.
pub fn run_monte_carlo_with_config(
    tasks: &[Task],
    config: &MonteCarloConfig,
    cancel: Option<&AtomicBool>,
) -> MonteCarloResult {
    match config.seed {
        Some(seed) => run_monte_carlo_with_rng(tasks, config, &mut StdRng::seed_from_u64(seed), cancel),
        None => run_monte_carlo_with_rng(tasks, config, &mut rand::rng(), cancel),
    }
}

pub fn run_monte_carlo_with_rng<R: Rng + ?Sized>(
    tasks: &[Task],
    config: &MonteCarloConfig,
    rng: &mut R,
    cancel: Option<&AtomicBool>,
) -> MonteCarloResult {
    let Some(origin) = project_origin(tasks) else {
        return MonteCarloResult::default();
    };

    let graph = ScheduleGraph::build(tasks);
    let offsets = start_offsets(tasks, origin);
    let mut durations = vec![0.0; tasks.len()];
    let mut samples = Vec::with_capacity(config.iterations);
    let mut critical_counts = vec![0usize; tasks.len()];

    for iteration in 0..config.iterations {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            tracing::warn!(iteration, "monte carlo simulation cancelled");
            break;
        }

        for (sampled, task) in durations.iter_mut().zip(tasks) {
            let mode = f64::from(task.duration);
            *sampled = sample_triangular(
                rng,
                mode * config.optimistic_factor,
                mode,
                mode * config.pessimistic_factor,
            );
        }

        let pass = run_pass(&graph, &offsets, &durations);
        for (i, count) in critical_counts.iter_mut().enumerate() {
            if pass.total_float(i).abs() < FLOAT_EPSILON {
                *count += 1;
            }
        }
        samples.push(pass.duration());
    }

    if samples.is_empty() {
        return MonteCarloResult::default();
    }

    samples.sort_by(f64::total_cmp);
    let n = samples.len();
    let mean = samples.iter().sum::<f64>() / n as f64;
    let variance = samples.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n as f64;

    let percentiles = config
        .percentiles
        .iter()
        .map(|&p| {
            let index = ((n as f64 * p).floor() as usize).min(n - 1);
            (format!("p{}", (p * 100.0).round()), samples[index])
        })
        .collect();

    let mut histogram: BTreeMap<i64, usize> = BTreeMap::new();
    for duration in &samples {
        *histogram.entry(duration.round() as i64).or_insert(0) += 1;
    }
    let probability_distribution = histogram
        .into_iter()
        .map(|(duration, count)| DurationBucket {
            duration: duration as f64,
            probability: count as f64 / n as f64,
        })
        .collect();

    let criticality_index = tasks
        .iter()
        .zip(&critical_counts)
        .map(|(task, &count)| (task.id.clone(), count as f64 / n as f64))
        .collect();

    tracing::debug!(iterations = n, mean, "monte carlo simulation complete");

    MonteCarloResult {
        mean_duration: mean,
        standard_deviation: variance.sqrt(),
        percentiles,
        probability_distribution,
        criticality_index,
        completed_iterations: n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dependency;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn task(id: &str, duration: i32, deps: &[&str]) -> Task {
        let mut t = Task::new(id, format!("Task {id}"), d("2024-03-04"), duration);
        t.dependencies = deps.iter().map(|p| Dependency::on(*p)).collect();
        t
    }

    fn abc() -> Vec<Task> {
        vec![task("A", 5, &[]), task("B", 3, &["A"]), task("C", 4, &["A"])]
    }

    #[test]
    fn three_task_example() {
        let result = calculate_critical_path(&abc());
        assert_eq!(result.total_project_duration, 9);
        assert_eq!(result.critical_path, vec!["A".to_string(), "C".to_string()]);
        assert_eq!(result.schedule("B").unwrap().float, 1);
        assert_eq!(result.schedule("A").unwrap().float, 0);
        assert_eq!(result.project_end, Some(d("2024-03-13")));
    }

    #[test]
    fn early_finish_is_start_plus_duration() {
        let tasks = abc();
        let result = calculate_critical_path(&tasks);
        for (task, schedule) in tasks.iter().zip(&result.schedules) {
            assert_eq!(
                days_between(schedule.early_start, schedule.early_finish),
                i64::from(task.duration)
            );
        }
        let c = result.schedule("C").unwrap();
        assert_eq!(c.early_start, d("2024-03-09"));
        assert_eq!(c.late_finish, d("2024-03-13"));
    }

    #[test]
    fn single_task_has_zero_float() {
        let result = calculate_critical_path(&[task("solo", 6, &[])]);
        assert_eq!(result.schedules[0].float, 0);
        assert_eq!(result.total_project_duration, 6);
        assert_eq!(result.critical_path, vec!["solo".to_string()]);
    }

    #[test]
    fn declared_start_later_than_predecessor_wins() {
        let mut tasks = abc();
        tasks[1].start_date = d("2024-03-15");
        let result = calculate_critical_path(&tasks);
        let b = result.schedule("B").unwrap();
        assert_eq!(b.early_start, d("2024-03-15"));
        assert_eq!(result.total_project_duration, 14);
        assert_eq!(result.critical_path, vec!["B".to_string()]);
        // A and C are no longer driving the end date
        assert_eq!(result.schedule("C").unwrap().float, 5);
    }

    #[test]
    fn dangling_dependencies_are_ignored() {
        let tasks = vec![task("A", 2, &["ghost"]), task("B", 3, &["A", "missing"])];
        let result = calculate_critical_path(&tasks);
        assert_eq!(result.total_project_duration, 5);
        assert!(result.broken_dependencies.is_empty());
    }

    #[test]
    fn cycles_are_broken_not_fatal() {
        let tasks = vec![task("A", 2, &["C"]), task("B", 3, &["A"]), task("C", 1, &["B"])];
        let result = calculate_critical_path(&tasks);
        assert_eq!(result.broken_dependencies.len(), 1);
        assert_eq!(result.total_project_duration, 6);
        assert!(result.schedules.iter().all(|s| s.float >= 0));

        let self_loop = calculate_critical_path(&[task("X", 4, &["X"])]);
        assert_eq!(self_loop.total_project_duration, 4);
        assert_eq!(self_loop.broken_dependencies[0].predecessor_id, "X");
    }

    #[test]
    fn free_float_counts_slack_to_successors() {
        let tasks = vec![
            task("A", 2, &[]),
            task("B", 5, &[]),
            task("C", 1, &["A", "B"]),
        ];
        let result = calculate_critical_path(&tasks);
        let a = result.schedule("A").unwrap();
        assert_eq!(a.float, 3);
        assert_eq!(a.free_float, 3);
        assert_eq!(result.schedule("C").unwrap().free_float, 0);
    }

    #[test]
    fn empty_task_set_yields_empty_result() {
        let result = calculate_critical_path(&[]);
        assert_eq!(result, CpmResult::default());
        assert_eq!(run_monte_carlo_simulation(&[], 10).completed_iterations, 0);
    }

    #[test]
    fn apply_schedule_sets_derived_fields() {
        let mut tasks = abc();
        tasks[2].parent_id = Some("A".to_string());
        let result = calculate_critical_path(&tasks);
        let applied = apply_schedule(&tasks, &result);
        assert!(applied[0].is_critical);
        assert!(!applied[1].is_critical);
        assert_eq!(applied[2].level, 1);
        assert_eq!(applied[0].level, 0);
    }

    #[test]
    fn overlapping_tasks_overallocate_a_resource() {
        let mut a = task("A", 4, &[]);
        a.resources = vec!["crane".to_string()];
        let mut b = task("B", 2, &[]);
        b.start_date = d("2024-03-06");
        b.resources = vec!["crane".to_string(), "crew".to_string()];

        let result = optimize_resource_leveling(&[a, b], &ResourceConfig::default());
        let crane = &result.resource_utilization["crane"];
        assert_eq!(crane[&d("2024-03-04")], 25.0);
        assert_eq!(crane[&d("2024-03-06")], 75.0);
        assert!(result.conflicts.is_empty());

        let mut solo = task("S", 1, &[]);
        solo.resources = vec!["crane".to_string()];
        let mut clash = task("T", 1, &[]);
        clash.resources = vec!["crane".to_string()];
        let result = optimize_resource_leveling(&[solo, clash], &ResourceConfig::default());
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.peak_utilization["crane"], 200.0);
        assert!(result.recommendations[0].contains("crane"));
        assert!(result.recommendations[0].contains("1 day(s)"));
        assert_eq!(result.optimized_tasks.len(), 2);
    }

    #[test]
    fn full_utilization_is_not_a_conflict() {
        let tasks: Vec<Task> = (0..3)
            .map(|i| {
                let mut t = task(&format!("T{i}"), 3, &[]);
                t.resources = vec!["crew".to_string()];
                t
            })
            .collect();
        let result = optimize_resource_leveling(&tasks, &ResourceConfig::default());
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn triangular_samples_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let x = sample_triangular(&mut rng, 8.0, 10.0, 15.0);
            assert!((8.0..=15.0).contains(&x));
        }
        assert_eq!(sample_triangular(&mut rng, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn single_iteration_has_no_spread() {
        let result = run_monte_carlo_simulation(&abc(), 1);
        assert_eq!(result.completed_iterations, 1);
        assert_eq!(result.standard_deviation, 0.0);
        assert_eq!(result.probability_distribution.len(), 1);
        assert_eq!(result.probability_distribution[0].probability, 1.0);
        assert_eq!(result.percentiles["p10"], result.percentiles["p90"]);
    }

    #[test]
    fn simulation_is_reproducible_with_a_seed() {
        let config = MonteCarloConfig {
            iterations: 200,
            seed: Some(7),
            ..MonteCarloConfig::default()
        };
        let first = run_monte_carlo_with_config(&abc(), &config, None);
        let second = run_monte_carlo_with_config(&abc(), &config, None);
        assert_eq!(first, second);

        // Bounds follow the sampling factors: 0.8 x 9 to 1.5 x 9
        assert!(first.percentiles["p10"] >= 7.2 - 1e-9);
        assert!(first.percentiles["p90"] <= 13.5 + 1e-9);
        assert!(first.percentiles["p10"] <= first.percentiles["p50"]);
        assert!(first.percentiles["p50"] <= first.percentiles["p90"]);
        assert_eq!(first.criticality_index["A"], 1.0);
        let total: f64 = first.probability_distribution.iter().map(|b| b.probability).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cancelled_simulation_stops_early() {
        let cancel = AtomicBool::new(true);
        let result = run_monte_carlo_with_config(&abc(), &MonteCarloConfig::default(), Some(&cancel));
        assert_eq!(result.completed_iterations, 0);
        assert_eq!(result.mean_duration, 0.0);
    }

    /// Replays fixed `next_u64` values, so `random::<f64>()` yields `(x >> 11) / 2^53`
    struct SequenceRng {
        values: Vec<u64>,
        next: usize,
    }

    impl SequenceRng {
        fn new(values: Vec<u64>) -> Self {
            Self { values, next: 0 }
        }

        /// Uniform draws that map to `k / 10` for k in 0..10
        fn tenths() -> Self {
            Self::new((0..10u64).map(|k| (k * (1u64 << 53) / 10) << 11).collect())
        }
    }

    impl rand::RngCore for SequenceRng {
        fn next_u32(&mut self) -> u32 {
            self.next_u64() as u32
        }

        fn next_u64(&mut self) -> u64 {
            let value = self.values[self.next % self.values.len()];
            self.next += 1;
            value
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            rand::rand_core::impls::fill_bytes_via_next(self, dst)
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn triangular_inverse_cdf_is_exact() {
        // u = 0 lands on the minimum, u = c on the mode
        let mut rng = SequenceRng::new(vec![0, 1 << 63]);
        assert_eq!(sample_triangular(&mut rng, 0.0, 5.0, 10.0), 0.0);
        assert_eq!(sample_triangular(&mut rng, 0.0, 5.0, 10.0), 5.0);

        // Below c: min + sqrt(u (max - min)(mode - min))
        let mut rng = SequenceRng::new(vec![1 << 62]);
        assert!(close(sample_triangular(&mut rng, 8.0, 10.0, 15.0), 8.0 + 3.5f64.sqrt()));

        // Above c: max - sqrt((1 - u)(max - min)(max - mode))
        let mut rng = SequenceRng::new(vec![3 << 62]);
        assert!(close(sample_triangular(&mut rng, 8.0, 10.0, 15.0), 15.0 - 8.75f64.sqrt()));

        let mut rng = SequenceRng::new(vec![u64::MAX]);
        let top = sample_triangular(&mut rng, 8.0, 10.0, 15.0);
        assert!(top < 15.0 && top > 15.0 - 1e-6);
    }

    #[test]
    fn percentiles_pick_sorted_samples_by_floor_index() {
        let config = MonteCarloConfig {
            iterations: 10,
            ..MonteCarloConfig::default()
        };
        let tasks = vec![task("A", 10, &[])];
        let result = run_monte_carlo_with_rng(&tasks, &config, &mut SequenceRng::tenths(), None);

        // Durations for u = 0.0, 0.1, ..., 0.9 on (8, 10, 15)
        let expected = [
            8.0,
            9.183215956619923,
            9.673320053068151,
            10.050252531694166,
            10.417424305044161,
            10.816699867329621,
            11.25834261322606,
            11.75962965079607,
            12.35424868893541,
            13.12917130661303,
        ];
        assert_eq!(result.completed_iterations, 10);
        assert!(close(result.percentiles["p10"], expected[1]));
        assert!(close(result.percentiles["p25"], expected[2]));
        assert!(close(result.percentiles["p50"], expected[5]));
        assert!(close(result.percentiles["p75"], expected[7]));
        assert!(close(result.percentiles["p90"], expected[9]));

        // Population standard deviation
        let mean = expected.iter().sum::<f64>() / 10.0;
        let sd = (expected.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 10.0).sqrt();
        assert!(close(result.mean_duration, 10.66423049733266));
        assert!(close(result.mean_duration, mean));
        assert!(close(result.standard_deviation, sd));
        assert!(close(result.standard_deviation, 1.456692282596601));
    }

    #[test]
    fn long_dependency_chain_is_scheduled() {
        let tasks: Vec<Task> = (0..100_000)
            .map(|i| {
                let mut t = Task::new(format!("t{i}"), "Step", d("2024-03-04"), 1);
                if i > 0 {
                    t.dependencies = vec![Dependency::on(format!("t{}", i - 1))];
                }
                t
            })
            .collect();

        let result = calculate_critical_path(&tasks);
        assert!(result.broken_dependencies.is_empty());
        assert_eq!(result.total_project_duration, 100_000);
        assert_eq!(result.critical_path.len(), 100_000);
        assert_eq!(result.critical_path[0], "t0");
    }

    #[test]
    fn long_cycle_is_broken_once() {
        let n: i32 = 50_000;
        let tasks: Vec<Task> = (0..n)
            .map(|i| {
                let mut t = task(&format!("t{i}"), 1, &[]);
                t.dependencies = vec![Dependency::on(format!("t{}", (i + 1) % n))];
                t
            })
            .collect();
        let result = calculate_critical_path(&tasks);
        assert_eq!(result.broken_dependencies.len(), 1);
        assert_eq!(result.total_project_duration, i64::from(n));
    }

    #[test]
    fn duplicate_ids_resolve_to_the_first_task() {
        let mut first = task("X", 2, &[]);
        first.parent_id = Some("P".to_string());
        let tasks = vec![task("P", 1, &[]), first, task("X", 2, &[])];
        let result = calculate_critical_path(&tasks);
        let applied = apply_schedule(&tasks, &result);
        assert_eq!(applied[1].level, 1);
        assert_eq!(applied[2].level, 1);
    }
}

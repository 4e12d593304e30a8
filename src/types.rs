//! Type definitions for the project analytics engine
//!
//! These types mirror the dashboard's TypeScript project model.
//! IMPORTANT: Field names use camelCase via serde rename to match JS

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Dependency link type. Modeled for the host, not consumed by CPM.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkType {
    #[default]
    #[serde(rename = "FS")]
    FinishToStart,
    #[serde(rename = "SS")]
    StartToStart,
    #[serde(rename = "FF")]
    FinishToFinish,
    #[serde(rename = "SF")]
    StartToFinish,
}

/// Dependency link between tasks
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    /// Predecessor task ID
    pub id: String,

    #[serde(rename = "type", default)]
    pub link_type: LinkType,

    /// Lag in days (can be negative)
    #[serde(default)]
    pub lag: i32,
}

impl Dependency {
    pub fn on(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            link_type: LinkType::FinishToStart,
            lag: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Done,
    Late,
}

/// Task entity - the atomic unit of scheduling
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    // === Identity & Hierarchy ===
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub parent_id: Option<String>,

    /// Hierarchy level. Calculated field - defaults to 0 if missing.
    #[serde(default)]
    pub level: i32,

    // === Scheduling ===
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    /// Whole calendar days. Authoritative for CPM: EF = ES + duration.
    pub duration: i32,

    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    #[serde(default)]
    pub resources: Vec<String>,

    // === Status ===
    /// Percent complete, 0-100
    #[serde(default)]
    pub progress: i32,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub is_milestone: bool,

    /// Derived by CPM, never authoritative
    #[serde(default)]
    pub is_critical: bool,

    // === Cost Tracking ===
    #[serde(default)]
    pub planned_value: Option<f64>,

    #[serde(default)]
    pub earned_value: Option<f64>,

    #[serde(default)]
    pub actual_cost: Option<f64>,

    /// Budgeted cost
    #[serde(default)]
    pub cost: Option<f64>,
}

impl Task {
    /// Minimal task spanning `duration` days from `start_date`.
    pub fn new(id: impl Into<String>, name: impl Into<String>, start_date: NaiveDate, duration: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: None,
            level: 0,
            start_date,
            end_date: crate::date_utils::add_days(start_date, i64::from(duration.max(0))),
            duration,
            dependencies: Vec::new(),
            resources: Vec::new(),
            progress: 0,
            status: TaskStatus::NotStarted,
            is_milestone: duration == 0,
            is_critical: false,
            planned_value: None,
            earned_value: None,
            actual_cost: None,
            cost: None,
        }
    }
}

// === CPM Results ===

/// Per-task CPM dates and float
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskSchedule {
    pub task_id: String,
    pub early_start: NaiveDate,
    pub early_finish: NaiveDate,
    pub late_start: NaiveDate,
    pub late_finish: NaiveDate,
    /// Total float: late start - early start, in days
    pub float: i64,
    pub free_float: i64,
    pub is_critical: bool,
}

/// A dependency edge dropped to break a cycle
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BrokenDependency {
    pub task_id: String,
    pub predecessor_id: String,
}

/// CPM calculation result. Pure derived view, never persisted.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CpmResult {
    /// Schedules in input task order
    pub schedules: Vec<TaskSchedule>,
    /// Zero-float task ids, in topological order
    pub critical_path: Vec<String>,
    pub total_project_duration: i64,
    pub project_start: Option<NaiveDate>,
    pub project_end: Option<NaiveDate>,
    #[serde(default)]
    pub broken_dependencies: Vec<BrokenDependency>,
}

impl CpmResult {
    pub fn schedule(&self, task_id: &str) -> Option<&TaskSchedule> {
        self.schedules.iter().find(|s| s.task_id == task_id)
    }
}

/// A day on which a resource is loaded past the overallocation threshold
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConflict {
    pub resource_id: String,
    pub date: NaiveDate,
    pub utilization: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLevelingResult {
    /// Input tasks, unmodified. Leveling is diagnostic only.
    pub optimized_tasks: Vec<Task>,
    /// resource id -> day -> utilization percent
    pub resource_utilization: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
    pub peak_utilization: BTreeMap<String, f64>,
    pub conflicts: Vec<ResourceConflict>,
    pub recommendations: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DurationBucket {
    /// Project duration rounded to whole days
    pub duration: f64,
    pub probability: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloResult {
    pub mean_duration: f64,
    pub standard_deviation: f64,
    /// Keyed by percentile label, e.g. "p10", "p50"
    pub percentiles: BTreeMap<String, f64>,
    pub probability_distribution: Vec<DurationBucket>,
    /// Share of iterations in which each task had zero float
    pub criticality_index: BTreeMap<String, f64>,
    pub completed_iterations: usize,
}

// === EVM Results ===

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvmMetrics {
    pub planned_value: f64,
    pub earned_value: f64,
    pub actual_cost: f64,
    pub budget_at_completion: f64,
    pub schedule_variance: f64,
    pub cost_variance: f64,
    pub schedule_performance_index: f64,
    pub cost_performance_index: f64,
    pub estimate_at_completion: f64,
    pub estimate_to_complete: f64,
    pub variance_at_completion: f64,
    pub to_complete_performance_index: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleStatus {
    Ahead,
    OnTrack,
    Behind,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VarianceReport {
    pub task_id: String,
    pub task_name: String,
    pub metrics: EvmMetrics,
    pub status: ScheduleStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionForecast {
    /// None when nothing has been earned yet and no rate can be derived
    pub estimated_completion_date: Option<NaiveDate>,
    /// Percent, clamped to 0..=100
    pub probability_on_time: f64,
    pub recommended_actions: Vec<String>,
}

// === WBS ===

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum WbsItemType {
    Project,
    Deliverable,
    Component,
    #[default]
    WorkPackage,
}

/// Work breakdown structure node. `children` is filled by `build_hierarchy`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WbsItem {
    pub id: String,
    /// Dotted code, e.g. "1.2.3"
    pub code: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub item_type: WbsItemType,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub responsible: Option<String>,
    #[serde(default)]
    pub estimated_cost: f64,
    #[serde(default)]
    pub actual_cost: f64,
    #[serde(default)]
    pub level: usize,
    #[serde(default)]
    pub children: Vec<WbsItem>,
}

impl WbsItem {
    pub fn new(id: impl Into<String>, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            name: name.into(),
            item_type: WbsItemType::WorkPackage,
            parent_id: None,
            responsible: None,
            estimated_cost: 0.0,
            actual_cost: 0.0,
            level: 0,
            children: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WbsStatistics {
    pub total_items: usize,
    pub items_by_level: BTreeMap<usize, usize>,
    pub items_by_type: BTreeMap<WbsItemType, usize>,
    pub total_estimated_cost: f64,
    pub total_actual_cost: f64,
    pub responsible_parties: BTreeSet<String>,
    /// Own estimated cost plus all descendants'
    pub branch_costs: BTreeMap<String, f64>,
}

// === Baselines ===

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BaselineStatus {
    Active,
    Archived,
}

/// Immutable snapshot of a task set. Only `status` changes after creation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BaselineSnapshot {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub tasks: Vec<Task>,
    pub total_budget: f64,
    /// max(end) - min(start), in days
    pub total_duration: i64,
    pub status: BaselineStatus,
    pub version: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleVariance {
    pub task_id: String,
    pub task_name: String,
    pub baseline_start: NaiveDate,
    pub baseline_end: NaiveDate,
    pub current_start: NaiveDate,
    pub current_end: NaiveDate,
    pub start_variance_days: i64,
    /// Positive means the task now finishes later than planned
    pub end_variance_days: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostVariance {
    pub task_id: String,
    pub task_name: String,
    pub baseline_cost: f64,
    pub current_cost: f64,
    pub variance: f64,
    /// Variance relative to baseline cost; 0 when baseline cost is 0
    pub variance_percent: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScopeChangeKind {
    Added,
    Removed,
    Modified,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScopeChange {
    pub task_id: String,
    pub task_name: String,
    #[serde(rename = "type")]
    pub kind: ScopeChangeKind,
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Yellow,
    Red,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BaselineComparison {
    pub schedule_variances: Vec<ScheduleVariance>,
    pub cost_variances: Vec<CostVariance>,
    pub scope_changes: Vec<ScopeChange>,
    pub overall_health: HealthStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BaselineReport {
    pub baseline: Option<BaselineSnapshot>,
    pub comparison: Option<BaselineComparison>,
    pub recommendations: Vec<String>,
}

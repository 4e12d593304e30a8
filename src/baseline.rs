//! Baseline manager
//!
//! Snapshots a task set as an immutable baseline, keeps at most one active
//! snapshot per project, and diffs current tasks against it.

use crate::config::HealthThresholds;
use crate::date_utils::days_between;
use crate::error::{AnalyticsError, Result};
use crate::store::BaselineStore;
use crate::types::{
    BaselineComparison, BaselineReport, BaselineSnapshot, BaselineStatus, CostVariance,
    HealthStatus, ScheduleVariance, ScopeChange, ScopeChangeKind, Task,
};
use chrono::Utc;
use std::collections::{HashMap, HashSet};

pub struct BaselineManager<S: BaselineStore> {
    store: S,
    thresholds: HealthThresholds,
}

impl<S: BaselineStore> BaselineManager<S> {
    pub fn new(store: S) -> Self {
        Self::with_thresholds(store, HealthThresholds::default())
    }

    pub fn with_thresholds(store: S, thresholds: HealthThresholds) -> Self {
        Self { store, thresholds }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn set_thresholds(&mut self, thresholds: HealthThresholds) {
        self.thresholds = thresholds;
    }

    /// Snapshot `tasks` as the new active baseline, archiving the previous one
    pub fn save_baseline(
        &mut self,
        project_id: &str,
        name: &str,
        description: &str,
        tasks: &[Task],
        total_budget: f64,
        created_by: &str,
    ) -> Result<BaselineSnapshot> {
        let mut baselines = self.store.load(project_id)?;

        let snapshot = BaselineSnapshot {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
            created_by: created_by.to_string(),
            tasks: tasks.to_vec(),
            total_budget,
            total_duration: total_duration(tasks),
            status: BaselineStatus::Active,
            version: format!("v{}.0", baselines.len() + 1),
        };

        for baseline in &mut baselines {
            baseline.status = BaselineStatus::Archived;
        }
        baselines.push(snapshot.clone());
        self.store.save(project_id, &baselines)?;

        tracing::debug!(
            project = project_id,
            version = %snapshot.version,
            tasks = tasks.len(),
            "baseline saved"
        );
        Ok(snapshot)
    }

    pub fn get_baselines(&self, project_id: &str) -> Result<Vec<BaselineSnapshot>> {
        self.store.load(project_id)
    }

    pub fn get_active_baseline(&self, project_id: &str) -> Result<Option<BaselineSnapshot>> {
        Ok(self
            .store
            .load(project_id)?
            .into_iter()
            .find(|b| b.status == BaselineStatus::Active))
    }

    /// Make an existing snapshot the active one
    pub fn activate_baseline(&mut self, project_id: &str, baseline_id: &str) -> Result<BaselineSnapshot> {
        let mut baselines = self.store.load(project_id)?;
        if !baselines.iter().any(|b| b.id == baseline_id) {
            return Err(AnalyticsError::BaselineNotFound {
                baseline_id: baseline_id.to_string(),
            });
        }

        let mut activated = None;
        for baseline in &mut baselines {
            if baseline.id == baseline_id {
                baseline.status = BaselineStatus::Active;
                activated = Some(baseline.clone());
            } else {
                baseline.status = BaselineStatus::Archived;
            }
        }
        self.store.save(project_id, &baselines)?;

        activated.ok_or_else(|| AnalyticsError::BaselineNotFound {
            baseline_id: baseline_id.to_string(),
        })
    }

    /// Remove a snapshot. Deleting the active one leaves the project without an active baseline.
    pub fn delete_baseline(&mut self, project_id: &str, baseline_id: &str) -> Result<()> {
        let mut baselines = self.store.load(project_id)?;
        let before = baselines.len();
        baselines.retain(|b| b.id != baseline_id);
        if baselines.len() == before {
            return Err(AnalyticsError::BaselineNotFound {
                baseline_id: baseline_id.to_string(),
            });
        }
        self.store.save(project_id, &baselines)
    }

    pub fn compare_with_baseline(&self, current: &[Task], baseline: &[Task]) -> BaselineComparison {
        compare_with_baseline(current, baseline, &self.thresholds)
    }

    /// Compare against the active baseline and suggest follow-ups
    pub fn generate_baseline_report(&self, project_id: &str, current: &[Task]) -> Result<BaselineReport> {
        let Some(baseline) = self.get_active_baseline(project_id)? else {
            return Ok(BaselineReport {
                baseline: None,
                comparison: None,
                recommendations: vec![
                    "No active baseline found. Save a baseline to start tracking variances.".to_string(),
                ],
            });
        };

        let comparison = self.compare_with_baseline(current, &baseline.tasks);
        let recommendations = recommendations_for(&comparison);
        Ok(BaselineReport {
            baseline: Some(baseline),
            comparison: Some(comparison),
            recommendations,
        })
    }
}

/// max(end) - min(start) across tasks, in days
pub fn total_duration(tasks: &[Task]) -> i64 {
    let start = tasks.iter().map(|t| t.start_date).min();
    let end = tasks.iter().map(|t| t.end_date).max();
    match (start, end) {
        (Some(start), Some(end)) => days_between(start, end),
        _ => 0,
    }
}

/// Diff `current` against `baseline`, matching tasks by id
pub fn compare_with_baseline(
    current: &[Task],
    baseline: &[Task],
    thresholds: &HealthThresholds,
) -> BaselineComparison {
    let mut current_by_id: HashMap<&str, &Task> = HashMap::with_capacity(current.len());
    for task in current {
        // First occurrence wins on duplicate ids
        current_by_id.entry(task.id.as_str()).or_insert(task);
    }
    let baseline_ids: HashSet<&str> = baseline.iter().map(|t| t.id.as_str()).collect();

    let mut schedule_variances = Vec::new();
    let mut cost_variances = Vec::new();
    let mut scope_changes = Vec::new();

    for planned in baseline {
        let Some(actual) = current_by_id.get(planned.id.as_str()) else {
            scope_changes.push(ScopeChange {
                task_id: planned.id.clone(),
                task_name: planned.name.clone(),
                kind: ScopeChangeKind::Removed,
                description: format!("Task \"{}\" was removed from the schedule", planned.name),
            });
            continue;
        };

        let end_variance_days = days_between(planned.end_date, actual.end_date);
        if end_variance_days != 0 {
            schedule_variances.push(ScheduleVariance {
                task_id: planned.id.clone(),
                task_name: actual.name.clone(),
                baseline_start: planned.start_date,
                baseline_end: planned.end_date,
                current_start: actual.start_date,
                current_end: actual.end_date,
                start_variance_days: days_between(planned.start_date, actual.start_date),
                end_variance_days,
            });
        }

        let baseline_cost = planned.cost.unwrap_or(0.0);
        let current_cost = actual.actual_cost.unwrap_or(0.0);
        let variance = current_cost - baseline_cost;
        if variance != 0.0 {
            cost_variances.push(CostVariance {
                task_id: planned.id.clone(),
                task_name: actual.name.clone(),
                baseline_cost,
                current_cost,
                variance,
                variance_percent: if baseline_cost != 0.0 {
                    variance * 100.0 / baseline_cost
                } else {
                    0.0
                },
            });
        }

        let mut modified = Vec::new();
        if actual.name != planned.name {
            modified.push(format!("name changed from \"{}\" to \"{}\"", planned.name, actual.name));
        }
        if actual.duration != planned.duration {
            modified.push(format!(
                "duration changed from {} to {} days",
                planned.duration, actual.duration
            ));
        }
        if !modified.is_empty() {
            scope_changes.push(ScopeChange {
                task_id: planned.id.clone(),
                task_name: actual.name.clone(),
                kind: ScopeChangeKind::Modified,
                description: modified.join("; "),
            });
        }
    }

    for added in current.iter().filter(|t| !baseline_ids.contains(t.id.as_str())) {
        scope_changes.push(ScopeChange {
            task_id: added.id.clone(),
            task_name: added.name.clone(),
            kind: ScopeChangeKind::Added,
            description: format!("Task \"{}\" was added after the baseline", added.name),
        });
    }

    let overall_health = classify_health(&schedule_variances, &cost_variances, scope_changes.len(), thresholds);

    BaselineComparison {
        schedule_variances,
        cost_variances,
        scope_changes,
        overall_health,
    }
}

fn classify_health(
    schedule: &[ScheduleVariance],
    cost: &[CostVariance],
    scope_change_count: usize,
    thresholds: &HealthThresholds,
) -> HealthStatus {
    let significant_schedule = schedule
        .iter()
        .filter(|v| v.end_variance_days.abs() > thresholds.schedule_variance_days)
        .count();
    let significant_cost = cost
        .iter()
        .filter(|v| v.variance.abs() > thresholds.cost_variance_amount)
        .count();

    if significant_schedule > thresholds.red_schedule_count
        || significant_cost > thresholds.red_cost_count
        || scope_change_count > thresholds.red_scope_change_count
    {
        HealthStatus::Red
    } else if significant_schedule > 0 || significant_cost > 0 || scope_change_count > 0 {
        HealthStatus::Yellow
    } else {
        HealthStatus::Green
    }
}

fn recommendations_for(comparison: &BaselineComparison) -> Vec<String> {
    let mut recommendations = Vec::new();
    if !comparison.schedule_variances.is_empty() {
        recommendations.push(format!(
            "{} task(s) have moved from their baseline finish. Review the critical path and update the schedule forecast.",
            comparison.schedule_variances.len()
        ));
    }
    if !comparison.cost_variances.is_empty() {
        recommendations.push(format!(
            "{} task(s) deviate from their baseline cost. Investigate the drivers and revise the budget forecast.",
            comparison.cost_variances.len()
        ));
    }
    if !comparison.scope_changes.is_empty() {
        recommendations.push(format!(
            "{} scope change(s) since the baseline. Route them through change control and consider re-baselining.",
            comparison.scope_changes.len()
        ));
    }
    if comparison.overall_health == HealthStatus::Red {
        recommendations.push(
            "Project health is critical. Escalate to stakeholders and prepare a recovery plan.".to_string(),
        );
    }
    recommendations
}

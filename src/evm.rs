//! EVM (Earned Value Management) engine
//!
//! Planned value is time-apportioned against a status date; earned value,
//! actual cost and budget come straight from the task cost fields.
//! Every ratio is zero-guarded instead of failing.

use crate::config::EvmThresholds;
use crate::date_utils::{checked_add_days, elapsed_fraction, today};
use crate::types::{CompletionForecast, EvmMetrics, ScheduleStatus, Task, VarianceReport};
use chrono::NaiveDate;

/// Derive the indices and forecasts from the four base quantities
pub fn derive_metrics(planned_value: f64, earned_value: f64, actual_cost: f64, budget: f64) -> EvmMetrics {
    let spi = if planned_value != 0.0 { earned_value / planned_value } else { 0.0 };
    let cpi = if actual_cost != 0.0 { earned_value / actual_cost } else { 0.0 };

    let eac = if cpi > 0.0 {
        actual_cost + (budget - earned_value) / cpi
    } else {
        budget
    };

    let remaining_budget = budget - actual_cost;
    let tcpi = if remaining_budget > 0.0 {
        (budget - earned_value) / remaining_budget
    } else {
        0.0
    };

    EvmMetrics {
        planned_value,
        earned_value,
        actual_cost,
        budget_at_completion: budget,
        schedule_variance: earned_value - planned_value,
        cost_variance: earned_value - actual_cost,
        schedule_performance_index: spi,
        cost_performance_index: cpi,
        estimate_at_completion: eac,
        estimate_to_complete: eac - actual_cost,
        variance_at_completion: budget - eac,
        to_complete_performance_index: tcpi,
    }
}

/// Planned value of a task earned by `status_date`
fn apportioned_planned_value(task: &Task, status_date: NaiveDate) -> f64 {
    let planned = task.planned_value.unwrap_or(0.0);
    planned * elapsed_fraction(task.start_date, task.end_date, status_date)
}

/// Project-level metrics as of `baseline_date`
pub fn calculate_evm_metrics(tasks: &[Task], baseline_date: NaiveDate) -> EvmMetrics {
    let planned_value = tasks
        .iter()
        .map(|t| apportioned_planned_value(t, baseline_date))
        .sum();
    let earned_value = tasks.iter().filter_map(|t| t.earned_value).sum();
    let actual_cost = tasks.iter().filter_map(|t| t.actual_cost).sum();
    let budget = tasks.iter().filter_map(|t| t.cost).sum();

    let metrics = derive_metrics(planned_value, earned_value, actual_cost, budget);
    tracing::debug!(
        tasks = tasks.len(),
        spi = metrics.schedule_performance_index,
        cpi = metrics.cost_performance_index,
        "EVM metrics calculated"
    );
    metrics
}

/// Project-level metrics as of today
pub fn calculate_evm_metrics_now(tasks: &[Task]) -> EvmMetrics {
    calculate_evm_metrics(tasks, today())
}

/// One record per task, from the stored cost fields (no time apportioning)
pub fn generate_variance_report(tasks: &[Task]) -> Vec<VarianceReport> {
    tasks
        .iter()
        .map(|task| {
            let metrics = derive_metrics(
                task.planned_value.unwrap_or(0.0),
                task.earned_value.unwrap_or(0.0),
                task.actual_cost.unwrap_or(0.0),
                task.cost.unwrap_or(0.0),
            );
            let status = match metrics.schedule_variance {
                sv if sv > 0.0 => ScheduleStatus::Ahead,
                sv if sv < 0.0 => ScheduleStatus::Behind,
                _ => ScheduleStatus::OnTrack,
            };
            VarianceReport {
                task_id: task.id.clone(),
                task_name: task.name.clone(),
                metrics,
                status,
            }
        })
        .collect()
}

/// Forecast the finish date and on-time likelihood from current performance
pub fn predict_project_completion(
    metrics: &EvmMetrics,
    today: NaiveDate,
    thresholds: &EvmThresholds,
) -> CompletionForecast {
    let daily_rate = metrics.earned_value / thresholds.earn_rate_period_days;
    // A trickle of earned value can push the date past anything chrono represents
    let estimated_completion_date = if daily_rate > 0.0 {
        let remaining_days = (metrics.estimate_to_complete / daily_rate).max(0.0).ceil();
        if remaining_days.is_finite() {
            checked_add_days(today, remaining_days as i64)
        } else {
            None
        }
    } else {
        None
    };

    let probability_on_time = ((metrics.schedule_performance_index + metrics.cost_performance_index)
        / 2.0
        * 100.0)
        .clamp(0.0, 100.0);

    let mut recommended_actions = Vec::new();
    if metrics.schedule_performance_index < thresholds.spi_warning {
        recommended_actions.push(
            "Schedule is behind plan. Consider fast-tracking or crashing critical path activities."
                .to_string(),
        );
    }
    if metrics.cost_performance_index < thresholds.cpi_warning {
        recommended_actions.push(
            "Cost overrun detected. Review spending and identify cost reduction opportunities."
                .to_string(),
        );
    }
    if metrics.to_complete_performance_index > thresholds.tcpi_warning {
        recommended_actions.push(
            "Remaining work requires significantly better cost efficiency to finish within budget."
                .to_string(),
        );
    }

    CompletionForecast {
        estimated_completion_date,
        probability_on_time,
        recommended_actions,
    }
}

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use project_analytics::baseline::BaselineManager;
use project_analytics::config::{AnalyticsConfig, EvmThresholds};
use project_analytics::cpm::{calculate_critical_path, optimize_resource_leveling, run_monte_carlo_with_config};
use project_analytics::evm::{calculate_evm_metrics, predict_project_completion};
use project_analytics::store::{BaselineStore, MemoryStore};
use project_analytics::types::{Dependency, HealthStatus, Task, TaskStatus};
use project_analytics::validation::validate_tasks;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Site prep (A) feeds both utilities (B) and the slab (C)
fn project() -> Vec<Task> {
    let mut a = Task::new("A", "Site preparation", d("2024-06-03"), 5);
    a.resources = vec!["excavator".to_string()];
    a.planned_value = Some(5_000.0);
    a.earned_value = Some(5_000.0);
    a.actual_cost = Some(5_500.0);
    a.cost = Some(5_000.0);
    a.progress = 100;
    a.status = TaskStatus::Done;

    let mut b = Task::new("B", "Utilities", d("2024-06-08"), 3);
    b.dependencies = vec![Dependency::on("A")];
    b.resources = vec!["crew".to_string()];
    b.planned_value = Some(3_000.0);
    b.earned_value = Some(1_500.0);
    b.actual_cost = Some(1_200.0);
    b.cost = Some(3_000.0);
    b.progress = 50;
    b.status = TaskStatus::InProgress;

    let mut c = Task::new("C", "Slab", d("2024-06-08"), 4);
    c.dependencies = vec![Dependency::on("A")];
    c.resources = vec!["crew".to_string()];
    c.planned_value = Some(8_000.0);
    c.earned_value = Some(2_000.0);
    c.actual_cost = Some(4_000.0);
    c.cost = Some(8_000.0);
    c.progress = 25;
    c.status = TaskStatus::InProgress;

    vec![a, b, c]
}

#[test]
fn schedule_cost_and_baseline_pipeline() {
    let tasks = project();
    assert!(validate_tasks(&tasks).is_empty());

    let cpm = calculate_critical_path(&tasks);
    assert_eq!(cpm.total_project_duration, 9);
    assert_eq!(cpm.critical_path, vec!["A".to_string(), "C".to_string()]);
    assert_eq!(cpm.schedule("B").unwrap().float, 1);
    assert_eq!(cpm.project_end, Some(d("2024-06-12")));

    // B and C share the crew without exceeding it
    let leveling = optimize_resource_leveling(&tasks, &AnalyticsConfig::default().resources);
    assert!(leveling.conflicts.is_empty());
    assert!((leveling.peak_utilization["crew"] - (100.0 / 3.0 + 25.0)).abs() < 1e-9);

    // A one-day inspection by the same crew tips it over
    let mut inspection = Task::new("D", "Inspection", d("2024-06-09"), 1);
    inspection.resources = vec!["crew".to_string()];
    let mut with_inspection = tasks.clone();
    with_inspection.push(inspection);
    let leveling = optimize_resource_leveling(&with_inspection, &AnalyticsConfig::default().resources);
    assert_eq!(leveling.conflicts.len(), 1);
    assert_eq!(leveling.conflicts[0].date, d("2024-06-09"));
    assert_eq!(leveling.recommendations.len(), 1);
    assert!(leveling.recommendations[0].contains("crew"));
    assert_eq!(leveling.optimized_tasks, with_inspection);

    let metrics = calculate_evm_metrics(&tasks, d("2024-06-10"));
    assert_eq!(metrics.earned_value, 8_500.0);
    assert_eq!(metrics.actual_cost, 10_700.0);
    assert_eq!(metrics.budget_at_completion, 16_000.0);
    // A is complete, B is 2/3 through, C is 2/4 through
    assert!((metrics.planned_value - (5_000.0 + 2_000.0 + 4_000.0)).abs() < 1e-6);
    assert!(metrics.schedule_performance_index < 0.9);

    let forecast = predict_project_completion(&metrics, d("2024-06-10"), &EvmThresholds::default());
    assert!(forecast.estimated_completion_date.unwrap() > d("2024-06-10"));
    assert!(!forecast.recommended_actions.is_empty());

    let mut manager = BaselineManager::new(MemoryStore::new());
    manager
        .save_baseline("site-7", "Contract", "Signed schedule", &tasks, 16_000.0, "pm")
        .unwrap();

    // Actual costs differ from budget, so cost variances show up even with no slips.
    // None of them is large enough to affect health.
    let report = manager.generate_baseline_report("site-7", &tasks).unwrap();
    let comparison = report.comparison.unwrap();
    assert!(comparison.schedule_variances.is_empty());
    assert_eq!(comparison.cost_variances.len(), 3);
    assert_eq!(comparison.overall_health, HealthStatus::Green);

    let mut slipped = tasks.clone();
    slipped[2].end_date = d("2024-06-25");
    slipped[2].duration = 17;
    let report = manager.generate_baseline_report("site-7", &slipped).unwrap();
    let comparison = report.comparison.unwrap();
    assert_eq!(comparison.schedule_variances[0].end_variance_days, 13);
    assert_eq!(comparison.overall_health, HealthStatus::Yellow);
    assert!(report.recommendations.iter().any(|r| r.contains("baseline finish")));
}

#[test]
fn monte_carlo_brackets_the_deterministic_duration() {
    let tasks = project();
    let mut config = AnalyticsConfig::default().monte_carlo;
    config.iterations = 500;
    config.seed = Some(2024);

    let result = run_monte_carlo_with_config(&tasks, &config, None);
    assert_eq!(result.completed_iterations, 500);
    assert!(result.mean_duration > 9.0 * 0.8);
    assert!(result.mean_duration < 9.0 * 1.5);
    assert!(result.standard_deviation > 0.0);
    assert_eq!(result.percentiles.len(), 5);
    // The slab is the longer branch in most draws
    assert!(result.criticality_index["C"] > result.criticality_index["B"]);
}

#[test]
fn baselines_survive_export_and_import() {
    let mut manager = BaselineManager::new(MemoryStore::new());
    manager.save_baseline("p", "One", "", &project(), 0.0, "pm").unwrap();
    manager.save_baseline("p", "Two", "", &project(), 0.0, "pm").unwrap();
    let blob = manager.store().export_json("p").unwrap().to_string();

    let mut restored = BaselineManager::new(MemoryStore::new());
    restored.store_mut().import_json("p", &blob).unwrap();
    assert_eq!(restored.store().project_ids(), vec!["p".to_string()]);
    let active = restored.get_active_baseline("p").unwrap().unwrap();
    assert_eq!(active.name, "Two");
    assert_eq!(active.version, "v2.0");
}

//! Input diagnostics
//!
//! The engines accept malformed input and degrade silently. This pass
//! reports what they would silently work around, without changing any
//! engine behavior.

use crate::cpm::ScheduleGraph;
use crate::date_utils::days_between;
use crate::types::{Task, WbsItem};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TaskWarning {
    #[serde(rename_all = "camelCase")]
    DuplicateId { task_id: String },
    #[serde(rename_all = "camelCase")]
    DanglingDependency { task_id: String, dependency_id: String },
    #[serde(rename_all = "camelCase")]
    SelfDependency { task_id: String },
    /// Edge CPM drops to break a cycle
    #[serde(rename_all = "camelCase")]
    DependencyCycle { task_id: String, predecessor_id: String },
    #[serde(rename_all = "camelCase")]
    EndBeforeStart { task_id: String },
    #[serde(rename_all = "camelCase")]
    NegativeDuration { task_id: String, duration: i32 },
    #[serde(rename_all = "camelCase")]
    DurationMismatch { task_id: String, duration: i32, date_span: i64 },
    #[serde(rename_all = "camelCase")]
    ProgressOutOfRange { task_id: String, progress: i32 },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WbsWarning {
    #[serde(rename_all = "camelCase")]
    MalformedCode { item_id: String, code: String },
    #[serde(rename_all = "camelCase")]
    DuplicateCode { item_id: String, code: String },
    #[serde(rename_all = "camelCase")]
    DanglingParent { item_id: String, parent_id: String },
    #[serde(rename_all = "camelCase")]
    ParentCycle { item_id: String },
}

pub fn validate_tasks(tasks: &[Task]) -> Vec<TaskWarning> {
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();
    let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();

    for task in tasks {
        if !seen.insert(task.id.as_str()) {
            warnings.push(TaskWarning::DuplicateId {
                task_id: task.id.clone(),
            });
        }

        for dep in &task.dependencies {
            if dep.id == task.id {
                warnings.push(TaskWarning::SelfDependency {
                    task_id: task.id.clone(),
                });
            } else if !ids.contains(dep.id.as_str()) {
                warnings.push(TaskWarning::DanglingDependency {
                    task_id: task.id.clone(),
                    dependency_id: dep.id.clone(),
                });
            }
        }

        if task.end_date < task.start_date {
            warnings.push(TaskWarning::EndBeforeStart {
                task_id: task.id.clone(),
            });
        }

        if task.duration < 0 {
            warnings.push(TaskWarning::NegativeDuration {
                task_id: task.id.clone(),
                duration: task.duration,
            });
        } else {
            let date_span = days_between(task.start_date, task.end_date);
            if date_span >= 0 && date_span != i64::from(task.duration) {
                warnings.push(TaskWarning::DurationMismatch {
                    task_id: task.id.clone(),
                    duration: task.duration,
                    date_span,
                });
            }
        }

        if !(0..=100).contains(&task.progress) {
            warnings.push(TaskWarning::ProgressOutOfRange {
                task_id: task.id.clone(),
                progress: task.progress,
            });
        }
    }

    let graph = ScheduleGraph::build(tasks);
    for &(task, pred) in graph.broken_edges() {
        // Self-loops are already reported above
        if task != pred {
            warnings.push(TaskWarning::DependencyCycle {
                task_id: tasks[task].id.clone(),
                predecessor_id: tasks[pred].id.clone(),
            });
        }
    }

    warnings
}

pub fn validate_wbs(items: &[WbsItem]) -> Vec<WbsWarning> {
    let mut warnings = Vec::new();
    let by_id: HashMap<&str, &WbsItem> = items.iter().map(|i| (i.id.as_str(), i)).collect();
    let mut codes = HashSet::new();

    for item in items {
        let well_formed = !item.code.is_empty()
            && item
                .code
                .split('.')
                .all(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()));
        if !well_formed {
            warnings.push(WbsWarning::MalformedCode {
                item_id: item.id.clone(),
                code: item.code.clone(),
            });
        }

        if !codes.insert(item.code.as_str()) {
            warnings.push(WbsWarning::DuplicateCode {
                item_id: item.id.clone(),
                code: item.code.clone(),
            });
        }

        if let Some(parent_id) = item.parent_id.as_deref() {
            if !by_id.contains_key(parent_id) {
                warnings.push(WbsWarning::DanglingParent {
                    item_id: item.id.clone(),
                    parent_id: parent_id.to_string(),
                });
            }
        }

        if in_parent_cycle(item, &by_id) {
            warnings.push(WbsWarning::ParentCycle {
                item_id: item.id.clone(),
            });
        }
    }

    warnings
}

/// Does following parent links from `item` lead back to it?
fn in_parent_cycle(item: &WbsItem, by_id: &HashMap<&str, &WbsItem>) -> bool {
    let mut seen = HashSet::new();
    let mut current = item.parent_id.as_deref();
    while let Some(id) = current {
        if id == item.id {
            return true;
        }
        if !seen.insert(id) {
            return false;
        }
        current = by_id.get(id).and_then(|i| i.parent_id.as_deref());
    }
    false
}

//! Project Analytics - WASM schedule & cost engine
//!
//! Pure computation core for the project dashboard: CPM scheduling,
//! Monte Carlo schedule risk, resource loading, earned value, baseline
//! variance and WBS hierarchy utilities. The engine modules are plain
//! Rust; `SchedulerEngine` exposes them to JavaScript.
//!
//! ## Usage from JavaScript
//!
//! ```javascript
//! import init, { SchedulerEngine } from 'project_analytics';
//!
//! await init();
//! const engine = new SchedulerEngine();
//! engine.initialize(tasks, { monteCarlo: { iterations: 2000 } });
//! const cpm = engine.calculate_critical_path();
//! const risk = engine.run_monte_carlo();
//! engine.save_baseline('proj-1', 'Contract', 'Signed schedule', 250000, 'pm@site');
//! const report = engine.baseline_report('proj-1');
//! ```
//!
//! Dates cross the boundary as `YYYY-MM-DD` strings.

mod utils;

pub mod baseline;
pub mod config;
pub mod cpm;
pub mod date_utils;
pub mod error;
pub mod evm;
pub mod store;
pub mod types;
pub mod validation;
pub mod wbs;

use crate::baseline::BaselineManager;
use crate::config::AnalyticsConfig;
use crate::store::MemoryStore;
use crate::types::{Task, WbsItem};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

// Import console.log for debugging
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(s: &str);

    #[wasm_bindgen(js_namespace = console)]
    fn warn(s: &str);
}

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, err))
}

fn from_js<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| js_error(&format!("Failed to deserialize {}", what), e))
}

/// Plain objects rather than JS `Map`s, so results can go straight into the UI
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| js_error("Failed to serialize result", e))
}

/// The host's local calendar date, which can differ from the UTC date
fn host_today() -> NaiveDate {
    let now = js_sys::Date::new_0();
    NaiveDate::from_ymd_opt(now.get_full_year() as i32, now.get_month() + 1, now.get_date())
        .unwrap_or_else(date_utils::today)
}

fn parse_date(value: Option<String>) -> Result<NaiveDate, JsValue> {
    match value {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| js_error("Invalid date", e)),
        None => Ok(host_today()),
    }
}

/// The main analytics engine exposed to JavaScript
///
/// Holds the current task list, WBS items, configuration and the
/// baseline store, and runs the engines over them on demand.
#[wasm_bindgen]
pub struct SchedulerEngine {
    tasks: Vec<Task>,
    wbs_items: Vec<WbsItem>,
    config: AnalyticsConfig,
    baselines: BaselineManager<MemoryStore>,
    initialized: bool,
}

#[wasm_bindgen]
impl SchedulerEngine {
    /// Create a new SchedulerEngine instance
    #[wasm_bindgen(constructor)]
    pub fn new() -> SchedulerEngine {
        utils::set_panic_hook();
        log("[WASM] SchedulerEngine created");
        SchedulerEngine {
            tasks: Vec::new(),
            wbs_items: Vec::new(),
            config: AnalyticsConfig::default(),
            baselines: BaselineManager::new(MemoryStore::new()),
            initialized: false,
        }
    }

    /// Initialize the engine with tasks and an optional config object
    pub fn initialize(&mut self, tasks_val: JsValue, config_val: JsValue) -> Result<(), JsValue> {
        let tasks: Vec<Task> = from_js(tasks_val, "tasks")?;
        self.configure(config_val)?;
        self.tasks = tasks;
        self.initialized = true;

        log(&format!("[WASM] Engine initialized with {} tasks", self.tasks.len()));
        Ok(())
    }

    /// Replace the configuration. `undefined`/`null` restores defaults.
    pub fn configure(&mut self, config_val: JsValue) -> Result<(), JsValue> {
        let config = if config_val.is_undefined() || config_val.is_null() {
            AnalyticsConfig::default()
        } else {
            from_js::<AnalyticsConfig>(config_val, "config")?
        };
        config.validate().map_err(|e| js_error("Invalid config", e))?;

        self.baselines.set_thresholds(config.health.clone());
        self.config = config;
        Ok(())
    }

    /// Add a new task to the engine
    pub fn add_task(&mut self, task_val: JsValue) -> Result<(), JsValue> {
        self.ensure_initialized()?;
        let task: Task = from_js(task_val, "task")?;
        self.tasks.push(task);
        Ok(())
    }

    /// Update an existing task
    ///
    /// # Arguments
    /// * `task_id` - ID of the task to update
    /// * `updates_val` - JavaScript object with the fields to overwrite
    pub fn update_task(&mut self, task_id: String, updates_val: JsValue) -> Result<(), JsValue> {
        self.ensure_initialized()?;

        let index = self
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| JsValue::from_str(&format!("Task not found: {}", task_id)))?;

        let updates: serde_json::Value = from_js(updates_val, "updates")?;
        let mut merged =
            serde_json::to_value(&self.tasks[index]).map_err(|e| js_error("Failed to serialize task", e))?;

        if let (Some(target), Some(patch)) = (merged.as_object_mut(), updates.as_object()) {
            for (key, value) in patch {
                // Identity is fixed; unknown keys are ignored on the way back
                if key != "id" {
                    target.insert(key.clone(), value.clone());
                }
            }
        }

        self.tasks[index] = serde_json::from_value(merged).map_err(|e| js_error("Invalid task update", e))?;
        Ok(())
    }

    /// Delete a task by ID
    pub fn delete_task(&mut self, task_id: String) -> Result<(), JsValue> {
        self.ensure_initialized()?;

        let original_len = self.tasks.len();
        self.tasks.retain(|t| t.id != task_id);

        if self.tasks.len() == original_len {
            Err(JsValue::from_str(&format!("Task not found: {}", task_id)))
        } else {
            Ok(())
        }
    }

    /// Sync all tasks (bulk replace)
    pub fn sync_tasks(&mut self, tasks_val: JsValue) -> Result<(), JsValue> {
        self.tasks = from_js(tasks_val, "tasks")?;
        log(&format!("[WASM] Synced {} tasks", self.tasks.len()));
        Ok(())
    }

    /// Sync all WBS items (bulk replace)
    pub fn sync_wbs(&mut self, items_val: JsValue) -> Result<(), JsValue> {
        self.wbs_items = from_js(items_val, "WBS items")?;
        log(&format!("[WASM] Synced {} WBS items", self.wbs_items.len()));
        Ok(())
    }

    // === Schedule ===

    /// Run CPM and refresh each task's derived critical flag and level
    pub fn calculate_critical_path(&mut self) -> Result<JsValue, JsValue> {
        self.ensure_initialized()?;

        let result = cpm::calculate_critical_path(&self.tasks);
        self.tasks = cpm::apply_schedule(&self.tasks, &result);

        if !result.broken_dependencies.is_empty() {
            warn(&format!(
                "[WASM] {} dependency cycle edge(s) ignored",
                result.broken_dependencies.len()
            ));
        }
        log(&format!(
            "[WASM] CPM complete: {} tasks, {} critical, {} days",
            result.schedules.len(),
            result.critical_path.len(),
            result.total_project_duration
        ));

        to_js(&result)
    }

    pub fn optimize_resource_leveling(&self) -> Result<JsValue, JsValue> {
        self.ensure_initialized()?;
        to_js(&cpm::optimize_resource_leveling(&self.tasks, &self.config.resources))
    }

    /// Monte Carlo schedule risk. `iterations` overrides the configured count.
    pub fn run_monte_carlo(&self, iterations: Option<u32>) -> Result<JsValue, JsValue> {
        self.ensure_initialized()?;

        let mut config = self.config.monte_carlo.clone();
        if let Some(n) = iterations {
            config.iterations = n.max(1) as usize;
        }
        let result = cpm::run_monte_carlo_with_config(&self.tasks, &config, None);
        log(&format!(
            "[WASM] Monte Carlo complete: {} iterations, mean {:.1} days",
            result.completed_iterations, result.mean_duration
        ));
        to_js(&result)
    }

    // === Earned Value ===

    /// Project EVM metrics as of `baseline_date` (YYYY-MM-DD, default the host's today)
    pub fn calculate_evm(&self, baseline_date: Option<String>) -> Result<JsValue, JsValue> {
        self.ensure_initialized()?;
        let date = parse_date(baseline_date)?;
        to_js(&evm::calculate_evm_metrics(&self.tasks, date))
    }

    pub fn variance_report(&self) -> Result<JsValue, JsValue> {
        self.ensure_initialized()?;
        to_js(&evm::generate_variance_report(&self.tasks))
    }

    pub fn predict_completion(&self, baseline_date: Option<String>) -> Result<JsValue, JsValue> {
        self.ensure_initialized()?;
        let date = parse_date(baseline_date)?;
        let metrics = evm::calculate_evm_metrics(&self.tasks, date);
        to_js(&evm::predict_project_completion(&metrics, date, &self.config.evm))
    }

    // === WBS ===

    pub fn wbs_hierarchy(&self) -> Result<JsValue, JsValue> {
        to_js(&wbs::build_hierarchy(&self.wbs_items))
    }

    pub fn wbs_statistics(&self) -> Result<JsValue, JsValue> {
        to_js(&wbs::calculate_statistics(&self.wbs_items))
    }

    pub fn next_wbs_code(&self, parent_id: Option<String>) -> String {
        wbs::generate_next_code(parent_id.as_deref(), &self.wbs_items)
    }

    pub fn can_delete_wbs_item(&self, item_id: String) -> bool {
        wbs::can_delete(&item_id, &self.wbs_items)
    }

    pub fn would_create_wbs_cycle(&self, candidate_parent_id: String, child_id: String) -> bool {
        wbs::has_circular_reference(&candidate_parent_id, &child_id, &self.wbs_items)
    }

    // === Baselines ===

    /// Snapshot the current tasks as the project's active baseline
    pub fn save_baseline(
        &mut self,
        project_id: String,
        name: String,
        description: String,
        total_budget: f64,
        created_by: String,
    ) -> Result<JsValue, JsValue> {
        self.ensure_initialized()?;
        let snapshot = self
            .baselines
            .save_baseline(&project_id, &name, &description, &self.tasks, total_budget, &created_by)
            .map_err(|e| js_error("Failed to save baseline", e))?;
        log(&format!("[WASM] Baseline {} saved for {}", snapshot.version, project_id));
        to_js(&snapshot)
    }

    pub fn baselines(&self, project_id: String) -> Result<JsValue, JsValue> {
        let all = self
            .baselines
            .get_baselines(&project_id)
            .map_err(|e| js_error("Failed to load baselines", e))?;
        to_js(&all)
    }

    pub fn active_baseline(&self, project_id: String) -> Result<JsValue, JsValue> {
        let active = self
            .baselines
            .get_active_baseline(&project_id)
            .map_err(|e| js_error("Failed to load baselines", e))?;
        to_js(&active)
    }

    pub fn activate_baseline(&mut self, project_id: String, baseline_id: String) -> Result<JsValue, JsValue> {
        let snapshot = self
            .baselines
            .activate_baseline(&project_id, &baseline_id)
            .map_err(|e| js_error("Failed to activate baseline", e))?;
        to_js(&snapshot)
    }

    pub fn delete_baseline(&mut self, project_id: String, baseline_id: String) -> Result<(), JsValue> {
        self.baselines
            .delete_baseline(&project_id, &baseline_id)
            .map_err(|e| js_error("Failed to delete baseline", e))
    }

    /// Compare the current tasks against an explicit baseline task list
    pub fn compare_with_baseline(&self, baseline_tasks_val: JsValue) -> Result<JsValue, JsValue> {
        self.ensure_initialized()?;
        let baseline_tasks: Vec<Task> = from_js(baseline_tasks_val, "baseline tasks")?;
        to_js(&self.baselines.compare_with_baseline(&self.tasks, &baseline_tasks))
    }

    pub fn baseline_report(&self, project_id: String) -> Result<JsValue, JsValue> {
        self.ensure_initialized()?;
        let report = self
            .baselines
            .generate_baseline_report(&project_id, &self.tasks)
            .map_err(|e| js_error("Failed to build baseline report", e))?;
        to_js(&report)
    }

    /// Serialized baselines for the host to keep in local storage
    pub fn export_baselines(&self, project_id: String) -> Option<String> {
        self.baselines.store().export_json(&project_id).map(str::to_string)
    }

    /// Restore baselines exported earlier. Returns the number loaded.
    pub fn import_baselines(&mut self, project_id: String, json: String) -> Result<usize, JsValue> {
        let count = self
            .baselines
            .store_mut()
            .import_json(&project_id, &json)
            .map_err(|e| js_error("Failed to import baselines", e))?;
        log(&format!("[WASM] Imported {} baselines for {}", count, project_id));
        Ok(count)
    }

    // === Diagnostics ===

    /// Input warnings for the current tasks and WBS items
    pub fn validate(&self) -> Result<JsValue, JsValue> {
        #[derive(Serialize)]
        struct Diagnostics {
            tasks: Vec<validation::TaskWarning>,
            wbs: Vec<validation::WbsWarning>,
        }
        to_js(&Diagnostics {
            tasks: validation::validate_tasks(&self.tasks),
            wbs: validation::validate_wbs(&self.wbs_items),
        })
    }

    /// Get current task count
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Check if engine is initialized
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Get all tasks as JavaScript array
    pub fn get_tasks(&self) -> Result<JsValue, JsValue> {
        to_js(&self.tasks)
    }

    /// Dispose and free resources
    pub fn dispose(&mut self) {
        self.tasks.clear();
        self.wbs_items.clear();
        self.baselines.store_mut().clear();
        self.config = AnalyticsConfig::default();
        self.initialized = false;
        log("[WASM] Engine disposed");
    }
}

impl SchedulerEngine {
    fn ensure_initialized(&self) -> Result<(), JsValue> {
        if self.initialized {
            Ok(())
        } else {
            Err(JsValue::from_str("Engine not initialized"))
        }
    }
}

impl Default for SchedulerEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Module initialization - called when WASM module is loaded
#[wasm_bindgen(start)]
pub fn main() {
    utils::set_panic_hook();
    log("[WASM] Project analytics module loaded");
}

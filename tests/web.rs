//! Facade tests that run in a JS host (`wasm-pack test --node`)

#![cfg(target_arch = "wasm32")]

use chrono::NaiveDate;
use project_analytics::types::{Dependency, Task};
use project_analytics::SchedulerEngine;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

fn tasks() -> JsValue {
    let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    let a = Task::new("A", "Design", start, 4);
    let mut b = Task::new("B", "Build", start, 6);
    b.dependencies = vec![Dependency::on("A")];
    serde_wasm_bindgen::to_value(&vec![a, b]).unwrap()
}

#[wasm_bindgen_test]
fn calls_before_initialize_fail() {
    let engine = SchedulerEngine::new();
    assert!(engine.optimize_resource_leveling().is_err());
}

#[wasm_bindgen_test]
fn critical_path_round_trips_through_js() {
    let mut engine = SchedulerEngine::new();
    engine.initialize(tasks(), JsValue::UNDEFINED).unwrap();
    assert_eq!(engine.task_count(), 2);

    let result = engine.calculate_critical_path().unwrap();
    let duration = js_sys::Reflect::get(&result, &JsValue::from_str("totalProjectDuration")).unwrap();
    assert_eq!(duration.as_f64(), Some(10.0));
}

#[wasm_bindgen_test]
fn baselines_export_and_import() {
    let mut engine = SchedulerEngine::new();
    engine.initialize(tasks(), JsValue::UNDEFINED).unwrap();
    engine
        .save_baseline("p".into(), "Plan".into(), "".into(), 1000.0, "pm".into())
        .unwrap();
    let exported = engine.export_baselines("p".into()).unwrap();

    let mut other = SchedulerEngine::new();
    assert_eq!(other.import_baselines("p".into(), exported).unwrap(), 1);
    assert!(!other.active_baseline("p".into()).unwrap().is_null());
}

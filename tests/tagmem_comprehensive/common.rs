//! Shared test utilities

use std::time::Duration;
use tagmem::prelude::*;

/// Install a test-writer subscriber once; `RUST_LOG` selects the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Domain of `participants` with a timeout generous enough for CI
pub fn open_domain(participants: usize) -> TagMem {
    init_tracing();
    TagMem::builder()
        .participants(participants)
        .default_timeout(Duration::from_secs(20))
        .max_backoff(Duration::from_micros(100))
        .open()
        .expect("failed to open domain")
}

/// Domain whose wait points give up quickly
pub fn open_impatient_domain(participants: usize) -> TagMem {
    init_tracing();
    TagMem::builder()
        .participants(participants)
        .default_timeout(Duration::from_millis(50))
        .max_backoff(Duration::from_micros(20))
        .open()
        .expect("failed to open domain")
}

/// Values of every kind a cell can hold
pub fn standard_test_values() -> Vec<(&'static str, Value)> {
    vec![
        ("undefined", Value::Undefined),
        ("bool", Value::Bool(true)),
        ("int_pos", Value::Int(42)),
        ("int_neg", Value::Int(-42)),
        ("float", Value::Float(2.5)),
        ("string", Value::from("hello world")),
        ("string_unicode", Value::from("日本語")),
        ("json", Value::Json(json!({"name": "Alice", "tags": [1, 2]}))),
    ]
}

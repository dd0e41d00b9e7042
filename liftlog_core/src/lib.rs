#![forbid(unsafe_code)]

//! Core domain model and business logic for liftlog, a strength training log
//! with an eight-step cycle progression.
//!
//! This crate provides:
//! - Domain types (exercises, log entries, prescriptions)
//! - The cycle progression engine and prescription reader
//! - Input validation
//! - Persistence (exercise table, WAL, CSV archive)
//! - The workout orchestrator tying them together

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod cycle;
pub mod validation;
pub mod store;
pub mod csv_store;
pub mod wal;
pub mod csv_rollup;
pub mod history;
pub mod prescription;
pub mod lock;
pub mod workout;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::build_default_catalog;
pub use config::{Config, DataPaths};
pub use cycle::{advance, Advance, CycleStep, StepOutcome};
pub use validation::{LogForm, LogRequest};
pub use store::{ExerciseStore, LogSink, MemoryStore};
pub use csv_store::CsvExerciseStore;
pub use wal::JsonlLogSink;
pub use history::load_log_history;
pub use prescription::{current_prescription, WorkoutDetail};
pub use lock::DataDirLock;
pub use workout::{LogOutcome, LoggedData, Workout};

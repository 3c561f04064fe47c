// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod clients;
pub mod config;
pub mod consumer;
pub mod events;
pub mod metrics;
pub mod storage;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::consumer::{Consumer, ConsumerCfg, CycleReport, DispatchFailure};
pub use crate::events::{Event, EventError, Fetcher, Kind, Meta, MessageMeta, Processor};
pub use crate::storage::{Page, Storage, StorageError};

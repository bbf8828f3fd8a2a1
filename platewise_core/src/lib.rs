#![forbid(unsafe_code)]

//! Core domain model and business logic for the Platewise tracker.
//!
//! This crate provides:
//! - Domain types (food items, daily entries, weights, settings)
//! - Keyed blob persistence
//! - The `Store` service and its derived progress statistics
//! - The menu vision service boundary
//! - CSV export

pub mod types;
pub mod error;
pub mod clock;
pub mod config;
pub mod logging;
pub mod blob;
pub mod stats;
pub mod store;
pub mod vision;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use blob::{BlobStore, JsonFileStore, MemoryStore};
pub use store::Store;
pub use vision::{Dish, MenuVisionService, ReplayVisionService, VisionError, VisionOutcome};

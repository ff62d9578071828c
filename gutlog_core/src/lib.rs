#![forbid(unsafe_code)]

//! Core domain model and business logic for the Gutlog system.
//!
//! This crate provides:
//! - Domain types (food/stool events, summaries, results)
//! - Bristol Stool Scale glossary
//! - Append-only event store (WAL, CSV archive)
//! - Windowed analytics aggregation
//! - Nearest-centroid stool prediction
//! - Engine facade

pub mod types;
pub mod error;
pub mod bristol;
pub mod config;
pub mod logging;
pub mod store;
pub mod archive;
pub mod nutrition;
pub mod aggregate;
pub mod predict;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use bristol::scale_entry;
pub use config::Config;
pub use store::{EventStore, JsonlEventStore};
pub use nutrition::{FoodTable, NutrientLookup};
pub use aggregate::{summarize_foods, summarize_stools};
pub use predict::build_pairings;
pub use engine::Engine;

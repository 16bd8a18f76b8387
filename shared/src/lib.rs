//! Shared types and utilities for tickscope
//!
//! This crate contains the common data structures used across the profiler
//! engine and anything layered on top of its query surface (report export,
//! presentation, tests).

pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{sample::*, tick::*};

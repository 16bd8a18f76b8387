//! Common type definitions

pub mod sample;
pub mod tick;

//! Raw sample definitions
//!
//! These types represent individual execution observations produced by the
//! external sampling substrate. They are consumed immediately by the tick
//! aggregator and never persisted individually.

use serde::{Deserialize, Serialize};

/// Timestamp in nanoseconds since UNIX epoch
pub type Timestamp = u64;

/// Thread ID the sample was observed on
pub type ThreadId = u32;

/// Fully qualified method name, used as the aggregation key everywhere
pub type MethodId = String;

/// One observation of a method being on a call stack at a sampled instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSample {
    /// Method name in the format "package.Class.method"
    pub method: MethodId,

    /// Timestamp when the sample was taken
    pub timestamp: Timestamp,

    /// Thread where the method was observed
    pub thread_id: ThreadId,

    /// Call stack depth at the sampled instant
    pub stack_depth: u32,
}

impl RawSample {
    /// Convenience constructor for an observation of `method` at `timestamp`.
    pub fn new(method: impl Into<MethodId>, timestamp: Timestamp) -> Self {
        Self {
            method: method.into(),
            timestamp,
            thread_id: 0,
            stack_depth: 0,
        }
    }
}

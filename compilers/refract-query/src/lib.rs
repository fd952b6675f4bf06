//! Projection of frames onto slot patterns, and the statistics computed
//! over projected frames.

pub mod projection;
pub mod stats;

pub use projection::{project_frames, ProjectionQuery, QueryError, SlotPattern};
pub use stats::{ConditionalCounts, ConditionalProbability, FrequencyCounts, WILDCARD};

//! Domain models for API performance reporting.
//!
//! # Core Concepts
//!
//! - [`CallRecord`]: One enrichment API call as stored by the calling service.
//!   Flags are tri-state: only a literal boolean counts as set.
//! - [`Provider`]: The enrichment provider that served a call.
//! - [`Analysis`]: Aggregated [`OverallStats`] plus [`UserStats`] keyed by user name.

mod record;
mod stats;

pub use record::*;
pub use stats::*;

#![forbid(unsafe_code)]
//! sinew-schedule: scheduling analysis over sinew dependency graphs.
//!
//! # Pipeline
//!
//! ```text
//! item ids + estimates + ordering edges
//!        |  build::ScheduleGraph::build()
//! ScheduleGraph (petgraph DAG, durations, content hash)
//!        |- critical_path::compute_critical_path()  -> CriticalPathResult
//!        |- impact::impact(item, delay)             -> ImpactResult
//!        `- parallel::parallel_sets()               -> level sets
//! ```
//!
//! The input edge set is guaranteed acyclic by `sinew-core`'s graph
//! invariant; a cyclic input here is refused as a caller bug rather than
//! condensed away.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums.
//! - **Logging**: `tracing` (`#[instrument]` on graph construction).

pub mod build;
pub mod critical_path;
pub mod impact;
pub mod parallel;

pub use build::{ScheduleError, ScheduleGraph};
pub use critical_path::{CriticalPathResult, ItemTiming, compute_critical_path};
pub use impact::{ImpactResult, impact};
pub use parallel::parallel_sets;

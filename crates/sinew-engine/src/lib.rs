#![forbid(unsafe_code)]
//! sinew-engine: the workflow engine entry point.
//!
//! External callers (API handlers, CLI commands) talk to
//! [`engine::WorkflowEngine`] only: it loads items from the store, asks
//! the validator about transition legality, keeps the dependency graph's
//! invariants at commit time, and serves graph-derived reports from the
//! `sinew-schedule` analysis.
//!
//! # Conventions
//!
//! - **Errors**: [`engine::EngineError`], mapped to machine-readable codes
//!   via [`EngineError::code`].
//! - **Logging**: `tracing` (`#[instrument]` on entry points, `debug!`
//!   breadcrumbs). Invariant violations are returned, never logged away.
//! - **Concurrency**: per-project exclusive locks, lexicographic ordering
//!   for cross-project pairs; reports compute on snapshots.

pub mod engine;
pub mod events;
pub mod lock;

pub use engine::{EngineError, RemovalPolicy, TransitionRequest, WorkflowEngine};
pub use events::{CollectingSink, EngineEvent, EventSink};

//! Dependency and relationship graph for one project.
//!
//! # Overview
//!
//! [`deps::DependencyGraph`] is the mutation-path structure: every edge
//! insertion re-validates the structural invariants (ordering acyclicity,
//! single-parent forest) before commit, and every rejection reports the
//! offending cycle path. Transitive closure queries traverse on demand;
//! nothing is cached here, so there is no invalidation to get wrong.
//!
//! [`hierarchy`] layers forest queries (ancestor chain, subtree, progress
//! roll-up) over a valid graph.
//!
//! Scheduling analysis (critical path, delay impact) lives in the
//! `sinew-schedule` crate, which consumes this graph's edge list.

pub mod deps;
pub mod hierarchy;

pub use deps::{DependencyGraph, GraphError};
pub use hierarchy::{Progress, ancestor_chain, subtree};

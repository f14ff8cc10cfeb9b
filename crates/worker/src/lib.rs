//! Shared task primitives for loctab.
//!
//! Everything that leaves the caller's thread goes through this crate:
//! [`spawn`] attaches work to the ambient Tokio runtime (or a small global
//! fallback runtime), [`WorkerJoinSet`] fans a batch of futures out and back
//! in, and [`GenerationScope`] implements cancel-then-replace ownership of the
//! "current" unit of work so a newer generation always supersedes an older one.

mod class;
mod join_set;
mod spawn;
mod token;

pub use class::TaskClass;
pub use join_set::WorkerJoinSet;
pub use spawn::{current_handle, spawn};
pub use token::{GenerationClock, GenerationScope, GenerationToken};

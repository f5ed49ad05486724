//! Submission jobs.
//!
//! A job takes a raw URL list through validation, deduplication, chunked
//! submission and identifier resolution on its own task, publishing
//! `JobEvent`s as it goes. Jobs are started and cancelled through a
//! `JobController`; the `JobRegistry` it is built with tracks the running ones.

mod controller;
mod events;
mod registry;

pub use controller::{JobController, JobHandle};
pub use events::{JobEmitter, JobEvent, JobTotals, Stage};
pub use registry::{JobRegistry, JobState, JobStatus};

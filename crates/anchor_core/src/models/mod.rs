//! Data models shared across the crate.
//!
//! - Alignment parameters (CLI flags, job parameters, `[alignment]` config)
//! - Job records and alignment outcomes persisted as JSON

mod params;
mod record;

pub use params::{AlignmentParameters, ParameterError};
pub use record::{AlignmentOutcome, JobRecord, JobStatus};

//! Recurring verification jobs. Each job is a [`crate::worker::Task`] that pages through the orders still awaiting
//! one kind of verification and checks them one at a time against an inventory source.
mod verification_job;

pub use verification_job::{JobConfig, JobKind, VerificationJob};

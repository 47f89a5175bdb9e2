// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch queueing for the floatd inspect service: the strict-priority
//! scheduler and the per-request job aggregator.

pub mod job;
pub mod scheduler;

pub use job::{Job, JobError, JobOutcome};
pub use scheduler::{
    DEFAULT_MAX_ATTEMPTS, DispatchOutcome, FleetHealth, InspectHandler, LANES, QueueEntry,
    Scheduler,
};

//! Background task domain
//!
//! Jobs are owned by a broker between enqueue and completion; processors
//! only lease them for one execution attempt at a time.

mod broker;
mod error;
mod handler;
mod job;
mod payloads;

pub use broker::Broker;
pub use error::{DispatchError, TaskError};
pub use handler::{JobOutcome, TaskHandler};
pub use job::{EnqueueOptions, Job, JobId, QueueClass};
pub use payloads::{SendVerifyEmailPayload, TASK_SEND_VERIFY_EMAIL};

#[cfg(test)]
pub use broker::MockBroker;

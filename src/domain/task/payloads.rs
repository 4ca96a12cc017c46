//! Payloads of built-in task kinds

use serde::{Deserialize, Serialize};

pub const TASK_SEND_VERIFY_EMAIL: &str = "task:send_verify_email";

/// Arguments of the verification email task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendVerifyEmailPayload {
    pub username: String,
}

//! Built-in task handlers

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::domain::task::{Job, SendVerifyEmailPayload, TaskError, TaskHandler};
use crate::domain::user::UserRepository;

/// Handles `task:send_verify_email`
///
/// Email delivery itself lives outside this service; the handler resolves
/// the recipient and records the send.
pub struct SendVerifyEmailHandler {
    users: Arc<dyn UserRepository>,
}

impl SendVerifyEmailHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl TaskHandler for SendVerifyEmailHandler {
    async fn handle(&self, job: &Job) -> Result<(), TaskError> {
        let payload: SendVerifyEmailPayload = serde_json::from_slice(&job.payload)
            .map_err(|e| TaskError::terminal(format!("failed to decode payload: {}", e)))?;

        let user = self
            .users
            .get_by_username(&payload.username)
            .await?
            .ok_or_else(|| TaskError::terminal(format!("user '{}' doesn't exist", payload.username)))?;

        info!(
            job_id = %job.id,
            username = %user.username(),
            email = %user.email(),
            "Processed send verify email task"
        );

        Ok(())
    }
}

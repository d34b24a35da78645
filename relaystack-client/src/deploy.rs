//! Waiting for a stack update to settle

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudformation::Client;
use relaystack_core::BoxError;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Status reported while an update is still being applied
pub const PENDING_STATUS: &str = "UPDATE_IN_PROGRESS";

/// Final statuses meaning the update was applied
pub const ACCEPTED_STATUSES: &[&str] = &["UPDATE_COMPLETE_CLEANUP_IN_PROGRESS", "UPDATE_COMPLETE"];

const BASE_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Failed to read stack status: {0}")]
    Status(#[source] BoxError),

    #[error("Stack update was not applied, final status: {0}")]
    NotApplied(String),
}

/// Reads the current status of the deployed stack
#[async_trait]
pub trait StackStatusSource: Send + Sync {
    async fn status(&self) -> Result<String, BoxError>;
}

/// [`StackStatusSource`] backed by the CloudFormation API
#[derive(Debug, Clone)]
pub struct CloudFormationStatus {
    client: Client,
    stack_name: String,
}

impl CloudFormationStatus {
    pub fn new(client: Client, stack_name: impl Into<String>) -> Self {
        Self {
            client,
            stack_name: stack_name.into(),
        }
    }

    /// Build a client from the default credential and region chain
    pub async fn from_env(stack_name: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), stack_name)
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }
}

#[async_trait]
impl StackStatusSource for CloudFormationStatus {
    async fn status(&self) -> Result<String, BoxError> {
        debug!(stack = %self.stack_name, "Describing stack");

        let output = self
            .client
            .describe_stacks()
            .stack_name(&self.stack_name)
            .send()
            .await
            .map_err(aws_sdk_cloudformation::Error::from)?;

        let status = output
            .stacks()
            .first()
            .and_then(|stack| stack.stack_status())
            .map(|status| status.as_str());
        reported_status(&self.stack_name, status)
    }
}

fn reported_status(stack_name: &str, status: Option<&str>) -> Result<String, BoxError> {
    status
        .map(str::to_string)
        .ok_or_else(|| BoxError::from(format!("stack {} reported no status", stack_name)))
}

/// Delay before poll number `attempt + 1`: 0.5s doubling, capped at 10s
pub fn backoff_delay(attempt: u32) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| BASE_DELAY.checked_mul(factor))
        .map_or(MAX_DELAY, |delay| delay.min(MAX_DELAY))
}

/// Poll until the status differs from `pending` and return it
pub async fn wait_until_settled<S>(source: &S, pending: &str) -> Result<String, DeployError>
where
    S: StackStatusSource + ?Sized,
{
    let mut attempt = 0u32;
    loop {
        info!("Waiting for stack changes");
        let status = source.status().await.map_err(DeployError::Status)?;
        if status != pending {
            info!(status = %status, "Stack settled");
            return Ok(status);
        }

        let delay = backoff_delay(attempt);
        debug!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Stack still updating"
        );
        tokio::time::sleep(delay).await;
        attempt = attempt.saturating_add(1);
    }
}

pub fn ensure_settled(status: &str, accepted: &[&str]) -> Result<(), DeployError> {
    if accepted.contains(&status) {
        Ok(())
    } else {
        Err(DeployError::NotApplied(status.to_string()))
    }
}

/// Wait out a pending update and fail unless it was applied
pub async fn wait_for_update<S>(source: &S) -> Result<String, DeployError>
where
    S: StackStatusSource + ?Sized,
{
    let status = wait_until_settled(source, PENDING_STATUS).await?;
    ensure_settled(&status, ACCEPTED_STATUSES)?;
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct ScriptedStatus {
        statuses: Mutex<VecDeque<&'static str>>,
        polls: Mutex<usize>,
    }

    impl ScriptedStatus {
        fn new(statuses: &[&'static str]) -> Self {
            Self {
                statuses: Mutex::new(statuses.iter().copied().collect()),
                polls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl StackStatusSource for ScriptedStatus {
        async fn status(&self) -> Result<String, BoxError> {
            *self.polls.lock().unwrap() += 1;
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .map(str::to_string)
                .ok_or_else(|| BoxError::from("stack not found"))
        }
    }

    #[test]
    fn test_backoff_delay_sequence() {
        assert_eq!(backoff_delay(0), Duration::from_millis(500));
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(4), Duration::from_secs(8));
        assert_eq!(backoff_delay(5), MAX_DELAY);
        assert_eq!(backoff_delay(40), MAX_DELAY);
        assert_eq!(backoff_delay(u32::MAX), MAX_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_between_polls() {
        let source = ScriptedStatus::new(&[PENDING_STATUS, PENDING_STATUS, PENDING_STATUS, "UPDATE_COMPLETE"]);
        let started = Instant::now();

        let status = wait_until_settled(&source, PENDING_STATUS).await.unwrap();

        assert_eq!(status, "UPDATE_COMPLETE");
        assert_eq!(*source.polls.lock().unwrap(), 4);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(3500));
        assert!(elapsed < Duration::from_millis(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_immediately_when_settled() {
        let source = ScriptedStatus::new(&["UPDATE_ROLLBACK_COMPLETE"]);
        let started = Instant::now();

        let status = wait_until_settled(&source, PENDING_STATUS).await.unwrap();

        assert_eq!(status, "UPDATE_ROLLBACK_COMPLETE");
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_error_stops_waiting() {
        let source = ScriptedStatus::new(&[PENDING_STATUS]);

        let err = wait_until_settled(&source, PENDING_STATUS).await.unwrap_err();

        assert!(matches!(err, DeployError::Status(_)));
    }

    #[test]
    fn test_ensure_settled() {
        assert!(ensure_settled("UPDATE_COMPLETE", ACCEPTED_STATUSES).is_ok());
        assert!(ensure_settled("UPDATE_COMPLETE_CLEANUP_IN_PROGRESS", ACCEPTED_STATUSES).is_ok());

        let err = ensure_settled("UPDATE_ROLLBACK_COMPLETE", ACCEPTED_STATUSES).unwrap_err();
        assert!(matches!(err, DeployError::NotApplied(status) if status == "UPDATE_ROLLBACK_COMPLETE"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_update_accepts_completed_update() {
        let source = ScriptedStatus::new(&[PENDING_STATUS, "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS"]);

        let status = wait_for_update(&source).await.unwrap();

        assert_eq!(status, "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS");
        assert_eq!(*source.polls.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_update_rejects_rollback() {
        let source = ScriptedStatus::new(&[PENDING_STATUS, PENDING_STATUS, "UPDATE_ROLLBACK_COMPLETE"]);
        let dyn_source: &dyn StackStatusSource = &source;

        let err = wait_for_update(dyn_source).await.unwrap_err();

        assert!(matches!(err, DeployError::NotApplied(status) if status == "UPDATE_ROLLBACK_COMPLETE"));
        assert_eq!(*source.polls.lock().unwrap(), 3);
    }

    #[test]
    fn test_reported_status() {
        assert_eq!(reported_status("shop", Some("UPDATE_COMPLETE")).unwrap(), "UPDATE_COMPLETE");

        let err = reported_status("shop", None).unwrap_err();
        assert_eq!(err.to_string(), "stack shop reported no status");
    }
}

//! Fire-and-forget side effects.
//!
//! Handlers hand a [`Job`] to the [`Notifier`] and return immediately. The
//! production notifier feeds a bounded queue drained by one worker task, which
//! retries each job a few times with exponential backoff and then gives up with
//! a log line. Nothing here can fail a request.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::mailer::{EmailMessage, MailError, MailerState};
use crate::webhooks::{SIGNATURE_HEADER, SignedWebhook};

#[derive(Debug, Clone)]
pub enum Job {
    Webhook(SignedWebhook),
    Email(EmailMessage),
}

impl Job {
    pub fn label(&self) -> String {
        match self {
            Job::Webhook(hook) => format!("webhook:{}", hook.event),
            Job::Email(mail) => format!("email:{}", mail.to),
        }
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook endpoint answered {0}")]
    Status(u16),
    #[error(transparent)]
    Mail(#[from] MailError),
}

pub trait Notifier: Send + Sync {
    fn dispatch(&self, job: Job);
}

pub type NotifierState = Arc<dyn Notifier>;

/// Executes a single attempt of a job.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: &Job) -> Result<(), JobError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1` (1-based `attempt`).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

pub const QUEUE_CAPACITY: usize = 256;

/// Runs `job` until it succeeds or the policy is exhausted.
pub async fn run_with_retry(runner: &dyn JobRunner, job: &Job, policy: RetryPolicy) -> bool {
    let label = job.label();
    for attempt in 1..=policy.max_attempts {
        match runner.run(job).await {
            Ok(()) => {
                tracing::debug!(job = %label, attempt, "job delivered");
                return true;
            }
            Err(e) if attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                tracing::warn!(job = %label, attempt, error = %e, retry_in_ms = delay.as_millis() as u64, "job failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::error!(job = %label, attempt, error = %e, "job abandoned");
            }
        }
    }
    false
}

/// QueueNotifier
///
/// Bounded in-process queue. When full, new jobs are dropped with a warning
/// rather than applying back-pressure to the request path.
pub struct QueueNotifier {
    sender: mpsc::Sender<Job>,
}

impl QueueNotifier {
    pub fn spawn(
        runner: Arc<dyn JobRunner>,
        policy: RetryPolicy,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<Job>(capacity);
        let worker = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                run_with_retry(runner.as_ref(), &job, policy).await;
            }
            tracing::debug!("job queue closed");
        });
        (Self { sender }, worker)
    }
}

impl Notifier for QueueNotifier {
    fn dispatch(&self, job: Job) {
        match self.sender.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                tracing::warn!(job = %job.label(), "job queue full, dropping job");
            }
            Err(TrySendError::Closed(job)) => {
                tracing::error!(job = %job.label(), "job queue closed, dropping job");
            }
        }
    }
}

/// HttpJobRunner
///
/// Delivers webhooks with reqwest and mail through the configured mailer.
pub struct HttpJobRunner {
    client: reqwest::Client,
    webhook_url: Option<String>,
    mailer: MailerState,
}

impl HttpJobRunner {
    pub fn new(client: reqwest::Client, webhook_url: Option<String>, mailer: MailerState) -> Self {
        Self {
            client,
            webhook_url,
            mailer,
        }
    }
}

#[async_trait]
impl JobRunner for HttpJobRunner {
    async fn run(&self, job: &Job) -> Result<(), JobError> {
        match job {
            Job::Webhook(hook) => {
                let Some(url) = self.webhook_url.as_deref() else {
                    tracing::debug!(event = %hook.event, "no webhook URL configured, skipping");
                    return Ok(());
                };

                let mut request = self
                    .client
                    .post(url)
                    .header(CONTENT_TYPE, "application/json")
                    .body(hook.body.clone());
                if let Some(signature) = &hook.signature {
                    request = request.header(SIGNATURE_HEADER, signature);
                }

                let response = request.send().await?;
                if !response.status().is_success() {
                    return Err(JobError::Status(response.status().as_u16()));
                }
                Ok(())
            }
            Job::Email(mail) => Ok(self.mailer.send(mail).await?),
        }
    }
}

/// Keeps dispatched jobs in memory. Used by tests.
#[derive(Default)]
pub struct RecordingNotifier {
    jobs: Mutex<Vec<Job>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().map(|j| j.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn dispatch(&self, job: Job) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.push(job);
        }
    }
}

//! Print jobs and completion tracking
//!
//! A [`PrintJob`] is created for a resolved printer when the operation runs
//! in print mode. Its surface spools into the backend; once the surface is
//! finished the [`JobTracker`] submits the job and lets the controller wait
//! for the backend's send-complete notification.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{PageSetup, PrintSettings, Printer};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::backend::Backend;
use crate::error::{FirstError, PrintError};
use crate::resolver::ResolvedPrinter;

/// Backend-side job status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Active,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Immutable description of a submitted document
#[derive(Debug, Clone)]
pub struct JobTicket {
    pub id: Uuid,
    pub name: String,
    pub printer: Printer,
    pub settings: PrintSettings,
    pub page_setup: PageSetup,
    pub created_at: DateTime<Utc>,
}

impl JobTicket {
    pub fn new(
        name: impl Into<String>,
        printer: Printer,
        settings: PrintSettings,
        page_setup: PageSetup,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            printer,
            settings,
            page_setup,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct JobState {
    status: JobStatus,
    sent: bool,
}

#[derive(Debug)]
struct JobShared {
    job_id: Uuid,
    state: watch::Sender<JobState>,
    error: FirstError,
}

/// Status and completion handle shared between a job, its backend and waiters
#[derive(Debug, Clone)]
pub struct JobProgress {
    shared: Arc<JobShared>,
}

impl JobProgress {
    pub fn new(job_id: Uuid) -> Self {
        let (state, _) = watch::channel(JobState {
            status: JobStatus::Pending,
            sent: false,
        });
        Self {
            shared: Arc::new(JobShared {
                job_id,
                state,
                error: FirstError::new(),
            }),
        }
    }

    /// Status-change notification from the backend
    ///
    /// Ignored once the job reached a terminal status.
    pub fn set_status(&self, status: JobStatus) {
        let job_id = self.shared.job_id;
        self.shared.state.send_if_modified(|state| {
            if state.status.is_finished() || state.status == status {
                return false;
            }
            debug!(job_id = %job_id, from = ?state.status, to = ?status, "Job status changed");
            state.status = status;
            true
        });
    }

    /// Send-complete notification
    ///
    /// Keeps only the first error, marks the job as sent and wakes waiters.
    pub fn complete_send(&self, error: Option<PrintError>) {
        let failed = match error {
            Some(err) => {
                warn!(job_id = %self.shared.job_id, error = %err, "Job send failed");
                self.shared.error.record(err);
                true
            }
            None => false,
        };
        self.shared.state.send_modify(|state| {
            if failed {
                state.status = JobStatus::Failed;
            } else if !state.status.is_finished() {
                state.status = JobStatus::Completed;
            }
            state.sent = true;
        });
    }

    pub fn status(&self) -> JobStatus {
        self.shared.state.borrow().status
    }

    pub fn is_sent(&self) -> bool {
        self.shared.state.borrow().sent
    }

    pub fn error(&self) -> Option<PrintError> {
        self.shared.error.get()
    }

    /// Wait until the send completed; returns at once if it already did
    pub async fn wait(&self) {
        let mut rx = self.shared.state.subscribe();
        // The sender lives in `self`, so this cannot fail
        let _ = rx.wait_for(|state| state.sent).await;
    }

    /// Blocking variant of [`JobProgress::wait`]
    ///
    /// Must not be called from inside an async task.
    pub fn wait_blocking(&self) {
        futures::executor::block_on(self.wait());
    }
}

/// Backend-side submission unit
#[derive(Debug, Clone)]
pub struct PrintJob {
    ticket: JobTicket,
    backend: Arc<dyn Backend>,
    progress: JobProgress,
}

impl PrintJob {
    pub fn new(
        name: impl Into<String>,
        resolved: &ResolvedPrinter,
        settings: PrintSettings,
        page_setup: PageSetup,
    ) -> Self {
        let ticket = JobTicket::new(name, resolved.printer.clone(), settings, page_setup);
        let progress = JobProgress::new(ticket.id);
        Self {
            ticket,
            backend: resolved.backend.clone(),
            progress,
        }
    }

    pub fn ticket(&self) -> &JobTicket {
        &self.ticket
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn progress(&self) -> &JobProgress {
        &self.progress
    }

    pub fn status(&self) -> JobStatus {
        self.progress.status()
    }

    pub fn error(&self) -> Option<PrintError> {
        self.progress.error()
    }

    /// Give up on a job that was never submitted
    pub fn discard(&self) {
        debug!(job_id = %self.ticket.id, "Discarding unsent job");
        self.backend.discard(&self.ticket);
    }
}

/// Submits a job and reconciles waiting with the completion notification
#[derive(Debug)]
pub struct JobTracker {
    job: PrintJob,
    submitted: Option<JoinHandle<()>>,
}

impl JobTracker {
    pub fn new(job: PrintJob) -> Self {
        Self {
            job,
            submitted: None,
        }
    }

    pub fn job(&self) -> &PrintJob {
        &self.job
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted.is_some()
    }

    /// Hand the finished spool to the backend (asynchronous)
    ///
    /// A second call is ignored.
    #[instrument(skip(self), fields(job_id = %self.job.ticket.id, printer = %self.job.ticket.printer.name))]
    pub fn submit(&mut self) {
        if self.submitted.is_some() {
            warn!("Job already submitted");
            return;
        }
        info!("Submitting print job");

        let job = self.job.clone();
        self.submitted = Some(tokio::spawn(async move {
            let result = job
                .backend
                .send(&job.ticket, job.progress.clone())
                .await
                .map_err(|e| PrintError::Submission(e.into_message()));
            job.progress.complete_send(result.err());
        }));
    }

    pub fn on_status_changed(&self, status: JobStatus) {
        self.job.progress.set_status(status);
    }

    pub fn on_send_complete(&self, error: Option<PrintError>) {
        self.job.progress.complete_send(error);
    }

    /// Wait for send completion; returns at once when nothing was submitted
    pub async fn wait(&self) {
        if self.submitted.is_none() {
            return;
        }
        self.job.progress.wait().await;
    }

    /// Blocking variant of [`JobTracker::wait`]
    pub fn wait_blocking(&self) {
        if self.submitted.is_none() {
            return;
        }
        self.job.progress.wait_blocking();
    }

    pub fn into_job(self) -> PrintJob {
        self.job
    }
}

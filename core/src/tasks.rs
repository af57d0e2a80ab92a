//! Background jobs and the worker pool that runs them.
//!
//! # Design
//! Nothing here is global. `TaskRuntime::start` builds the two halves:
//! - `TaskQueue`, a cloneable handle that request handlers use to enqueue
//!   jobs without waiting for them;
//! - `WorkerPool`, which owns the receiving side, runs at most `workers`
//!   jobs at once, and publishes a `JobReport` per finished job.
//!
//! `WorkerPool::shutdown` closes the queue, drains what was already queued,
//! and waits for running jobs. Enqueueing after that fails with
//! `TaskError::QueueClosed`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::TodoError;
use crate::service::TodoService;
use crate::upload::{list_name_from_path, UploadError, UploadTodoList};

const REPORT_CAPACITY: usize = 64;

/// A named unit of background work with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Job {
    ProcessTodoUpload {
        file_path: PathBuf,
        list_name: Option<String>,
    },
    CleanupOldTodos,
    SendTodoReminders,
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProcessTodoUpload { .. } => "process_todo_upload",
            Self::CleanupOldTodos => "cleanup_old_todos",
            Self::SendTodoReminders => "send_todo_reminders",
        }
    }
}

/// Acknowledgement handed back when a job is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReceipt {
    pub task_id: Uuid,
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task queue is closed")]
    QueueClosed,
}

/// Failure of a single job execution.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Todo(#[from] TodoError),
}

impl JobError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upload(error) => error.is_retryable(),
            Self::Todo(_) => true,
        }
    }
}

/// Anything that accepts jobs for later execution.
pub trait TaskDispatcher: Send + Sync {
    fn enqueue(&self, job: Job) -> Result<TaskReceipt, TaskError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed(String),
}

/// Published on the failure channel once a job stops being retried.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub task_id: Uuid,
    pub job: Job,
    pub attempts: u32,
    pub outcome: JobOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSettings {
    /// Jobs allowed to run concurrently.
    pub workers: usize,
    /// Executions per job before it is reported as failed.
    pub max_attempts: u32,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            workers: 2,
            max_attempts: 1,
        }
    }
}

#[derive(Debug)]
struct Envelope {
    task_id: Uuid,
    job: Job,
}

/// Enqueue side of the runtime.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<Envelope>,
}

impl TaskDispatcher for TaskQueue {
    fn enqueue(&self, job: Job) -> Result<TaskReceipt, TaskError> {
        let task_id = Uuid::new_v4();
        let name = job.name();
        self.sender
            .send(Envelope { task_id, job })
            .map_err(|_| TaskError::QueueClosed)?;
        info!(%task_id, job = name, "job enqueued");
        Ok(TaskReceipt { task_id })
    }
}

/// Execution side of the runtime.
pub struct WorkerPool {
    shutdown: watch::Sender<bool>,
    dispatcher: JoinHandle<()>,
    reports: broadcast::Sender<JobReport>,
}

impl WorkerPool {
    /// Receives a report for every job finished after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<JobReport> {
        self.reports.subscribe()
    }

    pub async fn shutdown(self) {
        info!("worker pool shutting down");
        let _ = self.shutdown.send(true);
        if let Err(error) = self.dispatcher.await {
            error!(%error, "worker pool dispatcher panicked");
        }
        info!("worker pool stopped");
    }
}

pub struct TaskRuntime;

impl TaskRuntime {
    /// Spawns the worker pool on the current tokio runtime.
    pub fn start(service: TodoService, settings: TaskSettings) -> (TaskQueue, WorkerPool) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (reports, _) = broadcast::channel(REPORT_CAPACITY);

        let context = Arc::new(WorkerContext {
            service,
            max_attempts: settings.max_attempts.max(1),
            reports: reports.clone(),
        });
        let dispatcher = tokio::spawn(dispatch_loop(
            receiver,
            shutdown_rx,
            context,
            settings.workers.max(1),
        ));
        info!(
            workers = settings.workers,
            max_attempts = settings.max_attempts,
            "worker pool started"
        );

        (
            TaskQueue { sender },
            WorkerPool {
                shutdown,
                dispatcher,
                reports,
            },
        )
    }
}

struct WorkerContext {
    service: TodoService,
    max_attempts: u32,
    reports: broadcast::Sender<JobReport>,
}

async fn dispatch_loop(
    mut receiver: mpsc::UnboundedReceiver<Envelope>,
    mut shutdown: watch::Receiver<bool>,
    context: Arc<WorkerContext>,
    workers: usize,
) {
    let permits = Arc::new(Semaphore::new(workers));
    let mut running = JoinSet::new();

    loop {
        tokio::select! {
            received = receiver.recv() => match received {
                Some(envelope) => spawn_job(&mut running, &permits, &context, envelope).await,
                None => break,
            },
            _ = shutdown.changed() => {
                receiver.close();
                while let Some(envelope) = receiver.recv().await {
                    spawn_job(&mut running, &permits, &context, envelope).await;
                }
                break;
            }
        }
        while let Some(finished) = running.try_join_next() {
            if let Err(error) = finished {
                error!(%error, "job task panicked");
            }
        }
    }

    while let Some(finished) = running.join_next().await {
        if let Err(error) = finished {
            error!(%error, "job task panicked");
        }
    }
}

async fn spawn_job(
    running: &mut JoinSet<()>,
    permits: &Arc<Semaphore>,
    context: &Arc<WorkerContext>,
    envelope: Envelope,
) {
    let Ok(permit) = Arc::clone(permits).acquire_owned().await else {
        return;
    };
    let context = Arc::clone(context);
    running.spawn(async move {
        let _permit = permit;
        run_job(&context, envelope).await;
    });
}

async fn run_job(context: &WorkerContext, envelope: Envelope) {
    let Envelope { task_id, job } = envelope;
    let span = info_span!("job", %task_id, job = job.name());

    async {
        let mut attempts = 0;
        let outcome = loop {
            attempts += 1;
            info!(attempt = attempts, "job started");
            match execute(&context.service, &job).await {
                Ok(()) => {
                    info!(attempt = attempts, "job succeeded");
                    break JobOutcome::Succeeded;
                }
                Err(error) if error.is_retryable() && attempts < context.max_attempts => {
                    warn!(attempt = attempts, %error, "job failed, retrying");
                }
                Err(error) => {
                    error!(attempts, %error, "job failed");
                    break JobOutcome::Failed(error.to_string());
                }
            }
        };
        // No subscribers is fine.
        let _ = context.reports.send(JobReport {
            task_id,
            job: job.clone(),
            attempts,
            outcome,
        });
    }
    .instrument(span)
    .await;
}

async fn execute(service: &TodoService, job: &Job) -> Result<(), JobError> {
    match job {
        Job::ProcessTodoUpload {
            file_path,
            list_name,
        } => {
            let list_name = list_name
                .clone()
                .unwrap_or_else(|| list_name_from_path(file_path));
            UploadTodoList::new(list_name, file_path.clone())
                .execute(service)
                .await?;
            Ok(())
        }
        Job::CleanupOldTodos => {
            cleanup_old_todos();
            Ok(())
        }
        Job::SendTodoReminders => {
            send_todo_reminders(service).await?;
            Ok(())
        }
    }
}

// No age or completion criterion exists for todos yet, so there is
// nothing to select.
fn cleanup_old_todos() {
    info!("no retention criterion configured, nothing cleaned up");
}

/// Logs one reminder per overdue todo; the log is the notification channel.
async fn send_todo_reminders(service: &TodoService) -> Result<usize, TodoError> {
    let today = Utc::now().date_naive();
    let overdue = service.overdue_todos(today).await?;
    for todo in &overdue {
        info!(
            todo_id = todo.id,
            list_id = todo.list_id,
            due_date = %todo.due_date,
            title = %todo.title,
            "todo overdue"
        );
    }
    info!(count = overdue.len(), "reminders sent");
    Ok(overdue.len())
}

//! Upload, run, poll and clean up: one summarization request end to end.

use crate::assistant_provider::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use summarizer_core::{CleanupScope, SummarizerConfig};
use thiserror::Error;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Assistants API call failed: {0:#}")]
    Remote(#[from] anyhow::Error),

    #[error("Run {run_id} ended with status {status}: {message}")]
    RunFailed {
        run_id: String,
        status: RunStatus,
        message: String,
    },

    #[error("No assistant answer found in thread {thread_id}")]
    AnswerMissing { thread_id: String },
}

/// Per-request knobs, taken from the loaded configuration
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub assistant_name: String,
    pub model: String,
    pub instructions: Option<String>,
    pub max_attempts: u32,
    pub poll_interval: Duration,
    pub cleanup_scope: CleanupScope,
}

impl WorkflowSettings {
    pub fn from_config(config: &SummarizerConfig) -> Self {
        Self {
            assistant_name: config.openai.assistant_name.clone(),
            model: config.openai.model.clone(),
            instructions: config.openai.instructions.clone(),
            max_attempts: config.polling.max_attempts.max(1),
            poll_interval: Duration::from_millis(config.polling.interval_ms),
            cleanup_scope: config.cleanup.scope,
        }
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self::from_config(&SummarizerConfig::default())
    }
}

/// Serializes account-wide sweeps against requests still using remote resources.
///
/// Requests hold a shared guard from upload until their own thread is gone;
/// the sweep takes the exclusive guard. tokio's lock is write-preferring, so
/// requests arriving while a sweep waits queue behind it.
#[derive(Clone, Default)]
pub struct CleanupGate {
    lock: Arc<RwLock<()>>,
}

impl CleanupGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enter(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().await
    }

    pub async fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().await
    }
}

/// Outcome of a successful request
#[derive(Debug, Clone)]
pub struct Summary {
    pub answer: String,
    pub thread_id: String,
    pub run_status: RunStatus,
    pub poll_attempts: u32,
    /// False when polling gave up before the run reported `completed`
    pub completed: bool,
    pub elapsed: Duration,
}

/// Remote ids created so far, so cleanup knows what exists
#[derive(Debug, Default)]
struct CreatedResources {
    file_id: Option<String>,
    assistant_id: Option<String>,
    thread_id: Option<String>,
}

#[derive(Debug)]
struct PollOutcome {
    status: RunStatus,
    attempts: u32,
    completed: bool,
}

pub struct SummarizeWorkflow {
    api: Arc<dyn AssistantsApi>,
    settings: WorkflowSettings,
    gate: CleanupGate,
}

impl SummarizeWorkflow {
    pub fn new(api: Arc<dyn AssistantsApi>, settings: WorkflowSettings, gate: CleanupGate) -> Self {
        Self {
            api,
            settings,
            gate,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.api.provider_name()
    }

    /// Run one summarization. Cleanup always happens, even when a step fails.
    pub async fn run(
        &self,
        document: &UploadedDocument,
        prompt: &str,
    ) -> Result<Summary, WorkflowError> {
        let started = Instant::now();
        let mut created = CreatedResources::default();

        let outcome = {
            let _in_flight = self.gate.enter().await;
            let outcome = self.execute(document, prompt, &mut created).await;

            if let Some(thread_id) = created.thread_id.as_deref() {
                self.delete_thread(thread_id).await;
            }
            if self.settings.cleanup_scope == CleanupScope::Request {
                self.clean_request_resources(&created).await;
            }
            outcome
        };

        if self.settings.cleanup_scope == CleanupScope::Account {
            let _sweep = self.gate.exclusive().await;
            self.clean_assistants().await;
            self.clean_files().await;
        }

        let mut summary = outcome?;
        summary.elapsed = started.elapsed();
        info!(
            thread_id = %summary.thread_id,
            attempts = summary.poll_attempts,
            completed = summary.completed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Summarization finished"
        );
        Ok(summary)
    }

    async fn execute(
        &self,
        document: &UploadedDocument,
        prompt: &str,
        created: &mut CreatedResources,
    ) -> Result<Summary, WorkflowError> {
        info!("Creating file.");
        let file = self.api.upload_file(document).await?;
        info!("Created file {}.", file.id);
        created.file_id = Some(file.id.clone());

        info!("Creating assistant using file {}.", file.id);
        let spec = AssistantSpec {
            name: self.settings.assistant_name.clone(),
            model: self.settings.model.clone(),
            instructions: self.settings.instructions.clone(),
            file_ids: vec![file.id.clone()],
        };
        let assistant = self.api.create_assistant(&spec).await?;
        info!("Created assistant {}.", assistant.id);
        created.assistant_id = Some(assistant.id.clone());

        info!("Creating thread using file {}.", file.id);
        let thread = self.api.create_thread(prompt, &file.id).await?;
        info!("Created thread {}.", thread.id);
        created.thread_id = Some(thread.id.clone());

        info!(
            "Creating run for assistant {}, thread {}.",
            assistant.id, thread.id
        );
        let run = self.api.create_run(&thread.id, &assistant.id).await?;
        info!("Created run {}.", run.id);

        let polled = self.await_run(&thread.id, &run.id).await?;

        info!("Fetching messages for thread {}.", thread.id);
        let messages = self.api.list_messages(&thread.id).await?;
        info!("Fetched {} messages.", messages.len());

        let answer = extract_answer(&messages).ok_or_else(|| WorkflowError::AnswerMissing {
            thread_id: thread.id.clone(),
        })?;

        Ok(Summary {
            answer,
            thread_id: thread.id,
            run_status: polled.status,
            poll_attempts: polled.attempts,
            completed: polled.completed,
            elapsed: Duration::ZERO,
        })
    }

    /// Poll the run at a fixed interval until it completes or attempts run out
    async fn await_run(&self, thread_id: &str, run_id: &str) -> Result<PollOutcome, WorkflowError> {
        info!(
            "Awaiting messages for thread {}, run {}.",
            thread_id, run_id
        );
        let max_attempts = self.settings.max_attempts;
        let mut last_status = RunStatus::Queued;

        for attempt in 1..=max_attempts {
            let run = self.api.retrieve_run(thread_id, run_id).await?;
            debug!(attempt, status = %run.status, "Polled run {}", run_id);

            if run.status == RunStatus::Completed {
                return Ok(PollOutcome {
                    status: run.status,
                    attempts: attempt,
                    completed: true,
                });
            }

            if run.status.is_terminal() {
                let message = run
                    .last_error
                    .map(|e| format!("{}: {}", e.code, e.message))
                    .unwrap_or_else(|| "no error details".to_string());
                return Err(WorkflowError::RunFailed {
                    run_id: run.id,
                    status: run.status,
                    message,
                });
            }

            last_status = run.status;
            if attempt < max_attempts {
                tokio::time::sleep(self.settings.poll_interval).await;
            }
        }

        warn!(
            "Timeout while awaiting messages for thread {}, run {} (last status {}).",
            thread_id, run_id, last_status
        );
        Ok(PollOutcome {
            status: last_status,
            attempts: max_attempts,
            completed: false,
        })
    }

    // Threads cannot be listed, so only the one this request created is removed.
    async fn delete_thread(&self, thread_id: &str) {
        info!("Deleting thread {}.", thread_id);
        match self.api.delete_thread(thread_id).await {
            Ok(_) => info!("Deleted thread {}.", thread_id),
            Err(e) => warn!("Failed to delete thread {}: {:#}", thread_id, e),
        }
    }

    async fn clean_request_resources(&self, created: &CreatedResources) {
        if let Some(assistant_id) = created.assistant_id.as_deref() {
            if let Err(e) = self.api.delete_assistant(assistant_id).await {
                warn!("Failed to delete assistant {}: {:#}", assistant_id, e);
            }
        }
        if let Some(file_id) = created.file_id.as_deref() {
            if let Err(e) = self.api.delete_file(file_id).await {
                warn!("Failed to delete file {}: {:#}", file_id, e);
            }
        }
    }

    async fn clean_assistants(&self) {
        info!("Cleaning assistants.");
        let assistants = match self.api.list_assistants().await {
            Ok(assistants) => assistants,
            Err(e) => {
                warn!("Failed to list assistants: {:#}", e);
                return;
            }
        };

        let mut deleted = 0usize;
        for assistant in &assistants {
            match self.api.delete_assistant(&assistant.id).await {
                Ok(_) => deleted += 1,
                Err(e) => warn!("Failed to delete assistant {}: {:#}", assistant.id, e),
            }
        }
        info!("Deleted {} of {} assistants.", deleted, assistants.len());
    }

    async fn clean_files(&self) {
        info!("Cleaning files.");
        let files = match self.api.list_files().await {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to list files: {:#}", e);
                return;
            }
        };

        let mut deleted = 0usize;
        for file in &files {
            match self.api.delete_file(&file.id).await {
                Ok(_) => deleted += 1,
                Err(e) => warn!("Failed to delete file {}: {:#}", file.id, e),
            }
        }
        info!("Deleted {} of {} files.", deleted, files.len());
    }
}

/// Newest assistant-authored text in a newest-first message list
pub fn extract_answer(messages: &[ThreadMessage]) -> Option<String> {
    messages
        .iter()
        .filter(|m| m.role == MessageRole::Assistant)
        .find_map(|m| m.first_text())
        .map(str::to_string)
}

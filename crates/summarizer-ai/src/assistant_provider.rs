use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for Assistants API operations
pub type AssistantResult<T> = anyhow::Result<T>;

/// A document received from the upload form
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// File stored on the provider side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub purpose: Option<String>,
}

/// Parameters for creating an assistant
#[derive(Debug, Clone)]
pub struct AssistantSpec {
    pub name: String,
    pub model: String,
    pub instructions: Option<String>,
    pub file_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
}

/// Lifecycle status of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Expired,
    #[serde(untagged)]
    Other(String),
}

impl RunStatus {
    /// No further status transitions will happen
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Queued => write!(f, "queued"),
            RunStatus::InProgress => write!(f, "in_progress"),
            RunStatus::RequiresAction => write!(f, "requires_action"),
            RunStatus::Cancelling => write!(f, "cancelling"),
            RunStatus::Cancelled => write!(f, "cancelled"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Expired => write!(f, "expired"),
            RunStatus::Other(status) => write!(f, "{}", status),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub assistant_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Other(role) => write!(f, "{}", role),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
}

/// One content part of a thread message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    // image_file and anything newer
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl ThreadMessage {
    /// First text part of the message, if any
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|part| match part {
            MessageContent::Text { text } => Some(text.value.as_str()),
            MessageContent::Unsupported => None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionStatus {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
}

/// Remote calls the summarize workflow is built from.
///
/// Each method maps onto exactly one provider endpoint.
#[async_trait]
pub trait AssistantsApi: Send + Sync {
    /// Store a document for use by assistants
    async fn upload_file(&self, document: &UploadedDocument) -> AssistantResult<StoredFile>;

    /// Create an assistant with retrieval over the given files
    async fn create_assistant(&self, spec: &AssistantSpec) -> AssistantResult<Assistant>;

    /// Create a thread seeded with one user message carrying the prompt and the file
    async fn create_thread(&self, prompt: &str, file_id: &str) -> AssistantResult<Thread>;

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> AssistantResult<Run>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> AssistantResult<Run>;

    /// Messages of a thread, newest first
    async fn list_messages(&self, thread_id: &str) -> AssistantResult<Vec<ThreadMessage>>;

    async fn delete_thread(&self, thread_id: &str) -> AssistantResult<DeletionStatus>;

    async fn list_assistants(&self) -> AssistantResult<Vec<Assistant>>;

    async fn delete_assistant(&self, assistant_id: &str) -> AssistantResult<DeletionStatus>;

    async fn list_files(&self) -> AssistantResult<Vec<StoredFile>>;

    async fn delete_file(&self, file_id: &str) -> AssistantResult<DeletionStatus>;

    /// Get the name of this provider
    fn provider_name(&self) -> &str;
}

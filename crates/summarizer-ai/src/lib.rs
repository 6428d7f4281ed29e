pub mod assistant_provider;
pub mod openai_assistants_provider;
pub mod workflow;

pub use assistant_provider::*;
pub use openai_assistants_provider::OpenAIAssistantsProvider;
pub use workflow::{CleanupGate, Summary, SummarizeWorkflow, WorkflowError, WorkflowSettings};

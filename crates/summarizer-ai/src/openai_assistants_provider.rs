use crate::assistant_provider::*;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use summarizer_core::OpenAIConfig;

const ASSISTANTS_BETA_HEADER: &str = "assistants=v1";
const FILE_PURPOSE: &str = "assistants";
const LIST_PAGE_LIMIT: u32 = 100;

/// Assistants API provider backed by the OpenAI HTTP endpoints
pub struct OpenAIAssistantsProvider {
    api_key: SecretString,
    base_url: String,
    organization: Option<String>,
    client: Client,
}

impl OpenAIAssistantsProvider {
    /// Create a new provider from the `[openai]` config section
    pub fn new(config: &OpenAIConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or_else(|| {
                anyhow!("OpenAI API key is required. Set OPENAI_API_KEY environment variable.")
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            organization: config.organization.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .bearer_auth(self.api_key.expose_secret())
            .header("OpenAI-Beta", ASSISTANTS_BETA_HEADER);

        match &self.organization {
            Some(org) => builder.header("OpenAI-Organization", org),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let response = self
            .authorize(self.client.get(self.url(path)))
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to OpenAI", what))?;
        parse_response(response, what).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<T> {
        let response = self
            .authorize(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to OpenAI", what))?;
        parse_response(response, what).await
    }

    async fn delete(&self, path: &str, what: &str) -> Result<DeletionStatus> {
        let response = self
            .authorize(self.client.delete(self.url(path)))
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to OpenAI", what))?;
        parse_response(response, what).await
    }

    /// Walk a cursor-paginated list endpoint until `has_more` is false
    async fn list_all<T>(&self, path: &str, what: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned + HasId,
    {
        let mut items = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let page_path = match &after {
                Some(cursor) => format!("{}?limit={}&after={}", path, LIST_PAGE_LIMIT, cursor),
                None => format!("{}?limit={}", path, LIST_PAGE_LIMIT),
            };
            let page: ListEnvelope<T> = self.get(&page_path, what).await?;
            let next_cursor = page
                .last_id
                .clone()
                .or_else(|| page.data.last().map(|item| item.id().to_string()));
            let has_more = page.has_more && !page.data.is_empty();

            items.extend(page.data);

            match (has_more, next_cursor) {
                (true, Some(cursor)) => after = Some(cursor),
                _ => break,
            }
        }

        Ok(items)
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        return Err(anyhow!(
            "OpenAI API error during {} ({}): {}",
            what,
            status,
            error_text
        ));
    }

    let response_text = response
        .text()
        .await
        .with_context(|| format!("Failed to read OpenAI {} response body", what))?;

    tracing::trace!(operation = what, response = %response_text, "Raw OpenAI response");

    serde_json::from_str::<T>(&response_text).with_context(|| {
        format!(
            "Failed to parse OpenAI {} response. Raw response: {}",
            what, response_text
        )
    })
}

#[async_trait]
impl AssistantsApi for OpenAIAssistantsProvider {
    async fn upload_file(&self, document: &UploadedDocument) -> AssistantResult<StoredFile> {
        let mut part =
            multipart::Part::bytes(document.bytes.clone()).file_name(document.filename.clone());
        if let Some(content_type) = &document.content_type {
            part = part
                .mime_str(content_type)
                .with_context(|| format!("Invalid content type: {}", content_type))?;
        }

        let form = multipart::Form::new()
            .text("purpose", FILE_PURPOSE)
            .part("file", part);

        let response = self
            .authorize(self.client.post(self.url("files")))
            .multipart(form)
            .send()
            .await
            .context("Failed to send file upload request to OpenAI")?;

        parse_response(response, "file upload").await
    }

    async fn create_assistant(&self, spec: &AssistantSpec) -> AssistantResult<Assistant> {
        let request = CreateAssistantRequest {
            name: &spec.name,
            model: &spec.model,
            instructions: spec.instructions.as_deref(),
            tools: vec![ToolSpec {
                tool_type: "retrieval",
            }],
            file_ids: &spec.file_ids,
        };
        self.post_json("assistants", &request, "assistant creation")
            .await
    }

    async fn create_thread(&self, prompt: &str, file_id: &str) -> AssistantResult<Thread> {
        let request = CreateThreadRequest {
            messages: vec![ThreadMessageRequest {
                role: "user",
                content: prompt,
                file_ids: vec![file_id],
            }],
        };
        self.post_json("threads", &request, "thread creation").await
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> AssistantResult<Run> {
        let request = CreateRunRequest { assistant_id };
        self.post_json(&format!("threads/{}/runs", thread_id), &request, "run creation")
            .await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> AssistantResult<Run> {
        self.get(&format!("threads/{}/runs/{}", thread_id, run_id), "run retrieval")
            .await
    }

    async fn list_messages(&self, thread_id: &str) -> AssistantResult<Vec<ThreadMessage>> {
        let page: ListEnvelope<ThreadMessage> = self
            .get(
                &format!("threads/{}/messages?order=desc", thread_id),
                "message listing",
            )
            .await?;
        Ok(page.data)
    }

    async fn delete_thread(&self, thread_id: &str) -> AssistantResult<DeletionStatus> {
        self.delete(&format!("threads/{}", thread_id), "thread deletion")
            .await
    }

    async fn list_assistants(&self) -> AssistantResult<Vec<Assistant>> {
        self.list_all("assistants", "assistant listing").await
    }

    async fn delete_assistant(&self, assistant_id: &str) -> AssistantResult<DeletionStatus> {
        self.delete(&format!("assistants/{}", assistant_id), "assistant deletion")
            .await
    }

    async fn list_files(&self) -> AssistantResult<Vec<StoredFile>> {
        let page: ListEnvelope<StoredFile> = self.get("files", "file listing").await?;
        Ok(page.data)
    }

    async fn delete_file(&self, file_id: &str) -> AssistantResult<DeletionStatus> {
        self.delete(&format!("files/{}", file_id), "file deletion")
            .await
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

// Assistants API request/response types

#[derive(Debug, Serialize)]
struct ToolSpec {
    #[serde(rename = "type")]
    tool_type: &'static str,
}

#[derive(Debug, Serialize)]
struct CreateAssistantRequest<'a> {
    name: &'a str,
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
    tools: Vec<ToolSpec>,
    file_ids: &'a [String],
}

#[derive(Debug, Serialize)]
struct ThreadMessageRequest<'a> {
    role: &'static str,
    content: &'a str,
    file_ids: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct CreateThreadRequest<'a> {
    messages: Vec<ThreadMessageRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

trait HasId {
    fn id(&self) -> &str;
}

impl HasId for Assistant {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(key: &str) -> OpenAIConfig {
        OpenAIConfig {
            api_key: Some(SecretString::from(key.to_string())),
            ..Default::default()
        }
    }

    #[test]
    fn test_provider_creation_requires_api_key() {
        let config = OpenAIConfig {
            api_key: None,
            ..Default::default()
        };
        assert!(OpenAIAssistantsProvider::new(&config).is_err());
        assert!(OpenAIAssistantsProvider::new(&config_with_key("   ")).is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let mut config = config_with_key("sk-test");
        config.base_url = "http://localhost:9999/v1/".to_string();
        let provider = OpenAIAssistantsProvider::new(&config).unwrap();
        assert_eq!(provider.url("files"), "http://localhost:9999/v1/files");
        assert_eq!(provider.provider_name(), "openai");
    }

    #[test]
    fn assistant_request_uses_retrieval_tool() {
        let file_ids = vec!["file_1".to_string()];
        let request = CreateAssistantRequest {
            name: "File summarizer",
            model: "gpt-3.5-turbo-0125",
            instructions: None,
            tools: vec![ToolSpec {
                tool_type: "retrieval",
            }],
            file_ids: &file_ids,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["tools"][0]["type"], "retrieval");
        assert_eq!(json["file_ids"][0], "file_1");
        assert!(json.get("instructions").is_none());
    }

    #[test]
    fn thread_request_attaches_file_to_user_message() {
        let request = CreateThreadRequest {
            messages: vec![ThreadMessageRequest {
                role: "user",
                content: "Summarize this",
                file_ids: vec!["file_7"],
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Summarize this");
        assert_eq!(json["messages"][0]["file_ids"][0], "file_7");
    }

    #[test]
    fn list_envelope_tolerates_missing_cursor_fields() {
        let page: ListEnvelope<StoredFile> = serde_json::from_str(
            r#"{"object":"list","data":[{"id":"file_1","filename":"a.pdf","bytes":12}]}"#,
        )
        .unwrap();
        assert_eq!(page.data.len(), 1);
        assert!(!page.has_more);
        assert!(page.last_id.is_none());
    }
}

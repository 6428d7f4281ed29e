use async_trait::async_trait;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use summarizer_ai::*;
use summarizer_api::{create_router, AppState};
use summarizer_core::{ConfigManager, SummarizerConfig};

/// Provider double: every call succeeds, runs complete on the first poll
#[derive(Default)]
struct ScriptedAssistants {
    calls: AtomicUsize,
    run_status: Option<RunStatus>,
}

impl ScriptedAssistants {
    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn deleted(&self, id: &str) -> AssistantResult<DeletionStatus> {
        self.tick();
        Ok(DeletionStatus {
            id: id.to_string(),
            deleted: true,
        })
    }
}

#[async_trait]
impl AssistantsApi for ScriptedAssistants {
    async fn upload_file(&self, document: &UploadedDocument) -> AssistantResult<StoredFile> {
        self.tick();
        Ok(StoredFile {
            id: "file_1".to_string(),
            filename: document.filename.clone(),
            bytes: document.bytes.len() as u64,
            purpose: None,
        })
    }

    async fn create_assistant(&self, spec: &AssistantSpec) -> AssistantResult<Assistant> {
        self.tick();
        Ok(Assistant {
            id: "asst_1".to_string(),
            name: Some(spec.name.clone()),
            model: spec.model.clone(),
        })
    }

    async fn create_thread(&self, _prompt: &str, _file_id: &str) -> AssistantResult<Thread> {
        self.tick();
        Ok(Thread {
            id: "thread_1".to_string(),
        })
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> AssistantResult<Run> {
        self.tick();
        Ok(Run {
            id: "run_1".to_string(),
            thread_id: thread_id.to_string(),
            assistant_id: assistant_id.to_string(),
            status: RunStatus::Queued,
            last_error: None,
        })
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> AssistantResult<Run> {
        self.tick();
        Ok(Run {
            id: run_id.to_string(),
            thread_id: thread_id.to_string(),
            assistant_id: "asst_1".to_string(),
            status: self.run_status.clone().unwrap_or(RunStatus::Completed),
            last_error: None,
        })
    }

    async fn list_messages(&self, _thread_id: &str) -> AssistantResult<Vec<ThreadMessage>> {
        self.tick();
        Ok(vec![ThreadMessage {
            id: "msg_2".to_string(),
            role: MessageRole::Assistant,
            content: vec![MessageContent::Text {
                text: TextContent {
                    value: "Concise summary.".to_string(),
                },
            }],
        }])
    }

    async fn delete_thread(&self, thread_id: &str) -> AssistantResult<DeletionStatus> {
        self.deleted(thread_id)
    }

    async fn list_assistants(&self) -> AssistantResult<Vec<Assistant>> {
        self.tick();
        Ok(Vec::new())
    }

    async fn delete_assistant(&self, assistant_id: &str) -> AssistantResult<DeletionStatus> {
        self.deleted(assistant_id)
    }

    async fn list_files(&self) -> AssistantResult<Vec<StoredFile>> {
        self.tick();
        Ok(Vec::new())
    }

    async fn delete_file(&self, file_id: &str) -> AssistantResult<DeletionStatus> {
        self.deleted(file_id)
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

fn test_config() -> Arc<ConfigManager> {
    let mut config = SummarizerConfig::default();
    config.polling.interval_ms = 1;
    config.polling.max_attempts = 3;
    config.server.max_upload_bytes = 64 * 1024;
    Arc::new(ConfigManager::from_config(config).expect("valid test config"))
}

fn server_with(api: Arc<ScriptedAssistants>) -> TestServer {
    let state = AppState::with_api(test_config(), api);
    TestServer::new(create_router(state)).unwrap()
}

fn upload(filename: &str, prompt: &str) -> MultipartForm {
    MultipartForm::new().add_text("prompt", prompt.to_string()).add_part(
        "file",
        Part::bytes(b"quarterly numbers went up".to_vec())
            .file_name(filename.to_string())
            .mime_type("text/plain"),
    )
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let server = server_with(Arc::new(ScriptedAssistants::default()));

    let resp = server.get("/health").await;
    assert_eq!(resp.status_code(), 200);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["provider"], "scripted");
}

#[tokio::test]
async fn health_reports_degraded_without_api_key() {
    let state = AppState::new(test_config());
    let server = TestServer::new(create_router(state)).unwrap();

    let resp = server.get("/health").await;
    assert_eq!(resp.status_code(), 200);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn index_serves_upload_form() {
    let server = server_with(Arc::new(ScriptedAssistants::default()));

    let resp = server.get("/").await;
    assert_eq!(resp.status_code(), 200);
    let html = resp.text();
    assert!(html.contains("multipart/form-data"));
    assert!(html.contains("name=\"prompt\""));
}

#[tokio::test]
async fn summarize_returns_answer() {
    let api = Arc::new(ScriptedAssistants::default());
    let server = server_with(api.clone());

    let resp = server.post("/").multipart(upload("report.txt", "Summarize")).await;
    assert_eq!(resp.status_code(), 200);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["data"], "Concise summary.");
    assert!(api.calls.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn summarize_alias_route_works() {
    let server = server_with(Arc::new(ScriptedAssistants::default()));

    let resp = server
        .post("/summarize")
        .multipart(upload("report.txt", ""))
        .await;
    assert_eq!(resp.status_code(), 200);
}

#[tokio::test]
async fn invalid_forms_get_400_and_never_reach_the_provider() {
    let api = Arc::new(ScriptedAssistants::default());
    let server = server_with(api.clone());

    let long_prompt = "p".repeat(200);
    let cases = vec![
        upload("undefined", "Summarize"),
        upload("report.txt", &long_prompt),
        MultipartForm::new().add_text("prompt", "no file"),
        MultipartForm::new().add_part(
            "file",
            Part::bytes(b"data".to_vec()).file_name("report.txt"),
        ),
    ];

    for form in cases {
        let resp = server.post("/").multipart(form).await;
        assert_eq!(resp.status_code(), 400);
        let body: serde_json::Value = resp.json();
        assert_eq!(body, serde_json::json!({ "error": true }));
    }

    let urlencoded = server.post("/").form(&[("prompt", "hi")]).await;
    assert_eq!(urlencoded.status_code(), 400);
    let body: serde_json::Value = urlencoded.json();
    assert_eq!(body, serde_json::json!({ "error": true }));

    let plain = server.post("/summarize").text("prompt=hi").await;
    assert_eq!(plain.status_code(), 400);
    let body: serde_json::Value = plain.json();
    assert_eq!(body, serde_json::json!({ "error": true }));

    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let api = Arc::new(ScriptedAssistants::default());
    let server = server_with(api.clone());

    let form = MultipartForm::new().add_text("prompt", "Summarize").add_part(
        "file",
        Part::bytes(vec![b'x'; 128 * 1024])
            .file_name("huge.txt")
            .mime_type("text/plain"),
    );

    let resp = server.post("/").multipart(form).await;
    assert_eq!(resp.status_code(), 413);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], 413);
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_run_maps_to_bad_gateway() {
    let api = Arc::new(ScriptedAssistants {
        run_status: Some(RunStatus::Failed),
        ..Default::default()
    });
    let server = server_with(api);

    let resp = server.post("/").multipart(upload("report.txt", "Summarize")).await;
    assert_eq!(resp.status_code(), 502);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], 502);
    assert!(body["error"].as_str().unwrap_or_default().contains("failed"));
}

#[tokio::test]
async fn missing_api_key_is_service_unavailable() {
    let state = AppState::new(test_config());
    let server = TestServer::new(create_router(state)).unwrap();

    let resp = server.post("/").multipart(upload("report.txt", "Summarize")).await;
    assert_eq!(resp.status_code(), 503);
}

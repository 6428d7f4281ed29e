use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{multipart::{MultipartError, MultipartRejection}, Multipart, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::Serialize;
use summarizer_ai::UploadedDocument;
use tracing::info;

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub provider: Option<String>,
}

#[derive(Serialize)]
pub struct SummarizeResponse {
    pub data: String,
}

/// File part of the upload form
#[derive(Debug, Default)]
pub struct FilePart {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Raw form fields before validation
#[derive(Debug, Default)]
pub struct SummarizeForm {
    pub file: Option<FilePart>,
    pub prompt: Option<String>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider = state
        .workflow
        .as_ref()
        .map(|w| w.provider_name().to_string());

    Json(HealthResponse {
        status: if provider.is_some() {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider,
    })
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Form action: validate, summarize through the assistant, return the answer
pub async fn summarize(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<SummarizeResponse>> {
    let mut multipart =
        multipart.map_err(|rejection| ApiError::InvalidForm(rejection.body_text()))?;
    let form = read_form(&mut multipart).await?;
    let max_prompt_chars = state.config.config().form.max_prompt_chars;
    let (document, prompt) = validate_form(form, max_prompt_chars)?;

    let workflow = state.workflow()?;
    info!(
        filename = %document.filename,
        bytes = document.bytes.len(),
        "Summarizing uploaded document"
    );
    let summary = workflow.run(&document, &prompt).await?;

    Ok(Json(SummarizeResponse {
        data: summary.answer,
    }))
}

async fn read_form(multipart: &mut Multipart) -> ApiResult<SummarizeForm> {
    let mut form = SummarizeForm::default();

    // Repeated fields: the last one wins.
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.file = Some(FilePart {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "prompt" => {
                form.prompt = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    Ok(form)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::InvalidForm(err.body_text())
    }
}

// Browsers submit an empty or "undefined" name when no file was picked.
fn is_valid_filename(name: &str) -> bool {
    !name.is_empty() && name != "undefined"
}

/// Check both fields; the prompt must be shorter than `max_prompt_chars` UTF-16 code units
pub fn validate_form(
    form: SummarizeForm,
    max_prompt_chars: usize,
) -> ApiResult<(UploadedDocument, String)> {
    let file = form
        .file
        .ok_or_else(|| ApiError::InvalidForm("missing file field".to_string()))?;
    let filename = file
        .filename
        .filter(|name| is_valid_filename(name))
        .ok_or_else(|| ApiError::InvalidForm("file has no usable name".to_string()))?;

    let prompt = form
        .prompt
        .ok_or_else(|| ApiError::InvalidForm("missing prompt field".to_string()))?;
    let prompt_len = prompt.encode_utf16().count();
    if prompt_len >= max_prompt_chars {
        return Err(ApiError::InvalidForm(format!(
            "prompt is {} UTF-16 units, limit is {}",
            prompt_len, max_prompt_chars
        )));
    }

    let mut document = UploadedDocument::new(filename, file.bytes);
    if let Some(content_type) = file.content_type {
        document = document.with_content_type(content_type);
    }

    Ok((document, prompt))
}

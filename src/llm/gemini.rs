use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::{GenerateRequest, GenerateResponse, Provider};

const GEMINI_HOST: &str = "generativelanguage.googleapis.com";

pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiProvider {
    pub fn new() -> Self {
        Self::with_base_url(format!("https://{GEMINI_HOST}/v1beta"))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for GeminiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    thinking_config: ThinkingConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

/// Keeps the status and provider message in the text, which is all the
/// failure classifier sees.
fn api_error(status: StatusCode, body: &str) -> anyhow::Error {
    match serde_json::from_str::<GeminiError>(body) {
        Ok(err) => anyhow::anyhow!("Gemini API error ({}): {}", status, err.error.message),
        Err(_) => anyhow::anyhow!("Gemini API error ({}): {}", status, body),
    }
}

fn build_body(req: &GenerateRequest) -> GeminiRequest {
    GeminiRequest {
        system_instruction: GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: Some(req.system.clone()),
                thought: None,
            }],
        },
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                text: Some(req.prompt.clone()),
                thought: None,
            }],
        }],
        generation_config: GenerationConfig {
            temperature: req.temperature,
            top_p: req.top_p,
            thinking_config: ThinkingConfig {
                thinking_budget: req.reasoning_budget,
            },
        },
    }
}

fn into_response(resp: GeminiResponse, requested_model: &str) -> anyhow::Result<GenerateResponse> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(anyhow::anyhow!("Gemini prompt blocked: {reason}"));
    }

    let candidate = resp.candidates.into_iter().next();
    let finish_reason = candidate
        .as_ref()
        .and_then(|c| c.finish_reason.clone())
        .unwrap_or_default();

    if finish_reason == "SAFETY" {
        return Err(anyhow::anyhow!("Gemini response blocked: {finish_reason}"));
    }

    let content = candidate
        .and_then(|c| c.content)
        .map(|c| {
            c.parts
                .into_iter()
                .filter(|p| !p.thought.unwrap_or(false))
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let (input_tokens, output_tokens) = resp
        .usage_metadata
        .map(|u| (u.prompt_token_count, u.candidates_token_count))
        .unwrap_or((0, 0));

    Ok(GenerateResponse {
        content,
        model: resp
            .model_version
            .unwrap_or_else(|| requested_model.to_string()),
        input_tokens,
        output_tokens,
        finish_reason: finish_reason.to_lowercase(),
    })
}

#[async_trait::async_trait]
impl Provider for GeminiProvider {
    async fn generate(
        &self,
        credential: &str,
        req: &GenerateRequest,
    ) -> anyhow::Result<GenerateResponse> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(credential)
                .map_err(|e| anyhow::anyhow!("invalid API key header: {e}"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let url = format!("{}/models/{}:generateContent", self.base_url, req.model);

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(&build_body(req))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &error_body));
        }

        let resp: GeminiResponse = response.json().await?;
        into_response(resp, &req.model)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn server_address(&self) -> &str {
        GEMINI_HOST
    }
}

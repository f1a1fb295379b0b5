use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::classify::classify_failure;
use super::{GenerateRequest, GenerateResponse, Provider};
use crate::error::AppError;
use crate::pipeline::AnalysisMode;
use crate::telemetry::metrics::{
    GEN_AI_ERROR_COUNT, GEN_AI_OPERATION_DURATION, GEN_AI_TOKEN_USAGE,
};

pub const TEMPERATURE: f32 = 0.7;
pub const TOP_P: f32 = 0.9;

/// Returned in place of an empty completion.
pub const EMPTY_RESULT_FALLBACK: &str = "لم يتم العثور على نتائج للتحليل.";

/// Literal some deployment tooling writes when the variable was never set.
const PLACEHOLDER_CREDENTIAL: &str = "undefined";

/// One stateless generation round-trip per call: no retries, no fallback
/// provider, no timeout of its own.
pub struct GenerationClient {
    provider: Arc<dyn Provider>,
    model: String,
    credential: Option<String>,
}

impl GenerationClient {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        credential: Option<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            credential,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn resolve_credential(&self) -> Result<&str, AppError> {
        match self.credential.as_deref().map(str::trim) {
            None => Err(AppError::ConfigurationMissing("API_KEY is not set".to_string())),
            Some("") => Err(AppError::ConfigurationMissing("API_KEY is blank".to_string())),
            Some(PLACEHOLDER_CREDENTIAL) => Err(AppError::ConfigurationMissing(
                "API_KEY holds the placeholder value".to_string(),
            )),
            Some(key) => Ok(key),
        }
    }

    /// Runs the generation call and returns the raw report text.
    pub async fn generate(
        &self,
        system: &str,
        prompt: &str,
        mode: AnalysisMode,
    ) -> Result<String, AppError> {
        let credential = self.resolve_credential()?;

        let req = GenerateRequest {
            model: self.model.clone(),
            system: system.to_string(),
            prompt: prompt.to_string(),
            temperature: TEMPERATURE,
            top_p: TOP_P,
            reasoning_budget: mode.profile().reasoning_budget,
            stage: mode.as_str().to_string(),
        };

        let resp = self.generate_once(credential, &req).await?;

        if resp.content.is_empty() {
            tracing::warn!(model = %resp.model, "provider returned an empty report");
            return Ok(EMPTY_RESULT_FALLBACK.to_string());
        }

        Ok(resp.content)
    }

    async fn generate_once(
        &self,
        credential: &str,
        req: &GenerateRequest,
    ) -> Result<GenerateResponse, AppError> {
        let provider_name = self.provider.name().to_string();
        let span_display_name = format!("gen_ai.chat {}", req.model);
        let start = Instant::now();

        let span = tracing::info_span!(
            "gen_ai.chat",
            otel.name = %span_display_name,
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = %provider_name,
            gen_ai.request.model = %req.model,
            server.address = %self.provider.server_address(),
            gen_ai.request.temperature = req.temperature,
            gen_ai.request.top_p = req.top_p,
            gen_ai.request.reasoning_budget = req.reasoning_budget as i64,
            gen_ai.response.model = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            analysis.mode = %req.stage,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        span.add_event(
            "gen_ai.user.message",
            vec![
                KeyValue::new("gen_ai.prompt", truncate(&req.prompt, 1000)),
                KeyValue::new("gen_ai.system_instructions", truncate(&req.system, 500)),
            ],
        );

        let result = self
            .provider
            .generate(credential, req)
            .instrument(span.clone())
            .await;

        let duration = start.elapsed().as_secs_f64();
        let op_kv = KeyValue::new("gen_ai.operation.name", "chat");
        let provider_kv = KeyValue::new("gen_ai.provider.name", provider_name.clone());
        let model_kv = KeyValue::new("gen_ai.request.model", req.model.clone());

        match result {
            Ok(resp) => {
                span.record("gen_ai.response.model", resp.model.as_str());
                span.record("gen_ai.usage.input_tokens", resp.input_tokens as i64);
                span.record("gen_ai.usage.output_tokens", resp.output_tokens as i64);
                if !resp.finish_reason.is_empty() {
                    span.record("gen_ai.response.finish_reasons", resp.finish_reason.as_str());
                }

                span.add_event(
                    "gen_ai.assistant.message",
                    vec![KeyValue::new(
                        "gen_ai.completion",
                        truncate(&resp.content, 2000),
                    )],
                );

                let token_counts = [("input", resp.input_tokens), ("output", resp.output_tokens)];
                for (token_type, count) in token_counts {
                    GEN_AI_TOKEN_USAGE.record(
                        f64::from(count),
                        &[
                            KeyValue::new("gen_ai.token.type", token_type),
                            op_kv.clone(),
                            provider_kv.clone(),
                            model_kv.clone(),
                        ],
                    );
                }
                GEN_AI_OPERATION_DURATION.record(duration, &[op_kv, provider_kv, model_kv]);

                Ok(resp)
            }
            Err(err) => {
                let classified = classify_failure(&err);

                span.record("otel.status_code", "ERROR");
                span.record("error.type", classified.kind());

                tracing::error!(
                    parent: &span,
                    provider = %provider_name,
                    model = %req.model,
                    error = %err,
                    kind = classified.kind(),
                    "generation call failed"
                );

                GEN_AI_ERROR_COUNT.add(
                    1,
                    &[
                        provider_kv,
                        model_kv,
                        KeyValue::new("error.type", classified.kind()),
                    ],
                );

                Err(classified)
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.char_indices()
            .take_while(|&(i, c)| i + c.len_utf8() <= max)
            .map(|(_, c)| c)
            .collect()
    }
}

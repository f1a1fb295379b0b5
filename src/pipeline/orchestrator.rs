use std::time::Instant;

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use opentelemetry::trace::TraceContextExt;
use serde::Serialize;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use crate::error::AppError;
use crate::llm::GenerationClient;
use crate::telemetry::metrics::{ANALYSIS_CHART_OUTCOME, ANALYSIS_DURATION, ANALYSIS_REQUESTS};

use super::chart::ChartDataBlock;
use super::present::{self, ChartSpec, ChartSpecRenderer, MarkdownPassthrough};
use super::{AnalysisMode, AnalysisRequest};

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub mode: AnalysisMode,
    pub model: String,
    pub prose: String,
    pub chart: Option<ChartDataBlock>,
    pub charts: Vec<ChartSpec>,
    pub generated_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub trace_id: String,
}

/// One stateless round-trip: prompt, generate, split, validate, render.
#[tracing::instrument(
    name = "analysis",
    skip(client, request),
    fields(
        analysis.mode = request.mode.as_str(),
        analysis.id,
        analysis.chart,
        analysis.prose_len,
        analysis.duration_ms,
    )
)]
pub async fn run_analysis(
    client: &GenerationClient,
    request: &AnalysisRequest,
) -> Result<AnalysisReport, AppError> {
    request.validate()?;

    let start = Instant::now();
    let mode_kv = KeyValue::new("analysis.mode", request.mode.as_str());
    ANALYSIS_REQUESTS.add(1, &[mode_kv.clone()]);

    let span = tracing::Span::current();
    let context = span.context();
    let otel_span = context.span();
    let trace_id = otel_span.span_context().trace_id().to_string();

    let prompt = request.prompt();
    let raw = client
        .generate(&prompt.system_instruction, &prompt.user_prompt, request.mode)
        .await?;

    let (cleaned, outcome) = present::clean(&raw);
    let rendered = present::render(&cleaned, &MarkdownPassthrough, &ChartSpecRenderer);

    let duration = start.elapsed();
    let report = AnalysisReport {
        id: Uuid::new_v4(),
        mode: request.mode,
        model: client.model().to_string(),
        prose: rendered.prose,
        chart: cleaned.chart,
        charts: rendered.chart.unwrap_or_default(),
        generated_at: Utc::now(),
        duration_ms: duration.as_millis() as u64,
        trace_id,
    };

    ANALYSIS_DURATION.record(duration.as_secs_f64(), &[mode_kv.clone()]);
    ANALYSIS_CHART_OUTCOME.add(
        1,
        &[mode_kv, KeyValue::new("analysis.chart", outcome.as_str())],
    );

    span.record("analysis.id", report.id.to_string());
    span.record("analysis.chart", outcome.as_str());
    span.record("analysis.prose_len", report.prose.len());
    span.record("analysis.duration_ms", report.duration_ms);

    tracing::info!(
        analysis.id = %report.id,
        chart = outcome.as_str(),
        charts = report.charts.len(),
        "analysis complete"
    );

    Ok(report)
}

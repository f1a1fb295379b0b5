use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opentelemetry::trace::TraceContextExt;
use serde_json::json;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Every failure a caller can observe. `Display` is the operator-facing text
/// that goes to logs; [`AppError::user_message`] is what the caller sees.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Authentication rejected: {0}")]
    AuthenticationRejected(String),

    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Generation failed: {0}")]
    Unclassified(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::ConfigurationMissing(_) => "configuration_missing",
            AppError::AuthenticationRejected(_) => "authentication_rejected",
            AppError::ContentFiltered(_) => "content_filtered",
            AppError::QuotaExceeded(_) => "quota_exceeded",
            AppError::Unclassified(_) => "unclassified",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ConfigurationMissing(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::AuthenticationRejected(_) => StatusCode::BAD_GATEWAY,
            AppError::ContentFiltered(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unclassified(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Localized message safe to show to the person who asked for the report.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::ConfigurationMissing(_) => "خطأ في الإعدادات: لم يتم العثور على مفتاح API. \
                يرجى التأكد من ضبط متغير البيئة API_KEY بشكل صحيح."
                .to_string(),
            AppError::AuthenticationRejected(_) => "عفواً، مفتاح API المستخدم غير صالح أو منتهي \
                الصلاحية. يرجى مراجعة إعدادات API_KEY الخاصة بك."
                .to_string(),
            AppError::ContentFiltered(_) => "تم حظر الطلب بواسطة فلاتر الأمان. المحتوى قد يكون \
                حساساً جداً للتحليل الآلي."
                .to_string(),
            AppError::QuotaExceeded(_) => "تم تجاوز حد الحصص المتاحة (Quota exceeded). يرجى \
                المحاولة مرة أخرى لاحقاً."
                .to_string(),
            AppError::Unclassified(_) => "حدث خطأ تقني أثناء محاولة تحليل البيانات. يرجى التأكد \
                من اتصال الإنترنت وصلاحية مفتاح API والمحاولة مرة أخرى."
                .to_string(),
        }
    }
}

fn get_trace_id() -> Option<String> {
    let span = Span::current();
    let context = span.context();
    let span_ref = context.span();
    let span_context = span_ref.span_context();

    if span_context.is_valid() {
        Some(span_context.trace_id().to_string())
    } else {
        None
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::Validation(msg) => tracing::debug!(error = %msg, "Rejected request"),
            _ => tracing::warn!(error = %self, kind = self.kind(), "Analysis failed"),
        }

        let mut body = json!({
            "error": self.user_message(),
            "kind": self.kind(),
            "status": status.as_u16(),
        });
        if let Some(trace_id) = get_trace_id() {
            body["trace_id"] = json!(trace_id);
        }

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

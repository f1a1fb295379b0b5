pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod routes;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{Request, Response, StatusCode};
use axum::routing::{get, post};
use opentelemetry::KeyValue;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{MakeSpan, OnResponse, TraceLayer},
};
use tracing::Span;

pub use config::Config;
use telemetry::{HTTP_REQUEST_DURATION, HTTP_REQUESTS_TOTAL};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub client: Arc<llm::GenerationClient>,
}

impl AppState {
    pub fn from_config(config: Config) -> Self {
        let provider = build_provider(&config);
        let client = llm::GenerationClient::new(
            provider,
            config.llm_model.clone(),
            config.api_key.clone(),
        );
        Self {
            config,
            client: Arc::new(client),
        }
    }
}

fn build_provider(config: &Config) -> Arc<dyn llm::Provider> {
    match config.llm_provider.as_str() {
        "openai" => Arc::new(llm::openai::OpenAIProvider::new(config.llm_base_url.clone())),
        "gemini" => match &config.llm_base_url {
            Some(base) => Arc::new(llm::gemini::GeminiProvider::with_base_url(base.clone())),
            None => Arc::new(llm::gemini::GeminiProvider::new()),
        },
        other => {
            tracing::warn!(provider = %other, "unknown LLM_PROVIDER, using gemini");
            Arc::new(llm::gemini::GeminiProvider::new())
        }
    }
}

#[derive(Clone)]
struct HttpMakeSpan;

impl<B> MakeSpan<B> for HttpMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let method = request.method().as_str();
        let path = request.uri().path();

        tracing::info_span!(
            "HTTP request",
            otel.name = %format!("{} {}", method, path),
            http.method = %method,
            http.route = %path,
            http.target = %request.uri(),
            http.flavor = ?request.version(),
            http.user_agent = request.headers()
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or(""),
            http.response.status_code = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
        )
    }
}

#[derive(Clone)]
struct HttpOnResponse;

impl<B> OnResponse<B> for HttpOnResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status().as_u16();

        span.record("http.response.status_code", status as i64);
        span.record(
            "otel.status_code",
            if status >= 500 { "ERROR" } else { "OK" },
        );

        let latency_ms = latency.as_secs_f64() * 1000.0;
        let attrs = [
            KeyValue::new("http.status_code", status.to_string()),
            KeyValue::new("http.status_class", format!("{}xx", status / 100)),
        ];

        HTTP_REQUESTS_TOTAL.add(1, &attrs);
        HTTP_REQUEST_DURATION.record(latency_ms, &attrs);

        tracing::info!(
            http.response.status_code = status,
            latency_ms = latency_ms,
            "finished processing request"
        );
    }
}

pub fn router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .route("/api/health", get(routes::health::health))
        .route("/api/modes", get(routes::modes::list_modes))
        .route("/api/analyses", post(routes::analyses::create_analysis))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(HttpMakeSpan)
                .on_response(HttpOnResponse),
        )
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

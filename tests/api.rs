use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use profile_analysis_service::llm::{
    GenerateRequest, GenerateResponse, GenerationClient, Provider,
};
use profile_analysis_service::{AppState, Config, router};

const BEHAVIORAL_REPORT: &str = "intro text\n[CHART_DATA]\n{\"engagement_metrics\":[{\"name\":\"likes\",\"value\":5}]}\n[/CHART_DATA]\nmore text";

struct CannedProvider {
    reply: Result<&'static str, &'static str>,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl Provider for CannedProvider {
    async fn generate(
        &self,
        _credential: &str,
        req: &GenerateRequest,
    ) -> anyhow::Result<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reply {
            Ok(text) => Ok(GenerateResponse {
                content: text.to_string(),
                model: req.model.clone(),
                input_tokens: 1,
                output_tokens: 1,
                finish_reason: "stop".to_string(),
            }),
            Err(msg) => Err(anyhow::anyhow!("{}", msg)),
        }
    }

    fn name(&self) -> &str {
        "canned"
    }

    fn server_address(&self) -> &str {
        "localhost"
    }
}

fn test_config(api_key: Option<&str>) -> Config {
    Config {
        port: 0,
        environment: "test".to_string(),
        llm_provider: "canned".to_string(),
        llm_model: "gemini-3-pro-preview".to_string(),
        llm_base_url: None,
        api_key: api_key.map(str::to_string),
        request_timeout_secs: 30,
        otel_service_name: "profile-analysis-service-test".to_string(),
        otel_exporter_endpoint: "http://localhost:4317".to_string(),
    }
}

fn app(provider: Arc<CannedProvider>, api_key: Option<&str>) -> axum::Router {
    let config = test_config(api_key);
    let client = GenerationClient::new(provider, config.llm_model.clone(), config.api_key.clone());
    router(AppState {
        config,
        client: Arc::new(client),
    })
}

fn provider(reply: Result<&'static str, &'static str>) -> Arc<CannedProvider> {
    Arc::new(CannedProvider {
        reply,
        calls: AtomicUsize::new(0),
    })
}

async fn post_analysis(app: axum::Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/analyses")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_ok() {
    let response = app(provider(Ok("")), Some("key"))
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn modes_are_listed() {
    let response = app(provider(Ok("")), None)
        .oneshot(Request::get("/api/modes").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let modes: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["mode"].as_str().unwrap())
        .collect();
    assert_eq!(modes, ["psychological", "behavioral", "comparison"]);
}

#[tokio::test]
async fn behavioral_analysis_returns_prose_and_chart() {
    let provider = provider(Ok(BEHAVIORAL_REPORT));
    let (status, body) = post_analysis(
        app(provider.clone(), Some("key")),
        json!({"mode": "behavioral", "primary_subject": "https://example.com/alice"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prose"], "intro text\n\nmore text");
    assert_eq!(
        body["chart"],
        json!({"engagement_metrics": [{"label": "likes", "value": 5.0}]})
    );
    assert_eq!(body["charts"][0]["kind"], "horizontal_bar");
    assert_eq!(body["mode"], "behavioral");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn comparison_without_second_profile_is_rejected() {
    let provider = provider(Ok("unused"));
    let (status, body) = post_analysis(
        app(provider.clone(), Some("key")),
        json!({"mode": "comparison", "primary_subject": "@a"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_credential_fails_before_any_call() {
    let provider = provider(Ok("unused"));
    let (status, body) = post_analysis(
        app(provider.clone(), None),
        json!({"mode": "psychological", "primary_subject": "@a"}),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "configuration_missing");
    assert!(body["error"].as_str().unwrap().contains("API_KEY"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn provider_failures_map_to_statuses() {
    let cases = [
        ("API key not valid", StatusCode::BAD_GATEWAY, "authentication_rejected"),
        ("prompt blocked: SAFETY", StatusCode::UNPROCESSABLE_ENTITY, "content_filtered"),
        ("429 Too Many Requests", StatusCode::TOO_MANY_REQUESTS, "quota_exceeded"),
        ("connection reset", StatusCode::BAD_GATEWAY, "unclassified"),
    ];

    for (message, expected_status, expected_kind) in cases {
        let (status, body) = post_analysis(
            app(provider(Err(message)), Some("key")),
            json!({"mode": "psychological", "primary_subject": "@a"}),
        )
        .await;
        assert_eq!(status, expected_status, "{message}");
        assert_eq!(body["kind"], expected_kind, "{message}");
    }
}

#[tokio::test]
async fn empty_generation_returns_fallback_sentence() {
    let (status, body) = post_analysis(
        app(provider(Ok("")), Some("key")),
        json!({"mode": "behavioral", "primary_subject": "@a"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prose"], "لم يتم العثور على نتائج للتحليل.");
    assert!(body["chart"].is_null());
}

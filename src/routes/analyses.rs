use axum::{Json, extract::State};
use serde::Deserialize;

use crate::AppState;
use crate::error::AppResult;
use crate::pipeline::{AnalysisMode, AnalysisReport, AnalysisRequest, run_analysis};

#[derive(Debug, Deserialize)]
pub struct CreateAnalysisBody {
    pub mode: AnalysisMode,
    pub primary_subject: String,
    #[serde(default)]
    pub secondary_subject: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

impl From<CreateAnalysisBody> for AnalysisRequest {
    fn from(body: CreateAnalysisBody) -> Self {
        let comparison = body.mode.requires_secondary_subject();
        AnalysisRequest {
            mode: body.mode,
            primary_subject: body.primary_subject.trim().to_string(),
            // Only comparison reads the second profile.
            secondary_subject: body
                .secondary_subject
                .filter(|_| comparison)
                .map(|s| s.trim().to_string()),
            context: body
                .context
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        }
    }
}

pub async fn create_analysis(
    State(state): State<AppState>,
    Json(body): Json<CreateAnalysisBody>,
) -> AppResult<Json<AnalysisReport>> {
    let request = AnalysisRequest::from(body);
    let report = run_analysis(&state.client, &request).await?;
    Ok(Json(report))
}

use axum::Json;
use serde::Serialize;

use crate::pipeline::AnalysisMode;
use crate::pipeline::prompt::NamedMetric;

#[derive(Debug, Serialize)]
pub struct ModeSummary {
    pub mode: AnalysisMode,
    pub metrics: &'static [NamedMetric],
    pub sections: &'static [&'static str],
    pub charts: Vec<&'static str>,
    pub reasoning_budget: u32,
}

pub async fn list_modes() -> Json<Vec<ModeSummary>> {
    Json(AnalysisMode::ALL.iter().map(|m| summarize(*m)).collect())
}

fn summarize(mode: AnalysisMode) -> ModeSummary {
    let profile = mode.profile();
    ModeSummary {
        mode,
        metrics: profile.metrics,
        sections: profile.sections,
        charts: profile
            .charts
            .map(|shape| shape.series.iter().map(|s| s.key).collect())
            .unwrap_or_default(),
        reasoning_budget: profile.reasoning_budget,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_modes() {
        let Json(modes) = list_modes().await;
        assert_eq!(modes.len(), 3);

        let behavioral = serde_json::to_value(&modes[1]).unwrap();
        assert_eq!(behavioral["mode"], "behavioral");
        assert_eq!(
            behavioral["charts"],
            serde_json::json!(["if_history", "cdi_distribution", "engagement_metrics"])
        );
        assert_eq!(behavioral["metrics"][2]["symbol"], "CDI");

        assert!(modes[2].charts.is_empty());
        assert_eq!(modes[2].reasoning_budget, 5000);
    }
}

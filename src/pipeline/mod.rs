pub mod chart;
pub mod orchestrator;
pub mod present;
pub mod prompt;
pub mod split;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub use chart::{ChartDataBlock, ChartRecord, validate};
pub use orchestrator::{AnalysisReport, run_analysis};
pub use present::{CleanedReport, clean_report, present};
pub use prompt::{ModeProfile, PromptPair, build};
pub use split::{SplitReport, split};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Psychological,
    Behavioral,
    Comparison,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 3] = [
        AnalysisMode::Psychological,
        AnalysisMode::Behavioral,
        AnalysisMode::Comparison,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisMode::Psychological => "psychological",
            AnalysisMode::Behavioral => "behavioral",
            AnalysisMode::Comparison => "comparison",
        }
    }

    pub fn requires_secondary_subject(self) -> bool {
        self == AnalysisMode::Comparison
    }
}

/// One user action's worth of input. Never mutated once built.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub mode: AnalysisMode,
    pub primary_subject: String,
    #[serde(default)]
    pub secondary_subject: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

impl AnalysisRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.primary_subject.trim().is_empty() {
            return Err(AppError::Validation(
                "يرجى إدخال رابط أو معرّف الملف الشخصي المراد تحليله.".to_string(),
            ));
        }

        if self.mode.requires_secondary_subject()
            && self
                .secondary_subject
                .as_deref()
                .is_none_or(|s| s.trim().is_empty())
        {
            return Err(AppError::Validation(
                "وضع المقارنة يتطلب إدخال الملف الشخصي الثاني.".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mode: AnalysisMode, primary: &str, secondary: Option<&str>) -> AnalysisRequest {
        AnalysisRequest {
            mode,
            primary_subject: primary.to_string(),
            secondary_subject: secondary.map(str::to_string),
            context: None,
        }
    }

    #[test]
    fn test_mode_serde_names() {
        let mode: AnalysisMode = serde_json::from_str("\"comparison\"").unwrap();
        assert_eq!(mode, AnalysisMode::Comparison);
        for mode in AnalysisMode::ALL {
            assert_eq!(
                serde_json::to_string(&mode).unwrap(),
                format!("\"{}\"", mode.as_str())
            );
        }
    }

    #[test]
    fn test_request_deserialize_optional_fields() {
        let req: AnalysisRequest =
            serde_json::from_str(r#"{"mode": "behavioral", "primary_subject": "@someone"}"#)
                .unwrap();
        assert_eq!(req.mode, AnalysisMode::Behavioral);
        assert!(req.secondary_subject.is_none());
        assert!(req.context.is_none());
    }

    #[test]
    fn test_primary_subject_required() {
        let err = request(AnalysisMode::Psychological, "  ", None)
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_comparison_requires_secondary() {
        assert!(request(AnalysisMode::Comparison, "a", None).validate().is_err());
        assert!(request(AnalysisMode::Comparison, "a", Some(" ")).validate().is_err());
        assert!(request(AnalysisMode::Comparison, "a", Some("b")).validate().is_ok());
    }

    #[test]
    fn test_secondary_ignored_outside_comparison() {
        assert!(request(AnalysisMode::Behavioral, "a", None).validate().is_ok());
        assert!(request(AnalysisMode::Psychological, "a", Some("")).validate().is_ok());
    }
}

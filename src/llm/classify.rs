use crate::error::AppError;

type Constructor = fn(String) -> AppError;

/// Evaluated top-down against the lowercased failure text; first hit wins.
const RULES: &[(&str, Constructor)] = &[
    ("api key not valid", AppError::AuthenticationRejected),
    ("invalid api key", AppError::AuthenticationRejected),
    ("401", AppError::AuthenticationRejected),
    ("403", AppError::AuthenticationRejected),
    ("safety", AppError::ContentFiltered),
    ("blocked", AppError::ContentFiltered),
    ("quota", AppError::QuotaExceeded),
    ("429", AppError::QuotaExceeded),
];

/// Maps a provider failure onto the caller-facing error taxonomy. Anything the
/// rules do not recognize becomes [`AppError::Unclassified`].
pub fn classify_failure(err: &anyhow::Error) -> AppError {
    let detail = format!("{err:#}");
    classify_message(detail)
}

fn classify_message(detail: String) -> AppError {
    let haystack = detail.to_lowercase();
    RULES
        .iter()
        .find(|(pattern, _)| haystack.contains(pattern))
        .map(|(_, make)| make(detail.clone()))
        .unwrap_or(AppError::Unclassified(detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(msg: &str) -> &'static str {
        classify_failure(&anyhow::anyhow!("{}", msg)).kind()
    }

    #[test]
    fn test_classify_categories() {
        let cases = vec![
            (
                "Gemini API error (400 Bad Request): API key not valid. Please pass a valid API key.",
                "authentication_rejected",
            ),
            ("invalid API key supplied", "authentication_rejected"),
            ("status 401 Unauthorized", "authentication_rejected"),
            ("403 Forbidden", "authentication_rejected"),
            ("response blocked: SAFETY", "content_filtered"),
            ("candidate flagged by safety filters", "content_filtered"),
            ("prompt was blocked", "content_filtered"),
            ("Quota exceeded for quota metric", "quota_exceeded"),
            ("429 Too Many Requests", "quota_exceeded"),
            ("connection refused", "unclassified"),
            ("error decoding response body", "unclassified"),
        ];

        for (msg, expected) in cases {
            assert_eq!(kind_of(msg), expected, "classify({msg:?})");
        }
    }

    #[test]
    fn test_first_match_wins() {
        // Both an auth and a quota marker; auth rules come first.
        assert_eq!(kind_of("403 quota project not set"), "authentication_rejected");
        // Both a safety and a quota marker; safety rules come first.
        assert_eq!(kind_of("429 blocked"), "content_filtered");
    }

    #[test]
    fn test_detail_is_preserved() {
        let err = classify_failure(&anyhow::anyhow!("upstream reset"));
        assert_eq!(err.to_string(), "Generation failed: upstream reset");
    }

    #[test]
    fn test_context_chain_is_searched() {
        let err = anyhow::anyhow!("429 Too Many Requests").context("gemini request failed");
        assert_eq!(classify_failure(&err).kind(), "quota_exceeded");
    }
}

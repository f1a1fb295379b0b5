pub const OPEN_DELIMITER: &str = "[CHART_DATA]";
pub const CLOSE_DELIMITER: &str = "[/CHART_DATA]";

/// A raw report separated into its prose and the embedded data block, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitReport<'a> {
    pub prose: String,
    pub data_block: Option<&'a str>,
}

/// Cuts the first `[CHART_DATA]...[/CHART_DATA]` span out of `raw`.
///
/// The match is exact and case-sensitive, and ends at the first closing
/// delimiter after the opening one. Later pairs are left in the prose.
pub fn split(raw: &str) -> SplitReport<'_> {
    match find_block(raw) {
        Some((span_start, inner, span_end)) => {
            let mut prose = String::with_capacity(raw.len() - (span_end - span_start));
            prose.push_str(&raw[..span_start]);
            prose.push_str(&raw[span_end..]);
            SplitReport {
                prose,
                data_block: Some(inner.trim()),
            }
        }
        None => SplitReport {
            prose: raw.to_string(),
            data_block: None,
        },
    }
}

/// Returns (span start, inner text, span end) for the first complete pair.
fn find_block(raw: &str) -> Option<(usize, &str, usize)> {
    let open = raw.find(OPEN_DELIMITER)?;
    let inner_start = open + OPEN_DELIMITER.len();
    let close = inner_start + raw[inner_start..].find(CLOSE_DELIMITER)?;
    Some((open, &raw[inner_start..close], close + CLOSE_DELIMITER.len()))
}

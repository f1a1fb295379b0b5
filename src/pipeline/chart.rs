//! Chart data blocks: the wire shape the model is asked to emit, and the
//! tolerant parser that turns an extracted block into typed series.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRecord {
    pub label: String,
    pub value: f64,
}

/// Validated chart payload. Each series is independently optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChartDataBlock {
    /// Chronological, one entry per day.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_history: Option<Vec<ChartRecord>>,
    /// Percentages per content category, not normalized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_distribution: Option<Vec<ChartRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_metrics: Option<Vec<ChartRecord>>,
}

impl ChartDataBlock {
    pub fn is_empty(&self) -> bool {
        self.activity_history.is_none()
            && self.content_distribution.is_none()
            && self.engagement_metrics.is_none()
    }
}

/// One array-valued key of the data block.
#[derive(Debug)]
pub struct SeriesShape {
    pub key: &'static str,
    pub label_field: &'static str,
    /// Instruction line telling the model what the array holds.
    pub guidance: &'static str,
}

/// What a chart-producing mode asks the model for.
#[derive(Debug)]
pub struct ChartShape {
    pub series: &'static [SeriesShape],
    pub example: &'static str,
}

pub const VALUE_FIELD: &str = "value";

/// Tried, in order, after a series' own label field.
const LABEL_FALLBACKS: [&str; 3] = ["name", "day", "label"];

pub const ACTIVITY_HISTORY: SeriesShape = SeriesShape {
    key: "if_history",
    label_field: "day",
    guidance: "مصفوفة من 7 أيام (day, value) بالترتيب الزمني.",
};

pub const CONTENT_DISTRIBUTION: SeriesShape = SeriesShape {
    key: "cdi_distribution",
    label_field: "name",
    guidance: "مصفوفة من فئات المحتوى (name, value) تشمل (نصوص، صور، روابط، فيديو).",
};

pub const ENGAGEMENT_METRICS: SeriesShape = SeriesShape {
    key: "engagement_metrics",
    label_field: "name",
    guidance: "مصفوفة من (name, value) تشمل (إعجابات، مشاركات، تعليقات).",
};

const BEHAVIORAL_EXAMPLE: &str = r#"{
  "if_history": [{"day": "السبت", "value": 10}, {"day": "الأحد", "value": 15}, {"day": "الاثنين", "value": 8}, {"day": "الثلاثاء", "value": 20}, {"day": "الأربعاء", "value": 12}, {"day": "الخميس", "value": 25}, {"day": "الجمعة", "value": 18}],
  "cdi_distribution": [{"name": "نصوص", "value": 40}, {"name": "صور", "value": 30}, {"name": "روابط", "value": 15}, {"name": "فيديو", "value": 15}],
  "engagement_metrics": [{"name": "إعجابات", "value": 120}, {"name": "تعليقات", "value": 45}, {"name": "مشاركات", "value": 15}]
}"#;

pub const BEHAVIORAL_CHARTS: ChartShape = ChartShape {
    series: &[ACTIVITY_HISTORY, CONTENT_DISTRIBUTION, ENGAGEMENT_METRICS],
    example: BEHAVIORAL_EXAMPLE,
};

#[derive(Debug, Error)]
pub enum ChartParseError {
    #[error("data block is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("data block is not a JSON object")]
    NotAnObject,

    #[error("`{key}` is not an array of records")]
    Shape { key: &'static str },

    #[error("data block has none of the recognized series")]
    NoSeries,
}

/// Parses an extracted block. Any structural problem fails the whole block;
/// individual records without a usable label or finite value are dropped.
pub fn parse_block(raw: &str) -> Result<ChartDataBlock, ChartParseError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))?;
    let object = value.as_object().ok_or(ChartParseError::NotAnObject)?;

    let block = ChartDataBlock {
        activity_history: parse_series(object, &ACTIVITY_HISTORY)?,
        content_distribution: parse_series(object, &CONTENT_DISTRIBUTION)?,
        engagement_metrics: parse_series(object, &ENGAGEMENT_METRICS)?,
    };

    if block.is_empty() {
        return Err(ChartParseError::NoSeries);
    }
    Ok(block)
}

/// Public edge of the validator: never fails, a bad block is simply absent.
pub fn validate(raw: Option<&str>) -> Option<ChartDataBlock> {
    let raw = raw?;
    match parse_block(raw) {
        Ok(block) => Some(block),
        Err(e) => {
            tracing::warn!(error = %e, block_len = raw.len(), "discarding chart data block");
            None
        }
    }
}

fn parse_series(
    object: &Map<String, Value>,
    shape: &SeriesShape,
) -> Result<Option<Vec<ChartRecord>>, ChartParseError> {
    let items = match object.get(shape.key) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value
            .as_array()
            .ok_or(ChartParseError::Shape { key: shape.key })?,
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let entry = item
            .as_object()
            .ok_or(ChartParseError::Shape { key: shape.key })?;
        match parse_record(entry, shape) {
            Some(record) => records.push(record),
            None => tracing::debug!(series = shape.key, entry = %item, "dropping chart record"),
        }
    }
    Ok(Some(records))
}

fn parse_record(entry: &Map<String, Value>, shape: &SeriesShape) -> Option<ChartRecord> {
    let value = entry
        .get(VALUE_FIELD)?
        .as_f64()
        .filter(|v| v.is_finite())?;

    let label = std::iter::once(shape.label_field)
        .chain(LABEL_FALLBACKS)
        .find_map(|field| match entry.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })?;

    Some(ChartRecord { label, value })
}

/// Models sometimes wrap the JSON in a markdown fence inside the delimiters.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };
    // Language tag, on its own line or glued to the opening brace.
    body.trim_start()
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .trim()
}

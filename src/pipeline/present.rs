use serde::Serialize;

use super::chart::{
    ACTIVITY_HISTORY, CONTENT_DISTRIBUTION, ChartDataBlock, ChartRecord, ENGAGEMENT_METRICS,
    validate,
};
use super::split::split;

/// Prose with the data block cut out, plus the validated chart if there was one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanedReport {
    pub prose: String,
    pub chart: Option<ChartDataBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartOutcome {
    Present,
    /// No data block in the report.
    Absent,
    /// A data block was found but failed validation.
    Rejected,
}

impl ChartOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartOutcome::Present => "present",
            ChartOutcome::Absent => "absent",
            ChartOutcome::Rejected => "rejected",
        }
    }
}

pub(crate) fn clean(raw: &str) -> (CleanedReport, ChartOutcome) {
    let parts = split(raw);
    let chart = validate(parts.data_block);
    let outcome = match (&parts.data_block, &chart) {
        (_, Some(_)) => ChartOutcome::Present,
        (Some(_), None) => ChartOutcome::Rejected,
        (None, None) => ChartOutcome::Absent,
    };
    (
        CleanedReport {
            prose: parts.prose,
            chart,
        },
        outcome,
    )
}

pub fn clean_report(raw: &str) -> CleanedReport {
    clean(raw).0
}

/// Turns cleaned markdown prose into whatever the front end displays.
pub trait MarkdownRenderer {
    type Output;

    fn render(&self, prose: &str) -> Self::Output;
}

/// Turns a validated chart block into displayable charts.
pub trait ChartRenderer {
    type Output;

    fn render(&self, chart: &ChartDataBlock) -> Self::Output;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Presentation<P, C> {
    pub prose: P,
    pub chart: Option<C>,
}

/// Split, validate, then hand each half to its renderer.
pub fn present<M, C>(
    raw: &str,
    markdown: &M,
    charts: &C,
) -> Presentation<M::Output, C::Output>
where
    M: MarkdownRenderer,
    C: ChartRenderer,
{
    render(&clean_report(raw), markdown, charts)
}

pub fn render<M, C>(
    cleaned: &CleanedReport,
    markdown: &M,
    charts: &C,
) -> Presentation<M::Output, C::Output>
where
    M: MarkdownRenderer,
    C: ChartRenderer,
{
    Presentation {
        prose: markdown.render(&cleaned.prose),
        chart: cleaned.chart.as_ref().map(|chart| charts.render(chart)),
    }
}

/// Hands markdown to the client untouched; math spans are typeset there.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownPassthrough;

impl MarkdownRenderer for MarkdownPassthrough {
    type Output = String;

    fn render(&self, prose: &str) -> String {
        prose.to_string()
    }
}

const PALETTE: [&str; 5] = ["#3b82f6", "#6366f1", "#8b5cf6", "#ec4899", "#f59e0b"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Donut,
    HorizontalBar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub series: &'static str,
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    pub points: Vec<ChartPoint>,
}

/// Describes each populated series as a chart spec for the client's charting
/// widgets: activity as a line, content as a donut, engagement as bars.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChartSpecRenderer;

impl ChartRenderer for ChartSpecRenderer {
    type Output = Vec<ChartSpec>;

    fn render(&self, chart: &ChartDataBlock) -> Vec<ChartSpec> {
        let mut specs = Vec::new();

        if let Some(records) = populated(&chart.activity_history) {
            specs.push(ChartSpec {
                kind: ChartKind::Line,
                series: ACTIVITY_HISTORY.key,
                title: "وتيرة النشاط الأسبوعي (IF)",
                color: Some(PALETTE[0]),
                points: points(records, |_| None),
            });
        }

        if let Some(records) = populated(&chart.content_distribution) {
            specs.push(ChartSpec {
                kind: ChartKind::Donut,
                series: CONTENT_DISTRIBUTION.key,
                title: "تنوع المحتوى الرقمي (CDI)",
                color: None,
                points: points(records, |i| Some(PALETTE[i % PALETTE.len()])),
            });
        }

        if let Some(records) = populated(&chart.engagement_metrics) {
            specs.push(ChartSpec {
                kind: ChartKind::HorizontalBar,
                series: ENGAGEMENT_METRICS.key,
                title: "مقاييس التفاعل والارتباط (Engagement)",
                color: None,
                points: points(records, |i| Some(PALETTE[(i + 2) % PALETTE.len()])),
            });
        }

        specs
    }
}

fn populated(series: &Option<Vec<ChartRecord>>) -> Option<&[ChartRecord]> {
    series.as_deref().filter(|records| !records.is_empty())
}

fn points(
    records: &[ChartRecord],
    color: impl Fn(usize) -> Option<&'static str>,
) -> Vec<ChartPoint> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| ChartPoint {
            label: r.label.clone(),
            value: r.value,
            color: color(i),
        })
        .collect()
}

use std::fmt::Write as _;

use serde::Serialize;

use super::chart::{BEHAVIORAL_CHARTS, ChartShape};
use super::split::{CLOSE_DELIMITER, OPEN_DELIMITER};
use super::{AnalysisMode, AnalysisRequest};

const BASE_INSTRUCTION: &str = "أنت خبير عالمي في التحليل النفسي الرقمي وتحليل البيانات السلوكية. \
مهمتك تحليل البيانات المستمدة من الملفات الشخصية على وسائل التواصل الاجتماعي.\n\
يجب أن يكون التقرير باللغة العربية، احترافياً، ومدعوماً بمعادلات إحصائية بصيغة LaTeX.\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system_instruction: String,
    pub user_prompt: String,
}

#[derive(Debug, Serialize)]
pub struct NamedMetric {
    pub name: &'static str,
    pub symbol: &'static str,
    /// LaTeX, without the surrounding `$`.
    pub formula: &'static str,
}

type PromptFn = fn(primary: &str, secondary: &str, context: &str) -> String;

/// Everything that varies by analysis mode.
pub struct ModeProfile {
    pub mode: AnalysisMode,
    pub focus: &'static str,
    pub metrics: &'static [NamedMetric],
    pub sections: &'static [&'static str],
    pub charts: Option<&'static ChartShape>,
    pub reasoning_budget: u32,
    prompt: PromptFn,
}

static PROFILES: [ModeProfile; 3] = [
    ModeProfile {
        mode: AnalysisMode::Psychological,
        focus: "التحليل النفسي العميق.",
        metrics: &[
            NamedMetric {
                name: "مؤشر مركزية الذات",
                symbol: "SCI",
                formula: r"SCI = \frac{\sum P_{self}}{\sum P_{total}} \times 100",
            },
            NamedMetric {
                name: "معامل القلق الاجتماعي",
                symbol: "SAF",
                formula: r"SAF = \beta \cdot (1 - \frac{R_{inter}}{R_{total}})",
            },
            NamedMetric {
                name: "توازن الظل الرقمي",
                symbol: "DSB",
                formula: r"DSB = \sqrt{\int_{t_0}^{t_n} \Psi(x) dx}",
            },
        ],
        sections: &[
            "النمط النفسي العام.",
            "الإحصائيات النفسية الرقمية.",
            "تحليل الظل الرقمي (الدوافع الخفية).",
            "خارطة طريق التوازن النفسي.",
        ],
        charts: None,
        reasoning_budget: 3000,
        prompt: psychological_prompt,
    },
    ModeProfile {
        mode: AnalysisMode::Behavioral,
        focus: "أنماط السلوك الرقمي (Digital Behavior Patterns).",
        metrics: &[
            NamedMetric {
                name: "معدل تكرار التفاعل",
                symbol: "IF",
                formula: r"IF = \frac{\Delta Interactions}{\Delta Time}",
            },
            NamedMetric {
                name: "عمق المشاركة Engagement Depth",
                symbol: "ED",
                formula: r"ED = \sum_{i=1}^{n} (w_i \cdot v_i)",
            },
            NamedMetric {
                name: "مؤشر تنوع المحتوى Content Diversity Index",
                symbol: "CDI",
                formula: r"CDI = 1 - \sum p_i^2",
            },
        ],
        sections: &[
            "وتيرة النشاط والتفاعل.",
            "قياسات الارتباط الرقمي.",
            "عادات الاستهلاك (الوسائط، أوقات الذروة).",
            "توصيات تحسين الكفاءة السلوكية.",
        ],
        charts: Some(&BEHAVIORAL_CHARTS),
        reasoning_budget: 3000,
        prompt: behavioral_prompt,
    },
    ModeProfile {
        mode: AnalysisMode::Comparison,
        focus: "مقارنة تحليلية بين ملفين شخصيين.",
        metrics: &[
            NamedMetric {
                name: "معامل التشابه الرقمي",
                symbol: "DSC",
                formula: r"DSC = \frac{2|A \cap B|}{|A| + |B|}",
            },
            NamedMetric {
                name: "فجوة السلوك الرقمي",
                symbol: "DBG",
                formula: r"DBG = \sqrt{\sum (X_{1,i} - X_{2,i})^2}",
            },
        ],
        sections: &[
            "نقاط الالتقاء (التشابهات).",
            "نقاط التباين (الاختلافات الجوهرية).",
            "تحليل التفاعل المتبادل المحتمل.",
            "مقارنة إحصائية شاملة.",
        ],
        charts: None,
        reasoning_budget: 5000,
        prompt: comparison_prompt,
    },
];

impl AnalysisMode {
    pub fn profile(self) -> &'static ModeProfile {
        match self {
            AnalysisMode::Psychological => &PROFILES[0],
            AnalysisMode::Behavioral => &PROFILES[1],
            AnalysisMode::Comparison => &PROFILES[2],
        }
    }
}

impl ModeProfile {
    fn instruction_addendum(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\nالتركيز: {}", self.focus);

        out.push_str("المعادلات المطلوبة:\n");
        for metric in self.metrics {
            let _ = writeln!(out, "- {} {}: ${}$", metric.name, metric.symbol, metric.formula);
        }

        out.push_str("\nالأقسام:\n");
        for (i, section) in self.sections.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, section);
        }

        if let Some(shape) = self.charts {
            out.push('\n');
            out.push_str(&chart_directive(shape));
        }

        out
    }
}

fn chart_directive(shape: &ChartShape) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "هام جداً: في نهاية التقرير، قم بتضمين كتلة JSON للرسوم البيانية محاطة بـ {OPEN_DELIMITER} و {CLOSE_DELIMITER}."
    );
    out.push_str("يجب أن تحتوي الكتلة على بيانات واقعية (تخمينية بناءً على الوصف) كالتالي:\n");
    for series in shape.series {
        let _ = writeln!(out, "- {}: {}", series.key, series.guidance);
    }
    let _ = write!(
        out,
        "\nمثال دقيق للكتلة:\n{OPEN_DELIMITER}\n{}\n{CLOSE_DELIMITER}\n",
        shape.example
    );
    out
}

fn single_profile_prompt(primary: &str, context: &str, analysis: &str) -> String {
    format!(
        "قم بتحليل الملف الشخصي التالي: {primary}\n\
         البيانات المتاحة: {context}\n\
         المطلوب: تحليل {analysis} مع تقديم إحصائيات دقيقة ورسوم بيانية."
    )
}

fn psychological_prompt(primary: &str, _secondary: &str, context: &str) -> String {
    single_profile_prompt(primary, context, "نفسي عميق")
}

fn behavioral_prompt(primary: &str, _secondary: &str, context: &str) -> String {
    single_profile_prompt(primary, context, "سلوكي رقمي شامل")
}

fn comparison_prompt(primary: &str, secondary: &str, context: &str) -> String {
    format!(
        "قم بإجراء مقارنة تحليلية بين الملفين الشخصيين التاليين:\n\
         الملف الأول: {primary}\n\
         الملف الثاني: {secondary}\n\
         البيانات الإضافية: {context}\n\
         المطلوب: تحليل أوجه التشابه والاختلاف النفسية والسلوكية بدقة عالية."
    )
}

/// Builds the instruction and prompt for one analysis. Pure; a missing
/// secondary subject or context renders as an empty string.
pub fn build(
    mode: AnalysisMode,
    primary: &str,
    secondary: Option<&str>,
    context: Option<&str>,
) -> PromptPair {
    let profile = mode.profile();
    PromptPair {
        system_instruction: format!("{BASE_INSTRUCTION}{}", profile.instruction_addendum()),
        user_prompt: (profile.prompt)(
            primary.trim(),
            secondary.map(str::trim).unwrap_or_default(),
            context.map(str::trim).unwrap_or_default(),
        ),
    }
}

impl AnalysisRequest {
    pub fn prompt(&self) -> PromptPair {
        build(
            self.mode,
            &self.primary_subject,
            self.secondary_subject.as_deref(),
            self.context.as_deref(),
        )
    }
}

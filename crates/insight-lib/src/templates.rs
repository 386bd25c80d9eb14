//! Insight sentence templates
//!
//! Each cluster has one natural-language template with named numeric slots.
//! Templates are written as text (`{journeys:.0}`) and parsed once into
//! literal and slot segments, so the precision each template declares is
//! kept as data rather than unified across clusters.

use crate::models::FeatureVector;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use thiserror::Error;

/// Built-in templates keyed by cluster id
const BUILTIN_TEMPLATES: &[(i64, &str)] = &[
    (
        0,
        "Aktivitas belajarmu masih jarang (sekitar {active_days:.0} hari aktif), tetapi ketika \
         mulai belajar kamu bergerak sangat cepat dengan rata-rata waktu selesai sekitar \
         {avg_time_hours:.1} jam per modul. Kamu telah menyelesaikan sekitar {journeys:.0} journey \
         dengan nilai ujian rata-rata {score:.0}. Cobalah meningkatkan frekuensi belajar agar \
         dampak pembelajaranmu lebih konsisten.",
    ),
    (
        1,
        "Kamu belajar secara cukup konsisten (sekitar {active_days:.0} hari aktif) dan telah \
         menyelesaikan sekitar {journeys:.0} journey. Nilai ujian rata-ratamu tinggi, yaitu sekitar \
         {score:.0}. Tingkat refleksi melalui submission yang ditolak berada di kisaran \
         {rejection_ratio:.2}. Pertahankan pola belajar ini dan gunakan umpan balik untuk terus \
         menyempurnakan pemahamanmu.",
    ),
    (
        2,
        "Kamu sangat tekun dengan sekitar {active_days:.0} hari aktif dan telah menyelesaikan \
         sekitar {journeys:.0} journey. Rata-rata waktu yang kamu habiskan per modul cukup panjang, \
         sekitar {avg_time_hours:.1} jam. Nilai ujian rata-ratamu sekitar {score:.0}. Pertahankan \
         kedalaman belajarmu, namun pertimbangkan pengelolaan waktu belajar yang lebih efisien.",
    ),
    (
        3,
        "Kamu cukup aktif belajar (sekitar {active_days:.0} hari aktif) dan telah menyelesaikan \
         sekitar {journeys:.0} journey. Rata-rata nilai ujianmu saat ini sekitar {score:.0}, dengan \
         rasio submission ditolak sekitar {rejection_ratio:.2}. Ini menunjukkan kamu banyak \
         bereksperimen, tetapi masih perlu memperkuat pemahaman konsep dasar. Manfaatkan kembali \
         materi, contoh solusi, dan umpan balik dari submission untuk meningkatkan hasil ujian.",
    ),
];

/// Template parse failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown template slot `{0}`")]
    UnknownSlot(String),

    #[error("invalid format spec `{spec}` for slot `{slot}`")]
    InvalidFormatSpec { slot: String, spec: String },

    #[error("unterminated placeholder starting at byte {0}")]
    Unterminated(usize),

    #[error("unmatched `}}` at byte {0}")]
    UnmatchedClose(usize),
}

/// Numeric slots a template may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    ActiveDays,
    AvgTimeHours,
    Journeys,
    RejectionRatio,
    Score,
}

impl Slot {
    pub const ALL: [Slot; 5] = [
        Slot::ActiveDays,
        Slot::AvgTimeHours,
        Slot::Journeys,
        Slot::RejectionRatio,
        Slot::Score,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Slot::ActiveDays => "active_days",
            Slot::AvgTimeHours => "avg_time_hours",
            Slot::Journeys => "journeys",
            Slot::RejectionRatio => "rejection_ratio",
            Slot::Score => "score",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.name() == name)
    }

    /// Decimal places used when a placeholder carries no format spec
    pub fn default_precision(&self) -> usize {
        match self {
            Slot::ActiveDays | Slot::Journeys | Slot::Score => 0,
            Slot::AvgTimeHours | Slot::RejectionRatio => 2,
        }
    }

    pub fn value(&self, features: &FeatureVector) -> f64 {
        match self {
            Slot::ActiveDays => features.total_active_days,
            Slot::AvgTimeHours => features.avg_completion_time_hours,
            Slot::Journeys => features.total_journeys_completed,
            Slot::RejectionRatio => features.rejection_ratio,
            Slot::Score => features.avg_exam_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot { slot: Slot, precision: usize },
}

/// A parsed insight template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl InsightTemplate {
    /// Parse template text.
    ///
    /// Placeholders are `{name}` or `{name:.N}` (a trailing `f` is accepted);
    /// `{{` and `}}` produce literal braces.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(TemplateError::UnmatchedClose(pos)),
                '{' => {
                    let mut body = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        body.push(inner);
                    }
                    if !closed {
                        return Err(TemplateError::Unterminated(pos));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(parse_placeholder(&body)?);
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Slots referenced by this template, in order of appearance
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Slot { slot, .. } => Some(*slot),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute the feature values into the template
    pub fn render(&self, features: &FeatureVector) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot { slot, precision } => {
                    let value = slot.value(features);
                    if value.is_nan() {
                        // Missing values read as NaN; render them lowercase
                        out.push_str("nan");
                    } else {
                        // Writing into a String cannot fail
                        let _ = write!(out, "{:.*}", precision, value);
                    }
                }
            }
        }
        out
    }
}

fn parse_placeholder(body: &str) -> Result<Segment, TemplateError> {
    let (name, spec) = match body.split_once(':') {
        Some((name, spec)) => (name.trim(), Some(spec.trim())),
        None => (body.trim(), None),
    };

    let slot = Slot::from_name(name).ok_or_else(|| TemplateError::UnknownSlot(name.to_string()))?;

    let precision = match spec {
        None => slot.default_precision(),
        Some(spec) => parse_precision(spec).ok_or_else(|| TemplateError::InvalidFormatSpec {
            slot: name.to_string(),
            spec: spec.to_string(),
        })?,
    };

    Ok(Segment::Slot { slot, precision })
}

/// Accepts `.N` or `.Nf`
fn parse_precision(spec: &str) -> Option<usize> {
    let digits = spec.strip_prefix('.')?;
    let digits = digits.strip_suffix('f').unwrap_or(digits);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Read-only lookup of templates by cluster id
#[derive(Debug, Clone, Default)]
pub struct InsightTemplateTable {
    templates: BTreeMap<i64, InsightTemplate>,
}

impl InsightTemplateTable {
    /// Table holding the templates shipped with the service
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::from_sources(BUILTIN_TEMPLATES.iter().copied())
    }

    pub fn from_sources<'a>(
        sources: impl IntoIterator<Item = (i64, &'a str)>,
    ) -> Result<Self, TemplateError> {
        let templates = sources
            .into_iter()
            .map(|(id, text)| InsightTemplate::parse(text).map(|t| (id, t)))
            .collect::<Result<_, _>>()?;
        Ok(Self { templates })
    }

    pub fn lookup(&self, cluster_id: i64) -> Option<&InsightTemplate> {
        self.templates.get(&cluster_id)
    }

    pub fn cluster_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.templates.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

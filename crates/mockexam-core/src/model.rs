//! Core data model types for mockexam.
//!
//! These are the types the whole engine passes around: the exam
//! configuration, generated items with their optional visual aids, and the
//! essay submission.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExamError;

/// Number of items requested for every content area in a configuration.
pub const ITEMS_PER_AREA: usize = 10;

/// Fixed pool of essay themes. One is drawn when a session with an essay starts.
pub const ESSAY_THEMES: &[&str] = &[
    "Challenges of digital inclusion for the elderly population",
    "The invisibility of unpaid care work",
    "Paths to reduce food waste in large cities",
    "The impact of misinformation on public health campaigns",
    "Preserving the cultural heritage of traditional communities",
    "Mental health among young people in the age of social networks",
    "Access to basic sanitation as a condition for citizenship",
    "The role of public libraries in reading formation",
];

/// A subject area the generation service can produce items for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentArea {
    Languages,
    HumanSciences,
    NaturalSciences,
    Mathematics,
}

impl ContentArea {
    /// All areas, in display order.
    pub const ALL: [ContentArea; 4] = [
        ContentArea::Languages,
        ContentArea::HumanSciences,
        ContentArea::NaturalSciences,
        ContentArea::Mathematics,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ContentArea::Languages => "Languages, Codes and their Technologies",
            ContentArea::HumanSciences => "Human Sciences and their Technologies",
            ContentArea::NaturalSciences => "Natural Sciences and their Technologies",
            ContentArea::Mathematics => "Mathematics and its Technologies",
        }
    }
}

impl fmt::Display for ContentArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentArea::Languages => write!(f, "languages"),
            ContentArea::HumanSciences => write!(f, "human_sciences"),
            ContentArea::NaturalSciences => write!(f, "natural_sciences"),
            ContentArea::Mathematics => write!(f, "mathematics"),
        }
    }
}

impl FromStr for ContentArea {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "languages" | "language" | "lang" => Ok(ContentArea::Languages),
            "human_sciences" | "humanities" | "human" => Ok(ContentArea::HumanSciences),
            "natural_sciences" | "sciences" | "natural" => Ok(ContentArea::NaturalSciences),
            "mathematics" | "math" | "maths" => Ok(ContentArea::Mathematics),
            other => Err(format!("unknown content area: {other}")),
        }
    }
}

/// What the user picked on the selection screen. Immutable once a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamConfiguration {
    /// Areas in selection order. An area may appear more than once.
    pub areas: Vec<ContentArea>,
    /// Whether the session includes the essay phase.
    #[serde(default)]
    pub include_essay: bool,
    /// Essay theme. Drawn from [`ESSAY_THEMES`] at start when left unset.
    #[serde(default)]
    pub essay_theme: Option<String>,
}

impl ExamConfiguration {
    pub fn new(areas: Vec<ContentArea>) -> Self {
        Self {
            areas,
            include_essay: false,
            essay_theme: None,
        }
    }

    pub fn with_essay(mut self) -> Self {
        self.include_essay = true;
        self
    }

    /// Pin the essay theme instead of drawing one at start.
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.include_essay = true;
        self.essay_theme = Some(theme.into());
        self
    }

    /// Total number of items this configuration produces.
    pub fn item_count(&self) -> usize {
        self.areas.len() * ITEMS_PER_AREA
    }

    /// Reject configurations that must never reach the generation service.
    pub fn validate(&self) -> Result<(), ExamError> {
        if self.areas.is_empty() {
            return Err(ExamError::Configuration(
                "select at least one content area".into(),
            ));
        }
        if let Some(theme) = &self.essay_theme {
            if theme.trim().is_empty() {
                return Err(ExamError::Configuration("essay theme is empty".into()));
            }
        }
        Ok(())
    }
}

/// Timing and grading knobs for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSettings {
    /// Base allotment per item, in seconds.
    #[serde(default = "default_seconds_per_item")]
    pub seconds_per_item: u64,
    /// Extra seconds granted when the essay is included.
    #[serde(default = "default_essay_bonus")]
    pub essay_bonus_secs: u64,
    /// Essays at or below this many characters are not sent for grading.
    #[serde(default = "default_min_essay_chars")]
    pub min_essay_chars: usize,
    /// Area requests allowed in flight at once.
    #[serde(default = "default_generation_parallelism")]
    pub generation_parallelism: usize,
}

fn default_seconds_per_item() -> u64 {
    180
}
fn default_essay_bonus() -> u64 {
    3600
}
fn default_min_essay_chars() -> usize {
    150
}
fn default_generation_parallelism() -> usize {
    1
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            seconds_per_item: default_seconds_per_item(),
            essay_bonus_secs: default_essay_bonus(),
            min_essay_chars: default_min_essay_chars(),
            generation_parallelism: default_generation_parallelism(),
        }
    }
}

impl ExamSettings {
    /// Clock allotment for a configuration: base duration plus the essay bonus.
    pub fn total_seconds(&self, configuration: &ExamConfiguration) -> u64 {
        let base = self.seconds_per_item * configuration.item_count() as u64;
        if configuration.include_essay {
            base + self.essay_bonus_secs
        } else {
            base
        }
    }
}

/// One of the five lettered options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionKey {
    A,
    B,
    C,
    D,
    E,
}

impl OptionKey {
    pub const ALL: [OptionKey; 5] = [
        OptionKey::A,
        OptionKey::B,
        OptionKey::C,
        OptionKey::D,
        OptionKey::E,
    ];
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            OptionKey::A => "A",
            OptionKey::B => "B",
            OptionKey::C => "C",
            OptionKey::D => "D",
            OptionKey::E => "E",
        };
        f.write_str(letter)
    }
}

impl FromStr for OptionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(OptionKey::A),
            "B" => Ok(OptionKey::B),
            "C" => Ok(OptionKey::C),
            "D" => Ok(OptionKey::D),
            "E" => Ok(OptionKey::E),
            other => Err(format!("unknown option: {other}")),
        }
    }
}

/// The option texts of an item, keyed exactly A through E.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<OptionKey, String>", into = "BTreeMap<OptionKey, String>")]
pub struct OptionSet(BTreeMap<OptionKey, String>);

impl OptionSet {
    pub fn get(&self, key: OptionKey) -> &str {
        self.0.get(&key).map(String::as_str).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OptionKey, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl TryFrom<BTreeMap<OptionKey, String>> for OptionSet {
    type Error = String;

    fn try_from(options: BTreeMap<OptionKey, String>) -> Result<Self, Self::Error> {
        for key in OptionKey::ALL {
            match options.get(&key) {
                None => return Err(format!("option {key} is missing")),
                Some(text) if text.trim().is_empty() => {
                    return Err(format!("option {key} is empty"))
                }
                Some(_) => {}
            }
        }
        let mut seen = HashSet::new();
        for (key, text) in &options {
            if !seen.insert(text.trim().to_lowercase()) {
                return Err(format!("option {key} duplicates another option"));
            }
        }
        Ok(OptionSet(options))
    }
}

impl From<OptionSet> for BTreeMap<OptionKey, String> {
    fn from(set: OptionSet) -> Self {
        set.0
    }
}

/// Context text shown above the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stimulus {
    pub text: String,
    #[serde(default)]
    pub attribution: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisLabels {
    pub x: String,
    pub y: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    pub speaker: String,
    pub line: String,
}

/// Structured context attached to an item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VisualAid {
    #[default]
    None,
    Chart {
        kind: ChartKind,
        title: String,
        #[serde(default)]
        axis_labels: Option<AxisLabels>,
        series: Vec<DataPoint>,
    },
    Table {
        title: String,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    ComicStrip {
        title: String,
        panels: Vec<Panel>,
        #[serde(default)]
        credit: String,
    },
}

impl VisualAid {
    pub fn is_none(&self) -> bool {
        matches!(self, VisualAid::None)
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            VisualAid::None => Ok(()),
            VisualAid::Chart { series, .. } => {
                if series.is_empty() {
                    return Err("chart has no data points".into());
                }
                if series.iter().any(|p| !p.value.is_finite()) {
                    return Err("chart has a non-finite value".into());
                }
                Ok(())
            }
            VisualAid::Table { columns, rows, .. } => {
                if columns.is_empty() {
                    return Err("table has no columns".into());
                }
                match rows.iter().position(|r| r.len() != columns.len()) {
                    Some(i) => Err(format!(
                        "table row {} has {} cells, expected {}",
                        i + 1,
                        rows[i].len(),
                        columns.len()
                    )),
                    None => Ok(()),
                }
            }
            VisualAid::ComicStrip { panels, .. } => {
                if panels.is_empty() {
                    Err("comic strip has no panels".into())
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// An item as returned by the generation service, before numbering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedItem {
    pub competency_tag: String,
    pub stimulus: Stimulus,
    pub prompt: String,
    pub options: OptionSet,
    pub correct_option: OptionKey,
    pub explanation: String,
    #[serde(default)]
    pub visual_aid: VisualAid,
}

impl GeneratedItem {
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("prompt is empty".into());
        }
        if self.competency_tag.trim().is_empty() {
            return Err("competency tag is empty".into());
        }
        self.visual_aid.validate()
    }

    /// Attach the session-wide number and the area the item was requested for.
    pub fn into_item(self, number: u32, area: ContentArea) -> Item {
        Item {
            number,
            area,
            competency_tag: self.competency_tag,
            stimulus: self.stimulus,
            prompt: self.prompt,
            options: self.options,
            correct_option: self.correct_option,
            explanation: self.explanation,
            visual_aid: self.visual_aid,
        }
    }
}

/// One numbered exam question. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// 1-based, contiguous across the whole session.
    pub number: u32,
    pub area: ContentArea,
    pub competency_tag: String,
    pub stimulus: Stimulus,
    pub prompt: String,
    pub options: OptionSet,
    pub correct_option: OptionKey,
    pub explanation: String,
    #[serde(default)]
    pub visual_aid: VisualAid,
}

/// The essay being written. The theme is fixed at start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssaySubmission {
    pub theme: String,
    #[serde(default)]
    pub text: String,
}

impl EssaySubmission {
    pub fn new(theme: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            text: String::new(),
        }
    }

    /// Length in characters of the trimmed text.
    pub fn char_count(&self) -> usize {
        self.text.trim().chars().count()
    }
}

#[cfg(test)]
pub(crate) fn sample_options() -> OptionSet {
    let map: BTreeMap<OptionKey, String> = OptionKey::ALL
        .iter()
        .map(|k| (*k, format!("option {k}")))
        .collect();
    OptionSet::try_from(map).unwrap()
}

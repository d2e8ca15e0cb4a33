// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The answers to every question for a respondent, keyed by the question label.
pub type RawSurveyRow = std::collections::HashMap<String, String>;

/// Counts for every answer option of one question, in first-seen order.
///
/// Keys are unique; this is maintained by `OptionTally::add`.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct OptionTally {
    entries: Vec<(String, u64)>,
}

impl OptionTally {
    pub fn new() -> OptionTally {
        OptionTally {
            entries: Vec::new(),
        }
    }

    /// Increments the count for this option, creating it if needed.
    pub fn add(&mut self, option: &str) {
        if let Some((_, count)) = self.entries.iter_mut().find(|(name, _)| name == option) {
            *count += 1;
        } else {
            self.entries.push((option.to_string(), 1));
        }
    }

    pub fn get(&self, option: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(name, _)| name == option)
            .map(|(_, count)| *count)
    }

    pub fn retain<F: FnMut(&str, u64) -> bool>(&mut self, mut keep: F) {
        self.entries.retain(|(name, count)| keep(name, *count));
    }

    /// The sum of all the counts. For multi-select questions, this is the number of selections,
    /// not the number of respondents.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| *count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(String, u64)] {
        &self.entries
    }
}

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    #[default]
    Pie,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PollResult {
    pub option: String,
    pub value: u64,
}

/// One published poll question, as stored inside a poll group.
///
/// The results can be edited by hand after ingestion, so they may diverge from the raw data.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PollDefinition {
    pub question: String,
    pub results: Vec<PollResult>,
    // Older groups were saved without a chart type.
    #[serde(default)]
    pub chart: ChartKind,
}

/// How the aggregated values are reported.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Absolute,
    Percentage,
}

/// Distribution of the answers of a single question.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Topline {
    pub question: String,
    pub mode: ViewMode,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Distribution of the answers of a question, split by the answers of another question.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Crosstab {
    #[serde(rename = "groupQuestion")]
    pub group_question: String,
    #[serde(rename = "resultQuestion")]
    pub result_question: String,
    pub mode: ViewMode,
    /// Sorted.
    pub groups: Vec<String>,
    /// Sorted union of the result values over all the groups.
    pub subcategories: Vec<String>,
    /// For each subcategory, one value per group (same order as `groups`).
    pub series: std::collections::BTreeMap<String, Vec<f64>>,
}

/// Errors that prevent the computations from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyErrors {
    EmptyInput,
    UnknownQuestion(String),
    CsvParse { line: u64, message: String },
}

impl Error for TallyErrors {}

impl Display for TallyErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyErrors::EmptyInput => write!(f, "no survey data to process"),
            TallyErrors::UnknownQuestion(q) => write!(f, "unknown question {:?}", q),
            TallyErrors::CsvParse { line, message } => {
                write!(f, "could not parse csv line {}: {}", line, message)
            }
        }
    }
}

// ********* Configuration **********

pub const NO_RESPONSE: &str = "No Response";

/// Rules applied when a survey export is turned into poll definitions.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct IngestRules {
    /// Non-numeric options seen this many times or fewer are dropped.
    pub prune_threshold: u64,
    /// Columns whose header starts with one of these are not questions.
    pub excluded_prefixes: Vec<String>,
    /// Separator between the options of a multi-select answer.
    pub multi_select_delimiter: String,
    pub default_chart: ChartKind,
}

impl Default for IngestRules {
    fn default() -> Self {
        IngestRules {
            prune_threshold: 3,
            excluded_prefixes: vec!["Timestamp".to_string(), "Column".to_string()],
            multi_select_delimiter: ", ".to_string(),
            default_chart: ChartKind::Pie,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AggregateRules {
    /// Replaces missing or empty answers.
    pub no_response_label: String,
}

impl Default for AggregateRules {
    fn default() -> Self {
        AggregateRules {
            no_response_label: NO_RESPONSE.to_string(),
        }
    }
}

/// Controls which columns of a stored export are offered as questions.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VisualizerRules {
    /// The first columns of an export are metadata (the timestamp).
    pub skipped_leading_columns: usize,
    pub hidden_prefixes: Vec<String>,
}

impl Default for VisualizerRules {
    fn default() -> Self {
        VisualizerRules {
            skipped_leading_columns: 1,
            hidden_prefixes: vec!["Column".to_string()],
        }
    }
}

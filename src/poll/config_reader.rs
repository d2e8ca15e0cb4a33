use crate::poll::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileSource {
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestSettings {
    #[serde(rename = "pruneThreshold")]
    pub prune_threshold: Option<u64>,
    #[serde(rename = "excludedPrefixes")]
    pub excluded_prefixes: Option<Vec<String>>,
    #[serde(rename = "multiSelectDelimiter")]
    pub multi_select_delimiter: Option<String>,
    #[serde(rename = "defaultChart")]
    pub default_chart: Option<ChartKind>,
}

impl IngestSettings {
    pub fn rules(&self) -> IngestRules {
        let default = IngestRules::default();
        IngestRules {
            prune_threshold: self.prune_threshold.unwrap_or(default.prune_threshold),
            excluded_prefixes: self
                .excluded_prefixes
                .clone()
                .unwrap_or(default.excluded_prefixes),
            multi_select_delimiter: self
                .multi_select_delimiter
                .clone()
                .unwrap_or(default.multi_select_delimiter),
            default_chart: self.default_chart.unwrap_or(default.default_chart),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct AggregateSettings {
    #[serde(rename = "noResponseLabel")]
    pub no_response_label: Option<String>,
}

impl AggregateSettings {
    pub fn rules(&self) -> AggregateRules {
        match &self.no_response_label {
            Some(label) => AggregateRules {
                no_response_label: label.clone(),
            },
            None => AggregateRules::default(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct VisualizerSettings {
    #[serde(rename = "skippedLeadingColumns")]
    pub skipped_leading_columns: Option<usize>,
    #[serde(rename = "hiddenPrefixes")]
    pub hidden_prefixes: Option<Vec<String>>,
}

impl VisualizerSettings {
    pub fn rules(&self) -> VisualizerRules {
        let default = VisualizerRules::default();
        VisualizerRules {
            skipped_leading_columns: self
                .skipped_leading_columns
                .unwrap_or(default.skipped_leading_columns),
            hidden_prefixes: self
                .hidden_prefixes
                .clone()
                .unwrap_or(default.hidden_prefixes),
        }
    }
}

/// The analysis to run, when it is not given on the command line.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisSettings {
    pub kind: Option<String>,
    pub question: Option<String>,
    #[serde(rename = "crosstabBy")]
    pub crosstab_by: Option<String>,
    #[serde(rename = "crosstabResults")]
    pub crosstab_results: Option<String>,
    pub view: Option<ViewMode>,
    /// For the content store analyses.
    #[serde(rename = "storePath")]
    pub store_path: Option<String>,
    pub title: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct PollConfig {
    #[serde(default)]
    pub input: FileSource,
    #[serde(default)]
    pub ingest: IngestSettings,
    #[serde(default)]
    pub aggregate: AggregateSettings,
    #[serde(default)]
    pub visualizer: VisualizerSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

pub fn read_config(path: &str) -> BPollResult<PollConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: PollConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// Reads a reference output, as a JSON value.
pub fn read_reference(path: &str) -> PResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config() {
        let config: PollConfig = serde_json::from_str(
            r#"{"input": {"filePath": "survey.csv"}, "ingest": {"pruneThreshold": 0, "defaultChart": "bar"}}"#,
        )
        .unwrap();
        assert_eq!(config.input.file_path.as_deref(), Some("survey.csv"));
        assert_eq!(config.input.provider, None);
        let rules = config.ingest.rules();
        assert_eq!(rules.prune_threshold, 0);
        assert_eq!(rules.default_chart, ChartKind::Bar);
        assert_eq!(rules.multi_select_delimiter, ", ");
        assert_eq!(config.aggregate.rules(), AggregateRules::default());
        assert_eq!(config.visualizer.rules(), VisualizerRules::default());
    }

    #[test]
    fn empty_config() {
        let config: PollConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PollConfig::default());
    }
}

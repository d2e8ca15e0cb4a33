//! Turns a raw survey export into poll definitions.
//!
//! Survey tools put the question text in the first row, so the export is read without any header:
//! after transposition, each column is `[question, answer_1, answer_2, ...]`.

use log::{debug, warn};

use crate::config::*;

/// The outcome of an ingestion, with the input problems that were tolerated.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct IngestReport {
    pub polls: Vec<PollDefinition>,
    pub warnings: Vec<TallyErrors>,
}

/// Reads the CSV text as a grid of cells. Rows may have different lengths.
///
/// Records that cannot be read are skipped and reported in the warnings.
pub fn parse_grid(text: &str) -> (Vec<Vec<String>>, Vec<TallyErrors>) {
    parse_grid_bytes(text.as_bytes())
}

/// Same as `parse_grid`, for content that may not be valid UTF-8.
pub fn parse_grid_bytes(content: &[u8]) -> (Vec<Vec<String>>, Vec<TallyErrors>) {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content);
    let mut grid: Vec<Vec<String>> = Vec::new();
    let mut warnings: Vec<TallyErrors> = Vec::new();
    for (idx, record_r) in rdr.into_records().enumerate() {
        match record_r {
            Ok(record) => {
                grid.push(record.iter().map(|s| s.to_string()).collect());
            }
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(idx as u64 + 1);
                warn!("parse_grid: skipping record at line {}: {}", line, e);
                warnings.push(TallyErrors::CsvParse {
                    line,
                    message: e.to_string(),
                });
            }
        }
    }
    (grid, warnings)
}

/// Rows to columns. The width of the first row is the width of the table: cells beyond it are
/// dropped, missing cells are simply absent from the column.
pub fn transpose(grid: &[Vec<String>]) -> Vec<Vec<String>> {
    let width = match grid.first() {
        Some(row) => row.len(),
        None => return Vec::new(),
    };
    let mut columns: Vec<Vec<String>> = vec![Vec::new(); width];
    for (lineno, row) in grid.iter().enumerate() {
        if row.len() > width {
            warn!(
                "transpose: row {} has {} cells, only {} columns in the header: ignoring the extra cells",
                lineno + 1,
                row.len(),
                width
            );
        }
        for (col, cell) in columns.iter_mut().zip(row.iter()) {
            col.push(cell.clone());
        }
    }
    columns
}

/// Follows the conventions of `parseFloat`: only the start of the string matters.
///
/// `"5 - Strongly agree"` is numeric, `"Maybe"` or `""` are not.
pub fn looks_numeric(s: &str) -> bool {
    let s = s.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    if s.starts_with("Infinity") {
        return true;
    }
    let int_digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    let frac_digits = s[int_digits..]
        .strip_prefix('.')
        .map(|rest| rest.chars().take_while(|c| c.is_ascii_digit()).count())
        .unwrap_or(0);
    int_digits + frac_digits > 0
}

/// Counts every option in the answers. A multi-select answer counts once for each of its options.
pub fn tally_column(answers: &[String], delimiter: &str) -> OptionTally {
    let mut tally = OptionTally::new();
    for answer in answers.iter() {
        for option in answer.split(delimiter) {
            tally.add(option);
        }
    }
    tally
}

/// Removes the write-ins with little support. Numeric options (rating scales) are always kept.
pub fn prune(tally: &mut OptionTally, threshold: u64) {
    tally.retain(|name, count| {
        let keep = looks_numeric(name) || count > threshold;
        if !keep {
            debug!("prune: dropping option {:?} with count {}", name, count);
        }
        keep
    });
}

fn is_excluded(question: &str, rules: &IngestRules) -> bool {
    rules
        .excluded_prefixes
        .iter()
        .any(|prefix| question.starts_with(prefix.as_str()))
}

/// Builds the poll definitions out of an already parsed grid.
pub fn ingest_grid(grid: &[Vec<String>], rules: &IngestRules) -> Vec<PollDefinition> {
    let mut polls: Vec<PollDefinition> = Vec::new();
    for column in transpose(grid) {
        let (question, answers) = match column.split_first() {
            Some(p) => p,
            None => continue,
        };
        if is_excluded(question, rules) {
            debug!("ingest_grid: skipping column {:?}", question);
            continue;
        }
        let mut tally = tally_column(answers, &rules.multi_select_delimiter);
        debug!(
            "ingest_grid: question {:?}: {} options, {} selections",
            question,
            tally.len(),
            tally.total()
        );
        prune(&mut tally, rules.prune_threshold);
        polls.push(PollDefinition {
            question: question.clone(),
            results: tally
                .entries()
                .iter()
                .map(|(option, value)| PollResult {
                    option: option.clone(),
                    value: *value,
                })
                .collect(),
            chart: rules.default_chart,
        });
    }
    polls
}

pub fn ingest_report(content: &[u8], rules: &IngestRules) -> IngestReport {
    let (grid, warnings) = parse_grid_bytes(content);
    if !warnings.is_empty() {
        warn!(
            "ingest: {} malformed records, continuing with {} rows",
            warnings.len(),
            grid.len()
        );
    }
    IngestReport {
        polls: ingest_grid(&grid, rules),
        warnings,
    }
}

/// Parses a survey export and returns one poll definition per question.
///
/// Malformed records are logged and skipped: this function does not fail.
pub fn ingest(text: &str, rules: &IngestRules) -> Vec<PollDefinition> {
    ingest_report(text.as_bytes(), rules).polls
}

//! Live aggregation of a stored survey export.
//!
//! Unlike the ingestion, the first row of the export is read as a header, and an answer is
//! always taken as a single label (no multi-select splitting).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::debug;

use crate::config::*;
use crate::ingest::parse_grid;
use crate::records::{poll_group_slug, PollGroup, RecordKind, RecordType};
use crate::store::{ContentStore, StoreError};

/// A survey export read with its header row.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SurveyTable {
    /// In the order of the columns.
    pub headers: Vec<String>,
    pub rows: Vec<RawSurveyRow>,
}

impl SurveyTable {
    /// The first row gives the labels. Cells without a label are ignored; a duplicated label is
    /// given the value of its last column.
    pub fn from_grid(grid: &[Vec<String>]) -> SurveyTable {
        let (header, body) = match grid.split_first() {
            Some(p) => p,
            None => return SurveyTable::default(),
        };
        let rows = body
            .iter()
            .map(|cells| {
                header
                    .iter()
                    .zip(cells.iter())
                    .map(|(h, c)| (h.clone(), c.clone()))
                    .collect::<RawSurveyRow>()
            })
            .collect();
        SurveyTable {
            headers: header.clone(),
            rows,
        }
    }

    /// Parses the CSV text. Malformed records are logged and skipped.
    pub fn parse(text: &str) -> SurveyTable {
        let (grid, _) = parse_grid(text);
        SurveyTable::from_grid(&grid)
    }

    pub fn has_question(&self, question: &str) -> bool {
        self.headers.iter().any(|h| h == question)
    }

    fn check_question(&self, question: &str) -> Result<(), TallyErrors> {
        if self.has_question(question) {
            Ok(())
        } else {
            Err(TallyErrors::UnknownQuestion(question.to_string()))
        }
    }
}

/// Reads back the survey export kept with the poll group of the given title.
///
/// The group is looked up by the slug the visualizer builds from the title (lowercase, spaces
/// replaced by `-`), which is not always the slug given by the store.
pub fn stored_survey<S: ContentStore + ?Sized>(
    store: &S,
    title: &str,
) -> Result<SurveyTable, StoreError> {
    let slug = poll_group_slug(title);
    let obj = store.find_by_slug(RecordKind::PollGroup, &slug)?;
    let group = PollGroup::from_stored(&obj)?;
    debug!(
        "stored_survey: {} ({} bytes of csv)",
        slug,
        group.record.csv_data.len()
    );
    Ok(SurveyTable::parse(&group.record.csv_data))
}

/// Rounds to two decimal places, as displayed by the visualizer.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(count as f64 / total as f64 * 100.0)
    }
}

fn answer<'a>(row: &'a RawSurveyRow, question: &str, rules: &'a AggregateRules) -> &'a str {
    match row.get(question) {
        Some(s) if !s.is_empty() => s.as_str(),
        _ => rules.no_response_label.as_str(),
    }
}

/// Distribution of the answers to one question, in the order the answers are first seen.
pub fn compute_topline(
    rows: &[RawSurveyRow],
    question: &str,
    mode: ViewMode,
    rules: &AggregateRules,
) -> Topline {
    let mut tally = OptionTally::new();
    for row in rows.iter() {
        tally.add(answer(row, question, rules));
    }
    let total = tally.total();
    debug!(
        "compute_topline: question {:?}: {} answers over {} rows",
        question,
        tally.len(),
        total
    );
    let labels: Vec<String> = tally.entries().iter().map(|(l, _)| l.clone()).collect();
    let values: Vec<f64> = tally
        .entries()
        .iter()
        .map(|(_, count)| match mode {
            ViewMode::Absolute => *count as f64,
            ViewMode::Percentage => percentage(*count, total),
        })
        .collect();
    Topline {
        question: question.to_string(),
        mode,
        labels,
        values,
    }
}

/// Distribution of the answers to `result_question` within each answer of `group_question`.
///
/// Percentages are relative to the size of each group.
pub fn compute_crosstab(
    rows: &[RawSurveyRow],
    group_question: &str,
    result_question: &str,
    mode: ViewMode,
    rules: &AggregateRules,
) -> Crosstab {
    let mut counts: BTreeMap<String, HashMap<String, u64>> = BTreeMap::new();
    for row in rows.iter() {
        let g = answer(row, group_question, rules);
        let s = answer(row, result_question, rules);
        let e = counts
            .entry(g.to_string())
            .or_default()
            .entry(s.to_string())
            .or_insert(0);
        *e += 1;
    }

    let groups: Vec<String> = counts.keys().cloned().collect();
    let subcategories: Vec<String> = counts
        .values()
        .flat_map(|sub| sub.keys().cloned())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect();
    debug!(
        "compute_crosstab: {:?} x {:?}: groups: {:?} subcategories: {:?}",
        group_question, result_question, groups, subcategories
    );

    let group_totals: Vec<u64> = counts.values().map(|sub| sub.values().sum()).collect();
    let mut series: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for sub in subcategories.iter() {
        let values: Vec<f64> = counts
            .values()
            .zip(group_totals.iter())
            .map(|(group_counts, total)| {
                let count = group_counts.get(sub).cloned().unwrap_or(0);
                match mode {
                    ViewMode::Absolute => count as f64,
                    ViewMode::Percentage => percentage(count, *total),
                }
            })
            .collect();
        series.insert(sub.clone(), values);
    }

    Crosstab {
        group_question: group_question.to_string(),
        result_question: result_question.to_string(),
        mode,
        groups,
        subcategories,
        series,
    }
}

/// Same as `compute_topline`, but checks that the question is a column of the table.
pub fn table_topline(
    table: &SurveyTable,
    question: &str,
    mode: ViewMode,
    rules: &AggregateRules,
) -> Result<Topline, TallyErrors> {
    table.check_question(question)?;
    Ok(compute_topline(&table.rows, question, mode, rules))
}

/// Same as `compute_crosstab`, but checks that both questions are columns of the table.
pub fn table_crosstab(
    table: &SurveyTable,
    group_question: &str,
    result_question: &str,
    mode: ViewMode,
    rules: &AggregateRules,
) -> Result<Crosstab, TallyErrors> {
    table.check_question(group_question)?;
    table.check_question(result_question)?;
    Ok(compute_crosstab(
        &table.rows,
        group_question,
        result_question,
        mode,
        rules,
    ))
}

/// The questions offered for analysis: the header without the leading metadata columns and
/// without the auto-generated column names.
pub fn visualizer_questions(headers: &[String], rules: &VisualizerRules) -> Vec<String> {
    headers
        .iter()
        .skip(rules.skipped_leading_columns)
        .filter(|h| {
            !rules
                .hidden_prefixes
                .iter()
                .any(|prefix| h.starts_with(prefix.as_str()))
        })
        .cloned()
        .collect()
}

/// The initial selection of the questions.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Selection {
    pub topline: String,
    pub crosstab_by: String,
    pub crosstab_results: String,
}

pub fn default_selection(questions: &[String]) -> Option<Selection> {
    let first = questions.first()?;
    Some(Selection {
        topline: first.clone(),
        crosstab_by: first.clone(),
        crosstab_results: questions.get(1).unwrap_or(first).clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::create_poll_group;
    use crate::store::MemoryStore;

    fn table() -> SurveyTable {
        SurveyTable::parse(
            "Timestamp,Year,Vote\n\
             t1,2025,Yes\n\
             t2,2025,No\n\
             t3,2026,Yes\n\
             t4,,Yes\n\
             t5,2026,\n",
        )
    }

    #[test]
    fn topline_absolute() {
        let t = table();
        let res = compute_topline(&t.rows, "Vote", ViewMode::Absolute, &AggregateRules::default());
        assert_eq!(res.labels, vec!["Yes", "No", "No Response"]);
        assert_eq!(res.values, vec![3.0, 1.0, 1.0]);
    }

    #[test]
    fn topline_percentage_sums_to_100() {
        let t = SurveyTable::parse("Q\na\nb\nc\n");
        let res = compute_topline(&t.rows, "Q", ViewMode::Percentage, &AggregateRules::default());
        assert_eq!(res.values, vec![33.33, 33.33, 33.33]);
        let total: f64 = res.values.iter().sum();
        assert!((total - 100.0).abs() < 0.05);
    }

    #[test]
    fn topline_no_rows() {
        let res = compute_topline(&[], "Q", ViewMode::Percentage, &AggregateRules::default());
        assert!(res.labels.is_empty());
        assert!(res.values.is_empty());
    }

    #[test]
    fn survey_read_back_from_store() {
        let mut store = MemoryStore::new();
        let csv = "Timestamp,Q1,Q2\nt1,Red,Yes\nt2,Blue,\n";
        create_poll_group(&mut store, "Spring 2024", csv, &IngestRules::default()).unwrap();
        let table = stored_survey(&store, "Spring 2024").unwrap();
        assert_eq!(table, SurveyTable::parse(csv));
        let res =
            compute_topline(&table.rows, "Q2", ViewMode::Absolute, &AggregateRules::default());
        assert_eq!(res.labels, vec!["Yes", "No Response"]);
        assert!(matches!(
            stored_survey(&store, "Fall 2024"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn stored_slug_differs_for_punctuated_titles() {
        let mut store = MemoryStore::new();
        let g = create_poll_group(&mut store, "Spring '24", "Q\n1\n", &IngestRules::default())
            .unwrap();
        assert_eq!(g.slug, "spring-24");
        assert_eq!(poll_group_slug("Spring '24"), "spring-'24");
        assert!(matches!(
            stored_survey(&store, "Spring '24"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn percentage_of_zero_total() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.33);
    }

    #[test]
    fn multi_select_is_a_single_label() {
        let t = SurveyTable::parse("Q\n\"A, B\"\nA\n");
        let res = compute_topline(&t.rows, "Q", ViewMode::Absolute, &AggregateRules::default());
        assert_eq!(res.labels, vec!["A, B", "A"]);
    }

    #[test]
    fn crosstab_absolute() {
        let t = table();
        let res = compute_crosstab(
            &t.rows,
            "Year",
            "Vote",
            ViewMode::Absolute,
            &AggregateRules::default(),
        );
        assert_eq!(res.groups, vec!["2025", "2026", "No Response"]);
        assert_eq!(res.subcategories, vec!["No", "No Response", "Yes"]);
        assert_eq!(res.series["No"], vec![1.0, 0.0, 0.0]);
        assert_eq!(res.series["No Response"], vec![0.0, 1.0, 0.0]);
        assert_eq!(res.series["Yes"], vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn crosstab_percentage() {
        let t = table();
        let res = compute_crosstab(
            &t.rows,
            "Year",
            "Vote",
            ViewMode::Percentage,
            &AggregateRules::default(),
        );
        assert_eq!(res.series["Yes"], vec![50.0, 50.0, 100.0]);
        assert_eq!(res.series["No"], vec![50.0, 0.0, 0.0]);
    }

    #[test]
    fn same_input_same_output() {
        let t = table();
        let rules = AggregateRules::default();
        let a = compute_crosstab(&t.rows, "Vote", "Year", ViewMode::Percentage, &rules);
        let b = compute_crosstab(&t.rows, "Vote", "Year", ViewMode::Percentage, &rules);
        assert_eq!(a, b);
        let c = compute_topline(&t.rows, "Year", ViewMode::Absolute, &rules);
        let d = compute_topline(&t.rows, "Year", ViewMode::Absolute, &rules);
        assert_eq!(c, d);
    }

    #[test]
    fn unknown_question() {
        let t = table();
        let res = table_topline(&t, "Nope", ViewMode::Absolute, &AggregateRules::default());
        assert_eq!(res, Err(TallyErrors::UnknownQuestion("Nope".to_string())));
    }

    #[test]
    fn questions_and_selection() {
        let headers: Vec<String> = ["Timestamp", "Year", "Column 4", "Vote"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let qs = visualizer_questions(&headers, &VisualizerRules::default());
        assert_eq!(qs, vec!["Year", "Vote"]);
        let sel = default_selection(&qs).unwrap();
        assert_eq!(sel.topline, "Year");
        assert_eq!(sel.crosstab_by, "Year");
        assert_eq!(sel.crosstab_results, "Vote");

        let single = default_selection(&qs[..1]).unwrap();
        assert_eq!(single.crosstab_results, "Year");
        assert_eq!(default_selection(&[]), None);
    }
}

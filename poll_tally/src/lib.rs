//! Tabulation of student polls.
//!
//! A survey export (one row per respondent, the questions in the first row) is turned into
//! published poll definitions by [`ingest()`], and analysed live by [`compute_topline`] and
//! [`compute_crosstab`]. The [`roster`] and [`admin`] modules cover the rest of the content
//! that is kept in the content store.
//!
//! See the [`manual`] for the formats and the configuration.

mod config;

pub mod admin;
pub mod aggregate;
pub mod builder;
pub mod embed;
pub mod ingest;
pub mod manual;
pub mod records;
pub mod render;
pub mod roster;
pub mod store;

use log::info;

pub use crate::aggregate::{
    compute_crosstab, compute_topline, default_selection, visualizer_questions, Selection,
    SurveyTable,
};
pub use crate::config::*;
pub use crate::ingest::{ingest, ingest_report, IngestReport};
pub use crate::render::{ChartData, ChartSeries, TableView};
pub use crate::roster::{ChainError, PointerWrite, RosterChain};
pub use crate::store::{ContentStore, MemoryStore, StoreError};

/// One analysis of a stored survey export.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AnalysisRequest {
    Topline {
        question: String,
    },
    Crosstab {
        group_question: String,
        result_question: String,
    },
}

/// The result of an analysis, ready to be displayed.
#[derive(PartialEq, Debug, Clone)]
pub struct AnalysisOutput {
    pub chart: ChartData,
    pub table: TableView,
}

/// Runs one analysis over a survey table.
///
/// Arguments:
/// * `table` the survey export, read with its header
/// * `request` the questions to analyse. They must be columns of the table.
/// * `mode` counts or percentages
pub fn run_analysis(
    table: &SurveyTable,
    request: &AnalysisRequest,
    mode: ViewMode,
    rules: &AggregateRules,
) -> Result<AnalysisOutput, TallyErrors> {
    if table.headers.is_empty() {
        return Err(TallyErrors::EmptyInput);
    }
    info!(
        "Processing {:?} responses, analysis: {:?}, mode: {:?}",
        table.rows.len(),
        request,
        mode
    );
    match request {
        AnalysisRequest::Topline { question } => {
            let topline = aggregate::table_topline(table, question, mode, rules)?;
            Ok(AnalysisOutput {
                chart: render::topline_chart(&topline),
                table: render::topline_table(&topline),
            })
        }
        AnalysisRequest::Crosstab {
            group_question,
            result_question,
        } => {
            let crosstab =
                aggregate::table_crosstab(table, group_question, result_question, mode, rules)?;
            Ok(AnalysisOutput {
                chart: render::crosstab_chart(&crosstab),
                table: render::crosstab_table(&crosstab),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn topline_analysis() {
        init();
        let table = SurveyTable::parse("Timestamp,Vote\nt1,Yes\nt2,No\nt3,Yes\nt4,\n");
        let out = run_analysis(
            &table,
            &AnalysisRequest::Topline {
                question: "Vote".to_string(),
            },
            ViewMode::Percentage,
            &AggregateRules::default(),
        )
        .unwrap();
        assert_eq!(out.chart.labels, vec!["Yes", "No", "No Response"]);
        assert_eq!(out.chart.datasets[0].data, vec![50.0, 25.0, 25.0]);
        assert_eq!(out.table.header[1], "Percentage (%)");
        assert_eq!(out.table.rows[0], vec!["Yes", "50%"]);
    }

    #[test]
    fn crosstab_analysis() {
        init();
        let table = SurveyTable::parse("Timestamp,Year,Vote\nt1,2025,Yes\nt2,2026,No\n");
        let out = run_analysis(
            &table,
            &AnalysisRequest::Crosstab {
                group_question: "Year".to_string(),
                result_question: "Vote".to_string(),
            },
            ViewMode::Absolute,
            &AggregateRules::default(),
        )
        .unwrap();
        assert_eq!(out.chart.labels, vec!["2025", "2026"]);
        assert_eq!(out.table.header, vec!["", "No", "Yes"]);
        assert_eq!(out.table.rows[1], vec!["2026", "1", "0"]);
    }

    #[test]
    fn analysis_errors() {
        init();
        let request = AnalysisRequest::Topline {
            question: "Vote".to_string(),
        };
        let rules = AggregateRules::default();
        assert_eq!(
            run_analysis(&SurveyTable::parse(""), &request, ViewMode::Absolute, &rules),
            Err(TallyErrors::EmptyInput)
        );
        let table = SurveyTable::parse("Timestamp,Year\nt1,2025\n");
        assert_eq!(
            run_analysis(&table, &request, ViewMode::Absolute, &rules),
            Err(TallyErrors::UnknownQuestion("Vote".to_string()))
        );
    }
}

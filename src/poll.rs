use log::{debug, info, warn};

use poll_tally::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use poll_tally::admin::create_poll_group;
use poll_tally::aggregate::stored_survey;
use poll_tally::ingest::{ingest_grid, parse_grid_bytes};
use poll_tally::records::{team_sections, Stored, TeamMember};
use poll_tally::roster::sort_members;
use poll_tally::store::load_all;

use crate::args::Args;
use crate::poll::config_reader::*;
use crate::poll::io_common::{guess_input_type, resolve_path};
use crate::poll::io_csv::{grid_to_csv, read_csv_content, read_csv_grid};
use crate::poll::io_store::{read_store, write_store};
use crate::poll::io_xlsx::read_xlsx_grid;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_store;
mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum PollError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook has no worksheet or no rows"))]
    EmptyExcel {},
    #[snafu(display("Missing worksheet {name}"))]
    MissingWorksheet { name: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing CSV: {source}"))]
    WritingCsv { source: csv::Error },
    #[snafu(display("Empty input file {path}"))]
    EmptyInputFile { path: String },
    #[snafu(display("No input file: use --input or the input section of the configuration"))]
    MissingInput {},
    #[snafu(display("No content store export: use --store or analysis.storePath"))]
    MissingStore {},
    #[snafu(display("No title for the poll group: use --title or analysis.title"))]
    MissingTitle {},
    #[snafu(display("Unknown input type {input_type}"))]
    UnknownInputType { input_type: String },
    #[snafu(display("Unknown analysis {analysis}"))]
    UnknownAnalysis { analysis: String },
    #[snafu(display("Unknown view {view}: expected absolute or percentage"))]
    UnknownView { view: String },
    #[snafu(display("The survey has no question to analyse"))]
    NoQuestions {},
    #[snafu(display("Tabulation error: {source}"))]
    Tally { source: TallyErrors },
    #[snafu(display("Content store error: {source}"))]
    Store { source: StoreError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type PResult<T> = Result<T, PollError>;

// The error is large, and is boxed in the longer call chains.
pub type BPollResult<T> = Result<T, Box<PollError>>;

/// The configuration file merged with the command line.
#[derive(PartialEq, Debug, Clone)]
struct Settings {
    input_path: Option<String>,
    input_type: String,
    worksheet_name: Option<String>,
    analysis: String,
    question: Option<String>,
    crosstab_by: Option<String>,
    crosstab_results: Option<String>,
    view: ViewMode,
    store_path: Option<String>,
    title: Option<String>,
    ingest_rules: IngestRules,
    aggregate_rules: AggregateRules,
    visualizer_rules: VisualizerRules,
}

/// What an analysis produces: the JSON output and a plain text summary.
struct Output {
    js: JSValue,
    text: String,
}

fn parse_view(view: &str) -> PResult<ViewMode> {
    match view {
        "absolute" => Ok(ViewMode::Absolute),
        "percentage" => Ok(ViewMode::Percentage),
        _ => UnknownViewSnafu { view }.fail(),
    }
}

fn build_settings(args: &Args) -> BPollResult<Settings> {
    let (config, root_p): (PollConfig, Option<PathBuf>) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root_p = Path::new(config_path).parent().map(|p| p.to_path_buf());
            (config, root_p)
        }
        None => (PollConfig::default(), None),
    };
    info!("config: {:?}", config);
    let root = root_p.as_deref();

    let input_path = args.input.clone().or_else(|| {
        config
            .input
            .file_path
            .as_ref()
            .map(|fp| resolve_path(root, fp))
    });
    let input_type = args
        .input_type
        .clone()
        .or_else(|| config.input.provider.clone())
        .unwrap_or_else(|| guess_input_type(input_path.as_deref().unwrap_or("")).to_string());

    let mut ingest_rules = config.ingest.rules();
    if let Some(threshold) = args.prune_threshold {
        ingest_rules.prune_threshold = threshold;
    }

    let view = match &args.view {
        Some(v) => parse_view(v)?,
        None => config.analysis.view.unwrap_or(ViewMode::Absolute),
    };

    let store_path = args.store.clone().or_else(|| {
        config
            .analysis
            .store_path
            .as_ref()
            .map(|sp| resolve_path(root, sp))
    });

    Ok(Settings {
        input_path,
        input_type,
        worksheet_name: args
            .excel_worksheet_name
            .clone()
            .or_else(|| config.input.excel_worksheet_name.clone()),
        analysis: args
            .analysis
            .clone()
            .or_else(|| config.analysis.kind.clone())
            .unwrap_or_else(|| "ingest".to_string()),
        question: args
            .question
            .clone()
            .or_else(|| config.analysis.question.clone()),
        crosstab_by: args
            .crosstab_by
            .clone()
            .or_else(|| config.analysis.crosstab_by.clone()),
        crosstab_results: args
            .crosstab_results
            .clone()
            .or_else(|| config.analysis.crosstab_results.clone()),
        view,
        store_path,
        title: args.title.clone().or_else(|| config.analysis.title.clone()),
        ingest_rules,
        aggregate_rules: config.aggregate.rules(),
        visualizer_rules: config.visualizer.rules(),
    })
}

fn read_grid(settings: &Settings) -> BPollResult<Vec<Vec<String>>> {
    let path = settings
        .input_path
        .as_deref()
        .context(MissingInputSnafu {})?;
    info!(
        "Attempting to read survey file {:?} as {}",
        path, settings.input_type
    );
    match settings.input_type.as_str() {
        "csv" => read_csv_grid(path),
        "xlsx" => read_xlsx_grid(path, settings.worksheet_name.as_deref()),
        x => Err(Box::new(PollError::UnknownInputType {
            input_type: x.to_string(),
        })),
    }
}

/// The text of the export, as it is kept along with a poll group.
fn read_csv_text(settings: &Settings) -> BPollResult<String> {
    if settings.input_type == "csv" {
        let path = settings
            .input_path
            .as_deref()
            .context(MissingInputSnafu {})?;
        let content = read_csv_content(path)?;
        Ok(String::from_utf8_lossy(&content).into_owned())
    } else {
        grid_to_csv(&read_grid(settings)?)
    }
}

fn run_ingest(settings: &Settings) -> BPollResult<Output> {
    let grid = read_grid(settings)?;
    let polls = ingest_grid(&grid, &settings.ingest_rules);
    info!("run_ingest: {} polls", polls.len());
    let mut text = String::new();
    for p in polls.iter() {
        text.push_str(&format!("{} ({} options)\n", p.question, p.results.len()));
        for r in p.results.iter() {
            text.push_str(&format!("  {}: {}\n", r.option, r.value));
        }
    }
    let js = serde_json::to_value(&polls).context(ParsingJsonSnafu {})?;
    Ok(Output { js, text })
}

/// The survey: the export kept with a stored poll group when a store and a title are given,
/// the input file otherwise.
fn survey_table(settings: &Settings) -> BPollResult<(SurveyTable, Vec<String>)> {
    let table = match (&settings.store_path, &settings.title) {
        (Some(store_path), Some(title)) => {
            info!("survey_table: poll group {:?} from {}", title, store_path);
            let store = read_store(store_path)?;
            stored_survey(&store, title).context(StoreSnafu {})?
        }
        _ => SurveyTable::from_grid(&read_grid(settings)?),
    };
    let questions = visualizer_questions(&table.headers, &settings.visualizer_rules);
    debug!("survey_table: questions: {:?}", questions);
    Ok((table, questions))
}

fn run_questions(settings: &Settings) -> BPollResult<Output> {
    let (_, questions) = survey_table(settings)?;
    let text: String = questions.iter().map(|q| format!("{}\n", q)).collect();
    Ok(Output {
        js: json!(questions),
        text,
    })
}

fn run_live_analysis(settings: &Settings) -> BPollResult<Output> {
    let (table, questions) = survey_table(settings)?;
    let selection = default_selection(&questions).context(NoQuestionsSnafu {})?;
    let request = if settings.analysis == "topline" {
        AnalysisRequest::Topline {
            question: settings.question.clone().unwrap_or(selection.topline),
        }
    } else {
        AnalysisRequest::Crosstab {
            group_question: settings
                .crosstab_by
                .clone()
                .unwrap_or(selection.crosstab_by),
            result_question: settings
                .crosstab_results
                .clone()
                .unwrap_or(selection.crosstab_results),
        }
    };
    let out = run_analysis(
        &table,
        &request,
        settings.view,
        &settings.aggregate_rules,
    )
    .context(TallySnafu {})?;
    let text = out.table.to_text();
    let js = match &request {
        AnalysisRequest::Topline { question } => json!({
            "analysis": "topline",
            "question": question,
            "mode": settings.view,
            "chart": out.chart,
            "table": out.table,
        }),
        AnalysisRequest::Crosstab {
            group_question,
            result_question,
        } => json!({
            "analysis": "crosstab",
            "groupQuestion": group_question,
            "resultQuestion": result_question,
            "mode": settings.view,
            "chart": out.chart,
            "table": out.table,
        }),
    };
    Ok(Output { js, text })
}

fn member_js(m: &Stored<TeamMember>) -> JSValue {
    json!({
        "id": m.id,
        "name": m.record.name,
        "clubTitle": m.record.club_title,
    })
}

fn run_roster(settings: &Settings) -> BPollResult<Output> {
    let store_path = settings
        .store_path
        .as_deref()
        .context(MissingStoreSnafu {})?;
    let store = read_store(store_path)?;
    let members = load_all::<TeamMember, _>(&store).context(StoreSnafu {})?;
    let chain_valid = match RosterChain::new(&members) {
        Ok(_) => true,
        Err(e) => {
            warn!("run_roster: the display chain is broken: {}", e);
            false
        }
    };
    let (executives, staff) = team_sections(sort_members(&members));
    let mut text = String::new();
    for (section, list) in [("Executive board", &executives), ("Staff", &staff)] {
        text.push_str(&format!("{}\n", section));
        for m in list.iter() {
            text.push_str(&format!("  {} - {}\n", m.record.name, m.record.club_title));
        }
    }
    let js = json!({
        "chainValid": chain_valid,
        "executives": executives.iter().map(member_js).collect::<Vec<JSValue>>(),
        "staff": staff.iter().map(member_js).collect::<Vec<JSValue>>(),
    });
    Ok(Output { js, text })
}

fn run_publish(settings: &Settings) -> BPollResult<Output> {
    let store_path = settings
        .store_path
        .as_deref()
        .context(MissingStoreSnafu {})?;
    let title = settings.title.as_deref().context(MissingTitleSnafu {})?;
    let csv_text = read_csv_text(settings)?;
    let mut store = if Path::new(store_path).exists() {
        read_store(store_path)?
    } else {
        info!("run_publish: creating the export {}", store_path);
        MemoryStore::new()
    };
    let group = create_poll_group(&mut store, title, &csv_text, &settings.ingest_rules)
        .context(StoreSnafu {})?;
    write_store(store_path, &store)?;
    let js = json!({
        "id": group.id,
        "title": group.record.title,
        "slug": group.slug,
        "polls": group.record.data.len(),
    });
    let text = format!(
        "Created poll group {} ({}) with {} polls\n",
        group.record.title,
        group.slug,
        group.record.data.len()
    );
    Ok(Output { js, text })
}

fn check_reference(reference_path: &str, pretty_js: &str) -> PResult<()> {
    let reference = read_reference(reference_path)?;
    let pretty_js_ref = serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
    if pretty_js_ref != pretty_js {
        warn!("Found differences with the reference string");
        print_diff(pretty_js_ref.as_str(), pretty_js, "\n");
        whatever!("Difference detected between the output and the reference output")
    }
    Ok(())
}

pub fn run_poll(args: &Args) -> BPollResult<()> {
    let settings = build_settings(args)?;
    info!("settings: {:?}", settings);

    let output = match settings.analysis.as_str() {
        "ingest" => run_ingest(&settings)?,
        "questions" => run_questions(&settings)?,
        "topline" | "crosstab" => run_live_analysis(&settings)?,
        "roster" => run_roster(&settings)?,
        "publish" => run_publish(&settings)?,
        x => {
            return Err(Box::new(PollError::UnknownAnalysis {
                analysis: x.to_string(),
            }))
        }
    };

    let pretty_js = serde_json::to_string_pretty(&output.js).context(ParsingJsonSnafu {})?;
    match args.out.as_deref() {
        Some("stdout") => println!("{}", pretty_js),
        Some(out_path) => {
            fs::write(out_path, &pretty_js).context(WritingFileSnafu { path: out_path })?;
            info!("Output written to {}", out_path);
        }
        None => print!("{}", output.text),
    }

    // The reference output, if provided for comparison
    if let Some(reference_path) = &args.reference {
        check_reference(reference_path, &pretty_js)?;
    }
    Ok(())
}

#[cfg(test)]
fn test_dir() -> String {
    format!("{}/tests", env!("CARGO_MANIFEST_DIR"))
}

#[cfg(test)]
fn run_poll_test(test_name: &str, config_lpath: &str, reference_lpath: &str) -> BPollResult<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    info!("Running test {}", test_name);
    let args = Args {
        config: Some(format!("{}/{}/{}", test_dir(), test_name, config_lpath)),
        reference: Some(format!("{}/{}/{}", test_dir(), test_name, reference_lpath)),
        ..Args::default()
    };
    run_poll(&args)
}

#[cfg(test)]
pub fn test_wrapper(test_name: &str) {
    let res = run_poll_test(
        test_name,
        format!("{}_config.json", test_name).as_str(),
        format!("{}_expected.json", test_name).as_str(),
    );
    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        panic!("test {} failed: {}", test_name, e);
    }
}

use clap::Parser;

/// This is a tabulation program for opinion poll exports.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A configuration file in JSON. For more information about the file format,
    /// read the manual of the poll_tally library.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing the expected output in JSON format. If provided, boptally will
    /// check that the output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the output will be written in JSON format to the given
    /// location. Otherwise, a plain text summary is printed.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) The survey export. Setting this option overrides the path that may be specified with
    /// the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (csv or xlsx, guessed from the file name by default) The type of the input.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default ingest) One of ingest, questions, topline, crosstab, roster or publish.
    #[clap(short, long, value_parser)]
    pub analysis: Option<String>,

    /// (topline) The question to analyse. By default, the first question.
    #[clap(short, long, value_parser)]
    pub question: Option<String>,

    /// (crosstab) The question that defines the groups. By default, the first question.
    #[clap(long, value_parser)]
    pub crosstab_by: Option<String>,

    /// (crosstab) The question whose answers are counted in each group. By default, the second question.
    #[clap(long, value_parser)]
    pub crosstab_results: Option<String>,

    /// (absolute or percentage, default absolute) How the values are reported.
    #[clap(long, value_parser)]
    pub view: Option<String>,

    /// (ingest) The non-numeric options chosen this many times or fewer are removed.
    #[clap(long, value_parser)]
    pub prune_threshold: Option<u64>,

    /// When using an Excel file, indicates the name of the worksheet to use. By default, the first one.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path, roster and publish, or with --title for the live analyses) A JSON export of the
    /// content store.
    #[clap(long, value_parser)]
    pub store: Option<String>,

    /// (publish) The title of the new poll group. Otherwise, with --store, the poll group whose
    /// survey is analysed.
    #[clap(long, value_parser)]
    pub title: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

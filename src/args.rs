use clap::Parser;

/// Convergence of survey answers, broken out by recruitment seed.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The configuration of the analysis, in JSON format.
    /// Without it, --structure and --responses are required.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (question name) The question to analyse, as found in the response column labels.
    /// Required for the convergence report.
    #[clap(short, long, value_parser)]
    pub question: Option<String>,

    /// (default convergence) The report to produce: convergence, arrival or interview-length.
    #[clap(long, value_parser)]
    pub report: Option<String>,

    /// (file path) The survey structure (.lss). Overrides the configuration file.
    #[clap(long, value_parser)]
    pub structure: Option<String>,

    /// (file path) The responses. Overrides the configuration file.
    #[clap(long, value_parser)]
    pub responses: Option<String>,

    /// (csv or xlsx) The type of the response file. By default, guessed from its extension.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// When using an Excel file, the name of the worksheet to use. By default, the first one.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (repeatable) The main seeds to analyse. '*' stands for all the other seeds.
    #[clap(long, value_parser)]
    pub seeds: Option<Vec<String>>,

    /// The language of the survey structure to use.
    #[clap(long, value_parser)]
    pub language: Option<String>,

    /// (file path, 'stdout' or empty) Where to write the summary. Overrides the output file
    /// of the configuration.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (default json) The output format: json or text.
    #[clap(long, value_parser)]
    pub format: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, seedplot will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use serde_json::Value as JSValue;
use text_diff::print_diff;

use survey_convergence::catalog::StructureCatalog;
use survey_convergence::table::ResponseTable;
use survey_convergence::timing::{arrival_rates, interview_lengths, ArrivalReport, Histogram};
use survey_convergence::*;

use crate::args::Args;
use crate::plot::config_reader::*;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_lss;
mod io_xlsx;
mod render;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PlotError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON in {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the summary"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Expected a whole number for {field}, got {value}"))]
    ParsingJsonNumber { field: String, value: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Missing worksheet in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Excel row {lineno}, column {column}: cannot read cell {content}"))]
    ExcelWrongCellType {
        lineno: usize,
        column: usize,
        content: String,
    },
    #[snafu(display("Error parsing the survey structure {path}"))]
    ParsingXml {
        source: quick_xml::Error,
        path: String,
    },
    #[snafu(display("Survey structure: row {lineno} of section {section} has no field {field}"))]
    MissingField {
        section: String,
        field: String,
        lineno: usize,
    },
    #[snafu(display("{source}"))]
    Survey { source: SurveyError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PlotResult<T> = Result<T, PlotError>;

/// The reports that can be produced.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ReportKind {
    Convergence,
    Arrival,
    InterviewLength,
}

impl ReportKind {
    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::Convergence => "convergence",
            ReportKind::Arrival => "arrival",
            ReportKind::InterviewLength => "interview-length",
        }
    }

    fn parse(s: &str) -> PlotResult<ReportKind> {
        match s {
            "convergence" => Ok(ReportKind::Convergence),
            "arrival" => Ok(ReportKind::Arrival),
            "interview-length" => Ok(ReportKind::InterviewLength),
            x => whatever!("Unknown report {:?}: expected convergence, arrival or interview-length", x),
        }
    }
}

/// A computed report, ready to be rendered.
#[derive(PartialEq, Debug, Clone)]
pub enum Summary {
    Convergence(QuestionReport),
    Arrival(ArrivalReport),
    InterviewLength(Histogram),
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum OutputFormat {
    Json,
    Text,
}

// The configuration file, or an empty one when everything comes from the command line.
fn load_config(args: &Args) -> PlotResult<(PlotConfig, Option<String>)> {
    match &args.config {
        Some(config_path) => {
            let config_str = fs::read_to_string(config_path).context(OpeningFileSnafu {
                path: config_path.clone(),
            })?;
            let config: PlotConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {
                path: config_path.clone(),
            })?;
            info!("load_config: {:?}", config);
            let root = Path::new(config_path)
                .parent()
                .map(|p| p.display().to_string());
            Ok((config, root))
        }
        None => {
            ensure_whatever!(
                args.structure.is_some() && args.responses.is_some(),
                "Without --config, both --structure and --responses must be provided"
            );
            Ok((PlotConfig::default(), None))
        }
    }
}

fn read_structure(path: &str, settings: &SurveySettings) -> PlotResult<StructureCatalog> {
    let catalog = io_lss::read_lss_structure(path, &settings.language)?;
    info!(
        "read_structure: {}: {} questions in language {:?}",
        io_common::simplify_file_name(path),
        catalog.question_names().len(),
        settings.language
    );
    Ok(catalog)
}

fn read_responses(path: &str, provider: &str, worksheet: Option<&str>) -> PlotResult<ResponseTable> {
    info!("Attempting to read response file {:?}", path);
    let table = match provider {
        "csv" => io_csv::read_csv_table(path)?,
        "xlsx" => io_xlsx::read_excel_table(path, worksheet)?,
        x => whatever!("Unknown response provider {:?}: expected csv or xlsx", x),
    };
    info!(
        "read_responses: {} rows, {} columns",
        table.len(),
        table.header().len()
    );
    Ok(table)
}

fn compute_summary(
    report: ReportKind,
    question: Option<&str>,
    catalog: &StructureCatalog,
    table: &ResponseTable,
    settings: &SurveySettings,
) -> PlotResult<Summary> {
    let res = match report {
        ReportKind::Convergence => {
            let qname = match question {
                Some(x) => x,
                None => whatever!("The convergence report needs a question: use --question"),
            };
            Summary::Convergence(
                analyze_question(catalog, table, settings, qname).context(SurveySnafu {})?,
            )
        }
        ReportKind::Arrival => {
            Summary::Arrival(arrival_rates(table, settings).context(SurveySnafu {})?)
        }
        ReportKind::InterviewLength => {
            Summary::InterviewLength(interview_lengths(table, settings).context(SurveySnafu {})?)
        }
    };
    Ok(res)
}

fn write_output(content: &str, out: Option<&str>) -> PlotResult<()> {
    match out {
        None | Some("stdout") => {
            println!("{}", content);
        }
        Some(path) => {
            info!("write_output: writing summary to {:?}", path);
            fs::write(path, content).context(WritingFileSnafu { path })?;
        }
    }
    Ok(())
}

fn check_reference(reference_path: &str, summary_js: &JSValue) -> PlotResult<()> {
    let summary_ref = read_summary(reference_path)?;
    debug!("check_reference: reference: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(SerializingJsonSnafu {})?;
    let pretty_js_stats = serde_json::to_string_pretty(summary_js).context(SerializingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference string");
        print_diff(
            pretty_js_summary_ref.as_str(),
            pretty_js_stats.as_ref(),
            "\n",
        );
        whatever!("Difference detected between calculated summary and reference summary")
    }
    Ok(())
}

/// Runs one report as described by the command line and the configuration file.
pub fn run_report(args: &Args) -> PlotResult<Summary> {
    let (config, root) = load_config(args)?;
    let root = root.as_deref();

    let mut settings = validate_settings(&config)?;
    if let Some(language) = &args.language {
        settings.language = language.clone();
    }
    if let Some(seeds) = &args.seeds {
        ensure_whatever!(!seeds.is_empty(), "--seeds needs at least one seed");
        settings.main_seeds = seeds.clone();
    }
    debug!("run_report: settings: {:?}", settings);

    let report = ReportKind::parse(args.report.as_deref().unwrap_or("convergence"))?;
    let format = match args.format.as_deref() {
        None | Some("json") => OutputFormat::Json,
        Some("text") => OutputFormat::Text,
        Some(x) => whatever!("Unknown output format {:?}: expected json or text", x),
    };

    let structure_path = match &args.structure {
        Some(p) => p.clone(),
        None => io_common::resolve_path(root, &config.structure_file),
    };
    let source = &config.response_source;
    let responses_path = match &args.responses {
        Some(p) => p.clone(),
        None => io_common::resolve_path(root, &source.file_path),
    };
    let provider = args
        .input_type
        .clone()
        .or_else(|| source.provider.clone())
        .unwrap_or_else(|| io_common::guess_provider(&responses_path));
    let worksheet = args
        .excel_worksheet_name
        .clone()
        .or_else(|| source.excel_worksheet_name.clone());

    let catalog = read_structure(&structure_path, &settings)?;
    let table = read_responses(&responses_path, &provider, worksheet.as_deref())?;

    let summary = compute_summary(
        report,
        args.question.as_deref(),
        &catalog,
        &table,
        &settings,
    )?;

    let survey_name = config.output_settings.survey_name.as_str();
    let summary_js = render::summary_json(&summary, survey_name);
    let content = match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&summary_js).context(SerializingJsonSnafu {})?
        }
        OutputFormat::Text => render::summary_text(&summary, survey_name),
    };

    let out = match &args.out {
        Some(x) => Some(x.clone()),
        None => config
            .output_settings
            .output_file
            .as_ref()
            .map(|p| io_common::resolve_path(root, p)),
    };
    write_output(&content, out.as_deref())?;

    // The reference summary, if provided for comparison
    if let Some(reference_path) = &args.reference {
        check_reference(reference_path, &summary_js)?;
    }
    Ok(summary)
}

#[cfg(test)]
fn test_args(extra: &[&str]) -> Args {
    use clap::Parser;
    let test_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data");
    let config = format!("{}/survey_config.json", test_dir);
    let mut argv: Vec<String> = vec![
        "seedplot".to_string(),
        "--config".to_string(),
        config,
        "--out".to_string(),
        "stdout".to_string(),
    ];
    argv.extend(extra.iter().map(|s| {
        s.replace("$TEST_DIR", test_dir)
    }));
    Args::parse_from(argv)
}

#[cfg(test)]
pub fn test_wrapper(extra: &[&str]) -> Summary {
    let _ = env_logger::builder().is_test(true).try_init();
    match run_report(&test_args(extra)) {
        Ok(x) => x,
        Err(e) => {
            panic!("An error occured {}: {:?}", e, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trajectories(summary: &Summary, panel: usize) -> Vec<LabeledSeries> {
        match summary {
            Summary::Convergence(report) => match &report.panels[panel].convergence {
                Convergence::Trajectories(x) => x.clone(),
                x => panic!("expected trajectories, got {:?}", x),
            },
            x => panic!("expected a convergence report, got {:?}", x),
        }
    }

    #[test]
    fn city_matches_reference() {
        test_wrapper(&[
            "--question",
            "city",
            "--reference",
            "$TEST_DIR/city_expected_summary.json",
        ]);
    }

    #[test]
    fn reference_mismatch_is_an_error() {
        let args = test_args(&[
            "--question",
            "gender",
            "--reference",
            "$TEST_DIR/city_expected_summary.json",
        ]);
        assert!(matches!(run_report(&args), Err(PlotError::Whatever { .. })));
    }

    #[test]
    fn city_panels() {
        let summary = test_wrapper(&["--question", "city"]);
        let sd01 = trajectories(&summary, 0);
        assert_eq!(sd01[0].label, "North");
        assert_eq!(sd01[0].values, vec![100.0, 50.0]);
        assert_eq!(sd01[1].values, vec![0.0, 50.0]);
        let sd02 = trajectories(&summary, 1);
        assert_eq!(sd02[1].values, vec![100.0, 100.0]);
        let others = trajectories(&summary, 2);
        assert_eq!(others[0].values, vec![100.0, 100.0]);
        match &summary {
            Summary::Convergence(report) => {
                assert_eq!(report.text, "Which city do you live in?");
                let seeds: Vec<&str> = report.panels.iter().map(|p| p.seed.as_str()).collect();
                assert_eq!(seeds, vec!["sd01", "sd02", "*"]);
            }
            x => panic!("unexpected summary {:?}", x),
        }
    }

    #[test]
    fn seeds_from_command_line() {
        let summary = test_wrapper(&["--question", "city", "--seeds", "sd02", "--format", "text"]);
        match &summary {
            Summary::Convergence(report) => {
                assert_eq!(report.panels.len(), 1);
                assert_eq!(report.panels[0].respondents, 2);
            }
            x => panic!("unexpected summary {:?}", x),
        }
    }

    #[test]
    fn gender_is_inferred() {
        let summary = test_wrapper(&["--question", "gender"]);
        let sd01 = trajectories(&summary, 0);
        let labels: Vec<&str> = sd01.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Male", "Female", "No answer"]);
        // M, then blank.
        assert_eq!(sd01[0].values, vec![100.0, 50.0]);
        assert_eq!(sd01[2].values, vec![0.0, 50.0]);
    }

    #[test]
    fn tools_skip_the_write_in_column() {
        let summary = test_wrapper(&["--question", "tools"]);
        let sd02 = trajectories(&summary, 1);
        let labels: Vec<&str> = sd02.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["VPN", "Proxy", "Tor"]);
        assert_eq!(sd02[0].values, vec![0.0, 25.0]);
        assert_eq!(sd02[1].values, vec![50.0, 50.0]);
        assert_eq!(sd02[2].values, vec![50.0, 25.0]);
        // The only other row of sd01 has nothing checked.
        let sd01 = trajectories(&summary, 0);
        assert_eq!(sd01[0].values, vec![100.0]);
    }

    #[test]
    fn age_buckets() {
        let summary = test_wrapper(&["--question", "age", "--seeds", "*"]);
        let others = trajectories(&summary, 0);
        // 72 is above the ceiling, and the last row has no age.
        assert_eq!(others.len(), 12);
        assert!(others.iter().all(|s| s.values.is_empty()));
    }

    #[test]
    fn devices_breakdown() {
        match test_wrapper(&["--question", "devices", "--seeds", "sd02"]) {
            Summary::Convergence(report) => match &report.panels[0].convergence {
                Convergence::Breakdown { answers, rows } => {
                    assert_eq!(answers.len(), 2);
                    assert_eq!(rows[0].label, "Computer");
                    assert_eq!(rows[0].percentages, vec![50.0, 50.0]);
                    assert_eq!(rows[1].label, "Phone");
                    assert_eq!(rows[1].percentages, vec![0.0, 100.0]);
                }
                x => panic!("expected a breakdown, got {:?}", x),
            },
            x => panic!("unexpected summary {:?}", x),
        }
    }

    #[test]
    fn arrival_report() {
        match test_wrapper(&["--report", "arrival", "--format", "text"]) {
            Summary::Arrival(report) => {
                assert_eq!(report.bin_seconds, 1800);
                let sd01 = &report.series[0].counts;
                assert_eq!(sd01.len(), 47);
                assert_eq!(sd01[0], 1);
                assert_eq!(sd01[2], 1);
                assert_eq!(sd01.iter().sum::<u64>(), 2);
                let others = &report.series[2].counts;
                // The last row has no submission time.
                assert_eq!(others[46], 1);
                assert_eq!(others.iter().sum::<u64>(), 1);
            }
            x => panic!("unexpected summary {:?}", x),
        }
    }

    #[test]
    fn interview_length_report() {
        match test_wrapper(&["--report", "interview-length"]) {
            Summary::InterviewLength(h) => {
                assert_eq!(h.counts.len(), 300);
                assert_eq!(h.lower, 180.0);
                assert_eq!(h.counts.iter().sum::<u64>(), 5);
                assert_eq!(h.counts[299], 1);
            }
            x => panic!("unexpected summary {:?}", x),
        }
    }

    #[test]
    fn unknown_question() {
        let args = test_args(&["--question", "town"]);
        match run_report(&args) {
            Err(PlotError::Survey { source }) => {
                assert_eq!(source.kind(), ErrorKind::Configuration)
            }
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn missing_question() {
        let args = test_args(&[]);
        assert!(matches!(run_report(&args), Err(PlotError::Whatever { .. })));
    }

    #[test]
    fn without_config() {
        use clap::Parser;
        let test_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data");
        let args = Args::parse_from([
            "seedplot".to_string(),
            "--structure".to_string(),
            format!("{}/survey.lss", test_dir),
            "--responses".to_string(),
            format!("{}/responses.csv", test_dir),
            "--question".to_string(),
            "city".to_string(),
        ]);
        match run_report(&args) {
            Ok(Summary::Convergence(report)) => {
                // Default seeds and inferred kind.
                assert_eq!(report.kind, QuestionKind::Radio);
                assert_eq!(report.panels.len(), 1);
                assert_eq!(report.panels[0].respondents, 6);
            }
            x => panic!("unexpected result {:?}", x),
        }

        let args = Args::parse_from(["seedplot", "--question", "city"]);
        assert!(run_report(&args).is_err());
    }
}

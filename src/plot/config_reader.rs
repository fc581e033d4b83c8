use crate::plot::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "surveyName")]
    pub survey_name: String,
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseSource {
    /// csv or xlsx. Guessed from the file extension when missing.
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlotRules {
    pub grouping: Option<String>,
    #[serde(rename = "refColumn")]
    pub ref_column: Option<String>,
    #[serde(rename = "uniqueColumn")]
    pub unique_column: Option<String>,
    #[serde(rename = "uniqueLength")]
    pub unique_length: Option<JSValue>,
    #[serde(rename = "otherMarker")]
    pub other_marker: Option<String>,
    #[serde(rename = "elapsedSuffix")]
    pub elapsed_suffix: Option<String>,
    #[serde(rename = "bucketWidth")]
    pub bucket_width: Option<JSValue>,
    #[serde(rename = "bucketFloor")]
    pub bucket_floor: Option<JSValue>,
    #[serde(rename = "bucketCeiling")]
    pub bucket_ceiling: Option<JSValue>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingRules {
    #[serde(rename = "submitColumn")]
    pub submit_column: Option<String>,
    #[serde(rename = "timestampFormat")]
    pub timestamp_format: Option<String>,
    #[serde(rename = "binSeconds")]
    pub bin_seconds: Option<JSValue>,
    #[serde(rename = "interviewColumn")]
    pub interview_column: Option<String>,
    #[serde(rename = "interviewBins")]
    pub interview_bins: Option<JSValue>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlotConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "structureFile")]
    pub structure_file: String,
    #[serde(rename = "responseSource")]
    pub response_source: ResponseSource,
    pub language: Option<String>,
    #[serde(rename = "mainSeeds")]
    pub main_seeds: Option<Vec<String>>,
    pub rules: Option<PlotRules>,
    /// Question name to kind: radio, checkbox, numeric or array.
    pub questions: Option<BTreeMap<String, String>>,
    pub timing: Option<TimingRules>,
}

pub fn read_summary(path: &str) -> PlotResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

// Numbers may be written as JSON numbers or as strings.
fn read_js_int(x: &Option<JSValue>, field: &str) -> PlotResult<Option<i64>> {
    match x {
        None => Ok(None),
        Some(JSValue::Number(n)) => n.as_i64().map(Some).context(ParsingJsonNumberSnafu {
            field,
            value: n.to_string(),
        }),
        Some(JSValue::String(s)) => s.trim().parse::<i64>().ok().map(Some).context(
            ParsingJsonNumberSnafu {
                field,
                value: s.as_str(),
            },
        ),
        Some(x) => ParsingJsonNumberSnafu {
            field,
            value: x.to_string(),
        }
        .fail(),
    }
}

fn read_js_count(x: &Option<JSValue>, field: &str) -> PlotResult<Option<usize>> {
    match read_js_int(x, field)? {
        Some(n) if n < 0 => whatever!("{} must not be negative, got {}", field, n),
        Some(n) => Ok(Some(n as usize)),
        None => Ok(None),
    }
}

fn validate_grouping(grouping: &str) -> PlotResult<GroupingPolicy> {
    match grouping {
        "incremental" => Ok(GroupingPolicy::Incremental),
        "connected" => Ok(GroupingPolicy::Connected),
        x => whatever!(
            "Unknown grouping policy {:?}: expected incremental or connected",
            x
        ),
    }
}

fn validate_rules(rules: &PlotRules, settings: &mut SurveySettings) -> PlotResult<()> {
    if let Some(g) = &rules.grouping {
        settings.grouping = validate_grouping(g)?;
    }
    let columns = &mut settings.columns;
    if let Some(x) = &rules.ref_column {
        columns.ref_column = x.clone();
    }
    if let Some(x) = &rules.unique_column {
        columns.unique_column = x.clone();
    }
    if let Some(x) = read_js_count(&rules.unique_length, "uniqueLength")? {
        columns.unique_length = x;
    }
    if let Some(x) = &rules.other_marker {
        columns.other_marker = x.clone();
    }
    if let Some(x) = &rules.elapsed_suffix {
        columns.elapsed_suffix = x.clone();
    }

    let buckets = &mut settings.buckets;
    if let Some(x) = read_js_int(&rules.bucket_width, "bucketWidth")? {
        buckets.width = x;
    }
    if let Some(x) = read_js_int(&rules.bucket_floor, "bucketFloor")? {
        buckets.floor = x;
    }
    if let Some(x) = read_js_int(&rules.bucket_ceiling, "bucketCeiling")? {
        buckets.ceiling = x;
    }
    buckets.validate().context(SurveySnafu {})
}

fn validate_timing(timing: &TimingRules, settings: &mut TimingSettings) -> PlotResult<()> {
    if let Some(x) = &timing.submit_column {
        settings.submit_column = x.clone();
    }
    if let Some(x) = &timing.timestamp_format {
        settings.timestamp_format = x.clone();
    }
    if let Some(x) = read_js_int(&timing.bin_seconds, "binSeconds")? {
        ensure_whatever!(x > 0, "binSeconds must be positive, got {}", x);
        settings.bin_seconds = x;
    }
    if let Some(x) = &timing.interview_column {
        settings.interview_column = x.clone();
    }
    if let Some(x) = read_js_count(&timing.interview_bins, "interviewBins")? {
        ensure_whatever!(x > 0, "interviewBins must be positive");
        settings.interview_bins = x;
    }
    Ok(())
}

/// Turns the configuration file into the settings of the analysis.
/// Everything not present in the file keeps its default value.
pub fn validate_settings(config: &PlotConfig) -> PlotResult<SurveySettings> {
    let mut settings = SurveySettings::default();
    if let Some(language) = &config.language {
        settings.language = language.clone();
    }
    if let Some(seeds) = &config.main_seeds {
        ensure_whatever!(!seeds.is_empty(), "mainSeeds must contain at least one seed");
        settings.main_seeds = seeds.clone();
    }
    if let Some(rules) = &config.rules {
        validate_rules(rules, &mut settings)?;
    }
    if let Some(questions) = &config.questions {
        for (qname, kind) in questions.iter() {
            let k = match QuestionKind::parse(kind) {
                Some(k) => k,
                None => whatever!(
                    "Unknown kind {:?} for question {:?}: expected radio, checkbox, numeric or array",
                    kind,
                    qname
                ),
            };
            settings.question_kinds.insert(qname.clone(), k);
        }
    }
    if let Some(timing) = &config.timing {
        validate_timing(timing, &mut settings.timing)?;
    }
    Ok(settings)
}

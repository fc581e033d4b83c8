// ********* Errors ***********

use std::collections::BTreeMap;

use snafu::Snafu;

/// Everything that can prevent an analysis from completing.
///
/// Use [`SurveyError::kind`] to tell a bad configuration apart from a bad
/// input row or a failed lookup.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SurveyError {
    #[snafu(display("unknown question name {qname:?}"))]
    UnknownQuestion { qname: String },

    #[snafu(display("no sub-question {title:?} under question id {qid}"))]
    UnknownSubquestion { qid: String, title: String },

    #[snafu(display("question id {qid} has no answer catalog"))]
    MissingAnswers { qid: String },

    #[snafu(display("question id {qid} has no answer with code {code:?}"))]
    UnknownAnswer { qid: String, code: String },

    #[snafu(display("cannot decode flag {value:?}, expected Y or N"))]
    InvalidFlag { value: String },

    #[snafu(display("the response table has no header row"))]
    MissingHeader {},

    #[snafu(display("row {lineno} has {found} cells but the header has {expected}"))]
    RaggedRow {
        lineno: usize,
        expected: usize,
        found: usize,
    },

    #[snafu(display("row {lineno}: unexpected answer {value:?} in column {column:?}"))]
    UnexpectedAnswer {
        lineno: usize,
        column: String,
        value: String,
    },

    #[snafu(display("row {lineno}: cannot read a number from {value:?} in column {column:?}"))]
    MalformedNumber {
        lineno: usize,
        column: String,
        value: String,
    },

    #[snafu(display("row {lineno}: cannot read timestamp {value:?}"))]
    MalformedTimestamp {
        lineno: usize,
        value: String,
        source: chrono::ParseError,
    },

    #[snafu(display("unknown question {qname:?}: not configured and not in the survey structure"))]
    UnconfiguredQuestion { qname: String },

    #[snafu(display("missing column {column:?} in the response table"))]
    MissingColumn { column: String },

    #[snafu(display("question {qname:?} has type code {code:?}, which has no aggregation"))]
    UnsupportedQuestionType { qname: String, code: String },

    #[snafu(display("invalid bucket parameters: {message}"))]
    InvalidBuckets { message: String },

    #[snafu(display("no response column selected for question {qname:?}"))]
    EmptySelection { qname: String },
}

pub type SurveyResult<T> = Result<T, SurveyError>;

/// The coarse classes of [`SurveyError`].
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ErrorKind {
    /// A question, sub-question or answer is missing from the catalog.
    Lookup,
    /// A Y/N flag in the survey structure could not be decoded.
    Decode,
    /// A response row does not fit the survey structure.
    MalformedRow,
    /// The settings or the requested question do not fit the survey.
    Configuration,
    /// The selection for a seed or question came out empty.
    NoData,
}

impl SurveyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SurveyError::UnknownQuestion { .. }
            | SurveyError::UnknownSubquestion { .. }
            | SurveyError::MissingAnswers { .. }
            | SurveyError::UnknownAnswer { .. } => ErrorKind::Lookup,
            SurveyError::InvalidFlag { .. } => ErrorKind::Decode,
            SurveyError::RaggedRow { .. }
            | SurveyError::UnexpectedAnswer { .. }
            | SurveyError::MalformedNumber { .. }
            | SurveyError::MalformedTimestamp { .. } => ErrorKind::MalformedRow,
            SurveyError::MissingHeader {}
            | SurveyError::UnconfiguredQuestion { .. }
            | SurveyError::MissingColumn { .. }
            | SurveyError::UnsupportedQuestionType { .. }
            | SurveyError::InvalidBuckets { .. } => ErrorKind::Configuration,
            SurveyError::EmptySelection { .. } => ErrorKind::NoData,
        }
    }
}

// ******** Output data structures *********

/// A code from an answer domain, with the text shown to the reader.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct AnswerChoice {
    pub code: String,
    pub label: String,
}

/// One cumulative-frequency trajectory.
///
/// `values[i]` is the share (in percent) of this answer among the first
/// `i + 1` responses that were tallied.
#[derive(PartialEq, Debug, Clone)]
pub struct LabeledSeries {
    pub code: String,
    pub label: String,
    pub values: Vec<f64>,
}

/// The percentage breakdown of one column of an array question.
/// `percentages` is aligned with the answers of the enclosing breakdown.
#[derive(PartialEq, Debug, Clone)]
pub struct AnswerShares {
    pub code: String,
    pub label: String,
    pub percentages: Vec<f64>,
}

#[derive(PartialEq, Debug, Clone)]
pub enum Convergence {
    /// Radio, checkbox and numeric questions.
    Trajectories(Vec<LabeledSeries>),
    /// Array questions: a single snapshot per sub-question.
    Breakdown {
        answers: Vec<AnswerChoice>,
        rows: Vec<AnswerShares>,
    },
}

/// The result for one seed group.
#[derive(PartialEq, Debug, Clone)]
pub struct SeedPanel {
    pub seed: String,
    /// Number of response rows attributed to this seed.
    pub respondents: usize,
    pub convergence: Convergence,
}

#[derive(PartialEq, Debug, Clone)]
pub struct QuestionReport {
    pub qname: String,
    pub text: String,
    pub kind: QuestionKind,
    pub panels: Vec<SeedPanel>,
}

// ********* Configuration **********

/// The value of `main_seeds` that stands for every respondent not reachable
/// from one of the other main seeds.
pub const ALL_OTHER_SEEDS: &str = "*";

/// How response rows are partitioned into referral chains.
///
/// - Incremental makes a single pass over the rows and never merges two
///   groups once both exist. Two chains that only meet later in the table
///   stay apart.
///
/// - Connected computes the connected components of the referral graph.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum GroupingPolicy {
    Incremental,
    Connected,
}

/// The aggregation applied to a question.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum QuestionKind {
    Radio,
    Checkbox,
    Numeric,
    Array,
}

impl QuestionKind {
    pub fn name(&self) -> &'static str {
        match self {
            QuestionKind::Radio => "radio",
            QuestionKind::Checkbox => "checkbox",
            QuestionKind::Numeric => "numeric",
            QuestionKind::Array => "array",
        }
    }

    pub fn parse(name: &str) -> Option<QuestionKind> {
        match name {
            "radio" => Some(QuestionKind::Radio),
            "checkbox" => Some(QuestionKind::Checkbox),
            "numeric" => Some(QuestionKind::Numeric),
            "array" => Some(QuestionKind::Array),
            _ => None,
        }
    }
}

/// Names and shapes of the special columns of a response export.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnConventions {
    /// Identifier of the respondent who referred this one.
    pub ref_column: String,
    /// Identifier of this respondent.
    pub unique_column: String,
    /// Rows whose identifier does not have this many characters are
    /// incomplete and never start or join a group.
    pub unique_length: usize,
    /// Substring marking the write-in column of a question.
    pub other_marker: String,
    /// Suffix of the per-question elapsed-time columns.
    pub elapsed_suffix: String,
}

impl Default for ColumnConventions {
    fn default() -> Self {
        ColumnConventions {
            ref_column: "ref".to_string(),
            unique_column: "unique".to_string(),
            unique_length: 4,
            other_marker: "其它".to_string(),
            elapsed_suffix: "Time".to_string(),
        }
    }
}

/// Buckets for numeric answers. Both `floor` and `ceiling` are inclusive.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct BucketSpec {
    pub width: i64,
    pub floor: i64,
    pub ceiling: i64,
}

impl BucketSpec {
    pub const DEFAULT: BucketSpec = BucketSpec {
        width: 5,
        floor: 10,
        ceiling: 69,
    };

    pub fn validate(&self) -> SurveyResult<()> {
        if self.width <= 0 {
            return InvalidBucketsSnafu {
                message: format!("width must be positive, got {}", self.width),
            }
            .fail();
        }
        if self.floor > self.ceiling {
            return InvalidBucketsSnafu {
                message: format!(
                    "floor {} is above ceiling {}",
                    self.floor, self.ceiling
                ),
            }
            .fail();
        }
        Ok(())
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TimingSettings {
    /// Column holding the submission timestamp.
    pub submit_column: String,
    /// chrono format of the submission timestamp.
    pub timestamp_format: String,
    pub bin_seconds: i64,
    /// Column holding the total interview time, in seconds.
    pub interview_column: String,
    pub interview_bins: usize,
}

impl Default for TimingSettings {
    fn default() -> Self {
        TimingSettings {
            submit_column: "submitdate".to_string(),
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
            bin_seconds: 1800,
            interview_column: "interviewtime".to_string(),
            interview_bins: 300,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SurveySettings {
    /// Only structure rows in this language are kept.
    pub language: String,
    /// The seeds analysed separately. May contain [`ALL_OTHER_SEEDS`].
    pub main_seeds: Vec<String>,
    pub grouping: GroupingPolicy,
    pub columns: ColumnConventions,
    pub buckets: BucketSpec,
    /// Fixed mapping from question name to aggregation. Questions not listed
    /// here fall back to their type code in the survey structure.
    pub question_kinds: BTreeMap<String, QuestionKind>,
    pub timing: TimingSettings,
}

impl Default for SurveySettings {
    fn default() -> Self {
        SurveySettings {
            language: "en".to_string(),
            main_seeds: vec![ALL_OTHER_SEEDS.to_string()],
            grouping: GroupingPolicy::Incremental,
            columns: ColumnConventions::default(),
            buckets: BucketSpec::DEFAULT,
            question_kinds: BTreeMap::new(),
            timing: TimingSettings::default(),
        }
    }
}

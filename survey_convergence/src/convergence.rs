use log::debug;

use snafu::OptionExt;

use crate::catalog::*;
use crate::config::*;
use crate::table::*;

/// A response column that stands for one sub-question.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct SubquestionColumn {
    /// The label of the column in the response table.
    pub column: String,
    /// The sub-question title, used as the series code.
    pub title: String,
    pub label: String,
}

/// How the rows of one question are reduced, with everything the reduction
/// needs resolved from the catalog up front.
///
/// A plan is built once per question with [`Aggregation::plan`] and then
/// applied to the rows of each seed.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Aggregation {
    /// One answer per row, out of a fixed domain.
    Radio {
        column: String,
        domain: Vec<AnswerChoice>,
    },
    /// One 0/1 indicator column per option.
    Checkbox { columns: Vec<SubquestionColumn> },
    /// A single numeric column, tallied into buckets.
    Numeric { column: String, buckets: BucketSpec },
    /// One column per sub-question, all sharing the same answers.
    Array {
        answers: Vec<AnswerChoice>,
        columns: Vec<SubquestionColumn>,
    },
}

impl Aggregation {
    /// Resolves the plan for `question`, given the columns selected for it.
    pub fn plan(
        kind: QuestionKind,
        question: &Question,
        columns: &[String],
        catalog: &StructureCatalog,
        buckets: &BucketSpec,
    ) -> SurveyResult<Aggregation> {
        let first = columns.first().context(EmptySelectionSnafu {
            qname: question.qname.as_str(),
        })?;
        let res = match kind {
            QuestionKind::Radio => Aggregation::Radio {
                column: first.clone(),
                domain: radio_domain(question, catalog)?,
            },
            QuestionKind::Checkbox => Aggregation::Checkbox {
                columns: subquestion_columns(columns, catalog)?,
            },
            QuestionKind::Numeric => {
                buckets.validate()?;
                Aggregation::Numeric {
                    column: first.clone(),
                    buckets: *buckets,
                }
            }
            QuestionKind::Array => Aggregation::Array {
                answers: answer_choices(&question.qid, catalog)?,
                columns: subquestion_columns(columns, catalog)?,
            },
        };
        debug!("plan: {:?}: {:?}", question.qname, res);
        Ok(res)
    }

    pub fn kind(&self) -> QuestionKind {
        match self {
            Aggregation::Radio { .. } => QuestionKind::Radio,
            Aggregation::Checkbox { .. } => QuestionKind::Checkbox,
            Aggregation::Numeric { .. } => QuestionKind::Numeric,
            Aggregation::Array { .. } => QuestionKind::Array,
        }
    }

    /// Reduces the rows of `table`, in order.
    pub fn apply(&self, table: &ResponseTable) -> SurveyResult<Convergence> {
        match self {
            Aggregation::Radio { column, domain } => {
                radio_convergence(column, domain, table).map(Convergence::Trajectories)
            }
            Aggregation::Checkbox { columns } => {
                checkbox_convergence(columns, table).map(Convergence::Trajectories)
            }
            Aggregation::Numeric { column, buckets } => {
                numeric_convergence(column, buckets, table).map(Convergence::Trajectories)
            }
            Aggregation::Array { answers, columns } => {
                let rows = array_breakdown(answers, columns, table)?;
                Ok(Convergence::Breakdown {
                    answers: answers.clone(),
                    rows,
                })
            }
        }
    }
}

/// Share of `count` in `total`, in percent. Zero when nothing was tallied.
pub fn share(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * (count as f64) / (total as f64)
    }
}

// Appends the current share of every tally to its trajectory.
fn push_shares(tally: &[u64], lines: &mut [Vec<f64>]) {
    let total: u64 = tally.iter().sum();
    for (count, line) in tally.iter().zip(lines.iter_mut()) {
        line.push(share(*count, total));
    }
}

fn to_series(choices: &[AnswerChoice], lines: Vec<Vec<f64>>) -> Vec<LabeledSeries> {
    choices
        .iter()
        .zip(lines)
        .map(|(c, values)| LabeledSeries {
            code: c.code.clone(),
            label: c.label.clone(),
            values,
        })
        .collect()
}

fn fallback_label(question: &Question, code: &str) -> String {
    match (&question.question_type, code) {
        (QuestionType::Gender, "M") => "Male".to_string(),
        (QuestionType::Gender, "F") => "Female".to_string(),
        _ => "No answer".to_string(),
    }
}

// The sorted answer codes (M and F for the gender question), followed by the
// blank answer when the question may be skipped or written in.
fn radio_domain(question: &Question, catalog: &StructureCatalog) -> SurveyResult<Vec<AnswerChoice>> {
    let mut codes: Vec<String> = if question.question_type == QuestionType::Gender {
        vec!["M".to_string(), "F".to_string()]
    } else {
        catalog
            .answer_codes(&question.qid)?
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    };
    if !question.mandatory || question.other {
        codes.push(String::new());
    }
    Ok(codes
        .into_iter()
        .map(|code| {
            let label = match catalog.answer_text(&question.qid, &code) {
                Ok(text) => text.to_string(),
                Err(_) => fallback_label(question, &code),
            };
            AnswerChoice { code, label }
        })
        .collect())
}

fn answer_choices(qid: &str, catalog: &StructureCatalog) -> SurveyResult<Vec<AnswerChoice>> {
    catalog
        .answer_codes(qid)?
        .into_iter()
        .map(|code| {
            Ok(AnswerChoice {
                code: code.to_string(),
                label: catalog.answer_text(qid, code)?.to_string(),
            })
        })
        .collect()
}

fn subquestion_columns(
    columns: &[String],
    catalog: &StructureCatalog,
) -> SurveyResult<Vec<SubquestionColumn>> {
    columns
        .iter()
        .map(|column| {
            let (qname, subtitle) = parse_column_label(column);
            let title = subtitle.unwrap_or(column.as_str());
            let question = catalog.question(qname)?;
            Ok(SubquestionColumn {
                column: column.clone(),
                title: title.to_string(),
                label: catalog.subquestion_text(&question.qid, title)?.to_string(),
            })
        })
        .collect()
}

fn radio_convergence(
    column: &str,
    domain: &[AnswerChoice],
    table: &ResponseTable,
) -> SurveyResult<Vec<LabeledSeries>> {
    let idx = table.column_index(column)?;
    let mut tally: Vec<u64> = vec![0; domain.len()];
    let mut lines: Vec<Vec<f64>> = vec![Vec::with_capacity(table.len()); domain.len()];
    for (lineno, row) in table.rows().iter().enumerate() {
        let value = row[idx].as_str();
        let pos = domain
            .iter()
            .position(|a| a.code == value)
            .context(UnexpectedAnswerSnafu {
                lineno: lineno + 1,
                column,
                value,
            })?;
        tally[pos] += 1;
        push_shares(&tally, &mut lines);
    }
    Ok(to_series(domain, lines))
}

// Blank or unreadable indicators count as unchecked.
fn read_indicator(cell: &str) -> u64 {
    cell.trim().parse::<u64>().unwrap_or(0)
}

fn checkbox_convergence(
    columns: &[SubquestionColumn],
    table: &ResponseTable,
) -> SurveyResult<Vec<LabeledSeries>> {
    let idxs: Vec<usize> = columns
        .iter()
        .map(|c| table.column_index(&c.column))
        .collect::<SurveyResult<_>>()?;
    let mut tally: Vec<u64> = vec![0; columns.len()];
    let mut lines: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
    for (lineno, row) in table.rows().iter().enumerate() {
        let indicators: Vec<u64> = idxs.iter().map(|&i| read_indicator(&row[i])).collect();
        if indicators.iter().all(|&x| x == 0) {
            debug!("checkbox_convergence: row {}: nothing checked", lineno + 1);
            continue;
        }
        for (t, x) in tally.iter_mut().zip(indicators) {
            *t += x;
        }
        push_shares(&tally, &mut lines);
    }
    let choices: Vec<AnswerChoice> = columns
        .iter()
        .map(|c| AnswerChoice {
            code: c.title.clone(),
            label: c.label.clone(),
        })
        .collect();
    Ok(to_series(&choices, lines))
}

fn bucket_choices(buckets: &BucketSpec, count: usize) -> Vec<AnswerChoice> {
    (0..count as i64)
        .map(|i| {
            let low = buckets.floor + i * buckets.width;
            AnswerChoice {
                code: low.to_string(),
                label: format!("{} to {}", low, low + buckets.width - 1),
            }
        })
        .collect()
}

fn numeric_convergence(
    column: &str,
    buckets: &BucketSpec,
    table: &ResponseTable,
) -> SurveyResult<Vec<LabeledSeries>> {
    let idx = table.column_index(column)?;
    // Fractional answers are truncated.
    let values: Vec<Option<i64>> = table
        .rows()
        .iter()
        .enumerate()
        .map(|(lineno, row)| {
            parse_number(&row[idx], lineno + 1, column).map(|x| x.map(|f| f.trunc() as i64))
        })
        .collect::<SurveyResult<_>>()?;

    // The buckets stop at the largest answer seen, or at the ceiling.
    let top = match values.iter().flatten().max() {
        Some(m) if *m >= buckets.floor => (*m).min(buckets.ceiling),
        _ => return Ok(Vec::new()),
    };
    let count = ((top - buckets.floor) / buckets.width + 1) as usize;

    let mut tally: Vec<u64> = vec![0; count];
    let mut lines: Vec<Vec<f64>> = vec![Vec::new(); count];
    for v in values.iter().flatten() {
        if *v < buckets.floor || *v > buckets.ceiling {
            continue;
        }
        let bucket = ((*v - buckets.floor) / buckets.width) as usize;
        tally[bucket] += 1;
        push_shares(&tally, &mut lines);
    }
    Ok(to_series(&bucket_choices(buckets, count), lines))
}

fn array_breakdown(
    answers: &[AnswerChoice],
    columns: &[SubquestionColumn],
    table: &ResponseTable,
) -> SurveyResult<Vec<AnswerShares>> {
    let idxs: Vec<usize> = columns
        .iter()
        .map(|c| table.column_index(&c.column))
        .collect::<SurveyResult<_>>()?;
    let mut tally: Vec<Vec<u64>> = vec![vec![0; answers.len()]; columns.len()];
    for (lineno, row) in table.rows().iter().enumerate() {
        if idxs.iter().all(|&i| row[i].trim().is_empty()) {
            continue;
        }
        for (col, &i) in idxs.iter().enumerate() {
            let value = row[i].trim();
            if value.is_empty() {
                continue;
            }
            let pos = answers
                .iter()
                .position(|a| a.code == value)
                .context(UnexpectedAnswerSnafu {
                    lineno: lineno + 1,
                    column: columns[col].column.as_str(),
                    value,
                })?;
            tally[col][pos] += 1;
        }
    }
    Ok(columns
        .iter()
        .zip(tally)
        .map(|(c, counts)| {
            let total: u64 = counts.iter().sum();
            AnswerShares {
                code: c.title.clone(),
                label: c.label.clone(),
                percentages: counts.iter().map(|x| share(*x, total)).collect(),
            }
        })
        .collect())
}

/*!

Convergence tallies for survey responses collected by snowball sampling.

Respondents are recruited through referral chains: each response row carries
the identifier of the respondent who referred it (`ref`) and its own
identifier (`unique`). This crate groups the rows into chains starting at a
few seeds, and computes for every seed how the answer shares to a question
evolve as more responses come in.

The entry point is [`analyze_question`]. The survey structure is loaded into
a [`catalog::StructureCatalog`] with a [`builder::CatalogBuilder`], and the
responses into a [`table::ResponseTable`].

See the [quick_start] for a walkthrough and the [manual] for the meaning of
the settings.

*/

mod config;
use log::{debug, info};

use snafu::{ensure, OptionExt};

pub mod builder;
pub mod catalog;
pub mod convergence;
pub mod filter;
pub mod grouping;
pub mod manual;
pub mod quick_start;
pub mod table;
pub mod timing;

pub use crate::config::*;

use crate::catalog::StructureCatalog;
use crate::convergence::Aggregation;
use crate::filter::select_columns;
use crate::grouping::SeedGrouper;
use crate::table::ResponseTable;

/// The aggregation used for a question.
///
/// The fixed mapping of the settings comes first. Otherwise the kind follows
/// the question type of the survey structure.
pub fn resolve_kind(
    qname: &str,
    catalog: &StructureCatalog,
    settings: &SurveySettings,
) -> SurveyResult<QuestionKind> {
    if let Some(kind) = settings.question_kinds.get(qname) {
        return Ok(*kind);
    }
    ensure!(
        catalog.contains_question(qname),
        UnconfiguredQuestionSnafu { qname }
    );
    let question = catalog.question(qname)?;
    question
        .question_type
        .default_kind()
        .context(UnsupportedQuestionTypeSnafu {
            qname,
            code: question.type_code.as_str(),
        })
}

/// Computes the convergence of one question, for every main seed.
///
/// Arguments:
/// * `catalog` the survey structure, in the configured language
/// * `table` all the response rows, with the `ref` and `unique` columns
/// * `settings` the seeds and the column conventions
/// * `qname` the question name, as found in the column labels
///
/// The panels come in the order of `settings.main_seeds`.
pub fn analyze_question(
    catalog: &StructureCatalog,
    table: &ResponseTable,
    settings: &SurveySettings,
    qname: &str,
) -> SurveyResult<QuestionReport> {
    let kind = resolve_kind(qname, catalog, settings)?;
    let question = catalog.question(qname)?;
    info!(
        "analyze_question: {:?} (qid {}) as {} over {} rows",
        qname,
        question.qid,
        kind.name(),
        table.len()
    );

    let selected = select_columns(qname, table, false, &settings.columns);
    ensure!(
        !selected.header().is_empty(),
        EmptySelectionSnafu { qname }
    );
    let plan = Aggregation::plan(
        kind,
        question,
        selected.header(),
        catalog,
        &settings.buckets,
    )?;

    let grouper = SeedGrouper::new(table, settings)?;
    let mut panels: Vec<SeedPanel> = Vec::with_capacity(settings.main_seeds.len());
    for seed in settings.main_seeds.iter() {
        let rows = grouper.rows_for_seed(seed);
        let columns = select_columns(qname, &rows, false, &settings.columns);
        let convergence = plan.apply(&columns)?;
        debug!(
            "analyze_question: seed {:?}: {} rows",
            seed,
            columns.len()
        );
        panels.push(SeedPanel {
            seed: seed.clone(),
            respondents: columns.len(),
            convergence,
        });
    }
    Ok(QuestionReport {
        qname: qname.to_string(),
        text: question.text.clone(),
        kind,
        panels,
    })
}

use log::{debug, warn};

use std::collections::BTreeMap;

use crate::catalog::*;
use crate::config::*;

/// A question row of the survey structure, before decoding.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuestionRow {
    pub qid: String,
    pub title: String,
    pub text: String,
    pub type_code: String,
    pub mandatory: String,
    pub other: String,
    pub language: String,
}

impl QuestionRow {
    pub fn new(
        qid: &str,
        title: &str,
        text: &str,
        type_code: &str,
        mandatory: &str,
        other: &str,
        language: &str,
    ) -> QuestionRow {
        QuestionRow {
            qid: qid.to_string(),
            title: title.to_string(),
            text: text.to_string(),
            type_code: type_code.to_string(),
            mandatory: mandatory.to_string(),
            other: other.to_string(),
            language: language.to_string(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SubquestionRow {
    pub parent_qid: String,
    pub title: String,
    pub text: String,
    /// Exports do not always carry this flag. Missing means not mandatory.
    pub mandatory: Option<String>,
    pub language: String,
}

impl SubquestionRow {
    pub fn new(parent_qid: &str, title: &str, text: &str, language: &str) -> SubquestionRow {
        SubquestionRow {
            parent_qid: parent_qid.to_string(),
            title: title.to_string(),
            text: text.to_string(),
            mandatory: None,
            language: language.to_string(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AnswerRow {
    pub qid: String,
    pub code: String,
    pub text: String,
    pub language: String,
}

impl AnswerRow {
    pub fn new(qid: &str, code: &str, text: &str, language: &str) -> AnswerRow {
        AnswerRow {
            qid: qid.to_string(),
            code: code.to_string(),
            text: text.to_string(),
            language: language.to_string(),
        }
    }
}

/// Collects structure rows into a [`StructureCatalog`].
///
/// Rows in another language than the one of the builder are dropped.
///
/// ```
/// use survey_convergence::builder::*;
/// # use survey_convergence::SurveyError;
///
/// let mut builder = CatalogBuilder::new("en");
/// builder.add_question(QuestionRow::new("10", "city", "Which city?", "L", "Y", "N", "en"))?;
/// builder.add_answer(AnswerRow::new("10", "A1", "North", "en"));
/// builder.add_answer(AnswerRow::new("10", "A1", "北方", "zh-Hans"));
///
/// let catalog = builder.build();
/// assert_eq!(catalog.answer_text("10", "A1")?, "North");
///
/// # Ok::<(), SurveyError>(())
/// ```
pub struct CatalogBuilder {
    pub(crate) language: String,
    pub(crate) catalog: StructureCatalog,
}

impl CatalogBuilder {
    pub fn new(language: &str) -> CatalogBuilder {
        CatalogBuilder {
            language: language.to_string(),
            catalog: StructureCatalog::default(),
        }
    }

    fn keeps(&self, language: &str) -> bool {
        language == self.language
    }

    /// Adds a question. Fails if one of its flags is not `Y` or `N`.
    pub fn add_question(&mut self, row: QuestionRow) -> SurveyResult<()> {
        if !self.keeps(&row.language) {
            return Ok(());
        }
        let q = Question {
            qid: row.qid,
            qname: row.title.clone(),
            text: row.text,
            question_type: QuestionType::from_code(&row.type_code),
            type_code: row.type_code,
            mandatory: decode_flag(&row.mandatory)?,
            other: decode_flag(&row.other)?,
        };
        debug!("add_question: {:?}", q);
        if let Some(previous) = self.catalog.questions.insert(row.title, q) {
            warn!(
                "add_question: question name {:?} defined twice, keeping the last one",
                previous.qname
            );
        }
        Ok(())
    }

    pub fn add_subquestion_checked(&mut self, row: SubquestionRow) -> SurveyResult<()> {
        if !self.keeps(&row.language) {
            return Ok(());
        }
        let mandatory = match row.mandatory.as_deref() {
            Some(flag) => decode_flag(flag)?,
            None => false,
        };
        self.insert_subquestion(row, mandatory);
        Ok(())
    }

    /// Adds a sub-question without a mandatory flag.
    pub fn add_subquestion(&mut self, row: SubquestionRow) {
        if self.keeps(&row.language) {
            self.insert_subquestion(row, false);
        }
    }

    fn insert_subquestion(&mut self, row: SubquestionRow, mandatory: bool) {
        let sq = Subquestion {
            parent_qid: row.parent_qid.clone(),
            title: row.title.clone(),
            text: row.text,
            mandatory,
        };
        self.catalog
            .subquestions
            .insert((row.parent_qid, row.title), sq);
    }

    pub fn add_answer(&mut self, row: AnswerRow) {
        if !self.keeps(&row.language) {
            return;
        }
        self.catalog
            .answers
            .entry(row.qid)
            .or_insert_with(BTreeMap::new)
            .insert(row.code, row.text);
    }

    pub fn build(self) -> StructureCatalog {
        debug!(
            "build: {} questions, {} sub-questions, {} answer catalogs",
            self.catalog.questions.len(),
            self.catalog.subquestions.len(),
            self.catalog.answers.len()
        );
        self.catalog
    }
}

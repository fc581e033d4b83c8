use std::collections::{BTreeMap, HashMap};

use snafu::OptionExt;

use crate::config::*;

/// The closed set of question types the analysis distinguishes.
///
/// The survey tool knows many more types; everything else is kept as
/// `Other` with its raw code.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum QuestionType {
    /// List (radio), list (dropdown), list with comment.
    SingleChoice,
    /// The dedicated gender question, with the fixed codes `M` and `F`.
    Gender,
    /// Multiple choice, with or without comments.
    MultiSelect,
    Numeric,
    /// Array questions: one sub-question per row, a shared answer scale.
    Array,
    Other(String),
}

impl QuestionType {
    pub fn from_code(code: &str) -> QuestionType {
        match code {
            "L" | "!" | "O" => QuestionType::SingleChoice,
            "G" => QuestionType::Gender,
            "M" | "P" => QuestionType::MultiSelect,
            "N" => QuestionType::Numeric,
            "F" | "A" | "B" | "C" | "E" | "H" => QuestionType::Array,
            x => QuestionType::Other(x.to_string()),
        }
    }

    /// The aggregation that fits this type, if any.
    pub fn default_kind(&self) -> Option<QuestionKind> {
        match self {
            QuestionType::SingleChoice | QuestionType::Gender => Some(QuestionKind::Radio),
            QuestionType::MultiSelect => Some(QuestionKind::Checkbox),
            QuestionType::Numeric => Some(QuestionKind::Numeric),
            QuestionType::Array => Some(QuestionKind::Array),
            QuestionType::Other(_) => None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Question {
    pub qid: String,
    /// The question name, as used in the response column labels.
    pub qname: String,
    pub text: String,
    pub question_type: QuestionType,
    /// The raw type code from the survey structure.
    pub type_code: String,
    pub mandatory: bool,
    /// The question accepts a write-in answer.
    pub other: bool,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Subquestion {
    pub parent_qid: String,
    pub title: String,
    pub text: String,
    pub mandatory: bool,
}

/// Decodes the `Y`/`N` flags of the survey structure.
pub fn decode_flag(value: &str) -> SurveyResult<bool> {
    match value {
        "Y" => Ok(true),
        "N" => Ok(false),
        x => InvalidFlagSnafu { value: x }.fail(),
    }
}

/// Read-only lookups over the questions, sub-questions and answers of one
/// survey in one language. Built with [`crate::builder::CatalogBuilder`].
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct StructureCatalog {
    pub(crate) questions: HashMap<String, Question>,
    pub(crate) subquestions: HashMap<(String, String), Subquestion>,
    // Sorted by answer code.
    pub(crate) answers: HashMap<String, BTreeMap<String, String>>,
}

impl StructureCatalog {
    pub fn question(&self, qname: &str) -> SurveyResult<&Question> {
        self.questions
            .get(qname)
            .context(UnknownQuestionSnafu { qname })
    }

    pub fn contains_question(&self, qname: &str) -> bool {
        self.questions.contains_key(qname)
    }

    /// All the question names, sorted.
    pub fn question_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.questions.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn subquestion(&self, qid: &str, title: &str) -> SurveyResult<&Subquestion> {
        self.subquestions
            .get(&(qid.to_string(), title.to_string()))
            .context(UnknownSubquestionSnafu { qid, title })
    }

    pub fn subquestion_text(&self, qid: &str, title: &str) -> SurveyResult<&str> {
        self.subquestion(qid, title).map(|sq| sq.text.as_str())
    }

    pub fn subquestion_mandatory(&self, qid: &str, title: &str) -> SurveyResult<bool> {
        self.subquestion(qid, title).map(|sq| sq.mandatory)
    }

    pub fn answer_text(&self, qid: &str, code: &str) -> SurveyResult<&str> {
        let answers = self.answers.get(qid).context(MissingAnswersSnafu { qid })?;
        answers
            .get(code)
            .map(|s| s.as_str())
            .context(UnknownAnswerSnafu { qid, code })
    }

    /// The answer codes of a question, in sorted order.
    pub fn answer_codes(&self, qid: &str) -> SurveyResult<Vec<&str>> {
        let answers = self.answers.get(qid).context(MissingAnswersSnafu { qid })?;
        Ok(answers.keys().map(|s| s.as_str()).collect())
    }

    pub fn has_answers(&self, qid: &str) -> bool {
        self.answers.contains_key(qid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::*;

    fn catalog() -> StructureCatalog {
        let mut b = CatalogBuilder::new("en");
        b.add_question(QuestionRow::new("10", "city", "Which city?", "L", "Y", "N", "en"))
            .unwrap();
        b.add_subquestion(SubquestionRow::new("12", "SQ001", "Paid VPN", "en"));
        b.add_answer(AnswerRow::new("10", "A2", "South", "en"));
        b.add_answer(AnswerRow::new("10", "A1", "North", "en"));
        b.build()
    }

    #[test]
    fn flags() {
        assert!(decode_flag("Y").unwrap());
        assert!(!decode_flag("N").unwrap());
        for bad in ["y", "", "Yes", "1"] {
            let e = decode_flag(bad).unwrap_err();
            assert_eq!(e.kind(), ErrorKind::Decode);
        }
    }

    #[test]
    fn lookups() {
        let c = catalog();
        let q = c.question("city").unwrap();
        assert_eq!(q.qid, "10");
        assert_eq!(q.question_type, QuestionType::SingleChoice);
        assert!(q.mandatory);
        assert!(!q.other);

        assert_eq!(c.answer_text("10", "A1").unwrap(), "North");
        assert_eq!(c.answer_codes("10").unwrap(), vec!["A1", "A2"]);
        assert_eq!(c.subquestion_text("12", "SQ001").unwrap(), "Paid VPN");
        assert!(!c.subquestion_mandatory("12", "SQ001").unwrap());
    }

    #[test]
    fn failed_lookups() {
        let c = catalog();
        assert_eq!(c.question("town").unwrap_err().kind(), ErrorKind::Lookup);
        assert!(matches!(
            c.answer_text("10", "A9"),
            Err(SurveyError::UnknownAnswer { .. })
        ));
        assert!(matches!(
            c.answer_text("99", "A1"),
            Err(SurveyError::MissingAnswers { .. })
        ));
        assert!(matches!(
            c.subquestion_text("10", "SQ001"),
            Err(SurveyError::UnknownSubquestion { .. })
        ));
    }

    #[test]
    fn type_codes() {
        assert_eq!(QuestionType::from_code("G").default_kind(), Some(QuestionKind::Radio));
        assert_eq!(
            QuestionType::from_code("M").default_kind(),
            Some(QuestionKind::Checkbox)
        );
        assert_eq!(QuestionType::from_code("F").default_kind(), Some(QuestionKind::Array));
        assert_eq!(
            QuestionType::from_code("T"),
            QuestionType::Other("T".to_string())
        );
        assert_eq!(QuestionType::from_code("S").default_kind(), None);
    }
}

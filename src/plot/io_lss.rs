// Reader for the LimeSurvey structure export (.lss).
//
// Only three sections of the export are used. Each has the shape
// document/<section>/rows/row/<field>, with the field values often in CDATA.

use std::collections::HashMap;
use std::sync::LazyLock;

use html_escape::decode_html_entities;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use survey_convergence::builder::*;

use crate::plot::*;

const SECTIONS: [&str; 3] = ["questions", "subquestions", "answers"];

type FieldMap = HashMap<String, String>;

/// Script and style elements with their body. An unclosed element runs to the end.
static SCRIPT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:script|style)\b.*?(?:</(?:script|style)\s*>|\z)")
        .expect("Invalid script regex")
});

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));

#[derive(Eq, PartialEq, Debug, Clone, Default)]
struct LssSections {
    sections: HashMap<String, Vec<FieldMap>>,
}

impl LssSections {
    fn rows(&self, section: &str) -> &[FieldMap] {
        self.sections
            .get(section)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

pub fn read_lss_structure(path: &str, language: &str) -> PlotResult<StructureCatalog> {
    let xml = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let sections = read_sections(&xml).context(ParsingXmlSnafu { path })?;
    build_catalog(&sections, language)
}

// The path of a field element: document, section, rows, row, field.
fn in_field(stack: &[String]) -> bool {
    stack.len() == 5 && stack[2] == "rows" && stack[3] == "row" && SECTIONS.contains(&stack[1].as_str())
}

fn in_row(stack: &[String]) -> bool {
    stack.len() == 4 && stack[2] == "rows" && stack[3] == "row" && SECTIONS.contains(&stack[1].as_str())
}

fn read_sections(xml: &str) -> Result<LssSections, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut res = LssSections::default();
    let mut stack: Vec<String> = Vec::new();
    let mut row: FieldMap = FieldMap::new();
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                stack.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                if in_row(&stack) {
                    row = FieldMap::new();
                } else if in_field(&stack) {
                    text.clear();
                }
            }
            Event::Empty(e) => {
                if in_row(&stack) {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    row.insert(name, String::new());
                }
            }
            Event::Text(t) if in_field(&stack) => {
                text.push_str(&String::from_utf8_lossy(&t));
            }
            Event::CData(t) if in_field(&stack) => {
                text.push_str(&String::from_utf8_lossy(&t));
            }
            Event::GeneralRef(r) if in_field(&stack) => {
                let reference = format!("&{};", String::from_utf8_lossy(&r));
                text.push_str(&decode_html_entities(&reference));
            }
            Event::End(_) => {
                if in_field(&stack) {
                    if let Some(field) = stack.last() {
                        row.insert(field.clone(), text.trim().to_string());
                    }
                } else if in_row(&stack) {
                    res.sections
                        .entry(stack[1].clone())
                        .or_insert_with(Vec::new)
                        .push(std::mem::take(&mut row));
                }
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }
    debug!(
        "read_sections: {}",
        SECTIONS
            .iter()
            .map(|s| format!("{}: {} rows", s, res.rows(s).len()))
            .collect::<Vec<String>>()
            .join(", ")
    );
    Ok(res)
}

fn field<'a>(row: &'a FieldMap, section: &str, name: &str, lineno: usize) -> PlotResult<&'a str> {
    row.get(name)
        .map(|s| s.as_str())
        .context(MissingFieldSnafu {
            section,
            field: name,
            lineno,
        })
}

fn build_catalog(sections: &LssSections, language: &str) -> PlotResult<StructureCatalog> {
    let mut builder = CatalogBuilder::new(language);
    for (idx, row) in sections.rows("questions").iter().enumerate() {
        let f = |name: &str| field(row, "questions", name, idx + 1);
        let qr = QuestionRow::new(
            f("qid")?,
            f("title")?,
            &clean_question_text(f("question")?),
            f("type")?,
            f("mandatory")?,
            f("other")?,
            f("language")?,
        );
        builder.add_question(qr).context(SurveySnafu {})?;
    }
    for (idx, row) in sections.rows("subquestions").iter().enumerate() {
        let f = |name: &str| field(row, "subquestions", name, idx + 1);
        let mut sr = SubquestionRow::new(
            f("parent_qid")?,
            f("title")?,
            &clean_question_text(f("question")?),
            f("language")?,
        );
        sr.mandatory = row.get("mandatory").filter(|s| !s.is_empty()).cloned();
        builder.add_subquestion_checked(sr).context(SurveySnafu {})?;
    }
    for (idx, row) in sections.rows("answers").iter().enumerate() {
        let f = |name: &str| field(row, "answers", name, idx + 1);
        builder.add_answer(AnswerRow::new(
            f("qid")?,
            f("code")?,
            f("answer")?,
            f("language")?,
        ));
    }
    Ok(builder.build())
}

/// Question texts are HTML, sometimes with scripts. Keeps the text only,
/// and of that text the last non-empty line.
pub fn clean_question_text(raw: &str) -> String {
    let text = SCRIPT_REGEX.replace_all(raw, "");
    let text = TAG_REGEX.replace_all(&text, "");
    let text = decode_html_entities(&text);
    text.lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<document>
 <LimeSurveyDocType>Survey</LimeSurveyDocType>
 <questions>
  <fields>
   <fieldname>qid</fieldname>
   <fieldname>title</fieldname>
  </fields>
  <rows>
   <row>
    <qid><![CDATA[10]]></qid>
    <title><![CDATA[city]]></title>
    <question><![CDATA[<p>Which city do you live in?</p>]]></question>
    <type><![CDATA[L]]></type>
    <mandatory><![CDATA[Y]]></mandatory>
    <other><![CDATA[N]]></other>
    <language><![CDATA[en]]></language>
   </row>
   <row>
    <qid>10</qid>
    <title>city</title>
    <question>&lt;p&gt;哪个城市?&lt;/p&gt;</question>
    <type>L</type>
    <mandatory>Y</mandatory>
    <other>N</other>
    <language>zh-Hans</language>
   </row>
  </rows>
 </questions>
 <subquestions>
  <rows>
   <row>
    <parent_qid>12</parent_qid>
    <title>SQ001</title>
    <question>Tom &amp; Jerry</question>
    <mandatory/>
    <language>en</language>
   </row>
  </rows>
 </subquestions>
 <answers>
  <rows>
   <row>
    <qid>10</qid>
    <code>A1</code>
    <answer>North</answer>
    <language>en</language>
   </row>
  </rows>
 </answers>
</document>
"#;

    #[test]
    fn sections() {
        let s = read_sections(LSS).unwrap();
        assert_eq!(s.rows("questions").len(), 2);
        assert_eq!(s.rows("questions")[1]["question"], "<p>哪个城市?</p>");
        assert_eq!(s.rows("subquestions")[0]["question"], "Tom & Jerry");
        assert_eq!(s.rows("subquestions")[0]["mandatory"], "");
        assert!(s.rows("groups").is_empty());
    }

    #[test]
    fn catalog() {
        let c = build_catalog(&read_sections(LSS).unwrap(), "en").unwrap();
        let q = c.question("city").unwrap();
        assert_eq!(q.text, "Which city do you live in?");
        assert!(q.mandatory);
        assert_eq!(c.answer_text("10", "A1").unwrap(), "North");
        assert_eq!(c.subquestion_text("12", "SQ001").unwrap(), "Tom & Jerry");
        assert!(!c.subquestion_mandatory("12", "SQ001").unwrap());

        let zh = build_catalog(&read_sections(LSS).unwrap(), "zh-Hans").unwrap();
        assert_eq!(zh.question("city").unwrap().text, "哪个城市?");
        assert!(zh.answer_text("10", "A1").is_err());
    }

    #[test]
    fn missing_field() {
        let xml = "<document><answers><rows><row><qid>10</qid><code>A1</code>\
                   <language>en</language></row></rows></answers></document>";
        let res = build_catalog(&read_sections(xml).unwrap(), "en");
        assert!(matches!(
            res,
            Err(PlotError::MissingField { section, field, lineno: 1 })
                if section == "answers" && field == "answer"
        ));
    }

    #[test]
    fn bad_flag() {
        let xml = "<document><questions><rows><row><qid>10</qid><title>city</title>\
                   <question>Q</question><type>L</type><mandatory>maybe</mandatory>\
                   <other>N</other><language>en</language></row></rows></questions></document>";
        match build_catalog(&read_sections(xml).unwrap(), "en") {
            Err(PlotError::Survey { source }) => assert_eq!(source.kind(), ErrorKind::Decode),
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn named_entities() {
        let xml = "<document><questions><rows><row><qid>10</qid><title>city</title>\
                   <question>&lt;p&gt;Caf&amp;eacute; &amp;ndash; Bar &#233;&lt;/p&gt;</question>\
                   <type>L</type><mandatory>Y</mandatory><other>N</other>\
                   <language>en</language></row></rows></questions></document>";
        let s = read_sections(xml).unwrap();
        assert_eq!(s.rows("questions")[0]["question"], "<p>Caf&eacute; &ndash; Bar é</p>");
        let c = build_catalog(&s, "en").unwrap();
        assert_eq!(c.question("city").unwrap().text, "Café – Bar é");
    }

    #[test]
    fn malformed_xml() {
        assert!(read_sections("<document><questions></document>").is_err());
    }

    #[test]
    fn question_text() {
        assert_eq!(clean_question_text("<p>How old are you?</p>"), "How old are you?");
        assert_eq!(
            clean_question_text(
                "<script type=\"text/javascript\">\n$(document).ready(function(){});\n</script>\n<b>Which tools</b> do you use?"
            ),
            "Which tools do you use?"
        );
        assert_eq!(
            clean_question_text("First line\nSecond &amp; last line\n\n"),
            "Second & last line"
        );
        assert_eq!(clean_question_text("Fish &xyz; &#35;1"), "Fish &xyz; #1");
        assert_eq!(
            clean_question_text("<style>p { color: red; }</style>Caf&eacute; &mdash; &ldquo;VPN&rdquo;"),
            "Café — \u{201c}VPN\u{201d}"
        );
        assert_eq!(clean_question_text("Before<script>alert(1);"), "Before");
        assert_eq!(clean_question_text(""), "");
    }
}

use snafu::{ensure, OptionExt};

use crate::config::*;

/// Response rows under a header, one row per respondent, in export order.
///
/// Every row has exactly as many cells as the header.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResponseTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ResponseTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> SurveyResult<ResponseTable> {
        for (idx, row) in rows.iter().enumerate() {
            ensure!(
                row.len() == header.len(),
                RaggedRowSnafu {
                    lineno: idx + 1,
                    expected: header.len(),
                    found: row.len(),
                }
            );
        }
        Ok(ResponseTable { header, rows })
    }

    /// Builds a table from raw records, the first record being the header.
    pub fn from_records(records: Vec<Vec<String>>) -> SurveyResult<ResponseTable> {
        let mut iter = records.into_iter();
        let header = iter.next().context(MissingHeaderSnafu {})?;
        ResponseTable::new(header, iter.collect())
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> SurveyResult<usize> {
        self.header
            .iter()
            .position(|h| h == name)
            .context(MissingColumnSnafu { column: name })
    }

    /// A table with the same header and the given rows.
    pub(crate) fn with_rows(&self, rows: Vec<Vec<String>>) -> ResponseTable {
        ResponseTable {
            header: self.header.clone(),
            rows,
        }
    }

    /// A table restricted to the given columns, in the given order.
    pub(crate) fn project(&self, indexes: &[usize]) -> ResponseTable {
        ResponseTable {
            header: indexes.iter().map(|&i| self.header[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indexes.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// The header followed by the rows.
    pub fn to_records(&self) -> Vec<Vec<String>> {
        let mut res = Vec::with_capacity(self.rows.len() + 1);
        res.push(self.header.clone());
        res.extend(self.rows.iter().cloned());
        res
    }
}

/// Reads a numeric cell. Blank cells are `None`.
pub(crate) fn parse_number(cell: &str, lineno: usize, column: &str) -> SurveyResult<Option<f64>> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    match cell.parse::<f64>() {
        Ok(x) if x.is_finite() => Ok(Some(x)),
        _ => MalformedNumberSnafu {
            lineno,
            column,
            value: cell,
        }
        .fail(),
    }
}

/// Splits a column label into its question name and sub-question title.
///
/// `"tools [SQ001]"` and `"tools[SQ001]"` both give `("tools", Some("SQ001"))`,
/// a bare `"city"` gives `("city", None)`.
pub fn parse_column_label(label: &str) -> (&str, Option<&str>) {
    let label = label.trim();
    if let Some(stripped) = label.strip_suffix(']') {
        if let Some(open) = stripped.rfind('[') {
            let qname = stripped[..open].trim_end();
            let subtitle = stripped[open + 1..].trim();
            return (qname, Some(subtitle));
        }
    }
    (label, None)
}

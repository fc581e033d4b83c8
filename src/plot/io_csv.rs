// Primitives for reading CSV files.

use crate::plot::{io_common::strip_bom, *};

/// Reads a response export. The first record is the header.
pub fn read_csv_table(path: &str) -> PlotResult<ResponseTable> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    read_records(rdr)
}

fn read_records<R: std::io::Read>(rdr: csv::Reader<R>) -> PlotResult<ResponseTable> {
    let mut records: Vec<Vec<String>> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        let lineno = idx + 1;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let mut cells: Vec<String> = line.iter().map(|s| s.trim().to_string()).collect();
        if idx == 0 {
            if let Some(first) = cells.first_mut() {
                *first = strip_bom(first).to_string();
            }
        }
        records.push(cells);
    }
    debug!("read_records: {} records", records.len());
    ResponseTable::from_records(records).context(SurveySnafu {})
}

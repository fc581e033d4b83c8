use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::plot::*;

/// Reads a response export from an Excel workbook. The first row is the header.
pub fn read_excel_table(path: &str, worksheet: Option<&str>) -> PlotResult<ResponseTable> {
    let wrange = get_range(path, worksheet)?;
    let mut records: Vec<Vec<String>> = Vec::with_capacity(wrange.height());
    for (idx, row) in wrange.rows().enumerate() {
        let cells = row
            .iter()
            .enumerate()
            .map(|(col, cell)| read_cell(cell, idx + 1, col + 1))
            .collect::<PlotResult<Vec<String>>>()?;
        records.push(cells);
    }
    debug!("read_excel_table: {} records", records.len());
    ResponseTable::from_records(records).context(SurveySnafu {})
}

fn get_range(path: &str, worksheet: Option<&str>) -> PlotResult<Range<DataType>> {
    debug!("get_range: path: {:?} worksheet: {:?}", path, worksheet);
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet {
        // A worksheet name was provided, use it.
        Some(name) => workbook.worksheet_range(name),
        None => workbook.worksheet_range_at(0),
    };
    wrange
        .context(EmptyExcelSnafu { path })?
        .context(OpeningExcelSnafu { path })
}

// Numbers that are whole are written without a decimal part, as in a CSV export.
fn read_cell(cell: &DataType, lineno: usize, column: usize) -> PlotResult<String> {
    let res = match cell {
        DataType::String(s) => s.trim().to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
        DataType::DateTime(_) => match cell.as_datetime() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => {
                return ExcelWrongCellTypeSnafu {
                    lineno,
                    column,
                    content: format!("{:?}", cell),
                }
                .fail()
            }
        },
        DataType::Empty => String::new(),
        _ => {
            return ExcelWrongCellTypeSnafu {
                lineno,
                column,
                content: format!("{:?}", cell),
            }
            .fail()
        }
    };
    Ok(res)
}

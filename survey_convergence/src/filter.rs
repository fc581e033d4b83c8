use log::debug;

use crate::config::ColumnConventions;
use crate::table::ResponseTable;

/// Keeps the columns whose label starts with `prefix`.
///
/// Write-in columns (labels containing the other marker) are dropped unless
/// `include_other` is set. Elapsed-time columns are always dropped.
/// The rows keep their order.
pub fn select_columns(
    prefix: &str,
    table: &ResponseTable,
    include_other: bool,
    conventions: &ColumnConventions,
) -> ResponseTable {
    let matched: Vec<usize> = table
        .header()
        .iter()
        .enumerate()
        .filter(|(_, label)| label.starts_with(prefix))
        .filter(|(_, label)| include_other || !is_other_column(label, conventions))
        .filter(|(_, label)| !label.ends_with(conventions.elapsed_suffix.as_str()))
        .map(|(idx, _)| idx)
        .collect();
    debug!(
        "select_columns: prefix {:?}: {} of {} columns",
        prefix,
        matched.len(),
        table.header().len()
    );
    table.project(&matched)
}

fn is_other_column(label: &str, conventions: &ColumnConventions) -> bool {
    !conventions.other_marker.is_empty() && label.contains(conventions.other_marker.as_str())
}

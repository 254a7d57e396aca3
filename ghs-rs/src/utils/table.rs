//! Table formatting utilities

use prettytable::{Cell, Row, Table, format};

/// Create a table with bold headers and no line separators
pub fn create_table(headers: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(Row::new(
        headers
            .into_iter()
            .map(|h| Cell::new(h).style_spec("b"))
            .collect(),
    ));
    table
}

/// Counts, frames and hex offsets line up on the right
fn is_numeric(cell: &str) -> bool {
    cell.parse::<f64>().is_ok()
        || cell
            .strip_prefix("0x")
            .is_some_and(|hex| u64::from_str_radix(hex, 16).is_ok())
}

/// Add a row, right-aligning numeric cells
pub fn add_table_row(table: &mut Table, cells: Vec<String>) {
    table.add_row(Row::new(
        cells
            .into_iter()
            .map(|s| {
                let cell = Cell::new(&s);
                if is_numeric(&s) {
                    cell.style_spec("r")
                } else {
                    cell
                }
            })
            .collect(),
    ));
}

// 💾 Export - Write the unified table as a single-sheet workbook
// Cells keep their types: numbers as numbers, dates as datetimes,
// everything else as strings.

use crate::table::{UnifiedTable, Value};
use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

/// File name offered to the user for the exported workbook.
pub const DEFAULT_EXPORT_NAME: &str = "consolidated_output.xlsx";

const SHEET_NAME: &str = "Consolidated";

/// Write the table to an xlsx file at `path`.
pub fn write_workbook(table: &UnifiedTable, path: &Path) -> Result<()> {
    let mut workbook = build_workbook(table)?;
    workbook
        .save(path)
        .with_context(|| format!("failed to write workbook to {}", path.display()))?;
    Ok(())
}

/// Render the table to xlsx bytes, e.g. for a download response.
pub fn to_xlsx_bytes(table: &UnifiedTable) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(table)?;
    let bytes = workbook
        .save_to_buffer()
        .context("failed to render workbook to buffer")?;
    Ok(bytes)
}

fn build_workbook(table: &UnifiedTable) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    for (col, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name.as_str(), &header_format)?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let excel_row = (r + 1) as u32;
        for (c, value) in row.iter().enumerate() {
            let col = c as u16;
            match value {
                Value::Empty => {}
                Value::Text(s) => {
                    worksheet.write_string(excel_row, col, s.as_str())?;
                }
                Value::Number(n) => {
                    worksheet.write_number(excel_row, col, *n)?;
                }
                Value::Bool(b) => {
                    worksheet.write_boolean(excel_row, col, *b)?;
                }
                Value::Date(d) => {
                    worksheet.write_datetime_with_format(excel_row, col, d, &date_format)?;
                }
            }
        }
    }

    Ok(workbook)
}

// ============================================================================
// TESTS
// ============================================================================

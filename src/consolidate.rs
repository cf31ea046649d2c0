// 🗂️ Consolidator - Workbooks in, one unified table out
// Ingestion is best-effort per file: a workbook that fails to open is
// recorded as a warning and skipped, never aborting the run.

use crate::matcher::{MatchPolicy, RowColumnMatcher};
use crate::normalize::KeywordSet;
use crate::table::{Table, UnifiedTable, Value};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek};
use std::path::Path;

// ============================================================================
// WARNINGS & DIAGNOSTICS
// ============================================================================

/// A non-fatal per-file failure, surfaced to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileWarning {
    /// File the failure belongs to (with sheet name appended when the
    /// failure was scoped to one sheet).
    pub file: String,
    pub error: String,
}

/// Why a run produced zero rows. An empty result is a reportable terminal
/// state, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmptyReason {
    /// No input file could be opened.
    NoFilesRead,
    /// Files opened but no rows survived filtering (covers empty sheets
    /// and, under `MatchPolicy::RowOnly`, keywords that matched nothing).
    NoRowsMatched,
    /// Rows were ingested but all of them were dropped as fully-empty or
    /// exact duplicates.
    AllRowsDropped,
}

/// Counters and warnings accumulated over one consolidation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub files_total: usize,
    pub files_read: usize,
    pub sheets_read: usize,
    /// Data rows seen across all sheets, before filtering.
    pub rows_seen: usize,
    /// Rows appended to the unified table, after filtering.
    pub rows_ingested: usize,
    pub empty_rows_dropped: usize,
    pub duplicate_rows_dropped: usize,
    pub warnings: Vec<FileWarning>,
}

impl RunDiagnostics {
    fn warn(&mut self, file: &str, error: impl std::fmt::Display) {
        self.warnings.push(FileWarning {
            file: file.to_string(),
            error: error.to_string(),
        });
    }

    /// Classify an empty result. Returns `None` when the table has rows.
    pub fn empty_reason(&self, result_rows: usize) -> Option<EmptyReason> {
        if result_rows > 0 {
            return None;
        }
        if self.files_read == 0 {
            Some(EmptyReason::NoFilesRead)
        } else if self.rows_ingested == 0 {
            Some(EmptyReason::NoRowsMatched)
        } else {
            Some(EmptyReason::AllRowsDropped)
        }
    }
}

// ============================================================================
// CONSOLIDATOR
// ============================================================================

/// Reads every sheet of every input workbook, filters each through the
/// keyword matcher, and merges the survivors into one `UnifiedTable`.
///
/// Each run owns a fresh accumulator; nothing is shared across runs.
pub struct Consolidator {
    matcher: RowColumnMatcher,
}

impl Consolidator {
    pub fn new(keywords: KeywordSet, policy: MatchPolicy) -> Self {
        Consolidator {
            matcher: RowColumnMatcher::new(keywords, policy),
        }
    }

    pub fn matcher(&self) -> &RowColumnMatcher {
        &self.matcher
    }

    /// Consolidate workbooks on disk.
    pub fn consolidate_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
    ) -> (UnifiedTable, RunDiagnostics) {
        let mut unified = UnifiedTable::new();
        let mut diag = RunDiagnostics::default();

        for path in paths {
            let path = path.as_ref();
            diag.files_total += 1;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            match open_workbook_auto(path) {
                Ok(workbook) => {
                    diag.files_read += 1;
                    self.ingest_workbook(&file_name, workbook, &mut unified, &mut diag);
                }
                Err(e) => diag.warn(&file_name, e),
            }
        }

        self.finish(unified, diag)
    }

    /// Consolidate in-memory workbook streams, e.g. uploaded file bytes.
    /// Each source is a `(file name, seekable reader)` pair. Format
    /// auto-detection needs to re-read the stream, hence the `Clone` bound.
    pub fn consolidate_readers<RS: Read + Seek + Clone>(
        &self,
        sources: Vec<(String, RS)>,
    ) -> (UnifiedTable, RunDiagnostics) {
        let mut unified = UnifiedTable::new();
        let mut diag = RunDiagnostics::default();

        for (file_name, reader) in sources {
            diag.files_total += 1;
            match open_workbook_auto_from_rs(reader) {
                Ok(workbook) => {
                    diag.files_read += 1;
                    self.ingest_workbook(&file_name, workbook, &mut unified, &mut diag);
                }
                Err(e) => diag.warn(&file_name, e),
            }
        }

        self.finish(unified, diag)
    }

    fn ingest_workbook<RS: Read + Seek>(
        &self,
        file_name: &str,
        mut workbook: Sheets<RS>,
        unified: &mut UnifiedTable,
        diag: &mut RunDiagnostics,
    ) {
        let sheet_names = workbook.sheet_names().to_owned();
        for sheet_name in sheet_names {
            let range = match workbook.worksheet_range(&sheet_name) {
                Ok(range) => range,
                Err(e) => {
                    diag.warn(&format!("{} ({})", file_name, sheet_name), e);
                    continue;
                }
            };
            diag.sheets_read += 1;

            let Some(mut table) = sheet_to_table(&range) else {
                continue;
            };
            diag.rows_seen += table.row_count();

            table.tag_source(file_name, &sheet_name);
            let filtered = self.matcher.apply(table);
            diag.rows_ingested += filtered.row_count();
            unified.append(filtered);
        }
    }

    /// Post-ingestion cleaning: normalize names, drop all-empty rows,
    /// remove exact duplicates.
    fn finish(
        &self,
        mut unified: UnifiedTable,
        mut diag: RunDiagnostics,
    ) -> (UnifiedTable, RunDiagnostics) {
        unified.normalize_columns();
        diag.empty_rows_dropped = unified.drop_empty_rows();
        diag.duplicate_rows_dropped = unified.deduplicate();
        (unified, diag)
    }
}

// ============================================================================
// SHEET → TABLE
// ============================================================================

/// Build a `Table` from a sheet range. The first row is the header; empty
/// header cells get positional names. Returns `None` for an empty sheet.
fn sheet_to_table(range: &calamine::Range<Data>) -> Option<Table> {
    let mut rows = range.rows();
    let header = rows.next()?;

    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = cell.to_string().trim().to_string();
            if name.is_empty() {
                format!("column_{}", i)
            } else {
                name
            }
        })
        .collect();

    let mut table = Table::new(columns);
    for row in rows {
        table.push_row(row.iter().map(cell_to_value).collect());
    }
    Some(table)
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(f) => Value::Number(*f),
        Data::Int(i) => Value::Number(*i as f64),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) => Value::Date(d),
            None => Value::Empty,
        },
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(Value::Date)
            .unwrap_or_else(|| Value::Text(s.clone())),
        Data::DurationIso(s) => Value::Text(s.clone()),
        // Formula errors (#DIV/0! etc.) carry no usable value.
        Data::Error(_) => Value::Empty,
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::io::Cursor;

    enum Cell {
        S(&'static str),
        N(f64),
    }

    /// Build xlsx bytes with the given sheets. First row of each sheet is
    /// the header.
    fn workbook_bytes(sheets: Vec<(&str, Vec<Vec<Cell>>)>) -> Vec<u8> {
        let mut workbook = Workbook::new();
        for (name, rows) in sheets {
            let ws = workbook.add_worksheet();
            ws.set_name(name).unwrap();
            for (r, row) in rows.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    match cell {
                        Cell::S(s) => ws.write_string(r as u32, c as u16, *s).unwrap(),
                        Cell::N(n) => ws.write_number(r as u32, c as u16, *n).unwrap(),
                    };
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    fn clients_sheet() -> Vec<Vec<Cell>> {
        vec![
            vec![Cell::S("Client Name"), Cell::S("Revenue")],
            vec![Cell::S("Acme"), Cell::N(100.0)],
            vec![Cell::S("Globex"), Cell::N(300.0)],
        ]
    }

    fn consolidator(keywords: &str, policy: MatchPolicy) -> Consolidator {
        Consolidator::new(KeywordSet::parse(keywords), policy)
    }

    #[test]
    fn test_single_workbook_no_keywords() {
        let bytes = workbook_bytes(vec![("Sheet1", clients_sheet())]);
        let c = consolidator("", MatchPolicy::ColumnPriority);
        let (table, diag) =
            c.consolidate_readers(vec![("book.xlsx".to_string(), Cursor::new(bytes))]);

        assert_eq!(diag.files_read, 1);
        assert_eq!(diag.sheets_read, 1);
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.columns(),
            &["client_name", "revenue", "source_file", "sheet_name"]
        );
        let sf = table.column_index("source_file").unwrap();
        assert_eq!(table.cell(0, sf), &Value::Text("book.xlsx".to_string()));
        assert!(diag.empty_reason(table.row_count()).is_none());
    }

    #[test]
    fn test_corrupt_file_is_skipped_with_warning() {
        let good1 = workbook_bytes(vec![("S", clients_sheet())]);
        let good2 = workbook_bytes(vec![(
            "S",
            vec![
                vec![Cell::S("Client Name"), Cell::S("Revenue")],
                vec![Cell::S("Initech"), Cell::N(50.0)],
            ],
        )]);

        let c = consolidator("", MatchPolicy::ColumnPriority);
        let (table, diag) = c.consolidate_readers(vec![
            ("one.xlsx".to_string(), Cursor::new(good1)),
            ("two.xlsx".to_string(), Cursor::new(b"not a workbook".to_vec())),
            ("three.xlsx".to_string(), Cursor::new(good2)),
        ]);

        assert_eq!(diag.files_total, 3);
        assert_eq!(diag.files_read, 2);
        assert_eq!(diag.warnings.len(), 1);
        assert_eq!(diag.warnings[0].file, "two.xlsx");

        let sf = table.column_index("source_file").unwrap();
        let sources: Vec<String> = table
            .rows()
            .iter()
            .map(|r| r[sf].to_string())
            .collect();
        assert!(sources.contains(&"one.xlsx".to_string()));
        assert!(sources.contains(&"three.xlsx".to_string()));
        assert!(!sources.contains(&"two.xlsx".to_string()));
    }

    #[test]
    fn test_corrupt_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.xlsx");
        let bad = dir.path().join("bad.xlsx");
        std::fs::write(&good, workbook_bytes(vec![("S", clients_sheet())])).unwrap();
        std::fs::write(&bad, b"garbage").unwrap();

        let c = consolidator("", MatchPolicy::ColumnPriority);
        let (table, diag) = c.consolidate_paths(&[good, bad]);

        assert_eq!(table.row_count(), 2);
        assert_eq!(diag.warnings.len(), 1);
        assert_eq!(diag.warnings[0].file, "bad.xlsx");
    }

    #[test]
    fn test_column_union_across_workbooks() {
        let b1 = workbook_bytes(vec![(
            "S",
            vec![vec![Cell::S("A"), Cell::S("B")], vec![Cell::N(1.0), Cell::N(2.0)]],
        )]);
        let b2 = workbook_bytes(vec![(
            "S",
            vec![vec![Cell::S("C"), Cell::S("D")], vec![Cell::N(3.0), Cell::N(4.0)]],
        )]);

        let c = consolidator("", MatchPolicy::ColumnPriority);
        let (table, _) = c.consolidate_readers(vec![
            ("b1.xlsx".to_string(), Cursor::new(b1)),
            ("b2.xlsx".to_string(), Cursor::new(b2)),
        ]);

        assert_eq!(table.row_count(), 2);
        for col in ["a", "b", "c", "d"] {
            assert!(table.column_index(col).is_some(), "missing column {}", col);
        }
        // Null-filled gap: first row has no "c" value.
        let ci = table.column_index("c").unwrap();
        assert_eq!(table.cell(0, ci), &Value::Empty);
    }

    #[test]
    fn test_duplicates_within_a_sheet_removed() {
        let bytes = workbook_bytes(vec![(
            "S",
            vec![
                vec![Cell::S("Client Name"), Cell::S("Revenue")],
                vec![Cell::S("Acme"), Cell::N(100.0)],
                vec![Cell::S("Acme"), Cell::N(100.0)],
            ],
        )]);

        let c = consolidator("", MatchPolicy::ColumnPriority);
        let (table, diag) =
            c.consolidate_readers(vec![("b.xlsx".to_string(), Cursor::new(bytes))]);

        assert_eq!(table.row_count(), 1);
        assert_eq!(diag.duplicate_rows_dropped, 1);
    }

    #[test]
    fn test_keyword_filter_applied_per_sheet() {
        let bytes = workbook_bytes(vec![("S", clients_sheet())]);
        let c = consolidator("revenue", MatchPolicy::ColumnPriority);
        let (table, _) =
            c.consolidate_readers(vec![("b.xlsx".to_string(), Cursor::new(bytes))]);

        assert_eq!(table.columns(), &["revenue", "source_file", "sheet_name"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_empty_reason_no_files() {
        let c = consolidator("", MatchPolicy::ColumnPriority);
        let (table, diag) = c.consolidate_readers(vec![(
            "bad.xlsx".to_string(),
            Cursor::new(b"junk".to_vec()),
        )]);

        assert!(table.is_empty());
        assert_eq!(
            diag.empty_reason(table.row_count()),
            Some(EmptyReason::NoFilesRead)
        );
    }

    #[test]
    fn test_empty_reason_no_rows_matched_row_only() {
        let bytes = workbook_bytes(vec![("S", clients_sheet())]);
        let c = consolidator("zzz_nothing", MatchPolicy::RowOnly);
        let (table, diag) =
            c.consolidate_readers(vec![("b.xlsx".to_string(), Cursor::new(bytes))]);

        assert!(table.is_empty());
        assert_eq!(diag.rows_seen, 2);
        assert_eq!(
            diag.empty_reason(table.row_count()),
            Some(EmptyReason::NoRowsMatched)
        );
    }

    #[test]
    fn test_multiple_sheets_all_ingested() {
        let bytes = workbook_bytes(vec![
            ("Q1", clients_sheet()),
            (
                "Q2",
                vec![
                    vec![Cell::S("Client Name"), Cell::S("Revenue")],
                    vec![Cell::S("Initech"), Cell::N(75.0)],
                ],
            ),
        ]);

        let c = consolidator("", MatchPolicy::ColumnPriority);
        let (table, diag) =
            c.consolidate_readers(vec![("b.xlsx".to_string(), Cursor::new(bytes))]);

        assert_eq!(diag.sheets_read, 2);
        assert_eq!(table.row_count(), 3);
        let sn = table.column_index("sheet_name").unwrap();
        let sheets: Vec<String> = table.rows().iter().map(|r| r[sn].to_string()).collect();
        assert!(sheets.contains(&"Q1".to_string()));
        assert!(sheets.contains(&"Q2".to_string()));
    }
}

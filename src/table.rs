// 📋 Table Model - In-memory tabular data
// Table = one sheet's worth of rows. UnifiedTable = the growing
// column-union concatenation of every filtered sheet.

use crate::normalize::normalize_name;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

// ============================================================================
// CELL VALUE
// ============================================================================

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

/// Result of trying to read a cell as a number.
///
/// `Missing` (empty cell) and `Failed` (cell present but not numeric) are
/// different states: missing cells are silently excluded from aggregates,
/// failed coercions are excluded AND counted for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    Missing,
    Number(f64),
    Failed,
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Coerce this cell to a number for aggregation.
    ///
    /// Text cells are parsed after stripping currency symbols, thousands
    /// separators, and percent signs ("$1,234.56" → 1234.56). Bools and
    /// dates never coerce; they count as failures in a numeric column.
    pub fn coerce_number(&self) -> Coercion {
        match self {
            Value::Empty => Coercion::Missing,
            Value::Number(n) => Coercion::Number(*n),
            Value::Text(s) => {
                let cleaned: String = s
                    .trim()
                    .chars()
                    .filter(|c| !matches!(c, '$' | ',' | '%'))
                    .collect();
                if cleaned.is_empty() {
                    return Coercion::Missing;
                }
                match cleaned.parse::<f64>() {
                    // "nan"/"inf" parse as floats but would poison sums
                    // and means; treat them as failed coercions.
                    Ok(n) if n.is_finite() => Coercion::Number(n),
                    _ => Coercion::Failed,
                }
            }
            Value::Bool(_) | Value::Date(_) => Coercion::Failed,
        }
    }

    /// Canonical string used for duplicate fingerprinting.
    /// Tagged by type so Text("1") and Number(1.0) never collide.
    fn fingerprint_part(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Text(s) => format!("t:{}", s),
            Value::Number(n) => format!("n:{}", n),
            Value::Bool(b) => format!("b:{}", b),
            Value::Date(d) => format!("d:{}", d),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Date(d) => {
                if d.time() == chrono::NaiveTime::MIN {
                    write!(f, "{}", d.date())
                } else {
                    write!(f, "{}", d)
                }
            }
        }
    }
}

// ============================================================================
// TABLE (one sheet)
// ============================================================================

/// One sheet's rows over a shared, ordered column list.
///
/// Rows are padded with `Value::Empty` so every row has exactly
/// `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row, padding or truncating to the column count.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Empty);
        self.rows.push(row);
    }

    /// Append a constant-valued column (used for source tagging).
    pub fn push_column(&mut self, name: &str, value: Value) {
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(value.clone());
        }
    }

    /// Tag every row with its originating file and sheet.
    pub fn tag_source(&mut self, source_file: &str, sheet_name: &str) {
        self.push_column("source_file", Value::Text(source_file.to_string()));
        self.push_column("sheet_name", Value::Text(sheet_name.to_string()));
    }

    /// Normalize all column names in place. Idempotent.
    pub fn normalize_columns(&mut self) {
        for col in &mut self.columns {
            *col = normalize_name(col);
        }
    }

    /// Keep only the rows where `mask` is true. Consumes the table.
    pub fn retain_rows(mut self, mask: &[bool]) -> Table {
        let mut keep = mask.iter().copied();
        self.rows.retain(|_| keep.next().unwrap_or(false));
        self
    }

    /// Project to the given column indices, in the given order.
    pub fn select_columns(self, indices: &[usize]) -> Table {
        let columns = indices
            .iter()
            .map(|&i| self.columns[i].clone())
            .collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Table { columns, rows }
    }
}

// ============================================================================
// UNIFIED TABLE (the consolidated dataset)
// ============================================================================

/// The consolidated dataset: every filtered sheet appended with
/// column-union semantics. Columns unseen by earlier sheets are backfilled
/// with `Value::Empty`, and vice versa.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl UnifiedTable {
    pub fn new() -> Self {
        UnifiedTable::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell accessor. Returns `Value::Empty` for out-of-range requests.
    pub fn cell(&self, row: usize, col: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Value::Empty)
    }

    /// Append a sheet's table with column-union semantics.
    pub fn append(&mut self, table: Table) {
        if table.is_empty() {
            return;
        }

        // Map each incoming column to a position in the union, adding
        // new columns (and backfilling existing rows) as needed.
        let mut mapping = Vec::with_capacity(table.columns().len());
        for name in table.columns() {
            let idx = match self.column_index(name) {
                Some(i) => i,
                None => {
                    self.columns.push(name.clone());
                    for row in &mut self.rows {
                        row.push(Value::Empty);
                    }
                    self.columns.len() - 1
                }
            };
            mapping.push(idx);
        }

        let width = self.columns.len();
        let Table { rows, .. } = table;
        for row in rows {
            let mut unified_row = vec![Value::Empty; width];
            for (src_idx, value) in row.into_iter().enumerate() {
                unified_row[mapping[src_idx]] = value;
            }
            self.rows.push(unified_row);
        }
    }

    /// Normalize every column name. Idempotent.
    pub fn normalize_columns(&mut self) {
        for col in &mut self.columns {
            *col = normalize_name(col);
        }
    }

    /// Drop rows that are empty across all columns.
    /// Returns the number of rows removed.
    pub fn drop_empty_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.iter().any(|v| !v.is_empty()));
        before - self.rows.len()
    }

    /// Remove exact-duplicate rows (full-row equality), keeping the first
    /// occurrence. Idempotent. Returns the number of rows removed.
    pub fn deduplicate(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen: HashSet<String> = HashSet::new();
        self.rows.retain(|row| seen.insert(row_fingerprint(row)));
        before - self.rows.len()
    }
}

/// Fingerprint for duplicate detection: SHA-256 over the row's
/// type-tagged cell renderings.
fn row_fingerprint(row: &[Value]) -> String {
    let mut hasher = Sha256::new();
    for value in row {
        hasher.update(value.fingerprint_part());
        hasher.update([0x1f]);
    }
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            t.push_row(row);
        }
        t
    }

    #[test]
    fn test_union_merge_disjoint_columns() {
        let t1 = table(&["a", "b"], vec![vec![text("1"), text("2")]]);
        let t2 = table(&["c", "d"], vec![vec![text("3"), text("4")]]);

        let mut unified = UnifiedTable::new();
        unified.append(t1);
        unified.append(t2);

        assert_eq!(unified.columns(), &["a", "b", "c", "d"]);
        assert_eq!(unified.row_count(), 2);
        // Null-filled gaps on both sides
        assert_eq!(unified.cell(0, 2), &Value::Empty);
        assert_eq!(unified.cell(0, 3), &Value::Empty);
        assert_eq!(unified.cell(1, 0), &Value::Empty);
        assert_eq!(unified.cell(1, 1), &Value::Empty);
        assert_eq!(unified.cell(1, 2), &text("3"));
    }

    #[test]
    fn test_union_merge_shared_columns() {
        let t1 = table(&["a", "b"], vec![vec![text("1"), text("2")]]);
        let t2 = table(&["b", "c"], vec![vec![text("5"), text("6")]]);

        let mut unified = UnifiedTable::new();
        unified.append(t1);
        unified.append(t2);

        assert_eq!(unified.columns(), &["a", "b", "c"]);
        assert_eq!(unified.cell(1, 1), &text("5"));
        assert_eq!(unified.cell(1, 0), &Value::Empty);
    }

    #[test]
    fn test_deduplicate_keeps_first_and_is_idempotent() {
        let mut unified = UnifiedTable::new();
        unified.append(table(
            &["a"],
            vec![vec![text("x")], vec![text("y")], vec![text("x")]],
        ));

        let removed = unified.deduplicate();
        assert_eq!(removed, 1);
        assert_eq!(unified.row_count(), 2);
        assert_eq!(unified.cell(0, 0), &text("x"));
        assert_eq!(unified.cell(1, 0), &text("y"));

        // Idempotent
        let removed_again = unified.deduplicate();
        assert_eq!(removed_again, 0);
        assert_eq!(unified.row_count(), 2);
    }

    #[test]
    fn test_dedup_distinguishes_types() {
        let mut unified = UnifiedTable::new();
        unified.append(table(
            &["a"],
            vec![vec![Value::Number(1.0)], vec![text("1")]],
        ));
        assert_eq!(unified.deduplicate(), 0);
        assert_eq!(unified.row_count(), 2);
    }

    #[test]
    fn test_drop_empty_rows() {
        let mut unified = UnifiedTable::new();
        unified.append(table(
            &["a", "b"],
            vec![
                vec![Value::Empty, Value::Empty],
                vec![text("kept"), Value::Empty],
            ],
        ));
        assert_eq!(unified.drop_empty_rows(), 1);
        assert_eq!(unified.row_count(), 1);
        assert_eq!(unified.cell(0, 0), &text("kept"));
    }

    #[test]
    fn test_normalize_columns_idempotent() {
        let mut unified = UnifiedTable::new();
        unified.append(table(&[" Client Name ", "AUM"], vec![vec![text("x"), text("y")]]));

        unified.normalize_columns();
        assert_eq!(unified.columns(), &["client_name", "aum"]);

        unified.normalize_columns();
        assert_eq!(unified.columns(), &["client_name", "aum"]);
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(Value::Number(2.5).coerce_number(), Coercion::Number(2.5));
        assert_eq!(text("$1,234.56").coerce_number(), Coercion::Number(1234.56));
        assert_eq!(text(" 42 ").coerce_number(), Coercion::Number(42.0));
        assert_eq!(text("n/a").coerce_number(), Coercion::Failed);
        assert_eq!(Value::Empty.coerce_number(), Coercion::Missing);
        assert_eq!(text("   ").coerce_number(), Coercion::Missing);
        assert_eq!(Value::Bool(true).coerce_number(), Coercion::Failed);
    }

    #[test]
    fn test_coerce_rejects_non_finite_text() {
        assert_eq!(text("nan").coerce_number(), Coercion::Failed);
        assert_eq!(text("NaN").coerce_number(), Coercion::Failed);
        assert_eq!(text("inf").coerce_number(), Coercion::Failed);
        assert_eq!(text("-inf").coerce_number(), Coercion::Failed);
        assert_eq!(text("infinity").coerce_number(), Coercion::Failed);
    }

    #[test]
    fn test_tag_source() {
        let mut t = table(&["a"], vec![vec![text("1")]]);
        t.tag_source("report.xlsx", "Q1");
        assert_eq!(t.columns(), &["a", "source_file", "sheet_name"]);
        assert_eq!(t.rows()[0][1], text("report.xlsx"));
        assert_eq!(t.rows()[0][2], text("Q1"));
    }

    #[test]
    fn test_push_row_pads_short_rows() {
        let mut t = Table::new(vec!["a".to_string(), "b".to_string()]);
        t.push_row(vec![text("only")]);
        assert_eq!(t.rows()[0], vec![text("only"), Value::Empty]);
    }
}

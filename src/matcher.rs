// 🔍 Row/Column Matcher - Keyword-driven "smart search" over one sheet
// Two selection policies exist in the wild for this kind of filter; the
// choice is an explicit configuration, not an accident.

use crate::normalize::KeywordSet;
use crate::table::Table;
use serde::{Deserialize, Serialize};

// ============================================================================
// MATCH POLICY
// ============================================================================

/// How matched columns and matched rows are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPolicy {
    /// Column matches take priority. When keyword-matched columns exist,
    /// project to them (plus the source tags), restricted to matched rows
    /// when any exist. When nothing matches at all, fall back to the
    /// unfiltered table: a sheet is never dropped just because no keyword
    /// hit it.
    ColumnPriority,

    /// Row filtering is authoritative. Column matches are ignored, and
    /// keywords that match nothing yield an empty table. No fallback.
    RowOnly,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy::ColumnPriority
    }
}

// ============================================================================
// MATCHER
// ============================================================================

/// Filters one sheet's table down to keyword-relevant columns and rows.
#[derive(Debug, Clone)]
pub struct RowColumnMatcher {
    keywords: KeywordSet,
    policy: MatchPolicy,
}

impl RowColumnMatcher {
    pub fn new(keywords: KeywordSet, policy: MatchPolicy) -> Self {
        RowColumnMatcher { keywords, policy }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    /// Apply the keyword filter to one table.
    ///
    /// With an empty keyword set the table passes through unchanged
    /// (identity). Otherwise column names are normalized before matching,
    /// so downstream consumers always see normalized names on filtered
    /// tables.
    pub fn apply(&self, mut table: Table) -> Table {
        if self.keywords.is_empty() {
            return table;
        }

        table.normalize_columns();

        let matched_cols: Vec<usize> = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, name)| self.keywords.matches_name(name))
            .map(|(i, _)| i)
            .collect();

        // A row matches when any cell's string form contains a keyword,
        // regardless of column.
        let row_mask: Vec<bool> = table
            .rows()
            .iter()
            .map(|row| row.iter().any(|v| self.keywords.matches_text(&v.to_string())))
            .collect();
        let any_row_matched = row_mask.iter().any(|&m| m);

        match self.policy {
            MatchPolicy::RowOnly => table.retain_rows(&row_mask),
            MatchPolicy::ColumnPriority => {
                if !matched_cols.is_empty() {
                    let mut cols = matched_cols;
                    for tag in ["source_file", "sheet_name"] {
                        if let Some(i) = table.column_index(tag) {
                            if !cols.contains(&i) {
                                cols.push(i);
                            }
                        }
                    }
                    let base = if any_row_matched {
                        table.retain_rows(&row_mask)
                    } else {
                        table
                    };
                    base.select_columns(&cols)
                } else if any_row_matched {
                    table.retain_rows(&row_mask)
                } else {
                    // Fallback: keywords hit nothing, keep the sheet whole.
                    table
                }
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

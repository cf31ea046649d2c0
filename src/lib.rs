// Workbook Consolidator - Core Library
// Exposes all modules for use in the CLI and tests

pub mod consolidate;
pub mod export;
pub mod insights;
pub mod matcher;
pub mod normalize;
pub mod table;

// Re-export commonly used types
pub use consolidate::{Consolidator, EmptyReason, FileWarning, RunDiagnostics};
pub use export::{to_xlsx_bytes, write_workbook, DEFAULT_EXPORT_NAME};
pub use insights::{
    format_currency, format_number, CategoryCount, ClientValue, InsightGenerator, InsightReport,
};
pub use matcher::{MatchPolicy, RowColumnMatcher};
pub use normalize::{normalize_name, KeywordSet, DEFAULT_KEYWORDS};
pub use table::{Coercion, Table, UnifiedTable, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 📈 Insight Generator - Descriptive statistics over recognized columns
// Best-effort reporter, not a schema validator: recognized columns that are
// absent are simply skipped. The recognized set is a declarative table
// iterated generically, so adding a metric means adding one entry.

use crate::table::{Coercion, UnifiedTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column used to label "top row" callouts. When absent, the callout is
/// skipped rather than reported with an undefined value.
pub const LABEL_COLUMN: &str = "client_name";

/// How many entries the top-by-revenue chart data carries.
const TOP_CLIENTS_LIMIT: usize = 10;

// ============================================================================
// METRIC TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AggregationKind {
    /// Currency sum + mean + top-row callout.
    CurrencySumMeanTop,
    /// Currency sum + top-row callout.
    CurrencySumTop,
    /// Frequency breakdown + mode.
    Frequency,
    /// Plain numeric sum.
    CountSum,
}

struct MetricSpec {
    column: &'static str,
    title: &'static str,
    icon: &'static str,
    kind: AggregationKind,
    top_icon: &'static str,
    top_phrase: &'static str,
}

const METRICS: &[MetricSpec] = &[
    MetricSpec {
        column: "revenue",
        title: "Revenue",
        icon: "💰",
        kind: AggregationKind::CurrencySumMeanTop,
        top_icon: "🏆",
        top_phrase: "Top Client by Revenue",
    },
    MetricSpec {
        column: "aum",
        title: "AUM",
        icon: "🏦",
        kind: AggregationKind::CurrencySumTop,
        top_icon: "👑",
        top_phrase: "Top AUM Holder",
    },
    MetricSpec {
        column: "performance",
        title: "Performance",
        icon: "📊",
        kind: AggregationKind::Frequency,
        top_icon: "",
        top_phrase: "",
    },
    MetricSpec {
        column: "jurisdiction",
        title: "Jurisdiction",
        icon: "🌍",
        kind: AggregationKind::Frequency,
        top_icon: "",
        top_phrase: "",
    },
    MetricSpec {
        column: "call_(x)",
        title: "Calls Logged",
        icon: "📞",
        kind: AggregationKind::CountSum,
        top_icon: "",
        top_phrase: "",
    },
];

// ============================================================================
// REPORT TYPES
// ============================================================================

/// One category with its frequency (pie/histogram chart input).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// One client with an aggregated value (bar chart input).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientValue {
    pub client: String,
    pub value: f64,
}

/// Everything the presentation layer needs: display strings, narrative
/// summaries, chart data, and coercion diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsightReport {
    /// Short display strings ("💰 Total Revenue: $1,234.56").
    pub insights: Vec<String>,
    /// Narrative sentences for the executive summary.
    pub summaries: Vec<String>,
    /// Cells that should have been numeric but were not. Each one was
    /// excluded from its aggregate only; never fatal.
    pub coercion_failures: usize,
    pub coercion_notes: Vec<String>,
    /// Top rows by revenue, descending (ties keep row order).
    pub top_clients_by_revenue: Vec<ClientValue>,
    /// Frequency breakdowns keyed by column name, first-encounter order.
    pub breakdowns: HashMap<String, Vec<CategoryCount>>,
}

// ============================================================================
// GENERATOR
// ============================================================================

#[derive(Debug, Default)]
pub struct InsightGenerator;

impl InsightGenerator {
    pub fn new() -> Self {
        InsightGenerator
    }

    /// Compute all recognized metrics present in the table.
    pub fn generate(&self, table: &UnifiedTable) -> InsightReport {
        let mut report = InsightReport::default();

        for spec in METRICS {
            let Some(col) = table.column_index(spec.column) else {
                continue;
            };
            match spec.kind {
                AggregationKind::CurrencySumMeanTop => {
                    self.currency_metric(table, spec, col, true, &mut report)
                }
                AggregationKind::CurrencySumTop => {
                    self.currency_metric(table, spec, col, false, &mut report)
                }
                AggregationKind::Frequency => self.frequency_metric(table, spec, col, &mut report),
                AggregationKind::CountSum => self.count_metric(table, spec, col, &mut report),
            }
        }

        report
    }

    fn currency_metric(
        &self,
        table: &UnifiedTable,
        spec: &MetricSpec,
        col: usize,
        with_mean: bool,
        report: &mut InsightReport,
    ) {
        let values = numeric_column(table, col, spec.column, report);
        if values.is_empty() {
            return;
        }

        let total: f64 = values.iter().map(|(_, v)| v).sum();
        report
            .insights
            .push(format!("{} Total {}: {}", spec.icon, spec.title, format_currency(total)));

        let mut summary = if with_mean {
            let mean = total / values.len() as f64;
            report.insights.push(format!(
                "📈 Avg {} per Entry: {}",
                spec.title,
                format_currency(mean)
            ));
            format!(
                "{} totals {}. Average per row: {}.",
                spec.title,
                format_currency(total),
                format_currency(mean)
            )
        } else {
            format!("{} stands at {}.", spec.title, format_currency(total))
        };

        // Top-row callout, only when a label column exists. Ties on the
        // maximum keep the first row in table order.
        let label_col = table.column_index(LABEL_COLUMN);
        if let (Some(label_col), Some((top_row, _))) = (label_col, max_first(&values)) {
            let label = table.cell(top_row, label_col).to_string();
            report.insights.push(format!(
                "{} {}: {}",
                spec.top_icon, spec.top_phrase, label
            ));
            if with_mean {
                summary.push_str(&format!(" Top performer: {}.", label));
            } else {
                summary.push_str(&format!(" Highest holding from {}.", label));
            }
        }
        report.summaries.push(summary);

        // Bar chart input: top rows by revenue per client.
        if spec.column == "revenue" {
            if let Some(label_col) = label_col {
                report.top_clients_by_revenue = top_clients(table, &values, label_col);
            }
        }
    }

    fn frequency_metric(
        &self,
        table: &UnifiedTable,
        spec: &MetricSpec,
        col: usize,
        report: &mut InsightReport,
    ) {
        // First-encounter order makes the mode tie-break deterministic.
        let mut counts: Vec<CategoryCount> = Vec::new();
        for row in table.rows() {
            let value = &row[col];
            if value.is_empty() {
                continue;
            }
            let category = value.to_string();
            match counts.iter_mut().find(|c| c.category == category) {
                Some(entry) => entry.count += 1,
                None => counts.push(CategoryCount { category, count: 1 }),
            }
        }
        if counts.is_empty() {
            return;
        }

        let breakdown = counts
            .iter()
            .map(|c| format!("{}: {}", c.category, c.count))
            .collect::<Vec<_>>()
            .join(", ");
        report
            .insights
            .push(format!("{} {} Breakdown: {}", spec.icon, spec.title, breakdown));

        // Mode: highest count, first-encountered value wins ties.
        let mut mode = &counts[0];
        for entry in &counts[1..] {
            if entry.count > mode.count {
                mode = entry;
            }
        }
        report.insights.push(format!(
            "{} Most Common {}: {} ({} entries)",
            spec.icon, spec.title, mode.category, mode.count
        ));
        report.summaries.push(format!(
            "Most frequent {} is {}, appearing {} times.",
            spec.title.to_lowercase(),
            mode.category,
            mode.count
        ));

        report.breakdowns.insert(spec.column.to_string(), counts);
    }

    fn count_metric(
        &self,
        table: &UnifiedTable,
        spec: &MetricSpec,
        col: usize,
        report: &mut InsightReport,
    ) {
        let values = numeric_column(table, col, spec.column, report);
        if values.is_empty() {
            return;
        }

        let total: f64 = values.iter().map(|(_, v)| v).sum();
        report.insights.push(format!(
            "{} Total {}: {}",
            spec.icon,
            spec.title,
            format_number(total)
        ));
        report.summaries.push(format!(
            "Across all data, {} total {}.",
            spec.title.to_lowercase(),
            format_number(total)
        ));
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Extract `(row index, number)` pairs from a column. Missing cells are
/// skipped silently; non-numeric cells are recorded as coercion failures.
fn numeric_column(
    table: &UnifiedTable,
    col: usize,
    column_name: &str,
    report: &mut InsightReport,
) -> Vec<(usize, f64)> {
    let mut values = Vec::new();
    for (i, row) in table.rows().iter().enumerate() {
        match row[col].coerce_number() {
            Coercion::Number(n) => values.push((i, n)),
            Coercion::Missing => {}
            Coercion::Failed => {
                report.coercion_failures += 1;
                report.coercion_notes.push(format!(
                    "{}: row {} value \"{}\" is not numeric",
                    column_name,
                    i + 1,
                    row[col]
                ));
            }
        }
    }
    values
}

/// Maximum by value; ties resolved to the first row in table order.
fn max_first(values: &[(usize, f64)]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for &(row, value) in values {
        match best {
            Some((_, b)) if value <= b => {}
            _ => best = Some((row, value)),
        }
    }
    best
}

fn top_clients(
    table: &UnifiedTable,
    values: &[(usize, f64)],
    label_col: usize,
) -> Vec<ClientValue> {
    let mut pairs: Vec<ClientValue> = values
        .iter()
        .map(|&(row, value)| ClientValue {
            client: table.cell(row, label_col).to_string(),
            value,
        })
        .collect();
    // Stable sort keeps row order among equal values.
    pairs.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(std::cmp::Ordering::Equal));
    pairs.truncate(TOP_CLIENTS_LIMIT);
    pairs
}

/// Format as currency with thousands separators: 1234.5 → "$1,234.50".
pub fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
    format!("{}${}.{}", sign, group_thousands(int_part), frac_part)
}

/// Format a plain number: integral values without decimals, others with
/// two. Thousands-separated either way.
pub fn format_number(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();
    if abs.fract() == 0.0 {
        format!("{}{}", sign, group_thousands(&format!("{:.0}", abs)))
    } else {
        let formatted = format!("{:.2}", abs);
        let (int_part, frac_part) =
            formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
        format!("{}{}.{}", sign, group_thousands(int_part), frac_part)
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================

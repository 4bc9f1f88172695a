// CSV ingestion and the descriptive-statistics text that feeds the analysis
// prompt. A column counts as numeric when every non-empty cell parses as a
// float; statistics follow the usual spreadsheet conventions (sample standard
// deviation, linearly interpolated quantiles).

use csv::ReaderBuilder;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("the uploaded file contains no columns")]
    Empty,
}

/// An uploaded tabular dataset: named columns over rows of string cells.
#[derive(Debug, Clone)]
pub struct DataTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Bounded preview of a table, serialized for the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

const NUMERIC_STAT_LABELS: [&str; 8] =
    ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
const OBJECT_STAT_LABELS: [&str; 4] = ["count", "unique", "top", "freq"];

impl DataTable {
    /// Parse comma-separated text. Ragged rows, invalid UTF-8 and header-less
    /// input all fail; the caller keeps its previous table in that case.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let mut reader = ReaderBuilder::new().from_reader(bytes);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ParseError::Empty);
        }
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn preview(&self, limit: usize) -> TablePreview {
        TablePreview {
            columns: self.headers.clone(),
            rows: self.rows.iter().take(limit).cloned().collect(),
            total_rows: self.rows.len(),
        }
    }

    fn column_cells(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter_map(move |row| row.get(index))
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty())
    }

    /// Numeric values of a column, or None when any non-empty cell fails to
    /// parse (the column is then treated as text). Empty cells and literal
    /// NaNs count as missing; a column with nothing but missing cells is
    /// still numeric and summarized with count 0 and NaN statistics.
    fn numeric_column(&self, index: usize) -> Option<Vec<f64>> {
        let mut values = Vec::new();
        for cell in self.column_cells(index) {
            let value: f64 = cell.parse().ok()?;
            if !value.is_nan() {
                values.push(value);
            }
        }
        Some(values)
    }

    /// Descriptive statistics rendered as text, one column per numeric column
    /// with count/mean/std/min/quartiles/max. Falls back to count/unique/top/
    /// freq over every column when the table has no numeric columns.
    pub fn describe(&self) -> String {
        let mut columns = Vec::new();
        for (index, name) in self.headers.iter().enumerate() {
            if let Some(mut values) = self.numeric_column(index) {
                values.sort_by(f64::total_cmp);
                columns.push((name.as_str(), summarize(&values)));
            }
        }
        if columns.is_empty() {
            return self.describe_objects();
        }
        let formatted: Vec<(&str, Vec<String>)> = columns
            .into_iter()
            .map(|(name, stats)| (name, stats.iter().map(|v| format_stat(*v)).collect()))
            .collect();
        render_stat_table(&NUMERIC_STAT_LABELS, &formatted)
    }

    fn describe_objects(&self) -> String {
        let formatted: Vec<(&str, Vec<String>)> = self
            .headers
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let cells: Vec<&str> = self.column_cells(index).collect();
                let mut counts: Vec<(&str, usize)> = Vec::new();
                for &cell in &cells {
                    if let Some(entry) = counts.iter_mut().find(|entry| entry.0 == cell) {
                        entry.1 += 1;
                    } else {
                        counts.push((cell, 1));
                    }
                }
                let (top, freq) = counts
                    .iter()
                    .max_by_key(|(_, count)| *count)
                    .map(|(value, count)| (value.to_string(), count.to_string()))
                    .unwrap_or_else(|| ("NaN".to_string(), "NaN".to_string()));
                let stats = vec![
                    cells.len().to_string(),
                    counts.len().to_string(),
                    top,
                    freq,
                ];
                (name.as_str(), stats)
            })
            .collect();
        render_stat_table(&OBJECT_STAT_LABELS, &formatted)
    }
}

/// count, mean, std, min, 25%, 50%, 75%, max over sorted values.
fn summarize(sorted: &[f64]) -> Vec<f64> {
    let n = sorted.len();
    if n == 0 {
        let mut stats = vec![f64::NAN; 8];
        stats[0] = 0.0;
        return stats;
    }
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std = if n < 2 {
        f64::NAN
    } else {
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        variance.sqrt()
    };
    vec![
        n as f64,
        mean,
        std,
        sorted[0],
        quantile(sorted, 0.25),
        quantile(sorted, 0.5),
        quantile(sorted, 0.75),
        sorted[n - 1],
    ]
}

/// Linearly interpolated quantile over sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let low = position.floor() as usize;
    let high = position.ceil() as usize;
    if low == high {
        sorted[low]
    } else {
        sorted[low] + (position - low as f64) * (sorted[high] - sorted[low])
    }
}

fn format_stat(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.6}", value)
    }
}

/// Stat labels down the left, one right-aligned column per table column.
fn render_stat_table(labels: &[&str], columns: &[(&str, Vec<String>)]) -> String {
    let label_width = labels.iter().map(|l| l.len()).max().unwrap_or(0);
    let widths: Vec<usize> = columns
        .iter()
        .map(|(name, stats)| {
            stats
                .iter()
                .map(String::len)
                .chain(std::iter::once(name.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = " ".repeat(label_width);
    for ((name, _), width) in columns.iter().zip(&widths) {
        out.push_str(&format!("  {:>width$}", name, width = *width));
    }
    for (row, label) in labels.iter().enumerate() {
        out.push('\n');
        out.push_str(&format!("{:<width$}", label, width = label_width));
        for ((_, stats), width) in columns.iter().zip(&widths) {
            out.push_str(&format!("  {:>width$}", stats[row], width = *width));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(csv: &str) -> DataTable {
        DataTable::parse(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_basic_csv() {
        let table = parse("name,age\nalice,30\nbob,25\n");
        assert_eq!(table.headers(), ["name", "age"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        let result = DataTable::parse(b"a,b\n1,2\n3\n");
        assert!(matches!(result, Err(ParseError::Csv(_))));
    }

    #[test]
    fn test_parse_rejects_empty_input() {
        assert!(matches!(DataTable::parse(b""), Err(ParseError::Empty)));
    }

    #[test]
    fn test_parse_rejects_invalid_utf8() {
        let result = DataTable::parse(&[0x61, 0x2c, 0x62, 0x0a, 0xff, 0xfe, 0x2c, 0x31]);
        assert!(matches!(result, Err(ParseError::Csv(_))));
    }

    #[test]
    fn test_headers_without_rows_are_accepted() {
        let table = parse("a,b\n");
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_preview_is_bounded() {
        let table = parse("n\n1\n2\n3\n4\n5\n6\n7\n");
        let preview = table.preview(5);
        assert_eq!(preview.rows.len(), 5);
        assert_eq!(preview.total_rows, 7);
        assert_eq!(preview.columns, ["n"]);
        assert_eq!(preview.rows[0], ["1"]);
    }

    #[test]
    fn test_describe_numeric_column() {
        let table = parse("x\n1\n2\n3\n4\n5\n");
        let stats = table.describe();
        assert!(stats.contains("count"), "{stats}");
        assert!(stats.contains("5.000000"), "{stats}");
        assert!(stats.contains("mean"), "{stats}");
        assert!(stats.contains("3.000000"), "{stats}");
        // Sample standard deviation of 1..=5 is sqrt(2.5).
        assert!(stats.contains("1.581139"), "{stats}");
        assert!(stats.contains("25%"), "{stats}");
        assert!(stats.contains("2.000000"), "{stats}");
        assert!(stats.contains("4.000000"), "{stats}");
    }

    #[test]
    fn test_describe_interpolates_quantiles() {
        let table = parse("x\n10\n20\n");
        let stats = table.describe();
        assert!(stats.contains("12.500000"), "{stats}");
        assert!(stats.contains("15.000000"), "{stats}");
        assert!(stats.contains("17.500000"), "{stats}");
    }

    #[test]
    fn test_describe_skips_text_columns() {
        let table = parse("city,pop\noslo,700000\nbergen,290000\n");
        let stats = table.describe();
        assert!(stats.contains("pop"), "{stats}");
        assert!(!stats.contains("city"), "{stats}");
    }

    #[test]
    fn test_describe_single_value_std_is_nan() {
        let table = parse("x\n42\n");
        let stats = table.describe();
        assert!(stats.contains("NaN"), "{stats}");
        assert!(stats.contains("42.000000"), "{stats}");
    }

    #[test]
    fn test_describe_ignores_empty_cells() {
        let table = parse("x,y\n1,a\n,b\n3,c\n");
        let stats = table.describe();
        // Two non-empty values in x: count 2, mean 2.
        assert!(stats.contains("2.000000"), "{stats}");
    }

    #[test]
    fn test_describe_keeps_all_empty_columns_with_zero_count() {
        let table = parse("x,y\n1,\n2,\n");
        let stats = table.describe();
        // y has no values: it still shows up, with count 0 and NaN stats.
        assert!(stats.contains("y"), "{stats}");
        assert!(stats.contains("0.000000"), "{stats}");
        assert!(stats.contains("NaN"), "{stats}");
        // x is unaffected.
        assert!(stats.contains("1.500000"), "{stats}");
    }

    #[test]
    fn test_describe_text_only_falls_back_to_object_stats() {
        let table = parse("fruit\napple\nbanana\napple\n");
        let stats = table.describe();
        assert!(stats.contains("unique"), "{stats}");
        assert!(stats.contains("top"), "{stats}");
        assert!(stats.contains("apple"), "{stats}");
        assert!(stats.contains("freq"), "{stats}");
    }
}

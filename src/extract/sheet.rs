//! Tabular previews for CSV files and Excel workbooks
//!
//! The first row is the header. Previews show at most `max_rows` data rows
//! as left-aligned, space-padded columns.

use super::office::{self, Worksheet};
use anyhow::{Context, Result};

/// A header plus data rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Column names
    pub header: Vec<String>,
    /// Data rows
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Split the first row off as the header
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let header = rows.remove(0);
        Self { header, rows }
    }

    /// True when there is neither a header nor data
    pub fn is_empty(&self) -> bool {
        self.header.iter().all(|h| h.trim().is_empty()) && self.rows.is_empty()
    }

    /// Render the header and the first `max_rows` rows
    ///
    /// # Examples
    ///
    /// ```
    /// use confab::extract::sheet::Table;
    ///
    /// let table = Table::from_rows(vec![
    ///     vec!["name".into(), "qty".into()],
    ///     vec!["apple".into(), "3".into()],
    /// ]);
    /// assert_eq!(table.preview(50), "name   qty\napple  3");
    /// ```
    pub fn preview(&self, max_rows: usize) -> String {
        let shown = &self.rows[..self.rows.len().min(max_rows)];
        let columns = std::iter::once(&self.header)
            .chain(shown)
            .map(Vec::len)
            .max()
            .unwrap_or(0);

        let mut widths = vec![0usize; columns];
        for row in std::iter::once(&self.header).chain(shown) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let mut lines: Vec<String> = std::iter::once(&self.header)
            .chain(shown)
            .map(|row| render_row(row, &widths))
            .collect();

        if self.rows.len() > shown.len() {
            lines.push(format!("[{} of {} rows shown]", shown.len(), self.rows.len()));
        }
        lines.join("\n")
    }
}

fn render_row(row: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, width) in widths.iter().enumerate() {
        let cell = row.get(i).map(String::as_str).unwrap_or("");
        if i > 0 {
            line.push_str("  ");
        }
        line.push_str(cell);
        let pad = width.saturating_sub(cell.chars().count());
        line.extend(std::iter::repeat(' ').take(pad));
    }
    line.trim_end().to_string()
}

/// Parse CSV bytes into a table
pub fn parse_csv(bytes: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let header = reader
        .headers()
        .context("failed to read CSV header")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("bad CSV record {}", line + 1))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { header, rows })
}

/// Preview of a CSV file
pub fn csv_preview(bytes: &[u8], max_rows: usize) -> Result<String> {
    let table = parse_csv(bytes)?;
    if table.is_empty() {
        return Ok(String::new());
    }
    Ok(table.preview(max_rows))
}

/// Preview of every sheet in a workbook, each under a `Sheet: <name>` line
pub fn xlsx_preview(bytes: &[u8], max_rows: usize) -> Result<String> {
    let sheets = office::xlsx_sheets(bytes)?;
    Ok(render_sheets(sheets, max_rows))
}

fn render_sheets(sheets: Vec<Worksheet>, max_rows: usize) -> String {
    let mut out = String::new();
    for sheet in sheets {
        let table = Table::from_rows(sheet.rows);
        out.push_str(&format!("Sheet: {}\n", sheet.name));
        if table.is_empty() {
            out.push_str("(empty sheet)\n");
        } else {
            out.push_str(&table.preview(max_rows));
            out.push('\n');
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

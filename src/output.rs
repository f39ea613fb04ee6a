//! Result post-processing and rendering.
//!
//! Report builders hand over vectors of typed rows (anything implementing
//! [`Row`]); this module applies the user-requested sort and limit, writes
//! the optional CSV export, and prints a psql-style table. Sort and limit
//! are generic and schema-checked: sorting by a column the row type does not
//! declare is a validation error, not a silent no-op.

use chrono::Local;
use colored::Colorize;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// One table cell. Columns are homogeneous: a given column position always
/// produces the same variant, so ordering only ever compares like variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Count(u64),
    Flag(bool),
}

impl Cell {
    pub fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Count(n) => n.to_string(),
            Cell::Flag(b) => if *b { "True" } else { "False" }.to_string(),
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Cell::Count(_))
    }

    fn compare(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Count(a), Cell::Count(b)) => a.cmp(b),
            (Cell::Flag(a), Cell::Flag(b)) => a.cmp(b),
            _ => self.render().cmp(&other.render()),
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        Cell::Count(value)
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Count(value as u64)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Flag(value)
    }
}

/// A report row with a fixed column schema.
pub trait Row {
    fn headers() -> &'static [&'static str]
    where
        Self: Sized;
    fn cells(&self) -> Vec<Cell>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        match token.to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(Error::SortDirection(token.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// What to do with the finished rows, common to every report subcommand.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    pub sortkey: Option<SortKey>,
    pub limit: Option<usize>,
    /// `Some(None)` means save under a generated `{command}_{timestamp}.csv`.
    pub save: Option<Option<PathBuf>>,
    pub quiet: bool,
    /// Used for the generated CSV filename, e.g. "vacuum_models".
    pub command: String,
}

/// Stable sort by a named column. No-op without a sort key; unknown columns
/// and direction tokens are validation errors.
pub fn sort_rows<R: Row>(mut rows: Vec<R>, sortkey: Option<&SortKey>) -> Result<Vec<R>> {
    let Some(sortkey) = sortkey else {
        return Ok(rows);
    };
    let index = R::headers()
        .iter()
        .position(|h| *h == sortkey.field)
        .ok_or_else(|| Error::SortField(sortkey.field.clone()))?;

    rows.sort_by(|a, b| {
        let ordering = a.cells()[index].compare(&b.cells()[index]);
        match sortkey.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    Ok(rows)
}

/// First `n` rows; identity when no limit was requested.
pub fn limit_rows<R>(mut rows: Vec<R>, limit: Option<usize>) -> Vec<R> {
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}

/// Write rows as CSV. Multi-line cell values (join/field listings) are
/// flattened to comma-joined single lines first.
pub fn save_csv<R: Row>(rows: &[R], path: &Path) -> Result<()> {
    let mut out = String::new();
    out.push_str(&R::headers().join(","));
    out.push('\n');
    for row in rows {
        let line: Vec<String> = row
            .cells()
            .iter()
            .map(|cell| csv_escape(&cell.render().replace('\n', ",")))
            .collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    fs::write(path, out)?;
    Ok(())
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Generated export filename, e.g. `vacuum_models_240131_093015.csv`.
pub fn default_csv_name(command: &str) -> String {
    format!("{command}_{}.csv", Local::now().format("%y%m%d_%H%M%S"))
}

/// Sort, limit, export and print one report's rows.
pub fn emit<R: Row>(rows: Vec<R>, options: &OutputOptions) -> Result<()> {
    let rows = sort_rows(rows, options.sortkey.as_ref())?;
    let rows = limit_rows(rows, options.limit);

    if let Some(save) = &options.save {
        let path = match save {
            Some(path) => path.clone(),
            None => PathBuf::from(default_csv_name(&options.command)),
        };
        save_csv(&rows, &path)?;
        eprintln!("Saved results to {}", path.display());
    }

    if !options.quiet {
        print_rows(&rows);
    }
    Ok(())
}

pub fn print_rows<R: Row>(rows: &[R]) {
    let rendered: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.cells().iter().map(Cell::render).collect())
        .collect();
    let numeric: Vec<bool> = match rows.first() {
        Some(row) => row.cells().iter().map(Cell::is_numeric).collect(),
        None => Vec::new(),
    };
    print_table(R::headers(), &rendered, &numeric);
}

/// Print rows straight out of an inline query, in the column order the query
/// asked for. Missing keys render empty.
pub fn print_query_rows(rows: &[serde_json::Value], columns: &[&str]) {
    let rendered: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|key| match row.get(*key) {
                    None | Some(serde_json::Value::Null) => String::new(),
                    Some(serde_json::Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                })
                .collect()
        })
        .collect();
    let numeric = vec![false; columns.len()];
    print_table(columns, &rendered, &numeric);
}

fn print_table(headers: &[&str], rows: &[Vec<String>], numeric: &[bool]) {
    if rows.is_empty() {
        println!("No results found.\n");
        return;
    }
    println!("{}\n", render_table(headers, rows, numeric));
}

/// Render a psql-style grid. Cells may span multiple lines; continuation
/// lines stay inside the same logical row. Numeric columns are centered.
pub fn render_table(headers: &[&str], rows: &[Vec<String>], numeric: &[bool]) -> String {
    let split_rows: Vec<Vec<Vec<String>>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.split('\n').map(str::to_string).collect())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            split_rows
                .iter()
                .flat_map(|row| row.get(col).into_iter().flatten())
                .map(String::len)
                .max()
                .unwrap_or(0)
                .max(header.len())
        })
        .collect();

    let segments: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
    let border = format!("+{}+", segments.join("+"));
    // psql keeps '+' at interior junctions of the header separator only.
    let separator = format!("|{}|", segments.join("+"));

    let mut lines = Vec::new();
    lines.push(border.clone());
    lines.push(format_line(
        &headers.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
        &widths,
        &vec![false; widths.len()],
    ));
    lines.push(separator);

    for row in &split_rows {
        let height = row.iter().map(Vec::len).max().unwrap_or(1);
        for line_no in 0..height {
            let cells: Vec<String> = (0..widths.len())
                .map(|col| {
                    row.get(col)
                        .and_then(|cell| cell.get(line_no))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect();
            lines.push(format_line(&cells, &widths, numeric));
        }
    }
    lines.push(border);
    lines.join("\n")
}

fn format_line(cells: &[String], widths: &[usize], numeric: &[bool]) -> String {
    let formatted: Vec<String> = cells
        .iter()
        .zip(widths.iter().copied())
        .enumerate()
        .map(|(col, (cell, width))| {
            if numeric.get(col).copied().unwrap_or(false) {
                format!(" {cell:^width$} ")
            } else {
                format!(" {cell:<width$} ")
            }
        })
        .collect();
    format!("|{}|", formatted.join("|"))
}

/// Progressive section header used by the pulse checks.
pub fn print_check_header(text: &str) {
    println!("{}", text.bold());
}

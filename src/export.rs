//! Writing fetched tables to the output directory.

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use rust_xlsxwriter::Workbook;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Spreadsheet tools only detect UTF-8 in delimited files with a BOM.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
  #[default]
  Csv,
  Tsv,
  Json,
  Xlsx,
}

impl OutputFormat {
  pub fn extension(&self) -> &'static str {
    match self {
      OutputFormat::Csv => "csv",
      OutputFormat::Tsv => "tsv",
      OutputFormat::Json => "json",
      OutputFormat::Xlsx => "xlsx",
    }
  }
}

/// A row type with a fixed set of named columns.
pub trait Tabular {
  fn headers() -> &'static [&'static str];

  /// One string per header; missing values are empty.
  fn cells(&self) -> Vec<String>;

  /// Columns written as text in spreadsheets even when a cell looks numeric,
  /// such as stock codes.
  fn text_columns() -> &'static [usize] {
    &[]
  }
}

/// Writes tables as `<dir>/<name>.<ext>`.
#[derive(Debug, Clone)]
pub struct Exporter {
  dir: PathBuf,
  format: OutputFormat,
}

impl Exporter {
  pub fn new(dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
    Self {
      dir: dir.into(),
      format,
    }
  }

  pub fn path_for(&self, name: &str) -> PathBuf {
    self
      .dir
      .join(format!("{}.{}", sanitize_file_name(name), self.format.extension()))
  }

  pub fn save<T: Tabular>(&self, rows: &[T], name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(&self.dir)
      .map_err(|e| eyre!("Failed to create output directory {}: {}", self.dir.display(), e))?;

    let path = self.path_for(name);
    match self.format {
      OutputFormat::Csv => write_delimited(&path, b',', rows)?,
      OutputFormat::Tsv => write_delimited(&path, b'\t', rows)?,
      OutputFormat::Json => write_json(&path, rows)?,
      OutputFormat::Xlsx => write_xlsx(&path, rows)?,
    }

    info!("Saved {} rows to {}", rows.len(), path.display());
    Ok(path)
  }
}

/// Board names may contain characters that are path separators.
fn sanitize_file_name(name: &str) -> String {
  name
    .chars()
    .map(|c| match c {
      '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
      c => c,
    })
    .collect()
}

fn write_delimited<T: Tabular>(path: &Path, delimiter: u8, rows: &[T]) -> Result<()> {
  let mut file = std::fs::File::create(path)
    .map_err(|e| eyre!("Failed to create {}: {}", path.display(), e))?;
  file
    .write_all(UTF8_BOM)
    .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;

  let mut writer = csv::WriterBuilder::new()
    .delimiter(delimiter)
    .from_writer(file);
  writer.write_record(T::headers())?;
  for row in rows {
    writer.write_record(row.cells())?;
  }
  writer
    .flush()
    .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;
  Ok(())
}

/// JSON output is an array of header → cell objects.
fn write_json<T: Tabular>(path: &Path, rows: &[T]) -> Result<()> {
  let objects: Vec<serde_json::Map<String, serde_json::Value>> = rows
    .iter()
    .map(|row| {
      T::headers()
        .iter()
        .zip(row.cells())
        .map(|(h, c)| (h.to_string(), serde_json::Value::String(c)))
        .collect()
    })
    .collect();

  let data = serde_json::to_vec_pretty(&objects)?;
  std::fs::write(path, data).map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;
  Ok(())
}

/// One header row, then one row per record on a single sheet.
fn write_xlsx<T: Tabular>(path: &Path, rows: &[T]) -> Result<()> {
  let mut workbook = Workbook::new();
  let sheet = workbook.add_worksheet();

  for (col, header) in T::headers().iter().enumerate() {
    sheet.write_string(0, col as u16, *header)?;
  }
  for (i, row) in rows.iter().enumerate() {
    let r = i as u32 + 1;
    for (col, cell) in row.cells().iter().enumerate() {
      if cell.is_empty() {
        continue;
      }
      let number = if T::text_columns().contains(&col) {
        None
      } else {
        spreadsheet_number(cell)
      };
      match number {
        Some(n) => sheet.write_number(r, col as u16, n)?,
        None => sheet.write_string(r, col as u16, cell)?,
      };
    }
  }

  workbook
    .save(path)
    .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;
  Ok(())
}

fn spreadsheet_number(cell: &str) -> Option<f64> {
  cell.parse::<f64>().ok().filter(|n| n.is_finite())
}

use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Range, Reader};

use crate::error::{CaixaError, Result};
use crate::models::{Cell, RawRow};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayloadFormat {
    /// xlsx, xlsm, xls, xlsb or ods; only the first sheet is read.
    Workbook,
    /// A single sheet of comma-separated text.
    Csv,
}

impl PayloadFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Workbook,
        }
    }
}

/// Decode an uploaded payload into rows keyed by the header in row 1.
pub fn parse_rows(payload: &[u8], format: PayloadFormat) -> Result<Vec<RawRow>> {
    match format {
        PayloadFormat::Workbook => parse_workbook(payload),
        PayloadFormat::Csv => parse_csv(payload),
    }
}

fn parse_workbook(payload: &[u8]) -> Result<Vec<RawRow>> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(payload.to_vec()))
        .map_err(|e| CaixaError::Parse(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CaixaError::Parse("workbook has no sheets".to_string()))?
        .map_err(|e| CaixaError::Parse(e.to_string()))?;
    Ok(rows_from_range(&range))
}

/// Rows below the header in sheet row 1, numbered by sheet position. When the
/// used range starts lower, row 1 is blank and no column has a name, so every
/// remaining row reads as missing its columns.
pub(crate) fn rows_from_range(range: &Range<Data>) -> Vec<RawRow> {
    let Some((first_row, _)) = range.start() else {
        return Vec::new();
    };
    let mut rows = range.rows();
    let mut sheet_row = first_row as usize + 1;
    let columns: Vec<String> = if first_row == 0 {
        let Some(header) = rows.next() else {
            return Vec::new();
        };
        sheet_row += 1;
        header.iter().map(|d| d.to_string().trim().to_string()).collect()
    } else {
        log::warn!("sheet row 1 is blank, reading rows without a header");
        Vec::new()
    };

    let mut out = Vec::new();
    for row in rows {
        let number = sheet_row;
        sheet_row += 1;
        if row.iter().all(|d| cell_from_data(d).is_empty()) {
            continue;
        }
        let cells: Vec<(String, Cell)> = columns
            .iter()
            .zip(row.iter())
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, data)| (name.clone(), cell_from_data(data)))
            .collect();
        out.push(RawRow { row: number, cells });
    }
    out
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}

fn parse_csv(payload: &[u8]) -> Result<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(payload);
    let mut records = rdr.records();
    let Some(header) = records.next() else {
        return Ok(Vec::new());
    };
    let columns: Vec<String> = header?.iter().map(|f| f.trim().to_string()).collect();

    let mut out = Vec::new();
    for (i, result) in records.enumerate() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let row = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(i + 2);
        let cells: Vec<(String, Cell)> = columns
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(idx, name)| (name.clone(), Cell::text(record.get(idx).unwrap_or(""))))
            .collect();
        out.push(RawRow { row, cells });
    }
    Ok(out)
}

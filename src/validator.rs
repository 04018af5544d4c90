use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{CaixaError, Result};
use crate::fmt::plain_number;
use crate::models::{Cell, EntryInput, NewEntry, RawRow, RowError};

pub const COL_DATE: &str = "Data";
pub const COL_AMOUNT: &str = "Valor";
pub const COL_PAYMENT_METHOD: &str = "FormaPag";
pub const COL_ORIGIN: &str = "Origem";
pub const COL_DESCRIPTION: &str = "Descrição";

pub const REQUIRED_COLUMNS: [&str; 4] = [COL_DATE, COL_AMOUNT, COL_PAYMENT_METHOD, COL_ORIGIN];

pub const MISSING_REQUIRED: &str = "missing required column";

/// Brazilian layout: `1.234,56`, `1234,5`, `1.200` (dots group thousands).
const BR_AMOUNT: &str = r"^-?(\d{1,3}(\.\d{3})+|\d+)(,\d+)?$";
/// Plain layout: `1234.56`, `-7`.
const PLAIN_AMOUNT: &str = r"^-?\d+(\.\d+)?$";

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Parse an amount written as `1234.56` or in Brazilian style `R$ 1.234,56`.
/// Parenthesized values are negative. Any other layout, such as `1,234.56`,
/// is refused rather than guessed.
pub fn parse_amount(raw: &str) -> Option<f64> {
    static BR: OnceLock<Option<Regex>> = OnceLock::new();
    static PLAIN: OnceLock<Option<Regex>> = OnceLock::new();

    let s = raw.replace("R$", "").replace(' ', "");
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };
    let normalized = if compiled(&BR, BR_AMOUNT)?.is_match(s) {
        s.replace('.', "").replace(',', ".")
    } else if compiled(&PLAIN, PLAIN_AMOUNT)?.is_match(s) {
        s.to_string()
    } else {
        return None;
    };
    let value: f64 = normalized.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // ISO timestamps carry the date before the 'T'
    let day = raw.split(['T', ' ']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(day, "%d/%m/%Y"))
        .ok()
}

/// One past the serial of 9999-12-31, the last day a workbook can hold.
const EXCEL_SERIAL_END: f64 = 2_958_466.0;

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..EXCEL_SERIAL_END).contains(&serial) {
        return None;
    }
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::try_days(serial.trunc() as i64)?)
}

fn cell_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Text(s) => parse_date(s),
        Cell::Number(n) => excel_serial_to_date(*n),
        Cell::Empty => None,
    }
}

fn cell_amount(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) => parse_amount(s),
        _ => None,
    }
}

fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.trim().to_string(),
        Cell::Number(n) => plain_number(*n),
        Cell::Empty => String::new(),
    }
}

/// Turn one sheet row into an entry for `owner_id`, or say why it cannot be one.
pub fn validate(row: &RawRow, owner_id: &str) -> std::result::Result<NewEntry, RowError> {
    let reject = |reason: String| RowError { row: row.row, reason };

    if REQUIRED_COLUMNS.iter().any(|col| row.get(col).is_empty()) {
        return Err(reject(MISSING_REQUIRED.to_string()));
    }

    let date_cell = row.get(COL_DATE);
    let date = cell_date(date_cell).ok_or_else(|| reject(format!("invalid date: {date_cell}")))?;

    let amount_cell = row.get(COL_AMOUNT);
    let amount =
        cell_amount(amount_cell).ok_or_else(|| reject(format!("invalid amount: {amount_cell}")))?;

    Ok(NewEntry {
        owner_id: owner_id.to_string(),
        date,
        amount,
        payment_method: cell_text(row.get(COL_PAYMENT_METHOD)),
        origin: cell_text(row.get(COL_ORIGIN)),
        description: cell_text(row.get(COL_DESCRIPTION)),
    })
}

/// Validate the single-entry creation body with the same rules as a sheet row.
pub fn validate_input(input: &EntryInput, owner_id: &str) -> Result<NewEntry> {
    if owner_id.trim().is_empty() {
        return Err(CaixaError::MissingOwner);
    }
    let date = parse_date(&input.data)
        .ok_or_else(|| CaixaError::InvalidEntry(format!("invalid date: {}", input.data)))?;
    if !input.valor.is_finite() {
        return Err(CaixaError::InvalidEntry("invalid amount".to_string()));
    }
    let payment_method = input.forma_pag.trim();
    let origin = input.origem.trim();
    if payment_method.is_empty() || origin.is_empty() {
        return Err(CaixaError::InvalidEntry(MISSING_REQUIRED.to_string()));
    }
    Ok(NewEntry {
        owner_id: owner_id.to_string(),
        date,
        amount: input.valor,
        payment_method: payment_method.to_string(),
        origin: origin.to_string(),
        description: input.descricao.trim().to_string(),
    })
}

use comfy_table::{Cell, Table};

use crate::error::{CaixaError, Result};
use crate::fmt::money;
use crate::models::{EntryFilter, EntryInput};
use crate::settings::load_settings;
use crate::store::EntryRepository;
use crate::validator::{parse_date, validate_input};

pub fn add(owner: &str, input: &EntryInput) -> Result<()> {
    let settings = load_settings();
    let store = super::open_store(&settings)?;

    let new_entry = validate_input(input, owner)?;
    let entry = store.insert_entry(&new_entry)?;
    println!(
        "Added entry {}: {} {} via {} ({})",
        entry.id,
        entry.date,
        money(entry.amount),
        entry.payment_method,
        entry.origin
    );

    match super::dispatcher(&settings) {
        Ok(dispatcher) => {
            if let Some(report) = super::notify_created(&dispatcher, &store, &entry) {
                if report.delivered() + report.failed() > 0 {
                    println!("{} alerts sent, {} failed", report.delivered(), report.failed());
                }
            }
        }
        Err(e) => log::warn!("push alerts disabled: {e}"),
    }
    Ok(())
}

/// Split a comma-separated allow-list, dropping blanks.
pub(crate) fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

pub(crate) fn build_filter(
    inicio: Option<&str>,
    fim: Option<&str>,
    formas: Option<&str>,
    origens: Option<&str>,
) -> Result<EntryFilter> {
    let date = |raw: Option<&str>| -> Result<Option<chrono::NaiveDate>> {
        raw.map(|r| parse_date(r).ok_or_else(|| CaixaError::Other(format!("invalid date: {r}"))))
            .transpose()
    };
    Ok(EntryFilter {
        from: date(inicio)?,
        to: date(fim)?,
        payment_methods: split_list(formas),
        origins: split_list(origens),
    })
}

pub fn list(
    owner: &str,
    inicio: Option<&str>,
    fim: Option<&str>,
    formas: Option<&str>,
    origens: Option<&str>,
) -> Result<()> {
    let settings = load_settings();
    let store = super::open_store(&settings)?;
    let filter = build_filter(inicio, fim, formas, origens)?;
    let entries = store.query_entries(owner, &filter)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Data", "Valor", "Forma", "Origem", "Descrição"]);
    for e in &entries {
        table.add_row(vec![
            Cell::new(e.id),
            Cell::new(e.date.format("%d/%m/%Y")),
            Cell::new(money(e.amount)),
            Cell::new(&e.payment_method),
            Cell::new(&e.origin),
            Cell::new(&e.description),
        ]);
    }
    let total: f64 = entries.iter().map(|e| e.amount).sum();
    println!("Lançamentos\n{table}");
    println!("{} entries, total {}", entries.len(), money(total));
    Ok(())
}

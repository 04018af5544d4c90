use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::rules::Rule;

/// A persisted cash-register entry (lançamento).
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: i64,
    pub owner_id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub payment_method: String,
    pub origin: String,
    pub description: String,
}

/// A validated entry that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub owner_id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub payment_method: String,
    pub origin: String,
    pub description: String,
}

impl NewEntry {
    pub fn into_entry(self, id: i64) -> Entry {
        Entry {
            id,
            owner_id: self.owner_id,
            date: self.date,
            amount: self.amount,
            payment_method: self.payment_method,
            origin: self.origin,
            description: self.description,
        }
    }
}

/// Body of the single-entry creation path.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryInput {
    pub data: String,
    pub valor: f64,
    pub forma_pag: String,
    pub origem: String,
    #[serde(default)]
    pub descricao: String,
}

/// One spreadsheet cell, reduced to what validation cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    pub fn text(value: &str) -> Self {
        if value.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => f.write_str(&crate::fmt::plain_number(*n)),
            Cell::Empty => Ok(()),
        }
    }
}

/// A sheet row keyed by header name, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based sheet row number; the header is row 1.
    pub row: usize,
    pub cells: Vec<(String, Cell)>,
}

impl RawRow {
    /// Cell under `column`; columns absent from the sheet read as empty.
    pub fn get(&self, column: &str) -> &Cell {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
            .unwrap_or(&Cell::Empty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    #[serde(rename = "importedCount")]
    pub imported_count: usize,
    #[serde(rename = "errorRows")]
    pub error_rows: Vec<RowError>,
}

/// Endpoint plus the two subscriber keys. The keys are opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushAddress {
    pub endpoint: String,
    pub keys: PushKeys,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub id: i64,
    pub owner_id: String,
    pub device_id: String,
    pub address: PushAddress,
    pub rules: Vec<Rule>,
}

/// Body of the subscription registration path.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionInput {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub subscription: PushAddress,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// Rule set is empty; never attempted.
    NoRules,
    NoMatch,
    Delivered,
    Failed(String),
    /// Deadline passed before the attempt started.
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionOutcome {
    pub subscription_id: i64,
    pub device_id: String,
    pub outcome: DeliveryOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub outcomes: Vec<SubscriptionOutcome>,
}

impl DispatchReport {
    pub fn count(&self, pred: impl Fn(&DeliveryOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }

    pub fn delivered(&self) -> usize {
        self.count(|o| *o == DeliveryOutcome::Delivered)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Failed(_)))
    }
}

/// Filters for the entry listing; every field is optional.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub payment_methods: Vec<String>,
    pub origins: Vec<String>,
}

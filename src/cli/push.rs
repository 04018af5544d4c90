use comfy_table::{Cell, Table};

use crate::error::{CaixaError, Result};
use crate::models::{DeliveryOutcome, SubscriptionInput};
use crate::rules::Rule;
use crate::settings::load_settings;

fn read_body(body: &str) -> Result<String> {
    match body.strip_prefix('@') {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(body.to_string()),
    }
}

pub fn register(owner: &str, body: &str) -> Result<()> {
    let settings = load_settings();
    let store = super::open_store(&settings)?;
    let input: SubscriptionInput = serde_json::from_str(&read_body(body)?)
        .map_err(|e| CaixaError::Other(format!("invalid subscription: {e}")))?;
    let sub = store.register_subscription(owner, &input)?;
    println!("Registered subscription {} for device {}", sub.id, sub.device_id);
    Ok(())
}

pub fn rule_add(
    owner: &str,
    subscription: i64,
    tipo: &str,
    operador: Option<&str>,
    valor: &str,
) -> Result<()> {
    let settings = load_settings();
    let store = super::open_store(&settings)?;
    let rule = Rule::from_input(tipo, operador, valor)?;
    store.append_rule(owner, subscription, &rule)?;
    println!("Added rule {} to subscription {subscription}: {}", rule.id, rule.describe());
    Ok(())
}

pub fn rules(owner: &str, subscription: i64) -> Result<()> {
    let settings = load_settings();
    let store = super::open_store(&settings)?;
    let sub = store.subscription(owner, subscription)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Rule"]);
    for rule in &sub.rules {
        table.add_row(vec![Cell::new(&rule.id), Cell::new(rule.describe())]);
    }
    println!("Rules for {} ({})\n{table}", sub.device_id, sub.owner_id);
    Ok(())
}

pub fn send(owner: &str, entry_id: i64) -> Result<()> {
    let settings = load_settings();
    let store = super::open_store(&settings)?;
    let entry = store.entry(owner, entry_id)?;
    let dispatcher = super::dispatcher(&settings)?;
    let report = dispatcher.dispatch(&store, &entry)?;

    let mut table = Table::new();
    table.set_header(vec!["Subscription", "Device", "Outcome"]);
    for o in &report.outcomes {
        let outcome = match &o.outcome {
            DeliveryOutcome::NoRules => "no rules".to_string(),
            DeliveryOutcome::NoMatch => "no match".to_string(),
            DeliveryOutcome::Delivered => "sent".to_string(),
            DeliveryOutcome::Failed(reason) => format!("failed: {reason}"),
            DeliveryOutcome::NotAttempted => "deadline reached".to_string(),
        };
        table.add_row(vec![Cell::new(o.subscription_id), Cell::new(&o.device_id), Cell::new(outcome)]);
    }
    println!("Alerts for entry {entry_id}\n{table}");
    Ok(())
}

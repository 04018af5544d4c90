use serde::{Deserialize, Serialize};

use crate::error::{CaixaError, Result};
use crate::models::Entry;

#[derive(Debug, Clone, PartialEq)]
pub enum Comparator {
    Gte,
    Lte,
    Gt,
    Lt,
    Eq,
    /// Anything else found in storage. Never matches.
    Unknown(String),
}

impl Comparator {
    pub fn parse(op: &str) -> Self {
        match op.trim() {
            ">=" => Self::Gte,
            "<=" => Self::Lte,
            ">" => Self::Gt,
            "<" => Self::Lt,
            "==" => Self::Eq,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Eq => "==",
            Self::Unknown(op) => op,
        }
    }

    fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Gte => lhs >= rhs,
            Self::Lte => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Lt => lhs < rhs,
            Self::Eq => lhs == rhs,
            Self::Unknown(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    AmountThreshold { comparator: Comparator, threshold: f64 },
    PaymentMethodEquals { target: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: String,
    pub kind: RuleKind,
}

impl Rule {
    /// Build a new rule from user input, with a fresh id. Input is checked
    /// strictly; only stored rules are allowed to be malformed.
    pub fn from_input(tipo: &str, operador: Option<&str>, valor: &str) -> Result<Rule> {
        let kind = match tipo {
            TIPO_AMOUNT => {
                let op = operador.ok_or_else(|| {
                    CaixaError::InvalidRule("amount rules need an operator".to_string())
                })?;
                let comparator = Comparator::parse(op);
                if let Comparator::Unknown(op) = &comparator {
                    return Err(CaixaError::InvalidRule(format!("unknown operator '{op}'")));
                }
                let threshold = parse_threshold(valor)
                    .ok_or_else(|| CaixaError::InvalidRule(format!("'{valor}' is not a number")))?;
                RuleKind::AmountThreshold { comparator, threshold }
            }
            TIPO_PAYMENT_METHOD => {
                if valor.trim().is_empty() {
                    return Err(CaixaError::InvalidRule("payment method is empty".to_string()));
                }
                RuleKind::PaymentMethodEquals {
                    target: valor.trim().to_string(),
                }
            }
            other => return Err(CaixaError::InvalidRule(format!("unknown rule type '{other}'"))),
        };
        Ok(Rule {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
        })
    }

    pub fn describe(&self) -> String {
        match &self.kind {
            RuleKind::AmountThreshold { comparator, threshold } => {
                format!("valor {} {}", comparator.as_str(), crate::fmt::plain_number(*threshold))
            }
            RuleKind::PaymentMethodEquals { target } => format!("forma de pagamento = {target}"),
        }
    }
}

fn parse_threshold(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn matches(rule: &Rule, entry: &Entry) -> bool {
    match &rule.kind {
        RuleKind::AmountThreshold { comparator, threshold } => {
            threshold.is_finite() && comparator.holds(entry.amount, *threshold)
        }
        RuleKind::PaymentMethodEquals { target } => entry.payment_method == *target,
    }
}

/// True when at least one rule matches. An empty set never matches.
pub fn evaluate_subscription(rules: &[Rule], entry: &Entry) -> bool {
    rules.iter().any(|rule| matches(rule, entry))
}

// Storage format: [{ id, tipo: "valor"|"formaPag", operador?, valor }]

const TIPO_AMOUNT: &str = "valor";
const TIPO_PAYMENT_METHOD: &str = "formaPag";

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "tipo")]
enum StoredRule {
    #[serde(rename = "valor")]
    Amount {
        id: String,
        #[serde(default)]
        operador: Option<String>,
        valor: serde_json::Value,
    },
    #[serde(rename = "formaPag")]
    PaymentMethod { id: String, valor: String },
}

impl From<StoredRule> for Rule {
    fn from(stored: StoredRule) -> Self {
        match stored {
            StoredRule::Amount { id, operador, valor } => {
                let threshold = match &valor {
                    serde_json::Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
                    serde_json::Value::String(s) => parse_threshold(s).unwrap_or(f64::NAN),
                    _ => f64::NAN,
                };
                Rule {
                    id,
                    kind: RuleKind::AmountThreshold {
                        comparator: Comparator::parse(operador.as_deref().unwrap_or("")),
                        threshold,
                    },
                }
            }
            StoredRule::PaymentMethod { id, valor } => Rule {
                id,
                kind: RuleKind::PaymentMethodEquals { target: valor },
            },
        }
    }
}

impl From<&Rule> for StoredRule {
    fn from(rule: &Rule) -> Self {
        match &rule.kind {
            RuleKind::AmountThreshold { comparator, threshold } => StoredRule::Amount {
                id: rule.id.clone(),
                operador: Some(comparator.as_str().to_string()),
                valor: serde_json::Number::from_f64(*threshold)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
            },
            RuleKind::PaymentMethodEquals { target } => StoredRule::PaymentMethod {
                id: rule.id.clone(),
                valor: target.clone(),
            },
        }
    }
}

/// Read a stored rule list. Rules of an unknown type, or missing fields, are
/// dropped here so they never reach the evaluator.
pub fn decode_rules(json: &str) -> Vec<Rule> {
    let items: Vec<serde_json::Value> = match serde_json::from_str(json) {
        Ok(items) => items,
        Err(e) => {
            log::warn!("rule list is not a JSON array, ignoring it: {e}");
            return Vec::new();
        }
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<StoredRule>(item.clone()) {
            Ok(stored) => Some(Rule::from(stored)),
            Err(e) => {
                log::warn!("dropping unreadable rule {item}: {e}");
                None
            }
        })
        .collect()
}

/// Append `rule` to a stored list, leaving existing items untouched. Fails
/// when the stored value is not a JSON array, so nothing is overwritten.
pub fn append_encoded(json: &str, rule: &Rule) -> Result<String> {
    let mut items: Vec<serde_json::Value> = serde_json::from_str(json)
        .map_err(|_| CaixaError::InvalidRule("stored rule list is not an array".to_string()))?;
    let value = serde_json::to_value(StoredRule::from(rule))
        .map_err(|e| CaixaError::InvalidRule(e.to_string()))?;
    items.push(value);
    serde_json::to_string(&items).map_err(|e| CaixaError::InvalidRule(e.to_string()))
}

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::db::{get_connection, init_db};
use crate::error::{CaixaError, Result};
use crate::models::{
    Entry, EntryFilter, NewEntry, PushAddress, PushKeys, Subscription, SubscriptionInput,
};
use crate::rules::{self, Rule};

/// Where validated entries are persisted, one record at a time.
pub trait EntryRepository {
    fn insert_entry(&self, entry: &NewEntry) -> Result<Entry>;
}

/// Where the dispatcher reads the current subscriptions of an owner.
pub trait SubscriptionSource {
    fn subscriptions_for_owner(&self, owner_id: &str) -> Result<Vec<Subscription>>;
}

/// Human-readable reason a store gave for refusing a record.
pub fn rejection_reason(err: &CaixaError) -> String {
    match err {
        CaixaError::Db(rusqlite::Error::SqliteFailure(_, Some(msg))) => msg.clone(),
        other => other.to_string(),
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = get_connection(db_path)?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn entry(&self, owner_id: &str, id: i64) -> Result<Entry> {
        self.conn
            .query_row(
                "SELECT id, owner_id, date, amount, payment_method, origin, description \
                 FROM entries WHERE id = ?1 AND owner_id = ?2",
                rusqlite::params![id, owner_id],
                row_to_entry,
            )
            .optional()?
            .ok_or(CaixaError::UnknownEntry(id))
    }

    /// Entries of `owner_id` matching `filter`, oldest first.
    pub fn query_entries(&self, owner_id: &str, filter: &EntryFilter) -> Result<Vec<Entry>> {
        let mut clauses = vec!["owner_id = ?".to_string()];
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(owner_id.to_string())];

        if let Some(from) = filter.from {
            clauses.push("date >= ?".to_string());
            params.push(Box::new(from));
        }
        if let Some(to) = filter.to {
            clauses.push("date <= ?".to_string());
            params.push(Box::new(to));
        }
        for (column, values) in [
            ("payment_method", &filter.payment_methods),
            ("origin", &filter.origins),
        ] {
            if values.is_empty() {
                continue;
            }
            let marks = vec!["?"; values.len()].join(", ");
            clauses.push(format!("{column} IN ({marks})"));
            for v in values {
                params.push(Box::new(v.clone()));
            }
        }

        let sql = format!(
            "SELECT id, owner_id, date, amount, payment_method, origin, description \
             FROM entries WHERE {} ORDER BY date ASC, id ASC",
            clauses.join(" AND ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(param_refs.as_slice(), row_to_entry)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Register a device for push alerts. It starts with no rules.
    pub fn register_subscription(&self, owner_id: &str, input: &SubscriptionInput) -> Result<Subscription> {
        if owner_id.trim().is_empty() {
            return Err(CaixaError::MissingOwner);
        }
        let address = &input.subscription;
        self.conn.execute(
            "INSERT INTO subscriptions (owner_id, device_id, endpoint, p256dh, auth_key, rules) \
             VALUES (?1, ?2, ?3, ?4, ?5, '[]')",
            rusqlite::params![
                owner_id,
                input.device_id,
                address.endpoint,
                address.keys.p256dh,
                address.keys.auth,
            ],
        )?;
        Ok(Subscription {
            id: self.conn.last_insert_rowid(),
            owner_id: owner_id.to_string(),
            device_id: input.device_id.clone(),
            address: address.clone(),
            rules: Vec::new(),
        })
    }

    pub fn subscription(&self, owner_id: &str, id: i64) -> Result<Subscription> {
        self.conn
            .query_row(
                "SELECT id, owner_id, device_id, endpoint, p256dh, auth_key, rules \
                 FROM subscriptions WHERE id = ?1 AND owner_id = ?2",
                rusqlite::params![id, owner_id],
                row_to_subscription,
            )
            .optional()?
            .ok_or(CaixaError::UnknownSubscription(id))
    }

    pub fn append_rule(&self, owner_id: &str, subscription_id: i64, rule: &Rule) -> Result<()> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT rules FROM subscriptions WHERE id = ?1 AND owner_id = ?2",
                rusqlite::params![subscription_id, owner_id],
                |row| row.get(0),
            )
            .optional()?;
        let stored = stored.ok_or(CaixaError::UnknownSubscription(subscription_id))?;
        let updated = rules::append_encoded(&stored, rule)?;
        self.conn.execute(
            "UPDATE subscriptions SET rules = ?1 WHERE id = ?2",
            rusqlite::params![updated, subscription_id],
        )?;
        Ok(())
    }
}

impl EntryRepository for SqliteStore {
    fn insert_entry(&self, entry: &NewEntry) -> Result<Entry> {
        self.conn.execute(
            "INSERT INTO entries (owner_id, date, amount, payment_method, origin, description) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                entry.owner_id,
                entry.date,
                entry.amount,
                entry.payment_method,
                entry.origin,
                entry.description,
            ],
        )?;
        Ok(entry.clone().into_entry(self.conn.last_insert_rowid()))
    }
}

impl SubscriptionSource for SqliteStore {
    fn subscriptions_for_owner(&self, owner_id: &str) -> Result<Vec<Subscription>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, device_id, endpoint, p256dh, auth_key, rules \
             FROM subscriptions WHERE owner_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([owner_id], row_to_subscription)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        date: row.get(2)?,
        amount: row.get(3)?,
        payment_method: row.get(4)?,
        origin: row.get(5)?,
        description: row.get(6)?,
    })
}

fn row_to_subscription(row: &rusqlite::Row<'_>) -> rusqlite::Result<Subscription> {
    let rules_json: String = row.get(6)?;
    Ok(Subscription {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        device_id: row.get(2)?,
        address: PushAddress {
            endpoint: row.get(3)?,
            keys: PushKeys {
                p256dh: row.get(4)?,
                auth: row.get(5)?,
            },
        },
        rules: rules::decode_rules(&rules_json),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn test_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn new_entry(owner: &str, date: NaiveDate, amount: f64, method: &str, origin: &str) -> NewEntry {
        NewEntry {
            owner_id: owner.to_string(),
            date,
            amount,
            payment_method: method.to_string(),
            origin: origin.to_string(),
            description: String::new(),
        }
    }

    fn registration(device: &str) -> SubscriptionInput {
        serde_json::from_value(serde_json::json!({
            "deviceId": device,
            "subscription": {
                "endpoint": format!("https://push.example/{device}"),
                "keys": { "p256dh": "BPk", "auth": "aut" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_insert_and_read_entry() {
        let (_dir, store) = test_store();
        let stored = store.insert_entry(&new_entry("u1", day(3), 12.5, "Pix", "Loja")).unwrap();
        assert!(stored.id > 0);
        let loaded = store.entry("u1", stored.id).unwrap();
        assert_eq!(loaded, stored);
        assert!(matches!(store.entry("u2", stored.id), Err(CaixaError::UnknownEntry(_))));
    }

    #[test]
    fn test_insert_rejection_has_reason() {
        let (_dir, store) = test_store();
        let err = store.insert_entry(&new_entry("u1", day(3), 1.0, " ", "Loja")).unwrap_err();
        assert!(rejection_reason(&err).contains("CHECK constraint failed"));
    }

    #[test]
    fn test_query_filters_and_order() {
        let (_dir, store) = test_store();
        store.insert_entry(&new_entry("u1", day(5), 1.0, "Pix", "Loja")).unwrap();
        store.insert_entry(&new_entry("u1", day(1), 2.0, "Cartão", "Fábrica")).unwrap();
        store.insert_entry(&new_entry("u1", day(3), 3.0, "Dinheiro", "Loja")).unwrap();
        store.insert_entry(&new_entry("u2", day(2), 4.0, "Pix", "Loja")).unwrap();

        let all = store.query_entries("u1", &EntryFilter::default()).unwrap();
        let amounts: Vec<f64> = all.iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![2.0, 3.0, 1.0]);

        let filter = EntryFilter {
            from: Some(day(1)),
            to: Some(day(3)),
            ..Default::default()
        };
        assert_eq!(store.query_entries("u1", &filter).unwrap().len(), 2);

        let filter = EntryFilter {
            payment_methods: vec!["Pix".to_string(), "Dinheiro".to_string()],
            origins: vec!["Loja".to_string()],
            ..Default::default()
        };
        let found = store.query_entries("u1", &filter).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|e| e.origin == "Loja"));
    }

    #[test]
    fn test_register_and_append_rules() {
        let (_dir, store) = test_store();
        let sub = store.register_subscription("u1", &registration("phone")).unwrap();
        assert!(sub.rules.is_empty());

        let rule = Rule::from_input("valor", Some(">="), "500").unwrap();
        store.append_rule("u1", sub.id, &rule).unwrap();
        store.append_rule("u1", sub.id, &rule).unwrap();

        let loaded = store.subscription("u1", sub.id).unwrap();
        assert_eq!(loaded.rules.len(), 2);
        assert_eq!(loaded.rules[0], rule);
        assert_eq!(loaded.address.endpoint, "https://push.example/phone");

        assert!(matches!(
            store.append_rule("u2", sub.id, &rule),
            Err(CaixaError::UnknownSubscription(_))
        ));
    }

    #[test]
    fn test_append_leaves_unreadable_rules_column_alone() {
        let (_dir, store) = test_store();
        let sub = store.register_subscription("u1", &registration("phone")).unwrap();
        let legacy = r#"{"legacy": [{"tipo": "formaPag", "valor": "Pix"}]}"#;
        store
            .conn()
            .execute("UPDATE subscriptions SET rules = ?1 WHERE id = ?2", rusqlite::params![legacy, sub.id])
            .unwrap();

        let rule = Rule::from_input("formaPag", None, "Boleto").unwrap();
        assert!(matches!(
            store.append_rule("u1", sub.id, &rule),
            Err(CaixaError::InvalidRule(_))
        ));
        let kept: String = store
            .conn()
            .query_row("SELECT rules FROM subscriptions WHERE id = ?1", [sub.id], |r| r.get(0))
            .unwrap();
        assert_eq!(kept, legacy);
    }

    #[test]
    fn test_subscriptions_for_owner() {
        let (_dir, store) = test_store();
        store.register_subscription("u1", &registration("a")).unwrap();
        store.register_subscription("u1", &registration("b")).unwrap();
        store.register_subscription("u2", &registration("c")).unwrap();
        let subs = store.subscriptions_for_owner("u1").unwrap();
        let devices: Vec<&str> = subs.iter().map(|s| s.device_id.as_str()).collect();
        assert_eq!(devices, vec!["a", "b"]);
    }

    #[test]
    fn test_register_requires_owner() {
        let (_dir, store) = test_store();
        assert!(matches!(
            store.register_subscription("", &registration("a")),
            Err(CaixaError::MissingOwner)
        ));
    }
}

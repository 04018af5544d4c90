pub mod entries;
pub mod import;
pub mod init;
pub mod push;

use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::models::{DispatchReport, Entry};
use crate::notify::{NotificationDispatcher, PushTransport};
use crate::settings::Settings;
use crate::store::SqliteStore;

pub(crate) fn open_store(settings: &Settings) -> Result<SqliteStore> {
    std::fs::create_dir_all(&settings.data_dir)?;
    SqliteStore::open(&settings.db_path())
}

pub(crate) fn dispatcher(settings: &Settings) -> Result<NotificationDispatcher<Box<dyn PushTransport>>> {
    let dispatcher = NotificationDispatcher::new(settings.push_transport()?);
    Ok(match settings.dispatch_deadline_secs {
        Some(secs) => dispatcher.with_time_limit(Duration::from_secs(secs)),
        None => dispatcher,
    })
}

/// Run the dispatcher for a freshly stored entry. Failures are logged only;
/// the entry stays created either way.
pub(crate) fn notify_created(
    dispatcher: &NotificationDispatcher<Box<dyn PushTransport>>,
    store: &SqliteStore,
    entry: &Entry,
) -> Option<DispatchReport> {
    match dispatcher.dispatch(store, entry) {
        Ok(report) => Some(report),
        Err(e) => {
            log::warn!("could not dispatch alerts for entry {}: {e}", entry.id);
            None
        }
    }
}

#[derive(Parser)]
#[command(name = "caixa", about = "Cash-register ledger with spreadsheet import and push alerts.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for caixa data (default: ~/Documents/caixa)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import an uploaded spreadsheet (xlsx, xls, ods or csv).
    Import {
        /// Path of the upload, relative to the uploads directory
        path: String,
        /// Owner of the imported entries
        #[arg(long, env = "CAIXA_OWNER")]
        owner: String,
        /// Send push alerts for every imported entry
        #[arg(long)]
        notify: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a single entry and send matching alerts.
    Add {
        #[arg(long, env = "CAIXA_OWNER")]
        owner: String,
        /// Date: YYYY-MM-DD or DD/MM/YYYY
        #[arg(long)]
        data: String,
        /// Amount
        #[arg(long, allow_hyphen_values = true)]
        valor: f64,
        /// Payment method, e.g. Pix, Cartão, Dinheiro, Boleto
        #[arg(long = "forma-pag")]
        forma_pag: String,
        /// Origin, e.g. Loja, Fábrica
        #[arg(long)]
        origem: String,
        #[arg(long, default_value = "")]
        descricao: String,
    },
    /// List entries, oldest first.
    List {
        #[arg(long, env = "CAIXA_OWNER")]
        owner: String,
        /// First day included: YYYY-MM-DD
        #[arg(long)]
        inicio: Option<String>,
        /// Last day included: YYYY-MM-DD
        #[arg(long)]
        fim: Option<String>,
        /// Comma-separated payment methods
        #[arg(long)]
        formas: Option<String>,
        /// Comma-separated origins
        #[arg(long)]
        origens: Option<String>,
    },
    /// Manage push subscriptions and their alert rules.
    Push {
        #[command(subcommand)]
        command: PushCommands,
    },
}

#[derive(Subcommand)]
pub enum PushCommands {
    /// Register a device from its subscription JSON:
    /// {"deviceId": "...", "subscription": {"endpoint": "...", "keys": {"p256dh": "...", "auth": "..."}}}
    Register {
        #[arg(long, env = "CAIXA_OWNER")]
        owner: String,
        /// Registration body, or @path to read it from a file
        body: String,
    },
    /// Append an alert rule to a subscription.
    RuleAdd {
        #[arg(long, env = "CAIXA_OWNER")]
        owner: String,
        /// Subscription ID (shown by `caixa push register`)
        #[arg(long)]
        subscription: i64,
        /// Rule type: valor, formaPag
        #[arg(long)]
        tipo: String,
        /// Comparison for valor rules: >=, <=, >, <, ==
        #[arg(long)]
        operador: Option<String>,
        /// Threshold amount or payment method
        #[arg(long, allow_hyphen_values = true)]
        valor: String,
    },
    /// List the rules of a subscription.
    Rules {
        #[arg(long, env = "CAIXA_OWNER")]
        owner: String,
        #[arg(long)]
        subscription: i64,
    },
    /// Run the alert rules again for a stored entry.
    Send {
        #[arg(long, env = "CAIXA_OWNER")]
        owner: String,
        /// Entry ID
        entry: i64,
    },
}

use std::time::{Duration, Instant};

use colored::Colorize;

use crate::error::{CaixaError, Result};
use crate::importer::{ImportOptions, ImportPipeline};
use crate::models::Entry;
use crate::settings::load_settings;
use crate::uploads::DirFileStore;

pub fn run(path: &str, owner: &str, notify: bool, json: bool) -> Result<()> {
    let settings = load_settings();
    let store = super::open_store(&settings)?;
    let files = DirFileStore::new(settings.uploads_path());
    let options = ImportOptions {
        deadline: settings
            .import_deadline_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs)),
    };

    let mut created: Vec<Entry> = Vec::new();
    let report = ImportPipeline::new(&store)
        .with_options(options)
        .run_upload(&files, path, owner, &mut |entry| {
            if notify {
                created.push(entry.clone());
            }
        })?;

    if json {
        let out = serde_json::to_string_pretty(&report).map_err(|e| CaixaError::Other(e.to_string()))?;
        println!("{out}");
    } else {
        println!("{} imported, {} rejected", report.imported_count, report.error_rows.len());
        for err in &report.error_rows {
            println!("  {} {}", format!("row {}:", err.row).red(), err.reason);
        }
    }

    if created.is_empty() {
        return Ok(());
    }
    let dispatcher = match super::dispatcher(&settings) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("push alerts disabled: {e}");
            return Ok(());
        }
    };
    let (mut sent, mut failed) = (0, 0);
    for entry in &created {
        if let Some(r) = super::notify_created(&dispatcher, &store, entry) {
            sent += r.delivered();
            failed += r.failed();
        }
    }
    if !json {
        println!("{sent} alerts sent, {failed} failed");
    }
    Ok(())
}

use std::path::Path;
use std::time::Instant;

use crate::error::{CaixaError, Result};
use crate::models::{Entry, ImportReport, RawRow, RowError};
use crate::parser::{parse_rows, PayloadFormat};
use crate::store::{rejection_reason, EntryRepository};
use crate::uploads::FileStore;
use crate::validator::validate;

pub const DEADLINE_REASON: &str = "not processed: import deadline reached";

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Rows not started by this instant are reported with [`DEADLINE_REASON`].
    pub deadline: Option<Instant>,
}

/// Parse → validate → persist for one uploaded sheet.
///
/// Every data row ends up either counted as imported or listed in
/// `error_rows`; a bad row never stops the rows after it. Stored rows are not
/// rolled back when later rows fail.
pub struct ImportPipeline<'a, R: EntryRepository + ?Sized> {
    repo: &'a R,
    options: ImportOptions,
}

impl<'a, R: EntryRepository + ?Sized> ImportPipeline<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self {
            repo,
            options: ImportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Fetch `path` from upload storage and import it. Fails as a whole only
    /// when the owner is missing, the upload cannot be fetched, or the payload
    /// cannot be decoded.
    pub fn run_upload(
        &self,
        files: &dyn FileStore,
        path: &str,
        owner_id: &str,
        on_created: &mut dyn FnMut(&Entry),
    ) -> Result<ImportReport> {
        require_owner(owner_id)?;
        let payload = files.fetch(path)?;
        self.run(&payload, PayloadFormat::from_path(Path::new(path)), owner_id, on_created)
    }

    pub fn run(
        &self,
        payload: &[u8],
        format: PayloadFormat,
        owner_id: &str,
        on_created: &mut dyn FnMut(&Entry),
    ) -> Result<ImportReport> {
        require_owner(owner_id)?;
        let rows = parse_rows(payload, format)?;
        log::debug!("parsed {} data rows", rows.len());
        let report = self.import_rows(&rows, owner_id, on_created);
        log::info!(
            "import for {owner_id}: {} imported, {} rejected",
            report.imported_count,
            report.error_rows.len()
        );
        Ok(report)
    }

    pub fn import_rows(
        &self,
        rows: &[RawRow],
        owner_id: &str,
        on_created: &mut dyn FnMut(&Entry),
    ) -> ImportReport {
        rows.iter().fold(ImportReport::default(), |mut report, row| {
            if self.deadline_passed() {
                report.error_rows.push(RowError {
                    row: row.row,
                    reason: DEADLINE_REASON.to_string(),
                });
                return report;
            }
            match self.import_row(row, owner_id) {
                Ok(entry) => {
                    report.imported_count += 1;
                    on_created(&entry);
                }
                Err(err) => {
                    log::warn!("row {} rejected: {}", err.row, err.reason);
                    report.error_rows.push(err);
                }
            }
            report
        })
    }

    fn import_row(&self, row: &RawRow, owner_id: &str) -> std::result::Result<Entry, RowError> {
        let new_entry = validate(row, owner_id)?;
        self.repo.insert_entry(&new_entry).map_err(|e| RowError {
            row: row.row,
            reason: rejection_reason(&e),
        })
    }

    fn deadline_passed(&self) -> bool {
        self.options.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

fn require_owner(owner_id: &str) -> Result<()> {
    if owner_id.trim().is_empty() {
        return Err(CaixaError::MissingOwner);
    }
    Ok(())
}

//! Batch import of a workbook into the record store and case folders.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use casedesk_sheet::SpreadsheetAnalyzer;
use serde::Serialize;

use crate::error::StoreError;
use crate::id::CaseIdGenerator;
use crate::store::{CaseRecordStore, JsonRecordStore};
use crate::sync::FolderSync;

/// What one import run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub sheets_analyzed: usize,
    pub sheets_processable: usize,
    pub records_extracted: usize,
    /// Non-blank rows without a client.
    pub rows_skipped: usize,
    pub records_imported: usize,
    /// Rows whose case id is already in the store (or repeated in the workbook).
    pub duplicates_skipped: usize,
    pub folders_created: usize,
    pub folder_failures: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sheet(s) analyzed, {} processable, {} record(s) extracted, {} imported",
            self.sheets_analyzed,
            self.sheets_processable,
            self.records_extracted,
            self.records_imported
        )?;
        if self.rows_skipped > 0 {
            write!(f, ", {} row(s) without client skipped", self.rows_skipped)?;
        }
        if self.duplicates_skipped > 0 {
            write!(f, ", {} duplicate case id(s) skipped", self.duplicates_skipped)?;
        }
        write!(
            f,
            ", {} folder(s) created, {} failed",
            self.folders_created, self.folder_failures
        )
    }
}

/// Analyze `path`, assign case ids, persist the records and create their folders.
///
/// Rows are handled in workbook then row order, so generated ids follow the sheet layout.
/// Only an unreadable workbook or a failed store write aborts the run; folder failures are
/// counted and logged.
pub fn import_workbook(
    analyzer: &SpreadsheetAnalyzer,
    path: impl AsRef<Path>,
    store: &mut JsonRecordStore,
    sync: Option<&FolderSync>,
) -> Result<ImportSummary, StoreError> {
    let path = path.as_ref();
    let (workbook, analysis) = analyzer.analyze_path(path)?;
    let extraction = analyzer.extract(&workbook, &analysis);

    let mut summary = ImportSummary {
        sheets_analyzed: analysis.sheets.len(),
        sheets_processable: analysis.processable_sheet_count,
        records_extracted: extraction.records_extracted(),
        rows_skipped: extraction.rows_skipped(),
        ..ImportSummary::default()
    };

    let records = extraction.into_records();
    let mut ids = CaseIdGenerator::for_today(store.case_ids());
    for record in records.iter().filter(|r| r.has_case_id()) {
        ids.observe(&record.case_id);
    }

    let mut taken: BTreeSet<String> = store.case_ids().into_iter().map(str::to_string).collect();
    let mut accepted = Vec::with_capacity(records.len());
    for mut record in records {
        if !record.has_case_id() {
            record.case_id = ids.next_id();
        }
        if !taken.insert(record.case_id.clone()) {
            log::warn!(
                "skipping {} ({}): case id {} already exists",
                record.client,
                record.case_type,
                record.case_id
            );
            summary.duplicates_skipped += 1;
            continue;
        }
        accepted.push(record);
    }

    summary.records_imported = store.add_batch(accepted.clone())?;

    if let Some(sync) = sync {
        for record in &accepted {
            match sync.sync_record(record) {
                Ok(folder) if folder.created => summary.folders_created += 1,
                Ok(_) => {}
                Err(err) => {
                    log::warn!("could not create folder for case {}: {err}", record.case_id);
                    summary.folder_failures += 1;
                }
            }
        }
    }

    log::info!("imported {}: {summary}", path.display());
    Ok(summary)
}

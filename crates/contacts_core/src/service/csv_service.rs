//! CSV import/export use-case service.
//!
//! # Responsibility
//! - Check uploads, decode them, validate decoded contacts and save them.
//! - Export active contacts as a framed CSV download.
//!
//! # Invariants
//! - An import saves every accepted contact or none of them.
//! - Invalid records are reported as rejections, never silently dropped.
//! - The upload reader is consumed and released before returning.

use crate::csv::decoder::{CsvImportDecoder, RejectionReason, RowRejection};
use crate::csv::encoder::encode_contacts;
use crate::csv::framing::CsvDownload;
use crate::csv::CsvError;
use crate::repo::contact_repo::{ContactRepository, RepoError, RepoResult};
use log::{error, info, warn};
use std::io::{BufRead, BufReader, Read};
use std::time::Instant;
use thiserror::Error;

const CSV_EXTENSION: &str = ".csv";

#[derive(Debug, Error)]
pub enum CsvServiceError {
    #[error("no CSV file was provided")]
    EmptyUpload,
    #[error("file `{0}` is not a CSV file")]
    UnsupportedFile(String),
    #[error(transparent)]
    Decode(#[from] CsvError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Result of one import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    /// Sorted by line number.
    pub rejections: Vec<RowRejection>,
}

impl ImportReport {
    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }
}

/// Use-case service for CSV interchange.
pub struct CsvService<R: ContactRepository> {
    repo: R,
}

impl<R: ContactRepository> CsvService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Encodes every active contact, header included.
    pub fn export_csv(&self) -> RepoResult<String> {
        let contacts = self.repo.list_active_contacts()?;
        let document = encode_contacts(&contacts);
        info!(
            "event=csv_export module=service status=ok rows={}",
            contacts.len()
        );
        Ok(document)
    }

    /// Encodes every active contact as the `contacts.csv` download.
    pub fn export_download(&self) -> RepoResult<CsvDownload> {
        Ok(CsvDownload::from_document(&self.export_csv()?))
    }

    /// Imports an uploaded file.
    ///
    /// # Errors
    /// - `EmptyUpload` when the name or the content is empty.
    /// - `UnsupportedFile` when the name does not end in `.csv`.
    /// - `Decode` when the content cannot be read as UTF-8 text.
    /// - `Repo` when saving fails; nothing is saved in that case.
    pub fn import_upload(
        &self,
        file_name: &str,
        upload: impl Read,
    ) -> Result<ImportReport, CsvServiceError> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(CsvServiceError::EmptyUpload);
        }
        if !file_name.to_ascii_lowercase().ends_with(CSV_EXTENSION) {
            warn!("event=csv_import module=service status=rejected error_code=unsupported_file");
            return Err(CsvServiceError::UnsupportedFile(file_name.to_string()));
        }

        let mut reader = BufReader::new(upload);
        let is_empty = reader
            .fill_buf()
            .map_err(|source| CsvError::Read { line: 1, source })?
            .is_empty();
        if is_empty {
            return Err(CsvServiceError::EmptyUpload);
        }

        self.import_csv(reader)
    }

    /// Decodes `reader`, validates each record and saves the valid ones.
    pub fn import_csv(&self, reader: impl BufRead) -> Result<ImportReport, CsvServiceError> {
        let started_at = Instant::now();
        info!("event=csv_import module=service status=start");

        let outcome = CsvImportDecoder::new().decode(reader)?;
        let mut rejections = outcome.rejections;
        let mut accepted = Vec::with_capacity(outcome.records.len());
        for record in outcome.records {
            match record.contact.validate() {
                Ok(()) => accepted.push(record.contact),
                Err(err) => rejections.push(RowRejection {
                    line: record.line,
                    reason: RejectionReason::Invalid(err),
                }),
            }
        }
        rejections.sort_by_key(|rejection| rejection.line);

        let imported = self.repo.insert_contacts(&accepted).map_err(|err| {
            error!(
                "event=csv_import module=service status=error duration_ms={} error_code={}",
                started_at.elapsed().as_millis(),
                save_error_code(&err)
            );
            err
        })?;

        info!(
            "event=csv_import module=service status=ok duration_ms={} imported={} rejected={}",
            started_at.elapsed().as_millis(),
            imported,
            rejections.len()
        );
        Ok(ImportReport {
            imported,
            rejections,
        })
    }
}

// Error text may carry contact data, so only a code is logged.
fn save_error_code(err: &RepoError) -> &'static str {
    match err {
        RepoError::DuplicateEmail(_) => "duplicate_email",
        RepoError::Validation(_) => "validation_failed",
        _ => "save_failed",
    }
}

//! CSV interchange for contacts.
//!
//! # Responsibility
//! - Tokenize single CSV lines with quote and delimiter handling.
//! - Encode active contacts as Excel-compatible CSV.
//! - Decode uploaded CSV into unsaved contacts with per-record rejections.
//!
//! # Invariants
//! - Nothing in this module touches persistence; callers own saving.
//! - Export column order and titles are a wire format shared with import.

use thiserror::Error;

pub mod columns;
pub mod decoder;
pub mod encoder;
pub mod framing;
pub mod tokenizer;

pub type CsvResult<T> = Result<T, CsvError>;

#[derive(Debug, Error)]
pub enum CsvError {
    /// The input stream failed or was not valid UTF-8.
    #[error("failed to read CSV input at line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

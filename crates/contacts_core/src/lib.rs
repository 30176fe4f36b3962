//! Core domain logic for the contact manager.
//! This crate owns contact invariants, storage and CSV interchange.

pub mod config;
pub mod csv;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use csv::decoder::{
    decode_contacts, CsvImportDecoder, DecodeOutcome, DecodedContact, RejectionReason,
    RowRejection,
};
pub use csv::encoder::encode_contacts;
pub use csv::framing::CsvDownload;
pub use csv::tokenizer::{tokenize_line, Delimiter, LineTokenizer};
pub use csv::{CsvError, CsvResult};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::contact::{Contact, ContactId, ContactValidationError};
pub use repo::contact_repo::{
    ContactListQuery, ContactRepository, ContactSort, RepoError, RepoResult,
    SqliteContactRepository,
};
pub use service::contact_service::{
    ContactPage, ContactService, ContactServiceError, PageRequest,
};
pub use service::csv_service::{CsvService, CsvServiceError, ImportReport};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

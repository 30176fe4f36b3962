//! Excel-compatible CSV export encoder.
//!
//! # Invariants
//! - Output is semicolon-separated with one `\n`-terminated line per contact.
//! - Soft-deleted contacts are never emitted.
//! - Absent values render as empty fields, never as `null`.
//! - Encoding is pure and has no failure path.
//!
//! The UTF-8 byte-order mark belongs to the download framing, see
//! [`crate::csv::framing`].

use super::columns::{export_header, ContactColumn, EXPORT_COLUMNS};
use super::tokenizer::Delimiter;
use crate::model::contact::Contact;
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;

/// Delimiter of exported documents.
pub const EXPORT_DELIMITER: Delimiter = Delimiter::Semicolon;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Renders active contacts as one CSV document, header included.
pub fn encode_contacts<'a>(contacts: impl IntoIterator<Item = &'a Contact>) -> String {
    let separator = EXPORT_DELIMITER.as_char().to_string();
    let mut document = export_header(EXPORT_DELIMITER);
    document.push('\n');

    let mut rows = 0usize;
    let mut skipped = 0usize;
    for contact in contacts {
        if !contact.is_active() {
            skipped += 1;
            continue;
        }
        let fields = EXPORT_COLUMNS
            .iter()
            .map(|column| render_field(contact, *column))
            .collect::<Vec<_>>();
        document.push_str(&fields.join(&separator));
        document.push('\n');
        rows += 1;
    }

    debug!("event=csv_encode module=csv status=ok rows={rows} skipped_deleted={skipped}");
    document
}

/// Renders one exported field of `contact`.
pub fn render_field(contact: &Contact, column: ContactColumn) -> String {
    match column {
        ContactColumn::Id => contact.id.map(|id| id.to_string()).unwrap_or_default(),
        ContactColumn::FirstName => escape_text(&contact.first_name),
        ContactColumn::LastName => escape_text(&contact.last_name),
        ContactColumn::Email => escape_text(&contact.email),
        ContactColumn::Phone => contact
            .phone
            .as_deref()
            .filter(|phone| !phone.is_empty())
            .map(text_formula)
            .unwrap_or_default(),
        ContactColumn::Company => escape_optional(&contact.company),
        ContactColumn::JobTitle => escape_optional(&contact.job_title),
        ContactColumn::Address => escape_optional(&contact.address),
        ContactColumn::City => escape_optional(&contact.city),
        ContactColumn::PostalCode => escape_optional(&contact.postal_code),
        ContactColumn::Country => escape_optional(&contact.country),
        ContactColumn::Birthday => format_date(contact.birthday),
        ContactColumn::Website => escape_optional(&contact.website),
        ContactColumn::Notes => escape_optional(&contact.notes),
        ContactColumn::CreatedAt => format_date_time(contact.created_at),
        ContactColumn::UpdatedAt => format_date_time(contact.updated_at),
    }
}

/// Doubles embedded quotes; quotes the whole field when it contains the
/// delimiter, a quote or a line break.
pub fn escape_text(value: &str) -> String {
    let escaped = value.replace('"', "\"\"");
    if value.contains([EXPORT_DELIMITER.as_char(), '"', '\n', '\r']) {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}

/// Wraps `value` as `="value"` so spreadsheets keep it as text.
pub fn text_formula(value: &str) -> String {
    format!("=\"{}\"", value.replace('"', "\"\""))
}

fn escape_optional(value: &Option<String>) -> String {
    value.as_deref().map(escape_text).unwrap_or_default()
}

fn format_date(value: Option<NaiveDate>) -> String {
    value
        .map(|date| date.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn format_date_time(value: Option<NaiveDateTime>) -> String {
    value
        .map(|moment| moment.format(DATE_TIME_FORMAT).to_string())
        .unwrap_or_default()
}

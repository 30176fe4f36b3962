//! CSV import decoder.
//!
//! # Responsibility
//! - Turn an uploaded UTF-8 CSV stream into unsaved contact records.
//! - Report every data record that could not be accepted, with its line.
//!
//! # Invariants
//! - The first record is the header and never becomes a contact.
//! - The delimiter is fixed once per document.
//! - A malformed record never aborts decoding; read failures always do.
//! - Decoded contacts are never deleted, never carry an id, and carry the
//!   import moment as `created_at`.

use super::columns::{ColumnLayout, ContactColumn, LayoutSource};
use super::encoder::DATE_FORMAT;
use super::tokenizer::{ends_in_open_quoted_field, Delimiter, LineTokenizer};
use super::{CsvError, CsvResult};
use crate::model::contact::{Contact, ContactValidationError};
use chrono::{Local, NaiveDate, NaiveDateTime, SubsecRound};
use log::{debug, info};
use std::fmt::{Display, Formatter};
use std::collections::VecDeque;
use std::io::{BufRead, Lines};

const BOM: char = '\u{feff}';
/// Most physical lines one quoted field may continue onto.
const MAX_CONTINUATION_LINES: usize = 10;

/// Why a data record was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// The record has no field at one of the required column positions.
    TooFewFields { found: usize, required: usize },
    /// The record decoded, but the contact fails validation.
    Invalid(ContactValidationError),
}

impl Display for RejectionReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewFields { found, required } => {
                write!(f, "expected at least {required} fields, found {found}")
            }
            Self::Invalid(err) => write!(f, "{err}"),
        }
    }
}

/// One record excluded from the import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    /// 1-based physical line where the record starts.
    pub line: usize,
    pub reason: RejectionReason,
}

/// One accepted record with its source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedContact {
    pub line: usize,
    pub contact: Contact,
}

/// Structured result of decoding one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOutcome {
    /// Accepted records in file order.
    pub records: Vec<DecodedContact>,
    pub rejections: Vec<RowRejection>,
    /// `None` when the document had no record to detect it from.
    pub delimiter: Option<Delimiter>,
    pub layout: LayoutSource,
}

impl DecodeOutcome {
    pub fn accepted(&self) -> usize {
        self.records.len()
    }

    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }

    pub fn contacts(&self) -> impl Iterator<Item = &Contact> {
        self.records.iter().map(|record| &record.contact)
    }

    pub fn into_contacts(self) -> Vec<Contact> {
        self.records.into_iter().map(|record| record.contact).collect()
    }
}

/// Decodes contact CSV documents.
#[derive(Debug, Clone, Copy)]
pub struct CsvImportDecoder {
    imported_at: NaiveDateTime,
}

impl Default for CsvImportDecoder {
    fn default() -> Self {
        Self::new()
    }
}

enum DecoderState {
    AwaitingHeader,
    ReadingRows(RowContext),
    EndOfStream,
}

struct RowContext {
    layout: ColumnLayout,
    /// Unset until a record containing a delimiter candidate is seen.
    tokenizer: Option<LineTokenizer>,
}

struct Record {
    line: usize,
    text: String,
}

impl CsvImportDecoder {
    /// Creates a decoder stamping records with the current local time.
    pub fn new() -> Self {
        Self::with_import_time(Local::now().naive_local().trunc_subsecs(0))
    }

    pub fn with_import_time(imported_at: NaiveDateTime) -> Self {
        Self { imported_at }
    }

    /// Reads `reader` to the end and decodes every record.
    ///
    /// # Errors
    /// Returns [`CsvError::Read`] when the stream fails or is not valid UTF-8;
    /// no partial outcome is returned in that case.
    pub fn decode<R: BufRead>(&self, reader: R) -> CsvResult<DecodeOutcome> {
        let mut records = RecordReader::new(reader);
        let mut outcome = DecodeOutcome {
            records: Vec::new(),
            rejections: Vec::new(),
            delimiter: None,
            layout: LayoutSource::Positional,
        };
        let mut state = DecoderState::AwaitingHeader;

        loop {
            state = match state {
                DecoderState::AwaitingHeader => match records.next_record()? {
                    None => DecoderState::EndOfStream,
                    Some(header) => DecoderState::ReadingRows(self.read_header(header, &mut outcome)),
                },
                DecoderState::ReadingRows(mut context) => match records.next_record()? {
                    None => DecoderState::EndOfStream,
                    Some(record) => {
                        self.read_row(&mut context, record, &mut outcome);
                        DecoderState::ReadingRows(context)
                    }
                },
                DecoderState::EndOfStream => break,
            };
        }

        info!(
            "event=csv_decode module=csv status=ok accepted={} rejected={} delimiter={} layout={:?}",
            outcome.accepted(),
            outcome.rejected(),
            outcome
                .delimiter
                .map_or_else(|| "none".to_string(), |delimiter| delimiter.to_string()),
            outcome.layout
        );
        Ok(outcome)
    }

    fn read_header(&self, header: Record, outcome: &mut DecodeOutcome) -> RowContext {
        let text = header.text.trim_start_matches(BOM);
        let tokenizer = Delimiter::sniff(text)
            .map(|delimiter| LineTokenizer::new(delimiter).with_quote_unescaping(true));
        let titles = match tokenizer {
            Some(tokenizer) => tokenizer.tokenize(text),
            None => vec![text.to_string()],
        };
        let layout = ColumnLayout::from_header(&titles);

        outcome.delimiter = tokenizer.map(|tokenizer| tokenizer.delimiter());
        outcome.layout = layout.source();
        debug!(
            "event=csv_header module=csv status=ok columns={} layout={:?}",
            titles.len(),
            layout.source()
        );

        RowContext { layout, tokenizer }
    }

    fn read_row(&self, context: &mut RowContext, record: Record, outcome: &mut DecodeOutcome) {
        if record.text.trim().is_empty() {
            return;
        }

        let tokenizer = *context.tokenizer.get_or_insert_with(|| {
            LineTokenizer::new(Delimiter::detect(&record.text)).with_quote_unescaping(true)
        });
        outcome.delimiter = Some(tokenizer.delimiter());

        let fields = tokenizer.tokenize(&record.text);
        let required = context.layout.required_width();
        if fields.len() < required {
            outcome.rejections.push(RowRejection {
                line: record.line,
                reason: RejectionReason::TooFewFields {
                    found: fields.len(),
                    required,
                },
            });
            return;
        }

        outcome.records.push(DecodedContact {
            line: record.line,
            contact: self.map_fields(&context.layout, &fields, record.line),
        });
    }

    fn map_fields(&self, layout: &ColumnLayout, fields: &[String], line: usize) -> Contact {
        let text = |column: ContactColumn| {
            layout
                .position(column)
                .and_then(|index| fields.get(index))
                .map_or("", |value| value.trim())
        };
        let optional = |column: ContactColumn| {
            Some(text(column))
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        Contact {
            id: None,
            first_name: text(ContactColumn::FirstName).to_string(),
            last_name: text(ContactColumn::LastName).to_string(),
            email: text(ContactColumn::Email).to_string(),
            phone: unwrap_text_formula(text(ContactColumn::Phone)),
            address: optional(ContactColumn::Address),
            city: optional(ContactColumn::City),
            postal_code: optional(ContactColumn::PostalCode),
            country: optional(ContactColumn::Country),
            company: optional(ContactColumn::Company),
            job_title: optional(ContactColumn::JobTitle),
            birthday: parse_birthday(text(ContactColumn::Birthday), line),
            website: optional(ContactColumn::Website),
            notes: optional(ContactColumn::Notes),
            is_deleted: false,
            created_at: Some(self.imported_at),
            updated_at: None,
        }
    }
}

/// Decodes `reader` with a decoder stamped at the current time.
pub fn decode_contacts<R: BufRead>(reader: R) -> CsvResult<DecodeOutcome> {
    CsvImportDecoder::new().decode(reader)
}

/// Strips the `="..."` spreadsheet text wrapper written by the encoder.
fn unwrap_text_formula(value: &str) -> Option<String> {
    let unwrapped = match value.strip_prefix('=') {
        Some(rest) => rest.trim().trim_matches('"').trim(),
        None => value,
    };
    Some(unwrapped)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_birthday(value: &str, line: usize) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            debug!("event=csv_decode module=csv status=skip field=birthday line={line}");
            None
        }
    }
}

/// Joins physical lines into records so quoted fields may span lines.
///
/// A quoted field that is still open after `MAX_CONTINUATION_LINES` lines, or
/// at end of input, is treated as a stray quote: the record keeps only its
/// first line and the lines read ahead are replayed as records of their own.
struct RecordReader<R> {
    lines: Lines<R>,
    line: usize,
    replay: VecDeque<(usize, String)>,
}

impl<R: BufRead> RecordReader<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            replay: VecDeque::new(),
        }
    }

    fn next_physical(&mut self) -> CsvResult<Option<(usize, String)>> {
        if let Some(entry) = self.replay.pop_front() {
            return Ok(Some(entry));
        }
        match self.lines.next() {
            None => Ok(None),
            Some(Ok(text)) => {
                self.line += 1;
                Ok(Some((self.line, text)))
            }
            Some(Err(source)) => Err(CsvError::Read {
                line: self.line + 1,
                source,
            }),
        }
    }

    fn next_record(&mut self) -> CsvResult<Option<Record>> {
        let Some((line, mut text)) = self.next_physical()? else {
            return Ok(None);
        };
        if !ends_in_open_quoted_field(&text) {
            return Ok(Some(Record { line, text }));
        }

        let first_len = text.len();
        let mut read_ahead = Vec::new();
        while read_ahead.len() < MAX_CONTINUATION_LINES {
            let Some(next) = self.next_physical()? else {
                break;
            };
            text.push('\n');
            text.push_str(&next.1);
            read_ahead.push(next);
            if !ends_in_open_quoted_field(&text) {
                return Ok(Some(Record { line, text }));
            }
        }

        debug!(
            "event=csv_decode module=csv status=skip reason=unterminated_quote line={line} replayed_lines={}",
            read_ahead.len()
        );
        text.truncate(first_len);
        for entry in read_ahead.into_iter().rev() {
            self.replay.push_front(entry);
        }
        Ok(Some(Record { line, text }))
    }
}

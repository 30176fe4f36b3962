//! Download framing for exported CSV documents.
//!
//! Spreadsheet applications only auto-detect UTF-8 when the file starts with a
//! byte-order mark, so the artifact body is `BOM + document`.

/// UTF-8 byte-order mark.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
pub const CSV_FILE_NAME: &str = "contacts.csv";
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=UTF-8";

/// A CSV export ready to be served or written as a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDownload {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl CsvDownload {
    /// Frames an encoded document as the `contacts.csv` attachment.
    pub fn from_document(document: &str) -> Self {
        let mut body = Vec::with_capacity(UTF8_BOM.len() + document.len());
        body.extend_from_slice(UTF8_BOM);
        body.extend_from_slice(document.as_bytes());
        Self {
            file_name: CSV_FILE_NAME,
            content_type: CSV_CONTENT_TYPE,
            body,
        }
    }

    /// Response headers for serving the artifact as a non-cacheable attachment.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Content-Type", self.content_type.to_string()),
            (
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", self.file_name),
            ),
            (
                "Cache-Control",
                "no-cache, no-store, must-revalidate".to_string(),
            ),
            ("Pragma", "no-cache".to_string()),
            ("Expires", "0".to_string()),
        ]
    }
}

//! Single-line CSV tokenizer with quote handling and delimiter detection.
//!
//! # Invariants
//! - Output length is the number of delimiters outside quotes plus one.
//! - Quote characters toggle quoted mode and are never emitted as-is, except
//!   for `""` inside a quoted field when quote unescaping is enabled.
//! - No field-count validation happens here.
//!
//! The raw tokenizer (`tokenize_line`, or `LineTokenizer` without unescaping)
//! does not collapse `""` into `"`: a field written as `"say ""hi"""` reads
//! back as `say hi`. The import decoder enables unescaping to read encoder
//! output back symmetrically.

use std::fmt::{Display, Formatter};

const QUOTE: char = '"';

/// Field separator of a CSV dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    /// Used by French-locale spreadsheet tools and by our own export.
    Semicolon,
}

impl Delimiter {
    pub fn as_char(self) -> char {
        match self {
            Self::Comma => ',',
            Self::Semicolon => ';',
        }
    }

    /// Semicolon when the line contains one, comma otherwise.
    pub fn detect(line: &str) -> Self {
        if line.contains(';') {
            Self::Semicolon
        } else {
            Self::Comma
        }
    }

    /// Like [`Delimiter::detect`], but `None` when the line contains neither
    /// candidate character.
    pub fn sniff(line: &str) -> Option<Self> {
        if line.contains(';') {
            Some(Self::Semicolon)
        } else if line.contains(',') {
            Some(Self::Comma)
        } else {
            None
        }
    }
}

impl Display for Delimiter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Comma => f.write_str("comma"),
            Self::Semicolon => f.write_str("semicolon"),
        }
    }
}

/// Splits lines on a fixed delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTokenizer {
    delimiter: Delimiter,
    unescape_quotes: bool,
}

impl LineTokenizer {
    /// Creates a raw tokenizer: quotes toggle, `""` is not collapsed.
    pub fn new(delimiter: Delimiter) -> Self {
        Self {
            delimiter,
            unescape_quotes: false,
        }
    }

    /// Enables reading `""` inside a quoted field as one literal quote.
    pub fn with_quote_unescaping(mut self, enabled: bool) -> Self {
        self.unescape_quotes = enabled;
        self
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    /// Splits `line` into raw field strings in column order.
    pub fn tokenize(&self, line: &str) -> Vec<String> {
        let separator = self.delimiter.as_char();
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut chars = line.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch == QUOTE {
                if in_quotes && self.unescape_quotes && chars.peek() == Some(&QUOTE) {
                    chars.next();
                    current.push(QUOTE);
                } else {
                    in_quotes = !in_quotes;
                }
            } else if ch == separator && !in_quotes {
                fields.push(std::mem::take(&mut current));
            } else {
                current.push(ch);
            }
        }

        fields.push(current);
        fields
    }
}

/// Tokenizes one line, detecting its delimiter independently of any other line.
pub fn tokenize_line(line: &str) -> Vec<String> {
    LineTokenizer::new(Delimiter::detect(line)).tokenize(line)
}

/// Returns whether `text` ends inside a quoted field that opened at the start
/// of a field, the only shape a record spanning several lines can take.
///
/// A stray quote in the middle of a value (`O"Brien`) never qualifies. Both
/// candidate delimiters count as field boundaries since the record reader runs
/// before the document delimiter is known.
pub fn ends_in_open_quoted_field(text: &str) -> bool {
    let mut in_quotes = false;
    let mut opened_at_field_start = false;
    let mut at_field_start = true;

    for ch in text.chars() {
        if ch == QUOTE {
            if !in_quotes {
                opened_at_field_start = at_field_start;
            }
            in_quotes = !in_quotes;
            at_field_start = false;
        } else if in_quotes {
            continue;
        } else if ch == ';' || ch == ',' {
            at_field_start = true;
        } else if !ch.is_whitespace() {
            at_field_start = false;
        }
    }

    in_quotes && opened_at_field_start
}

#[cfg(test)]
mod tests {
    use super::{ends_in_open_quoted_field, tokenize_line, Delimiter, LineTokenizer};

    #[test]
    fn detects_semicolon_when_present() {
        assert_eq!(Delimiter::detect("a;b,c"), Delimiter::Semicolon);
        assert_eq!(Delimiter::detect("a,b,c"), Delimiter::Comma);
        assert_eq!(Delimiter::detect("single"), Delimiter::Comma);
    }

    #[test]
    fn sniff_returns_none_without_candidates() {
        assert_eq!(Delimiter::sniff("header"), None);
        assert_eq!(Delimiter::sniff("a,b"), Some(Delimiter::Comma));
        assert_eq!(Delimiter::sniff("a;b"), Some(Delimiter::Semicolon));
    }

    #[test]
    fn quoted_delimiter_does_not_split() {
        assert_eq!(tokenize_line(r#"a;"b;c";d"#), vec!["a", "b;c", "d"]);
    }

    #[test]
    fn comma_line_splits_on_commas() {
        assert_eq!(
            tokenize_line("Jean,Dupont,jean@x.com"),
            vec!["Jean", "Dupont", "jean@x.com"]
        );
    }

    #[test]
    fn field_count_is_delimiters_plus_one() {
        assert_eq!(tokenize_line(";;"), vec!["", "", ""]);
        assert_eq!(tokenize_line(""), vec![""]);
        assert_eq!(tokenize_line("a;"), vec!["a", ""]);
    }

    #[test]
    fn raw_mode_does_not_collapse_doubled_quotes() {
        let tokenizer = LineTokenizer::new(Delimiter::Semicolon);
        assert_eq!(
            tokenizer.tokenize(r#"x;"say ""hi""";y"#),
            vec!["x", "say hi", "y"]
        );
    }

    #[test]
    fn unescaping_mode_restores_literal_quotes() {
        let tokenizer = LineTokenizer::new(Delimiter::Semicolon).with_quote_unescaping(true);
        assert_eq!(
            tokenizer.tokenize(r#"x;"say ""hi"" ; bye";y"#),
            vec!["x", r#"say "hi" ; bye"#, "y"]
        );
        assert_eq!(tokenizer.tokenize(r#""";"""""#), vec!["", "\""]);
    }

    #[test]
    fn fixed_delimiter_ignores_other_candidate() {
        let tokenizer = LineTokenizer::new(Delimiter::Semicolon);
        assert_eq!(tokenizer.tokenize("Dupont, Jean;x"), vec!["Dupont, Jean", "x"]);
    }

    #[test]
    fn open_quoted_field_is_detected_at_field_start() {
        assert!(ends_in_open_quoted_field(r#"a;"multi"#));
        assert!(ends_in_open_quoted_field(r#""multi"#));
        assert!(ends_in_open_quoted_field(r#"a, "multi"#));
        assert!(!ends_in_open_quoted_field(r#"a;"b ""c"""#));
        assert!(!ends_in_open_quoted_field("a;b;c"));
    }

    #[test]
    fn stray_quote_inside_value_does_not_open_a_field() {
        assert!(!ends_in_open_quoted_field(r#"Jean;O"Brien;jean@x.com"#));
        assert!(!ends_in_open_quoted_field(r#"Pr"énom;Nom;Email"#));
    }
}

//! Line-oriented CSV codec for listing files.
//!
//! Reading is permissive: each line is tokenized on its own, and a
//! line that cannot be tokenized is set aside rather than aborting the whole
//! file. Writing always quotes every field, so output produced here reads back
//! to the same values.

use std::fmt;
use std::io;

use crate::model::{Dataset, MalformedLine, Record};

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Why a line failed to tokenize. Columns are 1-based byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    /// A quoted field was still open at end of line.
    UnterminatedQuote { column: usize },
    /// A `"` inside an unquoted field.
    StrayQuote { column: usize },
    /// Text between a closing quote and the next separator.
    TrailingText { column: usize },
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedQuote { column } => {
                write!(f, "unterminated quote opened at column {column}")
            }
            Self::StrayQuote { column } => {
                write!(f, "stray quote in unquoted field at column {column}")
            }
            Self::TrailingText { column } => {
                write!(f, "unexpected text after closing quote at column {column}")
            }
        }
    }
}

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Split one line into fields.
///
/// A field is either a quoted token, where `""` stands for a literal quote, or
/// an unquoted run of non-comma characters kept verbatim. Blanks before an
/// opening quote or after a closing quote are dropped. Empty fields between
/// separators are kept.
pub fn parse_line(line: &str) -> Result<Vec<String>, LineError> {
    let bytes = line.as_bytes();
    let len = bytes.len();
    let mut fields = Vec::new();
    let mut pos = 0;

    // Every index we slice at sits on an ASCII byte, so slicing stays on
    // char boundaries.
    loop {
        let field_start = pos;
        while pos < len && is_blank(bytes[pos]) {
            pos += 1;
        }

        if pos < len && bytes[pos] == b'"' {
            let open = pos;
            pos += 1;
            let mut value = String::new();
            let mut seg_start = pos;
            loop {
                if pos >= len {
                    return Err(LineError::UnterminatedQuote { column: open + 1 });
                }
                if bytes[pos] != b'"' {
                    pos += 1;
                    continue;
                }
                value.push_str(&line[seg_start..pos]);
                if pos + 1 < len && bytes[pos + 1] == b'"' {
                    value.push('"');
                    pos += 2;
                    seg_start = pos;
                } else {
                    pos += 1;
                    break;
                }
            }
            while pos < len && is_blank(bytes[pos]) {
                pos += 1;
            }
            if pos < len && bytes[pos] != b',' {
                return Err(LineError::TrailingText { column: pos + 1 });
            }
            fields.push(value);
        } else {
            while pos < len && bytes[pos] != b',' {
                if bytes[pos] == b'"' {
                    return Err(LineError::StrayQuote { column: pos + 1 });
                }
                pos += 1;
            }
            fields.push(line[field_start..pos].to_string());
        }

        if pos >= len {
            break;
        }
        // consume ','
        pos += 1;
    }

    Ok(fields)
}

/// Parse a whole file: first line is the header, the rest are records.
///
/// Surrounding whitespace of the file and blank lines are ignored. Lines that
/// fail to tokenize are collected in `Dataset::malformed` and produce no record.
pub fn parse_dataset(content: &str) -> Dataset {
    let leading = &content[..content.len() - content.trim_start().len()];
    let line_offset = leading.matches('\n').count();

    let mut lines = content.trim().split('\n');
    let header = lines
        .next()
        .unwrap_or("")
        .trim_end_matches('\r')
        .to_string();

    let mut records = Vec::new();
    let mut malformed = Vec::new();

    for (idx, raw) in lines.enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(fields) => records.push(Record { fields }),
            Err(error) => malformed.push(MalformedLine {
                line_number: line_offset + idx + 2,
                content: line.to_string(),
                error,
            }),
        }
    }

    Dataset {
        header,
        records,
        malformed,
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Render one record with every field quoted and inner quotes doubled.
pub fn quote_record(record: &Record) -> csv::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(&record.fields)?;
    let mut bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    String::from_utf8(bytes)
        .map_err(|e| csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Header followed by one quoted line per record, no trailing newline.
pub fn render_dataset(header: &str, records: &[Record]) -> csv::Result<String> {
    let mut out = String::from(header);
    for record in records {
        out.push('\n');
        out.push_str(&quote_record(record)?);
    }
    Ok(out)
}

/// `existing` with quoted records appended, one per line.
///
/// A separator goes in front of each record unless the buffer is empty or
/// already ends in a newline, so appending never leaves a blank line.
pub fn append_records(existing: &str, records: &[Record]) -> csv::Result<String> {
    let mut out = String::from(existing);
    for record in records {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&quote_record(record)?);
    }
    Ok(out)
}

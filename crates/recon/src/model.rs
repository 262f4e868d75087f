use serde::Serialize;

use crate::codec::LineError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One data row. By convention the columns are
/// `Name, Address, Detail URL, Phone, Website, Email`, but nothing here
/// enforces that.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub fields: Vec<String>,
}

impl Record {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Field at `index`, or `""` when the row is shorter.
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }
}

/// A data line that failed to tokenize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedLine {
    /// 1-based, counting the header as line 1.
    pub line_number: usize,
    pub content: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: LineError,
}

fn serialize_display<S: serde::Serializer>(err: &LineError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

/// Header line plus records in file order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Verbatim header line, never re-quoted.
    pub header: String,
    pub records: Vec<Record>,
    pub malformed: Vec<MalformedLine>,
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Outcome of deduplicating an incoming batch against the master keys.
#[derive(Debug, Clone, Default)]
pub struct MergePlan {
    /// Incoming records with unique, non-empty keys, first-seen order.
    pub kept: Vec<Record>,
    /// Subset of `kept` whose key is not in the master dataset.
    pub append: Vec<Record>,
    /// Keys of `append`, same order.
    pub append_keys: Vec<String>,
    /// Records dropped because their key was already seen in the batch.
    pub duplicates: usize,
    /// Records dropped because their key was empty.
    pub empty_keys: usize,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub incoming_rows: usize,
    pub kept_rows: usize,
    pub removed_rows: usize,
    pub duplicates: usize,
    pub empty_keys: usize,
    pub malformed_lines: usize,
    pub appended: usize,
    pub bootstrapped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub engine_version: String,
    pub run_at: String,
    pub incoming: String,
    pub master: String,
    pub key_strategy: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub meta: ReportMeta,
    pub summary: MergeSummary,
    pub appended_keys: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub malformed: Vec<MalformedLine>,
}

impl MergeReport {
    /// Rows appended to the master file. Zero on the bootstrap path.
    pub fn appended_count(&self) -> usize {
        self.summary.appended
    }
}

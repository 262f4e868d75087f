use std::fmt;
use std::path::PathBuf;

use crate::model::MalformedLine;

#[derive(Debug)]
pub enum MergeError {
    /// The incoming batch file does not exist. Nothing was written.
    MissingIncoming(PathBuf),
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (same path for both files, bad key columns, etc.).
    ConfigValidation(String),
    /// Lines that failed to tokenize while the strict policy is active.
    Malformed { path: PathBuf, lines: Vec<MalformedLine> },
    /// IO error (file read, staging write, rename).
    Io { path: PathBuf, message: String },
}

impl MergeError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIncoming(path) => {
                write!(f, "incoming file not found: {}", path.display())
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Malformed { path, lines } => {
                write!(f, "{}: {} malformed line(s)", path.display(), lines.len())?;
                for line in lines.iter().take(5) {
                    write!(f, "\n  line {}: {}", line.line_number, line.error)?;
                }
                if lines.len() > 5 {
                    write!(f, "\n  ... and {} more", lines.len() - 5)?;
                }
                Ok(())
            }
            Self::Io { path, message } => write!(f, "{}: {message}", path.display()),
        }
    }
}

impl std::error::Error for MergeError {}

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::MergeError;
use crate::key::{KeySpec, KeyStrategy};
use crate::store::same_file;

pub const DEFAULT_INCOMING: &str = "maps_data_playwright.csv";
pub const DEFAULT_MASTER: &str = "data.csv";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub key: KeySpec,
    #[serde(default)]
    pub malformed: MalformedPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub incoming: PathBuf,
    pub master: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            incoming: PathBuf::from(DEFAULT_INCOMING),
            master: PathBuf::from(DEFAULT_MASTER),
        }
    }
}

// ---------------------------------------------------------------------------
// Malformed-line policy
// ---------------------------------------------------------------------------

/// What to do with lines that fail to tokenize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Drop silently.
    Skip,
    /// Drop and log a warning per line.
    #[default]
    Warn,
    /// Fail the run before anything is written.
    Strict,
}

impl std::fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Warn => write!(f, "warn"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

// ---------------------------------------------------------------------------
// Run options
// ---------------------------------------------------------------------------

/// Everything `reconcile_with` needs besides the two paths.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    pub key: KeySpec,
    pub malformed: MalformedPolicy,
    pub dry_run: bool,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MergeConfig {
    pub fn from_toml(input: &str) -> Result<Self, MergeError> {
        let config: MergeConfig =
            toml::from_str(input).map_err(|e| MergeError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file. Relative file paths inside it are
    /// resolved against the config file's directory.
    pub fn load(path: &Path) -> Result<Self, MergeError> {
        let input = std::fs::read_to_string(path).map_err(|e| MergeError::io(path, e))?;
        let mut config = Self::from_toml(&input)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.files.incoming = base_dir.join(&config.files.incoming);
        config.files.master = base_dir.join(&config.files.master);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        if self.files.incoming.as_os_str().is_empty() || self.files.master.as_os_str().is_empty() {
            return Err(MergeError::ConfigValidation(
                "files.incoming and files.master must not be empty".into(),
            ));
        }

        if same_file(&self.files.incoming, &self.files.master) {
            return Err(same_file_error(&self.files.incoming, &self.files.master));
        }

        if self.key.strategy == KeyStrategy::NameAddress
            && self.key.name_column == self.key.address_column
        {
            return Err(MergeError::ConfigValidation(format!(
                "key.name_column and key.address_column are both {}",
                self.key.name_column
            )));
        }

        Ok(())
    }

    pub fn options(&self, dry_run: bool) -> MergeOptions {
        MergeOptions {
            key: self.key.clone(),
            malformed: self.malformed,
            dry_run,
        }
    }
}

pub(crate) fn same_file_error(incoming: &Path, master: &Path) -> MergeError {
    MergeError::ConfigValidation(format!(
        "incoming and master must be different files, '{}' and '{}' are the same",
        incoming.display(),
        master.display()
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::model::Record;

/// Lowercase, then trim surrounding whitespace. Internal whitespace is kept.
pub fn normalize(value: &str) -> String {
    value.to_lowercase().trim().to_string()
}

/// Maps a record to the key that decides whether two records are the same
/// listing. An empty key means the record has no identity and is dropped.
pub trait IdentityKey {
    fn key(&self, record: &Record) -> String;
}

impl<F> IdentityKey for F
where
    F: Fn(&Record) -> String,
{
    fn key(&self, record: &Record) -> String {
        self(record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Normalized name only.
    #[default]
    Name,
    /// Normalized name plus normalized address.
    NameAddress,
}

impl std::fmt::Display for KeyStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::NameAddress => write!(f, "name_address"),
        }
    }
}

/// Column-positional key: which strategy, and where name/address live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeySpec {
    pub strategy: KeyStrategy,
    pub name_column: usize,
    pub address_column: usize,
}

impl Default for KeySpec {
    fn default() -> Self {
        Self {
            strategy: KeyStrategy::Name,
            name_column: 0,
            address_column: 1,
        }
    }
}

impl KeySpec {
    pub fn with_strategy(strategy: KeyStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }
}

// ASCII unit separator between key parts.
const KEY_JOIN: char = '\u{1f}';

impl IdentityKey for KeySpec {
    fn key(&self, record: &Record) -> String {
        let name = normalize(record.field(self.name_column));
        if name.is_empty() {
            return name;
        }
        match self.strategy {
            KeyStrategy::Name => name,
            KeyStrategy::NameAddress => {
                let address = normalize(record.field(self.address_column));
                format!("{name}{KEY_JOIN}{address}")
            }
        }
    }
}

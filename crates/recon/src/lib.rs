//! `cowork-recon` — merges a freshly scraped listing CSV into a cumulative
//! master CSV.
//!
//! The incoming batch is deduplicated by a normalized identity key and
//! rewritten in place; only records the master does not have yet are
//! appended to it. No CLI dependencies.

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod model;
pub mod store;

pub use config::{MalformedPolicy, MergeConfig, MergeOptions};
pub use engine::{plan, reconcile, reconcile_with};
pub use error::MergeError;
pub use key::{IdentityKey, KeySpec, KeyStrategy};
pub use model::{Dataset, MergeReport, MergeSummary, Record};

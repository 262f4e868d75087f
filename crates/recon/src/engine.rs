use std::collections::HashSet;
use std::path::Path;

use crate::codec::{append_records, parse_dataset, render_dataset};
use crate::config::{same_file_error, MalformedPolicy, MergeOptions};
use crate::error::MergeError;
use crate::key::IdentityKey;
use crate::model::{Dataset, MergePlan, MergeReport, MergeSummary, ReportMeta};
use crate::store::{same_file, Transaction};

/// Deduplicate `incoming` and pick the records `master` does not have yet.
///
/// First occurrence wins inside the batch. Records with an empty key are
/// dropped from both outputs.
pub fn plan<K>(incoming: &Dataset, master: &Dataset, key: &K) -> MergePlan
where
    K: IdentityKey + ?Sized,
{
    let mut master_keys: HashSet<String> = master.records.iter().map(|r| key.key(r)).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = MergePlan::default();

    for record in &incoming.records {
        let k = key.key(record);
        if k.is_empty() {
            out.empty_keys += 1;
            continue;
        }
        if !seen.insert(k.clone()) {
            out.duplicates += 1;
            continue;
        }
        out.kept.push(record.clone());
        if master_keys.insert(k.clone()) {
            out.append.push(record.clone());
            out.append_keys.push(k);
        }
    }

    log::debug!(
        "plan: {} kept, {} to append, {} duplicate(s), {} without key",
        out.kept.len(),
        out.append.len(),
        out.duplicates,
        out.empty_keys
    );
    out
}

/// Reconcile with default options: name key, warn on malformed lines.
pub fn reconcile(incoming_path: &Path, master_path: &Path) -> Result<MergeReport, MergeError> {
    reconcile_with(incoming_path, master_path, &MergeOptions::default())
}

/// Rewrite the incoming batch without duplicates and append its new records
/// to the master file.
///
/// When the master file does not exist yet, or holds nothing but whitespace,
/// the incoming file is copied to it verbatim instead.
pub fn reconcile_with(
    incoming_path: &Path,
    master_path: &Path,
    opts: &MergeOptions,
) -> Result<MergeReport, MergeError> {
    if !incoming_path.exists() {
        return Err(MergeError::MissingIncoming(incoming_path.to_path_buf()));
    }
    if same_file(incoming_path, master_path) {
        return Err(same_file_error(incoming_path, master_path));
    }

    let meta = ReportMeta {
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        run_at: chrono::Utc::now().to_rfc3339(),
        incoming: incoming_path.display().to_string(),
        master: master_path.display().to_string(),
        key_strategy: opts.key.strategy.to_string(),
        dry_run: opts.dry_run,
    };

    if !master_path.exists() {
        return bootstrap(incoming_path, master_path, opts, meta);
    }

    let master_content =
        std::fs::read_to_string(master_path).map_err(|e| MergeError::io(master_path, e))?;
    if master_content.trim().is_empty() {
        // No header to append under.
        log::info!("{} is empty, treating it as missing", master_path.display());
        return bootstrap(incoming_path, master_path, opts, meta);
    }
    let incoming_content =
        std::fs::read_to_string(incoming_path).map_err(|e| MergeError::io(incoming_path, e))?;

    let incoming = parse_dataset(&incoming_content);
    let master = parse_dataset(&master_content);
    check_malformed(incoming_path, &incoming, opts.malformed)?;
    check_malformed(master_path, &master, opts.malformed)?;

    let merge = plan(&incoming, &master, &opts.key);

    let cleaned = render_dataset(&incoming.header, &merge.kept).map_err(|e| MergeError::Io {
        path: incoming_path.to_path_buf(),
        message: e.to_string(),
    })?;

    if opts.dry_run {
        log::info!("dry run: nothing written");
    } else {
        let mut tx = Transaction::new();
        // Master is renamed before incoming.
        if !merge.append.is_empty() {
            let updated =
                append_records(&master_content, &merge.append).map_err(|e| MergeError::Io {
                    path: master_path.to_path_buf(),
                    message: e.to_string(),
                })?;
            tx.stage(master_path, updated.as_bytes())?;
        }
        tx.stage(incoming_path, cleaned.as_bytes())?;
        tx.commit()?;
        log::info!(
            "rewrote {} with {} row(s), appended {} row(s) to {}",
            incoming_path.display(),
            merge.kept.len(),
            merge.append.len(),
            master_path.display()
        );
    }

    let incoming_rows = incoming.records.len() + incoming.malformed.len();
    let summary = MergeSummary {
        incoming_rows,
        kept_rows: merge.kept.len(),
        removed_rows: incoming_rows - merge.kept.len(),
        duplicates: merge.duplicates,
        empty_keys: merge.empty_keys,
        malformed_lines: incoming.malformed.len(),
        appended: merge.append.len(),
        bootstrapped: false,
    };

    Ok(MergeReport {
        meta,
        summary,
        appended_keys: merge.append_keys,
        malformed: incoming.malformed,
    })
}

fn bootstrap(
    incoming_path: &Path,
    master_path: &Path,
    opts: &MergeOptions,
    meta: ReportMeta,
) -> Result<MergeReport, MergeError> {
    let bytes = std::fs::read(incoming_path).map_err(|e| MergeError::io(incoming_path, e))?;

    if opts.dry_run {
        log::info!("dry run: {} would be created", master_path.display());
    } else {
        let mut tx = Transaction::new();
        tx.stage(master_path, &bytes)?;
        tx.commit()?;
        log::info!(
            "created {} from {}",
            master_path.display(),
            incoming_path.display()
        );
    }

    let dataset = parse_dataset(&String::from_utf8_lossy(&bytes));
    let rows = dataset.records.len() + dataset.malformed.len();
    Ok(MergeReport {
        meta,
        summary: MergeSummary {
            incoming_rows: rows,
            kept_rows: rows,
            malformed_lines: dataset.malformed.len(),
            bootstrapped: true,
            ..MergeSummary::default()
        },
        appended_keys: Vec::new(),
        malformed: dataset.malformed,
    })
}

fn check_malformed(
    path: &Path,
    dataset: &Dataset,
    policy: MalformedPolicy,
) -> Result<(), MergeError> {
    if dataset.malformed.is_empty() {
        return Ok(());
    }
    match policy {
        MalformedPolicy::Skip => Ok(()),
        MalformedPolicy::Warn => {
            for line in &dataset.malformed {
                log::warn!(
                    "{}:{}: {}, line skipped",
                    path.display(),
                    line.line_number,
                    line.error
                );
            }
            Ok(())
        }
        MalformedPolicy::Strict => Err(MergeError::Malformed {
            path: path.to_path_buf(),
            lines: dataset.malformed.clone(),
        }),
    }
}

//! Staged file replacement: write every output to a sibling `.tmp` file
//! first, then rename them into place in staging order.
//!
//! A replaced target keeps its permission bits, but it is a new file: hard
//! links to the old one keep the old content.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::MergeError;

#[derive(Debug)]
struct Staged {
    target: PathBuf,
    tmp: PathBuf,
}

/// A set of pending file replacements.
///
/// Nothing is visible at the target paths until `commit`. Dropping an
/// uncommitted transaction removes its temp files.
#[derive(Debug, Default)]
pub struct Transaction {
    staged: Vec<Staged>,
}

pub fn tmp_path(target: &Path) -> Result<PathBuf, MergeError> {
    let name = target.file_name().ok_or_else(|| MergeError::Io {
        path: target.to_path_buf(),
        message: "path has no file name".into(),
    })?;
    let mut tmp_name = name.to_os_string();
    tmp_name.push(".tmp");
    Ok(target.with_file_name(tmp_name))
}

/// True when both paths name the same file, either as written or, when both
/// exist, once resolved.
pub fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.staged.len()
    }

    /// Write `content` to the temp file for `target` and flush it to disk.
    pub fn stage(&mut self, target: &Path, content: &[u8]) -> Result<(), MergeError> {
        let tmp = tmp_path(target)?;
        // Track before writing so a failed write is still cleaned up.
        self.staged.push(Staged {
            target: target.to_path_buf(),
            tmp: tmp.clone(),
        });

        let mut file = File::create(&tmp).map_err(|e| MergeError::io(&tmp, e))?;
        file.write_all(content).map_err(|e| MergeError::io(&tmp, e))?;
        if let Ok(meta) = std::fs::metadata(target) {
            std::fs::set_permissions(&tmp, meta.permissions())
                .map_err(|e| MergeError::io(&tmp, e))?;
        }
        file.sync_all().map_err(|e| MergeError::io(&tmp, e))?;
        log::debug!("staged {} ({} bytes)", tmp.display(), content.len());
        Ok(())
    }

    /// Rename staged files over their targets, in staging order.
    pub fn commit(mut self) -> Result<(), MergeError> {
        while !self.staged.is_empty() {
            let next = self.staged.remove(0);
            if let Err(e) = std::fs::rename(&next.tmp, &next.target) {
                let _ = std::fs::remove_file(&next.tmp);
                return Err(MergeError::Io {
                    path: next.target,
                    message: format!("failed to rename tmp to output: {e}"),
                });
            }
            log::debug!("committed {}", next.target.display());
        }
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        for staged in self.staged.drain(..) {
            if staged.tmp.exists() {
                let _ = std::fs::remove_file(&staged.tmp);
            }
        }
    }
}

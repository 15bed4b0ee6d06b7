//! Durable snapshots of table generations.
//!
//! Each generation is stored as `{dir}/dlt-{version:020}.bin` holding the
//! exact wire encoding. Writes go to a temporary file first and are renamed
//! into place, so a crash never leaves a half-written snapshot under a
//! valid name, and a failed write removes its temporary file.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::dlt::Dlt;
use crate::error::DltError;

const PREFIX: &str = "dlt-";
const SUFFIX: &str = ".bin";
/// Width of the zero-padded version in a snapshot name.
const VERSION_DIGITS: usize = 20;

/// Directory of serialized table generations.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, DltError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, version: u64) -> PathBuf {
        self.dir
            .join(format!("{PREFIX}{version:0width$}{SUFFIX}", width = VERSION_DIGITS))
    }

    /// Persist `dlt`, replacing any snapshot with the same version.
    pub fn save(&self, dlt: &Dlt) -> Result<PathBuf, DltError> {
        let path = self.path_for(dlt.version());
        let tmp_path = path.with_extension("tmp");
        let written = std::fs::write(&tmp_path, dlt.serialize())
            .and_then(|()| std::fs::rename(&tmp_path, &path));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(DltError::Io(e));
        }

        info!(version = dlt.version(), path = %path.display(), "saved table snapshot");
        Ok(path)
    }

    /// Load the snapshot for `version`, if present.
    pub fn load(&self, version: u64) -> Result<Option<Dlt>, DltError> {
        let path = self.path_for(version);
        match std::fs::read(&path) {
            Ok(bytes) => {
                let dlt = Dlt::deserialize(&bytes)?;
                if dlt.version() != version {
                    return Err(DltError::MalformedTable(format!(
                        "{} holds version {}",
                        path.display(),
                        dlt.version()
                    )));
                }
                debug!(version, "loaded table snapshot");
                Ok(Some(dlt))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DltError::Io(e)),
        }
    }

    /// Load the newest stored generation.
    pub fn load_latest(&self) -> Result<Option<Dlt>, DltError> {
        match self.versions()?.last() {
            Some(&version) => self.load(version),
            None => Ok(None),
        }
    }

    /// All stored versions, ascending.
    pub fn versions(&self) -> Result<Vec<u64>, DltError> {
        let mut versions = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            match parse_version(name) {
                Some(version) => versions.push(version),
                None => {
                    if !name.ends_with(".tmp") {
                        warn!(file = name, "ignoring unrecognized file in snapshot dir");
                    }
                }
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    /// Delete all but the `keep` newest generations; returns how many were
    /// removed. The newest generation is always kept.
    pub fn prune(&self, keep: usize) -> Result<usize, DltError> {
        let versions = self.versions()?;
        let keep = keep.max(1);
        if versions.len() <= keep {
            return Ok(0);
        }

        let retired = &versions[..versions.len() - keep];
        for &version in retired {
            std::fs::remove_file(self.path_for(version))?;
            debug!(version, "retired table snapshot");
        }
        info!(removed = retired.len(), kept = keep, "pruned table snapshots");
        Ok(retired.len())
    }
}

/// Only names `save` could have produced count; `dlt-99.bin` is not a snapshot.
fn parse_version(file_name: &str) -> Option<u64> {
    let digits = file_name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    if digits.len() != VERSION_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_requires_padded_digits() {
        assert_eq!(parse_version("dlt-00000000000000000042.bin"), Some(42));
        assert_eq!(parse_version("dlt-18446744073709551615.bin"), Some(u64::MAX));
        assert_eq!(parse_version("dlt-99.bin"), None);
        assert_eq!(parse_version("dlt-+0000000000000000042.bin"), None);
        assert_eq!(parse_version("dlt-99999999999999999999.bin"), None);
        assert_eq!(parse_version("dlt-00000000000000000042.tmp"), None);
    }
}

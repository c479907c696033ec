/*!
 * Archive oracle
 *
 * Answers one question for the search: does this candidate key unlock
 * the archive? The ZIP implementation:
 * - Picks a single test member once per run (the smallest encrypted file)
 * - Keeps one open archive handle per worker
 * - Reads the member to the end so the CRC check rejects keys that only
 *   pass the one-byte ZipCrypto header check
 */

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::ArchiveError;

/// Decides whether a candidate key unlocks the target
pub trait Oracle {
    fn try_unlock(&mut self, candidate: &[u8]) -> bool;
}

impl<F> Oracle for F
where
    F: FnMut(&[u8]) -> bool,
{
    fn try_unlock(&mut self, candidate: &[u8]) -> bool {
        self(candidate)
    }
}

/// Builds one oracle per worker
///
/// `validate` runs once on the coordinator before anything is dispatched;
/// `open` may run concurrently from every worker thread.
pub trait OracleFactory: Sync {
    type Oracle: Oracle;

    fn validate(&mut self) -> Result<(), ArchiveError>;

    fn open(&self) -> Result<Self::Oracle, ArchiveError>;
}

/// Directory entry of an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    pub index: usize,
    pub name: String,
    /// Bytes stored in the archive (compressed, including encryption header)
    pub stored_size: u64,
    pub size: u64,
    pub encrypted: bool,
    pub is_dir: bool,
}

type ZipHandle = ZipArchive<BufReader<File>>;

fn open_archive(path: &Path) -> Result<ZipHandle, ArchiveError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ArchiveError::NotFound(path.to_path_buf()),
        _ => ArchiveError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    ZipArchive::new(BufReader::new(file)).map_err(|e| ArchiveError::BadFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Opening an encrypted entry without a password is refused up front
fn is_encrypted(archive: &mut ZipHandle, index: usize) -> bool {
    matches!(
        archive.by_index(index),
        Err(ZipError::UnsupportedArchive(msg)) if msg == ZipError::PASSWORD_REQUIRED
    )
}

fn read_members(archive: &mut ZipHandle, path: &Path) -> Result<Vec<ArchiveMember>, ArchiveError> {
    let mut members = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let encrypted = is_encrypted(archive, index);
        let file = archive
            .by_index_raw(index)
            .map_err(|e| ArchiveError::BadFormat {
                path: path.to_path_buf(),
                reason: format!("unreadable entry #{}: {}", index, e),
            })?;

        members.push(ArchiveMember {
            index,
            name: file.name().to_string(),
            stored_size: file.compressed_size(),
            size: file.size(),
            encrypted,
            is_dir: file.is_dir(),
        });
    }

    Ok(members)
}

/// List the members of a ZIP archive
pub fn list_members(path: &Path) -> Result<Vec<ArchiveMember>, ArchiveError> {
    let mut archive = open_archive(path)?;
    read_members(&mut archive, path)
}

/// Choose the member every candidate is tested against
///
/// Smallest stored size among encrypted files. Empty files are only used
/// when nothing else is encrypted: without data there is no CRC to catch
/// the 1-in-256 keys that pass the ZipCrypto header check.
pub fn select_test_member(members: &[ArchiveMember]) -> Option<&ArchiveMember> {
    let files = members.iter().filter(|m| !m.is_dir && m.encrypted);

    let with_data = files
        .clone()
        .filter(|m| m.size > 0)
        .min_by_key(|m| m.stored_size);

    with_data.or_else(|| files.min_by_key(|m| m.stored_size))
}

/// Oracle factory for a password-protected ZIP file
pub struct ZipOracleFactory {
    path: PathBuf,
    target: Option<ArchiveMember>,
}

impl ZipOracleFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            target: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Member chosen by `validate`
    pub fn target(&self) -> Option<&ArchiveMember> {
        self.target.as_ref()
    }

    fn resolve_target(&self) -> Result<ArchiveMember, ArchiveError> {
        let mut archive = open_archive(&self.path)?;
        let members = read_members(&mut archive, &self.path)?;

        if !members.iter().any(|m| !m.is_dir) {
            return Err(ArchiveError::Empty(self.path.clone()));
        }

        select_test_member(&members)
            .cloned()
            .ok_or_else(|| ArchiveError::NotEncrypted(self.path.clone()))
    }
}

impl OracleFactory for ZipOracleFactory {
    type Oracle = ZipOracle;

    fn validate(&mut self) -> Result<(), ArchiveError> {
        let target = self.resolve_target()?;
        info!(
            archive = %self.path.display(),
            member = %target.name,
            stored_size = target.stored_size,
            "Selected test member"
        );
        self.target = Some(target);
        Ok(())
    }

    fn open(&self) -> Result<ZipOracle, ArchiveError> {
        let index = match &self.target {
            Some(target) => target.index,
            None => self.resolve_target()?.index,
        };

        debug!(archive = %self.path.display(), index, "Opening archive handle");

        Ok(ZipOracle {
            archive: open_archive(&self.path)?,
            index,
        })
    }
}

/// One open archive handle, reused for every attempt of a worker
pub struct ZipOracle {
    archive: ZipHandle,
    index: usize,
}

impl Oracle for ZipOracle {
    fn try_unlock(&mut self, candidate: &[u8]) -> bool {
        match self.archive.by_index_decrypt(self.index, candidate) {
            Ok(Ok(mut file)) => io::copy(&mut file, &mut io::sink()).is_ok(),
            // Wrong key, bad header, transient read error: all negative
            Ok(Err(_)) | Err(_) => false,
        }
    }
}

/// Extract every member of the archive into `dest` using `password`
pub fn extract_all(path: &Path, password: &str, dest: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let extract_err = |reason: String| ArchiveError::Extract {
        path: path.to_path_buf(),
        reason,
    };

    std::fs::create_dir_all(dest)
        .map_err(|e| extract_err(format!("failed to create destination: {}", e)))?;

    let mut archive = open_archive(path)?;
    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut file = archive
            .by_index_decrypt(index, password.as_bytes())
            .map_err(|e| extract_err(format!("failed to read entry #{}: {}", index, e)))?
            .map_err(|_| extract_err("wrong password".to_string()))?;

        let out_path = match file.enclosed_name() {
            Some(name) => dest.join(name),
            None => {
                warn!(name = %file.name(), "Skipping entry with unsafe path");
                continue;
            }
        };

        if file.is_dir() {
            std::fs::create_dir_all(&out_path)
                .map_err(|e| extract_err(format!("failed to create directory: {}", e)))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| extract_err(format!("failed to create parent directories: {}", e)))?;
        }

        let mut out = File::create(&out_path)
            .map_err(|e| extract_err(format!("failed to create output file: {}", e)))?;
        io::copy(&mut file, &mut out)
            .map_err(|e| extract_err(format!("failed to extract {}: {}", out_path.display(), e)))?;

        extracted.push(out_path);
    }

    info!(
        archive = %path.display(),
        extracted = extracted.len(),
        "Archive extracted"
    );

    Ok(extracted)
}

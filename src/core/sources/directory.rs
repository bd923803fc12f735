use std::collections::HashSet;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::index::{collect_archives, IndexedArchive};
use super::{ArtifactSource, LookupFrame, ResourceLocation, SourceIdentity};
use crate::core::error::{JarlinkError, JarlinkResult};

/// Jars under a directory, indexed incrementally.
///
/// The index only grows: a rescan adds archives it has not seen and never
/// drops one that vanished from disk. Lookups skip indexed archives whose
/// file no longer exists, so a pruned version stops resolving immediately.
pub struct DirectorySource {
    directory: PathBuf,
    index: RwLock<DirectoryIndex>,
}

#[derive(Default)]
struct DirectoryIndex {
    known: HashSet<PathBuf>,
    archives: Vec<IndexedArchive>,
}

impl DirectorySource {
    /// Open and index `directory`. The path must name an existing directory.
    pub fn open(directory: &Path) -> JarlinkResult<Self> {
        let directory = canonical_directory(directory)?;
        let source = Self {
            directory,
            index: RwLock::new(DirectoryIndex::default()),
        };
        source.rescan_index()?;
        Ok(source)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Indexed archive paths in lookup order.
    pub fn indexed_archives(&self) -> Vec<PathBuf> {
        self.index
            .read()
            .archives
            .iter()
            .map(|a| a.path.clone())
            .collect()
    }

    /// Walk the directory and index archives not seen before.
    ///
    /// Archives that cannot be opened are logged and left unindexed, so the
    /// next rescan tries them again.
    pub fn rescan_index(&self) -> JarlinkResult<usize> {
        let discovered =
            collect_archives(&self.directory).map_err(|e| JarlinkError::io(&self.directory, e))?;

        let fresh: Vec<PathBuf> = {
            let index = self.index.read();
            discovered
                .into_iter()
                .map(|p| std::fs::canonicalize(&p).unwrap_or(p))
                .filter(|p| !index.known.contains(p))
                .collect()
        };
        if fresh.is_empty() {
            return Ok(0);
        }

        let mut opened = Vec::with_capacity(fresh.len());
        for path in fresh {
            match IndexedArchive::open(&path) {
                Ok(archive) => opened.push(archive),
                Err(e) => warn!("Cannot index {:?}: {}", path, e),
            }
        }

        let mut index = self.index.write();
        let mut added = 0;
        for archive in opened {
            // A concurrent rescan may have won the race for this path.
            if index.known.insert(archive.path.clone()) {
                index.archives.push(archive);
                added += 1;
            }
        }

        if added > 0 {
            debug!("Indexed {} new archive(s) under {:?}", added, self.directory);
        }
        Ok(added)
    }

    /// Re-read an indexed archive that was overwritten in place.
    ///
    /// The archive keeps its position in the index. Paths that are not
    /// indexed yet are left to the next rescan.
    pub fn refresh_archive(&self, archive: &Path) -> JarlinkResult<bool> {
        let path = std::fs::canonicalize(archive).map_err(|e| JarlinkError::io(archive, e))?;
        if !self.index.read().known.contains(&path) {
            return Ok(false);
        }

        let reopened = IndexedArchive::open(&path)?;
        let mut index = self.index.write();
        match index.archives.iter_mut().find(|a| a.path == path) {
            Some(slot) => {
                *slot = reopened;
                debug!("Re-indexed {:?}", path);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl ArtifactSource for DirectorySource {
    fn identity(&self) -> SourceIdentity {
        SourceIdentity::Directory(self.directory.clone())
    }

    fn find_resource(&self, name: &str, _frame: &mut LookupFrame) -> Option<ResourceLocation> {
        let index = self.index.read();
        index
            .archives
            .iter()
            .find(|a| a.contains(name) && a.path.is_file())
            .map(|a| ResourceLocation::in_archive(a.path.clone(), name))
    }

    fn rescan(&self) -> JarlinkResult<usize> {
        self.rescan_index()
    }

    fn refresh(&self, archive: &Path) -> JarlinkResult<bool> {
        self.refresh_archive(archive)
    }
}

/// Validate a directory source path and make it absolute.
pub(crate) fn canonical_directory(directory: &Path) -> JarlinkResult<PathBuf> {
    if directory.as_os_str().is_empty() {
        return Err(JarlinkError::Configuration(
            "directory path must not be empty".into(),
        ));
    }
    if !directory.exists() {
        return Err(JarlinkError::Configuration(format!(
            "{:?} does not exist",
            directory
        )));
    }
    if !directory.is_dir() {
        return Err(JarlinkError::Configuration(format!(
            "{:?} is not a directory",
            directory
        )));
    }
    std::fs::canonicalize(directory).map_err(|e| JarlinkError::io(directory, e))
}

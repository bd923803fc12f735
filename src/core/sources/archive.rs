use std::collections::HashSet;
use std::io::Cursor;
use std::path::PathBuf;

use tracing::{debug, warn};

use super::index::{entry_names, read_entry, IndexedArchive};
use super::{ArtifactSource, LookupFrame, Origin, ResourceLocation, SourceIdentity};
use crate::core::downloader::Transport;
use crate::core::error::JarlinkResult;

/// A fixed list of archives supplied at construction.
///
/// Unlike [`super::DirectorySource`] nothing is ever added later.
pub struct ArchiveSource {
    locations: Vec<String>,
    archives: Vec<LoadedArchive>,
}

enum LoadedArchive {
    Local(IndexedArchive),
    Remote {
        url: String,
        bytes: Vec<u8>,
        entries: HashSet<String>,
    },
}

impl ArchiveSource {
    /// Index jars on disk. Unreadable jars are logged and skipped; they keep
    /// their place in the identity so re-registering the same list is a no-op.
    pub fn from_paths(paths: &[PathBuf]) -> Self {
        let locations = paths.iter().map(|p| p.display().to_string()).collect();
        let archives = paths
            .iter()
            .filter_map(|path| match IndexedArchive::open(path) {
                Ok(archive) => Some(LoadedArchive::Local(archive)),
                Err(e) => {
                    warn!("Skipping archive {:?}: {}", path, e);
                    None
                }
            })
            .collect();

        Self {
            locations,
            archives,
        }
    }

    /// Download each URL once and keep the archive in memory.
    pub async fn fetch(transport: &dyn Transport, urls: &[String]) -> Self {
        let mut archives = Vec::with_capacity(urls.len());

        for url in urls {
            let bytes = match transport.fetch_bytes(url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping remote archive {}: {}", url, e);
                    continue;
                }
            };
            match entry_names(Cursor::new(&bytes)) {
                Ok(entries) => {
                    debug!("Loaded remote archive {} ({} entries)", url, entries.len());
                    archives.push(LoadedArchive::Remote {
                        url: url.clone(),
                        bytes,
                        entries,
                    });
                }
                Err(e) => warn!("Remote archive {} is not a valid jar: {}", url, e),
            }
        }

        Self {
            locations: urls.to_vec(),
            archives,
        }
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }
}

impl ArtifactSource for ArchiveSource {
    fn identity(&self) -> SourceIdentity {
        SourceIdentity::Archives(self.locations.clone())
    }

    fn find_resource(&self, name: &str, _frame: &mut LookupFrame) -> Option<ResourceLocation> {
        self.archives.iter().find_map(|archive| match archive {
            LoadedArchive::Local(local) if local.contains(name) => {
                Some(ResourceLocation::in_archive(local.path.clone(), name))
            }
            LoadedArchive::Remote { url, entries, .. } if entries.contains(name) => {
                Some(ResourceLocation::in_remote_archive(url.clone(), name))
            }
            _ => None,
        })
    }

    fn read(&self, location: &ResourceLocation) -> JarlinkResult<Option<Vec<u8>>> {
        let Origin::RemoteArchive(wanted) = &location.origin else {
            return location.read_local();
        };

        for archive in &self.archives {
            if let LoadedArchive::Remote { url, bytes, .. } = archive {
                if url == wanted {
                    return read_entry(Cursor::new(bytes), &location.entry);
                }
            }
        }
        Ok(None)
    }
}

// ─── Artifact sources ───
// Everything that can answer "do you have this name, and where".
//
//   directory: jars under a cache directory, incrementally rescanned
//   archive:   fixed list of jars given up front (local or remote)
//   classpath: host default, directories and jars from CLASSPATH

mod archive;
mod classpath;
mod directory;
mod index;

pub use archive::ArchiveSource;
pub use classpath::ClasspathSource;
pub use directory::DirectorySource;

pub(crate) use directory::canonical_directory;
pub(crate) use index::collect_archives;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::error::JarlinkResult;

/// Where a located resource physically lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Plain file below a classpath directory.
    File(PathBuf),
    /// Entry inside a jar on disk.
    LocalArchive(PathBuf),
    /// Entry inside a jar fetched from a URL and held in memory.
    RemoteArchive(String),
}

/// A resolved name: the archive (or file) plus the entry inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocation {
    pub origin: Origin,
    pub entry: String,
}

impl ResourceLocation {
    pub fn file(path: PathBuf, entry: impl Into<String>) -> Self {
        Self {
            origin: Origin::File(path),
            entry: entry.into(),
        }
    }

    pub fn in_archive(archive: PathBuf, entry: impl Into<String>) -> Self {
        Self {
            origin: Origin::LocalArchive(archive),
            entry: entry.into(),
        }
    }

    pub fn in_remote_archive(url: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            origin: Origin::RemoteArchive(url.into()),
            entry: entry.into(),
        }
    }

    /// URL form: `file:/…`, `jar:file:/…!/entry` or `jar:https://…!/entry`.
    pub fn url(&self) -> String {
        match &self.origin {
            Origin::File(path) => format!("file:{}", path.display()),
            Origin::LocalArchive(path) => format!("jar:file:{}!/{}", path.display(), self.entry),
            Origin::RemoteArchive(url) => format!("jar:{}!/{}", url, self.entry),
        }
    }

    /// Read the bytes when they live on the local filesystem.
    ///
    /// Remote archives return `Ok(None)`; only the source holding them can read them.
    pub fn read_local(&self) -> JarlinkResult<Option<Vec<u8>>> {
        match &self.origin {
            Origin::File(path) => match std::fs::read(path) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(crate::core::error::JarlinkError::io(path, e)),
            },
            Origin::LocalArchive(path) => index::read_archive_entry(path, &self.entry),
            Origin::RemoteArchive(_) => Ok(None),
        }
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Registration identity. Two sources with the same identity are the same
/// source as far as the registry is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceIdentity {
    Directory(PathBuf),
    Archives(Vec<String>),
    Classpath(Vec<PathBuf>),
    Host(String),
    Intercept(String),
}

/// Per-lookup state threaded through every source.
///
/// Counts how many delegating intercepts are active on the current lookup,
/// which is what bounds self-delegation.
#[derive(Debug, Default)]
pub struct LookupFrame {
    delegation_depth: u32,
}

impl LookupFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delegation_depth(&self) -> u32 {
        self.delegation_depth
    }

    pub(crate) fn enter_delegation(&mut self) -> u32 {
        self.delegation_depth += 1;
        self.delegation_depth
    }

    pub(crate) fn leave_delegation(&mut self) {
        self.delegation_depth = self.delegation_depth.saturating_sub(1);
    }
}

/// A resolution source.
///
/// "Not found" is `None`, never an error.
pub trait ArtifactSource: Send + Sync {
    fn identity(&self) -> SourceIdentity;

    fn find_resource(&self, name: &str, frame: &mut LookupFrame) -> Option<ResourceLocation>;

    /// Class lookup; `org.example.Lib` and `org/example/Lib.class` are equivalent.
    fn find_class(&self, name: &str, frame: &mut LookupFrame) -> Option<ResourceLocation> {
        self.find_resource(&class_resource_path(name), frame)
    }

    /// Bytes behind a location this source returned.
    fn read(&self, location: &ResourceLocation) -> JarlinkResult<Option<Vec<u8>>> {
        location.read_local()
    }

    /// Pick up archives that appeared since the last scan. Returns how many
    /// were added; sources without a backing directory add nothing.
    fn rescan(&self) -> JarlinkResult<usize> {
        Ok(0)
    }

    /// Re-read the entries of `archive` if this source already indexed it.
    /// Returns whether it did.
    fn refresh(&self, _archive: &Path) -> JarlinkResult<bool> {
        Ok(false)
    }
}

/// `org.example.Lib`, `org.example.Lib.class` and `org/example/Lib.class`
/// all map to `org/example/Lib.class`.
pub fn class_resource_path(name: &str) -> String {
    let stem = name.strip_suffix(".class").unwrap_or(name);
    format!("{}.class", stem.replace('.', "/"))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names_map_to_class_files() {
        assert_eq!(class_resource_path("org.example.Lib"), "org/example/Lib.class");
        assert_eq!(class_resource_path("org.example.Lib.class"), "org/example/Lib.class");
        assert_eq!(class_resource_path("org/example/Lib.class"), "org/example/Lib.class");
    }

    #[test]
    fn location_urls() {
        let loc = ResourceLocation::in_archive(PathBuf::from("/cache/a.jar"), "x/Y.class");
        assert_eq!(loc.url(), "jar:file:/cache/a.jar!/x/Y.class");
        let remote = ResourceLocation::in_remote_archive("https://h/a.jar", "x/Y.class");
        assert_eq!(remote.to_string(), "jar:https://h/a.jar!/x/Y.class");
    }

    #[test]
    fn frame_depth_round_trips() {
        let mut frame = LookupFrame::new();
        assert_eq!(frame.enter_delegation(), 1);
        assert_eq!(frame.enter_delegation(), 2);
        frame.leave_delegation();
        frame.leave_delegation();
        frame.leave_delegation();
        assert_eq!(frame.delegation_depth(), 0);
    }
}

use std::path::{Path, PathBuf};

use tracing::warn;

use super::index::{is_archive, IndexedArchive};
use super::{ArtifactSource, LookupFrame, ResourceLocation, SourceIdentity};

/// The host's own lookup: an ordered classpath of directories and jars.
pub struct ClasspathSource {
    roots: Vec<PathBuf>,
    entries: Vec<ClasspathEntry>,
}

enum ClasspathEntry {
    Directory(PathBuf),
    Archive(IndexedArchive),
}

impl ClasspathSource {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        let entries = roots
            .iter()
            .filter_map(|root| {
                if root.is_dir() {
                    Some(ClasspathEntry::Directory(root.clone()))
                } else if is_archive(root) {
                    match IndexedArchive::open(root) {
                        Ok(archive) => Some(ClasspathEntry::Archive(archive)),
                        Err(e) => {
                            warn!("Ignoring classpath entry {:?}: {}", root, e);
                            None
                        }
                    }
                } else {
                    None
                }
            })
            .collect();

        Self { roots, entries }
    }

    /// Build from the `CLASSPATH` environment variable (empty when unset).
    pub fn from_env() -> Self {
        let roots = std::env::var_os("CLASSPATH")
            .map(|raw| {
                std::env::split_paths(&raw)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self::new(roots)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl ArtifactSource for ClasspathSource {
    fn identity(&self) -> SourceIdentity {
        SourceIdentity::Classpath(self.roots.clone())
    }

    fn find_resource(&self, name: &str, _frame: &mut LookupFrame) -> Option<ResourceLocation> {
        self.entries.iter().find_map(|entry| match entry {
            ClasspathEntry::Directory(dir) => {
                let candidate = dir.join(Path::new(name));
                candidate
                    .is_file()
                    .then(|| ResourceLocation::file(candidate, name))
            }
            ClasspathEntry::Archive(archive) => archive
                .contains(name)
                .then(|| ResourceLocation::in_archive(archive.path.clone(), name)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sources::test_support::{temp_dir, write_jar};
    use crate::core::sources::Origin;

    #[test]
    fn directories_and_jars_are_searched_in_order() {
        let dir = temp_dir("classpath");
        let classes = dir.join("classes");
        std::fs::create_dir_all(classes.join("org/host")).unwrap();
        std::fs::write(classes.join("org/host/Main.class"), b"cafebabe").unwrap();
        let jar = dir.join("lib.jar");
        write_jar(&jar, &["org/host/Main.class", "org/lib/Util.class"]);

        let source = ClasspathSource::new(vec![classes.clone(), jar.clone(), dir.join("gone")]);
        let mut frame = LookupFrame::new();

        let main = source.find_class("org.host.Main", &mut frame).unwrap();
        assert_eq!(main.origin, Origin::File(classes.join("org/host/Main.class")));
        assert_eq!(main.read_local().unwrap().unwrap(), b"cafebabe");

        let util = source.find_resource("org/lib/Util.class", &mut frame).unwrap();
        assert_eq!(util.origin, Origin::LocalArchive(jar));

        let _ = std::fs::remove_dir_all(&dir);
    }
}

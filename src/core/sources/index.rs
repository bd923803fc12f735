use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use crate::core::error::{JarlinkError, JarlinkResult};
use crate::core::maven::ARCHIVE_EXTENSION;

/// A jar on disk with its entry names read once at index time.
#[derive(Debug)]
pub(crate) struct IndexedArchive {
    pub path: PathBuf,
    entries: HashSet<String>,
}

impl IndexedArchive {
    pub fn open(path: &Path) -> JarlinkResult<Self> {
        let file = File::open(path).map_err(|e| JarlinkError::io(path, e))?;
        let entries = entry_names(BufReader::new(file))?;
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains(entry)
    }
}

pub(crate) fn entry_names<R: Read + Seek>(reader: R) -> JarlinkResult<HashSet<String>> {
    let archive = zip::ZipArchive::new(reader)?;
    Ok(archive.file_names().map(str::to_string).collect())
}

/// Read one entry. `Ok(None)` when the archive has no such entry.
pub(crate) fn read_entry<R: Read + Seek>(reader: R, entry: &str) -> JarlinkResult<Option<Vec<u8>>> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut file = match archive.by_name(entry) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

pub(crate) fn read_archive_entry(path: &Path, entry: &str) -> JarlinkResult<Option<Vec<u8>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(JarlinkError::io(path, e)),
    };
    read_entry(BufReader::new(file), entry)
}

pub(crate) fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

/// Every `*.jar` below `root`, sorted.
///
/// Only a failure to read `root` itself is an error; unreadable
/// subdirectories are skipped.
pub(crate) fn collect_archives(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut jars = Vec::new();
    let mut stack = vec![std::fs::read_dir(root)?];

    while let Some(read_dir) = stack.pop() {
        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if let Ok(nested) = std::fs::read_dir(&path) {
                    stack.push(nested);
                }
            } else if is_archive(&path) {
                jars.push(path);
            }
        }
    }

    jars.sort();
    Ok(jars)
}

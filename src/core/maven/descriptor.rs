use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::ARCHIVE_EXTENSION;

/// One declared artifact plus the marker used to test whether it is already
/// reachable.
///
/// Record format (the part after `dependency:`):
///   `group:module:version:marker`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DependencyDescriptor {
    pub group: String,
    pub module: String,
    pub version: String,
    /// Class or resource name whose presence means the artifact is loaded,
    /// e.g. `org/example/Lib.class`.
    pub marker: String,
}

impl DependencyDescriptor {
    pub fn new(
        group: impl Into<String>,
        module: impl Into<String>,
        version: impl Into<String>,
        marker: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            module: module.into(),
            version: version.into(),
            marker: marker.into(),
        }
    }

    /// Parse a `group:module:version:marker` record.
    ///
    /// Anything that does not split into exactly four fields is rejected.
    pub fn parse(record: &str) -> Option<Self> {
        let parts: Vec<&str> = record.trim().split(':').collect();
        match parts.as_slice() {
            [group, module, version, marker] => {
                Some(Self::new(*group, *module, *version, *marker))
            }
            _ => None,
        }
    }

    /// Unique stem for this exact version: `group_module_version`.
    pub fn qualifier(&self) -> String {
        format!("{}_{}_{}", self.group, self.module, self.version)
    }

    /// Group path portion of the repository layout (`org/example`).
    pub fn group_path(&self) -> String {
        self.group.replace('.', "/")
    }

    /// File name in the repository: `module-version.jar`.
    pub fn remote_file_name(&self) -> String {
        format!("{}-{}.{}", self.module, self.version, ARCHIVE_EXTENSION)
    }

    /// File name in the local cache: `group_module_version.jar`.
    pub fn cache_file_name(&self) -> String {
        format!("{}.{}", self.qualifier(), ARCHIVE_EXTENSION)
    }

    /// Construct the fetch URL under the given repository base.
    ///
    /// Template:
    /// `<repo>[/]<group_path>/<module>/<version>/<module>-<version>.jar`
    ///
    /// A slash is appended to the base only when it does not already end in one.
    pub fn fetch_url(&self, repo_base: &str) -> String {
        let mut url = String::from(repo_base);
        if !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(&format!(
            "{}/{}/{}/{}",
            self.group_path(),
            self.module,
            self.version,
            self.remote_file_name()
        ));
        url
    }

    /// `group_module_` prefix shared by every cached version of this module.
    fn module_prefix(&self) -> String {
        format!("{}_{}_", self.group, self.module)
    }

    /// True when `file_name` is a cached jar of any version of `group:module`.
    ///
    /// A remainder containing `_` may belong to another module sharing this
    /// prefix (`lib` vs `lib_extra`), so it never matches.
    pub fn matches_any_version(&self, file_name: &str) -> bool {
        let suffix = format!(".{}", ARCHIVE_EXTENSION);
        let Some(version) = file_name
            .strip_prefix(&self.module_prefix())
            .and_then(|rest| rest.strip_suffix(&suffix))
        else {
            return false;
        };
        if version.contains('_') {
            debug!("{} is ambiguous for {}, leaving it alone", file_name, self);
            return false;
        }
        !version.is_empty()
    }

    /// True when `file_name` is the cached jar of exactly this version.
    pub fn matches_exact(&self, file_name: &str) -> bool {
        file_name == self.cache_file_name()
    }
}

impl fmt::Display for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.module, self.version)
    }
}

use std::path::Path;

use super::DependencyDescriptor;
use crate::core::error::{JarlinkError, JarlinkResult};
use crate::core::registry::SourceRegistry;

/// Well-known resource looked up through the registry when no explicit
/// meta file is given.
pub const META_RESOURCE: &str = "META-INF/jarlink.meta";

/// Repositories and dependencies declared by a meta-configuration file.
///
/// ```text
/// repository:<base-url>
/// dependency:<group>:<module>:<version>:<marker>
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaConfig {
    pub repositories: Vec<String>,
    pub dependencies: Vec<DependencyDescriptor>,
}

impl MetaConfig {
    /// Parse the line records. Unknown lines and malformed dependency
    /// records are dropped without error.
    pub fn parse(text: &str) -> Self {
        let mut config = MetaConfig::default();

        for line in text.lines() {
            if let Some(repo) = line.strip_prefix("repository:") {
                let repo = repo.trim();
                if !repo.is_empty() {
                    config.repositories.push(repo.to_string());
                }
            } else if let Some(record) = line.strip_prefix("dependency:") {
                if let Some(dep) = DependencyDescriptor::parse(record) {
                    config.dependencies.push(dep);
                }
            }
        }

        config
    }

    pub fn load(path: &Path) -> JarlinkResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| JarlinkError::io(path, e))?;
        Ok(Self::parse(&text))
    }

    /// Read [`META_RESOURCE`] through the source chain.
    ///
    /// `Ok(None)` when no registered source carries it.
    pub fn from_registry(registry: &SourceRegistry) -> JarlinkResult<Option<Self>> {
        let Some(bytes) = registry.read_resource(META_RESOURCE)? else {
            return Ok(None);
        };
        let text = String::from_utf8_lossy(&bytes);
        Ok(Some(Self::parse(&text)))
    }
}

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::descriptor::DependencyDescriptor;
use crate::core::downloader::Transport;
use crate::core::error::{JarlinkError, JarlinkResult};
use crate::core::registry::SourceRegistry;
use crate::core::sources::collect_archives;

/// Knobs for one reconcile run.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Create the cache directory when it does not exist.
    pub create_cache_dir: bool,
    /// Delete cached jars of other versions of each declared module.
    pub prune_stale_versions: bool,
    /// Check each fetched jar against the repository's `.sha1` file.
    pub verify_checksums: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            create_cache_dir: false,
            prune_stale_versions: true,
            verify_checksums: false,
        }
    }
}

/// One failed repository attempt.
#[derive(Debug, Clone, Serialize)]
pub struct FetchFailure {
    pub repository: String,
    pub url: String,
    pub reason: String,
}

/// What happened to a single descriptor.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DescriptorOutcome {
    /// The marker already resolved; nothing was fetched.
    AlreadyPresent,
    /// Downloaded from `repository` into `path`.
    Fetched { repository: String, path: PathBuf },
    /// Every repository failed (or none were configured).
    Unsatisfied { failures: Vec<FetchFailure> },
}

#[derive(Debug, Clone, Serialize)]
pub struct DescriptorReport {
    pub descriptor: DependencyDescriptor,
    #[serde(flatten)]
    pub outcome: DescriptorOutcome,
}

/// Per-descriptor results of a reconcile run.
///
/// The run itself is best-effort: an unsatisfied descriptor does not make it
/// fail. Use [`ReconcileReport::into_strict`] to turn that into an error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub entries: Vec<DescriptorReport>,
    /// Stale versions deleted from the cache.
    pub pruned: Vec<PathBuf>,
}

impl ReconcileReport {
    pub fn unsatisfied(&self) -> impl Iterator<Item = &DependencyDescriptor> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, DescriptorOutcome::Unsatisfied { .. }))
            .map(|e| &e.descriptor)
    }

    pub fn is_complete(&self) -> bool {
        self.unsatisfied().next().is_none()
    }

    pub fn fetched(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, DescriptorOutcome::Fetched { .. }))
            .count()
    }

    /// Fail with [`JarlinkError::Unsatisfied`] if any descriptor is unsatisfied.
    pub fn into_strict(self) -> JarlinkResult<Self> {
        let missing: Vec<String> = self.unsatisfied().map(|d| d.to_string()).collect();
        if missing.is_empty() {
            Ok(self)
        } else {
            Err(JarlinkError::Unsatisfied(missing))
        }
    }
}

/// Reconciles a cache directory with a declared dependency list and fetches
/// whatever the registry cannot resolve yet.
pub struct RepositoryResolver {
    registry: Arc<SourceRegistry>,
    transport: Arc<dyn Transport>,
    options: ResolverOptions,
}

impl RepositoryResolver {
    pub fn new(registry: Arc<SourceRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            options: ResolverOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Prune stale versions, make sure the cache directory is a registered
    /// source, then fetch every descriptor whose marker does not resolve.
    ///
    /// Repositories are tried in order and the first success wins. Only an
    /// invalid cache directory fails the call.
    pub async fn reconcile_and_fetch(
        &self,
        descriptors: &[DependencyDescriptor],
        repositories: &[String],
        cache_dir: &Path,
    ) -> JarlinkResult<ReconcileReport> {
        self.prepare_cache_dir(cache_dir)?;

        let pruned = if self.options.prune_stale_versions {
            prune_stale_versions(cache_dir, descriptors)
        } else {
            Vec::new()
        };

        self.registry.register_directory(cache_dir)?;

        let mut report = ReconcileReport {
            entries: Vec::with_capacity(descriptors.len()),
            pruned,
        };

        for descriptor in descriptors {
            let outcome = if self.registry.is_present(&descriptor.marker) {
                debug!("{} already present ({})", descriptor, descriptor.marker);
                DescriptorOutcome::AlreadyPresent
            } else {
                self.fetch(descriptor, repositories, cache_dir).await
            };
            report.entries.push(DescriptorReport {
                descriptor: descriptor.clone(),
                outcome,
            });
        }

        info!(
            "Reconciled {} dependencies: {} fetched, {} unsatisfied, {} pruned",
            report.entries.len(),
            report.fetched(),
            report.unsatisfied().count(),
            report.pruned.len()
        );
        Ok(report)
    }

    fn prepare_cache_dir(&self, cache_dir: &Path) -> JarlinkResult<()> {
        if cache_dir.as_os_str().is_empty() {
            return Err(JarlinkError::Configuration(
                "cache directory must not be empty".into(),
            ));
        }

        if !cache_dir.exists() {
            if !self.options.create_cache_dir {
                return Err(JarlinkError::Configuration(format!(
                    "cache directory {:?} does not exist",
                    cache_dir
                )));
            }
            std::fs::create_dir_all(cache_dir).map_err(|e| JarlinkError::io(cache_dir, e))?;
            info!("Created cache directory {:?}", cache_dir);
        }

        if !cache_dir.is_dir() {
            return Err(JarlinkError::Configuration(format!(
                "cache directory {:?} is not a directory",
                cache_dir
            )));
        }
        Ok(())
    }

    /// Try each repository until one download succeeds.
    async fn fetch(
        &self,
        descriptor: &DependencyDescriptor,
        repositories: &[String],
        cache_dir: &Path,
    ) -> DescriptorOutcome {
        let dest = cache_dir.join(descriptor.cache_file_name());
        let mut failures = Vec::new();

        for repo in repositories {
            let url = descriptor.fetch_url(repo);
            match self.fetch_one(&url, &dest).await {
                Ok(bytes) => {
                    info!("Fetched {} from {} ({} bytes)", descriptor, repo, bytes);
                    // Not visible to lookups until the directory is rescanned.
                    // An overwritten jar that was already indexed is re-read.
                    self.registry.refresh_archive(&dest);
                    self.registry.rescan_all();
                    if !self.registry.is_present(&descriptor.marker) {
                        warn!(
                            "{} was fetched but does not provide {}",
                            descriptor, descriptor.marker
                        );
                    }
                    return DescriptorOutcome::Fetched {
                        repository: repo.clone(),
                        path: dest,
                    };
                }
                Err(e) => {
                    debug!("Repository {} failed for {}: {}", repo, descriptor, e);
                    failures.push(FetchFailure {
                        repository: repo.clone(),
                        url,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if repositories.is_empty() {
            warn!("No repositories configured for {}", descriptor);
        } else {
            warn!("All repositories failed for {}", descriptor);
        }
        DescriptorOutcome::Unsatisfied { failures }
    }

    async fn fetch_one(&self, url: &str, dest: &Path) -> JarlinkResult<u64> {
        let expected = if self.options.verify_checksums {
            let checksum_url = format!("{}.sha1", url);
            match self.transport.fetch_text(&checksum_url).await? {
                Some(text) => parse_sha1(&text),
                None => {
                    warn!("No checksum published at {}, skipping verification", checksum_url);
                    None
                }
            }
        } else {
            None
        };

        self.transport.download(url, dest, expected.as_deref()).await
    }
}

/// Delete every cached jar that is some version of a declared module but not
/// the declared version. The exact cache file of any declared descriptor is
/// always kept. Failures are logged and skipped.
fn prune_stale_versions(cache_dir: &Path, descriptors: &[DependencyDescriptor]) -> Vec<PathBuf> {
    let keep: HashSet<String> = descriptors.iter().map(|d| d.cache_file_name()).collect();

    let cached = match collect_archives(cache_dir) {
        Ok(cached) => cached,
        Err(e) => {
            warn!("Cannot walk cache directory {:?}: {}", cache_dir, e);
            return Vec::new();
        }
    };

    let mut pruned = Vec::new();
    for path in cached {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if keep.contains(file_name) {
            continue;
        }
        if !descriptors.iter().any(|d| d.matches_any_version(file_name)) {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("Removed stale version {:?}", path);
                pruned.push(path);
            }
            Err(e) => warn!("Cannot remove stale version {:?}: {}", path, e),
        }
    }
    pruned
}

/// First token of a Maven `.sha1` file, if it looks like a SHA-1.
fn parse_sha1(text: &str) -> Option<String> {
    let token = text.split_whitespace().next()?;
    (token.len() == 40 && token.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| token.to_ascii_lowercase())
}

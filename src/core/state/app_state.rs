use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use super::settings::Settings;
use crate::core::downloader::{Downloader, Transport};
use crate::core::error::{JarlinkError, JarlinkResult};
use crate::core::maven::{MetaConfig, ReconcileReport, RepositoryResolver, META_RESOURCE};
use crate::core::registry::SourceRegistry;

/// Everything a host application needs: settings, the shared registry and
/// the transport used for fetches.
pub struct JarlinkState {
    pub settings: Settings,
    pub registry: Arc<SourceRegistry>,
    pub transport: Arc<dyn Transport>,
}

impl JarlinkState {
    /// Default registry (host context over `CLASSPATH`) and a `reqwest` downloader.
    pub fn new(settings: Settings) -> JarlinkResult<Self> {
        let downloader =
            Downloader::new(settings.connect_timeout(), settings.request_timeout())?;
        Ok(Self::with_parts(
            settings,
            SourceRegistry::with_default_host(),
            Arc::new(downloader),
        ))
    }

    pub fn with_parts(
        settings: Settings,
        registry: Arc<SourceRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            settings,
            registry,
            transport,
        }
    }

    pub fn resolver(&self) -> RepositoryResolver {
        RepositoryResolver::new(self.registry.clone(), self.transport.clone())
            .with_options(self.settings.resolver_options())
    }

    /// Reconcile `cache_dir` with an explicit meta-configuration.
    ///
    /// In strict mode any unsatisfied descriptor is an error.
    pub async fn sync(&self, meta: &MetaConfig, cache_dir: &Path) -> JarlinkResult<ReconcileReport> {
        let report = self
            .resolver()
            .reconcile_and_fetch(&meta.dependencies, &meta.repositories, cache_dir)
            .await?;
        if self.settings.strict {
            report.into_strict()
        } else {
            Ok(report)
        }
    }

    /// Find the meta-configuration through the registry and reconcile
    /// `cache_dir` with it.
    ///
    /// `Ok(false)` when no meta-configuration is reachable (an error with
    /// `fail_hard`). `Ok(true)` means the run completed, not that every
    /// dependency was satisfied, unless `strict` is set.
    pub async fn check_dependencies(&self, cache_dir: &Path) -> JarlinkResult<bool> {
        let Some(meta) = MetaConfig::from_registry(&self.registry)? else {
            if self.settings.fail_hard {
                return Err(JarlinkError::Configuration(format!(
                    "no {} found on any registered source",
                    META_RESOURCE
                )));
            }
            warn!("No {} found, nothing to check", META_RESOURCE);
            return Ok(false);
        };

        info!(
            "Checking {} dependencies against {} repositories",
            meta.dependencies.len(),
            meta.repositories.len()
        );
        self.sync(&meta, cache_dir).await?;
        Ok(true)
    }
}

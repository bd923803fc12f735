use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::core::downloader::Transport;
use crate::core::error::JarlinkResult;
use crate::core::intercept::{self, DelegatingSource, HostContext};
use crate::core::sources::{
    class_resource_path, ArchiveSource, ArtifactSource, ClasspathSource, DirectorySource,
    LookupFrame, ResourceLocation, SourceIdentity,
};

type SourceList = Vec<Arc<dyn ArtifactSource>>;

/// Ordered, duplicate-free chain of sources. First match wins.
///
/// Owned by the host application and shared as `Arc<SourceRegistry>`.
/// Lookups run against an immutable snapshot and never block; registration
/// is serialized and publishes a new snapshot. Nothing is ever removed.
pub struct SourceRegistry {
    sources: ArcSwap<SourceList>,
    write_lock: Mutex<()>,
    intercepts: Mutex<Vec<Arc<DelegatingSource>>>,
    host: Arc<HostContext>,
}

impl SourceRegistry {
    /// Registry whose first source is `host`, the host's default lookup path.
    pub fn new(host: Arc<HostContext>) -> Arc<Self> {
        let first: Arc<dyn ArtifactSource> = host.clone();
        Arc::new(Self {
            sources: ArcSwap::from_pointee(vec![first]),
            write_lock: Mutex::new(()),
            intercepts: Mutex::new(Vec::new()),
            host,
        })
    }

    /// Registry over the `system` context backed by `CLASSPATH`.
    pub fn with_default_host() -> Arc<Self> {
        let classpath: Arc<dyn ArtifactSource> = Arc::new(ClasspathSource::from_env());
        Self::new(Arc::new(HostContext::system(classpath)))
    }

    pub fn host(&self) -> &Arc<HostContext> {
        &self.host
    }

    // ── Registration ────────────────────────────────────

    /// Append `source` unless one with the same identity is already present.
    ///
    /// Returns whether it was added. A duplicate keeps the original's position.
    pub fn register(&self, source: Arc<dyn ArtifactSource>) -> bool {
        let identity = source.identity();
        let _guard = self.write_lock.lock();

        let current = self.sources.load_full();
        if current.iter().any(|s| s.identity() == identity) {
            debug!("Source already registered: {:?}", identity);
            return false;
        }

        let mut next: SourceList = current.as_ref().clone();
        next.push(source);
        self.sources.store(Arc::new(next));
        info!("Registered source {:?}", identity);
        true
    }

    /// Register a [`DirectorySource`] for `dir` unless one exists already.
    ///
    /// The identity check happens before indexing, so repeated calls are cheap.
    pub fn register_directory(&self, dir: &Path) -> JarlinkResult<bool> {
        let canonical = crate::core::sources::canonical_directory(dir)?;
        if self.contains(&SourceIdentity::Directory(canonical.clone())) {
            return Ok(false);
        }
        let source = DirectorySource::open(&canonical)?;
        Ok(self.register(Arc::new(source)))
    }

    /// Register a fixed list of jars on disk.
    pub fn register_archives(&self, paths: &[PathBuf]) -> bool {
        self.register(Arc::new(ArchiveSource::from_paths(paths)))
    }

    /// Register a fixed list of remote jars, fetched once through `transport`.
    pub async fn register_remote_archives(&self, transport: &dyn Transport, urls: &[String]) -> bool {
        let identity = SourceIdentity::Archives(urls.to_vec());
        if self.contains(&identity) {
            return false;
        }
        let source = ArchiveSource::fetch(transport, urls).await;
        self.register(Arc::new(source))
    }

    pub fn contains(&self, identity: &SourceIdentity) -> bool {
        self.sources.load().iter().any(|s| &s.identity() == identity)
    }

    /// Snapshot of the chain in query order.
    pub fn sources(&self) -> Vec<Arc<dyn ArtifactSource>> {
        self.sources.load_full().as_ref().clone()
    }

    // ── Lookup ──────────────────────────────────────────

    pub fn resolve_resource(&self, name: &str) -> Option<ResourceLocation> {
        self.find_resource(name, &mut LookupFrame::new())
    }

    pub fn resolve_class(&self, name: &str) -> Option<ResourceLocation> {
        self.find_class(name, &mut LookupFrame::new())
    }

    /// True when the class (or class file path) `name` resolves.
    pub fn is_present(&self, name: &str) -> bool {
        self.resolve_resource(&class_resource_path(name)).is_some()
    }

    /// Lookup continuing an outer frame; used by delegating intercepts.
    pub fn find_resource(&self, name: &str, frame: &mut LookupFrame) -> Option<ResourceLocation> {
        // Owned snapshot: a nested lookup may re-enter the registry.
        let sources = self.sources.load_full();
        sources.iter().find_map(|s| s.find_resource(name, frame))
    }

    pub fn find_class(&self, name: &str, frame: &mut LookupFrame) -> Option<ResourceLocation> {
        let sources = self.sources.load_full();
        sources.iter().find_map(|s| s.find_class(name, frame))
    }

    /// Bytes of the first source that has `name`.
    pub fn read_resource(&self, name: &str) -> JarlinkResult<Option<Vec<u8>>> {
        let sources = self.sources.load_full();
        let mut frame = LookupFrame::new();
        for source in sources.iter() {
            if let Some(location) = source.find_resource(name, &mut frame) {
                return source.read(&location);
            }
        }
        Ok(None)
    }

    /// Rescan every source that has a backing directory.
    ///
    /// Failures are logged per source. Returns the number of archives added.
    pub fn rescan_all(&self) -> usize {
        let sources = self.sources.load_full();
        let mut added = 0;
        for source in sources.iter() {
            match source.rescan() {
                Ok(n) => added += n,
                Err(e) => warn!("Rescan failed for {:?}: {}", source.identity(), e),
            }
        }
        added
    }

    /// Re-read `archive` in every source that already indexed it.
    pub fn refresh_archive(&self, archive: &Path) -> bool {
        let sources = self.sources.load_full();
        let mut refreshed = false;
        for source in sources.iter() {
            match source.refresh(archive) {
                Ok(hit) => refreshed |= hit,
                Err(e) => warn!("Refresh of {:?} failed for {:?}: {}", archive, source.identity(), e),
            }
        }
        refreshed
    }

    // ── Intercepts ──────────────────────────────────────

    /// Splice a delegating intercept ahead of the host default context.
    pub fn hook_host(self: &Arc<Self>) -> JarlinkResult<Arc<DelegatingSource>> {
        let host = self.host.clone();
        intercept::install(&host, self)
    }

    /// Splice a delegating intercept ahead of the caller's own context.
    pub fn hook_context(
        self: &Arc<Self>,
        context: &HostContext,
    ) -> JarlinkResult<Arc<DelegatingSource>> {
        intercept::install(context, self)
    }

    pub fn intercepts(&self) -> Vec<Arc<DelegatingSource>> {
        self.intercepts.lock().clone()
    }

    pub(crate) fn intercept_set(&self) -> &Mutex<Vec<Arc<DelegatingSource>>> {
        &self.intercepts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sources::test_support::{temp_dir, write_jar};
    use crate::core::error::JarlinkError;
    use crate::core::sources::Origin;
    use async_trait::async_trait;

    /// Serves one jar for every URL ending in `ok.jar` and counts fetches.
    struct CountingTransport {
        jar: Vec<u8>,
        fetches: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn download(&self, _: &str, _: &Path, _: Option<&str>) -> JarlinkResult<u64> {
            unreachable!()
        }

        async fn fetch_bytes(&self, url: &str) -> JarlinkResult<Vec<u8>> {
            self.fetches.lock().push(url.to_string());
            if url.ends_with("ok.jar") {
                Ok(self.jar.clone())
            } else {
                Err(JarlinkError::DownloadFailed {
                    url: url.to_string(),
                    status: 404,
                })
            }
        }

        async fn fetch_text(&self, _: &str) -> JarlinkResult<Option<String>> {
            Ok(None)
        }
    }

    fn empty_registry() -> Arc<SourceRegistry> {
        let host: Arc<dyn ArtifactSource> = Arc::new(ClasspathSource::new(vec![]));
        SourceRegistry::new(Arc::new(HostContext::system(host)))
    }

    #[test]
    fn starts_with_the_host_context() {
        let registry = empty_registry();
        let sources = registry.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].identity(), SourceIdentity::Host("system".into()));
    }

    #[test]
    fn first_registered_source_wins_and_duplicates_keep_position() {
        let dir = temp_dir("registry-order");
        let a = dir.join("a.jar");
        let b = dir.join("b.jar");
        write_jar(&a, &["Shared.class"]);
        write_jar(&b, &["Shared.class"]);

        let registry = empty_registry();
        assert!(registry.register_archives(&[a.clone()]));
        assert!(registry.register_archives(&[b.clone()]));
        assert!(!registry.register_archives(&[a.clone()]));

        let identities: Vec<_> = registry.sources().iter().map(|s| s.identity()).collect();
        assert_eq!(
            identities,
            vec![
                SourceIdentity::Host("system".into()),
                SourceIdentity::Archives(vec![a.display().to_string()]),
                SourceIdentity::Archives(vec![b.display().to_string()]),
            ]
        );

        let hit = registry.resolve_resource("Shared.class").unwrap();
        assert_eq!(hit.origin, Origin::LocalArchive(a));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn register_directory_is_idempotent() {
        let dir = temp_dir("registry-dir");
        let registry = empty_registry();
        assert!(registry.register_directory(&dir).unwrap());
        assert!(!registry.register_directory(&dir).unwrap());
        assert!(!registry.register_directory(&dir.join(".")).unwrap());
        assert_eq!(registry.sources().len(), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rescan_all_makes_new_downloads_visible() {
        let dir = temp_dir("registry-rescan");
        let registry = empty_registry();
        registry.register_directory(&dir).unwrap();
        assert!(!registry.is_present("org/example/Lib.class"));

        write_jar(&dir.join("org.example_lib_1.2.0.jar"), &["org/example/Lib.class"]);
        assert!(!registry.is_present("org.example.Lib"));
        assert_eq!(registry.rescan_all(), 1);
        assert!(registry.is_present("org.example.Lib"));
        assert!(registry.is_present("org/example/Lib.class"));
        assert!(registry.resolve_class("org.example.Lib").is_some());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn remote_archives_register_once_and_resolve() {
        let transport = CountingTransport {
            jar: crate::core::sources::test_support::jar_bytes(&[(
                "org/remote/Api.class",
                b"cafebabe",
            )]),
            fetches: Mutex::new(Vec::new()),
        };
        let urls = vec![
            "https://h.example/gone.jar".to_string(),
            "https://h.example/ok.jar".to_string(),
        ];

        let registry = empty_registry();
        assert!(registry.register_remote_archives(&transport, &urls).await);
        assert_eq!(transport.fetches.lock().len(), 2);

        // Same list again: no new source and nothing fetched.
        assert!(!registry.register_remote_archives(&transport, &urls).await);
        assert_eq!(transport.fetches.lock().len(), 2);
        assert_eq!(registry.sources().len(), 2);
        assert_eq!(
            registry.sources()[1].identity(),
            SourceIdentity::Archives(urls.clone())
        );

        let hit = registry.resolve_class("org.remote.Api").unwrap();
        assert_eq!(hit.url(), "jar:https://h.example/ok.jar!/org/remote/Api.class");
        assert_eq!(
            registry.read_resource("org/remote/Api.class").unwrap().unwrap(),
            b"cafebabe"
        );
    }

    #[test]
    fn read_resource_returns_entry_bytes() {
        let dir = temp_dir("registry-read");
        let jar = dir.join("meta.jar");
        std::fs::write(
            &jar,
            crate::core::sources::test_support::jar_bytes(&[(
                "META-INF/jarlink.meta",
                b"repository:https://repo.example/",
            )]),
        )
        .unwrap();

        let registry = empty_registry();
        registry.register_archives(&[jar]);
        let bytes = registry.read_resource("META-INF/jarlink.meta").unwrap().unwrap();
        assert_eq!(bytes, b"repository:https://repo.example/");
        assert!(registry.read_resource("missing").unwrap().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn concurrent_registration_and_lookup() {
        let dir = temp_dir("registry-concurrent");
        let registry = empty_registry();
        let mut jars = Vec::new();
        for i in 0..8 {
            let jar = dir.join(format!("j{}.jar", i));
            write_jar(&jar, &[format!("C{}.class", i).as_str()]);
            jars.push(jar);
        }

        std::thread::scope(|scope| {
            for jar in &jars {
                let registry = &registry;
                scope.spawn(move || {
                    registry.register_archives(&[jar.clone()]);
                    registry.register_archives(&[jar.clone()]);
                });
                scope.spawn(move || {
                    let _ = registry.resolve_resource("C0.class");
                });
            }
        });

        assert_eq!(registry.sources().len(), 9);
        for i in 0..8 {
            assert!(registry.is_present(&format!("C{}", i)));
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}

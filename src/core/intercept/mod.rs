// ─── Delegating intercepts ───
// A host lookup path (`HostContext`) can take a resolver ahead of its
// current parent. `DelegatingSource` is that resolver: it forwards misses to
// the `SourceRegistry`, which may itself route back through the same host
// context. The `LookupFrame` carried through the call bounds that loop.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::core::error::{JarlinkError, JarlinkResult};
use crate::core::registry::SourceRegistry;
use crate::core::sources::{ArtifactSource, LookupFrame, ResourceLocation, SourceIdentity};

/// Nested forwards allowed on one lookup; the next one reports "not found".
pub const MAX_DELEGATION_DEPTH: u32 = 2;

/// Whether a host context lets resolvers be spliced ahead of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplicePolicy {
    Accept,
    Refuse,
}

/// A host-controlled lookup path: parent first, then its own local source.
pub struct HostContext {
    name: String,
    local: Arc<dyn ArtifactSource>,
    parent: RwLock<Option<Arc<dyn ArtifactSource>>>,
    policy: SplicePolicy,
}

impl HostContext {
    pub fn new(name: impl Into<String>, local: Arc<dyn ArtifactSource>) -> Self {
        Self {
            name: name.into(),
            local,
            parent: RwLock::new(None),
            policy: SplicePolicy::Accept,
        }
    }

    /// The process-wide default context.
    pub fn system(local: Arc<dyn ArtifactSource>) -> Self {
        Self::new("system", local)
    }

    pub fn with_parent(self, parent: Arc<dyn ArtifactSource>) -> Self {
        *self.parent.write() = Some(parent);
        self
    }

    pub fn with_policy(mut self, policy: SplicePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<Arc<dyn ArtifactSource>> {
        self.parent.read().clone()
    }
}

impl ArtifactSource for HostContext {
    fn identity(&self) -> SourceIdentity {
        SourceIdentity::Host(self.name.clone())
    }

    fn find_resource(&self, name: &str, frame: &mut LookupFrame) -> Option<ResourceLocation> {
        // Clone out of the lock: the parent may call straight back into us.
        if let Some(parent) = self.parent() {
            if let Some(found) = parent.find_resource(name, frame) {
                return Some(found);
            }
        }
        self.local.find_resource(name, frame)
    }

    fn find_class(&self, name: &str, frame: &mut LookupFrame) -> Option<ResourceLocation> {
        if let Some(parent) = self.parent() {
            if let Some(found) = parent.find_class(name, frame) {
                return Some(found);
            }
        }
        self.local.find_class(name, frame)
    }

    fn read(&self, location: &ResourceLocation) -> JarlinkResult<Option<Vec<u8>>> {
        if let Some(bytes) = self.local.read(location)? {
            return Ok(Some(bytes));
        }
        match self.parent() {
            Some(parent) => parent.read(location),
            None => Ok(None),
        }
    }
}

/// Resolver spliced ahead of a host context's previous parent.
///
/// Asks the previous parent first, then the registry. Holds the registry
/// weakly; the registry (through the host context) holds this strongly.
pub struct DelegatingSource {
    context: String,
    previous: Option<Arc<dyn ArtifactSource>>,
    registry: Weak<SourceRegistry>,
}

impl DelegatingSource {
    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn previous(&self) -> Option<&Arc<dyn ArtifactSource>> {
        self.previous.as_ref()
    }

    fn forward<F>(&self, frame: &mut LookupFrame, lookup: F) -> Option<ResourceLocation>
    where
        F: FnOnce(&SourceRegistry, &mut LookupFrame) -> Option<ResourceLocation>,
    {
        let depth = frame.enter_delegation();
        let found = if depth > MAX_DELEGATION_DEPTH {
            debug!(
                "Delegation depth {} exceeded in context '{}', reporting not found",
                depth, self.context
            );
            None
        } else {
            self.registry
                .upgrade()
                .and_then(|registry| lookup(&registry, frame))
        };
        frame.leave_delegation();
        found
    }
}

impl ArtifactSource for DelegatingSource {
    fn identity(&self) -> SourceIdentity {
        SourceIdentity::Intercept(self.context.clone())
    }

    fn find_resource(&self, name: &str, frame: &mut LookupFrame) -> Option<ResourceLocation> {
        if let Some(found) = self
            .previous
            .as_ref()
            .and_then(|p| p.find_resource(name, frame))
        {
            return Some(found);
        }
        self.forward(frame, |registry, frame| registry.find_resource(name, frame))
    }

    fn find_class(&self, name: &str, frame: &mut LookupFrame) -> Option<ResourceLocation> {
        if let Some(found) = self
            .previous
            .as_ref()
            .and_then(|p| p.find_class(name, frame))
        {
            return Some(found);
        }
        self.forward(frame, |registry, frame| registry.find_class(name, frame))
    }
}

/// Splice a [`DelegatingSource`] ahead of `context`'s current parent.
///
/// One intercept per context: installing again on a context that already
/// carries one returns the existing intercept. Fails with
/// [`JarlinkError::Access`] when the context refuses splices.
pub fn install(
    context: &HostContext,
    registry: &Arc<SourceRegistry>,
) -> JarlinkResult<Arc<DelegatingSource>> {
    if context.policy == SplicePolicy::Refuse {
        return Err(JarlinkError::Access(format!(
            "context '{}' does not accept resolvers",
            context.name
        )));
    }

    let mut installed = registry.intercept_set().lock();
    if let Some(existing) = installed.iter().find(|i| i.context == context.name) {
        return Ok(existing.clone());
    }

    let mut parent = context.parent.write();
    let intercept = Arc::new(DelegatingSource {
        context: context.name.clone(),
        previous: parent.take(),
        registry: Arc::downgrade(registry),
    });
    *parent = Some(intercept.clone() as Arc<dyn ArtifactSource>);
    installed.push(intercept.clone());

    info!("Installed delegating intercept ahead of context '{}'", context.name);
    Ok(intercept)
}

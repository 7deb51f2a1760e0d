//! Per-invocation tracking and release of transient remote resources.

use crate::backend::{FileBackend, RemoteResource, ResourceKind};
use crate::error::Result;
use futures::future::join_all;
use tracing::{debug, info, warn};

/// Remote resources created during one invocation.
///
/// Ingestion registers each resource the moment the backend returns its id.
/// [`ResourceTracker::release`] consumes the tracker, so the set is released
/// exactly once.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    resources: Vec<RemoteResource>,
}

/// What a release pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    pub deleted: usize,
    pub failed: usize,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, resource: RemoteResource) {
        debug!("Tracking {}", resource);
        self.resources.push(resource);
    }

    pub fn resources(&self) -> &[RemoteResource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Number of tracked resources of `kind`.
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.resources.iter().filter(|r| r.kind == kind).count()
    }

    /// Delete every tracked resource. Failures are logged and counted, never returned.
    ///
    /// Containers go first since they hold references to uploaded files.
    pub async fn release(self, backend: &dyn FileBackend) -> ReleaseReport {
        if self.resources.is_empty() {
            return ReleaseReport::default();
        }

        let (containers, files): (Vec<_>, Vec<_>) = self
            .resources
            .into_iter()
            .partition(|r| r.kind == ResourceKind::Container);

        let mut report = ReleaseReport::default();
        for batch in [containers, files] {
            let results = join_all(batch.iter().map(|r| backend.delete(r))).await;
            for (resource, result) in batch.iter().zip(results) {
                match result {
                    Ok(()) => report.deleted += 1,
                    Err(e) => {
                        warn!("Failed to delete {}: {}", resource, e);
                        report.failed += 1;
                    }
                }
            }
        }

        info!(
            "Released {} remote resources ({} failed)",
            report.deleted, report.failed
        );
        report
    }
}

/// Track every file and container currently owned by the credential.
///
/// Not scoped to any invocation: releasing the result while another
/// invocation is in flight deletes that invocation's attachments too.
pub async fn collect_owned(backend: &dyn FileBackend) -> Result<ResourceTracker> {
    let mut tracker = ResourceTracker::new();
    for kind in [ResourceKind::Container, ResourceKind::File] {
        for id in backend.list_owned(kind).await? {
            tracker.register(RemoteResource { kind, id });
        }
    }
    Ok(tracker)
}

/// Delete every file and container owned by the credential.
pub async fn purge_owned(backend: &dyn FileBackend) -> Result<ReleaseReport> {
    let tracker = collect_owned(backend).await?;
    Ok(tracker.release(backend).await)
}

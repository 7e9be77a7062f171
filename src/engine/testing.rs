//! Scripted metadata source for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::metadata::{LookupError, MetadataRecord, MetadataSource};
use crate::models::{CompatibilityStatus, PackageIdentity};

#[derive(Default)]
pub struct ScriptedSource {
    records: HashMap<PackageIdentity, MetadataRecord>,
    failing: HashSet<PackageIdentity>,
    hanging: HashSet<PackageIdentity>,
    delay: Option<Duration>,
    calls: Mutex<HashMap<PackageIdentity, usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Counts a lookup as in flight until dropped, also on cancellation.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn package(
        mut self,
        name: &str,
        version: &str,
        status: CompatibilityStatus,
        dependencies: &[(&str, &str)],
    ) -> Self {
        let dependencies = dependencies
            .iter()
            .map(|(n, v)| PackageIdentity::new(*n, *v))
            .collect();
        self.records.insert(
            PackageIdentity::new(name, version),
            MetadataRecord::new(status, dependencies),
        );
        self
    }

    /// Lookups of this package fail with a malformed-metadata error.
    pub fn failing(mut self, name: &str, version: &str) -> Self {
        self.failing.insert(PackageIdentity::new(name, version));
        self
    }

    /// Lookups of this package never complete.
    pub fn hanging(mut self, name: &str, version: &str) -> Self {
        self.hanging.insert(PackageIdentity::new(name, version));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn lookups(&self, identity: &PackageIdentity) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(identity)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of lookups that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn lookup(&self, identity: &PackageIdentity) -> Result<MetadataRecord, LookupError> {
        *self.calls.lock().unwrap().entry(identity.clone()).or_insert(0) += 1;
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.hanging.contains(identity) {
            futures::future::pending::<()>().await;
        }
        if self.failing.contains(identity) {
            return Err(LookupError::Malformed {
                identity: identity.clone(),
                reason: "scripted failure".to_string(),
            });
        }
        self.records
            .get(identity)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(identity.clone()))
    }
}

/// Run a full investigation over `projects`, each given as a name and its
/// `(package, version)` entries.
pub async fn investigate(
    source: ScriptedSource,
    projects: &[(&str, &[(&str, &str)])],
) -> crate::engine::InvestigationResult {
    let manifests: Vec<_> = projects
        .iter()
        .map(|(name, entries)| {
            crate::models::ProjectManifest::new(
                *name,
                entries
                    .iter()
                    .map(|(n, v)| crate::models::ManifestEntry::new(*n, *v))
                    .collect(),
            )
        })
        .collect();
    crate::engine::Investigator::new(std::sync::Arc::new(source), Default::default())
        .investigate(&manifests)
        .await
        .unwrap()
}

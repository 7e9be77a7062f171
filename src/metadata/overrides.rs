use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use super::{LookupError, MetadataRecord, MetadataSource};
use crate::models::{CompatibilityStatus, PackageIdentity};

/// Forces the status of selected packages, for every version.
///
/// Package names are matched case-insensitively, the way NuGet treats ids.
/// Dependencies still come from the wrapped source when it answers within
/// `dependency_timeout`; otherwise the override stands alone with no
/// dependencies.
pub struct OverrideSource {
    inner: Box<dyn MetadataSource>,
    overrides: HashMap<String, CompatibilityStatus>,
    dependency_timeout: Duration,
}

impl OverrideSource {
    pub fn new(inner: Box<dyn MetadataSource>, overrides: &HashMap<String, CompatibilityStatus>) -> Self {
        Self {
            inner,
            overrides: overrides
                .iter()
                .map(|(name, status)| (name.to_lowercase(), *status))
                .collect(),
            dependency_timeout: Duration::from_secs(5),
        }
    }

    /// How long an overridden package waits for the wrapped source.
    pub fn with_dependency_timeout(mut self, timeout: Duration) -> Self {
        self.dependency_timeout = timeout;
        self
    }

    fn forced(&self, identity: &PackageIdentity) -> Option<CompatibilityStatus> {
        self.overrides.get(&identity.name.to_lowercase()).copied()
    }
}

#[async_trait]
impl MetadataSource for OverrideSource {
    fn name(&self) -> &str {
        "overrides"
    }

    async fn lookup(&self, identity: &PackageIdentity) -> Result<MetadataRecord, LookupError> {
        let Some(status) = self.forced(identity) else {
            return self.inner.lookup(identity).await;
        };

        tracing::debug!(%identity, %status, "status forced by override");
        let dependencies =
            match tokio::time::timeout(self.dependency_timeout, self.inner.lookup(identity)).await {
                Ok(Ok(record)) => record.dependencies,
                Ok(Err(_)) => Vec::new(),
                Err(_) => {
                    tracing::debug!(%identity, "no dependencies in time for overridden package");
                    Vec::new()
                }
            };
        Ok(MetadataRecord::new(status, dependencies))
    }
}

#[cfg(test)]
mod tests {
    use super::super::catalog::CatalogSource;
    use super::*;
    use crate::engine::testing::ScriptedSource;

    fn overrides() -> HashMap<String, CompatibilityStatus> {
        let mut map = HashMap::new();
        map.insert("Newtonsoft.Json".to_string(), CompatibilityStatus::Compatible);
        map
    }

    #[tokio::test]
    async fn test_override_keeps_inner_dependencies() {
        let inner = CatalogSource::from_records(vec![(
            PackageIdentity::new("newtonsoft.json", "6.0.4"),
            MetadataRecord::new(
                CompatibilityStatus::Incompatible,
                vec![PackageIdentity::new("System.Runtime", "4.0.0")],
            ),
        )]);
        let source = OverrideSource::new(Box::new(inner), &overrides());

        let record = source
            .lookup(&PackageIdentity::new("newtonsoft.json", "6.0.4"))
            .await
            .unwrap();
        assert_eq!(record.status, CompatibilityStatus::Compatible);
        assert_eq!(record.dependencies.len(), 1);
    }

    #[tokio::test]
    async fn test_override_answers_when_inner_does_not() {
        let inner = CatalogSource::from_records(Vec::new());
        let source = OverrideSource::new(Box::new(inner), &overrides());

        let record = source
            .lookup(&PackageIdentity::new("Newtonsoft.Json", "13.0.1"))
            .await
            .unwrap();
        assert_eq!(record.status, CompatibilityStatus::Compatible);
        assert!(record.dependencies.is_empty());

        assert!(source
            .lookup(&PackageIdentity::new("Other", "1.0"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_override_does_not_wait_on_hanging_source() {
        let inner = ScriptedSource::new().hanging("Newtonsoft.Json", "13.0.1");
        let source = OverrideSource::new(Box::new(inner), &overrides())
            .with_dependency_timeout(Duration::from_millis(20));

        let record = tokio::time::timeout(
            Duration::from_secs(2),
            source.lookup(&PackageIdentity::new("Newtonsoft.Json", "13.0.1")),
        )
        .await
        .expect("override answers without the wrapped source")
        .unwrap();
        assert_eq!(record.status, CompatibilityStatus::Compatible);
        assert!(record.dependencies.is_empty());
    }
}

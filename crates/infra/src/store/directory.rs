use async_trait::async_trait;
use dashmap::DashMap;
use postbridge_core::OrganizationDirectory;
use postbridge_domain::Result;

/// User → organization memberships held in memory.
#[derive(Debug, Default)]
pub struct StaticOrganizationDirectory {
    memberships: DashMap<String, String>,
}

impl StaticOrganizationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_membership(
        self,
        user_id: impl Into<String>,
        organization_id: impl Into<String>,
    ) -> Self {
        self.add(user_id, organization_id);
        self
    }

    /// Add or move a user to an organization.
    pub fn add(&self, user_id: impl Into<String>, organization_id: impl Into<String>) {
        self.memberships.insert(user_id.into(), organization_id.into());
    }

    pub fn remove(&self, user_id: &str) {
        self.memberships.remove(user_id);
    }
}

#[async_trait]
impl OrganizationDirectory for StaticOrganizationDirectory {
    async fn organization_for(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.memberships.get(user_id).map(|org| org.value().clone()))
    }
}

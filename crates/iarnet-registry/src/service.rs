//! Registry service — stateless command facade over the store and the
//! persistence adapter.
//!
//! Domain creation and updates write through to the durable store before
//! touching the in-memory registry; if the in-memory insert then fails the
//! orphaned row is tolerated and recovered by the next `load_domains`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use iarnet_persist::{DomainRecord, DomainRepo};

use crate::error::{RegistryError, RegistryResult};
use crate::store::RegistryStore;
use crate::types::{Domain, DomainId, DomainStats, Node, NodeStatus, ResourceTags};

/// Command facade for domain administration.
pub struct RegistryService {
    store: Arc<RegistryStore>,
    repo: DomainRepo,
}

impl RegistryService {
    pub fn new(store: Arc<RegistryStore>, repo: DomainRepo) -> Self {
        Self { store, repo }
    }

    pub fn store(&self) -> &Arc<RegistryStore> {
        &self.store
    }

    /// Create a domain: persist first, then insert into the store.
    pub async fn create_domain(&self, name: &str, description: &str) -> RegistryResult<Domain> {
        if name.is_empty() {
            return Err(RegistryError::InvalidArgument(
                "domain name is required".to_string(),
            ));
        }

        let now = Utc::now();
        let domain = Domain {
            id: format!("domain.{}", Uuid::new_v4().simple()),
            name: name.to_string(),
            description: description.to_string(),
            resource_tags: ResourceTags::default(),
            head_node_id: None,
            node_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.repo
            .create_domain(&DomainRecord {
                id: domain.id.clone(),
                name: domain.name.clone(),
                description: domain.description.clone(),
                created_at: domain.created_at,
                updated_at: domain.updated_at,
            })
            .await?;

        self.store.add_domain(domain.clone())?;
        info!(id = %domain.id, name = %domain.name, "domain created");
        Ok(domain)
    }

    /// Update a domain's name/description. Empty or absent fields leave the
    /// current value in place. Persists before mutating the store, so a
    /// rejected write leaves memory untouched.
    pub async fn update_domain(
        &self,
        domain_id: &DomainId,
        name: Option<String>,
        description: Option<String>,
    ) -> RegistryResult<Domain> {
        let current = self.store.get_domain(domain_id)?;
        let name = name.filter(|s| !s.is_empty()).unwrap_or(current.name);
        let description = description
            .filter(|s| !s.is_empty())
            .unwrap_or(current.description);

        self.repo
            .update_domain(&DomainRecord {
                id: domain_id.clone(),
                name: name.clone(),
                description: description.clone(),
                created_at: current.created_at,
                updated_at: Utc::now(),
            })
            .await?;

        self.store
            .update_domain_meta(domain_id, Some(name), Some(description))
    }

    /// Delete a domain from both the durable store and the registry,
    /// cascading over its in-memory nodes. A missing persistence row is
    /// tolerated (pre-persistence domains).
    pub async fn delete_domain(&self, domain_id: &DomainId) -> RegistryResult<()> {
        // Fail fast if the registry has no such domain.
        self.store.get_domain(domain_id)?;

        match self.repo.delete_domain(domain_id).await {
            Ok(()) => {}
            Err(iarnet_persist::PersistError::NotFound(_)) => {
                warn!(id = %domain_id, "domain missing from durable store, removing in-memory only");
            }
            Err(err) => return Err(err.into()),
        }

        self.store.remove_domain(domain_id)
    }

    pub fn get_domain(&self, domain_id: &DomainId) -> RegistryResult<Domain> {
        self.store.get_domain(domain_id)
    }

    pub fn get_all_domains(&self) -> Vec<Domain> {
        self.store.get_all_domains()
    }

    pub fn get_domain_nodes(&self, domain_id: &DomainId) -> RegistryResult<Vec<Node>> {
        self.store.get_nodes_by_domain(domain_id)
    }

    /// Node counts for one domain by observed status. Member IDs that no
    /// longer resolve in the store are skipped entirely; they represent a
    /// transient gap the store repairs on node removal.
    pub fn domain_stats(&self, domain_id: &DomainId) -> RegistryResult<DomainStats> {
        let domain = self.store.get_domain(domain_id)?;
        let mut stats = DomainStats::default();

        for node_id in &domain.node_ids {
            let Ok(node) = self.store.get_node(node_id) else {
                continue;
            };
            stats.total_nodes += 1;
            match node.status {
                NodeStatus::Online => stats.online_nodes += 1,
                NodeStatus::Offline => stats.offline_nodes += 1,
                NodeStatus::Error => stats.error_nodes += 1,
            }
        }

        Ok(stats)
    }

    /// Load every persisted domain into the store with an empty member
    /// list and default tags. Domains already present are skipped, not
    /// treated as failures. Returns the number loaded.
    pub async fn load_domains(&self) -> RegistryResult<usize> {
        let records = self.repo.get_all_domains().await?;
        if records.is_empty() {
            info!("no domains in database, starting with an empty registry");
            return Ok(0);
        }

        let mut loaded = 0;
        for record in records {
            let domain = Domain {
                id: record.id,
                name: record.name,
                description: record.description,
                resource_tags: ResourceTags::default(),
                head_node_id: None,
                node_ids: Vec::new(),
                created_at: record.created_at,
                updated_at: record.updated_at,
            };

            match self.store.add_domain(domain) {
                Ok(()) => loaded += 1,
                Err(RegistryError::DomainAlreadyExists(id)) => {
                    warn!(%id, "domain already registered, skipping");
                }
                Err(err) => return Err(err),
            }
        }

        info!(loaded, "domains loaded from database");
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodePatch;

    async fn test_service() -> RegistryService {
        let store = Arc::new(RegistryStore::new());
        let repo = DomainRepo::open_in_memory().await.unwrap();
        RegistryService::new(store, repo)
    }

    #[tokio::test]
    async fn create_domain_requires_name() {
        let svc = test_service().await;
        let err = svc.create_domain("", "desc").await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn create_domain_assigns_prefixed_id() {
        let svc = test_service().await;
        let domain = svc.create_domain("prod", "production domain").await.unwrap();

        assert!(domain.id.starts_with("domain."));
        assert!(domain.node_ids.is_empty());
        assert_eq!(domain.resource_tags, ResourceTags::default());
        assert_eq!(svc.get_domain(&domain.id).unwrap().name, "prod");
    }

    #[tokio::test]
    async fn created_domain_survives_restart() {
        let store = Arc::new(RegistryStore::new());
        let repo = DomainRepo::open_in_memory().await.unwrap();
        let svc = RegistryService::new(store, repo.clone());
        let domain = svc.create_domain("prod", "desc").await.unwrap();

        // Simulate a restart: fresh store, same database.
        let svc2 = RegistryService::new(Arc::new(RegistryStore::new()), repo);
        assert_eq!(svc2.load_domains().await.unwrap(), 1);

        let reloaded = svc2.get_domain(&domain.id).unwrap();
        assert_eq!(reloaded.id, domain.id);
        assert_eq!(reloaded.name, domain.name);
        assert_eq!(reloaded.description, domain.description);
        assert_eq!(reloaded.created_at, domain.created_at);
        assert!(reloaded.node_ids.is_empty());
    }

    #[tokio::test]
    async fn load_domains_skips_already_registered() {
        let svc = test_service().await;
        svc.create_domain("prod", "").await.unwrap();

        // The domain is already in the store; loading must not fail.
        assert_eq!(svc.load_domains().await.unwrap(), 0);
        assert_eq!(svc.get_all_domains().len(), 1);
    }

    #[tokio::test]
    async fn update_domain_persists_new_meta() {
        let store = Arc::new(RegistryStore::new());
        let repo = DomainRepo::open_in_memory().await.unwrap();
        let svc = RegistryService::new(store, repo.clone());
        let domain = svc.create_domain("prod", "before").await.unwrap();

        let updated = svc
            .update_domain(&domain.id, Some("staging".to_string()), None)
            .await
            .unwrap();
        assert_eq!(updated.name, "staging");
        assert_eq!(updated.description, "before"); // untouched

        let svc2 = RegistryService::new(Arc::new(RegistryStore::new()), repo);
        svc2.load_domains().await.unwrap();
        assert_eq!(svc2.get_domain(&domain.id).unwrap().name, "staging");
    }

    #[tokio::test]
    async fn update_missing_domain_is_not_found() {
        let svc = test_service().await;
        let err = svc
            .update_domain(&"domain.ghost".to_string(), Some("x".to_string()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::DomainNotFound(_)));
    }

    #[tokio::test]
    async fn delete_domain_cascades_and_unpersists() {
        let store = Arc::new(RegistryStore::new());
        let repo = DomainRepo::open_in_memory().await.unwrap();
        let svc = RegistryService::new(store.clone(), repo.clone());
        let domain = svc.create_domain("prod", "").await.unwrap();

        for id in ["n1", "n2", "n3"] {
            store
                .add_node(test_node(id, &domain.id))
                .unwrap();
        }

        svc.delete_domain(&domain.id).await.unwrap();
        assert!(svc.get_domain(&domain.id).is_err());
        for id in ["n1", "n2", "n3"] {
            assert!(store.get_node(&id.to_string()).is_err());
        }

        // Gone from the durable store as well.
        let svc2 = RegistryService::new(Arc::new(RegistryStore::new()), repo);
        assert_eq!(svc2.load_domains().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stats_count_by_observed_status() {
        let svc = test_service().await;
        let domain = svc.create_domain("prod", "").await.unwrap();
        let store = svc.store();

        store.add_node(test_node("n1", &domain.id)).unwrap();
        store.add_node(test_node("n2", &domain.id)).unwrap();
        store.add_node(test_node("n3", &domain.id)).unwrap();
        store
            .update_node(
                &"n1".to_string(),
                NodePatch { status: Some(NodeStatus::Online), ..Default::default() },
            )
            .unwrap();
        store
            .update_node(
                &"n3".to_string(),
                NodePatch { status: Some(NodeStatus::Error), ..Default::default() },
            )
            .unwrap();

        let stats = svc.domain_stats(&domain.id).unwrap();
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.online_nodes, 1);
        assert_eq!(stats.offline_nodes, 1);
        assert_eq!(stats.error_nodes, 1);
    }

    fn test_node(id: &str, domain: &str) -> Node {
        let now = Utc::now();
        Node {
            id: id.to_string(),
            domain_id: domain.to_string(),
            name: id.to_string(),
            address: String::new(),
            is_head: false,
            status: NodeStatus::Offline,
            resource_tags: None,
            resource_capacity: None,
            created_at: now,
            updated_at: now,
            last_seen: now,
        }
    }
}

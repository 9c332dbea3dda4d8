//! Control-plane integration: admin lifecycle, heartbeat-driven state,
//! the liveness window, and persistence across a simulated restart —
//! all in-process with an in-memory database.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use iarnet_persist::DomainRepo;
use iarnet_registry::{
    Node, NodePatch, NodeStatus, RegistryService, RegistryStore, ResourceTags,
};

const TIMEOUT: Duration = Duration::from_secs(30);
const EVICT: Duration = Duration::from_secs(60);

async fn control_plane() -> (Arc<RegistryStore>, RegistryService, DomainRepo) {
    let store = Arc::new(RegistryStore::new());
    let repo = DomainRepo::open_in_memory().await.unwrap();
    let service = RegistryService::new(store.clone(), repo.clone());
    (store, service, repo)
}

fn heartbeat_node(id: &str, domain: &str, tags: ResourceTags) -> Node {
    let now = Utc::now();
    Node {
        id: id.to_string(),
        domain_id: domain.to_string(),
        name: id.to_string(),
        address: "1.2.3.4:50051".to_string(),
        is_head: true,
        status: NodeStatus::Online,
        resource_tags: Some(tags),
        resource_capacity: None,
        created_at: now,
        updated_at: now,
        last_seen: now,
    }
}

#[tokio::test]
async fn node_lifecycle_through_the_liveness_window() {
    let (store, service, _repo) = control_plane().await;
    let domain = service.create_domain("prod", "").await.unwrap();

    // First heartbeat: head node comes up with cpu capability.
    store
        .add_node(heartbeat_node("n1", &domain.id, ResourceTags::new(true, false, false, false)))
        .unwrap();

    let nodes = service.get_domain_nodes(&domain.id).unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].address, "1.2.3.4:50051");
    assert_eq!(nodes[0].status, NodeStatus::Online);
    assert!(nodes[0].is_head);
    assert_eq!(
        service.get_domain(&domain.id).unwrap().resource_tags,
        ResourceTags::new(true, false, false, false)
    );

    let t0 = Utc::now();

    // 35 s of silence: the sweep declares the node offline, but it keeps
    // its identity and its tag contribution.
    store.sweep(t0 + chrono::Duration::seconds(35), TIMEOUT, EVICT);
    assert_eq!(store.get_node_status(&"n1".to_string()), NodeStatus::Offline);
    let stats = service.domain_stats(&domain.id).unwrap();
    assert_eq!((stats.total_nodes, stats.offline_nodes), (1, 1));
    assert_eq!(
        service.get_domain(&domain.id).unwrap().resource_tags,
        ResourceTags::new(true, false, false, false)
    );

    // A reconnecting heartbeat reattaches to the same node object.
    store
        .update_node(
            &"n1".to_string(),
            NodePatch {
                status: Some(NodeStatus::Online),
                last_seen: Some(t0 + chrono::Duration::seconds(40)),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(store.get_node_status(&"n1".to_string()), NodeStatus::Online);

    // Silence again, past both thresholds this time: offline at +75,
    // evicted at +105. Domain resets completely.
    store.sweep(t0 + chrono::Duration::seconds(75), TIMEOUT, EVICT);
    store.sweep(t0 + chrono::Duration::seconds(105), TIMEOUT, EVICT);

    assert!(store.get_node(&"n1".to_string()).is_err());
    let domain = service.get_domain(&domain.id).unwrap();
    assert!(domain.node_ids.is_empty());
    assert!(domain.head_node_id.is_none());
    assert_eq!(domain.resource_tags, ResourceTags::default());
    let stats = service.domain_stats(&domain.id).unwrap();
    assert_eq!(stats.total_nodes, 0);
}

#[tokio::test]
async fn delete_domain_cascades_but_others_survive_restart() {
    let (store, service, repo) = control_plane().await;
    let doomed = service.create_domain("doomed", "").await.unwrap();
    let kept = service.create_domain("kept", "stays around").await.unwrap();

    for id in ["n1", "n2", "n3"] {
        store
            .add_node(Node {
                is_head: false,
                ..heartbeat_node(id, &doomed.id, ResourceTags::default())
            })
            .unwrap();
    }

    service.delete_domain(&doomed.id).await.unwrap();
    assert!(service.get_domain(&doomed.id).is_err());
    for id in ["n1", "n2", "n3"] {
        assert!(store.get_node(&id.to_string()).is_err());
    }

    // Restart: only the surviving domain comes back, with empty members.
    let restarted = RegistryService::new(Arc::new(RegistryStore::new()), repo);
    assert_eq!(restarted.load_domains().await.unwrap(), 1);
    let reloaded = restarted.get_domain(&kept.id).unwrap();
    assert_eq!(reloaded.name, "kept");
    assert_eq!(reloaded.description, "stays around");
    assert!(reloaded.node_ids.is_empty());
}

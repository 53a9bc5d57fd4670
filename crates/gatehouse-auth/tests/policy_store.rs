//! Integration tests for the policy store and its backends.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use gatehouse_auth::policy::{CatalogBackend, FilePolicyAdapter, PolicyStore, RbacCatalog};
use gatehouse_core::ErrorKind;
use gatehouse_core::result::AppResult;
use gatehouse_core::traits::policy::{PolicyReader, PolicyWriter};
use gatehouse_core::types::policy::{GroupingRule, PolicyDocument, PolicyRule};

/// Backend holding a document in memory and counting saves.
#[derive(Debug, Default)]
struct MemoryBackend {
    document: Mutex<PolicyDocument>,
    saves: AtomicUsize,
}

impl MemoryBackend {
    fn with(document: PolicyDocument) -> Arc<Self> {
        Arc::new(Self {
            document: Mutex::new(document),
            saves: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PolicyReader for MemoryBackend {
    async fn load_policy(&self) -> AppResult<PolicyDocument> {
        Ok(self.document.lock().await.clone())
    }
}

#[async_trait]
impl PolicyWriter for MemoryBackend {
    async fn save_policy(&self, document: &PolicyDocument) -> AppResult<()> {
        *self.document.lock().await = document.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn admin_document() -> PolicyDocument {
    PolicyDocument {
        rules: vec![PolicyRule::new("admin", "/api/v1/users", "GET")],
        groupings: vec![GroupingRule::new("1", "admin")],
    }
}

async fn make_store(document: PolicyDocument) -> (Arc<MemoryBackend>, PolicyStore) {
    let backend = MemoryBackend::with(document);
    let store = PolicyStore::new(backend.clone(), false);
    store.load().await.unwrap();
    (backend, store)
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("gatehouse-test-{}", uuid::Uuid::new_v4()))
        .join(name)
}

#[tokio::test]
async fn test_admin_can_get_but_not_delete() {
    let (_, store) = make_store(admin_document()).await;
    assert!(store.enforce("1", "/api/v1/users", "GET").unwrap());
    assert!(!store.enforce("1", "/api/v1/users", "DELETE").unwrap());
}

#[tokio::test]
async fn test_unloaded_store_fails_closed() {
    let store = PolicyStore::new(MemoryBackend::with(admin_document()), false);
    let err = store.enforce("1", "/api/v1/users", "GET").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Internal);
    assert!(store.grant_role("2", "admin").await.is_err());
}

#[tokio::test]
async fn test_grant_role_is_idempotent() {
    let (_, store) = make_store(admin_document()).await;
    assert!(store.grant_role("2", "admin").await.unwrap());
    let after_first = store.snapshot().document().clone();
    assert!(!store.grant_role("2", "admin").await.unwrap());
    assert_eq!(store.snapshot().document(), &after_first);
    assert!(store.enforce("2", "/api/v1/users", "GET").unwrap());
}

#[tokio::test]
async fn test_revoke_takes_effect_immediately() {
    let (_, store) = make_store(admin_document()).await;
    assert!(store.enforce("1", "/api/v1/users", "GET").unwrap());
    assert!(store.revoke_role("1", "admin").await.unwrap());
    assert!(!store.enforce("1", "/api/v1/users", "GET").unwrap());
    assert!(!store.revoke_role("1", "admin").await.unwrap());
}

#[tokio::test]
async fn test_grant_permission_with_wildcard() {
    let (_, store) = make_store(admin_document()).await;
    assert!(
        store
            .grant_permission("admin", "/api/v1/students/*", "*")
            .await
            .unwrap()
    );
    assert!(store.enforce("1", "/api/v1/students/7", "DELETE").unwrap());
    assert!(!store.enforce("1", "/api/v1/studentsx", "GET").unwrap());
    assert!(
        store
            .revoke_permission("admin", "/api/v1/students/*", "*")
            .await
            .unwrap()
    );
    assert!(!store.enforce("1", "/api/v1/students/7", "DELETE").unwrap());
}

#[tokio::test]
async fn test_empty_arguments_rejected() {
    let (_, store) = make_store(admin_document()).await;
    let err = store.grant_role("", "admin").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    let err = store.grant_permission("admin", "/x", " ").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_roles_and_permissions_of() {
    let mut document = admin_document();
    document.groupings.push(GroupingRule::new("admin", "viewer"));
    document
        .rules
        .push(PolicyRule::new("viewer", "/api/v1/reports/*", "GET"));
    let (_, store) = make_store(document).await;

    assert_eq!(store.roles_of("1").unwrap(), vec!["admin", "viewer"]);
    let permissions = store.permissions_of("1").unwrap();
    assert_eq!(permissions.len(), 2);
    assert!(permissions.iter().any(|p| p.resource == "/api/v1/reports/*"));
}

#[tokio::test]
async fn test_persist_and_shutdown() {
    let (backend, store) = make_store(admin_document()).await;
    assert!(!store.is_dirty());
    store.grant_role("2", "admin").await.unwrap();
    assert!(store.is_dirty());
    assert_eq!(backend.saves.load(Ordering::SeqCst), 0);

    store.shutdown().await.unwrap();
    assert!(!store.is_dirty());
    assert_eq!(backend.saves.load(Ordering::SeqCst), 1);
    assert!(
        backend
            .document
            .lock()
            .await
            .groupings
            .contains(&GroupingRule::new("2", "admin"))
    );

    store.shutdown().await.unwrap();
    assert_eq!(backend.saves.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_auto_save() {
    let backend = MemoryBackend::with(admin_document());
    let store = PolicyStore::new(backend.clone(), true);
    store.load().await.unwrap();
    store.grant_role("3", "admin").await.unwrap();
    assert_eq!(backend.saves.load(Ordering::SeqCst), 1);
    assert!(!store.is_dirty());
}

#[tokio::test]
async fn test_reload_replaces_snapshot() {
    let (backend, store) = make_store(admin_document()).await;
    *backend.document.lock().await = PolicyDocument::default();
    assert!(store.enforce("1", "/api/v1/users", "GET").unwrap());
    store.reload().await.unwrap();
    assert!(!store.enforce("1", "/api/v1/users", "GET").unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reload_races_with_enforce() {
    const READERS: usize = 64;
    const ROUNDS: usize = 200;

    let (backend, store) = make_store(admin_document()).await;
    let store = Arc::new(store);

    // The old set allows only GET, the new one only DELETE.
    *backend.document.lock().await = PolicyDocument {
        rules: vec![PolicyRule::new("admin", "/api/v1/users", "DELETE")],
        groupings: vec![GroupingRule::new("1", "admin")],
    };

    let barrier = Arc::new(tokio::sync::Barrier::new(READERS + 1));
    let mut handles = Vec::new();
    for _ in 0..READERS {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let mut seen_new = false;
            for _ in 0..ROUNDS {
                let snapshot = store.snapshot();
                let get = snapshot.enforce("1", "/api/v1/users", "GET");
                let delete = snapshot.enforce("1", "/api/v1/users", "DELETE");
                assert!(get != delete, "mixed snapshot: get={get} delete={delete}");
                // Once published, the new set never goes back.
                assert!(!(seen_new && get));
                seen_new |= delete;
                tokio::task::yield_now().await;
            }
        }));
    }

    barrier.wait().await;
    store.reload().await.unwrap();

    for result in futures::future::join_all(handles).await {
        result.unwrap();
    }
    assert!(!store.enforce("1", "/api/v1/users", "GET").unwrap());
    assert!(store.enforce("1", "/api/v1/users", "DELETE").unwrap());
}

/// Backend whose saves always fail.
#[derive(Debug)]
struct ReadOnlyBackend {
    document: PolicyDocument,
}

#[async_trait]
impl PolicyReader for ReadOnlyBackend {
    async fn load_policy(&self) -> AppResult<PolicyDocument> {
        Ok(self.document.clone())
    }
}

#[async_trait]
impl PolicyWriter for ReadOnlyBackend {
    async fn save_policy(&self, _document: &PolicyDocument) -> AppResult<()> {
        Err(gatehouse_core::AppError::internal("policy storage is read-only"))
    }
}

#[tokio::test]
async fn test_auto_save_failure_keeps_previous_policy() {
    let backend = Arc::new(ReadOnlyBackend {
        document: PolicyDocument {
            rules: vec![PolicyRule::new("admin", "/api/v1/users", "DELETE")],
            groupings: Vec::new(),
        },
    });
    let store = PolicyStore::new(backend, true);
    store.load().await.unwrap();

    assert!(store.grant_role("1", "admin").await.is_err());
    assert!(store.roles_of("1").unwrap().is_empty());
    assert!(!store.enforce("1", "/api/v1/users", "DELETE").unwrap());
    assert!(!store.is_dirty());
}

#[tokio::test]
async fn test_file_adapter_round_trip() {
    let path = temp_path("policy.csv");
    let adapter = Arc::new(FilePolicyAdapter::new(&path));

    let store = PolicyStore::new(adapter.clone(), false);
    store.load().await.unwrap();
    assert!(!store.enforce("1", "/api/v1/users", "GET").unwrap());

    store.grant_permission("admin", "/api/v1/users", "GET").await.unwrap();
    store.grant_role("1", "admin").await.unwrap();
    store.persist().await.unwrap();

    let reopened = PolicyStore::new(Arc::new(FilePolicyAdapter::new(&path)), false);
    reopened.load().await.unwrap();
    assert!(reopened.enforce("1", "/api/v1/users", "GET").unwrap());

    let text = tokio::fs::read_to_string(&path).await.unwrap();
    assert!(text.contains("p, admin, /api/v1/users, GET"));
    assert!(text.contains("g, 1, admin"));
}

#[tokio::test]
async fn test_file_adapter_rejects_invalid_model() {
    let model = temp_path("model.conf");
    tokio::fs::create_dir_all(model.parent().unwrap()).await.unwrap();
    tokio::fs::write(&model, "[request_definition]\nr = sub, obj\n")
        .await
        .unwrap();
    let adapter = FilePolicyAdapter::new(temp_path("policy.csv")).with_model(&model);
    let err = adapter.load_policy().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[tokio::test]
async fn test_catalog_backs_the_store() {
    let catalog = Arc::new(RbacCatalog::new());
    let admin = catalog.create_role("admin", "administrators").await.unwrap();
    let read_users = catalog
        .create_permission("users:read", "/api/v1/users", "GET", "")
        .await
        .unwrap();
    catalog.assign_permission(admin.id, read_users.id).await.unwrap();
    catalog.assign_role("1", admin.id).await.unwrap();

    let store = PolicyStore::new(catalog.clone(), false);
    store.load().await.unwrap();
    assert!(store.enforce("1", "/api/v1/users", "GET").unwrap());

    catalog
        .set_role_status(admin.id, gatehouse_core::types::EntityStatus::Disabled)
        .await
        .unwrap();
    store.reload().await.unwrap();
    assert!(!store.enforce("1", "/api/v1/users", "GET").unwrap());
}

#[tokio::test]
async fn test_catalog_backend_seeds_and_mirrors_file() {
    let path = temp_path("policy.csv");
    FilePolicyAdapter::new(&path)
        .save_policy(&admin_document())
        .await
        .unwrap();

    let catalog = Arc::new(RbacCatalog::new());
    let backend = CatalogBackend::new(catalog.clone(), FilePolicyAdapter::new(&path));
    backend.seed().await.unwrap();
    assert!(catalog.find_role_by_name("admin").await.is_ok());

    let store = PolicyStore::new(Arc::new(backend), true);
    store.load().await.unwrap();
    assert!(store.enforce("1", "/api/v1/users", "GET").unwrap());

    store.grant_role("5", "admin").await.unwrap();
    let admin = catalog.find_role_by_name("admin").await.unwrap();
    assert_eq!(catalog.roles_for_subject("5").await, vec![admin]);

    let text = tokio::fs::read_to_string(&path).await.unwrap();
    assert!(text.contains("g, 5, admin"));
}

#[tokio::test]
async fn test_catalog_reconciles_saved_policy() {
    let catalog = Arc::new(RbacCatalog::new());
    let store = PolicyStore::new(catalog.clone(), false);
    store.load().await.unwrap();

    store.grant_permission("editor", "/api/v1/posts/*", "*").await.unwrap();
    store.grant_role("5", "editor").await.unwrap();
    store.persist().await.unwrap();

    let editor = catalog.find_role_by_name("editor").await.unwrap();
    assert_eq!(catalog.roles_for_subject("5").await.len(), 1);
    assert_eq!(catalog.permissions_for_role(editor.id).await.unwrap().len(), 1);

    store.revoke_role("5", "editor").await.unwrap();
    store.persist().await.unwrap();
    assert!(catalog.roles_for_subject("5").await.is_empty());
}

#[tokio::test]
async fn test_shipped_policy_files_load() {
    let root = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config");
    let adapter = FilePolicyAdapter::new(format!("{root}/policy.csv"))
        .with_model(format!("{root}/rbac_model.conf"));
    let store = PolicyStore::new(Arc::new(adapter), false);
    store.load().await.unwrap();

    assert!(store.enforce("1", "/v1/rbac/reload", "POST").unwrap());
    assert!(store.enforce("student", "/v1/auth/me", "GET").unwrap());
    assert!(!store.enforce("student", "/v1/rbac/reload", "POST").unwrap());
    assert!(!store.is_dirty());
}

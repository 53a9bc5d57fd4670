//! Exercises the Nacos backend against a local stand-in naming server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::routing::{get, post, put};

use gatehouse_core::ErrorKind;
use gatehouse_core::config::discovery::NacosConfig;
use gatehouse_core::types::InstanceRegistration;
use gatehouse_discovery::{NacosDiscovery, ServiceRegistry};

type Calls = Arc<Mutex<Vec<(String, HashMap<String, String>)>>>;

async fn record(calls: &Calls, name: &str, params: HashMap<String, String>) {
    calls.lock().unwrap().push((name.to_string(), params));
}

async fn spawn_naming_server() -> (String, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));

    let app = Router::new()
        .route(
            "/nacos/v1/ns/instance",
            post(
                |State(calls): State<Calls>, Query(q): Query<HashMap<String, String>>| async move {
                    record(&calls, "register", q).await;
                    "ok"
                },
            )
            .delete(
                |State(calls): State<Calls>, Query(q): Query<HashMap<String, String>>| async move {
                    record(&calls, "deregister", q).await;
                    "ok"
                },
            ),
        )
        .route(
            "/nacos/v1/ns/instance/beat",
            put(
                |State(calls): State<Calls>, Query(q): Query<HashMap<String, String>>| async move {
                    record(&calls, "beat", q).await;
                    r#"{"clientBeatInterval":5000,"code":10200}"#
                },
            ),
        )
        .route(
            "/nacos/v1/ns/instance/list",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                if q.get("serviceName").map(String::as_str) == Some("user-service") {
                    r#"{"hosts":[
                        {"ip":"10.0.0.1","port":8080,"healthy":true,"enabled":true,"weight":5.0},
                        {"ip":"10.0.0.2","port":8080,"healthy":false,"enabled":true}
                    ]}"#
                } else {
                    r#"{"hosts":[]}"#
                }
            }),
        )
        .with_state(calls.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), calls)
}

fn make_registry(endpoint: String) -> ServiceRegistry {
    let config = NacosConfig {
        endpoint,
        ..NacosConfig::default()
    };
    let nacos = NacosDiscovery::new(&config, Duration::from_secs(2)).unwrap();
    ServiceRegistry::new(Arc::new(nacos), Duration::from_secs(2))
}

#[tokio::test]
async fn test_instances_filtered_to_healthy() {
    let (endpoint, _) = spawn_naming_server().await;
    let registry = make_registry(endpoint);

    let instances = registry.instances("user-service").await.unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].host, "10.0.0.1");
    assert_eq!(instances[0].weight(), 5);

    assert!(registry.instances("student-service").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_register_heartbeat_deregister() {
    let (endpoint, calls) = spawn_naming_server().await;
    let registry = make_registry(endpoint);
    let registration = InstanceRegistration::new("gatehouse", "127.0.0.1", 8000)
        .with_metadata("version", "v1")
        .with_metadata("group", "edge")
        .with_metadata("cluster", "east");

    registry.register(&registration).await.unwrap();
    registry.heartbeat(&registration).await.unwrap();
    registry.deregister(&registration).await.unwrap();

    let calls = calls.lock().unwrap();
    let names: Vec<&str> = calls.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["register", "beat", "deregister"]);

    let register = &calls[0].1;
    assert_eq!(register.get("serviceName").unwrap(), "gatehouse");
    assert_eq!(register.get("weight").unwrap(), "10");
    assert_eq!(register.get("groupName").unwrap(), "edge");
    assert_eq!(register.get("ephemeral").unwrap(), "true");

    // Removal targets the group and cluster the instance registered under.
    let deregister = &calls[2].1;
    assert_eq!(deregister.get("groupName").unwrap(), "edge");
    assert_eq!(deregister.get("clusterName"), register.get("clusterName"));
    assert_eq!(deregister.get("clusterName").unwrap(), "east");
}

#[tokio::test]
async fn test_unreachable_server_is_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let registry = make_registry(format!("http://{addr}"));
    let err = registry.instances("user-service").await.unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::DiscoveryUnavailable | ErrorKind::Timeout
    ));
}

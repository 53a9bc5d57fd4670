//! Gatehouse Server: authorization gateway.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, fmt};

use gatehouse_api::AppState;
use gatehouse_auth::{
    AccessController, CatalogBackend, FilePolicyAdapter, PolicyStore, RbacCatalog, TokenCodec,
};
use gatehouse_core::config::AppConfig;
use gatehouse_core::config::policy::PolicyBackendKind;
use gatehouse_core::error::AppError;
use gatehouse_core::types::InstanceRegistration;
use gatehouse_discovery::heartbeat::spawn_heartbeat;
use gatehouse_discovery::reaper::spawn_reaper;
use gatehouse_gateway::GatewayRouter;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from `config/` and the environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("GATEHOUSE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Gatehouse v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Token codec ──────────────────────────────────────
    if config.auth.uses_default_secret() {
        tracing::warn!(
            "auth.jwt_secret is the shipped placeholder; set GATEHOUSE__AUTH__JWT_SECRET"
        );
    }
    let token_codec = Arc::new(TokenCodec::new(&config.auth));

    // ── Step 2: Policy store ─────────────────────────────────────
    tracing::info!(
        backend = ?config.policy.backend,
        model = %config.policy.model_path,
        policy = %config.policy.policy_path,
        "Loading policy..."
    );
    let adapter = FilePolicyAdapter::new(config.policy.policy_path.as_str())
        .with_model(config.policy.model_path.as_str());
    let (policy, catalog) = match config.policy.backend {
        PolicyBackendKind::File => {
            let store = PolicyStore::new(Arc::new(adapter), config.policy.auto_save);
            (Arc::new(store), None)
        }
        PolicyBackendKind::Catalog => {
            // Catalog edits republish by reloading, so grants made through
            // the store must already be saved.
            let backend = CatalogBackend::new(Arc::new(RbacCatalog::new()), adapter);
            backend.seed().await?;
            let catalog = Arc::clone(backend.catalog());
            let store = PolicyStore::new(Arc::new(backend), true);
            (Arc::new(store), Some(catalog))
        }
    };
    policy.load().await?;

    // ── Step 3: Access pipeline ──────────────────────────────────
    let access = Arc::new(AccessController::new(
        Arc::clone(&token_codec),
        Arc::clone(&policy),
        &config.access.skip_paths,
    ));

    // ── Step 4: Service discovery ────────────────────────────────
    tracing::info!(provider = ?config.discovery.provider, "Initializing service discovery...");
    let discovery = gatehouse_discovery::build_registry(&config.discovery)?;
    let registry = Arc::clone(&discovery.registry);

    // ── Step 5: Gateway ──────────────────────────────────────────
    let gateway = Arc::new(GatewayRouter::new(&config.gateway, Arc::clone(&registry))?);
    for route in gateway.routes().routes() {
        tracing::info!(prefix = %route.prefix, service = %route.service, "Gateway route");
    }

    // ── Step 6: Shutdown channel & background tasks ──────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut background: Vec<JoinHandle<()>> = Vec::new();

    if let Some(memory) = discovery.memory.clone() {
        background.push(spawn_reaper(
            memory,
            Duration::from_secs(config.discovery.reaper_interval_seconds),
            shutdown_rx.clone(),
        ));
    }

    // ── Step 7: Self-registration ────────────────────────────────
    let self_registration = if config.discovery.register_self {
        let registration = self_registration(&config);
        registry.register(&registration).await?;
        background.push(spawn_heartbeat(
            Arc::clone(&registry),
            registration.clone(),
            Duration::from_secs(config.discovery.heartbeat_interval_seconds),
            shutdown_rx.clone(),
        ));
        Some(registration)
    } else {
        None
    };

    // ── Step 8: Build and start HTTP server ──────────────────────
    let app_state = AppState {
        config: Arc::new(config.clone()),
        token_codec,
        policy: Arc::clone(&policy),
        access,
        catalog,
        registry: Arc::clone(&registry),
        gateway,
    };

    let app = gatehouse_api::build_app(app_state, &config.server);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Gatehouse listening on {}", addr);

    // ── Step 9: Graceful shutdown ────────────────────────────────
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    // ── Step 10: Wait for background tasks ───────────────────────
    tracing::info!("Waiting for background tasks to complete...");
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    for handle in background {
        let _ = tokio::time::timeout(grace, handle).await;
    }

    // ── Step 11: Deregister and flush policy ─────────────────────
    if let Some(registration) = self_registration {
        if let Err(e) = registry.deregister(&registration).await {
            tracing::warn!(error = %e, "Deregistration failed");
        }
    }

    if let Err(e) = policy.shutdown().await {
        tracing::error!(error = %e, "Failed to persist policy on shutdown");
    }

    tracing::info!("Gatehouse shut down gracefully");
    Ok(())
}

/// Registration advertised for this server.
fn self_registration(config: &AppConfig) -> InstanceRegistration {
    let discovery = &config.discovery;
    let port = discovery.advertise_port.unwrap_or(config.server.port);
    let mut registration = InstanceRegistration::new(
        discovery.service_name.clone(),
        discovery.advertise_host.clone(),
        port,
    );
    registration.metadata = discovery.metadata.clone();
    registration
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

//! Minibank back-office server entry point.
//!
//! Loads the per-environment YAML config, initializes logging, picks the
//! storage backend (PostgreSQL when configured, in-memory otherwise), seeds
//! the bootstrap agent account and serves the gateway.

use std::sync::Arc;

use tracing::{info, warn};

use minibank::auth::{AuthService, NewUser};
use minibank::config::AppConfig;
use minibank::gateway::{run_server, state::AppState};
use minibank::logging::init_logging;
use minibank::models::Role;
use minibank::store::{LedgerStore, MemoryStore, PgStore};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

/// Create the bootstrap agent when no user with that email exists yet.
async fn seed_agent(
    store: &Arc<dyn LedgerStore>,
    auth: &AuthService,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let Some(seed) = &config.seed_agent else {
        return Ok(());
    };
    if store.user_by_email(&seed.email).await?.is_some() {
        return Ok(());
    }
    auth.create_user(NewUser {
        national_id: seed.national_id.clone(),
        last_name: seed.last_name.clone(),
        first_name: seed.first_name.clone(),
        email: seed.email.clone(),
        phone: seed.phone.clone(),
        password: seed.password.clone(),
        role: Role::Agent,
    })
    .await?;
    info!(email = %seed.email, "compte agent initial créé");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env);
    let _guard = init_logging(&config);

    info!(
        env = %env,
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_HASH"),
        "minibank démarre"
    );

    let store: Arc<dyn LedgerStore> = match &config.postgres_url {
        Some(url) => {
            let pg = PgStore::connect(url).await?;
            info!("stockage PostgreSQL prêt");
            Arc::new(pg)
        }
        None => {
            warn!("pas de postgres_url configuré, stockage en mémoire volatile");
            Arc::new(MemoryStore::new())
        }
    };

    let auth = Arc::new(AuthService::new(
        store.clone(),
        config.auth.jwt_secret.clone(),
        config.auth.token_ttl_hours,
    ));
    seed_agent(&store, &auth, &config).await?;

    let state = Arc::new(AppState::new(store, auth));
    let port = get_port_override().unwrap_or(config.gateway.port);
    run_server(&config.gateway.host, port, state).await
}

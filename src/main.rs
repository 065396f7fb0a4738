use mimalloc::MiMalloc;
use std::sync::Arc;
use std::time::Duration;
use tagnote::config::Config;
use tagnote::db::{self, AnnotationStore};
use tagnote::git_tags::{AzureDevOpsClient, GitTagListCache};
use tagnote::server::router::{TagnoteState, tagnote_router};
use tagnote::service::GitTagTable;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        azure_base_url = %cfg.azure.base_url,
        organization = %cfg.azure.organization,
        proxy = %cfg.azure.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %cfg.basic.loglevel,
    );
    if cfg.basic.uses_default_key() {
        warn!("tagnote_key is the built-in default; set TAGNOTE_BASIC__TAGNOTE_KEY");
    }
    if cfg.azure.token.is_none() {
        warn!("no Azure DevOps token configured; tag listing will be anonymous");
    }

    // The pool is owned here; the store only migrates and queries it.
    let pool = db::connect(&cfg.basic.database_url).await?;
    let store = AnnotationStore::create(pool.clone()).await?;

    let source = Arc::new(AzureDevOpsClient::new(&cfg.azure)?);
    let cache = Arc::new(GitTagListCache::new(
        source,
        Duration::from_secs(cfg.azure.cache_ttl_secs),
    ));
    let table = GitTagTable::new(cache, store);

    let tagnote_key: Arc<str> = Arc::from(cfg.basic.tagnote_key.as_str());
    let app = tagnote_router(TagnoteState::new(table, tagnote_key));

    let listener = TcpListener::bind(&cfg.basic.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.basic.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

mod domain;
mod pages;
mod problem;
mod products;
mod router;
mod session;
mod store_form;
mod telemetry;
mod theme;

use std::{net::SocketAddr, sync::Arc};

use tracing::info;

use storefront_api::{CatalogClient, StoreClient};
use storefront_util::{load_env_file, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;
    let catalog = CatalogClient::new(config.catalog_api_base.clone(), http.clone());
    let stores = StoreClient::new(
        config.store_api_base.clone(),
        config.domain_suffix.clone(),
        http,
    );

    let state = router::AppState::new(
        metrics,
        catalog,
        stores.clone(),
        Arc::new(stores),
        config.domain_debounce,
        config.sse_heartbeat,
        config.http_timeout,
    );
    session::SessionSweeper::new(state.sessions().clone()).spawn();

    let addr: SocketAddr = config.bind_addr;
    info!(
        stage = "app",
        %addr,
        env = %config.environment.as_str(),
        catalog = %config.catalog_api_base,
        stores = %config.store_api_base,
        "starting HTTP server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}

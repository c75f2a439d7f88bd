use std::{sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

use storefront_api::{CatalogClient, StoreClient};

use crate::domain::{self, DomainLookup};
use crate::session::FormSessions;
use crate::{products, store_form, telemetry, theme};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    catalog: CatalogClient,
    stores: StoreClient,
    lookup: Arc<dyn DomainLookup>,
    sessions: FormSessions,
    clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
    sse_heartbeat: Duration,
    settle_timeout: Duration,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        metrics: PrometheusHandle,
        catalog: CatalogClient,
        stores: StoreClient,
        lookup: Arc<dyn DomainLookup>,
        domain_debounce: Duration,
        sse_heartbeat: Duration,
        settle_timeout: Duration,
    ) -> Self {
        let sessions = FormSessions::new(lookup.clone(), domain_debounce);
        Self {
            metrics,
            catalog,
            stores,
            lookup,
            sessions,
            clock: Arc::new(Utc::now),
            sse_heartbeat,
            settle_timeout,
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    pub fn stores(&self) -> &StoreClient {
        &self.stores
    }

    pub fn domain_lookup(&self) -> Arc<dyn DomainLookup> {
        self.lookup.clone()
    }

    pub fn sessions(&self) -> &FormSessions {
        &self.sessions
    }

    pub fn domain_suffix(&self) -> &str {
        self.stores.domain_suffix()
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn sse_heartbeat(&self) -> Duration {
        self.sse_heartbeat
    }

    /// Upper bound a submission waits for an in-flight availability check.
    pub fn settle_timeout(&self) -> Duration {
        self.settle_timeout
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(store_form::new_form))
        .route("/stores", post(store_form::submit))
        .route("/stores/feedback", post(store_form::feedback))
        .route("/stores/sessions", post(store_form::open_session))
        .route("/stores/sessions/:id/domain", post(store_form::push_domain))
        .route("/stores/sessions/:id/events", get(store_form::events))
        .route("/products", get(products::index))
        .route("/products/cards", get(products::cards))
        .route("/products/:id", get(products::detail))
        .route("/api/domains/check", get(domain::check))
        .route("/theme", post(theme::toggle))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .fallback(products::not_found)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        telemetry::render_metrics(state.metrics()),
    )
}

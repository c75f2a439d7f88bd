use std::{future::Future, pin::Pin};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use storefront_api::StoreClient;
use storefront_core::{DomainStatus, LookupOutcome};

use crate::problem::ProblemResponse;
use crate::router::AppState;

pub type LookupFuture = Pin<Box<dyn Future<Output = LookupOutcome> + Send>>;

/// Remote availability check used by form sessions.
pub trait DomainLookup: Send + Sync + 'static {
    fn lookup(&self, domain: String) -> LookupFuture;
}

impl DomainLookup for StoreClient {
    fn lookup(&self, domain: String) -> LookupFuture {
        let client = self.clone();
        Box::pin(async move {
            let outcome = match client.check_domain(&domain).await {
                Ok(check) => LookupOutcome::from_taken(check.taken),
                Err(err) => {
                    warn!(stage = "domain", %domain, error = %err, "domain availability lookup failed");
                    LookupOutcome::Failed
                }
            };
            debug!(stage = "domain", %domain, outcome = outcome.as_str(), "domain lookup completed");
            counter!("domain_lookups_total", "result" => outcome.as_str()).increment(1);
            outcome
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DomainCheckQuery {
    #[serde(default)]
    domain: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainCheckResponse {
    pub domain: String,
    pub status: String,
    pub message: String,
}

/// One-shot availability check without debouncing.
pub async fn check(
    State(state): State<AppState>,
    Query(query): Query<DomainCheckQuery>,
) -> Result<Json<DomainCheckResponse>, ProblemResponse> {
    let domain = query.domain.trim().to_string();
    if domain.is_empty() {
        return Err(ProblemResponse::new(
            StatusCode::BAD_REQUEST,
            "domain_required",
            "domain query parameter must not be empty",
        ));
    }

    let status = DomainStatus::from(state.domain_lookup().lookup(domain.clone()).await);
    Ok(Json(DomainCheckResponse {
        domain,
        status: status.as_str().to_string(),
        message: status.message().to_string(),
    }))
}

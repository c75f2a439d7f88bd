use std::{future::Future, time::Instant};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use metrics::{counter, histogram};
use serde::Deserialize;
use tracing::{info, warn};

use storefront_api::CatalogError;

use crate::pages;
use crate::router::AppState;
use crate::theme::theme_from_headers;

const CREATED_NOTICE: &str = "Store created successfully!";

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    #[serde(default)]
    created: Option<String>,
}

/// Listing shell with skeleton cards; the grid loads from [`cards`].
pub async fn index(headers: HeaderMap, Query(query): Query<ListingQuery>) -> Html<String> {
    let notice = query.created.is_some().then_some(CREATED_NOTICE);
    Html(pages::products_page(theme_from_headers(&headers), notice))
}

/// Card fragment for the listing grid; failures degrade to the empty state.
pub async fn cards(State(state): State<AppState>) -> Html<String> {
    let products = instrumented(state.catalog().list_products())
        .await
        .unwrap_or_default();
    info!(stage = "catalog", count = products.len(), "product cards rendered");
    Html(pages::product_cards(&products))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let theme = theme_from_headers(&headers);
    let product = instrumented(state.catalog().find_product(&id))
        .await
        .ok()
        .flatten();

    match product {
        Some(product) => Html(pages::product_detail_page(theme, &product)).into_response(),
        None => {
            info!(stage = "catalog", product_id = %id, "product not found");
            (StatusCode::NOT_FOUND, Html(pages::not_found_page(theme))).into_response()
        }
    }
}

pub async fn not_found(headers: HeaderMap) -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        Html(pages::not_found_page(theme_from_headers(&headers))),
    )
}

/// Records latency and outcome of one catalog request.
async fn instrumented<T>(
    request: impl Future<Output = Result<T, CatalogError>>,
) -> Result<T, CatalogError> {
    let started = Instant::now();
    let result = request.await;
    histogram!("catalog_fetch_seconds").record(started.elapsed().as_secs_f64());

    match &result {
        Ok(_) => {
            counter!("catalog_requests_total", "result" => "ok").increment(1);
        }
        Err(err) => {
            counter!("catalog_requests_total", "result" => err.kind()).increment(1);
            warn!(stage = "catalog", error = %err, "failed to fetch product catalog");
        }
    }
    result
}

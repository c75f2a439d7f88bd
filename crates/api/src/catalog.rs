use reqwest::{Client, StatusCode};
use storefront_core::product::{find_product, Product, ProductEnvelope};
use thiserror::Error;
use url::Url;

const PRODUCT_PATH: &str = "product";

/// Read-only client for the remote product catalog.
#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    base_url: Url,
}

impl CatalogClient {
    /// Creates a catalog client rooted at `base_url`.
    pub fn new(base_url: Url, http: Client) -> Self {
        Self { http, base_url }
    }

    /// Fetches the full product collection.
    pub async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        let url = self.base_url.join(PRODUCT_PATH)?;
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<unavailable>"));
            return Err(CatalogError::Status { status, body });
        }

        let envelope: ProductEnvelope = response.json().await?;
        envelope.data.ok_or(CatalogError::MissingData)
    }

    /// Finds a single product by filtering the collection locally.
    pub async fn find_product(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        let products = self.list_products().await?;
        Ok(find_product(&products, id).cloned())
    }
}

/// Errors produced by the catalog client.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to build url: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("response envelope carried no data")]
    MissingData,
}

impl CatalogError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::Http(_) => "http",
            Self::Status { .. } => "status",
            Self::MissingData => "missing_data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> CatalogClient {
        let base = Url::parse(&server.url("/api/")).expect("url");
        CatalogClient::new(base, Client::builder().build().expect("client"))
    }

    fn products_body() -> serde_json::Value {
        json!({
            "data": [
                { "_id": "p-1", "name": "Panjabi", "price": 1200 },
                { "_id": "p-2", "name": "Scarf", "price": 450 }
            ]
        })
    }

    #[tokio::test]
    async fn list_products_parses_envelope() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/product");
                then.status(200).json_body(products_body());
            })
            .await;

        let products = client(&server).list_products().await.expect("products");
        mock.assert_async().await;

        assert_eq!(products.len(), 2);
        assert_eq!(products[1].name, "Scarf");
    }

    #[tokio::test]
    async fn empty_collection_is_not_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/product");
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;

        let products = client(&server).list_products().await.expect("products");
        assert!(products.is_empty());
    }

    #[tokio::test]
    async fn missing_data_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/product");
                then.status(200).json_body(json!({ "success": false }));
            })
            .await;

        let err = client(&server)
            .list_products()
            .await
            .expect_err("should error");
        assert!(matches!(err, CatalogError::MissingData));
    }

    #[tokio::test]
    async fn error_status_returns_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/product");
                then.status(503).body("maintenance");
            })
            .await;

        let err = client(&server)
            .list_products()
            .await
            .expect_err("should error");
        match err {
            CatalogError::Status { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn find_product_filters_locally() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/product");
                then.status(200).json_body(products_body());
            })
            .await;

        let catalog = client(&server);
        let found = catalog.find_product("p-2").await.expect("lookup");
        let missing = catalog.find_product("p-9").await.expect("lookup");

        assert_eq!(found.map(|p| p.name), Some("Scarf".to_string()));
        assert!(missing.is_none());
        mock.assert_hits_async(2).await;
    }
}

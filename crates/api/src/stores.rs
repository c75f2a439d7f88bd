use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use storefront_core::form::CreateStoreRequest;
use thiserror::Error;
use url::Url;

const DOMAIN_CHECK_PATH: &str = "domains/check/";
const CREATE_STORE_PATH: &str = "stores/create";
const FALLBACK_ERROR_MESSAGE: &str = "Unknown error";

/// Client for the store API: subdomain availability and store creation.
#[derive(Clone)]
pub struct StoreClient {
    http: Client,
    base_url: Url,
    domain_suffix: String,
}

impl StoreClient {
    /// Creates a client; `domain_suffix` is appended to every checked subdomain.
    pub fn new(base_url: Url, domain_suffix: impl Into<String>, http: Client) -> Self {
        Self {
            http,
            base_url,
            domain_suffix: domain_suffix.into(),
        }
    }

    pub fn domain_suffix(&self) -> &str {
        &self.domain_suffix
    }

    /// Asks the remote whether `subdomain` is already registered.
    pub async fn check_domain(&self, subdomain: &str) -> Result<DomainCheck, StoreApiError> {
        let mut url = self.base_url.join(DOMAIN_CHECK_PATH)?;
        url.path_segments_mut()
            .map_err(|_| StoreApiError::CannotBeABase)?
            .pop_if_empty()
            .push(&format!("{subdomain}{}", self.domain_suffix));

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreApiError::Status { status, body });
        }

        let parsed: DomainCheckBody =
            serde_json::from_str(&body).map_err(|_| StoreApiError::UnexpectedBody(body))?;
        Ok(parsed.into())
    }

    /// Registers a new store. Non-2xx responses become [`StoreApiError::Rejected`].
    ///
    /// Any 2xx counts as created; the body is returned only when it is JSON.
    pub async fn create_store(
        &self,
        request: &CreateStoreRequest,
    ) -> Result<Option<Value>, StoreApiError> {
        let url = self.base_url.join(CREATE_STORE_PATH)?;
        let response = self.http.post(url).json(request).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|err| err.message)
                .filter(|message| !message.trim().is_empty());
            return Err(StoreApiError::Rejected { status, message });
        }

        Ok(serde_json::from_str(&body).ok())
    }
}

/// Normalized availability answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainCheck {
    pub taken: bool,
}

/// The endpoint has answered both with a top-level flag and with one nested under `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DomainCheckBody {
    Flat { taken: bool },
    Nested { data: TakenFlag },
}

#[derive(Debug, Deserialize)]
struct TakenFlag {
    taken: bool,
}

impl From<DomainCheckBody> for DomainCheck {
    fn from(value: DomainCheckBody) -> Self {
        let taken = match value {
            DomainCheckBody::Flat { taken } => taken,
            DomainCheckBody::Nested { data } => data.taken,
        };
        Self { taken }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Errors produced by the store client.
#[derive(Debug, Error)]
pub enum StoreApiError {
    #[error("failed to build url: {0}")]
    Url(#[from] url::ParseError),
    #[error("base url cannot carry path segments")]
    CannotBeABase,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("store creation rejected with status {status}")]
    Rejected {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("unexpected response body: {0}")]
    UnexpectedBody(String),
}

impl StoreApiError {
    /// Message surfaced to the user after a failed creation.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Rejected {
                message: Some(message),
                ..
            } => message,
            _ => FALLBACK_ERROR_MESSAGE,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Url(_) | Self::CannotBeABase => "url",
            Self::Http(_) => "http",
            Self::Status { .. } => "status",
            Self::Rejected { .. } => "rejected",
            Self::UnexpectedBody(_) => "body",
        }
    }
}

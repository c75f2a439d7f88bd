use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Redirect, Response,
    },
    Form, Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};
use tracing::{debug, info, warn};

use storefront_core::{
    validation::{email_feedback, store_name_feedback, validate_email, validate_store_name},
    AvailabilitySnapshot, Category, Country, Currency, FormErrors, StoreDraft, SubmissionGate,
};

use crate::pages::{self, StoreFormView};
use crate::problem::ProblemResponse;
use crate::router::AppState;
use crate::session::FormSession;
use crate::theme::theme_from_headers;

const DOMAIN_EVENT: &str = "domain";
const CREATED_REDIRECT: &str = "/products?created=1";

/// Fields posted by the store creation form.
#[derive(Debug, Deserialize)]
pub struct StoreSubmission {
    #[serde(default)]
    session: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    category: Category,
    #[serde(default)]
    location: Country,
    #[serde(default)]
    currency: Currency,
}

impl StoreSubmission {
    fn into_parts(self) -> (Option<String>, StoreDraft) {
        let draft = StoreDraft {
            name: self.name,
            domain: self.domain,
            email: self.email,
            category: self.category,
            location: self.location,
            currency: self.currency,
        };
        (self.session, draft)
    }
}

#[derive(Debug, Deserialize)]
pub struct DomainInput {
    #[serde(default)]
    value: String,
    /// Client-side edit counter; older edits arriving late are dropped.
    #[serde(default)]
    edit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionOpened {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Blank store form; the session is opened by the first domain edit.
pub async fn new_form(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    Html(render_form(
        &state,
        &headers,
        None,
        &StoreDraft::default(),
        &FormErrors::default(),
        None,
    ))
}

pub async fn open_session(State(state): State<AppState>) -> (StatusCode, Json<SessionOpened>) {
    let session = state.sessions().create(state.now()).await;
    (
        StatusCode::CREATED,
        Json(SessionOpened {
            id: session.id().to_string(),
        }),
    )
}

pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(submission): Form<StoreSubmission>,
) -> Response {
    let (session_id, draft) = submission.into_parts();
    let session = state
        .sessions()
        .get_or_create(session_id.as_deref(), state.now())
        .await;

    // Invalid name or email blocks the submission before any domain lookup.
    let fields_valid =
        validate_store_name(&draft.name).is_ok() && validate_email(&draft.email).is_ok();
    let availability = if fields_valid {
        confirm_domain(&state, &session, &draft).await
    } else {
        session.snapshot()
    };
    let request = match SubmissionGate::evaluate(&draft, &availability) {
        Ok(request) => request,
        Err(errors) => {
            counter!("store_submissions_total", "result" => "invalid").increment(1);
            info!(stage = "store", session = session.id(), errors = %errors, "store submission rejected by validation");
            let html = render_form(&state, &headers, Some(&*session), &draft, &errors, None);
            return (StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response();
        }
    };

    match state.stores().create_store(&request).await {
        Ok(_) => {
            counter!("store_submissions_total", "result" => "created").increment(1);
            info!(stage = "store", domain = %request.domain, "store created");
            Redirect::to(CREATED_REDIRECT).into_response()
        }
        Err(err) => {
            counter!("store_submissions_total", "result" => err.kind()).increment(1);
            warn!(stage = "store", domain = %request.domain, error = %err, "store creation failed");
            let alert = format!("Error: {}", err.user_message());
            let html = render_form(
                &state,
                &headers,
                Some(&*session),
                &draft,
                &FormErrors::default(),
                Some(&alert),
            );
            (StatusCode::BAD_GATEWAY, Html(html)).into_response()
        }
    }
}

/// Feeds one keystroke of the domain field into the session's debouncer.
pub async fn push_domain(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<DomainInput>,
) -> Result<StatusCode, ProblemResponse> {
    let session = find_session(&state, &id).await?;
    session
        .push(input.value, input.edit)
        .await
        .map_err(|_| ProblemResponse::session_closed())?;
    Ok(StatusCode::ACCEPTED)
}

/// Streams availability snapshots of one session, starting with the current one.
pub async fn events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, serde_json::Error>>>, ProblemResponse> {
    let session = find_session(&state, &id).await?;
    debug!(stage = "session", session = %id, "availability stream opened");

    let stream = WatchStream::new(session.subscribe()).map(|snapshot| snapshot_event(&snapshot));
    let keep_alive = KeepAlive::new()
        .interval(state.sse_heartbeat())
        .text("heartbeat");
    Ok(Sse::new(stream).keep_alive(keep_alive))
}

/// Live field feedback; an empty or absent value carries no message.
pub async fn feedback(Json(request): Json<FeedbackRequest>) -> Json<FeedbackResponse> {
    Json(FeedbackResponse {
        name: request
            .name
            .as_deref()
            .and_then(store_name_feedback)
            .map(|err| err.to_string()),
        email: request
            .email
            .as_deref()
            .and_then(email_feedback)
            .map(|err| err.to_string()),
    })
}

/// Brings the session's availability up to date with the submitted domain.
async fn confirm_domain(
    state: &AppState,
    session: &FormSession,
    draft: &StoreDraft,
) -> AvailabilitySnapshot {
    if draft.domain.trim().is_empty() {
        return session.snapshot();
    }
    match session
        .settle_and_wait(&draft.domain, state.settle_timeout())
        .await
    {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(stage = "session", session = session.id(), error = %err, "could not confirm domain before submission");
            session.snapshot()
        }
    }
}

async fn find_session(state: &AppState, id: &str) -> Result<Arc<FormSession>, ProblemResponse> {
    state
        .sessions()
        .get(id, state.now())
        .await
        .ok_or_else(|| ProblemResponse::session_not_found(id))
}

fn snapshot_event(snapshot: &AvailabilitySnapshot) -> Result<Event, serde_json::Error> {
    let data = serde_json::to_string(snapshot)?;
    Ok(Event::default()
        .event(DOMAIN_EVENT)
        .id(snapshot.seq.to_string())
        .data(data))
}

fn render_form(
    state: &AppState,
    headers: &HeaderMap,
    session: Option<&FormSession>,
    draft: &StoreDraft,
    errors: &FormErrors,
    alert: Option<&str>,
) -> String {
    let availability = session.map(FormSession::snapshot).unwrap_or_default();
    pages::store_form_page(&StoreFormView {
        theme: theme_from_headers(headers),
        session_id: session.map(FormSession::id),
        draft,
        errors,
        availability: &availability,
        domain_suffix: state.domain_suffix(),
        alert,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::FakeLookup;
    use crate::router::{app_router, tests::{test_state, test_state_with}};
    use axum::{body::Body, http::{header, Request}};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;
    use storefront_core::{DomainStatus, LookupOutcome};
    use tokio::time;
    use tower::ServiceExt;
    use url::Url;

    fn form_body(name: &str, domain: &str, email: &str) -> String {
        serde_urlencoded::to_string([
            ("name", name),
            ("domain", domain),
            ("email", email),
            ("category", "Fashion"),
            ("location", "Bangladesh"),
            ("currency", "BDT"),
        ])
        .expect("urlencoded")
    }

    fn post_form(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/stores")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn store_state(server: &MockServer, lookup: FakeLookup) -> AppState {
        let catalog = Url::parse(&server.url("/api/")).expect("url");
        let stores = Url::parse(&server.url("/task/")).expect("url");
        test_state_with(catalog, stores, Arc::new(lookup))
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).expect("utf-8")
    }

    #[tokio::test]
    async fn new_form_does_not_open_a_session() {
        let state = test_state(Arc::new(FakeLookup::new()));
        let sessions = state.sessions().clone();
        let app = app_router(state);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Create a store"));
        assert!(html.contains(r#"data-session="""#));
        assert_eq!(sessions.len().await, 0);
    }

    #[tokio::test]
    async fn opening_a_session_registers_it() {
        let state = test_state(Arc::new(FakeLookup::new()));
        let sessions = state.sessions().clone();
        let app = app_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/stores/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let opened: SessionOpened = serde_json::from_slice(&bytes).expect("json");
        assert!(sessions.get(&opened.id, Utc::now()).await.is_some());
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn valid_submission_creates_store_and_redirects() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/task/stores/create")
                    .json_body_partial(r#"{"name":"My Shop","domain":"shop","country":"Bangladesh","currency":"BDT"}"#);
                then.status(200).json_body(json!({ "status": 200 }));
            })
            .await;
        let lookup = FakeLookup::new().respond("shop", LookupOutcome::Available, Duration::ZERO);
        let app = app_router(store_state(&server, lookup));

        let response = app
            .oneshot(post_form(form_body("My Shop", "shop", "owner@shop.com")))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            CREATED_REDIRECT
        );
        create.assert_async().await;
    }

    #[tokio::test]
    async fn plain_text_success_still_redirects() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/task/stores/create");
                then.status(201).body("Created");
            })
            .await;
        let lookup = FakeLookup::new().respond("shop", LookupOutcome::Available, Duration::ZERO);
        let app = app_router(store_state(&server, lookup));

        let response = app
            .oneshot(post_form(form_body("My Shop", "shop", "owner@shop.com")))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            CREATED_REDIRECT
        );
        assert_eq!(create.hits_async().await, 1);
    }

    #[tokio::test]
    async fn invalid_fields_skip_the_domain_lookup() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/task/stores/create");
                then.status(200);
            })
            .await;
        let lookup = FakeLookup::new().respond("shop", LookupOutcome::Available, Duration::ZERO);
        let app = app_router(store_state(&server, lookup.clone()));

        let response = app
            .oneshot(post_form(form_body("ab", "shop", "abc")))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains("Domain availability has not been confirmed yet."));
        assert_eq!(lookup.call_count(), 0);
        assert_eq!(create.hits_async().await, 0);
    }

    #[tokio::test]
    async fn invalid_fields_never_reach_the_store_api() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/task/stores/create");
                then.status(200);
            })
            .await;
        let lookup = FakeLookup::new().respond("shop", LookupOutcome::Available, Duration::ZERO);
        let app = app_router(store_state(&server, lookup));

        let response = app
            .oneshot(post_form(form_body("ab", "shop", "not-an-email")))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains("Store name must be at least 3 characters"));
        assert!(html.contains("Invalid email format"));
        assert!(html.contains(r#"value="ab""#));
        assert_eq!(create.hits_async().await, 0);
    }

    #[tokio::test]
    async fn taken_domain_blocks_submission() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/task/stores/create");
                then.status(200);
            })
            .await;
        let lookup = FakeLookup::new().respond("taken", LookupOutcome::Taken, Duration::ZERO);
        let app = app_router(store_state(&server, lookup));

        let response = app
            .oneshot(post_form(form_body("My Shop", "taken", "owner@shop.com")))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains("Not available. Please re-enter."));
        assert_eq!(create.hits_async().await, 0);
    }

    #[tokio::test]
    async fn empty_domain_is_reported() {
        let server = MockServer::start_async().await;
        let lookup = FakeLookup::new();
        let app = app_router(store_state(&server, lookup.clone()));

        let response = app
            .oneshot(post_form(form_body("My Shop", "  ", "owner@shop.com")))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response).await.contains("Domain cannot be empty."));
        assert_eq!(lookup.call_count(), 0);
    }

    #[tokio::test]
    async fn api_rejection_is_shown_as_alert() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/task/stores/create");
                then.status(400)
                    .json_body(json!({ "message": "Domain already exists" }));
            })
            .await;
        let lookup = FakeLookup::new().respond("shop", LookupOutcome::Available, Duration::ZERO);
        let app = app_router(store_state(&server, lookup));

        let response = app
            .oneshot(post_form(form_body("My Shop", "shop", "owner@shop.com")))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let html = body_text(response).await;
        assert!(html.contains("Error: Domain already exists"));
        assert!(html.contains(r#"value="My Shop""#));
    }

    #[tokio::test]
    async fn api_rejection_without_message_uses_fallback() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/task/stores/create");
                then.status(500).body("");
            })
            .await;
        let lookup = FakeLookup::new().respond("shop", LookupOutcome::Available, Duration::ZERO);
        let app = app_router(store_state(&server, lookup));

        let response = app
            .oneshot(post_form(form_body("My Shop", "shop", "owner@shop.com")))
            .await
            .expect("handler should respond");

        assert!(body_text(response).await.contains("Error: Unknown error"));
    }

    #[tokio::test]
    async fn pushed_domain_settles_after_quiet_period() {
        let lookup = FakeLookup::new().respond("shop", LookupOutcome::Available, Duration::ZERO);
        let state = test_state(Arc::new(lookup.clone()));
        let session = state.sessions().create(state.now()).await;
        let app = app_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/stores/sessions/{}/domain", session.id()))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"value":"shop","edit":1}"#))
                    .unwrap(),
            )
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let mut status = session.subscribe();
        time::timeout(
            Duration::from_secs(3),
            status.wait_for(|snapshot| snapshot.status == DomainStatus::Available),
        )
        .await
        .expect("lookup settled")
        .expect("session alive");
        assert_eq!(lookup.calls(), vec!["shop".to_string()]);
    }

    #[tokio::test]
    async fn unknown_session_is_a_problem() {
        let app = app_router(test_state(Arc::new(FakeLookup::new())));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/stores/sessions/missing/domain")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"value":"shop"}"#))
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
    }

    #[tokio::test]
    async fn event_stream_starts_with_current_snapshot() {
        let state = test_state(Arc::new(FakeLookup::new()));
        let session = state.sessions().create(state.now()).await;
        let app = app_router(state);

        let mut response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/stores/sessions/{}/events", session.id()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::OK);

        let frame = time::timeout(Duration::from_secs(1), response.body_mut().frame())
            .await
            .expect("stream produced chunk")
            .expect("chunk ok")
            .expect("chunk available");
        let data = match frame.into_data() {
            Ok(data) => data,
            Err(_) => panic!("expected data frame"),
        };
        let text = String::from_utf8(data.to_vec()).expect("utf-8");
        assert!(text.contains("event: domain"));
        assert!(text.contains(r#""status":"idle""#));
    }

    #[tokio::test]
    async fn feedback_reports_live_field_errors() {
        let app = app_router(test_state(Arc::new(FakeLookup::new())));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/stores/feedback")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"ab","email":""}"#))
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: FeedbackResponse = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(
            body,
            FeedbackResponse {
                name: Some("Store name must be at least 3 characters".into()),
                email: None,
            }
        );
    }
}

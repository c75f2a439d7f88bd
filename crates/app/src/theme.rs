use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::debug;
use url::Url;

use storefront_core::{theme::THEME_COOKIE, Theme};

const COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;

/// Reads the persisted theme from the request cookies.
pub fn theme_from_headers(headers: &HeaderMap) -> Theme {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(Theme::from_cookie_header)
        .find(|theme| *theme == Theme::Dark)
        .unwrap_or_default()
}

/// Flips the stored theme and sends the browser back to the page it came from.
pub async fn toggle(headers: HeaderMap) -> Response {
    let next = theme_from_headers(&headers).toggled();
    let cookie = format!(
        "{THEME_COOKIE}={}; Path=/; Max-Age={COOKIE_MAX_AGE_SECS}; SameSite=Lax",
        next.as_str()
    );
    let location = back_location(&headers);
    debug!(stage = "theme", theme = next.as_str(), %location, "theme toggled");

    (
        StatusCode::SEE_OTHER,
        [(header::SET_COOKIE, cookie), (header::LOCATION, location)],
    )
        .into_response()
}

/// Local path taken from the `Referer` header; never redirects off-site.
fn back_location(headers: &HeaderMap) -> String {
    let Some(referer) = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
    else {
        return "/".to_string();
    };

    if let Ok(url) = Url::parse(referer) {
        return match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };
    }

    if referer.starts_with('/') && !referer.starts_with("//") {
        referer.to_string()
    } else {
        "/".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::FakeLookup;
    use crate::router::{app_router, tests::test_state};
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), value.parse().unwrap());
        }
        map
    }

    #[test]
    fn reads_dark_theme_from_any_cookie_header() {
        let map = headers(&[
            (header::COOKIE, "session=abc"),
            (header::COOKIE, "theme=dark"),
        ]);
        assert_eq!(theme_from_headers(&map), Theme::Dark);
        assert_eq!(theme_from_headers(&HeaderMap::new()), Theme::Light);
    }

    #[test]
    fn back_location_stays_local() {
        let absolute = headers(&[(header::REFERER, "https://evil.example/products/p-1?x=1")]);
        assert_eq!(back_location(&absolute), "/products/p-1?x=1");

        let relative = headers(&[(header::REFERER, "/products")]);
        assert_eq!(back_location(&relative), "/products");

        let protocol_relative = headers(&[(header::REFERER, "//evil.example")]);
        assert_eq!(back_location(&protocol_relative), "/");
    }

    #[tokio::test]
    async fn toggle_sets_dark_cookie_by_default() {
        let app = app_router(test_state(Arc::new(FakeLookup::new())));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/theme")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(cookie.to_str().unwrap().starts_with("theme=dark;"));
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    }

    #[tokio::test]
    async fn toggle_from_dark_returns_to_referer() {
        let app = app_router(test_state(Arc::new(FakeLookup::new())));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/theme")
                    .header(header::COOKIE, "theme=dark")
                    .header(header::REFERER, "http://localhost:8080/products/p-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        let cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(cookie.to_str().unwrap().starts_with("theme=light;"));
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/products/p-1"
        );
    }

    #[tokio::test]
    async fn pages_render_with_persisted_theme() {
        let app = app_router(test_state(Arc::new(FakeLookup::new())));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/products")
                    .header(header::COOKIE, "theme=dark")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(bytes.to_vec()).expect("utf-8");
        assert!(html.contains(r#"<html lang="en" class="dark">"#));
        assert!(html.contains("🌙 Dark"));
    }
}

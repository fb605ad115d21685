//! Short-URL operations for the shortly SDK
//!
//! Thin helpers over the request client. Failures are contained here:
//! callers get sentinel values (`[]`, `None`, `false`) and the error is
//! logged, trading visibility for a simple calling surface.

use chrono::Utc;
use serde::Serialize;

use crate::client::{ApiClient, Body, RequestOptions};
use crate::error::Result;
use crate::model::{CreateUrlRequest, Payload, RedirectTarget, UrlAccessData, UrlItem, UrlStats};

/// Fallback routes for redirect resolution against the bare origin.
/// Two conventions exist across deployed backends; both are probed in
/// order and the first success wins.
const DIRECT_RESOLVE_ROUTES: [&str; 2] = ["/r/api/url/{code}", "/api/url/{code}"];

/// Fallback routes for access tracking against the bare origin
const DIRECT_TRACK_ROUTES: [&str; 4] = [
    "/r/api/urls/{code}/access",
    "/api/urls/{code}/access",
    "/r/api/url/{code}/access",
    "/api/url/{code}/access",
];

/// Accept only absolute http/https URLs
pub fn validate_url(candidate: &str) -> bool {
    match url::Url::parse(candidate) {
        Ok(parsed) => parsed.scheme() == "http" || parsed.scheme() == "https",
        Err(_) => false,
    }
}

/// Short-URL service over the request client
pub struct UrlService<'a> {
    client: &'a ApiClient,
}

impl<'a> UrlService<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// List the authenticated user's short URLs; empty on any failure
    pub async fn list(&self) -> Vec<UrlItem> {
        let result: Result<Payload<Vec<UrlItem>>> =
            self.client.get("/urls/", RequestOptions::default()).await;

        match result {
            Ok(payload) => payload.into_inner(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to list URLs");
                Vec::new()
            }
        }
    }

    /// Create a short URL for `original_url`; None on any failure,
    /// including a URL that fails validation before the network call
    pub async fn create(&self, original_url: &str) -> Option<UrlItem> {
        if !validate_url(original_url) {
            tracing::warn!(url = original_url, "rejected invalid URL");
            return None;
        }

        let request = CreateUrlRequest {
            original_url: original_url.to_string(),
        };
        let Some(body) = encode(&request) else {
            return None;
        };

        let result: Result<Payload<UrlItem>> = self
            .client
            .post("/urls/", Some(Body::Json(body)), RequestOptions::default())
            .await;

        match result {
            Ok(payload) => Some(payload.into_inner()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to create short URL");
                None
            }
        }
    }

    /// Delete a short URL by id; success is any non-error status
    pub async fn delete(&self, id: u64) -> bool {
        let endpoint = format!("/urls/{}", id);
        let result: Result<serde_json::Value> =
            self.client.delete(&endpoint, RequestOptions::default()).await;

        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, id, "failed to delete short URL");
                false
            }
        }
    }

    /// Resolve a short code to its original URL via the API base
    pub async fn resolve(&self, code: &str) -> Option<String> {
        let endpoint = format!("/r/url/{}", code);
        let result: Result<Payload<RedirectTarget>> =
            self.client.get(&endpoint, RequestOptions::default()).await;

        match result {
            Ok(payload) => Some(payload.into_inner().url),
            Err(e) => {
                tracing::warn!(error = %e, code, "failed to resolve short code");
                None
            }
        }
    }

    /// Resolve a short code against the bare origin, probing the known
    /// route conventions in order
    pub async fn resolve_direct(&self, code: &str) -> Option<String> {
        for route in DIRECT_RESOLVE_ROUTES {
            let Some(url) = self.origin_route(route, code) else {
                return None;
            };

            let result: Result<Payload<RedirectTarget>> = self
                .client
                .request_url(
                    reqwest::Method::GET,
                    &url,
                    None,
                    RequestOptions::default().header("Accept", "application/json"),
                )
                .await;

            match result {
                Ok(payload) => return Some(payload.into_inner().url),
                Err(e) => {
                    tracing::debug!(error = %e, route, "direct resolve route failed, trying next");
                }
            }
        }
        None
    }

    /// Fetch click statistics for a short code
    pub async fn stats(&self, code: &str) -> Option<UrlStats> {
        let endpoint = format!("/urls/{}/stats", code);
        let result: Result<Payload<UrlStats>> =
            self.client.get(&endpoint, RequestOptions::default()).await;

        match result {
            Ok(payload) => Some(payload.into_inner()),
            Err(e) => {
                tracing::warn!(error = %e, code, "failed to fetch URL stats");
                None
            }
        }
    }

    /// Record an access to a short code via the API base
    pub async fn track(&self, code: &str) -> bool {
        let endpoint = format!("/urls/{}/access", code);
        let Some(body) = self.access_body() else {
            return false;
        };

        let result: Result<serde_json::Value> = self
            .client
            .post(&endpoint, Some(Body::Json(body)), RequestOptions::default())
            .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, code, "failed to track URL access");
                false
            }
        }
    }

    /// Record an access against the bare origin, probing the known route
    /// conventions in order
    pub async fn track_direct(&self, code: &str) -> bool {
        let Some(body) = self.access_body() else {
            return false;
        };

        for route in DIRECT_TRACK_ROUTES {
            let Some(url) = self.origin_route(route, code) else {
                return false;
            };

            let result: Result<serde_json::Value> = self
                .client
                .request_url(
                    reqwest::Method::POST,
                    &url,
                    Some(Body::Json(body.clone())),
                    RequestOptions::default().header("Accept", "application/json"),
                )
                .await;

            match result {
                Ok(_) => return true,
                Err(e) => {
                    tracing::debug!(error = %e, route, "direct track route failed, trying next");
                }
            }
        }
        false
    }

    fn access_body(&self) -> Option<serde_json::Value> {
        encode(&UrlAccessData {
            timestamp: Utc::now().to_rfc3339(),
            user_agent: self.client.config().user_agent(),
            referer: None,
        })
    }

    fn origin_route(&self, route: &str, code: &str) -> Option<String> {
        let route = route.replace("{code}", code);
        match self.client.config().origin_url(&route) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, "cannot build origin URL");
                None
            }
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    match serde_json::to_value(value) {
        Ok(encoded) => Some(encoded),
        Err(e) => {
            tracing::warn!(error = %e, "cannot serialize request body");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::test_client;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_validate_url_accepts_http_and_https() {
        assert!(validate_url("https://example.com/path"));
        assert!(validate_url("http://example.com"));
    }

    #[test]
    fn test_validate_url_rejects_other_schemes() {
        assert!(!validate_url("ftp://x"));
        assert!(!validate_url("not-a-url"));
        assert!(!validate_url("javascript:alert(1)"));
        assert!(!validate_url(""));
    }

    #[tokio::test]
    async fn test_list_returns_items_from_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/urls/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": 1, "code": "abc", "original_url": "https://example.com",
                          "created_at": "2025-01-01T00:00:00Z"}]
            })))
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        let items = UrlService::new(&client).list().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].code, "abc");
    }

    #[tokio::test]
    async fn test_list_returns_empty_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/urls/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        assert!(UrlService::new(&client).list().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_posts_original_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/urls/"))
            .and(body_string_contains("original_url"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 9, "code": "xyz", "original_url": "https://example.com/a",
                "created_at": "2025-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        let created = UrlService::new(&client)
            .create("https://example.com/a")
            .await
            .unwrap();
        assert_eq!(created.code, "xyz");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_url_before_network() {
        // No mock mounted: a request would fail the test via None anyway,
        // but validation must short-circuit first.
        let server = MockServer::start().await;
        let (client, _dir) = test_client(&server.uri());
        let result = UrlService::new(&client).create("ftp://nope").await;
        assert!(result.is_none());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_returns_bool() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/urls/5"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        let service = UrlService::new(&client);
        assert!(service.delete(5).await);
        assert!(!service.delete(6).await);
    }

    #[tokio::test]
    async fn test_resolve_reads_bare_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/r/url/abc"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"url": "https://example.com"})),
            )
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        let resolved = UrlService::new(&client).resolve("abc").await;
        assert_eq!(resolved.as_deref(), Some("https://example.com"));
    }

    #[tokio::test]
    async fn test_resolve_direct_falls_through_to_second_route() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/api/url/abc"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/url/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"url": "https://example.com/landing"}
            })))
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        let resolved = UrlService::new(&client).resolve_direct("abc").await;
        assert_eq!(resolved.as_deref(), Some("https://example.com/landing"));
    }

    #[tokio::test]
    async fn test_resolve_direct_none_when_all_routes_fail() {
        let server = MockServer::start().await;
        let (client, _dir) = test_client(&server.uri());
        assert!(UrlService::new(&client).resolve_direct("abc").await.is_none());
    }

    #[tokio::test]
    async fn test_track_posts_access_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/urls/abc/access"))
            .and(body_string_contains("userAgent"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        assert!(UrlService::new(&client).track("abc").await);
    }

    #[tokio::test]
    async fn test_track_direct_short_circuits_on_first_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/r/api/urls/abc/access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        assert!(UrlService::new(&client).track_direct("abc").await);
        // Only the first candidate route should have been hit.
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_validate_never_panics(s in "\\PC*") {
                let _ = validate_url(&s);
            }

            #[test]
            fn test_https_urls_with_simple_hosts_accepted(host in "[a-z]{1,12}\\.[a-z]{2,4}") {
                let candidate = format!("https://{}", host);
                prop_assert!(validate_url(&candidate));
            }

            #[test]
            fn test_non_http_schemes_rejected(scheme in "[a-eg-z]{3,6}", host in "[a-z]{1,12}") {
                prop_assume!(scheme != "http" && scheme != "https");
                let candidate = format!("{}://{}", scheme, host);
                prop_assert!(!validate_url(&candidate));
            }
        }
    }
}

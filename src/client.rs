//! HTTP request client for the shortly SDK
//!
//! Issues exactly one HTTP request per call and returns parsed response
//! data. Malformed caller input is rejected up front as a validation
//! error; once a request is on the wire every failure surfaces as one of
//! two kinds: an API error carrying the response status and parsed body,
//! or a timeout.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{header, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Result, ShortlyError};
use crate::store::SessionStore;

/// Request payload shapes the client knows how to encode
#[derive(Debug, Clone)]
pub enum Body {
    /// Key-value payload, serialized per the effective content type
    /// (JSON by default, urlencoded when the caller declares a form)
    Json(Value),
    /// Form fields, always urlencoded
    Form(Vec<(String, String)>),
    /// Pre-encoded text, passed through as-is
    Raw(String),
    /// Opaque bytes, passed through unmodified with no implied content type
    Bytes(Vec<u8>),
}

/// Per-request configuration
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Deadline in milliseconds; falls back to the configured global timeout
    pub timeout: Option<u64>,
    /// Query-string parameters, URL-encoded and appended
    pub params: Vec<(String, String)>,
    /// Extra headers, merged over the computed defaults (caller wins)
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn timeout(mut self, millis: u64) -> Self {
        self.timeout = Some(millis);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Stateless request client. Reads (never writes) the session store to
/// attach the current bearer token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: Config,
    store: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(config: Config, store: Arc<SessionStore>) -> Result<Self> {
        // Deadlines are enforced per request, not on the client builder.
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            config,
            store,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    // --- verb helpers ---

    pub async fn get<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<R> {
        self.request(Method::GET, endpoint, None, options).await
    }

    pub async fn post<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<Body>,
        options: RequestOptions,
    ) -> Result<R> {
        self.request(Method::POST, endpoint, body, options).await
    }

    pub async fn put<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<Body>,
        options: RequestOptions,
    ) -> Result<R> {
        self.request(Method::PUT, endpoint, body, options).await
    }

    pub async fn patch<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<Body>,
        options: RequestOptions,
    ) -> Result<R> {
        self.request(Method::PATCH, endpoint, body, options).await
    }

    pub async fn delete<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<R> {
        self.request(Method::DELETE, endpoint, None, options).await
    }

    /// Issue one request against the configured API base
    pub async fn request<R: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Body>,
        options: RequestOptions,
    ) -> Result<R> {
        let url = self.config.api_url(endpoint);
        self.request_url(method, &url, body, options).await
    }

    /// Issue one request against an absolute URL. Used by the fallback
    /// probes that bypass the API base.
    pub async fn request_url<R: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<Body>,
        options: RequestOptions,
    ) -> Result<R> {
        let deadline = Duration::from_millis(options.timeout.unwrap_or(self.config.timeout));

        tracing::debug!(%method, url, "issuing API request");

        let mut builder = self.http.request(method, url);

        if !options.params.is_empty() {
            builder = builder.query(&options.params);
        }

        // Default headers: bearer token when a session is present.
        if let Some(token) = self.store.token() {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        builder = self.encode_body(builder, body, &options)?;

        // Caller headers merged last; each name replaces any default
        // already set for it instead of adding a second value.
        if !options.headers.is_empty() {
            builder = builder.headers(Self::caller_headers(&options.headers)?);
        }

        // Race the send against the deadline; the elapsed timer drops the
        // in-flight request.
        let response = match tokio::time::timeout(deadline, builder.send()).await {
            Ok(result) => result?,
            Err(_) => return Err(ShortlyError::Timeout),
        };

        let status = response.status();
        let content_length = response.content_length();
        tracing::debug!(status = status.as_u16(), url, "API response received");

        if !status.is_success() {
            return Err(Self::error_from_response(status, response).await);
        }

        if status == StatusCode::NO_CONTENT || content_length == Some(0) {
            return Self::empty_result();
        }

        let text = response.text().await?;
        if text.is_empty() {
            return Self::empty_result();
        }

        serde_json::from_str(&text)
            .map_err(|e| ShortlyError::api(500, format!("Failed to parse response: {}", e)))
    }

    /// Parse caller-supplied header pairs into a map. `RequestBuilder::headers`
    /// replaces existing values per name, which is what gives the caller
    /// precedence over the computed defaults.
    fn caller_headers(pairs: &[(String, String)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            let parsed_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ShortlyError::validation(format!("Invalid header name '{}': {}", name, e))
            })?;
            let parsed_value = HeaderValue::from_str(value).map_err(|e| {
                ShortlyError::validation(format!("Invalid value for header '{}': {}", name, e))
            })?;
            headers.insert(parsed_name, parsed_value);
        }
        Ok(headers)
    }

    /// Serialize the body per the effective content type (JSON when
    /// nothing else is declared)
    fn encode_body(
        &self,
        mut builder: reqwest::RequestBuilder,
        body: Option<Body>,
        options: &RequestOptions,
    ) -> Result<reqwest::RequestBuilder> {
        let declared_content_type = options
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.clone());

        let wants_form = declared_content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/x-www-form-urlencoded"));

        match body {
            Some(Body::Form(pairs)) => {
                builder = builder.form(&pairs);
            }
            Some(Body::Json(value)) => {
                if wants_form {
                    if let Some(map) = value.as_object() {
                        let pairs: Vec<(String, String)> = map
                            .iter()
                            .map(|(k, v)| (k.clone(), json_value_to_string(v)))
                            .collect();
                        builder = builder.form(&pairs);
                    } else {
                        builder = builder.body(value.to_string());
                    }
                } else {
                    builder = builder.json(&value);
                }
            }
            Some(Body::Raw(text)) => {
                if declared_content_type.is_none() {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                }
                builder = builder.body(text);
            }
            Some(Body::Bytes(bytes)) => {
                builder = builder.body(bytes);
            }
            None => {}
        }

        Ok(builder)
    }

    /// Translate a non-success response into an API error carrying the
    /// parsed body (or a synthesized `{ "message": <status text> }`)
    async fn error_from_response(status: StatusCode, response: reqwest::Response) -> ShortlyError {
        let text = response.text().await.unwrap_or_default();

        let data = match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            // Some backends reply with a bare list of validation errors;
            // keep it rather than dropping it.
            Ok(value) if !value.is_null() => {
                let mut map = Map::new();
                map.insert("errors".to_string(), value);
                map
            }
            _ => {
                let mut map = Map::new();
                map.insert(
                    "message".to_string(),
                    Value::String(status.canonical_reason().unwrap_or("Unknown error").to_string()),
                );
                map
            }
        };

        let message = data
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Error {}", status.as_u16()));

        ShortlyError::api_with_data(status.as_u16(), message, data)
    }

    /// Empty-body successes decode the target type from `{}`
    fn empty_result<R: DeserializeOwned>() -> Result<R> {
        serde_json::from_value(Value::Object(Map::new()))
            .map_err(|e| ShortlyError::api(500, format!("Failed to parse empty response: {}", e)))
    }
}

fn json_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::{test_client, test_client_with_token};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_returns_parsed_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/urls/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        let result: Value = client.get("/urls/", RequestOptions::default()).await.unwrap();
        assert_eq!(result["id"], 1);
    }

    #[tokio::test]
    async fn test_bearer_header_attached_when_token_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/me"))
            .and(header("authorization", "Bearer tok-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let (client, _dir) = test_client_with_token(&server.uri(), "tok-abc");
        let result: Value = client
            .get("/users/me", RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(result["ok"], true);
    }

    #[tokio::test]
    async fn test_caller_headers_replace_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let (client, _dir) = test_client_with_token(&server.uri(), "stored-token");
        let options = RequestOptions::default().header("Authorization", "Bearer override");
        let result: Result<Value> = client.get("/users/me", options).await;
        assert!(result.is_ok());

        // Exactly one value on the wire: the caller's header replaced the
        // stored-token default instead of being appended next to it.
        let requests = server.received_requests().await.unwrap();
        let auth: Vec<String> = requests[0]
            .headers
            .get_all("authorization")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(auth, vec!["Bearer override"]);
    }

    #[tokio::test]
    async fn test_invalid_caller_header_is_rejected() {
        // Nothing listens on this port; the request must fail before it
        // is ever sent.
        let (client, _dir) = test_client("http://127.0.0.1:9");
        let options = RequestOptions::default().header("bad header", "x");
        let err = client.get::<Value>("/urls/", options).await.unwrap_err();
        assert!(err.to_string().contains("Invalid header name"));
    }

    #[tokio::test]
    async fn test_query_params_are_appended() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/urls/"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        let options = RequestOptions::default().param("page", "2");
        let result: Result<Value> = client.get("/urls/", options).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_form_body_is_urlencoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/users/login"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("username=ada"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        let body = Body::Form(vec![
            ("grant_type".to_string(), "password".to_string()),
            ("username".to_string(), "ada".to_string()),
            ("password".to_string(), "pw".to_string()),
        ]);
        let result: Result<Value> = client
            .post("/users/login", Some(body), RequestOptions::default())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_json_object_encoded_as_form_when_declared() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/users/login"))
            .and(body_string_contains("grant_type=password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        let options = RequestOptions::default()
            .header("Content-Type", "application/x-www-form-urlencoded");
        let body = Body::Json(json!({"grant_type": "password", "username": "u", "password": "p"}));
        let result: Result<Value> = client.post("/users/login", Some(body), options).await;
        assert!(result.is_ok());

        // The declared content type must not be duplicated by the form
        // encoder's own header.
        let requests = server.received_requests().await.unwrap();
        let content_types: Vec<String> = requests[0]
            .headers
            .get_all("content-type")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(content_types, vec!["application/x-www-form-urlencoded"]);
    }

    #[tokio::test]
    async fn test_non_success_status_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/urls/"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({"message": "bad payload"})),
            )
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        let err = client
            .get::<Value>("/urls/", RequestOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(422));
        assert!(err.to_string().contains("bad payload"));
        assert_eq!(
            err.data().and_then(|d| d.get("message")),
            Some(&json!("bad payload"))
        );
    }

    #[tokio::test]
    async fn test_non_object_error_body_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/urls/"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!([
                {"field": "original_url", "error": "too long"}
            ])))
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        let err = client
            .post::<Value>("/urls/", None, RequestOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(422));
        assert_eq!(
            err.data().and_then(|d| d.get("errors")),
            Some(&json!([{"field": "original_url", "error": "too long"}]))
        );
        assert!(err.to_string().contains("Error 422"));
    }

    #[tokio::test]
    async fn test_unparseable_error_body_falls_back_to_status_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/urls/"))
            .respond_with(ResponseTemplate::new(400).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        let err = client
            .get::<Value>("/urls/", RequestOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert_eq!(
            err.data().and_then(|d| d.get("message")),
            Some(&json!("Bad Request"))
        );
    }

    #[tokio::test]
    async fn test_timeout_fails_with_timeout_error_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        let options = RequestOptions::default().timeout(50);
        let err = client.get::<Value>("/slow", options).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.status(), Some(408));
    }

    #[tokio::test]
    async fn test_no_content_yields_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/urls/3"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let (client, _dir) = test_client(&server.uri());
        let result: Value = client
            .delete("/urls/3", RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(result, json!({}));
    }

    #[tokio::test]
    async fn test_connection_failure_becomes_api_500() {
        // Nothing listens on this port.
        let (client, _dir) = test_client("http://127.0.0.1:9");
        let err = client
            .get::<Value>("/urls/", RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_timeout());
    }
}

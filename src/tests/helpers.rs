//! Shared fixtures for the unit tests

use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::ApiClient;
use crate::config::Config;
use crate::store::SessionStore;

/// Client pointed at a mock server, with a fresh session store in a
/// temporary directory. The directory guard must outlive the client.
pub fn test_client(uri: &str) -> (ApiClient, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        base_url: uri.to_string(),
        storage_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    let store = Arc::new(SessionStore::new(config.session_path()).unwrap());
    let client = ApiClient::new(config, store).unwrap();
    (client, dir)
}

/// Same as [`test_client`] but with a bearer token already stored
pub fn test_client_with_token(uri: &str, token: &str) -> (ApiClient, TempDir) {
    let (client, dir) = test_client(uri);
    client.store().set_token(token).unwrap();
    (client, dir)
}

/// Mount a successful password-grant login response
pub async fn mock_login_success(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/api/v1/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "bearer",
        })))
        .mount(server)
        .await;
}

/// Mount a current-user response
pub async fn mock_me(server: &MockServer, id: u64, username: &str, role: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "username": username,
            "role": role,
        })))
        .mount(server)
        .await;
}

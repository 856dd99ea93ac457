//! Client for the admin REST API.
//!
//! [`AdminApi`] is the seam the console talks to; [`HttpAdminApi`] is the
//! reqwest implementation. Authenticated calls take the bearer credential
//! from the injected [`Session`] at request time.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::message::{Message, MessageId};
use crate::session::{Credential, Session};
use crate::summary::Summary;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// Credential missing or rejected with 401.
    #[error("unauthorized")]
    Unauthorized,

    #[error("network: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("decode: {0}")]
    Decode(String),

    /// Field errors reported by the contact endpoint, verbatim.
    #[error("{0}")]
    Validation(String),

    #[error("login rejected: {0}")]
    LoginRejected(String),

    #[error("config: {0}")]
    Config(String),
}

#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<Credential, ApiError>;
    async fn dashboard(&self) -> Result<Summary, ApiError>;
    async fn list_messages(&self) -> Result<Vec<Message>, ApiError>;
    async fn set_read(&self, id: &MessageId, read: bool) -> Result<(), ApiError>;
    async fn bulk_delete(&self, ids: &[MessageId]) -> Result<(), ApiError>;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: Credential,
}

#[derive(Serialize)]
struct ReadUpdate {
    read: bool,
}

#[derive(Serialize)]
struct BulkDeleteRequest<'a> {
    message_ids: &'a [MessageId],
}

pub struct HttpAdminApi {
    http: reqwest::Client,
    base_url: Url,
    session: Session,
}

impl HttpAdminApi {
    pub fn new(config: &ApiConfig, session: Session) -> Result<Self, ApiError> {
        Ok(Self {
            http: build_http_client(config)?,
            base_url: parse_base_url(&config.base_url)?,
            session,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        endpoint(&self.base_url, segments)
    }

    fn authed(&self, builder: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let credential = self.session.get().ok_or(ApiError::Unauthorized)?;
        Ok(builder.bearer_auth(credential.as_str()))
    }

    /// Send an authenticated request and map non-2xx statuses to errors.
    async fn send_authed(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = send(self.authed(builder)?).await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            debug!("server rejected credential");
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl AdminApi for HttpAdminApi {
    async fn login(&self, email: &str, password: &str) -> Result<Credential, ApiError> {
        let url = self.endpoint(&["api", "admin", "login"])?;
        let response = send(self.http.post(url).json(&LoginRequest { email, password })).await?;
        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::LoginRejected(error_message(&body)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("login response: {}", e)))?;
        debug!("login accepted");
        Ok(body.access_token)
    }

    async fn dashboard(&self) -> Result<Summary, ApiError> {
        let url = self.endpoint(&["api", "admin", "dashboard"])?;
        let response = self.send_authed(self.http.get(url)).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("dashboard: {}", e)))
    }

    async fn list_messages(&self) -> Result<Vec<Message>, ApiError> {
        let url = self.endpoint(&["api", "admin", "messages"])?;
        let response = self.send_authed(self.http.get(url)).await?;
        let payload: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("messages: {}", e)))?;
        if !payload.is_array() {
            warn!("message list was not an array; treating as empty");
            return Ok(Vec::new());
        }
        serde_json::from_value(payload).map_err(|e| ApiError::Decode(format!("messages: {}", e)))
    }

    async fn set_read(&self, id: &MessageId, read: bool) -> Result<(), ApiError> {
        let id = id.to_string();
        let url = self.endpoint(&["api", "admin", "messages", &id])?;
        self.send_authed(self.http.put(url).json(&ReadUpdate { read }))
            .await?;
        debug!(id = %id, read, "updated read state");
        Ok(())
    }

    async fn bulk_delete(&self, ids: &[MessageId]) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "admin", "messages", "bulk-delete"])?;
        self.send_authed(self.http.post(url).json(&BulkDeleteRequest { message_ids: ids }))
            .await?;
        debug!(count = ids.len(), "bulk delete accepted");
        Ok(())
    }
}

pub(crate) fn build_http_client(config: &ApiConfig) -> Result<reqwest::Client, ApiError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {}", e)))
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ApiError::Config(format!("invalid API base URL {:?}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(ApiError::Config(format!("API base URL {:?} cannot carry a path", raw)));
    }
    Ok(url)
}

/// Append path segments to `base`, escaping each one.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::Config(format!("API base URL {} cannot carry a path", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) async fn send(builder: RequestBuilder) -> Result<Response, ApiError> {
    builder.send().await.map_err(|e| ApiError::Network(e.to_string()))
}

/// Pull `error` out of a `{"error": "..."}` body, else return the body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

// ---------------------------------------------------------------------------
// In-memory server double for controller tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod stub {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Endpoint {
        Login,
        Dashboard,
        List,
        SetRead,
        BulkDelete,
    }

    #[derive(Default)]
    struct State {
        messages: Vec<Message>,
        failures: HashMap<Endpoint, ApiError>,
        calls: HashMap<Endpoint, usize>,
        bulk_requests: Vec<Vec<MessageId>>,
        read_requests: Vec<(MessageId, bool)>,
    }

    /// Behaves like the real backend over an in-memory collection.
    #[derive(Default)]
    pub struct StubApi {
        state: Mutex<State>,
    }

    impl StubApi {
        pub fn with_messages(messages: Vec<Message>) -> Self {
            let stub = Self::default();
            stub.state.lock().unwrap().messages = messages;
            stub
        }

        pub fn fail(&self, endpoint: Endpoint, error: ApiError) {
            self.state.lock().unwrap().failures.insert(endpoint, error);
        }

        pub fn heal(&self, endpoint: Endpoint) {
            self.state.lock().unwrap().failures.remove(&endpoint);
        }

        pub fn calls(&self, endpoint: Endpoint) -> usize {
            self.state
                .lock()
                .unwrap()
                .calls
                .get(&endpoint)
                .copied()
                .unwrap_or(0)
        }

        pub fn total_calls(&self) -> usize {
            self.state.lock().unwrap().calls.values().sum()
        }

        pub fn bulk_requests(&self) -> Vec<Vec<MessageId>> {
            self.state.lock().unwrap().bulk_requests.clone()
        }

        pub fn read_requests(&self) -> Vec<(MessageId, bool)> {
            self.state.lock().unwrap().read_requests.clone()
        }

        /// A submission arriving from outside the console.
        pub fn push_external(&self, message: Message) {
            self.state.lock().unwrap().messages.push(message);
        }

        fn enter(&self, endpoint: Endpoint) -> Result<std::sync::MutexGuard<'_, State>, ApiError> {
            let mut state = self.state.lock().unwrap();
            *state.calls.entry(endpoint).or_insert(0) += 1;
            if let Some(err) = state.failures.get(&endpoint) {
                return Err(err.clone());
            }
            Ok(state)
        }
    }

    #[async_trait]
    impl AdminApi for StubApi {
        async fn login(&self, email: &str, password: &str) -> Result<Credential, ApiError> {
            self.enter(Endpoint::Login)?;
            if email == "admin@example.com" && password == "hunter2" {
                Ok(Credential::new("stub-token"))
            } else {
                Err(ApiError::LoginRejected("Invalid credentials".into()))
            }
        }

        async fn dashboard(&self) -> Result<Summary, ApiError> {
            let state = self.enter(Endpoint::Dashboard)?;
            Ok(Summary {
                total_messages: state.messages.len() as u64,
                unread_messages: state.messages.iter().filter(|m| !m.read).count() as u64,
                latest_message: state.messages.iter().max_by_key(|m| m.created_at).cloned(),
            })
        }

        async fn list_messages(&self) -> Result<Vec<Message>, ApiError> {
            let state = self.enter(Endpoint::List)?;
            Ok(state.messages.clone())
        }

        async fn set_read(&self, id: &MessageId, read: bool) -> Result<(), ApiError> {
            let mut state = self.enter(Endpoint::SetRead)?;
            state.read_requests.push((id.clone(), read));
            match state.messages.iter_mut().find(|m| &m.id == id) {
                Some(m) => {
                    m.read = read;
                    Ok(())
                }
                None => Err(ApiError::Server {
                    status: 404,
                    message: "Message not found".into(),
                }),
            }
        }

        async fn bulk_delete(&self, ids: &[MessageId]) -> Result<(), ApiError> {
            let mut state = self.enter(Endpoint::BulkDelete)?;
            state.bulk_requests.push(ids.to_vec());
            let before = state.messages.len();
            state.messages.retain(|m| !ids.contains(&m.id));
            if state.messages.len() == before {
                return Err(ApiError::Server {
                    status: 404,
                    message: "No messages were deleted".into(),
                });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;
    use crate::message::make_message;

    #[derive(Clone, Default)]
    struct MockState {
        auth_headers: Arc<Mutex<Vec<String>>>,
        read_bodies: Arc<Mutex<Vec<(String, Value)>>>,
        delete_bodies: Arc<Mutex<Vec<Value>>>,
        list_body: Arc<Mutex<Option<Value>>>,
    }

    fn check_token(state: &MockState, headers: &HeaderMap) -> Result<(), (AxumStatus, Json<Value>)> {
        let header = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        state.auth_headers.lock().expect("auth lock").push(header.clone());
        if header == "Bearer good-token" {
            Ok(())
        } else {
            Err((AxumStatus::UNAUTHORIZED, Json(json!({"error": "Invalid token"}))))
        }
    }

    async fn login(Json(body): Json<Value>) -> (AxumStatus, Json<Value>) {
        if body["email"] == "admin@example.com" && body["password"] == "pw" {
            (AxumStatus::OK, Json(json!({"access_token": "good-token"})))
        } else {
            (AxumStatus::UNAUTHORIZED, Json(json!({"error": "Invalid credentials"})))
        }
    }

    async fn dashboard(
        State(state): State<MockState>,
        headers: HeaderMap,
    ) -> Result<Json<Value>, (AxumStatus, Json<Value>)> {
        check_token(&state, &headers)?;
        Ok(Json(json!({
            "total_messages": 2,
            "unread_messages": 1,
            "latest_message": null
        })))
    }

    async fn messages(
        State(state): State<MockState>,
        headers: HeaderMap,
    ) -> Result<Json<Value>, (AxumStatus, Json<Value>)> {
        check_token(&state, &headers)?;
        let body = state.list_body.lock().expect("list lock").clone();
        Ok(Json(body.unwrap_or_else(|| {
            serde_json::to_value(vec![
                make_message(1, "Ada", "hello", false),
                make_message(2, "Bob", "hi", true),
            ])
            .expect("serialize messages")
        })))
    }

    async fn update(
        State(state): State<MockState>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, (AxumStatus, Json<Value>)> {
        check_token(&state, &headers)?;
        if id == "404" {
            return Err((AxumStatus::NOT_FOUND, Json(json!({"error": "Message not found"}))));
        }
        state.read_bodies.lock().expect("read lock").push((id, body.clone()));
        Ok(Json(body))
    }

    async fn bulk_delete(
        State(state): State<MockState>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, (AxumStatus, Json<Value>)> {
        check_token(&state, &headers)?;
        state.delete_bodies.lock().expect("delete lock").push(body);
        Ok(Json(json!({"message": "Messages deleted successfully"})))
    }

    async fn spawn_mock_server() -> (String, MockState) {
        let state = MockState::default();
        let app = Router::new()
            .route("/api/admin/login", post(login))
            .route("/api/admin/dashboard", get(dashboard))
            .route("/api/admin/messages", get(messages))
            .route("/api/admin/messages/bulk-delete", post(bulk_delete))
            .route("/api/admin/messages/{id}", put(update))
            .with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server listener");
        let address: SocketAddr = listener.local_addr().expect("mock listener local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("run mock server");
        });
        (format!("http://{}", address), state)
    }

    fn client(base_url: &str, token: Option<&str>) -> (HttpAdminApi, Session) {
        let session = Session::in_memory();
        if let Some(token) = token {
            session.set(Credential::new(token));
        }
        let config = ApiConfig {
            base_url: base_url.to_string(),
            timeout_secs: Some(5),
        };
        (HttpAdminApi::new(&config, session.clone()).unwrap(), session)
    }

    #[test]
    fn endpoint_joins_segments_under_base_path() {
        let base = parse_base_url("http://host:5000/console/").unwrap();
        let url = endpoint(&base, &["api", "admin", "messages", "a b"]).unwrap();
        assert_eq!(url.as_str(), "http://host:5000/console/api/admin/messages/a%20b");

        let bare = parse_base_url("http://host:5000").unwrap();
        let url = endpoint(&bare, &["api", "admin", "dashboard"]).unwrap();
        assert_eq!(url.as_str(), "http://host:5000/api/admin/dashboard");
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        assert!(matches!(parse_base_url("not a url"), Err(ApiError::Config(_))));
    }

    #[test]
    fn error_message_unwraps_json() {
        assert_eq!(error_message(r#"{"error": "name is required"}"#), "name is required");
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[tokio::test]
    async fn login_returns_credential() {
        let (url, _) = spawn_mock_server().await;
        let (api, _) = client(&url, None);
        let cred = api.login("admin@example.com", "pw").await.unwrap();
        assert_eq!(cred.as_str(), "good-token");
    }

    #[tokio::test]
    async fn login_rejection_carries_server_message() {
        let (url, _) = spawn_mock_server().await;
        let (api, _) = client(&url, None);
        let err = api.login("admin@example.com", "nope").await.unwrap_err();
        assert_eq!(err, ApiError::LoginRejected("Invalid credentials".into()));
    }

    #[tokio::test]
    async fn attaches_bearer_token() {
        let (url, state) = spawn_mock_server().await;
        let (api, _) = client(&url, Some("good-token"));
        let summary = api.dashboard().await.unwrap();
        assert_eq!(summary.total_messages, 2);
        assert_eq!(summary.unread_messages, 1);
        assert!(summary.latest_message.is_none());
        assert_eq!(
            state.auth_headers.lock().unwrap().clone(),
            vec!["Bearer good-token".to_string()]
        );
    }

    #[tokio::test]
    async fn rejected_token_maps_to_unauthorized() {
        let (url, _) = spawn_mock_server().await;
        let (api, _) = client(&url, Some("expired"));
        assert_eq!(api.dashboard().await.unwrap_err(), ApiError::Unauthorized);
        assert_eq!(api.list_messages().await.unwrap_err(), ApiError::Unauthorized);
        assert_eq!(
            api.set_read(&MessageId::Number(1), true).await.unwrap_err(),
            ApiError::Unauthorized
        );
        assert_eq!(
            api.bulk_delete(&[MessageId::Number(1)]).await.unwrap_err(),
            ApiError::Unauthorized
        );
    }

    #[tokio::test]
    async fn missing_credential_never_reaches_the_server() {
        let (url, state) = spawn_mock_server().await;
        let (api, _) = client(&url, None);
        assert_eq!(api.list_messages().await.unwrap_err(), ApiError::Unauthorized);
        assert!(state.auth_headers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn lists_messages_in_server_order() {
        let (url, _) = spawn_mock_server().await;
        let (api, _) = client(&url, Some("good-token"));
        let messages = api.list_messages().await.unwrap();
        let ids: Vec<_> = messages.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec![MessageId::Number(1), MessageId::Number(2)]);
    }

    #[tokio::test]
    async fn non_array_list_body_is_empty() {
        let (url, state) = spawn_mock_server().await;
        *state.list_body.lock().unwrap() = Some(json!({"error": "oops"}));
        let (api, _) = client(&url, Some("good-token"));
        assert!(api.list_messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_read_sends_flag_and_maps_404() {
        let (url, state) = spawn_mock_server().await;
        let (api, _) = client(&url, Some("good-token"));
        api.set_read(&MessageId::Number(7), true).await.unwrap();
        let bodies = state.read_bodies.lock().unwrap().clone();
        assert_eq!(bodies, vec![("7".to_string(), json!({"read": true}))]);

        let err = api.set_read(&MessageId::Number(404), false).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 404,
                message: "Message not found".into()
            }
        );
    }

    #[tokio::test]
    async fn bulk_delete_sends_all_ids() {
        let (url, state) = spawn_mock_server().await;
        let (api, _) = client(&url, Some("good-token"));
        api.bulk_delete(&[MessageId::Number(1), MessageId::from("x")])
            .await
            .unwrap();
        let bodies = state.delete_bodies.lock().unwrap().clone();
        assert_eq!(bodies, vec![json!({"message_ids": [1, "x"]})]);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);
        let (api, _) = client(&format!("http://{}", address), Some("good-token"));
        assert!(matches!(api.list_messages().await, Err(ApiError::Network(_))));
    }
}

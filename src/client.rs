use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};
use url::Url;

use crate::endpoints;
use crate::error::{HelpdeskError, Result};
use crate::session::SessionStore;

/// A file carried inside a multipart ticket-creation form. Bytes are held
/// in memory so the request can be rebuilt for the post-refresh retry.
#[derive(Clone, Debug)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    },
}

/// A rebuildable description of one backend call. `path` is relative to
/// the API base URL and never starts with a slash.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub bearer: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<Value> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Transport seam so the gateway's auth behavior is testable without a
/// live backend.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

pub struct ReqwestTransport {
    http: Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url> {
        let raw = format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), request.path);
        Url::parse(&raw).map_err(|_| HelpdeskError::InvalidApiUrl(raw))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(request)?;
        let mut builder = self.http.request(request.method.clone(), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = request.bearer.as_deref() {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart { fields, files } => {
                let mut form = Form::new();
                for (key, value) in fields {
                    form = form.text(key.clone(), value.clone());
                }
                for file in files {
                    let mut part =
                        Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
                    if let Some(mime) = file.mime_type.as_deref() {
                        if let Ok(with_mime) = part.mime_str(mime) {
                            part = with_mime;
                        } else {
                            part = Part::bytes(file.bytes.clone())
                                .file_name(file.file_name.clone());
                        }
                    }
                    form = form.part(file.field.clone(), part);
                }
                builder.multipart(form)
            }
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response body>".to_string());

        Ok(ApiResponse { status, body })
    }
}

/// REST gateway. Attaches the bearer token to every call and recovers
/// transparently from a 401 by refreshing the token once, with all
/// concurrent 401s sharing a single refresh exchange.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn HttpTransport>,
    session: SessionStore,
    // Some(sender) while a refresh is in flight; late 401s subscribe and
    // wait instead of starting their own exchange.
    refresh_inflight: Mutex<Option<broadcast::Sender<Option<String>>>>,
}

impl ApiClient {
    pub fn new(base_url: Url, session: SessionStore) -> Self {
        Self::with_transport(Arc::new(ReqwestTransport::new(base_url)), session)
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>, session: SessionStore) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                session,
                refresh_inflight: Mutex::new(None),
            }),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    pub async fn get_json(&self, path: impl Into<String>) -> Result<Value> {
        self.get_json_with_query(path, Vec::new()).await
    }

    pub async fn get_json_with_query(
        &self,
        path: impl Into<String>,
        query: Vec<(String, String)>,
    ) -> Result<Value> {
        let response = self
            .send(Method::GET, path.into(), query, RequestBody::Empty)
            .await?;
        response.json()
    }

    pub async fn post_json(&self, path: impl Into<String>, body: Value) -> Result<Value> {
        let response = self
            .send(Method::POST, path.into(), Vec::new(), RequestBody::Json(body))
            .await?;
        response.json()
    }

    pub async fn post_multipart(
        &self,
        path: impl Into<String>,
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    ) -> Result<Value> {
        let response = self
            .send(
                Method::POST,
                path.into(),
                Vec::new(),
                RequestBody::Multipart { fields, files },
            )
            .await?;
        response.json()
    }

    /// PUT with no body; success is reported as a boolean.
    pub async fn put_confirm(&self, path: impl Into<String>) -> Result<bool> {
        let response = self
            .send(Method::PUT, path.into(), Vec::new(), RequestBody::Empty)
            .await?;
        Ok(response.is_success())
    }

    async fn send(
        &self,
        method: Method,
        path: String,
        query: Vec<(String, String)>,
        body: RequestBody,
    ) -> Result<ApiResponse> {
        let mut request = ApiRequest {
            method,
            path,
            query,
            body,
            bearer: self.inner.session.access_token(),
        };

        let response = self.inner.transport.execute(&request).await?;

        if response.status == 401 && !endpoints::is_authentication_path(&request.path) {
            debug!(path = %request.path, "request rejected with 401, joining token refresh");
            if let Some(token) = self.refresh_access_token().await {
                request.bearer = Some(token);
                let retried = self.inner.transport.execute(&request).await?;
                return check(retried);
            }
            // Refresh failed; surface the original authorization error.
            return check(response);
        }

        check(response)
    }

    /// Single-flight token refresh. The first caller performs the
    /// exchange; everyone arriving while it is in flight awaits the same
    /// outcome. On failure the session is cleared.
    async fn refresh_access_token(&self) -> Option<String> {
        let mut receiver = {
            let mut guard = self.inner.refresh_inflight.lock().await;
            match guard.as_ref() {
                Some(sender) => sender.subscribe(),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    *guard = Some(sender);
                    drop(guard);

                    let token = self.perform_refresh().await;

                    let mut guard = self.inner.refresh_inflight.lock().await;
                    if let Some(sender) = guard.take() {
                        let _ = sender.send(token.clone());
                    }
                    return token;
                }
            }
        };

        receiver.recv().await.ok().flatten()
    }

    async fn perform_refresh(&self) -> Option<String> {
        let request = ApiRequest {
            method: Method::POST,
            path: endpoints::REFRESH_TOKEN.to_string(),
            query: Vec::new(),
            body: RequestBody::Json(Value::Object(Default::default())),
            bearer: self.inner.session.access_token(),
        };

        let response = match self.inner.transport.execute(&request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "token refresh failed");
                self.inner.session.clear_session();
                return None;
            }
        };

        if !response.is_success() {
            warn!(status = response.status, "token refresh rejected");
            self.inner.session.clear_session();
            return None;
        }

        let payload = response.json().unwrap_or(Value::Null);
        match self.inner.session.establish_session(&payload) {
            Some(session) => Some(session.access_token),
            None => {
                warn!("token refresh response carried no token");
                None
            }
        }
    }
}

fn check(response: ApiResponse) -> Result<ApiResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(HelpdeskError::ApiError {
            status: response.status,
            message: response.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use serde_json::json;

    /// Transport that rejects any bearer other than the current "good"
    /// token with a 401 and serves the refresh endpoint after a short
    /// delay, so concurrent callers genuinely overlap.
    struct ExpiringTransport {
        good_token: String,
        refreshed_token: Option<String>,
        refresh_calls: AtomicUsize,
        log: StdMutex<Vec<ApiRequest>>,
    }

    impl ExpiringTransport {
        fn new(good_token: &str, refreshed_token: Option<&str>) -> Self {
            Self {
                good_token: good_token.to_string(),
                refreshed_token: refreshed_token.map(str::to_string),
                refresh_calls: AtomicUsize::new(0),
                log: StdMutex::new(Vec::new()),
            }
        }

        fn requests_for(&self, path: &str) -> Vec<ApiRequest> {
            self.log
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.path == path)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl HttpTransport for ExpiringTransport {
        async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
            self.log.lock().unwrap().push(request.clone());

            if request.path == endpoints::REFRESH_TOKEN {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                return Ok(match &self.refreshed_token {
                    Some(token) => ApiResponse {
                        status: 200,
                        body: json!({"accessToken": token}).to_string(),
                    },
                    None => ApiResponse {
                        status: 401,
                        body: "refresh denied".to_string(),
                    },
                });
            }

            if request.bearer.as_deref() != Some(self.good_token.as_str()) {
                return Ok(ApiResponse {
                    status: 401,
                    body: "expired".to_string(),
                });
            }
            Ok(ApiResponse {
                status: 200,
                body: json!({"data": []}).to_string(),
            })
        }
    }

    fn client_with(transport: Arc<ExpiringTransport>, token: &str) -> ApiClient {
        let session = SessionStore::ephemeral();
        session.establish_session(&json!({"accessToken": token}));
        ApiClient::with_transport(transport, session)
    }

    #[tokio::test]
    async fn attaches_bearer_token() {
        let transport = Arc::new(ExpiringTransport::new("tok-good", None));
        let client = client_with(Arc::clone(&transport), "tok-good");

        client.get_json("application/select/all/teams").await.unwrap();

        let sent = transport.requests_for("application/select/all/teams");
        assert_eq!(sent[0].bearer.as_deref(), Some("tok-good"));
    }

    #[tokio::test]
    async fn retries_once_after_refresh() {
        let transport = Arc::new(ExpiringTransport::new("tok-new", Some("tok-new")));
        let client = client_with(Arc::clone(&transport), "tok-old");

        client.get_json("application/select/all/teams").await.unwrap();

        assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
        let sent = transport.requests_for("application/select/all/teams");
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].bearer.as_deref(), Some("tok-old"));
        assert_eq!(sent[1].bearer.as_deref(), Some("tok-new"));
        assert_eq!(client.session().access_token().as_deref(), Some("tok-new"));
    }

    #[tokio::test]
    async fn concurrent_401s_share_one_refresh() {
        let transport = Arc::new(ExpiringTransport::new("tok-new", Some("tok-new")));
        let client = client_with(Arc::clone(&transport), "tok-old");

        let (a, b, c) = tokio::join!(
            client.get_json("application/select/all/teams"),
            client.get_json("application/select/all/support-users"),
            client.get_json("application/select/all/status-types"),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
        for path in [
            "application/select/all/teams",
            "application/select/all/support-users",
            "application/select/all/status-types",
        ] {
            let sent = transport.requests_for(path);
            assert_eq!(sent.len(), 2, "{path} should be retried exactly once");
            assert_eq!(sent[1].bearer.as_deref(), Some("tok-new"));
        }
    }

    #[tokio::test]
    async fn failed_refresh_clears_session_and_propagates_401() {
        let transport = Arc::new(ExpiringTransport::new("tok-new", None));
        let client = client_with(Arc::clone(&transport), "tok-old");

        let error = client
            .get_json("application/select/all/teams")
            .await
            .unwrap_err();

        match error {
            HelpdeskError::ApiError { status, .. } => assert_eq!(status, 401),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!client.session().is_authenticated());
    }

    #[tokio::test]
    async fn authentication_paths_never_trigger_refresh() {
        let transport = Arc::new(ExpiringTransport::new("tok-good", Some("tok-good")));
        let client = client_with(Arc::clone(&transport), "tok-old");

        let error = client
            .post_json(endpoints::SIGN_OUT, json!({}))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            HelpdeskError::ApiError { status: 401, .. }
        ));
        assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 0);
    }
}

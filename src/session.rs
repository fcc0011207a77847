use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;
use tracing::warn;

use crate::types::Session;

/// Token field names accepted from sign-in and refresh responses, probed
/// in order.
const TOKEN_FIELDS: [&str; 3] = ["accessToken", "access_token", "token"];

/// Holds the current session and persists it as a JSON snapshot on every
/// mutation. Cheap to clone; all clones share state.
///
/// Storage failures are swallowed on purpose: a session that cannot be
/// persisted still works in-memory for the lifetime of the process.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: RwLock<Option<Session>>,
    storage_path: Option<PathBuf>,
    hydrated: AtomicBool,
}

impl SessionStore {
    pub fn new(storage_path: Option<PathBuf>) -> Self {
        let store = Self {
            inner: Arc::new(Inner {
                state: RwLock::new(None),
                storage_path,
                hydrated: AtomicBool::new(false),
            }),
        };
        store.hydrate_from_storage();
        store
    }

    /// In-memory store with no backing file.
    pub fn ephemeral() -> Self {
        Self::new(None)
    }

    /// Accepts a sign-in/refresh response or a previously persisted
    /// session and makes it current. Fields missing from the payload fall
    /// back to the previous session's values. Returns `None` (and clears
    /// the session) when no token can be extracted.
    pub fn establish_session(&self, payload: &Value) -> Option<Session> {
        let session = match self.normalize_session(payload) {
            Some(session) => session,
            None => {
                self.clear_session();
                return None;
            }
        };

        *self.inner.state.write().expect("session lock") = Some(session.clone());
        self.persist(Some(&session));
        Some(session)
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.state.read().expect("session lock").clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.session().map(|s| s.access_token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Token presence only. `expires_at` is stored but not checked here;
    /// an expired token surfaces as a 401 on the next request.
    pub fn has_valid_session(&self) -> bool {
        self.is_authenticated()
    }

    pub fn clear_session(&self) {
        *self.inner.state.write().expect("session lock") = None;
        self.persist(None);
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.claim("userAccountId")
    }

    pub fn current_user_team(&self) -> Option<String> {
        self.cached_or_claim(|s| s.team.clone(), "team")
    }

    pub fn current_username(&self) -> Option<String> {
        self.cached_or_claim(|s| s.username.clone(), "username")
    }

    pub fn current_user_full_name(&self) -> Option<String> {
        self.cached_or_claim(|s| s.user_full_name.clone(), "userFullName")
    }

    pub fn current_user_client(&self) -> Option<String> {
        self.cached_or_claim(|s| s.client.clone(), "client")
    }

    fn cached_or_claim(
        &self,
        cached: impl Fn(&Session) -> Option<String>,
        claim: &str,
    ) -> Option<String> {
        if let Some(session) = self.session() {
            if let Some(value) = cached(&session) {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
        self.claim(claim)
    }

    fn claim(&self, name: &str) -> Option<String> {
        let token = self.access_token()?;
        let payload = decode_jwt_payload(&token)?;
        match payload.get(name) {
            Some(Value::String(value)) => {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Some(Value::Number(value)) => Some(value.to_string()),
            _ => None,
        }
    }

    fn normalize_session(&self, payload: &Value) -> Option<Session> {
        let access_token = extract_access_token(payload)?;
        let current = self.session();

        let field = |name: &str| -> Option<String> {
            match payload.get(name) {
                Some(Value::String(value)) if !value.trim().is_empty() => {
                    Some(value.trim().to_string())
                }
                _ => None,
            }
        };

        Some(Session {
            access_token,
            client: field("client").or_else(|| current.as_ref().and_then(|c| c.client.clone())),
            username: field("username")
                .or_else(|| current.as_ref().and_then(|c| c.username.clone())),
            user_full_name: field("userFullName")
                .or_else(|| current.as_ref().and_then(|c| c.user_full_name.clone())),
            team: field("team").or_else(|| current.as_ref().and_then(|c| c.team.clone())),
            expires_at: payload
                .get("expiresAt")
                .and_then(Value::as_i64)
                .or_else(|| current.as_ref().and_then(|c| c.expires_at)),
        })
    }

    fn hydrate_from_storage(&self) {
        if self.inner.hydrated.swap(true, Ordering::SeqCst) {
            return;
        }

        let Some(path) = self.inner.storage_path.as_ref() else {
            return;
        };
        if !path.exists() {
            return;
        }

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return,
        };
        let cached: Session = match serde_json::from_str(&contents) {
            Ok(session) => session,
            Err(_) => return,
        };
        if !cached.access_token.is_empty() {
            *self.inner.state.write().expect("session lock") = Some(cached);
        }
    }

    fn persist(&self, session: Option<&Session>) {
        let Some(path) = self.inner.storage_path.as_ref() else {
            return;
        };

        match session {
            None => {
                let _ = std::fs::remove_file(path);
            }
            Some(session) => {
                if let Some(parent) = path.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                if let Ok(contents) = serde_json::to_string(session) {
                    let _ = std::fs::write(path, contents);
                }
            }
        }
    }
}

fn extract_access_token(payload: &Value) -> Option<String> {
    for field in TOKEN_FIELDS {
        if let Some(Value::String(token)) = payload.get(field) {
            if !token.is_empty() {
                return Some(token.clone());
            }
        }
    }
    None
}

/// Decode the middle segment of a JWT-like token (base64url, UTF-8, JSON).
/// No signature verification: this feeds display claims only.
fn decode_jwt_payload(token: &str) -> Option<Value> {
    let mut segments = token.split('.');
    let payload = segments.nth(1)?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|error| {
            warn!(%error, "could not decode access token payload");
            error
        })
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fake_token(claims: Value) -> String {
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("header.{payload}.signature")
    }

    #[test]
    fn establishes_session_from_any_token_field() {
        for field in ["accessToken", "access_token", "token"] {
            let store = SessionStore::ephemeral();
            let session = store.establish_session(&json!({ field: "tok-1" }));
            assert_eq!(session.unwrap().access_token, "tok-1");
            assert!(store.is_authenticated());
        }
    }

    #[test]
    fn missing_token_clears_session() {
        let store = SessionStore::ephemeral();
        store.establish_session(&json!({"accessToken": "tok-1", "username": "ana"}));
        assert!(store.has_valid_session());

        let result = store.establish_session(&json!({"username": "ana"}));
        assert!(result.is_none());
        assert!(!store.has_valid_session());
        assert_eq!(store.session(), None);
    }

    #[test]
    fn merge_keeps_previous_fields_when_payload_omits_them() {
        let store = SessionStore::ephemeral();
        store.establish_session(&json!({
            "accessToken": "tok-1",
            "username": "ana",
            "team": "Soporte",
        }));
        let refreshed = store
            .establish_session(&json!({"access_token": "tok-2"}))
            .unwrap();

        assert_eq!(refreshed.access_token, "tok-2");
        assert_eq!(refreshed.username.as_deref(), Some("ana"));
        assert_eq!(refreshed.team.as_deref(), Some("Soporte"));
    }

    #[test]
    fn claims_come_from_token_payload() {
        let token = fake_token(json!({
            "userAccountId": "user-7",
            "team": "Asesoría",
            "username": "ana",
            "userFullName": "Ana Torres",
        }));
        let store = SessionStore::ephemeral();
        store.establish_session(&json!({"accessToken": token}));

        assert_eq!(store.current_user_id().as_deref(), Some("user-7"));
        assert_eq!(store.current_user_team().as_deref(), Some("Asesoría"));
        assert_eq!(store.current_username().as_deref(), Some("ana"));
        assert_eq!(store.current_user_full_name().as_deref(), Some("Ana Torres"));
    }

    #[test]
    fn cached_session_fields_win_over_claims() {
        let token = fake_token(json!({"username": "claim-name"}));
        let store = SessionStore::ephemeral();
        store.establish_session(&json!({"accessToken": token, "username": "cached-name"}));

        assert_eq!(store.current_username().as_deref(), Some("cached-name"));
    }

    #[test]
    fn malformed_token_yields_no_claims() {
        let store = SessionStore::ephemeral();
        store.establish_session(&json!({"accessToken": "not-a-jwt"}));
        assert_eq!(store.current_user_id(), None);

        store.establish_session(&json!({"accessToken": "a.!!!not-base64!!!.c"}));
        assert_eq!(store.current_user_id(), None);
    }

    #[test]
    fn persists_and_rehydrates_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = SessionStore::new(Some(path.clone()));
        store.establish_session(&json!({"accessToken": "tok-1", "username": "ana"}));
        assert!(path.exists());

        let restored = SessionStore::new(Some(path.clone()));
        assert_eq!(restored.access_token().as_deref(), Some("tok-1"));
        assert_eq!(restored.current_username().as_deref(), Some("ana"));

        restored.clear_session();
        assert!(!path.exists());
    }

    #[test]
    fn storage_errors_are_swallowed() {
        // Point at a path whose parent cannot be created.
        let store = SessionStore::new(Some(PathBuf::from("/dev/null/nope/session.json")));
        let session = store.establish_session(&json!({"accessToken": "tok-1"}));
        assert!(session.is_some());
        assert!(store.is_authenticated());
    }
}

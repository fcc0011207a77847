use serde::{Deserialize, Serialize};

/// The authenticated session as persisted between runs. Identity fields
/// other than the token are a cache of claims the backend handed back at
/// sign-in; the token payload remains the source of truth.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Session {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, rename = "userFullName")]
    pub user_full_name: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default, rename = "expiresAt")]
    pub expires_at: Option<i64>,
}

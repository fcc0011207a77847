use serde::{Deserialize, Serialize};

/// A support-team member eligible to be assigned as a ticket manager.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SupportUser {
    pub id: String,
    #[serde(default)]
    pub user_profile_id: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub last_login_date: Option<String>,
}

impl SupportUser {
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}

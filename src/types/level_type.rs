use serde::{Deserialize, Serialize};

/// Reference catalog entry for request, priority and status types.
/// Loaded once per session; read-only afterwards.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LevelType {
    pub id: String,
    #[serde(default)]
    pub value: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl LevelType {
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.id)
    }
}

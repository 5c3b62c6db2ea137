use serde::{Deserialize, Serialize};

/// Who the daemon is acting for. Handed over by the presentation layer after
/// it has authenticated the user; the daemon never authenticates itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    /// Display name of the user's own organization.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

impl Session {
    pub fn scope_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "Unnamed School"
        } else {
            &self.name
        }
    }
}

use crate::record::scalar_text;
use crate::source::{normalize_list, ApiClient, Failure};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const UNNAMED_SCOPE: &str = "Unnamed School";

/// The organizational unit (school or sub-branch) that dependent data is
/// fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeContext {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scope: {0}")]
pub struct UnknownScope(pub String);

/// Scopes the session user may pick from: their own school first, then the
/// sub-branches the backend reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeCatalog {
    scopes: Vec<ScopeContext>,
}

impl ScopeCatalog {
    pub fn for_user(user_id: &str, user_name: &str) -> Self {
        Self {
            scopes: vec![ScopeContext {
                id: user_id.to_string(),
                name: user_name.to_string(),
            }],
        }
    }

    pub fn scopes(&self) -> &[ScopeContext] {
        &self.scopes
    }

    /// Replaces the sub-branches with the ones in `body`, keeping the
    /// user's own scope in front.
    pub fn merge_branches(&mut self, body: Value) -> Result<usize, Failure> {
        let branches = normalize_list(body, "_id")?;
        self.scopes.truncate(1);
        for b in branches {
            if self.scopes.iter().any(|s| s.id == b.id()) {
                continue;
            }
            let name = b
                .get("name")
                .and_then(scalar_text)
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNNAMED_SCOPE.to_string());
            self.scopes.push(ScopeContext {
                id: b.id().to_string(),
                name,
            });
        }
        Ok(self.scopes.len())
    }

    /// Resolves a selection request. Null or blank ids mean "nothing selected".
    pub fn pick(&self, id: Option<&str>) -> Result<Option<ScopeContext>, UnknownScope> {
        let Some(id) = id.map(str::trim).filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        self.scopes
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .map(Some)
            .ok_or_else(|| UnknownScope(id.to_string()))
    }
}

/// `GET /subbranches/sub/{userId}` merged behind the user's own scope.
pub async fn resolve(api: &ApiClient, catalog: &ScopeCatalog, user_id: &str) -> Result<ScopeCatalog, Failure> {
    let path = format!("/subbranches/sub/{}", urlencoding::encode(user_id));
    let body = api.get(&path).await?;
    let mut resolved = catalog.clone();
    let count = resolved.merge_branches(body)?;
    tracing::info!(user_id, scopes = count, "scopes resolved");
    Ok(resolved)
}

/// The scope a screen is bound to. Every selection, including clearing it,
/// starts a new epoch; work tagged with an older epoch is stale.
#[derive(Debug, Clone, Default)]
pub struct ScopeSelection {
    current: Option<ScopeContext>,
    epoch: u64,
}

impl ScopeSelection {
    pub fn current(&self) -> Option<&ScopeContext> {
        self.current.as_ref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_gated(&self) -> bool {
        self.current.is_none()
    }

    pub fn select(&mut self, scope: Option<ScopeContext>) -> u64 {
        self.epoch += 1;
        self.current = scope;
        self.epoch
    }
}

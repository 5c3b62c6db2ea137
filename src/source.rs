use crate::record::{scalar_text, Record};
use crate::resources::{Endpoints, ResourceDef};
use async_trait::async_trait;
use reqwest::{header, Client, Method};
use serde_json::{json, Map, Value};
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;

/// Why a call did not go through. Returned as a value; never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    #[error("{0}")]
    Network(String),
    #[error("{message}")]
    Validation { message: String, fields: Vec<String> },
    #[error("{message}")]
    Server { status: Option<u16>, message: String },
}

impl Failure {
    pub fn server(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn origin(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Validation { .. } => "validation",
            Self::Server { .. } => "server",
        }
    }

    /// IPC error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "network_failure",
            Self::Validation { .. } => "validation_failure",
            Self::Server { .. } => "server_failure",
        }
    }

    pub fn to_json(&self) -> Value {
        let mut out = json!({
            "origin": self.origin(),
            "message": self.to_string(),
        });
        match self {
            Self::Server {
                status: Some(status),
                ..
            } => out["status"] = json!(status),
            Self::Validation { fields, .. } => out["fields"] = json!(fields),
            _ => {}
        }
        out
    }
}

impl From<reqwest::Error> for Failure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Network(format!("request timed out: {e}"));
        }
        Self::Network(e.to_string())
    }
}

/// Outbound calls for one resource type. Single-shot, no retries.
#[async_trait(?Send)]
pub trait DataSource {
    async fn list(&self, scope_id: Option<&str>) -> Result<Vec<Record>, Failure>;

    async fn create(&self, payload: &Map<String, Value>) -> Result<Record, Failure>;

    async fn update(&self, id: &str, payload: &Map<String, Value>) -> Result<Record, Failure>;

    async fn remove(&self, id: &str) -> Result<(), Failure>;

    /// Status change (withdraw/reinstate). Defaults to a plain update.
    async fn transition(&self, id: &str, patch: &Map<String, Value>) -> Result<(), Failure> {
        self.update(id, patch).await.map(|_| ())
    }
}

/// Shared HTTP plumbing: base URL, bearer token, timeout and the backend's
/// error conventions.
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token.trim()))?,
            );
        }
        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, Failure> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%method, %url, "backend request");
        let mut req = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        let parsed: Option<Value> = if bytes.iter().all(u8::is_ascii_whitespace) {
            Some(Value::Null)
        } else {
            serde_json::from_slice(&bytes).ok()
        };

        if !status.is_success() {
            let message = parsed
                .as_ref()
                .and_then(error_message)
                .or_else(|| {
                    let text = String::from_utf8_lossy(&bytes).trim().to_string();
                    (!text.is_empty()).then_some(text)
                })
                .unwrap_or_else(|| status.to_string());
            tracing::warn!(%method, %url, status = status.as_u16(), %message, "backend rejected request");
            return Err(Failure::server(Some(status.as_u16()), message));
        }

        let Some(body) = parsed else {
            return Err(Failure::server(
                Some(status.as_u16()),
                "backend returned a body that is not JSON",
            ));
        };
        // The backend reports some failures inside a 2xx body.
        if let Some(message) = body.get("error").and_then(scalar_text).filter(|m| !m.is_empty()) {
            tracing::warn!(%method, %url, %message, "backend reported an error");
            return Err(Failure::server(Some(status.as_u16()), message));
        }
        Ok(body)
    }

    pub async fn get(&self, path: &str) -> Result<Value, Failure> {
        self.send(Method::GET, path, None).await
    }

    /// Best effort; a failed log write never undoes the change it describes.
    pub async fn log_activity(&self, activity: &str, user: &str) {
        let body = json!({ "activity": activity, "user": user });
        if let Err(e) = self.send(Method::POST, "/activitylog/create", Some(&body)).await {
            tracing::warn!(error = %e, %activity, "activity log write failed");
        }
    }
}

fn error_message(body: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .find_map(|k| body.get(*k).and_then(scalar_text).filter(|m| !m.trim().is_empty()))
}

/// Accepts a bare array, `{ data: [...] }` or `{ groups: [...] }`. Rows
/// without an id are dropped.
pub fn normalize_list(body: Value, id_field: &str) -> Result<Vec<Record>, Failure> {
    let items = match body {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        Value::Object(mut obj) => match obj.remove("data").or_else(|| obj.remove("groups")) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) => Vec::new(),
            _ => return Err(Failure::server(None, "unexpected list response shape")),
        },
        _ => return Err(Failure::server(None, "unexpected list response shape")),
    };
    let total = items.len();
    let records: Vec<Record> = items
        .into_iter()
        .filter_map(|item| Record::from_value(item, id_field))
        .collect();
    if records.len() < total {
        tracing::warn!(
            dropped = total - records.len(),
            id_field,
            "list rows without an identifier were dropped"
        );
    }
    Ok(records)
}

/// Accepts `{ doc: {...} }` or the bare record.
pub fn normalize_record(body: Value, id_field: &str) -> Option<Record> {
    match body {
        Value::Object(mut obj) => match obj.remove("doc") {
            Some(doc) => Record::from_value(doc, id_field),
            None => Record::from_value(Value::Object(obj), id_field),
        },
        _ => None,
    }
}

/// [`DataSource`] over the REST backend for one [`ResourceDef`].
pub struct HttpDataSource {
    api: Rc<ApiClient>,
    endpoints: Endpoints,
    id_field: String,
    resource: String,
}

impl HttpDataSource {
    pub fn new(api: Rc<ApiClient>, def: &ResourceDef) -> Self {
        Self {
            api,
            endpoints: def.endpoints.clone(),
            id_field: def.id_field.clone(),
            resource: def.name.clone(),
        }
    }

    fn route<'a>(&self, route: &'a Option<String>, op: &str) -> Result<&'a str, Failure> {
        route.as_deref().ok_or_else(|| {
            Failure::server(None, format!("{} does not support {op}", self.resource))
        })
    }
}

#[async_trait(?Send)]
impl DataSource for HttpDataSource {
    async fn list(&self, scope_id: Option<&str>) -> Result<Vec<Record>, Failure> {
        let path = Endpoints::expand(&self.endpoints.list, scope_id, None);
        let body = self.api.get(&path).await?;
        normalize_list(body, &self.id_field)
    }

    async fn create(&self, payload: &Map<String, Value>) -> Result<Record, Failure> {
        let path = self.route(&self.endpoints.create, "create")?;
        let body = self
            .api
            .send(Method::POST, path, Some(&Value::Object(payload.clone())))
            .await?;
        normalize_record(body, &self.id_field)
            .ok_or_else(|| Failure::server(None, "create response carried no record"))
    }

    async fn update(&self, id: &str, payload: &Map<String, Value>) -> Result<Record, Failure> {
        let path = Endpoints::expand(self.route(&self.endpoints.update, "update")?, None, Some(id));
        let body = self
            .api
            .send(Method::PUT, &path, Some(&Value::Object(payload.clone())))
            .await?;
        // Without a returned document the confirmed payload is the update.
        Ok(normalize_record(body, &self.id_field).unwrap_or_else(|| {
            let mut fields = payload.clone();
            fields.insert(self.id_field.clone(), Value::String(id.to_string()));
            Record::from_fields(id, fields)
        }))
    }

    async fn remove(&self, id: &str) -> Result<(), Failure> {
        let path = Endpoints::expand(self.route(&self.endpoints.delete, "delete")?, None, Some(id));
        self.api.send(Method::DELETE, &path, None).await.map(|_| ())
    }

    async fn transition(&self, id: &str, patch: &Map<String, Value>) -> Result<(), Failure> {
        let template = self
            .endpoints
            .transition
            .clone()
            .or_else(|| self.endpoints.update.clone());
        let path = Endpoints::expand(self.route(&template, "status changes")?, None, Some(id));
        self.api
            .send(Method::PUT, &path, Some(&Value::Object(patch.clone())))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_accepts_bare_array_and_data_envelope() {
        let bare = normalize_list(json!([{ "_id": "a" }, { "_id": "b" }]), "_id").expect("bare");
        assert_eq!(bare.len(), 2);
        let wrapped = normalize_list(json!({ "data": [{ "_id": "a" }] }), "_id").expect("wrapped");
        assert_eq!(wrapped[0].id(), "a");
        let groups = normalize_list(json!({ "groups": [{ "_id": "g1" }] }), "_id").expect("groups");
        assert_eq!(groups[0].id(), "g1");
        assert!(normalize_list(json!(null), "_id").expect("null").is_empty());
        assert!(normalize_list(json!({ "rows": [] }), "_id").is_err());
        assert!(normalize_list(json!("nope"), "_id").is_err());
    }

    #[test]
    fn list_drops_rows_without_id() {
        let rows = normalize_list(json!([{ "_id": "a" }, { "name": "orphan" }, 3]), "_id")
            .expect("list");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn record_unwraps_doc() {
        let r = normalize_record(json!({ "doc": { "_id": "d1", "name": "Math" } }), "_id")
            .expect("doc");
        assert_eq!(r.id(), "d1");
        let bare = normalize_record(json!({ "_id": "d2" }), "_id").expect("bare");
        assert_eq!(bare.id(), "d2");
        assert!(normalize_record(json!({ "message": "ok" }), "_id").is_none());
    }

    #[test]
    fn failure_json_carries_origin() {
        let f = Failure::server(Some(409), "duplicate id");
        let v = f.to_json();
        assert_eq!(v["origin"], "server");
        assert_eq!(v["status"], 409);
        assert_eq!(v["message"], "duplicate id");
        assert_eq!(f.code(), "server_failure");
        assert_eq!(Failure::Network("down".into()).origin(), "network");
    }

    #[test]
    fn error_message_prefers_error_then_message() {
        assert_eq!(
            error_message(&json!({ "error": "taken", "message": "x" })),
            Some("taken".to_string())
        );
        assert_eq!(error_message(&json!({ "message": "bad" })), Some("bad".to_string()));
        assert_eq!(error_message(&json!({ "error": "" })), None);
    }
}

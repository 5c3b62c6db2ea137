use serde_json::json;

use crate::screen::ScreenError;
use crate::source::Failure;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn failure(id: &str, f: &Failure) -> serde_json::Value {
    err(id, f.code(), f.to_string(), Some(f.to_json()))
}

pub fn screen_error(id: &str, e: &ScreenError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), e.details())
}

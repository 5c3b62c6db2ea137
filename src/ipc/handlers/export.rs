use crate::ipc::error::ok;
use crate::ipc::helpers::with_screen;
use crate::ipc::types::{Request, SharedState};

fn handle_export_rows(state: &SharedState, req: &Request) -> serde_json::Value {
    match with_screen(state, req, |s| s.export()) {
        Ok(export) => ok(&req.id, export),
        Err(e) => e,
    }
}

pub async fn try_handle(state: &SharedState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "export.rows" => Some(handle_export_rows(state, req)),
        _ => None,
    }
}

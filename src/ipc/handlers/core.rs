use crate::ipc::error::ok;
use crate::ipc::types::{Request, SharedState};
use serde_json::json;

fn handle_health(state: &SharedState, req: &Request) -> serde_json::Value {
    let st = state.borrow();
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "baseUrl": st.config.base_url,
            "session": st.session,
            "openScreens": st.screens.len(),
        }),
    )
}

pub async fn try_handle(state: &SharedState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        _ => None,
    }
}

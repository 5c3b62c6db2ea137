use super::handlers;
use super::types::{Request, SharedState};
use crate::ipc::error::err;

pub async fn handle_request(state: &SharedState, req: Request) -> serde_json::Value {
    tracing::debug!(id = %req.id, method = %req.method, "request");
    if let Some(resp) = handlers::core::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::session::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::scopes::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::screens::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::table::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::editor::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::export::try_handle(state, &req).await {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

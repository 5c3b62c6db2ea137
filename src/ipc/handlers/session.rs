use std::rc::Rc;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{Request, SharedState};
use crate::scope::ScopeCatalog;
use crate::session::Session;
use crate::source::ApiClient;
use serde_json::json;

fn handle_login(state: &SharedState, req: &Request) -> serde_json::Value {
    let session: Session = match serde_json::from_value(req.params.clone()) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    if session.user_id.trim().is_empty() {
        return err(&req.id, "bad_params", "missing params.userId", None);
    }

    let mut st = state.borrow_mut();
    let api = match ApiClient::new(
        &st.config.base_url,
        session.token.as_deref(),
        st.config.timeout(),
    ) {
        Ok(api) => api,
        Err(e) => return err(&req.id, "client_failed", format!("{e:#}"), None),
    };

    // A new login never inherits screens from the previous user.
    st.clear_session();
    st.catalog = ScopeCatalog::for_user(&session.user_id, session.scope_name());
    st.api = Some(Rc::new(api));
    tracing::info!(user_id = %session.user_id, "session started");
    let scopes = st.catalog.scopes().to_vec();
    st.session = Some(session);
    ok(&req.id, json!({ "session": st.session, "scopes": scopes }))
}

fn handle_logout(state: &SharedState, req: &Request) -> serde_json::Value {
    let mut st = state.borrow_mut();
    if let Some(s) = &st.session {
        tracing::info!(user_id = %s.user_id, "session ended");
    }
    st.clear_session();
    ok(&req.id, json!({}))
}

pub async fn try_handle(state: &SharedState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.login" => Some(handle_login(state, req)),
        "session.logout" => Some(handle_logout(state, req)),
        _ => None,
    }
}

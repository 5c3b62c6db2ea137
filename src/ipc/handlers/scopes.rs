use std::rc::Rc;

use crate::ipc::error::{failure, ok};
use crate::ipc::helpers::no_session;
use crate::ipc::types::{Request, SharedState};
use crate::scope;
use serde_json::json;

async fn handle_scopes_resolve(state: &SharedState, req: &Request) -> serde_json::Value {
    let (api, catalog, user_id) = {
        let st = state.borrow();
        let (Some(api), Some(session)) = (&st.api, &st.session) else {
            return no_session(req);
        };
        (Rc::clone(api), st.catalog.clone(), session.user_id.clone())
    };

    let resolved = match scope::resolve(&api, &catalog, &user_id).await {
        Ok(c) => c,
        Err(f) => return failure(&req.id, &f),
    };

    let mut st = state.borrow_mut();
    let same_user = st.session.as_ref().is_some_and(|s| s.user_id == user_id);
    if same_user {
        st.catalog = resolved.clone();
    }
    ok(&req.id, json!({ "scopes": resolved.scopes() }))
}

pub async fn try_handle(state: &SharedState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "scopes.resolve" => Some(handle_scopes_resolve(state, req).await),
        _ => None,
    }
}

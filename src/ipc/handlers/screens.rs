use std::rc::Rc;

use crate::ipc::error::{err, ok, screen_error};
use crate::ipc::helpers::{fetch_response, no_session, run_fetch, str_param, view, with_screen};
use crate::ipc::types::{Request, SharedState};
use crate::resources;
use crate::screen::Screen;
use crate::source::HttpDataSource;
use serde_json::json;

fn handle_screens_list(state: &SharedState, req: &Request) -> serde_json::Value {
    let st = state.borrow();
    let screens: Vec<_> = resources::catalog()
        .into_iter()
        .map(|def| {
            json!({
                "name": def.name,
                "title": def.title,
                "canCreate": def.can_create(),
                "scoped": def.endpoints.is_scoped(),
                "rowActions": def.row_actions,
                "open": st.screens.contains_key(&def.name),
            })
        })
        .collect();
    ok(&req.id, json!({ "screens": screens }))
}

fn handle_screen_open(state: &SharedState, req: &Request) -> serde_json::Value {
    let name = match str_param(req, "screen") {
        Ok(v) => v,
        Err(e) => return e,
    };
    {
        let mut st = state.borrow_mut();
        let Some(api) = st.api.clone() else {
            return no_session(req);
        };
        if !st.screens.contains_key(name) {
            let Some(def) = resources::find(name) else {
                return err(&req.id, "not_found", format!("unknown resource: {name}"), None);
            };
            let source = Rc::new(HttpDataSource::new(api, &def));
            let page_size = st.config.default_page_size();
            st.screens
                .insert(name.to_string(), Screen::new(def, source, page_size));
            tracing::debug!(screen = name, "screen opened");
        }
    }
    match view(state, req) {
        Ok(v) => ok(&req.id, json!({ "view": v })),
        Err(e) => e,
    }
}

async fn handle_scope_select(state: &SharedState, req: &Request) -> serde_json::Value {
    let name = match str_param(req, "screen") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let scope_id = req.params.get("scopeId").and_then(|v| v.as_str());
    let picked = {
        let st = state.borrow();
        st.catalog.pick(scope_id)
    };
    let scope = match picked {
        Ok(s) => s,
        Err(e) => return err(&req.id, "unknown_scope", e.to_string(), None),
    };

    let ticket = match with_screen(state, req, |s| s.select_scope(scope)) {
        Ok(t) => t,
        Err(e) => return e,
    };
    match ticket {
        Some(ticket) => {
            let outcome = run_fetch(state, name, ticket).await;
            fetch_response(state, req, outcome)
        }
        None => match view(state, req) {
            Ok(v) => ok(&req.id, json!({ "stale": false, "view": v })),
            Err(e) => e,
        },
    }
}

async fn handle_screen_refresh(state: &SharedState, req: &Request) -> serde_json::Value {
    let name = match str_param(req, "screen") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let ticket = match with_screen(state, req, |s| s.refresh()) {
        Ok(Ok(t)) => t,
        Ok(Err(e)) => return screen_error(&req.id, &e),
        Err(e) => return e,
    };
    let outcome = run_fetch(state, name, ticket).await;
    fetch_response(state, req, outcome)
}

fn handle_screen_view(state: &SharedState, req: &Request) -> serde_json::Value {
    match view(state, req) {
        Ok(v) => ok(&req.id, json!({ "view": v })),
        Err(e) => e,
    }
}

pub async fn try_handle(state: &SharedState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "screens.list" => Some(handle_screens_list(state, req)),
        "screen.open" => Some(handle_screen_open(state, req)),
        "scope.select" => Some(handle_scope_select(state, req).await),
        "screen.refresh" => Some(handle_screen_refresh(state, req).await),
        "screen.view" => Some(handle_screen_view(state, req)),
        _ => None,
    }
}

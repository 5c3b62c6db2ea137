use crate::filter::FilterPredicate;
use crate::ipc::error::{err, ok, screen_error};
use crate::ipc::helpers::{mutation_response, run_mutation, str_param, view, with_screen};
use crate::ipc::types::{Request, SharedState};
use crate::screen::RowActionOutcome;
use crate::table::{PageSize, RowActionKind};
use serde_json::json;

fn view_ok(state: &SharedState, req: &Request) -> serde_json::Value {
    match view(state, req) {
        Ok(v) => ok(&req.id, json!({ "view": v })),
        Err(e) => e,
    }
}

/// Accepts explicit `predicates`, or `search` keyed by the screen's search
/// boxes. Either replaces the current filter set.
fn handle_filters_set(state: &SharedState, req: &Request) -> serde_json::Value {
    if let Some(raw) = req.params.get("predicates") {
        let predicates: Vec<FilterPredicate> = match serde_json::from_value(raw.clone()) {
            Ok(p) => p,
            Err(e) => return err(&req.id, "bad_params", format!("invalid predicates: {e}"), None),
        };
        if let Err(e) = with_screen(state, req, |s| s.set_filters(predicates)) {
            return e;
        }
        return view_ok(state, req);
    }

    let Some(search) = req.params.get("search").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing params.predicates or params.search", None);
    };
    match with_screen(state, req, |s| s.set_search(search)) {
        Ok(Ok(())) => view_ok(state, req),
        Ok(Err(message)) => err(&req.id, "bad_params", message, None),
        Err(e) => e,
    }
}

fn handle_filters_reset(state: &SharedState, req: &Request) -> serde_json::Value {
    if let Err(e) = with_screen(state, req, |s| s.reset_filters()) {
        return e;
    }
    view_ok(state, req)
}

/// `size` is applied before `page`, so `{page: 2, size: 10}` lands on page 2
/// of the new size.
fn handle_page_set(state: &SharedState, req: &Request) -> serde_json::Value {
    let size = match req.params.get("size") {
        None | Some(serde_json::Value::Null) => None,
        Some(raw) => match serde_json::from_value::<PageSize>(raw.clone()) {
            Ok(s) => Some(s),
            Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
        },
    };
    let page = match req.params.get("page") {
        None | Some(serde_json::Value::Null) => None,
        Some(raw) => match raw.as_u64().and_then(|n| usize::try_from(n).ok()) {
            Some(n) => Some(n),
            None => return err(&req.id, "bad_params", "page must be a non-negative integer", None),
        },
    };
    let applied = with_screen(state, req, |s| {
        if let Some(size) = size {
            s.set_page_size(size);
        }
        if let Some(page) = page {
            s.set_page(page);
        }
    });
    if let Err(e) = applied {
        return e;
    }
    view_ok(state, req)
}

async fn handle_row_action(state: &SharedState, req: &Request) -> serde_json::Value {
    let name = match str_param(req, "screen") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let kind: RowActionKind = match req
        .params
        .get("action")
        .map(|v| serde_json::from_value(v.clone()))
    {
        Some(Ok(k)) => k,
        Some(Err(e)) => return err(&req.id, "bad_params", format!("invalid action: {e}"), None),
        None => return err(&req.id, "bad_params", "missing params.action", None),
    };
    let id = match req.params.get("id").and_then(crate::record::scalar_text) {
        Some(id) if !id.trim().is_empty() => id,
        _ => return err(&req.id, "bad_params", "missing params.id", None),
    };

    let outcome = match with_screen(state, req, |s| s.row_action(kind, &id)) {
        Ok(Ok(o)) => o,
        Ok(Err(e)) => return screen_error(&req.id, &e),
        Err(e) => return e,
    };
    match outcome {
        RowActionOutcome::EditorOpened => view_ok(state, req),
        RowActionOutcome::Mutation(ticket) => {
            tracing::info!(screen = name, action = kind.as_str(), id = %id, "row action");
            let outcome = run_mutation(state, name, ticket).await;
            mutation_response(state, req, outcome)
        }
    }
}

pub async fn try_handle(state: &SharedState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "filters.set" => Some(handle_filters_set(state, req)),
        "filters.reset" => Some(handle_filters_reset(state, req)),
        "page.set" => Some(handle_page_set(state, req)),
        "row.action" => Some(handle_row_action(state, req).await),
        _ => None,
    }
}

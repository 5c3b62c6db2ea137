use crate::ipc::error::{err, ok, screen_error};
use crate::ipc::helpers::{mutation_response, run_mutation, str_param, with_screen};
use crate::ipc::types::{Request, SharedState};
use serde_json::json;

fn editor_ok(state: &SharedState, req: &Request) -> serde_json::Value {
    match with_screen(state, req, |s| s.editor().snapshot()) {
        Ok(editor) => ok(&req.id, json!({ "editor": editor })),
        Err(e) => e,
    }
}

fn handle_open_add(state: &SharedState, req: &Request) -> serde_json::Value {
    match with_screen(state, req, |s| s.open_add()) {
        Ok(Ok(())) => editor_ok(state, req),
        Ok(Err(e)) => screen_error(&req.id, &e),
        Err(e) => e,
    }
}

fn handle_set_field(state: &SharedState, req: &Request) -> serde_json::Value {
    let field = match str_param(req, "field") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(value) = req.params.get("value").cloned() else {
        return err(&req.id, "bad_params", "missing params.value", None);
    };
    match with_screen(state, req, |s| s.set_field(field, value)) {
        Ok(Ok(())) => editor_ok(state, req),
        Ok(Err(e)) => screen_error(&req.id, &e),
        Err(e) => e,
    }
}

async fn handle_commit(state: &SharedState, req: &Request) -> serde_json::Value {
    let name = match str_param(req, "screen") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let ticket = match with_screen(state, req, |s| s.begin_commit()) {
        Ok(Ok(t)) => t,
        Ok(Err(e)) => return screen_error(&req.id, &e),
        Err(e) => return e,
    };
    let outcome = run_mutation(state, name, ticket).await;
    mutation_response(state, req, outcome)
}

fn handle_cancel(state: &SharedState, req: &Request) -> serde_json::Value {
    if let Err(e) = with_screen(state, req, |s| s.cancel_editor()) {
        return e;
    }
    editor_ok(state, req)
}

pub async fn try_handle(state: &SharedState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "editor.openAdd" => Some(handle_open_add(state, req)),
        "editor.setField" => Some(handle_set_field(state, req)),
        "editor.commit" => Some(handle_commit(state, req).await),
        "editor.cancel" => Some(handle_cancel(state, req)),
        "editor.get" => Some(editor_ok(state, req)),
        _ => None,
    }
}

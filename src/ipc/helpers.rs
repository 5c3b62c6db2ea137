use std::rc::Rc;

use serde_json::{json, Value};

use crate::ipc::error::{err, failure, ok};
use crate::ipc::types::{Request, SharedState};
use crate::screen::{self, FetchOutcome, FetchTicket, MutationOutcome, MutationTicket, Screen};
use crate::source::DataSource;

pub fn str_param<'a>(req: &'a Request, key: &str) -> Result<&'a str, Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing params.{key}"), None))
}

pub fn no_session(req: &Request) -> Value {
    err(&req.id, "no_session", "log in first", None)
}

/// Runs `f` against the screen named by `params.screen`.
pub fn with_screen<T>(
    state: &SharedState,
    req: &Request,
    f: impl FnOnce(&mut Screen) -> T,
) -> Result<T, Value> {
    let name = str_param(req, "screen")?;
    let mut st = state.borrow_mut();
    if st.session.is_none() {
        return Err(no_session(req));
    }
    let screen = st
        .screens
        .get_mut(name)
        .ok_or_else(|| err(&req.id, "not_found", format!("screen {name} is not open"), None))?;
    Ok(f(screen))
}

fn screen_source(state: &SharedState, name: &str) -> Option<Rc<dyn DataSource>> {
    state.borrow().screens.get(name).map(Screen::source)
}

/// Lands a result on the screen only if it is still the one that issued the
/// call; a logout or reopen in between replaces the screen.
fn land<T>(
    state: &SharedState,
    name: &str,
    source: &Rc<dyn DataSource>,
    f: impl FnOnce(&mut Screen) -> T,
) -> Option<T> {
    let mut st = state.borrow_mut();
    let screen = st.screens.get_mut(name)?;
    if !Rc::ptr_eq(&screen.source(), source) {
        return None;
    }
    Some(f(screen))
}

pub async fn run_fetch(state: &SharedState, name: &str, ticket: FetchTicket) -> FetchOutcome {
    let Some(source) = screen_source(state, name) else {
        return FetchOutcome::Stale;
    };
    let result = source.list(ticket.scope_id.as_deref()).await;
    land(state, name, &source, |s| s.complete_fetch(&ticket, result)).unwrap_or(FetchOutcome::Stale)
}

pub async fn run_mutation(state: &SharedState, name: &str, ticket: MutationTicket) -> MutationOutcome {
    let Some(source) = screen_source(state, name) else {
        return MutationOutcome::Stale;
    };
    let result = screen::execute(&*source, &ticket.mutation).await;
    let outcome = land(state, name, &source, |s| s.complete_mutation(&ticket, result))
        .unwrap_or(MutationOutcome::Stale);

    if let MutationOutcome::Applied {
        activity: Some(line),
    } = &outcome
    {
        let logger = {
            let st = state.borrow();
            match (&st.api, &st.session) {
                (Some(api), Some(session)) if st.config.activity_log => {
                    Some((Rc::clone(api), session.user_id.clone()))
                }
                _ => None,
            }
        };
        if let Some((api, user)) = logger {
            let line = line.clone();
            tokio::task::spawn_local(async move {
                api.log_activity(&line, &user).await;
            });
        }
    }
    outcome
}

pub fn view(state: &SharedState, req: &Request) -> Result<Value, Value> {
    with_screen(state, req, |s| s.page_view())
}

pub fn fetch_response(state: &SharedState, req: &Request, outcome: FetchOutcome) -> Value {
    let stale = match outcome {
        FetchOutcome::Failed(f) => return failure(&req.id, &f),
        FetchOutcome::Applied(_) => false,
        FetchOutcome::Stale => true,
    };
    match view(state, req) {
        Ok(v) => ok(&req.id, json!({ "stale": stale, "view": v })),
        Err(e) => e,
    }
}

pub fn mutation_response(state: &SharedState, req: &Request, outcome: MutationOutcome) -> Value {
    match outcome {
        MutationOutcome::Failed(f) => failure(&req.id, &f),
        MutationOutcome::Stale => ok(&req.id, json!({ "applied": false, "stale": true })),
        MutationOutcome::Applied { .. } => match view(state, req) {
            Ok(v) => ok(&req.id, json!({ "applied": true, "view": v })),
            Err(e) => e,
        },
    }
}

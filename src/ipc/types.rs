use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Deserialize;

use crate::config::Args;
use crate::scope::ScopeCatalog;
use crate::screen::Screen;
use crate::session::Session;
use crate::source::ApiClient;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Args,
    pub session: Option<Session>,
    /// Built at login so the session token rides on every request.
    pub api: Option<Rc<ApiClient>>,
    pub catalog: ScopeCatalog,
    /// Open screens keyed by resource name.
    pub screens: HashMap<String, Screen>,
}

impl AppState {
    pub fn new(config: Args) -> Self {
        Self {
            config,
            session: None,
            api: None,
            catalog: ScopeCatalog::default(),
            screens: HashMap::new(),
        }
    }

    pub fn clear_session(&mut self) {
        self.session = None;
        self.api = None;
        self.catalog = ScopeCatalog::default();
        self.screens.clear();
    }
}

/// Requests run as local tasks on one thread; borrows never span an await.
pub type SharedState = Rc<RefCell<AppState>>;

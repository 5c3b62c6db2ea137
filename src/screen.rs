use crate::editor::{CommitRequest, Editor, EditorError};
use crate::filter::{self, FilterPredicate};
use crate::record::{render_cell, scalar_text, FieldKind, Record, RecordId};
use crate::resources::ResourceDef;
use crate::scope::{ScopeContext, ScopeSelection};
use crate::source::{DataSource, Failure};
use crate::table::{page_size_choices, PageSize, Pager, RowActionKind};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

const GATED_MESSAGE: &str = "Select a school to continue";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScreenError {
    #[error("select a scope first")]
    NoScope,
    #[error("another change to {0} is still in progress")]
    Busy(String),
    #[error("no row with id {0}")]
    UnknownRow(String),
    #[error("{resource} does not offer {action}")]
    NotOffered {
        resource: String,
        action: &'static str,
    },
    #[error(transparent)]
    Editor(#[from] EditorError),
}

impl ScreenError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoScope => "no_scope",
            Self::Busy(_) => "busy",
            Self::UnknownRow(_) => "not_found",
            Self::NotOffered { .. } => "not_offered",
            Self::Editor(EditorError::Busy) => "busy",
            Self::Editor(EditorError::InvalidTransition { .. }) => "invalid_transition",
            Self::Editor(EditorError::UnknownField(_)) => "unknown_field",
            Self::Editor(EditorError::Invalid(f)) => f.code(),
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Editor(EditorError::Invalid(f)) => Some(f.to_json()),
            _ => None,
        }
    }
}

/// Identifies one list request. Only the most recent fetch of the current
/// scope epoch may land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub epoch: u64,
    pub seq: u64,
    /// `None` for resources listed without a scope.
    pub scope_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied(usize),
    Stale,
    Failed(Failure),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create {
        payload: Map<String, Value>,
    },
    Update {
        id: RecordId,
        payload: Map<String, Value>,
    },
    Remove {
        id: RecordId,
    },
    Transition {
        kind: RowActionKind,
        id: RecordId,
        patch: Map<String, Value>,
    },
}

impl Mutation {
    fn verb(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Remove { .. } => "delete",
            Self::Transition { kind, .. } => kind.as_str(),
        }
    }
}

/// What the backend confirmed. Only this ever touches the canonical set.
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmed {
    Created(Record),
    Updated(Record),
    Removed(RecordId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationTicket {
    pub epoch: u64,
    pub key: String,
    pub editor_session: Option<u64>,
    pub scope: Option<ScopeContext>,
    pub mutation: Mutation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Reconciled; carries the activity-log line when the resource keeps one.
    Applied { activity: Option<String> },
    Stale,
    Failed(Failure),
}

pub enum RowActionOutcome {
    EditorOpened,
    Mutation(MutationTicket),
}

/// Runs one mutation against the backend. Holds no screen state, so callers
/// can await it without keeping the screen borrowed.
pub async fn execute(source: &dyn DataSource, mutation: &Mutation) -> Result<Confirmed, Failure> {
    match mutation {
        Mutation::Create { payload } => source.create(payload).await.map(Confirmed::Created),
        Mutation::Update { id, payload } => source.update(id, payload).await.map(Confirmed::Updated),
        Mutation::Remove { id } => source.remove(id).await.map(|_| Confirmed::Removed(id.clone())),
        Mutation::Transition { id, patch, .. } => source
            .transition(id, patch)
            .await
            .map(|_| Confirmed::Removed(id.clone())),
    }
}

/// One CRUD screen: the canonical record set for the selected scope, the
/// filters and pager deriving the visible page, and the record editor.
pub struct Screen {
    def: ResourceDef,
    source: Rc<dyn DataSource>,
    selection: ScopeSelection,
    records: Vec<Record>,
    predicates: Vec<FilterPredicate>,
    pager: Pager,
    editor: Editor,
    fetch_seq: u64,
    loading: bool,
    in_flight: HashSet<String>,
    last_failure: Option<Failure>,
}

impl Screen {
    pub fn new(def: ResourceDef, source: Rc<dyn DataSource>, page_size: PageSize) -> Self {
        Self {
            def,
            source,
            selection: ScopeSelection::default(),
            records: Vec::new(),
            predicates: Vec::new(),
            pager: Pager::new(page_size),
            editor: Editor::new(),
            fetch_seq: 0,
            loading: false,
            in_flight: HashSet::new(),
            last_failure: None,
        }
    }

    pub fn source(&self) -> Rc<dyn DataSource> {
        Rc::clone(&self.source)
    }

    pub fn scope(&self) -> Option<&ScopeContext> {
        self.selection.current()
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// Unscoped resources are never gated; scoped ones wait for a selection.
    fn is_gated(&self) -> bool {
        self.def.endpoints.is_scoped() && self.selection.is_gated()
    }

    fn require_scope(&self) -> Result<Option<ScopeContext>, ScreenError> {
        match self.scope() {
            Some(scope) => Ok(Some(scope.clone())),
            None if self.def.endpoints.is_scoped() => Err(ScreenError::NoScope),
            None => Ok(None),
        }
    }

    fn visible(&self) -> Vec<&Record> {
        filter::apply(&self.records, &self.predicates)
    }

    fn clamp(&mut self) {
        let total = self.visible().len();
        self.pager.clamp(total);
    }

    /// The single invalidation point: everything derived from the previous
    /// scope is dropped before any new data can arrive. Outstanding
    /// mutations keep their records claimed until their own results land.
    pub fn select_scope(&mut self, scope: Option<ScopeContext>) -> Option<FetchTicket> {
        let epoch = self.selection.select(scope);
        self.records.clear();
        self.predicates.clear();
        self.pager.reset();
        self.editor.cancel();
        self.last_failure = None;
        self.loading = false;
        tracing::debug!(resource = %self.def.name, epoch, scope = ?self.scope().map(|s| &s.id), "scope changed");
        self.refresh().ok()
    }

    pub fn refresh(&mut self) -> Result<FetchTicket, ScreenError> {
        let scope_id = self.require_scope()?.map(|s| s.id);
        self.fetch_seq += 1;
        self.loading = true;
        Ok(FetchTicket {
            epoch: self.selection.epoch(),
            seq: self.fetch_seq,
            scope_id,
        })
    }

    fn is_current_fetch(&self, ticket: &FetchTicket) -> bool {
        ticket.epoch == self.selection.epoch() && ticket.seq == self.fetch_seq
    }

    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Record>, Failure>,
    ) -> FetchOutcome {
        if !self.is_current_fetch(ticket) {
            tracing::debug!(resource = %self.def.name, scope = ?ticket.scope_id, "discarding stale list response");
            return FetchOutcome::Stale;
        }
        self.loading = false;
        match result {
            Ok(records) => {
                let n = records.len();
                self.records = records;
                self.last_failure = None;
                self.clamp();
                tracing::info!(resource = %self.def.name, scope = ?ticket.scope_id, rows = n, "records loaded");
                FetchOutcome::Applied(n)
            }
            Err(failure) => {
                tracing::warn!(resource = %self.def.name, error = %failure, "list failed");
                self.last_failure = Some(failure.clone());
                FetchOutcome::Failed(failure)
            }
        }
    }

    pub fn set_filters(&mut self, predicates: Vec<FilterPredicate>) {
        self.predicates = predicates;
        self.clamp();
    }

    /// Builds predicates from the resource's search boxes, keyed by field id.
    pub fn set_search(&mut self, values: &Map<String, Value>) -> Result<(), String> {
        let mut predicates = Vec::new();
        for (field_id, value) in values {
            let search = self
                .def
                .search
                .iter()
                .find(|s| &s.field_id == field_id)
                .ok_or_else(|| format!("{} has no search on {field_id}", self.def.name))?;
            let text = scalar_text(value).unwrap_or_default();
            predicates.push(search.predicate(&text));
        }
        self.set_filters(predicates);
        Ok(())
    }

    pub fn reset_filters(&mut self) {
        self.set_filters(Vec::new());
    }

    pub fn set_page(&mut self, index: usize) {
        let total = self.visible().len();
        self.pager.set_page(index, total);
    }

    pub fn set_page_size(&mut self, size: PageSize) {
        let total = self.visible().len();
        self.pager.set_page_size(size, total);
    }

    fn find_row(&self, id: &str) -> Result<&Record, ScreenError> {
        self.records
            .iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| ScreenError::UnknownRow(id.to_string()))
    }

    fn require_offered(&self, kind: RowActionKind) -> Result<(), ScreenError> {
        if self.def.offers(kind) {
            return Ok(());
        }
        Err(ScreenError::NotOffered {
            resource: self.def.name.clone(),
            action: kind.as_str(),
        })
    }

    fn claim(&mut self, key: &str) -> Result<(), ScreenError> {
        if !self.in_flight.insert(key.to_string()) {
            return Err(ScreenError::Busy(key.to_string()));
        }
        Ok(())
    }

    pub fn row_action(&mut self, kind: RowActionKind, id: &str) -> Result<RowActionOutcome, ScreenError> {
        let scope = self.require_scope()?;
        self.require_offered(kind)?;
        let row = self.find_row(id)?.clone();
        let mutation = match kind {
            RowActionKind::Edit => {
                self.editor.open_edit(&row)?;
                return Ok(RowActionOutcome::EditorOpened);
            }
            RowActionKind::View => {
                self.editor.open_view(&row)?;
                return Ok(RowActionOutcome::EditorOpened);
            }
            RowActionKind::Delete => Mutation::Remove { id: row.id().to_string() },
            RowActionKind::Withdraw | RowActionKind::Reinstate => {
                let mut patch = Map::new();
                patch.insert("withdraw".into(), Value::Bool(kind == RowActionKind::Withdraw));
                Mutation::Transition {
                    kind,
                    id: row.id().to_string(),
                    patch,
                }
            }
        };
        self.claim(row.id())?;
        Ok(RowActionOutcome::Mutation(MutationTicket {
            epoch: self.selection.epoch(),
            key: row.id().to_string(),
            editor_session: None,
            scope,
            mutation,
        }))
    }

    pub fn open_add(&mut self) -> Result<(), ScreenError> {
        self.require_scope()?;
        if !self.def.can_create() {
            return Err(ScreenError::NotOffered {
                resource: self.def.name.clone(),
                action: "create",
            });
        }
        self.editor.open_add(&self.def.form)?;
        Ok(())
    }

    pub fn set_field(&mut self, field: &str, value: Value) -> Result<(), ScreenError> {
        self.editor.set_field(&self.def.form, field, value)?;
        Ok(())
    }

    pub fn cancel_editor(&mut self) {
        self.editor.cancel();
    }

    pub fn begin_commit(&mut self) -> Result<MutationTicket, ScreenError> {
        let scope = self.require_scope()?;
        if let Some(target) = self.editor.target() {
            if self.in_flight.contains(target) {
                return Err(ScreenError::Busy(target.to_string()));
            }
        }
        let ticket = self.editor.begin_commit(&self.def.form)?;
        self.claim(&ticket.key)?;

        let stamp = |mut payload: Map<String, Value>| {
            if let (Some(field), Some(scope)) = (&self.def.scope_field, &scope) {
                payload.insert(field.clone(), Value::String(scope.id.clone()));
            }
            payload
        };
        let mutation = match ticket.request {
            CommitRequest::Create { payload } => Mutation::Create {
                payload: stamp(payload),
            },
            CommitRequest::Update { id, payload } => Mutation::Update {
                id,
                payload: stamp(payload),
            },
        };
        Ok(MutationTicket {
            epoch: self.selection.epoch(),
            key: ticket.key,
            editor_session: Some(ticket.session),
            scope,
            mutation,
        })
    }

    /// Lands a mutation result. Failures leave the canonical set untouched;
    /// a confirmation is reconciled exactly once.
    pub fn complete_mutation(
        &mut self,
        ticket: &MutationTicket,
        result: Result<Confirmed, Failure>,
    ) -> MutationOutcome {
        // The call is over whatever scope is showing now.
        self.in_flight.remove(&ticket.key);
        if ticket.epoch != self.selection.epoch() {
            tracing::debug!(resource = %self.def.name, key = %ticket.key, "discarding mutation result from a previous scope");
            return MutationOutcome::Stale;
        }
        if let Some(session) = ticket.editor_session {
            self.editor
                .finish_commit(session, result.as_ref().map(|_| ()));
        }

        let confirmed = match result {
            Ok(confirmed) => confirmed,
            Err(failure) => {
                tracing::warn!(resource = %self.def.name, key = %ticket.key, op = ticket.mutation.verb(), error = %failure, "mutation failed");
                self.last_failure = Some(failure.clone());
                return MutationOutcome::Failed(failure);
            }
        };
        let label = self.reconcile(confirmed);
        self.last_failure = None;
        self.clamp();
        tracing::info!(resource = %self.def.name, key = %ticket.key, op = ticket.mutation.verb(), "mutation confirmed");

        let activity = match &ticket.scope {
            Some(scope) if self.def.activity_log => {
                activity_line(&self.def.noun, &ticket.mutation, &label, &scope.name)
            }
            _ => None,
        };
        MutationOutcome::Applied { activity }
    }

    /// Applies a confirmation and returns the display name of the row it touched.
    fn reconcile(&mut self, confirmed: Confirmed) -> String {
        match confirmed {
            Confirmed::Created(record) => {
                let label = display_name(&record);
                self.records.retain(|r| r.id() != record.id());
                self.records.insert(0, record);
                label
            }
            Confirmed::Updated(record) => match self.records.iter_mut().find(|r| r.id() == record.id()) {
                Some(existing) => {
                    *existing = existing.merged_with(record.fields());
                    display_name(existing)
                }
                None => display_name(&record),
            },
            Confirmed::Removed(id) => {
                let label = self
                    .records
                    .iter()
                    .find(|r| r.id() == id)
                    .map(display_name)
                    .unwrap_or_else(|| id.clone());
                self.records.retain(|r| r.id() != id);
                label
            }
        }
    }

    fn status_message(&self, total: usize) -> Option<String> {
        if self.is_gated() {
            return Some(GATED_MESSAGE.to_string());
        }
        (!self.loading && total == 0).then(|| self.def.empty_message.clone())
    }

    /// Current page of the derived view plus everything a screen renders.
    pub fn page_view(&self) -> Value {
        let visible = self.visible();
        let total = visible.len();
        let rows: Vec<Value> = self
            .pager
            .slice(&visible)
            .iter()
            .map(|r| {
                let cells: Vec<String> = self.def.columns.iter().map(|c| c.render(r.get(&c.id))).collect();
                json!({ "id": r.id(), "cells": cells, "record": r.to_value() })
            })
            .collect();
        let columns: Vec<Value> = self
            .def
            .columns
            .iter()
            .map(|c| json!({ "key": c.id, "label": c.label, "kind": c.kind }))
            .collect();

        json!({
            "resource": self.def.name,
            "title": self.def.title,
            "scope": self.scope(),
            "gated": self.is_gated(),
            "loading": self.loading,
            "message": self.status_message(total),
            "columns": columns,
            "rows": rows,
            "page": self.pager.info(total),
            "pageSizes": page_size_choices(),
            "filters": self.predicates,
            "search": self.def.search,
            "rowActions": self.def.row_actions,
            "canCreate": self.def.can_create(),
            "failure": self.last_failure.as_ref().map(Failure::to_json),
            "editor": self.editor.snapshot(),
        })
    }

    /// The filtered view, every page, as flat rendered rows.
    pub fn export(&self) -> Value {
        let headers = &self.def.export_headers;
        let rows: Vec<Value> = self
            .visible()
            .into_iter()
            .map(|r| {
                let row: Map<String, Value> = headers
                    .iter()
                    .map(|h| {
                        let date = self
                            .def
                            .field(&h.key)
                            .is_some_and(|f| f.kind == FieldKind::Date);
                        (h.key.clone(), Value::String(render_cell(r.get(&h.key), date)))
                    })
                    .collect();
                Value::Object(row)
            })
            .collect();
        json!({
            "fileName": format!("{}.pdf", self.def.export_name),
            "title": self.def.title,
            "scope": self.scope(),
            "headers": headers,
            "rows": rows,
        })
    }
}

fn display_name(record: &Record) -> String {
    ["name", "subjectName", "group_name"]
        .iter()
        .find_map(|k| record.get(k).and_then(scalar_text))
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| record.id().to_string())
}

fn capitalized(noun: &str) -> String {
    let mut chars = noun.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn activity_line(noun: &str, mutation: &Mutation, label: &str, school: &str) -> Option<String> {
    match mutation {
        Mutation::Create { .. } => Some(format!("New {noun} {label} added to school {school}")),
        Mutation::Update { .. } => Some(format!("{} {label} was updated in school {school}", capitalized(noun))),
        Mutation::Remove { .. } => Some(format!("{} {label} was deleted from school {school}", capitalized(noun))),
        Mutation::Transition { .. } => None,
    }
}

#[cfg(test)]
impl Screen {
    fn records(&self) -> &[Record] {
        &self.records
    }

    fn pager(&self) -> &Pager {
        &self.pager
    }

    fn last_failure(&self) -> Option<&Failure> {
        self.last_failure.as_ref()
    }
}

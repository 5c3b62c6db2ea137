use crate::record::{is_blank, FieldSpec, Record, RecordId};
use crate::source::Failure;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    #[default]
    Closed,
    Add,
    Edit,
    View,
}

impl EditorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Add => "add",
            Self::Edit => "edit",
            Self::View => "view",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("cannot {action} while the editor is {}", .mode.as_str())]
    InvalidTransition {
        action: &'static str,
        mode: EditorMode,
    },
    #[error("a save is already in progress")]
    Busy,
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("{0}")]
    Invalid(Failure),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitRequest {
    Create { payload: Map<String, Value> },
    Update { id: RecordId, payload: Map<String, Value> },
}

/// Handed out when a commit starts; carries what the DataSource call needs
/// and which editor session it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitTicket {
    pub session: u64,
    /// Busy-tracking key: the record id, or the draft id for a new record.
    pub key: String,
    pub request: CommitRequest,
}

/// Add/edit/view dialog over one form buffer. The buffer is always a copy,
/// so nothing typed here reaches the canonical set before a confirmed commit.
#[derive(Debug, Clone, Default)]
pub struct Editor {
    mode: EditorMode,
    buffer: Map<String, Value>,
    target: Option<RecordId>,
    draft: Option<Uuid>,
    busy: bool,
    failure: Option<Failure>,
    session: u64,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn require_closed(&self, action: &'static str) -> Result<(), EditorError> {
        match self.mode() {
            EditorMode::Closed => Ok(()),
            mode => Err(EditorError::InvalidTransition { action, mode }),
        }
    }

    fn open(&mut self, mode: EditorMode, buffer: Map<String, Value>, target: Option<RecordId>) {
        self.session += 1;
        self.mode = mode;
        self.buffer = buffer;
        self.target = target;
        self.draft = (mode == EditorMode::Add).then(Uuid::new_v4);
        self.busy = false;
        self.failure = None;
    }

    pub fn open_add(&mut self, form: &[FieldSpec]) -> Result<(), EditorError> {
        self.require_closed("create a record")?;
        let buffer = form
            .iter()
            .map(|f| (f.id.clone(), f.default_value()))
            .collect();
        self.open(EditorMode::Add, buffer, None);
        Ok(())
    }

    pub fn open_edit(&mut self, record: &Record) -> Result<(), EditorError> {
        self.require_closed("edit a record")?;
        self.open(
            EditorMode::Edit,
            record.fields().clone(),
            Some(record.id().to_string()),
        );
        Ok(())
    }

    pub fn open_view(&mut self, record: &Record) -> Result<(), EditorError> {
        self.require_closed("view a record")?;
        self.open(
            EditorMode::View,
            record.fields().clone(),
            Some(record.id().to_string()),
        );
        Ok(())
    }

    pub fn set_field(
        &mut self,
        form: &[FieldSpec],
        field: &str,
        value: Value,
    ) -> Result<(), EditorError> {
        match self.mode() {
            EditorMode::Add | EditorMode::Edit => {}
            mode => {
                return Err(EditorError::InvalidTransition {
                    action: "change a field",
                    mode,
                })
            }
        }
        if self.busy {
            return Err(EditorError::Busy);
        }
        if !form.iter().any(|f| f.id == field) {
            return Err(EditorError::UnknownField(field.to_string()));
        }
        self.buffer.insert(field.to_string(), value);
        Ok(())
    }

    /// Labels of required fields (and the identifier in edit mode) that are blank.
    fn missing_fields(&self, form: &[FieldSpec]) -> Vec<String> {
        let mut missing = Vec::new();
        if self.mode() == EditorMode::Edit && self.target.as_deref().map_or(true, |t| t.trim().is_empty()) {
            missing.push("id".to_string());
        }
        missing.extend(
            form.iter()
                .filter(|f| f.required && is_blank(self.buffer.get(&f.id)))
                .map(|f| f.id.clone()),
        );
        missing
    }

    /// Validates and marks the editor busy. A validation failure is kept on
    /// the editor and no DataSource call should be made.
    pub fn begin_commit(&mut self, form: &[FieldSpec]) -> Result<CommitTicket, EditorError> {
        let mode = self.mode();
        if !matches!(mode, EditorMode::Add | EditorMode::Edit) {
            return Err(EditorError::InvalidTransition {
                action: "save",
                mode,
            });
        }
        if self.busy {
            return Err(EditorError::Busy);
        }

        let missing = self.missing_fields(form);
        if !missing.is_empty() {
            let failure = Failure::Validation {
                message: format!("required fields are empty: {}", missing.join(", ")),
                fields: missing,
            };
            self.failure = Some(failure.clone());
            return Err(EditorError::Invalid(failure));
        }

        let payload: Map<String, Value> = form
            .iter()
            .map(|f| {
                let v = self.buffer.get(&f.id).cloned().unwrap_or_else(|| f.default_value());
                (f.id.clone(), v)
            })
            .collect();
        let (key, request) = match (mode, &self.target, &self.draft) {
            (EditorMode::Edit, Some(id), _) => (
                id.clone(),
                CommitRequest::Update {
                    id: id.clone(),
                    payload,
                },
            ),
            (_, _, Some(draft)) => (draft.to_string(), CommitRequest::Create { payload }),
            _ => (Uuid::new_v4().to_string(), CommitRequest::Create { payload }),
        };

        self.busy = true;
        self.failure = None;
        Ok(CommitTicket {
            session: self.session,
            key,
            request,
        })
    }

    /// Applies a commit outcome. Results from an editor session that was
    /// cancelled or replaced are ignored and `false` is returned.
    pub fn finish_commit(&mut self, session: u64, outcome: Result<(), &Failure>) -> bool {
        if session != self.session || !self.busy {
            return false;
        }
        match outcome {
            Ok(()) => self.close(),
            Err(failure) => {
                self.busy = false;
                self.failure = Some(failure.clone());
            }
        }
        true
    }

    /// Discards the buffer unconditionally.
    pub fn cancel(&mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.session += 1;
        self.mode = EditorMode::Closed;
        self.buffer.clear();
        self.target = None;
        self.draft = None;
        self.busy = false;
        self.failure = None;
    }

    pub fn snapshot(&self) -> Value {
        json!({
            "mode": self.mode(),
            "buffer": self.buffer,
            "target": self.target,
            "busy": self.busy,
            "failure": self.failure.as_ref().map(Failure::to_json),
        })
    }
}

#[cfg(test)]
impl Editor {
    pub(crate) fn buffer(&self) -> &Map<String, Value> {
        &self.buffer
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy
    }

    pub(crate) fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }
}

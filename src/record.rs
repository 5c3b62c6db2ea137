use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type RecordId = String;

/// One row fetched from the backend. The identifier is pulled out of the
/// resource's id field at construction so every record is addressable.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    fields: Map<String, Value>,
}

impl Record {
    /// Returns `None` for non-objects and for objects whose id field is
    /// missing, blank or not a scalar.
    pub fn from_value(value: Value, id_field: &str) -> Option<Self> {
        let Value::Object(fields) = value else {
            return None;
        };
        let id = fields.get(id_field).and_then(scalar_text)?;
        if id.trim().is_empty() {
            return None;
        }
        Some(Self { id, fields })
    }

    pub fn from_fields(id: impl Into<RecordId>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Payload fields win over the current ones; the id is kept.
    pub fn merged_with(&self, patch: &Map<String, Value>) -> Self {
        let mut fields = self.fields.clone();
        for (k, v) in patch {
            fields.insert(k.clone(), v.clone());
        }
        Self {
            id: self.id.clone(),
            fields,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// Text form of a JSON scalar. Null, arrays and objects have none.
pub fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Select,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub name: String,
}

impl SelectOption {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub id: String,
    pub label: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    pub fn text(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind: FieldKind::Text,
            options: Vec::new(),
            required: false,
        }
    }

    pub fn select(id: &str, label: &str, options: Vec<SelectOption>) -> Self {
        Self {
            kind: FieldKind::Select,
            options,
            ..Self::text(id, label)
        }
    }

    pub fn date(id: &str, label: &str) -> Self {
        Self {
            kind: FieldKind::Date,
            ..Self::text(id, label)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Initial buffer value for a fresh record in the editor.
    pub fn default_value(&self) -> Value {
        match self.kind {
            FieldKind::Text | FieldKind::Select => Value::String(String::new()),
            FieldKind::Date => Value::Null,
        }
    }

    pub fn render(&self, v: Option<&Value>) -> String {
        render_cell(v, self.kind == FieldKind::Date)
    }
}

/// True when a required field holds nothing a user typed.
pub fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(_) => false,
    }
}

/// Display text for one cell. Timestamps render as `D MMMM YYYY` wherever
/// they appear; plain `YYYY-MM-DD` only in date columns.
pub fn render_cell(v: Option<&Value>, date_column: bool) -> String {
    let Some(v) = v else {
        return "-".to_string();
    };
    match v {
        Value::Null => "-".to_string(),
        Value::String(s) if s.trim().is_empty() => "-".to_string(),
        Value::String(s) => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return ts.format("%-d %B %Y").to_string();
            }
            if date_column {
                if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    return d.format("%-d %B %Y").to_string();
                }
            }
            s.clone()
        }
        Value::Object(obj) => ["name", "subject_name"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(scalar_text))
            .unwrap_or_else(|| "-".to_string()),
        Value::Array(items) if items.is_empty() => "-".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|i| render_cell(Some(i), date_column))
            .collect::<Vec<_>>()
            .join(", "),
        other => scalar_text(other).unwrap_or_else(|| "-".to_string()),
    }
}

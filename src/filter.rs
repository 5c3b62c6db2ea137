use crate::record::{scalar_text, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Matcher {
    Substring,
    Equals,
}

/// One search constraint. `or_fields` widens a single search box to several
/// columns (name or surname); the predicate holds if any referenced field
/// matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPredicate {
    pub field_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub or_fields: Vec<String>,
    pub matcher: Matcher,
    #[serde(default)]
    pub value: Value,
}

impl FilterPredicate {
    pub fn substring(field_id: &str, value: &str) -> Self {
        Self {
            field_id: field_id.to_string(),
            or_fields: Vec::new(),
            matcher: Matcher::Substring,
            value: Value::String(value.to_string()),
        }
    }

    pub fn equals(field_id: &str, value: &str) -> Self {
        Self {
            matcher: Matcher::Equals,
            ..Self::substring(field_id, value)
        }
    }

    pub fn or_field(mut self, field_id: &str) -> Self {
        self.or_fields.push(field_id.to_string());
        self
    }

    /// Lowercased search text, or `None` when the predicate constrains nothing
    /// and is dropped before matching.
    fn needle(&self) -> Option<String> {
        let text = scalar_text(&self.value)?;
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(text.to_lowercase())
    }

    fn fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.field_id.as_str()).chain(self.or_fields.iter().map(String::as_str))
    }

    fn matches_with(&self, needle: &str, record: &Record) -> bool {
        self.fields().any(|field| {
            let Some(hay) = record.get(field).and_then(scalar_text) else {
                return false;
            };
            let hay = hay.to_lowercase();
            match self.matcher {
                Matcher::Substring => hay.contains(needle),
                Matcher::Equals => hay.trim() == needle,
            }
        })
    }
}

/// Derives the visible subset. The input is only borrowed, so the canonical
/// set is untouched and feeding the output back in yields the same rows.
pub fn apply<'a, I>(records: I, predicates: &[FilterPredicate]) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    let active: Vec<(&FilterPredicate, String)> = predicates
        .iter()
        .filter_map(|p| p.needle().map(|n| (p, n)))
        .collect();

    records
        .into_iter()
        .filter(|r| active.iter().all(|(p, needle)| p.matches_with(needle, r)))
        .collect()
}

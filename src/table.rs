use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::num::NonZeroUsize;

/// Sizes offered by the page-size picker.
pub fn page_size_choices() -> Vec<PageSize> {
    [5, 10, 25]
        .into_iter()
        .filter_map(PageSize::rows)
        .chain(std::iter::once(PageSize::All))
        .collect()
}

/// Rows per page. `All` shows the whole derived view on one page.
/// On the wire: a positive number, or `"all"` / `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Rows(NonZeroUsize),
    All,
}

impl PageSize {
    pub fn rows(n: usize) -> Option<Self> {
        NonZeroUsize::new(n).map(Self::Rows)
    }

    /// Effective row count for `total` rows; never zero.
    fn effective(self, total: usize) -> usize {
        match self {
            Self::Rows(n) => n.get(),
            Self::All => total.max(1),
        }
    }
}

impl Serialize for PageSize {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Rows(n) => s.serialize_u64(n.get() as u64),
            Self::All => s.serialize_str("all"),
        }
    }
}

impl<'de> Deserialize<'de> for PageSize {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        let v = serde_json::Value::deserialize(d)?;
        match &v {
            serde_json::Value::String(s) if s.eq_ignore_ascii_case("all") => Ok(Self::All),
            serde_json::Value::Number(n) if n.as_i64() == Some(-1) => Ok(Self::All),
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .and_then(Self::rows)
                .ok_or_else(|| D::Error::custom(format!("page size must be positive, got {n}"))),
            other => Err(D::Error::custom(format!("invalid page size: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub index: usize,
    pub size: PageSize,
    pub total: usize,
    pub page_count: usize,
    /// 1-based first row shown, 0 when empty.
    pub from: usize,
    /// 1-based last row shown, 0 when empty.
    pub to: usize,
}

/// Page index and size over a derived view. Owns no rows; every call takes
/// the current row count so the index can be clamped against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    index: usize,
    size: PageSize,
}

impl Pager {
    pub fn new(size: PageSize) -> Self {
        Self { index: 0, size }
    }

    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.size.effective(total))
    }

    fn last_index(&self, total: usize) -> usize {
        self.page_count(total).saturating_sub(1)
    }

    /// Pull the index back onto the last valid page after the row count changed.
    pub fn clamp(&mut self, total: usize) {
        self.index = self.index.min(self.last_index(total));
    }

    pub fn set_page(&mut self, index: usize, total: usize) {
        self.index = index;
        self.clamp(total);
    }

    /// A new size always starts over at the first page.
    pub fn set_page_size(&mut self, size: PageSize, total: usize) {
        self.size = size;
        self.index = 0;
        self.clamp(total);
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    fn bounds(&self, total: usize) -> (usize, usize) {
        let size = self.size.effective(total);
        let index = self.index.min(self.last_index(total));
        let start = (index * size).min(total);
        let end = (start + size).min(total);
        (start, end)
    }

    pub fn slice<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        let (start, end) = self.bounds(rows.len());
        &rows[start..end]
    }

    pub fn info(&self, total: usize) -> PageInfo {
        let (start, end) = self.bounds(total);
        PageInfo {
            index: self.index.min(self.last_index(total)),
            size: self.size,
            total,
            page_count: self.page_count(total),
            from: if end > start { start + 1 } else { 0 },
            to: end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowActionKind {
    Edit,
    View,
    Delete,
    Withdraw,
    Reinstate,
}

impl RowActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::View => "view",
            Self::Delete => "delete",
            Self::Withdraw => "withdraw",
            Self::Reinstate => "reinstate",
        }
    }
}

#[cfg(test)]
impl Pager {
    pub(crate) fn index(&self) -> usize {
        self.index
    }
}

//! Query and document types shared by all storage backends.

use serde_json::{Map, Value};

/// A stored document: a JSON object whose `id` field is its primary key.
pub type Document = Map<String, Value>;

/// Name of the primary key field inside every [`Document`].
pub const ID_FIELD: &str = "id";

/// Returns the primary key of a document, if present and a string.
#[must_use]
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Predicate over the top-level fields of a document.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// Matches every document.
    #[default]
    All,
    /// Field equals the given JSON value exactly.
    Eq { field: String, value: Value },
    /// String field contains `needle`, compared case-insensitively.
    /// The needle is literal text, never a pattern.
    ContainsIgnoreCase { field: String, needle: String },
    /// Every inner filter matches.
    And(Vec<Filter>),
    /// At least one inner filter matches.
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::ContainsIgnoreCase {
            field: field.into(),
            needle: needle.into(),
        }
    }

    /// Case-insensitive substring match against any of `fields`.
    pub fn search(fields: &[&str], needle: &str) -> Self {
        Self::Or(fields.iter().map(|f| Self::contains(*f, needle)).collect())
    }

    /// Conjunction that keeps the tree flat and treats `All` as identity.
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), f) => {
                left.push(f);
                Filter::And(left)
            }
            (f, Filter::And(mut right)) => {
                right.insert(0, f);
                Filter::And(right)
            }
            (a, b) => Filter::And(vec![a, b]),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Filter::All)
    }
}

/// Sort direction for a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Sort by one top-level field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Sorting and windowing for `find`.
///
/// Ties on the sort field are broken by document id so that paging
/// over an unchanged collection is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub sort: Option<SortSpec>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    #[must_use]
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Result of an update by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
}

/// Result of a delete by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: u64,
}

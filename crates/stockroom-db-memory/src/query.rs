//! Filter evaluation and ordering over in-memory documents.

use std::cmp::Ordering;

use serde_json::Value;
use stockroom_storage::{Document, Filter, ID_FIELD, SortDirection, SortSpec};

/// Check if a document matches a filter.
pub fn matches(filter: &Filter, doc: &Document) -> bool {
    match filter {
        Filter::All => true,
        Filter::Eq { field, value } => match_exact(doc, field, value),
        Filter::ContainsIgnoreCase { field, needle } => match_contains(doc, field, needle),
        Filter::And(filters) => filters.iter().all(|f| matches(f, doc)),
        Filter::Or(filters) => filters.iter().any(|f| matches(f, doc)),
    }
}

fn match_exact(doc: &Document, field: &str, expected: &Value) -> bool {
    match (doc.get(field), expected) {
        (Some(Value::Number(a)), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Some(actual), expected) => actual == expected,
        (None, Value::Null) => true,
        (None, _) => false,
    }
}

fn match_contains(doc: &Document, field: &str, needle: &str) -> bool {
    match doc.get(field) {
        Some(Value::String(s)) => s.to_lowercase().contains(&needle.to_lowercase()),
        _ => false,
    }
}

/// Rank of a JSON type in the cross-type sort order.
///
/// Missing and null sort first, then numbers, strings, objects, arrays, booleans.
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order over optional JSON values used for sorting.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => {
            let ranks = type_rank(a).cmp(&type_rank(b));
            if ranks == Ordering::Equal {
                // Objects and arrays of equal rank: fall back to their serialized form.
                let x = a.map(Value::to_string).unwrap_or_default();
                let y = b.map(Value::to_string).unwrap_or_default();
                x.cmp(&y)
            } else {
                ranks
            }
        }
    }
}

/// Compares two documents by the sort spec, breaking ties by id.
pub fn compare_documents(a: &Document, b: &Document, sort: Option<&SortSpec>) -> Ordering {
    let primary = match sort {
        Some(spec) => {
            let ord = compare_values(a.get(&spec.field), b.get(&spec.field));
            match spec.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        }
        None => Ordering::Equal,
    };
    primary.then_with(|| compare_values(a.get(ID_FIELD), b.get(ID_FIELD)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn test_exact_match_compares_numbers_numerically() {
        let d = doc(json!({"id": "1", "stock": 5}));
        assert!(matches(&Filter::eq("stock", 5.0), &d));
        assert!(!matches(&Filter::eq("stock", 6), &d));
    }

    #[test]
    fn test_exact_match_is_case_sensitive() {
        let d = doc(json!({"id": "1", "category": "stationery"}));
        assert!(matches(&Filter::eq("category", "stationery"), &d));
        assert!(!matches(&Filter::eq("category", "Stationery"), &d));
    }

    #[test]
    fn test_contains_ignores_case_and_is_literal() {
        let d = doc(json!({"id": "1", "name": "Blue Ink Pen (x2)"}));
        assert!(matches(&Filter::contains("name", "ink pen"), &d));
        assert!(matches(&Filter::contains("name", "(X2)"), &d));
        assert!(!matches(&Filter::contains("name", "pen.*"), &d));
        assert!(!matches(&Filter::contains("missing", "pen"), &d));
    }

    #[test]
    fn test_or_and_combination() {
        let d = doc(json!({"id": "1", "name": "Ann", "email": "ann@example.com", "role": "user"}));
        let f = Filter::eq("role", "user").and(Filter::search(&["name", "email"], "EXAMPLE"));
        assert!(matches(&f, &d));

        let f = Filter::eq("role", "sub_admin").and(Filter::search(&["name", "email"], "ann"));
        assert!(!matches(&f, &d));
    }

    #[test]
    fn test_sort_numbers_and_tie_break_by_id() {
        let a = doc(json!({"id": "a", "price": 2.5}));
        let b = doc(json!({"id": "b", "price": 10}));
        let c = doc(json!({"id": "c", "price": 2.5}));
        let asc = SortSpec::ascending("price");

        assert_eq!(compare_documents(&a, &b, Some(&asc)), Ordering::Less);
        assert_eq!(compare_documents(&a, &c, Some(&asc)), Ordering::Less);

        let desc = SortSpec::descending("price");
        assert_eq!(compare_documents(&a, &b, Some(&desc)), Ordering::Greater);
        // Tie-break stays ascending by id regardless of direction.
        assert_eq!(compare_documents(&a, &c, Some(&desc)), Ordering::Less);
    }

    #[test]
    fn test_missing_fields_sort_first() {
        let with = doc(json!({"id": "a", "name": "Zed"}));
        let without = doc(json!({"id": "b"}));
        let asc = SortSpec::ascending("name");
        assert_eq!(compare_documents(&without, &with, Some(&asc)), Ordering::Less);
    }
}

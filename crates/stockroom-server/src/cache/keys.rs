//! Cache key construction.
//!
//! Detail keys use the singular kind (`product:{id}`); list keys use the
//! plural prefix so one prefix delete drops every cached listing,
//! including the refresher's `*:all` snapshot.

use std::borrow::Cow;

use crate::models::{ProductQuery, UserQuery};

pub const PRODUCT_LIST_PREFIX: &str = "products:";
pub const USER_LIST_PREFIX: &str = "users:";
pub const PRODUCTS_ALL_KEY: &str = "products:all";
pub const USERS_ALL_KEY: &str = "users:all";

pub fn product_key(id: &str) -> String {
    format!("product:{id}")
}

pub fn user_key(id: &str) -> String {
    format!("user:{id}")
}

/// Every list parameter is part of the key, so distinct query shapes
/// never share an entry.
pub fn product_list_key(query: &ProductQuery) -> String {
    format!(
        "{PRODUCT_LIST_PREFIX}p{}:l{}:cat{}:q{}:sort{}",
        query.page.page,
        query.page.limit,
        escape(query.category.as_deref()),
        escape(query.search.as_deref()),
        query.sort.as_str(),
    )
}

pub fn user_list_key(query: &UserQuery) -> String {
    format!(
        "{USER_LIST_PREFIX}p{}:l{}:role{}:q{}:sort{}",
        query.page.page,
        query.page.limit,
        query.role.map(|r| r.as_str()).unwrap_or_default(),
        escape(query.search.as_deref()),
        query.sort.as_str(),
    )
}

// `:` and `%` are percent-encoded so the key stays injective.
fn escape(value: Option<&str>) -> Cow<'_, str> {
    match value {
        None => Cow::Borrowed(""),
        Some(v) if !v.contains([':', '%']) => Cow::Borrowed(v),
        Some(v) => Cow::Owned(v.replace('%', "%25").replace(':', "%3A")),
    }
}

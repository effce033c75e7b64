//! Translation of document filters into parameterised SQL.

use serde_json::Value;
use sqlx_core::query::Query;
use sqlx_core::query_scalar::QueryScalar;
use sqlx_postgres::{PgArguments, Postgres};
use stockroom_storage::{Filter, FindOptions, SortDirection};

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Json(Value),
    Integer(i64),
}

/// SQL fragment with its positional parameters.
#[derive(Debug, Default)]
pub struct SqlBuilder {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl SqlBuilder {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Adds a parameter and returns its `$n` placeholder.
    pub fn push_param(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    pub fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Appends ` WHERE <filter>`.
    pub fn push_where(&mut self, filter: &Filter) {
        let condition = self.condition(filter);
        self.sql.push_str(" WHERE ");
        self.sql.push_str(&condition);
    }

    fn condition(&mut self, filter: &Filter) -> String {
        match filter {
            Filter::All => "TRUE".to_string(),
            Filter::Eq { field, value } => {
                let f = self.push_param(SqlValue::Text(field.clone()));
                if value.is_null() {
                    format!("(data -> {f} IS NULL OR data -> {f} = 'null'::jsonb)")
                } else {
                    let v = self.push_param(SqlValue::Json(value.clone()));
                    format!("data -> {f} = {v}")
                }
            }
            Filter::ContainsIgnoreCase { field, needle } => {
                let f = self.push_param(SqlValue::Text(field.clone()));
                let n = self.push_param(SqlValue::Text(needle.clone()));
                // strpos keeps the needle literal, unlike LIKE.
                format!("(jsonb_typeof(data -> {f}) = 'string' AND strpos(lower(data ->> {f}), lower({n})) > 0)")
            }
            Filter::And(filters) => self.join(filters, " AND ", "TRUE"),
            Filter::Or(filters) => self.join(filters, " OR ", "FALSE"),
        }
    }

    fn join(&mut self, filters: &[Filter], op: &str, empty: &str) -> String {
        if filters.is_empty() {
            return empty.to_string();
        }
        let parts: Vec<String> = filters.iter().map(|f| self.condition(f)).collect();
        format!("({})", parts.join(op))
    }

    /// Appends ORDER BY, LIMIT and OFFSET.
    ///
    /// Missing fields sort first ascending and last descending, with id as tie-break.
    pub fn push_options(&mut self, options: &FindOptions) {
        match &options.sort {
            Some(sort) => {
                let f = self.push_param(SqlValue::Text(sort.field.clone()));
                let direction = match sort.direction {
                    SortDirection::Ascending => "ASC NULLS FIRST",
                    SortDirection::Descending => "DESC NULLS LAST",
                };
                self.sql
                    .push_str(&format!(" ORDER BY data -> {f} {direction}, id ASC"));
            }
            None => self.sql.push_str(" ORDER BY id ASC"),
        }

        if let Some(limit) = options.limit {
            let p = self.push_param(SqlValue::Integer(clamp_i64(limit)));
            self.sql.push_str(&format!(" LIMIT {p}"));
        }
        if options.skip > 0 {
            let p = self.push_param(SqlValue::Integer(clamp_i64(options.skip)));
            self.sql.push_str(&format!(" OFFSET {p}"));
        }
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Binds every parameter onto a query.
pub fn bind_query<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Json(v) => query.bind(v.clone()),
            SqlValue::Integer(i) => query.bind(*i),
        };
    }
    query
}

/// Binds every parameter onto a scalar query.
pub fn bind_scalar<'q, O>(
    mut query: QueryScalar<'q, Postgres, O, PgArguments>,
    params: &[SqlValue],
) -> QueryScalar<'q, Postgres, O, PgArguments> {
    for param in params {
        query = match param {
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Json(v) => query.bind(v.clone()),
            SqlValue::Integer(i) => query.bind(*i),
        };
    }
    query
}

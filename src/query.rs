//! List-query composer.
//!
//! Every list endpoint accepts the same loosely-typed query string: a free-text
//! `searchTerm`, arbitrary `field=value` equality filters, a comma-separated `sort`
//! (a leading `-` sorts descending), `page`/`limit` pagination and a comma-separated
//! `fields` projection. [`ListQuery`] turns that bag into a parameterised Postgres
//! statement step by step:
//!
//! ```ignore
//! let query = ListQuery::new(&EVENT_RESOURCE, params)
//!     .where_not("archived", Value::Boolean(true))?
//!     .search(EVENT_SEARCHABLE_FIELDS)?
//!     .filter()?
//!     .sort()?
//!     .paginate()
//!     .fields()?;
//! ```
//!
//! Identifiers written into the SQL always come from the static [`Resource`] column
//! table. Request input only ever reaches the database as bound parameters.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// The raw, untyped query-string bag.
pub type QueryParams = HashMap<String, String>;

pub const SEARCH_TERM: &str = "searchTerm";
const RESERVED_KEYS: [&str; 5] = [SEARCH_TERM, "sort", "limit", "page", "fields"];

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;
/// Highest page served; keeps `(page - 1) * limit` inside `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid value {value:?} for field {field}")]
    InvalidValue { field: String, value: String },

    #[error("Projection cannot mix included and excluded fields")]
    MixedProjection,
}

/// How a filter value is parsed before it is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Boolean,
    Date,
    Timestamp,
    Uuid,
    /// A `text[]` column; a filter matches rows whose array contains the value.
    TextArray,
    /// A text column restricted to a fixed set of labels.
    Label(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Non-selectable columns (password hashes) never appear in a projection.
    pub selectable: bool,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            selectable: true,
        }
    }

    pub const fn hidden(self) -> Self {
        Self {
            selectable: false,
            ..self
        }
    }
}

/// Static description of a listable table.
#[derive(Debug)]
pub struct Resource {
    pub table: &'static str,
    pub columns: &'static [Column],
    /// Sort applied when the request has none, in `sort` parameter syntax.
    pub default_sort: &'static str,
}

impl Resource {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }
}

/// A typed bind value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(&'static str, Value),
    /// `IS DISTINCT FROM`, so NULLs are kept.
    NotEq(&'static str, Value),
    /// Array membership: `$n = ANY(column)`.
    Contains(&'static str, Value),
    /// Case-insensitive substring match on any of the columns.
    Search(Vec<&'static str>, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: &'static str,
    pub order: SortOrder,
}

/// Pagination block returned next to every list result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_page: i64,
}

/// A list query under construction. See the module documentation for the call order.
#[derive(Debug, Clone)]
pub struct ListQuery {
    resource: &'static Resource,
    params: QueryParams,
    conditions: Vec<Condition>,
    sort: Vec<SortKey>,
    page: i64,
    limit: i64,
    paginated: bool,
    projection: Vec<&'static str>,
}

impl ListQuery {
    pub fn new(resource: &'static Resource, params: QueryParams) -> Self {
        Self {
            resource,
            params,
            conditions: Vec::new(),
            sort: Vec::new(),
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            paginated: false,
            projection: selectable_columns(resource),
        }
    }

    /// Adds a fixed equality condition the request cannot lift.
    pub fn where_eq(mut self, column: &str, value: Value) -> Result<Self, QueryError> {
        let column = self.lookup(column)?;
        self.conditions.push(Condition::Eq(column.name, value));
        Ok(self)
    }

    /// Adds a fixed inequality condition the request cannot lift.
    pub fn where_not(mut self, column: &str, value: Value) -> Result<Self, QueryError> {
        let column = self.lookup(column)?;
        self.conditions.push(Condition::NotEq(column.name, value));
        Ok(self)
    }

    /// Matches `searchTerm` as a case-insensitive substring of any of `fields`.
    pub fn search(mut self, fields: &[&str]) -> Result<Self, QueryError> {
        let term = self
            .params
            .get(SEARCH_TERM)
            .map(|term| term.trim())
            .filter(|term| !term.is_empty())
            .map(like_pattern);

        if let Some(pattern) = term {
            let columns = fields
                .iter()
                .map(|field| self.lookup(field).map(|column| column.name))
                .collect::<Result<Vec<_>, _>>()?;
            if !columns.is_empty() {
                self.conditions.push(Condition::Search(columns, pattern));
            }
        }
        Ok(self)
    }

    /// Turns every non-reserved parameter into an equality condition.
    pub fn filter(mut self) -> Result<Self, QueryError> {
        let mut keys: Vec<&String> = self
            .params
            .keys()
            .filter(|key| !RESERVED_KEYS.contains(&key.as_str()))
            .collect();
        // HashMap order is random; keep the generated SQL stable.
        keys.sort();

        let mut added = Vec::with_capacity(keys.len());
        for key in keys {
            let column = self.lookup_visible(key)?;
            let value = parse_value(column, &self.params[key])?;
            added.push(match column.kind {
                ColumnKind::TextArray => Condition::Contains(column.name, value),
                _ => Condition::Eq(column.name, value),
            });
        }
        self.conditions.extend(added);
        Ok(self)
    }

    /// Applies `sort`, or the resource's default sort when it is absent.
    pub fn sort(mut self) -> Result<Self, QueryError> {
        let raw = self
            .params
            .get("sort")
            .map(String::as_str)
            .filter(|raw| !raw.trim().is_empty())
            .unwrap_or(self.resource.default_sort);

        let mut keys = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let (name, order) = match entry.strip_prefix('-') {
                Some(name) => (name, SortOrder::Descending),
                None => (entry, SortOrder::Ascending),
            };
            let column = self.lookup_visible(name)?;
            keys.push(SortKey {
                column: column.name,
                order,
            });
        }
        self.sort = keys;
        Ok(self)
    }

    /// Reads `page` and `limit`. Anything that is not a positive integer falls back to
    /// the default; `limit` is capped at [`MAX_LIMIT`] and `page` at [`MAX_PAGE`].
    pub fn paginate(mut self) -> Self {
        let positive = |key: &str| {
            self.params
                .get(key)
                .and_then(|raw| raw.trim().parse::<i64>().ok())
                .filter(|n| *n > 0)
        };
        self.page = positive("page").unwrap_or(DEFAULT_PAGE).min(MAX_PAGE);
        self.limit = positive("limit").unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        self.paginated = true;
        self
    }

    /// Applies `fields`. `title,date` keeps only those columns (plus `id`); `-notes`
    /// drops the listed columns.
    pub fn fields(mut self) -> Result<Self, QueryError> {
        let Some(raw) = self.params.get("fields") else {
            return Ok(self);
        };
        let entries: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect();
        if entries.is_empty() {
            return Ok(self);
        }

        let excluded = entries.iter().filter(|entry| entry.starts_with('-')).count();
        let projection: Vec<&'static str> = if excluded == entries.len() {
            let mut dropped = Vec::with_capacity(entries.len());
            for entry in &entries {
                dropped.push(self.lookup(&entry[1..])?.name);
            }
            selectable_columns(self.resource)
                .into_iter()
                .filter(|name| !dropped.contains(name))
                .collect()
        } else if excluded > 0 {
            return Err(QueryError::MixedProjection);
        } else {
            let mut kept = vec!["id"];
            for entry in &entries {
                let column = self.lookup(entry)?;
                if !column.selectable {
                    return Err(QueryError::UnknownField(entry.to_string()));
                }
                if !kept.contains(&column.name) {
                    kept.push(column.name);
                }
            }
            kept
        };

        self.projection = projection;
        Ok(self)
    }

    /// The page query. Each row is a single `doc` column holding the projected record
    /// as JSON.
    pub fn build_select(&self) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new("SELECT jsonb_build_object(");
        for (i, name) in self.projection.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(format!("'{name}', \"{name}\""));
        }
        builder.push(format!(") AS doc FROM \"{}\"", self.resource.table));
        self.push_where(&mut builder);

        for (i, key) in self.sort.iter().enumerate() {
            builder.push(if i == 0 { " ORDER BY " } else { ", " });
            builder.push(format!("\"{}\"", key.column));
            builder.push(match key.order {
                SortOrder::Ascending => " ASC",
                SortOrder::Descending => " DESC",
            });
        }

        if self.paginated {
            builder.push(" LIMIT ");
            builder.push_bind(self.limit);
            builder.push(" OFFSET ");
            builder.push_bind(self.offset());
        }
        builder
    }

    /// The total-count query: same predicates, no sort, pagination or projection.
    pub fn build_count(&self) -> QueryBuilder<'static, Postgres> {
        let mut builder =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM \"{}\"", self.resource.table));
        self.push_where(&mut builder);
        builder
    }

    pub fn meta(&self, total: i64) -> PageMeta {
        PageMeta {
            page: self.page,
            limit: self.limit,
            total,
            total_page: (total + self.limit - 1) / self.limit,
        }
    }

    pub fn resource(&self) -> &'static Resource {
        self.resource
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn projection(&self) -> &[&'static str] {
        &self.projection
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    fn lookup(&self, name: &str) -> Result<&'static Column, QueryError> {
        let resource: &'static Resource = self.resource;
        resource
            .column(name)
            .ok_or_else(|| QueryError::UnknownField(name.to_string()))
    }

    /// Like `lookup`, but hidden columns are reported as unknown so request input can
    /// never touch them.
    fn lookup_visible(&self, name: &str) -> Result<&'static Column, QueryError> {
        self.lookup(name)
            .ok()
            .filter(|column| column.selectable)
            .ok_or_else(|| QueryError::UnknownField(name.to_string()))
    }

    fn push_where(&self, builder: &mut QueryBuilder<'static, Postgres>) {
        for (i, condition) in self.conditions.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            match condition {
                Condition::Eq(column, value) => {
                    builder.push(format!("\"{column}\" = "));
                    push_value(builder, value.clone());
                }
                Condition::NotEq(column, value) => {
                    builder.push(format!("\"{column}\" IS DISTINCT FROM "));
                    push_value(builder, value.clone());
                }
                Condition::Contains(column, value) => {
                    push_value(builder, value.clone());
                    builder.push(format!(" = ANY(\"{column}\")"));
                }
                Condition::Search(columns, pattern) => {
                    builder.push("(");
                    for (j, column) in columns.iter().enumerate() {
                        if j > 0 {
                            builder.push(" OR ");
                        }
                        builder.push(format!("\"{column}\" ILIKE "));
                        builder.push_bind(pattern.clone());
                    }
                    builder.push(")");
                }
            }
        }
    }
}

fn selectable_columns(resource: &Resource) -> Vec<&'static str> {
    resource
        .columns
        .iter()
        .filter(|column| column.selectable)
        .map(|column| column.name)
        .collect()
}

fn push_value(builder: &mut QueryBuilder<'static, Postgres>, value: Value) {
    match value {
        Value::Text(v) => builder.push_bind(v),
        Value::Integer(v) => builder.push_bind(v),
        Value::Boolean(v) => builder.push_bind(v),
        Value::Date(v) => builder.push_bind(v),
        Value::Timestamp(v) => builder.push_bind(v),
        Value::Uuid(v) => builder.push_bind(v),
    };
}

/// Wraps a search term in `%...%`, escaping LIKE metacharacters so it matches literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn parse_value(column: &Column, raw: &str) -> Result<Value, QueryError> {
    let invalid = || QueryError::InvalidValue {
        field: column.name.to_string(),
        value: raw.to_string(),
    };
    let trimmed = raw.trim();

    match column.kind {
        ColumnKind::Text | ColumnKind::TextArray => Ok(Value::Text(raw.to_string())),
        ColumnKind::Integer => trimmed.parse().map(Value::Integer).map_err(|_| invalid()),
        ColumnKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Boolean(true)),
            "false" => Ok(Value::Boolean(false)),
            _ => Err(invalid()),
        },
        ColumnKind::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| invalid()),
        ColumnKind::Timestamp => DateTime::parse_from_rfc3339(trimmed)
            .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
            .map_err(|_| invalid()),
        ColumnKind::Uuid => Uuid::parse_str(trimmed)
            .map(Value::Uuid)
            .map_err(|_| invalid()),
        ColumnKind::Label(labels) => labels
            .iter()
            .find(|label| **label == trimmed)
            .map(|label| Value::Text(label.to_string()))
            .ok_or_else(invalid),
    }
}

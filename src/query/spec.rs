use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::filter::{FilterExpression, RawParams, translate};
use super::types::{Expansion, FindOptions, Projection, SortSpec};
use crate::errors::ApiError;
use crate::types::CREATED_AT_FIELD;

pub const DEFAULT_PAGE_SIZE: u64 = 25;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Page-size bounds applied when building a [`QuerySpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self { default_page_size: DEFAULT_PAGE_SIZE, max_page_size: MAX_PAGE_SIZE }
    }
}

/// Everything a list read needs: predicate, projection, order, page window and the
/// relations the route allows to be inlined. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    filter: FilterExpression,
    projection: Projection,
    sort: Vec<SortSpec>,
    page: u64,
    page_size: u64,
    expansions: Vec<Expansion>,
}

impl QuerySpec {
    /// Builds the query for one request. `expansions` come from the route, never from
    /// the client.
    ///
    /// # Errors
    /// `ApiError::Validation` for malformed filters, empty select/sort entries, or a
    /// `page`/`limit` that is not a positive integer. An oversized `limit` is clamped.
    pub fn build(
        params: &RawParams,
        limits: &QueryLimits,
        expansions: &[Expansion],
    ) -> Result<Self, ApiError> {
        let filter = translate(params)?;
        let projection = match params.get("select") {
            Some(raw) => Projection::Fields(parse_select(raw)?),
            None => Projection::All,
        };
        let sort = match params.get("sort") {
            Some(raw) => parse_sort(raw)?,
            None => vec![SortSpec::desc(CREATED_AT_FIELD)],
        };
        let page = match params.get("page") {
            Some(raw) => parse_positive("page", raw)?,
            None => 1,
        };
        let max = limits.max_page_size.max(1);
        let page_size = match params.get("limit") {
            Some(raw) => parse_positive("limit", raw)?.min(max),
            None => limits.default_page_size.clamp(1, max),
        };
        Ok(Self { filter, projection, sort, page, page_size, expansions: expansions.to_vec() })
    }

    #[must_use]
    pub const fn filter(&self) -> &FilterExpression {
        &self.filter
    }

    #[must_use]
    pub const fn projection(&self) -> &Projection {
        &self.projection
    }

    #[must_use]
    pub fn sort(&self) -> &[SortSpec] {
        &self.sort
    }

    #[must_use]
    pub const fn page(&self) -> u64 {
        self.page
    }

    #[must_use]
    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    #[must_use]
    pub fn expansions(&self) -> &[Expansion] {
        &self.expansions
    }

    /// Records to skip before the current page.
    #[must_use]
    pub const fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    #[must_use]
    pub fn find_options(&self, deadline: Option<Instant>) -> FindOptions {
        FindOptions {
            projection: self.projection.clone(),
            sort: self.sort.clone(),
            skip: self.skip(),
            limit: Some(self.page_size),
            expand: self.expansions.clone(),
            deadline,
        }
    }
}

fn split_list<'a>(name: &str, raw: &'a str) -> Result<Vec<&'a str>, ApiError> {
    let items: Vec<&str> = raw.split(',').map(str::trim).collect();
    if items.iter().any(|s| s.is_empty()) {
        return Err(ApiError::validation(name, "empty entry in field list"));
    }
    Ok(items)
}

fn check_field_name(name: &str, field: &str) -> Result<(), ApiError> {
    if field.starts_with('$') || field.contains(['[', ']']) {
        return Err(ApiError::validation(name, format!("invalid field name '{field}'")));
    }
    Ok(())
}

fn parse_select(raw: &str) -> Result<Vec<String>, ApiError> {
    let mut fields: Vec<String> = Vec::new();
    for f in split_list("select", raw)? {
        check_field_name("select", f)?;
        if !fields.iter().any(|x| x == f) {
            fields.push(f.to_string());
        }
    }
    Ok(fields)
}

fn parse_sort(raw: &str) -> Result<Vec<SortSpec>, ApiError> {
    split_list("sort", raw)?
        .into_iter()
        .map(|item| {
            let spec = if let Some(f) = item.strip_prefix('-') {
                SortSpec::desc(f)
            } else {
                SortSpec::asc(item.strip_prefix('+').unwrap_or(item))
            };
            if spec.field.is_empty() {
                return Err(ApiError::validation("sort", "missing field after direction prefix"));
            }
            check_field_name("sort", &spec.field)?;
            Ok(spec)
        })
        .collect()
}

fn parse_positive(name: &str, raw: &str) -> Result<u64, ApiError> {
    let n: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::validation(name, format!("'{raw}' is not an integer")))?;
    u64::try_from(n)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ApiError::validation(name, "must be a positive integer"))
}

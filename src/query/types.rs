use bson::Bson;
use serde::{Deserialize, Serialize};
use std::time::Instant;

// Safety limits applied while evaluating store queries
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_SORT_FIELDS: usize = 8;
pub(crate) const MAX_PROJECTION_FIELDS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Desc }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// A filter operand. One typed from query-string text keeps that text, and a stored
/// string is matched against the text instead of the typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    typed: Bson,
    text: Option<Bson>,
}

impl Literal {
    pub fn with_text(typed: Bson, raw: &str) -> Self {
        let text = match &typed {
            Bson::String(_) => None,
            _ => Some(Bson::String(raw.to_string())),
        };
        Self { typed, text }
    }

    pub const fn typed(&self) -> &Bson {
        &self.typed
    }

    /// The form to compare `stored` against.
    pub fn resolve(&self, stored: &Bson) -> &Bson {
        match (stored, &self.text) {
            (Bson::String(_), Some(text)) => text,
            _ => &self.typed,
        }
    }
}

impl From<Bson> for Literal {
    fn from(typed: Bson) -> Self {
        Self { typed, text: None }
    }
}

/// Store-level predicate tree evaluated against each record.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    In { path: String, values: Vec<Literal> },
    Cmp { path: String, op: CmpOp, value: Literal },
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Cmp { path: path.into(), op: CmpOp::Eq, value: Literal::from(value.into()) }
    }
}

/// Fields returned for each record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    #[default]
    All,
    Fields(Vec<String>),
}

/// A relation a route allows to be inlined: the reference field, the collection it
/// points into, and the subfields of the referenced record to include.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    pub field: String,
    pub collection: String,
    pub select: Vec<String>,
}

impl Expansion {
    pub fn new(field: &str, collection: &str, select: &[&str]) -> Self {
        Self {
            field: field.to_string(),
            collection: collection.to_string(),
            select: select.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Options for `ResourceCollection::find`.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub projection: Projection,
    pub sort: Vec<SortSpec>,
    pub skip: u64,
    pub limit: Option<u64>,
    pub expand: Vec<Expansion>,
    pub deadline: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFn {
    Avg,
    Sum,
    Min,
    Max,
    Count,
}

/// One group produced by `ResourceCollection::aggregate`. `value` is `None` when the
/// group had no numeric metric values (the function is undefined over zero elements).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateGroup {
    pub key: Bson,
    pub value: Option<f64>,
    pub count: u64,
}

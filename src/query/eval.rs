use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::types::{
    AggregateFn, CmpOp, Filter, Literal, MAX_PATH_DEPTH, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS,
    Order, SortSpec,
};
use crate::types::ID_FIELD;

pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::In { path, values } => {
            get_path(doc, path).is_some_and(|v| any_element(v, |x| is_in_set(x, values)))
        }
        Filter::Cmp { path, op, value } => get_path(doc, path).is_some_and(|v| {
            any_element(v, |x| {
                let value = value.resolve(x);
                match op {
                    CmpOp::Eq => values_equal(x, value),
                    CmpOp::Gt => compare_bson(x, value) == Ordering::Greater,
                    CmpOp::Gte => compare_bson(x, value) != Ordering::Less,
                    CmpOp::Lt => compare_bson(x, value) == Ordering::Less,
                    CmpOp::Lte => compare_bson(x, value) != Ordering::Greater,
                }
            })
        }),
    }
}

// Array-valued fields match when any element matches, as in the document-store convention.
fn any_element(v: &Bson, pred: impl Fn(&Bson) -> bool) -> bool {
    match v {
        Bson::Array(items) => items.iter().any(&pred),
        other => pred(other),
    }
}

fn is_in_set(v: &Bson, set: &[Literal]) -> bool {
    set.iter().any(|x| values_equal(v, x.resolve(v)))
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    if (is_num(a) && is_num(b)) || date_millis(a, b).is_some() {
        return compare_bson(a, b) == Ordering::Equal;
    }
    a == b
}

pub fn compare_docs(a: &BsonDocument, b: &BsonDocument, sort: &[SortSpec]) -> Ordering {
    for s in sort.iter().take(MAX_SORT_FIELDS) {
        let ord = match (get_path(a, &s.field), get_path(b, &s.field)) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if s.order == Order::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

pub fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut cur = doc;
    let mut parts = path.split('.').peekable();
    let mut depth = 0usize;
    while let Some(part) = parts.next() {
        depth += 1;
        if depth > MAX_PATH_DEPTH {
            return None;
        }
        let v = cur.get(part)?;
        if parts.peek().is_none() {
            return Some(v);
        }
        match v {
            Bson::Document(d) => cur = d,
            _ => return None,
        }
    }
    None
}

const fn is_num(x: &Bson) -> bool {
    matches!(x, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

#[allow(clippy::cast_precision_loss)]
pub fn as_f64(x: &Bson) -> Option<f64> {
    match x {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) if !f.is_nan() => Some(*f),
        _ => None,
    }
}

// Query literals arrive as strings; let them compare against stored dates.
fn parse_date_millis(s: &str) -> Option<i64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

fn date_millis(a: &Bson, b: &Bson) -> Option<(i64, i64)> {
    match (a, b) {
        (Bson::DateTime(x), Bson::DateTime(y)) => Some((x.timestamp_millis(), y.timestamp_millis())),
        (Bson::DateTime(x), Bson::String(s)) => {
            parse_date_millis(s).map(|y| (x.timestamp_millis(), y))
        }
        (Bson::String(s), Bson::DateTime(y)) => {
            parse_date_millis(s).map(|x| (x, y.timestamp_millis()))
        }
        _ => None,
    }
}

pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.total_cmp(&y);
    }
    if let Some((x, y)) = date_millis(a, b) {
        return x.cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

const fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::MaxKey => 255,
        _ => 12,
    }
}

/// Keeps the selected top-level fields; the record id is always retained.
pub fn project_fields(doc: &BsonDocument, fields: &[String]) -> BsonDocument {
    let mut out = BsonDocument::new();
    if let Some(id) = doc.get(ID_FIELD) {
        out.insert(ID_FIELD, id.clone());
    }
    for f in fields.iter().take(MAX_PROJECTION_FIELDS) {
        if let Some(v) = doc.get(f) {
            out.insert(f.clone(), v.clone());
        }
    }
    out
}

/// Applies `func` over the numeric values of a group; non-numeric values are ignored.
#[allow(clippy::cast_precision_loss)]
pub fn fold_metric(func: AggregateFn, values: &[f64]) -> Option<f64> {
    if func == AggregateFn::Count {
        return Some(values.len() as f64);
    }
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some(match func {
        AggregateFn::Avg => sum / values.len() as f64,
        AggregateFn::Sum => sum,
        AggregateFn::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        AggregateFn::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AggregateFn::Count => values.len() as f64,
    })
}

//! Translation of raw query parameters into a structured filter expression.
//!
//! Transport form is `field=value` for equality and `field[op]=value` for comparisons,
//! e.g. `averageCost[lte]=10000` or `careers[in]=Business,UI/UX`. Operator tokens are
//! looked up in [`OPERATORS`]; anything else is rejected rather than passed through.

use bson::Bson;
use std::collections::BTreeMap;

use super::types::{CmpOp, Filter, Literal, MAX_IN_SET};
use crate::errors::ApiError;

/// Raw query parameters exactly as received from the transport layer.
pub type RawParams = BTreeMap<String, String>;

/// Control keys consumed by query construction; never treated as predicates.
pub const RESERVED_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operator {
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

/// Transport token to operator.
pub const OPERATORS: [(&str, Operator); 5] = [
    ("gt", Operator::Gt),
    ("gte", Operator::Gte),
    ("lt", Operator::Lt),
    ("lte", Operator::Lte),
    ("in", Operator::In),
];

impl Operator {
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        OPERATORS.iter().find(|(t, _)| *t == token).map(|(_, op)| *op)
    }

    /// The operator in the store's `$`-prefixed convention.
    #[must_use]
    pub const fn store_token(self) -> &'static str {
        match self {
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::In => "$in",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Scalar(Literal),
    List(Vec<Literal>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub operator: Operator,
    pub operand: Operand,
}

/// What a single field must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals(Literal),
    Compare(Vec<Clause>),
}

/// Field name to predicate. Built once per request and not mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpression {
    fields: BTreeMap<String, Predicate>,
}

impl FilterExpression {
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Predicate> {
        self.fields.get(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Predicate)> {
        self.fields.iter()
    }

    /// Lowers the expression into a store filter.
    #[must_use]
    pub fn to_filter(&self) -> Filter {
        let mut parts = Vec::new();
        for (field, pred) in &self.fields {
            match pred {
                Predicate::Equals(v) => {
                    parts.push(Filter::Cmp { path: field.clone(), op: CmpOp::Eq, value: v.clone() });
                }
                Predicate::Compare(clauses) => {
                    for c in clauses {
                        parts.push(lower_clause(field, c));
                    }
                }
            }
        }
        match parts.len() {
            0 => Filter::True,
            1 => parts.remove(0),
            _ => Filter::And(parts),
        }
    }

    /// Renders the expression in the store's JSON filter dialect, e.g.
    /// `{"price": {"$gte": 100, "$lte": 500}}`. Used for query logging.
    #[must_use]
    pub fn to_store_json(&self) -> serde_json::Value {
        use crate::utils::json::bson_to_json;
        let mut out = serde_json::Map::new();
        for (field, pred) in &self.fields {
            let v = match pred {
                Predicate::Equals(v) => bson_to_json(v.typed()),
                Predicate::Compare(clauses) => {
                    let mut ops = serde_json::Map::new();
                    for c in clauses {
                        let operand = match &c.operand {
                            Operand::Scalar(v) => bson_to_json(v.typed()),
                            Operand::List(vs) => vs.iter().map(|v| bson_to_json(v.typed())).collect(),
                        };
                        ops.insert(c.operator.store_token().to_string(), operand);
                    }
                    serde_json::Value::Object(ops)
                }
            };
            out.insert(field.clone(), v);
        }
        serde_json::Value::Object(out)
    }
}

fn lower_clause(field: &str, c: &Clause) -> Filter {
    let path = field.to_string();
    match (&c.operand, c.operator) {
        (Operand::List(values), _) => Filter::In { path, values: values.clone() },
        (Operand::Scalar(v), Operator::In) => Filter::In { path, values: vec![v.clone()] },
        (Operand::Scalar(v), op) => {
            let op = match op {
                Operator::Gt => CmpOp::Gt,
                Operator::Gte => CmpOp::Gte,
                Operator::Lt => CmpOp::Lt,
                Operator::Lte | Operator::In => CmpOp::Lte,
            };
            Filter::Cmp { path, op, value: v.clone() }
        }
    }
}

/// Types a query-string literal: booleans, integers and finite floats are recognised,
/// everything else stays a string. Filters keep the original text alongside, see
/// [`parse_literal`].
#[must_use]
pub fn coerce_literal(raw: &str) -> Bson {
    match raw {
        "true" => return Bson::Boolean(true),
        "false" => return Bson::Boolean(false),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Bson::Int64(i);
    }
    if let Ok(f) = raw.parse::<f64>()
        && f.is_finite()
        && raw.bytes().any(|b| b.is_ascii_digit())
    {
        return Bson::Double(f);
    }
    Bson::String(raw.to_string())
}

/// A typed literal that still matches stored strings by its original text,
/// so `zipcode=02118` finds `"02118"`.
#[must_use]
pub fn parse_literal(raw: &str) -> Literal {
    Literal::with_text(coerce_literal(raw), raw)
}

fn validate_field(field: &str, key: &str) -> Result<(), ApiError> {
    if field.is_empty() {
        return Err(ApiError::validation(key, "empty field name"));
    }
    if field.starts_with('$') || field.split('.').any(|seg| seg.is_empty() || seg.starts_with('$'))
    {
        return Err(ApiError::validation(field, "field names may not use operator syntax"));
    }
    if RESERVED_KEYS.contains(&field) {
        return Err(ApiError::validation(field, "reserved query control cannot be filtered on"));
    }
    Ok(())
}

/// Splits `field[op]` into its parts. Plain keys yield no operator.
fn split_key(key: &str) -> Result<(&str, Option<&str>), ApiError> {
    match key.find('[') {
        None if key.contains(']') => Err(ApiError::validation(key, "malformed operator syntax")),
        None => Ok((key, None)),
        Some(open) => {
            let inner = key[open + 1..]
                .strip_suffix(']')
                .filter(|t| !t.contains('[') && !t.contains(']'))
                .ok_or_else(|| ApiError::validation(key, "malformed operator syntax"))?;
            Ok((&key[..open], Some(inner)))
        }
    }
}

/// Builds a [`FilterExpression`] from raw parameters, skipping the reserved control keys.
///
/// # Errors
/// `ApiError::Validation` naming the field for unknown operators, malformed keys,
/// `$`-prefixed field names, a field given both as equality and comparison, or an
/// `in` list longer than the supported set size.
pub fn translate(params: &RawParams) -> Result<FilterExpression, ApiError> {
    let mut fields: BTreeMap<String, Predicate> = BTreeMap::new();
    for (key, raw) in params {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let (field, token) = split_key(key)?;
        validate_field(field, key)?;
        let Some(token) = token else {
            if fields.insert(field.to_string(), Predicate::Equals(parse_literal(raw))).is_some() {
                return Err(ApiError::validation(field, "equality cannot be combined with operators"));
            }
            continue;
        };
        let operator = Operator::from_token(token)
            .ok_or_else(|| ApiError::validation(field, format!("unknown operator '{token}'")))?;
        let operand = if operator == Operator::In {
            let values: Vec<Literal> = raw.split(',').map(parse_literal).collect();
            if values.len() > MAX_IN_SET {
                return Err(ApiError::validation(field, "too many values in 'in' list"));
            }
            Operand::List(values)
        } else {
            Operand::Scalar(parse_literal(raw))
        };
        let clause = Clause { operator, operand };
        match fields.entry(field.to_string()).or_insert_with(|| Predicate::Compare(Vec::new())) {
            Predicate::Compare(clauses) => {
                clauses.push(clause);
                clauses.sort_by_key(|c| c.operator);
            }
            Predicate::Equals(_) => {
                return Err(ApiError::validation(field, "equality cannot be combined with operators"));
            }
        }
    }
    Ok(FilterExpression { fields })
}

// Request-side pieces first: raw params -> filter -> spec -> engine -> page info
mod engine;
pub(crate) mod eval;
mod filter;
mod pagination;
mod spec;
mod types;

pub use engine::{EngineOptions, PagedResult, ResourceQueryEngine};
pub use eval::{as_f64, eval_filter, fold_metric, get_path};
pub use filter::{
    Clause, FilterExpression, OPERATORS, Operand, Operator, Predicate, RESERVED_KEYS, RawParams,
    coerce_literal, parse_literal, translate,
};
pub use pagination::{PageInfo, PageWindow, paginate};
pub use spec::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, QueryLimits, QuerySpec};
pub use types::{
    AggregateFn, AggregateGroup, CmpOp, Expansion, Filter, FindOptions, Literal, Order, Projection,
    SortSpec,
};

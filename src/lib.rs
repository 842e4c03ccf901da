pub mod aggregate;
pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logger;
pub mod query;
pub mod resources;
pub mod store;
pub mod types;
pub mod utils;

pub use aggregate::{AggregateDependency, AggregateMaintainer, DependencyTable, Dispatch, MutationKind};
pub use config::AppConfig;
pub use errors::ApiError;
pub use query::{FilterExpression, PageInfo, PagedResult, QuerySpec, ResourceQueryEngine, paginate, translate};
pub use resources::{ResourcePolicy, ResourceRegistry, Service, ServiceOptions};
pub use store::{Collection, Engine, ResourceCollection, Store};
pub use types::DocumentId;

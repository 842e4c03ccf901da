use std::path::PathBuf;

use crate::query::RawParams;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List a resource through the query engine, optionally seeding first.
    Query {
        resource: String,
        params: RawParams,
        seed: Option<PathBuf>,
    },
    /// Load a JSON fixture file through the service.
    Seed {
        file: PathBuf,
    },
    /// Print the active aggregate dependency table.
    Dependencies,
}

mod dependency;
mod maintainer;

pub use dependency::{AggregateDependency, DependencyTable, Rounding, standard_dependencies};
pub use maintainer::{AggregateMaintainer, ChildEvent, Dispatch, MutationKind, Outcome};

//! Recomputes derived parent fields after child mutations.
//!
//! Every recompute re-derives the value from the full sibling set through the store's
//! grouping primitive. Concurrent recomputes on one parent are last-writer-wins; the
//! next qualifying mutation corrects any stale value.

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use super::dependency::{AggregateDependency, DependencyTable};
use crate::errors::ApiError;
use crate::query::{Filter, get_path};
use crate::store::Store;
use crate::types::DocumentId;
use crate::utils::num::millis_u64;

#[derive(Debug, Clone, PartialEq)]
pub enum MutationKind {
    Created,
    /// Carries the record as it was before the update.
    Updated { previous: Document },
    Removed,
}

/// A committed child mutation. Dispatch only after the write is durable.
#[derive(Debug, Clone, Copy)]
pub struct ChildEvent<'a> {
    pub kind: &'a MutationKind,
    pub child: &'a Document,
    pub dependency: &'a AggregateDependency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dispatch {
    /// Recompute before returning to the caller.
    #[default]
    Inline,
    /// Recompute on a background thread; the caller returns immediately.
    Detached,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Written { parent: String, value: Bson },
    /// The mutation did not touch the metric or the group key.
    Skipped,
    Detached { parent: String },
    Failed { parent: String, error: String },
}

#[derive(Clone)]
pub struct AggregateMaintainer {
    store: Arc<dyn Store>,
    table: Arc<DependencyTable>,
    dispatch: Dispatch,
}

impl std::fmt::Debug for AggregateMaintainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateMaintainer")
            .field("table", &self.table)
            .field("dispatch", &self.dispatch)
            .finish_non_exhaustive()
    }
}

impl AggregateMaintainer {
    pub fn new(store: Arc<dyn Store>, table: Arc<DependencyTable>, dispatch: Dispatch) -> Self {
        Self { store, table, dispatch }
    }

    #[must_use]
    pub fn table(&self) -> &DependencyTable {
        &self.table
    }

    #[must_use]
    pub const fn dispatch_mode(&self) -> Dispatch {
        self.dispatch
    }

    /// Fans a committed mutation on `child_collection` out to every dependency fed by it.
    pub fn dispatch(&self, child_collection: &str, kind: &MutationKind, child: &Document) -> Vec<Outcome> {
        self.table
            .for_child(child_collection)
            .flat_map(|dependency| self.on_child_mutated(ChildEvent { kind, child, dependency }))
            .collect()
    }

    /// Recomputes every parent the event can have changed. Never fails: write-back
    /// problems are logged and reported as `Outcome::Failed`.
    pub fn on_child_mutated(&self, event: ChildEvent<'_>) -> Vec<Outcome> {
        let dep = event.dependency;
        let current = get_path(event.child, &dep.group_key).cloned();
        let mut parents: Vec<Bson> = Vec::new();
        if let MutationKind::Updated { previous } = event.kind {
            let before = get_path(previous, &dep.group_key).cloned();
            let metric_changed = get_path(previous, &dep.metric) != get_path(event.child, &dep.metric);
            if before == current && !metric_changed {
                return vec![Outcome::Skipped];
            }
            if before != current {
                parents.extend(before);
            }
        }
        parents.extend(current);
        parents.retain(|p| !matches!(p, Bson::Null));

        match self.dispatch {
            Dispatch::Inline => {
                parents.iter().map(|p| recompute_on(self.store.as_ref(), dep, p)).collect()
            }
            Dispatch::Detached => self.detach(dep, parents),
        }
    }

    fn detach(&self, dep: &AggregateDependency, parents: Vec<Bson>) -> Vec<Outcome> {
        let labels: Vec<String> = parents.iter().map(parent_label).collect();
        let store = self.store.clone();
        let owned = dep.clone();
        let keys = parents.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("recompute-{}", dep.name))
            .spawn(move || {
                for p in &keys {
                    recompute_on(store.as_ref(), &owned, p);
                }
            });
        match spawned {
            Ok(_) => labels.into_iter().map(|parent| Outcome::Detached { parent }).collect(),
            Err(e) => {
                log::warn!("detached recompute for '{}' not started ({e}); running inline", dep.name);
                parents.iter().map(|p| recompute_on(self.store.as_ref(), dep, p)).collect()
            }
        }
    }

    /// Fresh value of `dep` for one parent, without writing it.
    ///
    /// # Errors
    /// Missing child collection or a failing store read.
    pub fn compute(&self, dep: &AggregateDependency, parent: &Bson) -> Result<Bson, ApiError> {
        compute_on(self.store.as_ref(), dep, parent)
    }

    /// Recomputes and writes one parent's derived field.
    pub fn recompute(&self, dep: &AggregateDependency, parent: &Bson) -> Outcome {
        recompute_on(self.store.as_ref(), dep, parent)
    }
}

fn parent_label(parent: &Bson) -> String {
    match parent {
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compute_on(store: &dyn Store, dep: &AggregateDependency, parent: &Bson) -> Result<Bson, ApiError> {
    let children = store
        .collection(&dep.child_collection)
        .ok_or_else(|| ApiError::NoSuchCollection(dep.child_collection.clone()))?;
    let groups = children.aggregate(
        &Filter::eq(dep.group_key.clone(), parent.clone()),
        &dep.group_key,
        &dep.metric,
        dep.function,
    )?;
    Ok(dep.finalize(groups.first().and_then(|g| g.value)))
}

fn write_back(store: &dyn Store, dep: &AggregateDependency, parent: &Bson, value: &Bson) -> Result<(), ApiError> {
    let Bson::String(id) = parent else {
        return Err(ApiError::validation(&dep.group_key, "parent reference is not an id"));
    };
    let parents = store
        .collection(&dep.parent_collection)
        .ok_or_else(|| ApiError::NoSuchCollection(dep.parent_collection.clone()))?;
    let mut fields = Document::new();
    fields.insert(dep.parent_field.clone(), value.clone());
    if parents.update_fields(&DocumentId(id.clone()), fields)? {
        Ok(())
    } else {
        Err(ApiError::not_found(&dep.parent_collection, id))
    }
}

fn recompute_on(store: &dyn Store, dep: &AggregateDependency, parent: &Bson) -> Outcome {
    let started = Instant::now();
    let label = parent_label(parent);
    let result = compute_on(store, dep, parent).and_then(|value| {
        write_back(store, dep, parent, &value)?;
        Ok(value)
    });
    let bench = serde_json::json!({
        "bench": "aggregate",
        "op": "recompute",
        "dependency": dep.name,
        "parent": label,
        "duration_ms": millis_u64(started.elapsed()),
        "ok": result.is_ok(),
    });
    crate::dev_trace!("{bench}");
    match result {
        Ok(value) => {
            log::debug!("{}.{} of {label} set to {value}", dep.parent_collection, dep.parent_field);
            Outcome::Written { parent: label, value }
        }
        Err(e) => {
            log::error!("recompute '{}' for {label} failed: {e}", dep.name);
            Outcome::Failed { parent: label, error: e.to_string() }
        }
    }
}

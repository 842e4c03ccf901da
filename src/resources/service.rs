use bson::{Bson, Document};
use std::sync::Arc;

use super::{ResourcePolicy, ResourceRegistry};
use crate::aggregate::{AggregateMaintainer, DependencyTable, Dispatch, MutationKind};
use crate::errors::ApiError;
use crate::query::{
    EngineOptions, Filter, FindOptions, PagedResult, QueryLimits, QuerySpec, RawParams,
    ResourceQueryEngine, SortSpec,
};
use crate::store::{Collection, Engine, ResourceCollection};
use crate::types::{CREATED_AT_FIELD, DocumentId, ID_FIELD};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceOptions {
    pub limits: QueryLimits,
    pub engine: EngineOptions,
    pub dispatch: Dispatch,
}

/// Resource operations behind the list/detail routes. Child mutations notify the
/// aggregate maintainer once the store write has returned.
#[derive(Debug)]
pub struct Service {
    store: Arc<Engine>,
    registry: ResourceRegistry,
    limits: QueryLimits,
    engine: ResourceQueryEngine,
    maintainer: AggregateMaintainer,
}

impl Service {
    /// Creates every registered collection and its unique constraints.
    pub fn new(
        store: Arc<Engine>,
        registry: ResourceRegistry,
        table: Arc<DependencyTable>,
        options: ServiceOptions,
    ) -> Self {
        for policy in registry.iter() {
            let col = store.create_collection(&policy.name);
            for fields in &policy.unique {
                let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
                col.add_unique_constraint(&fields);
            }
        }
        let maintainer = AggregateMaintainer::new(store.clone(), table, options.dispatch);
        Self {
            store,
            registry,
            limits: options.limits,
            engine: ResourceQueryEngine::new(options.engine),
            maintainer,
        }
    }

    /// Standard resources and dependencies over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(options: ServiceOptions) -> Self {
        Self::new(Engine::new(), ResourceRegistry::standard(), Arc::new(DependencyTable::standard()), options)
    }

    #[must_use]
    pub fn store(&self) -> &Arc<Engine> {
        &self.store
    }

    #[must_use]
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    #[must_use]
    pub fn maintainer(&self) -> &AggregateMaintainer {
        &self.maintainer
    }

    fn resolve(&self, resource: &str) -> Result<(&ResourcePolicy, Arc<Collection>), ApiError> {
        let policy = self.registry.get(resource)?;
        let col = self
            .store
            .get_collection(&policy.name)
            .ok_or_else(|| ApiError::NoSuchCollection(policy.name.clone()))?;
        Ok((policy, col))
    }

    /// Removes fields clients may not write: ids, timestamps and derived aggregates.
    fn sanitize(&self, policy: &ResourcePolicy, body: &mut Document, keep_id: bool) {
        if !keep_id {
            body.remove(ID_FIELD);
        }
        body.remove(CREATED_AT_FIELD);
        for field in self.maintainer.table().derived_fields(&policy.name) {
            if body.remove(field).is_some() {
                log::debug!("ignoring client value for derived field {}.{field}", policy.name);
            }
        }
    }

    fn notify(&self, policy: &ResourcePolicy, kind: &MutationKind, record: &Document) {
        for outcome in self.maintainer.dispatch(&policy.name, kind, record) {
            log::trace!("aggregate outcome on {}: {outcome:?}", policy.name);
        }
    }

    /// Paginated list driven by raw query parameters.
    ///
    /// # Errors
    /// Validation errors from the parameters, filters or sorts on hidden fields, store failures.
    pub fn list(&self, resource: &str, params: &RawParams) -> Result<PagedResult, ApiError> {
        let (policy, col) = self.resolve(resource)?;
        let spec = QuerySpec::build(params, &self.limits, &policy.expansions)?;
        if let Some((field, _)) = spec.filter().iter().find(|(f, _)| policy.is_hidden(f)) {
            return Err(ApiError::validation(field.as_str(), "field cannot be filtered on"));
        }
        if let Some(key) = spec.sort().iter().find(|s| policy.is_hidden(&s.field)) {
            return Err(ApiError::validation(key.field.as_str(), "field cannot be sorted on"));
        }
        let mut result = self.engine.execute(&spec, col.as_ref())?;
        for rec in &mut result.data {
            policy.redact(rec);
        }
        Ok(result)
    }

    /// Every child of one parent, unpaginated and unexpanded.
    ///
    /// # Errors
    /// `Validation` when `resource` has no parent; store failures.
    pub fn list_for_parent(&self, resource: &str, parent_id: &str) -> Result<Vec<Document>, ApiError> {
        let (policy, col) = self.resolve(resource)?;
        let link = policy
            .parent
            .as_ref()
            .ok_or_else(|| ApiError::validation(resource, "resource has no parent"))?;
        let opts = FindOptions { sort: vec![SortSpec::desc(CREATED_AT_FIELD)], ..FindOptions::default() };
        let mut records = col.find(&Filter::eq(link.field.clone(), parent_id), &opts)?;
        for rec in &mut records {
            policy.redact(rec);
        }
        Ok(records)
    }

    /// One record with the route's expansions applied.
    ///
    /// # Errors
    /// `NotFound` for an unknown id; store failures.
    pub fn get(&self, resource: &str, id: &str) -> Result<Document, ApiError> {
        let (policy, col) = self.resolve(resource)?;
        let opts = FindOptions {
            limit: Some(1),
            expand: policy.expansions.clone(),
            ..FindOptions::default()
        };
        let mut rec = col
            .find(&Filter::eq(ID_FIELD, id), &opts)?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(&policy.singular, id))?;
        policy.redact(&mut rec);
        Ok(rec)
    }

    /// Stores a record. A caller-supplied `_id` is kept so fixtures can cross-reference.
    ///
    /// # Errors
    /// `Conflict` for duplicates; store failures.
    pub fn create(&self, resource: &str, mut body: Document) -> Result<Document, ApiError> {
        let (policy, col) = self.resolve(resource)?;
        self.sanitize(policy, &mut body, true);
        let id = col.insert(body)?;
        let mut rec = col.find_by_id(&id)?.ok_or_else(|| ApiError::not_found(&policy.singular, id.as_str()))?;
        self.notify(policy, &MutationKind::Created, &rec);
        policy.redact(&mut rec);
        Ok(rec)
    }

    /// Creates a child under an existing parent.
    ///
    /// # Errors
    /// `NotFound` when the parent is missing; otherwise as [`Service::create`].
    pub fn create_child(&self, resource: &str, parent_id: &str, mut body: Document) -> Result<Document, ApiError> {
        let (policy, _) = self.resolve(resource)?;
        let link = policy
            .parent
            .as_ref()
            .ok_or_else(|| ApiError::validation(resource, "resource has no parent"))?;
        let (parent_policy, parents) = self.resolve(&link.collection)?;
        if parents.find_by_id(&DocumentId::from(parent_id))?.is_none() {
            return Err(ApiError::not_found(&parent_policy.singular, parent_id));
        }
        body.insert(link.field.clone(), parent_id);
        self.create(resource, body)
    }

    /// Sets the given fields. Aggregates are recomputed only when a child's metric or
    /// parent reference changed; moving a child recomputes both parents.
    ///
    /// # Errors
    /// `NotFound` for an unknown id; `Conflict`; store failures.
    pub fn update(&self, resource: &str, id: &str, mut fields: Document) -> Result<Document, ApiError> {
        let (policy, col) = self.resolve(resource)?;
        self.sanitize(policy, &mut fields, false);
        let doc_id = DocumentId::from(id);
        let previous = col.find_by_id(&doc_id)?.ok_or_else(|| ApiError::not_found(&policy.singular, id))?;
        if !col.update_fields(&doc_id, fields)? {
            return Err(ApiError::not_found(&policy.singular, id));
        }
        let mut rec = col.find_by_id(&doc_id)?.ok_or_else(|| ApiError::not_found(&policy.singular, id))?;
        self.notify(policy, &MutationKind::Updated { previous }, &rec);
        policy.redact(&mut rec);
        Ok(rec)
    }

    /// # Errors
    /// `NotFound` for an unknown id; store failures.
    pub fn delete(&self, resource: &str, id: &str) -> Result<(), ApiError> {
        let (policy, col) = self.resolve(resource)?;
        let removed = col
            .delete(&DocumentId::from(id))?
            .ok_or_else(|| ApiError::not_found(&policy.singular, id))?;
        self.notify(policy, &MutationKind::Removed, &removed);
        Ok(())
    }

    /// Derived field value currently stored on a parent.
    ///
    /// # Errors
    /// `NotFound` for an unknown parent.
    pub fn derived_value(&self, resource: &str, id: &str, field: &str) -> Result<Bson, ApiError> {
        let (policy, col) = self.resolve(resource)?;
        let rec = col
            .find_by_id(&DocumentId::from(id))?
            .ok_or_else(|| ApiError::not_found(&policy.singular, id))?;
        Ok(rec.get(field).cloned().unwrap_or(Bson::Null))
    }
}

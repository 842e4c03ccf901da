use super::{ResourceCollection, Store};
use crate::errors::ApiError;
use crate::logger::AUDIT_TARGET;
use crate::query::eval::{as_f64, compare_docs, eval_filter, fold_metric, get_path, project_fields};
use crate::query::{AggregateFn, AggregateGroup, Expansion, Filter, FindOptions, Projection};
use crate::types::{CREATED_AT_FIELD, DocumentId, ID_FIELD};
use crate::utils::num::{millis_u64, u64_to_usize};
use bson::{Bson, Document};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

fn audit(op: &str, collection: &str, id: &DocumentId) {
    log::info!(
        target: AUDIT_TARGET,
        "{}",
        serde_json::json!({
            "ts": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "op": op,
            "collection": collection,
            "doc_id": id.as_str(),
        })
    );
}

/// In-memory document store holding named collections.
pub struct Engine {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
    this: Weak<Engine>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("collections", &self.list_collection_names()).finish()
    }
}

impl Engine {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| Self { collections: RwLock::new(HashMap::new()), this: this.clone() })
    }

    /// Returns the named collection, creating it when absent.
    pub fn create_collection(&self, name: &str) -> Arc<Collection> {
        if let Some(c) = self.collections.read().get(name) {
            return c.clone();
        }
        self.collections
            .write()
            .entry(name.to_string())
            .or_insert_with(|| {
                log::debug!("creating collection '{name}'");
                Arc::new(Collection::new(name.to_string(), self.this.clone()))
            })
            .clone()
    }

    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    pub fn delete_collection(&self, name: &str) -> bool {
        self.collections.write().remove(name).is_some()
    }

    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Store for Engine {
    fn collection(&self, name: &str) -> Option<Arc<dyn ResourceCollection>> {
        self.get_collection(name).map(|c| c as Arc<dyn ResourceCollection>)
    }
}

#[derive(Default)]
struct Records {
    next_seq: u64,
    // insertion order; ties under a sort keep this order
    by_seq: BTreeMap<u64, Document>,
    seq_of: HashMap<DocumentId, u64>,
}

impl Records {
    fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.seq_of.get(id).and_then(|s| self.by_seq.get(s))
    }
}

pub struct Collection {
    name: String,
    records: RwLock<Records>,
    unique: RwLock<Vec<Vec<String>>>,
    catalog: Weak<Engine>,
    unavailable: AtomicBool,
    read_delay_ms: AtomicU64,
}

impl Collection {
    fn new(name: String, catalog: Weak<Engine>) -> Self {
        Self {
            name,
            records: RwLock::new(Records::default()),
            unique: RwLock::new(Vec::new()),
            catalog,
            unavailable: AtomicBool::new(false),
            read_delay_ms: AtomicU64::new(0),
        }
    }

    /// Rejects inserts and updates that would duplicate the combined values of `fields`.
    pub fn add_unique_constraint(&self, fields: &[&str]) {
        let fields: Vec<String> = fields.iter().map(|f| (*f).to_string()).collect();
        let mut unique = self.unique.write();
        if !unique.contains(&fields) {
            unique.push(fields);
        }
    }

    /// Fault injection: every operation fails with `StoreUnavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fault injection: reads stall for `delay` before scanning.
    pub fn set_read_delay(&self, delay: Duration) {
        self.read_delay_ms.store(millis_u64(delay), Ordering::SeqCst);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().by_seq.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> Result<(), ApiError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ApiError::StoreUnavailable(format!("collection '{}' is unavailable", self.name)));
        }
        Ok(())
    }

    fn begin_read(&self, deadline: Option<Instant>) -> Result<(), ApiError> {
        self.ensure_available()?;
        let delay = Duration::from_millis(self.read_delay_ms.load(Ordering::SeqCst));
        if !delay.is_zero() {
            if let Some(dl) = deadline
                && Instant::now() + delay > dl
            {
                std::thread::sleep(dl.saturating_duration_since(Instant::now()));
                return Err(self.timeout());
            }
            std::thread::sleep(delay);
        }
        self.check_deadline(deadline)
    }

    fn check_deadline(&self, deadline: Option<Instant>) -> Result<(), ApiError> {
        match deadline {
            Some(dl) if Instant::now() > dl => Err(self.timeout()),
            _ => Ok(()),
        }
    }

    fn timeout(&self) -> ApiError {
        ApiError::StoreTimeout(format!("read on '{}' exceeded its deadline", self.name))
    }

    fn violates_unique(&self, records: &Records, candidate: &Document, skip: Option<u64>) -> Option<String> {
        for fields in self.unique.read().iter() {
            let Some(values) =
                fields.iter().map(|f| candidate.get(f)).collect::<Option<Vec<&Bson>>>()
            else {
                continue;
            };
            let clash = records.by_seq.iter().any(|(seq, d)| {
                Some(*seq) != skip
                    && fields.iter().zip(&values).all(|(f, v)| d.get(f) == Some(*v))
            });
            if clash {
                return Some(fields.join(", "));
            }
        }
        None
    }

    /// Stores a new record, assigning `_id` and `createdAt` when absent.
    ///
    /// # Errors
    /// `Validation` for a non-string `_id`, `Conflict` for a duplicate id or unique-key
    /// clash, `StoreUnavailable` while the collection is failing.
    pub fn insert(&self, mut doc: Document) -> Result<DocumentId, ApiError> {
        self.ensure_available()?;
        let id = match doc.get(ID_FIELD) {
            None => DocumentId::new(),
            Some(_) => DocumentId::of(&doc)
                .ok_or_else(|| ApiError::validation(ID_FIELD, "must be a non-empty string"))?,
        };
        doc.insert(ID_FIELD, id.as_str());
        if !doc.contains_key(CREATED_AT_FIELD) {
            doc.insert(CREATED_AT_FIELD, bson::DateTime::now());
        }
        let mut records = self.records.write();
        if records.seq_of.contains_key(&id) {
            return Err(ApiError::Conflict(format!("duplicate id {id} in '{}'", self.name)));
        }
        if let Some(fields) = self.violates_unique(&records, &doc, None) {
            return Err(ApiError::Conflict(format!("duplicate value for ({fields}) in '{}'", self.name)));
        }
        let seq = records.next_seq;
        records.next_seq += 1;
        records.by_seq.insert(seq, doc);
        records.seq_of.insert(id.clone(), seq);
        drop(records);
        audit("insert", &self.name, &id);
        Ok(id)
    }

    /// Removes a record, returning it.
    ///
    /// # Errors
    /// `StoreUnavailable` while the collection is failing.
    pub fn delete(&self, id: &DocumentId) -> Result<Option<Document>, ApiError> {
        self.ensure_available()?;
        let mut records = self.records.write();
        let removed = records.seq_of.remove(id).and_then(|seq| records.by_seq.remove(&seq));
        drop(records);
        if removed.is_some() {
            audit("delete", &self.name, id);
        }
        Ok(removed)
    }

    /// Swaps a record's body wholesale. `_id` and `createdAt` survive the swap.
    ///
    /// # Errors
    /// `Conflict` on a unique-key clash, `StoreUnavailable` while the collection is failing.
    pub fn replace(&self, id: &DocumentId, mut doc: Document) -> Result<bool, ApiError> {
        self.ensure_available()?;
        let mut records = self.records.write();
        let Some(seq) = records.seq_of.get(id).copied() else {
            return Ok(false);
        };
        let created = records.by_seq.get(&seq).and_then(|d| d.get(CREATED_AT_FIELD)).cloned();
        doc.insert(ID_FIELD, id.as_str());
        if let Some(created) = created {
            doc.insert(CREATED_AT_FIELD, created);
        }
        if let Some(fields) = self.violates_unique(&records, &doc, Some(seq)) {
            return Err(ApiError::Conflict(format!("duplicate value for ({fields}) in '{}'", self.name)));
        }
        records.by_seq.insert(seq, doc);
        drop(records);
        audit("replace", &self.name, id);
        Ok(true)
    }

    /// Removes every record, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut records = self.records.write();
        let n = records.by_seq.len();
        records.by_seq.clear();
        records.seq_of.clear();
        n
    }

    fn expand(&self, docs: &mut [Document], exp: &Expansion) -> Result<(), ApiError> {
        let engine = self.catalog.upgrade().ok_or_else(|| {
            ApiError::StoreUnavailable(format!("store backing '{}' was dropped", self.name))
        })?;
        let target = engine
            .get_collection(&exp.collection)
            .ok_or_else(|| ApiError::NoSuchCollection(exp.collection.clone()))?;
        target.ensure_available()?;
        let resolve = |v: &Bson, found: &HashMap<String, Document>| match v {
            Bson::String(id) => found.get(id).cloned().map_or(Bson::Null, Bson::Document),
            other => other.clone(),
        };
        let mut wanted: Vec<String> = Vec::new();
        for d in docs.iter() {
            match d.get(&exp.field) {
                Some(Bson::String(id)) => wanted.push(id.clone()),
                Some(Bson::Array(items)) => wanted.extend(items.iter().filter_map(|i| match i {
                    Bson::String(id) => Some(id.clone()),
                    _ => None,
                })),
                _ => {}
            }
        }
        let found: HashMap<String, Document> = {
            let records = target.records.read();
            wanted
                .into_iter()
                .filter_map(|id| {
                    let rec = records.get(&DocumentId(id.clone()))?;
                    Some((id, project_fields(rec, &exp.select)))
                })
                .collect()
        };
        for d in docs.iter_mut() {
            let expanded = match d.get(&exp.field) {
                Some(Bson::Array(items)) => Bson::Array(
                    items
                        .iter()
                        .map(|i| resolve(i, &found))
                        .filter(|b| !matches!(b, Bson::Null))
                        .collect(),
                ),
                Some(v) => resolve(v, &found),
                None => continue,
            };
            d.insert(exp.field.clone(), expanded);
        }
        Ok(())
    }
}

impl ResourceCollection for Collection {
    fn name(&self) -> &str {
        &self.name
    }

    fn count(&self, filter: &Filter, deadline: Option<Instant>) -> Result<u64, ApiError> {
        self.begin_read(deadline)?;
        let records = self.records.read();
        let mut n = 0u64;
        for d in records.by_seq.values() {
            if eval_filter(d, filter) {
                n += 1;
            }
        }
        drop(records);
        self.check_deadline(deadline)?;
        Ok(n)
    }

    fn find(&self, filter: &Filter, opts: &FindOptions) -> Result<Vec<Document>, ApiError> {
        self.begin_read(opts.deadline)?;
        let mut docs: Vec<Document> =
            self.records.read().by_seq.values().filter(|d| eval_filter(d, filter)).cloned().collect();
        if !opts.sort.is_empty() {
            docs.sort_by(|a, b| compare_docs(a, b, &opts.sort));
        }
        let limit = opts.limit.map_or(usize::MAX, u64_to_usize);
        let mut docs: Vec<Document> =
            docs.into_iter().skip(u64_to_usize(opts.skip)).take(limit).collect();
        if let Projection::Fields(fields) = &opts.projection {
            for d in &mut docs {
                *d = project_fields(d, fields);
            }
        }
        for exp in &opts.expand {
            self.expand(&mut docs, exp)?;
        }
        self.check_deadline(opts.deadline)?;
        Ok(docs)
    }

    fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, ApiError> {
        self.ensure_available()?;
        Ok(self.records.read().get(id).cloned())
    }

    fn aggregate(
        &self,
        filter: &Filter,
        group_key: &str,
        metric: &str,
        func: AggregateFn,
    ) -> Result<Vec<AggregateGroup>, ApiError> {
        self.ensure_available()?;
        let records = self.records.read();
        let mut groups: Vec<(Bson, Vec<f64>, u64)> = Vec::new();
        for d in records.by_seq.values().filter(|d| eval_filter(d, filter)) {
            let key = get_path(d, group_key).cloned().unwrap_or(Bson::Null);
            let idx = match groups.iter().position(|(k, _, _)| *k == key) {
                Some(i) => i,
                None => {
                    groups.push((key, Vec::new(), 0));
                    groups.len() - 1
                }
            };
            let group = &mut groups[idx];
            group.2 += 1;
            if let Some(v) = get_path(d, metric).and_then(as_f64) {
                group.1.push(v);
            }
        }
        drop(records);
        Ok(groups
            .into_iter()
            .map(|(key, values, count)| AggregateGroup { key, value: fold_metric(func, &values), count })
            .collect())
    }

    fn update_fields(&self, id: &DocumentId, fields: Document) -> Result<bool, ApiError> {
        self.ensure_available()?;
        let mut records = self.records.write();
        let Some(seq) = records.seq_of.get(id).copied() else {
            return Ok(false);
        };
        let Some(mut updated) = records.by_seq.get(&seq).cloned() else {
            return Ok(false);
        };
        for (k, v) in fields {
            if k != ID_FIELD {
                updated.insert(k, v);
            }
        }
        if let Some(clash) = self.violates_unique(&records, &updated, Some(seq)) {
            return Err(ApiError::Conflict(format!("duplicate value for ({clash}) in '{}'", self.name)));
        }
        records.by_seq.insert(seq, updated);
        drop(records);
        audit("update", &self.name, id);
        Ok(true)
    }
}

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::ApiError;
use crate::query::RawParams;
use crate::resources::Service;
use crate::utils::json::json_to_record;

/// Parses `key=value` arguments. The first `=` splits; values may contain more.
pub fn parse_params<S: AsRef<str>>(args: &[S]) -> Result<RawParams, ApiError> {
    let mut params = RawParams::new();
    for arg in args {
        let arg = arg.as_ref();
        let (k, v) = arg
            .split_once('=')
            .ok_or_else(|| ApiError::validation(arg, "expected key=value"))?;
        if k.is_empty() {
            return Err(ApiError::validation(arg, "empty key"));
        }
        params.insert(k.to_string(), v.to_string());
    }
    Ok(params)
}

/// Inserts fixture records: parents first, children through their parent so the
/// aggregate maintainer sees every creation. Returns per-resource counts.
pub fn seed_value(service: &Service, fixture: &Value) -> Result<BTreeMap<String, usize>, ApiError> {
    let obj = fixture
        .as_object()
        .ok_or_else(|| ApiError::validation("seed", "expected an object keyed by resource"))?;
    for key in obj.keys() {
        service.registry().get(key)?;
    }
    let (parents, children): (Vec<_>, Vec<_>) =
        service.registry().iter().partition(|p| p.parent.is_none());
    let mut counts = BTreeMap::new();
    for policy in parents.into_iter().chain(children) {
        let Some(items) = obj.get(&policy.name) else {
            continue;
        };
        let items = items
            .as_array()
            .ok_or_else(|| ApiError::validation(&policy.name, "expected an array of records"))?;
        for item in items {
            let record = json_to_record(item)?;
            let parent_id = policy
                .parent
                .as_ref()
                .and_then(|link| record.get_str(&link.field).ok().map(str::to_string));
            match parent_id {
                Some(pid) => service.create_child(&policy.name, &pid, record)?,
                None => service.create(&policy.name, record)?,
            };
        }
        counts.insert(policy.name.clone(), items.len());
    }
    log::info!("seeded {counts:?}");
    Ok(counts)
}

/// # Errors
/// Unreadable file, invalid JSON, or any record the service rejects.
pub fn seed_file(service: &Service, path: &Path) -> Result<BTreeMap<String, usize>, ApiError> {
    let text = std::fs::read_to_string(path)?;
    let fixture: Value = serde_json::from_str(&text)?;
    seed_value(service, &fixture)
}

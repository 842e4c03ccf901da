//! Per-resource route policy: which relations may be expanded, which fields never
//! leave the service, and how child resources hang off their parent.

mod service;

pub use service::{Service, ServiceOptions};

use crate::errors::ApiError;
use crate::query::Expansion;

/// Child-to-parent reference carried by a child record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    pub field: String,
    pub collection: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePolicy {
    /// Collection name, also the route segment.
    pub name: String,
    /// Used in not-found messages.
    pub singular: String,
    pub expansions: Vec<Expansion>,
    pub hidden_fields: Vec<String>,
    pub parent: Option<ParentLink>,
    pub unique: Vec<Vec<String>>,
}

impl ResourcePolicy {
    #[must_use]
    pub fn new(name: &str, singular: &str) -> Self {
        Self {
            name: name.to_string(),
            singular: singular.to_string(),
            expansions: Vec::new(),
            hidden_fields: Vec::new(),
            parent: None,
            unique: Vec::new(),
        }
    }

    #[must_use]
    pub fn expand(mut self, field: &str, collection: &str, select: &[&str]) -> Self {
        self.expansions.push(Expansion::new(field, collection, select));
        self
    }

    #[must_use]
    pub fn hide(mut self, fields: &[&str]) -> Self {
        self.hidden_fields.extend(fields.iter().map(|f| (*f).to_string()));
        self
    }

    #[must_use]
    pub fn child_of(mut self, field: &str, collection: &str) -> Self {
        self.parent = Some(ParentLink { field: field.to_string(), collection: collection.to_string() });
        self
    }

    #[must_use]
    pub fn unique_on(mut self, fields: &[&str]) -> Self {
        self.unique.push(fields.iter().map(|f| (*f).to_string()).collect());
        self
    }

    #[must_use]
    pub fn is_hidden(&self, field: &str) -> bool {
        let root = field.split('.').next().unwrap_or(field);
        self.hidden_fields.iter().any(|h| h == root)
    }

    /// Drops hidden fields from an outgoing record.
    pub fn redact(&self, record: &mut bson::Document) {
        for f in &self.hidden_fields {
            record.remove(f);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRegistry {
    policies: Vec<ResourcePolicy>,
}

impl ResourceRegistry {
    #[must_use]
    pub fn new(policies: Vec<ResourcePolicy>) -> Self {
        Self { policies }
    }

    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            ResourcePolicy::new("bootcamps", "bootcamp"),
            ResourcePolicy::new("courses", "course")
                .expand("bootcamp", "bootcamps", &["name", "description"])
                .child_of("bootcamp", "bootcamps"),
            ResourcePolicy::new("reviews", "review")
                .expand("bootcamp", "bootcamps", &["name", "description"])
                .child_of("bootcamp", "bootcamps")
                .unique_on(&["bootcamp", "user"]),
            ResourcePolicy::new("users", "user")
                .hide(&["hashed_password", "resetPasswordToken", "resetPasswordExpire"]),
        ])
    }

    /// # Errors
    /// `ApiError::NoSuchCollection` for unregistered resources.
    pub fn get(&self, name: &str) -> Result<&ResourcePolicy, ApiError> {
        self.policies
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ApiError::NoSuchCollection(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourcePolicy> {
        self.policies.iter()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.policies.iter().map(|p| p.name.as_str()).collect()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

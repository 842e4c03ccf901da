use bson::Bson;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::ApiError;
use crate::query::AggregateFn;

/// Post-processing applied to a recomputed aggregate before write-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    #[default]
    None,
    /// `ceil(value / n) * n`
    CeilToMultiple(u32),
}

impl Rounding {
    #[must_use]
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::None => value,
            Self::CeilToMultiple(n) => {
                let n = f64::from(n.max(1));
                (value / n).ceil() * n
            }
        }
    }
}

const fn default_function() -> AggregateFn {
    AggregateFn::Avg
}

/// Edge from a child metric to a derived field on the parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDependency {
    pub name: String,
    pub child_collection: String,
    /// Child field holding the parent's id.
    pub group_key: String,
    pub metric: String,
    pub parent_collection: String,
    pub parent_field: String,
    #[serde(default = "default_function")]
    pub function: AggregateFn,
    #[serde(default)]
    pub rounding: Rounding,
}

impl AggregateDependency {
    /// Value to store on the parent. An empty sibling set yields `Null`, never NaN.
    #[must_use]
    pub fn finalize(&self, raw: Option<f64>) -> Bson {
        match raw {
            Some(v) if v.is_finite() => Bson::Double(self.rounding.apply(v)),
            _ => Bson::Null,
        }
    }

    /// # Errors
    /// `ApiError::Config` for blank names or a zero rounding multiple.
    pub fn validate(&self) -> Result<(), ApiError> {
        let named = [
            ("name", &self.name),
            ("child_collection", &self.child_collection),
            ("group_key", &self.group_key),
            ("metric", &self.metric),
            ("parent_collection", &self.parent_collection),
            ("parent_field", &self.parent_field),
        ];
        for (what, value) in named {
            if value.trim().is_empty() {
                return Err(ApiError::Config(format!("aggregate dependency: empty {what}")));
            }
        }
        if self.rounding == Rounding::CeilToMultiple(0) {
            return Err(ApiError::Config(format!(
                "aggregate dependency '{}': rounding multiple must be positive",
                self.name
            )));
        }
        Ok(())
    }
}

/// Process-wide dependency table. Read-only after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyTable {
    dependencies: Vec<AggregateDependency>,
}

impl DependencyTable {
    /// # Errors
    /// `ApiError::Config` when an entry is invalid, a name repeats, or two entries
    /// write the same parent field.
    pub fn new(dependencies: Vec<AggregateDependency>) -> Result<Self, ApiError> {
        let mut names = HashSet::new();
        let mut targets = HashSet::new();
        for dep in &dependencies {
            dep.validate()?;
            if !names.insert(dep.name.as_str()) {
                return Err(ApiError::Config(format!("duplicate aggregate dependency '{}'", dep.name)));
            }
            if !targets.insert((dep.parent_collection.as_str(), dep.parent_field.as_str())) {
                return Err(ApiError::Config(format!(
                    "{}.{} is derived by more than one dependency",
                    dep.parent_collection, dep.parent_field
                )));
            }
        }
        Ok(Self { dependencies })
    }

    /// Course tuition feeds `bootcamps.averageCost` (rounded up to a multiple of 10);
    /// review rating feeds `bootcamps.averageRating` unrounded.
    #[must_use]
    pub fn standard() -> Self {
        Self { dependencies: standard_dependencies() }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self { dependencies: Vec::new() }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AggregateDependency> {
        self.dependencies.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn for_child<'a>(&'a self, collection: &'a str) -> impl Iterator<Item = &'a AggregateDependency> {
        self.dependencies.iter().filter(move |d| d.child_collection == collection)
    }

    /// Parent fields that only the maintainer may write.
    #[must_use]
    pub fn derived_fields(&self, parent_collection: &str) -> Vec<&str> {
        self.dependencies
            .iter()
            .filter(|d| d.parent_collection == parent_collection)
            .map(|d| d.parent_field.as_str())
            .collect()
    }
}

impl Default for DependencyTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[must_use]
pub fn standard_dependencies() -> Vec<AggregateDependency> {
    vec![
        AggregateDependency {
            name: "course-cost".into(),
            child_collection: "courses".into(),
            group_key: "bootcamp".into(),
            metric: "tuition".into(),
            parent_collection: "bootcamps".into(),
            parent_field: "averageCost".into(),
            function: AggregateFn::Avg,
            rounding: Rounding::CeilToMultiple(10),
        },
        AggregateDependency {
            name: "review-rating".into(),
            child_collection: "reviews".into(),
            group_key: "bootcamp".into(),
            metric: "rating".into(),
            parent_collection: "bootcamps".into(),
            parent_field: "averageRating".into(),
            function: AggregateFn::Avg,
            rounding: Rounding::None,
        },
    ]
}

//! Core domain entities for the Composition Engine

use super::quantity::Quantity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a Composition
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositionId(pub String);

impl CompositionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier (32 hex chars, no hyphens)
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CompositionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CompositionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Weighted edge from a Composition to one of its sub-items.
///
/// `subvalue` is always derived by propagation and ignored on input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub of: CompositionId,
    pub quantity: Quantity,
    #[serde(default)]
    pub subvalue: f64,
}

impl Dependency {
    pub fn new(of: impl Into<CompositionId>, quantity: Quantity) -> Self {
        Self {
            of: of.into(),
            quantity,
            subvalue: 0.0,
        }
    }
}

/// User-supplied edge, before any subvalue is derived
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DependencyInput {
    pub of: CompositionId,
    pub quantity: Quantity,
}

impl DependencyInput {
    pub fn new(of: impl Into<CompositionId>, quantity: Quantity) -> Self {
        Self {
            of: of.into(),
            quantity,
        }
    }
}

impl From<DependencyInput> for Dependency {
    fn from(input: DependencyInput) -> Self {
        Dependency::new(input.of, input.quantity)
    }
}

/// Graph node: a costed item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub id: CompositionId,
    #[serde(default)]
    pub name: String,
    pub cost: f64,
    /// Base unit the cost refers to; fixed at creation
    pub unit: Quantity,
    pub stock: Quantity,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    pub autoupdate_cost: bool,
    pub enabled: bool,
    pub validated: bool,
    pub uses_updated_since_last_change: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Composition {
    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }

    pub fn dependency(&self, of: &CompositionId) -> Option<&Dependency> {
        self.dependencies.iter().find(|d| &d.of == of)
    }

    /// Ids this node points at, in declaration order
    pub fn dependency_ids(&self) -> impl Iterator<Item = &CompositionId> {
        self.dependencies.iter().map(|d| &d.of)
    }

    /// Sum of the current edge subvalues
    pub fn subvalue_total(&self) -> f64 {
        self.dependencies.iter().map(|d| d.subvalue).sum()
    }
}

/// Request to create a Composition. Only `unit` is required.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComposition {
    #[serde(default)]
    pub id: Option<CompositionId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    pub unit: Quantity,
    #[serde(default)]
    pub stock: Option<Quantity>,
    #[serde(default)]
    pub dependencies: Vec<DependencyInput>,
    #[serde(default)]
    pub autoupdate_cost: Option<bool>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl NewComposition {
    pub fn new(unit: Quantity) -> Self {
        Self {
            id: None,
            name: None,
            cost: None,
            unit,
            stock: None,
            dependencies: Vec::new(),
            autoupdate_cost: None,
            enabled: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<CompositionId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_stock(mut self, stock: Quantity) -> Self {
        self.stock = Some(stock);
        self
    }

    pub fn with_dependency(mut self, of: impl Into<CompositionId>, quantity: Quantity) -> Self {
        self.dependencies.push(DependencyInput::new(of, quantity));
        self
    }

    pub fn with_autoupdate_cost(mut self, autoupdate: bool) -> Self {
        self.autoupdate_cost = Some(autoupdate);
        self
    }
}

/// Partial update. Absent fields keep their current value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    /// Accepted only when equal to the stored unit
    #[serde(default)]
    pub unit: Option<Quantity>,
    #[serde(default)]
    pub stock: Option<Quantity>,
    #[serde(default)]
    pub dependencies: Option<Vec<DependencyInput>>,
    #[serde(default)]
    pub autoupdate_cost: Option<bool>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl CompositionPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_unit(mut self, unit: Quantity) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_stock(mut self, stock: Quantity) -> Self {
        self.stock = Some(stock);
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<DependencyInput>) -> Self {
        self.dependencies = Some(dependencies);
        self
    }

    pub fn with_autoupdate_cost(mut self, autoupdate: bool) -> Self {
        self.autoupdate_cost = Some(autoupdate);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }
}

/// Terminal state of a mutation, reported to clients as-is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Created,
    Updated,
    Deleted,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Created => "CREATED",
            OperationStatus::Updated => "UPDATED",
            OperationStatus::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful create/update
#[derive(Clone, Debug, PartialEq)]
pub struct Committed {
    pub status: OperationStatus,
    pub composition: Composition,
    /// Other nodes whose valuation changed because of this commit
    pub recomputed: Vec<CompositionId>,
}

//! Error types for the Composition Engine

use super::entities::CompositionId;
use super::quantity::QuantityError;
use thiserror::Error;

/// Graph store errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("Composition not found: {0}")]
    NotFound(CompositionId),

    /// Delete refused while other nodes still point at `id`
    #[error("Composition {id} is referenced by {dependents:?}")]
    ReferencedByOthers {
        id: CompositionId,
        dependents: Vec<CompositionId>,
    },
}

/// Integrity validator errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// `path` starts and ends with the revisited id
    #[error("Cycle detected: {}", format_path(path))]
    CycleDetected { path: Vec<CompositionId> },

    #[error("Composition {id} depends on missing composition {missing}")]
    DanglingDependency {
        id: CompositionId,
        missing: CompositionId,
    },

    /// Dependency quantity unit differs from the referenced unit
    #[error("Unit mismatch: {left} != {right}")]
    UnitMismatch { left: String, right: String },
}

/// Propagation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    /// Derived cost or subvalue of `id` is not a finite number
    #[error("Cost of {id} overflows")]
    CostOverflow { id: CompositionId },

    /// Fatal
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// Persistence adapter errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// All errors surfaced by the Composition service
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompositionError {
    #[error("Composition not found: {0}")]
    NotFound(CompositionId),

    #[error("Composition already exists: {0}")]
    AlreadyExists(CompositionId),

    #[error("Composition {id} is referenced by {dependents:?}")]
    ReferencedByOthers {
        id: CompositionId,
        dependents: Vec<CompositionId>,
    },

    #[error("Cycle detected: {}", format_path(path))]
    CycleDetected { path: Vec<CompositionId> },

    #[error("Composition {id} depends on missing composition {missing}")]
    DanglingDependency {
        id: CompositionId,
        missing: CompositionId,
    },

    #[error("Field '{field}' cannot be changed after creation")]
    ImmutableFieldChanged { field: String },

    #[error("Unit mismatch: {left} != {right}")]
    UnitMismatch { left: String, right: String },

    #[error("Division by zero: quantity of {unit} is 0")]
    DivisionByZero { unit: String },

    #[error("Cost cannot be negative: {0}")]
    NegativeCost(f64),

    #[error("Invalid quantity for '{field}'")]
    InvalidQuantity { field: String },

    #[error("Duplicate dependency on {0}")]
    DuplicateDependency(CompositionId),

    #[error("Composition {id} has no dependency on {of}")]
    DependencyNotFound {
        id: CompositionId,
        of: CompositionId,
    },

    #[error("Too many dependencies: {count} > {max}")]
    TooManyDependencies { count: usize, max: usize },

    #[error("Cost of {id} overflows")]
    CostOverflow { id: CompositionId },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),
}

impl CompositionError {
    /// Fatal errors indicate a bug or an infrastructure failure, not a bad request
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CompositionError::InvariantViolation(_) | CompositionError::Persistence(_)
        )
    }
}

/// Result alias used throughout the engine
pub type CompositionResult<T> = Result<T, CompositionError>;

impl From<GraphError> for CompositionError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::NotFound(id) => CompositionError::NotFound(id),
            GraphError::ReferencedByOthers { id, dependents } => {
                CompositionError::ReferencedByOthers { id, dependents }
            }
        }
    }
}

impl From<ValidationError> for CompositionError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::CycleDetected { path } => CompositionError::CycleDetected { path },
            ValidationError::DanglingDependency { id, missing } => {
                CompositionError::DanglingDependency { id, missing }
            }
            ValidationError::UnitMismatch { left, right } => {
                CompositionError::UnitMismatch { left, right }
            }
        }
    }
}

impl From<QuantityError> for CompositionError {
    fn from(err: QuantityError) -> Self {
        match err {
            QuantityError::UnitMismatch { left, right } => {
                CompositionError::UnitMismatch { left, right }
            }
            QuantityError::DivisionByZero { unit } => CompositionError::DivisionByZero { unit },
        }
    }
}

impl From<PropagationError> for CompositionError {
    fn from(err: PropagationError) -> Self {
        match err {
            PropagationError::CostOverflow { id } => CompositionError::CostOverflow { id },
            PropagationError::InvariantViolation(msg) => CompositionError::InvariantViolation(msg),
        }
    }
}

impl From<RepositoryError> for CompositionError {
    fn from(err: RepositoryError) -> Self {
        CompositionError::Persistence(err.to_string())
    }
}

fn format_path(path: &[CompositionId]) -> String {
    path.iter()
        .map(CompositionId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

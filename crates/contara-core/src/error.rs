use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use contara_uom::{Unit, UomError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("incompatible units: {from} and {to} are in different families")]
    IncompatibleUnits { from: Unit, to: Unit },

    #[error("invalid layer: {0}")]
    InvalidLayer(String),

    #[error("quantity must be positive, got {qty}")]
    InvalidQuantity { qty: Decimal },

    #[error("layer {layer_id} holds {remaining}, cannot take {requested}")]
    InsufficientLayerQuantity {
        layer_id: Uuid,
        requested: Decimal,
        remaining: Decimal,
    },

    #[error(
        "insufficient stock for item {item_id} in warehouse {warehouse_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        item_id: Uuid,
        warehouse_id: Uuid,
        requested: Decimal,
        available: Decimal,
    },

    #[error("conversion factor for {unit} resolved to zero")]
    DivisionByZero { unit: Unit },

    #[error("journal entry out of balance: debits {debits}, credits {credits}")]
    UnbalancedEntry { debits: Decimal, credits: Decimal },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("invalid stored record: {0}")]
    InvalidRecord(String),

    #[error("storage conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(anyhow::Error),
}

impl EngineError {
    pub fn storage(err: impl Into<anyhow::Error>) -> Self {
        EngineError::Storage(err.into())
    }

    /// Whether a caller may retry the operation. Every engine mutation
    /// either commits fully or rolls back, so a retryable failure leaves
    /// nothing behind; everything else is a business rejection or a defect.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Conflict(_) | EngineError::Storage(_))
    }
}

impl From<UomError> for EngineError {
    fn from(err: UomError) -> Self {
        match err {
            UomError::IncompatibleUnits { from, to } => EngineError::IncompatibleUnits { from, to },
            UomError::ZeroFactor { unit } => EngineError::DivisionByZero { unit },
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

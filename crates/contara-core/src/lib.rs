pub mod accounts;
pub mod error;
pub mod events;
pub mod models;
pub mod storage;

pub use accounts::{ChartOfAccounts, PucLiteProfile, StandardsProfile};
pub use error::{EngineError, EngineResult};
pub use events::{DomainEvent, DomainEventKind};
pub use models::{
    AllocationPlan, Consumption, CostLayer, Item, ItemRecost, JournalEntry, JournalLine,
    LayerRevalue, LayerSplit, LayerTake, MoveNormalization, ReceiptKind, ReceiptMove,
    RecostCandidate,
};
pub use storage::{EventStore, InventoryStore};

pub use contara_uom::{Converter, PackSizes, Unit, UnitFamily, UomError, round_money};

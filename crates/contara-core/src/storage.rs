use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::events::DomainEvent;
use crate::models::{
    AllocationPlan, Consumption, CostLayer, Item, ItemRecost, JournalEntry, ReceiptMove,
    RecostCandidate,
};

/// The engine's storage handle. Implementations must make every `insert_*`
/// and `apply_*` atomic: either the whole call commits or nothing does.
/// Plans are produced from a snapshot, so applies re-validate quantities
/// against current state and fail with a retryable `Conflict` when a
/// concurrent consumer got there first.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn insert_item(&self, item: &Item) -> EngineResult<()>;
    async fn item(&self, item_id: Uuid) -> EngineResult<Item>;

    async fn layer(&self, layer_id: Uuid) -> EngineResult<CostLayer>;

    /// Layers with remaining quantity for one item+warehouse, in creation
    /// order (ascending sequence).
    async fn open_layers(&self, item_id: Uuid, warehouse_id: Uuid) -> EngineResult<Vec<CostLayer>>;

    /// Persist a receipt move together with the layer it creates. Assigns
    /// the layer's sequence and returns the stored layer.
    async fn insert_receipt(
        &self,
        receipt: &ReceiptMove,
        layer: &CostLayer,
    ) -> EngineResult<CostLayer>;

    /// Persist a layer with no originating move.
    async fn insert_manual_layer(&self, layer: &CostLayer) -> EngineResult<CostLayer>;

    /// Take quantity out of a single layer. Fails with
    /// `InsufficientLayerQuantity` rather than letting the layer go
    /// negative. Returns the layer after the decrement.
    async fn decrement_layer(&self, layer_id: Uuid, qty: Decimal) -> EngineResult<CostLayer>;

    /// Overwrite a layer's unit cost, quantity untouched. Re-costing only.
    async fn set_unit_cost(&self, layer_id: Uuid, unit_cost: Decimal) -> EngineResult<()>;

    /// Apply a full allocation plan: split layers, decrement takes, mint
    /// consumption records. One transaction.
    async fn apply_allocation(&self, plan: &AllocationPlan) -> EngineResult<Vec<Consumption>>;

    async fn consumptions_for_issue(&self, move_out_id: Uuid) -> EngineResult<Vec<Consumption>>;

    /// Base-unit layers whose originating receipt was recorded in a
    /// different unit, joined with their item and move.
    async fn recost_candidates(&self) -> EngineResult<Vec<RecostCandidate>>;

    /// Apply one item's normalization: rewrite the moves, the layers' unit
    /// costs, and every consumption snapshot drawn from those layers. One
    /// transaction; partial application is an invariant violation.
    async fn apply_recost(&self, recost: &ItemRecost) -> EngineResult<()>;

    /// Persist a balanced journal entry with its lines. Refuses unbalanced
    /// input outright.
    async fn insert_journal_entry(&self, entry: &JournalEntry) -> EngineResult<()>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: DomainEvent) -> EngineResult<()>;
    async fn stream(&self, aggregate_id: Uuid) -> EngineResult<Vec<DomainEvent>>;
}

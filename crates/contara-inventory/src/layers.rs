use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use contara_core::{
    CostLayer, EngineError, EngineResult, InventoryStore, ReceiptKind, ReceiptMove, Unit,
};

#[derive(Debug, Clone)]
pub struct ReceiptInput {
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub kind: ReceiptKind,
    pub qty: Decimal,
    pub unit: Unit,
    pub unit_cost: Decimal,
    pub lot_code: Option<String>,
    pub expires_at: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct ManualLayerInput {
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub qty: Decimal,
    pub unit: Unit,
    pub unit_cost: Decimal,
    pub lot_code: Option<String>,
    pub expires_at: Option<NaiveDate>,
}

fn validate_amounts(qty: Decimal, unit_cost: Decimal) -> EngineResult<()> {
    if qty < Decimal::ZERO {
        return Err(EngineError::InvalidLayer(format!("quantity {qty} is negative")));
    }
    if unit_cost < Decimal::ZERO {
        return Err(EngineError::InvalidLayer(format!("unit cost {unit_cost} is negative")));
    }
    Ok(())
}

/// Post a receipt: one move plus one layer, atomically. The layer quantity
/// is always converted to the item's base unit; the unit cost is kept as
/// recorded, so a receipt in a non-base unit leaves the cost denominated per
/// recorded unit until the normalization run repairs it.
pub async fn post_receipt(
    store: &dyn InventoryStore,
    input: ReceiptInput,
) -> EngineResult<(ReceiptMove, CostLayer)> {
    validate_amounts(input.qty, input.unit_cost)?;
    let item = store.item(input.item_id).await?;
    let qty_base = item.converter().convert(input.qty, input.unit, item.base_unit)?;

    let receipt = ReceiptMove {
        id: Uuid::new_v4(),
        item_id: input.item_id,
        warehouse_id: input.warehouse_id,
        kind: input.kind,
        recorded_qty: input.qty,
        recorded_unit: input.unit,
        recorded_unit_cost: input.unit_cost,
        posted_at: Utc::now(),
    };
    let layer = CostLayer {
        id: Uuid::new_v4(),
        item_id: input.item_id,
        warehouse_id: input.warehouse_id,
        unit: item.base_unit,
        remaining_qty: qty_base,
        unit_cost: input.unit_cost,
        lot_code: input.lot_code,
        expires_at: input.expires_at,
        move_in_id: Some(receipt.id),
        sequence: 0,
        created_at: receipt.posted_at,
    };
    let stored = store.insert_receipt(&receipt, &layer).await?;
    Ok((receipt, stored))
}

/// Create a layer with no originating move, e.g. an opening balance taken at
/// stocktake. The layer may be denominated in any unit of the base unit's
/// family; the allocator splits coarse layers on demand.
pub async fn create_manual_layer(
    store: &dyn InventoryStore,
    input: ManualLayerInput,
) -> EngineResult<CostLayer> {
    validate_amounts(input.qty, input.unit_cost)?;
    let item = store.item(input.item_id).await?;
    if input.unit.family() != item.base_unit.family() {
        return Err(EngineError::IncompatibleUnits {
            from: input.unit,
            to: item.base_unit,
        });
    }

    let layer = CostLayer {
        id: Uuid::new_v4(),
        item_id: input.item_id,
        warehouse_id: input.warehouse_id,
        unit: input.unit,
        remaining_qty: input.qty,
        unit_cost: input.unit_cost,
        lot_code: input.lot_code,
        expires_at: input.expires_at,
        move_in_id: None,
        sequence: 0,
        created_at: Utc::now(),
    };
    store.insert_manual_layer(&layer).await
}

use rust_decimal::Decimal;
use uuid::Uuid;

use contara_core::{
    AllocationPlan, Consumption, CostLayer, EngineError, EngineResult, InventoryStore, Item,
    LayerSplit, LayerTake, Unit,
};

/// What to do when the open layers cannot cover the request. `Reject` is
/// the default; `Tolerate` applies the partial plan and reports the
/// remainder so a caller-side policy (backfill, backorder) can deal with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortfallPolicy {
    #[default]
    Reject,
    Tolerate,
}

#[derive(Debug, Clone)]
pub struct AllocationRequest {
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub move_out_id: Uuid,
    pub qty: Decimal,
    pub unit: Unit,
    pub policy: ShortfallPolicy,
}

#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    pub consumptions: Vec<Consumption>,
    /// Base-unit quantity the layers could not cover. Zero unless the
    /// request ran under `ShortfallPolicy::Tolerate`.
    pub shortfall: Decimal,
}

/// Cover an issue request from the open layers, oldest first. Fails before
/// any side effect on a unit mismatch or, under the default policy, on
/// insufficient stock. The apply is a single transaction; if a concurrent
/// consumer drained a planned layer first the store reports a retryable
/// `Conflict` and the caller re-runs the allocation against fresh state.
pub async fn allocate(
    store: &dyn InventoryStore,
    request: &AllocationRequest,
) -> EngineResult<AllocationOutcome> {
    if request.qty <= Decimal::ZERO {
        return Err(EngineError::InvalidQuantity { qty: request.qty });
    }
    let item = store.item(request.item_id).await?;
    let qty_base = item
        .converter()
        .convert(request.qty, request.unit, item.base_unit)?;

    let layers = store.open_layers(request.item_id, request.warehouse_id).await?;
    let plan = plan_allocation(
        &item,
        request.warehouse_id,
        &layers,
        qty_base,
        request.move_out_id,
    )?;

    if plan.shortfall > Decimal::ZERO && request.policy == ShortfallPolicy::Reject {
        return Err(EngineError::InsufficientStock {
            item_id: request.item_id,
            warehouse_id: request.warehouse_id,
            requested: qty_base,
            available: qty_base - plan.shortfall,
        });
    }

    let consumptions = store.apply_allocation(&plan).await?;
    Ok(AllocationOutcome {
        consumptions,
        shortfall: plan.shortfall,
    })
}

/// Walk the layers in creation order and greedily take until the request is
/// covered. Base-unit layers are taken directly; a coarser layer of the same
/// family is first split into a fresh base-unit layer (source decremented by
/// the equivalent coarse quantity, cost converted per unit price), and the
/// take draws from the split. Pure: no storage access, no side effects.
pub fn plan_allocation(
    item: &Item,
    warehouse_id: Uuid,
    layers: &[CostLayer],
    qty_base: Decimal,
    move_out_id: Uuid,
) -> EngineResult<AllocationPlan> {
    let converter = item.converter();
    let mut ordered: Vec<&CostLayer> = layers
        .iter()
        .filter(|layer| layer.remaining_qty > Decimal::ZERO)
        .collect();
    ordered.sort_by_key(|layer| layer.sequence);

    let mut splits = Vec::new();
    let mut takes = Vec::new();
    let mut needed = qty_base;

    for layer in ordered {
        if needed.is_zero() {
            break;
        }
        if layer.unit == item.base_unit {
            let take = layer.remaining_qty.min(needed);
            takes.push(LayerTake {
                layer_id: layer.id,
                qty: take,
                unit_cost: layer.unit_cost,
            });
            needed -= take;
        } else {
            let available_base = converter.convert(layer.remaining_qty, layer.unit, item.base_unit)?;
            let take = available_base.min(needed);
            let source_qty = converter.convert(take, item.base_unit, layer.unit)?;
            let unit_cost = converter.convert_unit_price(layer.unit_cost, layer.unit, item.base_unit)?;
            let new_layer_id = Uuid::new_v4();
            splits.push(LayerSplit {
                source_layer_id: layer.id,
                source_qty,
                new_layer_id,
                unit: item.base_unit,
                qty: take,
                unit_cost,
            });
            takes.push(LayerTake {
                layer_id: new_layer_id,
                qty: take,
                unit_cost,
            });
            needed -= take;
        }
    }

    Ok(AllocationPlan {
        item_id: item.id,
        warehouse_id,
        move_out_id,
        splits,
        takes,
        shortfall: needed,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use contara_core::PackSizes;

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(base: Unit) -> Item {
        Item {
            id: Uuid::new_v4(),
            code: "CAF-001".into(),
            name: "Roast coffee".into(),
            base_unit: base,
            display_unit: base,
            pack_sizes: PackSizes::default(),
            inventory_account: None,
            cogs_account: None,
            created_at: Utc::now(),
        }
    }

    fn layer(item: &Item, unit: Unit, qty: &str, cost: &str, sequence: i64) -> CostLayer {
        CostLayer {
            id: Uuid::new_v4(),
            item_id: item.id,
            warehouse_id: Uuid::nil(),
            unit,
            remaining_qty: dec(qty),
            unit_cost: dec(cost),
            lot_code: None,
            expires_at: None,
            move_in_id: None,
            sequence,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn takes_follow_creation_order() {
        let item = item(Unit::Un);
        let first = layer(&item, Unit::Un, "5", "10", 1);
        let second = layer(&item, Unit::Un, "10", "12", 2);
        // Deliberately passed newest-first; the planner must reorder.
        let plan = plan_allocation(
            &item,
            Uuid::nil(),
            &[second.clone(), first.clone()],
            dec("7"),
            Uuid::new_v4(),
        )
        .unwrap();

        assert_eq!(plan.takes.len(), 2);
        assert_eq!(plan.takes[0].layer_id, first.id);
        assert_eq!(plan.takes[0].qty, dec("5"));
        assert_eq!(plan.takes[0].unit_cost, dec("10"));
        assert_eq!(plan.takes[1].layer_id, second.id);
        assert_eq!(plan.takes[1].qty, dec("2"));
        assert_eq!(plan.shortfall, Decimal::ZERO);
    }

    #[test]
    fn plan_conserves_quantity() {
        let item = item(Unit::G);
        let layers = vec![
            layer(&item, Unit::G, "300", "2", 1),
            layer(&item, Unit::G, "450", "2.1", 2),
            layer(&item, Unit::G, "250", "2.2", 3),
        ];
        let plan = plan_allocation(&item, Uuid::nil(), &layers, dec("800"), Uuid::new_v4()).unwrap();

        let taken: Decimal = plan.takes.iter().map(|t| t.qty).sum();
        assert_eq!(taken + plan.shortfall, dec("800"));
        assert_eq!(plan.shortfall, Decimal::ZERO);
    }

    #[test]
    fn shortfall_is_the_uncovered_remainder() {
        let item = item(Unit::Un);
        let layers = vec![layer(&item, Unit::Un, "4", "1", 1)];
        let plan = plan_allocation(&item, Uuid::nil(), &layers, dec("10"), Uuid::new_v4()).unwrap();
        assert_eq!(plan.shortfall, dec("6"));
        assert_eq!(plan.takes.len(), 1);
        assert_eq!(plan.takes[0].qty, dec("4"));
    }

    #[test]
    fn coarse_layer_is_split_before_the_take() {
        let item = item(Unit::G);
        let coarse = layer(&item, Unit::Kg, "2", "2000", 1);
        let plan =
            plan_allocation(&item, Uuid::nil(), &[coarse.clone()], dec("300"), Uuid::new_v4())
                .unwrap();

        assert_eq!(plan.splits.len(), 1);
        let split = &plan.splits[0];
        assert_eq!(split.source_layer_id, coarse.id);
        assert_eq!(split.source_qty, dec("0.3"));
        assert_eq!(split.unit, Unit::G);
        assert_eq!(split.qty, dec("300"));
        assert_eq!(split.unit_cost, dec("2.00"));

        assert_eq!(plan.takes.len(), 1);
        assert_eq!(plan.takes[0].layer_id, split.new_layer_id);
        assert_eq!(plan.takes[0].qty, dec("300"));
        assert_eq!(plan.takes[0].unit_cost, dec("2.00"));
        assert_eq!(plan.shortfall, Decimal::ZERO);
    }

    #[test]
    fn exhausted_layers_are_skipped() {
        let item = item(Unit::Un);
        let empty = layer(&item, Unit::Un, "0", "9", 1);
        let live = layer(&item, Unit::Un, "3", "10", 2);
        let plan = plan_allocation(
            &item,
            Uuid::nil(),
            &[empty, live.clone()],
            dec("2"),
            Uuid::new_v4(),
        )
        .unwrap();
        assert_eq!(plan.takes.len(), 1);
        assert_eq!(plan.takes[0].layer_id, live.id);
    }
}

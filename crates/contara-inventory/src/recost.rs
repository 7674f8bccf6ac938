use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info};
use uuid::Uuid;

use contara_core::{
    ChartOfAccounts, EngineError, EngineResult, InventoryStore, Item, ItemRecost, LayerRevalue,
    MoveNormalization, RecostCandidate, round_money,
};
use contara_ledger::{ItemDelta, revaluation_entry};

#[derive(Debug)]
pub struct ItemFailure {
    pub item_id: Uuid,
    pub item_code: String,
    pub error: EngineError,
}

#[derive(Debug)]
pub struct NormalizationReport {
    pub run_id: Uuid,
    pub items_scanned: usize,
    pub items_applied: usize,
    pub failures: Vec<ItemFailure>,
    pub total_delta: Decimal,
    pub journal_entry_id: Option<Uuid>,
}

/// Plan one item's normalization. For each mismatched layer the receipt's
/// recorded cost is re-denominated into the base unit
/// (`recorded_cost / convert(1, recorded_unit, base_unit)`), the layer's
/// value change on its remaining quantity is accumulated into the item
/// delta, and the move itself is rewritten in base terms so a second scan
/// comes back empty. Pure: no storage access.
pub fn plan_item_recost(item: &Item, candidates: &[RecostCandidate]) -> EngineResult<ItemRecost> {
    let converter = item.converter();
    let mut moves: Vec<MoveNormalization> = Vec::new();
    let mut layers = Vec::new();
    let mut delta = Decimal::ZERO;

    for candidate in candidates {
        let receipt = &candidate.receipt;
        let layer = &candidate.layer;

        let factor = converter.convert(Decimal::ONE, receipt.recorded_unit, item.base_unit)?;
        if factor.is_zero() {
            return Err(EngineError::DivisionByZero {
                unit: receipt.recorded_unit,
            });
        }
        let new_unit_cost = receipt.recorded_unit_cost / factor;

        let old_value = round_money(layer.remaining_qty * layer.unit_cost);
        let new_value = round_money(layer.remaining_qty * new_unit_cost);
        let layer_delta = new_value - old_value;
        delta += layer_delta;
        layers.push(LayerRevalue {
            layer_id: layer.id,
            unit_cost: new_unit_cost,
            delta: layer_delta,
        });

        if !moves.iter().any(|m: &MoveNormalization| m.move_id == receipt.id) {
            let qty_base =
                converter.convert(receipt.recorded_qty, receipt.recorded_unit, item.base_unit)?;
            moves.push(MoveNormalization {
                move_id: receipt.id,
                unit: item.base_unit,
                qty: qty_base,
                unit_cost: new_unit_cost,
            });
        }
    }

    Ok(ItemRecost {
        item_id: item.id,
        moves,
        layers,
        delta,
    })
}

/// The batch normalization run. Scans for mismatched receipts, applies each
/// item's correction in its own transaction (one item failing never stops
/// the others), then posts a single merged journal entry for the deltas of
/// the items that applied. Re-running against normalized data scans empty
/// and posts nothing.
pub async fn run_normalization(
    store: &dyn InventoryStore,
    chart: &ChartOfAccounts,
) -> EngineResult<NormalizationReport> {
    let run_id = Uuid::new_v4();
    let candidates = store.recost_candidates().await?;

    let mut groups: Vec<(Item, Vec<RecostCandidate>)> = Vec::new();
    for candidate in candidates {
        match groups.iter_mut().find(|(item, _)| item.id == candidate.item.id) {
            Some((_, group)) => group.push(candidate),
            None => groups.push((candidate.item.clone(), vec![candidate])),
        }
    }

    let mut report = NormalizationReport {
        run_id,
        items_scanned: groups.len(),
        items_applied: 0,
        failures: Vec::new(),
        total_delta: Decimal::ZERO,
        journal_entry_id: None,
    };
    let mut deltas: Vec<ItemDelta> = Vec::new();

    for (item, group) in &groups {
        let applied = match plan_item_recost(item, group) {
            Ok(plan) => match store.apply_recost(&plan).await {
                Ok(()) => Ok(plan),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };
        match applied {
            Ok(plan) => {
                info!(
                    item = %item.code,
                    layers = plan.layers.len(),
                    delta = %plan.delta,
                    "normalized cost layers"
                );
                report.items_applied += 1;
                report.total_delta += plan.delta;
                deltas.push(ItemDelta {
                    item_id: item.id,
                    item_code: item.code.clone(),
                    inventory_account: chart.inventory_account_for(item),
                    cogs_account: chart.cogs_account_for(item),
                    delta: plan.delta,
                });
            }
            Err(err) => {
                error!(item = %item.code, item_id = %item.id, error = %err, "normalization failed");
                report.failures.push(ItemFailure {
                    item_id: item.id,
                    item_code: item.code.clone(),
                    error: err,
                });
            }
        }
    }

    if let Some(entry) = revaluation_entry(run_id, Utc::now().date_naive(), &deltas)? {
        store.insert_journal_entry(&entry).await?;
        report.journal_entry_id = Some(entry.id);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use contara_core::{CostLayer, PackSizes, ReceiptKind, ReceiptMove, Unit};

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(base: Unit, packs: PackSizes) -> Item {
        Item {
            id: Uuid::new_v4(),
            code: "CAF-001".into(),
            name: "Roast coffee".into(),
            base_unit: base,
            display_unit: base,
            pack_sizes: packs,
            inventory_account: None,
            cogs_account: None,
            created_at: Utc::now(),
        }
    }

    fn candidate(item: &Item, unit: Unit, recorded_qty: &str, cost: &str, remaining: &str) -> RecostCandidate {
        let receipt = ReceiptMove {
            id: Uuid::new_v4(),
            item_id: item.id,
            warehouse_id: Uuid::nil(),
            kind: ReceiptKind::Purchase,
            recorded_qty: dec(recorded_qty),
            recorded_unit: unit,
            recorded_unit_cost: dec(cost),
            posted_at: Utc::now(),
        };
        let layer = CostLayer {
            id: Uuid::new_v4(),
            item_id: item.id,
            warehouse_id: Uuid::nil(),
            unit: item.base_unit,
            remaining_qty: dec(remaining),
            unit_cost: dec(cost),
            lot_code: None,
            expires_at: None,
            move_in_id: Some(receipt.id),
            sequence: 1,
            created_at: Utc::now(),
        };
        RecostCandidate {
            item: item.clone(),
            receipt,
            layer,
        }
    }

    #[test]
    fn kilogram_receipt_re_denominates_to_grams() {
        let item = item(Unit::G, PackSizes::default());
        let candidate = candidate(&item, Unit::Kg, "10", "2000", "8000");

        let plan = plan_item_recost(&item, &[candidate]).unwrap();
        assert_eq!(plan.layers.len(), 1);
        assert_eq!(plan.layers[0].unit_cost, dec("2"));
        // Stored value goes from 8000 * 2000 to 8000 * 2.
        assert_eq!(plan.layers[0].delta, dec("16000.00") - dec("16000000.00"));
        assert_eq!(plan.delta, plan.layers[0].delta);

        assert_eq!(plan.moves.len(), 1);
        assert_eq!(plan.moves[0].unit, Unit::G);
        assert_eq!(plan.moves[0].qty, dec("10000"));
        assert_eq!(plan.moves[0].unit_cost, dec("2"));
    }

    #[test]
    fn corrected_layer_value_matches_the_recorded_value() {
        let item = item(Unit::G, PackSizes::default());
        let candidate = candidate(&item, Unit::Kg, "10", "2000", "10000");

        let plan = plan_item_recost(&item, &[candidate.clone()]).unwrap();
        let corrected = plan.layers[0].unit_cost * candidate.layer.remaining_qty;
        let recorded = candidate.receipt.recorded_qty * candidate.receipt.recorded_unit_cost;
        assert_eq!(corrected, recorded);
    }

    #[test]
    fn deltas_accumulate_across_layers_of_one_item() {
        let item = item(Unit::Un, PackSizes::default());
        let a = candidate(&item, Unit::Dz, "2", "12", "24");
        let b = candidate(&item, Unit::Dz, "1", "24", "12");

        let plan = plan_item_recost(&item, &[a, b]).unwrap();
        // 24 * 1 - 24 * 12 plus 12 * 2 - 12 * 24.
        assert_eq!(plan.delta, dec("-264.00") + dec("-264.00"));
        assert_eq!(plan.layers.len(), 2);
        assert_eq!(plan.moves.len(), 2);
    }

    #[test]
    fn zero_pack_factor_is_a_division_by_zero() {
        let packs = PackSizes {
            per_package: Decimal::ZERO,
            per_box: Decimal::ONE,
            per_roll: Decimal::ONE,
        };
        let item = item(Unit::Un, packs);
        let candidate = candidate(&item, Unit::Pkg, "5", "100", "5");

        let err = plan_item_recost(&item, &[candidate]).unwrap_err();
        assert!(matches!(err, EngineError::DivisionByZero { unit: Unit::Pkg }));
    }
}

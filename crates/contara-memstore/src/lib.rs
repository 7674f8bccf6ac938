use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use contara_core::{
    AllocationPlan, Consumption, CostLayer, DomainEvent, DomainEventKind, EngineError,
    EngineResult, EventStore, InventoryStore, Item, ItemRecost, JournalEntry, ReceiptMove,
    RecostCandidate,
};

#[derive(Default)]
struct State {
    items: HashMap<Uuid, Item>,
    receipts: HashMap<Uuid, ReceiptMove>,
    layers: HashMap<Uuid, CostLayer>,
    consumptions: Vec<Consumption>,
    journal: Vec<JournalEntry>,
    events: Vec<DomainEvent>,
    sequence: i64,
}

impl State {
    fn next_sequence(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    fn record(&mut self, aggregate_id: Uuid, kind: DomainEventKind, payload: serde_json::Value) {
        self.events.push(DomainEvent::new(aggregate_id, kind, payload));
    }

    fn layer_mut(&mut self, layer_id: Uuid) -> EngineResult<&mut CostLayer> {
        self.layers.get_mut(&layer_id).ok_or(EngineError::NotFound {
            entity: "layer",
            id: layer_id,
        })
    }
}

/// In-memory store for tests and local development. A single write lock
/// serializes every mutation, and each `apply_*` validates the whole plan
/// against current state before touching anything, so an apply is atomic
/// the same way the Postgres implementation's transactions are.
#[derive(Default)]
pub struct InMemoryInventoryStore {
    state: RwLock<State>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn journal_entries(&self) -> Vec<JournalEntry> {
        self.state.read().await.journal.clone()
    }

    pub async fn all_consumptions(&self) -> Vec<Consumption> {
        self.state.read().await.consumptions.clone()
    }

    pub async fn receipt(&self, move_id: Uuid) -> Option<ReceiptMove> {
        self.state.read().await.receipts.get(&move_id).cloned()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn insert_item(&self, item: &Item) -> EngineResult<()> {
        if item.display_unit.family() != item.base_unit.family() {
            return Err(EngineError::InvalidRecord(format!(
                "item {} display unit {} is not in the {} family",
                item.code, item.display_unit, item.base_unit
            )));
        }
        let mut state = self.state.write().await;
        state.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn item(&self, item_id: Uuid) -> EngineResult<Item> {
        self.state
            .read()
            .await
            .items
            .get(&item_id)
            .cloned()
            .ok_or(EngineError::NotFound {
                entity: "item",
                id: item_id,
            })
    }

    async fn layer(&self, layer_id: Uuid) -> EngineResult<CostLayer> {
        self.state
            .read()
            .await
            .layers
            .get(&layer_id)
            .cloned()
            .ok_or(EngineError::NotFound {
                entity: "layer",
                id: layer_id,
            })
    }

    async fn open_layers(&self, item_id: Uuid, warehouse_id: Uuid) -> EngineResult<Vec<CostLayer>> {
        let state = self.state.read().await;
        let mut layers: Vec<CostLayer> = state
            .layers
            .values()
            .filter(|layer| {
                layer.item_id == item_id
                    && layer.warehouse_id == warehouse_id
                    && layer.remaining_qty > Decimal::ZERO
            })
            .cloned()
            .collect();
        layers.sort_by_key(|layer| layer.sequence);
        Ok(layers)
    }

    async fn insert_receipt(
        &self,
        receipt: &ReceiptMove,
        layer: &CostLayer,
    ) -> EngineResult<CostLayer> {
        let mut state = self.state.write().await;
        let mut stored = layer.clone();
        stored.sequence = state.next_sequence();
        state.receipts.insert(receipt.id, receipt.clone());
        state.layers.insert(stored.id, stored.clone());
        state.record(
            receipt.item_id,
            DomainEventKind::StockReceived,
            json!({
                "move_in_id": receipt.id,
                "layer_id": stored.id,
                "qty": stored.remaining_qty,
                "unit": stored.unit,
            }),
        );
        Ok(stored)
    }

    async fn insert_manual_layer(&self, layer: &CostLayer) -> EngineResult<CostLayer> {
        let mut state = self.state.write().await;
        let mut stored = layer.clone();
        stored.sequence = state.next_sequence();
        state.layers.insert(stored.id, stored.clone());
        state.record(
            stored.item_id,
            DomainEventKind::StockReceived,
            json!({
                "layer_id": stored.id,
                "qty": stored.remaining_qty,
                "unit": stored.unit,
                "manual": true,
            }),
        );
        Ok(stored)
    }

    async fn decrement_layer(&self, layer_id: Uuid, qty: Decimal) -> EngineResult<CostLayer> {
        let mut state = self.state.write().await;
        let layer = state.layer_mut(layer_id)?;
        if layer.remaining_qty < qty {
            return Err(EngineError::InsufficientLayerQuantity {
                layer_id,
                requested: qty,
                remaining: layer.remaining_qty,
            });
        }
        layer.remaining_qty -= qty;
        Ok(layer.clone())
    }

    async fn set_unit_cost(&self, layer_id: Uuid, unit_cost: Decimal) -> EngineResult<()> {
        let mut state = self.state.write().await;
        state.layer_mut(layer_id)?.unit_cost = unit_cost;
        Ok(())
    }

    async fn apply_allocation(&self, plan: &AllocationPlan) -> EngineResult<Vec<Consumption>> {
        let mut state = self.state.write().await;

        // Validate the whole plan against current state before mutating:
        // a stale plan must fail without leaving half an allocation behind.
        for split in &plan.splits {
            let source = state.layers.get(&split.source_layer_id).ok_or(EngineError::NotFound {
                entity: "layer",
                id: split.source_layer_id,
            })?;
            if source.remaining_qty < split.source_qty {
                return Err(EngineError::Conflict(format!(
                    "layer {} holds {}, split needs {}",
                    source.id, source.remaining_qty, split.source_qty
                )));
            }
        }
        for take in &plan.takes {
            if let Some(split) = plan.splits.iter().find(|s| s.new_layer_id == take.layer_id) {
                if take.qty > split.qty {
                    return Err(EngineError::Conflict(format!(
                        "take {} exceeds split quantity {}",
                        take.qty, split.qty
                    )));
                }
                continue;
            }
            let layer = state.layers.get(&take.layer_id).ok_or(EngineError::NotFound {
                entity: "layer",
                id: take.layer_id,
            })?;
            if layer.remaining_qty < take.qty {
                return Err(EngineError::Conflict(format!(
                    "layer {} holds {}, take needs {}",
                    layer.id, layer.remaining_qty, take.qty
                )));
            }
        }

        let now = Utc::now();
        for split in &plan.splits {
            let (lot_code, expires_at) = {
                let source = state.layer_mut(split.source_layer_id)?;
                source.remaining_qty -= split.source_qty;
                (source.lot_code.clone(), source.expires_at)
            };
            let sequence = state.next_sequence();
            state.layers.insert(
                split.new_layer_id,
                CostLayer {
                    id: split.new_layer_id,
                    item_id: plan.item_id,
                    warehouse_id: plan.warehouse_id,
                    unit: split.unit,
                    remaining_qty: split.qty,
                    unit_cost: split.unit_cost,
                    lot_code,
                    expires_at,
                    move_in_id: None,
                    sequence,
                    created_at: now,
                },
            );
            state.record(
                plan.item_id,
                DomainEventKind::LayerSplit,
                json!({
                    "source_layer_id": split.source_layer_id,
                    "new_layer_id": split.new_layer_id,
                    "qty": split.qty,
                    "unit": split.unit,
                }),
            );
        }

        let mut consumptions = Vec::with_capacity(plan.takes.len());
        for take in &plan.takes {
            state.layer_mut(take.layer_id)?.remaining_qty -= take.qty;
            let consumption = Consumption {
                id: Uuid::new_v4(),
                move_out_id: plan.move_out_id,
                layer_id: take.layer_id,
                qty: take.qty,
                unit_cost: take.unit_cost,
                created_at: now,
            };
            state.consumptions.push(consumption.clone());
            consumptions.push(consumption);
        }
        let issued: Decimal = plan.takes.iter().map(|take| take.qty).sum();
        state.record(
            plan.item_id,
            DomainEventKind::StockIssued,
            json!({
                "move_out_id": plan.move_out_id,
                "qty": issued,
                "layers": plan.takes.len(),
            }),
        );

        Ok(consumptions)
    }

    async fn consumptions_for_issue(&self, move_out_id: Uuid) -> EngineResult<Vec<Consumption>> {
        let state = self.state.read().await;
        Ok(state
            .consumptions
            .iter()
            .filter(|c| c.move_out_id == move_out_id)
            .cloned()
            .collect())
    }

    async fn recost_candidates(&self) -> EngineResult<Vec<RecostCandidate>> {
        let state = self.state.read().await;
        let mut candidates = Vec::new();
        for layer in state.layers.values() {
            let Some(move_in_id) = layer.move_in_id else {
                continue;
            };
            let receipt = state.receipts.get(&move_in_id).ok_or_else(|| {
                EngineError::InvalidRecord(format!(
                    "layer {} references missing receipt move {move_in_id}",
                    layer.id
                ))
            })?;
            let item = state.items.get(&layer.item_id).ok_or_else(|| {
                EngineError::InvalidRecord(format!(
                    "layer {} references missing item {}",
                    layer.id, layer.item_id
                ))
            })?;
            if layer.unit == item.base_unit && receipt.recorded_unit != item.base_unit {
                candidates.push(RecostCandidate {
                    item: item.clone(),
                    receipt: receipt.clone(),
                    layer: layer.clone(),
                });
            }
        }
        candidates.sort_by(|a, b| {
            a.item
                .code
                .cmp(&b.item.code)
                .then(a.layer.sequence.cmp(&b.layer.sequence))
        });
        Ok(candidates)
    }

    async fn apply_recost(&self, recost: &ItemRecost) -> EngineResult<()> {
        let mut state = self.state.write().await;

        for normalized in &recost.moves {
            if !state.receipts.contains_key(&normalized.move_id) {
                return Err(EngineError::NotFound {
                    entity: "receipt move",
                    id: normalized.move_id,
                });
            }
        }
        for revalue in &recost.layers {
            if !state.layers.contains_key(&revalue.layer_id) {
                return Err(EngineError::NotFound {
                    entity: "layer",
                    id: revalue.layer_id,
                });
            }
        }

        for normalized in &recost.moves {
            if let Some(receipt) = state.receipts.get_mut(&normalized.move_id) {
                receipt.recorded_unit = normalized.unit;
                receipt.recorded_qty = normalized.qty;
                receipt.recorded_unit_cost = normalized.unit_cost;
            }
        }
        for revalue in &recost.layers {
            if let Some(layer) = state.layers.get_mut(&revalue.layer_id) {
                layer.unit_cost = revalue.unit_cost;
            }
            for consumption in state
                .consumptions
                .iter_mut()
                .filter(|c| c.layer_id == revalue.layer_id)
            {
                consumption.unit_cost = revalue.unit_cost;
            }
            state.record(
                recost.item_id,
                DomainEventKind::LayerRecosted,
                json!({
                    "layer_id": revalue.layer_id,
                    "unit_cost": revalue.unit_cost,
                    "delta": revalue.delta,
                }),
            );
        }
        Ok(())
    }

    async fn insert_journal_entry(&self, entry: &JournalEntry) -> EngineResult<()> {
        if !entry.is_balanced() {
            return Err(EngineError::UnbalancedEntry {
                debits: entry.debit_total(),
                credits: entry.credit_total(),
            });
        }
        let mut state = self.state.write().await;
        state.journal.push(entry.clone());
        state.record(
            entry.source_id,
            DomainEventKind::JournalPosted,
            json!({
                "entry_id": entry.id,
                "lines": entry.lines.len(),
            }),
        );
        Ok(())
    }
}

#[async_trait]
impl EventStore for InMemoryInventoryStore {
    async fn append(&self, event: DomainEvent) -> EngineResult<()> {
        self.state.write().await.events.push(event);
        Ok(())
    }

    async fn stream(&self, aggregate_id: Uuid) -> EngineResult<Vec<DomainEvent>> {
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .filter(|event| event.aggregate_id == aggregate_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use contara_core::{LayerTake, PackSizes, Unit};

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

    fn layer(item: &Item, warehouse_id: Uuid, qty: &str, cost: &str) -> CostLayer {
        CostLayer {
            id: Uuid::new_v4(),
            item_id: item.id,
            warehouse_id,
            unit: item.base_unit,
            remaining_qty: dec(qty),
            unit_cost: dec(cost),
            lot_code: None,
            expires_at: None,
            move_in_id: None,
            sequence: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn sequences_are_assigned_in_insertion_order() {
        let store = InMemoryInventoryStore::new();
        let item = item(Unit::Un);
        store.insert_item(&item).await.unwrap();
        let warehouse = Uuid::new_v4();

        let first = store
            .insert_manual_layer(&layer(&item, warehouse, "5", "10"))
            .await
            .unwrap();
        let second = store
            .insert_manual_layer(&layer(&item, warehouse, "3", "11"))
            .await
            .unwrap();
        assert!(first.sequence < second.sequence);

        let open = store.open_layers(item.id, warehouse).await.unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].id, first.id);
    }

    #[tokio::test]
    async fn decrement_below_zero_is_refused() {
        let store = InMemoryInventoryStore::new();
        let item = item(Unit::Un);
        store.insert_item(&item).await.unwrap();
        let stored = store
            .insert_manual_layer(&layer(&item, Uuid::new_v4(), "5", "10"))
            .await
            .unwrap();

        let err = store.decrement_layer(stored.id, dec("6")).await.unwrap_err();
        assert!(matches!(err, EngineError::InsufficientLayerQuantity { .. }));

        let after = store.layer(stored.id).await.unwrap();
        assert_eq!(after.remaining_qty, dec("5"));
    }

    #[tokio::test]
    async fn a_stale_allocation_plan_fails_without_side_effects() {
        let store = InMemoryInventoryStore::new();
        let item = item(Unit::Un);
        store.insert_item(&item).await.unwrap();
        let warehouse = Uuid::new_v4();
        let a = store
            .insert_manual_layer(&layer(&item, warehouse, "5", "10"))
            .await
            .unwrap();
        let b = store
            .insert_manual_layer(&layer(&item, warehouse, "2", "11"))
            .await
            .unwrap();

        // Second take overdraws: the first must not be applied either.
        let plan = AllocationPlan {
            item_id: item.id,
            warehouse_id: warehouse,
            move_out_id: Uuid::new_v4(),
            splits: vec![],
            takes: vec![
                LayerTake {
                    layer_id: a.id,
                    qty: dec("5"),
                    unit_cost: dec("10"),
                },
                LayerTake {
                    layer_id: b.id,
                    qty: dec("3"),
                    unit_cost: dec("11"),
                },
            ],
            shortfall: Decimal::ZERO,
        };
        let err = store.apply_allocation(&plan).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
        assert!(err.is_retryable());

        assert_eq!(store.layer(a.id).await.unwrap().remaining_qty, dec("5"));
        assert_eq!(store.layer(b.id).await.unwrap().remaining_qty, dec("2"));
        assert!(store.all_consumptions().await.is_empty());
    }

    #[tokio::test]
    async fn set_unit_cost_leaves_quantity_untouched() {
        let store = InMemoryInventoryStore::new();
        let item = item(Unit::G);
        store.insert_item(&item).await.unwrap();
        let stored = store
            .insert_manual_layer(&layer(&item, Uuid::new_v4(), "800", "2000"))
            .await
            .unwrap();

        store.set_unit_cost(stored.id, dec("2")).await.unwrap();
        let after = store.layer(stored.id).await.unwrap();
        assert_eq!(after.unit_cost, dec("2"));
        assert_eq!(after.remaining_qty, dec("800"));
    }

    #[tokio::test]
    async fn appended_events_come_back_in_the_aggregate_stream() {
        use contara_core::{DomainEvent, DomainEventKind, EventStore};

        let store = InMemoryInventoryStore::new();
        let aggregate = Uuid::new_v4();
        store
            .append(DomainEvent::new(
                aggregate,
                DomainEventKind::StockReceived,
                serde_json::json!({ "qty": "5" }),
            ))
            .await
            .unwrap();

        let stream = store.stream(aggregate).await.unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].kind, DomainEventKind::StockReceived);
        assert!(store.stream(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dangling_move_reference_fails_fast() {
        let store = InMemoryInventoryStore::new();
        let item = item(Unit::G);
        store.insert_item(&item).await.unwrap();
        let mut bad = layer(&item, Uuid::new_v4(), "100", "2");
        bad.move_in_id = Some(Uuid::new_v4());
        store.insert_manual_layer(&bad).await.unwrap();

        let err = store.recost_candidates().await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidRecord(_)));
    }

    #[tokio::test]
    async fn unbalanced_journal_entries_never_land() {
        use contara_core::{JournalEntry, JournalLine};

        let store = InMemoryInventoryStore::new();
        let entry = JournalEntry {
            id: Uuid::new_v4(),
            entry_date: Utc::now().date_naive(),
            source_type: "inventory_recost".into(),
            source_id: Uuid::new_v4(),
            memo: String::new(),
            lines: vec![
                JournalLine::debit("143505", dec("10.00"), ""),
                JournalLine::credit("613505", dec("9.00"), ""),
            ],
            posted_at: Utc::now(),
        };
        let err = store.insert_journal_entry(&entry).await.unwrap_err();
        assert!(matches!(err, EngineError::UnbalancedEntry { .. }));
        assert!(store.journal_entries().await.is_empty());
    }
}

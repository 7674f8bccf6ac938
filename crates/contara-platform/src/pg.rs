use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use contara_core::{
    AllocationPlan, Consumption, CostLayer, DomainEvent, DomainEventKind, EngineError,
    EngineResult, EventStore, InventoryStore, Item, ItemRecost, JournalEntry, PackSizes,
    ReceiptKind, ReceiptMove, RecostCandidate, Unit,
};

const LAYER_COLS: &str = "id, item_id, warehouse_id, unit, remaining_qty, unit_cost, lot_code, \
     expires_at, move_in_id, sequence, created_at";

/// Postgres-backed store. Every `insert_*`/`apply_*` runs as one
/// transaction; decrements are conditional updates re-checked by the
/// database, so a plan raced by a concurrent consumer rolls back with a
/// retryable `Conflict` instead of over-allocating.
#[derive(Clone)]
pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> EngineResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(EngineError::storage)
    }
}

fn parse_unit(raw: &str) -> EngineResult<Unit> {
    raw.parse::<Unit>()
        .map_err(|err| EngineError::InvalidRecord(err.to_string()))
}

fn get<'r, T>(row: &'r PgRow, prefix: &str, name: &str) -> EngineResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(format!("{prefix}{name}").as_str())
        .map_err(EngineError::storage)
}

fn item_from_row(row: &PgRow, prefix: &str) -> EngineResult<Item> {
    let base_unit = parse_unit(&get::<String>(row, prefix, "base_unit")?)?;
    let display_unit = parse_unit(&get::<String>(row, prefix, "display_unit")?)?;
    let code: String = get(row, prefix, "code")?;
    if display_unit.family() != base_unit.family() {
        return Err(EngineError::InvalidRecord(format!(
            "item {code} display unit {display_unit} is not in the {base_unit} family"
        )));
    }
    Ok(Item {
        id: get(row, prefix, "id")?,
        code,
        name: get(row, prefix, "name")?,
        base_unit,
        display_unit,
        pack_sizes: PackSizes {
            per_package: get(row, prefix, "per_package")?,
            per_box: get(row, prefix, "per_box")?,
            per_roll: get(row, prefix, "per_roll")?,
        },
        inventory_account: get(row, prefix, "inventory_account")?,
        cogs_account: get(row, prefix, "cogs_account")?,
        created_at: get(row, prefix, "created_at")?,
    })
}

fn layer_from_row(row: &PgRow, prefix: &str) -> EngineResult<CostLayer> {
    let unit: String = get(row, prefix, "unit")?;
    let remaining_qty: Decimal = get(row, prefix, "remaining_qty")?;
    let unit_cost: Decimal = get(row, prefix, "unit_cost")?;
    let id: Uuid = get(row, prefix, "id")?;
    if remaining_qty < Decimal::ZERO {
        return Err(EngineError::InvalidRecord(format!(
            "layer {id} has negative remaining quantity {remaining_qty}"
        )));
    }
    if unit_cost < Decimal::ZERO {
        return Err(EngineError::InvalidRecord(format!(
            "layer {id} has negative unit cost {unit_cost}"
        )));
    }
    Ok(CostLayer {
        id,
        item_id: get(row, prefix, "item_id")?,
        warehouse_id: get(row, prefix, "warehouse_id")?,
        unit: parse_unit(&unit)?,
        remaining_qty,
        unit_cost,
        lot_code: get(row, prefix, "lot_code")?,
        expires_at: get(row, prefix, "expires_at")?,
        move_in_id: get(row, prefix, "move_in_id")?,
        sequence: get(row, prefix, "sequence")?,
        created_at: get(row, prefix, "created_at")?,
    })
}

fn receipt_from_row(row: &PgRow, prefix: &str) -> EngineResult<ReceiptMove> {
    let kind: String = get(row, prefix, "kind")?;
    let recorded_unit: String = get(row, prefix, "recorded_unit")?;
    Ok(ReceiptMove {
        id: get(row, prefix, "id")?,
        item_id: get(row, prefix, "item_id")?,
        warehouse_id: get(row, prefix, "warehouse_id")?,
        kind: ReceiptKind::parse(&kind)
            .ok_or_else(|| EngineError::InvalidRecord(format!("unknown receipt kind: {kind}")))?,
        recorded_qty: get(row, prefix, "recorded_qty")?,
        recorded_unit: parse_unit(&recorded_unit)?,
        recorded_unit_cost: get(row, prefix, "recorded_unit_cost")?,
        posted_at: get(row, prefix, "posted_at")?,
    })
}

fn consumption_from_row(row: &PgRow) -> EngineResult<Consumption> {
    Ok(Consumption {
        id: get(row, "", "id")?,
        move_out_id: get(row, "", "move_out_id")?,
        layer_id: get(row, "", "layer_id")?,
        qty: get(row, "", "qty")?,
        unit_cost: get(row, "", "unit_cost")?,
        created_at: get(row, "", "created_at")?,
    })
}

async fn insert_event(
    tx: &mut Transaction<'_, Postgres>,
    event: &DomainEvent,
) -> EngineResult<()> {
    sqlx::query(
        "INSERT INTO domain_events (id, aggregate_id, kind, occurred_at, payload) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(event.id)
    .bind(event.aggregate_id)
    .bind(event.kind.as_str())
    .bind(event.occurred_at)
    .bind(&event.payload)
    .execute(&mut **tx)
    .await
    .map_err(EngineError::storage)?;

    Ok(())
}

/// Decrement a layer inside a transaction, re-checked by the database. Zero
/// rows affected means the plan's snapshot is stale: report a retryable
/// conflict (or not-found when the layer does not exist at all).
async fn decrement_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    layer_id: Uuid,
    qty: Decimal,
) -> EngineResult<PgRow> {
    let updated = sqlx::query(&format!(
        "UPDATE cost_layers SET remaining_qty = remaining_qty - $2 \
         WHERE id = $1 AND remaining_qty >= $2 RETURNING {LAYER_COLS}"
    ))
    .bind(layer_id)
    .bind(qty)
    .fetch_optional(&mut **tx)
    .await
    .map_err(EngineError::storage)?;

    match updated {
        Some(row) => Ok(row),
        None => {
            let current = sqlx::query("SELECT remaining_qty FROM cost_layers WHERE id = $1")
                .bind(layer_id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(EngineError::storage)?;
            match current {
                Some(row) => {
                    let remaining: Decimal =
                        row.try_get("remaining_qty").map_err(EngineError::storage)?;
                    Err(EngineError::Conflict(format!(
                        "layer {layer_id} holds {remaining}, needed {qty}"
                    )))
                }
                None => Err(EngineError::NotFound {
                    entity: "layer",
                    id: layer_id,
                }),
            }
        }
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn insert_item(&self, item: &Item) -> EngineResult<()> {
        sqlx::query(
            "INSERT INTO items (id, code, name, base_unit, display_unit, per_package, per_box, \
             per_roll, inventory_account, cogs_account, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(item.id)
        .bind(&item.code)
        .bind(&item.name)
        .bind(item.base_unit.as_str())
        .bind(item.display_unit.as_str())
        .bind(item.pack_sizes.per_package)
        .bind(item.pack_sizes.per_box)
        .bind(item.pack_sizes.per_roll)
        .bind(&item.inventory_account)
        .bind(&item.cogs_account)
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(EngineError::storage)?;

        Ok(())
    }

    async fn item(&self, item_id: Uuid) -> EngineResult<Item> {
        let row = sqlx::query(
            "SELECT id, code, name, base_unit, display_unit, per_package, per_box, per_roll, \
             inventory_account, cogs_account, created_at FROM items WHERE id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(EngineError::storage)?
        .ok_or(EngineError::NotFound {
            entity: "item",
            id: item_id,
        })?;

        item_from_row(&row, "")
    }

    async fn layer(&self, layer_id: Uuid) -> EngineResult<CostLayer> {
        let row = sqlx::query(&format!("SELECT {LAYER_COLS} FROM cost_layers WHERE id = $1"))
            .bind(layer_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(EngineError::storage)?
            .ok_or(EngineError::NotFound {
                entity: "layer",
                id: layer_id,
            })?;

        layer_from_row(&row, "")
    }

    async fn open_layers(&self, item_id: Uuid, warehouse_id: Uuid) -> EngineResult<Vec<CostLayer>> {
        let rows = sqlx::query(&format!(
            "SELECT {LAYER_COLS} FROM cost_layers \
             WHERE item_id = $1 AND warehouse_id = $2 AND remaining_qty > 0 \
             ORDER BY sequence ASC"
        ))
        .bind(item_id)
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::storage)?;

        rows.iter().map(|row| layer_from_row(row, "")).collect()
    }

    async fn insert_receipt(
        &self,
        receipt: &ReceiptMove,
        layer: &CostLayer,
    ) -> EngineResult<CostLayer> {
        let mut tx = self.begin().await?;

        sqlx::query(
            "INSERT INTO receipt_moves (id, item_id, warehouse_id, kind, recorded_qty, \
             recorded_unit, recorded_unit_cost, posted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(receipt.id)
        .bind(receipt.item_id)
        .bind(receipt.warehouse_id)
        .bind(receipt.kind.as_str())
        .bind(receipt.recorded_qty)
        .bind(receipt.recorded_unit.as_str())
        .bind(receipt.recorded_unit_cost)
        .bind(receipt.posted_at)
        .execute(&mut *tx)
        .await
        .map_err(EngineError::storage)?;

        let row = sqlx::query(
            "INSERT INTO cost_layers (id, item_id, warehouse_id, unit, remaining_qty, unit_cost, \
             lot_code, expires_at, move_in_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING sequence",
        )
        .bind(layer.id)
        .bind(layer.item_id)
        .bind(layer.warehouse_id)
        .bind(layer.unit.as_str())
        .bind(layer.remaining_qty)
        .bind(layer.unit_cost)
        .bind(&layer.lot_code)
        .bind(layer.expires_at)
        .bind(layer.move_in_id)
        .bind(layer.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(EngineError::storage)?;
        let sequence: i64 = row.try_get("sequence").map_err(EngineError::storage)?;

        insert_event(
            &mut tx,
            &DomainEvent::new(
                receipt.item_id,
                DomainEventKind::StockReceived,
                serde_json::json!({
                    "move_in_id": receipt.id,
                    "layer_id": layer.id,
                    "qty": layer.remaining_qty,
                    "unit": layer.unit,
                }),
            ),
        )
        .await?;

        tx.commit().await.map_err(EngineError::storage)?;

        let mut stored = layer.clone();
        stored.sequence = sequence;
        Ok(stored)
    }

    async fn insert_manual_layer(&self, layer: &CostLayer) -> EngineResult<CostLayer> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(
            "INSERT INTO cost_layers (id, item_id, warehouse_id, unit, remaining_qty, unit_cost, \
             lot_code, expires_at, move_in_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING sequence",
        )
        .bind(layer.id)
        .bind(layer.item_id)
        .bind(layer.warehouse_id)
        .bind(layer.unit.as_str())
        .bind(layer.remaining_qty)
        .bind(layer.unit_cost)
        .bind(&layer.lot_code)
        .bind(layer.expires_at)
        .bind(layer.move_in_id)
        .bind(layer.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(EngineError::storage)?;
        let sequence: i64 = row.try_get("sequence").map_err(EngineError::storage)?;

        insert_event(
            &mut tx,
            &DomainEvent::new(
                layer.item_id,
                DomainEventKind::StockReceived,
                serde_json::json!({
                    "layer_id": layer.id,
                    "qty": layer.remaining_qty,
                    "unit": layer.unit,
                    "manual": true,
                }),
            ),
        )
        .await?;

        tx.commit().await.map_err(EngineError::storage)?;

        let mut stored = layer.clone();
        stored.sequence = sequence;
        Ok(stored)
    }

    async fn decrement_layer(&self, layer_id: Uuid, qty: Decimal) -> EngineResult<CostLayer> {
        let mut tx = self.begin().await?;
        let row = match decrement_in_tx(&mut tx, layer_id, qty).await {
            Ok(row) => row,
            // A direct decrement is a single-layer operation, not a plan
            // apply: report the business rejection, not a conflict.
            Err(EngineError::Conflict(_)) => {
                let current = self.layer(layer_id).await?;
                return Err(EngineError::InsufficientLayerQuantity {
                    layer_id,
                    requested: qty,
                    remaining: current.remaining_qty,
                });
            }
            Err(err) => return Err(err),
        };
        tx.commit().await.map_err(EngineError::storage)?;
        layer_from_row(&row, "")
    }

    async fn set_unit_cost(&self, layer_id: Uuid, unit_cost: Decimal) -> EngineResult<()> {
        let result = sqlx::query("UPDATE cost_layers SET unit_cost = $2 WHERE id = $1")
            .bind(layer_id)
            .bind(unit_cost)
            .execute(&self.pool)
            .await
            .map_err(EngineError::storage)?;

        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound {
                entity: "layer",
                id: layer_id,
            });
        }
        Ok(())
    }

    async fn apply_allocation(&self, plan: &AllocationPlan) -> EngineResult<Vec<Consumption>> {
        let mut tx = self.begin().await?;
        let now = chrono::Utc::now();

        for split in &plan.splits {
            let source = decrement_in_tx(&mut tx, split.source_layer_id, split.source_qty).await?;
            let lot_code: Option<String> = source.try_get("lot_code").map_err(EngineError::storage)?;
            let expires_at: Option<chrono::NaiveDate> =
                source.try_get("expires_at").map_err(EngineError::storage)?;

            sqlx::query(
                "INSERT INTO cost_layers (id, item_id, warehouse_id, unit, remaining_qty, \
                 unit_cost, lot_code, expires_at, move_in_id, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL, $9)",
            )
            .bind(split.new_layer_id)
            .bind(plan.item_id)
            .bind(plan.warehouse_id)
            .bind(split.unit.as_str())
            .bind(split.qty)
            .bind(split.unit_cost)
            .bind(lot_code)
            .bind(expires_at)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(EngineError::storage)?;

            insert_event(
                &mut tx,
                &DomainEvent::new(
                    plan.item_id,
                    DomainEventKind::LayerSplit,
                    serde_json::json!({
                        "source_layer_id": split.source_layer_id,
                        "new_layer_id": split.new_layer_id,
                        "qty": split.qty,
                        "unit": split.unit,
                    }),
                ),
            )
            .await?;
        }

        let mut consumptions = Vec::with_capacity(plan.takes.len());
        for take in &plan.takes {
            decrement_in_tx(&mut tx, take.layer_id, take.qty).await?;

            let consumption = Consumption {
                id: Uuid::new_v4(),
                move_out_id: plan.move_out_id,
                layer_id: take.layer_id,
                qty: take.qty,
                unit_cost: take.unit_cost,
                created_at: now,
            };
            sqlx::query(
                "INSERT INTO consumptions (id, move_out_id, layer_id, qty, unit_cost, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(consumption.id)
            .bind(consumption.move_out_id)
            .bind(consumption.layer_id)
            .bind(consumption.qty)
            .bind(consumption.unit_cost)
            .bind(consumption.created_at)
            .execute(&mut *tx)
            .await
            .map_err(EngineError::storage)?;
            consumptions.push(consumption);
        }

        let issued: Decimal = plan.takes.iter().map(|take| take.qty).sum();
        insert_event(
            &mut tx,
            &DomainEvent::new(
                plan.item_id,
                DomainEventKind::StockIssued,
                serde_json::json!({
                    "move_out_id": plan.move_out_id,
                    "qty": issued,
                    "layers": plan.takes.len(),
                }),
            ),
        )
        .await?;

        tx.commit().await.map_err(EngineError::storage)?;
        Ok(consumptions)
    }

    async fn consumptions_for_issue(&self, move_out_id: Uuid) -> EngineResult<Vec<Consumption>> {
        let rows = sqlx::query(
            "SELECT id, move_out_id, layer_id, qty, unit_cost, created_at FROM consumptions \
             WHERE move_out_id = $1 ORDER BY created_at ASC",
        )
        .bind(move_out_id)
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::storage)?;

        rows.iter().map(consumption_from_row).collect()
    }

    async fn recost_candidates(&self) -> EngineResult<Vec<RecostCandidate>> {
        let rows = sqlx::query(
            "SELECT \
             i.id AS i_id, i.code AS i_code, i.name AS i_name, i.base_unit AS i_base_unit, \
             i.display_unit AS i_display_unit, i.per_package AS i_per_package, \
             i.per_box AS i_per_box, i.per_roll AS i_per_roll, \
             i.inventory_account AS i_inventory_account, i.cogs_account AS i_cogs_account, \
             i.created_at AS i_created_at, \
             m.id AS m_id, m.item_id AS m_item_id, m.warehouse_id AS m_warehouse_id, \
             m.kind AS m_kind, m.recorded_qty AS m_recorded_qty, \
             m.recorded_unit AS m_recorded_unit, m.recorded_unit_cost AS m_recorded_unit_cost, \
             m.posted_at AS m_posted_at, \
             l.id AS l_id, l.item_id AS l_item_id, l.warehouse_id AS l_warehouse_id, \
             l.unit AS l_unit, l.remaining_qty AS l_remaining_qty, l.unit_cost AS l_unit_cost, \
             l.lot_code AS l_lot_code, l.expires_at AS l_expires_at, \
             l.move_in_id AS l_move_in_id, l.sequence AS l_sequence, l.created_at AS l_created_at \
             FROM cost_layers l \
             JOIN receipt_moves m ON m.id = l.move_in_id \
             JOIN items i ON i.id = l.item_id \
             WHERE l.unit = i.base_unit AND m.recorded_unit <> i.base_unit \
             ORDER BY i.code ASC, l.sequence ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::storage)?;

        rows.iter()
            .map(|row| {
                Ok(RecostCandidate {
                    item: item_from_row(row, "i_")?,
                    receipt: receipt_from_row(row, "m_")?,
                    layer: layer_from_row(row, "l_")?,
                })
            })
            .collect()
    }

    async fn apply_recost(&self, recost: &ItemRecost) -> EngineResult<()> {
        let mut tx = self.begin().await?;

        // Lock the touched layers up front so the whole item's correction
        // is serialized against concurrent consumers.
        for revalue in &recost.layers {
            sqlx::query("SELECT id FROM cost_layers WHERE id = $1 FOR UPDATE")
                .bind(revalue.layer_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(EngineError::storage)?
                .ok_or(EngineError::NotFound {
                    entity: "layer",
                    id: revalue.layer_id,
                })?;
        }

        for normalized in &recost.moves {
            let result = sqlx::query(
                "UPDATE receipt_moves SET recorded_unit = $2, recorded_qty = $3, \
                 recorded_unit_cost = $4 WHERE id = $1",
            )
            .bind(normalized.move_id)
            .bind(normalized.unit.as_str())
            .bind(normalized.qty)
            .bind(normalized.unit_cost)
            .execute(&mut *tx)
            .await
            .map_err(EngineError::storage)?;
            if result.rows_affected() == 0 {
                return Err(EngineError::NotFound {
                    entity: "receipt move",
                    id: normalized.move_id,
                });
            }
        }

        for revalue in &recost.layers {
            sqlx::query("UPDATE cost_layers SET unit_cost = $2 WHERE id = $1")
                .bind(revalue.layer_id)
                .bind(revalue.unit_cost)
                .execute(&mut *tx)
                .await
                .map_err(EngineError::storage)?;

            sqlx::query("UPDATE consumptions SET unit_cost = $2 WHERE layer_id = $1")
                .bind(revalue.layer_id)
                .bind(revalue.unit_cost)
                .execute(&mut *tx)
                .await
                .map_err(EngineError::storage)?;

            insert_event(
                &mut tx,
                &DomainEvent::new(
                    recost.item_id,
                    DomainEventKind::LayerRecosted,
                    serde_json::json!({
                        "layer_id": revalue.layer_id,
                        "unit_cost": revalue.unit_cost,
                        "delta": revalue.delta,
                    }),
                ),
            )
            .await?;
        }

        tx.commit().await.map_err(EngineError::storage)?;
        Ok(())
    }

    async fn insert_journal_entry(&self, entry: &JournalEntry) -> EngineResult<()> {
        if !entry.is_balanced() {
            return Err(EngineError::UnbalancedEntry {
                debits: entry.debit_total(),
                credits: entry.credit_total(),
            });
        }

        let mut tx = self.begin().await?;

        sqlx::query(
            "INSERT INTO journal_entries (id, entry_date, source_type, source_id, memo, posted_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.id)
        .bind(entry.entry_date)
        .bind(&entry.source_type)
        .bind(entry.source_id)
        .bind(&entry.memo)
        .bind(entry.posted_at)
        .execute(&mut *tx)
        .await
        .map_err(EngineError::storage)?;

        for (line_no, line) in entry.lines.iter().enumerate() {
            sqlx::query(
                "INSERT INTO journal_lines (id, entry_id, line_no, account, debit, credit, memo) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(Uuid::new_v4())
            .bind(entry.id)
            .bind(line_no as i32)
            .bind(&line.account)
            .bind(line.debit)
            .bind(line.credit)
            .bind(&line.memo)
            .execute(&mut *tx)
            .await
            .map_err(EngineError::storage)?;
        }

        insert_event(
            &mut tx,
            &DomainEvent::new(
                entry.source_id,
                DomainEventKind::JournalPosted,
                serde_json::json!({
                    "entry_id": entry.id,
                    "lines": entry.lines.len(),
                }),
            ),
        )
        .await?;

        tx.commit().await.map_err(EngineError::storage)?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for PgInventoryStore {
    async fn append(&self, event: DomainEvent) -> EngineResult<()> {
        let mut tx = self.begin().await?;
        insert_event(&mut tx, &event).await?;
        tx.commit().await.map_err(EngineError::storage)
    }

    async fn stream(&self, aggregate_id: Uuid) -> EngineResult<Vec<DomainEvent>> {
        let rows = sqlx::query(
            "SELECT id, aggregate_id, kind, occurred_at, payload FROM domain_events \
             WHERE aggregate_id = $1 ORDER BY occurred_at ASC",
        )
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::storage)?;

        rows.iter()
            .map(|row| {
                let kind: String = get(row, "", "kind")?;
                Ok(DomainEvent {
                    id: get(row, "", "id")?,
                    aggregate_id: get(row, "", "aggregate_id")?,
                    kind: DomainEventKind::parse(&kind).ok_or_else(|| {
                        EngineError::InvalidRecord(format!("unknown event kind: {kind}"))
                    })?,
                    occurred_at: get(row, "", "occurred_at")?,
                    payload: get(row, "", "payload")?,
                })
            })
            .collect()
    }
}

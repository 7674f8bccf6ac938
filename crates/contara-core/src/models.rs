use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use contara_uom::{Converter, PackSizes, Unit, round_money};

/// A trackable good from the catalog. The engine reads items, it never
/// creates or edits them; `base_unit` is immutable once layers exist and is
/// only ever re-denominated through the normalization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub base_unit: Unit,
    pub display_unit: Unit,
    pub pack_sizes: PackSizes,
    pub inventory_account: Option<String>,
    pub cogs_account: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn converter(&self) -> Converter {
        Converter::with_packs(self.pack_sizes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptKind {
    Purchase,
    Production,
    ConversionIn,
    Adjustment,
}

impl ReceiptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptKind::Purchase => "purchase",
            ReceiptKind::Production => "production",
            ReceiptKind::ConversionIn => "conversion_in",
            ReceiptKind::Adjustment => "adjustment",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "purchase" => Some(ReceiptKind::Purchase),
            "production" => Some(ReceiptKind::Production),
            "conversion_in" => Some(ReceiptKind::ConversionIn),
            "adjustment" => Some(ReceiptKind::Adjustment),
            _ => None,
        }
    }
}

/// The receipt event that created a layer, keeping the quantity, unit and
/// unit cost exactly as recorded. `recorded_unit != item.base_unit` is what
/// the normalization scan looks for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptMove {
    pub id: Uuid,
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub kind: ReceiptKind,
    pub recorded_qty: Decimal,
    pub recorded_unit: Unit,
    pub recorded_unit_cost: Decimal,
    pub posted_at: DateTime<Utc>,
}

/// One batch of stock with a single acquisition cost. Quantity only moves
/// down, through consumption; re-costing rewrites `unit_cost` and nothing
/// else. Exhausted layers stay on record forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostLayer {
    pub id: Uuid,
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    /// Denomination of `remaining_qty`. Receipt-created layers are always in
    /// the item's base unit; manual layers may sit in a coarser unit of the
    /// same family until the allocator splits them.
    pub unit: Unit,
    pub remaining_qty: Decimal,
    pub unit_cost: Decimal,
    pub lot_code: Option<String>,
    pub expires_at: Option<NaiveDate>,
    pub move_in_id: Option<Uuid>,
    /// Monotonic creation order, assigned by the store. FIFO key.
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
}

impl CostLayer {
    pub fn remaining_value(&self) -> Decimal {
        round_money(self.remaining_qty * self.unit_cost)
    }
}

/// Links one issue to one layer it drew from. `qty` is immutable;
/// `unit_cost` is a snapshot of the layer's cost at draw time and is only
/// ever rewritten by re-costing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consumption {
    pub id: Uuid,
    pub move_out_id: Uuid,
    pub layer_id: Uuid,
    pub qty: Decimal,
    pub unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalLine {
    pub account: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub memo: String,
}

impl JournalLine {
    pub fn debit(account: impl Into<String>, amount: Decimal, memo: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            debit: amount,
            credit: Decimal::ZERO,
            memo: memo.into(),
        }
    }

    pub fn credit(account: impl Into<String>, amount: Decimal, memo: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            debit: Decimal::ZERO,
            credit: amount,
            memo: memo.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub entry_date: NaiveDate,
    pub source_type: String,
    pub source_id: Uuid,
    pub memo: String,
    pub lines: Vec<JournalLine>,
    pub posted_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn debit_total(&self) -> Decimal {
        self.lines.iter().map(|line| line.debit).sum()
    }

    pub fn credit_total(&self) -> Decimal {
        self.lines.iter().map(|line| line.credit).sum()
    }

    pub fn is_balanced(&self) -> bool {
        self.debit_total() == self.credit_total()
    }
}

/// One draw from one layer, at the layer's snapshot cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerTake {
    pub layer_id: Uuid,
    pub qty: Decimal,
    pub unit_cost: Decimal,
}

/// Re-denominates part of a coarse layer into a fresh base-unit layer.
/// `source_qty` is in the source layer's unit, `qty`/`unit_cost` in the
/// target unit. Applied in the same transaction as the takes that follow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSplit {
    pub source_layer_id: Uuid,
    pub source_qty: Decimal,
    pub new_layer_id: Uuid,
    pub unit: Unit,
    pub qty: Decimal,
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub move_out_id: Uuid,
    pub splits: Vec<LayerSplit>,
    pub takes: Vec<LayerTake>,
    /// Base-unit remainder the open layers could not cover.
    pub shortfall: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerRevalue {
    pub layer_id: Uuid,
    pub unit_cost: Decimal,
    pub delta: Decimal,
}

/// Rewrites a receipt move into base-unit terms so the next scan finds
/// nothing left to fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveNormalization {
    pub move_id: Uuid,
    pub unit: Unit,
    pub qty: Decimal,
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecost {
    pub item_id: Uuid,
    pub moves: Vec<MoveNormalization>,
    pub layers: Vec<LayerRevalue>,
    pub delta: Decimal,
}

#[derive(Debug, Clone)]
pub struct RecostCandidate {
    pub item: Item,
    pub receipt: ReceiptMove,
    pub layer: CostLayer,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn journal_lines_carry_one_side_only() {
        let debit = JournalLine::debit("143505", dec("10.00"), "in");
        assert_eq!(debit.debit, dec("10.00"));
        assert_eq!(debit.credit, Decimal::ZERO);

        let credit = JournalLine::credit("613505", dec("10.00"), "out");
        assert_eq!(credit.debit, Decimal::ZERO);
        assert_eq!(credit.credit, dec("10.00"));
    }

    #[test]
    fn entry_balance_check_compares_totals_exactly() {
        let entry = JournalEntry {
            id: Uuid::new_v4(),
            entry_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            source_type: "inventory_recost".into(),
            source_id: Uuid::new_v4(),
            memo: String::new(),
            lines: vec![
                JournalLine::debit("143505", dec("10.00"), ""),
                JournalLine::credit("613505", dec("9.99"), ""),
            ],
            posted_at: Utc::now(),
        };
        assert!(!entry.is_balanced());
    }

    #[test]
    fn receipt_kind_codes_round_trip() {
        for kind in [
            ReceiptKind::Purchase,
            ReceiptKind::Production,
            ReceiptKind::ConversionIn,
            ReceiptKind::Adjustment,
        ] {
            assert_eq!(ReceiptKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ReceiptKind::parse("transfer"), None);
    }
}

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use contara_core::{
    ChartOfAccounts, Consumption, EngineError, EngineResult, Item, JournalEntry, JournalLine,
    round_money,
};

/// One item's accumulated revaluation delta with the accounts it posts
/// against, as resolved by the normalization run.
#[derive(Debug, Clone)]
pub struct ItemDelta {
    pub item_id: Uuid,
    pub item_code: String,
    pub inventory_account: String,
    pub cogs_account: String,
    pub delta: Decimal,
}

/// Build the single journal entry for a normalization run. A positive delta
/// debits inventory and credits cost of sales; a negative delta does the
/// reverse. Returns `None` when every delta rounds to zero.
pub fn revaluation_entry(
    run_id: Uuid,
    entry_date: NaiveDate,
    deltas: &[ItemDelta],
) -> EngineResult<Option<JournalEntry>> {
    let mut lines = Vec::new();
    for item in deltas {
        let amount = round_money(item.delta.abs());
        if amount.is_zero() {
            continue;
        }
        let memo = format!("Cost normalization {}", item.item_code);
        if item.delta > Decimal::ZERO {
            lines.push(JournalLine::debit(&item.inventory_account, amount, memo.clone()));
            lines.push(JournalLine::credit(&item.cogs_account, amount, memo));
        } else {
            lines.push(JournalLine::debit(&item.cogs_account, amount, memo.clone()));
            lines.push(JournalLine::credit(&item.inventory_account, amount, memo));
        }
    }
    if lines.is_empty() {
        return Ok(None);
    }

    let entry = JournalEntry {
        id: Uuid::new_v4(),
        entry_date,
        source_type: "inventory_recost".to_string(),
        source_id: run_id,
        memo: "Inventory cost normalization".to_string(),
        lines: merge_lines(lines),
        posted_at: Utc::now(),
    };
    ensure_balanced(&entry)?;
    Ok(Some(entry))
}

/// Cost-of-sale entry for one issue: debit COGS, credit inventory at the
/// consumed snapshot value. Returns `None` for a zero-cost issue.
pub fn issue_entry(
    chart: &ChartOfAccounts,
    item: &Item,
    move_out_id: Uuid,
    entry_date: NaiveDate,
    consumptions: &[Consumption],
) -> EngineResult<Option<JournalEntry>> {
    let cost: Decimal = consumptions.iter().map(|c| c.qty * c.unit_cost).sum();
    let amount = round_money(cost);
    if amount.is_zero() {
        return Ok(None);
    }

    let entry = JournalEntry {
        id: Uuid::new_v4(),
        entry_date,
        source_type: "inventory_issue".to_string(),
        source_id: move_out_id,
        memo: format!("Inventory issue {}", item.code),
        lines: vec![
            JournalLine::debit(
                chart.cogs_account_for(item),
                amount,
                format!("COGS recognized {}", item.code),
            ),
            JournalLine::credit(
                chart.inventory_account_for(item),
                amount,
                format!("Inventory relieved {}", item.code),
            ),
        ],
        posted_at: Utc::now(),
    };
    ensure_balanced(&entry)?;
    Ok(Some(entry))
}

/// Collapse lines hitting the same account on the same side, summing the
/// amounts and joining the memos. Keeps the entry balanced by construction
/// while minimizing line count.
fn merge_lines(lines: Vec<JournalLine>) -> Vec<JournalLine> {
    let mut merged: Vec<JournalLine> = Vec::new();
    for line in lines {
        let is_debit = !line.debit.is_zero();
        match merged
            .iter_mut()
            .find(|m| m.account == line.account && !m.debit.is_zero() == is_debit)
        {
            Some(existing) => {
                existing.debit += line.debit;
                existing.credit += line.credit;
                existing.memo.push_str("; ");
                existing.memo.push_str(&line.memo);
            }
            None => merged.push(line),
        }
    }
    merged.sort_by(|a, b| a.account.cmp(&b.account).then(b.debit.cmp(&a.debit)));
    merged
}

/// The posting precondition: total debits must equal total credits exactly.
/// An unbalanced entry must never reach the ledger.
pub fn ensure_balanced(entry: &JournalEntry) -> EngineResult<()> {
    let debits = entry.debit_total();
    let credits = entry.credit_total();
    if debits != credits {
        return Err(EngineError::UnbalancedEntry { debits, credits });
    }
    Ok(())
}

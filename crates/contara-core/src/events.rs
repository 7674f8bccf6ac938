use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEventKind {
    StockReceived,
    StockIssued,
    LayerSplit,
    LayerRecosted,
    JournalPosted,
}

impl DomainEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainEventKind::StockReceived => "stock.received",
            DomainEventKind::StockIssued => "stock.issued",
            DomainEventKind::LayerSplit => "layer.split",
            DomainEventKind::LayerRecosted => "layer.recosted",
            DomainEventKind::JournalPosted => "journal.posted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "stock.received" => Some(DomainEventKind::StockReceived),
            "stock.issued" => Some(DomainEventKind::StockIssued),
            "layer.split" => Some(DomainEventKind::LayerSplit),
            "layer.recosted" => Some(DomainEventKind::LayerRecosted),
            "journal.posted" => Some(DomainEventKind::JournalPosted),
            _ => None,
        }
    }
}

/// Audit-trail record appended by the store inside the same atomic apply as
/// the mutation it describes. The aggregate is the item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub kind: DomainEventKind,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl DomainEvent {
    pub fn new(aggregate_id: Uuid, kind: DomainEventKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_id,
            kind,
            occurred_at: Utc::now(),
            payload,
        }
    }
}

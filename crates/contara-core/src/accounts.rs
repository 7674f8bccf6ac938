use serde::{Deserialize, Serialize};

use crate::models::Item;

/// Account codes the engine posts against, resolved once at startup. Items
/// may carry their own overrides; these are the fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartOfAccounts {
    pub inventory: String,
    pub cogs: String,
}

impl ChartOfAccounts {
    pub fn inventory_account_for(&self, item: &Item) -> String {
        item.inventory_account
            .clone()
            .unwrap_or_else(|| self.inventory.clone())
    }

    pub fn cogs_account_for(&self, item: &Item) -> String {
        item.cogs_account.clone().unwrap_or_else(|| self.cogs.clone())
    }
}

pub trait StandardsProfile {
    fn name(&self) -> &'static str;
    fn chart_of_accounts(&self) -> ChartOfAccounts;
    fn inventory_valuation_method(&self) -> &'static str;
}

/// Colombian PUC-flavored defaults: 1435 merchandise inventory, 6135 cost
/// of merchandise sold.
#[derive(Debug, Clone, Default)]
pub struct PucLiteProfile;

impl StandardsProfile for PucLiteProfile {
    fn name(&self) -> &'static str {
        "PUC-lite"
    }

    fn chart_of_accounts(&self) -> ChartOfAccounts {
        ChartOfAccounts {
            inventory: "143505".to_string(),
            cogs: "613505".to_string(),
        }
    }

    fn inventory_valuation_method(&self) -> &'static str {
        "FIFO"
    }
}

// snapshot.rs - Dashboard-compatible running totals.
//
// `stats.json` keeps the camelCase shape the dashboard already reads:
//
//   { "totalBattles": 3, "victories": 2, "defeats": 1, "moneySaved": 74.5,
//     "savingsHistory": [25.0, 74.5],
//     "purchaseHistory": [{ "timestamp": ..., "product": ..., ... }],
//     "categoryStats": { "Electronics": 1, "Fitness": 1, ... } }
//
// A victory is a blocked purchase, a defeat an allowed one.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ig_gate::AttemptOutcome;
use serde::{Deserialize, Serialize};

/// Categories the dashboard always charts, even at zero.
pub const SEEDED_CATEGORIES: [&str; 5] = ["Fitness", "Electronics", "Clothing", "Home", "Health"];

/// One row of the dashboard's purchase list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseEntry {
    pub timestamp: DateTime<Utc>,
    pub product: String,
    pub amount: f64,
    pub category: String,
    /// True when the purchase was blocked.
    pub saved: bool,
}

/// Running totals over every recorded attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    #[serde(default)]
    pub total_battles: u64,
    #[serde(default)]
    pub victories: u64,
    #[serde(default)]
    pub defeats: u64,
    #[serde(default)]
    pub money_saved: f64,
    /// Cumulative money saved after each blocked attempt.
    #[serde(default)]
    pub savings_history: Vec<f64>,
    #[serde(default)]
    pub purchase_history: Vec<PurchaseEntry>,
    /// Blocked attempts per category.
    #[serde(default)]
    pub category_stats: BTreeMap<String, u64>,
}

impl Default for StatsSnapshot {
    fn default() -> Self {
        let mut snapshot = Self {
            total_battles: 0,
            victories: 0,
            defeats: 0,
            money_saved: 0.0,
            savings_history: Vec::new(),
            purchase_history: Vec::new(),
            category_stats: BTreeMap::new(),
        };
        snapshot.seed_categories();
        snapshot
    }
}

impl StatsSnapshot {
    /// Fold one outcome into the totals.
    pub fn apply(&mut self, outcome: &AttemptOutcome) {
        let amount = outcome.amount_or_zero();
        let saved = !outcome.is_allowed();

        self.total_battles += 1;
        if saved {
            self.victories += 1;
            self.money_saved += amount;
            self.savings_history.push(self.money_saved);
            *self
                .category_stats
                .entry(outcome.category.clone())
                .or_insert(0) += 1;
        } else {
            self.defeats += 1;
        }

        self.purchase_history.push(PurchaseEntry {
            timestamp: outcome.timestamp,
            product: outcome.product_name.clone(),
            amount,
            category: outcome.category.clone(),
            saved,
        });
    }

    /// Rebuild a snapshot from a full history.
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a AttemptOutcome>) -> Self {
        let mut snapshot = Self::default();
        for outcome in outcomes {
            snapshot.apply(outcome);
        }
        snapshot
    }

    /// Ensure every seeded category has an entry.
    pub fn seed_categories(&mut self) {
        for category in SEEDED_CATEGORIES {
            self.category_stats.entry(category.to_string()).or_insert(0);
        }
    }

    /// Blocked share of all attempts, 0–100.
    pub fn win_rate(&self) -> f64 {
        if self.total_battles == 0 {
            0.0
        } else {
            self.victories as f64 * 100.0 / self.total_battles as f64
        }
    }
}

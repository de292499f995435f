//! Tagged inventory arithmetic: item counts with per-owner claims.
//!
//! Grounded in the claim/amount bookkeeping used by the original agent's
//! inventory layer — every mutation either succeeds atomically or leaves
//! the amount and claims untouched.

use std::collections::HashMap;

/// `(amount, claims)` for a single item. `Σclaims ≤ amount` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaggedAmount {
    amount: u64,
    claims: HashMap<String, u64>,
}

impl TaggedAmount {
    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn claimed_by(&self, owner: &str) -> u64 {
        self.claims.get(owner).copied().unwrap_or(0)
    }

    fn total_claims(&self) -> u64 {
        self.claims.values().sum()
    }

    pub fn available_to(&self, owner: &str) -> u64 {
        (self.amount - self.total_claims()) + self.claimed_by(owner)
    }

    /// Applies a signed delta. `owner = None` affects the amount without
    /// touching any claim. Returns `false` (no-op) if a negative delta
    /// would require more than is available to `owner`.
    #[must_use]
    pub fn update(&mut self, delta: i64, owner: Option<&str>) -> bool {
        if delta >= 0 {
            let delta = delta as u64;
            self.amount += delta;
            if let Some(owner) = owner {
                let claim = self.claims.entry(owner.to_string()).or_insert(0);
                *claim += delta;
            }
            true
        } else {
            let d = delta.unsigned_abs();
            let owner_key = owner.unwrap_or("");
            if self.available_to(owner_key) < d {
                return false;
            }
            self.amount -= d;
            if let Some(owner) = owner {
                if let Some(claim) = self.claims.get_mut(owner) {
                    let reduce = d.min(*claim);
                    *claim -= reduce;
                    if *claim == 0 {
                        self.claims.remove(owner);
                    }
                }
            }
            true
        }
    }
}

/// `item -> TaggedAmount` map, the per-player possessions ledger.
#[derive(Debug, Clone, Default)]
pub struct TaggedInventory {
    items: HashMap<String, TaggedAmount>,
}

impl TaggedInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn amount_of(&self, item: &str) -> u64 {
        self.items.get(item).map(TaggedAmount::amount).unwrap_or(0)
    }

    pub fn available_to(&self, item: &str, owner: &str) -> u64 {
        self.items.get(item).map(|a| a.available_to(owner)).unwrap_or(0)
    }

    #[must_use]
    pub fn update(&mut self, item: &str, delta: i64, owner: Option<&str>) -> bool {
        self.items.entry(item.to_string()).or_default().update(delta, owner)
    }

    /// A plain `item -> count` snapshot of everything claimed by `owner`.
    pub fn claimed_by(&self, owner: &str) -> Inventory {
        Inventory {
            counts: self
                .items
                .iter()
                .filter_map(|(item, amt)| {
                    let c = amt.claimed_by(owner);
                    (c > 0).then_some((item.clone(), c))
                })
                .collect(),
        }
    }

    /// A plain `item -> count` snapshot of the currently unclaimed pool.
    pub fn unclaimed(&self) -> Inventory {
        Inventory {
            counts: self
                .items
                .iter()
                .filter_map(|(item, amt)| {
                    let unclaimed = amt.amount() - amt.claims.values().sum::<u64>();
                    (unclaimed > 0).then_some((item.clone(), unclaimed))
                })
                .collect(),
        }
    }

    /// True iff, for every `(item, amount)` pair in `required` (duplicate
    /// items are summed first), `available_to(owner)` covers it. Used by
    /// the player runtime's AWAITING_LAUNCH check before a task's actions
    /// are allowed to launch.
    pub fn can_satisfy(&self, required: &[(String, u64)], owner: &str) -> bool {
        let mut needed: HashMap<&str, u64> = HashMap::new();
        for (item, amount) in required {
            *needed.entry(item.as_str()).or_insert(0) += amount;
        }
        needed.into_iter().all(|(item, amount)| self.available_to(item, owner) >= amount)
    }

    /// Drops claims for owners not present in `live_owners`. Invariant 2
    /// in the testable properties requires this happen before allocation.
    pub fn sweep_stale_claims(&mut self, live_owners: &[String]) {
        for amt in self.items.values_mut() {
            amt.claims.retain(|owner, _| live_owners.contains(owner));
        }
    }
}

/// Plain `item -> count`, used for snapshots and recipe balance checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    counts: HashMap<String, u64>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, item: &str) -> u64 {
        self.counts.get(item).copied().unwrap_or(0)
    }

    pub fn set(&mut self, item: impl Into<String>, count: u64) {
        self.counts.insert(item.into(), count);
    }

    pub fn add(&mut self, item: impl Into<String>, count: u64) {
        *self.counts.entry(item.into()).or_insert(0) += count;
    }

    /// Subtracts `count` if available; returns false (no-op) otherwise.
    #[must_use]
    pub fn try_subtract(&mut self, item: &str, count: u64) -> bool {
        let Some(have) = self.counts.get_mut(item) else { return count == 0 };
        if *have < count {
            return false;
        }
        *have -= count;
        true
    }

    pub fn is_empty(&self) -> bool {
        self.counts.values().all(|&c| c == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_accounting_scenario() {
        let mut amt = TaggedAmount { amount: 10, claims: HashMap::new() };
        assert!(amt.update(5, Some("A")));
        assert_eq!(amt.amount(), 15);
        assert_eq!(amt.claimed_by("A"), 5);

        assert!(amt.update(-12, Some("A")));
        assert_eq!(amt.amount(), 3);
        assert_eq!(amt.claimed_by("A"), 0);

        assert!(!amt.update(-4, Some("A")));
        assert_eq!(amt.amount(), 3);
    }

    #[test]
    fn available_to_counts_unclaimed_plus_own_claim() {
        let mut amt = TaggedAmount::default();
        assert!(amt.update(10, None));
        assert!(amt.update(0, Some("A")));
        assert!(amt.update(3, Some("A")));
        assert_eq!(amt.available_to("A"), 10);
        assert_eq!(amt.available_to("B"), 7);
    }

    #[test]
    fn tagged_inventory_claimed_by_snapshot() {
        let mut inv = TaggedInventory::new();
        assert!(inv.update("iron-plate", 10, Some("A")));
        assert!(inv.update("iron-plate", -3, Some("A")));
        let snapshot = inv.claimed_by("A");
        assert_eq!(snapshot.get("iron-plate"), 7);
    }

    #[test]
    fn sweep_stale_claims_removes_dead_owners() {
        let mut inv = TaggedInventory::new();
        assert!(inv.update("iron-plate", 10, Some("ghost")));
        inv.sweep_stale_claims(&[]);
        assert_eq!(inv.available_to("iron-plate", "anyone"), 10);
    }

    #[test]
    fn can_satisfy_sums_duplicate_items_before_checking() {
        let mut inv = TaggedInventory::new();
        assert!(inv.update("wood", 5, Some("A")));
        let required = vec![("wood".to_string(), 2), ("wood".to_string(), 3)];
        assert!(inv.can_satisfy(&required, "A"));
        assert!(!inv.can_satisfy(&[("wood".to_string(), 6)], "A"));
    }

    #[test]
    fn can_satisfy_is_false_when_an_item_is_entirely_missing() {
        let inv = TaggedInventory::new();
        assert!(!inv.can_satisfy(&[("iron-plate".to_string(), 1)], "A"));
        assert!(inv.can_satisfy(&[], "A"));
    }

    #[test]
    fn inventory_try_subtract_is_atomic() {
        let mut inv = Inventory::new();
        inv.set("wood", 2);
        assert!(!inv.try_subtract("wood", 3));
        assert_eq!(inv.get("wood"), 2);
        assert!(inv.try_subtract("wood", 2));
        assert_eq!(inv.get("wood"), 0);
    }
}

// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded in-memory result cache keyed by asset id, plus the rank
//! side-table.
//!
//! Eviction is insertion-order FIFO: when the cache is full the oldest
//! entry is removed before the write. Entries also age out after the
//! configured TTL, but only on the periodic [`ResultCache::cleanup_expired`]
//! sweep -- lookups never check the TTL inline. The rank table is
//! unbounded, has no TTL, and is populated externally.
//!
//! Operations are short and never await, so the interior state sits
//! behind a plain mutex.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use floatd_core::types::{DecoratedItem, RankInfo};
use tracing::debug;

/// One cached resolution.
#[derive(Debug, Clone)]
pub struct CachedItem {
    pub item: DecoratedItem,
    pub price: Option<u64>,
    pub inserted_at: Instant,
}

struct CacheInner {
    entries: HashMap<String, CachedItem>,
    /// Insertion order with lazy stale markers: an overwrite pushes a new
    /// marker and leaves the old one behind; eviction skips markers whose
    /// timestamp no longer matches the live entry.
    order: VecDeque<(String, Instant)>,
}

/// Bounded, TTL'd asset-id -> decorated-item store.
pub struct ResultCache {
    max_entries: usize,
    ttl: Duration,
    inner: Mutex<CacheInner>,
    ranks: Mutex<HashMap<String, RankInfo>>,
}

impl ResultCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            max_entries,
            ttl,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            ranks: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up a batch of asset ids, preserving input order. Expired
    /// entries that the sweep has not yet removed are still returned.
    pub fn get_many(&self, asset_ids: &[&str]) -> Vec<Option<CachedItem>> {
        let inner = self.inner.lock().expect("cache mutex poisoned");
        asset_ids
            .iter()
            .map(|a| inner.entries.get(*a).cloned())
            .collect()
    }

    /// Inserts a resolved item, evicting the oldest entry first when at
    /// capacity. Overwriting an existing asset resets its insertion age.
    pub fn insert(&self, mut item: DecoratedItem, price: Option<u64>) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let asset_id = item.a.clone();
        let replacing = inner.entries.contains_key(&asset_id);
        while !replacing && inner.entries.len() >= self.max_entries {
            if !evict_oldest(&mut inner) {
                break;
            }
        }
        if let Some(p) = price {
            item.price = Some(p);
        }
        let now = Instant::now();
        inner.entries.insert(
            asset_id.clone(),
            CachedItem {
                item,
                price,
                inserted_at: now,
            },
        );
        inner.order.push_back((asset_id, now));
    }

    /// Updates the stored price for a cached asset. No-op when absent.
    pub fn update_price(&self, asset_id: &str, price: u64) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        if let Some(entry) = inner.entries.get_mut(asset_id) {
            entry.price = Some(price);
            entry.item.price = Some(price);
        }
    }

    /// Rank metadata for an asset; empty when the side-table has no row.
    pub fn get_rank(&self, asset_id: &str) -> RankInfo {
        self.ranks
            .lock()
            .expect("rank mutex poisoned")
            .get(asset_id)
            .copied()
            .unwrap_or_default()
    }

    /// Write seam for the external rank pipeline.
    pub fn insert_rank(&self, asset_id: String, rank: RankInfo) {
        self.ranks
            .lock()
            .expect("rank mutex poisoned")
            .insert(asset_id, rank);
    }

    /// Removes entries older than the TTL. Called from a periodic timer;
    /// this and FIFO eviction are the only removal paths.
    pub fn cleanup_expired(&self) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let ttl = self.ttl;
        let before = inner.entries.len();
        inner.entries.retain(|_, e| e.inserted_at.elapsed() < ttl);
        // Drop order markers that no longer point at a live entry.
        let entries = std::mem::take(&mut inner.entries);
        inner
            .order
            .retain(|(a, ts)| entries.get(a).is_some_and(|e| e.inserted_at == *ts));
        inner.entries = entries;
        let removed = before - inner.entries.len();
        if removed > 0 {
            debug!(removed, remaining = inner.entries.len(), "cache sweep");
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pops order markers until a live entry is evicted. Returns false when
/// only stale markers remained.
fn evict_oldest(inner: &mut CacheInner) -> bool {
    while let Some((asset_id, ts)) = inner.order.pop_front() {
        let live = inner
            .entries
            .get(&asset_id)
            .is_some_and(|e| e.inserted_at == ts);
        if live {
            inner.entries.remove(&asset_id);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use floatd_core::InspectLink;
    use floatd_core::types::RawItemInfo;

    fn item(a: &str) -> DecoratedItem {
        let link = InspectLink::from_fields(a, "1", Some("2"), None).unwrap();
        DecoratedItem::from_raw(
            &link,
            RawItemInfo {
                itemid: a.to_string(),
                defindex: 7,
                paintindex: 282,
                rarity: 6,
                quality: 4,
                paintwear: 0.1,
                paintseed: Some(3),
                origin: None,
                customname: None,
                killeatervalue: None,
                stickers: vec![],
                keychains: vec![],
            },
        )
    }

    fn cache() -> ResultCache {
        ResultCache::new(3, Duration::from_secs(3600))
    }

    #[test]
    fn insert_then_get_many_returns_item_with_price() {
        let c = cache();
        c.insert(item("10"), Some(1500));
        let got = c.get_many(&["10"]);
        let hit = got[0].as_ref().unwrap();
        assert_eq!(hit.price, Some(1500));
        assert_eq!(hit.item.price, Some(1500));
        assert_eq!(hit.item.a, "10");
    }

    #[test]
    fn get_many_preserves_order_and_reports_misses() {
        let c = cache();
        c.insert(item("2"), None);
        let got = c.get_many(&["1", "2", "3"]);
        assert!(got[0].is_none());
        assert!(got[1].is_some());
        assert!(got[2].is_none());
    }

    #[test]
    fn fifo_eviction_drops_oldest_first() {
        let c = cache();
        for a in ["A", "B", "C", "D"] {
            c.insert(item(a), None);
        }
        assert_eq!(c.len(), 3);
        let got = c.get_many(&["A", "B", "C", "D"]);
        assert!(got[0].is_none(), "A should have been evicted");
        assert!(got[1].is_some());
        assert!(got[2].is_some());
        assert!(got[3].is_some());
    }

    #[test]
    fn n_inserts_beyond_capacity_evict_exactly_n_oldest() {
        let c = cache();
        for a in ["A", "B", "C", "D", "E"] {
            c.insert(item(a), None);
        }
        assert_eq!(c.len(), 3);
        let got = c.get_many(&["A", "B", "C", "D", "E"]);
        assert!(got[0].is_none());
        assert!(got[1].is_none());
        assert!(got[2].is_some());
        assert!(got[3].is_some());
        assert!(got[4].is_some());
    }

    #[test]
    fn overwrite_refreshes_insertion_order() {
        let c = cache();
        c.insert(item("A"), None);
        c.insert(item("B"), None);
        c.insert(item("C"), None);
        // Refresh A, then overflow: B is now the oldest.
        c.insert(item("A"), None);
        c.insert(item("D"), None);
        let got = c.get_many(&["A", "B", "C", "D"]);
        assert!(got[0].is_some(), "refreshed A must survive");
        assert!(got[1].is_none(), "B should have been evicted");
        assert!(got[2].is_some());
        assert!(got[3].is_some());
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn overwrite_replaces_price() {
        let c = cache();
        c.insert(item("A"), Some(100));
        c.insert(item("A"), None);
        let got = c.get_many(&["A"]);
        assert_eq!(got[0].as_ref().unwrap().price, None);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn update_price_is_noop_for_absent_asset() {
        let c = cache();
        c.update_price("missing", 42);
        assert!(c.is_empty());
        c.insert(item("A"), None);
        c.update_price("A", 42);
        let got = c.get_many(&["A"]);
        assert_eq!(got[0].as_ref().unwrap().price, Some(42));
        assert_eq!(got[0].as_ref().unwrap().item.price, Some(42));
    }

    #[test]
    fn cleanup_removes_only_expired_entries() {
        let c = ResultCache::new(10, Duration::from_millis(20));
        c.insert(item("old"), None);
        std::thread::sleep(Duration::from_millis(40));
        c.insert(item("new"), None);
        // Lookups do not check TTL inline.
        assert!(c.get_many(&["old"])[0].is_some());
        c.cleanup_expired();
        let got = c.get_many(&["old", "new"]);
        assert!(got[0].is_none());
        assert!(got[1].is_some());
    }

    #[test]
    fn cleanup_discards_stale_order_markers() {
        let c = ResultCache::new(10, Duration::from_millis(20));
        c.insert(item("A"), None);
        c.insert(item("A"), None);
        std::thread::sleep(Duration::from_millis(40));
        c.cleanup_expired();
        assert!(c.is_empty());
        // Re-inserting after the sweep must behave normally.
        c.insert(item("A"), None);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn rank_table_defaults_to_empty() {
        let c = cache();
        assert_eq!(c.get_rank("1"), RankInfo::default());
        c.insert_rank(
            "1".to_string(),
            RankInfo {
                low_rank: Some(7),
                high_rank: None,
            },
        );
        assert_eq!(c.get_rank("1").low_rank, Some(7));
    }
}

/// Per-image engagement counters for the fullscreen view
///
/// Counts are keyed by `"<realm>::<index>"` and persisted as one record.
/// The key is positional: deleting an image does not move its counts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::data::Realm;
use super::library::{StoreHandle, StoreKey};

/// Counters for one image slot
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Engagement {
    /// Times the image was opened fullscreen
    pub seen: u64,
    /// Times a share link was generated for it
    pub forward: u64,
}

/// All engagement counters
#[derive(Debug, Default)]
pub struct EngagementLedger {
    stats: BTreeMap<String, Engagement>,
    store: Option<StoreHandle>,
}

impl EngagementLedger {
    /// Key under which an image slot's counters are kept
    pub fn key(realm: Realm, index: usize) -> String {
        format!("{}::{}", realm, index)
    }

    /// Load the persisted counters, keeping every entry that can be read
    pub fn open(store: StoreHandle) -> Self {
        let raw = match store.get_json::<Value>(StoreKey::EngagementStats) {
            Ok(value) => value,
            Err(e) => {
                log::error!("❌ Ignoring unreadable engagement stats: {}", e);
                None
            }
        };

        let stats = match raw {
            Some(Value::Object(entries)) => entries
                .into_iter()
                .map(|(key, value)| {
                    let count = |field: &str| value.get(field).and_then(Value::as_u64).unwrap_or(0);
                    let engagement = Engagement {
                        seen: count("seen"),
                        forward: count("forward"),
                    };
                    (key, engagement)
                })
                .collect(),
            _ => BTreeMap::new(),
        };

        log::debug!("Loaded engagement stats for {} images", stats.len());
        Self {
            stats,
            store: Some(store),
        }
    }

    /// Ledger that is never persisted
    pub fn ephemeral() -> Self {
        Self::default()
    }

    /// Counters for an image slot (zeros if never touched)
    pub fn counts(&self, realm: Realm, index: usize) -> Engagement {
        self.stats
            .get(&Self::key(realm, index))
            .copied()
            .unwrap_or_default()
    }

    pub fn record_seen(&mut self, realm: Realm, index: usize) -> Engagement {
        self.bump(realm, index, |e| e.seen += 1)
    }

    pub fn record_forward(&mut self, realm: Realm, index: usize) -> Engagement {
        self.bump(realm, index, |e| e.forward += 1)
    }

    fn bump(&mut self, realm: Realm, index: usize, f: impl FnOnce(&mut Engagement)) -> Engagement {
        let entry = self.stats.entry(Self::key(realm, index)).or_default();
        f(entry);
        let updated = *entry;
        if let Some(store) = &self.store {
            store.save(StoreKey::EngagementStats, &self.stats);
        }
        updated
    }
}

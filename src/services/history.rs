use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use crate::db::{load_or_default, save_best_effort, KeyValueStore, StoreKey};
use crate::models::{FeatureVector, HistoryEntry, InteractionEvent, InteractionKind};

/// Most recently viewed posts kept for personalization
pub const HISTORY_CAPACITY: usize = 20;
/// Interaction events kept before the oldest is dropped
pub const INTERACTION_CAPACITY: usize = 100;

/// Viewing history and interaction log of one client
///
/// Both lists are mirrored in memory and written through to the store on
/// every change. Storage problems never reach the caller: an unreadable
/// record loads as empty and a failed write leaves only the in-memory copy.
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    entries: Vec<HistoryEntry>,
    interactions: Vec<InteractionEvent>,
}

impl HistoryStore {
    /// Loads both records from `store`
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let mut entries: Vec<HistoryEntry> = load_or_default(store.as_ref(), &StoreKey::UserHistory);
        entries.truncate(HISTORY_CAPACITY);

        let mut interactions: Vec<InteractionEvent> =
            load_or_default(store.as_ref(), &StoreKey::Interactions);
        if interactions.len() > INTERACTION_CAPACITY {
            interactions.drain(..interactions.len() - INTERACTION_CAPACITY);
        }

        tracing::debug!(
            history = entries.len(),
            interactions = interactions.len(),
            "Loaded user history"
        );

        Self {
            store,
            entries,
            interactions,
        }
    }

    /// History entries, most recent first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn interactions(&self) -> &[InteractionEvent] {
        &self.interactions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Moves `id` to the front of the history, evicting beyond capacity
    pub fn record_view(&mut self, id: &str, title: &str, category: &str, url: &str) {
        self.entries.retain(|entry| entry.id != id);
        self.entries.insert(
            0,
            HistoryEntry {
                id: id.to_string(),
                title: title.to_string(),
                category: category.to_string(),
                url: url.to_string(),
                timestamp: Utc::now().timestamp_millis(),
            },
        );
        self.entries.truncate(HISTORY_CAPACITY);

        save_best_effort(self.store.as_ref(), &StoreKey::UserHistory, &self.entries);
        tracing::info!(post_id = %id, title = %title, "Added to history");
    }

    /// Appends to the interaction log, dropping the oldest event when full
    pub fn record_interaction(
        &mut self,
        post_id: &str,
        kind: InteractionKind,
        metadata: serde_json::Value,
    ) {
        self.interactions.push(InteractionEvent {
            post_id: post_id.to_string(),
            kind,
            timestamp: Utc::now().timestamp_millis(),
            metadata,
        });
        if self.interactions.len() > INTERACTION_CAPACITY {
            let overflow = self.interactions.len() - INTERACTION_CAPACITY;
            self.interactions.drain(..overflow);
        }

        save_best_effort(self.store.as_ref(), &StoreKey::Interactions, &self.interactions);
        tracing::debug!(post_id = %post_id, kind = %kind, "Tracked interaction");
    }

    /// Per-key mean of the feature vectors of resolvable history entries
    ///
    /// Each key is divided by the number of entries that carry it, not by
    /// the history length. Entries `lookup` cannot resolve are skipped.
    pub fn average_features<'a, F>(&self, lookup: F) -> FeatureVector
    where
        F: Fn(&str) -> Option<&'a FeatureVector>,
    {
        let mut sums: BTreeMap<&str, (f64, u32)> = BTreeMap::new();

        for entry in &self.entries {
            let Some(features) = lookup(&entry.id) else {
                continue;
            };
            for (key, value) in features.iter() {
                let slot = sums.entry(key).or_insert((0.0, 0));
                slot.0 += value;
                slot.1 += 1;
            }
        }

        sums.into_iter()
            .map(|(key, (sum, count))| (key.to_string(), sum / f64::from(count)))
            .collect()
    }
}

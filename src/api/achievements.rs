//! Achievement toast sequencing
//!
//! Unlocks are queued and shown one at a time. Only the set of badge ids the
//! user has already seen is durable; pending and current toasts are rebuilt on
//! the next launch.

use crate::api::callback::{Callback, CallbackHandle, CallbackRegistry};
use crate::api::types::{AchievementReady, ApiError, ApiResult};
use crate::core::BadgeDefinition;
use crate::platform::KeyValueStore;
use crate::utils::{AchievementConfig, Clock, Timer};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One-at-a-time queue of achievement toasts
pub struct AchievementQueue {
    store: Box<dyn KeyValueStore + Send>,
    config: AchievementConfig,
    clock: Arc<dyn Clock>,
    seen: BTreeSet<String>,
    pending: VecDeque<BadgeDefinition>,
    current: Option<BadgeDefinition>,
    timer: Timer,
    ready_callbacks: CallbackRegistry<AchievementReady>,
}

impl std::fmt::Debug for AchievementQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AchievementQueue")
            .field("seen", &self.seen)
            .field("pending", &self.pending.len())
            .field("current", &self.current.as_ref().map(|b| &b.id))
            .finish()
    }
}

impl AchievementQueue {
    /// Create the queue and load the seen set from `store`.
    ///
    /// A stored value that is not a JSON array of ids is discarded with a
    /// warning; store read failures are returned.
    pub fn new(
        store: Box<dyn KeyValueStore + Send>,
        config: AchievementConfig,
        clock: Arc<dyn Clock>,
    ) -> ApiResult<Self> {
        let mut queue = Self {
            store,
            config,
            clock,
            seen: BTreeSet::new(),
            pending: VecDeque::new(),
            current: None,
            timer: Timer::new(),
            ready_callbacks: CallbackRegistry::new(),
        };
        queue.load()?;
        Ok(queue)
    }

    /// Re-read the seen set from the store
    pub fn load(&mut self) -> ApiResult<()> {
        self.seen = match self.store.get(&self.config.storage_key)? {
            Some(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    warn!(key = %self.config.storage_key, error = %e, "discarding unreadable seen set");
                    BTreeSet::new()
                }
            },
            None => BTreeSet::new(),
        };
        debug!(seen = self.seen.len(), "seen achievements loaded");
        Ok(())
    }

    pub fn current(&self) -> Option<&BadgeDefinition> {
        self.current.as_ref()
    }

    pub fn pending(&self) -> impl Iterator<Item = &BadgeDefinition> {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn seen_ids(&self) -> impl Iterator<Item = &str> {
        self.seen.iter().map(String::as_str)
    }

    /// Queue every unlocked badge not yet seen, pending or showing.
    ///
    /// New badges are appended in catalog order; the returned list holds
    /// exactly what was appended.
    pub fn check_and_queue_new_achievements<S: AsRef<str>>(
        &mut self,
        unlocked_ids: &[S],
        catalog: &[BadgeDefinition],
    ) -> Vec<BadgeDefinition> {
        let unlocked: HashSet<&str> = unlocked_ids.iter().map(|id| id.as_ref()).collect();
        let mut queued = Vec::new();

        for badge in catalog {
            if !unlocked.contains(badge.id.as_str()) || self.is_known(&badge.id) {
                continue;
            }
            self.pending.push_back(badge.clone());
            queued.push(badge.clone());
        }

        if !queued.is_empty() {
            info!(
                count = queued.len(),
                first = %queued[0].id,
                "new achievements queued"
            );
            if self.current.is_none() {
                self.schedule(self.config.show_delay_ms);
            }
        }
        queued
    }

    /// Move the head of the queue on screen; no-op while a toast is showing
    pub fn show_next_achievement(&mut self) -> Option<BadgeDefinition> {
        if self.current.is_some() {
            return None;
        }
        let badge = self.pending.pop_front()?;
        self.timer.cancel();

        info!(badge = %badge.id, remaining = self.pending.len(), "showing achievement");
        self.current = Some(badge.clone());
        self.ready_callbacks.emit(&AchievementReady {
            badge: badge.clone(),
        });
        Some(badge)
    }

    /// Hide the current toast and remember it as seen.
    ///
    /// The next pending toast follows after a short delay. The in-memory state
    /// is updated even when persisting fails; the store error is returned.
    pub fn dismiss_current_achievement(&mut self) -> ApiResult<Option<BadgeDefinition>> {
        let Some(badge) = self.current.take() else {
            return Ok(None);
        };

        debug!(badge = %badge.id, "achievement dismissed");
        self.seen.insert(badge.id.clone());
        if !self.pending.is_empty() {
            self.schedule(self.config.next_delay_ms);
        }
        self.persist()?;
        Ok(Some(badge))
    }

    pub fn has_seen_achievement(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Record `id` as seen without showing it
    pub fn mark_as_seen(&mut self, id: &str) -> ApiResult<()> {
        if !self.seen.insert(id.to_string()) {
            return Ok(());
        }

        self.pending.retain(|badge| badge.id != id);
        if self.current.as_ref().is_some_and(|badge| badge.id == id) {
            self.current = None;
            if !self.pending.is_empty() {
                self.schedule(self.config.next_delay_ms);
            }
        }
        self.persist()
    }

    pub fn on_achievement_ready(&mut self, callback: Callback<AchievementReady>) -> CallbackHandle {
        self.ready_callbacks.register(callback)
    }

    pub fn unregister_callback(&mut self, handle: CallbackHandle) -> ApiResult<()> {
        if self.ready_callbacks.unregister(handle) {
            Ok(())
        } else {
            Err(ApiError::InvalidCallbackHandle(handle.id()))
        }
    }

    /// Fire the display timer if it is due
    pub fn process(&mut self) -> Vec<AchievementReady> {
        if !self.timer.fire_if_due(self.clock.now_ms()) {
            return Vec::new();
        }
        self.show_next_achievement()
            .map(|badge| vec![AchievementReady { badge }])
            .unwrap_or_default()
    }

    fn is_known(&self, id: &str) -> bool {
        self.seen.contains(id)
            || self.pending.iter().any(|badge| badge.id == id)
            || self.current.as_ref().is_some_and(|badge| badge.id == id)
    }

    /// Arm the display timer unless a display is already scheduled
    fn schedule(&mut self, delay_ms: u64) {
        if self.timer.is_armed() {
            return;
        }
        self.timer.arm(self.clock.now_ms(), delay_ms);
    }

    fn persist(&mut self) -> ApiResult<()> {
        let ids: Vec<&String> = self.seen.iter().collect();
        let raw = serde_json::to_string(&ids).map_err(crate::platform::StoreError::from)?;
        self.store.set(&self.config.storage_key, &raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BadgeCategory;
    use crate::platform::{JsonFileStore, MemoryStore, SledStore};
    use crate::utils::ManualClock;
    use std::sync::Mutex;

    fn catalog() -> Vec<BadgeDefinition> {
        vec![
            BadgeDefinition::new("first_order", "Первый заказ", BadgeCategory::Orders),
            BadgeDefinition::new("coffee_lover", "Кофеман", BadgeCategory::Loyalty)
                .with_icon("coffee"),
            BadgeDefinition::new("friend", "Друг", BadgeCategory::Social),
        ]
    }

    fn queue_with(store: Box<dyn KeyValueStore + Send>) -> (AchievementQueue, ManualClock) {
        let clock = ManualClock::new(0);
        let queue = AchievementQueue::new(store, AchievementConfig::default(), Arc::new(clock.clone()))
            .unwrap();
        (queue, clock)
    }

    fn ids(badges: &[BadgeDefinition]) -> Vec<&str> {
        badges.iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn test_queue_in_catalog_order() {
        let (mut queue, _clock) = queue_with(Box::new(MemoryStore::new()));
        let queued = queue.check_and_queue_new_achievements(&["friend", "first_order"], &catalog());
        assert_eq!(ids(&queued), vec!["first_order", "friend"]);
        assert_eq!(queue.pending_len(), 2);
    }

    #[test]
    fn test_no_duplicate_queueing() {
        let (mut queue, _clock) = queue_with(Box::new(MemoryStore::new()));
        let first = queue.check_and_queue_new_achievements(&["first_order"], &catalog());
        let second = queue.check_and_queue_new_achievements(&["first_order"], &catalog());

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(queue.pending_len(), 1);
    }

    #[test]
    fn test_first_toast_after_show_delay() {
        let (mut queue, clock) = queue_with(Box::new(MemoryStore::new()));
        let shown = Arc::new(Mutex::new(Vec::new()));
        let sink = shown.clone();
        queue.on_achievement_ready(Box::new(move |ready| sink.lock().unwrap().push(ready.badge.id.clone())));

        queue.check_and_queue_new_achievements(&["first_order"], &catalog());
        clock.advance(499);
        assert!(queue.process().is_empty());
        assert!(queue.current().is_none());

        clock.advance(1);
        let ready = queue.process();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].badge.id, "first_order");
        assert_eq!(queue.current().map(|b| b.id.as_str()), Some("first_order"));
        assert_eq!(*shown.lock().unwrap(), vec!["first_order"]);
        assert_eq!(queue.pending_len(), 0);
    }

    #[test]
    fn test_showing_badge_is_not_requeued() {
        let (mut queue, _clock) = queue_with(Box::new(MemoryStore::new()));
        queue.check_and_queue_new_achievements(&["first_order"], &catalog());
        queue.show_next_achievement();

        let again = queue.check_and_queue_new_achievements(&["first_order"], &catalog());
        assert!(again.is_empty());
        assert_eq!(queue.pending_len(), 0);
    }

    #[test]
    fn test_seen_suppresses_requeue() {
        let (mut queue, _clock) = queue_with(Box::new(MemoryStore::new()));
        queue.check_and_queue_new_achievements(&["first_order"], &catalog());
        queue.show_next_achievement();
        let dismissed = queue.dismiss_current_achievement().unwrap();

        assert_eq!(dismissed.map(|b| b.id), Some("first_order".to_string()));
        assert!(queue.has_seen_achievement("first_order"));
        assert!(queue
            .check_and_queue_new_achievements(&["first_order"], &catalog())
            .is_empty());
    }

    #[test]
    fn test_next_toast_after_dismiss_delay() {
        let (mut queue, clock) = queue_with(Box::new(MemoryStore::new()));
        queue.check_and_queue_new_achievements(&["first_order", "friend"], &catalog());
        clock.advance(500);
        queue.process();
        assert_eq!(queue.current().map(|b| b.id.as_str()), Some("first_order"));

        // Nothing appears while a toast is on screen
        clock.advance(5000);
        assert!(queue.process().is_empty());

        queue.dismiss_current_achievement().unwrap();
        assert!(queue.current().is_none());
        clock.advance(299);
        assert!(queue.process().is_empty());
        clock.advance(1);
        let ready = queue.process();
        assert_eq!(ready[0].badge.id, "friend");
    }

    #[test]
    fn test_rapid_dismiss_then_requeue_shows_one_at_a_time() {
        let (mut queue, clock) = queue_with(Box::new(MemoryStore::new()));
        queue.check_and_queue_new_achievements(&["first_order", "coffee_lover"], &catalog());
        clock.advance(500);
        queue.process();

        queue.dismiss_current_achievement().unwrap();
        queue.check_and_queue_new_achievements(&["first_order", "coffee_lover", "friend"], &catalog());

        let mut shown = Vec::new();
        for _ in 0..20 {
            clock.advance(100);
            for ready in queue.process() {
                shown.push(ready.badge.id.clone());
                assert_eq!(queue.current().map(|b| &b.id), Some(&ready.badge.id));
                queue.dismiss_current_achievement().unwrap();
            }
        }
        assert_eq!(shown, vec!["coffee_lover", "friend"]);
        assert!(queue.has_seen_achievement("friend"));
    }

    #[test]
    fn test_manual_show_is_noop_while_showing() {
        let (mut queue, _clock) = queue_with(Box::new(MemoryStore::new()));
        queue.check_and_queue_new_achievements(&["first_order", "friend"], &catalog());
        assert!(queue.show_next_achievement().is_some());
        assert!(queue.show_next_achievement().is_none());
        assert_eq!(queue.pending_len(), 1);
        assert!(queue.dismiss_current_achievement().unwrap().is_some());
        assert!(queue.dismiss_current_achievement().unwrap().is_none());
    }

    #[test]
    fn test_mark_as_seen_removes_from_pending() {
        let (mut queue, _clock) = queue_with(Box::new(MemoryStore::new()));
        queue.check_and_queue_new_achievements(&["first_order", "friend"], &catalog());
        queue.mark_as_seen("friend").unwrap();

        assert!(queue.has_seen_achievement("friend"));
        assert_eq!(queue.pending().map(|b| b.id.as_str()).collect::<Vec<_>>(), vec!["first_order"]);
    }

    #[test]
    fn test_corrupt_seen_value_starts_empty() {
        let mut store = MemoryStore::new();
        store.set(crate::core::SEEN_ACHIEVEMENTS_KEY, "{not json").unwrap();
        let (queue, _clock) = queue_with(Box::new(store));
        assert_eq!(queue.seen_ids().count(), 0);
    }

    #[test]
    fn test_seen_set_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("achievements.json");

        {
            let (mut queue, _clock) = queue_with(Box::new(JsonFileStore::open(&path).unwrap()));
            queue.check_and_queue_new_achievements(&["coffee_lover"], &catalog());
            queue.show_next_achievement();
            queue.dismiss_current_achievement().unwrap();
        }

        let (mut queue, _clock) = queue_with(Box::new(JsonFileStore::open(&path).unwrap()));
        assert!(queue.has_seen_achievement("coffee_lover"));
        let queued = queue.check_and_queue_new_achievements(&["coffee_lover", "friend"], &catalog());
        assert_eq!(ids(&queued), vec!["friend"]);
    }

    #[test]
    fn test_sled_backed_queue() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        {
            let (mut queue, _clock) = queue_with(Box::new(SledStore::from_db(&db).unwrap()));
            queue.mark_as_seen("first_order").unwrap();
        }
        let (queue, _clock) = queue_with(Box::new(SledStore::from_db(&db).unwrap()));
        assert!(queue.has_seen_achievement("first_order"));
    }
}

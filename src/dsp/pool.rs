//! Voice pool — admission control and lifecycle tracking for overlapping
//! triggers of the one instrument sample.
//!
//! Voices live in an arena keyed by a pool-owned monotonic [`VoiceId`]; a
//! per-key index keeps each key's voices in trigger order, oldest first. At
//! most [`MAX_VOICES_PER_KEY`] voices may share a key; the next trigger
//! steals the oldest with a gentle fade instead of a hard cut.

use std::collections::HashMap;

use super::backend::{PlaybackBackend, VoiceHandle};
use crate::error::EngineError;

/// Concurrency ceiling per logical key.
pub const MAX_VOICES_PER_KEY: usize = 3;

/// Fade length when a voice is stolen at the ceiling.
pub const EVICT_FADE_SECS: f64 = 0.2;

/// Fade length for an explicit release.
pub const RELEASE_FADE_SECS: f64 = 0.05;

/// Stable identifier for a tracked voice, from a counter owned by the pool.
/// Counter-based ids make trigger order explicit and cannot collide under
/// rapid re-triggering the way timestamp-derived keys can.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(u64);

/// Bookkeeping record for one in-flight voice.
#[derive(Debug, Clone)]
pub struct VoiceEntry {
    pub id: VoiceId,
    pub handle: VoiceHandle,
    pub key: String,
    /// Sample-clock time of the trigger.
    pub started_at: u64,
    pub playback_rate: f64,
}

pub struct VoicePool {
    next_id: u64,
    /// Arena of live voice records.
    voices: HashMap<VoiceId, VoiceEntry>,
    /// Per-key trigger-order index into the arena, oldest first.
    by_key: HashMap<String, Vec<VoiceId>>,
    /// Reverse lookup for completion notifications.
    by_handle: HashMap<VoiceHandle, VoiceId>,
    max_per_key: usize,
}

impl VoicePool {
    pub fn new() -> Self {
        Self::with_ceiling(MAX_VOICES_PER_KEY)
    }

    pub fn with_ceiling(max_per_key: usize) -> Self {
        VoicePool {
            next_id: 0,
            voices: HashMap::new(),
            by_key: HashMap::new(),
            by_handle: HashMap::new(),
            max_per_key: max_per_key.max(1),
        }
    }

    /// Start a voice for `key` at `playback_rate`, stealing the key's oldest
    /// voice (200 ms fade from its current gain) if the ceiling is reached.
    pub fn trigger(
        &mut self,
        backend: &mut dyn PlaybackBackend,
        key: &str,
        playback_rate: f64,
    ) -> Result<VoiceId, EngineError> {
        self.remove_finished(backend);

        if self.active_count(key) >= self.max_per_key {
            let oldest = self.by_key.get(key).and_then(|ids| ids.first().copied());
            if let Some(id) = oldest {
                self.evict(backend, id, EVICT_FADE_SECS);
            }
        }

        let handle = backend.trigger(playback_rate)?;
        let id = VoiceId(self.next_id);
        self.next_id += 1;

        self.voices.insert(
            id,
            VoiceEntry {
                id,
                handle,
                key: key.to_string(),
                started_at: backend.now(),
                playback_rate,
            },
        );
        self.by_handle.insert(handle, id);
        self.by_key.entry(key.to_string()).or_default().push(id);

        Ok(id)
    }

    /// Release the newest still-sounding voice for `key` with a 50 ms fade.
    /// Returns whether a voice was found.
    pub fn release(&mut self, backend: &mut dyn PlaybackBackend, key: &str) -> bool {
        self.remove_finished(backend);

        let newest = self.by_key.get(key).and_then(|ids| ids.last().copied());
        match newest {
            Some(id) => {
                self.evict(backend, id, RELEASE_FADE_SECS);
                true
            }
            None => false,
        }
    }

    /// Stop everything immediately and clear the pool. No completion
    /// notifications survive.
    pub fn release_all(&mut self, backend: &mut dyn PlaybackBackend) {
        backend.stop_all();
        self.voices.clear();
        self.by_key.clear();
        self.by_handle.clear();
    }

    /// Consume the backend's completion notifications, dropping entries for
    /// voices that ended on their own. Notifications for voices the pool
    /// already removed (released, evicted, panicked) are ignored.
    pub fn remove_finished(&mut self, backend: &mut dyn PlaybackBackend) {
        for handle in backend.drain_finished() {
            if let Some(id) = self.by_handle.remove(&handle) {
                self.forget(id);
            }
        }
    }

    /// Number of tracked voices for `key`.
    pub fn active_count(&self, key: &str) -> usize {
        self.by_key.get(key).map_or(0, |ids| ids.len())
    }

    /// Total tracked voices.
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn entry(&self, id: VoiceId) -> Option<&VoiceEntry> {
        self.voices.get(&id)
    }

    /// Fade a voice out on the backend and drop its bookkeeping in the same
    /// step; the physical fade continues while the pool already counts the
    /// voice as stopped.
    fn evict(&mut self, backend: &mut dyn PlaybackBackend, id: VoiceId, fade_secs: f64) {
        if let Some(entry) = self.voices.get(&id) {
            backend.release(entry.handle, fade_secs);
            self.by_handle.remove(&entry.handle);
        }
        self.forget(id);
    }

    fn forget(&mut self, id: VoiceId) {
        if let Some(entry) = self.voices.remove(&id) {
            if let Some(ids) = self.by_key.get_mut(&entry.key) {
                ids.retain(|&v| v != id);
                if ids.is_empty() {
                    self.by_key.remove(&entry.key);
                }
            }
        }
    }
}

impl Default for VoicePool {
    fn default() -> Self {
        VoicePool::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::SampleAsset;

    /// Records backend calls so tests can assert on fades and stops without
    /// rendering audio.
    struct MockBackend {
        next_handle: u64,
        clock: u64,
        releases: Vec<(VoiceHandle, f64)>,
        stop_all_calls: usize,
        pending_finished: Vec<VoiceHandle>,
    }

    impl MockBackend {
        fn new() -> Self {
            MockBackend {
                next_handle: 0,
                clock: 0,
                releases: Vec::new(),
                stop_all_calls: 0,
                pending_finished: Vec::new(),
            }
        }

        fn finish(&mut self, handle: VoiceHandle) {
            self.pending_finished.push(handle);
        }
    }

    impl PlaybackBackend for MockBackend {
        fn prepare(&mut self) -> Result<(), EngineError> {
            Ok(())
        }

        fn load(&mut self, _asset: &SampleAsset) -> Result<(), EngineError> {
            Ok(())
        }

        fn is_loaded(&self) -> bool {
            true
        }

        fn now(&self) -> u64 {
            self.clock
        }

        fn trigger(&mut self, _rate: f64) -> Result<VoiceHandle, EngineError> {
            let handle = VoiceHandle(self.next_handle);
            self.next_handle += 1;
            Ok(handle)
        }

        fn release(&mut self, handle: VoiceHandle, fade_secs: f64) {
            self.releases.push((handle, fade_secs));
        }

        fn stop(&mut self, _handle: VoiceHandle) {}

        fn stop_all(&mut self) {
            self.stop_all_calls += 1;
            self.pending_finished.clear();
        }

        fn drain_finished(&mut self) -> Vec<VoiceHandle> {
            std::mem::take(&mut self.pending_finished)
        }

        fn render_block(&mut self, out: &mut [f32]) {
            out.fill(0.0);
            self.clock += out.len() as u64;
        }
    }

    #[test]
    fn ceiling_never_exceeded() {
        let mut backend = MockBackend::new();
        let mut pool = VoicePool::new();

        for _ in 0..4 {
            pool.trigger(&mut backend, "string-3", 1.0).unwrap();
        }

        assert_eq!(pool.active_count("string-3"), 3);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn fourth_trigger_evicts_oldest_with_gentle_fade() {
        let mut backend = MockBackend::new();
        let mut pool = VoicePool::new();

        let first = pool.trigger(&mut backend, "s", 1.0).unwrap();
        let first_handle = pool.entry(first).unwrap().handle;
        pool.trigger(&mut backend, "s", 1.0).unwrap();
        pool.trigger(&mut backend, "s", 1.0).unwrap();
        pool.trigger(&mut backend, "s", 1.0).unwrap();

        assert_eq!(backend.releases, vec![(first_handle, EVICT_FADE_SECS)]);
        assert!(pool.entry(first).is_none(), "evicted entry must leave the pool");
    }

    #[test]
    fn keys_have_independent_ceilings() {
        let mut backend = MockBackend::new();
        let mut pool = VoicePool::new();

        for _ in 0..3 {
            pool.trigger(&mut backend, "a", 1.0).unwrap();
            pool.trigger(&mut backend, "b", 1.5).unwrap();
        }

        assert_eq!(pool.active_count("a"), 3);
        assert_eq!(pool.active_count("b"), 3);
        assert!(backend.releases.is_empty());
    }

    #[test]
    fn release_stops_newest_instance() {
        let mut backend = MockBackend::new();
        let mut pool = VoicePool::new();

        let first = pool.trigger(&mut backend, "s", 1.0).unwrap();
        let second = pool.trigger(&mut backend, "s", 1.0).unwrap();
        let second_handle = pool.entry(second).unwrap().handle;

        assert!(pool.release(&mut backend, "s"));

        assert_eq!(backend.releases, vec![(second_handle, RELEASE_FADE_SECS)]);
        assert_eq!(pool.active_count("s"), 1);
        assert!(pool.entry(first).is_some());
        assert!(pool.entry(second).is_none());
    }

    #[test]
    fn release_unknown_key_is_a_noop() {
        let mut backend = MockBackend::new();
        let mut pool = VoicePool::new();

        assert!(!pool.release(&mut backend, "nothing"));
        assert!(backend.releases.is_empty());
    }

    #[test]
    fn release_all_stops_backend_and_clears() {
        let mut backend = MockBackend::new();
        let mut pool = VoicePool::new();

        pool.trigger(&mut backend, "a", 1.0).unwrap();
        pool.trigger(&mut backend, "b", 2.0).unwrap();

        pool.release_all(&mut backend);

        assert_eq!(backend.stop_all_calls, 1);
        assert!(pool.is_empty());
        assert_eq!(pool.active_count("a"), 0);
    }

    #[test]
    fn no_completions_fire_after_panic() {
        let mut backend = MockBackend::new();
        let mut pool = VoicePool::new();

        let id = pool.trigger(&mut backend, "s", 1.0).unwrap();
        let handle = pool.entry(id).unwrap().handle;
        backend.finish(handle);

        pool.release_all(&mut backend);

        // The panic cleared the pending queue; nothing resurfaces.
        pool.remove_finished(&mut backend);
        assert!(pool.is_empty());
        assert!(backend.drain_finished().is_empty());
    }

    #[test]
    fn natural_end_removes_entry_on_next_control_call() {
        let mut backend = MockBackend::new();
        let mut pool = VoicePool::new();

        let id = pool.trigger(&mut backend, "s", 1.0).unwrap();
        let handle = pool.entry(id).unwrap().handle;
        backend.finish(handle);

        // The next control operation consumes the notification, so the
        // finished voice no longer counts against the ceiling.
        pool.trigger(&mut backend, "s", 1.0).unwrap();
        assert_eq!(pool.active_count("s"), 1);
        assert!(pool.entry(id).is_none());
    }

    #[test]
    fn stale_completion_for_released_voice_is_ignored() {
        let mut backend = MockBackend::new();
        let mut pool = VoicePool::new();

        let id = pool.trigger(&mut backend, "s", 1.0).unwrap();
        let handle = pool.entry(id).unwrap().handle;
        pool.release(&mut backend, "s");

        // The fade finishes later and the backend reports it; the pool
        // already dropped the entry.
        backend.finish(handle);
        pool.remove_finished(&mut backend);
        assert!(pool.is_empty());
    }

    #[test]
    fn eviction_prefers_trigger_order_not_handle_order() {
        let mut backend = MockBackend::new();
        let mut pool = VoicePool::new();

        let ids: Vec<VoiceId> = (0..3)
            .map(|_| pool.trigger(&mut backend, "s", 1.0).unwrap())
            .collect();

        // Kill the middle voice naturally, then refill to the ceiling.
        let middle_handle = pool.entry(ids[1]).unwrap().handle;
        backend.finish(middle_handle);
        pool.trigger(&mut backend, "s", 1.0).unwrap();

        // Next steal takes the oldest surviving voice: the very first.
        let first_handle = pool.entry(ids[0]).unwrap().handle;
        pool.trigger(&mut backend, "s", 1.0).unwrap();
        assert_eq!(backend.releases.last().unwrap().0, first_handle);
    }

    #[test]
    fn voice_ids_are_unique_and_ordered() {
        let mut backend = MockBackend::new();
        let mut pool = VoicePool::new();

        let a = pool.trigger(&mut backend, "x", 1.0).unwrap();
        let b = pool.trigger(&mut backend, "y", 1.0).unwrap();
        let c = pool.trigger(&mut backend, "x", 1.0).unwrap();

        assert!(a < b && b < c);
    }
}

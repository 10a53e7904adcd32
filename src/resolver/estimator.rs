// Size estimation cache - memoized dry-run size queries
//
// Keys are (normalized link, output kind, quality label). Read-check-then-
// mark is atomic per key under one mutex, so only a single estimation can
// be in flight for a key; rapid toggling back to the same selection
// attaches to the outstanding query instead of issuing another one. The
// whole map is flushed when metadata is replaced: estimates are conditioned
// on the link's format set, nothing else.

use std::collections::HashMap;
use std::sync::Mutex;

use super::models::{OutputKind, QualityTier, SizeEstimate};
use super::utils::format_size;

pub const ESTIMATING_TEXT: &str = "Estimating size...";
pub const SIZE_UNKNOWN_TEXT: &str = "Size: Unknown (detailed info unavailable)";
pub const SIZE_FAILED_TEXT: &str = "Size: Unknown (estimation failed)";

/// Exact-match cache key for one estimate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SizeKey {
    pub link: String,
    pub kind: OutputKind,
    pub quality: &'static str,
}

impl SizeKey {
    pub fn new(link: String, kind: OutputKind, tier: QualityTier) -> Self {
        Self {
            link,
            kind,
            quality: tier.label,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    /// A worker owns this key and will complete or abandon it.
    InFlight,
    Ready(SizeEstimate),
}

/// What a caller should do after asking for an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    /// Cached value, no background work needed.
    Hit(SizeEstimate),
    /// Someone else is already computing this key; wait for their publish.
    AlreadyInFlight,
    /// The caller now owns the key and must spawn the query.
    Started,
}

pub struct SizeCache {
    slots: Mutex<HashMap<SizeKey, Slot>>,
}

impl SizeCache {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Atomic lookup-or-claim for `key`.
    pub fn begin(&self, key: &SizeKey) -> BeginOutcome {
        let mut slots = self.slots.lock().unwrap();
        match slots.get(key) {
            Some(Slot::Ready(estimate)) => BeginOutcome::Hit(*estimate),
            Some(Slot::InFlight) => BeginOutcome::AlreadyInFlight,
            None => {
                slots.insert(key.clone(), Slot::InFlight);
                BeginOutcome::Started
            }
        }
    }

    /// Publish a finished estimate. Only the in-flight marker is ever
    /// overwritten; a key flushed while the query ran is left absent, and a
    /// ready value is never replaced. Returns whether the value landed.
    pub fn complete(&self, key: &SizeKey, estimate: SizeEstimate) -> bool {
        let mut slots = self.slots.lock().unwrap();
        match slots.get(key) {
            Some(Slot::InFlight) => {
                slots.insert(key.clone(), Slot::Ready(estimate));
                true
            }
            _ => false,
        }
    }

    /// Release an in-flight marker without a value (failed or stale query).
    pub fn abandon(&self, key: &SizeKey) {
        let mut slots = self.slots.lock().unwrap();
        if let Some(Slot::InFlight) = slots.get(key) {
            slots.remove(key);
        }
    }

    pub fn lookup(&self, key: &SizeKey) -> Option<SizeEstimate> {
        match self.slots.lock().unwrap().get(key) {
            Some(Slot::Ready(estimate)) => Some(*estimate),
            _ => None,
        }
    }

    /// Drop everything, in-flight markers included. Workers whose marker
    /// vanished find `complete` returning false and discard their result.
    pub fn flush(&self) {
        self.slots.lock().unwrap().clear();
    }
}

impl Default for SizeCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Combine per-part sizes into one estimate. A part with no reported size
/// contributes zero and flags the total as rough rather than failing the
/// estimate outright.
pub fn sum_parts(parts: &[Option<u64>]) -> SizeEstimate {
    let mut total: u64 = 0;
    let mut rough = parts.is_empty();
    for part in parts {
        match part {
            Some(bytes) => total += bytes,
            None => rough = true,
        }
    }
    SizeEstimate {
        total_bytes: total,
        rough,
    }
}

/// Size line shown for a finished estimate.
pub fn display_text(estimate: &SizeEstimate) -> String {
    if !estimate.rough {
        format!("Est. size: {}", format_size(estimate.total_bytes))
    } else if estimate.total_bytes > 0 {
        format!("Rough est: ~{} (partial data)", format_size(estimate.total_bytes))
    } else {
        SIZE_UNKNOWN_TEXT.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AUDIO_TIERS;

    fn key() -> SizeKey {
        SizeKey::new(
            "https://youtu.be/abc".to_string(),
            OutputKind::Audio,
            AUDIO_TIERS[1],
        )
    }

    #[test]
    fn test_begin_claims_then_coalesces() {
        let cache = SizeCache::new();
        assert_eq!(cache.begin(&key()), BeginOutcome::Started);
        assert_eq!(cache.begin(&key()), BeginOutcome::AlreadyInFlight);
    }

    #[test]
    fn test_complete_makes_hits_and_is_write_once() {
        let cache = SizeCache::new();
        let est = SizeEstimate { total_bytes: 1000, rough: false };
        assert_eq!(cache.begin(&key()), BeginOutcome::Started);
        assert!(cache.complete(&key(), est));

        assert_eq!(cache.begin(&key()), BeginOutcome::Hit(est));
        // A second write for the same key does not land.
        let other = SizeEstimate { total_bytes: 2, rough: true };
        assert!(!cache.complete(&key(), other));
        assert_eq!(cache.lookup(&key()), Some(est));
    }

    #[test]
    fn test_flush_discards_in_flight_results() {
        let cache = SizeCache::new();
        assert_eq!(cache.begin(&key()), BeginOutcome::Started);
        cache.flush();
        // Worker finishing after the flush must not resurrect the key.
        let est = SizeEstimate { total_bytes: 1000, rough: false };
        assert!(!cache.complete(&key(), est));
        assert_eq!(cache.lookup(&key()), None);
    }

    #[test]
    fn test_abandon_releases_the_key() {
        let cache = SizeCache::new();
        assert_eq!(cache.begin(&key()), BeginOutcome::Started);
        cache.abandon(&key());
        assert_eq!(cache.begin(&key()), BeginOutcome::Started);
    }

    #[test]
    fn test_sum_parts_marks_missing_sizes_rough() {
        let exact = sum_parts(&[Some(1000), Some(500)]);
        assert_eq!(exact, SizeEstimate { total_bytes: 1500, rough: false });

        let partial = sum_parts(&[Some(1000), None]);
        assert_eq!(partial, SizeEstimate { total_bytes: 1000, rough: true });

        let empty = sum_parts(&[]);
        assert!(empty.rough);
        assert_eq!(empty.total_bytes, 0);
    }

    #[test]
    fn test_display_text_variants() {
        let exact = SizeEstimate { total_bytes: 5 * 1024 * 1024, rough: false };
        assert_eq!(display_text(&exact), "Est. size: 5.00 MB");

        let partial = SizeEstimate { total_bytes: 5 * 1024 * 1024, rough: true };
        assert_eq!(display_text(&partial), "Rough est: ~5.00 MB (partial data)");

        let unknown = SizeEstimate { total_bytes: 0, rough: true };
        assert_eq!(display_text(&unknown), SIZE_UNKNOWN_TEXT);
    }
}

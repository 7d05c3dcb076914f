use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Binding and identity-cache counters.
///
/// Counters are independent, so `Ordering::Relaxed` is enough.
#[derive(Debug, Default)]
pub struct BindingMetrics {
    types_bound: AtomicU64,
    members_generated: AtomicU64,
    lazy_members_resolved: AtomicU64,
    overload_resolutions: AtomicU64,
    overload_failures: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_releases: AtomicU64,
}

impl BindingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_type_bound(&self) {
        self.types_bound.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_member_generated(&self) {
        self.members_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lazy_resolution(&self) {
        self.lazy_members_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overload_resolution(&self, matched: bool) {
        self.overload_resolutions.fetch_add(1, Ordering::Relaxed);
        if !matched {
            self.overload_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_release(&self) {
        self.cache_releases.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BindingStats {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        BindingStats {
            types_bound: self.types_bound.load(Ordering::Relaxed),
            members_generated: self.members_generated.load(Ordering::Relaxed),
            lazy_members_resolved: self.lazy_members_resolved.load(Ordering::Relaxed),
            overload_resolutions: self.overload_resolutions.load(Ordering::Relaxed),
            overload_failures: self.overload_failures.load(Ordering::Relaxed),
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            cache_releases: self.cache_releases.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct BindingStats {
    pub types_bound: u64,
    pub members_generated: u64,
    pub lazy_members_resolved: u64,
    pub overload_resolutions: u64,
    pub overload_failures: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub cache_releases: u64,
}

impl std::fmt::Display for BindingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Binding Statistics:")?;
        writeln!(f, "  Types bound:            {:>8}", self.types_bound)?;
        writeln!(f, "  Members generated:      {:>8}", self.members_generated)?;
        writeln!(f, "  Lazy members resolved:  {:>8}", self.lazy_members_resolved)?;
        writeln!(
            f,
            "  Overload resolutions:   {:>8} ({} failed)",
            self.overload_resolutions, self.overload_failures
        )?;
        writeln!(
            f,
            "  Identity cache:         hits: {:>8}, misses: {:>8}, hit_rate: {:>6.2}%, released: {:>8}",
            self.cache_hits,
            self.cache_misses,
            self.cache_hit_rate * 100.0,
            self.cache_releases
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_hit_rate() {
        let m = BindingMetrics::new();
        m.record_cache_miss();
        m.record_cache_hit();
        m.record_cache_hit();
        m.record_cache_hit();
        let s = m.snapshot();
        assert_eq!(s.cache_hits, 3);
        assert_eq!(s.cache_hit_rate, 0.75);
    }

    #[test]
    fn test_overload_failures_count_as_resolutions() {
        let m = BindingMetrics::new();
        m.record_overload_resolution(true);
        m.record_overload_resolution(false);
        let s = m.snapshot();
        assert_eq!((s.overload_resolutions, s.overload_failures), (2, 1));
        assert!(s.to_string().contains("Overload resolutions"));
    }
}

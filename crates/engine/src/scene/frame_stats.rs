use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::warn;

use super::render_list::Bucket;
use crate::world::ObjectHandle;

pub const BUILD_WINDOW_LEN: usize = 120;

/// Counters for one built frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub tiles_visited: usize,
    pub objects_considered: usize,
    /// Entries per bucket, in [`Bucket::DRAW_ORDER`].
    pub buckets: [usize; 6],
    pub lights: usize,
    pub lights_dropped: usize,
    pub picked: Option<ObjectHandle>,
    pub build: RollingMsStats,
}

impl FrameStats {
    pub fn bucket(&self, bucket: Bucket) -> usize {
        self.buckets[bucket.index()]
    }

    pub fn pushed(&self) -> usize {
        self.buckets.iter().sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RollingMsStats {
    pub last_ms: f32,
    pub avg_ms: f32,
    pub max_ms: f32,
}

/// Read side of the stats the renderer publishes after every frame. Clones
/// share one snapshot. A poisoned lock is read through, and reported once
/// for all clones.
#[derive(Clone, Debug, Default)]
pub struct FrameStatsHandle {
    shared: Arc<PublishedStats>,
}

#[derive(Debug, Default)]
struct PublishedStats {
    latest: RwLock<FrameStats>,
    poison_reported: AtomicBool,
}

impl PublishedStats {
    fn report_poison(&self, operation: &'static str) {
        if !self.poison_reported.swap(true, Ordering::Relaxed) {
            warn!(operation, "frame_stats_lock_poisoned");
        }
    }
}

impl FrameStatsHandle {
    pub fn latest(&self) -> FrameStats {
        self.read(|stats| *stats)
    }

    pub fn bucket_counts(&self) -> [(Bucket, usize); 6] {
        self.read(|stats| Bucket::DRAW_ORDER.map(|bucket| (bucket, stats.bucket(bucket))))
    }

    pub fn build_timing(&self) -> RollingMsStats {
        self.read(|stats| stats.build)
    }

    fn read<T>(&self, view: impl FnOnce(&FrameStats) -> T) -> T {
        let guard = self.shared.latest.read().unwrap_or_else(|poisoned| {
            self.shared.report_poison("read");
            poisoned.into_inner()
        });
        view(&guard)
    }

    pub(crate) fn publish(&self, stats: FrameStats) {
        let mut guard = self.shared.latest.write().unwrap_or_else(|poisoned| {
            self.shared.report_poison("publish");
            poisoned.into_inner()
        });
        *guard = stats;
    }
}

/// Last/average/max over the most recent [`BUILD_WINDOW_LEN`] samples.
#[derive(Debug)]
pub(crate) struct RollingWindowMs {
    samples_ms: [f32; BUILD_WINDOW_LEN],
    head: usize,
    count: usize,
    sum_ms: f32,
    last_ms: f32,
}

impl Default for RollingWindowMs {
    fn default() -> Self {
        Self {
            samples_ms: [0.0; BUILD_WINDOW_LEN],
            head: 0,
            count: 0,
            sum_ms: 0.0,
            last_ms: 0.0,
        }
    }
}

impl RollingWindowMs {
    pub(crate) fn push(&mut self, duration: Duration) {
        let value_ms = duration.as_secs_f32() * 1000.0;
        self.last_ms = value_ms;

        let evicted = if self.count < BUILD_WINDOW_LEN {
            self.count += 1;
            0.0
        } else {
            self.samples_ms[self.head]
        };
        self.samples_ms[self.head] = value_ms;
        self.head = (self.head + 1) % BUILD_WINDOW_LEN;
        self.sum_ms += value_ms - evicted;
    }

    pub(crate) fn snapshot(&self) -> RollingMsStats {
        if self.count == 0 {
            return RollingMsStats::default();
        }
        let max_ms = self.samples_ms[..self.count]
            .iter()
            .copied()
            .fold(f32::MIN, f32::max);

        RollingMsStats {
            last_ms: self.last_ms,
            avg_ms: self.sum_ms / self.count as f32,
            max_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn empty_window_is_zeroed() {
        let window = RollingWindowMs::default();
        assert_eq!(window.snapshot(), RollingMsStats::default());
    }

    #[test]
    fn partial_window_average_uses_sample_count() {
        let mut window = RollingWindowMs::default();
        window.push(ms(1));
        window.push(ms(2));
        window.push(ms(3));
        let stats = window.snapshot();

        assert!((stats.last_ms - 3.0).abs() < 0.001);
        assert!((stats.avg_ms - 2.0).abs() < 0.001);
        assert!((stats.max_ms - 3.0).abs() < 0.001);
    }

    #[test]
    fn evicting_the_max_recomputes_it() {
        let mut window = RollingWindowMs::default();
        window.push(ms(100));
        for _ in 1..BUILD_WINDOW_LEN {
            window.push(ms(10));
        }
        window.push(ms(20));
        let stats = window.snapshot();

        assert!((stats.max_ms - 20.0).abs() < 0.001);
        let expected_avg = ((BUILD_WINDOW_LEN as f32 - 1.0) * 10.0 + 20.0) / BUILD_WINDOW_LEN as f32;
        assert!((stats.avg_ms - expected_avg).abs() < 0.01);
    }

    #[test]
    fn bucket_lookup_follows_draw_order() {
        let stats = FrameStats {
            buckets: [4, 0, 3, 0, 1, 2],
            ..FrameStats::default()
        };
        assert_eq!(stats.bucket(Bucket::TerrainFlat), 4);
        assert_eq!(stats.bucket(Bucket::Statics), 3);
        assert_eq!(stats.bucket(Bucket::Effects), 1);
        assert_eq!(stats.bucket(Bucket::Transparent), 2);
        assert_eq!(stats.pushed(), 10);
    }

    #[test]
    fn clones_see_published_bucket_counts() {
        let handle = FrameStatsHandle::default();
        let reader = handle.clone();
        handle.publish(FrameStats {
            buckets: [1, 2, 3, 4, 5, 6],
            ..FrameStats::default()
        });

        let counts = reader.bucket_counts();
        assert_eq!(counts[0], (Bucket::TerrainFlat, 1));
        assert_eq!(counts[5], (Bucket::Transparent, 6));
        assert_eq!(reader.latest().pushed(), 21);
    }

    #[test]
    fn poisoned_lock_is_read_through_and_reported_once() {
        let handle = FrameStatsHandle::default();
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = handle.shared.latest.write().expect("write guard");
                    panic!("poison frame stats lock");
                })
                .join();
        });

        assert_eq!(handle.latest(), FrameStats::default());
        assert!(handle.shared.poison_reported.load(Ordering::Relaxed));

        handle.publish(FrameStats {
            tiles_visited: 12,
            ..FrameStats::default()
        });
        assert_eq!(handle.latest().tiles_visited, 12);
    }
}

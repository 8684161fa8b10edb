use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub(crate) struct TopicMetrics {
    published: AtomicU64,
    delivered: AtomicU64,
    unrouted: AtomicU64,
}

impl TopicMetrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, delivered: usize) {
        self.published.fetch_add(1, Ordering::Relaxed);
        if delivered == 0 {
            self.unrouted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.delivered
                .fetch_add(delivered as u64, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self) -> TopicMetricsSnapshot {
        TopicMetricsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            unrouted: self.unrouted.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counters for a single topic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TopicMetricsSnapshot {
    /// Messages published on the topic.
    pub published: u64,
    /// Callback invocations across all subscribers.
    pub delivered: u64,
    /// Messages published while nobody was subscribed.
    pub unrouted: u64,
}

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{TransportError, TransportResult};
use crate::metrics::{TopicMetrics, TopicMetricsSnapshot};

type Callback<M> = Arc<dyn Fn(&M) + Send + Sync>;

struct Subscriber<M> {
    id: u64,
    callback: Callback<M>,
}

struct Topic<M> {
    subscribers: Vec<Subscriber<M>>,
    metrics: Arc<TopicMetrics>,
}

impl<M> Topic<M> {
    fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            metrics: Arc::new(TopicMetrics::new()),
        }
    }
}

struct BusInner<M> {
    topics: Mutex<HashMap<String, Topic<M>>>,
    next_subscriber: AtomicU64,
    closed: AtomicBool,
}

impl<M> BusInner<M> {
    fn deliver(&self, topic: &str, msg: &M) -> TransportResult<usize> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed(topic.to_owned()));
        }

        // Copy the callbacks out so subscribers run without the table lock.
        let (callbacks, metrics) = {
            let mut topics = self.topics.lock();
            let entry = topics.entry(topic.to_owned()).or_insert_with(Topic::new);
            let callbacks: Vec<Callback<M>> = entry
                .subscribers
                .iter()
                .map(|sub| Arc::clone(&sub.callback))
                .collect();
            (callbacks, Arc::clone(&entry.metrics))
        };

        for callback in &callbacks {
            callback(msg);
        }
        metrics.record(callbacks.len());
        tracing::trace!(topic, delivered = callbacks.len(), "published");
        Ok(callbacks.len())
    }
}

trait Detach: Send + Sync {
    fn detach(&self, topic: &str, id: u64);
}

impl<M> Detach for BusInner<M> {
    fn detach(&self, topic: &str, id: u64) {
        let mut topics = self.topics.lock();
        if let Some(entry) = topics.get_mut(topic) {
            entry.subscribers.retain(|sub| sub.id != id);
            tracing::debug!(topic, id, "unsubscribed");
        }
    }
}

/// Topic-addressed message bus shared by every endpoint in the process.
pub struct Bus<M> {
    inner: Arc<BusInner<M>>,
}

impl<M> Clone for Bus<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: 'static> Default for Bus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: 'static> Bus<M> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                topics: Mutex::new(HashMap::new()),
                next_subscriber: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Registers `callback` for every message published on `topic`.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped or explicitly retired.
    pub fn subscribe<F>(&self, topic: &str, callback: F) -> TransportResult<Subscription>
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        if topic.is_empty() {
            return Err(TransportError::EmptyTopic);
        }
        if self.is_closed() {
            return Err(TransportError::Closed(topic.to_owned()));
        }

        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.inner
            .topics
            .lock()
            .entry(topic.to_owned())
            .or_insert_with(Topic::new)
            .subscribers
            .push(Subscriber {
                id,
                callback: Arc::new(callback),
            });
        tracing::debug!(topic, id, "subscribed");

        let inner: Weak<BusInner<M>> = Arc::downgrade(&self.inner);
        let bus: Weak<dyn Detach> = inner;
        Ok(Subscription {
            topic: topic.to_owned(),
            id,
            bus: Some(bus),
        })
    }

    /// Returns a publisher bound to `topic`.
    pub fn advertise(&self, topic: &str) -> TransportResult<Publisher<M>> {
        if topic.is_empty() {
            return Err(TransportError::EmptyTopic);
        }
        self.inner
            .topics
            .lock()
            .entry(topic.to_owned())
            .or_insert_with(Topic::new);
        Ok(Publisher {
            topic: topic.to_owned(),
            bus: Arc::clone(&self.inner),
        })
    }

    /// Publishes `msg` on `topic`, returning how many subscribers saw it.
    pub fn publish(&self, topic: &str, msg: &M) -> TransportResult<usize> {
        if topic.is_empty() {
            return Err(TransportError::EmptyTopic);
        }
        self.inner.deliver(topic, msg)
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .topics
            .lock()
            .get(topic)
            .map_or(0, |entry| entry.subscribers.len())
    }

    pub fn metrics(&self, topic: &str) -> Option<TopicMetricsSnapshot> {
        self.inner
            .topics
            .lock()
            .get(topic)
            .map(|entry| entry.metrics.snapshot())
    }

    /// Stops all delivery and drops every registered callback.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        let mut topics = self.inner.topics.lock();
        for entry in topics.values_mut() {
            entry.subscribers.clear();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

/// Sending side bound to a single topic.
pub struct Publisher<M> {
    topic: String,
    bus: Arc<BusInner<M>>,
}

impl<M> Clone for Publisher<M> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic.clone(),
            bus: Arc::clone(&self.bus),
        }
    }
}

impl<M> Publisher<M> {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn publish(&self, msg: &M) -> TransportResult<usize> {
        self.bus.deliver(&self.topic, msg)
    }
}

impl<M> fmt::Debug for Publisher<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("topic", &self.topic)
            .finish()
    }
}

/// Handle that keeps a callback registered. Dropping it unsubscribes.
pub struct Subscription {
    topic: String,
    id: u64,
    bus: Option<Weak<dyn Detach>>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns `false` once the subscription was retired or its bus dropped.
    pub fn is_active(&self) -> bool {
        self.bus
            .as_ref()
            .is_some_and(|bus| bus.strong_count() > 0)
    }

    /// Unregisters the callback. A callback already running finishes normally.
    pub fn unsubscribe(mut self) {
        self.retire();
    }

    fn retire(&mut self) {
        if let Some(bus) = self.bus.take().and_then(|weak| weak.upgrade()) {
            bus.detach(&self.topic, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.retire();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

//! Bounded, fire-and-forget analytics recording.
//!
//! Every answer-producing handler builds a `SearchEvent` and calls
//! [`Recorder::enqueue`] just before returning its response. The call is a
//! synchronous push onto an in-process ring buffer, never an await, so it
//! stays well under the 50ms budget; a single background task drains the
//! buffer into `EventStore::record`. If the buffer is already at capacity
//! the oldest queued event is evicted to make room for the new one and
//! `analytics_dropped_total` increments, so a slow database degrades
//! analytics fidelity rather than response latency.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tsa_core::domain::SearchEvent;
use tsa_store::EventStore;

const BUFFER_CAPACITY: usize = 1024;

struct Buffer {
    queue: Mutex<VecDeque<SearchEvent>>,
    notify: Notify,
}

pub struct Recorder {
    buffer: Arc<Buffer>,
}

impl Recorder {
    /// Spawns the drain task and returns the handle used to enqueue events.
    /// The drain task runs for the lifetime of the process, parked on
    /// `Notify` between batches.
    pub fn spawn(events: Arc<EventStore>) -> Self {
        let buffer = Arc::new(Buffer { queue: Mutex::new(VecDeque::with_capacity(BUFFER_CAPACITY)), notify: Notify::new() });

        let drain_buffer = Arc::clone(&buffer);
        tokio::spawn(async move {
            loop {
                drain_buffer.notify.notified().await;
                loop {
                    let next = drain_buffer.queue.lock().expect("analytics buffer poisoned").pop_front();
                    let Some(event) = next else { break };
                    if let Err(err) = events.record(&event).await {
                        tracing::warn!(error = %err, "failed to persist search event");
                    }
                }
            }
        });

        Self { buffer }
    }

    /// Enqueues `event`, evicting the oldest queued event on overflow.
    pub fn enqueue(&self, event: SearchEvent) {
        {
            let mut queue = self.buffer.queue.lock().expect("analytics buffer poisoned");
            if queue.len() >= BUFFER_CAPACITY {
                queue.pop_front();
                metrics::counter!("analytics_dropped_total").increment(1);
                tracing::debug!("analytics buffer full, dropping oldest event");
            }
            queue.push_back(event);
        }
        self.buffer.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tsa_core::domain::SearchMethod;

    fn sample_event() -> SearchEvent {
        SearchEvent {
            ts: Utc::now(),
            query: "how do I reset the gateway".into(),
            method: SearchMethod::Hybrid,
            classification: "troubleshooting".into(),
            strategy: "hybrid".into(),
            rag_confidence: Some(0.8),
            final_confidence: 0.8,
            latency_ms: 120,
            chunk_count: 3,
            web_count: 0,
            fused_count: 3,
            model: "llama3".into(),
            error: None,
        }
    }

    #[test]
    fn overflow_drops_the_oldest_entry() {
        let buffer = Buffer { queue: Mutex::new(VecDeque::with_capacity(BUFFER_CAPACITY)), notify: Notify::new() };
        let recorder = Recorder { buffer: Arc::new(buffer) };

        for i in 0..(BUFFER_CAPACITY + 1) {
            let mut event = sample_event();
            event.chunk_count = i as i32;
            recorder.enqueue(event);
        }

        let queue = recorder.buffer.queue.lock().unwrap();
        assert_eq!(queue.len(), BUFFER_CAPACITY);
        // The first enqueued event (chunk_count == 0) should have been
        // evicted in favor of the newest BUFFER_CAPACITY events.
        assert_eq!(queue.front().unwrap().chunk_count, 1);
    }
}

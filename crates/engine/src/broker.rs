// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process pub-sub fan-out from the engine to log-stream subscribers.
//!
//! Each subscriber owns a bounded queue drained by exactly one consumer
//! task (the SSE handler for that connection). The producer side buffers
//! under a mutex and wakes the consumer through a depth-1 channel, so
//! publishing never blocks and no lock is held across I/O.

use crate::metrics::MetricsAccumulator;
use crawld_core::{
    ArchiveNotice, ExecutionId, JobId, JobMetadata, LogRecord, SlowSubscriberPolicy, SubscriberId,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

/// Events delivered to subscribers, in the order contracted in the stream
/// protocol: `connected` → `metadata` → optional `replay` → `line`s →
/// optional `truncated` → optional `archived`.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Connected {
        job_id: JobId,
        execution_id: ExecutionId,
    },
    Metadata(Arc<JobMetadata>),
    Replay {
        lines: Vec<Arc<LogRecord>>,
    },
    Line {
        /// Ring insertion sequence; used to de-duplicate against replay.
        seq: u64,
        record: Arc<LogRecord>,
    },
    Truncated {
        job_id: JobId,
        execution_id: ExecutionId,
        limit: u64,
    },
    Archived(ArchiveNotice),
}

/// Subscriber-supplied event predicate.
pub type EventFilter = Arc<dyn Fn(&StreamEvent) -> bool + Send + Sync>;

/// Per-subscriber configuration.
#[derive(Clone)]
pub struct SubscriberOptions {
    pub filter: Option<EventFilter>,
    pub channel_depth: usize,
    pub policy: SlowSubscriberPolicy,
}

impl Default for SubscriberOptions {
    fn default() -> Self {
        Self {
            filter: None,
            channel_depth: 64,
            policy: SlowSubscriberPolicy::Disconnect,
        }
    }
}

enum PushOutcome {
    Queued,
    DroppedOldest,
    Full,
}

struct QueueState {
    events: VecDeque<StreamEvent>,
    closed: bool,
}

/// Bounded event queue shared between the broker (writer) and one
/// consumer task (reader).
struct SharedQueue {
    state: Mutex<QueueState>,
    wake_tx: mpsc::Sender<()>,
    capacity: usize,
}

impl SharedQueue {
    fn new(capacity: usize, wake_tx: mpsc::Sender<()>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                events: VecDeque::new(),
                closed: false,
            }),
            wake_tx,
            capacity,
        }
    }

    fn push(&self, event: StreamEvent, policy: SlowSubscriberPolicy) -> PushOutcome {
        let outcome = {
            let mut state = self.state.lock();
            if state.closed {
                // Pending sends to a cancelled subscriber are no-ops.
                return PushOutcome::Queued;
            }
            if state.events.len() >= self.capacity {
                match policy {
                    SlowSubscriberPolicy::DropOldest => {
                        state.events.pop_front();
                        state.events.push_back(event);
                        PushOutcome::DroppedOldest
                    }
                    SlowSubscriberPolicy::Disconnect => return PushOutcome::Full,
                }
            } else {
                state.events.push_back(event);
                PushOutcome::Queued
            }
        };
        self.wake();
        outcome
    }

    /// Seed the handshake events, bypassing the capacity bound so the
    /// intro always fits regardless of configured depth.
    fn seed(&self, events: Vec<StreamEvent>) {
        {
            let mut state = self.state.lock();
            state.events.extend(events);
        }
        self.wake();
    }

    fn close(&self) {
        self.state.lock().closed = true;
        self.wake();
    }

    fn wake(&self) {
        // Non-blocking: if a wake is already pending the consumer will
        // drain everything on its next pass anyway.
        let _ = self.wake_tx.try_send(());
    }
}

struct SubscriberSlot {
    id: SubscriberId,
    queue: Arc<SharedQueue>,
    filter: Option<EventFilter>,
    policy: SlowSubscriberPolicy,
    /// Replay high-water mark: live lines with seq ≤ this are dropped.
    after_seq: u64,
}

struct BrokerState {
    slots: Vec<SubscriberSlot>,
    closed: bool,
}

struct BrokerShared {
    state: Mutex<BrokerState>,
    metrics: Arc<MetricsAccumulator>,
}

impl BrokerShared {
    fn remove(&self, id: &SubscriberId) {
        let slot = {
            let mut state = self.state.lock();
            state
                .slots
                .iter()
                .position(|s| &s.id == id)
                .map(|pos| state.slots.remove(pos))
        };
        if let Some(slot) = slot {
            slot.queue.close();
        }
    }
}

/// Multiplexes engine events to N subscribers.
#[derive(Clone)]
pub struct Broker {
    shared: Arc<BrokerShared>,
}

impl Broker {
    pub fn new(metrics: Arc<MetricsAccumulator>) -> Self {
        Self {
            shared: Arc::new(BrokerShared {
                state: Mutex::new(BrokerState {
                    slots: Vec::new(),
                    closed: false,
                }),
                metrics,
            }),
        }
    }

    /// Register a subscriber, seeding its queue with the handshake events.
    ///
    /// `after_seq` is the replay high-water mark. On a closed broker the
    /// subscription is returned pre-closed: the intro is still delivered,
    /// then the stream ends.
    pub fn subscribe(
        &self,
        options: SubscriberOptions,
        after_seq: u64,
        intro: Vec<StreamEvent>,
    ) -> Subscription {
        let id = SubscriberId::random();
        let (wake_tx, wake_rx) = mpsc::channel(1);
        // The handshake rides on top of the configured depth, so a tiny
        // depth still admits connected/metadata/replay.
        let capacity = options.channel_depth.max(1) + intro.len();
        let queue = Arc::new(SharedQueue::new(capacity, wake_tx));
        queue.seed(intro);

        let mut state = self.shared.state.lock();
        if state.closed {
            queue.close();
        } else {
            state.slots.push(SubscriberSlot {
                id: id.clone(),
                queue: Arc::clone(&queue),
                filter: options.filter,
                policy: options.policy,
                after_seq,
            });
        }
        drop(state);

        Subscription {
            id,
            queue,
            wake_rx,
            broker: Arc::downgrade(&self.shared),
        }
    }

    /// Fan one event out to every subscriber whose filter accepts it.
    ///
    /// Callers serialize publishes (the engine holds its emit lock), so
    /// every subscriber observes the same order.
    pub fn publish(&self, event: &StreamEvent) {
        let mut state = self.shared.state.lock();
        if state.closed {
            return;
        }

        let mut evicted: Vec<usize> = Vec::new();
        for (idx, slot) in state.slots.iter().enumerate() {
            if let Some(filter) = &slot.filter {
                if !filter(event) {
                    continue;
                }
            }
            if let StreamEvent::Line { seq, .. } = event {
                if *seq <= slot.after_seq {
                    continue;
                }
            }

            match slot.queue.push(event.clone(), slot.policy) {
                PushOutcome::Queued | PushOutcome::DroppedOldest => {}
                PushOutcome::Full => evicted.push(idx),
            }
        }

        // Evict slow subscribers, highest index first so positions hold.
        for idx in evicted.into_iter().rev() {
            let slot = state.slots.remove(idx);
            slot.queue.close();
            self.shared.metrics.inc_disconnected_slow();
            tracing::debug!(subscriber_id = %slot.id, "disconnected slow subscriber");
        }
    }

    /// Close every subscriber queue and stop accepting new events.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        state.closed = true;
        for slot in state.slots.drain(..) {
            slot.queue.close();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().slots.len()
    }
}

/// One subscriber's end of the stream. Dropping it cancels the
/// subscription; pending broker pushes become no-ops.
pub struct Subscription {
    id: SubscriberId,
    queue: Arc<SharedQueue>,
    wake_rx: mpsc::Receiver<()>,
    broker: Weak<BrokerShared>,
}

impl Subscription {
    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    /// Next event, or `None` once the queue is closed and drained.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        loop {
            {
                let mut state = self.queue.state.lock();
                if let Some(event) = state.events.pop_front() {
                    return Some(event);
                }
                if state.closed {
                    return None;
                }
            }

            if self.wake_rx.recv().await.is_none() {
                // Writer side gone; drain whatever is left.
                let mut state = self.queue.state.lock();
                return state.events.pop_front();
            }
        }
    }

    /// Remove this subscriber from the broker. Idempotent.
    pub fn cancel(&self) {
        if let Some(shared) = self.broker.upgrade() {
            shared.remove(&self.id);
        }
        self.queue.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;

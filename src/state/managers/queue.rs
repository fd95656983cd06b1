//! Admission queue.
//!
//! Serializes viewer admission in arrival order. Every enqueue takes the next
//! order number from a single counter (`last_distributed`); admission pops the
//! smallest waiting order and raises the in-service watermark to it. Removal
//! on disconnect leaves gaps in the waiting map, so the watermark is never
//! used as an index.
//!
//! Tickets are opaque bearer strings for clients to reference their own
//! position. They carry no ordering.

use crate::network::Session;
use crate::state::SessionId;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// A user's position in the queue.
#[derive(Debug)]
pub struct WaitState {
    pub ticket: String,
    pub order: i64,
    pub session_id: SessionId,
    session: Weak<Session>,
    pub enqueued_at: DateTime<Utc>,
}

impl WaitState {
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.upgrade()
    }
}

#[derive(Debug, Default)]
struct QueueState {
    waiting: BTreeMap<i64, Arc<WaitState>>,
    last_distributed: i64,
    last_in_service: i64,
}

/// Waiting map plus its two counters, behind one lock.
#[derive(Debug, Default)]
pub struct AdmissionQueue {
    state: RwLock<QueueState>,
}

/// Snapshot of the counters for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct QueueCounters {
    pub waiting: usize,
    pub last_distributed: i64,
    pub last_in_service: i64,
}

impl AdmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next order number and store a fresh wait state.
    pub fn enqueue(&self, session_id: &SessionId, session: Weak<Session>) -> Arc<WaitState> {
        let ticket = Uuid::new_v4().simple().to_string();
        let mut state = self.state.write();
        state.last_distributed += 1;
        let wait = Arc::new(WaitState {
            ticket,
            order: state.last_distributed,
            session_id: session_id.clone(),
            session,
            enqueued_at: Utc::now(),
        });
        state.waiting.insert(wait.order, Arc::clone(&wait));
        wait
    }

    /// Remove by order number.
    pub fn remove(&self, order: i64) -> Option<Arc<WaitState>> {
        self.state.write().waiting.remove(&order)
    }

    /// Pop the smallest waiting order and raise the watermark to it.
    pub fn pop_next(&self) -> Option<Arc<WaitState>> {
        let mut state = self.state.write();
        let (_, wait) = state.waiting.pop_first()?;
        state.last_in_service = state.last_in_service.max(wait.order);
        Some(wait)
    }

    /// Number of waiters with a smaller order.
    pub fn ahead_of(&self, order: i64) -> usize {
        self.state.read().waiting.range(..order).count()
    }

    pub fn last_in_service(&self) -> i64 {
        self.state.read().last_in_service
    }

    pub fn counters(&self) -> QueueCounters {
        let state = self.state.read();
        QueueCounters {
            waiting: state.waiting.len(),
            last_distributed: state.last_distributed,
            last_in_service: state.last_in_service,
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().waiting.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn enqueue(queue: &AdmissionQueue, id: &str) -> Arc<WaitState> {
        queue.enqueue(&id.to_string(), Weak::new())
    }

    #[test]
    fn orders_start_at_one_and_increase() {
        let queue = AdmissionQueue::new();
        assert_eq!(enqueue(&queue, "a").order, 1);
        assert_eq!(enqueue(&queue, "b").order, 2);
        assert_eq!(queue.counters().last_distributed, 2);
        assert_eq!(queue.last_in_service(), 0);
    }

    #[test]
    fn tickets_are_distinct_and_unordered() {
        let queue = AdmissionQueue::new();
        let a = enqueue(&queue, "a");
        let b = enqueue(&queue, "b");
        assert_ne!(a.ticket, b.ticket);
        assert_eq!(a.ticket.len(), 32);
    }

    #[test]
    fn gaps_do_not_stall_admission() {
        let queue = AdmissionQueue::new();
        for id in ["a", "b", "c", "d"] {
            enqueue(&queue, id);
        }
        queue.remove(2);
        queue.remove(3);

        assert_eq!(queue.pop_next().map(|w| w.order), Some(1));
        assert_eq!(queue.pop_next().map(|w| w.order), Some(4));
        assert_eq!(queue.last_in_service(), 4);
        assert!(queue.pop_next().is_none());
    }

    #[test]
    fn removal_never_reuses_orders() {
        let queue = AdmissionQueue::new();
        enqueue(&queue, "a");
        queue.remove(1);
        assert_eq!(enqueue(&queue, "b").order, 2);
    }

    #[test]
    fn ahead_of_counts_smaller_orders_only() {
        let queue = AdmissionQueue::new();
        for id in ["a", "b", "c"] {
            enqueue(&queue, id);
        }
        queue.remove(1);
        assert_eq!(queue.ahead_of(3), 1);
        assert_eq!(queue.ahead_of(2), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_enqueues_never_collide() {
        let queue = Arc::new(AdmissionQueue::new());
        let mut tasks = Vec::new();
        for i in 0..64 {
            let queue = Arc::clone(&queue);
            tasks.push(tokio::spawn(async move {
                queue.enqueue(&format!("s{i}"), Weak::new()).order
            }));
        }
        let mut orders = HashSet::new();
        for task in tasks {
            assert!(orders.insert(task.await.unwrap()));
        }
        assert_eq!(orders, (1..=64).collect());
        assert_eq!(queue.counters().waiting, 64);
    }
}

//! Bounded event queue with drain tracking.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use discrip_core::Event;
use tokio::sync::Notify;

/// Maximum number of decoded events buffered ahead of the consumer.
///
/// Pushing onto a full queue discards the oldest queued event. The command
/// history still holds every event, so only live consumers miss it.
pub const EVENT_QUEUE_CAPACITY: usize = 4096;

/// FIFO between the output reader and whoever consumes events.
///
/// `push` is synchronous and never waits, so it can also run from drop
/// paths. `changed` fires on every push and every pull; pullers wait on it
/// for new events and drain waiters wait on it for an empty queue.
pub(crate) struct EventQueue {
    events: Mutex<VecDeque<Event>>,
    capacity: usize,
    discarded: AtomicU64,
    changed: Notify,
}

impl EventQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(EVENT_QUEUE_CAPACITY))),
            capacity,
            discarded: AtomicU64::new(0),
            changed: Notify::new(),
        }
    }

    /// Append `event`, discarding the oldest one if the queue is full.
    pub(crate) fn push(&self, event: Event) {
        {
            let mut events = self.lock();
            if events.len() >= self.capacity {
                events.pop_front();
                self.discarded.fetch_add(1, Ordering::SeqCst);
            }
            events.push_back(event);
        }
        self.changed.notify_waiters();
    }

    pub(crate) async fn pull(&self) -> Event {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            let next = self.lock().pop_front();
            if let Some(event) = next {
                self.changed.notify_waiters();
                return event;
            }
            notified.await;
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Total events discarded because the queue was full.
    pub(crate) fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::SeqCst)
    }

    /// Resolve once the queue is empty.
    pub(crate) async fn wait_drained(&self) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Event>> {
        // The critical sections cannot panic, so a poisoned lock still holds
        // a consistent queue.
        self.events.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_and_pending_count() {
        let queue = EventQueue::new(8);
        queue.push(Event::Start { command_number: 0 });
        queue.push(Event::Stop { command_number: 0 });
        assert_eq!(queue.pending(), 2);

        assert_eq!(queue.pull().await, Event::Start { command_number: 0 });
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.pull().await, Event::Stop { command_number: 0 });
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_full_queue_discards_oldest() {
        let queue = EventQueue::new(2);
        for command_number in 0..5 {
            queue.push(Event::Start { command_number });
        }

        assert_eq!(queue.pending(), 2);
        assert_eq!(queue.discarded(), 3);
        assert_eq!(queue.pull().await, Event::Start { command_number: 3 });
        assert_eq!(queue.pull().await, Event::Start { command_number: 4 });
    }

    #[tokio::test]
    async fn test_pull_waits_for_push() {
        let queue = Arc::new(EventQueue::new(8));
        let puller = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pull().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!puller.is_finished());

        queue.push(Event::Stop { command_number: 1 });
        let event = tokio::time::timeout(Duration::from_secs(1), puller)
            .await
            .expect("puller should wake on push")
            .unwrap();
        assert_eq!(event, Event::Stop { command_number: 1 });
    }

    #[tokio::test]
    async fn test_wait_drained_returns_immediately_when_empty() {
        let queue = EventQueue::new(8);
        tokio::time::timeout(Duration::from_secs(1), queue.wait_drained())
            .await
            .expect("empty queue should already be drained");
    }

    #[tokio::test]
    async fn test_wait_drained_waits_for_consumer() {
        let queue = Arc::new(EventQueue::new(8));
        queue.push(Event::Start { command_number: 3 });

        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.wait_drained().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        queue.pull().await;
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish after the queue drains")
            .unwrap();
    }
}

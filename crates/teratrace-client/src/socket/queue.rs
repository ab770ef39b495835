//! Pending queue for entries waiting on a connection.
//!
//! Entries are kept with the completion channel of their caller and
//! drained in FIFO order once the socket opens. Capacity and overflow
//! behavior come from [`QueueConfig`].

use std::collections::VecDeque;

use tokio::sync::oneshot;
use tracing::debug;

use crate::config::{OverflowPolicy, QueueConfig};
use crate::entry::LogEntry;
use crate::error::{ClientError, Result};

/// Completion channel of one send.
pub(crate) type Completion = oneshot::Sender<Result<()>>;

/// An entry waiting for the connection, with its caller's completion.
#[derive(Debug)]
pub(crate) struct Pending {
    pub(crate) entry: LogEntry,
    pub(crate) completion: Completion,
}

impl Pending {
    /// Resolves the caller's outcome. A caller that stopped waiting is ignored.
    pub(crate) fn complete(self, outcome: Result<()>) {
        let _ = self.completion.send(outcome);
    }
}

/// FIFO buffer of entries sent while the socket is not connected.
#[derive(Debug)]
pub(crate) struct PendingQueue {
    entries: VecDeque<Pending>,
    config: QueueConfig,
}

impl PendingQueue {
    pub(crate) fn new(config: QueueConfig) -> Self {
        Self {
            entries: VecDeque::new(),
            config,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry, applying the overflow policy when full.
    ///
    /// Entries pushed out of the queue have their completion rejected so
    /// that no caller waits forever.
    pub(crate) fn push(&mut self, pending: Pending) {
        let Some(capacity) = self.config.capacity else {
            self.entries.push_back(pending);
            return;
        };

        if self.entries.len() < capacity {
            self.entries.push_back(pending);
            return;
        }

        match self.config.overflow {
            OverflowPolicy::DropOldest => {
                if let Some(oldest) = self.entries.pop_front() {
                    debug!(capacity, "Pending queue full, evicting oldest entry");
                    oldest.complete(Err(ClientError::Evicted));
                }
                self.entries.push_back(pending);
            }
            OverflowPolicy::RejectNew => {
                debug!(capacity, "Pending queue full, rejecting entry");
                pending.complete(Err(ClientError::QueueFull { capacity }));
            }
        }
    }

    /// Removes and returns the oldest entry.
    pub(crate) fn pop(&mut self) -> Option<Pending> {
        self.entries.pop_front()
    }

    /// Rejects every queued entry with `reason`.
    pub(crate) fn reject_all(&mut self, reason: impl Fn() -> ClientError) {
        for pending in self.entries.drain(..) {
            pending.complete(Err(reason()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{LogRecord, Normalizer};

    fn pending(message: &str) -> (Pending, oneshot::Receiver<Result<()>>) {
        let (tx, rx) = oneshot::channel();
        let entry = Normalizer::new("svc").normalize(LogRecord::new().message(message));
        (
            Pending {
                entry,
                completion: tx,
            },
            rx,
        )
    }

    fn message_of(p: &Pending) -> &str {
        p.entry.message.as_deref().unwrap_or_default()
    }

    #[test]
    fn unbounded_queue_keeps_everything_in_order() {
        let mut queue = PendingQueue::new(QueueConfig::unbounded());
        let mut receivers = Vec::new();
        for i in 0..1_000 {
            let (p, rx) = pending(&i.to_string());
            queue.push(p);
            receivers.push(rx);
        }

        assert_eq!(queue.len(), 1_000);
        for i in 0..1_000 {
            let p = queue.pop().unwrap();
            assert_eq!(message_of(&p), i.to_string());
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn drop_oldest_evicts_front_and_rejects_it() {
        let mut queue = PendingQueue::new(QueueConfig::bounded(2, OverflowPolicy::DropOldest));
        let (a, mut rx_a) = pending("a");
        let (b, _rx_b) = pending("b");
        let (c, _rx_c) = pending("c");

        queue.push(a);
        queue.push(b);
        queue.push(c);

        assert_eq!(queue.len(), 2);
        assert!(matches!(rx_a.try_recv(), Ok(Err(ClientError::Evicted))));
        assert_eq!(message_of(&queue.pop().unwrap()), "b");
        assert_eq!(message_of(&queue.pop().unwrap()), "c");
    }

    #[test]
    fn reject_new_keeps_existing_entries() {
        let mut queue = PendingQueue::new(QueueConfig::bounded(1, OverflowPolicy::RejectNew));
        let (a, mut rx_a) = pending("a");
        let (b, mut rx_b) = pending("b");

        queue.push(a);
        queue.push(b);

        assert_eq!(queue.len(), 1);
        assert!(rx_a.try_recv().is_err(), "a is still pending");
        assert!(matches!(
            rx_b.try_recv(),
            Ok(Err(ClientError::QueueFull { capacity: 1 }))
        ));
        assert_eq!(message_of(&queue.pop().unwrap()), "a");
    }

    #[test]
    fn reject_all_completes_every_entry() {
        let mut queue = PendingQueue::new(QueueConfig::unbounded());
        let (a, mut rx_a) = pending("a");
        let (b, mut rx_b) = pending("b");
        queue.push(a);
        queue.push(b);

        queue.reject_all(|| ClientError::Closed);

        assert!(queue.is_empty());
        assert!(matches!(rx_a.try_recv(), Ok(Err(ClientError::Closed))));
        assert!(matches!(rx_b.try_recv(), Ok(Err(ClientError::Closed))));
    }

    #[test]
    fn complete_ignores_dropped_receiver() {
        let (p, rx) = pending("gone");
        drop(rx);
        p.complete(Ok(()));
    }
}

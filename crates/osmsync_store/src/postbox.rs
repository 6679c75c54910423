//! Bounded handoff queue between a producer and a consumer thread.

use crate::error::{StoreError, StoreResult};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// Default number of items buffered before `put` blocks.
pub const DEFAULT_POSTBOX_CAPACITY: usize = 1024;

struct PostboxState<T> {
    queue: VecDeque<T>,
    input_complete: bool,
    input_failed: bool,
    output_failed: bool,
}

/// A bounded blocking queue with failure signalling in both directions.
///
/// The producer calls [`DataPostbox::put`] then [`DataPostbox::complete`];
/// the consumer calls [`DataPostbox::take`] until it returns `None`. If
/// either side fails it flags the box, and the other side's next blocking
/// call returns [`StoreError::QueueAborted`] instead of waiting forever.
pub struct DataPostbox<T> {
    capacity: usize,
    state: Mutex<PostboxState<T>>,
    changed: Condvar,
}

impl<T> DataPostbox<T> {
    /// Creates a postbox holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(PostboxState {
                queue: VecDeque::new(),
                input_complete: false,
                input_failed: false,
                output_failed: false,
            }),
            changed: Condvar::new(),
        }
    }

    /// Enqueues an item, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::QueueAborted`] if the consumer has failed.
    pub fn put(&self, item: T) -> StoreResult<()> {
        let mut state = self.state.lock();
        loop {
            if state.output_failed {
                return Err(StoreError::QueueAborted { side: "output" });
            }
            if state.queue.len() < self.capacity {
                break;
            }
            self.changed.wait(&mut state);
        }
        state.queue.push_back(item);
        self.changed.notify_all();
        Ok(())
    }

    /// Marks the input finished. Items already queued remain takeable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::QueueAborted`] if the consumer has failed.
    pub fn complete(&self) -> StoreResult<()> {
        let mut state = self.state.lock();
        if state.output_failed {
            return Err(StoreError::QueueAborted { side: "output" });
        }
        state.input_complete = true;
        self.changed.notify_all();
        Ok(())
    }

    /// Signals that the producer failed.
    pub fn fail_input(&self) {
        let mut state = self.state.lock();
        state.input_failed = true;
        self.changed.notify_all();
    }

    /// Dequeues the next item, blocking while the queue is empty.
    ///
    /// Returns `Ok(None)` once the input is complete and drained.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::QueueAborted`] if the producer has failed.
    pub fn take(&self) -> StoreResult<Option<T>> {
        let mut state = self.state.lock();
        loop {
            if state.input_failed {
                return Err(StoreError::QueueAborted { side: "input" });
            }
            if let Some(item) = state.queue.pop_front() {
                self.changed.notify_all();
                return Ok(Some(item));
            }
            if state.input_complete {
                return Ok(None);
            }
            self.changed.wait(&mut state);
        }
    }

    /// Signals that the consumer failed, unblocking the producer.
    pub fn fail_output(&self) {
        let mut state = self.state.lock();
        state.output_failed = true;
        state.queue.clear();
        self.changed.notify_all();
    }

    /// Maximum number of queued items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for DataPostbox<T> {
    fn default() -> Self {
        Self::new(DEFAULT_POSTBOX_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn producer_consumer_preserves_order() {
        let postbox = Arc::new(DataPostbox::new(4));
        let producer = {
            let postbox = Arc::clone(&postbox);
            thread::spawn(move || {
                for i in 0..1000 {
                    postbox.put(i).unwrap();
                }
                postbox.complete().unwrap();
            })
        };

        let mut received = Vec::new();
        while let Some(item) = postbox.take().unwrap() {
            received.push(item);
        }
        producer.join().unwrap();
        assert_eq!(received, (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn input_failure_reaches_consumer() {
        let postbox = Arc::new(DataPostbox::<i32>::new(2));
        let producer = {
            let postbox = Arc::clone(&postbox);
            thread::spawn(move || {
                postbox.put(1).unwrap();
                postbox.fail_input();
            })
        };
        producer.join().unwrap();
        assert!(matches!(postbox.take(), Err(StoreError::QueueAborted { side: "input" })));
    }

    #[test]
    fn output_failure_unblocks_producer() {
        let postbox = Arc::new(DataPostbox::new(1));
        postbox.put(0).unwrap();
        let producer = {
            let postbox = Arc::clone(&postbox);
            thread::spawn(move || postbox.put(1))
        };
        postbox.fail_output();
        let result = producer.join().unwrap();
        assert!(matches!(result, Err(StoreError::QueueAborted { side: "output" })));
    }

    #[test]
    fn complete_then_drain() {
        let postbox = DataPostbox::new(8);
        postbox.put("a").unwrap();
        postbox.put("b").unwrap();
        postbox.complete().unwrap();
        assert_eq!(postbox.take().unwrap(), Some("a"));
        assert_eq!(postbox.take().unwrap(), Some("b"));
        assert_eq!(postbox.take().unwrap(), None);
        assert_eq!(postbox.take().unwrap(), None);
    }
}

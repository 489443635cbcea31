//! Bounded failure queue.
//!
//! Work that runs detached from its caller (spawned fetches, background
//! tasks) has nobody to return an error to. Such failures are pushed here so
//! they can be inspected or reported later instead of vanishing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Dead letter queue entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter<T> {
    /// The failed operation payload
    pub payload: T,

    /// The error message of the failure
    pub error_message: String,

    /// When the failure was recorded (nanoseconds since epoch)
    pub failed_at: u64,
}

impl<T> DeadLetter<T> {
    fn new(payload: T, error_message: String) -> Self {
        // Truncation acceptable for nanosecond timestamps (wraps every ~584 years)
        #[allow(clippy::cast_possible_truncation)]
        let failed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_nanos() as u64;

        Self {
            payload,
            error_message,
            failed_at,
        }
    }
}

/// Dead Letter Queue for storing failed operations
///
/// - Bounded with a configurable max size
/// - FIFO ordering (oldest entries dropped when full)
/// - Cloning shares the underlying queue
///
/// # Example
///
/// ```
/// use postboard_runtime::DeadLetterQueue;
///
/// let dlq = DeadLetterQueue::new(2);
/// dlq.push(1_u64, "timeout".to_string());
/// dlq.push(2, "refused".to_string());
/// dlq.push(3, "reset".to_string());
///
/// let entries = dlq.drain();
/// assert_eq!(entries.iter().map(|e| e.payload).collect::<Vec<_>>(), vec![2, 3]);
/// assert!(dlq.is_empty());
/// ```
#[derive(Debug)]
pub struct DeadLetterQueue<T> {
    queue: Arc<Mutex<VecDeque<DeadLetter<T>>>>,
    max_size: usize,
}

impl<T> DeadLetterQueue<T> {
    /// Create a new dead letter queue holding at most `max_size` entries (minimum 1)
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            max_size: max_size.max(1),
        }
    }

    /// Push a failed operation onto the queue
    ///
    /// If the queue is full, the oldest entry is dropped.
    pub fn push(&self, payload: T, error_message: String) {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);

        if queue.len() >= self.max_size {
            queue.pop_front();
            metrics::counter!("dlq.dropped").increment(1);
            tracing::warn!(max_size = self.max_size, "DLQ at capacity, dropping oldest entry");
        }

        queue.push_back(DeadLetter::new(payload, error_message));

        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!("dlq.size").set(queue.len() as f64);
        metrics::counter!("dlq.pushed").increment(1);
    }

    /// Current number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if the queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return all entries, oldest first
    pub fn drain(&self) -> Vec<DeadLetter<T>> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let entries: Vec<_> = queue.drain(..).collect();

        metrics::gauge!("dlq.size").set(0.0);
        metrics::counter!("dlq.drained").increment(entries.len() as u64);

        entries
    }

    /// Copy of all entries without removing them, oldest first
    #[must_use]
    pub fn snapshot(&self) -> Vec<DeadLetter<T>>
    where
        T: Clone,
    {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Get the maximum queue size
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }
}

impl<T> Clone for DeadLetterQueue<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            max_size: self.max_size,
        }
    }
}

impl<T> Default for DeadLetterQueue<T> {
    fn default() -> Self {
        Self::new(100)
    }
}

//! Common conduit logging infrastructure.
//!
//! A [`Logger`] stamps each event with the time elapsed since a shared start instant and buffers
//! it locally. Buffers are handed to a shared action when they fill, when [`Logger::flush`] is
//! called, and when the logger is dropped. Each stage thread owns its own clone, so logging an
//! event never contends with other stages; only flushes take the action's lock.

#![forbid(missing_docs)]

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// The default number of events buffered before a flush.
pub const DEFAULT_CAPACITY: usize = 1024;

/// The shared sink that receives flushed batches.
///
/// The first argument is the time of the flush; the second the buffered events, which the action
/// may drain. An empty batch is passed when a logger is dropped.
pub type Action<T> = dyn FnMut(&Duration, &mut Vec<(Duration, T)>) + Send;

/// A buffering logger for events of type `T`.
pub struct Logger<T> {
    time: Instant,
    capacity: usize,
    buffer: Vec<(Duration, T)>,
    action: Arc<Mutex<Action<T>>>,
}

impl<T> Logger<T> {
    /// Allocates a new logger whose timestamps are measured from `time`.
    pub fn new<F>(time: Instant, action: F) -> Self
    where
        F: FnMut(&Duration, &mut Vec<(Duration, T)>) + Send + 'static,
    {
        Self::with_capacity(time, DEFAULT_CAPACITY, action)
    }

    /// Allocates a new logger that flushes every `capacity` events.
    pub fn with_capacity<F>(time: Instant, capacity: usize, action: F) -> Self
    where
        F: FnMut(&Duration, &mut Vec<(Duration, T)>) + Send + 'static,
    {
        let capacity = capacity.max(1);
        Logger {
            time,
            capacity,
            buffer: Vec::with_capacity(capacity),
            action: Arc::new(Mutex::new(action)),
        }
    }

    /// The instant timestamps are measured from.
    pub fn start(&self) -> Instant { self.time }

    /// Logs an event.
    ///
    /// The event may not be observed by the action until the buffer fills or is flushed.
    pub fn log<S: Into<T>>(&mut self, event: S) {
        self.log_many(Some(event));
    }

    /// Logs multiple events, all with the same timestamp.
    pub fn log_many<I>(&mut self, events: I)
    where
        I: IntoIterator,
        I::Item: Into<T>,
    {
        let elapsed = self.time.elapsed();
        for event in events {
            self.buffer.push((elapsed, event.into()));
            if self.buffer.len() >= self.capacity {
                self.flush();
            }
        }
    }

    /// Hands any buffered events to the action.
    pub fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        self.apply();
        self.buffer.clear();
    }

    fn apply(&mut self) {
        let now = self.time.elapsed();
        let mut guard = self.action.lock().unwrap_or_else(PoisonError::into_inner);
        let action = &mut *guard;
        action(&now, &mut self.buffer);
    }
}

// Clones share the start instant and the action but buffer independently.
impl<T> Clone for Logger<T> {
    fn clone(&self) -> Self {
        Logger {
            time: self.time,
            capacity: self.capacity,
            buffer: Vec::with_capacity(self.capacity),
            action: Arc::clone(&self.action),
        }
    }
}

impl<T> Drop for Logger<T> {
    fn drop(&mut self) {
        self.flush();
        self.apply();
    }
}

impl<T> std::fmt::Debug for Logger<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("time", &self.time)
            .field("capacity", &self.capacity)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

//! The reading end of a stage's output.

use crate::communication::{CancellationToken, Pull, Puller};
use crate::error::Faults;
use crate::ComputationError;

/// An ordered stream of `D` written by exactly one stage.
///
/// A stream is read by one consumer at a time. It is Open while its producer may still send, and
/// Closed once the producer has finished or stopped; no value arrives after it is Closed. Having
/// observed the end, the stream never blocks again: further reads return `None` at once.
pub struct StreamCore<D> {
    puller: Puller<D>,
    faults: Faults,
}

/// A stream of integers.
pub type Stream = StreamCore<i64>;

/// A stream that may end in a failure from a fallible stage.
pub type TryStream = StreamCore<Result<i64, ComputationError>>;

impl<D> StreamCore<D> {
    pub(crate) fn new(puller: Puller<D>, faults: Faults) -> Self {
        StreamCore { puller, faults }
    }

    /// A stream that is already closed and will never yield a value.
    pub fn closed() -> Self {
        StreamCore { puller: Puller::closed(), faults: Faults::default() }
    }

    /// Receives the next value, blocking until one arrives or the stream closes.
    pub fn recv(&mut self) -> Option<D> {
        self.puller.pull()
    }

    /// Receives the next value unless `token` is signalled first.
    pub(crate) fn recv_until(&mut self, token: &CancellationToken) -> Option<D> {
        self.puller.pull_until(token)
    }

    /// True once the stream has been read to its end, or abandoned with [`close`](Self::close).
    pub fn is_closed(&self) -> bool {
        self.puller.is_closed()
    }

    /// The failure of a fallible stage upstream of this stream, if one has failed.
    ///
    /// A failure is recorded before it is handed on, so it is reported here even when cancellation
    /// kept it from arriving in-band.
    pub fn failure(&self) -> Option<&ComputationError> {
        self.faults.first()
    }

    pub(crate) fn faults(&self) -> &Faults { &self.faults }

    /// Stops reading.
    ///
    /// The producer observes that its reader has gone away at its next handoff, and stops.
    pub fn close(&mut self) {
        self.puller = Puller::closed();
    }
}

impl<D> std::fmt::Debug for StreamCore<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCore")
            .field("closed", &self.is_closed())
            .field("failed", &self.failure().is_some())
            .finish()
    }
}

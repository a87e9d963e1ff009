//! Capacity-zero edges between exactly one writer and one reader.

use crossbeam_channel::{select_biased, Receiver, RecvError, Sender};

use crate::{CancellationToken, Handoff, Pull, Push};

/// Allocates a rendezvous edge whose pushes observe `token`.
///
/// The edge closes when every clone of the returned [`Pusher`] has been dropped.
pub fn rendezvous<T>(token: CancellationToken) -> (Pusher<T>, Puller<T>) {
    let (target, source) = crossbeam_channel::bounded(0);
    (Pusher { target, token }, Puller::new(source))
}

/// The writing half of a rendezvous edge.
pub struct Pusher<T> {
    target: Sender<T>,
    token: CancellationToken,
}

impl<T> Pusher<T> {
    /// The token this edge observes.
    pub fn token(&self) -> &CancellationToken { &self.token }
}

// Clones write into the same edge; the merge stage hands one to each of its workers.
impl<T> Clone for Pusher<T> {
    fn clone(&self) -> Self {
        Pusher {
            target: self.target.clone(),
            token: self.token.clone(),
        }
    }
}

impl<T> Push<T> for Pusher<T> {
    fn push(&mut self, element: T) -> Handoff {
        if self.token.is_cancelled() {
            return Handoff::Cancelled;
        }
        // Biased towards the signal: once `cancel` has returned, no handoff can complete.
        select_biased! {
            recv(self.token.signal()) -> _ => Handoff::Cancelled,
            send(self.target, element) -> result => match result {
                Ok(()) => Handoff::Delivered,
                Err(_) => Handoff::Disconnected,
            },
        }
    }
}

/// The reading half of a rendezvous edge.
///
/// Once the puller has observed that the edge is closed it records the fact and never blocks on
/// the channel again.
pub struct Puller<T> {
    source: Receiver<T>,
    closed: bool,
}

impl<T> Puller<T> {
    fn new(source: Receiver<T>) -> Self {
        Puller { source, closed: false }
    }

    /// An already-closed puller, with no writer behind it.
    pub fn closed() -> Self {
        let (_, source) = crossbeam_channel::bounded(0);
        Puller { source, closed: true }
    }

    /// True once the puller has observed the end of the edge.
    #[inline]
    pub fn is_closed(&self) -> bool { self.closed }

    /// Pulls the next element, giving up early if `token` is signalled.
    ///
    /// Cancellation takes no value from the edge and does not mark it closed.
    pub fn pull_until(&mut self, token: &CancellationToken) -> Option<T> {
        if self.closed || token.is_cancelled() {
            return None;
        }
        let received = select_biased! {
            recv(token.signal()) -> _ => None,
            recv(self.source) -> result => Some(result),
        };
        received.and_then(|result| self.observe(result))
    }

    fn observe(&mut self, result: Result<T, RecvError>) -> Option<T> {
        match result {
            Ok(element) => Some(element),
            Err(RecvError) => {
                self.closed = true;
                None
            }
        }
    }
}

impl<T> Pull<T> for Puller<T> {
    fn pull(&mut self) -> Option<T> {
        if self.closed {
            return None;
        }
        let result = self.source.recv();
        self.observe(result)
    }
}

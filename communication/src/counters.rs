//! Push wrappers to maintain counts of delivered values.

use crate::{Handoff, Push};

/// Wraps a pusher and counts the handoffs that reached the reader.
///
/// Abandoned handoffs, whether cancelled or disconnected, are not counted.
pub struct Counter<T, P: Push<T>> {
    pusher: P,
    delivered: usize,
    phantom: ::std::marker::PhantomData<T>,
}

impl<T, P: Push<T>> Counter<T, P> {
    /// Wraps a pusher with a delivery counter.
    pub fn new(pusher: P) -> Self {
        Counter {
            pusher,
            delivered: 0,
            phantom: ::std::marker::PhantomData,
        }
    }

    /// The number of values delivered so far.
    #[inline]
    pub fn delivered(&self) -> usize { self.delivered }

    /// Mutable access to the wrapped pusher.
    ///
    /// Values moved through this reference are not counted.
    pub fn inner(&mut self) -> &mut P { &mut self.pusher }
}

impl<T, P: Push<T>> Push<T> for Counter<T, P> {
    #[inline]
    fn push(&mut self, element: T) -> Handoff {
        let handoff = self.pusher.push(element);
        if handoff.is_delivered() {
            self.delivered += 1;
        }
        handoff
    }
}

//! Rendezvous edges and cooperative cancellation for conduit pipelines.
//!
//! This crate is part of the conduit pipeline system, used for moving values between stage threads.
//! It is separated out mostly to make clear boundaries in the project: nothing here knows what a
//! stage is, only how one thread hands a value to another.
//!
//! Edges are allocated with [`rendezvous`], which returns a [`Pusher`] and a [`Puller`] sharing a
//! channel of capacity zero. A push blocks until the reader takes the value, the reader goes away,
//! or the [`CancellationToken`] the edge was built with is signalled. Each edge is FIFO.
//!
//! Endpoints implement the [`Push`] and [`Pull`] traits, so wrappers such as
//! [`counters::Counter`] can be layered over them.
//!
//! # Examples
//! ```
//! use conduit_communication::{rendezvous, CancellationToken, Handoff, Push, Pull};
//!
//! let token = CancellationToken::new();
//! let (mut pusher, mut puller) = rendezvous::<u64>(token.clone());
//!
//! let sender = std::thread::spawn(move || {
//!     for round in 0 .. 3 {
//!         assert_eq!(pusher.push(round), Handoff::Delivered);
//!     }
//! });
//!
//! let mut received = Vec::new();
//! while let Some(value) = puller.pull() {
//!     received.push(value);
//! }
//! sender.join().unwrap();
//! assert_eq!(received, vec![0, 1, 2]);
//! ```

#![forbid(missing_docs)]

pub mod cancel;
pub mod counters;
pub mod rendezvous;

pub use cancel::CancellationToken;
pub use rendezvous::{rendezvous, Pusher, Puller};

/// The outcome of an attempt to hand a value to the reader of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handoff {
    /// The reader accepted the value.
    Delivered,
    /// The token was signalled before the reader accepted the value; the value was dropped.
    Cancelled,
    /// The reader has gone away; the value was dropped.
    Disconnected,
}

impl Handoff {
    /// True when the value reached the reader.
    #[inline]
    pub fn is_delivered(&self) -> bool { *self == Handoff::Delivered }
}

/// Pushing elements of type `T`.
///
/// A push transfers ownership of `element` to the edge. Unlike an unbounded queue, implementors
/// may block until the reader is ready, and report through [`Handoff`] whether the value arrived.
/// A producer that sees anything other than [`Handoff::Delivered`] should stop pushing.
pub trait Push<T> {
    /// Hands `element` to the reader, blocking until the handoff resolves.
    fn push(&mut self, element: T) -> Handoff;
}

impl<T, P: ?Sized + Push<T>> Push<T> for Box<P> {
    #[inline]
    fn push(&mut self, element: T) -> Handoff { (**self).push(element) }
}

/// Pulling elements of type `T`.
pub trait Pull<T> {
    /// Pulls the next element, blocking until one is available.
    ///
    /// A result of `None` means the edge is closed: no further elements will ever arrive, and
    /// subsequent calls return `None` without blocking.
    fn pull(&mut self) -> Option<T>;
}

impl<T, P: ?Sized + Pull<T>> Pull<T> for Box<P> {
    #[inline]
    fn pull(&mut self) -> Option<T> { (**self).pull() }
}

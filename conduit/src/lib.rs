//! Conduit is a small system for running cancellable integer pipelines across threads.
//!
//! The code is organized in crates that depend as little as possible on each other.
//!
//! **Communication**: The [`conduit_communication`] crate defines rendezvous edges between one
//! writer and one reader, and the [`CancellationToken`] every stage of a pipeline consults.
//!
//! **Logging**: The [`conduit_logging`] crate defines a buffering, timestamped logger. The
//! [`logging`] module defines the events a pipeline reports through it.
//!
//! **Dataflow construction**: The [`dataflow`] module defines the stages themselves. A source
//! ([`generate`]) feeds any number of transforms ([`transform`], [`try_transform`]), streams may be
//! fanned in ([`merge`]), and a collector ([`collect`], [`try_collect`]) drains the result. Every
//! stage runs on its own thread and hands values on through a channel of capacity zero, so no stage
//! runs ahead of its reader.
//!
//! # Examples
//!
//! ```
//! use conduit::{collect, generate, merge, transform, CancellationToken};
//!
//! let token = CancellationToken::new();
//!
//! let mut squares = transform(&token, generate(&token, 0, 5), |x| x * x);
//! assert_eq!(collect(&mut squares), vec![0, 1, 4, 9, 16]);
//!
//! let mut merged = merge(&token, vec![generate(&token, 1, 3), generate(&token, 10, 2)]);
//! let mut values = collect(&mut merged);
//! values.sort();
//! assert_eq!(values, vec![1, 2, 3, 10, 11]);
//! ```
//!
//! Cancellation is cooperative. Signalling the token stops every stage at its next handoff, and the
//! collector simply observes a shorter result:
//!
//! ```
//! use conduit::{collect, generate, CancellationToken};
//!
//! let token = CancellationToken::new();
//! token.cancel();
//! assert!(collect(&mut generate(&token, 0, 1_000)).is_empty());
//! ```

#![forbid(missing_docs)]

pub use conduit_communication::CancellationToken;

pub use dataflow::{Pipeline, Stream, StreamCore, TryStream};
pub use dataflow::operators::{collect, generate, merge, transform, try_collect, try_transform};
pub use error::ComputationError;
pub use execute::{execute, Config};
#[cfg(feature = "getopts")]
pub use execute::execute_from_args;

/// Re-export of the `conduit_communication` crate.
pub mod communication {
    pub use conduit_communication::*;
}

/// Re-export of the `conduit_logging` crate.
pub mod logging_core {
    pub use conduit_logging::*;
}

pub mod dataflow;
pub mod error;
pub mod execute;
pub mod logging;

//! Abstractions for constructing and running pipelines.
//!
//! The module contains the [`Stream`] type each stage reads from and writes to, the [`Pipeline`]
//! that spawns stages sharing one cancellation token, and the [`operators`] that build them.

pub use self::stream::{StreamCore, Stream, TryStream};
pub use self::pipeline::Pipeline;

pub mod stream;
pub mod pipeline;
pub mod operators;

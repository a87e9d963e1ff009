//! Stages for building pipelines.
//!
//! Each operator is available as a method on [`Pipeline`](crate::Pipeline), which logs and tracks
//! the stages it spawns, and as a free function taking a [`CancellationToken`](crate::CancellationToken).

pub use self::generate::generate;
pub use self::transform::{transform, try_transform, IntoResult};
pub use self::merge::merge;
pub use self::collect::{collect, try_collect};

pub mod generate;
pub mod transform;
pub mod merge;
pub mod collect;

//! A source stage producing a range of integers.

use crate::communication::{CancellationToken, Push};
use crate::dataflow::pipeline::halted;
use crate::dataflow::{Pipeline, Stream};
use crate::error::Faults;
use crate::logging::{ShutdownReason, StageKind};

impl Pipeline {
    /// Produces `start, start + 1, ..., start + count - 1` in increasing order.
    ///
    /// A negative `count` produces an empty stream. The source stops early, as if exhausted, rather
    /// than produce a value past `i64::MAX`. Cancellation is checked before every handoff; a value
    /// whose handoff is abandoned is dropped and the stream closes.
    ///
    /// # Examples
    /// ```
    /// use conduit::{collect, CancellationToken, Pipeline};
    ///
    /// let pipeline = Pipeline::new(CancellationToken::new());
    /// assert_eq!(collect(&mut pipeline.generate(3, 4)), vec![3, 4, 5, 6]);
    /// assert!(collect(&mut pipeline.generate(3, -1)).is_empty());
    /// ```
    pub fn generate(&self, start: i64, count: i64) -> Stream {
        let name = format!("Generate({}, {})", start, count);
        self.spawn_stage(StageKind::Source, name, Faults::default(), move |_stage, output| {
            for offset in 0 .. count {
                let Some(value) = start.checked_add(offset) else { break };
                if let Some(reason) = halted(output.push(value)) {
                    return reason;
                }
            }
            ShutdownReason::Exhausted
        })
    }
}

/// Produces `count` consecutive integers from `start` on a new thread.
///
/// See [`Pipeline::generate`].
pub fn generate(token: &CancellationToken, start: i64, count: i64) -> Stream {
    Pipeline::new(token.clone()).generate(start, count)
}

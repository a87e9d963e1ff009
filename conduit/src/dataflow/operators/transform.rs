//! Stages mapping each value of a stream through a function.

use crate::communication::{CancellationToken, Push};
use crate::dataflow::pipeline::{drained, halted};
use crate::dataflow::{Pipeline, Stream, StreamCore, TryStream};
use crate::error::BoxError;
use crate::logging::{ShutdownReason, StageKind};
use crate::ComputationError;

/// Values a fallible stage can read: plain integers, or the output of another fallible stage.
pub trait IntoResult: Send + 'static {
    /// The value, or the failure that ended the stream it came from.
    fn into_result(self) -> Result<i64, ComputationError>;
}

impl IntoResult for i64 {
    #[inline]
    fn into_result(self) -> Result<i64, ComputationError> { Ok(self) }
}

impl IntoResult for Result<i64, ComputationError> {
    #[inline]
    fn into_result(self) -> Result<i64, ComputationError> { self }
}

impl Pipeline {
    /// Applies `logic` to each value of `input`, preserving order.
    ///
    /// `logic` runs to completion on every value it is given; cancellation is only observed when
    /// reading the next value and when handing a result on. A result whose handoff is abandoned
    /// is dropped and the stream closes.
    ///
    /// # Examples
    /// ```
    /// use conduit::{collect, CancellationToken, Pipeline};
    ///
    /// let pipeline = Pipeline::new(CancellationToken::new());
    /// let doubled = pipeline.transform(pipeline.generate(0, 3), |x| 2 * x);
    /// let mut shifted = pipeline.transform(doubled, |x| x + 1);
    /// assert_eq!(collect(&mut shifted), vec![1, 3, 5]);
    /// ```
    pub fn transform<L>(&self, input: Stream, mut logic: L) -> Stream
    where
        L: FnMut(i64) -> i64 + Send + 'static,
    {
        let mut input = input;
        let faults = input.faults().clone();
        self.spawn_stage(StageKind::Transform, "Transform".to_owned(), faults, move |stage, output| {
            while let Some(value) = input.recv_until(stage.token()) {
                if let Some(reason) = halted(output.push(logic(value))) {
                    return reason;
                }
            }
            drained(&input)
        })
    }

    /// Applies the fallible `logic` to each value of `input`, preserving order.
    ///
    /// The first error `logic` returns, or the first failure read from `input`, is handed on as
    /// the final element of the output, which then closes. The failure is recorded before the
    /// handoff, so if cancellation abandons the handoff it is still reported by
    /// [`StreamCore::failure`] and [`try_collect`](crate::try_collect).
    ///
    /// # Examples
    /// ```
    /// use conduit::{try_collect, CancellationToken, Pipeline};
    ///
    /// let pipeline = Pipeline::new(CancellationToken::new());
    /// let mut checked = pipeline.try_transform(pipeline.generate(0, 10), |x| {
    ///     if x < 3 { Ok(x) } else { Err(format!("{} is too large", x)) }
    /// });
    /// let error = try_collect(&mut checked).unwrap_err();
    /// assert_eq!(error.value, 3);
    /// ```
    pub fn try_transform<D, L, E>(&self, input: StreamCore<D>, mut logic: L) -> TryStream
    where
        D: IntoResult,
        L: FnMut(i64) -> Result<i64, E> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let mut input = input;
        let (faults, slot) = input.faults().extend();
        self.spawn_stage(StageKind::Transform, "TryTransform".to_owned(), faults, move |stage, output| {
            while let Some(item) = input.recv_until(stage.token()) {
                let value = match item.into_result() {
                    Ok(value) => value,
                    Err(upstream) => {
                        // Already recorded by the stage that failed.
                        output.inner().push(Err(upstream));
                        return ShutdownReason::Failed;
                    }
                };
                match logic(value) {
                    Ok(value) => {
                        if let Some(reason) = halted(output.push(Ok(value))) {
                            return reason;
                        }
                    }
                    Err(error) => {
                        let error = ComputationError::new(stage.id(), value, error);
                        let _ = slot.set(error.clone());
                        // Failures are not values, and go around the counter.
                        output.inner().push(Err(error));
                        return ShutdownReason::Failed;
                    }
                }
            }
            drained(&input)
        })
    }
}

/// Applies `logic` to each value of `input` on a new thread.
///
/// See [`Pipeline::transform`].
pub fn transform<L>(token: &CancellationToken, input: Stream, logic: L) -> Stream
where
    L: FnMut(i64) -> i64 + Send + 'static,
{
    Pipeline::new(token.clone()).transform(input, logic)
}

/// Applies the fallible `logic` to each value of `input` on a new thread.
///
/// See [`Pipeline::try_transform`].
pub fn try_transform<D, L, E>(token: &CancellationToken, input: StreamCore<D>, logic: L) -> TryStream
where
    D: IntoResult,
    L: FnMut(i64) -> Result<i64, E> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    Pipeline::new(token.clone()).try_transform(input, logic)
}

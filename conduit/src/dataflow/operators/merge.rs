//! Fans several streams into one.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::communication::counters::Counter;
use crate::communication::{rendezvous, CancellationToken, Push, Pusher};
use crate::dataflow::pipeline::{drained, halted};
use crate::dataflow::{Pipeline, StreamCore};
use crate::error::Faults;
use crate::logging::{ScheduleEvent, ShutdownReason, StageKind};

/// Tracks the workers still feeding a merge stage's output.
///
/// The group owns the output's primary pusher, and every worker holds a reference to the group, so
/// the output cannot close while any worker is active. Each worker drops its own pusher and then
/// departs, giving up its reference; the output closes when the final reference goes.
struct MergeGroup<D> {
    remaining: AtomicUsize,
    delivered: AtomicUsize,
    reason: AtomicU8,
    _outlet: Pusher<D>,
}

impl<D> MergeGroup<D> {
    fn new(workers: usize, outlet: Pusher<D>) -> Self {
        MergeGroup {
            remaining: AtomicUsize::new(workers),
            delivered: AtomicUsize::new(0),
            reason: AtomicU8::new(ShutdownReason::Exhausted as u8),
            _outlet: outlet,
        }
    }

    /// Records that one worker has finished, releasing its reference.
    ///
    /// Returns, to the last worker only, the stage's total deliveries and the reason it closed.
    fn depart(self: Arc<Self>, delivered: usize, reason: ShutdownReason) -> Option<(usize, ShutdownReason)> {
        self.delivered.fetch_add(delivered, Ordering::AcqRel);
        self.reason.fetch_max(reason as u8, Ordering::AcqRel);
        if self.remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
            return None;
        }
        let reason = rank(self.reason.load(Ordering::Acquire));
        Some((self.delivered.load(Ordering::Acquire), reason))
    }
}

fn rank(reason: u8) -> ShutdownReason {
    [
        ShutdownReason::Exhausted,
        ShutdownReason::Disconnected,
        ShutdownReason::Cancelled,
        ShutdownReason::Failed,
        ShutdownReason::SpawnFailed,
    ]
    .into_iter()
    .find(|candidate| *candidate as u8 == reason)
    .unwrap_or(ShutdownReason::SpawnFailed)
}

impl Pipeline {
    /// Fans `inputs` into a single stream.
    ///
    /// Each input is drained by its own worker thread. Values from one input keep their relative
    /// order; values from different inputs interleave as the workers are scheduled. The output
    /// closes once every worker has finished, and with no inputs it is closed from the start.
    ///
    /// # Examples
    /// ```
    /// use conduit::{collect, CancellationToken, Pipeline};
    ///
    /// let pipeline = Pipeline::new(CancellationToken::new());
    /// let mut merged = pipeline.merge(vec![pipeline.generate(1, 3), pipeline.generate(10, 2)]);
    /// let values = collect(&mut merged);
    ///
    /// let low: Vec<_> = values.iter().copied().filter(|x| *x < 10).collect();
    /// assert_eq!(low, vec![1, 2, 3]);
    /// assert_eq!(values.len(), 5);
    /// ```
    pub fn merge<D, I>(&self, inputs: I) -> StreamCore<D>
    where
        D: Send + 'static,
        I: IntoIterator<Item = StreamCore<D>>,
    {
        let inputs: Vec<_> = inputs.into_iter().collect();
        let mut stage = self.stage(StageKind::Merge, format!("Merge({})", inputs.len()));
        let (pusher, puller) = rendezvous(self.token().clone());
        let faults = Faults::union(inputs.iter().map(|input| input.faults()));

        if inputs.is_empty() {
            drop(pusher);
            stage.shutdown(0, ShutdownReason::Exhausted);
            return StreamCore::new(puller, faults);
        }

        let outlets: Vec<_> = inputs.iter().map(|_| pusher.clone()).collect();
        let group = Arc::new(MergeGroup::new(inputs.len(), pusher));

        for (index, (input, outlet)) in inputs.into_iter().zip(outlets).enumerate() {
            let name = format!("{}.{}", stage.thread_name(), index);
            let mut worker = stage.clone();
            let shared = Arc::clone(&group);
            let started = self.spawn(name, move || {
                worker.log(ScheduleEvent::start(worker.id()));
                let (delivered, reason) = forward(input, outlet, worker.token());
                if let Some((total, reason)) = shared.depart(delivered, reason) {
                    worker.shutdown(total, reason);
                }
                worker.log(ScheduleEvent::stop(worker.id()));
            });
            if !started {
                self.report_spawn_failure(stage.id());
                if let Some((total, reason)) = Arc::clone(&group).depart(0, ShutdownReason::SpawnFailed) {
                    stage.shutdown(total, reason);
                }
            }
        }

        StreamCore::new(puller, faults)
    }
}

/// Moves values from `input` to `outlet` until either end stops.
fn forward<D>(mut input: StreamCore<D>, outlet: Pusher<D>, token: &CancellationToken) -> (usize, ShutdownReason) {
    let mut output = Counter::new(outlet);
    let reason = loop {
        match input.recv_until(token) {
            Some(value) => {
                if let Some(reason) = halted(output.push(value)) {
                    break reason;
                }
            }
            None => break drained(&input),
        }
    };
    // The worker's own pusher must be gone before it departs the group.
    let delivered = output.delivered();
    drop(output);
    (delivered, reason)
}

/// Fans `inputs` into a single stream, one worker thread per input.
///
/// See [`Pipeline::merge`].
pub fn merge<D, I>(token: &CancellationToken, inputs: I) -> StreamCore<D>
where
    D: Send + 'static,
    I: IntoIterator<Item = StreamCore<D>>,
{
    Pipeline::new(token.clone()).merge(inputs)
}

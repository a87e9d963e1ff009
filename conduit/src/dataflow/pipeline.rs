//! A scope in which stages share one cancellation token.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::communication::counters::Counter;
use crate::communication::{rendezvous, CancellationToken, Handoff, Pusher};
use crate::dataflow::StreamCore;
use crate::error::Faults;
use crate::logging::{MessagesEvent, PipelineEvent, PipelineLogger, ScheduleEvent, ShutdownEvent, ShutdownReason, StageEvent, StageKind};

/// The writing end a stage's logic hands values to.
pub(crate) type Output<D> = Counter<D, Pusher<D>>;

/// Spawns stages that share one cancellation token, and optionally one event logger.
///
/// Clones refer to the same pipeline: they share the token, the stage identifiers, and the set of
/// threads [`join`](Pipeline::join) waits for.
///
/// # Examples
/// ```
/// use conduit::{collect, CancellationToken, Pipeline};
///
/// let pipeline = Pipeline::new(CancellationToken::new());
/// let evens = pipeline.transform(pipeline.generate(0, 4), |x| x * 2);
/// let odds = pipeline.transform(pipeline.generate(0, 4), |x| x * 2 + 1);
/// let mut merged = pipeline.merge(vec![evens, odds]);
///
/// let mut values = collect(&mut merged);
/// values.sort();
/// assert_eq!(values, (0 .. 8).collect::<Vec<_>>());
/// pipeline.join().unwrap();
/// ```
pub struct Pipeline {
    token: CancellationToken,
    logger: Option<PipelineLogger>,
    identifiers: Arc<AtomicUsize>,
    threads: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Pipeline {
    /// Allocates a pipeline whose stages observe `token`.
    pub fn new(token: CancellationToken) -> Self {
        Pipeline {
            token,
            logger: None,
            identifiers: Arc::new(AtomicUsize::new(0)),
            threads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Reports the events of stages created from now on to `logger`.
    pub fn with_logger(mut self, logger: PipelineLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The token every stage of this pipeline observes.
    pub fn token(&self) -> &CancellationToken { &self.token }

    /// A clone of the pipeline's logger, if it has one.
    pub fn logger(&self) -> Option<PipelineLogger> { self.logger.clone() }

    /// Signals the pipeline's token; see [`CancellationToken::cancel`].
    pub fn cancel(&self) -> bool { self.token.cancel() }

    /// Waits for every stage thread spawned so far to finish.
    ///
    /// Stages finish once their outputs are read to the end, dropped, or cancelled. Joining while
    /// holding an unread stream of the pipeline therefore blocks until the token is signalled.
    ///
    /// Returns an error describing any stage that panicked.
    pub fn join(&self) -> Result<(), String> {
        let handles = std::mem::take(&mut *self.threads.lock().unwrap_or_else(PoisonError::into_inner));
        let mut panics = Vec::new();
        for handle in handles {
            let name = handle.thread().name().unwrap_or("conduit").to_owned();
            if let Err(payload) = handle.join() {
                let message = payload.downcast_ref::<&str>().map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_owned());
                panics.push(format!("{}: {}", name, message));
            }
        }
        if panics.is_empty() { Ok(()) }
        else { Err(format!("stage threads panicked: {}", panics.join("; "))) }
    }

    /// Allocates an identifier for a new stage and records its creation.
    pub(crate) fn stage(&self, kind: StageKind, name: String) -> Stage {
        let id = self.identifiers.fetch_add(1, Ordering::Relaxed);
        let mut stage = Stage {
            id,
            kind,
            token: self.token.clone(),
            logger: self.logger.clone(),
        };
        stage.log(StageEvent { id, kind, name });
        stage
    }

    /// Runs `task` on a new named thread.
    ///
    /// Returns `false` if the thread could not be spawned, in which case `task` and everything it
    /// captured have been dropped.
    pub(crate) fn spawn<F: FnOnce() + Send + 'static>(&self, name: String, task: F) -> bool {
        match thread::Builder::new().name(name.clone()).spawn(task) {
            Ok(handle) => {
                self.threads.lock().unwrap_or_else(PoisonError::into_inner).push(handle);
                true
            }
            Err(error) => {
                eprintln!("conduit: failed to spawn {}: {}", name, error);
                false
            }
        }
    }

    /// Spawns a stage thread that runs `logic` against a new output stream carrying `faults`.
    ///
    /// The output closes when `logic` returns, having reported why.
    pub(crate) fn spawn_stage<D, L>(&self, kind: StageKind, name: String, faults: Faults, logic: L) -> StreamCore<D>
    where
        D: Send + 'static,
        L: FnOnce(&Stage, &mut Output<D>) -> ShutdownReason + Send + 'static,
    {
        let mut stage = self.stage(kind, name);
        let id = stage.id();
        let (pusher, puller) = rendezvous(self.token.clone());
        let started = self.spawn(stage.thread_name(), move || {
            stage.log(ScheduleEvent::start(stage.id()));
            let mut output = Counter::new(pusher);
            let reason = logic(&stage, &mut output);
            let delivered = output.delivered();
            drop(output);
            stage.shutdown(delivered, reason);
            stage.log(ScheduleEvent::stop(stage.id()));
        });
        if !started {
            self.report_spawn_failure(id);
        }
        StreamCore::new(puller, faults)
    }

    pub(crate) fn report_spawn_failure(&self, id: usize) {
        if let Some(mut logger) = self.logger.clone() {
            logger.log(ShutdownEvent { id, reason: ShutdownReason::SpawnFailed });
        }
    }
}

impl Clone for Pipeline {
    fn clone(&self) -> Self {
        Pipeline {
            token: self.token.clone(),
            logger: self.logger.clone(),
            identifiers: Arc::clone(&self.identifiers),
            threads: Arc::clone(&self.threads),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("token", &self.token)
            .field("logging", &self.logger.is_some())
            .field("stages", &self.identifiers.load(Ordering::Relaxed))
            .finish()
    }
}

/// Per-thread state of a running stage.
pub(crate) struct Stage {
    id: usize,
    kind: StageKind,
    token: CancellationToken,
    logger: Option<PipelineLogger>,
}

impl Stage {
    pub(crate) fn id(&self) -> usize { self.id }

    pub(crate) fn token(&self) -> &CancellationToken { &self.token }

    pub(crate) fn thread_name(&self) -> String {
        let kind = match self.kind {
            StageKind::Source => "source",
            StageKind::Transform => "transform",
            StageKind::Merge => "merge",
        };
        format!("conduit:{}-{}", kind, self.id)
    }

    pub(crate) fn log<E: Into<PipelineEvent>>(&mut self, event: E) {
        if let Some(logger) = self.logger.as_mut() {
            logger.log(event);
        }
    }

    /// Records that the stage's output has closed.
    pub(crate) fn shutdown(&mut self, delivered: usize, reason: ShutdownReason) {
        let id = self.id;
        self.log(MessagesEvent { id, delivered });
        self.log(ShutdownEvent { id, reason });
    }
}

impl Clone for Stage {
    fn clone(&self) -> Self {
        Stage {
            id: self.id,
            kind: self.kind,
            token: self.token.clone(),
            logger: self.logger.clone(),
        }
    }
}

/// The reason to stop after a handoff, if it was not delivered.
pub(crate) fn halted(handoff: Handoff) -> Option<ShutdownReason> {
    match handoff {
        Handoff::Delivered => None,
        Handoff::Cancelled => Some(ShutdownReason::Cancelled),
        Handoff::Disconnected => Some(ShutdownReason::Disconnected),
    }
}

/// The reason a stage's read loop ended, given the stream it was reading.
pub(crate) fn drained<D>(input: &StreamCore<D>) -> ShutdownReason {
    if input.is_closed() { ShutdownReason::Exhausted } else { ShutdownReason::Cancelled }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    use super::{halted, Pipeline};
    use crate::communication::{CancellationToken, Handoff};
    use crate::logging::{PipelineEvent, PipelineLogger, ShutdownReason, StageKind};
    use crate::collect;

    fn recorded() -> (PipelineLogger, Arc<Mutex<Vec<PipelineEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let logger = PipelineLogger::new(Instant::now(), move |_, data| {
            sink.lock().unwrap().extend(data.drain(..).map(|(_, event)| event));
        });
        (logger, events)
    }

    #[test]
    fn halted_maps_handoffs() {
        assert_eq!(halted(Handoff::Delivered), None);
        assert_eq!(halted(Handoff::Cancelled), Some(ShutdownReason::Cancelled));
        assert_eq!(halted(Handoff::Disconnected), Some(ShutdownReason::Disconnected));
    }

    #[test]
    fn stage_identifiers_are_shared_by_clones() {
        let pipeline = Pipeline::new(CancellationToken::new());
        let clone = pipeline.clone();
        assert_eq!(pipeline.stage(StageKind::Source, "a".into()).id(), 0);
        assert_eq!(clone.stage(StageKind::Source, "b".into()).id(), 1);
        assert_eq!(pipeline.stage(StageKind::Merge, "c".into()).thread_name(), "conduit:merge-2");
    }

    #[test]
    fn join_reports_panicking_stages() {
        let pipeline = Pipeline::new(CancellationToken::new());
        let mut stream = pipeline.transform(pipeline.generate(0, 3), |x| if x == 1 { panic!("boom") } else { x });
        assert_eq!(collect(&mut stream), vec![0]);
        let error = pipeline.join().unwrap_err();
        assert!(error.contains("conduit:transform-1"));
        assert!(error.contains("boom"));
    }

    #[test]
    fn stages_report_their_lifecycle() {
        let (logger, events) = recorded();
        let pipeline = Pipeline::new(CancellationToken::new()).with_logger(logger);
        let mut stream = pipeline.generate(5, 3);
        assert_eq!(collect(&mut stream), vec![5, 6, 7]);
        pipeline.join().unwrap();
        drop(pipeline);

        let events = events.lock().unwrap();
        let names: Vec<_> = events.iter().filter_map(|event| match event {
            PipelineEvent::Stage(stage) => Some(stage.name.clone()),
            _ => None,
        }).collect();
        assert_eq!(names, vec!["Generate(5, 3)".to_string()]);
        assert!(events.iter().any(|event| matches!(event,
            PipelineEvent::Messages(messages) if messages.delivered == 3)));
        assert!(events.iter().any(|event| matches!(event,
            PipelineEvent::Shutdown(shutdown) if shutdown.reason == ShutdownReason::Exhausted)));
    }
}

//! Events a pipeline reports, and sinks for them.

use std::io::{Read, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Type alias for the logger every stage writes pipeline events into.
pub type PipelineLogger = crate::logging_core::Logger<PipelineEvent>;

/// The role a stage plays in a pipeline.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum StageKind {
    /// Produces values from a range.
    Source,
    /// Maps each value of one stream.
    Transform,
    /// Fans several streams into one.
    Merge,
}

#[derive(Serialize, Deserialize, Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
/// The creation of a stage.
pub struct StageEvent {
    /// Pipeline-unique identifier for the stage.
    pub id: usize,
    /// What the stage does.
    pub kind: StageKind,
    /// A helpful name.
    pub name: String,
}

/// Records the starting and stopping of a stage thread.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Hash, PartialEq, Eq, Ord, PartialOrd)]
pub enum StartStop {
    /// Thread starts.
    Start,
    /// Thread stops.
    Stop,
}

#[derive(Serialize, Deserialize, Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
/// Stage thread start or stop.
///
/// A merge stage runs one thread per input, and so reports one pair per input.
pub struct ScheduleEvent {
    /// Identifier of the stage, linkable to the identifiers in `StageEvent`.
    pub id: usize,
    /// `Start` if the thread is starting, `Stop` if it is stopping.
    pub start_stop: StartStop,
}

impl ScheduleEvent {
    /// Creates a new start scheduling event.
    pub fn start(id: usize) -> Self { ScheduleEvent { id, start_stop: StartStop::Start } }
    /// Creates a new stop scheduling event.
    pub fn stop(id: usize) -> Self { ScheduleEvent { id, start_stop: StartStop::Stop } }
}

#[derive(Serialize, Deserialize, Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
/// The number of values a stage handed to its reader.
pub struct MessagesEvent {
    /// Identifier of the stage.
    pub id: usize,
    /// Values delivered before the output closed.
    pub delivered: usize,
}

/// Why a stage closed its output.
///
/// Variants are ordered by precedence: when the inputs of a merge stop for different reasons, the
/// greatest one is reported.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Hash, PartialEq, Eq, Ord, PartialOrd)]
pub enum ShutdownReason {
    /// Every value was produced.
    Exhausted,
    /// The reader went away.
    Disconnected,
    /// The cancellation token was observed.
    Cancelled,
    /// The stage function failed.
    Failed,
    /// The stage thread could not be started.
    SpawnFailed,
}

#[derive(Serialize, Deserialize, Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
/// A stage closed its output.
pub struct ShutdownEvent {
    /// Identifier of the stage.
    pub id: usize,
    /// Why it closed.
    pub reason: ShutdownReason,
}

#[derive(Serialize, Deserialize, Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
/// A deadline timer signalled the pipeline's token.
pub struct DeadlineEvent {
    /// The deadline, measured from when it was armed.
    pub after: Duration,
}

/// An event reported by a pipeline.
#[derive(Serialize, Deserialize, Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum PipelineEvent {
    /// A stage was created.
    Stage(StageEvent),
    /// A stage thread started or stopped.
    Schedule(ScheduleEvent),
    /// A stage's delivery count.
    Messages(MessagesEvent),
    /// A stage closed its output.
    Shutdown(ShutdownEvent),
    /// A deadline expired.
    Deadline(DeadlineEvent),
}

impl From<StageEvent> for PipelineEvent {
    fn from(v: StageEvent) -> PipelineEvent { PipelineEvent::Stage(v) }
}

impl From<ScheduleEvent> for PipelineEvent {
    fn from(v: ScheduleEvent) -> PipelineEvent { PipelineEvent::Schedule(v) }
}

impl From<MessagesEvent> for PipelineEvent {
    fn from(v: MessagesEvent) -> PipelineEvent { PipelineEvent::Messages(v) }
}

impl From<ShutdownEvent> for PipelineEvent {
    fn from(v: ShutdownEvent) -> PipelineEvent { PipelineEvent::Shutdown(v) }
}

impl From<DeadlineEvent> for PipelineEvent {
    fn from(v: DeadlineEvent) -> PipelineEvent { PipelineEvent::Deadline(v) }
}

/// Writes timestamped events to a `W: Write` in bincode.
pub struct EventWriter<W: Write> {
    stream: W,
}

impl<W: Write> EventWriter<W> {
    /// Allocates a new `EventWriter` wrapping a supplied writer.
    pub fn new(stream: W) -> Self {
        EventWriter { stream }
    }

    /// Encodes a batch of events, draining it.
    pub fn publish_batch(&mut self, data: &mut Vec<(Duration, PipelineEvent)>) -> bincode::Result<()> {
        for event in data.drain(..) {
            bincode::serialize_into(&mut self.stream, &event)?;
        }
        self.stream.flush()?;
        Ok(())
    }

    /// Recovers the wrapped writer.
    pub fn into_inner(self) -> W { self.stream }
}

/// Reads events written by an [`EventWriter`] from an `R: Read`.
pub struct EventReader<R: Read> {
    reader: R,
}

impl<R: Read> EventReader<R> {
    /// Allocates a new `EventReader` wrapping a supplied reader.
    pub fn new(reader: R) -> Self {
        EventReader { reader }
    }
}

impl<R: Read> Iterator for EventReader<R> {
    type Item = (Duration, PipelineEvent);
    fn next(&mut self) -> Option<Self::Item> {
        bincode::deserialize_from(&mut self.reader).ok()
    }
}

/// A logger that encodes every batch into `writer`.
///
/// A failed write is reported once on stderr, after which further events are discarded.
pub fn binary_logger<W: Write + Send + 'static>(start: std::time::Instant, writer: W) -> PipelineLogger {
    let mut writer = Some(EventWriter::new(writer));
    PipelineLogger::new(start, move |_time, data| {
        if let Some(sink) = writer.as_mut() {
            if let Err(error) = sink.publish_batch(data) {
                eprintln!("conduit: event logging disabled: {}", error);
                writer = None;
            }
        }
        data.clear();
    })
}

/// A logger that prints every event to stderr.
pub fn stderr_logger(start: std::time::Instant) -> PipelineLogger {
    PipelineLogger::new(start, |_time, data| {
        for (time, event) in data.drain(..) {
            eprintln!("{:?}\t{:?}", time, event);
        }
    })
}

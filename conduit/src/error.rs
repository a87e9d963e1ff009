//! Failures that propagate out of a pipeline.

use std::sync::{Arc, OnceLock};

/// The boxed error a fallible stage function may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A stage function failed to produce a value.
///
/// This is the only condition a pipeline reports as a failure. Cancellation and exhaustion are
/// observed as the end of a stream.
#[derive(Debug, Clone, thiserror::Error)]
#[error("stage {stage} failed on value {value}: {source}")]
pub struct ComputationError {
    /// Identifier of the stage whose function failed.
    pub stage: usize,
    /// The input value the function was applied to.
    pub value: i64,
    /// The error the function returned.
    #[source]
    pub source: Arc<dyn std::error::Error + Send + Sync>,
}

impl ComputationError {
    /// Wraps the error a stage function returned for `value`.
    pub fn new<E: Into<BoxError>>(stage: usize, value: i64, source: E) -> Self {
        ComputationError {
            stage,
            value,
            source: Arc::from(source.into()),
        }
    }
}

/// Where a fallible stage records its failure.
pub(crate) type FaultSlot = Arc<OnceLock<ComputationError>>;

/// The failure slots of every fallible stage upstream of a stream.
///
/// A stage records its failure here before handing it on in-band, so the failure outlives a
/// handoff abandoned to cancellation. Slots are listed upstream first.
#[derive(Clone, Default)]
pub(crate) struct Faults {
    slots: Vec<FaultSlot>,
}

impl Faults {
    /// These slots followed by a fresh one, which is also returned.
    pub(crate) fn extend(&self) -> (Faults, FaultSlot) {
        let slot = FaultSlot::default();
        let mut slots = self.slots.clone();
        slots.push(Arc::clone(&slot));
        (Faults { slots }, slot)
    }

    /// The slots of all of `faults`, in order.
    pub(crate) fn union<'a, I: IntoIterator<Item = &'a Faults>>(faults: I) -> Faults {
        let slots = faults.into_iter().flat_map(|f| f.slots.iter().map(Arc::clone)).collect();
        Faults { slots }
    }

    /// The recorded failure furthest upstream, if any.
    pub(crate) fn first(&self) -> Option<&ComputationError> {
        self.slots.iter().find_map(|slot| slot.get())
    }
}

//! A write-once signal shared by every stage of one pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender};

/// Shared, write-once cancellation signal.
///
/// Clones observe the same signal. Once [`cancel`](CancellationToken::cancel) has been called the
/// token stays signalled for as long as any clone exists.
///
/// Besides the flag, the token owns a channel that nobody ever sends on. Signalling drops its only
/// sender, which makes [`signal`](CancellationToken::signal) permanently ready; threads blocked in
/// a `select!` on it are released.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

struct Inner {
    signalled: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl CancellationToken {
    /// Allocates a new, unsignalled token.
    pub fn new() -> Self {
        let (trigger, signal) = crossbeam_channel::bounded(0);
        CancellationToken {
            inner: Arc::new(Inner {
                signalled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    /// Signals the token.
    ///
    /// Returns `true` for the one call that moved the token from unsignalled to signalled, and
    /// `false` for every call after it.
    pub fn cancel(&self) -> bool {
        if self.inner.signalled.swap(true, Ordering::AcqRel) {
            return false;
        }
        // Only the call that flipped the flag gets here.
        self.inner.trigger.lock().unwrap_or_else(PoisonError::into_inner).take();
        true
    }

    /// True once the token has been signalled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.signalled.load(Ordering::Acquire)
    }

    /// A receiver that becomes ready, with a disconnection, once the token is signalled.
    ///
    /// Intended for use as one arm of a `crossbeam_channel::select!`; it never yields a value.
    #[inline]
    pub fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }

    /// Blocks the current thread until the token is signalled.
    pub fn wait(&self) {
        // Nothing is ever sent, so this only returns on disconnection.
        let _ = self.inner.signal.recv();
    }
}

impl Default for CancellationToken {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

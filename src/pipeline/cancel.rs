//! Cooperative cancellation shared by every pipeline stage.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

struct Inner {
    cancelled: AtomicBool,
    /// Never carries a message; closes when the guard sender is dropped,
    /// which makes cancellation selectable alongside channel operations.
    signal_rx: Receiver<()>,
    signal_tx: Mutex<Option<Sender<()>>>,
}

/// Token for cooperative cancellation of the pipeline.
///
/// Clone is cheap and shares state. Stages check [`is_cancelled`] at loop
/// iterations and combine [`signal`] with sends/receives via `select!` so a
/// cancelled pipeline never blocks on a full or empty queue.
///
/// [`is_cancelled`]: CancelToken::is_cancelled
/// [`signal`]: CancelToken::signal
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        let (signal_tx, signal_rx) = bounded::<()>(0);
        CancelToken {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                signal_rx,
                signal_tx: Mutex::new(Some(signal_tx)),
            }),
        }
    }

    /// Request cancellation. Idempotent; wakes every `select!` blocked on
    /// [`signal`](CancelToken::signal).
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.signal_tx.lock().unwrap().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Receiver that becomes permanently ready once the token is cancelled.
    pub fn signal(&self) -> &Receiver<()> {
        &self.inner.signal_rx
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        CancelToken::new()
    }
}

/// Blocking send that aborts when the token is cancelled or the receiver is
/// gone. Returns false on abort; the value is dropped.
pub fn send_or_cancel<T>(tx: &Sender<T>, value: T, cancel: &CancelToken) -> bool {
    crossbeam_channel::select! {
        send(tx, value) -> res => res.is_ok(),
        recv(cancel.signal()) -> _ => false,
    }
}

/// Blocking receive that returns None when the token is cancelled or the
/// channel is closed and drained.
pub fn recv_or_cancel<T>(rx: &Receiver<T>, cancel: &CancelToken) -> Option<T> {
    crossbeam_channel::select! {
        recv(rx) -> msg => msg.ok(),
        recv(cancel.signal()) -> _ => None,
    }
}

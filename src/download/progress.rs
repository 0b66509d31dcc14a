//! Progress notifications from a running pipeline.
//!
//! The pipeline never blocks on its observer: events go through a bounded
//! channel with `try_send`, and an event that does not fit is dropped. The
//! most recent event is also kept in a `watch` slot, so once every sender is
//! gone the receiver still gets the final state (normally
//! [`ProgressEvent::Reset`]) even if it was dropped from the channel.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::trace;

/// A progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A page attempt finished (fetched, or stopped the run).
    Page {
        /// Page number that was attempted.
        page: u32,
        /// Pages fetched so far.
        done: u32,
        /// Pages in the requested range.
        requested: u32,
        /// Rounded percentage of `done / requested`, 0..=100.
        percent: u8,
    },
    /// The run is over; observers should return to an idle display.
    Reset,
}

#[derive(Debug)]
struct SenderInner {
    events: mpsc::Sender<ProgressEvent>,
    latest: watch::Sender<Option<ProgressEvent>>,
}

/// Sending half handed to the pipeline.
///
/// A disabled sender (see [`ProgressSender::disabled`]) discards everything.
#[derive(Debug, Clone, Default)]
pub struct ProgressSender {
    inner: Option<Arc<SenderInner>>,
}

impl ProgressSender {
    /// A sender with no observer.
    #[must_use]
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Emits a page event for `page` after `done` of `requested` pages.
    pub fn page(&self, page: u32, done: u32, requested: u32) {
        self.send(ProgressEvent::Page {
            page,
            done,
            requested,
            percent: percent(done, requested),
        });
    }

    /// Emits the end-of-run reset.
    pub fn reset(&self) {
        self.send(ProgressEvent::Reset);
    }

    fn send(&self, event: ProgressEvent) {
        let Some(inner) = &self.inner else {
            return;
        };
        inner.latest.send_replace(Some(event));
        if let Err(error) = inner.events.try_send(event) {
            trace!(error = %error, "progress event dropped from channel");
        }
    }
}

/// Receiving half for the observer.
#[derive(Debug)]
pub struct ProgressReceiver {
    events: mpsc::Receiver<ProgressEvent>,
    latest: watch::Receiver<Option<ProgressEvent>>,
    last_delivered: Option<ProgressEvent>,
}

impl ProgressReceiver {
    /// Waits for the next event.
    ///
    /// Buffered events come first, in order. After every sender is dropped,
    /// the latest event is returned once more if the channel lost it; then
    /// `None`.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        if let Some(event) = self.events.recv().await {
            self.last_delivered = Some(event);
            return Some(event);
        }

        let latest = *self.latest.borrow_and_update();
        if latest.is_some() && latest != self.last_delivered {
            self.last_delivered = latest;
            return latest;
        }
        None
    }

    /// Most recent event sent, whether or not it was delivered yet.
    #[must_use]
    pub fn latest(&self) -> Option<ProgressEvent> {
        *self.latest.borrow()
    }
}

/// Creates a bounded progress channel.
#[must_use]
pub fn progress_channel(capacity: usize) -> (ProgressSender, ProgressReceiver) {
    let (events_tx, events_rx) = mpsc::channel(capacity.max(1));
    let (latest_tx, latest_rx) = watch::channel(None);
    let sender = ProgressSender {
        inner: Some(Arc::new(SenderInner {
            events: events_tx,
            latest: latest_tx,
        })),
    };
    let receiver = ProgressReceiver {
        events: events_rx,
        latest: latest_rx,
        last_delivered: None,
    };
    (sender, receiver)
}

/// Percentage of `done` out of `requested`, rounded half up and capped at 100.
///
/// An empty request reports 0.
#[must_use]
pub fn percent(done: u32, requested: u32) -> u8 {
    if requested == 0 {
        return 0;
    }
    let done = u64::from(done.min(requested));
    let requested = u64::from(requested);
    let rounded = (200 * done + requested) / (2 * requested);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

//! Progress bar for download runs, fed by the pipeline's progress channel.

use std::time::Duration;

use book_saver_core::{ProgressEvent, ProgressReceiver};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;

/// Spawns the progress bar task when `show` is true.
///
/// The task ends on [`ProgressEvent::Reset`] or when the pipeline drops its
/// sender. When `show` is false the receiver is dropped, which turns every
/// send on the pipeline side into a no-op.
pub(crate) fn spawn_progress_ui(
    show: bool,
    mut rx: ProgressReceiver,
) -> Option<JoinHandle<()>> {
    if !show {
        drop(rx);
        return None;
    }

    Some(tokio::spawn(async move {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_message("starting...");

        while let Some(event) = rx.recv().await {
            match event {
                ProgressEvent::Page {
                    page,
                    done,
                    requested,
                    percent,
                } => {
                    bar.set_position(u64::from(percent));
                    bar.set_message(page_message(page, done, requested));
                }
                ProgressEvent::Reset => {
                    bar.set_position(0);
                    break;
                }
            }
        }

        bar.finish_and_clear();
    }))
}

fn page_message(page: u32, done: u32, requested: u32) -> String {
    format!("page {page} [{done}/{requested}]")
}

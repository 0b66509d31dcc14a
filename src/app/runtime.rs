//! Wires configuration, validation, the pipeline, and the progress bar together.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use book_saver_core::download::{
    CONNECT_TIMEOUT_SECS, PROGRESS_CHANNEL_CAPACITY, READ_TIMEOUT_SECS,
};
use book_saver_core::{
    BookRoot, DownloadJob, HttpClient, PageCount, PageSelection, Pipeline, RetryPolicy,
    RunOutcome, RunReport, normalize, progress_channel, resolve_page_count, resolve_range,
    validate_reference,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::{config, progress, terminal};
use crate::cli::REFERENCE_PLACEHOLDER;

pub(crate) async fn run_book_saver() -> Result<ProcessExit> {
    let (cli, cli_sources) = config::parse_cli_with_sources();
    let file_config = config::load_default_file_config()?;
    let args = config::apply_config_defaults(cli, &cli_sources, file_config.as_ref());

    let default_level = config::resolve_default_log_level(&args);
    let force_cli_log_level = config::should_force_cli_log_level(&cli_sources);
    let no_color = terminal::is_no_color_requested(&args);
    terminal::init_tracing(default_level, force_cli_log_level, no_color);

    debug!(?args, "CLI arguments parsed");

    let reference = validate_reference(&args.reference, Some(REFERENCE_PLACEHOLDER))?;
    let selection: PageSelection = args.pages.parse()?;

    let client = HttpClient::with_timeouts(
        args.connect_timeout.unwrap_or(CONNECT_TIMEOUT_SECS),
        args.read_timeout.unwrap_or(READ_TIMEOUT_SECS),
    );
    let root = normalize(reference);
    info!(root = %root, identifier = root.identifier(), "book root resolved");

    let count = resolve_page_count(&client, &root).await;

    if args.probe {
        for line in probe_lines(&root, count) {
            println!("{line}");
        }
        return Ok(ProcessExit::Success);
    }

    let range = resolve_range(selection, count, args.page_ceiling)?;
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let job = DownloadJob::new(root, range, count, args.format.output_mode(), output_dir);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let (progress_tx, progress_rx) = progress_channel(PROGRESS_CHANNEL_CAPACITY);
    let show_progress = terminal::should_show_progress(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let progress_handle = progress::spawn_progress_ui(show_progress, progress_rx);

    let pipeline = Arc::new(Pipeline::with_retry_policy(
        client,
        RetryPolicy::with_max_retries(u32::from(args.page_retries)),
    ));
    let run = tokio::spawn({
        let pipeline = Arc::clone(&pipeline);
        async move { pipeline.run(job, progress_tx, cancel).await }
    });

    let result = run.await.context("download task failed");
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }
    let report = result?.context("download failed")?;

    if !args.quiet {
        println!("{}", summary_line(&report));
    }

    if report.outcome.is_cancelled() {
        warn!(
            fetched = report.pages_fetched,
            requested = report.pages_requested,
            "Interrupted. Run again with a narrower range to fetch the rest."
        );
        return Ok(ProcessExit::Interrupted);
    }

    Ok(ProcessExit::Success)
}

/// What a Ctrl-C does, given how many have arrived during the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptAction {
    /// Cancel the run; the pipeline finishes the current page and finalizes.
    StopAfterPage,
    /// Leave immediately without finalizing.
    ExitNow,
}

fn interrupt_action(signals: u32) -> InterruptAction {
    if signals <= 1 {
        InterruptAction::StopAfterPage
    } else {
        InterruptAction::ExitNow
    }
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut signals: u32 = 0;
        while tokio::signal::ctrl_c().await.is_ok() {
            signals = signals.saturating_add(1);
            match interrupt_action(signals) {
                InterruptAction::StopAfterPage => {
                    warn!("Interrupt received; stopping after the current page (Ctrl-C again to exit now)");
                    cancel.cancel();
                }
                InterruptAction::ExitNow => {
                    warn!("Second interrupt received; exiting without finalizing");
                    std::process::exit(i32::from(ProcessExit::Interrupted.code()));
                }
            }
        }
    });
}

fn probe_lines(root: &BookRoot, count: PageCount) -> Vec<String> {
    vec![
        format!("root: {root}"),
        format!("identifier: {}", root.identifier()),
        format!("pages: {count}"),
    ]
}

/// One-line description of a finished run.
fn summary_line(report: &RunReport) -> String {
    let fetched = report.pages_fetched;
    let requested = report.pages_requested;

    if fetched == 0 {
        let reason = match &report.outcome {
            RunOutcome::Completed => "no pages requested".to_string(),
            RunOutcome::StoppedEarly(reason) => reason.to_string(),
        };
        return format!(
            "No pages saved ({reason}); folder: {}",
            report.pages_dir.display()
        );
    }

    let saved = format!(
        "Saved {fetched}/{requested} pages to {}",
        report.output_path().display()
    );
    match &report.outcome {
        RunOutcome::Completed => saved,
        RunOutcome::StoppedEarly(reason) => format!("{saved} (stopped: {reason})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use book_saver_core::StopReason;

    fn report(fetched: u32, requested: u32, outcome: RunOutcome) -> RunReport {
        RunReport {
            output_name: "book1_1-20".to_string(),
            pages_dir: PathBuf::from("out/book1_1-20"),
            document: None,
            pages_fetched: fetched,
            pages_requested: requested,
            outcome,
        }
    }

    #[test]
    fn test_summary_line_completed() {
        let mut r = report(3, 3, RunOutcome::Completed);
        r.document = Some(PathBuf::from("out/book1_1-3.pdf"));
        assert_eq!(summary_line(&r), "Saved 3/3 pages to out/book1_1-3.pdf");
    }

    #[test]
    fn test_summary_line_stopped_early_names_reason() {
        let r = report(
            5,
            20,
            RunOutcome::StoppedEarly(StopReason::PageUnavailable { page: 6, status: 404 }),
        );
        assert_eq!(
            summary_line(&r),
            "Saved 5/20 pages to out/book1_1-20 (stopped: page 6 unavailable (HTTP 404))"
        );
    }

    #[test]
    fn test_summary_line_zero_pages() {
        let r = report(
            0,
            20,
            RunOutcome::StoppedEarly(StopReason::PageUnavailable { page: 1, status: 403 }),
        );
        let line = summary_line(&r);
        assert!(line.starts_with("No pages saved (page 1 unavailable"), "got: {line}");
        assert!(line.contains("out/book1_1-20"));
    }

    #[test]
    fn test_first_interrupt_stops_after_page_and_later_ones_exit() {
        assert_eq!(interrupt_action(1), InterruptAction::StopAfterPage);
        assert_eq!(interrupt_action(2), InterruptAction::ExitNow);
        assert_eq!(interrupt_action(u32::MAX), InterruptAction::ExitNow);
    }

    #[test]
    fn test_probe_lines() {
        let root = normalize("https://h.example/b/book1/index.html");
        let lines = probe_lines(&root, PageCount::Known(12));
        assert_eq!(
            lines,
            vec![
                "root: https://h.example/b/book1".to_string(),
                "identifier: book1".to_string(),
                "pages: 12".to_string(),
            ]
        );
        assert_eq!(probe_lines(&root, PageCount::Unknown)[2], "pages: unknown");
    }
}

//! CLI entry point for the book-saver tool.

use std::process::ExitCode;

mod app;
mod cli;

/// How the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// The run finished, including a run that found the end of the book early.
    Success,
    /// Invalid input or a failed run.
    Failure,
    /// The run was cancelled with Ctrl-C; partial output was still finalized.
    Interrupted,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Interrupted => 130,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match app::runtime::run_book_saver().await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::from(ProcessExit::Failure.code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ProcessExit;

    #[test]
    fn test_process_exit_codes() {
        assert_eq!(ProcessExit::Success.code(), 0);
        assert_eq!(ProcessExit::Failure.code(), 1);
        assert_eq!(ProcessExit::Interrupted.code(), 130);
    }
}

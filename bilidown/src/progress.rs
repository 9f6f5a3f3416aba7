//! Progress display for transfers.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use mesio::{ProgressSink, TransferState};

/// Hands out one progress sink per transfer.
pub trait ProgressReporter: Send + Sync {
    fn transfer(&self, label: &str) -> Box<dyn ProgressSink>;
}

/// Reports nothing; used with `--no-progress` and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn transfer(&self, _label: &str) -> Box<dyn ProgressSink> {
        Box::new(mesio::NoProgress)
    }
}

/// Terminal bars drawn on stderr, one per concurrent transfer.
#[derive(Debug, Clone)]
pub struct TerminalProgress {
    multi: MultiProgress,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::stderr()),
        }
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(
            "{msg:>6} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{msg:>6} {spinner:.yellow} {bytes} ({bytes_per_sec})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

impl ProgressReporter for TerminalProgress {
    fn transfer(&self, label: &str) -> Box<dyn ProgressSink> {
        let bar = self.multi.add(ProgressBar::no_length());
        bar.set_style(spinner_style());
        bar.set_message(label.to_string());
        Box::new(BarSink { bar })
    }
}

struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    fn sync(&self, state: &TransferState) {
        if let Some(total) = state.total_expected
            && self.bar.length() != Some(total)
        {
            self.bar.set_style(bar_style());
            self.bar.set_length(total);
        }
        self.bar.set_position(state.bytes_written);
    }
}

impl ProgressSink for BarSink {
    fn on_start(&self, state: &TransferState) {
        self.sync(state);
        if state.resumed_from > 0 {
            self.bar.reset_eta();
        }
    }

    fn on_progress(&self, state: &TransferState) {
        self.sync(state);
    }

    fn on_finish(&self, state: &TransferState) {
        self.sync(state);
        self.bar.finish_and_clear();
    }
}

impl Drop for BarSink {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_bar_follows_transfer_state() {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let reporter = TerminalProgress { multi };
        let bar = reporter.multi.add(ProgressBar::no_length());
        let sink = BarSink { bar: bar.clone() };

        let mut state = TransferState::new(Path::new("a.m4s"), 100, None);
        sink.on_start(&state);
        assert_eq!(bar.position(), 100);
        assert_eq!(bar.length(), None);

        state.total_expected = Some(1000);
        state.bytes_written = 600;
        sink.on_progress(&state);
        assert_eq!(bar.length(), Some(1000));
        assert_eq!(bar.position(), 600);

        sink.on_finish(&state);
        assert!(bar.is_finished());
    }

    #[test]
    fn test_silent_progress_accepts_updates() {
        let sink = SilentProgress.transfer("video");
        sink.on_progress(&TransferState::new(Path::new("a"), 0, Some(1)));
    }
}

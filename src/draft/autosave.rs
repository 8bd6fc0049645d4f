//! Threaded autosave timer.
//!
//! Ticks on a fixed interval and asks its target to save if dirty. The
//! thread is stopped (and joined) on teardown; dropping the handle signals
//! it to stop without waiting.

use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Result of one autosave tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveOutcome {
    Saved,
    /// Nothing changed since the last save.
    Clean,
    /// Another save was in flight; this tick was skipped.
    Coalesced,
    Failed,
    /// The controller was torn down.
    Stopped,
}

/// Something the autosave thread can tick.
pub trait AutosaveTarget: Send + Sync + 'static {
    fn autosave_tick(&self) -> AutosaveOutcome;
}

/// Statistics from the autosave thread.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AutosaveStats {
    pub ticks: usize,
    pub saves: usize,
    pub skipped_clean: usize,
    pub coalesced: usize,
    pub failures: usize,
}

impl AutosaveStats {
    fn record(&mut self, outcome: AutosaveOutcome) {
        self.ticks += 1;
        match outcome {
            AutosaveOutcome::Saved => self.saves += 1,
            AutosaveOutcome::Clean => self.skipped_clean += 1,
            AutosaveOutcome::Coalesced => self.coalesced += 1,
            AutosaveOutcome::Failed => self.failures += 1,
            AutosaveOutcome::Stopped => {}
        }
    }
}

/// A background thread that ticks an `AutosaveTarget` on an interval.
///
/// ## Example
///
/// ```ignore
/// let autosave = AutosaveThread::spawn(target, Duration::from_secs(30));
///
/// // ... user edits the form ...
///
/// let stats = autosave.stop();
/// println!("autosaved {} times", stats.saves);
/// ```
pub struct AutosaveThread {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<AutosaveStats>>,
}

impl AutosaveThread {
    pub fn spawn<T: AutosaveTarget>(target: Arc<T>, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = channel();

        let handle = thread::spawn(move || {
            let mut stats = AutosaveStats::default();

            loop {
                // Sleep for one interval, waking early on stop.
                match stop_rx.recv_timeout(interval) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }

                let outcome = target.autosave_tick();
                stats.record(outcome);
                if outcome == AutosaveOutcome::Stopped {
                    break;
                }
            }

            stats
        });

        tracing::debug!(interval_ms = interval.as_millis() as u64, "autosave started");
        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Signal the thread to stop and wait for it to finish.
    /// Returns the autosave statistics.
    pub fn stop(mut self) -> AutosaveStats {
        let _ = self.stop_tx.send(());
        let stats = match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => AutosaveStats::default(),
        };
        tracing::debug!(ticks = stats.ticks, saves = stats.saves, "autosave stopped");
        stats
    }

    /// Signal the thread to stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for AutosaveThread {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        // Don't join on drop - let the thread finish its current tick
    }
}

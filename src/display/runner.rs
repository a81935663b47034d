/// Timer-driven loop that merges shared state into history and renders it
use log::{debug, info};
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::display::views::{AnalyticsView, DashboardView, Frame, LogView, Renderer};
use crate::state::{AuditLog, HistoryWindow, RetentionPolicy, SharedState, Snapshot};

pub struct DisplayLoop {
    history: HistoryWindow,
    log: AuditLog,
    analytics_window: usize,
    last_snapshot: Snapshot,
}

impl DisplayLoop {
    pub fn new(retention: RetentionPolicy, analytics_window: usize) -> Self {
        DisplayLoop {
            history: HistoryWindow::new(retention.history_capacity),
            log: AuditLog::new(retention.log_capacity),
            analytics_window,
            last_snapshot: Snapshot::default(),
        }
    }

    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    pub fn log(&self) -> &AuditLog {
        &self.log
    }

    /// Drain the shared state and merge it into history and log
    ///
    /// Every drained entry lands in the log, and its reading in the history
    /// window, in arrival order. Returns the number of entries merged; an
    /// empty queue merges nothing.
    pub fn merge(&mut self, state: &SharedState) -> usize {
        let drained = state.drain();
        let merged = drained.entries.len();

        for entry in drained.entries {
            self.history.push(entry.reading.clone());
            self.log.push(entry);
        }

        self.last_snapshot = drained.snapshot;
        merged
    }

    pub fn frame(&self, new_entries: usize) -> Frame<'_> {
        Frame {
            rendered_at: OffsetDateTime::now_utc(),
            new_entries,
            dashboard: DashboardView::build(&self.last_snapshot, &self.history),
            log: LogView::new(&self.log),
            analytics: AnalyticsView::build(&self.history, &self.log, self.analytics_window),
        }
    }

    /// One display cycle: merge, then render
    pub fn tick<R: Renderer>(&mut self, state: &SharedState, renderer: &mut R) -> usize {
        let merged = self.merge(state);
        if merged > 0 {
            debug!(
                "Merged {} entries (history {}, log {})",
                merged,
                self.history.len(),
                self.log.len()
            );
        }
        renderer.render(&self.frame(merged));
        merged
    }

    /// Tick every `period` until `shutdown` turns true
    pub async fn run<R: Renderer>(
        mut self,
        state: SharedState,
        mut renderer: R,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Display loop started ({:?} interval)", period);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(&state, &mut renderer);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(
            "Display loop stopped after logging {} entries",
            self.log.total_appended()
        );
        self
    }
}

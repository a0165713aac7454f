//! Progress events emitted by the orchestrator and read by the presentation layer.
//!
//! Extraction of a paginated PDF reports real fractional progress. The model call
//! exposes no incremental signal, so comparison progress follows a fixed schedule.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::session::slot::SlotId;

/// Which unit of work a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extracting(SlotId),
    Comparing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Progress {
    Idle,
    Started { stage: Stage },
    Advanced { stage: Stage, percent: u8 },
    Done { stage: Stage },
}

/// Per-session progress channel. Cloning shares the same channel.
#[derive(Clone)]
pub struct ProgressReporter {
    tx: Arc<watch::Sender<Progress>>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Progress::Idle);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Progress {
        self.tx.borrow().clone()
    }

    pub fn stage(&self, stage: Stage) -> StageReporter {
        StageReporter {
            reporter: self.clone(),
            stage,
        }
    }

    fn start(&self, stage: Stage) {
        self.tx.send_replace(Progress::Started { stage });
    }

    /// Advances only while `stage` is the active one, and never backwards.
    fn advance(&self, stage: Stage, percent: u8) {
        let percent = percent.min(100);
        self.tx.send_if_modified(|current| {
            let floor = match current {
                Progress::Started { stage: s } if *s == stage => 0,
                Progress::Advanced { stage: s, percent: p } if *s == stage => *p,
                _ => return false,
            };
            if percent <= floor {
                return false;
            }
            *current = Progress::Advanced { stage, percent };
            true
        });
    }

    fn done(&self, stage: Stage) {
        self.tx.send_replace(Progress::Done { stage });
    }
}

/// A reporter bound to one stage; handed to extractors and the comparison ticker.
#[derive(Clone)]
pub struct StageReporter {
    reporter: ProgressReporter,
    stage: Stage,
}

impl StageReporter {
    /// A reporter nobody listens to.
    #[cfg(test)]
    pub fn detached(stage: Stage) -> Self {
        ProgressReporter::new().stage(stage)
    }

    pub fn start(&self) {
        self.reporter.start(self.stage);
    }

    pub fn advance(&self, percent: u8) {
        self.reporter.advance(self.stage, percent);
    }

    /// Reports `done` of `total` units as a percentage.
    pub fn advance_fraction(&self, done: usize, total: usize) {
        if total == 0 {
            return;
        }
        let percent = (done.min(total) * 100 / total) as u8;
        self.advance(percent);
    }

    pub fn done(&self) {
        self.reporter.done(self.stage);
    }

    /// Spawns a ticker that advances 1% per `tick` up to 99%.
    /// Abort the returned handle once the real work finishes.
    pub fn spawn_fixed_schedule(&self, tick: Duration) -> JoinHandle<()> {
        let reporter = self.clone();
        tokio::spawn(async move {
            for percent in 1..=99u8 {
                tokio::time::sleep(tick).await;
                reporter.advance(percent);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_is_monotonic() {
        let progress = ProgressReporter::new();
        let stage = progress.stage(Stage::Comparing);
        stage.start();
        stage.advance(40);
        stage.advance(10);
        assert_eq!(
            progress.current(),
            Progress::Advanced {
                stage: Stage::Comparing,
                percent: 40
            }
        );
    }

    #[test]
    fn test_advance_ignored_after_done() {
        let progress = ProgressReporter::new();
        let stage = progress.stage(Stage::Comparing);
        stage.start();
        stage.done();
        stage.advance(50);
        assert_eq!(
            progress.current(),
            Progress::Done {
                stage: Stage::Comparing
            }
        );
    }

    #[test]
    fn test_advance_ignored_for_inactive_stage() {
        let progress = ProgressReporter::new();
        progress.stage(Stage::Extracting(SlotId::A)).start();
        progress.stage(Stage::Comparing).advance(30);
        assert_eq!(
            progress.current(),
            Progress::Started {
                stage: Stage::Extracting(SlotId::A)
            }
        );
    }

    #[test]
    fn test_advance_fraction_reports_page_share() {
        let progress = ProgressReporter::new();
        let stage = progress.stage(Stage::Extracting(SlotId::B));
        stage.start();
        stage.advance_fraction(1, 4);
        assert_eq!(
            progress.current(),
            Progress::Advanced {
                stage: Stage::Extracting(SlotId::B),
                percent: 25
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_schedule_advances_until_aborted() {
        let progress = ProgressReporter::new();
        let stage = progress.stage(Stage::Comparing);
        stage.start();
        let ticker = stage.spawn_fixed_schedule(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(2_000)).await;
        ticker.abort();

        assert_eq!(
            progress.current(),
            Progress::Advanced {
                stage: Stage::Comparing,
                percent: 99
            }
        );
    }

    #[test]
    fn test_progress_serializes_with_event_tag() {
        let json = serde_json::to_value(Progress::Advanced {
            stage: Stage::Extracting(SlotId::A),
            percent: 50,
        })
        .unwrap();
        assert_eq!(json["event"], "advanced");
        assert_eq!(json["percent"], 50);
        assert_eq!(json["stage"]["extracting"], "a");
    }
}

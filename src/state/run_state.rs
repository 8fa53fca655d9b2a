use crate::{LexiError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Phase of the process-wide indexing campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// No crawl run is active
    Idle,

    /// `active` crawl runs of campaign `generation` are still working
    Running { generation: u64, active: usize },

    /// A stop was requested and sites are being marked failed
    Stopping,
}

/// The single "is indexing running" state shared by every crawl run
///
/// All transitions are atomic check-and-act updates on a watch channel, so
/// two concurrent starts cannot both succeed and observers can wait for the
/// campaign to finish.
#[derive(Debug)]
pub struct RunState {
    phase: watch::Sender<RunPhase>,
    next_generation: AtomicU64,
}

impl RunState {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(RunPhase::Idle);
        Self {
            phase,
            next_generation: AtomicU64::new(1),
        }
    }

    /// Current phase
    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    /// Returns true unless the campaign is idle
    pub fn is_running(&self) -> bool {
        !matches!(self.phase(), RunPhase::Idle)
    }

    /// Starts a campaign of `runs` crawl runs
    ///
    /// Fails with `AlreadyRunning` unless idle. A campaign with no runs
    /// leaves the state idle.
    pub fn begin(&self, runs: usize) -> Result<u64> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let mut started = false;

        self.phase.send_if_modified(|phase| match phase {
            RunPhase::Idle => {
                started = true;
                if runs > 0 {
                    *phase = RunPhase::Running {
                        generation,
                        active: runs,
                    };
                    true
                } else {
                    false
                }
            }
            _ => false,
        });

        if started {
            Ok(generation)
        } else {
            Err(LexiError::AlreadyRunning)
        }
    }

    /// Adds one run to the current campaign, starting one if idle
    ///
    /// Fails with `AlreadyRunning` while a stop is in progress.
    pub fn join(&self) -> Result<u64> {
        let fresh = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let mut joined = None;

        self.phase.send_if_modified(|phase| match phase {
            RunPhase::Idle => {
                *phase = RunPhase::Running {
                    generation: fresh,
                    active: 1,
                };
                joined = Some(fresh);
                true
            }
            RunPhase::Running { generation, active } => {
                *active += 1;
                joined = Some(*generation);
                true
            }
            RunPhase::Stopping => false,
        });

        joined.ok_or(LexiError::AlreadyRunning)
    }

    /// Records the end of one run of `generation`
    ///
    /// The last run of a campaign returns the state to idle. Runs of a
    /// campaign that was already stopped are ignored.
    pub fn finish(&self, generation: u64) {
        self.phase.send_if_modified(|phase| match phase {
            RunPhase::Running {
                generation: current,
                active,
            } if *current == generation => {
                *active = active.saturating_sub(1);
                if *active == 0 {
                    *phase = RunPhase::Idle;
                }
                true
            }
            _ => false,
        });
    }

    /// Moves a running campaign to `Stopping`
    ///
    /// Fails with `NotRunning` when idle or already stopping.
    pub fn request_stop(&self) -> Result<()> {
        let mut stopping = false;

        self.phase.send_if_modified(|phase| match phase {
            RunPhase::Running { .. } => {
                *phase = RunPhase::Stopping;
                stopping = true;
                true
            }
            _ => false,
        });

        if stopping {
            Ok(())
        } else {
            Err(LexiError::NotRunning)
        }
    }

    /// Completes a stop started with `request_stop`
    pub fn stopped(&self) {
        self.phase.send_if_modified(|phase| {
            if matches!(phase, RunPhase::Stopping) {
                *phase = RunPhase::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Waits until the campaign is idle
    pub async fn wait_until_idle(&self) {
        let mut rx = self.phase.subscribe();
        // The sender lives in self, so the channel cannot close while we wait
        let _ = rx.wait_for(|phase| matches!(phase, RunPhase::Idle)).await;
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

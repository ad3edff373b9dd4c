//! Run coordinator
//!
//! Drives sync cycles in one of two modes:
//! - single-shot: take the instance lock, run one cycle, release, exit
//! - poll: run a cycle, sleep out the rest of the period, repeat
//!
//! Control events arrive on a channel. Terminate stops the loop after the
//! in-flight cycle, or immediately while sleeping. Reload rebuilds the cycle
//! before the next one starts. A cycle is never interrupted.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::SyncError;
use crate::lock::{InstanceLock, LockError};
use crate::scheduler::cycle::{Cycle, CycleFactory, CycleSetup};
use crate::service::SyncReport;
use crate::signals::ControlEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Polling,
    Stopping,
    Stopped,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
    LockBusy,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Completed => 0,
            Outcome::Failed => 1,
            Outcome::LockBusy => 2,
        }
    }
}

/// Time left in the period once a cycle took `elapsed`
pub fn sleep_duration(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}

pub struct RunCoordinator {
    factory: Arc<dyn CycleFactory>,
    events: mpsc::Receiver<ControlEvent>,
    events_open: bool,
    force_full: bool,
    reload_requested: bool,
    state: CoordinatorState,
}

impl RunCoordinator {
    /// Creates a coordinator
    ///
    /// # Arguments
    /// * `factory` - Rebuilds the cycle on reload
    /// * `events` - Control events, usually forwarded from process signals
    /// * `force_full` - Make the first cycle a full resync
    pub fn new(factory: Arc<dyn CycleFactory>, events: mpsc::Receiver<ControlEvent>, force_full: bool) -> Self {
        Self {
            factory,
            events,
            events_open: true,
            force_full,
            reload_requested: false,
            state: CoordinatorState::Idle,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Runs exactly one cycle under the instance lock
    pub async fn run_once(&mut self, setup: &CycleSetup) -> Outcome {
        let lock = match InstanceLock::acquire(&setup.lock_path, setup.lock_timeout).await {
            Ok(lock) => lock,
            Err(LockError::Timeout { path, waited }) => {
                error!(
                    "Failed to acquire the lock file {:?} within {:?}. Is a process already running?",
                    path, waited
                );
                return Outcome::LockBusy;
            }
            Err(e) => {
                error!("{}", e);
                return Outcome::Failed;
            }
        };

        debug!("Holding lock file {:?}", lock.path());
        self.state = CoordinatorState::Polling;
        let result = spawn_cycle(setup.cycle.clone(), self.force_full).await;
        self.state = CoordinatorState::Stopped;
        drop(lock);

        if log_cycle_result(result) {
            Outcome::Completed
        } else {
            Outcome::Failed
        }
    }

    /// Runs cycles every `poll_period` until terminated
    ///
    /// Failed cycles are logged and the loop carries on.
    pub async fn run_poll(&mut self, mut setup: CycleSetup) -> Outcome {
        info!("Starting poll loop (period: {:?})", setup.poll_period);
        let mut force_full = self.force_full;

        loop {
            self.drain_events();
            if self.state == CoordinatorState::Stopping {
                break;
            }
            if self.reload_requested {
                self.reload_requested = false;
                setup = self.reload(setup);
            }

            self.state = CoordinatorState::Polling;
            let started = Instant::now();
            let mut handle = spawn_cycle(setup.cycle.clone(), force_full);
            force_full = false;

            let result = loop {
                tokio::select! {
                    result = &mut handle => break result,
                    event = self.events.recv(), if self.events_open => self.on_event(event),
                }
            };
            log_cycle_result(result);

            if self.state == CoordinatorState::Stopping {
                info!("Stopping after the current cycle");
                break;
            }
            self.state = CoordinatorState::Idle;

            let pause = sleep_duration(setup.poll_period, started.elapsed());
            debug!("Sleeping {:?} until the next cycle", pause);
            if !self.sleep(pause).await {
                break;
            }
        }

        self.state = CoordinatorState::Stopped;
        info!("Poll loop stopped");
        Outcome::Completed
    }

    /// Sleeps while handling events; `false` when asked to terminate
    async fn sleep(&mut self, pause: Duration) -> bool {
        let sleep = tokio::time::sleep(pause);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                event = self.events.recv(), if self.events_open => {
                    self.on_event(event);
                    if self.state == CoordinatorState::Stopping {
                        info!("Terminating while idle");
                        return false;
                    }
                }
            }
        }
    }

    fn drain_events(&mut self) {
        while self.events_open {
            match self.events.try_recv() {
                Ok(event) => self.on_event(Some(event)),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => self.on_event(None),
            }
        }
    }

    fn on_event(&mut self, event: Option<ControlEvent>) {
        match event {
            Some(ControlEvent::Terminate) => {
                debug!("Termination requested");
                self.state = CoordinatorState::Stopping;
            }
            Some(ControlEvent::Reload) => {
                debug!("Reload requested");
                self.reload_requested = true;
            }
            None => {
                debug!("Control channel closed");
                self.events_open = false;
            }
        }
    }

    fn reload(&self, current: CycleSetup) -> CycleSetup {
        match self.factory.build() {
            Ok(setup) => {
                info!("Reloaded configuration");
                setup
            }
            Err(e) => {
                warn!("Reload failed, keeping the previous configuration: {:#}", e);
                current
            }
        }
    }
}

fn spawn_cycle(cycle: Arc<dyn Cycle>, force_full: bool) -> JoinHandle<Result<SyncReport, SyncError>> {
    let span = info_span!("cycle", id = %Uuid::new_v4());
    tokio::spawn(async move { cycle.run(force_full).await }.instrument(span))
}

/// Logs how a cycle ended; `true` on success
fn log_cycle_result(result: Result<Result<SyncReport, SyncError>, JoinError>) -> bool {
    match result {
        Ok(Ok(report)) => {
            info!("Sync finished: {}", report);
            true
        }
        Ok(Err(e)) => {
            error!("Sync failed: {}", e);
            false
        }
        Err(e) => {
            error!("Sync task panicked: {}", e);
            false
        }
    }
}

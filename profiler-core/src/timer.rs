use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::{info, warn};

use crate::extractor::StackSource;
use crate::manager::ContextManager;

/// How long `stop` waits for the sample loop to notice before abandoning
/// the thread (spec §4.4: "joined with a bounded timeout (default 3 s)").
/// Abandoning just means we stop waiting and drop the `JoinHandle`; the
/// thread is a process daemon and exits on its own next iteration.
const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(3);

// === TimerState === //

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimerState {
    Stopped,
    Running,
    /// `stop` has been requested; the loop thread hasn't yet observed it.
    Stopping,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TimerError {
    #[error("timer is already running")]
    AlreadyRunning,

    #[error("timer is not running")]
    NotRunning,
}

// === Timer === //

/// The periodic driver: every `interval_ms`, snapshot the context manager
/// and `collect` one sample into each live context (spec §4.4). Exactly one
/// timer may be `Running` at a time process-wide — see [`GlobalTimer`].
pub struct Timer {
    interval: Duration,
    context_manager: Arc<ContextManager>,
    stack_source: Arc<dyn StackSource>,
    state: Arc<Mutex<TimerState>>,
    state_changed: Arc<Condvar>,
    join_handle: Option<JoinHandle<()>>,
}

impl Timer {
    pub fn new(
        interval_ms: u32,
        context_manager: Arc<ContextManager>,
        stack_source: Arc<dyn StackSource>,
    ) -> Self {
        Self {
            interval: Duration::from_millis(u64::from(interval_ms.max(crate::config::MIN_INTERVAL_MS))),
            context_manager,
            stack_source,
            state: Arc::new(Mutex::new(TimerState::Stopped)),
            state_changed: Arc::new(Condvar::new()),
            join_handle: None,
        }
    }

    pub fn state(&self) -> TimerState {
        *self.state.lock()
    }

    /// `stopped → running`. Spawns the sample loop thread.
    pub fn start(&mut self) -> Result<(), TimerError> {
        {
            let mut state = self.state.lock();
            if *state != TimerState::Stopped {
                return Err(TimerError::AlreadyRunning);
            }
            *state = TimerState::Running;
        }

        let interval = self.interval;
        let context_manager = self.context_manager.clone();
        let stack_source = self.stack_source.clone();
        let state = self.state.clone();
        let state_changed = self.state_changed.clone();

        self.join_handle = Some(
            std::thread::Builder::new()
                .name("profiler-timer".to_string())
                .spawn(move || run_sample_loop(interval, &context_manager, &*stack_source, &state, &state_changed))
                .expect("failed to spawn profiler timer thread"),
        );

        info!(interval_ms = interval.as_millis() as u64, "sampling timer started");
        Ok(())
    }

    /// `running → stopped`, cooperatively: sets the state to `Stopping` and
    /// waits up to `timeout` for the loop thread to reach `Stopped`. If it
    /// doesn't in time, the thread is abandoned (spec §4.4, §9: "the timer
    /// must not prevent process exit").
    pub fn stop(&mut self) -> Result<(), TimerError> {
        self.stop_with_timeout(DEFAULT_STOP_TIMEOUT)
    }

    pub fn stop_with_timeout(&mut self, timeout: Duration) -> Result<(), TimerError> {
        {
            let mut state = self.state.lock();
            if *state == TimerState::Stopped {
                return Err(TimerError::NotRunning);
            }
            *state = TimerState::Stopping;
            self.state_changed.notify_all();
        }

        let reached_stopped = {
            let mut state = self.state.lock();
            let deadline = Instant::now() + timeout;
            let mut timed_out = false;
            while *state != TimerState::Stopped && !timed_out {
                let result = self.state_changed.wait_until(&mut state, deadline);
                timed_out = result.timed_out();
            }
            *state == TimerState::Stopped
        };

        match self.join_handle.take() {
            Some(handle) if reached_stopped => {
                let _ = handle.join();
            }
            Some(_) => {
                warn!("timer thread did not stop within the timeout; abandoning it");
            }
            None => {}
        }

        Ok(())
    }
}

fn run_sample_loop(
    interval: Duration,
    context_manager: &ContextManager,
    stack_source: &(dyn StackSource),
    state: &Mutex<TimerState>,
    state_changed: &Condvar,
) {
    loop {
        let tick_start = Instant::now();

        for ctx in context_manager.snapshot() {
            match stack_source.capture(ctx.thread_handle()) {
                Ok(raw) => ctx.collect(raw),
                Err(err) => {
                    warn!(%err, "stack capture failed; skipping this context for this tick");
                }
            }
        }

        let elapsed = tick_start.elapsed();
        let sleep_for = interval.saturating_sub(elapsed);

        let mut guard = state.lock();
        if *guard != TimerState::Running {
            break;
        }
        if !sleep_for.is_zero() {
            let deadline = Instant::now() + sleep_for;
            while *guard == TimerState::Running && Instant::now() < deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                let _ = state_changed.wait_for(&mut guard, remaining);
            }
        }
        if *guard != TimerState::Running {
            break;
        }
    }

    *state.lock() = TimerState::Stopped;
    state_changed.notify_all();
}

// === GlobalTimer === //

/// Process-wide "only one timer may run" cell (spec §9). A plain
/// `Mutex<Option<Timer>>` behind a `OnceLock`, with explicit `start`/`stop`
/// entry points — deliberately not a lazily-initialized static with its own
/// startup behavior.
pub struct GlobalTimer;

static GLOBAL_TIMER: OnceLock<Mutex<Option<Timer>>> = OnceLock::new();

fn slot() -> &'static Mutex<Option<Timer>> {
    GLOBAL_TIMER.get_or_init(|| Mutex::new(None))
}

impl GlobalTimer {
    /// Install and start `timer` as the process-wide timer. Fails if one is
    /// already installed.
    pub fn start(mut timer: Timer) -> Result<(), TimerError> {
        let mut guard = slot().lock();
        if guard.is_some() {
            return Err(TimerError::AlreadyRunning);
        }
        timer.start()?;
        *guard = Some(timer);
        Ok(())
    }

    /// Stop and remove the process-wide timer, if any.
    pub fn stop() -> Result<(), TimerError> {
        let mut guard = slot().lock();
        match guard.take() {
            Some(mut timer) => timer.stop(),
            None => Err(TimerError::NotRunning),
        }
    }

    pub fn is_running() -> bool {
        slot()
            .lock()
            .as_ref()
            .map(|t| t.state() == TimerState::Running)
            .unwrap_or(false)
    }
}

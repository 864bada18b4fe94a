use std::{
    fmt,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use strum::Display;
use thiserror::Error;
use tokio::{
    sync::{self, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};

use crate::{
    config::{CoordinatorConfig, DeviceConfig},
    data::{normalize::normalize, snapshot::Snapshot},
    hardware::blowcontrol::{
        Availability, AvailabilityGate, Cli, Command, CommandRunner, Direction, ExecError,
    },
};

/* === Definitions === */

/// Owns the device snapshot, polls the bridge and notifies listeners.
pub struct Coordinator {
    inner: Arc<Inner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
    name: String,
    config: DeviceConfig,
    runner: Arc<dyn CommandRunner>,
    gate: AvailabilityGate,
    scan_interval: Duration,

    cycle: sync::Mutex<()>,
    published: watch::Sender<Published>,

    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

pub type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct ListenerId(u64);

#[derive(Copy, Clone, Debug, Default, Display, Eq, PartialEq)]
pub enum Phase {
    #[default]
    Idle,
    Polling,
    Ready,
}

/// Snapshot and status are published together so that readers never see one
/// cycle's snapshot with another cycle's status.
#[derive(Clone, Debug, Default)]
struct Published {
    snapshot: Option<Arc<Snapshot>>,
    status: Status,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Status {
    pub phase: Phase,
    /// The latest snapshot is synthetic rather than a device reading.
    pub degraded: bool,
    pub last_update_success: bool,
}

/// Where a snapshot came from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Source {
    Device,
    Synthetic(Fallback),
}

/// Why the synthetic snapshot was used instead of a reading.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Fallback {
    /// The availability probe failed, the bridge is not called at all.
    Unavailable,
    InterfaceMissing,
    Timeout,
    MalformedResponse,
    ExitStatus(Option<i32>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Fetched {
    pub snapshot: Snapshot,
    pub source: Source,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    Updated(Source),
    /// Another cycle was already in flight.
    Suppressed,
}

#[derive(Debug, Error)]
#[error("Error communicating with BlowControl device: {0}")]
pub struct UpdateFailed(#[source] pub ExecError);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("BlowControl CLI failed (exit status {status:?}): {stderr}")]
    Rejected { status: Option<i32>, stderr: String },

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/* === Implementations === */

impl Coordinator {
    pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(30);
    const MIN_SCAN_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(config: DeviceConfig, runner: Arc<dyn CommandRunner>, scan_interval: Duration) -> Self {
        let inner = Inner {
            name: format!("BlowControl {}", config.serial_number),
            config,
            runner,
            gate: AvailabilityGate::new(),
            scan_interval: scan_interval.max(Self::MIN_SCAN_INTERVAL),

            cycle: sync::Mutex::new(()),
            published: watch::channel(Published::default()).0,

            listeners: Mutex::default(),
            next_listener: AtomicU64::new(0),
        };

        Coordinator {
            inner: Arc::new(inner),
            task: Mutex::default(),
        }
    }

    pub fn from_config(device: DeviceConfig, config: &CoordinatorConfig) -> Self {
        let runner = Arc::new(Cli::from_config(&device, config));
        Self::new(device, runner, config.scan_interval())
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.inner.config
    }

    pub fn scan_interval(&self) -> Duration {
        self.inner.scan_interval
    }

    /* == State == */

    /// The latest snapshot, `None` before the first successful cycle.
    pub fn data(&self) -> Option<Arc<Snapshot>> {
        self.inner.published.borrow().snapshot.clone()
    }

    pub fn status(&self) -> Status {
        self.inner.published.borrow().status
    }

    /// The latest snapshot together with the status of the cycle that produced it.
    pub fn current(&self) -> (Option<Arc<Snapshot>>, Status) {
        let published = self.inner.published.borrow();
        (published.snapshot.clone(), published.status)
    }

    pub fn phase(&self) -> Phase {
        self.status().phase
    }

    pub fn degraded(&self) -> bool {
        self.status().degraded
    }

    pub fn last_update_success(&self) -> bool {
        self.status().last_update_success
    }

    pub fn availability(&self) -> Availability {
        self.inner.gate.status()
    }

    /* == Listeners == */

    /// Registers a callback invoked once per poll cycle. Registering the same
    /// callback twice results in two invocations.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));

        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));

        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let count = listeners.len();
        listeners.retain(|(listener, _)| *listener != id);

        listeners.len() != count
    }

    pub fn notify_all(&self) {
        self.inner.notify_all();
    }

    /* == Polling == */

    /// Performs one poll cycle now. Returns `Outcome::Suppressed` if a cycle is
    /// already in flight.
    pub async fn refresh(&self) -> Result<Outcome, UpdateFailed> {
        self.inner.refresh().await
    }

    /// Reads the device without publishing anything.
    pub async fn fetch(&self) -> Result<Fetched, UpdateFailed> {
        self.inner.fetch().await
    }

    /// Starts the background poll timer. The first scheduled cycle happens one
    /// interval from now, call `refresh` for an immediate one.
    pub fn start(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);

        if task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        tracing::debug!("Starting {} (every {:?})", self.inner.name, self.inner.scan_interval);
        *task = Some(tokio::spawn(poll_task(self.inner.clone())));
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn shutdown(&self) {
        if let Some(task) = self.task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            tracing::debug!("Stopping {}", self.inner.name);
            task.abort();
        }
    }

    /* == Commands == */

    pub async fn set_power(&self, on: bool) -> Result<(), CommandError> {
        self.issue(Command::Power(on.into())).await
    }

    /// Sets the canonical speed level (0–4). Out of range levels are sent as 0.
    pub async fn set_speed(&self, level: u8) -> Result<(), CommandError> {
        self.issue(Command::speed(level)).await
    }

    pub async fn set_oscillation(&self, enabled: bool) -> Result<(), CommandError> {
        self.issue(Command::oscillation(enabled)).await
    }

    pub async fn set_direction(&self, direction: Direction) -> Result<(), CommandError> {
        self.issue(Command::direction(direction)).await
    }

    async fn issue(&self, command: Command) -> Result<(), CommandError> {
        let inner = &self.inner;

        if !inner.gate.is_available(inner.runner.as_ref()).await {
            tracing::info!("BlowControl CLI not available, `{command}` not sent");
            return Ok(());
        }

        let output = inner
            .runner
            .run(&command)
            .await
            .inspect_err(|err| tracing::error!("Error sending `{command}`: {err}"))?;

        if !output.success() {
            tracing::error!("Failed to send `{command}`: {}", output.stderr.trim());

            return Err(CommandError::Rejected {
                status: output.status,
                stderr: output.stderr,
            });
        }

        Ok(())
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("name", &self.inner.name)
            .field("status", &self.status())
            .field("availability", &self.availability())
            .finish()
    }
}

impl Inner {
    async fn refresh(&self) -> Result<Outcome, UpdateFailed> {
        let Ok(_cycle) = self.cycle.try_lock() else {
            tracing::debug!("Poll cycle already in flight, skipping");
            return Ok(Outcome::Suppressed);
        };

        self.published.send_modify(|published| published.status.phase = Phase::Polling);

        let result = match self.fetch().await {
            Ok(Fetched { snapshot, source }) => {
                self.published.send_replace(Published {
                    snapshot: Some(Arc::new(snapshot)),
                    status: Status {
                        phase: Phase::Ready,
                        degraded: source != Source::Device,
                        last_update_success: true,
                    },
                });

                Ok(Outcome::Updated(source))
            }

            Err(err) => {
                tracing::error!("{err}");

                self.published.send_modify(|published| {
                    let status = &mut published.status;

                    status.phase = match published.snapshot {
                        Some(_) => Phase::Ready,
                        None => Phase::Idle,
                    };
                    status.last_update_success = false;
                });

                Err(err)
            }
        };

        self.notify_all();

        result
    }

    async fn fetch(&self) -> Result<Fetched, UpdateFailed> {
        if !self.gate.is_available(self.runner.as_ref()).await {
            return Ok(Fetched::synthetic(Fallback::Unavailable));
        }

        let fallback = match self.runner.run(&Command::State).await {
            Ok(output) if output.success() => {
                match serde_json::from_str(&output.stdout) {
                    Ok(document) => {
                        return Ok(Fetched {
                            snapshot: normalize(&document, Utc::now()),
                            source: Source::Device,
                        });
                    }

                    Err(err) => {
                        tracing::warn!("Failed to parse BlowControl state JSON: {err}");
                        Fallback::MalformedResponse
                    }
                }
            }

            Ok(output) => {
                tracing::warn!("BlowControl CLI failed: {}", output.stderr.trim());
                Fallback::ExitStatus(output.status)
            }

            Err(ExecError::Unavailable(err)) => {
                tracing::warn!("BlowControl CLI not available: {err}");
                Fallback::InterfaceMissing
            }

            Err(ExecError::Timeout(duration)) => {
                tracing::warn!("BlowControl CLI timed out after {duration:?}");
                Fallback::Timeout
            }

            Err(err @ ExecError::Io(_)) => return Err(UpdateFailed(err)),
        };

        tracing::info!("Falling back to synthetic data ({fallback})");

        Ok(Fetched::synthetic(fallback))
    }

    fn notify_all(&self) {
        // Cloned out of the lock so that listeners may call back into the coordinator
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener();
        }
    }
}

#[tracing::instrument(skip_all, fields(coordinator = %inner.name))]
async fn poll_task(inner: Arc<Inner>) {
    let period = inner.scan_interval;
    let mut timer = interval_at(Instant::now() + period, period);

    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        timer.tick().await;

        // Failures are logged by the cycle itself, the next tick is the retry
        let _ = inner.refresh().await;
    }
}

impl Default for Status {
    fn default() -> Self {
        Status {
            phase: Phase::Idle,
            degraded: false,
            last_update_success: true,
        }
    }
}

impl Fetched {
    fn synthetic(fallback: Fallback) -> Self {
        Fetched {
            snapshot: Snapshot::synthetic(),
            source: Source::Synthetic(fallback),
        }
    }
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::Unavailable => write!(f, "bridge unavailable"),
            Fallback::InterfaceMissing => write!(f, "bridge could not be launched"),
            Fallback::Timeout => write!(f, "bridge timed out"),
            Fallback::MalformedResponse => write!(f, "malformed response"),
            Fallback::ExitStatus(Some(code)) => write!(f, "exit status {code}"),
            Fallback::ExitStatus(None) => write!(f, "terminated by signal"),
        }
    }
}

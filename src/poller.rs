use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, watch},
    time::MissedTickBehavior,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, trace, warn, Instrument};

use crate::{
    externals::device_api::services::{ApiError, DeviceApiService},
    models::{
        connection_state::{ConnectionState, Telemetry},
        sensor_reading::SensorReading,
    },
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(5000);

/// Cadence of the telemetry cycles and the bound on each fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

#[derive(Error, Debug)]
pub enum CycleFailure {
    #[error("Telemetry fetch timed out after {0:?}.")]
    TimedOut(Duration),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type CycleOutcome = Result<SensorReading, CycleFailure>;

/// Outcome of one cycle, tagged with the order in which it was issued.
#[derive(Debug)]
pub struct CycleResult {
    pub sequence: u64,
    pub outcome: CycleOutcome,
}

/// What applying a cycle result did to the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// A newer cycle was already applied. Nothing changed.
    Stale,

    /// The reading was replaced. `transition` holds the new connection state
    /// when it differs from the previous one.
    Updated { transition: Option<ConnectionState> },
}

/// Liveness state machine. Cycles may complete out of order; only results
/// issued after the last applied one are taken into account.
#[derive(Debug, Default)]
pub struct ConnectionMonitor {
    telemetry: Telemetry,
    last_applied: Option<u64>,
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn apply(&mut self, sequence: u64, outcome: &CycleOutcome) -> Applied {
        if self.last_applied.is_some_and(|last| sequence <= last) {
            return Applied::Stale;
        }
        self.last_applied = Some(sequence);

        let (next, reading) = match outcome {
            Ok(reading) => (ConnectionState::Connected, reading.clone()),
            Err(_) => (ConnectionState::Disconnected, SensorReading::placeholder()),
        };
        self.telemetry.reading = reading;

        if self.telemetry.connection == next {
            return Applied::Updated { transition: None };
        }
        self.telemetry.connection = next;
        Applied::Updated {
            transition: Some(next),
        }
    }
}

/// Fetch telemetry once, bounded by `timeout`. A timeout counts as a failure.
pub async fn run_cycle<S: DeviceApiService + ?Sized>(
    service: &S,
    timeout: Duration,
) -> CycleOutcome {
    match tokio::time::timeout(timeout, service.fetch_telemetry()).await {
        Err(_) => Err(CycleFailure::TimedOut(timeout)),
        Ok(result) => Ok(result?),
    }
}

/// Task: Issues a telemetry cycle immediately and then on every tick of
/// `settings.interval`, whether or not earlier cycles have returned.
/// Publishes every applied result on `tx_telemetry` and every change of
/// connection state on `tx_transition`.
/// Can be cancelled. Cycles still in flight at cancellation run to completion
/// on `cycles` but their results are dropped.
#[tracing::instrument(skip_all)]
pub async fn task_poll_device_telemetry<S: DeviceApiService + 'static>(
    token: CancellationToken,
    cycles: TaskTracker,
    service: Arc<S>,
    settings: PollerSettings,
    tx_telemetry: watch::Sender<Telemetry>,
    tx_transition: broadcast::Sender<ConnectionState>,
) {
    info!("Started.");

    let (tx_result, mut rx_result) = mpsc::unbounded_channel::<CycleResult>();
    let mut monitor = ConnectionMonitor::new();
    let mut ticker = tokio::time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut issued: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            Some(result) = rx_result.recv() => {
                business_logic(&mut monitor, result, &tx_telemetry, &tx_transition);
            },
            _ = ticker.tick() => {
                issued += 1;
                spawn_cycle(&cycles, service.clone(), settings.timeout, issued, tx_result.clone());
            }
        }
    }
}

fn spawn_cycle<S: DeviceApiService + 'static>(
    cycles: &TaskTracker,
    service: Arc<S>,
    timeout: Duration,
    sequence: u64,
    tx_result: mpsc::UnboundedSender<CycleResult>,
) {
    trace!("Issuing cycle {}.", sequence);
    cycles.spawn(
        async move {
            let outcome = run_cycle(service.as_ref(), timeout).await;
            if tx_result.send(CycleResult { sequence, outcome }).is_err() {
                debug!("Poller stopped. Dropping result.");
            }
        }
        .instrument(tracing::debug_span!("cycle", sequence)),
    );
}

/// Perform task business logic. Apply a finished cycle and publish whatever
/// changed.
fn business_logic(
    monitor: &mut ConnectionMonitor,
    result: CycleResult,
    tx_telemetry: &watch::Sender<Telemetry>,
    tx_transition: &broadcast::Sender<ConnectionState>,
) {
    trace!("Executing business logic.");
    if let Err(e) = &result.outcome {
        debug!("Cycle {} failed. Error: {}", result.sequence, e);
    }

    match monitor.apply(result.sequence, &result.outcome) {
        Applied::Stale => {
            debug!("Discarded stale result of cycle {}.", result.sequence);
        }
        Applied::Updated { transition } => {
            tx_telemetry.send_replace(monitor.telemetry().clone());
            trace!("Published {}.", monitor.telemetry());

            if let Some(state) = transition {
                info!("Connection state changed to {}.", state);
                if let Err(e) = tx_transition.send(state) {
                    debug!("Nobody is listening for connection changes. Error: {}", e);
                }
            }
        }
    }
}

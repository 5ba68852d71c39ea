use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, warn};

use crate::{
    dispatcher::{CommandDispatcher, DispatchError},
    externals::device_api::services::DeviceApiService,
    models::{
        connection_state::{ConnectionState, Telemetry},
        line_buffer::LineBuffer,
        target::Target,
    },
    poller::{task_poll_device_telemetry, PollerSettings},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("The session is already running.")]
    AlreadyRunning,

    #[error("The session was stopped and cannot be started again.")]
    Stopped,
}

/// Outcome of a submission running in the background.
#[derive(Debug)]
pub struct Submission {
    pub target: Target,
    pub result: Result<(), DispatchError>,
}

type SharedDispatcher<S> = Arc<Mutex<CommandDispatcher<S>>>;

/// Owns the telemetry poller and one command dispatcher per display.
///
/// `start` begins polling, `stop` tears the session down: no cycle is issued
/// afterwards and results of cycles still in flight are dropped.
///
/// Each dispatcher sits behind its own lock. Submissions to one display run
/// one at a time, while the two displays never wait on each other.
pub struct Session<S: DeviceApiService + 'static> {
    service: Arc<S>,
    settings: PollerSettings,
    token: CancellationToken,
    tracker: TaskTracker,
    lifecycle: Lifecycle,
    tx_telemetry: Option<watch::Sender<Telemetry>>,
    rx_telemetry: watch::Receiver<Telemetry>,
    tx_transition: broadcast::Sender<ConnectionState>,
    lcd1: SharedDispatcher<S>,
    lcd2: SharedDispatcher<S>,
}

impl<S: DeviceApiService + 'static> Session<S> {
    /// Create an idle session. Cancelling `token` also stops the poller.
    pub fn new(token: CancellationToken, service: Arc<S>, settings: PollerSettings) -> Self {
        let (tx_telemetry, rx_telemetry) = watch::channel(Telemetry::default());
        let (tx_transition, _) = broadcast::channel(16);

        Self {
            lcd1: Arc::new(Mutex::new(CommandDispatcher::new(Target::Lcd1, service.clone()))),
            lcd2: Arc::new(Mutex::new(CommandDispatcher::new(Target::Lcd2, service.clone()))),
            service,
            settings,
            token: token.child_token(),
            tracker: TaskTracker::new(),
            lifecycle: Lifecycle::Idle,
            tx_telemetry: Some(tx_telemetry),
            rx_telemetry,
            tx_transition,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Spawn the poller. The first cycle is issued immediately.
    #[tracing::instrument(skip_all)]
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.lifecycle {
            Lifecycle::Running => return Err(SessionError::AlreadyRunning),
            Lifecycle::Stopped => return Err(SessionError::Stopped),
            Lifecycle::Idle => {}
        }
        let Some(tx_telemetry) = self.tx_telemetry.take() else {
            return Err(SessionError::Stopped);
        };

        let token = self.token.clone();
        let cycles = self.tracker.clone();
        let service = self.service.clone();
        let settings = self.settings;
        let tx_transition = self.tx_transition.clone();
        self.tracker.spawn(async move {
            task_poll_device_telemetry(token, cycles, service, settings, tx_telemetry, tx_transition)
                .await
        });

        self.lifecycle = Lifecycle::Running;
        info!(
            "Session started. Polling every {:?} with a {:?} timeout.",
            self.settings.interval, self.settings.timeout
        );
        Ok(())
    }

    /// Stop polling and wait for every spawned task to finish. Cycles in
    /// flight run out, pending submissions are abandoned. Calling it again
    /// does nothing.
    #[tracing::instrument(skip_all)]
    pub async fn stop(&mut self) {
        if self.lifecycle == Lifecycle::Stopped {
            debug!("Session already stopped.");
            return;
        }
        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        self.tx_telemetry = None;
        self.lifecycle = Lifecycle::Stopped;
        info!("Session stopped.");
    }

    pub fn telemetry(&self) -> Telemetry {
        self.rx_telemetry.borrow().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.rx_telemetry.borrow().connection
    }

    /// Receiver for connection state changes only.
    pub fn subscribe_transitions(&self) -> broadcast::Receiver<ConnectionState> {
        self.tx_transition.subscribe()
    }

    /// Submit and edit controls are only enabled while the session is running
    /// and the device is reachable.
    pub fn controls_enabled(&self) -> bool {
        self.lifecycle == Lifecycle::Running && self.connection_state().is_connected()
    }

    fn dispatcher(&self, target: Target) -> &SharedDispatcher<S> {
        match target {
            Target::Lcd1 => &self.lcd1,
            Target::Lcd2 => &self.lcd2,
        }
    }

    /// Copy of the pending lines of `target`. Fails while a submission to the
    /// same display is in flight.
    pub fn buffer(&self, target: Target) -> Result<LineBuffer, DispatchError> {
        let dispatcher = self
            .dispatcher(target)
            .try_lock()
            .map_err(|_| DispatchError::Busy(target))?;
        Ok(dispatcher.buffer().clone())
    }

    pub fn edit_line(
        &self,
        target: Target,
        line: usize,
        text: &str,
    ) -> Result<(), DispatchError> {
        let mut dispatcher = self
            .dispatcher(target)
            .try_lock()
            .map_err(|_| DispatchError::Busy(target))?;
        dispatcher
            .edit_line(line, text)
            .map_err(|source| DispatchError::InvalidLine { target, source })
    }

    /// Send the pending lines of `target` and wait for the device. Refused
    /// while disconnected.
    pub async fn submit(&self, target: Target) -> Result<(), DispatchError> {
        if !self.controls_enabled() {
            warn!("Refusing to send to {} while disconnected.", target);
            return Err(DispatchError::Disconnected(target));
        }
        self.dispatcher(target).lock().await.submit().await
    }

    /// Send the pending lines of `target` in the background and report the
    /// outcome on `tx_submission`. Refused at once while disconnected.
    pub fn spawn_submit(
        &self,
        target: Target,
        tx_submission: mpsc::UnboundedSender<Submission>,
    ) -> Result<(), DispatchError> {
        if !self.controls_enabled() {
            warn!("Refusing to send to {} while disconnected.", target);
            return Err(DispatchError::Disconnected(target));
        }

        let token = self.token.clone();
        let dispatcher = self.dispatcher(target).clone();
        self.tracker.spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => {
                    warn!("Abandoned pending message to {}.", target);
                    return;
                },
                result = async { dispatcher.lock().await.submit().await } => result,
            };
            if tx_submission.send(Submission { target, result }).is_err() {
                debug!("Nobody is waiting for the outcome of the message to {}.", target);
            }
        });
        Ok(())
    }
}

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use futures::{future::BoxFuture, FutureExt};

use crate::models::{command_payload::CommandPayload, sensor_reading::SensorReading, target::Target};

use super::services::{ApiError, DeviceApiService};

/// What the scripted device answers to one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Distance(String),
    Accepted,
    Status(u16),
}

#[derive(Debug, Clone)]
struct Step {
    target: Option<Target>,
    delay: Duration,
    reply: Reply,
}

impl Step {
    fn exhausted() -> Self {
        Self {
            target: None,
            delay: Duration::ZERO,
            reply: Reply::Status(503),
        }
    }
}

/// `DeviceApiService` double replaying scripted replies in order.
/// Once a script runs out every further request answers with status 503.
#[derive(Default)]
pub struct ScriptedDeviceApi {
    telemetry: Mutex<VecDeque<Step>>,
    commands: Mutex<VecDeque<Step>>,
    fetch_calls: AtomicUsize,
    sent: Mutex<Vec<(Target, CommandPayload)>>,
}

impl ScriptedDeviceApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_distance(self, distance: &str) -> Self {
        self.then_telemetry(Duration::ZERO, Reply::Distance(distance.to_string()))
    }

    pub fn then_telemetry(self, delay: Duration, reply: Reply) -> Self {
        self.telemetry.lock().unwrap().push_back(Step {
            target: None,
            delay,
            reply,
        });
        self
    }

    /// Answer the next command, whichever display it is for.
    pub fn then_command(self, reply: Reply) -> Self {
        self.commands.lock().unwrap().push_back(Step {
            target: None,
            delay: Duration::ZERO,
            reply,
        });
        self
    }

    /// Answer the next command sent to `target` after `delay`.
    pub fn then_command_to(self, target: Target, delay: Duration, reply: Reply) -> Self {
        self.commands.lock().unwrap().push_back(Step {
            target: Some(target),
            delay,
            reply,
        });
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(Target, CommandPayload)> {
        self.sent.lock().unwrap().clone()
    }

    fn next(script: &Mutex<VecDeque<Step>>, target: Option<Target>) -> Step {
        let mut script = script.lock().unwrap();
        let position = script
            .iter()
            .position(|step| step.target.is_none() || step.target == target);
        position
            .and_then(|index| script.remove(index))
            .unwrap_or_else(Step::exhausted)
    }
}

async fn wait(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

impl DeviceApiService for ScriptedDeviceApi {
    fn fetch_telemetry(&self) -> BoxFuture<'_, Result<SensorReading, ApiError>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let step = Self::next(&self.telemetry, None);
        async move {
            wait(step.delay).await;
            match step.reply {
                Reply::Distance(distance) => Ok(SensorReading::new(distance)),
                Reply::Accepted => Ok(SensorReading::placeholder()),
                Reply::Status(status) => Err(ApiError::UnexpectedStatus(status)),
            }
        }
        .boxed()
    }

    fn send_command(
        &self,
        target: Target,
        payload: CommandPayload,
    ) -> BoxFuture<'_, Result<(), ApiError>> {
        self.sent.lock().unwrap().push((target, payload));
        let step = Self::next(&self.commands, Some(target));
        async move {
            wait(step.delay).await;
            match step.reply {
                Reply::Status(status) => Err(ApiError::UnexpectedStatus(status)),
                _ => Ok(()),
            }
        }
        .boxed()
    }
}

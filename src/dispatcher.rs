use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    externals::device_api::services::{ApiError, DeviceApiService},
    models::{
        command_payload::CommandPayload,
        line_buffer::{LineBuffer, LineBufferError},
        target::Target,
    },
    validation,
};

#[derive(Error, Debug)]
pub enum DispatchError {
    /// A line holds a character the displays cannot show. Nothing was sent.
    #[error(
        "The text contains disallowed characters. Please use only letters, numbers and common symbols."
    )]
    DisallowedCharacters { target: Target, line: usize },

    /// The device did not accept the command. The typed lines were kept.
    #[error("Could not send the message to {target}.")]
    SubmissionFailed {
        target: Target,
        #[source]
        source: ApiError,
    },

    /// Controls are disabled until the device is reachable.
    #[error("{0} is unavailable while the device is disconnected.")]
    Disconnected(Target),

    /// A previous message to this display is still waiting for the device.
    #[error("A message to {0} is still being sent.")]
    Busy(Target),

    #[error("{source}")]
    InvalidLine {
        target: Target,
        source: LineBufferError,
    },
}

impl DispatchError {
    pub fn target(&self) -> Target {
        match self {
            DispatchError::DisallowedCharacters { target, .. } => *target,
            DispatchError::SubmissionFailed { target, .. } => *target,
            DispatchError::Disconnected(target) => *target,
            DispatchError::Busy(target) => *target,
            DispatchError::InvalidLine { target, .. } => *target,
        }
    }
}

/// Owns the pending lines for one display and sends them on request.
pub struct CommandDispatcher<S: DeviceApiService> {
    target: Target,
    service: Arc<S>,
    buffer: LineBuffer,
}

impl<S: DeviceApiService> CommandDispatcher<S> {
    pub fn new(target: Target, service: Arc<S>) -> Self {
        Self {
            target,
            service,
            buffer: LineBuffer::new(target),
        }
    }

    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    /// Replace the text of a 1-based line. Text longer than the display's row
    /// width is truncated.
    pub fn edit_line(&mut self, line: usize, text: &str) -> Result<(), LineBufferError> {
        self.buffer.set_line(line, text)
    }

    /// Validate the buffer and send it to the display.
    /// On success the buffer is cleared. On any error it is left as it was.
    #[instrument(skip_all, fields(display = %self.target))]
    pub async fn submit(&mut self) -> Result<(), DispatchError> {
        for (index, line) in self.buffer.lines().iter().enumerate() {
            if let Some(c) = validation::first_disallowed(line) {
                warn!("Line {} holds disallowed character {:?}. Not sending.", index + 1, c);
                return Err(DispatchError::DisallowedCharacters {
                    target: self.target,
                    line: index + 1,
                });
            }
        }

        let payload = CommandPayload::from(&self.buffer);
        debug!("Sending {}.", payload);

        match self.service.send_command(self.target, payload).await {
            Err(e) => {
                warn!("Failed to send command. Error: {}", e);
                Err(DispatchError::SubmissionFailed {
                    target: self.target,
                    source: e,
                })
            }
            Ok(()) => {
                info!("Command delivered.");
                self.buffer.clear();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::externals::device_api::testing::{Reply, ScriptedDeviceApi};

    use super::*;

    fn dispatcher(
        target: Target,
        service: &Arc<ScriptedDeviceApi>,
        lines: &[&str],
    ) -> CommandDispatcher<ScriptedDeviceApi> {
        let mut dispatcher = CommandDispatcher::new(target, service.clone());
        for (index, line) in lines.iter().enumerate() {
            dispatcher
                .edit_line(index + 1, line)
                .expect("Failed to edit line.");
        }
        dispatcher
    }

    #[tokio::test]
    async fn test_successful_submit_clears_buffer() {
        let service = Arc::new(ScriptedDeviceApi::new().then_command(Reply::Accepted));
        let mut lcd1 = dispatcher(Target::Lcd1, &service, &["Hello", "World"]);

        lcd1.submit().await.expect("Submit should succeed.");

        assert_eq!(lcd1.buffer().lines(), ["", ""]);
        let sent = service.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, Target::Lcd1);
        assert_eq!(
            serde_json::to_string(&sent[0].1).unwrap(),
            r#"{"line1":"Hello","line2":"World"}"#
        );
    }

    #[tokio::test]
    async fn test_disallowed_characters_never_reach_network() {
        let service = Arc::new(ScriptedDeviceApi::new());
        let mut lcd2 = dispatcher(Target::Lcd2, &service, &["Bad~Char", "", "", ""]);
        let before = lcd2.buffer().clone();

        let err = lcd2.submit().await.unwrap_err();

        assert!(matches!(
            err,
            DispatchError::DisallowedCharacters {
                target: Target::Lcd2,
                line: 1
            }
        ));
        assert!(err.to_string().contains("disallowed characters"));
        assert!(service.sent().is_empty());
        assert_eq!(lcd2.buffer(), &before);
    }

    #[tokio::test]
    async fn test_any_invalid_line_blocks_submission() {
        let service = Arc::new(ScriptedDeviceApi::new());
        let mut lcd2 = dispatcher(Target::Lcd2, &service, &["ok", "fine", "still ok", "<nope>"]);

        let err = lcd2.submit().await.unwrap_err();

        assert!(matches!(err, DispatchError::DisallowedCharacters { line: 4, .. }));
        assert!(service.sent().is_empty());
        assert_eq!(lcd2.buffer().lines()[3], "<nope>");
    }

    #[tokio::test]
    async fn test_rejected_submit_keeps_buffer() {
        let service = Arc::new(ScriptedDeviceApi::new().then_command(Reply::Status(500)));
        let mut lcd1 = dispatcher(Target::Lcd1, &service, &["Hello", "World"]);

        let err = lcd1.submit().await.unwrap_err();

        assert!(matches!(
            err,
            DispatchError::SubmissionFailed {
                target: Target::Lcd1,
                source: ApiError::UnexpectedStatus(500)
            }
        ));
        assert_eq!(err.to_string(), "Could not send the message to LCD 1 (16x2).");
        assert_eq!(lcd1.buffer().lines(), ["Hello", "World"]);
    }

    #[tokio::test]
    async fn test_resubmitting_after_failure_sends_same_content() {
        let service = Arc::new(
            ScriptedDeviceApi::new()
                .then_command(Reply::Status(502))
                .then_command(Reply::Accepted),
        );
        let mut lcd1 = dispatcher(Target::Lcd1, &service, &["Retry", "me"]);

        assert!(lcd1.submit().await.is_err());
        assert!(lcd1.submit().await.is_ok());

        let sent = service.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, sent[1].1);
        assert!(lcd1.buffer().is_empty());
    }

    #[tokio::test]
    async fn test_empty_buffer_is_sent_with_all_keys() {
        let service = Arc::new(ScriptedDeviceApi::new().then_command(Reply::Accepted));
        let mut lcd2 = CommandDispatcher::new(Target::Lcd2, service.clone());

        lcd2.submit().await.expect("Submit should succeed.");

        assert_eq!(service.sent()[0].1.len(), 4);
        assert_eq!(lcd2.buffer().len(), 4);
    }
}

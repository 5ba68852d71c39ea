use std::io;

use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    dispatcher::DispatchError,
    externals::device_api::services::DeviceApiService,
    session::{Session, Submission},
};

use super::commands::{ConsoleCommand, HELP};

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Submitted,
    Quit,
}

async fn say<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}

async fn report<W: AsyncWrite + Unpin>(output: &mut W, submission: Submission) -> io::Result<()> {
    match submission.result {
        Ok(()) => say(output, &format!("Message sent to {}.", submission.target)).await,
        Err(e) => say(output, &e.to_string()).await,
    }
}

/// Task: Read operator commands line by line and apply them to the session.
/// Messages are sent in the background and reported once the device answers.
/// Ends on `quit`, cancellation, or end of input once every pending message
/// has been reported.
#[tracing::instrument(skip_all)]
pub async fn task_operator_console<S, R, W>(
    token: CancellationToken,
    session: &Session<S>,
    input: R,
    mut output: W,
) where
    S: DeviceApiService + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Started.");
    let mut lines = input.lines();
    let mut input_open = true;
    let mut pending = 0usize;
    let (tx_submission, mut rx_submission) = mpsc::unbounded_channel();

    if let Err(e) = say(&mut output, "Type 'help' for a list of commands.").await {
        error!("Failed to write to console. Error: {}", e);
        return;
    }

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            Some(submission) = rx_submission.recv() => {
                pending = pending.saturating_sub(1);
                if let Err(e) = report(&mut output, submission).await {
                    error!("Failed to write to console. Error: {}", e);
                    break;
                }
                if !input_open && pending == 0 {
                    break;
                }
            },
            line = lines.next_line(), if input_open => match line {
                Ok(Some(line)) => match business_logic(session, &line, &tx_submission, &mut output).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Submitted) => pending += 1,
                    Ok(Flow::Quit) => {
                        info!("Operator quit.");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to write to console. Error: {}", e);
                        break;
                    }
                },
                Ok(None) => {
                    info!("Input closed.");
                    if pending == 0 {
                        break;
                    }
                    debug!("Waiting for {} pending message(s).", pending);
                    input_open = false;
                }
                Err(e) => {
                    error!("Failed to read operator input. Error: {}", e);
                    break;
                }
            },
        }
    }
}

/// Perform task business logic. Parse one line and run it against the session.
async fn business_logic<S, W>(
    session: &Session<S>,
    line: &str,
    tx_submission: &mpsc::UnboundedSender<Submission>,
    output: &mut W,
) -> io::Result<Flow>
where
    S: DeviceApiService + 'static,
    W: AsyncWrite + Unpin,
{
    if line.trim().is_empty() {
        return Ok(Flow::Continue);
    }

    let command = match line.parse::<ConsoleCommand>() {
        Ok(command) => command,
        Err(e) => {
            say(output, &e.to_string()).await?;
            return Ok(Flow::Continue);
        }
    };
    debug!("Operator command: {:?}", command);

    match command {
        ConsoleCommand::Status => {
            let telemetry = session.telemetry();
            say(output, &format!("Connection: {}", telemetry.connection)).await?;
            say(output, &format!("Distance: {}", telemetry.reading)).await?;
        }
        ConsoleCommand::Show(target) => match session.buffer(target) {
            Ok(buffer) => say(output, &format!("{}\n{}", target, buffer)).await?,
            Err(e) => say(output, &e.to_string()).await?,
        },
        ConsoleCommand::Set { target, line, text } => {
            if !session.controls_enabled() {
                say(output, &DispatchError::Disconnected(target).to_string()).await?;
            } else if let Err(e) = session.edit_line(target, line, &text) {
                say(output, &e.to_string()).await?;
            }
        }
        ConsoleCommand::Send(target) => {
            match session.spawn_submit(target, tx_submission.clone()) {
                Ok(()) => return Ok(Flow::Submitted),
                Err(e) => say(output, &e.to_string()).await?,
            }
        }
        ConsoleCommand::Help => say(output, HELP).await?,
        ConsoleCommand::Quit => return Ok(Flow::Quit),
    }

    Ok(Flow::Continue)
}

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::broadcast::Receiver,
};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::models::connection_state::ConnectionState;

/// Task: Announce every connection state change on `output` as it happens.
/// Can be cancelled.
#[tracing::instrument(skip_all)]
pub async fn task_connection_event_logging<W: AsyncWrite + Unpin>(
    token: CancellationToken,
    rx_transition: Receiver<ConnectionState>,
    mut output: W,
) {
    info!("Started.");
    let mut transitions = BroadcastStream::new(rx_transition);
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            event = transitions.next() => match event {
                Some(Ok(state)) => {
                    info!("Got connection event: {}", state);
                    let line = format!("[connection] {}\n", state);
                    if let Err(e) = output.write_all(line.as_bytes()).await {
                        error!("Failed to announce connection event. Error: {}", e);
                    }
                    if let Err(e) = output.flush().await {
                        error!("Failed to flush connection event. Error: {}", e);
                    }
                }
                Some(Err(e)) => {
                    warn!("Missed connection events. Error: {}", e);
                }
                None => {
                    info!("Connection events closed.");
                    break;
                }
            },
        };
    }
}

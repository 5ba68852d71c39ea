use std::io::{self, BufRead, Cursor};

use tokio::{io::AsyncBufRead, sync::mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::io::StreamReader;
use tracing::{debug, error};

pub mod commands;
pub mod task;

/// Operator input from stdin.
///
/// Lines are read on a dedicated thread so a pending read never holds up
/// runtime shutdown.
pub fn stdin_lines() -> impl AsyncBufRead + Unpin {
    let (tx_lines, rx_lines) = mpsc::unbounded_channel::<io::Result<Cursor<Vec<u8>>>>();

    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let chunk = line.map(|mut line| {
                line.push('\n');
                Cursor::new(line.into_bytes())
            });
            let failed = chunk.is_err();
            if let Err(e) = &chunk {
                error!("Failed to read stdin. Error: {}", e);
            }
            if tx_lines.send(chunk).is_err() || failed {
                break;
            }
        }
        debug!("Stdin reader finished.");
    });

    StreamReader::new(UnboundedReceiverStream::new(rx_lines))
}

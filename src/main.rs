use anyhow::Result;
use clap::Parser;
use lcd_remote_control::{
    config::Config,
    externals::{
        device_api::DeviceApiModule,
        event_logging::task::task_connection_event_logging,
        operator_console::{stdin_lines, task::task_operator_console},
    },
    session::Session,
};
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // NOTE: Logs go to stderr so the console owns stdout.
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    let tracker = TaskTracker::new();

    let token = CancellationToken::new();

    let DeviceApiModule { service } = DeviceApiModule::initialize(config.base_url.clone())?;
    info!("Controlling device at {}.", service.base_url());

    let mut session = Session::new(token.clone(), service, config.poller_settings());

    let token_clone = token.clone();
    let rx_transition = session.subscribe_transitions();
    tracker.spawn(async move {
        task_connection_event_logging(token_clone, rx_transition, tokio::io::stdout()).await
    });

    session.start()?;

    let token_clone = token.clone();
    tokio::select! {
        _ = task_operator_console(token_clone, &session, stdin_lines(), tokio::io::stdout()) => {},
        res = signal::ctrl_c() => {
            match res {
                Ok(_) => {
                    info!("Received ctrl-c.");
                },
                Err(e) => {
                    tracing::error!("Failed to listen for ctrl_c. Error: {}", e);
                }
            };
        },
    }

    token.cancel();
    session.stop().await;

    tracker.close();
    tracker.wait().await;

    Ok(())
}

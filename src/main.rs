use log::{error, info, warn};
use tokio::sync::watch;
use tokio::time::{timeout, Duration};

use smartpot_monitor::config::MonitorConfig;
use smartpot_monitor::display::{ConsoleRenderer, DisplayLoop};
use smartpot_monitor::mqtt::MessageReceiver;
use smartpot_monitor::state::SharedState;

const RECEIVER_STOP_TIMEOUT_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match MonitorConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    info!("Starting smart pot monitor");
    info!(
        "Broker {}:{}, refresh every {:?}, history {} readings, log {}",
        config.broker.host,
        config.broker.port,
        config.refresh_interval,
        config.retention.history_capacity,
        match config.retention.log_capacity {
            Some(capacity) => format!("{} entries", capacity),
            None => "unbounded".to_string(),
        }
    );

    let state = SharedState::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let receiver = MessageReceiver::new(config.broker.clone(), config.topics.clone(), state.clone());
    let receiver_handle = tokio::spawn(receiver.run(shutdown_rx.clone()));

    // Handle Ctrl+C gracefully
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Program terminated by user. Shutting down."),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                // Keep the sender alive so the loops keep running
                std::future::pending::<()>().await;
            }
        }
        let _ = shutdown_tx.send(true);
    });

    let display = DisplayLoop::new(config.retention, config.analytics_window);
    let display = display
        .run(state, ConsoleRenderer::new(), config.refresh_interval, shutdown_rx)
        .await;

    match timeout(Duration::from_secs(RECEIVER_STOP_TIMEOUT_SECS), receiver_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("MQTT receiver task failed: {}", e),
        Err(_) => warn!("MQTT receiver did not stop in time"),
    }

    info!(
        "Exiting with {} readings in history and {} log entries",
        display.history().len(),
        display.log().len()
    );
    Ok(())
}

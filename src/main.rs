use color_eyre::{eyre::eyre, Result};
use oscleash::bridge::{Bridge, LoopSettings};
use oscleash::config::BridgeConfig;
use oscleash::osc::{OscListener, OscSender, TransportError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = BridgeConfig::default_path()?;
    let config = BridgeConfig::load_or_create(&config_path).await?;
    print_banner(&config);

    let routes = config.parameters.address_table();
    let listener = match OscListener::bind(config.listen_addr(), routes).await {
        Ok(listener) => listener,
        Err(e @ TransportError::PortUnavailable { .. }) => {
            error!("{}", e);
            return Err(eyre!("Refusing to start: {}", e));
        }
        Err(e) => return Err(e.into()),
    };

    let sender = OscSender::connect(config.send_addr()?).await?;
    info!("Sending movement to {}", sender.target());

    let cancel = CancellationToken::new();
    let bridge = Bridge::start(
        listener,
        Arc::new(sender),
        LoopSettings::from(&config),
        cancel,
    );

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to listen for Ctrl-C: {}", e))?;
    info!("Shutting down");

    let report = bridge.shutdown().await;
    info!(
        "Sent {} commands over {} ticks, applied {} updates ({} malformed)",
        report.loop_stats.commands,
        report.loop_stats.ticks,
        report.listener_stats.applied,
        report.listener_stats.malformed
    );
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

fn print_banner(config: &BridgeConfig) {
    info!("OSCLeash is running");
    if config.is_localhost() {
        info!("IP: Localhost");
    } else {
        info!("IP: {} | Not Localhost? Wack.", config.ip);
    }
    info!("Listening on port: {}", config.listening_port);
    info!("Sending to port: {}", config.sending_port);
    info!(
        "Run deadzone {:.3}% of stretch",
        config.run_deadzone * 100.0
    );
    info!(
        "Walking deadzone {:.3}% of stretch",
        config.walk_deadzone * 100.0
    );
    info!(
        "Delays of {}ms & {}ms",
        config.active_delay * 1000.0,
        config.inactive_delay * 1000.0
    );
}

use anyhow::Context;
use clap::Parser;
use gpumon_agent::config::Config;
use gpumon_agent::driver;
use gpumon_agent::shutdown::ShutdownSignal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_json);

    // Installed before NVML comes up so no interrupt can skip its shutdown
    let signal = ShutdownSignal::install().context("failed to install signal handlers")?;

    let driver = driver::start(&config)
        .await
        .context("GPU monitor failed to start")?;

    let summary = if config.once {
        // A signal during the pass is absorbed; the pass finishes and exits
        let summary = driver.run_once().await;
        drop(signal);
        summary
    } else {
        driver.run_until(signal.recv()).await
    };

    info!(
        ticks = summary.ticks,
        devices = summary.last_tick.devices,
        succeeded = summary.last_tick.succeeded,
        failed = summary.last_tick.failed,
        state = ?summary.state,
        "GPU monitor stopped"
    );

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

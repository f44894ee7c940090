//! Pomodoro Timer - a work/break session timer driven from the terminal
//!
//! This is the main entry point for the pomodoro-timer application.

use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

use pomodoro_timer::{
    config::{Config, Mode, Settings},
    engine::{dispatcher::HELP, ClockDriver},
    lifecycle::Lifecycle,
    services::{analytics, notifier_for, JsonLinesLog, SessionRecorder, StdinSource, DEFAULT_QUEUE_CAPACITY},
    utils::shutdown_signal,
};

fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Logs go to stderr so they never tear the progress line on stdout
    tracing_subscriber::fmt()
        .with_env_filter(format!("pomodoro_timer={}", config.log_level()))
        .with_writer(std::io::stderr)
        .init();

    let settings = config.resolve()?;

    if let Mode::Stats { recent } = config.mode() {
        let summary = analytics::summarize_file(&settings.log_file, recent)?;
        println!("{}", summary);
        return Ok(());
    }

    // A pending stdin read cannot be cancelled, so the runtime gets a bounded
    // shutdown instead of waiting on it at drop
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(settings));
    runtime.shutdown_timeout(Duration::from_millis(250));
    result
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let cycle = settings.cycle;
    info!("Starting pomodoro-timer v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: work={}s, short break={}s, long break={}s, long break every {} sessions",
        cycle.work_duration_seconds(),
        cycle.short_break_duration_seconds(),
        cycle.long_break_duration_seconds(),
        cycle.sessions_before_long_break()
    );

    let (recorder, writer) = SessionRecorder::spawn(JsonLinesLog::new(&settings.log_file), DEFAULT_QUEUE_CAPACITY);
    let engine = Arc::new(ClockDriver::new(cycle, recorder, notifier_for(settings.sound_enabled)));

    println!("Welcome to the pomodoro timer");
    println!("{}", HELP);

    let mut lifecycle = Lifecycle::launch(Arc::clone(&engine), StdinSource::stdin(), settings.tick_interval)
        .with_display()
        .with_writer(writer);
    lifecycle.start_cycle(cycle.work_duration_seconds())?;

    tokio::select! {
        exit = lifecycle.wait_for_input() => {
            info!("Command loop ended: {}", exit);
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    let problems = lifecycle.shutdown().await;
    if !problems.is_empty() {
        warn!("{} background activities had to be abandoned", problems.len());
    }
    Ok(())
}

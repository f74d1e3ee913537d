//! Entry point: parse the CLI, assemble configuration, optionally daemonize, then run the
//! TCP server and Ticker until a shutdown signal arrives.

use clap::Parser;
use ringlogd::cli::Cli;
use ringlogd::config::Settings;
use ringlogd::server::ConnectionServer;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing::{error, info};

fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn main() {
    let cli = Cli::parse();

    let mut settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };
    cli.apply_overrides(&mut settings);

    if let Err(err) = settings.validate() {
        eprintln!("configuration error: {err}");
        std::process::exit(1);
    }

    // Daemonization forks the process; it must happen before the async runtime (and its
    // worker threads) is built.
    if cli.daemon {
        if let Err(err) = ringlogd::daemon::daemonize() {
            eprintln!("failed to daemonize: {err}");
            std::process::exit(1);
        }
    }

    init_tracing(&settings.log_filter);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to build async runtime: {err}");
            std::process::exit(1);
        }
    };

    let exit_code = runtime.block_on(run(settings));
    std::process::exit(exit_code);
}

async fn run(settings: Settings) -> i32 {
    let server = match ConnectionServer::bind(&settings).await {
        Ok(server) => server,
        Err(err) => {
            error!(error = %err, "failed to start server");
            return 1;
        }
    };

    // Installing the SIGTERM handler can fail (e.g. resource limits); treat that the
    // same as any other startup failure rather than panicking once the server is live.
    let terminate = match install_terminate_signal() {
        Ok(terminate) => terminate,
        Err(err) => {
            error!(error = %err, "failed to install SIGTERM handler");
            return 1;
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        wait_for_shutdown_signal(terminate).await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    match server.run(shutdown_rx).await {
        Ok(()) => {
            info!("shutdown complete");
            0
        }
        Err(err) => {
            error!(error = %err, "server exited with an error");
            1
        }
    }
}

#[cfg(unix)]
fn install_terminate_signal() -> std::io::Result<tokio::signal::unix::Signal> {
    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal(mut terminate: tokio::signal::unix::Signal) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
fn install_terminate_signal() -> std::io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal(_terminate: ()) {
    let _ = tokio::signal::ctrl_c().await;
}

// Worker process: serves the mailbox until its parent goes away.
//
// Usage: mailbox-worker <parent_pid> [debug 0|1] [--name NAME]

use std::time::Duration;

use clap::Parser;
use shm_mailbox::Core::PollPolicy;
use shm_mailbox::Mailbox::DEFAULT_MAILBOX_NAME;
use shm_mailbox::{CapabilityTable, StopReason, WorkerBuilder};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "mailbox-worker")]
#[command(about = "Serve a shared memory mailbox on behalf of a parent process")]
#[command(version)]
struct Cli {
    /// Process id of the parent; the worker exits when it goes away
    parent_pid: u32,

    /// Diagnostic output: 1 logs every request, 0 keeps quiet
    #[arg(default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    debug: u8,

    /// Name of the shared memory segment
    #[arg(long, default_value = DEFAULT_MAILBOX_NAME)]
    name: String,

    /// Pause between polls in microseconds; 0 only yields the time slice
    #[arg(long, default_value_t = 0)]
    poll_interval_us: u64,

    /// Minimum time between parent liveness checks in milliseconds
    #[arg(long, default_value_t = 0)]
    liveness_interval_ms: u64,
}

fn main() {
    let cli = Cli::parse();
    let debug_mode = cli.debug == 1;

    // Use RUST_LOG to override; the debug toggle only raises the default
    let default_level = if debug_mode {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();

    info!(
        parent_pid = cli.parent_pid,
        pid = std::process::id(),
        debug = debug_mode,
        "Mailbox worker starting"
    );

    let worker = WorkerBuilder::new()
        .with_name(&cli.name)
        .with_parent_pid(cli.parent_pid)
        .with_poll_policy(PollPolicy::from_interval(Duration::from_micros(
            cli.poll_interval_us,
        )))
        .with_liveness_interval(Duration::from_millis(cli.liveness_interval_ms))
        .with_handler(CapabilityTable::with_diagnostics())
        .with_diagnostics(debug_mode)
        .build();

    let mut worker = match worker {
        Ok(worker) => worker,
        Err(e) => {
            error!("Worker initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = worker.stop_on_ctrlc() {
        error!("{}", e);
        // exit skips destructors; release the segment first
        drop(worker);
        std::process::exit(1);
    }

    let reason = worker.run();
    match reason {
        StopReason::ParentExited => info!("Parent process has exited, exiting worker"),
        StopReason::ParentVanished => info!("Parent process not found, exiting worker"),
        StopReason::Stopped => info!("Worker stopped"),
    }
    // Dropping the worker unmaps and removes the segment
    drop(worker);
}

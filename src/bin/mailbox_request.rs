// Parent-side diagnostic client: sends one command line through the mailbox.
//
// Usage: mailbox-request [--name NAME] ping

use std::time::Duration;

use clap::Parser;
use shm_mailbox::handler::is_error_response;
use shm_mailbox::Mailbox::DEFAULT_MAILBOX_NAME;
use shm_mailbox::RequesterBuilder;

#[derive(Parser)]
#[command(name = "mailbox-request")]
#[command(about = "Send one command to a running mailbox worker")]
#[command(version)]
struct Cli {
    /// Name of the shared memory segment
    #[arg(long, default_value = DEFAULT_MAILBOX_NAME)]
    name: String,

    /// Call timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Command name followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let timeout = Duration::from_millis(cli.timeout_ms);
    let requester = match RequesterBuilder::new()
        .with_name(&cli.name)
        .with_timeout(timeout)
        .with_attach_timeout(timeout)
        .build()
    {
        Ok(requester) => requester,
        Err(e) => {
            eprintln!("Failed to attach to mailbox {}: {}", cli.name, e);
            std::process::exit(1);
        }
    };

    match requester.call(&cli.command.join(" ")) {
        Ok(response) => {
            println!("{}", response);
            if is_error_response(response.as_bytes()) {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Request failed: {}", e);
            std::process::exit(1);
        }
    }
}

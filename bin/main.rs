//! Sends a single test message to a local fauxmail capture server.
//!
//! Connection details come from the `FAUXMAIL_*` environment variables; the
//! message itself comes from the command line.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use fauxmail_sender::{DispatchError, Dispatcher, Draft, TransportKind, logging};

/// Send one test message to fauxmail
#[derive(Parser, Debug)]
#[command(name = "fauxmail-send")]
#[command(about = "Send a test message to a local fauxmail server", long_about = None)]
#[command(version)]
struct Cli {
    /// Transport to use (smtp, rest)
    #[arg(short, long, default_value = "smtp")]
    transport: TransportKind,

    /// Sender address
    #[arg(short, long, default_value = "dev@example.test")]
    from: String,

    /// Recipient address, may be repeated
    #[arg(long = "to", default_value = "you@example.test")]
    to: Vec<String>,

    /// Subject line
    #[arg(short, long, default_value = "Hello")]
    subject: String,

    /// Plain text body
    #[arg(long, default_value = "Hi")]
    text: String,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::from_env();
    let transport = cli.transport;
    let draft = Draft::new(cli.from, cli.to, cli.subject, cli.text);

    let sent = dispatcher
        .dispatch(transport, draft)
        .await
        .with_context(|| format!("Sending via {transport} failed"))?;

    println!("{} {}", sent.status, sent.diagnostic);
    if let Some(id) = sent.message_id {
        println!("Message ID: {id}");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            err.downcast_ref::<DispatchError>()
                .map_or(ExitCode::FAILURE, |err| ExitCode::from(err.exit_code()))
        }
    }
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use clap::{Args, Parser, Subcommand};
use parley_cli::commands::{digest, history, proof, record, verify, NodeTarget};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley CLI - record and verify AI conversations on a provenance ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct NodeArgs {
    /// Base URL of the ledger node
    #[arg(long, env = "PARLEY_NODE_URL", default_value = "http://127.0.0.1:3000")]
    node: String,

    /// Bearer token for the node, if it requires one
    #[arg(long, env = "PARLEY_AUTH_TOKEN")]
    token: Option<String>,

    /// Identity to act as
    #[arg(long, short)]
    owner: String,
}

impl NodeArgs {
    fn target(self) -> NodeTarget {
        NodeTarget {
            url: self.node,
            token: self.token,
            owner: self.owner,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SHA-256 digest the ledger stores for a message
    Digest { text: String },
    /// Record one prompt/response exchange in your log
    Record {
        #[command(flatten)]
        node: NodeArgs,
        #[arg(long, short)]
        prompt: String,
        #[arg(long, short)]
        response: String,
        /// Seconds to wait for block inclusion
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },
    /// Show every exchange recorded in a log
    History {
        #[command(flatten)]
        node: NodeArgs,
    },
    /// Check whether an exchange was recorded (exit 1 if not)
    Verify {
        #[command(flatten)]
        node: NodeArgs,
        #[arg(long, short)]
        prompt: String,
        #[arg(long, short)]
        response: String,
    },
    /// Recompute the ledger proof of an event log file offline
    Proof {
        events_log: PathBuf,
        /// Print the proof as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Exit status for a check that ran but found nothing.
const NOT_RECORDED: u8 = 1;
/// Exit status for a check or command that could not complete.
const FAILED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Digest { text } => digest::run(&text).map(|_| true),
        Commands::Record {
            node,
            prompt,
            response,
            timeout,
        } => record::run(&node.target(), &prompt, &response, Duration::from_secs(timeout))
            .await
            .map(|_| true),
        Commands::History { node } => history::run(&node.target()).await.map(|_| true),
        Commands::Verify { node, prompt, response } => verify::run(&node.target(), &prompt, &response).await,
        Commands::Proof { events_log, json } => proof::run(&events_log, json).map(|_| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(NOT_RECORDED),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(FAILED)
        }
    }
}

// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Dispatch to the appropriate subcommand handler
// 3. Read download results as they arrive and print them
// 4. Exit with proper code (0 = everything downloaded, 1 = some files
//    failed, 2 = the download could not run at all)
// =============================================================================

mod cli;       // src/cli.rs - command-line parsing
mod config;    // src/config.rs - stored API token
mod download;  // src/download/ - the concurrent folder download
mod error;     // src/error.rs - error types for single downloads
mod github;    // src/github/ - GitHub URL parsing and API client

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;

use cli::{Cli, Commands, TokenAction};
use config::TokenStore;
use download::{DepthBudget, TraversalOptions};
use github::{ContentsClient, RepositoryReference};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Get { verbose: true, .. });
    init_logging(verbose);

    match cli.command {
        Commands::Get {
            url,
            out,
            depth,
            verbose,
            token,
            api_url,
            concurrency,
        } => {
            let options = TraversalOptions {
                depth: DepthBudget::from(depth),
                concurrency,
                ..TraversalOptions::default()
            };
            handle_get(&url, out, options, token, api_url.as_deref(), verbose).await
        }
        Commands::Token { action } => handle_token(action),
    }
}

// Diagnostics go to stderr. RUST_LOG wins over --verbose.
fn init_logging(verbose: bool) {
    let default = if verbose { "gitgrab=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// Handles the 'get' subcommand
async fn handle_get(
    url: &str,
    out: PathBuf,
    options: TraversalOptions,
    token: Option<String>,
    api_url: Option<&str>,
    verbose: bool,
) -> Result<i32> {
    let token = match token {
        Some(token) => Some(token),
        // A broken config file shouldn't stop public downloads
        None => TokenStore::default_location()
            .and_then(|store| store.load())
            .unwrap_or_else(|e| {
                tracing::warn!("ignoring stored token: {:#}", e);
                None
            }),
    };
    let reference = RepositoryReference::parse(url)?.with_token(token);

    let api_base = match api_url {
        Some(api_url) => {
            Url::parse(api_url).with_context(|| format!("Invalid --api-url '{}'", api_url))?
        }
        None => reference.default_api_base()?,
    };
    let client = ContentsClient::new(api_base)?;

    println!("🔍 Downloading {}", reference);
    println!("📁 Into {}", out.display());

    // Ctrl-C stops outstanding requests instead of killing us mid-write
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\n⏹️  Stopping...");
                cancel.cancel();
            }
        }
    });

    let mut results = download::spawn_download(client, reference, out, options, cancel);

    let mut downloaded = 0usize;
    let mut failed = 0usize;
    let mut fatal = false;

    // Read until the stream closes so no task is left waiting on us
    while let Some(outcome) = results.recv().await {
        if outcome.is_ok() {
            downloaded += 1;
            if let (true, Ok(path)) = (verbose, &outcome.result) {
                println!("   ⬇️  {}", path.display());
            }
        } else if let Some(error) = outcome.error() {
            match &outcome.entry {
                Some(entry) => {
                    failed += 1;
                    eprintln!("   ❌ {}: {}", entry, error);
                }
                // No entry means the download never got going
                None => {
                    fatal = true;
                    eprintln!("❌ {}", error);
                }
            }
        }
    }

    if fatal {
        return Ok(2);
    }

    println!();
    println!("📊 Summary:");
    println!("   ✅ Downloaded: {}", downloaded);
    println!("   ❌ Failed: {}", failed);

    if failed > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Handles the 'token' subcommand and its 'add' / 'remove' children
fn handle_token(action: Option<TokenAction>) -> Result<i32> {
    let store = TokenStore::default_location()?;

    match action {
        None => match store.load()? {
            Some(token) => println!("{}", token),
            None => println!("No token set"),
        },
        Some(TokenAction::Add { token }) => {
            store.save(&token)?;
            println!("🔑 Token saved to {}", store.path().display());
        }
        Some(TokenAction::Remove) => {
            store.clear()?;
            println!("🗑️  Token removed");
        }
    }

    Ok(0)
}

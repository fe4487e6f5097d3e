// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands:
//   gitgrab get <URL>        download a file or folder from GitHub
//   gitgrab token [add|remove]  manage the stored API token
//
// Rust concepts:
// - Derive macros: clap generates the parser from these types
// - Option<T>: Flags the user may leave out
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::download::DEFAULT_CONCURRENCY;

#[derive(Parser, Debug)]
#[command(
    name = "gitgrab",
    version,
    about = "Download a single file or a subfolder of a GitHub repository",
    long_about = "gitgrab downloads one file or a whole folder from a GitHub repository \
                  without cloning it. Folders are downloaded recursively and concurrently."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a file or folder
    ///
    /// Example: gitgrab get https://github.com/rust-lang/rust/tree/master/src/doc -o doc
    Get {
        /// GitHub URL of a file (.../blob/branch/path) or folder (.../tree/branch/path)
        url: String,

        /// Folder to download into
        #[arg(short = 'o', long = "out", visible_alias = "output-dir", default_value = ".")]
        out: PathBuf,

        /// Number of subfolder levels to descend into (-1 = all subfolders)
        #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
        depth: i64,

        /// Print the path of every downloaded file
        #[arg(short, long)]
        verbose: bool,

        /// API token for this run (overrides the stored token)
        #[arg(long)]
        token: Option<String>,

        /// GitHub API base URL (defaults to https://api.<host of URL>)
        #[arg(long)]
        api_url: Option<String>,

        /// Maximum number of requests in flight (0 = no limit)
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },

    /// Show the stored GitHub API token
    Token {
        #[command(subcommand)]
        action: Option<TokenAction>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TokenAction {
    /// Store a GitHub API token, used for every download
    Add {
        token: String,
    },
    /// Forget the stored token
    Remove,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_get_defaults() {
        let cli = Cli::try_parse_from(["gitgrab", "get", "https://github.com/u/r/tree/main/src"])
            .unwrap();
        match cli.command {
            Commands::Get { out, depth, verbose, token, concurrency, .. } => {
                assert_eq!(out, PathBuf::from("."));
                assert_eq!(depth, -1);
                assert!(!verbose);
                assert_eq!(token, None);
                assert_eq!(concurrency, DEFAULT_CONCURRENCY);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_get_short_flags() {
        let cli = Cli::try_parse_from([
            "gitgrab", "get", "https://github.com/u/r/tree/main/src", "-o", "dest", "-d", "2", "-v",
        ])
        .unwrap();
        match cli.command {
            Commands::Get { out, depth, verbose, .. } => {
                assert_eq!(out, PathBuf::from("dest"));
                assert_eq!(depth, 2);
                assert!(verbose);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_token_subcommands() {
        let cli = Cli::try_parse_from(["gitgrab", "token", "add", "ghp_x"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Token { action: Some(TokenAction::Add { ref token }) } if token == "ghp_x"
        ));

        let cli = Cli::try_parse_from(["gitgrab", "token"]).unwrap();
        assert!(matches!(cli.command, Commands::Token { action: None }));
    }
}

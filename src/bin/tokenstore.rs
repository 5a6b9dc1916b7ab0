//! Access token registry CLI.
//!
//! Stores, looks up, revokes and lists access tokens for a user against the
//! configured backend.
//!
//! ```bash
//! export TOKEN_STORE_BACKEND=vault VAULT_ADDR=http://127.0.0.1:8200 VAULT_TOKEN=root
//! tokenstore store alice tok-1
//! tokenstore lookup alice tok-1
//! tokenstore --format json list alice
//! tokenstore revoke alice tok-1
//! ```
//!
//! Backend and Vault settings come from the environment (see `Config`);
//! `--backend` overrides `TOKEN_STORE_BACKEND`. The memory backend only
//! lives as long as the process.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error (configuration, output)
//! - 2: Storage error
//! - 3: Authentication error
//! - 4: Token not found (`lookup` only)

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::process;
use tokenstore::{
    config::Config,
    errors::StorageError,
    storage::{Token, TokenStore, create_storage_backend},
};
use tracing_subscriber::prelude::*;

/// Main CLI application structure
#[derive(Parser)]
#[command(
    name = "tokenstore",
    about = "Store, look up, revoke and list access tokens",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Storage backend to use
    #[arg(long, env = "TOKEN_STORE_BACKEND", help = "Storage backend: memory or vault")]
    backend: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text", help = "Output format for results")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One token id per line
    Text,
    /// JSON formatted output
    Json,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Store a token for a user
    Store(TokenArgs),
    /// Check whether a user holds a token
    Lookup(TokenArgs),
    /// Revoke a user's token
    Revoke(TokenArgs),
    /// List all tokens of a user
    List(UserArgs),
}

#[derive(Args)]
struct TokenArgs {
    /// User the token belongs to
    user_id: String,
    /// Token identifier
    token_id: String,
}

#[derive(Args)]
struct UserArgs {
    /// User whose tokens are listed
    user_id: String,
}

/// Outcome of a command that did not fail
enum Outcome {
    Done,
    NotFound,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tokenstore=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(&cli).await {
        Ok(Outcome::Done) => process::exit(0),
        Ok(Outcome::NotFound) => process::exit(4),
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(exit_code(&err));
        }
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<StorageError>() {
        Some(StorageError::AuthenticationFailed(_)) => 3,
        Some(_) => 2,
        None => 1,
    }
}

async fn run(cli: &Cli) -> Result<Outcome> {
    let mut config = Config::new()?;
    if let Some(backend) = &cli.backend {
        config = config.with_backend(backend)?;
    }
    tracing::debug!(version = %config.version, backend = config.backend.as_ref(), "starting tokenstore");

    let store = create_storage_backend(config.storage_backend()?).await?;
    execute(store.as_ref(), &cli.command, cli.format).await
}

async fn execute(
    store: &dyn TokenStore,
    command: &Commands,
    format: OutputFormat,
) -> Result<Outcome> {
    match command {
        Commands::Store(args) => {
            store.store(&args.user_id, &args.token_id).await?;
            print_tokens(format, &[Token::new(args.token_id.clone())])?;
            Ok(Outcome::Done)
        }
        Commands::Lookup(args) => match store.lookup(&args.user_id, &args.token_id).await? {
            Some(token) => {
                print_tokens(format, &[Token::from(token)])?;
                Ok(Outcome::Done)
            }
            None => Ok(Outcome::NotFound),
        },
        Commands::Revoke(args) => {
            store.revoke(&args.user_id, &args.token_id).await?;
            Ok(Outcome::Done)
        }
        Commands::List(args) => {
            let mut tokens = store.list(&args.user_id).await?;
            tokens.sort();
            let tokens = tokens.into_iter().map(Token::from).collect::<Vec<_>>();
            print_tokens(format, &tokens)?;
            Ok(Outcome::Done)
        }
    }
}

fn print_tokens(format: OutputFormat, tokens: &[Token]) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for token in tokens {
                println!("{}", token.name);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(tokens)?),
    }
    Ok(())
}

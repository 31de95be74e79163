//! reup-token - Manage stored destination access tokens
//!
//! Tokens are kept as numbered `token<N>.txt` files in the tokens directory
//! (`[tokens] dir` in the config file).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libreupcast::config::Config;
use libreupcast::logging;
use libreupcast::store::TokenStore;
use libreupcast::types::mask_token;
use libreupcast::ReupcastError;
use secrecy::ExposeSecret;
use std::io::Read;
use tracing::error;

#[derive(Parser)]
#[command(name = "reup-token")]
#[command(version)]
#[command(about = "Manage stored destination access tokens", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a token under the next free number
    Save {
        /// Token to store (reads stdin if omitted)
        token: Option<String>,

        /// Read the token from stdin (for automation/agents)
        #[arg(long)]
        stdin: bool,
    },

    /// List stored tokens (without showing values)
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a stored token
    Show {
        /// Token name (token3.txt, token3 or 3)
        name: String,

        /// Print the full token instead of a masked hint
        #[arg(long)]
        reveal: bool,
    },

    /// Delete a stored token
    Delete {
        /// Token name (token3.txt, token3 or 3)
        name: String,
    },
}

fn main() {
    let cli = Cli::parse();

    logging::init_default(cli.verbose);

    if let Err(e) = run_command(cli.command) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<ReupcastError>()
            .map_or(1, ReupcastError::exit_code);
        std::process::exit(code);
    }
}

fn run_command(command: Commands) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let store = TokenStore::new(config.tokens_dir());

    match command {
        Commands::Save { token, stdin } => save_token(&store, token, stdin),
        Commands::List { json } => list_tokens(&store, json),
        Commands::Show { name, reveal } => show_token(&store, &name, reveal),
        Commands::Delete { name } => delete_token(&store, &name),
    }
}

fn save_token(store: &TokenStore, token: Option<String>, stdin: bool) -> Result<()> {
    let token = match token {
        Some(token) if !stdin => token,
        _ => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read token from stdin")?;
            input
        }
    };

    let name = store.save(&token)?;
    println!("Token saved as {}", name);
    Ok(())
}

fn list_tokens(store: &TokenStore, json: bool) -> Result<()> {
    let tokens = store.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
        return Ok(());
    }

    if tokens.is_empty() {
        println!("No tokens stored in {}", store.dir().display());
        return Ok(());
    }
    for token in tokens {
        println!("{}\t{}", token.name, token.saved_at.to_rfc3339());
    }
    Ok(())
}

fn show_token(store: &TokenStore, name: &str, reveal: bool) -> Result<()> {
    let token = store.load(name)?;
    if reveal {
        println!("{}", token.expose_secret());
    } else {
        println!("{}", mask_token(token.expose_secret()));
    }
    Ok(())
}

fn delete_token(store: &TokenStore, name: &str) -> Result<()> {
    store.delete(name)?;
    println!("Deleted {}", name);
    Ok(())
}

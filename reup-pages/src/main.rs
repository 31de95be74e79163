//! reup-pages - List the pages a user token can publish videos to
//!
//! The user token is checked for the required permissions first; each page
//! is then listed with its own access token, which is what `reup-upload`
//! takes as a destination.

use clap::{Parser, ValueEnum};
use libreupcast::config::Config;
use libreupcast::logging;
use libreupcast::permissions::check_token;
use libreupcast::platforms::graph::{GraphClient, Page};
use libreupcast::store::TokenStore;
use libreupcast::types::mask_token;
use libreupcast::{ReupcastError, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::io::Read;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "reup-pages")]
#[command(version)]
#[command(about = "List the pages a user token can publish videos to")]
#[command(long_about = "\
reup-pages - List the pages a user token can publish videos to

DESCRIPTION:
    Verifies that a user access token holds every permission needed to
    publish videos, then lists the pages it manages together with each
    page's access token.

    Page tokens are masked unless --show-tokens is given. With --save every
    page token is added to the token store for use with
    `reup-upload --stored`.

USAGE:
    reup-pages USER_TOKEN
    reup-pages --stored token1.txt --format json
    echo USER_TOKEN | reup-pages --stdin --save

EXIT CODES:
    0 - Pages listed
    1 - Request failed or no pages found
    2 - Authentication or permission error
    3 - Invalid input
")]
struct Cli {
    /// User access token
    token: Option<String>,

    /// Read the user token from stdin
    #[arg(long, conflicts_with = "token")]
    stdin: bool,

    /// Use a token from the token store (e.g. token1.txt or 1)
    #[arg(long, value_name = "NAME", conflicts_with_all = ["token", "stdin"])]
    stored: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Print page access tokens in full
    #[arg(long)]
    show_tokens: bool,

    /// Save every page token to the token store
    #[arg(long)]
    save: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// A page as printed
#[derive(Debug, Serialize)]
struct PageView {
    id: String,
    name: String,
    fan_count: Option<u64>,
    followers_count: Option<u64>,
    access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_as: Option<String>,
}

impl PageView {
    fn new(page: Page, show_tokens: bool, saved_as: Option<String>) -> Self {
        let access_token = page.access_token.map(|token| {
            if show_tokens {
                token
            } else {
                mask_token(&token)
            }
        });
        Self {
            id: page.id,
            name: page.name,
            fan_count: page.fan_count,
            followers_count: page.followers_count,
            access_token,
            saved_as,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 3 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    logging::init_default(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let store = TokenStore::new(config.tokens_dir());
    let token = user_token(&cli, &store)?;

    let client = GraphClient::new(&config.graph)?;
    check_token(&client, &token).await?;
    let pages = client.list_pages(&token).await?;

    let mut views = Vec::with_capacity(pages.len());
    for page in pages {
        let saved_as = match (&page.access_token, cli.save) {
            (Some(page_token), true) => {
                let name = store.save(page_token)?;
                info!("Saved token for page {} as {}", page.id, name);
                Some(name)
            }
            _ => None,
        };
        views.push(PageView::new(page, cli.show_tokens, saved_as));
    }

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&views)?),
        OutputFormat::Text => {
            for view in &views {
                println!("{}", format_page(view));
            }
        }
    }

    Ok(())
}

fn user_token(cli: &Cli, store: &TokenStore) -> Result<SecretString> {
    if let Some(name) = &cli.stored {
        return store.load(name);
    }

    let raw = if cli.stdin {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .map_err(|e| ReupcastError::InvalidInput(format!("Failed to read stdin: {}", e)))?;
        input
    } else {
        cli.token.clone().unwrap_or_default()
    };

    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ReupcastError::InvalidInput(
            "Access token is required".to_string(),
        ));
    }
    let token = SecretString::from(raw.to_string());
    info!("Using user token {}", mask_token(token.expose_secret()));
    Ok(token)
}

fn format_page(view: &PageView) -> String {
    let count = |n: Option<u64>| n.map_or_else(|| "-".to_string(), |n| n.to_string());
    let mut line = format!(
        "{}\t{}\tfans: {}\tfollowers: {}\ttoken: {}",
        view.id,
        view.name,
        count(view.fan_count),
        count(view.followers_count),
        view.access_token.as_deref().unwrap_or("-")
    );
    if let Some(saved_as) = &view.saved_as {
        line.push_str(&format!("\tsaved: {}", saved_as));
    }
    line
}

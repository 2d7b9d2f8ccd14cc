//! Command-line front end for the URL shortener core.
//!
//! Runs one operation against the backend selected by the environment (see
//! [`url_shortener_core::config`]).
//!
//! # Usage
//!
//! ```bash
//! # Shorten a URL for a user
//! url-shortener-core shorten https://example.com --user u1
//!
//! # Shorten several URLs at once
//! url-shortener-core shorten-batch https://a.com https://b.com --user u1
//!
//! # Resolve a code
//! url-shortener-core resolve AbCdEfGh
//!
//! # List and delete a user's URLs
//! url-shortener-core list --user u1
//! url-shortener-core delete AbCdEfGh XyZwQpRs --user u1
//! ```

use url_shortener_core::app::{self, DefaultUrlService};
use url_shortener_core::config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;

/// URL shortener command-line tool.
#[derive(Parser)]
#[command(name = "url-shortener-core")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shorten a URL (returns the existing code if the user already shortened it)
    Shorten {
        url: String,

        /// Owner of the short URL; anonymous if omitted
        #[arg(short, long, default_value = "")]
        user: String,
    },

    /// Shorten several URLs in one write
    ShortenBatch {
        #[arg(required = true)]
        urls: Vec<String>,

        #[arg(short, long, default_value = "")]
        user: String,
    },

    /// Print the original URL behind a code
    Resolve { code: String },

    /// List the live URLs of a user
    List {
        #[arg(short, long)]
        user: String,
    },

    /// Delete codes owned by a user
    Delete {
        #[arg(required = true)]
        codes: Vec<String>,

        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = config::load_from_env().context("Failed to load configuration")?;
    app::init_tracing(&config);
    config.print_summary();

    let (service, worker) = app::build(&config).await?;

    let outcome = run(&service, cli.command).await;

    // Closing the last queue handle lets the worker finish pending deletions.
    drop(service);
    worker.await.context("Delete worker panicked")?;

    outcome
}

async fn run(service: &DefaultUrlService, command: Commands) -> Result<()> {
    match command {
        Commands::Shorten { url, user } => {
            let (code, created) = service.create_short_url(&url, &user).await?;
            let short = service.short_url(&code);

            if created {
                println!("{} {}", "Created:".green().bold(), short.bright_yellow());
            } else {
                println!("{} {}", "Already exists:".yellow().bold(), short.bright_yellow());
            }
        }
        Commands::ShortenBatch { urls, user } => {
            let codes = service.create_short_urls_batch(&urls, &user).await?;

            println!("{}", "Created:".green().bold());
            for (url, code) in urls.iter().zip(&codes) {
                println!(
                    "  {} {} {}",
                    service.short_url(code).bright_yellow(),
                    "→".bright_black(),
                    url.cyan()
                );
            }
        }
        Commands::Resolve { code } => match service.get_original_url(&code).await {
            Ok(url) => println!("{}", url.cyan()),
            Err(e) if e.is_not_found() => {
                println!("{} {}", "Not found:".red().bold(), e);
            }
            Err(e) => return Err(e.into()),
        },
        Commands::List { user } => {
            let urls = service.get_user_urls(&user).await?;

            if urls.is_empty() {
                println!("{}", "  No URLs found".yellow());
                return Ok(());
            }

            println!(
                "  {:<40} {}",
                "Short URL".bright_white().bold(),
                "Original URL".bright_white().bold()
            );
            println!("  {}", "─".repeat(75).bright_black());

            for entry in &urls {
                println!(
                    "  {:<40} {}",
                    service.short_url(&entry.code).bright_yellow(),
                    entry.original_url.cyan()
                );
            }

            println!();
            println!("  Total: {}", urls.len().to_string().bright_white().bold());
        }
        Commands::Delete { codes, user } => {
            let count = codes.len();
            service.delete_urls(codes, &user).await?;
            println!(
                "{} {} code(s) queued for deletion",
                "Accepted:".green().bold(),
                count
            );
        }
    }

    Ok(())
}

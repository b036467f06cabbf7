//! shelf-badges - Storefront badge rule evaluator and page scanner
//!
//! Fetches a storefront page with TLS fingerprint emulation and reports the badges its products earn.

use anyhow::Result;
use clap::{Parser, Subcommand};
use shelf_badges::badge::Position;
use shelf_badges::commands::{EvalCommand, ScanCommand};
use shelf_badges::config::{Config, OutputFormat};
use shelf_badges::storefront::models::PageType;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "shelf-badges",
    version,
    about = "Storefront badge rule evaluator and page scanner",
    long_about = "Evaluates promotional badge rules against storefront products and places the admitted badges on product cards."
)]
struct Cli {
    /// Shop domain sent to the rule endpoint (defaults to the scanned host)
    #[arg(long, global = true, env = "BADGE_SHOP")]
    shop: Option<String>,

    /// Badge rule endpoint URL
    #[arg(long, global = true, env = "BADGE_ENDPOINT")]
    endpoint: Option<String>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "BADGE_PROXY")]
    proxy: Option<String>,

    /// Delay between requests in milliseconds
    #[arg(long, global = true, env = "BADGE_DELAY")]
    delay: Option<u64>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose logging, including why rules were skipped
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a storefront page and place badges on its products
    #[command(alias = "s")]
    Scan {
        /// Page URL
        url: String,

        /// Write the annotated page to this file
        #[arg(long)]
        html_out: Option<PathBuf>,

        /// Maximum number of scan passes
        #[arg(long)]
        passes: Option<u32>,

        /// Milliseconds between scan passes
        #[arg(long)]
        interval: Option<u64>,

        /// Load rules from a local JSON file instead of the endpoint
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Show the badges a product earns under a rule file
    #[command(alias = "e")]
    Eval {
        #[command(flatten)]
        input: EvalInput,
    },

    /// Show every rule's verdict and the predicate that rejected it
    #[command(alias = "x")]
    Explain {
        #[command(flatten)]
        input: EvalInput,
    },

    /// List badge grid positions
    Positions,
}

#[derive(clap::Args)]
struct EvalInput {
    /// Rule file (`{"badges": [...]}` or a bare array)
    #[arg(long)]
    rules: PathBuf,

    /// Product JSON file
    #[arg(long)]
    product: PathBuf,

    /// Page type the product is shown on
    #[arg(long, default_value = "collection")]
    page_type: PageType,

    /// Evaluate schedules at this instant instead of now (e.g. 2024-06-15T12:00:00Z)
    #[arg(long)]
    at: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    config.format = cli.format;
    config.debug |= cli.verbose;

    if let Some(shop) = cli.shop {
        config.shop = Some(shop);
    }
    if let Some(endpoint) = cli.endpoint {
        config.rule_endpoint = Some(endpoint);
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }
    if let Some(delay) = cli.delay {
        config.delay_ms = delay;
    }

    match cli.command {
        Commands::Scan { url, html_out, passes, interval, rules } => {
            if let Some(passes) = passes {
                config.max_passes = passes;
            }
            if let Some(interval) = interval {
                config.scan_interval_ms = interval;
            }

            let cmd = ScanCommand::new(config).html_out(html_out).rules_file(rules);
            let output = cmd.execute(&url).await?;
            println!("{}", output);
        }

        Commands::Eval { input } => {
            let cmd = EvalCommand::new(config);
            let output =
                cmd.execute(&input.rules, &input.product, input.page_type, input.at.as_deref())?;
            println!("{}", output);
        }

        Commands::Explain { input } => {
            let cmd = EvalCommand::new(config);
            let output =
                cmd.explain(&input.rules, &input.product, input.page_type, input.at.as_deref())?;
            println!("{}", output);
        }

        Commands::Positions => {
            println!("Badge grid positions:\n");
            println!("{:<6} {:<16}", "Cell", "Placement");
            println!("{:-<6} {:-<16}", "", "");

            for cell in 1..=9 {
                if let Some(position) = Position::new(cell) {
                    println!("{:<6} {:<16}", cell, position.name());
                }
            }
        }
    }

    Ok(())
}

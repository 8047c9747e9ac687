//! CLI administration tool for shortlink.
//!
//! Talks to the PostgreSQL store directly, without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Check database connection
//! cargo run --bin admin -- db check
//!
//! # Apply pending migrations
//! cargo run --bin admin -- db migrate
//!
//! # Totals
//! cargo run --bin admin -- stats
//!
//! # Inspect one link
//! cargo run --bin admin -- show aB3dE9x --days 7
//!
//! # Create a link
//! cargo run --bin admin -- shorten https://example.com --code promo1
//! ```
//!
//! # Environment Variables
//!
//! Same database variables as the server (`DATABASE_URL` or `DB_*`), plus
//! `BASE_URL` for printed short URLs.

use shortlink::application::services::{CreateLink, LinkService, StatsService};
use shortlink::config::{Config, mask_connection_string};
use shortlink::infrastructure::cache::NullCache;
use shortlink::infrastructure::persistence::{PgUrlRepository, PgVisitRepository};
use shortlink::server::connect_pool;
use shortlink::utils::code_generator::RandomCodeGenerator;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing shortlink.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Show totals
    Stats,

    /// Show one short link with its visit counts
    Show {
        code: String,

        /// Include per-day counts for the last N days
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Create a short link
    Shorten {
        url: String,

        /// Custom short code
        #[arg(short, long)]
        code: Option<String>,

        /// Expire the link after this many hours
        #[arg(long)]
        expires_in_hours: Option<i64>,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = connect_pool(&config).await?;

    match cli.command {
        Commands::Stats => handle_stats(&pool).await?,
        Commands::Show { code, days } => handle_show(&pool, &code, days).await?,
        Commands::Shorten {
            url,
            code,
            expires_in_hours,
        } => handle_shorten(&pool, &config, url, code, expires_in_hours).await?,
        Commands::Db { action } => handle_db_action(action, &pool, &config).await?,
    }

    Ok(())
}

/// Displays totals: links, logged visits, and links past their expiry.
async fn handle_stats(pool: &PgPool) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let links_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM urls")
        .fetch_one(pool)
        .await?;

    let visits_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM url_visits")
        .fetch_one(pool)
        .await?;

    let expired_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM urls WHERE expires_at <= NOW()")
            .fetch_one(pool)
            .await?;

    println!(
        "  Links:         {}",
        links_count.to_string().bright_green().bold()
    );
    println!(
        "  Visits:        {}",
        visits_count.to_string().bright_green().bold()
    );
    println!(
        "  Expired links: {}",
        expired_count.to_string().bright_yellow().bold()
    );
    println!();

    Ok(())
}

async fn handle_show(pool: &PgPool, code: &str, days: Option<u32>) -> Result<()> {
    let pool = Arc::new(pool.clone());
    let service = StatsService::new(
        Arc::new(PgUrlRepository::new(pool.clone())),
        Arc::new(PgVisitRepository::new(pool)),
    );

    let stats = service
        .get_stats(code, days)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let record = stats.record;

    let status = if record.is_expired() {
        "EXPIRED".red()
    } else {
        "ACTIVE".green()
    };

    println!("{}", "🔗 Short link".bright_blue().bold());
    println!();
    println!("  Code:         {}", record.code.cyan());
    println!("  Target:       {}", record.target_url.bright_white());
    println!(
        "  Created:      {}",
        record.created_at.format("%Y-%m-%d %H:%M").to_string().bright_black()
    );
    if let Some(expires_at) = record.expires_at {
        println!(
            "  Expires:      {}",
            expires_at.format("%Y-%m-%d %H:%M").to_string().bright_black()
        );
    }
    println!("  Status:       {}", status);
    println!(
        "  Visits:       {}",
        record.visit_count.to_string().bright_green().bold()
    );
    if let Some(last) = record.last_visited_at {
        println!(
            "  Last visit:   {}",
            last.format("%Y-%m-%d %H:%M").to_string().bright_black()
        );
    }

    if let Some(daily) = stats.daily {
        println!();
        println!("  {:<12} {}", "Day".bright_white().bold(), "Visits".bright_white().bold());
        println!("  {}", "─".repeat(24).bright_black());
        for day in daily {
            println!("  {:<12} {}", day.day.to_string(), day.count);
        }
    }
    println!();

    Ok(())
}

async fn handle_shorten(
    pool: &PgPool,
    config: &Config,
    url: String,
    code: Option<String>,
    expires_in_hours: Option<i64>,
) -> Result<()> {
    let service = LinkService::new(
        Arc::new(PgUrlRepository::new(Arc::new(pool.clone()))),
        Arc::new(NullCache::new()),
        Arc::new(RandomCodeGenerator::default()),
        config.base_url.clone(),
        config.cache_ttl(),
        config.max_allocation_retries,
    );

    let expires_at = expires_in_hours
        .map(|hours| expiry_after_hours(Utc::now(), hours))
        .transpose()?;

    let record = service
        .create_short_link(CreateLink {
            target_url: url,
            custom_code: code,
            expires_at,
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create link: {}", e))?;

    println!("{}", "✅ Short link created".green().bold());
    println!();
    println!("  Code:      {}", record.code.cyan());
    println!(
        "  Short URL: {}",
        service.short_url(&record.code).bright_yellow()
    );
    println!("  Target:    {}", record.target_url.bright_white());
    println!();

    Ok(())
}

/// `now + hours`, or an error when it falls outside the representable range.
fn expiry_after_hours(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_hours(hours)
        .and_then(|delta| now.checked_add_signed(delta))
        .with_context(|| format!("--expires-in-hours {hours} is out of range"))
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool, config: &Config) -> Result<()> {
    match action {
        DbAction::Check => {
            let target = config
                .database_url
                .as_deref()
                .map(mask_connection_string)
                .unwrap_or_default();
            println!(
                "{} {}",
                "🔍 Checking database connection:".bright_blue(),
                target.bright_black()
            );

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            println!("{}", "✅ Database connection OK".green().bold());
            println!("  PostgreSQL: {}", version.bright_white());
        }
        DbAction::Migrate => {
            println!("{}", "🛠  Applying migrations...".bright_blue());

            sqlx::migrate!("./migrations").run(pool).await?;

            println!("{}", "✅ Migrations applied".green().bold());
        }
    }

    Ok(())
}

//! scholarhub - scholarly search aggregator
//!
//! One query interface over OpenAlex, Crossref, arXiv, Semantic Scholar and
//! Google Scholar (via Serper), with uniform pagination and export.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! scholarhub search "crew fatigue" --source crossref --technology "Autonomous Ship*" --pages 2 --export csv
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! SERPER_API_KEY=... scholarhub serve --port 8000
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use scholarhub::aggregator::Aggregator;
use scholarhub::config::{Settings, ENV_MAILTO, ENV_SEMANTIC_API_KEY, ENV_SERPER_API_KEY, ENV_TIMEOUT_SECS};
use scholarhub::export::{write_export, ExportFormat};
use scholarhub::models::{Entity, Provider, SearchParams, DEFAULT_PER_PAGE};
use scholarhub::session::SearchSession;
use scholarhub::taxonomy::{build_query, CategoryId, Selections, CATEGORIES, ROLES};
use scholarhub::{server, view};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Scholarly search aggregator
#[derive(Parser)]
#[command(name = "scholarhub")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(flatten)]
    providers: ProviderArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Provider credentials and transport knobs (flags win over the environment).
#[derive(Args)]
struct ProviderArgs {
    /// Contact e-mail for polite-pool access
    #[arg(long, global = true, env = ENV_MAILTO)]
    mailto: Option<String>,

    /// Serper API key for Google Scholar
    #[arg(long, global = true, env = ENV_SERPER_API_KEY, hide_env_values = true)]
    serper_key: Option<String>,

    /// Semantic Scholar API key
    #[arg(long, global = true, env = ENV_SEMANTIC_API_KEY, hide_env_values = true)]
    semantic_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = ENV_TIMEOUT_SECS)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search one provider and print normalized results
    Search {
        /// Free-text part of the query
        query: Option<String>,

        /// Provider: openalex, crossref, arxiv, semanticscholar or scholar
        #[arg(long, default_value = "openalex")]
        source: String,

        /// Entity kind: works or authors
        #[arg(long, default_value = "works", value_parser = ["works", "authors"])]
        entity: String,

        /// Results per page
        #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
        per_page: u32,

        /// Number of pages to walk
        #[arg(long, default_value_t = 1)]
        pages: u32,

        /// Technology keyword (repeatable)
        #[arg(long = "technology")]
        technology: Vec<String>,

        /// Human-dimension keyword (repeatable)
        #[arg(long = "human")]
        human: Vec<String>,

        /// Competency keyword (repeatable)
        #[arg(long = "competency")]
        competency: Vec<String>,

        /// Export the loaded results
        #[arg(long, value_parser = ["json", "csv"])]
        export: Option<String>,

        /// Output directory for exports
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,
    },

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Print the keyword taxonomy and role list
    Keywords,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let logs = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        logs.json().init();
    } else {
        logs.init();
    }

    let settings = settings_from(&cli.providers);

    match cli.command {
        Commands::Search {
            query,
            source,
            entity,
            per_page,
            pages,
            technology,
            human,
            competency,
            export,
            output,
        } => {
            let mut selections = Selections::default();
            for (id, terms) in [
                (CategoryId::Technology, technology),
                (CategoryId::Human, human),
                (CategoryId::Competency, competency),
            ] {
                for term in terms {
                    selections.select(id, term);
                }
            }
            let request = SearchRequest {
                query: build_query(&selections, query.as_deref()),
                provider: source.parse::<Provider>().context("Invalid --source")?,
                entity: entity.parse::<Entity>().context("Invalid --entity")?,
                per_page,
                pages,
                export: export.map(|e| e.parse::<ExportFormat>()).transpose().context("Invalid --export")?,
                output,
            };
            run_search(&settings, request).await
        }
        Commands::Serve { port, host } => run_server(settings, host, port).await,
        Commands::Keywords => {
            print_keywords();
            Ok(())
        }
    }
}

fn settings_from(args: &ProviderArgs) -> Settings {
    let mut settings = Settings::from_env();
    if let Some(mail) = args.mailto.clone().filter(|m| !m.trim().is_empty()) {
        settings.contact_email = Some(mail);
    }
    if let Some(key) = args.serper_key.clone().filter(|k| !k.trim().is_empty()) {
        settings.serper_api_key = Some(key);
    }
    if let Some(key) = args.semantic_key.clone().filter(|k| !k.trim().is_empty()) {
        settings.semantic_api_key = Some(key);
    }
    if let Some(secs) = args.timeout_secs {
        settings.timeout = Duration::from_secs(secs);
    }
    settings
}

// ============================================================================
// Search
// ============================================================================

struct SearchRequest {
    query: String,
    provider: Provider,
    entity: Entity,
    per_page: u32,
    pages: u32,
    export: Option<ExportFormat>,
    output: PathBuf,
}

async fn run_search(settings: &Settings, request: SearchRequest) -> Result<()> {
    if request.query.is_empty() {
        warn!("Empty query; the provider decides what an unfiltered search returns");
    }
    println!("Query: {}", request.query);
    println!("Source: {} ({})", request.provider, request.entity);

    let aggregator = Aggregator::new(settings).context("Failed to build provider clients")?;
    let params = SearchParams::new(request.query.clone(), request.per_page);
    let mut session = SearchSession::new(request.provider, request.entity, params);

    let mut loaded: Vec<Value> = Vec::new();
    let mut page = session.load(&aggregator).await?;
    let mut page_no = 1;

    while let Some(envelope) = page {
        println!(
            "\n--- Page {} ({} results, ~{} total) ---",
            page_no,
            envelope.results.len(),
            envelope.meta.count
        );
        print_page(request.provider, request.entity, loaded.len(), &envelope.results);
        loaded.extend(envelope.results);

        if page_no >= request.pages || !session.navigator().has_next() {
            break;
        }
        page = session.next_page(&aggregator).await?;
        page_no += 1;
    }

    info!(pages = page_no, results = loaded.len(), "Search finished");

    if let Some(format) = request.export {
        if loaded.is_empty() {
            println!("No results to export.");
            return Ok(());
        }
        let path = write_export(
            &request.output,
            format,
            request.provider,
            request.entity,
            &request.query,
            &loaded,
        )
        .context("Failed to write export")?;
        println!("\nSaved: {}", path.display());
    }

    Ok(())
}

fn print_page(provider: Provider, entity: Entity, offset: usize, items: &[Value]) {
    for (i, item) in items.iter().enumerate() {
        let n = offset + i + 1;
        if entity == Entity::Authors {
            let text = |key: &str| item.get(key).map(|v| v.to_string()).unwrap_or_default();
            println!(
                "{:>3}. {} | works: {} | cited by: {}",
                n,
                item.get("display_name").and_then(Value::as_str).unwrap_or(""),
                text("works_count"),
                text("cited_by_count")
            );
            continue;
        }

        match view::view_json(provider, item) {
            Ok(v) => {
                let year = v.year.map(|y| y.to_string()).unwrap_or_else(|| "n.d.".to_string());
                println!("{:>3}. {} ({})", n, v.title, year);
                if let Some(venue) = &v.venue {
                    println!("     {}{}", venue, if v.open { " [open]" } else { "" });
                }
                if !v.publisher_or_author.is_empty() {
                    println!("     {}", v.publisher_or_author);
                }
                if !v.skills.is_empty() {
                    println!("     skills: {}", v.skills.join(", "));
                }
                if let Some(doi) = &v.doi {
                    println!("     doi: {}", doi);
                }
                if !v.link.is_empty() {
                    println!("     {}", v.link);
                }
            }
            Err(e) => warn!(index = n, error = %e, "Skipping item that does not decode"),
        }
    }
}

fn print_keywords() {
    for category in CATEGORIES.iter() {
        println!("\n[{}] {}", category.id, category.label);
        for term in category.terms {
            println!("  - {}", term);
        }
    }
    println!("\nRoles:");
    for role in ROLES.iter() {
        println!("  {:>2}. {}", role.id, role.name);
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(settings: Settings, host: String, port: u16) -> Result<()> {
    info!(host = %host, port = port, "Starting HTTP server");
    if settings.serper_api_key.is_none() {
        warn!("{} is not set; /api/scholar will answer 500", ENV_SERPER_API_KEY);
    }

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;
    let aggregator = Arc::new(Aggregator::new(&settings).context("Failed to build provider clients")?);

    println!("Listening on http://{}", addr);
    server::serve(addr, aggregator).await.context("Server error")?;
    Ok(())
}

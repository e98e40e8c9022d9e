use anyhow::{bail, Context};
use catalog_aggregator::{
    load_sources, sort_items, AggregatorConfig, CatalogAggregator, FetchConfig, PageQuery, SortDirection, SortKey,
    SortOrder, SourceId, SourceRegistry,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Query several store catalogs at once and print the merged product list.
#[derive(Debug, Parser)]
#[command(name = "catalog-aggregator", version)]
struct Args {
    /// TOML file listing the stores
    #[arg(long, env = "CATALOG_SOURCES", default_value = "sources.toml")]
    sources: PathBuf,

    /// Store ids to query (repeatable). Defaults to every configured store.
    #[arg(long = "select", value_name = "ID")]
    select: Vec<String>,

    /// Search term forwarded to every store
    #[arg(long, default_value = "")]
    search: String,

    /// First page to fetch
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// How many consecutive pages to fetch while stores report more
    #[arg(long, default_value_t = 1)]
    pages: u32,

    #[arg(long, env = "CATALOG_PAGE_SIZE", default_value_t = catalog_aggregator::DEFAULT_PAGE_SIZE)]
    page_size: u32,

    /// id or name
    #[arg(long, default_value = "id")]
    sort: SortKey,

    /// asc or desc
    #[arg(long, default_value = "asc")]
    order: SortDirection,

    #[arg(long, env = "CATALOG_TIMEOUT_SECONDS", default_value_t = 30)]
    timeout_seconds: u64,

    #[arg(long, env = "CATALOG_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Print the merged list as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("Starting Catalog Aggregator");

    let registry = load_sources(&args.sources)
        .with_context(|| format!("loading sources from {}", args.sources.display()))?;

    let selection: Vec<SourceId> = if args.select.is_empty() {
        registry.list_sources()?.into_iter().map(|source| source.id).collect()
    } else {
        args.select.iter().map(|id| SourceId::new(id.as_str())).collect()
    };

    if args.pages == 0 {
        bail!("--pages must be at least 1");
    }

    let config = AggregatorConfig {
        page_size: args.page_size,
        fetch: FetchConfig {
            timeout_seconds: args.timeout_seconds,
            max_retries: args.max_retries,
            ..FetchConfig::default()
        },
    };
    let aggregator = CatalogAggregator::with_config(Arc::new(registry), config)?;

    aggregator.on_progress(|progress| {
        if !progress.current_source_name.is_empty() {
            info!(
                "[{}/{}] {} (store {} of {})",
                progress.completed_sources,
                progress.total_sources,
                progress.current_source_name,
                progress.current_ordinal,
                progress.total_sources
            );
        }
    });

    let mut result = aggregator
        .fetch_page(&selection, PageQuery::new(args.page, args.search.as_str()))
        .await
        .map_err(|e| {
            error!("Aggregation failed: {}", e);
            e
        })?;

    for _ in 1..args.pages {
        if !result.has_more {
            break;
        }
        result = aggregator.load_more().await?;
    }

    for report in result.failed_sources() {
        warn!(
            "{} returned nothing: {}",
            report.source_name,
            report.error.as_deref().unwrap_or("unknown error")
        );
    }

    let items = sort_items(&result.set, SortOrder::new(args.sort, args.order));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for item in &items {
            println!(
                "{:<12} {:>8}  {:<50} {}",
                item.source_id,
                item.id,
                item.name,
                item.price.as_deref().unwrap_or("-")
            );
        }
    }

    info!(
        "{} products from {} stores (more available: {})",
        items.len(),
        selection.len(),
        result.has_more
    );
    Ok(())
}

use agent_client::GrpcAgentClient;
use anyhow::{Context, Result, anyhow};
use catalog::{Catalog, Record};
use clap::{Parser, Subcommand};
use colored::Colorize;
use recommender::Recommender;
use server::{
    AssistantHandler, AssistantSettings, InvokePayload, InvokeResponse, RequestContext,
    ServerConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// CloudLab Assistant - AWS lab recommendations and Q&A
#[derive(Parser)]
#[command(name = "cloudlab")]
#[command(about = "Recommend CloudLabs and ask the CloudLab Assistant", long_about = None)]
struct Cli {
    /// Bucket holding the catalog CSV (overrides CATALOG_BUCKET)
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Object key of the catalog CSV (overrides CATALOG_KEY)
    #[arg(long, global = true)]
    key: Option<String>,

    /// AWS region (overrides AWS_REGION)
    #[arg(long, global = true)]
    region: Option<String>,

    /// S3-compatible endpoint (overrides CATALOG_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Read the catalog from this directory instead of S3
    #[arg(long, global = true)]
    local_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend labs for a query
    Recommend {
        /// Free-text query
        #[arg(long)]
        query: String,

        /// Number of labs to return
        #[arg(long, default_value = "3")]
        limit: usize,

        /// Print the labs as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every lab in the catalog
    Catalog {
        /// Only show labs whose name contains this text (case-insensitive)
        #[arg(long)]
        filter: Option<String>,
    },

    /// Ask the assistant a question
    Ask {
        /// The prompt to send
        #[arg(long)]
        prompt: String,

        /// Conversation session id
        #[arg(long)]
        session_id: Option<String>,
    },

    /// Measure recommendation latency
    Benchmark {
        /// Number of queries to run
        #[arg(long, default_value = "1000")]
        requests: usize,

        /// Number of concurrent tasks
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    println!("Loading lab catalog from {}...", describe_source(&config));
    let start = Instant::now();
    let catalog = server::load_catalog_blocking(&config).await?;
    if catalog.is_empty() {
        println!(
            "{} Catalog is empty (see logs with RUST_LOG=info); continuing without labs",
            "!".yellow()
        );
    } else {
        println!(
            "{} Loaded {} labs in {:?}",
            "✓".green(),
            catalog.len(),
            start.elapsed()
        );
    }

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Recommend { query, limit, json } => {
            handle_recommend(&catalog, &query, limit, json)?
        }
        Commands::Catalog { filter } => handle_catalog(&catalog, filter.as_deref()),
        Commands::Ask { prompt, session_id } => {
            handle_ask(&config, catalog, prompt, session_id).await?
        }
        Commands::Benchmark {
            requests,
            concurrent,
        } => handle_benchmark(catalog, requests, concurrent).await?,
    }

    Ok(())
}

/// Environment (and `.env`) configuration, with CLI flags taking precedence
fn build_config(cli: &Cli) -> Result<ServerConfig> {
    dotenvy::dotenv().ok();

    let overrides: Vec<(&str, String)> = [
        ("CATALOG_BUCKET", cli.bucket.clone()),
        ("CATALOG_KEY", cli.key.clone()),
        ("AWS_REGION", cli.region.clone()),
        ("CATALOG_ENDPOINT", cli.endpoint.clone()),
        (
            "CATALOG_LOCAL_DIR",
            cli.local_dir.as_ref().map(|p| p.display().to_string()),
        ),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|v| (name, v)))
    .collect();

    ServerConfig::from_lookup(|name| {
        overrides
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.clone())
            .or_else(|| std::env::var(name).ok())
    })
    .context("Invalid configuration (set CATALOG_BUCKET or pass --bucket / --local-dir)")
}

fn describe_source(config: &ServerConfig) -> String {
    match &config.catalog.local_dir {
        Some(dir) => dir.join(&config.catalog.key).display().to_string(),
        None => format!("s3://{}/{}", config.catalog.bucket, config.catalog.key),
    }
}

/// Handle the 'recommend' command
fn handle_recommend(catalog: &Catalog, query: &str, limit: usize, json: bool) -> Result<()> {
    let recommender = Recommender::new().with_limit(limit);
    let ranked = recommender.rank(query, catalog.as_slice());

    if json {
        let labs: Vec<&Record> = ranked.iter().map(|m| m.record).collect();
        println!("{}", serde_json::to_string_pretty(&labs)?);
        return Ok(());
    }

    println!("{}", format!("Recommended labs for '{}':", query).bold().blue());
    if ranked.is_empty() {
        println!("  (no matching labs)");
    }
    for (i, matched) in ranked.iter().enumerate() {
        print_lab(i + 1, matched.record);
        println!("   Score: {}", matched.score);
    }
    Ok(())
}

/// Handle the 'catalog' command
fn handle_catalog(catalog: &Catalog, filter: Option<&str>) {
    let filter = filter.map(str::to_lowercase);
    let labs: Vec<&Record> = catalog
        .iter()
        .filter(|lab| match &filter {
            Some(f) => lab.label().to_lowercase().contains(f.as_str()),
            None => true,
        })
        .collect();

    println!("{}", format!("{} labs:", labs.len()).bold().blue());
    for (i, lab) in labs.iter().enumerate() {
        print_lab(i + 1, lab);
    }
}

/// Handle the 'ask' command
async fn handle_ask(
    config: &ServerConfig,
    catalog: Arc<Catalog>,
    prompt: String,
    session_id: Option<String>,
) -> Result<()> {
    let agent = GrpcAgentClient::connect(config.agent_addr.clone()).await?;
    let handler = AssistantHandler::new(catalog, Arc::new(agent), AssistantSettings::from(config));

    let context = RequestContext { session_id };
    match handler.invoke(InvokePayload::new(prompt), context).await {
        InvokeResponse::Response(text) => {
            println!("{}", "Assistant:".bold().green());
            println!("{}", text);
            Ok(())
        }
        InvokeResponse::Error(e) => Err(anyhow!("Assistant failed: {}", e)),
    }
}

/// Handle the 'benchmark' command
async fn handle_benchmark(catalog: Arc<Catalog>, requests: usize, concurrent: usize) -> Result<()> {
    if requests == 0 || concurrent == 0 {
        return Err(anyhow!("--requests and --concurrent must be greater than zero"));
    }

    // Queries built from words that appear in the catalog, so most of them match
    let vocabulary: Vec<String> = catalog
        .iter()
        .flat_map(|lab| lab.label().split_whitespace().map(str::to_string).collect::<Vec<_>>())
        .collect();
    let vocabulary = if vocabulary.is_empty() {
        vec!["aws".to_string()]
    } else {
        vocabulary
    };

    let queries: Vec<String> = (0..requests)
        .map(|_| {
            (0..3)
                .map(|_| vocabulary[rand::random::<u32>() as usize % vocabulary.len()].as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();

    // Split the queries across `concurrent` tasks
    let chunk_size = requests.div_ceil(concurrent);
    let recommender = Recommender::new();
    let wall_clock = Instant::now();
    let mut handles = vec![];
    for chunk in queries.chunks(chunk_size) {
        let chunk = chunk.to_vec();
        let catalog = catalog.clone();
        let recommender = recommender.clone();
        handles.push(tokio::spawn(async move {
            chunk
                .iter()
                .map(|query| {
                    let start = Instant::now();
                    let top = recommender.recommend(query, catalog.as_slice());
                    std::hint::black_box(top.len());
                    start.elapsed()
                })
                .collect::<Vec<Duration>>()
        }));
    }

    let mut timings = vec![];
    for handle in handles {
        timings.extend(handle.await?);
    }
    let wall_time = wall_clock.elapsed();

    let total_time: Duration = timings.iter().sum();
    let avg_latency = total_time / (timings.len() as u32);
    timings.sort();
    let percentile = |p: f32| timings[((timings.len() as f32 * p) as usize).min(timings.len() - 1)];

    println!("Benchmark results:");
    println!("Queries: {} across {} tasks", timings.len(), concurrent);
    println!("Wall time: {:?}", wall_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!(
        "Throughput: {:.2} queries/second",
        timings.len() as f64 / wall_time.as_secs_f64()
    );

    Ok(())
}

/// Helper function to print one lab
fn print_lab(rank: usize, lab: &Record) {
    println!(
        "{}. {}",
        rank.to_string().green(),
        lab.get("Name").unwrap_or(lab.label()).bold()
    );
    if let Some(link) = lab.get("Link") {
        println!("   {}", link.cyan());
    }
    if let Some(summary) = lab.get("Summary") {
        println!("   {}", summary);
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing::{info, warn};

use geneforest_agents::{OfflineRuntime, call_expert_agent, load_agents};
use geneforest_core::{
    AnalysisLogInput, AnalysisOptions, AnalysisOutcome, Config, ConfigLoader, ORCHESTRATOR_AGENT,
    ResultCache, TelemetryOptions, default_log_dir, init_telemetry, log_analysis_completion,
    metrics, run_analysis_session_with_options,
};

#[derive(Parser, Debug)]
#[command(
    name = "geneforest-cli",
    version,
    about = "GeneForest multi-agent gene-to-function analysis"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a single gene.
    Analyze(AnalyzeArgs),
    /// Analyze several genes sequentially with a shared agent set.
    Batch(BatchArgs),
    /// Query a single expert agent directly; the exchange is cached.
    Ask(AskArgs),
    /// Inspect the interim result cache.
    Cache(CacheArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Gene to analyze (e.g. NRF2, TP53, FOXO3).
    #[arg(default_value = "NRF2")]
    gene: String,

    /// Path to a configuration TOML file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Skip loading cached interim results; always issue fresh queries.
    #[arg(long)]
    no_cache: bool,

    /// Show tool distribution across agents before running.
    #[arg(long, short)]
    debug: bool,

    /// Suppress the session history after the analysis.
    #[arg(long)]
    no_history: bool,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Genes to analyze in order (e.g. NRF2 TP53 FOXO3).
    #[arg(required = true)]
    genes: Vec<String>,

    /// Path to a configuration TOML file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Skip loading cached interim results; always issue fresh queries.
    #[arg(long)]
    no_cache: bool,

    /// Show the session history after each analysis.
    #[arg(long)]
    show_history: bool,
}

#[derive(Args, Debug)]
struct AskArgs {
    /// Expert agent to query (e.g. biomart_agent, literature_agent).
    agent: String,

    /// Query to send.
    query: String,

    /// Path to a configuration TOML file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Codename of a specific instance when several share the name.
    #[arg(long)]
    codename: Option<String>,

    /// Do not persist the exchange to the result cache.
    #[arg(long)]
    no_cache: bool,
}

#[derive(Args, Debug)]
struct CacheArgs {
    /// Cache directory (defaults to GENEFOREST_CACHE_DIR or data/interim).
    #[arg(long)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: CacheCommand,
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Search cached records for a term (case-insensitive substring).
    Search {
        term: String,

        /// Include full result sections, not just the queries.
        #[arg(long)]
        full: bool,

        /// Emit JSON instead of a text listing.
        #[arg(long)]
        json: bool,
    },
    /// Print the full contents of records by identifier, in input order.
    Show {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let rt = Runtime::new()?;
    rt.block_on(async move {
        match cli.command {
            Command::Analyze(args) => analyze_command(args).await?,
            Command::Batch(args) => batch_command(args).await?,
            Command::Ask(args) => ask_command(args).await?,
            Command::Cache(args) => cache_command(args)?,
        }
        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}

fn setup(config: &Config) -> Result<()> {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| format!("{0},geneforest_core={0}", config.logging.level));
    init_telemetry(TelemetryOptions {
        env_filter: Some(env_filter),
        with_ansi: true,
    })?;
    metrics::init_metrics_from_env("geneforest-cli")?;
    Ok(())
}

fn announce_cache_mode(config: &Config) {
    if config.cache.enabled {
        info!(
            cache_dir = %config.cache.dir.display(),
            "interim result caching enabled; cached results will be reused"
        );
    } else {
        info!("interim result caching disabled; all queries go remote");
    }
}

fn print_tool_distribution(config: &Config) {
    println!("\nTool distribution across agents:");
    println!("{}", "-".repeat(60));
    for agent in &config.agents {
        match &agent.mcp {
            Some(mcp) if mcp.only_include_tools.is_empty() => {
                println!("{}: all tools from {}", agent.name, mcp.server);
            }
            Some(mcp) => {
                println!(
                    "{} ({} tools from {}):",
                    agent.name,
                    mcp.only_include_tools.len(),
                    mcp.server
                );
                for tool in &mcp.only_include_tools {
                    println!("    - {tool}");
                }
            }
            None => println!("{}: no remote toolset", agent.name),
        }
    }
    println!("{}", "-".repeat(60));
}

async fn run_one(config: &Config, gene: &str) -> Result<AnalysisOutcome> {
    // No remote agent runtime is wired up yet; the offline runtime keeps
    // the pipeline runnable end-to-end.
    warn!("remote agent runtime not configured; using the offline runtime");
    let registry = load_agents(config, Arc::new(OfflineRuntime::new()))?;

    let orchestrator = registry
        .agents_by_name(ORCHESTRATOR_AGENT)
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("orchestrator agent missing from registry"))?;

    let options = AnalysisOptions::new(gene, orchestrator.executor)
        .with_report_dir(config.report.dir.clone());
    let outcome = run_analysis_session_with_options(options).await?;

    let log_input = AnalysisLogInput {
        session_id: outcome.session_id.clone(),
        gene: outcome.gene.clone(),
        summary: outcome.summary.clone(),
        report_path: outcome
            .report_path
            .as_ref()
            .map(|path| path.display().to_string()),
        validation_passed: outcome.validation_passed,
        cache_enabled: config.cache.enabled,
        continuations: outcome.continuations,
        trace_path: outcome
            .trace_path
            .as_ref()
            .map(|path| path.display().to_string()),
    };
    if let Err(err) = log_analysis_completion(&default_log_dir(), log_input) {
        warn!(error = %err, "failed to append analysis completion log");
    }

    Ok(outcome)
}

async fn analyze_command(args: AnalyzeArgs) -> Result<()> {
    let mut config = ConfigLoader::load(args.config)?;
    if args.no_cache {
        config.cache.enabled = false;
    }
    setup(&config)?;
    announce_cache_mode(&config);

    if args.debug {
        print_tool_distribution(&config);
    }

    info!(gene = %args.gene, "starting gene analysis session");
    let outcome = run_one(&config, &args.gene).await?;

    println!("{}", outcome.summary);
    if let Some(path) = &outcome.report_path {
        println!("  Open report: {}", path.display());
    }

    if !args.no_history {
        println!("\n{}", outcome.trace_summary.render_markdown());
    }

    Ok(())
}

async fn batch_command(args: BatchArgs) -> Result<()> {
    let mut config = ConfigLoader::load(args.config)?;
    if args.no_cache {
        config.cache.enabled = false;
    }
    setup(&config)?;
    announce_cache_mode(&config);

    let mut results: Vec<(String, &'static str)> = Vec::new();
    for gene in &args.genes {
        info!(%gene, "starting gene analysis session");
        match run_one(&config, gene).await {
            Ok(outcome) => {
                println!("{}", outcome.summary);
                if let Some(path) = &outcome.report_path {
                    println!("  Open report: {}", path.display());
                }
                if args.show_history {
                    println!("\n{}", outcome.trace_summary.render_markdown());
                }
                results.push((
                    gene.clone(),
                    if outcome.requires_review { "warning" } else { "success" },
                ));
            }
            Err(err) => {
                warn!(%gene, error = %err, "analysis failed");
                println!("✗ {gene}: analysis failed: {err}");
                results.push((gene.clone(), "failed"));
            }
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("ANALYSIS SUMMARY");
    println!("{}", "=".repeat(60));
    for (gene, status) in &results {
        let symbol = match *status {
            "success" => "✓",
            "warning" => "⚠",
            _ => "✗",
        };
        println!("{symbol} {gene}: {status}");
    }

    Ok(())
}

async fn ask_command(args: AskArgs) -> Result<()> {
    let mut config = ConfigLoader::load(args.config)?;
    if args.no_cache {
        config.cache.enabled = false;
    }
    setup(&config)?;

    warn!("remote agent runtime not configured; using the offline runtime");
    let registry = load_agents(&config, Arc::new(OfflineRuntime::new()))?;

    let cache = ResultCache::new(config.cache.dir.clone());
    let cache_ref = config.cache.enabled.then_some(&cache);

    let response = call_expert_agent(
        &registry,
        cache_ref,
        &args.agent,
        &args.query,
        args.codename.as_deref(),
        args.codename.is_none(),
    )
    .await;

    println!("{response}");
    Ok(())
}

fn cache_command(args: CacheArgs) -> Result<()> {
    init_telemetry(TelemetryOptions::default())?;
    let cache = ResultCache::new(args.dir.unwrap_or_else(ResultCache::default_root));

    match args.command {
        CacheCommand::Search { term, full, json } => {
            if full {
                let hits = cache.search(&term);
                if json {
                    println!("{}", serde_json::to_string_pretty(&hits)?);
                } else {
                    for hit in &hits {
                        println!("{}", hit.identifier);
                        println!("  query: {}", hit.query);
                        println!("  result: {} chars", hit.result.len());
                    }
                    println!("{} match(es)", hits.len());
                }
            } else {
                let hits = cache.search_queries_only(&term);
                if json {
                    println!("{}", serde_json::to_string_pretty(&hits)?);
                } else {
                    for hit in &hits {
                        println!("{}", hit.identifier);
                        println!("  query: {}", hit.query);
                    }
                    println!("{} match(es)", hits.len());
                }
            }
        }
        CacheCommand::Show { identifiers } => {
            let content = cache.read(&identifiers);
            if content.is_empty() {
                println!("(no records resolved)");
            } else {
                println!("{content}");
            }
        }
    }

    Ok(())
}

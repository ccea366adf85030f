//! Bucket Forge - public S3 bucket discovery
//!
//! Builds bucket-name permutations from a domain or keyword and probes each
//! candidate for public ACLs and policies.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use bucket_forge::{
    permute::{PermutationEngine, RuleCatalog, Seed},
    runner::read_domain_list,
    scan::StatsSnapshot,
    BucketForgeError, Result, RunConfig, RunSummary, Runner, ScanConfig, SeedMode,
};
use clap::{Args, Parser, Subcommand};

const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(name = "bucket-forge")]
#[command(about = "Permutation-driven public S3 bucket finder")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    scan: ScanArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the run summary as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ScanArgs {
    /// Concurrent probe workers
    #[arg(short, long, global = true, default_value_t = 16)]
    concurrency: usize,

    /// Capacity of the candidate queue
    #[arg(long, global = true, default_value_t = 256)]
    queue_capacity: usize,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 10)]
    timeout: u64,

    /// Retries for throttled or failed requests
    #[arg(long, global = true, default_value_t = 2)]
    retries: u32,

    /// S3 endpoint
    #[arg(long, global = true, default_value = "https://s3.amazonaws.com")]
    endpoint: String,

    /// Rule catalog JSON replacing the built-in one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Accumulate stats across seeds instead of resetting per seed
    #[arg(long, global = true)]
    no_reset_stats: bool,

    /// List candidates without probing
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan permutations of one or more domains
    Domain {
        /// Target domains
        #[arg(short, long, required = true, num_args = 1.., value_delimiter = ',')]
        target: Vec<String>,
    },

    /// Scan permutations of a keyword list
    Keyword {
        /// Keywords
        #[arg(short, long, required = true, num_args = 1.., value_delimiter = ',')]
        target: Vec<String>,
    },

    /// Scan every domain listed in a file, one per line
    DomainList {
        /// Newline-delimited domain file
        #[arg(short, long, default_value = "domainlist.txt")]
        file: PathBuf,
    },

    /// Find public buckets in the account behind the AWS credentials
    Account {
        /// Region for the signed requests (defaults to AWS_REGION)
        #[arg(short, long)]
        region: Option<String>,
    },

    /// Print the effective rule catalog as JSON
    Catalog,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = bucket_forge::init() {
        eprintln!("❌ Failed to initialize: {}", e);
        process::exit(1);
    }

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.user_message());
            e.exit_code()
        }
    };
    process::exit(code);
}

async fn execute(cli: Cli) -> Result<i32> {
    let scan = build_scan_config(&cli.scan)?;

    let mode = match cli.command {
        Commands::Catalog => {
            println!("{}", scan.catalog.to_json()?);
            return Ok(0);
        }
        Commands::Domain { target } => SeedMode::Domain { domains: target },
        Commands::Keyword { target } => SeedMode::Keyword { keywords: target },
        Commands::DomainList { file } => SeedMode::DomainList { path: file },
        Commands::Account { region } => SeedMode::Account {
            region: region.unwrap_or_else(default_region),
        },
    };

    let config = RunConfig {
        mode,
        scan,
        reset_stats_per_seed: !cli.scan.no_reset_stats,
    };

    if cli.scan.dry_run {
        return dry_run(&config).await.map(|_| 0);
    }

    let runner = Runner::from_config(&config)?;

    tokio::select! {
        result = runner.run(&config) => {
            let summary = result?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                display_summary(&summary);
            }
            Ok(0)
        }
        _ = tokio::signal::ctrl_c() => {
            let partial = runner.current_stats();
            tracing::warn!("Interrupted, reporting partial stats");
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&partial)?);
            } else {
                display_stats("Partial", &partial);
            }
            Ok(EXIT_INTERRUPTED)
        }
    }
}

fn build_scan_config(args: &ScanArgs) -> Result<ScanConfig> {
    let catalog = match &args.catalog {
        Some(path) => RuleCatalog::load(path)?,
        None => RuleCatalog::default(),
    };

    let config = ScanConfig {
        concurrency: args.concurrency,
        queue_capacity: args.queue_capacity,
        timeout: Duration::from_secs(args.timeout),
        retry_attempts: args.retries,
        endpoint: args.endpoint.clone(),
        catalog,
        ..Default::default()
    };
    config.validate()?;
    Ok(config)
}

fn default_region() -> String {
    ["AWS_REGION", "AWS_DEFAULT_REGION"]
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "us-east-1".to_string())
}

/// Print every candidate a run would probe, one per line.
///
/// Domains get one engine each, keywords share one, matching what a real run
/// deduplicates.
async fn dry_run(config: &RunConfig) -> Result<()> {
    let engines = match &config.mode {
        SeedMode::Domain { domains } => per_seed(parse_seeds(domains, Seed::domain), config)?,
        SeedMode::Keyword { keywords } => vec![PermutationEngine::new(
            parse_seeds(keywords, Seed::keyword),
            &config.scan.catalog,
        )?],
        SeedMode::DomainList { path } => {
            let domains = read_domain_list(path).await?;
            per_seed(parse_seeds(&domains, Seed::domain), config)?
        }
        SeedMode::Account { .. } => {
            return Err(BucketForgeError::config("--dry-run has no meaning in account mode"));
        }
    };

    for candidate in engines.into_iter().flatten() {
        println!("{}", candidate);
    }
    Ok(())
}

fn per_seed(seeds: Vec<Seed>, config: &RunConfig) -> Result<Vec<PermutationEngine>> {
    seeds
        .into_iter()
        .map(|seed| PermutationEngine::for_seed(seed, &config.scan.catalog))
        .collect()
}

fn parse_seeds(inputs: &[String], parse: fn(&str) -> Result<Seed>) -> Vec<Seed> {
    inputs
        .iter()
        .filter_map(|input| match parse(input) {
            Ok(seed) => Some(seed),
            Err(e) => {
                tracing::warn!("Skipping seed: {}", e);
                None
            }
        })
        .collect()
}

fn display_summary(summary: &RunSummary) {
    println!();
    println!("🪣 Bucket Forge - {} scan", summary.mode);
    println!("═══════════════════════════════════");

    for report in &summary.seeds {
        display_stats(&report.seed, &report.stats);
    }
    if summary.failed_seeds > 0 {
        println!("⚠️  {} seed(s) skipped", summary.failed_seeds);
    }

    if !summary.findings.is_empty() {
        println!();
        println!("🎉 Public Buckets ({}):", summary.findings.len());
        println!("─────────────────────────");
        for finding in &summary.findings {
            match &finding.detail {
                Some(detail) => println!("✅ {} - {} ({})", finding.candidate, finding.outcome, detail),
                None => println!("✅ {} - {}", finding.candidate, finding.outcome),
            }
        }
    }

    if let Some(account) = &summary.account {
        println!();
        println!("🔐 Account buckets: {} public", account.total());
        for bucket in &account.acl {
            println!("✅ {} - public (ACL)", bucket);
        }
        for bucket in &account.policy {
            println!("✅ {} - public (policy)", bucket);
        }
    }

    println!();
    println!(
        "📊 Total: {} checked, {} public, {} errors",
        summary.total_checked(),
        summary.total_public(),
        summary.total_errors()
    );
}

fn display_stats(label: &str, stats: &StatsSnapshot) {
    println!(
        "🔍 {}: {} checked, {} public, {} private, {} errors in {:.1}s ({:.1}/s)",
        label,
        stats.checked,
        stats.found_public(),
        stats.private,
        stats.errors,
        stats.elapsed.as_secs_f64(),
        stats.rate()
    );
}

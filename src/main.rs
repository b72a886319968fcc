//! cvrf-review: review Fortinet CVRF vulnerability advisories.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use cvrf_review::filter::{AdvisoryFilter, FilterCriteria, ScoreBoundary, is_full_version};
use cvrf_review::logging::init_logging;
use cvrf_review::manager::{self, AdvisoryManager};
use cvrf_review::models::{Advisory, Severity};
use cvrf_review::render::{self, TableRenderer};
use cvrf_review::Config;
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser)]
#[command(name = "cvrf-review")]
#[command(version, about = "Review CVRF formatted vulnerability data", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Critical FortiOS advisories
    cvrf-review fortinet -s critical -p FortiOS

    # Advisories listing one exact product version
    cvrf-review fortinet affected --product FortiOS --version 6.4.10

    # Refresh the local document cache
    cvrf-review fortinet sync")]
struct Cli {
    /// Filter by severity (critical, high, medium, low)
    #[arg(short, long, global = true)]
    severity: Option<Severity>,

    /// Minimum CVSS score; overrides the severity band
    #[arg(long, global = true)]
    min_cvss_score: Option<f64>,

    /// Maximum CVSS score; overrides the severity band
    #[arg(long, global = true)]
    max_cvss_score: Option<f64>,

    /// Exclude advisories scored exactly at the minimum or maximum
    #[arg(long, global = true)]
    exclusive_bounds: bool,

    /// Print output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Disable the table border
    #[arg(long, global = true)]
    disable_border: bool,

    /// Directory holding the `<year>/<id>.json` documents
    #[arg(long, global = true, env = "CVRF_REVIEW__DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get Fortinet vulnerabilities
    Fortinet(FortinetArgs),
}

#[derive(Args)]
struct FortinetArgs {
    /// Filter by product type as written by Fortinet (e.g. FortiOS, FortiClientEMS);
    /// repeat the flag for several types
    #[arg(short = 'p', long, action = ArgAction::Append)]
    product_types: Vec<String>,

    /// Read advisories from the live feed instead of the local cache
    #[arg(long)]
    online: bool,

    #[command(subcommand)]
    command: Option<FortinetCommand>,
}

#[derive(Subcommand)]
enum FortinetCommand {
    /// List vulnerabilities for a specific product version
    Affected {
        /// Product name (e.g. FortiOS)
        #[arg(long)]
        product: String,

        /// Product version (e.g. 6.4.10)
        #[arg(short, long)]
        version: String,
    },
    /// Download advisories missing from the local cache
    Sync,
    /// List the product types found in the local cache
    Products,
}

/// Severity band first, then explicit score flags.
fn resolve_criteria(
    severity: Option<Severity>,
    min_cvss_score: Option<f64>,
    max_cvss_score: Option<f64>,
    product_types: &[String],
) -> FilterCriteria {
    let mut criteria = severity
        .map(FilterCriteria::from_severity)
        .unwrap_or_default();
    if let Some(min) = min_cvss_score {
        criteria.min_score = min;
    }
    if let Some(max) = max_cvss_score {
        criteria.max_score = max;
    }
    criteria.with_product_types(product_types)
}

fn print_advisories(advisories: &[Advisory], json: bool, border: bool) -> Result<()> {
    if json {
        println!("{}", render::to_json(advisories)?);
        return Ok(());
    }

    let renderer = TableRenderer::new(border);
    for advisory in advisories {
        println!("{}", renderer.render(advisory));
        println!();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(data_dir) = cli.data_dir.clone() {
        config.data_dir = data_dir;
    }
    let _guard = init_logging(&config);

    let boundary = if cli.exclusive_bounds {
        ScoreBoundary::Exclusive
    } else {
        ScoreBoundary::Inclusive
    };
    let manager = AdvisoryManager::new(&config, AdvisoryFilter::new(boundary))?;

    let Commands::Fortinet(args) = cli.command;
    let criteria = resolve_criteria(
        cli.severity,
        cli.min_cvss_score,
        cli.max_cvss_score,
        &args.product_types,
    );
    let border = !cli.disable_border;

    match args.command {
        None => {
            let advisories = if args.online {
                manager.fetch_remote().await?
            } else {
                manager.load_local().await?
            };
            let matched = manager.query(&advisories, &criteria);
            print_advisories(&matched, cli.json, border)?;
        }
        Some(FortinetCommand::Affected { product, version }) => {
            if !is_full_version(&version) {
                warn!(
                    "Version {:?} is not a full major.minor.patch version; exact matching will likely find nothing",
                    version
                );
            }
            let matched = manager.affected(&product, &version, &criteria).await?;
            if matched.is_empty() && !cli.json {
                println!("No matching advisories found.");
                return Ok(());
            }
            print_advisories(&matched, cli.json, border)?;
        }
        Some(FortinetCommand::Sync) => {
            let report = manager.sync().await?;
            println!(
                "Fetched {} advisories, {} already cached, {} in manifest",
                report.fetched, report.skipped, report.manifest_entries
            );
        }
        Some(FortinetCommand::Products) => {
            let advisories = manager.load_local().await?;
            for product_type in manager::product_types(&advisories) {
                println!("{}", product_type);
            }
        }
    }

    Ok(())
}

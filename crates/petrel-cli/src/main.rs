mod submit;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use petrel_client::{HttpFetcher, PetitionClient};
use petrel_core::harvest::{HarvestConfig, HarvestService};
use petrel_core::retry::{RetryPolicy, RetryingFetcher};
use petrel_store::CsvSink;

#[derive(Parser)]
#[command(name = "petrel", version, about = "Sequential petition data harvester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest reasons, updates, and metadata for a list of petition URLs
    Harvest {
        /// Path to a newline-delimited list of petition URLs
        #[arg(short, long)]
        urls: PathBuf,

        /// API key, embedded in every request
        #[arg(short, long, env = "PETREL_API_KEY")]
        api_key: String,

        /// Output CSV path (defaults to <batch name>_data.csv next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// API base URL
        #[arg(long, default_value = "https://api.change.org/v1")]
        base_url: String,

        /// Flush the result table after this many committed records
        #[arg(long, default_value_t = 25)]
        checkpoint_every: usize,
    },

    /// Submit one cluster job per (batch file, API key) pairing
    Submit {
        /// Path to the API key list (CSV, key in the fourth column)
        #[arg(short, long)]
        keys: PathBuf,

        /// Directory holding .dat batch files of petition URLs
        #[arg(short, long)]
        batch_dir: PathBuf,

        /// Scheduler command the submission script is handed to
        #[arg(long, default_value = "qsub")]
        scheduler: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("petrel=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Harvest {
            urls,
            api_key,
            output,
            base_url,
            checkpoint_every,
        } => {
            let output = output.unwrap_or_else(|| derive_output_path(&urls));
            cmd_harvest(&urls, &api_key, &output, &base_url, checkpoint_every).await?;
        }
        Commands::Submit {
            keys,
            batch_dir,
            scheduler,
        } => {
            submit::cmd_submit(&keys, &batch_dir, &scheduler)?;
        }
    }

    Ok(())
}

/// Default output path: `<run name>_data.csv` in the input's directory,
/// where the run name is derived the same way as the cluster job name.
fn derive_output_path(urls_path: &Path) -> PathBuf {
    let name = submit::run_name(urls_path);
    urls_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{name}_data.csv"))
}

async fn cmd_harvest(
    urls_path: &Path,
    api_key: &str,
    output: &Path,
    base_url: &str,
    checkpoint_every: usize,
) -> Result<()> {
    // The whole list is read up front; an unreadable input is fatal.
    let contents = std::fs::read_to_string(urls_path)
        .with_context(|| format!("failed to read URL list: {}", urls_path.display()))?;
    let urls: Vec<String> = contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.to_string())
        .collect();

    tracing::info!(
        urls = urls.len(),
        output = %output.display(),
        "Starting harvest"
    );

    let fetcher = HttpFetcher::new().map_err(|e| anyhow::anyhow!(e))?;
    let fetcher = RetryingFetcher::new(fetcher, RetryPolicy::default());
    let api = PetitionClient::with_base_url(fetcher, api_key, base_url);
    let sink = CsvSink::new(output);
    let service =
        HarvestService::with_config(api, sink, HarvestConfig { checkpoint_every });

    let table = service.run(&urls).await.map_err(|e| anyhow::anyhow!(e))?;

    // Skipped petitions do not affect the exit status; compare the row
    // count against the input list to detect attrition.
    println!(
        "Collected {} of {} petitions into {}",
        table.len(),
        urls.len(),
        output.display()
    );

    Ok(())
}

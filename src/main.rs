mod cache;
mod config;
mod distribution;
mod eastmoney;
mod export;
mod fetcher;
mod logging;
mod retry;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::Config;
use crate::distribution::Bins;
use crate::eastmoney::EastmoneyClient;
use crate::export::Exporter;
use crate::fetcher::ConceptStockFetcher;

#[derive(Parser, Debug)]
#[command(name = "boardscan")]
#[command(about = "Fetch Eastmoney concept boards and their constituent stocks")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./boardscan.yaml, then $XDG_CONFIG_HOME/boardscan/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List every concept board
  Concepts {
    /// Ignore the cached board list and refetch it
    #[arg(long)]
    refresh: bool,
  },
  /// Fetch and save the constituents of the named boards. A single unknown
  /// name is an error; with several, unknown names are skipped.
  Stocks {
    #[arg(required = true)]
    names: Vec<String>,
  },
  /// Fetch and save the constituents of every board in `default_concepts`
  Batch,
  /// Count A-shares per daily change range
  Distribution,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration; a missing file is fatal
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log, args.verbose)?;

  let client = EastmoneyClient::new(&config.fetch)?;
  let fetcher = ConceptStockFetcher::from_config(client, &config);
  let exporter = Exporter::new(&config.output.directory, config.output.format);

  match args.command {
    Command::Concepts { refresh } => {
      let boards = fetcher.get_all_concepts(!refresh).await?;
      info!("{} concept boards", boards.len());
      if config.output.save_all_concepts {
        exporter.save(&boards, &config.output.all_concepts_file_name)?;
      } else {
        for board in &boards {
          println!("{}\t{}\t{}", board.rank, board.code, board.name);
        }
      }
    }
    Command::Stocks { names } if names.len() == 1 => {
      fetcher.save_concept_stocks(&names[0], &exporter).await?;
    }
    Command::Stocks { names } => run_batch(&fetcher, &names, &exporter).await?,
    Command::Batch => run_batch(&fetcher, &config.default_concepts, &exporter).await?,
    Command::Distribution => {
      let settings = &config.distribution;
      let bins = Bins::new(settings.bins.clone(), settings.labels.clone())
        .map_err(|e| color_eyre::eyre::eyre!("Invalid distribution bins: {}", e))?;

      let dist = fetcher
        .change_distribution(&bins, config.data_processing.change_unit)
        .await?;

      info!(
        "Change distribution for {} ({} classified, {} unclassified)",
        chrono::Local::now().format("%Y-%m-%d"),
        dist.classified(),
        dist.unclassified
      );
      for bin in &dist.bins {
        println!("{}\t{}", bin.label, bin.count);
      }
      if settings.save {
        exporter.save(&dist.bins, &settings.file_name)?;
      }
    }
  }

  Ok(())
}

async fn run_batch(
  fetcher: &ConceptStockFetcher<EastmoneyClient>,
  names: &[String],
  exporter: &Exporter,
) -> Result<()> {
  let report = fetcher.run_batch(names, exporter).await?;
  info!(
    "Saved {} board(s), skipped {}",
    report.saved.len(),
    report.skipped.len()
  );
  if !report.skipped.is_empty() {
    warn!("Boards not found: {}", report.skipped.join(", "));
  }
  Ok(())
}

//! Concept-board fetching: all boards, one board's constituents, and the
//! batch driver over a list of board names.

use color_eyre::Result;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::{CacheLayer, CacheSource, DiskCache};
use crate::config::Config;
use crate::distribution::{Bins, ChangeUnit, Distribution};
use crate::eastmoney::{
  rows_from_records, ConceptBoard, ConstituentRow, FetchError, ListingQuery, ListingRow,
  ListingSource, PaginatedFetcher, StockQuote,
};
use crate::export::Exporter;
use crate::retry::RetryPolicy;

/// Cache key of the full board list.
pub const ALL_CONCEPTS_KEY: &str = "all_concepts";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
  #[error("concept board not found: {name}")]
  BoardNotFound { name: String },
}

/// Code of the first board called `name`.
pub fn resolve_board_code<'a>(boards: &'a [ConceptBoard], name: &str) -> Result<&'a str, LookupError> {
  boards
    .iter()
    .find(|b| b.name == name)
    .map(|b| b.code.as_str())
    .ok_or_else(|| LookupError::BoardNotFound {
      name: name.to_string(),
    })
}

/// Outcome of a batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
  /// Board name and number of constituents saved
  pub saved: Vec<(String, usize)>,
  /// Names with no matching board
  pub skipped: Vec<String>,
}

pub struct ConceptStockFetcher<S> {
  pager: PaginatedFetcher<S>,
  retry: RetryPolicy,
  cache: CacheLayer,
}

impl<S: ListingSource> ConceptStockFetcher<S> {
  pub fn new(pager: PaginatedFetcher<S>, retry: RetryPolicy, cache: CacheLayer) -> Self {
    Self {
      pager,
      retry,
      cache,
    }
  }

  pub fn from_config(source: S, config: &Config) -> Self {
    let cache = if config.cache.enabled {
      CacheLayer::new(DiskCache::new(
        &config.cache.directory,
        Duration::from_secs(config.cache.ttl_seconds),
      ))
    } else {
      CacheLayer::disabled()
    };

    Self::new(
      PaginatedFetcher::from_config(source, &config.fetch),
      RetryPolicy::from_config(&config.retry),
      cache,
    )
  }

  /// Page through `query` with retries; each retry starts again from page 1.
  async fn fetch_listing<T: ListingRow>(&self, query: &ListingQuery) -> Result<Vec<T>, FetchError> {
    let records = self
      .retry
      .run_if(|| self.pager.fetch_all(query), FetchError::is_transient)
      .await?;
    Ok(rows_from_records(&records))
  }

  /// Every concept board, served from cache when allowed and fresh.
  pub async fn get_all_concepts(&self, use_cache: bool) -> Result<Vec<ConceptBoard>> {
    let result = self
      .cache
      .fetch(ALL_CONCEPTS_KEY, use_cache, || async {
        let boards = self
          .fetch_listing::<ConceptBoard>(&ListingQuery::all_concepts())
          .await?;
        Ok(boards)
      })
      .await?;

    match (result.source, result.cached_at) {
      (CacheSource::CacheFresh, Some(at)) => info!(
        "Loaded {} concept boards from cache (written {})",
        result.data.len(),
        at.format("%Y-%m-%d %H:%M:%S")
      ),
      _ => info!("Fetched {} concept boards", result.data.len()),
    }
    Ok(result.data)
  }

  /// Constituents of the board with internal code `code`. Never cached.
  pub async fn get_board_stocks(&self, code: &str) -> Result<Vec<ConstituentRow>> {
    let rows = self
      .fetch_listing::<ConstituentRow>(&ListingQuery::board_constituents(code))
      .await?;
    Ok(rows)
  }

  /// Constituents of the board called `name`.
  ///
  /// Fails with `LookupError::BoardNotFound` when no board has that name.
  pub async fn get_concept_stocks(&self, name: &str) -> Result<Vec<ConstituentRow>> {
    let boards = self.get_all_concepts(true).await?;
    let code = resolve_board_code(&boards, name)?;
    info!("Fetching constituents of {} ({})", name, code);
    self.get_board_stocks(code).await
  }

  /// Fetch one board's constituents and export them under the board name.
  pub async fn save_concept_stocks(&self, name: &str, exporter: &Exporter) -> Result<PathBuf> {
    let rows = self.get_concept_stocks(name).await?;
    exporter.save(&rows, name)
  }

  /// Fetch and export each named board's constituents.
  ///
  /// Unknown names are logged and skipped; fetch failures that survive the
  /// retry policy abort the batch.
  pub async fn run_batch(&self, names: &[String], exporter: &Exporter) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    if names.is_empty() {
      warn!("No concept boards to fetch");
      return Ok(report);
    }

    let boards = self.get_all_concepts(true).await?;
    for name in names {
      let code = match resolve_board_code(&boards, name) {
        Ok(code) => code,
        Err(e) => {
          warn!("{}", e);
          report.skipped.push(name.clone());
          continue;
        }
      };

      info!("Fetching constituents of {} ({})", name, code);
      let rows = self.get_board_stocks(code).await?;
      exporter.save(&rows, name)?;
      report.saved.push((name.clone(), rows.len()));
    }

    Ok(report)
  }

  /// Whole-market spot quotes.
  pub async fn get_spot_quotes(&self) -> Result<Vec<StockQuote>> {
    let rows = self
      .fetch_listing::<StockQuote>(&ListingQuery::a_share_spot())
      .await?;
    Ok(rows)
  }

  /// Bin today's change percentages of every A-share.
  pub async fn change_distribution(&self, bins: &Bins, unit: ChangeUnit) -> Result<Distribution> {
    let quotes = self.get_spot_quotes().await?;
    Ok(bins.count(quotes.iter().map(|q| q.change_percent), unit))
  }
}

//! Reassembles a complete listing from a page-capped endpoint.
//!
//! Upstream silently truncates every response to 100 rows regardless of the
//! requested page size, so a listing is fetched as `ceil(total / page_size)`
//! sequential requests, where `total` comes from the first response.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::api_types::Record;
use super::client::{FetchError, ListingQuery, ListingSource};
use crate::config::FetchConfig;

/// Most rows upstream returns for one request.
pub const UPSTREAM_PAGE_CAP: u64 = 100;

pub fn total_pages(total: u64, page_size: u64) -> u64 {
  total.div_ceil(page_size.max(1))
}

pub struct PaginatedFetcher<S> {
  source: S,
  page_size: u64,
  page_delay: Duration,
}

impl<S: ListingSource> PaginatedFetcher<S> {
  /// `page_size` is kept within 1..=`UPSTREAM_PAGE_CAP`.
  pub fn new(source: S, page_size: u64, page_delay: Duration) -> Self {
    Self {
      source,
      page_size: page_size.clamp(1, UPSTREAM_PAGE_CAP),
      page_delay,
    }
  }

  /// Page sizes above the upstream cap would make the page count too small
  /// and silently drop rows, so they are clamped with a warning.
  pub fn from_config(source: S, config: &FetchConfig) -> Self {
    if config.page_size > UPSTREAM_PAGE_CAP {
      warn!(
        "fetch.page_size {} exceeds the upstream cap, using {}",
        config.page_size, UPSTREAM_PAGE_CAP
      );
    }
    Self::new(source, config.page_size, Duration::from_millis(config.page_delay_ms))
  }

  #[cfg(test)]
  pub fn source(&self) -> &S {
    &self.source
  }

  /// Fetch every record of `query`, in upstream order.
  ///
  /// No state survives a failure: calling again starts over from page 1.
  pub async fn fetch_all(&self, query: &ListingQuery) -> Result<Vec<Record>, FetchError> {
    let first = self.source.fetch_page(query, 1, self.page_size).await?;
    let total = first.total;
    let pages = total_pages(total, self.page_size);
    info!("Fetching {} rows of {} in {} page(s)", total, query.label, pages);

    let mut records = Vec::new();
    records.extend(first.records);

    for page in 2..=pages {
      self.pause().await;
      let next = self.source.fetch_page(query, page, self.page_size).await?;
      debug!("Page {}/{} of {}: {} rows", page, pages, query.label, next.records.len());
      records.extend(next.records);
    }

    if records.len() as u64 != total {
      warn!(
        "{}: upstream reported {} rows but {} were returned",
        query.label,
        total,
        records.len()
      );
    }

    Ok(records)
  }

  async fn pause(&self) {
    if !self.page_delay.is_zero() {
      tokio::time::sleep(self.page_delay).await;
    }
  }
}

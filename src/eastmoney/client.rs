//! Listing source trait and the Eastmoney HTTP client behind it.

use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::api_types::{ApiListResponse, Record};
use crate::config::FetchConfig;

/// Fixed token every `clist/get` request carries.
const UT: &str = "bd1d9ddb04089700cf9c27f6f7426281";

const LIST_PATH: &str = "/api/qt/clist/get";

/// Failures while talking to the listing endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("request to {url} failed: {source}")]
  Http {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("HTTP {status} from {url}")]
  Status { url: String, status: u16 },

  #[error("malformed response from {url}: {source}")]
  Decode {
    url: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("response from {url} has no {what}")]
  MissingData { url: String, what: &'static str },
}

impl FetchError {
  /// Everything the endpoint can throw at us is worth another try.
  pub fn is_transient(&self) -> bool {
    matches!(
      self,
      FetchError::Http { .. }
        | FetchError::Status { .. }
        | FetchError::Decode { .. }
        | FetchError::MissingData { .. }
    )
  }
}

/// Which listing to page through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
  /// Human-readable label for logs
  pub label: String,
  /// Sort field (`fid`)
  pub sort_field: &'static str,
  /// Universe filter expression (`fs`)
  pub filter: String,
  /// Comma-separated field codes
  pub fields: &'static str,
}

impl ListingQuery {
  /// Every concept board.
  pub fn all_concepts() -> Self {
    Self {
      label: "all concept boards".to_string(),
      sort_field: "f12",
      filter: "m:90 t:3 f:!50".to_string(),
      fields: "f2,f3,f4,f8,f12,f14,f20,f104,f105,f128,f136",
    }
  }

  /// Constituents of the board with internal code `board_code` (e.g. "BK0800").
  pub fn board_constituents(board_code: &str) -> Self {
    Self {
      label: format!("constituents of {}", board_code),
      sort_field: "f3",
      filter: format!("b:{} f:!50", board_code),
      fields: "f2,f3,f4,f5,f6,f7,f8,f9,f12,f14,f15,f16,f17,f18,f23",
    }
  }

  /// Spot quotes of every A-share on the Shanghai and Shenzhen boards.
  pub fn a_share_spot() -> Self {
    Self {
      label: "A-share spot quotes".to_string(),
      sort_field: "f3",
      filter: "m:0 t:6,m:0 t:80,m:1 t:2,m:1 t:23,m:0 t:81 s:2048".to_string(),
      fields: "f3,f12,f14",
    }
  }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
  /// Total rows across all pages, as reported by upstream
  pub total: u64,
  pub records: Vec<Record>,
}

/// Anything that can serve a single page of a listing.
#[allow(async_fn_in_trait)]
pub trait ListingSource {
  /// Fetch page `page` (1-based) with at most `page_size` rows.
  async fn fetch_page(
    &self,
    query: &ListingQuery,
    page: u64,
    page_size: u64,
  ) -> Result<ListingPage, FetchError>;
}

/// Eastmoney `clist/get` client.
#[derive(Clone)]
pub struct EastmoneyClient {
  http: reqwest::Client,
  endpoint: Url,
}

impl EastmoneyClient {
  pub fn new(config: &FetchConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    let endpoint = Url::parse(&config.base_url)
      .and_then(|base| base.join(LIST_PATH))
      .map_err(|e| eyre!("Invalid fetch.base_url {}: {}", config.base_url, e))?;

    Ok(Self { http, endpoint })
  }

  /// Full request URL for one page.
  pub fn page_url(&self, query: &ListingQuery, page: u64, page_size: u64) -> Url {
    let mut url = self.endpoint.clone();
    url
      .query_pairs_mut()
      .append_pair("pn", &page.to_string())
      .append_pair("pz", &page_size.to_string())
      .append_pair("po", "1")
      .append_pair("np", "2")
      .append_pair("ut", UT)
      .append_pair("fltt", "2")
      .append_pair("invt", "2")
      .append_pair("fid", query.sort_field)
      .append_pair("fs", &query.filter)
      .append_pair("fields", query.fields)
      .append_pair("_", &chrono::Utc::now().timestamp_millis().to_string());
    url
  }
}

/// Decode a `clist/get` body into a page.
pub fn parse_page(url: &str, body: &str) -> Result<ListingPage, FetchError> {
  let response: ApiListResponse = serde_json::from_str(body).map_err(|source| FetchError::Decode {
    url: url.to_string(),
    source,
  })?;

  let Some(data) = response.data else {
    debug!("{} answered rc={} without data", url, response.rc);
    return Err(FetchError::MissingData {
      url: url.to_string(),
      what: "data",
    });
  };
  let total = data.total.ok_or_else(|| FetchError::MissingData {
    url: url.to_string(),
    what: "data.total",
  })?;

  Ok(ListingPage {
    total,
    records: data.diff.map(|d| d.into_records()).unwrap_or_default(),
  })
}

impl ListingSource for EastmoneyClient {
  async fn fetch_page(
    &self,
    query: &ListingQuery,
    page: u64,
    page_size: u64,
  ) -> Result<ListingPage, FetchError> {
    let url = self.page_url(query, page, page_size);
    debug!("GET {}", url);

    let response = self
      .http
      .get(url.clone())
      .send()
      .await
      .map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
      })?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Status {
        url: url.to_string(),
        status: status.as_u16(),
      });
    }

    let body = response.text().await.map_err(|source| FetchError::Http {
      url: url.to_string(),
      source,
    })?;

    parse_page(url.as_str(), &body)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client() -> EastmoneyClient {
    EastmoneyClient::new(&FetchConfig::default()).unwrap()
  }

  #[test]
  fn test_page_url_carries_listing_params() {
    let url = client().page_url(&ListingQuery::board_constituents("BK0800"), 3, 100);
    assert_eq!(url.path(), "/api/qt/clist/get");

    let pairs: std::collections::HashMap<String, String> = url.query_pairs().into_owned().collect();
    assert_eq!(pairs["pn"], "3");
    assert_eq!(pairs["pz"], "100");
    assert_eq!(pairs["fid"], "f3");
    assert_eq!(pairs["fs"], "b:BK0800 f:!50");
    assert_eq!(pairs["ut"], UT);
    assert!(pairs["fields"].contains("f12"));
  }

  #[test]
  fn test_invalid_base_url_rejected() {
    let config = FetchConfig {
      base_url: "not a url".to_string(),
      ..FetchConfig::default()
    };
    assert!(EastmoneyClient::new(&config).is_err());
  }

  #[test]
  fn test_parse_page() {
    let body = r#"{"rc":0,"data":{"total":3,"diff":[{"f12":"BK1"},{"f12":"BK2"}]}}"#;
    let page = parse_page("u", body).unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.records.len(), 2);
  }

  #[test]
  fn test_parse_page_empty_diff() {
    let page = parse_page("u", r#"{"data":{"total":0,"diff":null}}"#).unwrap();
    assert_eq!(page, ListingPage::default());
  }

  #[test]
  fn test_parse_page_failures_are_transient() {
    let bad_json = parse_page("u", "<html>").unwrap_err();
    assert!(matches!(bad_json, FetchError::Decode { .. }));

    let no_data = parse_page("u", r#"{"rc":102,"data":null}"#).unwrap_err();
    assert!(matches!(no_data, FetchError::MissingData { what: "data", .. }));

    let no_total = parse_page("u", r#"{"data":{"diff":[]}}"#).unwrap_err();
    assert!(matches!(no_total, FetchError::MissingData { what: "data.total", .. }));

    assert!(bad_json.is_transient() && no_data.is_transient() && no_total.is_transient());
  }
}

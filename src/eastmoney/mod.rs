//! Eastmoney quote-listing API: raw response types, the HTTP client, paging
//! and the typed rows built from listing records.

pub mod api_types;
pub mod client;
pub mod paginate;
pub mod types;

pub use client::{EastmoneyClient, FetchError, ListingQuery, ListingSource};
pub use paginate::PaginatedFetcher;
pub use types::{rows_from_records, ConceptBoard, ConstituentRow, ListingRow, StockQuote};

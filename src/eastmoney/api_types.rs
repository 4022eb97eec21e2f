//! Serde-deserializable types matching the Eastmoney `clist/get` response.
//!
//! Records stay as raw JSON maps here; mapping field codes onto typed rows
//! happens in `types`, after all pages are collected.

use serde::Deserialize;
use std::collections::HashMap;

/// One upstream record: field code ("f12", "f14", ...) to raw value.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Deserialize)]
pub struct ApiListResponse {
  #[serde(default)]
  pub rc: i64,
  /// Null when the filter matches nothing or the request was rejected
  pub data: Option<ApiListData>,
}

#[derive(Debug, Deserialize)]
pub struct ApiListData {
  pub total: Option<u64>,
  #[serde(default)]
  pub diff: Option<ApiDiff>,
}

/// `diff` arrives as an array or, depending on `np`, as an object keyed by
/// stringified row positions.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiDiff {
  List(Vec<Record>),
  Keyed(HashMap<String, Record>),
}

impl ApiDiff {
  /// Records in upstream order. Keyed entries are ordered by their numeric key,
  /// with non-numeric keys last in string order.
  pub fn into_records(self) -> Vec<Record> {
    match self {
      ApiDiff::List(records) => records,
      ApiDiff::Keyed(map) => {
        let mut entries: Vec<(String, Record)> = map.into_iter().collect();
        entries.sort_by(|(a, _), (b, _)| {
          match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => a.cmp(b),
          }
        });
        entries.into_iter().map(|(_, record)| record).collect()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn codes(records: &[Record]) -> Vec<&str> {
    records
      .iter()
      .map(|r| r.get("f12").and_then(|v| v.as_str()).unwrap_or(""))
      .collect()
  }

  #[test]
  fn test_keyed_diff_orders_numerically() {
    let json = r#"{
      "rc": 0,
      "data": {
        "total": 12,
        "diff": {
          "10": {"f12": "K"}, "2": {"f12": "C"}, "0": {"f12": "A"},
          "1": {"f12": "B"}, "11": {"f12": "L"}
        }
      }
    }"#;
    let resp: ApiListResponse = serde_json::from_str(json).unwrap();
    let data = resp.data.unwrap();
    assert_eq!(data.total, Some(12));
    let records = data.diff.unwrap().into_records();
    assert_eq!(codes(&records), vec!["A", "B", "C", "K", "L"]);
  }

  #[test]
  fn test_list_diff_keeps_order() {
    let json = r#"{"data": {"total": 2, "diff": [{"f12": "Z"}, {"f12": "Y"}]}}"#;
    let resp: ApiListResponse = serde_json::from_str(json).unwrap();
    let records = resp.data.unwrap().diff.unwrap().into_records();
    assert_eq!(codes(&records), vec!["Z", "Y"]);
  }

  #[test]
  fn test_null_data() {
    let resp: ApiListResponse = serde_json::from_str(r#"{"rc": 102, "data": null}"#).unwrap();
    assert_eq!(resp.rc, 102);
    assert!(resp.data.is_none());
  }
}

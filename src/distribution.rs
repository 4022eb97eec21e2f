//! Distribution of daily price changes across labelled ranges.

use serde::Deserialize;
use thiserror::Error;

use crate::export::Tabular;

/// How upstream expresses a change value.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeUnit {
  /// 2.5 means +2.5%
  #[default]
  Percent,
  /// 0.025 means +2.5%
  Fraction,
}

impl ChangeUnit {
  pub fn to_percent(self, value: f64) -> f64 {
    match self {
      ChangeUnit::Percent => value,
      ChangeUnit::Fraction => value * 100.0,
    }
  }
}

#[derive(Debug, Error, PartialEq)]
pub enum BinsError {
  #[error("need at least two bin edges, got {0}")]
  TooFewEdges(usize),
  #[error("bin edges must be strictly increasing ({0} then {1})")]
  NotIncreasing(f64, f64),
  #[error("{labels} labels given for {edges} bin edges, need one label per bin")]
  LabelCount { edges: usize, labels: usize },
}

/// Right-closed ranges `(edges[i], edges[i + 1]]`, one label each.
#[derive(Debug, Clone)]
pub struct Bins {
  edges: Vec<f64>,
  labels: Vec<String>,
}

impl Bins {
  pub fn new(edges: Vec<f64>, labels: Vec<String>) -> Result<Self, BinsError> {
    if edges.len() < 2 {
      return Err(BinsError::TooFewEdges(edges.len()));
    }
    if let Some(w) = edges.windows(2).find(|w| !(w[0] < w[1])) {
      return Err(BinsError::NotIncreasing(w[0], w[1]));
    }
    if labels.len() != edges.len() - 1 {
      return Err(BinsError::LabelCount {
        edges: edges.len(),
        labels: labels.len(),
      });
    }
    Ok(Self { edges, labels })
  }

  /// Index of the bin holding `value`, if any.
  pub fn locate(&self, value: f64) -> Option<usize> {
    if value.is_nan() || value <= self.edges[0] || value > self.edges[self.edges.len() - 1] {
      return None;
    }
    // First edge >= value closes the bin
    let upper = self.edges.partition_point(|e| *e < value);
    Some(upper - 1)
  }

  /// Count values per bin; `None` and out-of-range values are unclassified.
  pub fn count<I>(&self, values: I, unit: ChangeUnit) -> Distribution
  where
    I: IntoIterator<Item = Option<f64>>,
  {
    let mut counts = vec![0u64; self.labels.len()];
    let mut unclassified = 0;
    for value in values {
      match value.map(|v| unit.to_percent(v)).and_then(|v| self.locate(v)) {
        Some(i) => counts[i] += 1,
        None => unclassified += 1,
      }
    }

    Distribution {
      bins: self
        .labels
        .iter()
        .enumerate()
        .map(|(i, label)| BinCount {
          label: label.clone(),
          lower: self.edges[i],
          upper: self.edges[i + 1],
          count: counts[i],
        })
        .collect(),
      unclassified,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinCount {
  pub label: String,
  pub lower: f64,
  pub upper: f64,
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
  pub bins: Vec<BinCount>,
  pub unclassified: u64,
}

impl Distribution {
  pub fn classified(&self) -> u64 {
    self.bins.iter().map(|b| b.count).sum()
  }
}

impl Tabular for BinCount {
  fn headers() -> &'static [&'static str] {
    &["category", "lower", "upper", "count"]
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.label.clone(),
      self.lower.to_string(),
      self.upper.to_string(),
      self.count.to_string(),
    ]
  }

  fn text_columns() -> &'static [usize] {
    &[0]
  }
}

//! Typed rows built from raw listing records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::api_types::Record;
use crate::export::Tabular;

/// Rows that can be built from one upstream record.
///
/// `index` is the row's 1-based position in the reassembled listing; upstream
/// positions are per page and not trusted.
pub trait ListingRow: Sized {
  fn from_record(index: u64, record: &Record) -> Self;
}

/// Map reassembled records onto rows numbered 1..=N.
pub fn rows_from_records<T: ListingRow>(records: &[Record]) -> Vec<T> {
  records
    .iter()
    .enumerate()
    .map(|(i, record)| T::from_record(i as u64 + 1, record))
    .collect()
}

/// Coerce a raw value to a number. Anything unparseable (upstream sends "-"
/// for suspended stocks) becomes `None`.
pub fn to_number(value: Option<&Value>) -> Option<f64> {
  let n = match value? {
    Value::Number(n) => n.as_f64()?,
    Value::String(s) => {
      let cleaned: String = s
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
      cleaned.parse::<f64>().ok()?
    }
    _ => return None,
  };
  n.is_finite().then_some(n)
}

/// Like `to_number`, for non-negative whole counts.
pub fn to_count(value: Option<&Value>) -> Option<u64> {
  to_number(value)
    .filter(|n| *n >= 0.0 && n.fract() == 0.0)
    .map(|n| n as u64)
}

/// Text field; numbers are rendered, null and missing become empty.
pub fn to_text(value: Option<&Value>) -> String {
  match value {
    Some(Value::String(s)) => s.clone(),
    Some(Value::Number(n)) => n.to_string(),
    Some(Value::Bool(b)) => b.to_string(),
    _ => String::new(),
  }
}

fn cell<T: ToString>(value: Option<T>) -> String {
  value.map(|v| v.to_string()).unwrap_or_default()
}

/// One concept board from the board listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptBoard {
  pub rank: u64,
  pub name: String,
  pub code: String,
  pub latest_price: Option<f64>,
  pub change_amount: Option<f64>,
  pub change_percent: Option<f64>,
  pub total_market_cap: Option<f64>,
  pub turnover_rate: Option<f64>,
  pub advancing: Option<u64>,
  pub declining: Option<u64>,
  pub leading_stock: String,
  pub leading_stock_change_percent: Option<f64>,
}

impl ListingRow for ConceptBoard {
  fn from_record(index: u64, r: &Record) -> Self {
    Self {
      rank: index,
      name: to_text(r.get("f14")),
      code: to_text(r.get("f12")),
      latest_price: to_number(r.get("f2")),
      change_amount: to_number(r.get("f4")),
      change_percent: to_number(r.get("f3")),
      total_market_cap: to_number(r.get("f20")),
      turnover_rate: to_number(r.get("f8")),
      advancing: to_count(r.get("f104")),
      declining: to_count(r.get("f105")),
      leading_stock: to_text(r.get("f128")),
      leading_stock_change_percent: to_number(r.get("f136")),
    }
  }
}

impl Tabular for ConceptBoard {
  fn headers() -> &'static [&'static str] {
    &[
      "排名",
      "板块名称",
      "板块代码",
      "最新价",
      "涨跌额",
      "涨跌幅",
      "总市值",
      "换手率",
      "上涨家数",
      "下跌家数",
      "领涨股票",
      "领涨股票-涨跌幅",
    ]
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.rank.to_string(),
      self.name.clone(),
      self.code.clone(),
      cell(self.latest_price),
      cell(self.change_amount),
      cell(self.change_percent),
      cell(self.total_market_cap),
      cell(self.turnover_rate),
      cell(self.advancing),
      cell(self.declining),
      self.leading_stock.clone(),
      cell(self.leading_stock_change_percent),
    ]
  }

  fn text_columns() -> &'static [usize] {
    &[1, 2, 10]
  }
}

/// One constituent stock of a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstituentRow {
  pub seq: u64,
  pub code: String,
  pub name: String,
  pub latest_price: Option<f64>,
  pub change_percent: Option<f64>,
  pub change_amount: Option<f64>,
  pub volume: Option<f64>,
  pub turnover: Option<f64>,
  pub amplitude: Option<f64>,
  pub high: Option<f64>,
  pub low: Option<f64>,
  pub open: Option<f64>,
  pub prev_close: Option<f64>,
  pub turnover_rate: Option<f64>,
  pub pe_dynamic: Option<f64>,
  pub pb: Option<f64>,
}

impl ListingRow for ConstituentRow {
  fn from_record(index: u64, r: &Record) -> Self {
    Self {
      seq: index,
      code: to_text(r.get("f12")),
      name: to_text(r.get("f14")),
      latest_price: to_number(r.get("f2")),
      change_percent: to_number(r.get("f3")),
      change_amount: to_number(r.get("f4")),
      volume: to_number(r.get("f5")),
      turnover: to_number(r.get("f6")),
      amplitude: to_number(r.get("f7")),
      high: to_number(r.get("f15")),
      low: to_number(r.get("f16")),
      open: to_number(r.get("f17")),
      prev_close: to_number(r.get("f18")),
      turnover_rate: to_number(r.get("f8")),
      pe_dynamic: to_number(r.get("f9")),
      pb: to_number(r.get("f23")),
    }
  }
}

impl Tabular for ConstituentRow {
  fn headers() -> &'static [&'static str] {
    &[
      "序号",
      "代码",
      "名称",
      "最新价",
      "涨跌幅",
      "涨跌额",
      "成交量",
      "成交额",
      "振幅",
      "最高",
      "最低",
      "今开",
      "昨收",
      "换手率",
      "市盈率-动态",
      "市净率",
    ]
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.seq.to_string(),
      self.code.clone(),
      self.name.clone(),
      cell(self.latest_price),
      cell(self.change_percent),
      cell(self.change_amount),
      cell(self.volume),
      cell(self.turnover),
      cell(self.amplitude),
      cell(self.high),
      cell(self.low),
      cell(self.open),
      cell(self.prev_close),
      cell(self.turnover_rate),
      cell(self.pe_dynamic),
      cell(self.pb),
    ]
  }

  fn text_columns() -> &'static [usize] {
    &[1, 2]
  }
}

/// Whole-market spot quote, only what the change distribution needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
  pub seq: u64,
  pub code: String,
  pub name: String,
  pub change_percent: Option<f64>,
}

impl ListingRow for StockQuote {
  fn from_record(index: u64, r: &Record) -> Self {
    Self {
      seq: index,
      code: to_text(r.get("f12")),
      name: to_text(r.get("f14")),
      change_percent: to_number(r.get("f3")),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn record(value: Value) -> Record {
    value.as_object().unwrap().clone()
  }

  #[test]
  fn test_to_number_coercion() {
    assert_eq!(to_number(Some(&json!(12.5))), Some(12.5));
    assert_eq!(to_number(Some(&json!(7))), Some(7.0));
    assert_eq!(to_number(Some(&json!("3.25"))), Some(3.25));
    assert_eq!(to_number(Some(&json!(" -1.5% "))), Some(-1.5));
    assert_eq!(to_number(Some(&json!("1,234.5"))), Some(1234.5));
    assert_eq!(to_number(Some(&json!("-"))), None);
    assert_eq!(to_number(Some(&json!(""))), None);
    assert_eq!(to_number(Some(&json!("abc"))), None);
    assert_eq!(to_number(Some(&json!("NaN"))), None);
    assert_eq!(to_number(Some(&Value::Null)), None);
    assert_eq!(to_number(Some(&json!([1]))), None);
    assert_eq!(to_number(None), None);
  }

  #[test]
  fn test_to_count() {
    assert_eq!(to_count(Some(&json!(17))), Some(17));
    assert_eq!(to_count(Some(&json!("8"))), Some(8));
    assert_eq!(to_count(Some(&json!(-1))), None);
    assert_eq!(to_count(Some(&json!(2.5))), None);
    assert_eq!(to_count(Some(&json!("-"))), None);
  }

  #[test]
  fn test_to_text() {
    assert_eq!(to_text(Some(&json!("BK0800"))), "BK0800");
    assert_eq!(to_text(Some(&json!(600519))), "600519");
    assert_eq!(to_text(Some(&Value::Null)), "");
    assert_eq!(to_text(None), "");
  }

  #[test]
  fn test_concept_board_mapping() {
    let r = record(json!({
      "f2": 1021.33, "f3": 2.15, "f4": 21.5, "f8": 3.1, "f12": "BK0800",
      "f14": "人工智能", "f20": 1.5e12, "f104": 300, "f105": "12",
      "f128": "某某科技", "f136": "-", "f999": "dropped"
    }));
    let board = ConceptBoard::from_record(7, &r);
    assert_eq!(board.rank, 7);
    assert_eq!(board.code, "BK0800");
    assert_eq!(board.name, "人工智能");
    assert_eq!(board.latest_price, Some(1021.33));
    assert_eq!(board.change_amount, Some(21.5));
    assert_eq!(board.change_percent, Some(2.15));
    assert_eq!(board.total_market_cap, Some(1.5e12));
    assert_eq!(board.advancing, Some(300));
    assert_eq!(board.declining, Some(12));
    assert_eq!(board.leading_stock, "某某科技");
    assert_eq!(board.leading_stock_change_percent, None);

    let cells = board.cells();
    assert_eq!(cells.len(), ConceptBoard::headers().len());
    assert_eq!(cells[0], "7");
    assert_eq!(cells[11], "");
  }

  #[test]
  fn test_constituent_mapping_tolerates_missing_fields() {
    let r = record(json!({"f12": "000001", "f14": "平安银行", "f2": "-", "f23": 0.55}));
    let row = ConstituentRow::from_record(1, &r);
    assert_eq!(row.seq, 1);
    assert_eq!(row.code, "000001");
    assert_eq!(row.latest_price, None);
    assert_eq!(row.volume, None);
    assert_eq!(row.pb, Some(0.55));
    assert_eq!(row.cells().len(), ConstituentRow::headers().len());

    let text: Vec<&str> = ConstituentRow::text_columns()
      .iter()
      .map(|i| ConstituentRow::headers()[*i])
      .collect();
    assert_eq!(text, vec!["代码", "名称"]);
  }

  #[test]
  fn test_rows_from_records_numbers_from_one() {
    let records: Vec<Record> = (0..5)
      .map(|i| record(json!({"f12": format!("{:06}", i), "f3": i})))
      .collect();
    let rows: Vec<StockQuote> = rows_from_records(&records);
    let seqs: Vec<u64> = rows.iter().map(|r| r.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    assert_eq!(rows[4].change_percent, Some(4.0));

    let empty: Vec<StockQuote> = rows_from_records(&[]);
    assert!(empty.is_empty());
  }
}

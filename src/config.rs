use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::distribution::ChangeUnit;
use crate::export::OutputFormat;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub output: OutputConfig,
  /// Boards whose constituents the `batch` command fetches
  #[serde(default)]
  pub default_concepts: Vec<String>,
  #[serde(default)]
  pub retry: RetryConfig,
  #[serde(default)]
  pub fetch: FetchConfig,
  #[serde(default)]
  pub log: LogConfig,
  #[serde(default)]
  pub data_processing: DataProcessingConfig,
  #[serde(default)]
  pub distribution: DistributionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub enabled: bool,
  pub directory: PathBuf,
  pub ttl_seconds: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      directory: PathBuf::from("cache"),
      ttl_seconds: 24 * 60 * 60,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
  pub directory: PathBuf,
  pub format: OutputFormat,
  /// Export the full board list when running `concepts`
  pub save_all_concepts: bool,
  #[serde(alias = "all_concept_file_name")]
  pub all_concepts_file_name: String,
}

impl Default for OutputConfig {
  fn default() -> Self {
    Self {
      directory: PathBuf::from("output"),
      format: OutputFormat::Csv,
      save_all_concepts: false,
      all_concepts_file_name: "所有概念板块".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
  pub max_attempts: u32,
  pub delay_secs: f64,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      delay_secs: 5.0,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
  pub base_url: String,
  /// Upstream caps pages at 100 rows no matter what is requested
  pub page_size: u64,
  pub page_delay_ms: u64,
  pub timeout_secs: u64,
}

impl Default for FetchConfig {
  fn default() -> Self {
    Self {
      base_url: "https://push2.eastmoney.com".to_string(),
      page_size: 100,
      page_delay_ms: 500,
      timeout_secs: 10,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Filter directive used when RUST_LOG is unset (e.g. "info", "boardscan=debug")
  pub level: String,
  /// Also append plain-text logs to this file
  pub file: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      file: None,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataProcessingConfig {
  pub change_unit: ChangeUnit,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
  /// Bin edges, strictly increasing; each bin is (edge[i], edge[i + 1]]
  pub bins: Vec<f64>,
  pub labels: Vec<String>,
  pub save: bool,
  pub file_name: String,
}

impl Default for DistributionConfig {
  fn default() -> Self {
    Self {
      bins: vec![-100.0, -7.0, -5.0, -3.0, 0.0, 3.0, 5.0, 7.0, 100.0],
      labels: ["<-7%", "-7~-5%", "-5~-3%", "-3~0%", "0~3%", "3~5%", "5~7%", ">7%"]
        .iter()
        .map(|s| s.to_string())
        .collect(),
      save: true,
      file_name: "stock_category_stats".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./boardscan.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/boardscan/config.yaml
  ///
  /// Relative directories in the file are resolved against the file's own directory.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create ./boardscan.yaml or ~/.config/boardscan/config.yaml\n\
                 See boardscan.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("boardscan.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("boardscan").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config = Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    let base = path
      .parent()
      .filter(|p| !p.as_os_str().is_empty())
      .unwrap_or_else(|| Path::new("."));
    Ok(config.relative_to(base))
  }

  pub fn from_yaml(contents: &str) -> serde_yaml::Result<Self> {
    // An empty file is a valid all-defaults config
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Anchor every relative path in the config at `base`.
  pub fn relative_to(mut self, base: &Path) -> Self {
    let anchor = |p: &mut PathBuf| {
      if p.is_relative() {
        *p = base.join(&*p);
      }
    };
    anchor(&mut self.cache.directory);
    anchor(&mut self.output.directory);
    if let Some(file) = self.log.file.as_mut() {
      anchor(file);
    }
    self
  }
}

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::types::{ScanStrategy, StockPolicy};

/// Exact marker phrase for the explicit-markers stock policy. Matched
/// case-insensitively with flexible whitespace; trailing punctuation on the
/// page is irrelevant since this is a substring search.
pub const SOLD_OUT_MARKER: &str = "Sold out online";

/// Name used when no label is configured for a product.
pub const PLACEHOLDER_NAME: &str = "Unknown Product";

/// Per-request timeout (seconds).
pub const FETCH_TIMEOUT_SECS: u64 = 15;

/// Upstream rejects obvious bot agents, so the client presents as a browser.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_TIER1_MAX: f64 = 50.0;
pub const DEFAULT_TIER2_MAX: f64 = 60.0;
pub const DEFAULT_PLAUSIBLE_MIN: f64 = 20.0;
pub const DEFAULT_PLAUSIBLE_MAX: f64 = 300.0;
pub const DEFAULT_CHECK_INTERVAL_MINUTES: u64 = 15;
pub const DEFAULT_PRODUCT_DELAY_SECS: u64 = 2;

#[derive(Debug, Clone, Deserialize)]
pub struct ProductConfig {
    pub url: String,
    /// Optional display label. Preferred over any on-page heading so displayed
    /// names stay stable across page redesigns.
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// true = SMTPS (implicit TLS, typically port 465); false = STARTTLS.
    #[serde(default)]
    pub implicit_tls: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub products: Vec<ProductConfig>,
    /// Prices strictly below this are tier "best".
    #[serde(default = "default_tier1_max")]
    pub tier1_max: f64,
    /// Prices in [tier1_max, tier2_max) are tier "great"; at or above, no tier.
    #[serde(default = "default_tier2_max")]
    pub tier2_max: f64,
    #[serde(default = "default_plausible_min")]
    pub plausible_min: f64,
    #[serde(default = "default_plausible_max")]
    pub plausible_max: f64,
    #[serde(default = "default_check_interval")]
    pub check_interval_minutes: u64,
    /// Politeness delay between product checks within a pass.
    #[serde(default = "default_product_delay")]
    pub product_delay_secs: u64,
    /// Required — the two policies disagree on the no-signal default, so the
    /// deployment has to state which one it wants.
    pub stock_policy: StockPolicy,
    #[serde(default)]
    pub scan_strategy: ScanStrategy,
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Logs extraction evidence at info level instead of debug.
    #[serde(default)]
    pub debug: bool,
    pub email: EmailConfig,
}

fn default_tier1_max() -> f64 {
    DEFAULT_TIER1_MAX
}
fn default_tier2_max() -> f64 {
    DEFAULT_TIER2_MAX
}
fn default_plausible_min() -> f64 {
    DEFAULT_PLAUSIBLE_MIN
}
fn default_plausible_max() -> f64 {
    DEFAULT_PLAUSIBLE_MAX
}
fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_MINUTES
}
fn default_product_delay() -> u64 {
    DEFAULT_PRODUCT_DELAY_SECS
}
fn default_state_file() -> PathBuf {
    PathBuf::from("monitor_state.json")
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_smtp_port() -> u16 {
    587
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        let cfg: Config = serde_json::from_str(&raw).map_err(|e| {
            AppError::Config(format!("cannot parse config file {}: {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.products.is_empty() {
            return Err(AppError::Config("products list is empty".to_string()));
        }
        for p in &self.products {
            if !p.url.starts_with("http://") && !p.url.starts_with("https://") {
                return Err(AppError::Config(format!(
                    "product url is not http(s): {}",
                    p.url
                )));
            }
        }
        if !(self.tier1_max > 0.0) {
            return Err(AppError::Config("tier1_max must be positive".to_string()));
        }
        if !(self.tier1_max < self.tier2_max) {
            return Err(AppError::Config(format!(
                "tier1_max ({}) must be below tier2_max ({})",
                self.tier1_max, self.tier2_max
            )));
        }
        if !(self.plausible_min < self.plausible_max) {
            return Err(AppError::Config(format!(
                "plausible_min ({}) must be below plausible_max ({})",
                self.plausible_min, self.plausible_max
            )));
        }
        if self.check_interval_minutes == 0 {
            return Err(AppError::Config(
                "check_interval_minutes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn extract_options(&self) -> crate::types::ExtractOptions {
        crate::types::ExtractOptions {
            plausible_min: self.plausible_min,
            plausible_max: self.plausible_max,
            stock_policy: self.stock_policy,
            scan_strategy: self.scan_strategy,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Config> {
        let cfg: Config = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn base_json() -> String {
        r#"{
            "products": [{"url": "https://shop.example.com/p/align-25", "label": "Align 25\""}],
            "stock_policy": "explicit_markers",
            "email": {
                "smtp_host": "smtp.example.com",
                "from": "monitor@example.com",
                "to": "me@example.com"
            }
        }"#
        .to_string()
    }

    #[test]
    fn minimal_config_applies_defaults() {
        let cfg = parse(&base_json()).unwrap();
        assert_eq!(cfg.tier1_max, DEFAULT_TIER1_MAX);
        assert_eq!(cfg.tier2_max, DEFAULT_TIER2_MAX);
        assert_eq!(cfg.check_interval_minutes, DEFAULT_CHECK_INTERVAL_MINUTES);
        assert_eq!(cfg.email.smtp_port, 587);
        assert_eq!(cfg.scan_strategy, ScanStrategy::First);
        assert_eq!(cfg.stock_policy, StockPolicy::ExplicitMarkers);
        assert!(!cfg.debug);
    }

    #[test]
    fn missing_stock_policy_is_rejected() {
        let json = base_json().replace(r#""stock_policy": "explicit_markers","#, "");
        assert!(parse(&json).is_err());
    }

    #[test]
    fn empty_products_rejected() {
        let json = base_json().replace(
            r#"[{"url": "https://shop.example.com/p/align-25", "label": "Align 25\""}]"#,
            "[]",
        );
        let err = parse(&json).unwrap_err();
        assert!(err.to_string().contains("products"), "{err}");
    }

    #[test]
    fn inverted_tiers_rejected() {
        let json = base_json().replace(
            r#""stock_policy""#,
            r#""tier1_max": 70, "tier2_max": 60, "stock_policy""#,
        );
        assert!(parse(&json).is_err());
    }

    #[test]
    fn non_http_url_rejected() {
        let json = base_json().replace("https://shop.example.com/p/align-25", "ftp://nope");
        assert!(parse(&json).is_err());
    }

    #[test]
    fn multi_signal_policy_parses() {
        let json = base_json().replace("explicit_markers", "multi_signal");
        let cfg = parse(&json).unwrap();
        assert_eq!(cfg.stock_policy, StockPolicy::MultiSignal);
    }
}

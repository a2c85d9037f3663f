use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Check result
// ---------------------------------------------------------------------------

/// Outcome of one fetch-and-extract attempt against a product page.
/// Built once per check and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ProductCheckResult {
    pub url: String,
    /// Display name — the configured label when present, a placeholder
    /// otherwise. On-page headings never end up here, only in `evidence`.
    pub name: String,
    /// None means "could not be determined", never zero.
    pub price: Option<f64>,
    pub in_stock: bool,
    pub checked_at: DateTime<Utc>,
    /// Which heuristics fired, in order. Diagnostic only — nothing downstream
    /// reads these.
    pub evidence: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Price bracket that qualifies a product for an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// price < tier1_max — "best deal"
    Best,
    /// tier1_max <= price < tier2_max — "great deal"
    Great,
}

impl Tier {
    pub fn label(self) -> &'static str {
        match self {
            Tier::Best => "Best deal",
            Tier::Great => "Great deal",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Tier::Best => "best",
            Tier::Great => "great",
        };
        write!(f, "{s}")
    }
}

/// Per-product state persisted across runs, keyed by product URL.
/// Created lazily on the first check of a URL and updated on every check
/// thereafter; entries are never evicted.
///
/// `was_in_best` and `was_in_great` reflect the *most recent* classification,
/// not "ever achieved" — that is what lets a product that drops out of both
/// tiers and later re-enters fire a fresh alert. At most one of the two flags
/// is true.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierState {
    #[serde(default)]
    pub was_in_best: bool,
    #[serde(default)]
    pub was_in_great: bool,
    #[serde(default)]
    pub last_price: Option<f64>,
    #[serde(default)]
    pub last_in_stock: bool,
    #[serde(default)]
    pub last_tier: Option<Tier>,
    #[serde(default)]
    pub last_alerted_tier: Option<Tier>,
    #[serde(default)]
    pub last_alerted_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Extraction policies
// ---------------------------------------------------------------------------

/// How stock status is decided. Both behaviors exist in production; the
/// deployment must pick one explicitly in its config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    /// Default in-stock; only the exact sold-out marker phrase flips it.
    ExplicitMarkers,
    /// Default out-of-stock; an ordered signal chain has to prove otherwise.
    MultiSignal,
}

impl std::fmt::Display for StockPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockPolicy::ExplicitMarkers => write!(f, "explicit_markers"),
            StockPolicy::MultiSignal => write!(f, "multi_signal"),
        }
    }
}

/// Which in-range match the whole-page price scan keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStrategy {
    First,
    Lowest,
}

impl Default for ScanStrategy {
    fn default() -> Self {
        ScanStrategy::First
    }
}

/// Explicit context handed to the extractor — no ambient shared object.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Bounds used to reject numeric false positives (shipping costs, sizes,
    /// IDs) during unstructured scans. Structured sources skip this filter.
    pub plausible_min: f64,
    pub plausible_max: f64,
    pub stock_policy: StockPolicy,
    pub scan_strategy: ScanStrategy,
}

impl ExtractOptions {
    pub fn in_range(&self, price: f64) -> bool {
        price >= self.plausible_min && price <= self.plausible_max
    }
}

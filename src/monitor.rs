use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::extract;
use crate::fetcher::{build_client, fetch_page};
use crate::notifier::{compose_alert, Notifier};
use crate::state::{StateStore, TierStateMap};
use crate::tier::{self, Thresholds};
use crate::types::{ExtractOptions, ProductCheckResult};

/// Counters for one pass over the configured products.
#[derive(Debug, Default)]
pub struct PassStats {
    pub checked: usize,
    pub fetch_failures: usize,
    pub no_price: usize,
    pub alerts_sent: usize,
    pub delivery_failures: usize,
}

/// Sequential orchestrator: fetch → extract → classify → alert → persist,
/// one product at a time with a politeness delay in between. A pass never
/// fails; per-product trouble is logged and skipped.
pub struct Monitor<N: Notifier> {
    cfg: Config,
    client: reqwest::Client,
    store: StateStore,
    notifier: N,
    thresholds: Thresholds,
    opts: ExtractOptions,
}

impl<N: Notifier> Monitor<N> {
    pub fn new(cfg: Config, notifier: N) -> Result<Self> {
        let client = build_client()?;
        let store = StateStore::new(cfg.state_file.clone());
        let thresholds = Thresholds {
            tier1_max: cfg.tier1_max,
            tier2_max: cfg.tier2_max,
        };
        let opts = cfg.extract_options();
        Ok(Self {
            cfg,
            client,
            store,
            notifier,
            thresholds,
            opts,
        })
    }

    pub async fn run_pass(&self) -> PassStats {
        let mut stats = PassStats::default();
        let mut state = self.store.load();
        let total = self.cfg.products.len();

        for (idx, product) in self.cfg.products.iter().enumerate() {
            stats.checked += 1;
            info!(url = %product.url, "Checking product {}/{total}", idx + 1);

            let page = match fetch_page(&self.client, &product.url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(url = %product.url, error = %e, "Fetch failed, skipping product");
                    stats.fetch_failures += 1;
                    self.pause().await;
                    continue;
                }
            };

            let result =
                extract::check_page(&page, &product.url, product.label.as_deref(), &self.opts);
            if result.price.is_none() {
                stats.no_price += 1;
            }
            if self.cfg.debug {
                info!(url = %result.url, "evidence: {}", result.evidence.join(" | "));
            } else {
                debug!(url = %result.url, "evidence: {}", result.evidence.join(" | "));
            }
            info!(
                url = %result.url,
                name = %result.name,
                in_stock = result.in_stock,
                "Checked: price={}",
                result.price.map_or_else(|| "n/a".to_string(), |p| format!("${p:.2}")),
            );

            self.settle(&result, &mut state, &mut stats).await;
            self.pause().await;
        }

        info!(
            checked = stats.checked,
            fetch_failures = stats.fetch_failures,
            no_price = stats.no_price,
            alerts_sent = stats.alerts_sent,
            delivery_failures = stats.delivery_failures,
            "Pass complete: {}/{} checked, {} alerts sent",
            stats.checked - stats.fetch_failures,
            total,
            stats.alerts_sent,
        );
        stats
    }

    /// Classify one check result against the prior state and persist the
    /// outcome. On an alert, the send happens first and the state only
    /// advances when it succeeds — a failed delivery leaves the prior state
    /// in place so the next pass retries the same alert.
    async fn settle(
        &self,
        result: &ProductCheckResult,
        state: &mut TierStateMap,
        stats: &mut PassStats,
    ) {
        let prior = state.get(&result.url).cloned().unwrap_or_default();
        let decision = tier::evaluate(result.price, result.in_stock, &prior, &self.thresholds);

        let Some(alert_tier) = decision.alert else {
            state.insert(result.url.clone(), decision.next);
            self.persist(state);
            return;
        };

        let (subject, body) = compose_alert(result, alert_tier);
        match self.notifier.send(&subject, &body).await {
            Ok(()) => {
                info!(url = %result.url, tier = %alert_tier, "Alert sent: {subject}");
                let mut next = decision.next;
                next.last_alerted_tier = Some(alert_tier);
                next.last_alerted_at = Some(Utc::now());
                state.insert(result.url.clone(), next);
                stats.alerts_sent += 1;
                self.persist(state);
            }
            Err(e) => {
                warn!(url = %result.url, error = %e, "Alert delivery failed, retrying next pass");
                stats.delivery_failures += 1;
            }
        }
    }

    fn persist(&self, state: &TierStateMap) {
        if let Err(e) = self.store.save(state) {
            warn!(error = %e, "Failed to write state file");
        }
    }

    async fn pause(&self) {
        sleep(Duration::from_secs(self.cfg.product_delay_secs)).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

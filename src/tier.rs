use crate::types::{Tier, TierState};

/// Tier boundary prices. `tier1_max` is strictly below `tier2_max`
/// (enforced at config load).
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub tier1_max: f64,
    pub tier2_max: f64,
}

/// Pure price → tier mapping. Upper bounds are exclusive: a price exactly at
/// `tier1_max` is "great", exactly at `tier2_max` is no tier.
pub fn classify(price: f64, th: &Thresholds) -> Option<Tier> {
    if price < th.tier1_max {
        Some(Tier::Best)
    } else if price < th.tier2_max {
        Some(Tier::Great)
    } else {
        None
    }
}

/// Outcome of one tracker evaluation.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Effective classification: None when the price is unknown, the price is
    /// at or above tier2_max, or the product is out of stock.
    pub tier: Option<Tier>,
    /// At most one alert per check. Fires only on transition *into* a tier
    /// the product was not already at-or-above (the ratchet).
    pub alert: Option<Tier>,
    /// State to persist, regardless of whether an alert fired.
    /// `last_alerted_*` carry over from `prior` — the orchestrator advances
    /// them only after a successful send.
    pub next: TierState,
}

/// Evaluate one observation against the prior per-product state.
///
/// Both `was_in_*` flags are recomputed from the current classification alone.
/// That makes the ratchet one-shot while it holds, and lets it re-arm the
/// moment the product drops out of both tiers (price rise or out of stock).
pub fn evaluate(
    price: Option<f64>,
    in_stock: bool,
    prior: &TierState,
    th: &Thresholds,
) -> Decision {
    let classified = price.and_then(|p| classify(p, th));
    let tier = if in_stock { classified } else { None };

    let alert = match tier {
        Some(Tier::Best) if !prior.was_in_best => Some(Tier::Best),
        Some(Tier::Great) if !prior.was_in_best && !prior.was_in_great => Some(Tier::Great),
        _ => None,
    };

    let next = TierState {
        was_in_best: tier == Some(Tier::Best),
        was_in_great: tier == Some(Tier::Great),
        last_price: price,
        last_in_stock: in_stock,
        last_tier: tier,
        last_alerted_tier: prior.last_alerted_tier,
        last_alerted_at: prior.last_alerted_at,
    };

    Decision { tier, alert, next }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

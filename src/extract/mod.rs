mod embedded;
mod price;
mod stock;

use chrono::Utc;
use scraper::{Html, Selector};

use crate::config::PLACEHOLDER_NAME;
use crate::types::{ExtractOptions, ProductCheckResult};

/// Outcome of a single heuristic. Distinguishing "nothing there" from
/// "something there but unparseable" keeps each heuristic testable on its own
/// instead of relying on fall-through behavior. Both non-Found variants let
/// the chain continue to the next heuristic.
#[derive(Debug, Clone, PartialEq)]
pub enum Probe<T> {
    Found(T),
    Absent,
    Malformed,
}

impl<T> Probe<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Probe::Found(v) => Some(v),
            _ => None,
        }
    }
}

/// Extract a best-effort check result from raw page content. Never fails:
/// a heuristic that cannot run leaves its field at the default and simply
/// does not appear in the evidence.
pub fn check_page(
    page: &str,
    url: &str,
    label: Option<&str>,
    opts: &ExtractOptions,
) -> ProductCheckResult {
    let doc = Html::parse_document(page);
    let mut evidence: Vec<String> = Vec::new();

    let price = price::extract(&doc, page, opts, &mut evidence);
    let in_stock = stock::extract(&doc, page, opts.stock_policy, &mut evidence);

    // The on-page heading is diagnostic only; the configured label (or a
    // placeholder) is what callers see, so names survive page redesigns.
    if let Some(title) = page_title(&doc) {
        evidence.push(format!("page title: {title}"));
    }
    let name = label.unwrap_or(PLACEHOLDER_NAME).to_string();

    ProductCheckResult {
        url: url.to_string(),
        name,
        price,
        in_stock,
        checked_at: Utc::now(),
        evidence,
    }
}

fn page_title(doc: &Html) -> Option<String> {
    let preferred = Selector::parse(r#"h1[data-testid="product-title"]"#).unwrap();
    let any_h1 = Selector::parse("h1").unwrap();

    let el = doc.select(&preferred).next().or_else(|| doc.select(&any_h1).next())?;
    let text: String = el.text().collect::<String>().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
